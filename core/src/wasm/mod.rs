//! WASM bindings for the consistency engine
//!
//! Values cross the boundary as JSON strings.

pub mod bindings;
pub mod utils;

pub use bindings::{apply_transform, WasmModel};

//! JavaScript bindings for the consistency model

use super::utils::to_js_error;
use crate::model::{Action, ConsistencyModel};
use crate::text::CodepointText;
use crate::transform::{self, Transform};
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// JavaScript-friendly wrapper for ConsistencyModel
///
/// Every operation returns an action object as a JSON string:
/// `{ "apply": [..] }`, `{ "send": {..} }`, both, or `{}`.
#[wasm_bindgen]
pub struct WasmModel {
    inner: ConsistencyModel,
}

#[wasm_bindgen]
impl WasmModel {
    /// Create a model at the version the document was delivered with
    #[wasm_bindgen(constructor)]
    pub fn new(base_version: u64) -> Self {
        Self {
            inner: ConsistencyModel::new(base_version),
        }
    }

    /// Submit a local transform (JSON object)
    pub fn submit(&mut self, transform_json: &str) -> Result<String, JsValue> {
        let transform: Transform = serde_json::from_str(transform_json).map_err(to_js_error)?;
        let action = self.inner.submit(transform).map_err(to_js_error)?;
        action_json(&action)
    }

    /// Receive authority-ordered transforms (JSON array)
    pub fn receive(&mut self, transforms_json: &str) -> Result<String, JsValue> {
        let transforms: Vec<Transform> =
            serde_json::from_str(transforms_json).map_err(to_js_error)?;
        let action = self.inner.receive(transforms).map_err(to_js_error)?;
        action_json(&action)
    }

    /// Receive the version assigned to our in-flight transform
    pub fn correct(&mut self, version: u64) -> Result<String, JsValue> {
        let action = self.inner.correct(version).map_err(to_js_error)?;
        action_json(&action)
    }

    /// Current state name: READY, SENDING or BUFFERING
    pub fn state(&self) -> String {
        self.inner.state().to_string()
    }

    pub fn version(&self) -> u64 {
        self.inner.version()
    }
}

/// Apply a transform (JSON object) to content, returning the new content
#[wasm_bindgen(js_name = applyTransform)]
pub fn apply_transform(transform_json: &str, content: &str) -> Result<String, JsValue> {
    let transform: Transform = serde_json::from_str(transform_json).map_err(to_js_error)?;
    Ok(transform::apply(&transform, &CodepointText::from(content)).into_string())
}

fn action_json(action: &Action) -> Result<String, JsValue> {
    let mut object = serde_json::Map::new();
    if let Some(apply) = action.to_apply() {
        object.insert("apply".to_string(), serde_json::to_value(apply).map_err(to_js_error)?);
    }
    if let Some(send) = action.to_send() {
        object.insert("send".to_string(), serde_json::to_value(send).map_err(to_js_error)?);
    }
    serde_json::to_string(&Value::Object(object)).map_err(to_js_error)
}

/// Key-value persistence over chrome.storage.local

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::error::SiaError;

pub const NAV_TARGET_KEY: &str = "sia_nav_target";
pub const COMPLETED_KEY: &str = "sia_completed";
pub const DARK_MODE_KEY: &str = "sia_dark_mode";
pub const EXPANDED_KEY: &str = "sia_ui_expanded";
pub const SETTINGS_KEY: &str = "sia_settings";
pub const CACHE_KEY_PREFIX: &str = "courses_data_cache";

// Import JS bridge functions
#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn getStorage(key: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch)]
    async fn setStorage(key: &str, value: JsValue) -> Result<(), JsValue>;

    #[wasm_bindgen(catch)]
    async fn removeStorage(key: &str) -> Result<(), JsValue>;
}

/// Async key-value store holding JSON values. Every call is atomic per key.
#[allow(async_fn_in_trait)]
pub trait KeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SiaError>;
    async fn set(&self, key: &str, value: Value) -> Result<(), SiaError>;
    async fn remove(&self, key: &str) -> Result<(), SiaError>;
}

/// Read a typed value. A stored value of the wrong shape is treated as absent.
pub async fn get_typed<T, S>(store: &S, key: &str) -> Result<Option<T>, SiaError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    Ok(store
        .get(key)
        .await?
        .and_then(|value| match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                log::warn!("Ignoring malformed value under {}: {}", key, e);
                None
            }
        }))
}

pub async fn set_typed<T, S>(store: &S, key: &str, value: &T) -> Result<(), SiaError>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let value = serde_json::to_value(value)?;
    store.set(key, value).await
}

/// chrome.storage.local through the JS bridge
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromeStore;

impl KeyValueStore for ChromeStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SiaError> {
        let value_js = getStorage(key)
            .await
            .map_err(|e| SiaError::Storage(format!("Failed to get {}: {:?}", key, e)))?;

        if value_js.is_null() || value_js.is_undefined() {
            return Ok(None);
        }

        serde_wasm_bindgen::from_value(value_js)
            .map(Some)
            .map_err(|e| SiaError::Storage(format!("Failed to parse {}: {:?}", key, e)))
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SiaError> {
        let serializer = serde_wasm_bindgen::Serializer::json_compatible();
        let value_js = value
            .serialize(&serializer)
            .map_err(|e| SiaError::Storage(format!("Failed to serialize {}: {:?}", key, e)))?;

        setStorage(key, value_js)
            .await
            .map_err(|e| SiaError::Storage(format!("Failed to save {}: {:?}", key, e)))
    }

    async fn remove(&self, key: &str) -> Result<(), SiaError> {
        removeStorage(key)
            .await
            .map_err(|e| SiaError::Storage(format!("Failed to remove {}: {:?}", key, e)))
    }
}

/// In-process store, used by the native tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::cell::RefCell<std::collections::HashMap<String, Value>>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, SiaError> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), SiaError> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), SiaError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

//! WASM bindings for document text extraction.
//!
//! Only the client pipeline (`.txt`, `.docx`, `.pdf`) is available here.
//! `.doc` uploads resolve to a failure envelope pointing at the server.

use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use docsieve_core::{CLIENT_SUFFIXES, EngineState, Extractor, FormatVariant};

/// Initialize panic hook for better error messages in console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Version information.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Suffixes this build can extract, without the leading dot.
#[wasm_bindgen(js_name = supportedSuffixes)]
pub fn supported_suffixes() -> js_sys::Array {
    CLIENT_SUFFIXES.iter().map(|s| JsValue::from_str(s)).collect()
}

#[derive(Serialize)]
struct FormatInfo {
    format: FormatVariant,
    suffix: Option<&'static str>,
    supported: bool,
}

fn format_info(file_name: &str) -> FormatInfo {
    let format = FormatVariant::from_file_name(file_name);
    FormatInfo {
        format,
        suffix: format.suffix(),
        supported: format.is_client_decodable(),
    }
}

fn state_name(state: EngineState) -> &'static str {
    match state {
        EngineState::Uninitialized => "uninitialized",
        EngineState::Initializing => "initializing",
        EngineState::Ready => "ready",
        EngineState::Failed => "failed",
    }
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Browser-side extractor.
///
/// One instance owns one PDF engine handle; keep it around so the engine
/// is bootstrapped once.
#[wasm_bindgen]
pub struct DocumentExtractor {
    inner: Rc<Extractor>,
}

#[wasm_bindgen]
impl DocumentExtractor {
    /// Create a new extractor.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(Extractor::new()),
        }
    }

    /// Extract text from file bytes.
    ///
    /// Resolves to `{ success, content, error? }`. Document problems never
    /// reject the promise.
    #[wasm_bindgen]
    pub fn extract(&self, bytes: Vec<u8>, file_name: String) -> js_sys::Promise {
        let extractor = Rc::clone(&self.inner);
        future_to_promise(async move {
            let result = extractor.extract_bytes(&bytes, &file_name).await;
            if let Some(message) = &result.error {
                web_sys::console::warn_1(&JsValue::from_str(&format!("{}: {}", file_name, message)));
            }
            to_js(&result)
        })
    }

    /// Format detected from a file name: `{ format, suffix, supported }`.
    #[wasm_bindgen(js_name = detectFormat)]
    pub fn detect_format(&self, file_name: &str) -> Result<JsValue, JsValue> {
        to_js(&format_info(file_name))
    }

    /// PDF engine lifecycle state.
    #[wasm_bindgen(getter, js_name = engineState)]
    pub fn engine_state(&self) -> String {
        state_name(self.inner.engine().state()).to_string()
    }

    /// Retry a failed PDF engine bootstrap. Resolves to the new state.
    #[wasm_bindgen(js_name = retryEngine)]
    pub fn retry_engine(&self) -> js_sys::Promise {
        let extractor = Rc::clone(&self.inner);
        future_to_promise(async move {
            let engine = extractor.engine();
            if let Err(e) = engine.retry().await {
                web_sys::console::warn_1(&JsValue::from_str(&e.to_string()));
            }
            Ok(JsValue::from_str(state_name(engine.state())))
        })
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

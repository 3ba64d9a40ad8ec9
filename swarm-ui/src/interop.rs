//! Browser interop glue: viewport measurement, clock, focus detection,
//! JSON download, and clipboard access.

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

/// Get the browser viewport dimensions
pub fn get_viewport_size() -> (f64, f64) {
    let Some(window) = web_sys::window() else {
        return (1280.0, 800.0);
    };
    let width = window
        .inner_width()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(1280.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(800.0);
    (width, height)
}

/// Wall-clock milliseconds, the time source for batching and layouts.
pub fn now_ms() -> i64 {
    js_sys::Date::now() as i64
}

/// Whether keyboard focus sits in a text-entry element, where single-key
/// shortcuts (spacebar and friends) must not fire.
pub fn typing_in_input() -> bool {
    let Some(active) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.active_element())
    else {
        return false;
    };
    matches!(active.tag_name().as_str(), "INPUT" | "TEXTAREA" | "SELECT")
        || active.has_attribute("contenteditable")
}

/// Native confirmation dialog for destructive actions.
pub fn confirm(message: &str) -> bool {
    web_sys::window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

/// Trigger a download of `json` as `filename` via a temporary object URL.
pub fn download_json(filename: &str, json: &str) -> Result<(), String> {
    let window = web_sys::window().ok_or("no window")?;
    let document = window.document().ok_or("no document")?;

    let parts = js_sys::Array::new();
    parts.push(&wasm_bindgen::JsValue::from_str(json));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type("application/json");
    let blob = web_sys::Blob::new_with_str_sequence_and_options(&parts, &options)
        .map_err(|e| format!("failed to create blob: {e:?}"))?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)
        .map_err(|e| format!("failed to create object url: {e:?}"))?;

    let anchor: web_sys::HtmlAnchorElement = document
        .create_element("a")
        .map_err(|e| format!("failed to create anchor: {e:?}"))?
        .dyn_into()
        .map_err(|_| "anchor element has unexpected type".to_string())?;
    anchor.set_href(&url);
    anchor.set_download(filename);
    anchor.click();

    let _ = web_sys::Url::revoke_object_url(&url);
    Ok(())
}

/// Write text to the system clipboard. Browsers may deny this outside a
/// user gesture; the caller surfaces the failure as a toast.
pub async fn copy_to_clipboard(text: &str) -> Result<(), String> {
    let window = web_sys::window().ok_or("no window")?;
    let clipboard = window.navigator().clipboard();
    JsFuture::from(clipboard.write_text(text))
        .await
        .map(|_| ())
        .map_err(|e| format!("clipboard write denied: {e:?}"))
}

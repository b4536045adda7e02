use wasm_bindgen::JsValue;
use web_sys::Window;

pub fn websocket_url(window: &Window) -> Result<String, JsValue> {
    let location = window.location();
    let protocol = location.protocol()?;
    let host = location.host()?;
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    let board_id = board_id_from_path(&location.pathname()?)
        .ok_or_else(|| JsValue::from_str("Missing board id in URL"))?;
    Ok(format!("{scheme}://{host}/ws/{board_id}"))
}

pub fn strokes_api_url(window: &Window) -> Option<String> {
    let board_id = board_id_from_path(&window.location().pathname().ok()?)?;
    Some(format!("/api/boards/{board_id}/strokes"))
}

pub fn board_id_from_path(path: &str) -> Option<String> {
    let mut parts = path.trim_matches('/').split('/');
    if parts.next()? != "b" {
        return None;
    }
    let board_id = parts.next()?;
    if board_id.is_empty() {
        None
    } else {
        Some(board_id.to_string())
    }
}

/// Looks up `key` in a `?a=b&c=d` query string.
pub fn query_param<'a>(search: &'a str, key: &str) -> Option<&'a str> {
    search
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == key)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_board_id_from_board_paths() {
        assert_eq!(board_id_from_path("/b/abc-123"), Some("abc-123".into()));
        assert_eq!(board_id_from_path("/b/abc-123/"), Some("abc-123".into()));
        assert_eq!(board_id_from_path("/b/"), None);
        assert_eq!(board_id_from_path("/s/abc"), None);
        assert_eq!(board_id_from_path("/"), None);
    }

    #[test]
    fn reads_query_params() {
        assert_eq!(query_param("?store=http&debug=1", "store"), Some("http"));
        assert_eq!(query_param("?debug=1", "store"), None);
        assert_eq!(query_param("", "store"), None);
    }
}

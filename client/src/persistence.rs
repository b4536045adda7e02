use std::rc::Rc;

use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Headers, Request, RequestInit, Response, Window};

use doodleboard_shared::{ClientMessage, ResampleConfig, Segment, Shape};

use crate::gesture::Gesture;
use crate::net::{query_param, strokes_api_url};
use crate::ws::WsSender;

/// Where completed strokes go. Picked once per page from `?store=`.
pub enum PersistenceClient {
    /// Resamples locally and commits over the board socket.
    Socket(Rc<WsSender>),
    /// Uploads raw segments and lets the server resample.
    Http { url: String },
    Disabled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Socket,
    Http,
    Off,
}

impl StoreKind {
    pub fn from_search(search: &str) -> Self {
        match query_param(search, "store") {
            Some("http") => StoreKind::Http,
            Some("off") => StoreKind::Off,
            _ => StoreKind::Socket,
        }
    }
}

#[derive(Serialize)]
struct StrokeUpload<'a> {
    shape: Shape,
    color: &'a str,
    size: f32,
    segments: &'a [Segment],
    start_index: i64,
    gap: i64,
    num_buckets: i64,
}

/// Style and shape tag of a finished gesture.
pub struct StrokeStyle {
    pub shape: Shape,
    pub color: String,
    pub size: f32,
}

impl PersistenceClient {
    pub fn select(window: &Window, socket: Rc<WsSender>) -> Self {
        let search = window.location().search().unwrap_or_default();
        match StoreKind::from_search(&search) {
            StoreKind::Socket => PersistenceClient::Socket(socket),
            StoreKind::Http => match strokes_api_url(window) {
                Some(url) => PersistenceClient::Http { url },
                None => PersistenceClient::Socket(socket),
            },
            StoreKind::Off => PersistenceClient::Disabled,
        }
    }

    pub fn commit(
        &self,
        window: &Window,
        gesture: &Gesture,
        style: StrokeStyle,
        num_buckets: i64,
    ) {
        if gesture.is_empty() {
            return;
        }
        let config = gesture.resample_config(num_buckets);
        match self {
            PersistenceClient::Socket(socket) => match gesture.samples(config) {
                Ok(samples) => socket.send(&ClientMessage::Commit {
                    shape: style.shape,
                    color: style.color,
                    size: style.size,
                    num_buckets: config.num_buckets,
                    gap: config.gap,
                    samples,
                }),
                Err(error) => {
                    web_sys::console::warn_1(&format!("Stroke not stored: {error}").into());
                }
            },
            PersistenceClient::Http { url } => {
                if let Err(error) = post_stroke(window, url, gesture.segments(), &style, config) {
                    web_sys::console::error_2(&"Stroke upload failed".into(), &error);
                }
            }
            PersistenceClient::Disabled => {}
        }
    }
}

fn post_stroke(
    window: &Window,
    url: &str,
    segments: &[Segment],
    style: &StrokeStyle,
    config: ResampleConfig,
) -> Result<(), JsValue> {
    let body = serde_json::to_string(&StrokeUpload {
        shape: style.shape,
        color: &style.color,
        size: style.size,
        segments,
        start_index: config.start_index,
        gap: config.gap,
        num_buckets: config.num_buckets,
    })
    .map_err(|error| JsValue::from_str(&error.to_string()))?;

    let headers = Headers::new()?;
    headers.set("Content-Type", "application/json")?;
    let init = RequestInit::new();
    init.set_method("POST");
    init.set_headers(&headers);
    init.set_body(&JsValue::from_str(&body));
    let request = Request::new_with_str_and_init(url, &init)?;

    let url_ok = url.to_string();
    let on_ok = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        let Ok(response) = value.dyn_into::<Response>() else {
            return;
        };
        if !response.ok() {
            web_sys::console::warn_1(
                &format!("Stroke upload to {url_ok} returned {}", response.status()).into(),
            );
        }
    });
    let url_err = url.to_string();
    let on_err = Closure::<dyn FnMut(JsValue)>::new(move |error: JsValue| {
        web_sys::console::error_2(&format!("Stroke upload to {url_err} failed").into(), &error);
    });
    let _ = window.fetch_with_request(&request).then2(&on_ok, &on_err);
    on_ok.forget();
    on_err.forget();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_defaults_to_socket() {
        assert_eq!(StoreKind::from_search(""), StoreKind::Socket);
        assert_eq!(StoreKind::from_search("?store=http"), StoreKind::Http);
        assert_eq!(StoreKind::from_search("?debug=1&store=off"), StoreKind::Off);
        assert_eq!(StoreKind::from_search("?store=bogus"), StoreKind::Socket);
    }
}

//! Synthetic pages served while the gateway is not forwarding.
//!
//! - Loading: 503, auto-refreshing, fixed content
//! - Error: 500, title plus HTML-escaped details (log file or failure message)

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::config::PagesConfig;

/// Escape text for embedding inside HTML element content or attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct Pages {
    product_name: String,
    refresh_secs: u32,
    target_port: u16,
}

impl Pages {
    pub fn new(config: &PagesConfig, target_port: u16) -> Self {
        Self {
            product_name: config.product_name.clone(),
            refresh_secs: config.refresh_secs,
            target_port,
        }
    }

    pub fn render_loading(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><title>Starting...</title><meta http-equiv="refresh" content="{refresh}"></head>
<body style="background:#222; color:#eee; font-family:sans-serif; text-align:center; padding-top:20%;">
    <h1>{name} is Starting...</h1>
    <p>Please wait while the AI agent initializes.</p>
    <p style="color:#aaa;">Target Port: {port}</p>
    <div style="margin-top:20px;">
        <div style="display:inline-block; width:20px; height:20px; border:3px solid #555; border-top:3px solid #0f0; border-radius:50%; animation:spin 1s linear infinite;"></div>
    </div>
    <style>@keyframes spin {{ 0% {{ transform: rotate(0deg); }} 100% {{ transform: rotate(360deg); }} }}</style>
</body>
</html>"#,
            refresh = self.refresh_secs,
            name = escape_html(&self.product_name),
            port = self.target_port,
        )
    }

    pub fn render_error(&self, title: &str, details: &str) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head><title>Error</title></head>
<body style="background:#111; color:#f88; font-family:monospace; padding:20px;">
    <h1>{title}</h1>
    <pre style="background:#000; border:1px solid #444; padding:15px; overflow:scroll; max-height:80vh;">{details}</pre>
</body>
</html>"#,
            title = escape_html(title),
            details = escape_html(details),
        )
    }

    pub fn loading(&self) -> Response {
        html(StatusCode::SERVICE_UNAVAILABLE, self.render_loading())
    }

    pub fn error(&self, title: &str, details: &str) -> Response {
        html(StatusCode::INTERNAL_SERVER_ERROR, self.render_error(title, details))
    }
}

fn html(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response()
}

//! Landing page.

use axum::extract::State;
use axum::response::Html;

use crate::http::server::AppState;
use crate::observability::metrics;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Substitute `{{key}}` placeholders. Values are HTML-escaped.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |page, (key, value)| {
        page.replace(&format!("{{{{{key}}}}}"), &escape_html(value))
    })
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Keep or drop every `{{#name}}...{{/name}}` block, removing the markers.
pub fn section(template: &str, name: &str, keep: bool) -> String {
    let open = format!("{{{{#{name}}}}}");
    let close = format!("{{{{/{name}}}}}");
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find(&open) {
        out.push_str(&rest[..start]);
        let body = &rest[start + open.len()..];
        match body.find(&close) {
            Some(end) => {
                if keep {
                    out.push_str(&body[..end]);
                }
                rest = &body[end + close.len()..];
            }
            // Unterminated block: leave the text as is.
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Render the index page for the given listener and sample file. The
/// throttled link is only shown when that route is registered.
pub fn render_index(host: &str, port: u16, filename: &str, throttled: bool) -> String {
    render(
        &section(INDEX_TEMPLATE, "throttled", throttled),
        &[("host", host), ("port", &port.to_string()), ("filename", filename)],
    )
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Html<String> {
    metrics::record_request("index", 200);
    Html(state.landing.to_string())
}

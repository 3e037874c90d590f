//! The embedded single-page chat UI.
//!
//! `frontend/index.html` and `frontend/style.css` are compiled into the
//! binary with `include_str!`. The page is rendered on the server: a text
//! input posting to `/ask`, the session's labelled messages and an optional
//! banner. The session ID travels in the `session` query parameter and a
//! hidden form field.

use axum::{
    Form, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use duneguide_core::message::{Message, Role, USER_LABEL};
use serde::Deserialize;
use tracing::error;

use crate::SharedState;

/// The embedded frontend files.
const INDEX_HTML: &str = include_str!("../../../frontend/index.html");
const STYLE_CSS: &str = include_str!("../../../frontend/style.css");

/// Build a router that serves the page, the form endpoint and the CSS.
pub fn frontend_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(index_handler))
        .route("/ask", post(ask_handler))
        .route("/static/style.css", get(css_handler))
}

#[derive(Debug, Deserialize)]
struct PageQuery {
    session: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AskForm {
    #[serde(default)]
    session: Option<String>,
    #[serde(default)]
    query: String,
}

enum Banner<'a> {
    Warning(&'a str),
    Error(&'a str),
}

async fn index_handler(
    State(state): State<SharedState>,
    Query(params): Query<PageQuery>,
) -> Html<String> {
    let assistant = &state.settings.assistant_name;
    let slot = match params.session.as_deref() {
        Some(id) => state.sessions.get(id).await,
        None => None,
    };

    let Some(slot) = slot else {
        return Html(render_page("", assistant, &[], None));
    };

    let mut slot = slot.lock().await;
    let notice = slot.notice.take();
    let banner = notice.as_deref().map(Banner::Warning);
    Html(render_page(
        slot.chat.id(),
        assistant,
        slot.chat.log().messages(),
        banner,
    ))
}

async fn ask_handler(State(state): State<SharedState>, Form(form): Form<AskForm>) -> Response {
    let requested = form.session.as_deref().filter(|s| !s.is_empty());
    let (id, slot) = state
        .sessions
        .get_or_create(requested, || state.new_session())
        .await;

    let mut slot = slot.lock().await;
    match slot.chat.handle_turn(&form.query).await {
        Ok(outcome) => {
            slot.notice = outcome.warning().map(str::to_string);
            Redirect::to(&format!("/?session={id}")).into_response()
        }
        Err(e) => {
            error!(session = %id, error = %e, "Turn failed");
            let text = format!("Error generating response: {e}");
            let page = render_page(
                &id,
                &state.settings.assistant_name,
                slot.chat.log().messages(),
                Some(Banner::Error(&text)),
            );
            (StatusCode::BAD_GATEWAY, Html(page)).into_response()
        }
    }
}

async fn css_handler() -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLE_CSS,
    )
        .into_response()
}

fn render_page(
    session: &str,
    assistant: &str,
    messages: &[Message],
    banner: Option<Banner<'_>>,
) -> String {
    fill(INDEX_HTML, |key| match key {
        "assistant" => Some(escape_html(assistant)),
        "session" => Some(escape_html(session)),
        "notice" => Some(match &banner {
            Some(Banner::Warning(text)) => {
                format!(r#"<div class="notice warning">{}</div>"#, escape_html(text))
            }
            Some(Banner::Error(text)) => {
                format!(r#"<div class="notice error">{}</div>"#, escape_html(text))
            }
            None => String::new(),
        }),
        "messages" => Some(render_messages(assistant, messages)),
        _ => None,
    })
}

fn render_messages(assistant: &str, messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| {
            let (class, label) = match m.role {
                Role::User => ("user", USER_LABEL),
                Role::Assistant => ("assistant", assistant),
            };
            format!(
                r#"      <div class="message {class}"><strong>{}:</strong> {}</div>"#,
                escape_html(label),
                escape_html(&m.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Single-pass `{{key}}` substitution. Substituted text is never rescanned
/// and unknown keys are left as they are.
fn fill(template: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match lookup(key) {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[start..start + end + 4]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

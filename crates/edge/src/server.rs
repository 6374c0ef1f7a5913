//! Edge HTTP server
//!
//! Renders the question form, submits jobs to the dispatcher and shows
//! the dispatcher's view of backend health. The edge holds no state of
//! its own; a dispatcher failure becomes an error page, never a panic.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use inferoute_common::protocol::{ErrorBody, ProcessRequest};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

/// Shared state for all edge handlers
#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    pub dispatcher_url: String,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(dispatcher_url: impl Into<String>, request_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            dispatcher_url: dispatcher_url.into(),
            request_timeout,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SolveForm {
    pub question: String,
}

/// Build the edge router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/solve", post(solve))
        .route("/health", get(health_page))
        .route("/api/health", get(api_health))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

/// Submit one question to the dispatcher and render the answer
async fn solve(State(state): State<AppState>, Form(form): Form<SolveForm>) -> Response {
    info!("sending question to dispatcher");

    let result = state
        .client
        .post(format!("{}/process", state.dispatcher_url))
        .timeout(state.request_timeout)
        .json(&ProcessRequest {
            question: form.question.clone(),
        })
        .send()
        .await;

    let payload: serde_json::Value = match result {
        Ok(response) => match response.json().await {
            Ok(payload) => payload,
            Err(e) => {
                error!(error = %e, "unreadable dispatcher response");
                return error_page("The dispatcher returned an unreadable response.");
            }
        },
        Err(e) => {
            error!(error = %e, "failed to reach dispatcher");
            return error_page("The dispatcher could not be reached.");
        }
    };

    let answer = payload["message"]["content"]
        .as_str()
        .unwrap_or("Error: No response from backend");

    Html(render_result(&form.question, answer)).into_response()
}

/// Dashboard page; polls `/api/health` from the browser
async fn health_page() -> Html<&'static str> {
    Html(HEALTH_PAGE)
}

/// Proxy for the dispatcher's `/globalhealth`
async fn api_health(State(state): State<AppState>) -> Response {
    let result = state
        .client
        .get(format!("{}/globalhealth", state.dispatcher_url))
        .timeout(state.request_timeout)
        .send()
        .await;

    match result {
        Ok(response) => match response.json::<serde_json::Value>().await {
            Ok(payload) => Json(payload).into_response(),
            Err(e) => {
                error!(error = %e, "unreadable globalhealth response");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorBody::new("Unreadable dispatcher response")),
                )
                    .into_response()
            }
        },
        Err(e) => {
            error!(error = %e, "failed to fetch globalhealth");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody::new(format!("Dispatcher unreachable: {e}"))),
            )
                .into_response()
        }
    }
}

/// Minimal HTML escaping for user-supplied text
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_result(question: &str, answer: &str) -> String {
    let question = escape_html(question);
    let answer = escape_html(answer).replace('\n', "<br>");

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Inferoute - Result</title></head>
<body>
    <h1>Result</h1>
    <div class="result">
        <p><strong>Question:</strong> {question}</p>
        <p><strong>Answer:</strong></p>
        <p>{answer}</p>
    </div>
    <a href="/">Back</a>
</body>
</html>"#
    )
}

fn error_page(message: &str) -> Response {
    let body = format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Inferoute - Error</title></head>
<body>
    <h1>Something went wrong</h1>
    <p>{}</p>
    <a href="/">Back</a>
</body>
</html>"#,
        escape_html(message)
    );

    (StatusCode::BAD_GATEWAY, Html(body)).into_response()
}

const INDEX_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Inferoute</title></head>
<body>
    <h1>Inferoute</h1>
    <form method="POST" action="/solve">
        <input type="text" name="question" placeholder="Ask a question" required>
        <button type="submit">Ask</button>
    </form>
    <a href="/health">Cluster health</a>
</body>
</html>"#;

const HEALTH_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>Inferoute - Cluster Health</title>
    <script>
        async function fetchHealth() {
            try {
                const response = await fetch('/api/health');
                const data = await response.json();
                document.getElementById('health-stats').innerText =
                    JSON.stringify(data, null, 2);
            } catch (error) {
                console.error('Failed to fetch health stats:', error);
            }
        }
        window.onload = () => {
            fetchHealth();
            setInterval(fetchHealth, 5000);
        };
    </script>
</head>
<body>
    <h1>Cluster Health</h1>
    <pre id="health-stats">Loading...</pre>
    <a href="/">Back</a>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    async fn spawn_edge(dispatcher: SocketAddr) -> SocketAddr {
        let state = AppState::new(format!("http://{dispatcher}"), Duration::from_millis(500));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, build_router(state)).await.unwrap();
        });
        addr
    }

    async fn dead_addr() -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>&\"x\""), "&lt;b&gt;&amp;&quot;x&quot;");
    }

    #[test]
    fn test_render_result_escapes_and_breaks_lines() {
        let page = render_result("1<2?", "yes\nindeed");
        assert!(page.contains("1&lt;2?"));
        assert!(page.contains("yes<br>indeed"));
    }

    #[tokio::test]
    async fn test_index_serves_form() {
        let edge = spawn_edge(dead_addr().await).await;

        let body = reqwest::get(format!("http://{edge}/"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("<form"));
    }

    #[tokio::test]
    async fn test_solve_renders_error_page_when_dispatcher_down() {
        let edge = spawn_edge(dead_addr().await).await;

        let response = reqwest::Client::new()
            .post(format!("http://{edge}/solve"))
            .form(&[("question", "hello")])
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 502);
        let body = response.text().await.unwrap();
        assert!(body.contains("Something went wrong"));
    }

    #[tokio::test]
    async fn test_api_health_returns_500_when_dispatcher_down() {
        let edge = spawn_edge(dead_addr().await).await;

        let response = reqwest::get(format!("http://{edge}/api/health"))
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 500);
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(body.get("error").is_some());
    }
}

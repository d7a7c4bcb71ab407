use analyst_core::{CompletionModel, ModelError, Prompt};
use async_trait::async_trait;

use crate::chat::{ChatClient, ChatMessage};

/// `CompletionModel` backed by the HTTP chat-completions client.
#[derive(Clone)]
pub struct HttpCompletionModel {
    client: ChatClient,
}

impl HttpCompletionModel {
    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

impl From<ChatClient> for HttpCompletionModel {
    fn from(client: ChatClient) -> Self {
        Self::new(client)
    }
}

#[async_trait]
impl CompletionModel for HttpCompletionModel {
    async fn complete(&self, model: &str, prompt: &Prompt) -> Result<String, ModelError> {
        let messages = [
            ChatMessage::system(prompt.system.as_str()),
            ChatMessage::user(prompt.user.as_str()),
        ];
        self.client
            .complete(model, &messages)
            .await
            .map_err(|e| e.into_model_error(self.client.config().timeout))
    }

    fn backend_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmConfig;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v1/", addr)
    }

    fn model_for(base_url: String, timeout: Duration) -> HttpCompletionModel {
        let config = LlmConfig {
            api_key: "test-key".to_string(),
            base_url,
            timeout,
            max_tokens: 128,
            temperature: None,
        };
        HttpCompletionModel::new(ChatClient::new(config).unwrap())
    }

    fn prompt() -> Prompt {
        Prompt::new("You write SQL.", "How many companies?")
    }

    async fn answer(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        seen.lock().unwrap().push((auth, body));
        Json(json!({
            "choices": [{"message": {"role": "assistant", "content": "SELECT COUNT(*) FROM companies"}}]
        }))
    }

    #[tokio::test]
    async fn test_completion_sends_auth_and_token_limit() {
        let seen: Seen = Arc::default();
        let app = Router::new()
            .route("/v1/chat/completions", post(answer))
            .with_state(seen.clone());
        let model = model_for(serve(app).await, Duration::from_secs(5));

        let text = model.complete("gpt-4o-mini", &prompt()).await.unwrap();
        assert_eq!(text, "SELECT COUNT(*) FROM companies");

        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer test-key"));
        assert_eq!(body["model"], json!("gpt-4o-mini"));
        assert_eq!(body["max_completion_tokens"], json!(128));
        assert_eq!(body["messages"][0]["role"], json!("system"));
        assert_eq!(body["messages"][1]["content"], json!("How many companies?"));
    }

    #[tokio::test]
    async fn test_error_status_keeps_truncated_body() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "x".repeat(2000)) }),
        );
        let model = model_for(serve(app).await, Duration::from_secs(5));

        match model.complete("gpt-4o-mini", &prompt()).await {
            Err(ModelError::Status { status, body }) => {
                assert_eq!(status, 500);
                assert!(body.ends_with("..."));
                assert!(body.len() <= 503);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({"choices": []}))
            }),
        );
        let timeout = Duration::from_millis(100);
        let model = model_for(serve(app).await, timeout);

        let err = model.complete("gpt-4o-mini", &prompt()).await.unwrap_err();
        assert_eq!(err, ModelError::Timeout(timeout));
    }
}

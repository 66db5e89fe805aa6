mod core {
    pub mod app_state;
    pub mod http {
        pub mod response_envelope;
    }
}
mod error_handler;
mod middleware_layer {
    pub mod json_extractor;
}
mod routes {
    pub mod chat {
        pub mod chat_request;
        pub mod chat_route;
    }
    pub mod health_route;
}

pub use crate::core::app_state::{AppConfig, AppState, CorsOrigins};
pub use crate::error_handler::{AppError, AppResult};

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    middleware_layer::json_extractor::json_error_mapper,
    routes::{chat::chat_route::chat, health_route::health},
};

/// Builds the state from the environment, binds `API_ADDRESS` and serves
/// until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let state = Arc::new(AppState::from_env()?);
    let address = state.config.address.clone();

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .map_err(AppError::Bind)?;
    info!(%address, "listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// The application router with CORS, request tracing and the JSON rejection mapper.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.cors_origins);
    Router::new()
        .route("/", get(health))
        .route("/chat", post(chat))
        .layer(middleware::from_fn(json_error_mapper))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(origins: &CorsOrigins) -> CorsLayer {
    match origins {
        CorsOrigins::Any => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
        CorsOrigins::List(list) => {
            let allowed = list
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(v) => Some(v),
                    Err(_) => {
                        warn!(origin = %o, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect::<Vec<_>>();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(allowed))
                .allow_methods([Method::GET, Method::HEAD, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
        }
    }
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::{GenerationResult, TextGenerator};
    use contextor::{ChatPipeline, ContextorConfig};
    use rag_store::{Chunk, ChunkRetriever, RagError, normalize_country};
    use serde_json::{Value, json};
    use std::{future::Future, pin::Pin};

    /// Serves albania only, with a single chunk.
    struct AlbaniaRetriever;

    impl ChunkRetriever for AlbaniaRetriever {
        fn top_chunks<'a>(
            &'a self,
            _query: &'a str,
            country: &'a str,
            _top_k: usize,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Chunk>, RagError>> + Send + 'a>> {
            Box::pin(async move {
                match normalize_country(country)?.as_str() {
                    "albania" => Ok(vec![Chunk {
                        text: "Tirana is the capital.".into(),
                        source: Some("albania.pdf".into()),
                        score: 0.9,
                    }]),
                    other => Err(RagError::UnknownCountry(other.to_string())),
                }
            })
        }
    }

    /// Answers "Tirana." only when the prompt carries the retrieved chunk.
    struct ContextCheckingGenerator;

    impl TextGenerator for ContextCheckingGenerator {
        fn generate<'a>(
            &'a self,
            prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = GenerationResult> + Send + 'a>> {
            Box::pin(async move {
                if prompt.starts_with("Context:\nTirana is the capital.")
                    && prompt.ends_with("User: What is the capital?\nAssistant:")
                {
                    GenerationResult::Ok(" Tirana. ".into())
                } else {
                    GenerationResult::Ok("unexpected prompt".into())
                }
            })
        }
    }

    /// Records every prompt and answers "ok".
    #[derive(Default)]
    struct RecordingGenerator {
        prompts: std::sync::Mutex<Vec<String>>,
    }

    impl TextGenerator for RecordingGenerator {
        fn generate<'a>(
            &'a self,
            prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = GenerationResult> + Send + 'a>> {
            Box::pin(async move {
                self.prompts.lock().unwrap().push(prompt.to_string());
                GenerationResult::Ok("ok".into())
            })
        }
    }

    async fn spawn_app() -> String {
        spawn_with(Arc::new(ContextCheckingGenerator)).await
    }

    async fn spawn_with(generator: Arc<dyn TextGenerator>) -> String {
        let pipeline = ChatPipeline::new(Arc::new(AlbaniaRetriever), generator, ContextorConfig::default());
        let state = Arc::new(AppState::new(AppConfig::default(), pipeline));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn chat_answers_with_default_country() {
        let base = spawn_app().await;
        let res = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "question": "What is the capital?" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["answer"], "Tirana.");
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sources"][0]["source"], "albania.pdf");
    }

    #[tokio::test]
    async fn question_reaches_the_prompt_as_sent() {
        let generator = Arc::new(RecordingGenerator::default());
        let base = spawn_with(generator.clone()).await;
        let res = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "question": "  What is the capital?\n" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 200);

        let prompts = generator.prompts.lock().unwrap();
        assert!(
            prompts[0].ends_with("User:   What is the capital?\n\nAssistant:"),
            "{:?}",
            prompts[0]
        );
    }

    #[tokio::test]
    async fn unknown_country_is_reported_with_200() {
        let base = spawn_app().await;
        let body: Value = reqwest::Client::new()
            .post(format!("{base}/chat"))
            .json(&json!({ "question": "Q", "country": "atlantis", "history": [] }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body["status"], "retrieval_error");
        assert!(body["answer"].as_str().unwrap().contains("atlantis"));
        assert_eq!(body["sources"], json!([]));
    }

    #[tokio::test]
    async fn blank_question_and_bad_json_get_the_error_envelope() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let res = client
            .post(format!("{base}/chat"))
            .json(&json!({ "question": "   " }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");

        let res = client
            .post(format!("{base}/chat"))
            .json(&json!({ "country": "albania" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), 422);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNPROCESSABLE_ENTITY");
        assert_eq!(body["error"]["details"][0]["path"], "question");
    }

    #[tokio::test]
    async fn health_answers_get_and_head() {
        let base = spawn_app().await;
        let client = reqwest::Client::new();

        let res = client.get(format!("{base}/")).send().await.unwrap();
        assert_eq!(res.status(), 200);
        assert_eq!(res.json::<Value>().await.unwrap(), json!({ "status": "ok" }));

        let res = client.head(format!("{base}/")).send().await.unwrap();
        assert_eq!(res.status(), 200);
    }
}

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::AskdocConfig;
use crate::query::ProviderFactory;
use crate::ui::Icons;

pub mod pages;
pub mod routes;
pub mod session;

pub use session::SessionStore;

/// Server state
pub struct AppState {
    pub config: AskdocConfig,
    pub providers: Arc<dyn ProviderFactory>,
    pub sessions: SessionStore,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(config: AskdocConfig, providers: Arc<dyn ProviderFactory>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            config,
            providers,
            sessions: SessionStore::new(),
            http,
        })
    }
}

/// Build the router for both front-ends and the session API
pub fn router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(routes::form_page).post(routes::form_submit))
        .route("/dashboard", get(routes::dashboard_page))
        .route("/health", get(routes::health))
        .route("/api/examples", get(routes::examples))
        .route("/api/sessions", post(routes::create_session))
        .route("/api/sessions/{id}", axum::routing::delete(routes::delete_session))
        .route("/api/sessions/{id}/key", put(routes::set_key))
        .route("/api/sessions/{id}/upload", post(routes::upload_file))
        .route("/api/sessions/{id}/url", post(routes::upload_url))
        .route("/api/sessions/{id}/question", post(routes::answer_question))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AskdocConfig, providers: Arc<dyn ProviderFactory>) -> anyhow::Result<()> {
    let host: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((host, config.server.port));
    let ttl = Duration::from_secs(config.server.session_ttl_secs);

    let state = Arc::new(AppState::new(config, providers)?);

    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let pruned = sweeper.sessions.prune_idle(ttl).await;
            if pruned > 0 {
                tracing::info!("Dropped {} idle sessions", pruned);
            }
        }
    });

    let app = router(state);

    tracing::info!("Starting server on {}", addr);
    println!("{} Server running at http://{}", Icons::GLOBE, addr);
    println!("   Dashboard at http://{}/dashboard", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::testing::{EchoModel, KeywordEmbedder};
    use crate::query::{Embedder, LanguageModel};
    use crate::{Error, Result};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Keyword embedder and echo model; "sk-test" is the only valid key
    struct FakeProviders;

    fn check_key(api_key: Option<&str>) -> Result<()> {
        match api_key {
            Some("sk-test") => Ok(()),
            Some(_) => Err(Error::Provider { status: 401, message: "Incorrect API key provided".to_string() }),
            None => Err(Error::MissingApiKey),
        }
    }

    impl ProviderFactory for FakeProviders {
        fn embedder(&self, api_key: Option<&str>) -> Result<Arc<dyn Embedder>> {
            check_key(api_key)?;
            Ok(Arc::new(KeywordEmbedder::new(&["cats", "dogs", "fish"])))
        }

        fn language_model(&self, api_key: Option<&str>) -> Result<Arc<dyn LanguageModel>> {
            check_key(api_key)?;
            Ok(Arc::new(EchoModel))
        }
    }

    const PETS: &str = "cats purr loudly\ndogs bark often\nfish swim slowly";
    const BOUNDARY: &str = "X-ASKDOC-BOUNDARY";

    fn test_config() -> AskdocConfig {
        let mut config = AskdocConfig::default();
        config.chunking.chunk_size = 20;
        config.chunking.chunk_overlap = 0;
        config.top_k = 1;
        config
    }

    fn app_with(config: AskdocConfig) -> Router {
        let state = AppState::new(config, Arc::new(FakeProviders)).unwrap();
        router(Arc::new(state))
    }

    fn app() -> Router {
        app_with(test_config())
    }

    /// Serves `/pets.txt` and a 100 kB `/big.txt`
    async fn spawn_file_server() -> String {
        let files = Router::new()
            .route(
                "/pets.txt",
                get(|| async { ([(header::CONTENT_TYPE, "text/plain")], PETS) }),
            )
            .route(
                "/big.txt",
                get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "pets\n".repeat(20_000)) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, files).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn session_with_key(app: &Router) -> String {
        let id = new_session(app).await;
        let (status, _) = send(
            app,
            json_request("PUT", &format!("/api/sessions/{id}/key"), json!({"api_key": "sk-test"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        id
    }

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str)>) -> String {
        let mut body = String::new();
        for (name, value) in fields {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        if let Some((file_name, content)) = file {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));
        body
    }

    fn multipart_request(uri: &str, body: String) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: &str, uri: &str, payload: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(payload.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).to_string())
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send(app, Request::post("/api/sessions").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::CREATED);
        let value: Value = serde_json::from_str(&body).unwrap();
        value["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_pages_render() {
        let app = app();
        let (status, body) = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Ask your PDF"));

        let (status, body) = send(&app, Request::get("/dashboard").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Who is the author of the file?"));

        let (status, body) = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_form_submit_answers() {
        let app = app();
        let body = multipart_body(
            &[("api_key", "sk-test"), ("question", "what do dogs do?")],
            Some(("pets.txt", PETS)),
        );
        let (status, html) = send(&app, multipart_request("/", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("class=\"answer\""));
        assert!(html.contains("dogs bark often"));
        assert!(html.contains("Answer from pets.txt"));
    }

    #[tokio::test]
    async fn test_form_submit_requires_key() {
        let app = app();
        let body = multipart_body(&[("question", "anything")], Some(("pets.txt", PETS)));
        let (status, html) = send(&app, multipart_request("/", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Enter your OpenAI API key"));
        assert!(!html.contains("class=\"answer\""));
    }

    #[tokio::test]
    async fn test_form_submit_reports_bad_key() {
        let app = app();
        let body = multipart_body(
            &[("api_key", "sk-wrong"), ("question", "what do dogs do?")],
            Some(("pets.txt", PETS)),
        );
        let (status, html) = send(&app, multipart_request("/", body)).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(html.contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn test_dashboard_flow() {
        let app = app();
        let id = new_session(&app).await;

        // no file yet
        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{id}/question"), json!({"question": "hi"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["answer"], NO_DOCUMENT);

        let (status, _) = send(
            &app,
            json_request("PUT", &format!("/api/sessions/{id}/key"), json!({"api_key": "sk-test"})),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let body = multipart_body(&[], Some(("pets.txt", PETS)));
        let (status, body) = send(&app, multipart_request(&format!("/api/sessions/{id}/upload"), body)).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["file_name"], "pets.txt");
        assert_eq!(value["chunks"], 3);

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{id}/question"), json!({"question": "and the fish?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert!(value["answer"].as_str().unwrap().contains("fish swim slowly"));
        assert_eq!(value["sources"].as_array().unwrap().len(), 1);
    }

    const NO_DOCUMENT: &str = crate::query::NO_DOCUMENT_ANSWER;

    #[tokio::test]
    async fn test_upload_without_key_is_unauthorized() {
        let app = app();
        let id = new_session(&app).await;

        let body = multipart_body(&[], Some(("pets.txt", PETS)));
        let (status, body) = send(&app, multipart_request(&format!("/api/sessions/{id}/upload"), body)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("API key"));
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_file() {
        let app = app();
        let id = new_session(&app).await;
        send(
            &app,
            json_request("PUT", &format!("/api/sessions/{id}/key"), json!({"api_key": "sk-test"})),
        )
        .await;

        let body = multipart_body(&[], Some(("old.doc", "binary")));
        let (status, _) = send(&app, multipart_request(&format!("/api/sessions/{id}/upload"), body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_url_is_bad_request() {
        let app = app();
        let id = new_session(&app).await;

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{id}/url"), json!({"url": "not a url"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Please enter a valid URL"));
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        let app = app();
        let id = uuid::Uuid::new_v4();

        let (status, _) = send(
            &app,
            json_request("PUT", &format!("/api/sessions/{id}/key"), json!({"api_key": "sk-test"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &app,
            Request::delete(format!("/api/sessions/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_url_loads_document() {
        let base = spawn_file_server().await;
        let app = app();
        let id = session_with_key(&app).await;

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{id}/url"), json!({"url": format!("{base}/pets.txt")})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["file_name"], "pets.txt");
        assert_eq!(value["chunks"], 3);

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{id}/question"), json!({"question": "what do cats do?"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_str(&body).unwrap();
        assert!(value["answer"].as_str().unwrap().contains("cats purr loudly"));
    }

    #[tokio::test]
    async fn test_unreachable_url_is_bad_request() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let app = app();
        let id = session_with_key(&app).await;

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{id}/url"), json!({"url": format!("http://{addr}/paper.pdf")})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Could not download your file"));
    }

    #[tokio::test]
    async fn test_url_download_respects_size_limit() {
        let base = spawn_file_server().await;
        let mut config = test_config();
        config.server.max_upload_bytes = 1024;
        let app = app_with(config);
        let id = session_with_key(&app).await;

        let (status, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{id}/url"), json!({"url": format!("{base}/big.txt")})),
        )
        .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body.contains("1024 byte limit"));
    }

    #[tokio::test]
    async fn test_upload_respects_size_limit() {
        let mut config = test_config();
        config.server.max_upload_bytes = 1024;
        let app = app_with(config);
        let id = session_with_key(&app).await;

        let big = "dogs bark\n".repeat(500);
        let body = multipart_body(&[], Some(("big.txt", big.as_str())));
        let (status, _) = send(&app, multipart_request(&format!("/api/sessions/{id}/upload"), body)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        // the session keeps no document
        let (_, body) = send(
            &app,
            json_request("POST", &format!("/api/sessions/{id}/question"), json!({"question": "dogs?"})),
        )
        .await;
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["answer"], NO_DOCUMENT);
    }
}

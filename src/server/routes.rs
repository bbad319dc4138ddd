use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::document::Document;
use crate::loader;
use crate::query::{build_knowledge_base, KnowledgeBase, ScoredChunk, StuffChain, NO_DOCUMENT_ANSWER};
use crate::server::pages::{self, FormView, EXAMPLE_QUESTIONS};
use crate::server::AppState;
use crate::Error;

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// Map a pipeline error to a status and JSON body
pub fn error_response(err: Error) -> ApiError {
    let status = match &err {
        Error::InvalidUrl(_)
        | Error::DownloadStatus(_)
        | Error::Download(_)
        | Error::UnsupportedFile(_)
        | Error::Extraction(_)
        | Error::EmptyDocument(_) => StatusCode::BAD_REQUEST,
        Error::TooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        Error::MissingApiKey => StatusCode::UNAUTHORIZED,
        Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
        Error::Provider { .. } | Error::Http(_) | Error::Embedding(_) => StatusCode::BAD_GATEWAY,
        Error::Config(_) | Error::Storage(_) | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", err);
    } else {
        tracing::warn!("Request rejected: {}", err);
    }

    (status, Json(ErrorResponse { error: err.to_string() }))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message.into() }))
}

#[derive(Deserialize)]
pub struct KeyParams {
    pub api_key: String,
}

#[derive(Deserialize)]
pub struct UrlParams {
    pub url: String,
}

#[derive(Deserialize)]
pub struct QuestionParams {
    pub question: String,
}

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

#[derive(Serialize)]
pub struct FileLoaded {
    pub file_name: String,
    pub chunks: usize,
}

#[derive(Serialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub sources: Vec<ScoredChunk>,
}

/// Parts of a multipart submit
#[derive(Default)]
struct UploadForm {
    api_key: Option<String>,
    question: Option<String>,
    file: Option<UploadedFile>,
}

struct UploadedFile {
    file_name: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    (err.status(), Json(ErrorResponse { error: err.body_text() }))
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(multipart_error)?;
                // browsers send an empty part when no file was picked
                if !file_name.is_empty() || !bytes.is_empty() {
                    form.file = Some(UploadedFile {
                        file_name: if file_name.is_empty() { "upload".to_string() } else { file_name },
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "api_key" => form.api_key = Some(field.text().await.map_err(multipart_error)?),
            "question" => form.question = Some(field.text().await.map_err(multipart_error)?),
            other => tracing::debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(form)
}

/// Extract, chunk and embed an uploaded or downloaded document
async fn index_document(
    state: &AppState,
    api_key: Option<&str>,
    document: &Document,
) -> crate::Result<KnowledgeBase> {
    let splitter = state.config.chunking.splitter()?;
    let embedder = state.providers.embedder(api_key)?;
    build_knowledge_base(document, &splitter, embedder.as_ref()).await
}

async fn ask(
    state: &AppState,
    api_key: Option<&str>,
    kb: &KnowledgeBase,
    question: &str,
) -> crate::Result<crate::query::Answer> {
    let embedder = state.providers.embedder(api_key)?;
    let llm = state.providers.language_model(api_key)?;
    StuffChain::new(state.config.top_k)
        .answer(kb, question, embedder.as_ref(), llm.as_ref())
        .await
}

// ========== Single-page form ==========

pub async fn form_page() -> Html<String> {
    Html(pages::form_page(&FormView::default()))
}

/// Run the whole pipeline for one submit and re-render the form
pub async fn form_submit(State(state): State<Arc<AppState>>, multipart: Multipart) -> (StatusCode, Html<String>) {
    let form = match read_multipart(multipart).await {
        Ok(form) => form,
        Err((status, Json(body))) => {
            let view = FormView { error: Some(body.error), ..FormView::default() };
            return (status, Html(pages::form_page(&view)));
        }
    };

    let mut view = FormView {
        api_key: form.api_key.clone().unwrap_or_default(),
        question: form.question.clone().unwrap_or_default(),
        ..FormView::default()
    };

    let api_key = Some(view.api_key.trim()).filter(|k| !k.is_empty());
    let question = view.question.trim().to_string();

    let missing = if api_key.is_none() {
        Some("Enter your OpenAI API key")
    } else if form.file.is_none() {
        Some("Upload your PDF")
    } else if question.is_empty() {
        Some("Ask a question about your PDF")
    } else {
        None
    };
    if let Some(message) = missing {
        view.error = Some(message.to_string());
        return (StatusCode::OK, Html(pages::form_page(&view)));
    }

    let Some(file) = form.file else {
        return (StatusCode::OK, Html(pages::form_page(&view)));
    };
    view.file_name = Some(file.file_name.clone());

    let result = async {
        let document = loader::load_upload(&file.file_name, file.content_type.as_deref(), &file.bytes)?;
        let kb = index_document(&state, api_key, &document).await?;
        ask(&state, api_key, &kb, &question).await
    }
    .await;

    let status = match result {
        Ok(answer) => {
            view.answer = Some(answer.text);
            StatusCode::OK
        }
        Err(err) => {
            let (status, Json(body)) = error_response(err);
            view.error = Some(body.error);
            status
        }
    };

    (status, Html(pages::form_page(&view)))
}

// ========== Dashboard ==========

pub async fn dashboard_page() -> Html<String> {
    Html(pages::dashboard_page())
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub async fn examples() -> Json<&'static [&'static str]> {
    Json(EXAMPLE_QUESTIONS)
}

pub async fn create_session(State(state): State<Arc<AppState>>) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

pub async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> StatusCode {
    if state.sessions.remove(id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn set_key(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(params): Json<KeyParams>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .set_api_key(id, &params.api_key)
        .await
        .map_err(error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<FileLoaded> {
    let session = state.sessions.get(id).await.map_err(error_response)?;
    let form = read_multipart(multipart).await?;
    let file = form.file.ok_or_else(|| bad_request("Missing file field"))?;

    let document = loader::load_upload(&file.file_name, file.content_type.as_deref(), &file.bytes)
        .map_err(error_response)?;
    let kb = index_document(&state, session.api_key.as_deref(), &document)
        .await
        .map_err(error_response)?;

    let loaded = FileLoaded {
        file_name: file.file_name.clone(),
        chunks: kb.len(),
    };
    state
        .sessions
        .set_knowledge_base(id, &file.file_name, kb)
        .await
        .map_err(error_response)?;

    Ok(Json(loaded))
}

pub async fn upload_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(params): Json<UrlParams>,
) -> ApiResult<FileLoaded> {
    let session = state.sessions.get(id).await.map_err(error_response)?;
    let (fetched, document) = loader::load_url(&state.http, &params.url, state.config.server.max_upload_bytes)
        .await
        .map_err(error_response)?;
    let kb = index_document(&state, session.api_key.as_deref(), &document)
        .await
        .map_err(error_response)?;

    let loaded = FileLoaded {
        file_name: fetched.file_name.clone(),
        chunks: kb.len(),
    };
    state
        .sessions
        .set_knowledge_base(id, &fetched.file_name, kb)
        .await
        .map_err(error_response)?;

    Ok(Json(loaded))
}

pub async fn answer_question(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(params): Json<QuestionParams>,
) -> ApiResult<AnswerResponse> {
    let session = state.sessions.get(id).await.map_err(error_response)?;

    let Some(kb) = session.knowledge_base else {
        return Ok(Json(AnswerResponse {
            answer: NO_DOCUMENT_ANSWER.to_string(),
            sources: vec![],
        }));
    };

    let question = params.question.trim();
    if question.is_empty() {
        return Err(bad_request("Question is empty"));
    }

    let answer = ask(&state, session.api_key.as_deref(), &kb, question)
        .await
        .map_err(error_response)?;

    Ok(Json(AnswerResponse {
        answer: answer.text,
        sources: answer.sources,
    }))
}

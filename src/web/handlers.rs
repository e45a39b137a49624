//! HTTP handlers for the chat endpoints.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;
use axum::Json;
use tokio::sync::Mutex;

use super::api::{ChatRequest, ChatResponse, TeachRequest, TAUGHT_RESPONSE};
use super::error::ServerError;
use crate::chat::{Reply, Tutor};
use crate::knowledge::{is_meaningful, normalize};

/// Chat page served at `GET /`.
pub const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Knowledge file, reloaded on every request.
    pub knowledge_file: Arc<PathBuf>,
    /// Serializes load-mutate-save on the knowledge file.
    pub file_lock: Arc<Mutex<()>>,
}

impl AppState {
    #[must_use]
    pub fn new(knowledge_file: PathBuf) -> Self {
        Self {
            knowledge_file: Arc::new(knowledge_file),
            file_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Run `f` with a freshly loaded tutor while holding the file lock.
    ///
    /// The guard moves into the blocking task, so the lock is held until the
    /// file work finishes even if the request future is dropped first.
    async fn with_tutor<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        T: Send + 'static,
        F: FnOnce(&mut Tutor) -> Result<T, ServerError> + Send + 'static,
    {
        let guard = Arc::clone(&self.file_lock).lock_owned().await;
        let path = PathBuf::clone(&self.knowledge_file);

        tokio::task::spawn_blocking(move || -> Result<T, ServerError> {
            let _guard = guard;
            let mut tutor = Tutor::open(&path)?;
            f(&mut tutor)
        })
        .await
        .map_err(|_| ServerError::TaskCancelled)?
    }
}

/// GET / - The chat page.
pub async fn get_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// POST /chat - Answer one question from the knowledge base.
pub async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    let reply = state
        .with_tutor(move |tutor| Ok(tutor.respond(&request.user_input)))
        .await?;

    let response = match reply {
        Reply::Answer { answer, .. } => ChatResponse::new(answer),
        Reply::Empty | Reply::Unknown { .. } => ChatResponse::no_match(),
    };
    Ok(Json(response))
}

/// POST /teach - Learn a new question/answer pair.
pub async fn post_teach(
    State(state): State<AppState>,
    Json(request): Json<TeachRequest>,
) -> Result<Json<ChatResponse>, ServerError> {
    if !is_meaningful(&request.question) {
        return Err(ServerError::BadRequest(
            "question has no letters or digits".to_string(),
        ));
    }

    let report = state
        .with_tutor(move |tutor| {
            let question = normalize(&request.question);
            Ok(tutor.teach(&question, &request.answer)?)
        })
        .await?;

    tracing::info!(entries = report.entries, backup = %report.backup_path.display(), "Learned over HTTP");
    Ok(Json(ChatResponse::new(TAUGHT_RESPONSE)))
}

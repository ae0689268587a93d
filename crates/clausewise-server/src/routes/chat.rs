//! Contract analysis routes and the transcript views behind them.

use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use clausewise_core::DocumentFormat;
use clausewise_runtime::{AnalysisOutcome, InputMode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{api_error, caller, error_body, ApiError};
use crate::state::AppState;
use crate::transcripts::{ChatRecord, TranscriptMessage, TranscriptStore};

const DEFAULT_TITLE: &str = "Contract Analysis";
const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 100;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai-chat/analyze-contract", post(analyze_contract))
        .route("/ai-chat/chats", get(list_chats))
        .route("/ai-chat/chats/{id}", get(get_chat).delete(delete_chat))
        .route("/ai-chat/status", get(get_status))
}

// ---------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------

struct Upload {
    filename: Option<String>,
    format: DocumentFormat,
    bytes: Vec<u8>,
}

#[derive(Default)]
struct AnalyzeForm {
    upload: Option<Upload>,
    user_text: Option<String>,
    chat_id: Option<String>,
    save_to_chat: bool,
}

fn malformed(e: MultipartError) -> ApiError {
    error_body(StatusCode::BAD_REQUEST, format!("malformed multipart request: {}", e))
}

/// A part that cannot be parsed or read fails the whole request.
async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, ApiError> {
    let mut form = AnalyzeForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().map(|s| s.to_string()).filter(|s| !s.is_empty());
                let content_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(malformed)?;
                // Browsers send an empty part when no file was picked.
                if filename.is_none() && bytes.is_empty() {
                    continue;
                }
                let format = detect_format(content_type.as_deref(), filename.as_deref()).ok_or_else(|| {
                    error_body(
                        StatusCode::BAD_REQUEST,
                        "Unsupported file type. Please upload a PDF or plain-text contract.",
                    )
                })?;
                form.upload = Some(Upload {
                    filename,
                    format,
                    bytes: bytes.to_vec(),
                });
            }
            "user_text" => {
                let value = field.text().await.map_err(malformed)?;
                form.user_text = Some(value).filter(|t| !t.trim().is_empty());
            }
            "chat_id" => {
                let value = field.text().await.map_err(malformed)?;
                form.chat_id = Some(value).filter(|t| !t.trim().is_empty());
            }
            "save_to_chat" => {
                let value = field.text().await.map_err(malformed)?;
                form.save_to_chat = matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes");
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    Ok(form)
}

/// MIME type first, then the file extension.
fn detect_format(content_type: Option<&str>, filename: Option<&str>) -> Option<DocumentFormat> {
    content_type.and_then(DocumentFormat::from_mime).or_else(|| {
        filename
            .and_then(|f| std::path::Path::new(f).extension())
            .and_then(|e| e.to_str())
            .and_then(DocumentFormat::from_extension)
    })
}

async fn analyze_contract(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller(&headers)?;
    let form = read_form(multipart).await?;

    let chat_id = match form.chat_id.as_deref() {
        Some(raw) => {
            let id = Uuid::parse_str(raw.trim())
                .map_err(|_| error_body(StatusCode::BAD_REQUEST, "chat_id is not a valid id"))?;
            if state.transcripts.get(id, &user_id).is_none() {
                return Err(error_body(StatusCode::NOT_FOUND, "Chat not found"));
            }
            Some(id)
        }
        _ => None,
    };

    let filename = form.upload.as_ref().and_then(|u| u.filename.clone());
    let stored_document = chat_id.and_then(|id| state.transcripts.stored_contract(id, &user_id));
    let input = InputMode::from_parts(
        form.upload.map(|u| (u.bytes, u.format)),
        form.user_text.clone(),
        chat_id.is_some(),
        stored_document,
    );

    let outcome = state.analyzer.analyze(input).await.map_err(|e| {
        warn!("Contract analysis failed: {}", e);
        api_error(e)
    })?;

    let user_message = form
        .user_text
        .clone()
        .or_else(|| filename.as_ref().map(|f| format!("Uploaded: {}", f)))
        .unwrap_or_else(|| "Contract analysis request".to_string());
    let turns = vec![
        TranscriptMessage::new("user", user_message, None),
        TranscriptMessage::new(
            "assistant",
            outcome.result.main_response.clone(),
            outcome.result.reasoning.clone(),
        ),
    ];

    // An explicit save always starts a new chat, even from an existing one.
    let target = match chat_id {
        _ if form.save_to_chat => SaveTarget::NewChat {
            title: filename.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        },
        Some(id) => SaveTarget::Existing(id),
        None => SaveTarget::Nothing,
    };
    let saved_chat = save_turns(&state.transcripts, &user_id, target, turns, &outcome)?;

    Ok(Json(serde_json::json!({
        "analysis": outcome.result.formatted(),
        "mainResponse": outcome.result.main_response,
        "reasoning": outcome.result.reasoning,
        "wasTruncated": outcome.result.was_truncated,
        "extractedText": outcome.extracted_text,
        "chatId": saved_chat.map(|id| id.to_string()),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

enum SaveTarget {
    Nothing,
    Existing(Uuid),
    NewChat { title: String },
}

/// Record the exchange; the chat id returned is one that was actually written.
fn save_turns(
    transcripts: &TranscriptStore,
    user_id: &str,
    target: SaveTarget,
    turns: Vec<TranscriptMessage>,
    outcome: &AnalysisOutcome,
) -> Result<Option<Uuid>, ApiError> {
    match target {
        SaveTarget::Nothing => Ok(None),
        SaveTarget::Existing(id) => {
            if !transcripts.append(id, user_id, turns, outcome.extracted_text.clone()) {
                warn!("Chat {} disappeared before the analysis was saved", id);
                return Err(error_body(StatusCode::NOT_FOUND, "Chat not found"));
            }
            Ok(Some(id))
        }
        SaveTarget::NewChat { title } => {
            let id = transcripts.create(user_id, Some(title), Some(outcome.document_text.clone()), turns);
            info!("Saved analysis {} to chat {}", outcome.fingerprint, id);
            Ok(Some(id))
        }
    }
}

// ---------------------------------------------------------------
// Transcripts
// ---------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListParams {
    skip: Option<usize>,
    limit: Option<usize>,
}

fn chat_summary(chat: &ChatRecord) -> serde_json::Value {
    serde_json::json!({
        "id": chat.id,
        "title": chat.title,
        "messageCount": chat.messages.len(),
        "hasContract": chat.contract_text.is_some(),
        "createdAt": chat.created_at.to_rfc3339(),
        "updatedAt": chat.updated_at.to_rfc3339(),
    })
}

async fn list_chats(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller(&headers)?;
    let skip = params.skip.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let (chats, total) = state.transcripts.list(&user_id, skip, limit);
    Ok(Json(serde_json::json!({
        "chats": chats.iter().map(chat_summary).collect::<Vec<_>>(),
        "total": total,
    })))
}

async fn get_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller(&headers)?;
    let chat = state
        .transcripts
        .get(id, &user_id)
        .ok_or_else(|| error_body(StatusCode::NOT_FOUND, "Chat not found"))?;

    Ok(Json(serde_json::json!({
        "id": chat.id,
        "title": chat.title,
        "contractText": chat.contract_text,
        "createdAt": chat.created_at.to_rfc3339(),
        "updatedAt": chat.updated_at.to_rfc3339(),
        "messages": chat.messages,
    })))
}

async fn delete_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = caller(&headers)?;
    if state.transcripts.delete(id, &user_id) {
        info!("Deleted chat {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(error_body(StatusCode::NOT_FOUND, "Chat not found"))
    }
}

// ---------------------------------------------------------------
// Status
// ---------------------------------------------------------------

async fn get_status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let status = state.llm_config.to_status();
    Json(serde_json::json!({
        "llmAvailable": status.llm_available,
        "llmProvider": status.llm_provider,
        "defaultModel": status.default_model,
        "activeModel": state.analyzer.model(),
        "availableModels": status.available_models,
        "preferredProvider": status.preferred_provider,
        "groqConfigured": status.groq_configured,
        "openaiConfigured": status.openai_configured,
        "anthropicConfigured": status.anthropic_configured,
    }))
}

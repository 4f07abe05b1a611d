use super::AppState;
use super::render;
use super::sessions::{ResolvedSession, session_id_from_headers};
use crate::errors::AnalysisError;
use axum::Json;
use axum::extract::{Form, Multipart, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{Value, json};

/// Form field of `POST /credentials`.
#[derive(Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    model_api_key: String,
}

const UPLOAD_FIELD: &str = "image";

fn with_cookie(mut response: Response, resolved: &ResolvedSession) -> Response {
    if let Some(cookie) = resolved.set_cookie() {
        response.headers_mut().append(header::SET_COOKIE, cookie);
    }
    response
}

fn see_other(resolved: &ResolvedSession) -> Response {
    with_cookie(Redirect::to("/").into_response(), resolved)
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> ResolvedSession {
    state
        .sessions()
        .resolve(session_id_from_headers(headers))
        .await
}

/// GET /
pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let resolved = resolve(&state, &headers).await;
    // The lock is held for the whole analysis
    let html = match resolved.session.try_lock() {
        Ok(session) => render::page(&session),
        Err(_) => render::busy_page(),
    };
    with_cookie(Html(html).into_response(), &resolved)
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "sessions": state.sessions().len().await,
        "search_configured": state.config().has_search_key(),
    }))
}

/// POST /credentials
pub async fn set_credentials(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CredentialsForm>,
) -> Response {
    let resolved = resolve(&state, &headers).await;
    {
        let mut session = resolved.session.lock().await;
        if let Err(e) = session.set_model_key(&form.model_api_key, state.agents()) {
            tracing::warn!("Session {}: {e}", resolved.id);
        }
    }
    see_other(&resolved)
}

/// POST /credentials/reset
pub async fn reset_credentials(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let resolved = resolve(&state, &headers).await;
    resolved.session.lock().await.clear_model_key();
    see_other(&resolved)
}

/// POST /upload
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let resolved = resolve(&state, &headers).await;
    // Read the body before taking the session lock
    let received = read_upload(multipart).await;

    {
        let mut session = resolved.session.lock().await;
        match received {
            Ok((file_name, bytes)) => {
                tracing::info!(
                    "Session {}: received '{file_name}' ({} bytes)",
                    resolved.id,
                    bytes.len()
                );
                // Rejections are logged and kept as the session notice
                let _ = session.upload(&file_name, bytes, state.config().preview_width);
            }
            Err(e) => {
                tracing::warn!("Session {}: {e}", resolved.id);
                session.reject_upload(&e);
            }
        }
    }
    see_other(&resolved)
}

async fn read_upload(mut multipart: Multipart) -> Result<(String, Bytes), AnalysisError> {
    let unreadable = |e: axum::extract::multipart::MultipartError| {
        AnalysisError::UploadDecode(format!("the upload could not be read ({e})"))
    };

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            break;
        }
        let bytes = field.bytes().await.map_err(unreadable)?;
        return Ok((file_name, bytes));
    }

    Err(AnalysisError::UploadDecode("no file was selected".to_string()))
}

/// POST /image/remove
pub async fn remove_image(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let resolved = resolve(&state, &headers).await;
    resolved.session.lock().await.remove_image();
    see_other(&resolved)
}

/// POST /analyze
pub async fn analyze(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let resolved = resolve(&state, &headers).await;
    {
        let mut session = resolved.session.lock().await;
        match session.analyze(state.search(), state.analysis_settings()).await {
            Ok(()) => tracing::info!("Session {}: analysis complete", resolved.id),
            Err(e) if e.is_blocking() => {
                tracing::info!("Session {}: analysis not started: {e}", resolved.id);
            }
            // Already logged by the session
            Err(_) => {}
        }
    }
    see_other(&resolved)
}

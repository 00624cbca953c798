//! Admin upload endpoint
//!
//! `POST /api/upload` takes a multipart form with `knowledgeFile` (.csv only)
//! and `password`, and replaces the menu index with the file's rows.

use std::path::{Path, PathBuf};

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use bytes::Bytes;
use tracing::{debug, error, info, warn};

use crate::agents::IngestionAgent;
use crate::embeddings::SourceKind;
use crate::middleware::verify_admin_password;
use crate::models::{AppState, UploadResponse};
use crate::types::{AppError, AppResult};

pub const FILE_FIELD: &str = "knowledgeFile";
pub const PASSWORD_FIELD: &str = "password";

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/upload", post(upload_file))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

struct AcceptedFile {
    original_name: String,
    bytes: Bytes,
}

#[derive(Default)]
struct UploadForm {
    password: Option<String>,
    file: Option<AcceptedFile>,
    rejected: Option<String>,
}

pub fn is_csv_filename(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Read the form. A file field with the wrong extension is dropped unread.
async fn read_form(multipart: &mut Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    let malformed = |e: axum::extract::multipart::MultipartError| {
        AppError::InvalidRequest(format!("Malformed upload: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(PASSWORD_FIELD) => {
                form.password = Some(field.text().await.map_err(malformed)?);
            }
            Some(FILE_FIELD) => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                if !is_csv_filename(&file_name) {
                    warn!(file_name = %file_name, "Rejected upload: only .csv files are allowed");
                    form.rejected = Some(file_name);
                    continue;
                }
                let bytes = field.bytes().await.map_err(malformed)?;
                form.file = Some(AcceptedFile {
                    original_name: file_name,
                    bytes,
                });
            }
            other => debug!(field = ?other, "Ignoring unexpected form field"),
        }
    }
    Ok(form)
}

fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.csv");
    base.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect()
}

async fn persist_upload(dir: &str, file: &AcceptedFile) -> AppResult<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = Path::new(dir).join(format!(
        "{}-{}",
        uuid::Uuid::new_v4(),
        sanitize_filename(&file.original_name)
    ));
    tokio::fs::write(&path, &file.bytes).await?;
    debug!(path = %path.display(), size = file.bytes.len(), "Stored uploaded file");
    Ok(path)
}

async fn remove_upload(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(path = %path.display(), "Cleaned up uploaded file"),
        Err(e) => error!(path = %path.display(), error = %e, "Error deleting uploaded file"),
    }
}

async fn upload_file(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let form = match read_form(&mut multipart).await {
        Ok(form) => form,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = verify_admin_password(form.password.as_deref(), &state.config.auth.admin_password) {
        warn!("Upload rejected: bad admin password");
        return e.into_response();
    }

    let file = match form.file {
        Some(file) => file,
        None => {
            let message = if form.rejected.is_some() {
                "Upload failed. Only .csv files are allowed."
            } else {
                "No file uploaded, or file type was not .csv."
            };
            return AppError::InvalidRequest(message.to_string()).into_response();
        }
    };

    info!(file_name = %file.original_name, size = file.bytes.len(), "File upload request received");

    let path = match persist_upload(&state.config.server.upload_dir, &file).await {
        Ok(path) => path,
        Err(e) => {
            error!(error = %e, "Failed to store uploaded file");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "An unexpected error occurred.",
                    "details": e.to_string()
                })),
            )
                .into_response();
        }
    };

    let agent = IngestionAgent::new(state.embedder.as_ref(), state.store.as_ref());
    let result = agent.ingest_file(&path, SourceKind::Csv).await;
    remove_upload(&path).await;

    match result {
        Ok(report) => Json(UploadResponse {
            message: "File ingested successfully!".to_string(),
            details: report.message().to_string(),
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "CSV ingestion failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Ingestion failed.",
                    "details": "CSV Ingestion process failed."
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_csv_filename() {
        assert!(is_csv_filename("menu.csv"));
        assert!(is_csv_filename("MENU.CSV"));
        assert!(!is_csv_filename("menu.pdf"));
        assert!(!is_csv_filename("menu.csv.exe"));
        assert!(!is_csv_filename("csv"));
        assert!(!is_csv_filename(""));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/menu.csv"), "menu.csv");
        assert_eq!(sanitize_filename("daftar menu (1).csv"), "daftar_menu__1_.csv");
    }
}

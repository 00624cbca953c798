use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::{error, info};

use crate::agents::DataExporter;
use crate::models::{AppState, DataResponse};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/data", get(get_data))
        .with_state(state)
}

/// GET /api/data - Metadata of every record in the index
async fn get_data(State(state): State<AppState>) -> Response {
    info!("Fetching all records from the vector index");

    match DataExporter::new(state.store.as_ref()).export_metadata().await {
        Ok(data) if data.is_empty() => {
            info!("No records found in the index");
            Json(DataResponse {
                message: "No records found in the index.".to_string(),
                data,
            })
            .into_response()
        }
        Ok(data) => {
            info!(count = data.len(), "Successfully fetched all records");
            Json(DataResponse {
                message: format!("Successfully fetched {} records.", data.len()),
                data,
            })
            .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch all data");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to fetch data from the database." })),
            )
                .into_response()
        }
    }
}

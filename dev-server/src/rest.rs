//! # REST Handlers
//!
//! One handler per endpoint of the budget service API. Bodies use the wire
//! types from `shared`, so the dashboard's client decodes them unchanged.

use axum::{
    extract::{Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use shared::{
    AccountFormat, BudgetMap, ErrorResponse, MonthKey, SuccessResponse, UpdateCategoryRequest,
    UploadResponse,
};
use tracing::{info, warn};

use crate::DevState;

#[derive(Debug, Deserialize)]
pub struct MonthQuery {
    pub month: MonthKey,
}

fn error_body(message: impl Into<String>) -> Json<ErrorResponse> {
    Json(ErrorResponse {
        error: Some(message.into()),
        ..ErrorResponse::default()
    })
}

/// Reject requests without the configured bearer token
pub async fn require_token(State(state): State<DevState>, request: Request, next: Next) -> Response {
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .is_some_and(|token| token == state.token());

    if !authorized {
        warn!("{} {} - rejected: missing or invalid token", request.method(), request.uri().path());
        return (StatusCode::UNAUTHORIZED, error_body("Invalid or missing token")).into_response();
    }
    next.run(request).await
}

pub async fn get_summary(State(state): State<DevState>, Query(query): Query<MonthQuery>) -> impl IntoResponse {
    info!("GET /api/summary - month: {}", query.month);
    match state.ledger().summary(&query.month) {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => {
            warn!("Summary for {} failed: {}", query.month, e);
            (StatusCode::UNPROCESSABLE_ENTITY, error_body(e.to_string())).into_response()
        }
    }
}

pub async fn list_transactions(
    State(state): State<DevState>,
    Query(query): Query<MonthQuery>,
) -> impl IntoResponse {
    info!("GET /api/transactions - month: {}", query.month);
    Json(state.ledger().transactions_in(&query.month))
}

pub async fn get_budgets(State(state): State<DevState>) -> impl IntoResponse {
    info!("GET /api/budgets");
    Json(state.ledger().budgets().clone())
}

pub async fn save_budgets(State(state): State<DevState>, Json(budgets): Json<BudgetMap>) -> impl IntoResponse {
    info!("PUT /api/budgets");
    match state.ledger().set_budgets(budgets) {
        Ok(()) => (StatusCode::OK, Json(SuccessResponse::ok())).into_response(),
        Err(e) => {
            warn!("Rejected budgets: {}", e);
            (StatusCode::BAD_REQUEST, error_body(e.to_string())).into_response()
        }
    }
}

pub async fn list_months(State(state): State<DevState>) -> impl IntoResponse {
    info!("GET /api/months");
    Json(state.ledger().months())
}

pub async fn update_category(
    State(state): State<DevState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCategoryRequest>,
) -> impl IntoResponse {
    info!("PUT /api/transactions/{}/category - category: {}", id, request.category);
    match state.ledger().set_category(id, request.category) {
        Ok(()) => (StatusCode::OK, Json(SuccessResponse::ok())).into_response(),
        Err(e) => {
            warn!("Category update failed: {}", e);
            (StatusCode::NOT_FOUND, error_body(e.to_string())).into_response()
        }
    }
}

fn upload_failed(message: impl Into<String>) -> Response {
    let body = UploadResponse {
        success: false,
        total_transactions: None,
        new_transactions: None,
        error: Some(message.into()),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

/// Accepts multipart fields `file` and `accountType`.
///
/// Every account format is read with the generic
/// `date,description,amount[,category]` layout.
pub async fn upload_csv(State(state): State<DevState>, mut multipart: Multipart) -> Response {
    let mut contents = None;
    let mut format = AccountFormat::Generic;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return upload_failed(format!("Malformed upload: {}", e)),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => match field.bytes().await {
                Ok(bytes) => contents = Some(bytes),
                Err(e) => return upload_failed(format!("Failed to read file: {}", e)),
            },
            Some("accountType") => {
                let raw = match field.text().await {
                    Ok(raw) => raw,
                    Err(e) => return upload_failed(format!("Failed to read account type: {}", e)),
                };
                format = match raw.parse() {
                    Ok(format) => format,
                    Err(e) => return upload_failed(e),
                };
            }
            _ => {}
        }
    }

    let Some(contents) = contents else {
        return upload_failed("No file uploaded");
    };
    info!("POST /api/upload-csv - {} bytes, format: {}", contents.len(), format);

    match state.ledger().import_statement(&contents, format) {
        Ok(stats) => Json(UploadResponse {
            success: true,
            total_transactions: Some(stats.total),
            new_transactions: Some(stats.new),
            error: None,
        })
        .into_response(),
        Err(e) => {
            warn!("Statement import failed: {}", e);
            upload_failed(e.to_string())
        }
    }
}

//! # API Client
//!
//! `reqwest` implementation of [`RemoteDataSource`] for the budget service.
//!
//! ## Endpoints
//!
//! | operation                     | request                              |
//! |-------------------------------|--------------------------------------|
//! | `fetch_summary`               | `GET /summary?month=YYYY-MM`         |
//! | `fetch_transactions`          | `GET /transactions?month=YYYY-MM`    |
//! | `fetch_budgets`               | `GET /budgets`                       |
//! | `save_budgets`                | `PUT /budgets`                       |
//! | `fetch_available_months`      | `GET /months`                        |
//! | `upload_statement`            | `POST /upload-csv` (multipart)       |
//! | `update_transaction_category` | `PUT /transactions/{id}/category`    |
//!
//! Every request carries the session gate's auth headers.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use shared::{
    AccountFormat, BudgetMap, Category, ErrorResponse, MonthKey, SuccessResponse, Summary,
    Transaction, UpdateCategoryRequest, UploadResponse,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::remote::{RemoteDataSource, StatementFile, UploadOutcome};
use crate::config::DashboardConfig;
use crate::error::ApiError;
use crate::session::SessionGate;

/// Longest plain-text error body passed through to the user
const MAX_TEXT_ERROR_LEN: usize = 200;

/// API client for communicating with the budget service
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: Arc<SessionGate>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<SessionGate>) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn from_config(config: &DashboardConfig, session: Arc<SessionGate>) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout(), session)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and decode a JSON body, classifying every failure
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, what: &str) -> Result<T, ApiError> {
        let response = request
            .headers(self.session.auth_headers())
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = ApiError::http_status(status.as_u16(), server_message(&body));
            warn!("{} failed: {}", what, err);
            return Err(err);
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            warn!("{} returned an unexpected body: {}", what, e);
            ApiError::MalformedResponse(format!("{}: {}", what, e))
        })
    }

    /// Send a write request whose body is a `{success}` acknowledgement
    async fn send_ack(&self, request: RequestBuilder, what: &str) -> Result<(), ApiError> {
        let ack: SuccessResponse = self.send(request, what).await?;
        if ack.success {
            Ok(())
        } else {
            Err(ApiError::http_status(200, ack.error))
        }
    }
}

#[async_trait]
impl RemoteDataSource for ApiClient {
    async fn fetch_summary(&self, month: &MonthKey) -> Result<Summary, ApiError> {
        debug!("GET /summary month={}", month);
        let request = self
            .http
            .get(self.url("/summary"))
            .query(&[("month", month.as_str())]);
        self.send(request, "fetch summary").await
    }

    async fn fetch_transactions(&self, month: &MonthKey) -> Result<Vec<Transaction>, ApiError> {
        debug!("GET /transactions month={}", month);
        let request = self
            .http
            .get(self.url("/transactions"))
            .query(&[("month", month.as_str())]);
        self.send(request, "fetch transactions").await
    }

    async fn fetch_budgets(&self) -> Result<BudgetMap, ApiError> {
        debug!("GET /budgets");
        self.send(self.http.get(self.url("/budgets")), "fetch budgets").await
    }

    async fn fetch_available_months(&self) -> Result<Vec<MonthKey>, ApiError> {
        debug!("GET /months");
        self.send(self.http.get(self.url("/months")), "fetch months").await
    }

    async fn upload_statement(
        &self,
        file: StatementFile,
        format: AccountFormat,
    ) -> Result<UploadOutcome, ApiError> {
        debug!("POST /upload-csv file={} format={}", file.file_name, format);
        let form = Form::new()
            .part("file", Part::bytes(file.contents).file_name(file.file_name))
            .text("accountType", format.as_str().to_string());
        let request = self.http.post(self.url("/upload-csv")).multipart(form);

        let response: UploadResponse = self.send(request, "upload statement").await?;
        if !response.success || response.error.is_some() {
            return Err(ApiError::http_status(200, response.error));
        }
        match (response.total_transactions, response.new_transactions) {
            (Some(total_transactions), Some(new_transactions)) => Ok(UploadOutcome {
                total_transactions,
                new_transactions,
            }),
            _ => Err(ApiError::MalformedResponse(
                "upload statement: missing transaction counts".to_string(),
            )),
        }
    }

    async fn update_transaction_category(&self, id: i64, category: Category) -> Result<(), ApiError> {
        debug!("PUT /transactions/{}/category category={}", id, category);
        let request = self
            .http
            .put(self.url(&format!("/transactions/{}/category", id)))
            .json(&UpdateCategoryRequest { category });
        self.send_ack(request, "update transaction category").await
    }

    async fn save_budgets(&self, budgets: &BudgetMap) -> Result<(), ApiError> {
        debug!("PUT /budgets");
        let request = self.http.put(self.url("/budgets")).json(budgets);
        self.send_ack(request, "save budgets").await
    }
}

/// Extract the server-supplied detail from an error body
fn server_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(trimmed) {
        if let Some(message) = parsed.into_message() {
            return Some(message);
        }
    }
    // HTML error pages and JSON without a message are not user facing
    if trimmed.starts_with('<') || trimmed.starts_with('{') || trimmed.len() > MAX_TEXT_ERROR_LEN {
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_from_json_fields() {
        assert_eq!(server_message(r#"{"error": "Invalid category"}"#), Some("Invalid category".to_string()));
        assert_eq!(server_message(r#"{"detail": "Token expired"}"#), Some("Token expired".to_string()));
    }

    #[test]
    fn test_server_message_plain_text() {
        assert_eq!(server_message("Budget locked\n"), Some("Budget locked".to_string()));
    }

    #[test]
    fn test_server_message_ignores_unhelpful_bodies() {
        assert_eq!(server_message(""), None);
        assert_eq!(server_message("<html><body>502</body></html>"), None);
        assert_eq!(server_message(r#"{"status": 500}"#), None);
        assert_eq!(server_message(&"x".repeat(MAX_TEXT_ERROR_LEN + 1)), None);
    }

    #[test]
    fn test_base_url_is_normalized() {
        let session = Arc::new(SessionGate::new(Arc::new(crate::session::MemoryTokenStore::new())));
        let client = ApiClient::new("http://localhost:5000/api/", Duration::from_secs(1), session).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api");
        assert_eq!(client.url("/months"), "http://localhost:5000/api/months");
    }
}

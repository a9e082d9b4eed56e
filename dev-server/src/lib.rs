//! # Budget Dashboard Dev Server
//!
//! A small axum service implementing the budget API in memory. It backs local
//! development of the dashboard and its integration tests.
//!
//! All routes live under `/api` and require `Authorization: Bearer <token>`.

pub mod ledger;
pub mod rest;

use anyhow::{Context, Result};
use axum::{
    http::Method,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::{Any, CorsLayer};

pub use ledger::{ImportStats, Ledger, LedgerError};

pub const ADDR_ENV: &str = "DEV_SERVER_ADDR";
pub const TOKEN_ENV: &str = "DEV_SERVER_TOKEN";

/// Listen address and accepted token
#[derive(Debug, Clone, PartialEq)]
pub struct DevServerConfig {
    pub addr: SocketAddr,
    pub token: String,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            token: "dev-token".to_string(),
        }
    }
}

impl DevServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(addr) = lookup(ADDR_ENV) {
            config.addr = addr
                .parse()
                .with_context(|| format!("{} is not a socket address: {}", ADDR_ENV, addr))?;
        }
        if let Some(token) = lookup(TOKEN_ENV).filter(|t| !t.trim().is_empty()) {
            config.token = token.trim().to_string();
        }
        Ok(config)
    }
}

/// Shared handler state
#[derive(Clone)]
pub struct DevState {
    ledger: Arc<Mutex<Ledger>>,
    token: Arc<str>,
}

impl DevState {
    pub fn new(ledger: Ledger, token: &str) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            token: Arc::from(token),
        }
    }

    pub fn seeded(token: &str) -> Self {
        Self::new(Ledger::seeded(), token)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Build the application router
pub fn create_router(state: DevState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/summary", get(rest::get_summary))
        .route("/transactions", get(rest::list_transactions))
        .route("/transactions/:id/category", put(rest::update_category))
        .route("/budgets", get(rest::get_budgets).put(rest::save_budgets))
        .route("/months", get(rest::list_months))
        .route("/upload-csv", post(rest::upload_csv))
        .route_layer(middleware::from_fn_with_state(state.clone(), rest::require_token));

    Router::new()
        .nest("/api", api_routes)
        .layer(cors)
        .with_state(state)
}

use axum::Router;
use budget_dashboard::{ApiClient, MemoryTokenStore, SessionGate, TokenStore};
use budget_dashboard_dev_server::{create_router, DevState};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const TOKEN: &str = "integration-token";

/// Serve `router` on an ephemeral port and return the API base URL
pub async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}/api", addr)
}

/// A seeded dev server; the state handle allows inspecting its ledger
pub async fn dev_server() -> (String, DevState) {
    let state = DevState::seeded(TOKEN);
    let base_url = serve(create_router(state.clone())).await;
    (base_url, state)
}

pub fn session_with(token: Option<&str>) -> Arc<SessionGate> {
    let store: Arc<dyn TokenStore> = match token {
        Some(token) => Arc::new(MemoryTokenStore::with_token(token)),
        None => Arc::new(MemoryTokenStore::new()),
    };
    let session = Arc::new(SessionGate::new(store));
    session.restore_session();
    session
}

pub fn client(base_url: &str, session: Arc<SessionGate>) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5), session).unwrap()
}

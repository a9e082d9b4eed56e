//! # Session Gate
//!
//! Owns the authentication token lifecycle and decides whether the
//! aggregation store may talk to the remote service.
//!
//! ## State Machine
//!
//! ```text
//!                  login(token)
//!  Unauthenticated ────────────► Authenticated
//!        ▲   restore_session()        │
//!        └────────────────────────────┘
//!                  logout()
//! ```
//!
//! Restoration trusts the persisted token without a network round trip. An
//! expired token is only discovered when a request comes back 401/403, at
//! which point the store forces a logout.

mod gate;
mod token_store;

pub use gate::{Session, SessionError, SessionGate, SessionState};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};

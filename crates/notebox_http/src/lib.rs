//! HTTP surface for notebox: the note service router and the reverse proxy
//! placed in front of it.
//!
//! # Responsibility
//! - Map the note use-cases onto `GET /`, `POST /add` and `GET /api/notes`.
//! - Forward client traffic to the note service through a single-upstream
//!   proxy.
//!
//! # Invariants
//! - Handlers hold no state beyond the injected store handle.
//! - Failures reach clients as bare status codes; details stay in the log.

pub mod error;
pub mod proxy;
pub mod render;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{AppError, ProxyError};
pub use proxy::{create_proxy_router, ProxyState};
pub use routes::create_router;
pub use server::{serve_notes, serve_proxy, shutdown_signal};
pub use state::{AppState, SharedStore};

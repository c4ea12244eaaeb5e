//! HTTP surface for the issue maker.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────┐
//! │   SPA    │ ───────> │  server.rs  (Router, ServerConfig, shutdown) │
//! │ (static) │ <─────── │    ├─ api.rs       (handlers, AppState)      │
//! └──────────┘          │    └─ embedded.rs  (rust-embed assets)       │
//!                       └──────────────────────────────────────────────┘
//! ```
//!
//! Handlers authenticate through the `AuthSession` extractor, then call
//! `GitHubClient` or `IssueGenerator`. Unknown paths fall through to the SPA.

pub mod api;
pub mod embedded;
#[allow(clippy::module_inception)]
pub mod server;

pub use api::{AppState, SharedState};
pub use server::{ServerConfig, build_router, build_state, start_server};

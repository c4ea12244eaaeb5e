pub mod config;
pub mod errors;
pub mod github;
pub mod llm;
pub mod logging;
pub mod server;
pub mod session;

// Library surface for the engine, headless/integration tests and reuse.
// The terminal front end lives in main.rs.
pub mod app_dirs;
pub mod config;
pub mod engine;
pub mod logging;
pub mod provider;
pub mod runtime;
pub mod session;
pub mod store;
pub mod words;

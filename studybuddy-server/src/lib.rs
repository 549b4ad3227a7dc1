//! `studybuddy-server` serves the StudyBuddy HTTP API: PDF uploads are
//! ingested into an in-memory vector store, and chat and quiz requests are
//! answered from the passages retrieved for them.

pub mod config;
pub mod error;
pub mod persistence;
pub mod server;
pub mod service;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::ApiError;
pub use persistence::{DurableStore, JsonlMirror, Mirror, NoopMirror};
pub use server::{AppState, app_router, build_service, run_server};
pub use service::{StudyService, StudyServiceBuilder};

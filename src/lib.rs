//! newsdesk — retrieval-augmented chat over recent news
//!
//! The pipeline: feed sources are ingested into an immutable [`corpus`],
//! embedded via an [`embeddings`] provider, and held in a brute-force
//! [`index`]; per query the [`services::rag`] orchestrator retrieves the
//! closest articles, assembles a grounded prompt, and asks the
//! [`generation`] provider for an answer. Conversations live in the
//! ephemeral [`sessions`] store and reach clients through the
//! transport-agnostic [`channel`] boundary.

pub mod channel;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod errors;
pub mod generation;
pub mod index;
pub mod services;
pub mod sessions;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! moca-providers — model backends for model-assisted scoring.
//!
//! Implements the `ModelBackend` trait for OpenAI-compatible chat-completions
//! endpoints, plus a scripted mock used in tests and offline runs.

pub mod config;
pub mod mock;
pub mod openai;

pub use config::{create_backend, load_config, load_config_from, MocaConfig, ProviderConfig};
pub use moca_core::error::ProviderError;
pub use mock::MockBackend;
pub use openai::OpenAiBackend;

//! nomenq-providers — Question source integrations.
//!
//! Implements the `QuestionSource` trait for Gemini and Ollama, plus a
//! deterministic mock source for tests and offline development.

pub mod config;
pub mod gemini;
pub mod mock;
pub mod ollama;
mod prompt;

pub use config::{
    build_manager, create_source, load_config, load_config_from, BufferSettings, NomenqConfig,
    SourceConfig,
};
pub use nomenq_core::error::SourceError;

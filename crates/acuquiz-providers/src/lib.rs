//! acuquiz-providers: text-generation backends for the AI examiner.
//!
//! Implements the `TextGenerator` trait for OpenAI-compatible chat
//! completion endpoints and owns the `settings.json` document that selects
//! the endpoint, key and model.

pub mod config;
pub mod mock;
pub mod openai;

pub use acuquiz_core::error::ProviderError;
pub use config::{create_provider, load_settings, save_settings, AppSettings, Platform};
pub use openai::OpenAiCompatibleProvider;

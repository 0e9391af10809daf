use crate::api::{ChatApi, HttpChatApi};
use crate::config::Config;
use crate::storage::{KeyValueStore, default_store};
use std::sync::Arc;

/// Shared services handed to components through the Dioxus context.
#[derive(Clone)]
pub struct AppContext {
    pub config: Config,
    pub api: Arc<dyn ChatApi>,
    pub store: Arc<dyn KeyValueStore>,
}

impl AppContext {
    pub fn new(config: Config, api: Arc<dyn ChatApi>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { config, api, store }
    }

    /// HTTP backend and the platform store, both taken from `config`.
    pub fn from_config(config: Config) -> Self {
        let api = Arc::new(HttpChatApi::new(&config));
        let store = default_store(&config.storage_namespace);
        tracing::debug!(api_base = %config.api_base, "app context ready");
        Self { config, api, store }
    }
}

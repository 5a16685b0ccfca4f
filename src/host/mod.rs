use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod json_file;

pub use json_file::JsonConfigHost;

/// A user-facing message surfaced by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// The capabilities the plugin needs from the image host application.
///
/// Diagnostics go through `tracing`, so logging is not part of the trait.
#[async_trait]
pub trait PluginHost: Send + Sync + 'static {
    /// Reads a config value by dotted key, e.g. `picBed.nextcloud`.
    async fn get_config(&self, key: &str) -> Option<Value>;

    /// Persists the given entries. Keys may be dotted.
    async fn save_config(&self, values: Map<String, Value>) -> anyhow::Result<()>;

    fn notify(&self, notification: Notification);
}

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::{
    config_schema, resolve_user_config, ConfigField, PluginOptions, ResolvedConfig, UserConfig,
    CONFIG_KEY,
};
use crate::errors::NextcloudError;
use crate::host::PluginHost;

use super::connection::NextcloudClient;

/// Display name shown in the host's uploader list
pub const UPLOADER_NAME: &str = "NextCloud";

/// What the host needs to list the uploader and render its settings form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub id: String,
    pub name: &'static str,
    pub config: Vec<ConfigField>,
}

/// The NextCloud uploader bound to a host.
///
/// Entry points are `handle` (upload handler) and `on_remove` (removal
/// event handler). Configuration is read from the host on every call, so
/// settings changes take effect without re-registering.
pub struct NextcloudPlugin<H: PluginHost> {
    pub(super) host: Arc<H>,
    pub(super) options: PluginOptions,
}

/// Binds the plugin to a host. This is the single place a host calls at
/// load time; it gets back the handlers to subscribe.
pub fn register<H: PluginHost>(host: Arc<H>, options: PluginOptions) -> NextcloudPlugin<H> {
    debug!("🔌 Registering NextCloud uploader as '{}'", options.uploader_id);
    NextcloudPlugin::with_options(host, options)
}

impl<H: PluginHost> NextcloudPlugin<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self::with_options(host, PluginOptions::default())
    }

    pub fn with_options(host: Arc<H>, options: PluginOptions) -> Self {
        Self { host, options }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn options(&self) -> &PluginOptions {
        &self.options
    }

    pub fn uploader_id(&self) -> &str {
        &self.options.uploader_id
    }

    /// Id, display name and the settings form pre-filled from the host
    pub async fn registration(&self) -> Registration {
        Registration {
            id: self.options.uploader_id.clone(),
            name: UPLOADER_NAME,
            config: self.config_schema().await,
        }
    }

    pub async fn config_schema(&self) -> Vec<ConfigField> {
        let current = self
            .host
            .get_config(CONFIG_KEY)
            .await
            .and_then(|value| serde_json::from_value::<UserConfig>(value).ok());

        config_schema(current.as_ref())
    }

    pub async fn resolve_config(&self) -> Result<ResolvedConfig, NextcloudError> {
        resolve_user_config(self.host.get_config(CONFIG_KEY).await)
    }

    pub(super) async fn connect(&self) -> Result<NextcloudClient, NextcloudError> {
        let config = self.resolve_config().await?;
        NextcloudClient::new(config, &self.options)
    }
}

impl<H: PluginHost> Clone for NextcloudPlugin<H> {
    fn clone(&self) -> Self {
        Self {
            host: Arc::clone(&self.host),
            options: self.options.clone(),
        }
    }
}

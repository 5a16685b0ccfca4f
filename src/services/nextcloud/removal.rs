use anyhow::anyhow;
use futures_util::future::join_all;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::config::UPLOADED_KEY;
use crate::errors::NextcloudError;
use crate::host::{Notification, PluginHost};
use crate::models::{ImageItem, RemovalReport};

use super::connection::NextcloudClient;
use super::notices;
use super::service::NextcloudPlugin;

/// Best-effort delete of one file.
///
/// A failure is notified and handed back as `DeleteFailed`; the caller only
/// uses it for bookkeeping.
pub(super) async fn delete_with_notice<H: PluginHost>(
    client: &NextcloudClient,
    host: &H,
    file_name: &str,
    notify_success: bool,
) -> Result<(), NextcloudError> {
    match client.delete_file(file_name).await {
        Ok(()) => {
            debug!("✅ Deleted '{}' from NextCloud", file_name);
            if notify_success {
                host.notify(Notification::new(
                    notices::DELETE_NOTICE_TITLE,
                    notices::deleted_body(file_name),
                ));
            }
            Ok(())
        }
        Err(e) => {
            warn!(
                code = e.error_code(),
                "❌ Failed to delete '{}' from NextCloud: {}",
                file_name,
                e
            );
            host.notify(Notification::new(notices::DELETE_FAILED_TITLE, e.to_string()));
            Err(NextcloudError::DeleteFailed {
                file_name: file_name.to_string(),
                reason: e.to_string(),
            })
        }
    }
}

impl<H: PluginHost> NextcloudPlugin<H> {
    /// Handles the host's removal event.
    ///
    /// Only items tagged with this uploader's id are deleted remotely. All
    /// deletes are issued together; the ones that fail are put back at the
    /// front of the host's `uploaded` list so they can be retried later.
    pub async fn on_remove(&self, files: &[ImageItem]) -> Result<RemovalReport, NextcloudError> {
        let targets: Vec<&ImageItem> = files
            .iter()
            .filter(|item| item.belongs_to(&self.options.uploader_id))
            .collect();

        if targets.is_empty() {
            debug!("No NextCloud items in removal batch of {}", files.len());
            return Ok(RemovalReport::default());
        }

        let client = match self.connect().await {
            Ok(client) => client,
            Err(e) => {
                // Nothing was deleted, so every target goes back on the list.
                warn!("❌ Cannot delete {} item(s) from NextCloud: {}", targets.len(), e);
                let failed: Vec<ImageItem> = targets.into_iter().cloned().collect();
                self.requeue_failed(&failed).await?;
                return Err(e);
            }
        };

        info!("🗑️ Deleting {} file(s) from NextCloud", targets.len());

        let notify_success = self.options.notify_delete_success;
        let deletions = targets.iter().map(|item| {
            let client = &client;
            let host = self.host.as_ref();
            async move {
                let result = delete_with_notice(client, host, &item.file_name, notify_success).await;
                (*item, result)
            }
        });

        let mut report = RemovalReport::default();
        for (item, result) in join_all(deletions).await {
            match result {
                Ok(()) => report.removed.push(item.clone()),
                Err(_) => report.failed.push(item.clone()),
            }
        }

        info!(
            "📊 NextCloud removal completed: {} deleted, {} failed",
            report.removed.len(),
            report.failed.len()
        );

        if !report.failed.is_empty() {
            self.requeue_failed(&report.failed).await?;
        }

        if self.options.notify_removal_summary {
            let body = if report.failed.is_empty() {
                notices::REMOVAL_SYNCED_BODY.to_string()
            } else {
                notices::removal_failed_body(report.failed.len())
            };
            self.host
                .notify(Notification::new(notices::DELETE_NOTICE_TITLE, body));
        }

        Ok(report)
    }

    /// Puts items back at the front of the host's `uploaded` list, keeping
    /// their batch order, with a single save.
    async fn requeue_failed(&self, failed: &[ImageItem]) -> Result<(), NextcloudError> {
        let uploaded = match self.host.get_config(UPLOADED_KEY).await {
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                warn!("Host 'uploaded' entry is not a list, leaving it untouched");
                return Err(NextcloudError::Host(anyhow!(
                    "'{}' is not a list: {}",
                    UPLOADED_KEY,
                    other
                )));
            }
            None => Vec::new(),
        };

        let requeued = failed
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        let uploaded: Vec<Value> = requeued.into_iter().chain(uploaded).collect();

        let mut values = Map::new();
        values.insert(UPLOADED_KEY.to_string(), Value::Array(uploaded));
        self.host.save_config(values).await?;

        info!("↩️ Re-queued {} item(s) for a later delete", failed.len());
        Ok(())
    }
}

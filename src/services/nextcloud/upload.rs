use std::sync::Arc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::errors::NextcloudError;
use crate::host::{Notification, PluginHost};
use crate::mime_detection::content_type_for;
use crate::models::{ImageItem, ItemOutcome, ShareResponse, UploadContext, UploadReport};

use super::connection::NextcloudClient;
use super::notices;
use super::removal::delete_with_notice;
use super::service::NextcloudPlugin;

impl<H: PluginHost> NextcloudPlugin<H> {
    /// Upload handler registered with the host.
    ///
    /// Runs `upload` over `ctx.output` and writes the results back onto the
    /// items. Only a missing or unreadable configuration is returned as an
    /// error; upload failures are notified and recorded in the report.
    pub async fn handle(&self, ctx: &mut UploadContext) -> Result<UploadReport, NextcloudError> {
        let report = self.upload(&ctx.output).await?;
        report.apply(&mut ctx.output);
        Ok(report)
    }

    /// Uploads the items one after another and shares each as a public link.
    ///
    /// The first PUT or POST failure stops the batch: later items are not
    /// attempted. A share rejected by NextCloud does not stop it; the
    /// uploaded file is deleted in the background and the next item goes on.
    /// Those deletes get `rollback_grace` to finish before the report is
    /// returned; any still pending are left running detached.
    pub async fn upload(&self, items: &[ImageItem]) -> Result<UploadReport, NextcloudError> {
        let client = self.connect().await?;
        info!("⬆️ Uploading {} file(s) to NextCloud", items.len());

        let mut report = UploadReport::default();
        let mut rollbacks = JoinSet::new();

        for (index, item) in items.iter().enumerate() {
            let share = match self.upload_one(&client, item).await {
                Ok(share) => share,
                Err(e) => {
                    self.report_failure(&e);
                    report.error = Some(e);
                    break;
                }
            };

            if share.is_success() {
                let img_url = client.config().public_url(&item.file_name);
                info!("✅ Shared '{}' at {}", item.file_name, img_url);
                self.host
                    .notify(Notification::new(notices::UPLOAD_SUCCESS_TITLE, ""));

                report.outcomes.push(ItemOutcome::Shared {
                    index,
                    file_name: item.file_name.clone(),
                    img_url,
                });
            } else {
                warn!(
                    "❌ NextCloud refused to share '{}' (status {}), removing the upload",
                    item.file_name,
                    share.status_code()
                );
                self.host.notify(Notification::new(
                    notices::SHARE_FAILED_TITLE,
                    notices::SHARE_FAILED_BODY,
                ));

                let client = client.clone();
                let host = Arc::clone(&self.host);
                let file_name = item.file_name.clone();
                let notify_success = self.options.notify_delete_success;
                rollbacks.spawn(async move {
                    delete_with_notice(&client, host.as_ref(), &file_name, notify_success).await
                });

                report.outcomes.push(ItemOutcome::ShareRejected {
                    index,
                    file_name: item.file_name.clone(),
                    status_code: share.status_code(),
                    message: share.message().map(str::to_string),
                });
            }
        }

        // Rollback failures were already notified by the delete helper.
        let drained = timeout(self.options.rollback_grace, async {
            while let Some(joined) = rollbacks.join_next().await {
                if let Err(e) = joined {
                    warn!("Rollback task did not finish: {}", e);
                }
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                "⏳ {} rollback delete(s) still running after {:?}, not waiting for them",
                rollbacks.len(),
                self.options.rollback_grace
            );
            rollbacks.detach_all();
        }

        info!(
            "📊 NextCloud upload finished: {} shared, {} processed, {} total",
            report.shared_count(),
            report.outcomes.len(),
            items.len()
        );

        Ok(report)
    }

    async fn upload_one(
        &self,
        client: &NextcloudClient,
        item: &ImageItem,
    ) -> Result<ShareResponse, NextcloudError> {
        let payload = item.payload()?;
        let content_type = content_type_for(&item.extname);

        client.put_file(&item.file_name, content_type, payload).await?;
        client.create_public_share(&item.file_name).await
    }

    fn report_failure(&self, e: &NextcloudError) {
        let body = if e.is_path_not_found() {
            warn!(code = e.error_code(), "❌ NextCloud upload path not found: {}", e);
            e.user_message()
        } else {
            error!(code = e.error_code(), "❌ NextCloud upload failed: {}", e);
            e.to_string()
        };

        self.host
            .notify(Notification::new(notices::UPLOAD_FAILED_TITLE, body));
    }
}

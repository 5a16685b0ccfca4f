use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Notification, PluginHost};

/// Host backed by a PicGo style `data.json` document.
///
/// The whole document is kept in memory and rewritten on every save.
pub struct JsonConfigHost {
    path: PathBuf,
    document: RwLock<Value>,
    notifications: Mutex<Vec<Notification>>,
}

impl JsonConfigHost {
    /// Loads the document at `path`. A missing file starts an empty one.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let document = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Value::Object(Map::new()),
            Ok(contents) => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("📄 Config file {} not found, starting empty", path.display());
                Value::Object(Map::new())
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read config file {}", path.display()))
            }
        };

        if !document.is_object() {
            return Err(anyhow!(
                "Config file {} must contain a JSON object",
                path.display()
            ));
        }

        Ok(Self {
            path,
            document: RwLock::new(document),
            notifications: Mutex::new(Vec::new()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Notifications emitted so far, oldest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    async fn persist(&self, document: &Value) -> Result<()> {
        let serialized = serde_json::to_string_pretty(document)?;
        let tmp_path = self.path.with_extension("json.tmp");

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&tmp_path, serialized)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!("💾 Saved config to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl PluginHost for JsonConfigHost {
    async fn get_config(&self, key: &str) -> Option<Value> {
        let document = self.document.read().await;
        lookup(&document, key).cloned()
    }

    async fn save_config(&self, values: Map<String, Value>) -> Result<()> {
        let mut document = self.document.write().await;
        for (key, value) in values {
            assign(&mut document, &key, value)?;
        }
        self.persist(&document).await
    }

    fn notify(&self, notification: Notification) {
        info!("🔔 {}: {}", notification.title, notification.body);
        match self.notifications.lock() {
            Ok(mut guard) => guard.push(notification),
            Err(e) => warn!("Notification log is poisoned: {}", e),
        }
    }
}

fn lookup<'a>(document: &'a Value, key: &str) -> Option<&'a Value> {
    key.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

fn assign(document: &mut Value, key: &str, value: Value) -> Result<()> {
    let mut segments: Vec<&str> = key.split('.').collect();
    let last = segments
        .pop()
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| anyhow!("Invalid config key '{}'", key))?;

    let mut current = document;
    for segment in segments {
        let object = current
            .as_object_mut()
            .ok_or_else(|| anyhow!("Config key '{}' crosses a non-object value", key))?;
        current = object
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    current
        .as_object_mut()
        .ok_or_else(|| anyhow!("Config key '{}' crosses a non-object value", key))?
        .insert(last.to_string(), value);

    Ok(())
}

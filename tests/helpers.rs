use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};

use nextcloud_picbed::{Notification, PluginHost};

pub const TEST_USER: &str = "alice";
pub const TEST_PASSWORD: &str = "secret";
pub const TEST_CDN: &str = "https://cdn.example.com";
pub const SHARE_PATH: &str = "/ocs/v2.php/apps/files_sharing/api/v1/shares";

/// In-memory host that records every save and notification
pub struct RecordingHost {
    document: Mutex<Value>,
    saves: Mutex<Vec<Map<String, Value>>>,
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingHost {
    pub fn new(document: Value) -> Arc<Self> {
        Arc::new(Self {
            document: Mutex::new(document),
            saves: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
        })
    }

    /// Host configured against a mock server, with an empty uploaded list
    pub fn with_nextcloud(server_uri: &str) -> Arc<Self> {
        Self::new(json!({
            "picBed": {
                "nextcloud": {
                    "host": server_uri,
                    "cdn": TEST_CDN,
                    "user": TEST_USER,
                    "password": TEST_PASSWORD,
                    "path": "/picgo"
                }
            },
            "uploaded": []
        }))
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn notification_titles(&self) -> Vec<String> {
        self.notifications()
            .into_iter()
            .map(|notification| notification.title)
            .collect()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().unwrap().len()
    }

    pub fn uploaded(&self) -> Vec<Value> {
        match &self.document.lock().unwrap()["uploaded"] {
            Value::Array(entries) => entries.clone(),
            _ => Vec::new(),
        }
    }

    pub fn value(&self, key: &str) -> Value {
        self.document.lock().unwrap()[key].clone()
    }

    pub fn set(&self, key: &str, value: Value) {
        self.document.lock().unwrap()[key] = value;
    }
}

#[async_trait]
impl PluginHost for RecordingHost {
    async fn get_config(&self, key: &str) -> Option<Value> {
        let document = self.document.lock().unwrap();
        key.split('.')
            .try_fold(&*document, |current, segment| current.get(segment))
            .cloned()
    }

    async fn save_config(&self, values: Map<String, Value>) -> anyhow::Result<()> {
        self.saves.lock().unwrap().push(values.clone());
        let mut document = self.document.lock().unwrap();
        for (key, value) in values {
            document[key.as_str()] = value;
        }
        Ok(())
    }

    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// WebDAV path of a file in the test folder
pub fn dav_path(file_name: &str) -> String {
    format!("/remote.php/dav/files/{}//picgo/{}", TEST_USER, file_name)
}

/// Direct link the plugin is expected to hand back
pub fn direct_url(file_name: &str) -> String {
    format!("{}/{}/picgo/{}", TEST_CDN, TEST_USER, file_name)
}

pub fn share_envelope(statuscode: u16) -> Value {
    json!({
        "ocs": {
            "meta": {
                "status": if statuscode == 200 { "ok" } else { "failure" },
                "statuscode": statuscode,
                "message": if statuscode == 200 { "OK" } else { "Sharing failed" }
            },
            "data": {
                "id": "42",
                "share_type": 3,
                "url": "https://cloud.example.com/s/AbCdEf"
            }
        }
    })
}

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;
use std::fmt;
use std::time::Duration;

use crate::errors::NextcloudError;

/// Host config key holding the user's NextCloud settings
pub const CONFIG_KEY: &str = "picBed.nextcloud";
/// Host config key holding the list of previously uploaded items
pub const UPLOADED_KEY: &str = "uploaded";
/// `type` tag carried by items this plugin uploaded
pub const DEFAULT_UPLOADER_ID: &str = "nextcloud";

const WEBDAV_FILES_PATH: &str = "/remote.php/dav/files";
/// How long `upload` waits for compensating deletes before handing results back
pub const DEFAULT_ROLLBACK_GRACE: Duration = Duration::from_secs(10);

const SHARE_API_PATH: &str = "/ocs/v2.php/apps/files_sharing/api/v1/shares";

// Characters encodeURI leaves untouched besides ASCII alphanumerics.
const URI_UNESCAPED: &str = ";,/?:@&=+$-_.!~*'()#";

/// Raw settings as stored by the host under `picBed.nextcloud`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub host: String,
    pub cdn: String,
    pub user: String,
    pub password: String,
    pub path: String,
}

/// HTTP Basic credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// User settings plus the endpoints derived from them.
///
/// Derived values are computed on every invocation and never written back
/// to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub user_config: UserConfig,
    /// Public prefix for direct links: `cdn/user<path>/`
    pub direct_url: String,
    /// WebDAV collection: `host/remote.php/dav/files/user/<path>`
    pub base_url: String,
    /// OCS share endpoint
    pub share_url: String,
    pub auth: Credentials,
}

impl UserConfig {
    /// Derives the endpoint URLs. No field is validated here: an empty field
    /// simply yields a URL the server will reject.
    pub fn resolve(self) -> ResolvedConfig {
        let encoded_path = encode_uri(&self.path);

        let direct_url = format!("{}/{}{}/", self.cdn, self.user, encoded_path);
        let base_url = format!(
            "{}{}/{}/{}",
            self.host, WEBDAV_FILES_PATH, self.user, encoded_path
        );
        let share_url = format!("{}{}", self.host, SHARE_API_PATH);
        let auth = Credentials {
            user: self.user.clone(),
            password: self.password.clone(),
        };

        ResolvedConfig {
            user_config: self,
            direct_url,
            base_url,
            share_url,
            auth,
        }
    }
}

impl ResolvedConfig {
    /// WebDAV URL of a file inside the configured folder
    pub fn file_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.base_url, encode_uri(file_name))
    }

    /// Path sent to the share API, relative to the user's root
    pub fn share_path(&self, file_name: &str) -> String {
        format!("{}/{}", self.user_config.path, file_name)
    }

    /// Link handed back to the host once the file is shared
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}{}", self.direct_url, file_name)
    }
}

/// Turns the host's stored value into a resolved configuration.
pub fn resolve_user_config(stored: Option<Value>) -> Result<ResolvedConfig, NextcloudError> {
    let stored = match stored {
        Some(Value::Null) | None => return Err(NextcloudError::ConfigurationMissing),
        Some(value) => value,
    };

    let user_config: UserConfig =
        serde_json::from_value(stored).map_err(NextcloudError::InvalidConfiguration)?;

    Ok(user_config.resolve())
}

/// Percent-encodes a string the way ECMAScript's `encodeURI` does:
/// reserved URI characters survive, everything else is UTF-8 escaped.
pub fn encode_uri(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    let mut buf = [0u8; 4];

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || URI_UNESCAPED.contains(ch) {
            encoded.push(ch);
        } else {
            encoded.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }

    encoded
}

/// Plugin behaviour that is not part of the user's NextCloud settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginOptions {
    /// `type` tag owned by this uploader; removal batches are filtered on it
    pub uploader_id: String,
    pub notify_delete_success: bool,
    pub notify_removal_summary: bool,
    /// Skip certificate verification on DELETE requests. Uploads always
    /// verify certificates and require TLS 1.2.
    pub delete_accept_invalid_certs: bool,
    /// Upper bound on waiting for compensating deletes at the end of a batch.
    /// Deletes still running afterwards keep going in the background.
    pub rollback_grace: Duration,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            uploader_id: DEFAULT_UPLOADER_ID.to_string(),
            notify_delete_success: false,
            notify_removal_summary: false,
            delete_accept_invalid_certs: true,
            rollback_grace: DEFAULT_ROLLBACK_GRACE,
        }
    }
}

impl PluginOptions {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        PluginOptions {
            uploader_id: env::var("NEXTCLOUD_UPLOADER_ID")
                .ok()
                .filter(|id| !id.trim().is_empty())
                .unwrap_or(defaults.uploader_id),
            notify_delete_success: env_flag(
                "NEXTCLOUD_NOTIFY_DELETE_SUCCESS",
                defaults.notify_delete_success,
            ),
            notify_removal_summary: env_flag(
                "NEXTCLOUD_NOTIFY_REMOVAL_SUMMARY",
                defaults.notify_removal_summary,
            ),
            delete_accept_invalid_certs: env_flag(
                "NEXTCLOUD_DELETE_ACCEPT_INVALID_CERTS",
                defaults.delete_accept_invalid_certs,
            ),
            rollback_grace: env::var("NEXTCLOUD_ROLLBACK_GRACE_SECS")
                .ok()
                .and_then(|secs| secs.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.rollback_grace),
        }
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|value| parse_flag(&value))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Input widget kind used by the host's settings form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Input,
    Password,
}

/// One entry of the settings form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigField {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub default: Option<String>,
    pub required: bool,
    pub message: &'static str,
    pub alias: &'static str,
}

/// Settings form, pre-filled with whatever the user stored last time.
pub fn config_schema(current: Option<&UserConfig>) -> Vec<ConfigField> {
    let current_value = |pick: fn(&UserConfig) -> &String| {
        current
            .map(pick)
            .filter(|value| !value.is_empty())
            .cloned()
    };

    vec![
        ConfigField {
            name: "host",
            field_type: FieldType::Input,
            default: current_value(|c| &c.host),
            required: true,
            message: "Server address, e.g. https://cloud.example.com",
            alias: "Server",
        },
        ConfigField {
            name: "cdn",
            field_type: FieldType::Input,
            default: current_value(|c| &c.cdn),
            required: true,
            message: "Public base URL used for direct links",
            alias: "CDN",
        },
        ConfigField {
            name: "user",
            field_type: FieldType::Input,
            default: current_value(|c| &c.user),
            required: true,
            message: "Username",
            alias: "Username",
        },
        ConfigField {
            name: "password",
            field_type: FieldType::Password,
            default: current_value(|c| &c.password),
            required: true,
            message: "Password or app password",
            alias: "Password",
        },
        ConfigField {
            name: "path",
            field_type: FieldType::Input,
            default: current_value(|c| &c.path),
            required: true,
            message: "Remote folder to store images in, e.g. /picgo",
            alias: "Save path",
        },
    ]
}

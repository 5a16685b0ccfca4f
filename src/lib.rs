//! NextCloud uploader for PicGo-style image hosts.
//!
//! Files are PUT into a WebDAV folder, shared as public links through the
//! OCS share API and handed back to the host as direct CDN URLs. Removing
//! items from the host's library deletes them remotely, re-queueing the
//! ones that could not be deleted.

pub mod config;
pub mod errors;
pub mod host;
pub mod mime_detection;
pub mod models;
pub mod services;

pub use config::{PluginOptions, ResolvedConfig, UserConfig};
pub use errors::NextcloudError;
pub use host::{JsonConfigHost, Notification, PluginHost};
pub use models::{ImageItem, ItemOutcome, RemovalReport, UploadContext, UploadReport};
pub use services::nextcloud::{register, NextcloudPlugin, Registration};

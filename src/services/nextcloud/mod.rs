// NextCloud uploader organized by functionality

pub mod connection;
pub mod notices;
mod removal;
pub mod service;
mod upload;

pub use connection::NextcloudClient;
pub use service::{register, NextcloudPlugin, Registration, UPLOADER_NAME};

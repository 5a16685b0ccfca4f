use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE, USER_AGENT,
};
use reqwest::{tls, Client, RequestBuilder, Response};
use std::sync::Arc;
use tracing::debug;

use crate::config::{encode_uri, PluginOptions, ResolvedConfig};
use crate::errors::NextcloudError;
use crate::models::{ShareRequest, ShareResponse};

const CLIENT_USER_AGENT: &str = "PicGo";
const OCS_API_REQUEST: HeaderName = HeaderName::from_static("ocs-apirequest");

/// Thin HTTP layer over the NextCloud WebDAV and OCS share endpoints.
///
/// Uploads and shares go through a client that refuses anything below
/// TLS 1.2. Deletes use a second client whose certificate checking follows
/// `PluginOptions::delete_accept_invalid_certs`.
#[derive(Clone)]
pub struct NextcloudClient {
    upload_client: Client,
    delete_client: Client,
    config: Arc<ResolvedConfig>,
}

impl NextcloudClient {
    pub fn new(config: ResolvedConfig, options: &PluginOptions) -> Result<Self, NextcloudError> {
        let upload_client = Client::builder()
            .default_headers(Self::common_headers())
            .min_tls_version(tls::Version::TLS_1_2)
            .build()?;

        let delete_client = Client::builder()
            .default_headers(Self::common_headers())
            .danger_accept_invalid_certs(options.delete_accept_invalid_certs)
            .build()?;

        Ok(Self {
            upload_client,
            delete_client,
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Headers sent with every request
    fn common_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(OCS_API_REQUEST, HeaderValue::from_static("true"));
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        let auth = &self.config.auth;
        request.basic_auth(&auth.user, Some(&auth.password))
    }

    /// PUTs the bytes to `base_url/<file name>`, overwriting any existing file.
    pub async fn put_file(
        &self,
        file_name: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), NextcloudError> {
        let url = self.config.file_url(file_name);
        debug!("⬆️ PUT {} ({} bytes, {})", url, body.len(), content_type);

        let request = self
            .upload_client
            .put(&url)
            .header(
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", encode_uri(file_name)),
            )
            .header(CONTENT_TYPE, content_type)
            .body(body);

        let response = self.authenticated(request).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Creates a public link share for a file in the configured folder.
    ///
    /// HTTP failures are errors; a parsed envelope is returned as-is and the
    /// caller decides what its status code means.
    pub async fn create_public_share(&self, file_name: &str) -> Result<ShareResponse, NextcloudError> {
        let share_request = ShareRequest::public_link(self.config.share_path(file_name));
        debug!("🔗 POST {} for {}", self.config.share_url, share_request.path);

        let request = self
            .upload_client
            .post(&self.config.share_url)
            .json(&share_request);

        let response = self.authenticated(request).send().await?;
        let body = Self::ensure_success(response).await?.text().await?;

        serde_json::from_str(&body).map_err(NextcloudError::InvalidShareResponse)
    }

    /// DELETEs `base_url/<file name>`.
    pub async fn delete_file(&self, file_name: &str) -> Result<(), NextcloudError> {
        let url = self.config.file_url(file_name);
        debug!("🗑️ DELETE {}", url);

        let request = self.delete_client.delete(&url);
        let response = self.authenticated(request).send().await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn ensure_success(response: Response) -> Result<Response, NextcloudError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(NextcloudError::Http {
            status,
            body: response.text().await.unwrap_or_default(),
        })
    }
}

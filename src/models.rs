use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::errors::NextcloudError;

/// NextCloud share type for a public link
pub const PUBLIC_LINK_SHARE: u8 = 3;
/// `ocs.meta.statuscode` of a successful share request
pub const SHARE_STATUS_OK: u16 = 200;

/// One file handed over by the host, either to upload or to delete.
///
/// The field names follow the host's JSON so items read from the
/// `uploaded` list can be written back without losing anything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub extname: String,
    /// Raw bytes; preferred over `base64_image`. Read either as a byte
    /// array or as a Node `{"type":"Buffer","data":[...]}` object. Never
    /// serialized.
    #[serde(default, skip_serializing, deserialize_with = "deserialize_buffer")]
    pub buffer: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img_url: Option<String>,
    /// Tag of the uploader that owns the item
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// Host fields this plugin does not interpret (id, width, height...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageItem {
    pub fn new(file_name: impl Into<String>, extname: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            extname: extname.into(),
            ..Default::default()
        }
    }

    pub fn with_buffer(mut self, buffer: Vec<u8>) -> Self {
        self.buffer = Some(buffer);
        self
    }

    pub fn with_base64(mut self, base64_image: impl Into<String>) -> Self {
        self.base64_image = Some(base64_image.into());
        self
    }

    pub fn with_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    /// Bytes to upload: the buffer when present, else the decoded base64.
    pub fn payload(&self) -> Result<Vec<u8>, NextcloudError> {
        if let Some(buffer) = &self.buffer {
            return Ok(buffer.clone());
        }

        match &self.base64_image {
            Some(encoded) => {
                STANDARD
                    .decode(encoded.trim())
                    .map_err(|source| NextcloudError::InvalidPayload {
                        file_name: self.file_name.clone(),
                        source,
                    })
            }
            None => Err(NextcloudError::MissingPayload {
                file_name: self.file_name.clone(),
            }),
        }
    }

    pub fn strip_payload(&mut self) {
        self.buffer = None;
        self.base64_image = None;
        for key in PAYLOAD_KEYS {
            self.extra.remove(key);
        }
    }

    pub fn has_payload(&self) -> bool {
        self.buffer.is_some() || self.base64_image.is_some()
    }

    pub fn belongs_to(&self, uploader_id: &str) -> bool {
        self.item_type.as_deref() == Some(uploader_id)
    }
}

const PAYLOAD_KEYS: [&str; 2] = ["buffer", "base64Image"];

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBuffer {
    Bytes(Vec<u8>),
    Node { data: Vec<u8> },
}

fn deserialize_buffer<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<RawBuffer>::deserialize(deserializer)?.map(|raw| match raw {
            RawBuffer::Bytes(bytes) | RawBuffer::Node { data: bytes } => bytes,
        }),
    )
}

/// What the host passes to the upload handler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadContext {
    pub output: Vec<ImageItem>,
}

impl UploadContext {
    pub fn new(output: Vec<ImageItem>) -> Self {
        Self { output }
    }
}

/// Result of one item that made it through PUT and share creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Shared {
        index: usize,
        file_name: String,
        img_url: String,
    },
    /// The share API answered with a non-200 envelope; the uploaded file
    /// has been scheduled for deletion.
    ShareRejected {
        index: usize,
        file_name: String,
        status_code: u16,
        message: Option<String>,
    },
}

impl ItemOutcome {
    pub fn index(&self) -> usize {
        match self {
            ItemOutcome::Shared { index, .. } | ItemOutcome::ShareRejected { index, .. } => *index,
        }
    }

    pub fn file_name(&self) -> &str {
        match self {
            ItemOutcome::Shared { file_name, .. }
            | ItemOutcome::ShareRejected { file_name, .. } => file_name,
        }
    }

    pub fn img_url(&self) -> Option<&str> {
        match self {
            ItemOutcome::Shared { img_url, .. } => Some(img_url),
            ItemOutcome::ShareRejected { .. } => None,
        }
    }
}

/// Result of an upload batch.
///
/// `outcomes` holds one entry per item that was processed, in input order.
/// When `error` is set the batch stopped at item `outcomes.len()` and the
/// remaining items were never sent.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub outcomes: Vec<ItemOutcome>,
    pub error: Option<NextcloudError>,
}

impl UploadReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn shared_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.img_url().is_some())
            .count()
    }

    /// Writes the outcomes back onto the host's items: processed items lose
    /// their payload, shared ones gain their `img_url`.
    pub fn apply(&self, items: &mut [ImageItem]) {
        for outcome in &self.outcomes {
            let Some(item) = items.get_mut(outcome.index()) else {
                continue;
            };

            item.strip_payload();
            if let Some(img_url) = outcome.img_url() {
                item.img_url = Some(img_url.to_string());
            }
        }
    }
}

/// Result of a removal batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemovalReport {
    pub removed: Vec<ImageItem>,
    /// Items that were pushed back onto the host's `uploaded` list
    pub failed: Vec<ImageItem>,
}

/// Body of the share creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareRequest {
    pub path: String,
    #[serde(rename = "shareType")]
    pub share_type: u8,
}

impl ShareRequest {
    pub fn public_link(path: String) -> Self {
        Self {
            path,
            share_type: PUBLIC_LINK_SHARE,
        }
    }
}

/// OCS envelope returned by the share API
#[derive(Debug, Clone, Deserialize)]
pub struct ShareResponse {
    pub ocs: OcsBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcsBody {
    pub meta: OcsMeta,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcsMeta {
    pub statuscode: u16,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ShareResponse {
    pub fn status_code(&self) -> u16 {
        self.ocs.meta.statuscode
    }

    pub fn is_success(&self) -> bool {
        self.status_code() == SHARE_STATUS_OK
    }

    pub fn message(&self) -> Option<&str> {
        self.ocs.meta.message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_buffer_takes_precedence_over_base64() {
        let item = ImageItem::new("a.png", ".png")
            .with_buffer(b"raw".to_vec())
            .with_base64(STANDARD.encode(b"encoded"));

        assert_eq!(item.payload().unwrap(), b"raw".to_vec());
    }

    #[test]
    fn test_base64_payload_is_decoded() {
        let item = ImageItem::new("a.png", ".png").with_base64(STANDARD.encode(b"hello"));
        assert_eq!(item.payload().unwrap(), b"hello".to_vec());
    }

    #[test]
    fn test_invalid_or_missing_payload() {
        let invalid = ImageItem::new("a.png", ".png").with_base64("not base64!!");
        assert!(matches!(
            invalid.payload(),
            Err(NextcloudError::InvalidPayload { .. })
        ));

        let empty = ImageItem::new("a.png", ".png");
        assert!(matches!(
            empty.payload(),
            Err(NextcloudError::MissingPayload { .. })
        ));
    }

    #[test]
    fn test_item_json_round_trip_keeps_host_fields() {
        let raw = json!({
            "fileName": "cat.png",
            "extname": ".png",
            "imgUrl": "https://cdn.example.com/alice/picgo/cat.png",
            "type": "nextcloud",
            "id": "7d1c",
            "width": 640
        });

        let item: ImageItem = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(item.file_name, "cat.png");
        assert!(item.belongs_to("nextcloud"));
        assert_eq!(item.extra["width"], 640);

        assert_eq!(serde_json::to_value(&item).unwrap(), raw);
    }

    #[test]
    fn test_buffer_is_never_serialized() {
        let item = ImageItem::new("a.png", ".png").with_buffer(vec![1, 2, 3]);
        let value = serde_json::to_value(&item).unwrap();

        assert!(value.get("buffer").is_none());
        assert!(value.get("base64Image").is_none());
    }

    #[test]
    fn test_buffer_is_read_from_host_json() {
        let item: ImageItem = serde_json::from_value(json!({
            "fileName": "a.png",
            "buffer": [1, 2, 3],
            "base64Image": STANDARD.encode(b"other")
        }))
        .unwrap();

        assert_eq!(item.buffer.as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(item.extra.is_empty());
        assert_eq!(item.payload().unwrap(), vec![1, 2, 3]);

        let node: ImageItem = serde_json::from_value(json!({
            "fileName": "b.png",
            "buffer": { "type": "Buffer", "data": [9, 8] }
        }))
        .unwrap();
        assert_eq!(node.payload().unwrap(), vec![9, 8]);

        let null: ImageItem =
            serde_json::from_value(json!({ "fileName": "c.png", "buffer": null })).unwrap();
        assert!(null.buffer.is_none());
    }

    #[test]
    fn test_strip_payload_clears_leftover_payload_keys() {
        let mut item = ImageItem::new("a.png", ".png").with_buffer(vec![1]);
        item.extra.insert("buffer".to_string(), json!("junk"));
        item.extra.insert("base64Image".to_string(), json!("AQID"));
        item.extra.insert("id".to_string(), json!("k1"));

        item.strip_payload();

        let value = serde_json::to_value(&item).unwrap();
        assert!(value.get("buffer").is_none());
        assert!(value.get("base64Image").is_none());
        assert_eq!(value["id"], "k1");
    }

    #[test]
    fn test_apply_strips_payload_and_sets_urls() {
        let mut items = vec![
            ImageItem::new("a.png", ".png").with_buffer(vec![1]),
            ImageItem::new("b.png", ".png").with_base64("Ag=="),
            ImageItem::new("c.png", ".png").with_buffer(vec![3]),
        ];
        let report = UploadReport {
            outcomes: vec![
                ItemOutcome::Shared {
                    index: 0,
                    file_name: "a.png".to_string(),
                    img_url: "https://cdn/a.png".to_string(),
                },
                ItemOutcome::ShareRejected {
                    index: 1,
                    file_name: "b.png".to_string(),
                    status_code: 403,
                    message: None,
                },
            ],
            error: Some(NextcloudError::ConfigurationMissing),
        };

        report.apply(&mut items);

        assert_eq!(items[0].img_url.as_deref(), Some("https://cdn/a.png"));
        assert!(!items[0].has_payload());
        assert_eq!(items[1].img_url, None);
        assert!(!items[1].has_payload());
        // never processed, left alone
        assert!(items[2].has_payload());
        assert!(!report.is_complete());
        assert_eq!(report.shared_count(), 1);
    }

    #[test]
    fn test_share_request_body() {
        let body = serde_json::to_value(ShareRequest::public_link("/picgo/a.png".to_string())).unwrap();
        assert_eq!(body, json!({ "path": "/picgo/a.png", "shareType": 3 }));
    }

    #[test]
    fn test_share_response_envelope() {
        let ok: ShareResponse = serde_json::from_value(json!({
            "ocs": {
                "meta": { "status": "ok", "statuscode": 200, "message": "OK" },
                "data": { "id": "12", "url": "https://cloud.example.com/s/abc" }
            }
        }))
        .unwrap();
        assert!(ok.is_success());
        assert_eq!(ok.ocs.data["url"], "https://cloud.example.com/s/abc");

        let rejected: ShareResponse = serde_json::from_value(json!({
            "ocs": { "meta": { "statuscode": 403, "message": "Public upload disabled" } }
        }))
        .unwrap();
        assert!(!rejected.is_success());
        assert_eq!(rejected.message(), Some("Public upload disabled"));
    }
}

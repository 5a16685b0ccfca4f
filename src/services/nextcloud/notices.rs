// Notification texts shown by the host.

pub const UPLOAD_SUCCESS_TITLE: &str = "Image link copied!";
pub const UPLOAD_FAILED_TITLE: &str = "Upload failed";

pub const SHARE_FAILED_TITLE: &str = "NextCloud sharing failed";
pub const SHARE_FAILED_BODY: &str = "Please check your NextCloud settings";

pub const DELETE_NOTICE_TITLE: &str = "Delete notice";
pub const DELETE_FAILED_TITLE: &str = "Delete failed";
pub const REMOVAL_SYNCED_BODY: &str = "Remote files deleted";

pub fn deleted_body(file_name: &str) -> String {
    format!("Deleted file {}", file_name)
}

pub fn removal_failed_body(failed: usize) -> String {
    format!("{} file(s) could not be deleted", failed)
}

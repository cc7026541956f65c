use waf_embargo_core::notification::ParserNotification;

pub trait BucketStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String>;
    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String>;
    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), String>;
    /// Replaces the bucket's notification configuration. `None` clears it.
    fn put_parser_notification(
        &self,
        bucket: &str,
        notification: Option<&ParserNotification>,
    ) -> Result<(), String>;
}

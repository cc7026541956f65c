/// Read access to the public bucket that ships the seed embargo list.
pub trait OriginFetcher {
    fn fetch_public_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String>;
}

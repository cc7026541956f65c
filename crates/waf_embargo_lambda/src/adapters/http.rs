use std::time::Duration;

use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;

use crate::adapters::block_on;
use crate::adapters::callback::CallbackSender;
use crate::adapters::origin::OriginFetcher;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const GLOBAL_S3_ENDPOINT: &str = "https://s3.amazonaws.com";
const BUCKET_REGION_HEADER: &str = "x-amz-bucket-region";
const DEFAULT_REGION: &str = "us-east-1";

fn build_client() -> Result<Client, String> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|error| format!("failed to build http client: {error}"))
}

/// Path-style URL of a public object, on the regional endpoint when the bucket
/// lives outside `us-east-1`.
pub fn origin_object_url(bucket: &str, key: &str, region: Option<&str>) -> String {
    match region.map(str::trim) {
        Some(region) if !region.is_empty() && region != DEFAULT_REGION => {
            format!("https://s3.{region}.amazonaws.com/{bucket}/{key}")
        }
        _ => format!("{GLOBAL_S3_ENDPOINT}/{bucket}/{key}"),
    }
}

/// Anonymous HTTPS reader for the public seed bucket.
#[derive(Debug, Clone)]
pub struct HttpOriginFetcher {
    client: Client,
}

impl HttpOriginFetcher {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl OriginFetcher for HttpOriginFetcher {
    fn fetch_public_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let client = self.client.clone();
        block_on(async move {
            let head = client
                .head(origin_object_url(bucket, key, None))
                .send()
                .await
                .map_err(|error| format!("failed to locate s3://{bucket}/{key}: {error}"))?;
            let region = head
                .headers()
                .get(BUCKET_REGION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);

            let url = origin_object_url(bucket, key, region.as_deref());
            let response = client
                .get(&url)
                .send()
                .await
                .and_then(|response| response.error_for_status())
                .map_err(|error| format!("failed to download {url}: {error}"))?;
            let body = response
                .bytes()
                .await
                .map_err(|error| format!("failed to read {url}: {error}"))?;
            Ok(body.to_vec())
        })
    }
}

/// PUTs the response document to the pre-signed `ResponseURL`.
#[derive(Debug, Clone)]
pub struct HttpCallbackSender {
    client: Client,
}

impl HttpCallbackSender {
    pub fn new() -> Result<Self, String> {
        Ok(Self {
            client: build_client()?,
        })
    }
}

impl CallbackSender for HttpCallbackSender {
    fn send(&self, response_url: &str, body: &str) -> Result<(), String> {
        let request = self
            .client
            .put(response_url)
            // The pre-signed URL is signed with an empty content type.
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, body.len())
            .body(body.to_string());

        let response = block_on(request.send())
            .map_err(|error| format!("failed to deliver custom resource response: {error}"))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!(
                "custom resource response rejected with status {status}"
            ))
        }
    }
}

use aws_config::SdkConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    Event, FilterRule, FilterRuleName, LambdaFunctionConfiguration, NotificationConfiguration,
    NotificationConfigurationFilter, S3KeyFilter,
};
use waf_embargo_core::notification::ParserNotification;

use crate::adapters::block_on;
use crate::adapters::object_store::BucketStore;

#[derive(Debug, Clone)]
pub struct S3BucketStore {
    s3_client: aws_sdk_s3::Client,
}

impl S3BucketStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            s3_client: aws_sdk_s3::Client::new(config),
        }
    }
}

fn notification_configuration(
    notification: Option<&ParserNotification>,
) -> Result<NotificationConfiguration, String> {
    let Some(notification) = notification else {
        return Ok(NotificationConfiguration::builder().build());
    };

    let key_filter = S3KeyFilter::builder()
        .filter_rules(
            FilterRule::builder()
                .name(FilterRuleName::Prefix)
                .value(notification.prefix.clone())
                .build(),
        )
        .filter_rules(
            FilterRule::builder()
                .name(FilterRuleName::Suffix)
                .value(notification.suffix.clone())
                .build(),
        )
        .build();

    let lambda_configuration = LambdaFunctionConfiguration::builder()
        .id(notification.id.clone())
        .lambda_function_arn(notification.function_arn.clone())
        .set_events(Some(
            notification
                .events
                .iter()
                .map(|event| Event::from(event.as_str()))
                .collect(),
        ))
        .filter(
            NotificationConfigurationFilter::builder()
                .key(key_filter)
                .build(),
        )
        .build()
        .map_err(|error| format!("invalid lambda notification configuration: {error}"))?;

    Ok(NotificationConfiguration::builder()
        .lambda_function_configurations(lambda_configuration)
        .build())
}

impl BucketStore for S3BucketStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let client = self.s3_client.clone();
        block_on(async move {
            let output = client
                .get_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|error| format!("failed to read s3://{bucket}/{key}: {error}"))?;
            let body = output
                .body
                .collect()
                .await
                .map_err(|error| format!("failed to download s3://{bucket}/{key}: {error}"))?;
            Ok(body.into_bytes().to_vec())
        })
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        let body_bytes = body.to_vec();
        block_on(
            self.s3_client
                .put_object()
                .bucket(bucket)
                .key(key)
                .body(ByteStream::from(body_bytes))
                .send(),
        )
        .map(|_| ())
        .map_err(|error| format!("failed to write s3://{bucket}/{key}: {error}"))
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), String> {
        block_on(self.s3_client.delete_object().bucket(bucket).key(key).send())
            .map(|_| ())
            .map_err(|error| format!("failed to delete s3://{bucket}/{key}: {error}"))
    }

    fn put_parser_notification(
        &self,
        bucket: &str,
        notification: Option<&ParserNotification>,
    ) -> Result<(), String> {
        let configuration = notification_configuration(notification)?;
        block_on(
            self.s3_client
                .put_bucket_notification_configuration()
                .bucket(bucket)
                .notification_configuration(configuration)
                .send(),
        )
        .map(|_| ())
        .map_err(|error| format!("failed to configure notifications on {bucket}: {error}"))
    }
}

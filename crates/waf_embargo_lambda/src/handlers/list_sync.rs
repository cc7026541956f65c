use serde_json::Value;
use tracing::{error, info};
use waf_embargo_core::contract::{HandlerResponse, S3NotificationEvent, ValidationError};
use waf_embargo_core::list_file::parse_desired_list;

use crate::adapters::firewall::FirewallApi;
use crate::adapters::object_store::BucketStore;
use crate::config::FirewallTargets;
use crate::error::HandlerError;
use crate::handlers::reconcile::{reconcile_block_lists, ReconcileReport};

pub fn handle_list_sync_event(
    event: Value,
    targets: &FirewallTargets,
    store: &dyn BucketStore,
    firewall: &dyn FirewallApi,
) -> HandlerResponse {
    match sync_block_lists(event, targets, store, firewall) {
        Ok(report) => {
            info!(
                component = "list_sync",
                event = "sync_completed",
                countries_inserted = report.countries_inserted,
                countries_deleted = report.countries_deleted,
                ips_inserted = report.ips_inserted,
                ips_deleted = report.ips_deleted,
                "block lists synchronized"
            );
            HandlerResponse::success()
        }
        Err(error) => {
            error!(
                component = "list_sync",
                event = "sync_failed",
                error = %error,
                "block list synchronization failed"
            );
            HandlerResponse::failure(error.to_string())
        }
    }
}

/// Downloads the list file named by the notification and reconciles the
/// firewall lists against it.
pub fn sync_block_lists(
    event: Value,
    targets: &FirewallTargets,
    store: &dyn BucketStore,
    firewall: &dyn FirewallApi,
) -> Result<ReconcileReport, HandlerError> {
    let notification: S3NotificationEvent = serde_json::from_value(event).map_err(|error| {
        ValidationError::new(format!("Malformed S3 notification: {error}"))
    })?;
    let location = notification.first_object()?;
    info!(
        component = "list_sync",
        event = "list_file_received",
        bucket = %location.bucket,
        key = %location.key,
        "reading embargo list"
    );

    let body = store
        .get_object(&location.bucket, &location.key)
        .map_err(HandlerError::Storage)?;
    let desired = parse_desired_list(&body)?;

    reconcile_block_lists(firewall, targets, &desired)
}

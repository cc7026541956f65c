pub mod callback;
pub mod list_sync;
pub mod provisioning;
pub mod reconcile;

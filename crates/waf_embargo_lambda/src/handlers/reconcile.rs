use tracing::{debug, info};
use waf_embargo_core::diff::{clear_updates, Diff, ReconcilePlan};
use waf_embargo_core::entry::{BlockKind, BlockList};

use crate::adapters::firewall::{ChangeToken, FirewallApi};
use crate::config::FirewallTargets;
use crate::error::HandlerError;

/// Entries changed by one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub countries_inserted: usize,
    pub countries_deleted: usize,
    pub ips_inserted: usize,
    pub ips_deleted: usize,
}

impl ReconcileReport {
    fn from_plan(plan: &ReconcilePlan) -> Self {
        Self {
            countries_inserted: plan.countries.to_add.len(),
            countries_deleted: plan.countries.to_remove.len(),
            ips_inserted: plan.ips.to_add.len(),
            ips_deleted: plan.ips.to_remove.len(),
        }
    }

    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

pub(crate) fn change_token(firewall: &dyn FirewallApi) -> Result<ChangeToken, HandlerError> {
    firewall.get_change_token().map_err(HandlerError::Firewall)
}

/// Reads both firewall lists. Fails as a whole if either read fails.
pub fn fetch_current_list(
    firewall: &dyn FirewallApi,
    targets: &FirewallTargets,
) -> Result<BlockList, HandlerError> {
    let countries = firewall
        .get_block_list(BlockKind::Country, &targets.geo_match_set_id)
        .map_err(HandlerError::Firewall)?;
    let ips = firewall
        .get_block_list(BlockKind::IpAddress, &targets.ip_set_id)
        .map_err(HandlerError::Firewall)?;
    Ok(BlockList { countries, ips })
}

/// Issues one batched update for `diff`, or nothing when it is empty.
///
/// Returns whether a mutating call was made.
pub fn apply_diff(
    firewall: &dyn FirewallApi,
    kind: BlockKind,
    list_id: &str,
    diff: &Diff,
) -> Result<bool, HandlerError> {
    if diff.is_empty() {
        debug!(kind = kind.as_str(), list_id, "block list already aligned");
        return Ok(false);
    }

    let token = change_token(firewall)?;
    firewall
        .update_block_list(kind, list_id, token, &diff.updates())
        .map_err(HandlerError::Firewall)?;
    info!(
        kind = kind.as_str(),
        list_id,
        inserted = diff.to_add.len(),
        deleted = diff.to_remove.len(),
        "block list updated"
    );
    Ok(true)
}

/// Makes the firewall lists named by `targets` equal to `desired`.
///
/// Current state is fetched in full before anything is written. Countries and
/// IPs are then applied as independent batches, each with its own token.
pub fn reconcile_block_lists(
    firewall: &dyn FirewallApi,
    targets: &FirewallTargets,
    desired: &BlockList,
) -> Result<ReconcileReport, HandlerError> {
    let current = fetch_current_list(firewall, targets)?;
    let plan = ReconcilePlan::compute(desired, &current);

    apply_diff(
        firewall,
        BlockKind::Country,
        &targets.geo_match_set_id,
        &plan.countries,
    )?;
    apply_diff(firewall, BlockKind::IpAddress, &targets.ip_set_id, &plan.ips)?;

    Ok(ReconcileReport::from_plan(&plan))
}

/// Deletes every entry of one firewall list. Returns the number removed.
pub fn clear_block_list(
    firewall: &dyn FirewallApi,
    kind: BlockKind,
    list_id: &str,
) -> Result<usize, HandlerError> {
    let current = firewall
        .get_block_list(kind, list_id)
        .map_err(HandlerError::Firewall)?;
    let updates = clear_updates(&current);
    if updates.is_empty() {
        return Ok(0);
    }

    let token = change_token(firewall)?;
    firewall
        .update_block_list(kind, list_id, token, &updates)
        .map_err(HandlerError::Firewall)?;
    Ok(updates.len())
}

use std::collections::BTreeSet;
use std::fmt;

use waf_embargo_core::contract::WafAssociationProperties;
use waf_embargo_core::diff::{BlockUpdate, UpdateAction};
use waf_embargo_core::entry::{BlockEntry, BlockKind};

/// Single-use authorization for one mutating WAF call.
///
/// Neither `Clone` nor `Copy`; mutating methods take it by value so it is
/// spent exactly once.
pub struct ChangeToken(String);

impl ChangeToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ChangeToken(..)")
    }
}

/// A `REGULAR` rule as placed into a web ACL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivatedRuleSpec {
    pub rule_id: String,
    pub priority: i32,
    pub action: String,
}

impl ActivatedRuleSpec {
    pub fn geo_rule(properties: &WafAssociationProperties) -> Self {
        Self {
            rule_id: properties.rule_id_geo.clone(),
            priority: properties.rule_priority_geo,
            action: properties.rule_action.clone(),
        }
    }
}

/// The subset of the WAF classic API the handlers use.
pub trait FirewallApi {
    fn get_change_token(&self) -> Result<ChangeToken, String>;

    fn create_geo_match_set(&self, name: &str, token: ChangeToken) -> Result<String, String>;

    fn delete_geo_match_set(&self, geo_match_set_id: &str, token: ChangeToken)
        -> Result<(), String>;

    /// Country constraints only; other constraint types are ignored.
    fn get_geo_match_set(&self, geo_match_set_id: &str) -> Result<BTreeSet<BlockEntry>, String>;

    fn update_geo_match_set(
        &self,
        geo_match_set_id: &str,
        token: ChangeToken,
        updates: &[BlockUpdate],
    ) -> Result<(), String>;

    fn get_ip_set(&self, ip_set_id: &str) -> Result<BTreeSet<BlockEntry>, String>;

    fn update_ip_set(
        &self,
        ip_set_id: &str,
        token: ChangeToken,
        updates: &[BlockUpdate],
    ) -> Result<(), String>;

    /// Inserts or deletes a non-negated `GeoMatch` predicate on a rule.
    fn update_rule_geo_predicate(
        &self,
        rule_id: &str,
        token: ChangeToken,
        action: UpdateAction,
        geo_match_set_id: &str,
    ) -> Result<(), String>;

    fn get_web_acl_default_action(&self, web_acl_id: &str) -> Result<String, String>;

    fn update_web_acl_rule(
        &self,
        web_acl_id: &str,
        token: ChangeToken,
        action: UpdateAction,
        rule: &ActivatedRuleSpec,
        default_action: &str,
    ) -> Result<(), String>;

    fn get_block_list(
        &self,
        kind: BlockKind,
        list_id: &str,
    ) -> Result<BTreeSet<BlockEntry>, String> {
        match kind {
            BlockKind::Country => self.get_geo_match_set(list_id),
            BlockKind::IpAddress => self.get_ip_set(list_id),
        }
    }

    fn update_block_list(
        &self,
        kind: BlockKind,
        list_id: &str,
        token: ChangeToken,
        updates: &[BlockUpdate],
    ) -> Result<(), String> {
        match kind {
            BlockKind::Country => self.update_geo_match_set(list_id, token, updates),
            BlockKind::IpAddress => self.update_ip_set(list_id, token, updates),
        }
    }
}

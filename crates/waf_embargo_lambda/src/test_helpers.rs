//! In-memory fakes for the adapter traits.
//!
//! The firewall fake enforces the WAF classic rules the handlers depend on:
//! change tokens are redeemable once, inserting a present entry or deleting a
//! missing one fails, and a geo match set must be empty before deletion.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use waf_embargo_core::contract::CustomResourceResponse;
use waf_embargo_core::diff::{BlockUpdate, UpdateAction};
use waf_embargo_core::entry::{BlockEntry, BlockKind};
use waf_embargo_core::notification::ParserNotification;

use crate::adapters::callback::CallbackSender;
use crate::adapters::firewall::{ActivatedRuleSpec, ChangeToken, FirewallApi};
use crate::adapters::object_store::BucketStore;
use crate::adapters::origin::OriginFetcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirewallCall {
    GetChangeToken,
    CreateGeoMatchSet {
        name: String,
    },
    DeleteGeoMatchSet {
        geo_match_set_id: String,
    },
    GetGeoMatchSet {
        geo_match_set_id: String,
    },
    UpdateGeoMatchSet {
        geo_match_set_id: String,
        updates: Vec<BlockUpdate>,
    },
    GetIpSet {
        ip_set_id: String,
    },
    UpdateIpSet {
        ip_set_id: String,
        updates: Vec<BlockUpdate>,
    },
    UpdateRule {
        rule_id: String,
        action: UpdateAction,
        geo_match_set_id: String,
    },
    GetWebAcl {
        web_acl_id: String,
    },
    UpdateWebAcl {
        web_acl_id: String,
        action: UpdateAction,
        rule: ActivatedRuleSpec,
        default_action: String,
    },
}

impl FirewallCall {
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::CreateGeoMatchSet { .. }
                | Self::DeleteGeoMatchSet { .. }
                | Self::UpdateGeoMatchSet { .. }
                | Self::UpdateIpSet { .. }
                | Self::UpdateRule { .. }
                | Self::UpdateWebAcl { .. }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebAclState {
    pub default_action: String,
    pub rules: Vec<ActivatedRuleSpec>,
}

#[derive(Debug, Default)]
struct FirewallState {
    geo_match_sets: BTreeMap<String, BTreeSet<BlockEntry>>,
    ip_sets: BTreeMap<String, BTreeSet<BlockEntry>>,
    rule_predicates: BTreeMap<String, BTreeSet<String>>,
    web_acls: BTreeMap<String, WebAclState>,
    outstanding_tokens: BTreeSet<String>,
    tokens_issued: usize,
    geo_match_sets_created: usize,
    failing: BTreeSet<String>,
    calls: Vec<FirewallCall>,
}

impl FirewallState {
    fn record(&mut self, operation: &str, call: FirewallCall) -> Result<(), String> {
        self.calls.push(call);
        if self.failing.contains(operation) {
            return Err(format!("injected failure in {operation}"));
        }
        Ok(())
    }

    fn redeem(&mut self, token: ChangeToken) -> Result<(), String> {
        if self.outstanding_tokens.remove(token.as_str()) {
            Ok(())
        } else {
            Err(format!(
                "WAFStaleDataException: change token {} is not valid",
                token.as_str()
            ))
        }
    }
}

fn apply_updates(
    list: &BTreeSet<BlockEntry>,
    updates: &[BlockUpdate],
    kind: BlockKind,
) -> Result<BTreeSet<BlockEntry>, String> {
    let mut next = list.clone();
    for update in updates {
        if update.entry.kind != kind {
            return Err(format!(
                "WAFInvalidParameterException: {} in {} list",
                update.entry,
                kind.as_str()
            ));
        }
        let applied = match update.action {
            UpdateAction::Insert => next.insert(update.entry.clone()),
            UpdateAction::Delete => next.remove(&update.entry),
        };
        if !applied {
            return Err(format!(
                "WAFInvalidOperationException: cannot {} {}",
                update.action.as_str(),
                update.entry
            ));
        }
    }
    Ok(next)
}

#[derive(Debug, Default)]
pub struct InMemoryFirewall {
    state: Mutex<FirewallState>,
}

impl InMemoryFirewall {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FirewallState> {
        self.state.lock().expect("poisoned mutex")
    }

    pub fn seed_geo_match_set<'a>(&self, id: &str, codes: impl IntoIterator<Item = &'a str>) {
        self.lock().geo_match_sets.insert(
            id.to_string(),
            codes.into_iter().map(BlockEntry::country).collect(),
        );
    }

    pub fn seed_ip_set<'a>(&self, id: &str, cidrs: impl IntoIterator<Item = &'a str>) {
        self.lock()
            .ip_sets
            .insert(id.to_string(), cidrs.into_iter().map(BlockEntry::ip).collect());
    }

    pub fn seed_rule(&self, rule_id: &str) {
        self.lock()
            .rule_predicates
            .entry(rule_id.to_string())
            .or_default();
    }

    pub fn seed_web_acl(&self, web_acl_id: &str, default_action: &str) {
        self.lock().web_acls.insert(
            web_acl_id.to_string(),
            WebAclState {
                default_action: default_action.to_string(),
                rules: Vec::new(),
            },
        );
    }

    /// Every later call of `operation` (a trait method name) fails.
    pub fn fail_operation(&self, operation: &str) {
        self.lock().failing.insert(operation.to_string());
    }

    pub fn calls(&self) -> Vec<FirewallCall> {
        self.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<FirewallCall> {
        self.calls()
            .into_iter()
            .filter(FirewallCall::is_mutation)
            .collect()
    }

    pub fn tokens_issued(&self) -> usize {
        self.lock().tokens_issued
    }

    pub fn geo_match_set(&self, id: &str) -> BTreeSet<BlockEntry> {
        self.lock()
            .geo_match_sets
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn has_geo_match_set(&self, id: &str) -> bool {
        self.lock().geo_match_sets.contains_key(id)
    }

    pub fn ip_set(&self, id: &str) -> BTreeSet<BlockEntry> {
        self.lock().ip_sets.get(id).cloned().unwrap_or_default()
    }

    pub fn rule_predicates(&self, rule_id: &str) -> BTreeSet<String> {
        self.lock()
            .rule_predicates
            .get(rule_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn web_acl(&self, web_acl_id: &str) -> Option<WebAclState> {
        self.lock().web_acls.get(web_acl_id).cloned()
    }
}

impl FirewallApi for InMemoryFirewall {
    fn get_change_token(&self) -> Result<ChangeToken, String> {
        let mut state = self.lock();
        state.record("get_change_token", FirewallCall::GetChangeToken)?;
        state.tokens_issued += 1;
        let token = format!("token-{}", state.tokens_issued);
        state.outstanding_tokens.insert(token.clone());
        Ok(ChangeToken::new(token))
    }

    fn create_geo_match_set(&self, name: &str, token: ChangeToken) -> Result<String, String> {
        let mut state = self.lock();
        state.record(
            "create_geo_match_set",
            FirewallCall::CreateGeoMatchSet {
                name: name.to_string(),
            },
        )?;
        state.redeem(token)?;
        state.geo_match_sets_created += 1;
        let id = format!("geo-match-set-{}", state.geo_match_sets_created);
        state.geo_match_sets.insert(id.clone(), BTreeSet::new());
        Ok(id)
    }

    fn delete_geo_match_set(
        &self,
        geo_match_set_id: &str,
        token: ChangeToken,
    ) -> Result<(), String> {
        let mut state = self.lock();
        state.record(
            "delete_geo_match_set",
            FirewallCall::DeleteGeoMatchSet {
                geo_match_set_id: geo_match_set_id.to_string(),
            },
        )?;
        state.redeem(token)?;
        match state.geo_match_sets.get(geo_match_set_id) {
            None => Err(format!(
                "WAFNonexistentItemException: geo match set {geo_match_set_id}"
            )),
            Some(set) if !set.is_empty() => Err(format!(
                "WAFNonEmptyEntityException: geo match set {geo_match_set_id}"
            )),
            Some(_) => {
                state.geo_match_sets.remove(geo_match_set_id);
                Ok(())
            }
        }
    }

    fn get_geo_match_set(&self, geo_match_set_id: &str) -> Result<BTreeSet<BlockEntry>, String> {
        let mut state = self.lock();
        state.record(
            "get_geo_match_set",
            FirewallCall::GetGeoMatchSet {
                geo_match_set_id: geo_match_set_id.to_string(),
            },
        )?;
        state
            .geo_match_sets
            .get(geo_match_set_id)
            .cloned()
            .ok_or_else(|| format!("WAFNonexistentItemException: geo match set {geo_match_set_id}"))
    }

    fn update_geo_match_set(
        &self,
        geo_match_set_id: &str,
        token: ChangeToken,
        updates: &[BlockUpdate],
    ) -> Result<(), String> {
        let mut state = self.lock();
        state.record(
            "update_geo_match_set",
            FirewallCall::UpdateGeoMatchSet {
                geo_match_set_id: geo_match_set_id.to_string(),
                updates: updates.to_vec(),
            },
        )?;
        state.redeem(token)?;
        let current = state.geo_match_sets.get(geo_match_set_id).ok_or_else(|| {
            format!("WAFNonexistentItemException: geo match set {geo_match_set_id}")
        })?;
        let next = apply_updates(current, updates, BlockKind::Country)?;
        state
            .geo_match_sets
            .insert(geo_match_set_id.to_string(), next);
        Ok(())
    }

    fn get_ip_set(&self, ip_set_id: &str) -> Result<BTreeSet<BlockEntry>, String> {
        let mut state = self.lock();
        state.record(
            "get_ip_set",
            FirewallCall::GetIpSet {
                ip_set_id: ip_set_id.to_string(),
            },
        )?;
        state
            .ip_sets
            .get(ip_set_id)
            .cloned()
            .ok_or_else(|| format!("WAFNonexistentItemException: ip set {ip_set_id}"))
    }

    fn update_ip_set(
        &self,
        ip_set_id: &str,
        token: ChangeToken,
        updates: &[BlockUpdate],
    ) -> Result<(), String> {
        let mut state = self.lock();
        state.record(
            "update_ip_set",
            FirewallCall::UpdateIpSet {
                ip_set_id: ip_set_id.to_string(),
                updates: updates.to_vec(),
            },
        )?;
        state.redeem(token)?;
        let current = state
            .ip_sets
            .get(ip_set_id)
            .ok_or_else(|| format!("WAFNonexistentItemException: ip set {ip_set_id}"))?;
        let next = apply_updates(current, updates, BlockKind::IpAddress)?;
        state.ip_sets.insert(ip_set_id.to_string(), next);
        Ok(())
    }

    fn update_rule_geo_predicate(
        &self,
        rule_id: &str,
        token: ChangeToken,
        action: UpdateAction,
        geo_match_set_id: &str,
    ) -> Result<(), String> {
        let mut state = self.lock();
        state.record(
            "update_rule_geo_predicate",
            FirewallCall::UpdateRule {
                rule_id: rule_id.to_string(),
                action,
                geo_match_set_id: geo_match_set_id.to_string(),
            },
        )?;
        state.redeem(token)?;
        let predicates = state
            .rule_predicates
            .get_mut(rule_id)
            .ok_or_else(|| format!("WAFNonexistentItemException: rule {rule_id}"))?;
        let applied = match action {
            UpdateAction::Insert => predicates.insert(geo_match_set_id.to_string()),
            UpdateAction::Delete => predicates.remove(geo_match_set_id),
        };
        if applied {
            Ok(())
        } else {
            Err(format!(
                "WAFInvalidOperationException: cannot {} predicate {geo_match_set_id} on rule {rule_id}",
                action.as_str()
            ))
        }
    }

    fn get_web_acl_default_action(&self, web_acl_id: &str) -> Result<String, String> {
        let mut state = self.lock();
        state.record(
            "get_web_acl_default_action",
            FirewallCall::GetWebAcl {
                web_acl_id: web_acl_id.to_string(),
            },
        )?;
        state
            .web_acls
            .get(web_acl_id)
            .map(|acl| acl.default_action.clone())
            .ok_or_else(|| format!("WAFNonexistentItemException: web acl {web_acl_id}"))
    }

    fn update_web_acl_rule(
        &self,
        web_acl_id: &str,
        token: ChangeToken,
        action: UpdateAction,
        rule: &ActivatedRuleSpec,
        default_action: &str,
    ) -> Result<(), String> {
        let mut state = self.lock();
        state.record(
            "update_web_acl_rule",
            FirewallCall::UpdateWebAcl {
                web_acl_id: web_acl_id.to_string(),
                action,
                rule: rule.clone(),
                default_action: default_action.to_string(),
            },
        )?;
        state.redeem(token)?;
        let acl = state
            .web_acls
            .get_mut(web_acl_id)
            .ok_or_else(|| format!("WAFNonexistentItemException: web acl {web_acl_id}"))?;
        match action {
            UpdateAction::Insert => {
                if acl.rules.iter().any(|existing| existing.rule_id == rule.rule_id) {
                    return Err(format!(
                        "WAFInvalidOperationException: rule {} already in web acl {web_acl_id}",
                        rule.rule_id
                    ));
                }
                acl.rules.push(rule.clone());
            }
            UpdateAction::Delete => {
                let Some(position) = acl.rules.iter().position(|existing| existing == rule) else {
                    return Err(format!(
                        "WAFNonexistentItemException: rule {} not in web acl {web_acl_id}",
                        rule.rule_id
                    ));
                };
                acl.rules.remove(position);
            }
        }
        acl.default_action = default_action.to_string();
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    GetObject {
        bucket: String,
        key: String,
    },
    PutObject {
        bucket: String,
        key: String,
    },
    DeleteObject {
        bucket: String,
        key: String,
    },
    PutNotification {
        bucket: String,
        notification: Option<ParserNotification>,
    },
}

#[derive(Debug, Default)]
struct StoreState {
    objects: BTreeMap<(String, String), Vec<u8>>,
    notifications: BTreeMap<String, ParserNotification>,
    failing: BTreeSet<String>,
    calls: Vec<StoreCall>,
}

impl StoreState {
    fn record(&mut self, operation: &str, call: StoreCall) -> Result<(), String> {
        self.calls.push(call);
        if self.failing.contains(operation) {
            return Err(format!("injected failure in {operation}"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryBucketStore {
    state: Mutex<StoreState>,
}

impl InMemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("poisoned mutex")
    }

    pub fn seed_object(&self, bucket: &str, key: &str, body: &[u8]) {
        self.lock()
            .objects
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
    }

    pub fn fail_operation(&self, operation: &str) {
        self.lock().failing.insert(operation.to_string());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn notification(&self, bucket: &str) -> Option<ParserNotification> {
        self.lock().notifications.get(bucket).cloned()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }
}

impl BucketStore for InMemoryBucketStore {
    fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let mut state = self.lock();
        state.record(
            "get_object",
            StoreCall::GetObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
        )?;
        state
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| format!("NoSuchKey: s3://{bucket}/{key}"))
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), String> {
        let mut state = self.lock();
        state.record(
            "put_object",
            StoreCall::PutObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
        )?;
        state
            .objects
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
        Ok(())
    }

    fn delete_object(&self, bucket: &str, key: &str) -> Result<(), String> {
        let mut state = self.lock();
        state.record(
            "delete_object",
            StoreCall::DeleteObject {
                bucket: bucket.to_string(),
                key: key.to_string(),
            },
        )?;
        state.objects.remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    fn put_parser_notification(
        &self,
        bucket: &str,
        notification: Option<&ParserNotification>,
    ) -> Result<(), String> {
        let mut state = self.lock();
        state.record(
            "put_parser_notification",
            StoreCall::PutNotification {
                bucket: bucket.to_string(),
                notification: notification.cloned(),
            },
        )?;
        match notification {
            Some(notification) => {
                state
                    .notifications
                    .insert(bucket.to_string(), notification.clone());
            }
            None => {
                state.notifications.remove(bucket);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct StaticOriginFetcher {
    objects: BTreeMap<(String, String), Vec<u8>>,
    fetches: Mutex<Vec<(String, String)>>,
}

impl StaticOriginFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, key: &str, body: &[u8]) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), body.to_vec());
        self
    }

    pub fn fetches(&self) -> Vec<(String, String)> {
        self.fetches.lock().expect("poisoned mutex").clone()
    }
}

impl OriginFetcher for StaticOriginFetcher {
    fn fetch_public_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        self.fetches
            .lock()
            .expect("poisoned mutex")
            .push((bucket.to_string(), key.to_string()));
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| format!("404 Not Found: {bucket}/{key}"))
    }
}

#[derive(Debug, Default)]
pub struct RecordingCallbackSender {
    deliveries: Mutex<Vec<(String, String)>>,
    reject: bool,
}

impl RecordingCallbackSender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records deliveries but reports each one as failed.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.deliveries.lock().expect("poisoned mutex").clone()
    }

    pub fn responses(&self) -> Vec<CustomResourceResponse> {
        self.deliveries()
            .iter()
            .map(|(_, body)| serde_json::from_str(body).expect("callback body should parse"))
            .collect()
    }
}

impl CallbackSender for RecordingCallbackSender {
    fn send(&self, response_url: &str, body: &str) -> Result<(), String> {
        self.deliveries
            .lock()
            .expect("poisoned mutex")
            .push((response_url.to_string(), body.to_string()));
        if self.reject {
            Err("403 Forbidden".to_string())
        } else {
            Ok(())
        }
    }
}

//! `FirewallApi` over the WAF classic SDKs.
//!
//! `aws-sdk-waf` and `aws-sdk-wafregional` expose the same operations with
//! distinct types, so the adapter body is generated once per SDK.

use std::collections::BTreeSet;

use aws_config::SdkConfig;
use waf_embargo_core::diff::{BlockUpdate, UpdateAction};
use waf_embargo_core::entry::{BlockEntry, BlockKind, IpFamily};

use crate::adapters::block_on;
use crate::adapters::firewall::{ActivatedRuleSpec, ChangeToken, FirewallApi};
use crate::config::FirewallApiKind;

const COUNTRY_CONSTRAINT_TYPE: &str = "Country";
const GEO_MATCH_PREDICATE_TYPE: &str = "GeoMatch";
const REGULAR_RULE_TYPE: &str = "REGULAR";

/// Firewall client for the endpoint family selected by `API_TYPE`.
pub fn firewall_client(
    kind: FirewallApiKind,
    config: &SdkConfig,
) -> Box<dyn FirewallApi + Send + Sync> {
    match kind {
        FirewallApiKind::Waf => Box::new(WafClassicClient::new(config)),
        FirewallApiKind::WafRegional => Box::new(WafRegionalClient::new(config)),
    }
}

fn ensure_kind(updates: &[BlockUpdate], kind: BlockKind) -> Result<(), String> {
    match updates.iter().find(|update| update.entry.kind != kind) {
        Some(update) => Err(format!(
            "refusing to apply {} to a {} list",
            update.entry,
            kind.as_str()
        )),
        None => Ok(()),
    }
}

macro_rules! waf_classic_adapter {
    ($name:ident, $sdk:ident, $label:literal) => {
        #[derive(Debug, Clone)]
        pub struct $name {
            client: $sdk::Client,
        }

        impl $name {
            pub fn new(config: &SdkConfig) -> Self {
                Self {
                    client: $sdk::Client::new(config),
                }
            }

            fn change_action(action: UpdateAction) -> $sdk::types::ChangeAction {
                $sdk::types::ChangeAction::from(action.as_str())
            }

            fn geo_updates(
                updates: &[BlockUpdate],
            ) -> Result<Vec<$sdk::types::GeoMatchSetUpdate>, String> {
                ensure_kind(updates, BlockKind::Country)?;
                updates
                    .iter()
                    .map(|update| {
                        let constraint = $sdk::types::GeoMatchConstraint::builder()
                            .r#type($sdk::types::GeoMatchConstraintType::from(
                                COUNTRY_CONSTRAINT_TYPE,
                            ))
                            .value($sdk::types::GeoMatchConstraintValue::from(
                                update.entry.value.as_str(),
                            ))
                            .build()
                            .map_err(|error| format!("invalid geo constraint: {error}"))?;
                        $sdk::types::GeoMatchSetUpdate::builder()
                            .action(Self::change_action(update.action))
                            .geo_match_constraint(constraint)
                            .build()
                            .map_err(|error| format!("invalid geo match set update: {error}"))
                    })
                    .collect()
            }

            fn ip_updates(
                updates: &[BlockUpdate],
            ) -> Result<Vec<$sdk::types::IpSetUpdate>, String> {
                ensure_kind(updates, BlockKind::IpAddress)?;
                updates
                    .iter()
                    .map(|update| {
                        let family = update.entry.ip_family().unwrap_or(IpFamily::V4);
                        let descriptor = $sdk::types::IpSetDescriptor::builder()
                            .r#type($sdk::types::IpSetDescriptorType::from(family.as_str()))
                            .value(update.entry.value.clone())
                            .build()
                            .map_err(|error| format!("invalid ip set descriptor: {error}"))?;
                        $sdk::types::IpSetUpdate::builder()
                            .action(Self::change_action(update.action))
                            .ip_set_descriptor(descriptor)
                            .build()
                            .map_err(|error| format!("invalid ip set update: {error}"))
                    })
                    .collect()
            }
        }

        impl FirewallApi for $name {
            fn get_change_token(&self) -> Result<ChangeToken, String> {
                let output = block_on(self.client.get_change_token().send())
                    .map_err(|error| format!("{}: failed to get change token: {error}", $label))?;
                output
                    .change_token()
                    .map(ChangeToken::new)
                    .ok_or_else(|| format!("{}: change token missing from response", $label))
            }

            fn create_geo_match_set(
                &self,
                name: &str,
                token: ChangeToken,
            ) -> Result<String, String> {
                let output = block_on(
                    self.client
                        .create_geo_match_set()
                        .name(name)
                        .change_token(token.into_inner())
                        .send(),
                )
                .map_err(|error| format!("{}: failed to create geo match set: {error}", $label))?;
                output
                    .geo_match_set()
                    .map(|set| set.geo_match_set_id().to_string())
                    .ok_or_else(|| format!("{}: created geo match set has no id", $label))
            }

            fn delete_geo_match_set(
                &self,
                geo_match_set_id: &str,
                token: ChangeToken,
            ) -> Result<(), String> {
                block_on(
                    self.client
                        .delete_geo_match_set()
                        .geo_match_set_id(geo_match_set_id)
                        .change_token(token.into_inner())
                        .send(),
                )
                .map(|_| ())
                .map_err(|error| {
                    format!(
                        "{}: failed to delete geo match set {geo_match_set_id}: {error}",
                        $label
                    )
                })
            }

            fn get_geo_match_set(
                &self,
                geo_match_set_id: &str,
            ) -> Result<BTreeSet<BlockEntry>, String> {
                let output = block_on(
                    self.client
                        .get_geo_match_set()
                        .geo_match_set_id(geo_match_set_id)
                        .send(),
                )
                .map_err(|error| {
                    format!(
                        "{}: failed to read geo match set {geo_match_set_id}: {error}",
                        $label
                    )
                })?;
                let Some(set) = output.geo_match_set() else {
                    return Err(format!(
                        "{}: geo match set {geo_match_set_id} missing from response",
                        $label
                    ));
                };
                Ok(set
                    .geo_match_constraints()
                    .iter()
                    .filter(|constraint| constraint.r#type().as_str() == COUNTRY_CONSTRAINT_TYPE)
                    .map(|constraint| BlockEntry::country(constraint.value().as_str()))
                    .collect())
            }

            fn update_geo_match_set(
                &self,
                geo_match_set_id: &str,
                token: ChangeToken,
                updates: &[BlockUpdate],
            ) -> Result<(), String> {
                let updates = Self::geo_updates(updates)?;
                block_on(
                    self.client
                        .update_geo_match_set()
                        .geo_match_set_id(geo_match_set_id)
                        .change_token(token.into_inner())
                        .set_updates(Some(updates))
                        .send(),
                )
                .map(|_| ())
                .map_err(|error| {
                    format!(
                        "{}: failed to update geo match set {geo_match_set_id}: {error}",
                        $label
                    )
                })
            }

            fn get_ip_set(&self, ip_set_id: &str) -> Result<BTreeSet<BlockEntry>, String> {
                let output = block_on(self.client.get_ip_set().ip_set_id(ip_set_id).send())
                    .map_err(|error| {
                        format!("{}: failed to read ip set {ip_set_id}: {error}", $label)
                    })?;
                let Some(set) = output.ip_set() else {
                    return Err(format!(
                        "{}: ip set {ip_set_id} missing from response",
                        $label
                    ));
                };
                Ok(set
                    .ip_set_descriptors()
                    .iter()
                    .map(|descriptor| BlockEntry::ip(descriptor.value()))
                    .collect())
            }

            fn update_ip_set(
                &self,
                ip_set_id: &str,
                token: ChangeToken,
                updates: &[BlockUpdate],
            ) -> Result<(), String> {
                let updates = Self::ip_updates(updates)?;
                block_on(
                    self.client
                        .update_ip_set()
                        .ip_set_id(ip_set_id)
                        .change_token(token.into_inner())
                        .set_updates(Some(updates))
                        .send(),
                )
                .map(|_| ())
                .map_err(|error| {
                    format!("{}: failed to update ip set {ip_set_id}: {error}", $label)
                })
            }

            fn update_rule_geo_predicate(
                &self,
                rule_id: &str,
                token: ChangeToken,
                action: UpdateAction,
                geo_match_set_id: &str,
            ) -> Result<(), String> {
                let predicate = $sdk::types::Predicate::builder()
                    .negated(false)
                    .r#type($sdk::types::PredicateType::from(GEO_MATCH_PREDICATE_TYPE))
                    .data_id(geo_match_set_id)
                    .build()
                    .map_err(|error| format!("invalid rule predicate: {error}"))?;
                let update = $sdk::types::RuleUpdate::builder()
                    .action(Self::change_action(action))
                    .predicate(predicate)
                    .build()
                    .map_err(|error| format!("invalid rule update: {error}"))?;
                block_on(
                    self.client
                        .update_rule()
                        .rule_id(rule_id)
                        .change_token(token.into_inner())
                        .updates(update)
                        .send(),
                )
                .map(|_| ())
                .map_err(|error| format!("{}: failed to update rule {rule_id}: {error}", $label))
            }

            fn get_web_acl_default_action(&self, web_acl_id: &str) -> Result<String, String> {
                let output = block_on(self.client.get_web_acl().web_acl_id(web_acl_id).send())
                    .map_err(|error| {
                        format!("{}: failed to read web acl {web_acl_id}: {error}", $label)
                    })?;
                output
                    .web_acl()
                    .and_then(|acl| acl.default_action())
                    .map(|action| action.r#type().as_str().to_string())
                    .ok_or_else(|| {
                        format!("{}: web acl {web_acl_id} has no default action", $label)
                    })
            }

            fn update_web_acl_rule(
                &self,
                web_acl_id: &str,
                token: ChangeToken,
                action: UpdateAction,
                rule: &ActivatedRuleSpec,
                default_action: &str,
            ) -> Result<(), String> {
                let rule_action = $sdk::types::WafAction::builder()
                    .r#type($sdk::types::WafActionType::from(rule.action.as_str()))
                    .build()
                    .map_err(|error| format!("invalid rule action: {error}"))?;
                let activated_rule = $sdk::types::ActivatedRule::builder()
                    .priority(rule.priority)
                    .rule_id(rule.rule_id.clone())
                    .action(rule_action)
                    .r#type($sdk::types::WafRuleType::from(REGULAR_RULE_TYPE))
                    .build()
                    .map_err(|error| format!("invalid activated rule: {error}"))?;
                let update = $sdk::types::WebAclUpdate::builder()
                    .action(Self::change_action(action))
                    .activated_rule(activated_rule)
                    .build()
                    .map_err(|error| format!("invalid web acl update: {error}"))?;
                let default_action = $sdk::types::WafAction::builder()
                    .r#type($sdk::types::WafActionType::from(default_action))
                    .build()
                    .map_err(|error| format!("invalid default action: {error}"))?;
                block_on(
                    self.client
                        .update_web_acl()
                        .web_acl_id(web_acl_id)
                        .change_token(token.into_inner())
                        .updates(update)
                        .default_action(default_action)
                        .send(),
                )
                .map(|_| ())
                .map_err(|error| {
                    format!("{}: failed to update web acl {web_acl_id}: {error}", $label)
                })
            }
        }
    };
}

waf_classic_adapter!(WafClassicClient, aws_sdk_waf, "waf");
waf_classic_adapter!(WafRegionalClient, aws_sdk_wafregional, "waf-regional");

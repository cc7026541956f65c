//! CloudFormation custom-resource lifecycle for the three embargo resources.
//!
//! Every invocation produces exactly one callback, sent after the lifecycle
//! work whether it succeeded or not.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{error, info, warn};
use waf_embargo_core::contract::{
    CustomResourceResponse, GeoMatchSetProperties, HandlerResponse, ParserEventProperties,
    ProvisioningEvent, RequestType, ResourceKind, ResponseStatus, WafAssociationProperties,
    GEO_MATCH_SET_ID_OUTPUT,
};
use waf_embargo_core::diff::UpdateAction;
use waf_embargo_core::entry::BlockKind;
use waf_embargo_core::notification::{list_file_name, ParserNotification};

use crate::adapters::callback::CallbackSender;
use crate::adapters::firewall::{ActivatedRuleSpec, FirewallApi};
use crate::adapters::object_store::BucketStore;
use crate::adapters::origin::OriginFetcher;
use crate::error::HandlerError;
use crate::handlers::callback::{report_outcome, InvocationInfo};
use crate::handlers::reconcile::{change_token, clear_block_list};

pub struct ProvisioningDeps<'a> {
    pub firewall: &'a dyn FirewallApi,
    pub store: &'a dyn BucketStore,
    pub origin: &'a dyn OriginFetcher,
    pub callback: &'a dyn CallbackSender,
}

/// Response `Data` plus the physical id produced by a Create, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleOutcome {
    pub physical_resource_id: Option<String>,
    pub data: BTreeMap<String, String>,
}

pub fn handle_provisioning_event(
    event: Value,
    invocation: &InvocationInfo,
    deps: &ProvisioningDeps<'_>,
) -> HandlerResponse {
    let event = match serde_json::from_value::<ProvisioningEvent>(event.clone()) {
        Ok(value) => value,
        Err(error) => {
            let message = format!("Malformed provisioning event: {error}");
            error!(component = "provisioning", event = "request_rejected", error = %message);
            let envelope = ProvisioningEvent::envelope_of(&event);
            let response = CustomResourceResponse::for_event(
                &envelope,
                ResponseStatus::Failed,
                message.clone(),
                BTreeMap::new(),
            );
            report_outcome(envelope.response_url.as_deref(), &response, deps.callback);
            return HandlerResponse::failure(message);
        }
    };

    info!(
        component = "provisioning",
        event = "request_received",
        request_type = %event.request_type,
        resource_type = %event.resource_type,
        logical_resource_id = %event.logical_resource_id,
        "custom resource request received"
    );

    let (response, result) = match run_lifecycle(&event, deps) {
        Ok(outcome) => {
            let mut response = CustomResourceResponse::for_event(
                &event,
                ResponseStatus::Success,
                invocation.logs_reason(),
                outcome.data,
            );
            if let Some(physical_resource_id) = outcome.physical_resource_id {
                response.physical_resource_id = physical_resource_id;
            }
            (response, HandlerResponse::success())
        }
        Err(error) => {
            error!(
                component = "provisioning",
                event = "request_failed",
                resource_type = %event.resource_type,
                error = %error,
                "custom resource request failed"
            );
            let reason = error.to_string();
            (
                CustomResourceResponse::for_event(
                    &event,
                    ResponseStatus::Failed,
                    reason.clone(),
                    BTreeMap::new(),
                ),
                HandlerResponse::failure(reason),
            )
        }
    };

    report_outcome(event.response_url.as_deref(), &response, deps.callback);
    result
}

/// Performs the requested lifecycle step.
pub fn run_lifecycle(
    event: &ProvisioningEvent,
    deps: &ProvisioningDeps<'_>,
) -> Result<LifecycleOutcome, HandlerError> {
    let request_type = event.request_type()?;
    match event.resource_kind()? {
        ResourceKind::GeoMatchSet => {
            let properties: GeoMatchSetProperties = event.properties()?;
            provision_geo_match_set(deps.firewall, request_type, &properties)
        }
        ResourceKind::ParserEvent => {
            let properties: ParserEventProperties = event.properties()?;
            match request_type {
                RequestType::Create => configure_parser_bucket(deps, &properties)?,
                RequestType::Update => {
                    let previous = match event.old_resource_properties {
                        Some(_) => event.old_properties()?,
                        None => properties.clone(),
                    };
                    clear_parser_bucket(deps.store, &previous)?;
                    configure_parser_bucket(deps, &properties)?;
                }
                RequestType::Delete => clear_parser_bucket(deps.store, &properties)?,
            }
            Ok(LifecycleOutcome::default())
        }
        ResourceKind::WafAssociations => {
            let properties: WafAssociationProperties = event.properties()?;
            match request_type {
                RequestType::Create => associate_geo_rule(deps.firewall, &properties)?,
                RequestType::Update => {
                    let previous: WafAssociationProperties = event.old_properties()?;
                    disassociate_geo_rule(deps.firewall, &previous);
                    associate_geo_rule(deps.firewall, &properties)?;
                }
                RequestType::Delete => tear_down_association(deps.firewall, &properties)?,
            }
            Ok(LifecycleOutcome::default())
        }
    }
}

/// Create allocates the set and makes its id the physical id; Update and
/// Delete leave it alone.
fn provision_geo_match_set(
    firewall: &dyn FirewallApi,
    request_type: RequestType,
    properties: &GeoMatchSetProperties,
) -> Result<LifecycleOutcome, HandlerError> {
    if request_type != RequestType::Create {
        return Ok(LifecycleOutcome::default());
    }

    let token = change_token(firewall)?;
    let geo_match_set_id = firewall
        .create_geo_match_set(&properties.parent_stack_name, token)
        .map_err(HandlerError::Firewall)?;
    info!(
        component = "provisioning",
        event = "geo_match_set_created",
        geo_match_set_id = %geo_match_set_id,
        "geo match set created"
    );
    Ok(LifecycleOutcome {
        data: BTreeMap::from([(
            GEO_MATCH_SET_ID_OUTPUT.to_string(),
            geo_match_set_id.clone(),
        )]),
        physical_resource_id: Some(geo_match_set_id),
    })
}

/// Wires the bucket to the parser, then seeds it with the list file.
pub fn configure_parser_bucket(
    deps: &ProvisioningDeps<'_>,
    properties: &ParserEventProperties,
) -> Result<(), HandlerError> {
    let notification = ParserNotification::for_list_key(
        properties.countries_parser_arn.clone(),
        &properties.embargoed_countries_key,
    )?;
    deps.store
        .put_parser_notification(&properties.embargoed_countries_bucket, Some(&notification))
        .map_err(HandlerError::Storage)?;

    let body = deps
        .origin
        .fetch_public_object(&properties.origin_bucket, &properties.embargoed_countries_key)
        .map_err(HandlerError::Origin)?;
    let file_name = list_file_name(&properties.embargoed_countries_key);
    deps.store
        .put_object(&properties.embargoed_countries_bucket, file_name, &body)
        .map_err(HandlerError::Storage)?;

    info!(
        component = "provisioning",
        event = "parser_bucket_configured",
        bucket = %properties.embargoed_countries_bucket,
        key = file_name,
        bytes = body.len(),
        "list bucket configured"
    );
    Ok(())
}

pub fn clear_parser_bucket(
    store: &dyn BucketStore,
    properties: &ParserEventProperties,
) -> Result<(), HandlerError> {
    store
        .put_parser_notification(&properties.embargoed_countries_bucket, None)
        .map_err(HandlerError::Storage)?;
    store
        .delete_object(
            &properties.embargoed_countries_bucket,
            list_file_name(&properties.embargoed_countries_key),
        )
        .map_err(HandlerError::Storage)
}

fn place_geo_rule(
    firewall: &dyn FirewallApi,
    web_acl_id: &str,
    action: UpdateAction,
    rule: &ActivatedRuleSpec,
) -> Result<(), HandlerError> {
    let default_action = firewall
        .get_web_acl_default_action(web_acl_id)
        .map_err(HandlerError::Firewall)?;
    let token = change_token(firewall)?;
    firewall
        .update_web_acl_rule(web_acl_id, token, action, rule, &default_action)
        .map_err(HandlerError::Firewall)
}

fn update_geo_predicate(
    firewall: &dyn FirewallApi,
    properties: &WafAssociationProperties,
    action: UpdateAction,
) -> Result<(), HandlerError> {
    let token = change_token(firewall)?;
    firewall
        .update_rule_geo_predicate(
            &properties.rule_id_geo,
            token,
            action,
            &properties.geo_match_set_id,
        )
        .map_err(HandlerError::Firewall)
}

/// Adds the geo-match-set to the geo rule and the rule to the web ACL.
pub fn associate_geo_rule(
    firewall: &dyn FirewallApi,
    properties: &WafAssociationProperties,
) -> Result<(), HandlerError> {
    update_geo_predicate(firewall, properties, UpdateAction::Insert)?;
    place_geo_rule(
        firewall,
        &properties.web_acl_id,
        UpdateAction::Insert,
        &ActivatedRuleSpec::geo_rule(properties),
    )?;
    info!(
        component = "provisioning",
        event = "geo_rule_associated",
        web_acl_id = %properties.web_acl_id,
        rule_id = %properties.rule_id_geo,
        "geo rule associated"
    );
    Ok(())
}

pub struct BestEffortStep<'a> {
    name: &'static str,
    run: Box<dyn FnOnce() -> Result<(), HandlerError> + 'a>,
}

impl<'a> BestEffortStep<'a> {
    pub fn new(
        name: &'static str,
        run: impl FnOnce() -> Result<(), HandlerError> + 'a,
    ) -> Self {
        Self {
            name,
            run: Box::new(run),
        }
    }
}

#[derive(Debug)]
pub struct StepOutcome {
    pub name: &'static str,
    pub result: Result<(), HandlerError>,
}

/// Runs every step in order; a failing step never prevents the next one.
pub fn attempt_all(steps: Vec<BestEffortStep<'_>>) -> Vec<StepOutcome> {
    steps
        .into_iter()
        .map(|step| StepOutcome {
            name: step.name,
            result: (step.run)(),
        })
        .collect()
}

/// Best-effort inverse of [`associate_geo_rule`]. Failures are logged only.
pub fn disassociate_geo_rule(firewall: &dyn FirewallApi, properties: &WafAssociationProperties) {
    let rule = ActivatedRuleSpec::geo_rule(properties);
    let outcomes = attempt_all(vec![
        BestEffortStep::new("remove_geo_predicate", || {
            update_geo_predicate(firewall, properties, UpdateAction::Delete)
        }),
        BestEffortStep::new("remove_web_acl_rule", || {
            place_geo_rule(firewall, &properties.web_acl_id, UpdateAction::Delete, &rule)
        }),
    ]);

    for outcome in outcomes {
        if let Err(error) = outcome.result {
            warn!(
                component = "provisioning",
                event = "disassociation_step_failed",
                step = outcome.name,
                error = %error,
                "ignoring failed disassociation step"
            );
        }
    }
}

fn tear_down_association(
    firewall: &dyn FirewallApi,
    properties: &WafAssociationProperties,
) -> Result<(), HandlerError> {
    disassociate_geo_rule(firewall, properties);
    clear_block_list(firewall, BlockKind::IpAddress, &properties.ip_set_id)?;
    clear_block_list(firewall, BlockKind::Country, &properties.geo_match_set_id)?;

    let token = change_token(firewall)?;
    firewall
        .delete_geo_match_set(&properties.geo_match_set_id, token)
        .map_err(HandlerError::Firewall)?;
    info!(
        component = "provisioning",
        event = "association_removed",
        geo_match_set_id = %properties.geo_match_set_id,
        "embargo resources removed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::test_helpers::{
        FirewallCall, InMemoryBucketStore, InMemoryFirewall, RecordingCallbackSender,
        StaticOriginFetcher,
    };

    struct Harness {
        firewall: InMemoryFirewall,
        store: InMemoryBucketStore,
        origin: StaticOriginFetcher,
        callback: RecordingCallbackSender,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                firewall: InMemoryFirewall::new(),
                store: InMemoryBucketStore::new(),
                origin: StaticOriginFetcher::new(),
                callback: RecordingCallbackSender::new(),
            }
        }

        fn handle(&self, event: Value) -> HandlerResponse {
            let deps = ProvisioningDeps {
                firewall: &self.firewall,
                store: &self.store,
                origin: &self.origin,
                callback: &self.callback,
            };
            handle_provisioning_event(event, &invocation(), &deps)
        }
    }

    fn invocation() -> InvocationInfo {
        InvocationInfo::from_function_arn(
            "arn:aws:lambda:us-east-1:123456789012:function:custom-resource",
            "/aws/lambda/custom-resource",
            "stream-1",
        )
    }

    fn geo_event(request_type: &str) -> Value {
        json!({
            "RequestType": request_type,
            "ResourceType": "Custom::GeoMatchSet",
            "ResourceProperties": {"ParentStackName": "embargo"},
            "ResponseURL": "https://example.com/cb",
            "StackId": "stack",
            "RequestId": "request",
            "LogicalResourceId": "GeoMatchSet"
        })
    }

    #[test]
    fn geo_match_set_create_returns_id() {
        let harness = Harness::new();

        let response = harness.handle(geo_event("create"));

        assert!(response.is_success());
        let callbacks = harness.callback.responses();
        assert_eq!(callbacks.len(), 1);
        assert_eq!(callbacks[0].status, ResponseStatus::Success);
        assert_eq!(callbacks[0].data["Id"], "geo-match-set-1");
        assert_eq!(callbacks[0].physical_resource_id, callbacks[0].data["Id"]);
        assert!(callbacks[0]
            .reason
            .starts_with("See the details in CloudWatch Logs: "));
        assert!(harness.firewall.has_geo_match_set("geo-match-set-1"));
    }

    #[test]
    fn geo_match_set_update_and_delete_are_noops() {
        let harness = Harness::new();

        assert!(harness.handle(geo_event("Update")).is_success());
        assert!(harness.handle(geo_event("DELETE")).is_success());

        assert!(harness.firewall.calls().is_empty());
        assert_eq!(harness.callback.responses().len(), 2);
    }

    #[test]
    fn unknown_resource_type_fails_with_one_callback() {
        let harness = Harness::new();
        let mut event = geo_event("Create");
        event["ResourceType"] = json!("Custom::Unknown");

        let response = harness.handle(event);

        assert_eq!(response.status_code, 500);
        let callbacks = harness.callback.responses();
        assert_eq!(callbacks.len(), 1);
        assert_eq!(callbacks[0].status, ResponseStatus::Failed);
        assert_eq!(
            callbacks[0].reason,
            "Unsupported ResourceType 'Custom::Unknown'"
        );
        assert!(callbacks[0].data.is_empty());
        assert_eq!(callbacks[0].physical_resource_id, "GeoMatchSet");
    }

    #[test]
    fn firewall_failure_is_reported_with_its_message() {
        let harness = Harness::new();
        harness.firewall.fail_operation("create_geo_match_set");

        let response = harness.handle(geo_event("Create"));

        assert_eq!(
            response.body.message,
            "injected failure in create_geo_match_set"
        );
        assert_eq!(
            harness.callback.responses()[0].reason,
            "injected failure in create_geo_match_set"
        );
    }

    #[test]
    fn geo_match_set_update_keeps_existing_physical_id() {
        let harness = Harness::new();
        let mut event = geo_event("Update");
        event["PhysicalResourceId"] = json!("geo-match-set-7");

        assert!(harness.handle(event).is_success());

        let callbacks = harness.callback.responses();
        assert_eq!(callbacks[0].physical_resource_id, "geo-match-set-7");
        assert!(callbacks[0].data.is_empty());
    }

    #[test]
    fn failed_create_falls_back_to_logical_id() {
        let harness = Harness::new();
        harness.firewall.fail_operation("create_geo_match_set");

        harness.handle(geo_event("Create"));

        assert_eq!(
            harness.callback.responses()[0].physical_resource_id,
            "GeoMatchSet"
        );
    }

    #[test]
    fn malformed_envelope_still_reports_failure() {
        let harness = Harness::new();
        let mut event = geo_event("Create");
        event["RequestType"] = Value::Null;

        let response = harness.handle(event);

        assert_eq!(response.status_code, 500);
        assert!(response
            .body
            .message
            .starts_with("Malformed provisioning event"));
        let deliveries = harness.callback.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, "https://example.com/cb");
        let callbacks = harness.callback.responses();
        assert_eq!(callbacks[0].status, ResponseStatus::Failed);
        assert_eq!(callbacks[0].request_id, "request");
        assert_eq!(callbacks[0].physical_resource_id, "GeoMatchSet");
        assert_eq!(callbacks[0].reason, response.body.message);
        assert!(harness.firewall.calls().is_empty());
    }

    #[test]
    fn missing_response_url_still_returns_outcome() {
        let harness = Harness::new();
        let mut event = geo_event("Create");
        event
            .as_object_mut()
            .expect("event is an object")
            .remove("ResponseURL");

        assert!(harness.handle(event).is_success());
        assert!(harness.callback.deliveries().is_empty());
    }

    #[test]
    fn attempt_all_runs_every_step() {
        let ran = RefCell::new(Vec::new());
        let outcomes = attempt_all(vec![
            BestEffortStep::new("first", || {
                ran.borrow_mut().push("first");
                Err(HandlerError::Firewall("boom".to_string()))
            }),
            BestEffortStep::new("second", || {
                ran.borrow_mut().push("second");
                Ok(())
            }),
        ]);

        assert_eq!(*ran.borrow(), vec!["first", "second"]);
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());
    }

    #[test]
    fn disassociation_tries_acl_step_after_predicate_failure() {
        let firewall = InMemoryFirewall::new();
        firewall.seed_web_acl("acl-1", "ALLOW");
        let properties = WafAssociationProperties {
            web_acl_id: "acl-1".to_string(),
            rule_action: "BLOCK".to_string(),
            ip_set_id: "ip-1".to_string(),
            rule_id_ip: "rule-ip".to_string(),
            rule_priority_ip: 1,
            geo_match_set_id: "geo-1".to_string(),
            rule_id_geo: "rule-geo".to_string(),
            rule_priority_geo: 2,
        };

        disassociate_geo_rule(&firewall, &properties);

        let calls = firewall.calls();
        assert!(calls
            .iter()
            .any(|call| matches!(call, FirewallCall::UpdateRule { .. })));
        assert!(calls
            .iter()
            .any(|call| matches!(call, FirewallCall::UpdateWebAcl { .. })));
    }
}

#![allow(dead_code)]

use serde_json::Value;
use waf_embargo_core::contract::HandlerResponse;
use waf_embargo_lambda::config::FirewallTargets;
use waf_embargo_lambda::handlers::callback::InvocationInfo;
use waf_embargo_lambda::handlers::list_sync::handle_list_sync_event;
use waf_embargo_lambda::handlers::provisioning::{handle_provisioning_event, ProvisioningDeps};
use waf_embargo_lambda::test_helpers::{
    InMemoryBucketStore, InMemoryFirewall, RecordingCallbackSender, StaticOriginFetcher,
};

/// One account's worth of fakes shared by both handlers.
pub struct Harness {
    pub firewall: InMemoryFirewall,
    pub store: InMemoryBucketStore,
    pub origin: StaticOriginFetcher,
    pub callback: RecordingCallbackSender,
}

impl Harness {
    pub fn new(origin: StaticOriginFetcher) -> Self {
        Self {
            firewall: InMemoryFirewall::new(),
            store: InMemoryBucketStore::new(),
            origin,
            callback: RecordingCallbackSender::new(),
        }
    }

    pub fn provision(&self, event: Value) -> HandlerResponse {
        let deps = ProvisioningDeps {
            firewall: &self.firewall,
            store: &self.store,
            origin: &self.origin,
            callback: &self.callback,
        };
        let invocation = InvocationInfo::from_function_arn(
            "arn:aws:lambda:eu-west-1:123456789012:function:embargo-custom-resource",
            "/aws/lambda/embargo-custom-resource",
            "2024/05/01/[$LATEST]0123",
        );
        handle_provisioning_event(event, &invocation, &deps)
    }

    pub fn sync(&self, event: Value, targets: &FirewallTargets) -> HandlerResponse {
        handle_list_sync_event(event, targets, &self.store, &self.firewall)
    }
}

pub fn targets(geo_match_set_id: &str) -> FirewallTargets {
    FirewallTargets {
        geo_match_set_id: geo_match_set_id.to_string(),
        ip_set_id: "ip-1".to_string(),
    }
}

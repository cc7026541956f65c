mod support;

use waf_embargo_core::diff::BlockUpdate;
use waf_embargo_core::entry::BlockEntry;
use waf_embargo_lambda::test_helpers::{FirewallCall, StaticOriginFetcher};

use support::events::{list_file, object_created, parser_properties, provisioning_event};
use support::harness::{targets, Harness};

fn harness_with_lists(countries: &[&str], cidrs: &[&str]) -> Harness {
    let harness = Harness::new(StaticOriginFetcher::new());
    harness
        .firewall
        .seed_geo_match_set("geo-1", countries.iter().copied());
    harness.firewall.seed_ip_set("ip-1", cidrs.iter().copied());
    harness
}

#[test]
fn sync_converges_and_repeats_as_noop() {
    let harness = harness_with_lists(&["US", "CA"], &["10.0.0.0/8"]);
    harness.store.seed_object(
        "embargo-lists",
        "embargoed-countries.json",
        &list_file(&["CA", "FR"], &["1.2.3.4/32", "2001:db8::/32"]),
    );
    let event = object_created("embargo-lists", "embargoed-countries.json");

    assert!(harness.sync(event.clone(), &targets("geo-1")).is_success());

    assert_eq!(
        harness.firewall.geo_match_set("geo-1"),
        [BlockEntry::country("CA"), BlockEntry::country("FR")]
            .into_iter()
            .collect()
    );
    assert_eq!(
        harness.firewall.ip_set("ip-1"),
        [BlockEntry::ip("1.2.3.4/32"), BlockEntry::ip("2001:db8::/32")]
            .into_iter()
            .collect()
    );
    assert_eq!(harness.firewall.mutations().len(), 2);
    assert_eq!(harness.firewall.tokens_issued(), 2);

    assert!(harness.sync(event, &targets("geo-1")).is_success());
    assert_eq!(harness.firewall.mutations().len(), 2);
    assert_eq!(harness.firewall.tokens_issued(), 2);
}

#[test]
fn country_swap_is_delete_then_insert_in_one_call() {
    let harness = harness_with_lists(&["US", "CA"], &[]);
    harness
        .store
        .seed_object("embargo-lists", "list.json", &list_file(&["CA", "FR"], &[]));

    let response = harness.sync(object_created("embargo-lists", "list.json"), &targets("geo-1"));

    assert!(response.is_success());
    assert_eq!(
        harness.firewall.mutations(),
        vec![FirewallCall::UpdateGeoMatchSet {
            geo_match_set_id: "geo-1".to_string(),
            updates: vec![
                BlockUpdate::delete(BlockEntry::country("US")),
                BlockUpdate::insert(BlockEntry::country("FR")),
            ],
        }]
    );
}

#[test]
fn failed_ip_read_leaves_countries_untouched() {
    let harness = harness_with_lists(&["US"], &[]);
    harness
        .store
        .seed_object("embargo-lists", "list.json", &list_file(&["FR"], &[]));
    harness.firewall.fail_operation("get_ip_set");

    let response = harness.sync(object_created("embargo-lists", "list.json"), &targets("geo-1"));

    assert_eq!(response.status_code, 500);
    assert!(response.body.message.contains("get_ip_set"));
    assert!(harness.firewall.mutations().is_empty());
    assert_eq!(
        harness.firewall.geo_match_set("geo-1"),
        [BlockEntry::country("US")].into_iter().collect()
    );
}

#[test]
fn unknown_list_id_is_a_failure() {
    let harness = harness_with_lists(&[], &[]);
    harness
        .store
        .seed_object("embargo-lists", "list.json", &list_file(&["FR"], &[]));

    let response = harness.sync(
        object_created("embargo-lists", "list.json"),
        &targets("geo-missing"),
    );

    assert_eq!(response.status_code, 500);
    assert!(response.body.message.contains("geo-missing"));
}

#[test]
fn provisioned_bucket_feeds_list_sync() {
    let seed = list_file(&["CU", "IR", "KP"], &["203.0.113.0/24"]);
    let harness = Harness::new(StaticOriginFetcher::new().with_object(
        "embargo-seed",
        "waf/embargoed-countries.json",
        &seed,
    ));
    harness.firewall.seed_ip_set("ip-1", Vec::new());

    harness.provision(provisioning_event(
        "Create",
        "Custom::GeoMatchSet",
        serde_json::json!({"ParentStackName": "embargo"}),
    ));
    let geo_match_set_id = harness.callback.responses()[0].data["Id"].clone();
    assert_eq!(
        harness.callback.responses()[0].physical_resource_id,
        geo_match_set_id
    );
    harness.provision(provisioning_event(
        "Create",
        "Custom::CountriesParserEvent",
        parser_properties("waf/embargoed-countries.json"),
    ));

    let response = harness.sync(
        object_created("embargo-lists", "embargoed-countries.json"),
        &targets(&geo_match_set_id),
    );

    assert!(response.is_success());
    assert_eq!(harness.firewall.geo_match_set(&geo_match_set_id).len(), 3);
    assert_eq!(
        harness.firewall.ip_set("ip-1"),
        [BlockEntry::ip("203.0.113.0/24")].into_iter().collect()
    );
}

#![allow(dead_code)]

use serde_json::{json, Value};

pub const RESPONSE_URL: &str = "https://cloudformation-custom-resource-response.example.com/cb";
pub const PARSER_ARN: &str = "arn:aws:lambda:eu-west-1:123456789012:function:embargo-parser";

/// Custom-resource request envelope around `properties`.
pub fn provisioning_event(request_type: &str, resource_type: &str, properties: Value) -> Value {
    json!({
        "RequestType": request_type,
        "ResourceType": resource_type,
        "ResourceProperties": properties,
        "ResponseURL": RESPONSE_URL,
        "StackId": "arn:aws:cloudformation:eu-west-1:123456789012:stack/embargo/1",
        "RequestId": "request-1",
        "LogicalResourceId": "EmbargoResource"
    })
}

pub fn update_event(resource_type: &str, old: Value, new: Value) -> Value {
    let mut event = provisioning_event("Update", resource_type, new);
    event["OldResourceProperties"] = old;
    event["PhysicalResourceId"] = json!("physical-1");
    event
}

pub fn parser_properties(key: &str) -> Value {
    json!({
        "CountriesParserArn": PARSER_ARN,
        "OringBucket": "embargo-seed",
        "EmbargoedCountriesBucket": "embargo-lists",
        "EmbargoedCountriesKey": key
    })
}

/// Association of `rule-geo` with `geo-1` in `acl-1`, as CloudFormation
/// sends it (every value stringified).
pub fn association_properties(geo_priority: &str) -> Value {
    json!({
        "WebAclId": " acl-1 ",
        "RuleAction": "BLOCK",
        "IpSetId": "ip-1",
        "RuleIdIp": "rule-ip",
        "RulePriorityIp": "1",
        "GeoMatchSetId": "geo-1",
        "RuleIdGeo": "rule-geo",
        "RulePriorityGeo": geo_priority
    })
}

pub fn object_created(bucket: &str, key: &str) -> Value {
    json!({
        "Records": [{
            "eventVersion": "2.1",
            "eventSource": "aws:s3",
            "eventName": "ObjectCreated:Put",
            "s3": {
                "bucket": {"name": bucket},
                "object": {"key": key, "size": 128}
            }
        }]
    })
}

pub fn list_file(countries: &[&str], cidrs: &[&str]) -> Vec<u8> {
    let countries: Vec<Value> = countries.iter().map(|code| json!({"code": code})).collect();
    let ips: Vec<Value> = cidrs
        .iter()
        .map(|cidr| {
            let family = if cidr.contains(':') { "IPV6" } else { "IPV4" };
            json!({"Type": family, "Value": cidr})
        })
        .collect();
    serde_json::to_vec(&json!({
        "embargoed-countries": countries,
        "embargoed-ips": [{"ips": ips}]
    }))
    .expect("list file should serialize")
}

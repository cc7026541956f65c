use std::collections::BTreeMap;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const GEO_MATCH_SET_RESOURCE_TYPE: &str = "Custom::GeoMatchSet";
pub const PARSER_EVENT_RESOURCE_TYPE: &str = "Custom::CountriesParserEvent";
pub const WAF_ASSOCIATIONS_RESOURCE_TYPE: &str = "Custom::WafAssociations";

/// Output key carrying a newly created geo-match-set id.
pub const GEO_MATCH_SET_ID_OUTPUT: &str = "Id";

pub const SUCCESS_MESSAGE: &str = "success";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl FromStr for RequestType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(ValidationError::new(format!(
                "Unsupported RequestType '{value}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    GeoMatchSet,
    ParserEvent,
    WafAssociations,
}

impl ResourceKind {
    pub fn resource_type(self) -> &'static str {
        match self {
            Self::GeoMatchSet => GEO_MATCH_SET_RESOURCE_TYPE,
            Self::ParserEvent => PARSER_EVENT_RESOURCE_TYPE,
            Self::WafAssociations => WAF_ASSOCIATIONS_RESOURCE_TYPE,
        }
    }
}

impl FromStr for ResourceKind {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            GEO_MATCH_SET_RESOURCE_TYPE => Ok(Self::GeoMatchSet),
            PARSER_EVENT_RESOURCE_TYPE => Ok(Self::ParserEvent),
            WAF_ASSOCIATIONS_RESOURCE_TYPE => Ok(Self::WafAssociations),
            _ => Err(ValidationError::new(format!(
                "Unsupported ResourceType '{value}'"
            ))),
        }
    }
}

/// CloudFormation custom-resource request.
///
/// The envelope is parsed leniently so that a response can still be sent when
/// the lifecycle-specific parts are malformed; those are validated through
/// the accessor methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ProvisioningEvent {
    #[serde(default)]
    pub request_type: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource_properties: Value,
    #[serde(default)]
    pub old_resource_properties: Option<Value>,
    #[serde(rename = "ResponseURL", default)]
    pub response_url: Option<String>,
    #[serde(default)]
    pub stack_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
}

impl ProvisioningEvent {
    /// Envelope fields read one by one from a request that did not parse, so
    /// that a failure can still be reported back. Non-string values are
    /// treated as absent.
    pub fn envelope_of(raw: &Value) -> Self {
        let text = |field: &str| raw.get(field).and_then(Value::as_str).map(str::to_string);
        Self {
            request_type: text("RequestType").unwrap_or_default(),
            resource_type: text("ResourceType").unwrap_or_default(),
            response_url: text("ResponseURL"),
            stack_id: text("StackId").unwrap_or_default(),
            request_id: text("RequestId").unwrap_or_default(),
            logical_resource_id: text("LogicalResourceId").unwrap_or_default(),
            physical_resource_id: text("PhysicalResourceId"),
            ..Self::default()
        }
    }

    pub fn request_type(&self) -> Result<RequestType, ValidationError> {
        self.request_type.parse()
    }

    pub fn resource_kind(&self) -> Result<ResourceKind, ValidationError> {
        self.resource_type.parse()
    }

    pub fn properties<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        parse_properties("ResourceProperties", &self.resource_properties)
    }

    pub fn old_properties<T: DeserializeOwned>(&self) -> Result<T, ValidationError> {
        let Some(old) = self.old_resource_properties.as_ref() else {
            return Err(ValidationError::new(
                "OldResourceProperties is required for Update requests",
            ));
        };
        parse_properties("OldResourceProperties", old)
    }

    /// Existing physical id, or the logical id when none was produced yet.
    pub fn physical_resource_id(&self) -> String {
        self.physical_resource_id
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(&self.logical_resource_id)
            .to_string()
    }
}

fn parse_properties<T: DeserializeOwned>(field: &str, value: &Value) -> Result<T, ValidationError> {
    serde_json::from_value(value.clone())
        .map_err(|error| ValidationError::new(format!("Malformed {field}: {error}")))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct GeoMatchSetProperties {
    pub parent_stack_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct ParserEventProperties {
    pub countries_parser_arn: String,
    /// Public bucket the seed list file is copied from.
    #[serde(rename = "OringBucket")]
    pub origin_bucket: String,
    pub embargoed_countries_bucket: String,
    pub embargoed_countries_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct WafAssociationProperties {
    #[serde(deserialize_with = "trimmed_string")]
    pub web_acl_id: String,
    pub rule_action: String,
    pub ip_set_id: String,
    pub rule_id_ip: String,
    #[serde(deserialize_with = "lenient_priority")]
    pub rule_priority_ip: i32,
    pub geo_match_set_id: String,
    pub rule_id_geo: String,
    #[serde(deserialize_with = "lenient_priority")]
    pub rule_priority_geo: i32,
}

fn trimmed_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(String::deserialize(deserializer)?.trim().to_string())
}

// CloudFormation stringifies every custom-resource property.
fn lenient_priority<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawPriority {
        Number(i64),
        Text(String),
    }

    match RawPriority::deserialize(deserializer)? {
        RawPriority::Number(value) => i32::try_from(value)
            .map_err(|_| serde::de::Error::custom(format!("priority {value} is out of range"))),
        RawPriority::Text(text) => text.trim().parse::<i32>().map_err(|error| {
            serde::de::Error::custom(format!("invalid priority '{text}': {error}"))
        }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Body PUT to the pre-signed `ResponseURL`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: BTreeMap<String, String>,
}

impl CustomResourceResponse {
    pub fn for_event(
        event: &ProvisioningEvent,
        status: ResponseStatus,
        reason: impl Into<String>,
        data: BTreeMap<String, String>,
    ) -> Self {
        Self {
            status,
            reason: reason.into(),
            physical_resource_id: event.physical_resource_id(),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            no_echo: false,
            data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResponseBody {
    pub message: String,
}

/// Value returned by both Lambda entry points.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HandlerResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: ResponseBody,
}

impl HandlerResponse {
    pub fn success() -> Self {
        Self::with_status(200, SUCCESS_MESSAGE)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_status(500, message)
    }

    fn with_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code,
            body: ResponseBody {
                message: message.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).expect("handler response should serialize")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3NotificationEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<S3NotificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Object {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl S3NotificationEvent {
    pub fn first_object(&self) -> Result<ObjectLocation, ValidationError> {
        let Some(record) = self.records.first() else {
            return Err(ValidationError::new(
                "S3 notification contains no records",
            ));
        };
        Ok(ObjectLocation {
            bucket: record.s3.bucket.name.clone(),
            key: record.s3.object.key.clone(),
        })
    }
}

use waf_embargo_core::contract::ValidationError;

pub const API_TYPE_ENV: &str = "API_TYPE";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const GEO_MATCH_SET_ID_ENV: &str = "GEO_MATCH_SET_ID";
pub const IP_SET_ID_ENV: &str = "IP_SET_ID";

/// Which WAF classic endpoint family the firewall client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirewallApiKind {
    /// Global WAF (CloudFront distributions).
    Waf,
    /// Regional WAF (load balancers, API Gateway stages).
    WafRegional,
}

impl FirewallApiKind {
    pub fn parse(value: Option<&str>) -> Result<Self, ValidationError> {
        match value.map(str::trim) {
            None | Some("") => Ok(Self::Waf),
            Some(text) => match text.to_ascii_lowercase().as_str() {
                "waf" => Ok(Self::Waf),
                "waf-regional" => Ok(Self::WafRegional),
                _ => Err(ValidationError::new(format!(
                    "{API_TYPE_ENV} must be 'waf' or 'waf-regional', got '{text}'"
                ))),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Unknown or missing levels fall back to `Error`.
    pub fn parse(value: Option<&str>) -> Self {
        match value
            .map(|text| text.trim().to_ascii_uppercase())
            .as_deref()
        {
            Some("DEBUG") => Self::Debug,
            Some("INFO") => Self::Info,
            Some("WARNING") | Some("WARN") => Self::Warn,
            _ => Self::Error,
        }
    }

    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

/// Process-wide settings read once when a Lambda container starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeSettings {
    pub api_kind: FirewallApiKind,
    pub log_level: LogLevel,
}

impl RuntimeSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            api_kind: FirewallApiKind::parse(lookup(API_TYPE_ENV).as_deref())?,
            log_level: LogLevel::parse(lookup(LOG_LEVEL_ENV).as_deref()),
        })
    }

    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

/// Firewall lists the list-sync handler keeps aligned with the list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirewallTargets {
    pub geo_match_set_id: String,
    pub ip_set_id: String,
}

impl FirewallTargets {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ValidationError> {
        Ok(Self {
            geo_match_set_id: required(&lookup, GEO_MATCH_SET_ID_ENV)?,
            ip_set_id: required(&lookup, IP_SET_ID_ENV)?,
        })
    }

    pub fn from_env() -> Result<Self, ValidationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, ValidationError> {
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ValidationError::new(format!("{name} must be configured"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn log_level_falls_back_to_error() {
        assert_eq!(LogLevel::parse(Some("debug")), LogLevel::Debug);
        assert_eq!(LogLevel::parse(Some("WARNING")), LogLevel::Warn);
        assert_eq!(LogLevel::parse(Some("CRITICAL")), LogLevel::Error);
        assert_eq!(LogLevel::parse(Some("verbose")), LogLevel::Error);
        assert_eq!(LogLevel::parse(None), LogLevel::Error);
    }

    #[test]
    fn api_kind_defaults_to_global_waf() {
        let settings = RuntimeSettings::from_lookup(lookup_from(&[("LOG_LEVEL", "info")]))
            .expect("settings should parse");
        assert_eq!(settings.api_kind, FirewallApiKind::Waf);
        assert_eq!(settings.log_level, LogLevel::Info);
    }

    #[test]
    fn api_kind_accepts_regional_and_rejects_others() {
        assert_eq!(
            FirewallApiKind::parse(Some("WAF-Regional")),
            Ok(FirewallApiKind::WafRegional)
        );
        assert!(FirewallApiKind::parse(Some("wafv2")).is_err());
    }

    #[test]
    fn targets_require_both_ids() {
        let error = FirewallTargets::from_lookup(lookup_from(&[("GEO_MATCH_SET_ID", "geo-1")]))
            .expect_err("ip set id should be required");
        assert_eq!(error.message(), "IP_SET_ID must be configured");

        let targets = FirewallTargets::from_lookup(lookup_from(&[
            ("GEO_MATCH_SET_ID", " geo-1 "),
            ("IP_SET_ID", "ip-1"),
        ]))
        .expect("targets should parse");
        assert_eq!(targets.geo_match_set_id, "geo-1");
        assert_eq!(targets.ip_set_id, "ip-1");
    }
}

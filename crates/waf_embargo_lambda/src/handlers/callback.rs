use tracing::{debug, error, info};
use waf_embargo_core::contract::CustomResourceResponse;

use crate::adapters::callback::CallbackSender;

/// Where this invocation's logs live, for the success reason.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvocationInfo {
    pub region: String,
    pub log_group: String,
    pub log_stream: String,
}

impl InvocationInfo {
    /// The region is the fourth field of
    /// `arn:aws:lambda:<region>:<account>:function:<name>`.
    pub fn from_function_arn(
        function_arn: &str,
        log_group: impl Into<String>,
        log_stream: impl Into<String>,
    ) -> Self {
        Self {
            region: function_arn.split(':').nth(3).unwrap_or_default().to_string(),
            log_group: log_group.into(),
            log_stream: log_stream.into(),
        }
    }

    pub fn logs_reason(&self) -> String {
        format!(
            "See the details in CloudWatch Logs: https://console.aws.amazon.com/cloudwatch/home?region={}#logEventViewer:group={};stream={}",
            self.region, self.log_group, self.log_stream
        )
    }
}

/// Delivers `response` to the pre-signed URL, if there is one.
///
/// Never fails: delivery problems are logged and reported as `false`.
pub fn report_outcome(
    response_url: Option<&str>,
    response: &CustomResourceResponse,
    sender: &dyn CallbackSender,
) -> bool {
    let Some(response_url) = response_url.filter(|url| !url.trim().is_empty()) else {
        debug!(
            component = "callback",
            event = "callback_skipped",
            "event carries no ResponseURL"
        );
        return false;
    };

    let body = match serde_json::to_string(response) {
        Ok(body) => body,
        Err(error) => {
            error!(
                component = "callback",
                event = "callback_encode_failed",
                error = %error,
                "custom resource response could not be encoded"
            );
            return false;
        }
    };
    debug!(component = "callback", body = %body, "sending custom resource response");

    match sender.send(response_url, &body) {
        Ok(()) => {
            info!(
                component = "callback",
                event = "callback_sent",
                status = ?response.status,
                physical_resource_id = %response.physical_resource_id,
                "custom resource response delivered"
            );
            true
        }
        Err(error) => {
            error!(
                component = "callback",
                event = "callback_failed",
                error = %error,
                "custom resource response was not delivered"
            );
            false
        }
    }
}

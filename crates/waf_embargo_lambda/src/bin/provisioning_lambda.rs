use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use waf_embargo_lambda::adapters::aws_s3::S3BucketStore;
use waf_embargo_lambda::adapters::aws_waf::firewall_client;
use waf_embargo_lambda::adapters::firewall::FirewallApi;
use waf_embargo_lambda::adapters::http::{HttpCallbackSender, HttpOriginFetcher};
use waf_embargo_lambda::config::RuntimeSettings;
use waf_embargo_lambda::handlers::callback::InvocationInfo;
use waf_embargo_lambda::handlers::provisioning::{handle_provisioning_event, ProvisioningDeps};
use waf_embargo_lambda::logging;

const LOG_GROUP_ENV: &str = "AWS_LAMBDA_LOG_GROUP_NAME";
const LOG_STREAM_ENV: &str = "AWS_LAMBDA_LOG_STREAM_NAME";

struct RuntimeDependencies {
    firewall: Box<dyn FirewallApi + Send + Sync>,
    store: S3BucketStore,
    origin: HttpOriginFetcher,
    callback: HttpCallbackSender,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    runtime: &RuntimeDependencies,
) -> Result<String, Error> {
    let invocation = InvocationInfo::from_function_arn(
        &event.context.invoked_function_arn,
        std::env::var(LOG_GROUP_ENV).unwrap_or_default(),
        std::env::var(LOG_STREAM_ENV).unwrap_or_default(),
    );
    let deps = ProvisioningDeps {
        firewall: runtime.firewall.as_ref(),
        store: &runtime.store,
        origin: &runtime.origin,
        callback: &runtime.callback,
    };

    let response = handle_provisioning_event(event.payload, &invocation, &deps);
    Ok(response.to_json_string())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = RuntimeSettings::from_env()?;
    logging::init(settings.log_level);

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let runtime = RuntimeDependencies {
        firewall: firewall_client(settings.api_kind, &aws_config),
        store: S3BucketStore::new(&aws_config),
        origin: HttpOriginFetcher::new()?,
        callback: HttpCallbackSender::new()?,
    };
    let runtime = &runtime;

    lambda_runtime::run(service_fn(move |event| async move {
        handle_request(event, runtime).await
    }))
    .await
}

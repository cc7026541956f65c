use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use tracing::error;
use waf_embargo_core::contract::HandlerResponse;
use waf_embargo_lambda::adapters::aws_s3::S3BucketStore;
use waf_embargo_lambda::adapters::aws_waf::firewall_client;
use waf_embargo_lambda::adapters::firewall::FirewallApi;
use waf_embargo_lambda::config::{FirewallTargets, RuntimeSettings};
use waf_embargo_lambda::handlers::list_sync::handle_list_sync_event;
use waf_embargo_lambda::logging;

struct RuntimeDependencies {
    firewall: Box<dyn FirewallApi + Send + Sync>,
    store: S3BucketStore,
}

async fn handle_request(
    event: LambdaEvent<Value>,
    runtime: &RuntimeDependencies,
) -> Result<String, Error> {
    let response = match FirewallTargets::from_env() {
        Ok(targets) => handle_list_sync_event(
            event.payload,
            &targets,
            &runtime.store,
            runtime.firewall.as_ref(),
        ),
        Err(error) => {
            error!(
                component = "list_sync",
                event = "misconfigured",
                error = %error,
                "firewall targets are not configured"
            );
            HandlerResponse::failure(error.to_string())
        }
    };
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
    };
    let runtime = &runtime;

    lambda_runtime::run(service_fn(move |event| async move {
        handle_request(event, runtime).await
    }))
    .await
}

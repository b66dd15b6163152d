//! Deployment-trigger handler - Entry Point
//!
//! Serverless bootstrap: clients are built once per process, then every
//! pipeline job event is handed to the same handler.

use std::sync::Arc;

use deploy_trigger::logs::init_logging;
use deploy_trigger::services::aws;
use deploy_trigger::utils::{remaining_until, version_info};
use deploy_trigger::{Handler, HandlerOptions, InvocationSummary, Settings};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use pipeline_events::CodePipelineEvent;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = Settings::from_env()?;
    let options = HandlerOptions::from_settings(&settings);

    if let Err(e) = init_logging(&options.logging) {
        println!("Failed to initialize logging: {e}");
    }

    let version = version_info();
    info!(
        "Starting deploy-trigger {} ({}, built {})",
        version.version, version.git_hash, version.build_time
    );

    let sdk_config = aws::load_sdk_config(options.call_timeout).await;
    let clients = aws::clients(&sdk_config);
    let handler = Arc::new(Handler::new(options, clients)?);
    info!("Handler initialization completed");

    lambda_runtime::run(service_fn(move |event: LambdaEvent<CodePipelineEvent>| {
        let handler = handler.clone();
        async move {
            let budget = Some(remaining_until(event.context.deadline));
            let summary: InvocationSummary = handler
                .handle(&event.payload, budget)
                .await
                .inspect_err(|e| error!("Invocation failed: {}", e))?;
            Ok::<InvocationSummary, Error>(summary)
        }
    }))
    .await
    .inspect_err(|e| error!("Runtime loop exited: {}", e))
}


use std::{process, sync::Arc};

use folio::{
    application::{error::AppError, index::IndexMaterializer},
    cache::{CacheConfig, StalenessPolicy},
    config,
    infra::{
        error::InfraError,
        http::{self, HttpState},
        store, telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging)?;
            run_serve(settings).await
        }
        config::Command::Index(args) => {
            telemetry::init_stderr(&settings.logging)?;
            run_index(settings, args.preview).await
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let record_store = store::from_settings(&settings.store).map_err(InfraError::from)?;
    let cache_config = CacheConfig::from(&settings.cache);
    let warm_on_startup = cache_config.warm_on_startup;
    let policy = Arc::new(StalenessPolicy::new(
        cache_config,
        IndexMaterializer::new(record_store),
    ));

    if warm_on_startup {
        if let Err(err) = policy.warm(false).await {
            warn!(
                target = "folio::serve",
                error = %err,
                "startup warmup failed; the first request will retry"
            );
        }
    }

    let router = http::build_router(HttpState { index: policy });
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "folio::serve",
        addr = %settings.server.addr,
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_index(settings: config::Settings, preview: bool) -> Result<(), AppError> {
    let record_store = store::from_settings(&settings.store).map_err(InfraError::from)?;
    let index = IndexMaterializer::new(record_store)
        .materialize(preview)
        .await?;

    let rendered = serde_json::to_string_pretty(&index)
        .map_err(|err| AppError::unexpected(format!("failed to encode index: {err}")))?;
    println!("{rendered}");

    Ok(())
}

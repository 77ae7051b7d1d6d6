use std::process;

use reelhouse::{
    application::error::AppError,
    config,
    domain::entities::{MovieRecord, UserRecord},
    domain::entity::EntityKind,
    infra::{deps::Dependencies, server, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info};
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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    info!(
        target = "reelhouse::serve",
        service = settings.service.as_str(),
        addr = %settings.server.addr,
        "Starting service"
    );

    let deps = Dependencies::establish(&settings).await?;

    match settings.service {
        EntityKind::Movie => {
            server::serve::<MovieRecord, _>(&settings, deps, shutdown_signal()).await
        }
        EntityKind::User => {
            server::serve::<UserRecord, _>(&settings, deps, shutdown_signal()).await
        }
    }
    .map_err(AppError::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!(target = "reelhouse::serve", "Shutdown signal received");
}

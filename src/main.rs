use std::{process, sync::Arc};

use newsdesk::{
    application::error::AppError,
    config,
    infra::{
        cms,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tokio::{net::TcpListener, sync::Notify};
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::from(InfraError::configuration(err.to_string())))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let adapters = cms::build_adapters(&settings.cms)?;
    let state = HttpState::new(&settings, adapters);

    info!(
        target = "newsdesk::serve",
        caching = state.cache.is_enabled(),
        cache_capacity = settings.content.cache_capacity.get(),
        post_adjacency = ?settings.content.adjacency.posts,
        notice_adjacency = ?settings.content.adjacency.notices,
        "services ready"
    );

    serve_http(&settings, http::build_router(state)).await
}

async fn serve_http(settings: &config::Settings, router: axum::Router) -> Result<(), AppError> {
    let listener = TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "newsdesk::serve",
        addr = %settings.server.addr,
        "listening"
    );

    let stop = Arc::new(Notify::new());
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let stop = stop.clone();
        async move { stop.notified().await }
    });

    // In-flight requests get `graceful_shutdown` to finish after the signal.
    let grace = settings.server.graceful_shutdown;
    let deadline = async {
        shutdown_signal().await;
        info!(target = "newsdesk::serve", "shutdown requested");
        stop.notify_one();
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))
        }
        () = deadline => {
            warn!(
                target = "newsdesk::serve",
                grace_seconds = grace.as_secs(),
                "graceful shutdown timed out"
            );
            Ok(())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target = "newsdesk::serve", error = %err, "failed to listen for ctrl-c");
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
                error!(target = "newsdesk::serve", error = %err, "failed to listen for SIGTERM");
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
}

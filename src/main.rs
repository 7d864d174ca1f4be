use std::{process, sync::Arc, time::Duration};

use postboard::{
    application::{accounts::AccountService, error::AppError, repos::Repositories},
    config::{self, Settings},
    infra::{
        cache::PageCache,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApplicationStates},
        memory::MemoryRepositories,
        telemetry,
        uploads::UploadStorage,
    },
};
use tokio::{sync::watch, try_join};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

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
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let upload_storage = UploadStorage::new(settings.uploads.directory.clone())
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let cache = settings
        .cache
        .enabled
        .then(|| PageCache::with_system_clock(settings.cache.home_ttl));

    let states = ApplicationStates::new(
        &repositories,
        Arc::new(upload_storage),
        cache,
        &settings.auth,
        &settings.uploads,
    );

    let purge_handle = spawn_session_purge(states.http.accounts.clone());
    let result = serve_http(&settings, states).await;

    purge_handle.abort();
    let _ = purge_handle.await;

    result
}

async fn run_migrate(settings: Settings) -> Result<(), AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(target = "postboard::migrate", "migrations applied");
    Ok(())
}

async fn init_repositories(settings: &Settings) -> Result<Repositories, AppError> {
    let Some(database_url) = settings.database.url.as_ref() else {
        warn!(
            target = "postboard::storage",
            "no database url configured; using the in-process store, data is lost on exit"
        );
        return Ok(Repositories::from_store(Arc::new(MemoryRepositories::new())));
    };

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "postboard::storage",
        max_connections = settings.database.max_connections.get(),
        "connected to postgres"
    );
    Ok(Repositories::from_store(Arc::new(PostgresRepositories::new(
        pool,
    ))))
}

fn spawn_session_purge(accounts: Arc<AccountService>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match accounts.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(
                    target = "postboard::sessions",
                    purged, "expired sessions removed"
                ),
                Err(err) => warn!(
                    target = "postboard::sessions",
                    error = %err,
                    "failed to purge expired sessions"
                ),
            }
        }
    })
}

async fn serve_http(settings: &Settings, states: ApplicationStates) -> Result<(), AppError> {
    let public_router = http::build_router(states.http);
    let admin_router = http::build_admin_router(states.admin);

    let public_listener = tokio::net::TcpListener::bind(settings.server.public_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    let admin_listener = tokio::net::TcpListener::bind(settings.server.admin_addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "postboard::http",
        public = %settings.server.public_addr,
        admin = %settings.server.admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for_shutdown(shutdown_rx));

    let servers = async { try_join!(public_server, admin_server) };
    tokio::pin!(servers);

    tokio::select! {
        result = &mut servers => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
            return Ok(());
        }
        signal = tokio::signal::ctrl_c() => {
            if let Err(err) = signal {
                warn!(target = "postboard::http", error = %err, "failed to listen for shutdown signal");
            }
            info!(target = "postboard::http", "shutdown requested, draining connections");
            let _ = shutdown_tx.send(true);
        }
    }

    match tokio::time::timeout(settings.server.graceful_shutdown, &mut servers).await {
        Ok(result) => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        Err(_) => warn!(
            target = "postboard::http",
            timeout_secs = settings.server.graceful_shutdown.as_secs(),
            "graceful shutdown timed out, dropping open connections"
        ),
    }

    Ok(())
}

async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

use std::{net::SocketAddr, process, sync::Arc, time::Duration};

use bytes::Bytes;
use folio::{
    application::{
        attachments::AttachmentService, credentials::CredentialService, error::AppError,
        posts::PostService, sessions::SessionService,
    },
    config,
    infra::{
        assets::DEFAULT_COVER_PNG,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AttemptLimiter, HttpState},
        storage::ObjectAttachmentStore,
        telemetry,
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::SetPassword(args) => run_set_password(settings, args).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn load_cover(settings: &config::Settings) -> Result<Bytes, AppError> {
    match settings.cover.path.as_ref() {
        Some(path) => {
            let data = tokio::fs::read(path)
                .await
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            info!(path = %path.display(), "loaded custom default cover");
            Ok(Bytes::from(data))
        }
        None => Ok(Bytes::from_static(DEFAULT_COVER_PNG)),
    }
}

fn session_service(
    repositories: &Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> SessionService {
    SessionService::new(repositories.clone(), settings.sessions.lifetime)
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let store = ObjectAttachmentStore::from_backend(&settings.storage.backend)
        .await
        .map_err(AppError::from)?;
    let attachments = AttachmentService::new(Arc::new(store));
    let cover = load_cover(&settings).await?;

    let sessions = session_service(&repositories, &settings);
    let credentials = CredentialService::new(repositories.clone(), sessions.clone());
    let posts = PostService::new(
        repositories.clone(),
        repositories.clone(),
        attachments.clone(),
        cover,
        settings.search.min_rank,
    );

    let state = HttpState {
        credentials: Arc::new(credentials),
        sessions: Arc::new(sessions),
        posts: Arc::new(posts),
        attachments: Arc::new(attachments),
        attempts: AttemptLimiter::new(
            Duration::from_secs(u64::from(settings.auth.window_seconds.get())),
            settings.auth.max_attempts.get(),
        ),
    };

    let body_limit = usize::try_from(settings.storage.max_upload_bytes.get()).unwrap_or(usize::MAX);
    let router = http::build_router(state, body_limit);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!("server stopped");
    Ok(())
}

async fn run_set_password(
    settings: config::Settings,
    args: config::SetPasswordArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let sessions = session_service(&repositories, &settings);
    let credentials = CredentialService::new(repositories, sessions);

    let revoked = credentials
        .rotate(&args.password)
        .await
        .map_err(|err| AppError::unexpected(format!("failed to set password: {err}")))?;

    info!(revoked_sessions = revoked, "admin password updated");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
    }
}

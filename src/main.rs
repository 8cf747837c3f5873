use std::{process, sync::Arc};

use clap::Parser;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vetrina::{
    application::{
        catalog::PostCatalog,
        contact::ContactService,
        contributions::{ContributionFetcher, ContributionService},
        error::SiteError,
        render,
        view_counts::{InMemoryViewCounts, ViewCounts},
    },
    config,
    domain::portfolio::SiteContent,
    infra::{
        email::ResendMailer,
        error::InfraError,
        github::{GraphQlFetcher, ScrapeFetcher},
        http::{self, AppState, rate_limit::RateLimiter},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &SiteError) {
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

async fn run() -> Result<(), SiteError> {
    let cli = config::CliArgs::parse();
    let settings = config::load(&cli)
        .map_err(|err| SiteError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(SiteError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Check(_) => run_check(settings).await,
    }
}

async fn load_content(
    settings: &config::Settings,
) -> Result<(Arc<SiteContent>, Arc<PostCatalog>), SiteError> {
    let site_raw = tokio::fs::read_to_string(&settings.content.site_file)
        .await
        .map_err(|err| {
            SiteError::from(InfraError::configuration(format!(
                "cannot read `{}`: {err}",
                settings.content.site_file.display()
            )))
        })?;
    let site = Arc::new(SiteContent::from_toml(&site_raw)?);

    let catalog = PostCatalog::load(&settings.content.directory, &render::renderer())
        .await
        .map_err(|err| SiteError::unexpected(err.to_string()))?;

    Ok((site, Arc::new(catalog)))
}

async fn run_serve(settings: config::Settings) -> Result<(), SiteError> {
    let (site, catalog) = load_content(&settings).await?;

    let client = reqwest::Client::new();

    let mailer: Arc<dyn vetrina::application::contact::Mailer> =
        match settings.contact.delivery() {
            Some((key, from, to)) => Arc::new(ResendMailer::new(
                client.clone(),
                key.to_string(),
                from.to_string(),
                to.to_string(),
            )),
            None => {
                info!(target = "vetrina::startup", "contact delivery not configured");
                Arc::new(DisabledMailer)
            }
        };

    let mut fetchers: Vec<Arc<dyn ContributionFetcher>> = Vec::new();
    if let Some(token) = settings.github.token.clone() {
        fetchers.push(Arc::new(GraphQlFetcher::new(client.clone(), token)));
    }
    fetchers.push(Arc::new(ScrapeFetcher::new(client)));

    let state = AppState {
        site,
        catalog,
        contact: Arc::new(ContactService::new(mailer)),
        contributions: Arc::new(ContributionService::new(
            fetchers,
            settings.github.cache_capacity,
            settings.github.cache_ttl,
        )),
        view_counts: Arc::new(ViewCounts::new(Box::new(InMemoryViewCounts::default()))),
        contact_limiter: Arc::new(RateLimiter::new(
            settings.rate_limit.max_requests.get(),
            std::time::Duration::from_secs(settings.rate_limit.window_seconds.get().into()),
        )),
    };

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| SiteError::from(InfraError::from(err)))?;

    info!(
        target = "vetrina::startup",
        addr = %settings.server.addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown({
        let mut rx = shutdown_rx.clone();
        async move {
            let _ = rx.changed().await;
        }
    });

    let drain_window = settings.server.graceful_shutdown;
    let drain_elapsed = async {
        let mut rx = shutdown_rx;
        let _ = rx.changed().await;
        tokio::time::sleep(drain_window).await;
    };

    tokio::select! {
        result = server => {
            result.map_err(|err| SiteError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_elapsed => {
            warn!(
                target = "vetrina::shutdown",
                timeout_secs = drain_window.as_secs(),
                "graceful shutdown window elapsed, exiting with connections open"
            );
        }
    }

    Ok(())
}

/// Validate every content document and the site data file, then exit.
/// Unlike the serve path, which fails fast, every problem is reported in a
/// single run so the pre-deploy gate never needs a fix-rerun loop.
async fn run_check(settings: config::Settings) -> Result<(), SiteError> {
    let mut failures = 0usize;

    match tokio::fs::read_to_string(&settings.content.site_file).await {
        Ok(raw) => match SiteContent::from_toml(&raw) {
            Ok(site) => info!(
                target = "vetrina::check",
                site = %site.profile.name,
                "site data file ok"
            ),
            Err(err) => {
                failures += 1;
                error!(
                    target = "vetrina::check",
                    path = %settings.content.site_file.display(),
                    error = %err,
                    "site data file is invalid"
                );
            }
        },
        Err(err) => {
            failures += 1;
            error!(
                target = "vetrina::check",
                path = %settings.content.site_file.display(),
                error = %err,
                "cannot read site data file"
            );
        }
    }

    let report = PostCatalog::audit(&settings.content.directory, &render::renderer()).await;
    for err in &report.errors {
        error!(target = "vetrina::check", error = %err, "document check failed");
    }
    failures += report.errors.len();

    if failures > 0 {
        return Err(SiteError::unexpected(format!(
            "content check found {failures} problem(s)"
        )));
    }

    info!(
        target = "vetrina::check",
        documents = report.documents,
        "content check passed"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => error!(error = %err, "failed to install terminate handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!(target = "vetrina::shutdown", "shutdown signal received");
}

/// Stands in when no Resend credentials are configured, so the contact
/// endpoint degrades to 502 instead of panicking at startup.
struct DisabledMailer;

#[async_trait::async_trait]
impl vetrina::application::contact::Mailer for DisabledMailer {
    async fn deliver(
        &self,
        _message: &vetrina::application::contact::ContactMessage,
    ) -> Result<(), InfraError> {
        Err(InfraError::upstream(
            "resend",
            "contact delivery is not configured",
        ))
    }
}

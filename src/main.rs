use std::{process, sync::Arc, time::Duration};

use safecircle_site::{
    application::{
        chrome::{AnalyticsTarget, ChromeService},
        content::ContentService,
        error::AppError,
        forms::FormSubmissionService,
        integrations::{ChallengeVerifier, NewsletterAudience, StarSource},
        mutations::ContentMutationService,
        newsletter::NewsletterService,
        page::PageService,
        repos::ContentRepos,
        revalidation::RevalidationHooks,
        sitemap::SitemapService,
        stars::StarCountService,
        static_params::StaticParams,
    },
    cache::{CacheConfig, CacheState, LocalRevalidator, Revalidator, SiteCache},
    config,
    infra::{
        cache_warmer::CacheWarmer,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, AdminState, DRAFT_COOKIE, HttpState},
        integrations::{
            GithubStars, PurgeWebhook, ResendAudience, TurnstileVerifier, build_client,
        },
        telemetry,
    },
    presentation::blocks::BlockRegistry,
};
use tokio::{sync::watch, try_join};
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
        config::Command::Prerender(args) => run_prerender(settings, args).await,
        config::Command::Migrate(_) => run_migrations(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, true).await?;
    let app = build_application_context(repositories, &settings)?;

    // Warm the response cache in the background; requests are served meanwhile.
    let warm_handle = if settings.cache.enable_response_cache {
        let warmer = CacheWarmer::new(http::build_router(app.http_state.clone()), app.params.clone());
        Some(tokio::spawn(async move {
            if let Err(err) = warmer.warm(4).await {
                warn!(target: "safecircle::cache_warmer", error = %err, "startup warmup failed");
            }
        }))
    } else {
        None
    };

    let result = serve_http(&settings, app.http_state, app.admin_state).await;

    if let Some(handle) = warm_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_prerender(
    settings: config::Settings,
    args: config::PrerenderArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings, false).await?;
    let app = build_application_context(repositories, &settings)?;
    let concurrency = args.concurrency.clamp(1, 32);

    let warmer = CacheWarmer::new(http::build_router(app.http_state), app.params);
    let report = warmer
        .warm(concurrency)
        .await
        .map_err(|err| AppError::unexpected(err.to_string()))?;

    if report.failed.is_empty() {
        Ok(())
    } else {
        Err(AppError::unexpected(format!(
            "{} of {} paths failed to prerender",
            report.failed.len(),
            report.failed.len() + report.rendered
        )))
    }
}

async fn run_migrations(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    info!(target: "safecircle::migrate", "migrations applied");
    Ok(())
}

struct ApplicationContext {
    http_state: HttpState,
    admin_state: AdminState,
    params: StaticParams,
}

async fn connect(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
    migrate: bool,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect(settings).await?;

    if migrate {
        PostgresRepositories::run_migrations(&pool)
            .await
            .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;
    }

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_application_context(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<ApplicationContext, AppError> {
    let repos = ContentRepos::from_store(repositories.clone());
    let cache = Arc::new(SiteCache::new(CacheConfig::from(&settings.cache)));
    let content = ContentService::new(repos.clone(), cache.clone());

    let integrations = &settings.integrations;
    let client = build_client(integrations.timeout).map_err(AppError::from)?;

    let mut revalidators: Vec<Arc<dyn Revalidator>> =
        vec![Arc::new(LocalRevalidator::new(cache.clone()))];
    if let Some(purge) = integrations.purge.as_ref() {
        revalidators.push(Arc::new(PurgeWebhook::new(
            client.clone(),
            purge.webhook_url.clone(),
            purge.token.clone(),
        )));
    }
    let hooks = RevalidationHooks::new(revalidators, repos.categories.clone());
    let mutations = Arc::new(ContentMutationService::new(repos, hooks));

    let verifier: Arc<dyn ChallengeVerifier> = Arc::new(TurnstileVerifier::new(
        client.clone(),
        integrations.turnstile.verify_url.clone(),
        integrations.turnstile.secret_key.clone(),
    ));
    let audience: Arc<dyn NewsletterAudience> = Arc::new(ResendAudience::new(
        client.clone(),
        integrations.resend.base_url.clone(),
        integrations.resend.api_key.clone(),
        integrations.resend.audience_id.clone(),
    ));
    let stars: Arc<dyn StarSource> = Arc::new(GithubStars::new(
        client,
        integrations.github.api_base.clone(),
        integrations.github.repository.clone(),
        integrations.github.token.clone(),
    ));

    let analytics = settings.analytics.as_ref().map(|analytics| AnalyticsTarget {
        website_id: analytics.website_id.clone(),
        script_src: analytics.script_src.clone(),
    });
    let params = StaticParams::new(content.clone());

    let http_state = HttpState {
        pages: Arc::new(PageService::new(
            content.clone(),
            Arc::new(BlockRegistry::standard()),
            integrations.turnstile.site_key.clone(),
            settings.site.url.clone(),
        )),
        chrome: Arc::new(ChromeService::new(content.clone(), analytics)),
        sitemap: Arc::new(SitemapService::new(params.clone(), &settings.site.url)),
        forms: Arc::new(FormSubmissionService::new(
            content,
            verifier,
            NewsletterService::new(audience),
        )),
        stars: Arc::new(StarCountService::new(stars, cache.clone())),
        health: repositories,
        draft_secret: settings.site.draft_secret.clone(),
        site_url: settings.site.url.clone(),
        default_locale: settings.site.default_locale,
        cache: Some(CacheState {
            cache,
            bypass_cookie: DRAFT_COOKIE,
        }),
    };

    let admin_state = AdminState {
        mutations,
        admin_token: settings.site.admin_token.clone(),
    };

    Ok(ApplicationContext {
        http_state,
        admin_state,
        params,
    })
}

async fn serve_http(
    settings: &config::Settings,
    http_state: HttpState,
    admin_state: AdminState,
) -> Result<(), AppError> {
    let public_router = http::build_router(http_state);
    let admin_router = http::build_admin_router(admin_state);

    let public_addr = settings.server.public_addr;
    let admin_addr = settings.server.admin_addr;
    let public_listener = tokio::net::TcpListener::bind(public_addr)
        .await
        .map_err(|source| AppError::from(InfraError::Bind { addr: public_addr, source }))?;
    let admin_listener = tokio::net::TcpListener::bind(admin_addr)
        .await
        .map_err(|source| AppError::from(InfraError::Bind { addr: admin_addr, source }))?;

    info!(
        target: "safecircle::server",
        public = %public_addr,
        admin = %admin_addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let public_server = axum::serve(public_listener, public_router.into_make_service())
        .with_graceful_shutdown(wait_for(shutdown_rx.clone()));
    let admin_server = axum::serve(admin_listener, admin_router.into_make_service())
        .with_graceful_shutdown(wait_for(shutdown_rx.clone()));

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = async { try_join!(public_server, admin_server) } => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(shutdown_rx, grace) => {
            warn!(
                target: "safecircle::server",
                grace_secs = grace.as_secs(),
                "graceful shutdown timed out"
            );
        }
    }

    Ok(())
}

async fn wait_for(mut shutdown: watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|requested| *requested).await;
}

/// Resolves `grace` after shutdown was requested.
async fn drain_deadline(shutdown: watch::Receiver<bool>, grace: Duration) {
    wait_for(shutdown).await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(target: "safecircle::server", error = %err, "failed to listen for ctrl-c");
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
                error!(target: "safecircle::server", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!(target: "safecircle::server", "shutdown requested");
}

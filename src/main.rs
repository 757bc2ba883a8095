use anyhow::Result;
use std::sync::Arc;

use gd_session::auth::{AuthGateway, FlowCoordinator, LoginOutcome, RefreshOutcome};
use gd_session::config::Config;
use gd_session::locale::LocaleStrings;
use gd_session::session::SessionStore;
use gd_session::sinks::{Sinks, Strings};
use gd_session::transport::GraphQlClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (for log level)
    let config = Config::load()?;
    config.validate()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("🚀 gd-session starting...");
    tracing::info!("API endpoint: {}", config.api_url);

    let strings = load_strings(&config).await?;
    let sinks = Sinks::default().with_strings(strings);

    let transport = Arc::new(GraphQlClient::new(
        config.api_url.clone(),
        config.http_connect_timeout,
        config.http_request_timeout,
        config.http_max_retries,
    )?);

    let store = Arc::new(SessionStore::new());
    store.subscribe(|t| {
        tracing::debug!(
            event = t.event.name(),
            revision = t.revision,
            authenticated = t.session.is_authenticated(),
            "Session updated"
        );
    });

    let flow = Arc::new(FlowCoordinator::new(sinks.clone()));
    let gateway = Arc::new(
        AuthGateway::new(transport, store.clone(), flow, sinks)
            .with_refresh_lead(config.token_refresh_lead),
    );

    // Page-load resolution: pick up a still-valid session if the server has one
    match gateway.refresh().await {
        Ok(RefreshOutcome::Refreshed) => tracing::info!("✅ Existing session restored"),
        Ok(_) => tracing::info!("No existing session"),
        Err(e) => tracing::warn!("Could not determine session state: {}", e),
    }

    if !store.snapshot().is_authenticated() {
        if let Some((email, password)) = config.credentials() {
            let outcome = gateway
                .login(email, password, |e| tracing::error!("❌ Login failed: {}", e))
                .await;
            if let Ok(LoginOutcome::LoggedIn) = outcome {
                tracing::info!("✅ Authenticated as {}", email);
            }
        }
    }

    let session = store.snapshot();
    if !session.is_authenticated() {
        tracing::warn!("Not authenticated; nothing to keep alive");
        return Ok(());
    }

    if let Some(at) = gateway.next_refresh_at() {
        tracing::info!("Next token refresh at {}", at.to_rfc3339());
    }

    tracing::info!("Session active, press Ctrl+C to log out");
    shutdown_signal().await;

    gateway.logout().await;
    tracing::info!("👋 Shutdown complete");

    Ok(())
}

async fn load_strings(config: &Config) -> Result<Arc<dyn Strings>> {
    let locale = config.parsed_locale()?;

    let Some(dir) = &config.locale_dir else {
        return Ok(Arc::new(LocaleStrings::fallback()));
    };

    match LocaleStrings::load(dir, locale).await {
        Ok(strings) => Ok(Arc::new(strings)),
        Err(e) => {
            tracing::warn!("{}; using English strings", e);
            Ok(Arc::new(LocaleStrings::fallback()))
        }
    }
}

/// Handle graceful shutdown signal
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, logging out...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, logging out...");
        },
    }
}

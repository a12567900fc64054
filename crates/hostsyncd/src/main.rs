// # hostsyncd - hostsync daemon
//
// Thin integration layer: loads configuration, installs logging, wires the
// Cloudflare API and the HTTP IP source into a scheduler, and runs it until
// SIGINT/SIGTERM or a fatal error. All reconciliation logic lives in
// hostsync-core.
//
// ## Configuration
//
// Environment variables, optionally seeded from a `.env` file (the path in
// `DDNS_ENV_FILE`, otherwise `.env` found from the working directory).
// Variables already set in the environment take precedence.
//
// - `DDNS_API_TOKEN` (`CFKEY`): Cloudflare API token
// - `DDNS_ACCOUNT` (`CFUSER`): account identifier, informational
// - `DDNS_ZONE` (`CFZONE`): zone name
// - `DDNS_HOSTS` (`CFHOSTS`): whitespace-separated host names
// - `DDNS_INTERVAL` (`TICKTIME`): poll interval, e.g. `5m` or `1h30m`
// - `DDNS_IP_URL`: IP echo service (default `http://checkip.amazonaws.com/`)
// - `DDNS_API_URL`: API root (default `https://api.cloudflare.com/client/v4`)
// - `DDNS_ZONE_MATCH`: `strict` | `first`
// - `DDNS_FAILURE_POLICY`: `continue` | `fail-fast`
// - `DDNS_LOG_LEVEL`: trace | debug | info | warn | error
//
// ## Example
//
// ```bash
// export DDNS_API_TOKEN=your_token
// export DDNS_ZONE=example.com
// export DDNS_HOSTS="example.com www.example.com"
// export DDNS_INTERVAL=5m
//
// hostsyncd
// ```

use anyhow::{Context, Result};
use hostsync_core::config::{ENV_FILE_VAR, load_dotenv};
use hostsync_core::{HostsyncConfig, ProviderClient, Reconciler, Scheduler};
use hostsync_ip_http::HttpIpSource;
use hostsync_provider_cloudflare::CloudflareApi;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (fatal pass failure)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HostsyncExitCode {
    /// Clean shutdown (signal received)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Fatal error while running
    RuntimeError = 2,
}

impl From<HostsyncExitCode> for ExitCode {
    fn from(code: HostsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let env_file = std::env::var_os(ENV_FILE_VAR).map(PathBuf::from);
    let loaded_env = match load_dotenv(env_file.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("{}", e);
            return HostsyncExitCode::ConfigError.into();
        }
    };

    let config = match HostsyncConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("{}", e);
            return HostsyncExitCode::ConfigError.into();
        }
    };

    // Validated by HostsyncConfig, the fallback is never hit
    let log_level = config.log_level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return HostsyncExitCode::ConfigError.into();
    }

    info!("Starting hostsyncd {}", env!("CARGO_PKG_VERSION"));
    match loaded_env {
        Some(path) => info!("Loaded environment from {}", path.display()),
        None => warn!("No .env file found, using process environment only"),
    }
    debug!("Configuration: {:?}", config);

    let scheduler = match build_scheduler(&config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            error!("Startup failed: {:#}", e);
            return HostsyncExitCode::ConfigError.into();
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return HostsyncExitCode::ConfigError.into();
        }
    };

    rt.block_on(run_daemon(scheduler)).into()
}

/// Wire provider, IP source and scheduler from configuration
fn build_scheduler(config: &HostsyncConfig) -> Result<Scheduler<CloudflareApi>> {
    let api = CloudflareApi::with_base_url(&config.api_token, &config.api_url)
        .context("Failed to create Cloudflare client")?;
    let ip_source = HttpIpSource::with_url(&config.ip_url).context("Failed to create IP source")?;

    let client = ProviderClient::new(api, &config.zone).with_zone_match(config.zone_match);
    let reconciler = Reconciler::new(client, Box::new(ip_source), config.hosts.clone());

    info!(
        "Managing {} host(s) in zone {} every {:?}",
        config.hosts.len(),
        config.zone,
        config.interval
    );
    for host in &config.hosts {
        info!("Managing record: {}", host);
    }

    let scheduler = Scheduler::new(reconciler, config.interval)
        .context("Invalid scheduler interval")?
        .with_failure_policy(config.failure_policy);
    Ok(scheduler)
}

/// Run the scheduler until a shutdown signal or a fatal error
async fn run_daemon(scheduler: Scheduler<CloudflareApi>) -> HostsyncExitCode {
    let shutdown = match shutdown_signal() {
        Ok(shutdown) => shutdown,
        Err(e) => {
            error!("{:#}", e);
            return HostsyncExitCode::ConfigError;
        }
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let watcher = tokio::spawn(async move {
        let name = shutdown.await;
        info!("Received shutdown signal: {}", name);
        let _ = shutdown_tx.send(());
    });

    let result = scheduler.run_with_shutdown(shutdown_rx).await;
    watcher.abort();

    match result {
        Ok(()) => {
            info!("Shutting down daemon");
            HostsyncExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Fatal error, stopping: {}", e);
            HostsyncExitCode::RuntimeError
        }
    }
}

/// Install SIGTERM/SIGINT handlers; the future resolves to the signal name
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Ctrl-C only on non-Unix platforms
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to wait for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
        "SIGINT"
    })
}

//! SimHub shell entry point.
//!
//! Wires the module manager, the host bridge, and the WebSocket guest
//! endpoint together and runs until interrupted.
//!
//! # Startup sequence
//!
//! ```text
//! main()
//!  └─ tracing init (RUST_LOG, info fallback)
//!  └─ ShellConfig from disk, overridden by CLI/env
//!  └─ ModuleManager::new()      -- register built-in views/actions
//!  └─ load_config()             -- fetch + reconcile the module catalog
//!  └─ install()                 -- populate the route table
//!  └─ HostBridge + WS endpoint  -- accept out-of-process guests
//!  └─ block until Ctrl-C
//! ```
//!
//! # Environment variable overrides
//!
//! CLI args take precedence when both are present.
//!
//! | Variable                 | Default                                        |
//! |--------------------------|------------------------------------------------|
//! | `SIMHUB_CONFIG_ENDPOINT` | `http://127.0.0.1:8080/api/v1/resource-types`  |
//! | `SIMHUB_WS_BIND`         | `0.0.0.0:7810`                                 |
//! | `SIMHUB_DEV_MODE`        | unset (off)                                    |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use simhub_bridge::{
    run_guest_endpoint, BridgeConfig, HostBridge, Notification, Notifier, OriginPolicy,
};
use simhub_shell::infrastructure::auth::InMemoryTokenStore;
use simhub_shell::infrastructure::storage::config as storage;
use simhub_shell::{HttpConfigFetcher, ModuleManager, RouteTable};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// SimHub resource console shell.
///
/// Composes compiled-in modules, plugin registrations, and the backend's
/// declarative module catalog into one navigation surface, and hosts guest
/// applications over the frame bridge.
#[derive(Debug, Parser)]
#[command(
    name = "simhub-shell",
    about = "SimHub console shell: module registry host and guest bridge",
    version
)]
struct Cli {
    /// Module catalog endpoint URL.
    #[arg(long, env = "SIMHUB_CONFIG_ENDPOINT")]
    config_endpoint: Option<String>,

    /// Bind address for the WebSocket guest endpoint.
    #[arg(long, env = "SIMHUB_WS_BIND")]
    ws_bind: Option<String>,

    /// Development mode: external modules load their dev URL.
    #[arg(long, env = "SIMHUB_DEV_MODE")]
    dev: bool,

    /// Path to the shell config file.  Defaults to the platform location.
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// Guest origin to allow.  Repeatable.  When none are given (here or in
    /// the config file) the permissive development policy is used.
    #[arg(long = "allow-origin")]
    allow_origins: Vec<String>,
}

impl Cli {
    /// Merges CLI arguments over the on-disk config.  CLI wins over file,
    /// file wins over defaults.
    fn into_settings(self) -> anyhow::Result<Settings> {
        let file_path = match &self.config_file {
            Some(path) => path.clone(),
            None => storage::config_file_path().context("resolving shell config path")?,
        };
        let file = storage::load_from(&file_path)
            .with_context(|| format!("loading shell config from {}", file_path.display()))?;

        let ws_bind: SocketAddr = self
            .ws_bind
            .unwrap_or(file.network.ws_bind)
            .parse()
            .context("invalid WebSocket bind address")?;

        let mut allowed = file.origins.allowed;
        allowed.extend(self.allow_origins);

        Ok(Settings {
            config_endpoint: self.config_endpoint.unwrap_or(file.network.config_endpoint),
            ws_bind,
            dev_mode: self.dev || file.shell.dev_mode,
            allowed_origins: allowed,
        })
    }
}

struct Settings {
    config_endpoint: String,
    ws_bind: SocketAddr,
    dev_mode: bool,
    allowed_origins: Vec<String>,
}

/// Notifier that surfaces guest notifications into the shell log.
struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        info!(
            level = ?notification.level,
            title = %notification.title,
            "guest notification: {}",
            notification.message
        );
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Cli::parse().into_settings()?;
    info!(
        endpoint = %settings.config_endpoint,
        ws = %settings.ws_bind,
        dev = settings.dev_mode,
        "SimHub shell starting"
    );

    // ── Module registry ───────────────────────────────────────────────────────
    let manager = Arc::new(ModuleManager::new(settings.dev_mode));
    register_builtin_views(&manager);

    let fetcher = HttpConfigFetcher::new(settings.config_endpoint);
    match manager.load_config(&fetcher).await {
        Ok(count) => info!(modules = count, "module catalog loaded"),
        Err(err) => warn!(%err, "initial catalog load failed, running with an empty module list"),
    }

    let mut routes = RouteTable::new();
    manager.install(&mut routes);
    info!(routes = routes.len(), menus = manager.menus().len(), "navigation installed");

    // ── Host bridge + guest endpoint ──────────────────────────────────────────
    let origins = if settings.allowed_origins.is_empty() {
        warn!("no guest origins configured, accepting any origin (development only)");
        OriginPolicy::any()
    } else {
        OriginPolicy::allow_list(settings.allowed_origins)
    };

    let host = Arc::new(HostBridge::new(
        origins.clone(),
        Arc::new(InMemoryTokenStore::new()),
        Arc::new(LogNotifier),
    ));

    let bridge_config = BridgeConfig {
        ws_bind_addr: settings.ws_bind,
        origins,
        ..BridgeConfig::default()
    };

    // Shutdown flag shared with the accept loop.
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, initiating graceful shutdown");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::error!("failed to listen for Ctrl+C signal: {e}");
            }
        }
    });

    run_guest_endpoint(host, bridge_config, running).await?;

    info!("SimHub shell stopped");
    Ok(())
}

/// Registers the list views every deployment ships with.
fn register_builtin_views(manager: &ModuleManager) {
    use simhub_core::domain::meta::ViewMeta;

    for (key, label, icon) in [
        ("table", "Table", "Grid"),
        ("card", "Cards", "Postcard"),
        ("gallery", "Gallery", "Picture"),
    ] {
        manager.register_view(ViewMeta {
            key: key.to_string(),
            label: label.to_string(),
            icon: Some(icon.to_string()),
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

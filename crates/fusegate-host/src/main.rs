// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use fusegate_client::{AuthorizedTransport, HttpTransport, ReqwestTransport};
use fusegate_host::{admin, GatewayConfig, Mounter, SessionManager};
use fusegate_logging::CliLoggingArgs;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{info, Instrument};

const COMPONENT: &str = "fusegate";

#[derive(Parser, Debug)]
#[command(author, version, about = "Serve FUSE mounts from an HTTP backend", long_about = None)]
struct Args {
    /// Configuration file (TOML or JSON)
    #[arg(long, short = 'f', env = "FUSEGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Admin API listen address, overriding the configuration
    #[arg(long)]
    bind_host: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,

    #[command(flatten)]
    logging: CliLoggingArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = GatewayConfig::load(args.config.as_deref())
        .context("failed to load gateway configuration")?;
    if let Some(bind_host) = args.bind_host {
        config.bind_host = bind_host;
    }
    config.validate()?;

    if args.dump_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    args.logging.init(COMPONENT)?;

    let span = tracing::info_span!("gateway", component = COMPONENT);
    run(config).instrument(span).await
}

async fn run(config: GatewayConfig) -> Result<()> {
    info!(
        operation = "start_gateway",
        bind_host = %config.bind_host,
        encoding = ?config.encoding,
        "starting fusegate"
    );

    let transport: Arc<dyn HttpTransport> = Arc::new(AuthorizedTransport::new(
        ReqwestTransport::with_defaults()?,
        config.auth_scheme.clone(),
    ));
    let manager = Arc::new(SessionManager::new(
        mounter(),
        transport,
        config.manager_settings(),
        config.mount_table(),
    ));

    let restored = manager.restore().await.context("failed to restore saved mounts")?;
    info!(operation = "restore_mounts", restored, "saved mounts restored");

    let listener = tokio::net::TcpListener::bind(&config.bind_host)
        .await
        .with_context(|| format!("failed to bind admin API on {}", config.bind_host))?;
    info!(operation = "admin_listen", addr = %listener.local_addr()?, "admin API listening");

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let shutdown = async move {
        tokio::select! {
            _ = sigint.recv() => info!(operation = "signal", signal = "SIGINT", "shutting down"),
            _ = sigterm.recv() => info!(operation = "signal", signal = "SIGTERM", "shutting down"),
        }
    };

    axum::serve(listener, admin::router(Arc::clone(&manager)))
        .with_graceful_shutdown(shutdown)
        .await
        .context("admin API failed")?;

    manager.shutdown_all().await;
    info!(operation = "stop_gateway", "fusegate stopped");
    Ok(())
}

#[cfg(all(feature = "fuse", target_os = "linux"))]
fn mounter() -> Arc<dyn Mounter> {
    Arc::new(fusegate_host::fuse_session::FuserMounter::new())
}

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
fn mounter() -> Arc<dyn Mounter> {
    tracing::warn!("FUSE support not compiled in; every mount request will fail");
    tracing::info!("To enable FUSE support, compile with: cargo build --features fuse");
    Arc::new(unavailable::UnavailableMounter)
}

#[cfg(not(all(feature = "fuse", target_os = "linux")))]
mod unavailable {
    use std::path::Path;

    use async_trait::async_trait;
    use fusegate_host::{KernelSession, MountArgs, Mounter, SessionError};

    pub struct UnavailableMounter;

    #[async_trait]
    impl Mounter for UnavailableMounter {
        async fn mount(&self, args: &MountArgs) -> Result<Box<dyn KernelSession>, SessionError> {
            Err(SessionError::Mount {
                mount_point: args.mount_point.clone(),
                reason: "built without FUSE support".into(),
            })
        }

        async fn unmount(&self, mount_point: &Path) -> Result<(), SessionError> {
            Err(SessionError::Unmount {
                mount_point: mount_point.to_path_buf(),
                reason: "built without FUSE support".into(),
            })
        }
    }
}

//! beacond - the beacon daemon
//!
//! Wires a Docker runtime to the configured backends and runs the engine
//! until the process is asked to stop.

use anyhow::Context;
use beacon_core::{Backend, Filter};
use beacon_engine::config::{BackendConfig, Config, DEFAULT_CONFIG_FILE};
use beacon_engine::{Announcer, DockerRuntime, Engine, EtcdDiscovery, LogBackend};
use beacon_engine::{Route, ServiceSource, WebhookBackend};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "beacond", about = "Announce Docker containers to discovery backends")]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let runtime = Arc::new(DockerRuntime::connect(
        &config.docker.socket,
        &config.docker.host_ip,
        &config.docker.label,
    )?);

    let mut routes = Vec::with_capacity(config.backends.len());
    let mut announcing = false;
    for route in &config.backends {
        let filter = Filter::parse(&route.filter)?;
        let backend: Arc<dyn Backend> = match &route.backend {
            BackendConfig::Log(_) => Arc::new(LogBackend::new()),
            BackendConfig::Webhook(webhook) => Arc::new(WebhookBackend::new(&webhook.url)),
            BackendConfig::Etcd(etcd) => {
                announcing = true;
                let discovery = Arc::new(
                    EtcdDiscovery::connect(&etcd.endpoints, &etcd.prefix, etcd.protocol)
                        .await
                        .context("failed to connect to etcd")?,
                );
                let mut announcer = Announcer::new(
                    discovery,
                    config.heartbeat.interval(),
                    config.heartbeat.grace(),
                );
                if let Some(label) = &etcd.services_label {
                    announcer =
                        announcer.with_source(ServiceSource::SpecLabel(label.clone()));
                }
                Arc::new(announcer)
            }
        };
        routes.push(Route::new(filter, backend));
    }

    let mut engine = Engine::new(runtime, routes)?;
    if announcing {
        engine = engine.with_heartbeat(config.heartbeat.interval());
    }
    let engine = Arc::new(engine);

    let mut run = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.run().await }
    });

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = &mut run => {
            // the runtime ended the stream on its own
            result??;
            return Ok(());
        }
        _ = interrupt.recv() => info!("received interrupt"),
        _ = terminate.recv() => info!("received terminate"),
    }

    engine.close().await?;
    run.await??;
    Ok(())
}

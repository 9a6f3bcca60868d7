// vantage: vision node launcher
// Reads the node configuration, joins the bus, starts the cameras and tracks
// targets until interrupted.

mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use vantage_bus::{BusBootstrap, ControlBus, MemoryBus};
use vantage_eye::{ContourFeed, FrameWorker, VisionNode};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let node_config = match vantage_core::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            return Err(e.into());
        }
    };

    let bus: Arc<dyn ControlBus> = Arc::new(MemoryBus::new());
    let bootstrap = BusBootstrap::new(bus.clone());
    bootstrap
        .start(node_config.bus_mode, node_config.team)
        .context("could not start the bus")?;

    let node = VisionNode::new(node_config, cli.vision_config(), bus)?;
    node.start_cameras()?;

    let feed_worker = match &cli.contours {
        Some(path) => {
            let feed = ContourFeed::open(path, cli.frame_interval()).await?;
            Some(node.attach_pipeline(0, Box::new(feed))?)
        }
        None => None,
    };

    tokio::select! {
        _ = wait_for_shutdown() => {}
        _ = wait_for_feed(feed_worker) => {
            info!("Contour feed finished");
        }
    }

    info!("Shutting down");
    node.shutdown().await;
    bootstrap.stop();
    Ok(())
}

async fn wait_for_feed(worker: Option<Arc<FrameWorker>>) {
    match worker {
        Some(worker) => worker.join().await,
        None => std::future::pending::<()>().await,
    }
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Could not listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Could not listen for SIGTERM: {}", e);
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
}

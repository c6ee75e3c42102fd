use std::{process, sync::Arc, time::Duration};

use sysbeacon::{
    config::Settings,
    core::{
        discovery::DiscoveryAnnouncer,
        metrics::{log_metrics_table, MetricSet},
        publish::Publisher,
        report::StateReporter,
        scheduler::Scheduler,
    },
    logger::LoggerManager,
    print_error,
};
use sysbeacon_mqtt::Transport;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// How long startup waits for the broker before announcing discovery
/// anyway. Announcements are best-effort either way.
const CONNECT_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() {
    // Configuration problems are fatal before anything else starts; the
    // diagnostic names the offending field.
    let settings = Settings::locate_and_load().unwrap_or_else(|e| {
        print_error!("{}", e);
        process::exit(1);
    });

    let mut logger_manager = LoggerManager::new(settings.logger.clone()).unwrap_or_else(|e| {
        print_error!("Failed to set up logging: {}", e);
        process::exit(1);
    });
    logger_manager.init().unwrap_or_else(|e| {
        print_error!("Failed to initialize logging: {}", e);
        process::exit(1);
    });
    info!("Starting sysbeacon version {}...", env!("CARGO_PKG_VERSION"));
    info!("Log level: {}", settings.logger.level);
    info!(
        "Device '{}' reporting every {}s to {}:{}",
        settings.device_name, settings.update_interval, settings.mqtt.hostname, settings.mqtt.port
    );

    let metrics = MetricSet::resolve(&settings).await;
    log_metrics_table(&metrics);

    let transport = Transport::start(settings.broker_config()).unwrap_or_else(|e| {
        error!("Failed to start MQTT transport: {e}");
        process::exit(1);
    });

    if !transport.wait_connected(CONNECT_GRACE).await {
        warn!(
            "Broker not reachable within {}s; continuing, deliveries resume on reconnect",
            CONNECT_GRACE.as_secs()
        );
    }

    let publisher: Arc<dyn Publisher> = Arc::new(transport.clone());

    // Discovery must precede any state publication.
    let announcer = DiscoveryAnnouncer::new(&settings, &metrics, publisher.clone());
    let announced = announcer.announce().await;
    info!(
        "Announced {announced}/{} sensors to Home Assistant",
        announcer.entries().len()
    );

    let reporter = Arc::new(StateReporter::new(&settings, &metrics, publisher));
    info!("Publishing state to {}", reporter.topic());

    let tick_reporter = reporter.clone();
    let scheduler = Scheduler::start(
        Duration::from_secs(settings.update_interval),
        move || {
            let reporter = tick_reporter.clone();
            async move {
                if let Err(e) = reporter.collect_and_publish().await {
                    error!("Collection pass failed: {e}");
                }
            }
        },
    );

    wait_for_shutdown_signal().await;

    // Stop the scheduler first and wait for it to fully exit; tearing down
    // the transport earlier would strand a pass that is mid-publish.
    info!("Stopping scheduler...");
    scheduler.request_stop();
    scheduler.await_stopped().await;

    info!("Closing broker connection...");
    if let Err(e) = transport.shutdown().await {
        warn!("Broker connection did not close cleanly: {e}");
    }

    info!("Shutdown complete");
}

/// Blocks until SIGINT or SIGTERM arrives.
async fn wait_for_shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to install SIGTERM handler: {e}");
            process::exit(1);
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("SIGINT received"),
        _ = sigterm.recv() => info!("SIGTERM received"),
    }
}

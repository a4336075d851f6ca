use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;

const BUS_NAME: &str = "org.freedesktop.Glance1";
const OBJECT_PATH: &str = "/org/freedesktop/Glance1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("glanced starting");

    let config = config::Config::from_env().context("failed to load configuration")?;
    tracing::info!(
        file = ?config.liveness_file,
        orientation = ?config.liveness.orientation,
        left_settle_ms = config.liveness.left_settle_ms,
        right_settle_ms = config.liveness.right_settle_ms,
        blink_threshold = config.liveness.blink_threshold,
        min_blink_frames = config.liveness.min_blink_frames,
        min_sample_interval_ms = config.liveness.min_sample_interval_ms,
        "configuration loaded"
    );

    let engine = engine::spawn_engine(config.liveness.clone(), config.event_history)?;

    let service = dbus_interface::GlanceService {
        engine,
        liveness: config.liveness.clone(),
    };

    let builder = if config.session_bus {
        zbus::connection::Builder::session()?
    } else {
        zbus::connection::Builder::system()?
    };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await
        .context("failed to register on D-Bus")?;

    tracing::info!(
        bus = if config.session_bus { "session" } else { "system" },
        name = BUS_NAME,
        "glanced ready"
    );

    // Keep running until signaled
    tokio::signal::ctrl_c().await?;
    tracing::info!("glanced shutting down");

    Ok(())
}

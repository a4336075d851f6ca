//! D-Bus client for the `glanced` daemon.

use anyhow::{Context, Result};
use zbus::proxy;

#[proxy(
    interface = "org.freedesktop.Glance1",
    default_service = "org.freedesktop.Glance1",
    default_path = "/org/freedesktop/Glance1"
)]
pub trait Glance {
    fn push_sample(
        &self,
        left_x: f64,
        left_y: f64,
        right_x: f64,
        right_y: f64,
        nose_x: f64,
        nose_y: f64,
    ) -> zbus::Result<String>;

    fn no_face(&self) -> zbus::Result<String>;

    fn reset(&self) -> zbus::Result<String>;

    fn status(&self) -> zbus::Result<String>;

    fn events(&self) -> zbus::Result<String>;
}

/// Connect to the daemon on the system bus, or the session bus in
/// development mode.
pub async fn connect(session_bus: bool) -> Result<GlanceProxy<'static>> {
    let conn = if session_bus {
        zbus::Connection::session().await
    } else {
        zbus::Connection::system().await
    }
    .context("failed to connect to D-Bus")?;

    GlanceProxy::new(&conn)
        .await
        .context("failed to create glanced proxy")
}

/// Re-indent a JSON reply from the daemon for terminal output.
pub fn pretty(json: &str) -> Result<String> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("daemon returned invalid JSON")?;
    Ok(serde_json::to_string_pretty(&value)?)
}

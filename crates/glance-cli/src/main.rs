use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod client;
mod replay;

#[derive(Parser)]
#[command(name = "glance", version, about = "Gesture liveness verification")]
struct Cli {
    /// Talk to glanced on the session bus instead of the system bus
    #[arg(long, global = true)]
    session: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the current session as JSON
    Status,
    /// Abandon the current session and start a new one
    Reset,
    /// List recent gesture events
    Events,
    /// Push one landmark sample (pixel coordinates)
    Push {
        left_x: f64,
        left_y: f64,
        right_x: f64,
        right_y: f64,
        nose_x: f64,
        nose_y: f64,
    },
    /// Report a frame with no detected face
    NoFace,
    /// Replay a recorded landmark trace offline, without the daemon
    Replay {
        /// JSON-lines trace, one frame per line
        trace: PathBuf,
        /// TOML file with liveness thresholds
        #[arg(long)]
        config: Option<PathBuf>,
        /// Spacing between consecutive trace frames
        #[arg(long, default_value_t = 33)]
        frame_interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let reply = match cli.command {
        Command::Replay {
            trace,
            config,
            frame_interval_ms,
        } => return replay::run(&trace, config.as_deref(), frame_interval_ms),
        Command::Status => client::connect(cli.session).await?.status().await?,
        Command::Reset => {
            let id = client::connect(cli.session).await?.reset().await?;
            println!("New session: {id}");
            return Ok(());
        }
        Command::Events => client::connect(cli.session).await?.events().await?,
        Command::Push {
            left_x,
            left_y,
            right_x,
            right_y,
            nose_x,
            nose_y,
        } => {
            client::connect(cli.session)
                .await?
                .push_sample(left_x, left_y, right_x, right_y, nose_x, nose_y)
                .await?
        }
        Command::NoFace => client::connect(cli.session).await?.no_face().await?,
    };

    println!("{}", client::pretty(&reply)?);
    Ok(())
}

use clap::{Parser, Subcommand};
use std::io::Write;
use std::os::unix::net::UnixStream;

const SOCKET_PATH: &str = "/tmp/rota.sock";

#[derive(Parser, Debug)]
#[command(name = "rotactl", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Hide the chart, or reveal it when hidden.
    Toggle,
    /// Rotate the given slice to the anchor.
    Select { index: usize },
    /// Stop the render thread.
    Pause,
    /// Restart the render thread.
    Resume,
    /// Reload the slices file.
    Reload,
}

impl Commands {
    fn line(&self) -> String {
        match self {
            Self::Toggle => "toggle".to_string(),
            Self::Select { index } => format!("select {}", index),
            Self::Pause => "pause".to_string(),
            Self::Resume => "resume".to_string(),
            Self::Reload => "reload".to_string(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let line = cli.command.line();
    log::debug!("Sending '{}'", line);
    send_command(&line)
}

fn send_command(cmd: &str) -> anyhow::Result<()> {
    let mut stream = UnixStream::connect(SOCKET_PATH).map_err(|e| {
        anyhow::anyhow!(
            "Failed to connect to rota at {}: {}. Is rota-app running?",
            SOCKET_PATH,
            e
        )
    })?;

    writeln!(stream, "{}", cmd)?;
    Ok(())
}

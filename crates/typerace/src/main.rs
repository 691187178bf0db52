use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;
use typerace::prelude::*;

#[derive(Debug, Parser)]
#[command(name = "typerace-server", version, about = "Multiplayer typing race server")]
struct Cli {
    /// Address to listen on.
    #[arg(long, env = "TYPERACE_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    /// Maximum racers per room.
    #[arg(long, env = "TYPERACE_CAPACITY", default_value_t = 4)]
    capacity: usize,

    /// Player count that starts a room's race clock.
    #[arg(long, env = "TYPERACE_START_THRESHOLD", default_value_t = 2)]
    start_threshold: usize,

    #[arg(long, value_enum, default_value_t = ClockArg::FirstInput)]
    typing_clock: ClockArg,

    #[arg(long, value_enum, default_value_t = FinishArg::Every)]
    finish_policy: FinishArg,

    /// File of passages, one per line. Without it every race uses the
    /// built-in sentence.
    #[arg(long, env = "TYPERACE_PASSAGES")]
    passages: Option<PathBuf>,

    /// Keep the current passage when a room restarts.
    #[arg(long)]
    keep_passage: bool,

    /// Seconds of client silence before a connection is dropped.
    #[arg(long, env = "TYPERACE_IDLE_TIMEOUT", default_value_t = 300)]
    idle_timeout: u64,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ClockArg {
    FirstInput,
    SingleCharacter,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FinishArg {
    Every,
    First,
}

impl Cli {
    fn race_config(&self) -> RaceConfig {
        RaceConfig {
            capacity: self.capacity,
            start_threshold: self.start_threshold,
            typing_clock: match self.typing_clock {
                ClockArg::FirstInput => TypingClock::FirstInput,
                ClockArg::SingleCharacter => TypingClock::SingleCharacter,
            },
            finish_policy: match self.finish_policy {
                FinishArg::Every => FinishPolicy::EveryFinisher,
                FinishArg::First => FinishPolicy::FirstOnly,
            },
            redraw_on_restart: !self.keep_passage,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let builder = TyperaceServer::builder()
        .bind(&cli.bind)
        .idle_timeout(Duration::from_secs(cli.idle_timeout))
        .race_config(cli.race_config());

    let server = match &cli.passages {
        Some(path) => {
            let contents = std::fs::read_to_string(path)?;
            let pool = PassagePool::from_lines(&contents)?;
            tracing::info!(path = %path.display(), passages = pool.len(), "loaded passages");
            builder.passages(pool).build().await?
        }
        None => builder.build().await?,
    };

    tracing::info!(addr = %server.local_addr()?, "listening");
    server.run().await?;
    Ok(())
}

use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use env_logger::{Env, Target};
use quiz_runner::client::{self, PlayOptions};
use quiz_runner::config::{
    DEFAULT_ANSWER_ADVANCE_DELAY, DEFAULT_TIMEOUT_ADVANCE_DELAY, DEFAULT_TIMER_DURATION_SECS,
    SessionTuning,
};
use quiz_runner::error::QuizError;
use quiz_runner::protocol::DEFAULT_PORT;
use quiz_runner::server::{self, ServerSettings};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Host a question bank for players to connect to
    Serve {
        /// Port to listen on
        #[arg(short, long, env = "QUIZ_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// JSON file to load the surveys from
        #[arg(short, long)]
        bank: PathBuf,

        /// Seconds per question
        #[arg(long, default_value_t = DEFAULT_TIMER_DURATION_SECS,
              value_parser = clap::value_parser!(u32).range(1..))]
        timer_duration: u32,

        /// Milliseconds the answer feedback stays up
        #[arg(long, default_value_t = DEFAULT_ANSWER_ADVANCE_DELAY.as_millis() as u64)]
        answer_delay_ms: u64,

        /// Milliseconds the timeout feedback stays up
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_ADVANCE_DELAY.as_millis() as u64)]
        timeout_delay_ms: u64,
    },

    /// Play a quiz in the terminal
    Play {
        /// Server to connect to
        #[arg(long, env = "QUIZ_HOST", default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(short, long, env = "QUIZ_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Quiz PIN handed out by the host
        #[arg(long)]
        pin: Option<String>,

        /// Survey to play when you already hold a token
        #[arg(long, conflicts_with = "pin")]
        survey: Option<i64>,

        /// Access token for --survey
        #[arg(long, env = "QUIZ_TOKEN")]
        token: Option<String>,

        /// Seconds to wait for each server reply
        #[arg(long, default_value_t = 10)]
        rpc_timeout: u64,

        /// Write logs here instead of discarding them
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run(args.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Commands) -> Result<(), QuizError> {
    match command {
        Commands::Serve {
            port,
            bank,
            timer_duration,
            answer_delay_ms,
            timeout_delay_ms,
        } => {
            env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

            let settings = ServerSettings {
                port,
                bank_path: bank,
                tuning: SessionTuning {
                    timer_duration_secs: timer_duration,
                    answer_advance_delay: Duration::from_millis(answer_delay_ms),
                    timeout_advance_delay: Duration::from_millis(timeout_delay_ms),
                },
            };
            server::run(settings).await
        }
        Commands::Play {
            host,
            port,
            pin,
            survey,
            token,
            rpc_timeout,
            log_file,
        } => {
            // the TUI owns the screen, so logs only go to a file
            if let Some(path) = log_file {
                let file = File::create(path)?;
                env_logger::Builder::from_env(Env::default().default_filter_or("info"))
                    .target(Target::Pipe(Box::new(file)))
                    .init();
            }

            let options = PlayOptions {
                host,
                port,
                pin,
                survey_id: survey,
                access_token: token,
                rpc_timeout: Duration::from_secs(rpc_timeout),
            };
            client::run(options).await
        }
    }
}

//! The `plainchat` program: a terminal chat or the web service.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use plainchat::server::{self, AppState};
use plainchat::{AppConfig, Command, SessionBuilder, parse_command};
use tokio::io::{self, AsyncBufReadExt};
use tokio::select;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

#[derive(Debug, Parser)]
#[command(name = "plainchat", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Chat in the terminal (default).
    Chat {
        /// Model to talk to, `PLAINCHAT_DEFAULT_MODEL` when omitted.
        #[arg(short, long)]
        model: Option<String>,
        /// Sampling temperature, ignored by models without support.
        #[arg(short, long, default_value_t = 0.7)]
        temperature: f32,
    },
    /// Serve the web page and the chat API.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "PLAINCHAT_ADDR", default_value = "0.0.0.0:8000")]
        addr: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    debug!("loaded {config:?}");

    let command = cli.command.unwrap_or(CliCommand::Chat {
        model: None,
        temperature: 0.7,
    });
    match command {
        CliCommand::Serve { addr } => serve(addr, config).await,
        CliCommand::Chat { model, temperature } => {
            chat(config, model, temperature).await
        }
    }
}

async fn serve(addr: SocketAddr, config: AppConfig) -> ExitCode {
    let chat = match config.chat_service() {
        Ok(service) => Some(service),
        Err(err) => {
            warn!("{err}, chat requests will be rejected");
            None
        }
    };

    let state = AppState::new(chat, config.default_model);
    if let Err(err) = server::serve(addr, state).await {
        eprintln!("server error: {err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

async fn chat(
    config: AppConfig,
    model: Option<String>,
    temperature: f32,
) -> ExitCode {
    let service = match config.chat_service() {
        Ok(service) => service,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    let mut session = SessionBuilder::with_chat_service(service)
        .with_model(model.unwrap_or(config.default_model))
        .with_temperature(temperature)
        .build();

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    println!(
        "{}Using {}. Commands: /image <path>, /clear, /temperature <v>, /quit",
        BAR_CHAR.bright_black(),
        session.params().model.bold()
    );
    if let Some(greeting) = session.greeting() {
        println!("{}🤖 {}", BAR_CHAR.bright_cyan(), greeting.bright_white());
    }

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line().await else {
            break;
        };
        let text = match parse_command(&line) {
            Command::Quit => break,
            Command::Clear => {
                session.clear();
                println!("{}Conversation cleared.", BAR_CHAR.bright_black());
                continue;
            }
            Command::Temperature(value) => {
                session.set_temperature(value);
                println!("{}Temperature set to {value}.", BAR_CHAR.bright_black());
                continue;
            }
            Command::Image(path) => {
                match session.attach_image(path).await {
                    Ok(()) => println!(
                        "{}🖼️  Image attached, it goes with your next message.",
                        BAR_CHAR.bright_black()
                    ),
                    Err(err) => print_error(&format!("{err}")),
                }
                continue;
            }
            Command::Invalid(reason) => {
                print_error(&reason);
                continue;
            }
            Command::Message(text) if text.is_empty() && !session.has_pending_image() => {
                continue;
            }
            Command::Message(text) => text.to_owned(),
        };

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");

        let send = session.send(&text);
        tokio::pin!(send);
        let result = loop {
            progress_bar.inc(1);
            select! {
                result = &mut send => break result,
                _ = sleep(Duration::from_millis(100)) => {}
            }
        };

        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();

        match result {
            Ok(reply) => {
                println!("{}🤖 {}", BAR_CHAR.bright_cyan(), reply.bright_white());
            }
            Err(err) => print_error(&format!("{err}")),
        }
    }

    ExitCode::SUCCESS
}

fn print_error(message: &str) {
    println!("{}⚠️  {}", BAR_CHAR.bright_yellow(), message.bright_yellow());
}

async fn read_line() -> Option<String> {
    let mut stdin = io::BufReader::new(io::stdin());
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use snapsense::logger::{self, LogLevel, LoggerConfig};
use snapsense::{Caption, Config, OllamaClient, Shell, SystemTools};

#[derive(Parser)]
#[command(name = "snapsense", version, about = "Caption images with a local vision model")]
struct Cli {
    /// Generate endpoint of the inference service
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Model to caption with
    #[arg(long, global = true)]
    model: Option<String>,

    /// trace, debug, info, warn or error
    #[arg(long, global = true)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive shell (default)
    Shell,
    /// Caption one image and print the result
    Caption {
        image: PathBuf,
        #[arg(long)]
        prompt: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    let cli = Cli::parse();

    let mut logger_config = LoggerConfig::from_env();
    if let Some(level) = cli.log_level {
        logger_config = logger_config.with_level(level);
    }
    if let Err(e) = logger::init_with_config(logger_config) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }
    if !dotenv_loaded {
        log::debug!("No .env file found, using system environment variables");
    }

    let mut config = Config::from_env();
    if let Some(endpoint) = cli.endpoint {
        config.inference = config.inference.with_endpoint(endpoint);
    }
    if let Some(model) = cli.model {
        config.inference = config.inference.with_model(model);
    }

    logger::log_startup_info(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    logger::log_config_info(&config);

    match run(cli.command.unwrap_or(Command::Shell), config).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("❌ {}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: Config) -> snapsense::Result<ExitCode> {
    let ollama = OllamaClient::new(&config.inference)?;

    match command {
        Command::Shell => {
            let shell = Shell::new(config, ollama.caption().clone(), Arc::new(SystemTools::new()));
            shell.run().await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Caption { image, prompt } => {
            let prompt = prompt
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .unwrap_or_else(|| config.default_prompt.clone());

            match ollama.caption().retrieve(&image, &prompt).await {
                Ok(Caption::Text(text)) => {
                    println!("{}", text);
                    Ok(ExitCode::SUCCESS)
                }
                Ok(caption @ Caption::NoCaption) => {
                    println!("{}", caption);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    eprintln!("{}", e.display_text());
                    Ok(ExitCode::FAILURE)
                }
            }
        }
    }
}

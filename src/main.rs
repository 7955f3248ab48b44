//! ai-cli - turn natural-language instructions into shell commands
//!
//! Answers come from a local cache, then a bundled command catalog, then an
//! LLM backend (Ollama or an OpenAI-compatible API).

use ai_cli::{
    agent::{Resolution, ResolutionSource},
    app::App,
    config::{AppConfig, ModelProvider},
    history::History,
    logging,
    tools::ShellExecutor,
};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Store the OpenAI API key in the config file
    SetApiKey {
        #[arg(long)]
        key: String,
    },
    /// Set the model of the selected provider
    SetModel {
        #[arg(long)]
        model: String,
    },
    /// Set the sampling temperature of the selected provider
    SetTemperature {
        #[arg(long)]
        temp: f32,
    },
    /// Set the response token limit of the selected provider
    SetMaxTokens {
        #[arg(long)]
        max_tokens: usize,
    },
    /// Set the Ollama server URL
    SetOllama {
        #[arg(long)]
        url: String,
    },
    /// Print executed commands and their output
    ShowHistory,
    /// Delete the execution history
    ClearHistory,
}

#[derive(Parser, Debug)]
#[command(name = "ai-cli")]
#[command(version)]
#[command(about = "Turn natural-language instructions into shell commands", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    /// Configuration file path (overrides defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend to use (ollama, openai, anthropic)
    #[arg(long, global = true)]
    provider: Option<ModelProvider>,

    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Instruction, e.g. `ai-cli list files modified today`
    #[arg(trailing_var_arg = true)]
    instruction: Vec<String>,
}

/// What the user picked after seeing a command
enum Choice {
    Execute,
    Revise,
    Cancel,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Interactive runs log to a file so the prompt stays readable
    logging::init_logging(args.verbose, !args.verbose)?;

    if let Some(cmd) = args.command {
        return run_subcommand(cmd, args.config, args.provider);
    }

    if args.instruction.is_empty() {
        anyhow::bail!("No instruction given. Try: ai-cli list all files in the current directory");
    }

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(provider) = args.provider {
        config.provider = provider;
        config.validate()?;
    }

    tracing::info!(
        "Using {} ({}) at {}",
        config.provider,
        config.active_model().model,
        config.active_model().url
    );

    let mut app = App::start(config);
    let result = run_interactive(&app, &args.instruction.join(" ")).await;
    app.shutdown().await;
    result
}

async fn run_interactive(app: &App, instruction: &str) -> anyhow::Result<()> {
    let provider = app.config().provider;
    let executor = ShellExecutor::new(app.config().command_timeout());
    let history = History::new(History::default_path());
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let mut resolution = match app.resolve_with(instruction, provider).await {
        Ok(resolution) => resolution,
        Err(e) => {
            eprintln!("Error: {}", e);
            if provider == ModelProvider::Ollama {
                eprintln!("Make sure Ollama is running (ollama serve) and the model is pulled:");
                eprintln!("  ollama pull {}", app.config().active_model().model);
            }
            eprintln!("Logs: {}", logging::log_path_display());
            return Err(e.into());
        }
    };

    loop {
        print_resolution(&resolution);

        match read_choice(&mut input).await? {
            Choice::Execute => {
                let result = executor
                    .execute(&resolution.command)
                    .await
                    .context("Failed to execute command")?;
                let output = result.combined_output();
                print!("{}", output);
                if !result.success {
                    eprintln!("Command exited with code {}", result.exit_code);
                }

                if let Err(e) = history.append(&result.command, &output) {
                    tracing::warn!("Could not record history: {}", e);
                }
                return Ok(());
            }
            Choice::Revise => match app.resolver().revise(&resolution.command, provider).await {
                Ok(revised) => {
                    println!("Revised command:");
                    resolution = revised;
                }
                Err(e) => eprintln!("Error revising command: {}", e),
            },
            Choice::Cancel => {
                println!("Cancelled.");
                return Ok(());
            }
        }
    }
}

fn print_resolution(resolution: &Resolution) {
    if resolution.source == ResolutionSource::Dataset {
        println!("{}", resolution.text);
    } else {
        println!("Command: {}", resolution.text);
    }
    tracing::debug!("Answer from {}", resolution.source);
}

async fn read_choice(input: &mut Lines<BufReader<Stdin>>) -> anyhow::Result<Choice> {
    let mut stdout = tokio::io::stdout();
    loop {
        stdout
            .write_all(b"\n1. Execute the command\n2. Revise the command\n3. Cancel\nChoose an option: ")
            .await?;
        stdout.flush().await?;

        // EOF behaves like cancel
        let Some(line) = input.next_line().await? else {
            return Ok(Choice::Cancel);
        };

        match line.trim() {
            "1" => return Ok(Choice::Execute),
            "2" => return Ok(Choice::Revise),
            "3" => return Ok(Choice::Cancel),
            other => println!("Invalid option {:?}, please choose 1, 2 or 3.", other),
        }
    }
}

fn run_subcommand(
    cmd: Command,
    config_path: Option<PathBuf>,
    provider: Option<ModelProvider>,
) -> anyhow::Result<()> {
    match cmd {
        Command::ShowHistory => {
            let history = History::new(History::default_path());
            let entries = history.entries()?;
            if entries.is_empty() {
                println!("No history yet.");
            }
            for entry in entries {
                println!("[{}] {}", entry.timestamp.format("%Y-%m-%d %H:%M:%S"), entry.command);
                print!("{}", entry.output);
                if !entry.output.ends_with('\n') {
                    println!();
                }
            }
            Ok(())
        }
        Command::ClearHistory => {
            let history = History::new(History::default_path());
            if history.clear()? {
                println!("History cleared.");
            } else {
                println!("History is already empty.");
            }
            Ok(())
        }
        Command::SetApiKey { key } => update_config(config_path, provider, |config| {
            config.openai.api_key = Some(key);
            "API key saved".to_string()
        }),
        Command::SetModel { model } => update_config(config_path, provider, |config| {
            let message = format!("Model for {} set to {}", config.provider, model);
            config.active_model_mut().model = model;
            message
        }),
        Command::SetTemperature { temp } => update_config(config_path, provider, |config| {
            config.active_model_mut().temperature = temp;
            format!("Temperature for {} set to {}", config.provider, temp)
        }),
        Command::SetMaxTokens { max_tokens } => update_config(config_path, provider, |config| {
            config.active_model_mut().max_tokens = Some(max_tokens);
            format!("Max tokens for {} set to {}", config.provider, max_tokens)
        }),
        Command::SetOllama { url } => update_config(config_path, provider, |config| {
            let message = format!("Ollama URL set to {}", url);
            config.ollama.url = url;
            message
        }),
    }
}

/// Apply one setting to the stored config and write it back
fn update_config<F>(
    config_path: Option<PathBuf>,
    provider: Option<ModelProvider>,
    apply: F,
) -> anyhow::Result<()>
where
    F: FnOnce(&mut AppConfig) -> String,
{
    let mut config = AppConfig::load_stored(config_path.as_deref())?;
    if let Some(provider) = provider {
        config.provider = provider;
    }

    let message = apply(&mut config);
    config.active_model().validate()?;
    config.ollama.validate()?;

    let path = config_path
        .or_else(AppConfig::default_path)
        .context("Could not determine the config directory")?;
    config.save_to_file(&path)?;

    println!("{} ({})", message, path.display());
    Ok(())
}

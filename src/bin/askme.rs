//! Ask a local or hosted model a question and watch the answer stream in.
//!
//! # Usage
//!
//! ```bash
//! # One question, default provider and model from ~/.config/askme/config.yaml
//! askme "What is a monad?"
//!
//! # Pick the provider and model
//! askme --provider mistral --model mistral-small-latest "Explain lifetimes"
//!
//! # Interactive chat with the current project loaded as context
//! askme --chat --context
//! ```

use std::io;
use std::sync::{Arc, Mutex};

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use askme::chat::{
    AskArgs, AskConfig, Banner, ChatSession, FAREWELL, FileConfig, PlainTextRenderer, Renderer,
    Step, WELCOME, build_context, context_system_prompt,
};
use askme::{Error, ProviderRequest, RelayOptions, TurnDisplay, connect, stream_turn};

/// The token cancelled by Ctrl+C.  Replaced before every turn.
type CurrentCancel = Arc<Mutex<CancellationToken>>;

fn init_tracing(verbose: bool) {
    let default = if verbose { "askme=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn fresh_cancel(current: &CurrentCancel) -> CancellationToken {
    let token = CancellationToken::new();
    if let Ok(mut slot) = current.lock() {
        *slot = token.clone();
    }
    token
}

fn report(renderer: &mut dyn Renderer, err: &Error) {
    if err.is_cancelled() {
        renderer.print_interrupted();
    } else {
        renderer.print_error(&err.to_string());
    }
}

fn read_prompt(renderer: &mut dyn Renderer) -> Result<String, Box<dyn std::error::Error>> {
    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("Enter your prompt: ") {
            Ok(line) if !line.trim().is_empty() => return Ok(line.trim().to_string()),
            Ok(_) => renderer.print_error("A prompt is required"),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                return Err(Box::new(Error::cancelled("no prompt given")));
            }
            Err(err) => return Err(Box::new(err)),
        }
    }
}

async fn ask_once(
    config: &AskConfig,
    prompt: String,
    current: &CurrentCancel,
    renderer: &mut dyn Renderer,
) -> Result<(), Error> {
    let provider = connect(config.provider, &config.provider_settings())?;
    let request = ProviderRequest::prompt(&config.model, prompt.clone(), config.role.clone())?
        .with_file(config.file.clone());
    let options = RelayOptions::new()
        .with_cancel(fresh_cancel(current))
        .with_deadline(config.timeout);
    let display = TurnDisplay::quiet()
        .with_spinner(io::stdout())
        .with_question(prompt);
    stream_turn(provider, request, options, display, renderer).await?;
    Ok(())
}

async fn chat(
    config: &AskConfig,
    current: &CurrentCancel,
    renderer: &mut dyn Renderer,
) -> Result<(), Box<dyn std::error::Error>> {
    let provider = connect(config.provider, &config.provider_settings())?;
    let system = if config.context {
        let cwd = std::env::current_dir()?;
        let listing = build_context(&cwd)?;
        Some(context_system_prompt(config.role.as_deref(), &listing))
    } else {
        config.role.clone()
    };
    let mut session = ChatSession::new(provider, &config.model, system)
        .with_deadline(config.timeout)
        .with_spinner(true);
    let mut rl = DefaultEditor::new()?;

    renderer.print_info(WELCOME);
    loop {
        match rl.readline(">>> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.trim());
                }
                let cancel = fresh_cancel(current);
                if session.handle_line(&line, cancel, renderer).await == Step::Exit {
                    renderer.print_info(FAREWELL);
                    break;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at the prompt only clears the line.
                continue;
            }
            Err(ReadlineError::Eof) => {
                renderer.print_info(FAREWELL);
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }
    Ok(())
}

/// Main entry point for askme.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (args, free) = AskArgs::from_command_line_relaxed("askme [OPTIONS] [PROMPT]");
    init_tracing(args.verbose);
    let mut renderer = PlainTextRenderer::with_color(!args.no_color);

    let file_config = FileConfig::load_default().unwrap_or_else(|err| {
        renderer.print_info(&format!("Warning: Could not read config file: {err}"));
        FileConfig::default()
    });
    let config = match AskConfig::resolve(args, file_config) {
        Ok(config) => config,
        Err(err) => {
            renderer.print_error(&err.to_string());
            std::process::exit(1);
        }
    };
    tracing::debug!(provider = %config.provider, model = %config.model, "resolved configuration");

    let current: CurrentCancel = Arc::new(Mutex::new(CancellationToken::new()));
    let handler_current = current.clone();
    ctrlc::set_handler(move || {
        if let Ok(token) = handler_current.lock() {
            token.cancel();
        }
    })?;

    let banner = Banner {
        provider: config.provider.to_string(),
        model: config.model.clone(),
        context_mode: config.context,
    };

    if config.chat {
        renderer.print_banner(&banner);
        if let Err(err) = chat(&config, &current, &mut renderer).await {
            renderer.print_error(&err.to_string());
            std::process::exit(1);
        }
        return Ok(());
    }

    let prompt = free.join(" ").trim().to_string();
    let prompt = if prompt.is_empty() {
        match read_prompt(&mut renderer) {
            Ok(prompt) => prompt,
            Err(err) => {
                renderer.print_error(&err.to_string());
                std::process::exit(1);
            }
        }
    } else {
        prompt
    };

    renderer.print_banner(&banner);
    if let Err(err) = ask_once(&config, prompt, &current, &mut renderer).await {
        report(&mut renderer, &err);
        std::process::exit(1);
    }
    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use gemini_chat::{ConversationSession, FileHistoryStore, HistoryStore, SpeechSink};
use gemini_core::{get_default_config_file, GeminiClient, GeminiConfig, APP_NAME};
use std::fs;
use std::sync::Arc;

mod app;
mod cli;
mod logging;
mod output;
mod speech;

use crate::app::ChatApp;
use crate::cli::Args;
use crate::logging::log_info;
use crate::output::print_usage_instructions;
use crate::speech::{CommandSpeechSink, SilentSpeechSink};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config file and environment first, then command-line flags on top
    let config = GeminiConfig::load(args.config.as_deref())
        .context("Failed to load configuration")?
        .merge(&args.overrides());

    logging::init(config.log_level.as_deref());

    let store = Arc::new(FileHistoryStore::new(config.history_path()?));
    if args.new_chat {
        store.clear().context("Failed to clear history")?;
        log_info("Started a new chat");
    }

    let speech: Box<dyn SpeechSink> = match config.tts_command.as_deref() {
        Some(program) => Box::new(CommandSpeechSink::new(program)),
        None => Box::new(SilentSpeechSink),
    };
    let session = ConversationSession::new(store.clone())
        .with_speech(speech, config.tts_enabled.unwrap_or(false));

    if let Some(path) = args.export {
        let bytes = session.export()?;
        fs::write(&path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Exported {} turns to {}", session.history().len(), path.display());
        return Ok(());
    }

    if !args.interactive && args.prompt.is_none() {
        print_usage_instructions();
        return Ok(());
    }

    // Missing key or unsupported model stops here, before anything is sent
    let client = GeminiClient::new(&config).context("Failed to initialize Gemini client")?;
    let config_path = match args.config.clone() {
        Some(path) => path,
        None => get_default_config_file(APP_NAME)?,
    };
    let mut app = ChatApp::new(session, client, config.tts_command.is_some(), config_path);

    if args.interactive {
        app::run_interactive_chat(&mut app).await?;
    } else if let Some(prompt) = args.prompt {
        app::run_single_query(prompt, &mut app).await?;
    }

    Ok(())
}

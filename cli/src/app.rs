use anyhow::{Context, Result};
use colored::*;
use dialoguer::Select;
use gemini_chat::attachment::display_name;
use gemini_chat::capability::Unavailable;
use gemini_chat::{
    history_page, render, AttachmentSource, ChatError, ConversationSession, DisplayItem,
    SubmitOutcome,
};
use gemini_core::{GeminiClient, GeminiConfig, ReplyClient, SupportedModel};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::logging::log_error;
use crate::output::{
    print_commands, print_history_page, print_item, print_items, print_notice, print_warning,
    thinking_spinner,
};

const DEFAULT_EXPORT_FILE: &str = "chat.json";

/// One line of interactive input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text: added to the draft, then the draft is sent
    Message(String),
    Send,
    Attach(PathBuf),
    Camera,
    Voice,
    /// Text inserted into the draft without sending
    Insert(String),
    /// 1-based attachment number
    Drop(usize),
    Cancel,
    Clear,
    NewChat,
    Export(PathBuf),
    Import(PathBuf),
    History,
    Model(Option<String>),
    Tts,
    Help,
    Exit,
    Invalid(String),
}

impl Command {
    /// `None` for blank input
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            return Some(Command::Exit);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Command::Message(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match (name, arg) {
            ("send", _) => Command::Send,
            ("attach", "") => Command::Invalid("usage: /attach <path>".to_string()),
            ("attach", path) => Command::Attach(PathBuf::from(path)),
            ("camera", _) => Command::Camera,
            ("voice", _) => Command::Voice,
            ("emoji", "") => Command::Invalid("usage: /emoji <text>".to_string()),
            ("emoji", text) => Command::Insert(text.to_string()),
            ("drop", n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Command::Drop(n),
                _ => Command::Invalid("usage: /drop <attachment number>".to_string()),
            },
            ("cancel", _) => Command::Cancel,
            ("clear", _) => Command::Clear,
            ("new", _) => Command::NewChat,
            ("export", "") => Command::Export(PathBuf::from(DEFAULT_EXPORT_FILE)),
            ("export", path) => Command::Export(PathBuf::from(path)),
            ("import", "") => Command::Invalid("usage: /import <path>".to_string()),
            ("import", path) => Command::Import(PathBuf::from(path)),
            ("history", _) => Command::History,
            ("model", "") => Command::Model(None),
            ("model", name) => Command::Model(Some(name.to_string())),
            ("tts", _) => Command::Tts,
            ("help", _) => Command::Help,
            ("exit", _) | ("quit", _) => Command::Exit,
            (other, _) => Command::Invalid(format!("unknown command /{} (try /help)", other)),
        };
        Some(command)
    }
}

/// Terminal host around a conversation session
pub struct ChatApp {
    session: ConversationSession,
    client: GeminiClient,
    camera: Unavailable,
    voice: Unavailable,
    has_speech_program: bool,
    /// Where `/model` records the chosen model
    config_path: PathBuf,
    notified: HashSet<String>,
}

impl ChatApp {
    pub fn new(
        session: ConversationSession,
        client: GeminiClient,
        has_speech_program: bool,
        config_path: PathBuf,
    ) -> Self {
        Self {
            session,
            client,
            camera: Unavailable("camera capture"),
            voice: Unavailable("voice input"),
            has_speech_program,
            config_path,
            notified: HashSet::new(),
        }
    }

    /// Sends the draft, showing the thinking indicator while waiting
    pub async fn submit(&mut self) -> SubmitOutcome {
        let Some(ticket) = self.session.begin_submit() else {
            debug!("Nothing to send");
            return SubmitOutcome::Rejected;
        };

        let thinking = matches!(
            render(&self.session.render_input()).last(),
            Some(DisplayItem::Thinking)
        );
        let spinner = thinking.then(thinking_spinner);

        let result = self.client.send(ticket.payload()).await;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        let outcome = self.session.complete(ticket, result);
        if let Some(item) = render(&self.session.render_input()).last() {
            print_item(item);
        }
        outcome
    }

    /// Runs one command; `false` means leave the chat
    pub async fn handle(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Message(text) => {
                self.session.append_text(&text);
                self.submit().await;
            }
            Command::Send => {
                if self.session.pending().is_empty() {
                    print_notice("Nothing to send.");
                } else {
                    self.submit().await;
                }
            }
            Command::Attach(path) => {
                match self.session.attach(AttachmentSource::File(&path)) {
                    Ok(()) => print_notice(&format!("Attached: {}", display_name(&path))),
                    Err(e) => self.report(e),
                }
            }
            Command::Camera => match self.session.attach(AttachmentSource::Frame(&self.camera)) {
                Ok(()) => print_notice("Camera image captured"),
                Err(e) => self.report(e),
            },
            Command::Voice => {
                if let Err(e) = self.session.dictate(&self.voice) {
                    self.report(e);
                }
            }
            Command::Insert(text) => {
                self.session.append_text(&text);
                print_notice(&format!("Draft: {}", self.session.pending().text()));
            }
            Command::Drop(n) => match self.session.cancel_attachment(n - 1) {
                Some(attachment) => print_notice(&format!("Removed {} attachment", attachment.mime_type)),
                None => print_warning(&format!("No attachment number {}", n)),
            },
            Command::Cancel => {
                self.session.cancel_pending();
                print_notice("Draft discarded.");
            }
            Command::Clear | Command::NewChat => {
                self.session.clear();
                print_notice("Started a new chat.");
            }
            Command::Export(path) => {
                let bytes = self.session.export()?;
                fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                print_notice(&format!("Exported {} turns to {}", self.session.history().len(), path.display()));
            }
            Command::Import(path) => {
                let bytes = fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                match self.session.import(&bytes) {
                    Ok(()) => {}
                    Err(ChatError::InvalidHistory(reason)) => {
                        print_warning(&format!("{} is not an exported chat: {}", path.display(), reason));
                        return Ok(true);
                    }
                    Err(e) => return Err(e).context("Failed to save imported chat"),
                }
                print_items(&render(&self.session.render_input()));
            }
            Command::History => print_history_page(&history_page(self.session.history())),
            Command::Model(name) => self.switch_model(name)?,
            Command::Tts => {
                let enabled = self.session.toggle_tts();
                if enabled && !self.has_speech_program {
                    print_warning("No tts_command configured; replies will not be spoken.");
                }
                print_notice(&format!("Text-to-speech {}", if enabled { "on" } else { "off" }));
            }
            Command::Help => print_commands(),
            Command::Exit => return Ok(false),
            Command::Invalid(message) => print_warning(&message),
        }
        Ok(true)
    }

    fn switch_model(&mut self, name: Option<String>) -> Result<()> {
        let model = match name {
            Some(name) => match name.parse::<SupportedModel>() {
                Ok(model) => model,
                Err(e) => {
                    print_warning(&e.to_string());
                    return Ok(());
                }
            },
            None => {
                let names: Vec<&str> = SupportedModel::ALL.iter().map(|m| m.as_str()).collect();
                let current = SupportedModel::ALL
                    .iter()
                    .position(|m| *m == self.client.model())
                    .unwrap_or(0);
                let selection = Select::new()
                    .with_prompt("Select a model")
                    .items(&names)
                    .default(current)
                    .interact()
                    .context("Model selection failed")?;
                SupportedModel::ALL[selection]
            }
        };

        self.client.set_model(model);
        info!(model = %model, "Model switched");
        match GeminiConfig::remember_model(&self.config_path, model) {
            Ok(()) => print_notice(&format!("Using {} (saved as default)", model)),
            Err(e) => {
                print_notice(&format!("Using {}", model));
                print_warning(&format!("Could not save model choice: {}", e));
            }
        }
        Ok(())
    }

    /// Recoverable capability and attachment failures; unsupported
    /// capabilities are mentioned only the first time
    fn report(&mut self, error: ChatError) {
        match &error {
            ChatError::UnsupportedCapability(name) => {
                if self.notified.insert(name.clone()) {
                    print_warning(&format!("{} is not supported in the terminal.", name));
                }
            }
            ChatError::InvalidAttachment(_) => print_warning(&error.to_string()),
            _ => log_error(&error.to_string()),
        }
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }
}

/// Runs a single query mode, sending one prompt and displaying the reply
pub async fn run_single_query(prompt: String, app: &mut ChatApp) -> Result<()> {
    info!("Running single query");
    app.handle(Command::Message(prompt)).await?;
    Ok(())
}

/// Runs an interactive chat session
pub async fn run_interactive_chat(app: &mut ChatApp) -> Result<()> {
    println!("Starting interactive chat session.");
    println!("Type /help for commands, 'exit' or 'quit' to end the session.");
    println!();

    print_items(&render(&app.session().render_input()));

    loop {
        print!("{}: ", "You".green().bold());
        io::stdout().flush().context("Failed to flush stdout")?;

        let mut input = String::new();
        let read = io::stdin()
            .read_line(&mut input)
            .context("Failed to read input")?;
        if read == 0 {
            println!();
            break;
        }

        let Some(command) = Command::parse(&input) else {
            continue;
        };

        match app.handle(command).await {
            Ok(true) => {}
            Ok(false) => {
                println!("Exiting chat session.");
                break;
            }
            Err(e) => log_error(&format!("{:#}", e)),
        }

        println!(); // Add spacing between interactions
    }

    Ok(())
}

use clap::Parser;
use gemini_core::config::GeminiConfig;
use std::path::PathBuf;

/// Terminal chat with Gemini, history kept between runs
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The prompt to send (single query mode)
    #[arg(index = 1)] // Positional argument
    pub prompt: Option<String>,

    /// Enter interactive chat mode
    #[arg(short, long, default_value_t = false)]
    pub interactive: bool,

    /// Gemini model to use (gemini-2.0-flash, gemini-1.5-flash, gemini-1.5-pro, gemini-2.5-flash)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Gemini API key
    #[arg(short = 'k', long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to keep the conversation history
    #[arg(long)]
    pub history_file: Option<PathBuf>,

    /// Start a new chat, discarding the stored history
    #[arg(long, default_value_t = false)]
    pub new_chat: bool,

    /// Write the stored history to this file and exit
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Speak replies aloud (requires tts_command in config)
    #[arg(long, default_value_t = false)]
    pub tts: bool,

    /// Enable verbose output
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Flag values as a config layer; unset flags leave the lower layers alone
    pub fn overrides(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.api_key.clone(),
            model_name: self.model.clone(),
            base_url: None,
            request_timeout_secs: None,
            history_file: self.history_file.clone(),
            tts_enabled: self.tts.then_some(true),
            tts_command: None,
            log_level: self.verbose.then(|| "debug".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_only_set_flags() {
        let args = Args::parse_from(["gemini-chat", "--model", "gemini-1.5-pro", "-v", "hi"]);
        let overrides = args.overrides();

        assert_eq!(args.prompt.as_deref(), Some("hi"));
        assert_eq!(overrides.model_name.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert_eq!(overrides.tts_enabled, None);
        assert_eq!(overrides.history_file, None);
    }

    #[test]
    fn test_overrides_merge_over_defaults() {
        let args = Args::parse_from(["gemini-chat", "--tts", "--history-file", "/tmp/h.json"]);
        let merged = GeminiConfig::default().merge(&args.overrides());

        assert_eq!(merged.tts_enabled, Some(true));
        assert_eq!(merged.history_file, Some(PathBuf::from("/tmp/h.json")));
        assert_eq!(merged.model_name.as_deref(), Some("gemini-2.5-flash"));
    }
}

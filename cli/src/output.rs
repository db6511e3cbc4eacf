use colored::*;
use gemini_chat::{DisplayItem, HistoryEntry};
use indicatif::{ProgressBar, ProgressStyle};
use pulldown_cmark::{CodeBlockKind, Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};
use std::time::Duration;
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

/// Print one display item to the terminal
pub fn print_item(item: &DisplayItem) {
    match item {
        DisplayItem::User(text) => println!("{}: {}", "You".green().bold(), text),
        DisplayItem::Model(text) => {
            println!("{}: {}", "Assistant".blue().bold(), render_markdown(text))
        }
        DisplayItem::Error(text) => println!("{}: {}", "Assistant".blue().bold(), text.red()),
        // Shown as a spinner while the request runs
        DisplayItem::Thinking => {}
    }
}

/// Replays a whole rendered conversation
pub fn print_items(items: &[DisplayItem]) {
    for item in items {
        print_item(item);
        println!();
    }
}

pub fn print_notice(message: &str) {
    println!("{}", message.dimmed());
}

pub fn print_warning(message: &str) {
    println!("{}", message.yellow());
}

/// Typing indicator for a pending reply
pub fn thinking_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message("Thinking...");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

pub fn print_history_page(entries: &[HistoryEntry]) {
    println!("{}", "History".cyan().bold());
    if entries.is_empty() {
        println!("  No chat history yet.");
        return;
    }
    for entry in entries {
        println!("  {:>3}. {}...", entry.index, entry.preview);
    }
}

/// Show usage instructions when no prompt or action is provided
pub fn print_usage_instructions() {
    println!("{}", "Usage:".yellow().bold());
    println!("  {}", "gemini-chat \"your prompt\"".green().bold());
    println!("    Send a single message, continuing the stored conversation");
    println!();
    println!("  {}", "gemini-chat -i".green().bold());
    println!("    Start an interactive chat session");
    println!();
    println!("{}", "Options:".cyan());
    println!("  --model <NAME>        Model from the supported list");
    println!("  --new-chat            Discard the stored history first");
    println!("  --export <PATH>       Write the history as JSON and exit");
    println!("  --help                Show all options");
    println!();
}

pub fn print_commands() {
    println!("{}", "Commands:".cyan());
    for (command, description) in [
        ("/attach <path>", "Attach a file to the next message"),
        ("/camera", "Attach a camera still"),
        ("/voice", "Dictate the next message"),
        ("/emoji <text>", "Insert text into the draft"),
        ("/send", "Send the draft (useful for attachment-only messages)"),
        ("/drop <n>", "Remove attachment number n from the draft"),
        ("/cancel", "Discard the draft"),
        ("/clear, /new", "Start over with an empty history"),
        ("/export [path]", "Save the history as JSON (default chat.json)"),
        ("/import <path>", "Replace the history with an exported file"),
        ("/history", "List your previous messages"),
        ("/model [name]", "Show or switch the model"),
        ("/tts", "Toggle speaking replies aloud"),
        ("/exit", "Leave the chat"),
    ] {
        println!("  {:<16} {}", command.green(), description);
    }
    println!();
}

/// Render markdown in the terminal with syntax highlighting
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let syntax_set = SyntaxSet::load_defaults_newlines();
    let theme_set = ThemeSet::load_defaults();
    let theme = theme_set
        .themes
        .get("base16-ocean.dark")
        .or_else(|| theme_set.themes.values().next());

    let mut output = String::new();
    let mut code_lang: Option<String> = None;
    let mut code = String::new();

    for event in MdParser::new_ext(markdown, options) {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => {
                let marker = match level {
                    HeadingLevel::H1 => "#",
                    HeadingLevel::H2 => "##",
                    _ => "###",
                };
                output.push_str(&format!("\n{} ", marker.bright_cyan().bold()));
            }
            MdEvent::End(Tag::Heading(..)) | MdEvent::End(Tag::Item) => output.push('\n'),
            MdEvent::Start(Tag::Paragraph) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push_str("\n\n");
                }
            }
            MdEvent::End(Tag::Paragraph) => output.push('\n'),
            MdEvent::Start(Tag::List(_)) | MdEvent::End(Tag::List(_)) => output.push('\n'),
            MdEvent::Start(Tag::Item) => output.push_str(&format!("{}  ", "•".yellow())),
            MdEvent::Start(Tag::CodeBlock(kind)) => {
                code_lang = Some(match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                });
                code.clear();
                output.push('\n');
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                let lang = code_lang.take().unwrap_or_default();
                output.push_str(&highlight_block(&code, &lang, &syntax_set, theme));
            }
            MdEvent::Text(text) => {
                if code_lang.is_some() {
                    code.push_str(&text);
                } else {
                    output.push_str(&text);
                }
            }
            MdEvent::Code(inline) => {
                output.push_str(&format!("`{}`", inline.on_bright_black().white()))
            }
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            _ => {}
        }
    }

    output.trim_end().to_string()
}

fn highlight_block(
    code: &str,
    lang: &str,
    syntax_set: &SyntaxSet,
    theme: Option<&syntect::highlighting::Theme>,
) -> String {
    let rule = "─".repeat(40).dimmed().to_string();
    let mut block = format!("{}:\n{}\n", lang.cyan(), rule);

    match theme {
        Some(theme) => {
            let syntax = syntax_set
                .find_syntax_by_token(lang)
                .unwrap_or_else(|| syntax_set.find_syntax_plain_text());
            let mut highlighter = HighlightLines::new(syntax, theme);
            for line in LinesWithEndings::from(code) {
                let ranges = highlighter
                    .highlight_line(line, syntax_set)
                    .unwrap_or_default();
                block.push_str(&as_24_bit_terminal_escaped(&ranges, false));
            }
            block.push_str("\x1b[0m");
        }
        None => block.push_str(code),
    }

    block.push_str(&rule);
    block.push_str("\n\n");
    block
}

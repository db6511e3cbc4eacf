//! Pure projection of session state into things a host can display.
//!
//! Nothing here holds state; recomputing after every change is the intended use.

use gemini_core::{Part, Role, Turn};

use crate::history::History;
use crate::session::SessionState;

/// Number of characters shown for a history page preview
pub const PREVIEW_CHARS: usize = 50;

/// Everything rendering depends on
#[derive(Debug, Clone, Copy)]
pub struct RenderInput<'a> {
    pub history: &'a History,
    pub state: SessionState,
    pub error: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayItem {
    User(String),
    Model(String),
    /// Reply pending
    Thinking,
    /// Failed reply, shown in place of the answer
    Error(String),
}

/// One turn per item, in history order, plus the transient indicator
pub fn render(input: &RenderInput<'_>) -> Vec<DisplayItem> {
    let mut items: Vec<DisplayItem> = input
        .history
        .turns()
        .iter()
        .map(|turn| match turn.role {
            Role::User => DisplayItem::User(turn_text(turn)),
            Role::Model => DisplayItem::Model(turn_text(turn)),
        })
        .collect();

    match input.state {
        SessionState::Sending => items.push(DisplayItem::Thinking),
        SessionState::Error => {
            let message = input.error.unwrap_or("Unknown error");
            items.push(DisplayItem::Error(format!("Error: {}", message)));
        }
        SessionState::Idle => {}
    }

    items
}

/// Display text of a turn: text parts, then a line per attachment
pub fn turn_text(turn: &Turn) -> String {
    turn.parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => text.clone(),
            Part::InlineData(attachment) => format!(
                "[attachment: {}, {} bytes]",
                attachment.mime_type,
                attachment.decoded_len()
            ),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Row of the history page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Position of the turn in history
    pub index: usize,
    pub preview: String,
}

/// Lists user turns with a short preview of their first text part
pub fn history_page(history: &History) -> Vec<HistoryEntry> {
    history
        .turns()
        .iter()
        .enumerate()
        .filter(|(_, turn)| turn.role == Role::User)
        .map(|(index, turn)| {
            let preview = match turn.parts.first().and_then(Part::as_text) {
                Some(text) if !text.is_empty() => text.chars().take(PREVIEW_CHARS).collect(),
                _ => "Message".to_string(),
            };
            HistoryEntry { index, preview }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gemini_core::Attachment;

    fn history() -> History {
        History::from_turns(vec![
            Turn {
                role: Role::User,
                parts: vec![
                    Part::text("what is this?"),
                    Part::InlineData(Attachment::from_bytes(&[7; 10], "image/png")),
                ],
            },
            Turn::model_text("A gray square."),
        ])
        .unwrap()
    }

    #[test]
    fn test_render_idle() {
        let history = history();
        let items = render(&RenderInput {
            history: &history,
            state: SessionState::Idle,
            error: None,
        });

        assert_eq!(
            items,
            vec![
                DisplayItem::User("what is this?\n[attachment: image/png, 10 bytes]".to_string()),
                DisplayItem::Model("A gray square.".to_string()),
            ]
        );
    }

    #[test]
    fn test_render_sending_adds_thinking() {
        let history = history();
        let input = RenderInput {
            history: &history,
            state: SessionState::Sending,
            error: None,
        };

        let items = render(&input);
        assert_eq!(items.len(), 3);
        assert_eq!(items.last(), Some(&DisplayItem::Thinking));

        // Idempotent
        assert_eq!(render(&input), items);
    }

    #[test]
    fn test_render_error_indicator() {
        let history = History::from_turns(vec![Turn::user_text("hello")]).unwrap();
        let items = render(&RenderInput {
            history: &history,
            state: SessionState::Error,
            error: Some("quota exceeded"),
        });

        assert_eq!(
            items,
            vec![
                DisplayItem::User("hello".to_string()),
                DisplayItem::Error("Error: quota exceeded".to_string()),
            ]
        );
    }

    #[test]
    fn test_history_page_previews_user_turns() {
        let long = "x".repeat(80);
        let history = History::from_turns(vec![
            Turn::user_text(long),
            Turn::model_text("ok"),
            Turn {
                role: Role::User,
                parts: vec![Part::InlineData(Attachment::from_bytes(b"a", "image/png"))],
            },
        ])
        .unwrap();

        let page = history_page(&history);
        assert_eq!(
            page,
            vec![
                HistoryEntry {
                    index: 0,
                    preview: "x".repeat(PREVIEW_CHARS),
                },
                HistoryEntry {
                    index: 2,
                    preview: "Message".to_string(),
                },
            ]
        );
        assert!(history_page(&History::new()).is_empty());
    }
}

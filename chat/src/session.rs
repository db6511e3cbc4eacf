use gemini_core::{Attachment, Part, ReplyClient, ReplyError, ReplyResult, Role, Turn};
use tracing::{debug, error, info, warn};

use crate::attachment::{collect, AttachmentSource};
use crate::capability::{SpeechSink, Transcriber};
use crate::errors::ChatResult;
use crate::history::{History, HistoryStore, HistoryStoreRef};
use crate::presentation::RenderInput;

/// Whether the session is waiting on a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Sending,
    /// Last reply failed. Accepts submissions exactly like `Idle`.
    Error,
}

/// The draft turn being composed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingTurn {
    text: String,
    attachments: Vec<Attachment>,
}

impl PendingTurn {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// True when there is nothing worth sending
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachments.is_empty()
    }

    fn clear(&mut self) {
        self.text.clear();
        self.attachments.clear();
    }

    /// Text first (trimmed, if any), then attachments in insertion order
    fn to_turn(&self) -> Option<Turn> {
        let mut parts = Vec::with_capacity(self.attachments.len() + 1);
        let text = self.text.trim();
        if !text.is_empty() {
            parts.push(Part::text(text));
        }
        parts.extend(self.attachments.iter().cloned().map(Part::InlineData));
        Turn::new(Role::User, parts)
    }
}

/// Proof that a submission is in flight; hand it back to `complete`
#[derive(Debug)]
pub struct SubmitTicket {
    id: u64,
    payload: Vec<Turn>,
}

impl SubmitTicket {
    /// Full history including the just-appended user turn
    pub fn payload(&self) -> &[Turn] {
        &self.payload
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to send, or a reply is already pending
    Rejected,
    Replied(String),
    Failed(ReplyError),
}

/// One long-lived conversation: pending draft, history and submission state
pub struct ConversationSession {
    store: HistoryStoreRef,
    history: History,
    pending: PendingTurn,
    state: SessionState,
    last_error: Option<String>,
    in_flight: Option<u64>,
    next_ticket: u64,
    speech: Option<Box<dyn SpeechSink>>,
    tts_enabled: bool,
}

impl ConversationSession {
    /// Starts a session from whatever the store has persisted
    pub fn new(store: HistoryStoreRef) -> Self {
        let history = store.load();
        info!(turns = history.len(), "Conversation session started");
        Self {
            store,
            history,
            pending: PendingTurn::default(),
            state: SessionState::Idle,
            last_error: None,
            in_flight: None,
            next_ticket: 0,
            speech: None,
            tts_enabled: false,
        }
    }

    pub fn with_speech(mut self, sink: Box<dyn SpeechSink>, enabled: bool) -> Self {
        self.speech = Some(sink);
        self.tts_enabled = enabled;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn pending(&self) -> &PendingTurn {
        &self.pending
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn tts_enabled(&self) -> bool {
        self.tts_enabled
    }

    /// Flips text-to-speech and returns the new setting
    pub fn toggle_tts(&mut self) -> bool {
        self.tts_enabled = !self.tts_enabled;
        self.tts_enabled
    }

    /// Snapshot for the presentation layer
    pub fn render_input(&self) -> RenderInput<'_> {
        RenderInput {
            history: &self.history,
            state: self.state,
            error: self.last_error.as_deref(),
        }
    }

    // --- Composing --- //

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.pending.text = text.into();
    }

    /// Inserts text at the end of the draft (emoji, snippets)
    pub fn append_text(&mut self, text: &str) {
        self.pending.text.push_str(text);
    }

    pub fn add_attachment(&mut self, attachment: Attachment) {
        debug!(mime_type = %attachment.mime_type, "Attachment queued");
        self.pending.attachments.push(attachment);
    }

    /// Collects and queues an attachment in one step
    pub fn attach(&mut self, source: AttachmentSource<'_>) -> ChatResult<()> {
        let attachment = collect(source)?;
        self.add_attachment(attachment);
        Ok(())
    }

    /// Replaces the draft text with one voice transcript
    pub fn dictate(&mut self, transcriber: &dyn Transcriber) -> ChatResult<()> {
        let transcript = transcriber.listen_once()?;
        self.set_text(transcript);
        Ok(())
    }

    pub fn cancel_attachment(&mut self, index: usize) -> Option<Attachment> {
        if index < self.pending.attachments.len() {
            Some(self.pending.attachments.remove(index))
        } else {
            None
        }
    }

    /// Discards the whole draft
    pub fn cancel_pending(&mut self) {
        self.pending.clear();
    }

    // --- Submission lifecycle --- //

    /// Moves the draft into history and enters `Sending`.
    ///
    /// Returns `None` without touching anything when the draft is empty or a
    /// reply is already pending.
    pub fn begin_submit(&mut self) -> Option<SubmitTicket> {
        if self.state == SessionState::Sending {
            debug!("Submit ignored, reply already pending");
            return None;
        }
        let turn = self.pending.to_turn()?;

        self.history.push(turn);
        self.persist();
        self.pending.clear();
        self.last_error = None;
        self.state = SessionState::Sending;

        let id = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(id);
        debug!(ticket = id, turns = self.history.len(), "Submission started");

        Some(SubmitTicket {
            id,
            payload: self.history.turns().to_vec(),
        })
    }

    /// Applies the reply for an in-flight submission
    pub fn complete(&mut self, ticket: SubmitTicket, result: ReplyResult<Turn>) -> SubmitOutcome {
        if self.in_flight != Some(ticket.id) {
            warn!(ticket = ticket.id, "Dropping reply for a submission that is no longer pending");
            return SubmitOutcome::Rejected;
        }
        self.in_flight = None;

        let result = result.and_then(|turn| {
            let texts: Vec<&str> = turn.texts().collect();
            if texts.is_empty() {
                Err(ReplyError::MalformedResponse("reply has no text".to_string()))
            } else {
                Ok(texts.concat())
            }
        });

        match result {
            Ok(text) => {
                self.history.push(Turn::model_text(text.clone()));
                self.persist();
                self.state = SessionState::Idle;
                if self.tts_enabled {
                    if let Some(speech) = &self.speech {
                        speech.speak(&text);
                    }
                }
                SubmitOutcome::Replied(text)
            }
            Err(e) => {
                warn!(error = %e, "Reply failed");
                self.last_error = Some(e.to_string());
                self.state = SessionState::Error;
                SubmitOutcome::Failed(e)
            }
        }
    }

    /// Submits the draft and waits for the reply
    pub async fn submit(&mut self, client: &dyn ReplyClient) -> SubmitOutcome {
        let Some(ticket) = self.begin_submit() else {
            return SubmitOutcome::Rejected;
        };
        let result = client.send(ticket.payload()).await;
        self.complete(ticket, result)
    }

    // --- Bulk history operations --- //

    /// Empties history, draft and persisted state. A pending reply is dropped.
    pub fn clear(&mut self) {
        self.history = History::new();
        self.pending.clear();
        self.reset_submission();
        if let Err(e) = self.store.clear() {
            error!(error = %e, "Failed to clear persisted history");
        }
        info!("History cleared");
    }

    /// Starts over; same effect as `clear`
    pub fn new_chat(&mut self) {
        self.clear();
    }

    pub fn export(&self) -> ChatResult<Vec<u8>> {
        self.store.export(&self.history)
    }

    /// Replaces history with a previously exported one.
    ///
    /// Nothing changes unless the new history is both valid and persisted.
    pub fn import(&mut self, bytes: &[u8]) -> ChatResult<()> {
        let history = self.store.import(bytes)?;
        self.store.save(&history)?;
        self.history = history;
        self.reset_submission();
        info!(turns = self.history.len(), "History imported");
        Ok(())
    }

    fn reset_submission(&mut self) {
        self.in_flight = None;
        self.last_error = None;
        self.state = SessionState::Idle;
    }

    fn persist(&self) {
        if let Err(e) = self.store.save(&self.history) {
            error!(error = %e, "Failed to persist history");
        }
    }
}

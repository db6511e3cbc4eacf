//! Chat session for the Gemini generateContent endpoint
//!
//! The session owns the draft turn being composed, the persisted history and
//! the submission lifecycle. Rendering, capture hardware and the remote model
//! are collaborators behind traits so any host (terminal, GUI, tests) can
//! drive it through plain method calls.

pub mod attachment;
pub mod capability;
pub mod errors;
pub mod history;
pub mod presentation;
pub mod session;

pub use attachment::{collect, AttachmentSource};
pub use capability::{FrameSource, SpeechSink, Transcriber};
pub use errors::{ChatError, ChatResult};
pub use history::{FileHistoryStore, History, HistoryStore, HistoryStoreRef, InMemoryHistoryStore};
pub use presentation::{history_page, render, DisplayItem, HistoryEntry, RenderInput};
pub use session::{ConversationSession, PendingTurn, SessionState, SubmitOutcome, SubmitTicket};

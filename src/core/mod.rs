pub mod credit_gate;
pub mod deck;
pub mod interpretation;
pub mod render;
pub mod session;
pub mod submission;

pub use credit_gate::{CreditTiers, LedgerCreditGate};
pub use deck::DeckState;
pub use interpretation::{interpret, Interpretation, PositionReading};
pub use render::{renderer_for, CardRenderer, ContentRenderer, RenderFormat};
pub use session::{
    DrawOutcome, Identity, IgnoredDraw, ReadingSession, SessionOptions, SessionSnapshot,
};
pub use submission::SubmissionService;

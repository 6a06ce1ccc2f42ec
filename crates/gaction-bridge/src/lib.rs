//! Recast to Google Assistant translation engine.
//!
//! Turns the ordered directive list returned by a Recast bot into Actions
//! SDK responses: text merging, per-kind mapping under device capability,
//! the deferred surface-switch replay, and SSML generation.

pub mod actions;
pub mod backend;
pub mod connector;
pub mod directive;
pub mod element;
pub mod error;
pub mod mapper;
pub mod merger;
pub mod session;
pub mod speech;
pub mod state;

pub use actions::{AppRequest, AppResponse};
pub use backend::{DialogBackend, DialogReply, DialogRequest, RecastClient};
pub use connector::{BotConnector, TurnOutcome};
pub use directive::{Button, Card, Directive, ListContent, QuickReplies};
pub use element::ResponseElement;
pub use error::{BackendError, TurnError};
pub use mapper::{DirectiveMapper, MappedTurn, SurfaceView};
pub use merger::DirectiveMerger;
pub use session::ConversationSession;
pub use state::BridgeState;

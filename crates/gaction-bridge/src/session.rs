//! Per-turn view of an Actions SDK conversation.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::element::SCREEN_OUTPUT;
use crate::state::BridgeState;

/// Built-in Actions SDK intents the bridge routes on.
pub mod intents {
    pub const MAIN: &str = "actions.intent.MAIN";
    pub const TEXT: &str = "actions.intent.TEXT";
    pub const OPTION: &str = "actions.intent.OPTION";
    pub const CANCEL: &str = "actions.intent.CANCEL";
    pub const NEW_SURFACE: &str = "actions.intent.NEW_SURFACE";
}

/// Status reported by the platform when the user accepted a new surface.
pub const NEW_SURFACE_OK: &str = "OK";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationSession {
    pub conversation_id: String,
    /// Raw user query.
    pub raw_input: String,
    /// Full locale, e.g. `fr-FR`.
    pub locale: String,
    pub intent: String,
    pub has_screen: bool,
    /// Capabilities of every other surface the user owns.
    pub available_capabilities: HashSet<String>,
    pub media_status: Option<Value>,
    pub health_check: bool,
    /// Status of a `NEW_SURFACE` answer, when this turn is one.
    pub new_surface_status: Option<String>,
    /// Opaque memory owned by the backend.
    pub memory: Map<String, Value>,
    pub state: BridgeState,
}

impl ConversationSession {
    pub fn new(
        conversation_id: impl Into<String>,
        raw_input: impl Into<String>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            raw_input: raw_input.into(),
            locale: locale.into(),
            intent: intents::TEXT.to_string(),
            ..Self::default()
        }
    }

    /// Language part of the locale, as expected by the backend.
    pub fn language(&self) -> &str {
        self.locale.split('-').next().unwrap_or_default()
    }

    pub fn can_switch_to_screen(&self) -> bool {
        self.available_capabilities.contains(SCREEN_OUTPUT)
    }

    pub fn new_surface_accepted(&self) -> bool {
        self.new_surface_status.as_deref() == Some(NEW_SURFACE_OK)
    }
}

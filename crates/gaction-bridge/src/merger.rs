//! Collapse consecutive text directives into one spoken message.

use gaction_core::BotConnection;

use crate::directive::Directive;
use crate::speech;

/// Merges adjacent `text` directives. Other kinds are never merged.
#[derive(Debug, Clone)]
pub struct DirectiveMerger {
    separator: String,
}

impl DirectiveMerger {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Separator configured for a bot: a pause and a newline when
    /// `pause_between_messages` is on, otherwise a single space.
    pub fn for_connection(connection: &BotConnection) -> Self {
        if connection.pause_between_messages {
            Self::new(format!("{}\n", speech::pause(connection.voice.message_pause_ms)))
        } else {
            Self::new(" ")
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Single right-to-left pass; indices below the removal point stay valid.
    pub fn merge(&self, mut directives: Vec<Directive>) -> Vec<Directive> {
        for i in (1..directives.len()).rev() {
            if !(directives[i].is_text() && directives[i - 1].is_text()) {
                continue;
            }
            if let Directive::Text(tail) = directives.remove(i) {
                if let Directive::Text(head) = &mut directives[i - 1] {
                    head.push_str(&self.separator);
                    head.push_str(&tail);
                }
            }
        }
        directives
    }
}

//! Bot connector: drives one conversational turn.
//!
//! A turn moves through `Idle -> AwaitingBackend -> Responding` and ends
//! either closed or waiting for the next user input:
//!
//! - health checks from the platform crawler are answered directly;
//! - an accepted `NEW_SURFACE` replays the directives stored when the
//!   surface switch was requested, without calling the backend;
//! - everything else is forwarded to the dialog backend, and a failed or
//!   empty reply falls back to the bot's default error message for the
//!   session locale, or a bare close.

use std::sync::Arc;

use gaction_core::BotConnection;

use crate::actions::{AppRequest, AppResponse};
use crate::backend::{DialogBackend, DialogInput, DialogRequest};
use crate::directive::Directive;
use crate::element::ResponseElement;
use crate::error::TurnError;
use crate::mapper::{DirectiveMapper, MappedTurn, SurfaceView};
use crate::merger::DirectiveMerger;
use crate::session::{intents, ConversationSession};
use crate::speech;

const HEALTH_CHECK_GREETING: &str = "Hi, Google Crawler";

/// Elements to deliver for a turn, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutcome {
    pub elements: Vec<ResponseElement>,
    /// The last element closes the conversation.
    pub close: bool,
}

impl TurnOutcome {
    pub fn ask(elements: Vec<ResponseElement>) -> Self {
        Self {
            elements,
            close: false,
        }
    }

    pub fn bare_close() -> Self {
        Self {
            elements: vec![],
            close: true,
        }
    }
}

/// One configured bot. Immutable and shared across concurrent turns.
pub struct BotConnector {
    connection: BotConnection,
    backend: Arc<dyn DialogBackend>,
    merger: DirectiveMerger,
}

impl BotConnector {
    pub fn new(connection: BotConnection, backend: Arc<dyn DialogBackend>) -> Self {
        let merger = DirectiveMerger::for_connection(&connection);
        Self {
            connection,
            backend,
            merger,
        }
    }

    pub fn connection(&self) -> &BotConnection {
        &self.connection
    }

    pub fn bot_token(&self) -> &str {
        &self.connection.recast_bot_token
    }

    /// Decode a webhook request, run the turn, and encode the reply.
    pub async fn handle_request(&self, request: AppRequest) -> AppResponse {
        let mut session = request.into_session();
        let outcome = self.handle_turn(&mut session).await;
        AppResponse::from_outcome(&outcome, &session)
    }

    /// Route a turn on its intent and produce the elements to deliver.
    pub async fn handle_turn(&self, session: &mut ConversationSession) -> TurnOutcome {
        if session.intent == intents::MAIN && session.health_check {
            if self.connection.debug {
                tracing::debug!("Google crawler detected");
            }
            return TurnOutcome::ask(vec![ResponseElement::SpokenText(
                HEALTH_CHECK_GREETING.to_string(),
            )]);
        }

        let (intent, has_screen, media_status) = (
            session.intent.clone(),
            session.has_screen,
            session.media_status.clone(),
        );
        session.state.observe(&intent, has_screen, media_status);

        if session.intent == intents::NEW_SURFACE {
            if let Some(outcome) = self.replay_surface_switch(session) {
                return outcome;
            }
        }

        self.converse(session).await
    }

    /// Deliver the directives stored by an earlier surface switch.
    ///
    /// Returns `None` when the switch was refused, nothing was stored, or the
    /// stored directives produce no output; the caller then runs a normal turn.
    fn replay_surface_switch(&self, session: &mut ConversationSession) -> Option<TurnOutcome> {
        if !session.new_surface_accepted() {
            tracing::info!(
                status = ?session.new_surface_status,
                "New surface not accepted, continuing with the backend"
            );
            return None;
        }
        let pending = session.state.take_pending_surface_switch()?;

        // Switch once, then flush: the replay never requests another switch.
        let surface = SurfaceView::of(session).without_switch();
        let turn = self.translate(pending, surface);
        if turn.elements.is_empty() {
            tracing::warn!("Stored surface-switch directives produced no output");
            return None;
        }
        tracing::info!(
            elements = turn.elements.len(),
            "Replayed directives on the new surface"
        );
        Some(TurnOutcome::ask(turn.elements))
    }

    async fn converse(&self, session: &mut ConversationSession) -> TurnOutcome {
        match self.backend_turn(session).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    client_id = %self.connection.gaction_client_id,
                    conversation_id = %session.conversation_id,
                    "Recast went wrong"
                );
                self.fallback(&session.locale)
            }
        }
    }

    async fn backend_turn(
        &self,
        session: &mut ConversationSession,
    ) -> Result<TurnOutcome, TurnError> {
        if self.connection.debug {
            tracing::debug!(
                input = %session.raw_input,
                client_id = %self.connection.gaction_client_id,
                conversation_id = %session.conversation_id,
                "Handling Google conversation"
            );
        }

        let request = DialogRequest {
            input: DialogInput::text(session.raw_input.clone()),
            conversation_id: session.conversation_id.clone(),
            memory: session.state.outgoing_memory(&session.memory),
            language: session.language().to_string(),
        };
        let reply = self.backend.dialog(self.bot_token(), &request).await?;
        if self.connection.debug {
            tracing::debug!(reply = ?reply, "Received Recast dialog");
        }

        let (messages, memory) = reply.into_parts();
        session.memory = session.state.absorb_backend_memory(memory);
        let close = session.state.close_conversation;

        let turn = self.translate(messages, SurfaceView::of(session));
        if let Some(deferred) = turn.deferred {
            tracing::info!(
                directives = deferred.len(),
                "Directives deferred until a screen is available"
            );
            session.state.pending_surface_switch = Some(deferred);
        }
        if turn.elements.is_empty() {
            return Err(TurnError::EmptyResponse);
        }

        if self.connection.debug {
            tracing::debug!(elements = ?turn.elements, memory = ?session.memory, "Converted Google response");
        }
        Ok(TurnOutcome {
            elements: turn.elements,
            close,
        })
    }

    fn translate(&self, directives: Vec<Directive>, surface: SurfaceView) -> MappedTurn {
        let merged = self.merger.merge(directives);
        DirectiveMapper::new(&self.connection.voice, self.connection.auto_change_surface)
            .map(&merged, surface)
    }

    fn fallback(&self, locale: &str) -> TurnOutcome {
        match self.connection.default_error_message(locale) {
            Some(message) => TurnOutcome::ask(vec![ResponseElement::SpokenText(speech::to_ssml(
                message,
                &self.connection.voice,
            ))]),
            None => TurnOutcome::bare_close(),
        }
    }
}

//! Actions SDK (conversation webhook v2) wire format.
//!
//! Decodes an incoming [`AppRequest`] into a [`ConversationSession`] and
//! encodes a [`TurnOutcome`] into an [`AppResponse`]. User storage is a JSON
//! string holding the backend memory under `data` and the bridge state under
//! `bridge`, so whatever is written on one turn comes back verbatim on the
//! next.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::connector::TurnOutcome;
use crate::element::{CarouselEntry, Image, ListItem, ResponseElement, RichCard, SurfaceSwitch};
use crate::session::{intents, ConversationSession};
use crate::state::BridgeState;

const ARG_HEALTH_CHECK: &str = "is_health_check";
const ARG_MEDIA_STATUS: &str = "MEDIA_STATUS";
const ARG_NEW_SURFACE: &str = "NEW_SURFACE";

const OPTION_VALUE_SPEC: &str = "type.googleapis.com/google.actions.v2.OptionValueSpec";
const NEW_SURFACE_VALUE_SPEC: &str = "type.googleapis.com/google.actions.v2.NewSurfaceValueSpec";

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppRequest {
    pub user: User,
    pub conversation: Conversation,
    pub inputs: Vec<Input>,
    pub surface: Surface,
    pub available_surfaces: Vec<Surface>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    pub user_id: Option<String>,
    pub locale: String,
    pub user_storage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Conversation {
    pub conversation_id: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Input {
    pub intent: String,
    pub raw_inputs: Vec<RawInput>,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInput {
    pub input_type: Option<String>,
    pub query: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Argument {
    pub name: String,
    pub raw_text: Option<String>,
    pub text_value: Option<String>,
    pub bool_value: Option<bool>,
    pub extension: Option<Value>,
}

impl Argument {
    /// Structured value of the argument: the extension when present,
    /// otherwise the text value.
    fn value(&self) -> Option<Value> {
        self.extension
            .clone()
            .or_else(|| self.text_value.clone().map(Value::String))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Surface {
    pub capabilities: Vec<Capability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Capability {
    pub name: String,
}

impl Surface {
    fn has(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == capability)
    }
}

/// Layout of the `userStorage` string.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct StoredUserState {
    data: Map<String, Value>,
    bridge: BridgeState,
}

fn decode_user_storage(raw: Option<&str>) -> StoredUserState {
    match raw.filter(|s| !s.trim().is_empty()) {
        None => StoredUserState::default(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Unreadable user storage, starting from empty memory");
            StoredUserState::default()
        }),
    }
}

impl AppRequest {
    pub fn intent(&self) -> &str {
        self.inputs
            .first()
            .map(|input| input.intent.as_str())
            .unwrap_or(intents::TEXT)
    }

    fn argument(&self, name: &str) -> Option<&Argument> {
        self.inputs
            .first()
            .and_then(|input| input.arguments.iter().find(|a| a.name == name))
    }

    pub fn into_session(self) -> ConversationSession {
        let intent = self.intent().to_string();
        let raw_input = self
            .inputs
            .first()
            .and_then(|input| input.raw_inputs.first())
            .map(|raw| raw.query.clone())
            .unwrap_or_default();
        let health_check = self
            .argument(ARG_HEALTH_CHECK)
            .is_some_and(|a| a.bool_value == Some(true));
        let media_status = self.argument(ARG_MEDIA_STATUS).and_then(Argument::value);
        let new_surface_status = self
            .argument(ARG_NEW_SURFACE)
            .and_then(|a| a.extension.as_ref())
            .and_then(|ext| ext.get("status"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let has_screen = self.surface.has(crate::element::SCREEN_OUTPUT);
        let available_capabilities = self
            .available_surfaces
            .iter()
            .flat_map(|s| s.capabilities.iter().map(|c| c.name.clone()))
            .collect();
        let stored = decode_user_storage(self.user.user_storage.as_deref());

        ConversationSession {
            conversation_id: self.conversation.conversation_id,
            raw_input,
            locale: self.user.locale,
            intent,
            has_screen,
            available_capabilities,
            media_status,
            health_check,
            new_surface_status,
            memory: stored.data,
            state: stored.bridge,
        }
    }
}

// =============================================================================
// Response
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppResponse {
    pub expect_user_response: bool,
    pub user_storage: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expected_inputs: Vec<ExpectedInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_response: Option<FinalResponse>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedInput {
    pub input_prompt: InputPrompt,
    pub possible_intents: Vec<ExpectedIntent>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPrompt {
    pub rich_initial_prompt: RichResponse,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpectedIntent {
    pub intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_value_data: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResponse {
    pub rich_response: RichResponse,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RichResponse {
    pub items: Vec<RichItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RichItem {
    SimpleResponse(SimpleResponse),
    BasicCard(BasicCard),
    CarouselBrowse(CarouselBrowse),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse {
    pub text_to_speech: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub title: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireImage {
    pub url: String,
    pub accessibility_text: String,
}

impl From<&Image> for WireImage {
    fn from(image: &Image) -> Self {
        Self {
            url: image.url.clone(),
            accessibility_text: image.alt.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenUrlAction {
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WireButton {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_url_action: Option<OpenUrlAction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BasicCard {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<WireImage>,
    pub buttons: Vec<WireButton>,
}

impl From<&RichCard> for BasicCard {
    fn from(card: &RichCard) -> Self {
        Self {
            title: card.title.clone(),
            subtitle: card.subtitle.clone(),
            image: card.image.as_ref().map(WireImage::from),
            buttons: card
                .button
                .iter()
                .map(|b| WireButton {
                    title: b.title.clone(),
                    open_url_action: b.url.clone().map(|url| OpenUrlAction { url }),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CarouselBrowse {
    pub items: Vec<CarouselBrowseItem>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarouselBrowseItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub image: WireImage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_url_action: Option<OpenUrlAction>,
}

impl From<&CarouselEntry> for CarouselBrowseItem {
    fn from(entry: &CarouselEntry) -> Self {
        Self {
            title: entry.title.clone(),
            description: entry.description.clone(),
            image: WireImage::from(&entry.image),
            open_url_action: entry.url.clone().map(|url| OpenUrlAction { url }),
        }
    }
}

fn list_select(items: &[ListItem]) -> Value {
    let items: Vec<Value> = items
        .iter()
        .map(|item| {
            let mut wire = json!({
                "optionInfo": {"key": item.key, "synonyms": []},
                "title": item.title,
            });
            if let Some(description) = &item.description {
                wire["description"] = json!(description);
            }
            if let Some(image) = &item.image {
                wire["image"] = json!(WireImage::from(image));
            }
            wire
        })
        .collect();
    json!({
        "@type": OPTION_VALUE_SPEC,
        "listSelect": {"items": items},
    })
}

/// A response carries at most one helper intent; the first one wins.
fn offer_helper(helper: &mut Option<ExpectedIntent>, candidate: ExpectedIntent) {
    if let Some(kept) = helper.as_ref() {
        tracing::warn!(
            kept = %kept.intent,
            dropped = %candidate.intent,
            "Only one helper intent per response, later one not delivered"
        );
    } else {
        *helper = Some(candidate);
    }
}

fn new_surface_spec(switch: &SurfaceSwitch) -> Value {
    json!({
        "@type": NEW_SURFACE_VALUE_SPEC,
        "context": switch.context,
        "notificationTitle": switch.notification,
        "capabilities": switch.capabilities,
    })
}

impl AppResponse {
    /// Encode the outcome of a turn along with the session's updated storage.
    pub fn from_outcome(outcome: &TurnOutcome, session: &ConversationSession) -> Self {
        let mut rich = RichResponse::default();
        let mut helper: Option<ExpectedIntent> = None;

        for element in &outcome.elements {
            match element {
                ResponseElement::SpokenText(speech) => {
                    rich.items.push(RichItem::SimpleResponse(SimpleResponse {
                        text_to_speech: speech.clone(),
                    }))
                }
                ResponseElement::QuickReplySet(chips) => rich
                    .suggestions
                    .extend(chips.iter().map(|title| Suggestion {
                        title: title.clone(),
                    })),
                ResponseElement::RichCard(card) => {
                    rich.items.push(RichItem::BasicCard(BasicCard::from(card)))
                }
                ResponseElement::ItemCarousel(entries) => {
                    rich.items.push(RichItem::CarouselBrowse(CarouselBrowse {
                        items: entries.iter().map(CarouselBrowseItem::from).collect(),
                    }))
                }
                ResponseElement::ItemList(items) => offer_helper(
                    &mut helper,
                    ExpectedIntent {
                        intent: intents::OPTION.to_string(),
                        input_value_data: Some(list_select(items)),
                    },
                ),
                ResponseElement::SurfaceSwitchRequest(switch) => offer_helper(
                    &mut helper,
                    ExpectedIntent {
                        intent: intents::NEW_SURFACE.to_string(),
                        input_value_data: Some(new_surface_spec(switch)),
                    },
                ),
            }
        }

        let user_storage = encode_user_storage(session);

        if outcome.close {
            if helper.is_some() {
                tracing::warn!("Closing conversation, list or surface request not delivered");
            }
            rich.suggestions.clear();
            return Self {
                expect_user_response: false,
                user_storage,
                expected_inputs: vec![],
                final_response: Some(FinalResponse {
                    rich_response: rich,
                }),
            };
        }

        let intent = helper.unwrap_or_else(|| ExpectedIntent {
            intent: intents::TEXT.to_string(),
            input_value_data: None,
        });
        Self {
            expect_user_response: true,
            user_storage,
            expected_inputs: vec![ExpectedInput {
                input_prompt: InputPrompt {
                    rich_initial_prompt: rich,
                },
                possible_intents: vec![intent],
            }],
            final_response: None,
        }
    }
}

fn encode_user_storage(session: &ConversationSession) -> String {
    let stored = StoredUserState {
        data: session.memory.clone(),
        bridge: session.state.clone(),
    };
    serde_json::to_string(&stored).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to encode user storage");
        String::new()
    })
}

//! Directive to response element mapping.
//!
//! The mapper is pure: when a card has to wait for a screen it returns the
//! unprocessed tail of the directive list instead of touching the session,
//! and the caller decides where to keep it.

use gaction_core::VoiceProfile;
use serde_json::Value;

use crate::directive::{Card, Directive, ListContent, QuickReplies};
use crate::element::{
    CarouselEntry, Image, LinkButton, ListItem, ResponseElement, RichCard, SurfaceSwitch,
};
use crate::session::ConversationSession;
use crate::speech;

/// Device capabilities relevant to mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceView {
    /// The current surface has a screen.
    pub has_screen: bool,
    /// A surface switch to a screen device may be requested.
    pub can_switch_to_screen: bool,
}

impl SurfaceView {
    pub fn of(session: &ConversationSession) -> Self {
        Self {
            has_screen: session.has_screen,
            can_switch_to_screen: session.can_switch_to_screen(),
        }
    }

    /// Same surface, with surface switching ruled out.
    pub fn without_switch(self) -> Self {
        Self {
            can_switch_to_screen: false,
            ..self
        }
    }
}

/// Output of one mapping pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedTurn {
    pub elements: Vec<ResponseElement>,
    /// Directives from the card that triggered a surface switch to the end.
    pub deferred: Option<Vec<Directive>>,
}

/// Flattened card or picture.
struct CardData {
    title: Option<String>,
    subtitle: Option<String>,
    image_url: Option<String>,
    button: Option<LinkButton>,
}

impl CardData {
    fn from_card(card: &Card) -> Self {
        let button = card.first_button().map(|b| LinkButton {
            title: b.title.clone().unwrap_or_default(),
            url: b.value.clone(),
        });
        Self {
            title: card.title.clone(),
            subtitle: card.subtitle.clone(),
            image_url: card.image_url.clone(),
            button: button.filter(|b| !b.title.is_empty()),
        }
    }

    fn from_picture(url: &str) -> Self {
        Self {
            title: None,
            subtitle: None,
            image_url: Some(url.to_string()),
            button: None,
        }
    }

    fn into_rich_card(self) -> RichCard {
        RichCard {
            title: self.title,
            subtitle: self.subtitle,
            image: self.image_url.map(Image::new),
            button: self.button,
        }
    }
}

/// Maps directives to platform elements for one bot.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveMapper<'a> {
    voice: &'a VoiceProfile,
    auto_change_surface: bool,
}

impl<'a> DirectiveMapper<'a> {
    pub fn new(voice: &'a VoiceProfile, auto_change_surface: bool) -> Self {
        Self {
            voice,
            auto_change_surface,
        }
    }

    pub fn map(&self, directives: &[Directive], surface: SurfaceView) -> MappedTurn {
        let mut turn = MappedTurn::default();

        for (index, directive) in directives.iter().enumerate() {
            match directive {
                Directive::Text(text) => turn.elements.push(self.spoken(text)),
                Directive::QuickReplies(replies) | Directive::Buttons(replies) => {
                    self.push_quick_replies(&mut turn.elements, replies)
                }
                Directive::Carousel(items) => turn.elements.push(carousel(items)),
                Directive::List(list) => turn.elements.push(item_list(list)),
                Directive::Card(card) => {
                    if self.push_card(&mut turn.elements, CardData::from_card(card), surface) {
                        turn.deferred = Some(directives[index..].to_vec());
                        break;
                    }
                }
                Directive::Picture(url) => {
                    if self.push_card(&mut turn.elements, CardData::from_picture(url), surface) {
                        turn.deferred = Some(directives[index..].to_vec());
                        break;
                    }
                }
                Directive::Other { kind, content } => {
                    tracing::debug!(kind = %kind, "Unknown directive kind, speaking its content");
                    turn.elements.push(self.spoken(&content_as_text(content)));
                }
            }
        }

        turn
    }

    fn spoken(&self, text: &str) -> ResponseElement {
        ResponseElement::SpokenText(speech::to_ssml(text, self.voice))
    }

    fn push_quick_replies(&self, elements: &mut Vec<ResponseElement>, replies: &QuickReplies) {
        elements.push(self.spoken(replies.title.as_deref().unwrap_or_default()));
        let chips = replies
            .buttons
            .iter()
            .map(|b| b.title.clone().unwrap_or_default())
            .collect();
        elements.push(ResponseElement::QuickReplySet(chips));
    }

    /// Returns `true` when a surface switch was requested and mapping must stop.
    fn push_card(
        &self,
        elements: &mut Vec<ResponseElement>,
        card: CardData,
        surface: SurfaceView,
    ) -> bool {
        if surface.has_screen {
            elements.push(ResponseElement::RichCard(card.into_rich_card()));
            return false;
        }

        if self.auto_change_surface && surface.can_switch_to_screen {
            tracing::debug!("Requesting new surface with a screen");
            let title = card.title.unwrap_or_default();
            elements.push(ResponseElement::SurfaceSwitchRequest(SurfaceSwitch::to_screen(title)));
            return true;
        }

        tracing::warn!(
            auto_change_surface = self.auto_change_surface,
            "Card ignored, screen not available and no surface switch possible"
        );
        false
    }
}

fn carousel(items: &[Card]) -> ResponseElement {
    let entries = items
        .iter()
        .map(|item| CarouselEntry {
            title: item.title.clone(),
            description: item.subtitle.clone(),
            image: Image::new(item.image_url.clone().unwrap_or_default()),
            url: item.first_button().and_then(|b| b.value.clone()),
        })
        .collect();
    ResponseElement::ItemCarousel(entries)
}

fn item_list(list: &ListContent) -> ResponseElement {
    let items = list
        .elements
        .iter()
        .map(|element| {
            let first = element.first_button();
            let title = element
                .title
                .clone()
                .filter(|t| !t.is_empty())
                .or_else(|| first.and_then(|b| b.title.clone()))
                .unwrap_or_default();
            let key = first
                .and_then(|b| b.value.clone())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| title.clone());
            ListItem {
                key,
                title,
                description: element.subtitle.clone(),
                image: element
                    .image_url
                    .clone()
                    .filter(|u| !u.is_empty())
                    .map(Image::new),
            }
        })
        .collect();
    ResponseElement::ItemList(items)
}

fn content_as_text(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

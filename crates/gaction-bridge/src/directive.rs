//! Response directives as produced by the Recast dialog endpoint.
//!
//! Recast messages are `{"type": ..., "content": ...}` objects. Known kinds
//! are decoded into typed payloads; anything else (or a known kind with a
//! payload that does not fit) is kept as [`Directive::Other`] so a single
//! odd message never fails the whole turn.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A Recast button or quick reply.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Button {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl Button {
    pub fn new(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            value: Some(value.into()),
            kind: None,
        }
    }
}

/// Payload of `quickReplies` and `buttons` directives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickReplies {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

/// Payload of a `card` directive, and of each `carousel` item / `list` element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub buttons: Vec<Button>,
}

impl Card {
    pub fn first_button(&self) -> Option<&Button> {
        self.buttons.first()
    }
}

/// Payload of a `list` directive.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListContent {
    #[serde(default)]
    pub elements: Vec<Card>,
    /// Accepted from the backend but not rendered.
    #[serde(default)]
    pub buttons: Vec<Button>,
}

/// One backend-authored output instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDirective", into = "RawDirective")]
pub enum Directive {
    Text(String),
    QuickReplies(QuickReplies),
    Buttons(QuickReplies),
    Card(Card),
    /// Image URL.
    Picture(String),
    List(ListContent),
    Carousel(Vec<Card>),
    Other { kind: String, content: Value },
}

impl Directive {
    pub fn text(content: impl Into<String>) -> Self {
        Directive::Text(content.into())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Directive::Text(_))
    }

    /// Wire name of the directive kind.
    pub fn kind(&self) -> &str {
        match self {
            Directive::Text(_) => "text",
            Directive::QuickReplies(_) => "quickReplies",
            Directive::Buttons(_) => "buttons",
            Directive::Card(_) => "card",
            Directive::Picture(_) => "picture",
            Directive::List(_) => "list",
            Directive::Carousel(_) => "carousel",
            Directive::Other { kind, .. } => kind,
        }
    }
}

/// Wire shape of a directive.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDirective {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: Value,
}

fn decode<T: serde::de::DeserializeOwned>(kind: &str, content: &Value) -> Option<T> {
    match serde_json::from_value(content.clone()) {
        Ok(payload) => Some(payload),
        Err(e) => {
            tracing::warn!(kind = %kind, error = %e, "Malformed directive payload, treating as text");
            None
        }
    }
}

impl From<RawDirective> for Directive {
    fn from(raw: RawDirective) -> Self {
        let RawDirective { kind, content } = raw;
        let typed = match kind.as_str() {
            "text" => content.as_str().map(|s| Directive::Text(s.to_string())),
            "quickReplies" => decode(&kind, &content).map(Directive::QuickReplies),
            "buttons" => decode(&kind, &content).map(Directive::Buttons),
            "card" => decode(&kind, &content).map(Directive::Card),
            "picture" => content.as_str().map(|s| Directive::Picture(s.to_string())),
            "list" => decode(&kind, &content).map(Directive::List),
            "carousel" => decode(&kind, &content).map(Directive::Carousel),
            _ => None,
        };
        typed.unwrap_or(Directive::Other { kind, content })
    }
}

impl From<Directive> for RawDirective {
    fn from(directive: Directive) -> Self {
        let kind = directive.kind().to_string();
        let content = match directive {
            Directive::Text(text) | Directive::Picture(text) => Value::String(text),
            Directive::QuickReplies(p) | Directive::Buttons(p) => {
                serde_json::to_value(p).unwrap_or_default()
            }
            Directive::Card(card) => serde_json::to_value(card).unwrap_or_default(),
            Directive::List(list) => serde_json::to_value(list).unwrap_or_default(),
            Directive::Carousel(items) => serde_json::to_value(items).unwrap_or_default(),
            Directive::Other { content, .. } => content,
        };
        RawDirective { kind, content }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> Directive {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_decode_text() {
        let d = parse(json!({"type": "text", "content": "MY_TEXT"}));
        assert_eq!(d, Directive::text("MY_TEXT"));
        assert!(d.is_text());
    }

    #[test]
    fn test_decode_quick_replies() {
        let d = parse(json!({
            "type": "quickReplies",
            "content": {
                "title": "TITLE",
                "buttons": [{"title": "BUTTON_TITLE", "value": "BUTTON_VALUE"}]
            }
        }));
        let Directive::QuickReplies(payload) = d else {
            panic!("expected quickReplies");
        };
        assert_eq!(payload.title.as_deref(), Some("TITLE"));
        assert_eq!(payload.buttons, vec![Button::new("BUTTON_TITLE", "BUTTON_VALUE")]);
    }

    #[test]
    fn test_decode_card_with_typed_button() {
        let d = parse(json!({
            "type": "card",
            "content": {
                "title": "CARD_TITLE",
                "subtitle": "CARD_SUBTITLE",
                "imageUrl": "IMAGE_URL",
                "buttons": [{"title": "B", "type": "web_url", "value": "https://x"}]
            }
        }));
        let Directive::Card(card) = d else {
            panic!("expected card");
        };
        assert_eq!(card.image_url.as_deref(), Some("IMAGE_URL"));
        assert_eq!(card.first_button().and_then(|b| b.kind.as_deref()), Some("web_url"));
    }

    #[test]
    fn test_decode_picture_and_carousel() {
        assert_eq!(
            parse(json!({"type": "picture", "content": "IMAGE_URL"})),
            Directive::Picture("IMAGE_URL".to_string())
        );

        let d = parse(json!({
            "type": "carousel",
            "content": [{"title": "C1", "subtitle": "S1", "imageUrl": "I1", "buttons": []}]
        }));
        let Directive::Carousel(items) = d else {
            panic!("expected carousel");
        };
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title.as_deref(), Some("C1"));
    }

    #[test]
    fn test_decode_list_keeps_top_level_buttons() {
        let d = parse(json!({
            "type": "list",
            "content": {
                "elements": [{"title": "E1", "buttons": []}],
                "buttons": [{"title": "MORE", "value": "more"}]
            }
        }));
        let Directive::List(list) = d else {
            panic!("expected list");
        };
        assert_eq!(list.elements.len(), 1);
        assert_eq!(list.buttons.len(), 1);
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let d = parse(json!({"type": "video", "content": "https://v"}));
        assert_eq!(
            d,
            Directive::Other {
                kind: "video".to_string(),
                content: json!("https://v")
            }
        );
        assert_eq!(d.kind(), "video");
    }

    #[test]
    fn test_malformed_known_kind_degrades_to_other() {
        let d = parse(json!({"type": "card", "content": "not an object"}));
        assert!(matches!(d, Directive::Other { ref kind, .. } if kind == "card"));

        let d = parse(json!({"type": "text", "content": 42}));
        assert!(matches!(d, Directive::Other { ref kind, .. } if kind == "text"));
    }

    #[test]
    fn test_missing_content_defaults_to_null() {
        let d = parse(json!({"type": "mystery"}));
        assert_eq!(
            d,
            Directive::Other {
                kind: "mystery".to_string(),
                content: Value::Null
            }
        );
    }

    #[test]
    fn test_encode_uses_recast_shape() {
        let card = Directive::Card(Card {
            title: Some("T".to_string()),
            image_url: Some("I".to_string()),
            ..Card::default()
        });
        let value = serde_json::to_value(&card).unwrap();
        assert_eq!(
            value,
            json!({"type": "card", "content": {"title": "T", "imageUrl": "I", "buttons": []}})
        );
        let back: Directive = serde_json::from_value(value).unwrap();
        assert_eq!(back, card);
    }
}

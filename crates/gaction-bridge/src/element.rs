//! Platform response elements, ready to be encoded for the Actions SDK.

/// Capability name of a device with a display.
pub const SCREEN_OUTPUT: &str = "actions.capability.SCREEN_OUTPUT";

#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub url: String,
    pub alt: String,
}

impl Image {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt: "image".to_string(),
        }
    }
}

/// Button that opens a URL.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkButton {
    pub title: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichCard {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub image: Option<Image>,
    pub button: Option<LinkButton>,
}

/// One selectable row of an [`ResponseElement::ItemList`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    /// Option key sent back by the platform when the row is selected.
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub image: Option<Image>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarouselEntry {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Image,
    pub url: Option<String>,
}

/// Request to continue the conversation on a device with more capabilities.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSwitch {
    pub context: String,
    pub notification: String,
    pub capabilities: Vec<String>,
}

impl SurfaceSwitch {
    pub fn to_screen(title: impl Into<String>) -> Self {
        let title = title.into();
        Self {
            context: title.clone(),
            notification: title,
            capabilities: vec![SCREEN_OUTPUT.to_string()],
        }
    }
}

/// One unit of output delivered to the user, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseElement {
    /// Speech string, normally SSML.
    SpokenText(String),
    /// Suggestion chip labels.
    QuickReplySet(Vec<String>),
    RichCard(RichCard),
    ItemList(Vec<ListItem>),
    ItemCarousel(Vec<CarouselEntry>),
    SurfaceSwitchRequest(SurfaceSwitch),
}

//! Plain text to SSML with punctuation-aware pauses.

use std::sync::LazyLock;

use gaction_core::VoiceProfile;
use regex::{Captures, Regex};

/// Sentence-ending punctuation (including the ellipsis character) followed by whitespace.
static LONG_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.?!:\x{2026}]+\s)").expect("Invalid long punctuation regex"));

/// Clause punctuation followed by whitespace. Escaped entities are matched
/// first so their trailing `;` is never taken for a semicolon.
static SHORT_PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(&[a-z]+;)|([,;]\s)").expect("Invalid short punctuation regex")
});

/// SSML pause element.
pub fn pause(ms: u32) -> String {
    format!("<break time='{}ms'/>", ms)
}

/// Pause elements already present in the text, or a markup character.
static MARKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(<break time='\d+ms'/>)|([&<>])").expect("Invalid markup regex")
});

/// Escape the characters that would break the SSML document. Pause elements
/// (such as the separator between merged messages) are kept as markup.
fn escape_xml(text: &str) -> String {
    MARKUP
        .replace_all(text, |caps: &Captures| match (caps.get(1), caps.get(2)) {
            (Some(tag), _) => tag.as_str().to_string(),
            (None, Some(c)) => match c.as_str() {
                "&" => "&amp;".to_string(),
                "<" => "&lt;".to_string(),
                _ => "&gt;".to_string(),
            },
            (None, None) => String::new(),
        })
        .into_owned()
}

/// Convert `text` into an SSML document using the given voice.
///
/// The text is XML-escaped, then a long pause is inserted after every run
/// of sentence punctuation that is followed by whitespace, then a short
/// pause after every comma or semicolon followed by whitespace. The body is
/// wrapped in a single `<speak><prosody>` envelope carrying the voice pitch
/// and rate.
pub fn to_ssml(text: &str, voice: &VoiceProfile) -> String {
    let long = format!("${{1}}{}", pause(voice.long_pause_ms));
    let short = pause(voice.short_pause_ms);

    let escaped = escape_xml(text);
    let with_long = LONG_PUNCTUATION.replace_all(&escaped, long.as_str());
    let with_breaks = SHORT_PUNCTUATION.replace_all(&with_long, |caps: &Captures| {
        match (caps.get(1), caps.get(2)) {
            (Some(entity), _) => entity.as_str().to_string(),
            (None, Some(punctuation)) => format!("{}{}", punctuation.as_str(), short),
            (None, None) => String::new(),
        }
    });

    format!(
        "<speak><prosody pitch='{}' rate='{}'>{}</prosody></speak>",
        voice.pitch, voice.rate, with_breaks
    )
}

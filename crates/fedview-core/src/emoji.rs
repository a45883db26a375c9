//! Custom emoji extraction and substitution.
//!
//! Substitution only touches text outside of markup and replaces every
//! shortcode in a single pass over the original text, so running it twice
//! yields the same output as running it once.

use std::collections::HashSet;

use regex::Regex;

use crate::model::CustomEmoji;
use crate::object::Tag;

/// Class attribute applied to substituted emoji images.
pub const DEFAULT_EMOJI_CLASS: &str = "custom-emoji";

/// Builds the shortcode table from a tag list.
///
/// Tags without a name or icon are skipped. Shortcodes are unique; the first
/// occurrence wins.
pub fn extract_custom_emojis<'a, I>(tags: I) -> Vec<CustomEmoji>
where
    I: IntoIterator<Item = &'a Tag>,
{
    let mut seen = HashSet::new();
    let mut emojis = Vec::new();

    for tag in tags {
        let Tag::Emoji {
            name,
            icon: Some(icon),
            ..
        } = tag
        else {
            continue;
        };
        let shortcode = name.trim();
        if shortcode.is_empty() || icon.url.is_empty() {
            continue;
        }
        if seen.insert(shortcode.to_string()) {
            emojis.push(CustomEmoji::new(shortcode, icon.url.clone()));
        }
    }

    emojis
}

/// Replaces shortcodes in `content` with inline `<img>` elements.
///
/// Works on HTML or plain text. Text inside a tag is never touched, which
/// keeps attribute values intact and makes the operation idempotent. A `<`
/// that does not open a tag (as in `<3`) is plain text.
pub fn replace_custom_emojis(content: &str, emojis: &[CustomEmoji], class_name: &str) -> String {
    let Some(pattern) = shortcode_pattern(emojis) else {
        return content.to_string();
    };

    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while !rest.is_empty() {
        match tag_start(rest) {
            Some(start) => {
                out.push_str(&substitute(&rest[..start], &pattern, emojis, class_name));
                let markup = &rest[start..];
                let end = markup.find('>').map_or(markup.len(), |i| i + 1);
                out.push_str(&markup[..end]);
                rest = &markup[end..];
            }
            None => {
                out.push_str(&substitute(rest, &pattern, emojis, class_name));
                break;
            }
        }
    }

    out
}

fn tag_start(text: &str) -> Option<usize> {
    text.match_indices('<').map(|(i, _)| i).find(|&i| {
        text.as_bytes()
            .get(i + 1)
            .is_some_and(|&b| b.is_ascii_alphabetic() || b == b'/' || b == b'!')
    })
}

fn shortcode_pattern(emojis: &[CustomEmoji]) -> Option<Regex> {
    let mut codes: Vec<&str> = emojis
        .iter()
        .map(|e| e.shortcode.as_str())
        .filter(|s| !s.is_empty())
        .collect();
    if codes.is_empty() {
        return None;
    }
    // Longest first so `:blob:` never shadows `:blobcat:`.
    codes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    codes.dedup();

    let alternation = codes
        .iter()
        .map(|c| regex::escape(c))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&alternation).ok()
}

fn substitute(text: &str, pattern: &Regex, emojis: &[CustomEmoji], class_name: &str) -> String {
    pattern
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let code = &caps[0];
            emojis
                .iter()
                .find(|e| e.shortcode == code)
                .map_or_else(|| code.to_string(), |e| render(e, class_name))
        })
        .into_owned()
}

fn render(emoji: &CustomEmoji, class_name: &str) -> String {
    let code = escape_attr(&emoji.shortcode);
    format!(
        r#"<img src="{}" alt="{code}" title="{code}" class="{}" loading="lazy">"#,
        escape_attr(&emoji.image_url),
        escape_attr(class_name),
    )
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

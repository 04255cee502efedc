//! Element locators understood by every [`Page`](crate::page::Page) backend

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Serialize, Serializer};

use crate::error::{E2eError, E2eResult};

/// Case-insensitive text pattern, sent to the browser as a `RegExp`
#[derive(Clone)]
pub struct TextPattern {
    regex: Regex,
}

impl TextPattern {
    /// Pattern matching `text` literally, ignoring case
    pub fn literal(text: &str) -> E2eResult<Self> {
        Self::regex(&regex::escape(text))
    }

    /// Pattern from a regular expression, ignoring case
    pub fn regex(source: &str) -> E2eResult<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| E2eError::Locator {
                locator: format!("/{}/i", source),
                reason: e.to_string(),
            })?;
        Ok(Self { regex })
    }

    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl fmt::Debug for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/i", self.source())
    }
}

impl fmt::Display for TextPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/i", self.source())
    }
}

impl Serialize for TextPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("TextPattern", 2)?;
        state.serialize_field("source", self.source())?;
        state.serialize_field("flags", "i")?;
        state.end()
    }
}

/// A way to find elements on the page.
///
/// `css` alone is a CSS locator, `has_text` alone matches by visible text,
/// both together filter CSS matches by their text.
#[derive(Debug, Clone, Serialize)]
pub struct Locator {
    #[serde(skip_serializing_if = "Option::is_none")]
    css: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    has_text: Option<TextPattern>,

    first: bool,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            css: Some(selector.into()),
            has_text: None,
            first: false,
        }
    }

    pub fn text(pattern: TextPattern) -> Self {
        Self {
            css: None,
            has_text: Some(pattern),
            first: false,
        }
    }

    /// Keep only the CSS matches whose text matches `pattern`
    pub fn with_text(mut self, pattern: TextPattern) -> Self {
        self.has_text = Some(pattern);
        self
    }

    /// Narrow to the first match in document order
    pub fn first(mut self) -> Self {
        self.first = true;
        self
    }

    pub fn css_selector(&self) -> Option<&str> {
        self.css.as_deref()
    }

    pub fn text_pattern(&self) -> Option<&TextPattern> {
        self.has_text.as_ref()
    }

    pub fn is_first(&self) -> bool {
        self.first
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.css, &self.has_text) {
            (Some(css), Some(text)) => write!(f, "{}:has-text({})", css, text)?,
            (Some(css), None) => write!(f, "{}", css)?,
            (None, Some(text)) => write!(f, "text={}", text)?,
            (None, None) => write!(f, "*")?,
        }
        if self.first {
            write!(f, " >> nth=0")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern_ignores_case() {
        let pattern = TextPattern::literal("venta #").unwrap();
        assert!(pattern.is_match("¡Venta #42 registrada!"));
        assert!(pattern.is_match("VENTA #1"));
        assert!(!pattern.is_match("venta 42"));
    }

    #[test]
    fn test_literal_pattern_escapes_metacharacters() {
        let pattern = TextPattern::literal("total (COP)").unwrap();
        assert!(pattern.is_match("Total (cop): $12.000"));
        assert!(!pattern.is_match("total cop"));
    }

    #[test]
    fn test_invalid_regex_is_locator_error() {
        let err = TextPattern::regex("(unclosed").unwrap_err();
        assert!(matches!(err, E2eError::Locator { .. }));
    }

    #[test]
    fn test_display() {
        let button = Locator::css("button").with_text(TextPattern::literal("abrir caja").unwrap());
        assert_eq!(button.to_string(), "button:has-text(/abrir caja/i)");

        let card = Locator::css(".product-card").first();
        assert_eq!(card.to_string(), ".product-card >> nth=0");

        let total = Locator::text(TextPattern::literal("total").unwrap()).first();
        assert_eq!(total.to_string(), "text=/total/i >> nth=0");
    }

    #[test]
    fn test_serializes_for_bridge() {
        let button = Locator::css("button").with_text(TextPattern::literal("confirmar").unwrap());
        let json = serde_json::to_value(&button).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "css": "button",
                "has_text": { "source": "confirmar", "flags": "i" },
                "first": false
            })
        );

        let card = Locator::css(".product-card").first();
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json, serde_json::json!({ "css": ".product-card", "first": true }));
    }
}

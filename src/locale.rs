//! Supported locales.
//!
//! Every lookup, note-code and view table is replicated per locale; the
//! closed spelling set below is how long-form lookup files may name a
//! language column value.

use serde::{Deserialize, Serialize};

/// A supported publication locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Locale {
    /// English (en-GB)
    #[serde(rename = "en-GB")]
    En,
    /// Welsh (cy-GB)
    #[serde(rename = "cy-GB")]
    Cy,
}

/// All locales a cube must cover, in publication order.
pub const SUPPORTED_LOCALES: [Locale; 2] = [Locale::En, Locale::Cy];

impl Locale {
    /// The canonical tag written into `language` columns.
    pub fn tag(&self) -> &'static str {
        match self {
            Locale::En => "en-GB",
            Locale::Cy => "cy-GB",
        }
    }

    /// The short view-name suffix (`default_view_en`).
    pub fn suffix(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Cy => "cy",
        }
    }

    /// Map a free-form language cell onto a locale.
    ///
    /// The spelling set is closed; anything else is `None` and surfaces
    /// as a lookup-validation failure.
    pub fn from_spelling(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "en" | "en-gb" | "eng" | "english" => Some(Locale::En),
            "cy" | "cy-gb" | "cym" | "welsh" | "cymraeg" => Some(Locale::Cy),
            _ => None,
        }
    }

    /// Every spelling that maps onto this locale (for SQL CASE arms).
    pub fn spellings(&self) -> &'static [&'static str] {
        match self {
            Locale::En => &["en", "en-gb", "eng", "english"],
            Locale::Cy => &["cy", "cy-gb", "cym", "welsh", "cymraeg"],
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spelling_set() {
        assert_eq!(Locale::from_spelling("en"), Some(Locale::En));
        assert_eq!(Locale::from_spelling("English"), Some(Locale::En));
        assert_eq!(Locale::from_spelling(" CY-GB "), Some(Locale::Cy));
        assert_eq!(Locale::from_spelling("Cymraeg"), Some(Locale::Cy));
        assert_eq!(Locale::from_spelling("fr"), None);
    }

    #[test]
    fn test_tags() {
        assert_eq!(Locale::En.tag(), "en-GB");
        assert_eq!(Locale::Cy.tag(), "cy-GB");
        assert_eq!(Locale::En.suffix(), "en");
    }

    #[test]
    fn test_serde_tag_roundtrip() {
        let json = serde_json::to_string(&Locale::Cy).unwrap();
        assert_eq!(json, "\"cy-GB\"");
        let back: Locale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Locale::Cy);
    }
}

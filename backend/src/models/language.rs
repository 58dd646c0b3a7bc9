//! Supported storefront languages and translation lookup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Languages the storefront is published in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Es,
    Fr,
    De,
    It,
    Pt,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Language::En,
        Language::Es,
        Language::Fr,
        Language::De,
        Language::It,
        Language::Pt,
    ];

    /// ISO 639-1 code.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Es => "es",
            Language::Fr => "fr",
            Language::De => "de",
            Language::It => "it",
            Language::Pt => "pt",
        }
    }

    /// English name, used in translation prompts.
    pub fn english_name(&self) -> &'static str {
        match self {
            Language::En => "English",
            Language::Es => "Spanish",
            Language::Fr => "French",
            Language::De => "German",
            Language::It => "Italian",
            Language::Pt => "Portuguese",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "es" => Ok(Language::Es),
            "fr" => Ok(Language::Fr),
            "de" => Ok(Language::De),
            "it" => Ok(Language::It),
            "pt" => Ok(Language::Pt),
            other => Err(format!("Unsupported language: {}", other)),
        }
    }
}

/// Per-language content map.
pub type Translations<T> = BTreeMap<Language, T>;

/// Pick the best translation for `lang`.
///
/// Falls back to `fallback`, then to whichever translation exists first.
/// Returns the language actually served alongside the content.
pub fn localize<T>(
    translations: &Translations<T>,
    lang: Language,
    fallback: Language,
) -> Option<(Language, &T)> {
    translations
        .get(&lang)
        .map(|t| (lang, t))
        .or_else(|| translations.get(&fallback).map(|t| (fallback, t)))
        .or_else(|| translations.iter().next().map(|(l, t)| (*l, t)))
}

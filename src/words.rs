use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

use crate::provider::ProviderError;

/// Number of banned words that accompany every guess word
pub const TABOO_COUNT: usize = 5;

/// A validated guess word with exactly five banned companions.
///
/// The guess is stored upper-cased and the banned words lower-cased, both
/// trimmed. Construct through [`WordSet::new`] or [`WordSet::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordSet {
    guess: String,
    taboo: Vec<String>,
}

impl WordSet {
    pub fn new<G, I, T>(guess: G, taboo: I) -> Result<Self, ProviderError>
    where
        G: AsRef<str>,
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let guess = guess.as_ref().trim().to_uppercase();
        if guess.is_empty() {
            return Err(ProviderError::InvalidGuess);
        }

        let taboo = taboo
            .into_iter()
            .map(|word| word.as_ref().trim().to_lowercase())
            .filter(|word| !word.is_empty())
            .collect::<Vec<String>>();

        if taboo.len() != TABOO_COUNT {
            return Err(ProviderError::TabooCount(taboo.len()));
        }

        Ok(Self { guess, taboo })
    }

    /// Parse a JSON payload as produced by a text generator.
    ///
    /// Code fences are stripped and underscores read as spaces before the
    /// object is decoded; the decoded object then goes through the same
    /// checks as [`WordSet::new`]. Non-string banned words count as missing.
    pub fn parse(payload: &str) -> Result<Self, ProviderError> {
        let cleaned = strip_fences(payload).replace('_', " ");
        let value: Value = serde_json::from_str(cleaned.trim())?;

        let guess = match value.get("guess") {
            Some(Value::String(guess)) => guess.as_str(),
            _ => return Err(ProviderError::InvalidGuess),
        };

        let taboo = match value.get("taboo") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ProviderError::Malformed("taboo is not a list".into())),
            None => return Err(ProviderError::TabooCount(0)),
        };
        if taboo.len() != TABOO_COUNT {
            return Err(ProviderError::TabooCount(taboo.len()));
        }

        Self::new(
            guess,
            taboo.iter().map(|item| item.as_str().unwrap_or_default()),
        )
    }

    pub fn guess(&self) -> &str {
        &self.guess
    }

    pub fn taboo(&self) -> &[String] {
        &self.taboo
    }

    pub fn into_parts(self) -> (String, Vec<String>) {
        (self.guess, self.taboo)
    }
}

fn strip_fences(payload: &str) -> String {
    let trimmed = payload.trim();
    let without_open = match trimmed.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("```json") => &trimmed[7..],
        _ => trimmed,
    };
    without_open.replace("```", "")
}

/// Guess words already issued this game. Membership ignores case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WordHistory {
    words: BTreeSet<String>,
}

impl WordHistory {
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.trim().to_uppercase())
    }

    /// Returns false if the word was already present
    pub fn insert(&mut self, word: &str) -> bool {
        self.words.insert(word.trim().to_uppercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.words.iter().cloned().collect()
    }
}

/// Everything a word provider needs to come up with the next word
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordRequest {
    pub category: String,
    pub difficulty: String,
    pub language: String,
    pub exclude_words: Vec<String>,
}

impl WordRequest {
    pub fn excludes(&self, word: &str) -> bool {
        self.exclude_words
            .iter()
            .any(|used| used.eq_ignore_ascii_case(word.trim()))
    }
}

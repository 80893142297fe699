//! Filer name normalization for exact-match grouping

use std::fmt;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizationConfig;

/// Token sequences introducing a trade name ("d/b/a" folds to `d b a`)
const DBA_MARKERS: &[&[&str]] = &[&["dba"], &["d", "b", "a"], &["doing", "business", "as"]];

/// Apostrophes join rather than split ("Macy's" -> "macys")
const APOSTROPHES: [char; 3] = ['\'', '\u{2019}', '`'];

/// Canonical comparison key derived from a filer name
///
/// Two records with equal keys are the same entity without further matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedKey(String);

impl NormalizedKey {
    pub(crate) fn from_tokens(tokens: &[String]) -> Self {
        NormalizedKey(tokens.join(" "))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Space-separated tokens of the key
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split(' ').filter(|t| !t.is_empty())
    }

    pub fn token_count(&self) -> usize {
        self.tokens().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for NormalizedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fold a name into lowercase alphanumeric tokens
///
/// - Unicode NFKD with combining marks removed ("Société" -> "societe")
/// - Lowercase
/// - Apostrophes removed, every other non-alphanumeric character splits words
/// - Whitespace collapsed
pub fn fold_tokens(name: &str) -> Vec<String> {
    let folded: String = name
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .filter(|c| !APOSTROPHES.contains(c))
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();

    folded.split_whitespace().map(str::to_string).collect()
}

/// Maps raw filer names to `NormalizedKey`s
///
/// `normalize` is idempotent: normalizing a key's text yields the same key.
#[derive(Debug, Clone)]
pub struct Normalizer {
    /// Folded suffix token sequences, longest first
    suffixes: Vec<Vec<String>>,
    strip_dba: bool,
}

impl Normalizer {
    pub fn new(config: &NormalizationConfig) -> Self {
        let mut suffixes: Vec<Vec<String>> = config
            .legal_suffixes
            .iter()
            .map(|s| fold_tokens(s))
            .filter(|tokens| !tokens.is_empty())
            .collect();
        suffixes.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        suffixes.dedup();

        Self {
            suffixes,
            strip_dba: config.strip_dba,
        }
    }

    /// Normalize a raw filer name
    pub fn normalize(&self, name: &str) -> NormalizedKey {
        let mut tokens = fold_tokens(name);

        if self.strip_dba {
            cut_trade_name(&mut tokens);
        }
        self.strip_legal_suffixes(&mut tokens);

        NormalizedKey::from_tokens(&tokens)
    }

    /// Whether the folded name contains a legal-suffix sequence anywhere
    pub fn has_legal_suffix(&self, tokens: &[String]) -> bool {
        self.suffixes.iter().any(|suffix| {
            tokens
                .windows(suffix.len())
                .any(|window| window == suffix.as_slice())
        })
    }

    /// Strip trailing suffix sequences until none matches.
    /// The last remaining token is never removed.
    fn strip_legal_suffixes(&self, tokens: &mut Vec<String>) {
        loop {
            let cut = self
                .suffixes
                .iter()
                .find(|suffix| suffix.len() < tokens.len() && tokens.ends_with(suffix))
                .map(|suffix| suffix.len());

            match cut {
                Some(len) => {
                    let keep = tokens.len() - len;
                    tokens.truncate(keep);
                }
                None => break,
            }
        }
    }
}

/// Drop everything from the first trade-name marker that is not the first token
fn cut_trade_name(tokens: &mut Vec<String>) {
    let position = (1..tokens.len()).find(|&i| {
        DBA_MARKERS.iter().any(|marker| {
            tokens.len() - i >= marker.len()
                && marker
                    .iter()
                    .zip(&tokens[i..])
                    .all(|(expected, token)| token == expected)
        })
    });

    if let Some(i) = position {
        tokens.truncate(i);
    }
}

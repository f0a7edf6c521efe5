//! Text normalization for Portuguese email bodies.
//!
//! Mirrors the cleanup the classifier prompt was tuned on: lowercase,
//! split into words, keep only alphabetic non-stop-word tokens, stem each
//! kept token, and join with single spaces.

use std::collections::HashSet;

use rust_stemmers::{Algorithm, Stemmer};
use unicode_segmentation::UnicodeSegmentation;

/// Portuguese text normalizer.
///
/// Construction loads the stop-word list and the Snowball stemmer once;
/// build it at startup and share it behind an `Arc`. `normalize` is pure.
pub struct TextNormalizer {
    stemmer: Stemmer,
    stop_words: HashSet<String>,
}

impl TextNormalizer {
    pub fn new() -> Self {
        let stop_words = stop_words::get(stop_words::LANGUAGE::Portuguese)
            .into_iter()
            .collect();

        Self {
            stemmer: Stemmer::create(Algorithm::Portuguese),
            stop_words,
        }
    }

    /// Normalize raw email text into the form sent to the classifier.
    ///
    /// Word segmentation follows UAX-29, so accented Portuguese words stay
    /// whole. Tokens with any non-alphabetic character (numbers, mixed
    /// alphanumerics) are dropped, as are stop words; survivors are
    /// stemmed and joined with single spaces.
    pub fn normalize(&self, text: &str) -> String {
        let lowered = text.to_lowercase();

        let mut tokens = Vec::new();
        for word in lowered.unicode_words() {
            if !word.chars().all(char::is_alphabetic) {
                continue;
            }
            if self.stop_words.contains(word) {
                continue;
            }
            tokens.push(self.stemmer.stem(word).into_owned());
        }

        tokens.join(" ")
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_is_deterministic() {
        let normalizer = TextNormalizer::new();
        let input = "Olá! Preciso de uma atualização do chamado 4412.";
        assert_eq!(normalizer.normalize(input), normalizer.normalize(input));
    }

    #[test]
    fn normalize_empty_input_yields_empty() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("   \n\t  "), "");
    }

    #[test]
    fn normalize_drops_non_alphabetic_tokens() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("123 !!!"), "");
        // Mixed alphanumerics are dropped too, plain words survive.
        let out = normalizer.normalize("chamado ab123 4412");
        assert!(!out.contains("123"));
        assert!(!out.contains("4412"));
        assert!(!out.is_empty());
    }

    #[test]
    fn normalize_lowercases_everything() {
        let normalizer = TextNormalizer::new();
        let out = normalizer.normalize("URGENTE Relatório Mensal");
        assert!(!out.is_empty());
        assert_eq!(out, out.to_lowercase());
    }

    #[test]
    fn normalize_removes_stop_words() {
        let normalizer = TextNormalizer::new();
        let out = normalizer.normalize("o relatório que preciso de você");
        for token in out.split(' ') {
            assert_ne!(token, "o");
            assert_ne!(token, "que");
            assert_ne!(token, "de");
        }
    }

    #[test]
    fn normalize_conflates_inflected_forms() {
        let normalizer = TextNormalizer::new();
        // Singular and plural collapse to one stem.
        assert_eq!(
            normalizer.normalize("chamado"),
            normalizer.normalize("chamados")
        );
    }

    #[test]
    fn normalize_joins_with_single_spaces() {
        let normalizer = TextNormalizer::new();
        let out = normalizer.normalize("aaaa    bbbb\ncccc");
        assert_eq!(out, "aaaa bbbb cccc");
    }
}

//! Token counting for definition metrics.
//!
//! The default counter is the `cl100k_base` byte-pair encoding. The
//! heuristic counter stands in when the encoder cannot be constructed.

use std::sync::{Arc, OnceLock};

use cardvault_card::CharacterCard;
use serde::{Deserialize, Serialize};
use tiktoken_rs::CoreBPE;

/// Counts tokens in a text.
pub trait Tokenizer: Send + Sync {
    /// Returns the number of tokens in `text`.
    fn count(&self, text: &str) -> u64;
}

/// Byte-pair tokenizer using the `cl100k_base` vocabulary.
pub struct BpeTokenizer {
    bpe: CoreBPE,
}

impl BpeTokenizer {
    /// Builds the `cl100k_base` encoder.
    ///
    /// # Errors
    ///
    /// Returns the construction error message if the embedded vocabulary
    /// cannot be loaded.
    pub fn cl100k() -> Result<Self, String> {
        tiktoken_rs::cl100k_base()
            .map(|bpe| Self { bpe })
            .map_err(|e| e.to_string())
    }
}

impl std::fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenizer").finish_non_exhaustive()
    }
}

impl Tokenizer for BpeTokenizer {
    fn count(&self, text: &str) -> u64 {
        u64::try_from(self.bpe.encode_ordinary(text).len()).unwrap_or(u64::MAX)
    }
}

/// Returns the process-wide default tokenizer.
///
/// The encoder is built once; if that fails the heuristic tokenizer is used
/// for the rest of the process.
#[must_use]
pub fn default_tokenizer() -> Arc<dyn Tokenizer> {
    static DEFAULT: OnceLock<Arc<dyn Tokenizer>> = OnceLock::new();
    DEFAULT
        .get_or_init(|| match BpeTokenizer::cl100k() {
            Ok(bpe) => Arc::new(bpe),
            Err(error) => {
                tracing::warn!(%error, "cl100k encoder unavailable, using heuristic token counts");
                Arc::new(HeuristicTokenizer)
            }
        })
        .clone()
}

/// Approximate tokenizer: one token per word or punctuation mark, with long
/// words charged one token per four characters.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenizer;

impl Tokenizer for HeuristicTokenizer {
    fn count(&self, text: &str) -> u64 {
        let mut tokens = 0u64;
        let mut word_len = 0u64;
        let flush = |len: &mut u64, tokens: &mut u64| {
            if *len > 0 {
                *tokens += len.div_ceil(4);
                *len = 0;
            }
        };
        for c in text.chars() {
            if c.is_alphanumeric() {
                word_len += 1;
            } else {
                flush(&mut word_len, &mut tokens);
                if !c.is_whitespace() {
                    tokens += 1;
                }
            }
        }
        flush(&mut word_len, &mut tokens);
        tokens
    }
}

/// Token counts stored with each character.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// Tokens always in context: description, personality, scenario.
    pub permanent: u64,
    /// Permanent tokens plus the first message.
    pub total: u64,
}

impl TokenMetrics {
    /// Computes metrics for a normalized card.
    #[must_use]
    pub fn compute(tokenizer: &dyn Tokenizer, card: &CharacterCard) -> Self {
        Self {
            permanent: tokenizer.count(&card.permanent_text()),
            total: tokenizer.count(&card.total_text()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardvault_card::normalize;

    #[test]
    fn heuristic_counts() {
        let t = HeuristicTokenizer;
        assert_eq!(t.count(""), 0);
        assert_eq!(t.count("   "), 0);
        assert_eq!(t.count("hi you"), 2);
        assert_eq!(t.count("hi there"), 3);
        assert_eq!(t.count("hello, world!"), 6);
        assert_eq!(t.count("internationalization"), 5);
    }

    #[test]
    fn bpe_counts_cl100k_tokens() {
        let t = BpeTokenizer::cl100k().unwrap();
        assert_eq!(t.count(""), 0);
        assert_eq!(t.count("hello world"), 2);
        assert_eq!(t.count("hello, world!"), 4);
    }

    #[test]
    fn default_tokenizer_is_bpe() {
        let t = default_tokenizer();
        assert_eq!(t.count("hello world"), 2);
        assert!(Arc::ptr_eq(&t, &default_tokenizer()));
    }

    #[test]
    fn total_includes_first_message() {
        let card = normalize(
            r#"{"name":"n","description":"a b","personality":"c","scenario":"d","first_mes":"e f g","mes_example":""}"#,
        )
        .unwrap();
        let metrics = TokenMetrics::compute(&HeuristicTokenizer, &card);
        assert_eq!(metrics.permanent, 2);
        assert_eq!(metrics.total, 4);
    }
}

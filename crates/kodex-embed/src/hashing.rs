//! Deterministic feature-hashing embeddings.
//!
//! Identifiers are split into lowercase words (including camelCase and
//! snake_case parts) and each word is hashed with blake3 into a signed
//! bucket. No model download, stable across runs and platforms.

use crate::backend::EmbedBackend;
use crate::error::Result;

pub const DEFAULT_HASH_DIMENSION: usize = 384;

#[derive(Debug, Clone)]
pub struct HashingBackend {
    dimension: usize,
}

impl HashingBackend {
    /// # Panics
    ///
    /// Panics if `dimension` is zero.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "hashing dimension must be non-zero");
        Self { dimension }
    }

    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut row = vec![0.0f32; self.dimension];
        for word in words(text) {
            let (bucket, sign) = self.bucket(&word);
            row[bucket] += sign;
        }
        // No words, or every bucket cancelled out.
        if row.iter().all(|v| *v == 0.0) {
            row[0] = 1.0;
        }
        row
    }

    fn bucket(&self, word: &str) -> (usize, f32) {
        let hash = blake3::hash(word.as_bytes());
        let bytes = hash.as_bytes();
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes[..8]);
        let value = u64::from_le_bytes(head);
        #[allow(clippy::cast_possible_truncation)]
        let bucket = (value % self.dimension as u64) as usize;
        let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

impl EmbedBackend for HashingBackend {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }
}

/// Lowercase words of `text`: alphanumeric runs, further split at
/// lower→upper case transitions.
fn words(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for token in text.split(|c: char| !c.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        let mut current = String::new();
        let mut prev_lower = false;
        for c in token.chars() {
            if c.is_uppercase() && prev_lower && !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
            current.extend(c.to_lowercase());
        }
        if !current.is_empty() {
            out.push(current);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn words_split_identifiers() {
        assert_eq!(
            words("getUserName(user_id)"),
            vec!["get", "user", "name", "user", "id"]
        );
        assert_eq!(words("HTTPServer"), vec!["httpserver"]);
        assert!(words("  {} ;").is_empty());
    }

    #[test]
    fn same_text_same_vector() {
        let backend = HashingBackend::new(64);
        assert_eq!(backend.embed("fun load()"), backend.embed("fun load()"));
    }

    #[test]
    fn empty_text_is_not_zero() {
        let backend = HashingBackend::new(8);
        let row = backend.embed("");
        assert!(row.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn cancelling_words_are_not_zero() {
        let backend = HashingBackend::new(384);
        let words: Vec<String> = (0..200).map(|i| format!("w{i}")).collect();
        let (a, b) = words
            .iter()
            .enumerate()
            .flat_map(|(i, a)| words[i + 1..].iter().map(move |b| (a, b)))
            .find(|(a, b)| {
                let (ba, sa) = backend.bucket(a);
                let (bb, sb) = backend.bucket(b);
                ba == bb && sa + sb == 0.0
            })
            .unwrap();

        let row = backend.embed(&format!("{a} {b}"));
        assert_eq!(row[0], 1.0);
        assert_eq!(row.iter().filter(|v| **v != 0.0).count(), 1);
    }

    #[test]
    fn shared_words_bring_texts_closer() {
        let backend = HashingBackend::new(4096);
        let a = backend.embed("loadUser repository cache");
        let b = backend.embed("user repository");
        let c = backend.embed("layout inflater view");
        let dot = |x: &[f32], y: &[f32]| x.iter().zip(y).map(|(p, q)| p * q).sum::<f32>();
        assert!(dot(&a, &b) > dot(&a, &c));
    }

    proptest! {
        #[test]
        fn rows_have_configured_dimension(text in ".{0,200}", dim in 1usize..512) {
            let backend = HashingBackend::new(dim);
            prop_assert_eq!(backend.embed(&text).len(), dim);
        }
    }
}

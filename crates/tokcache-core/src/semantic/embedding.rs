//! Deterministic text embeddings
//!
//! Maps text to a fixed-length unit vector for approximate matching only.
//! The vector is built from three sections over the normalized text:
//!
//! - **hash**: SHA-256 of `text + index`, first byte mapped into a small range
//! - **statistical**: length, character entropy, vowel ratio, digit ratio and
//!   average word length, each squashed with `tanh` and tiled across the section
//! - **n-gram**: character bigrams and trigrams feature-hashed (signed) into
//!   buckets, weighted by frequency and squashed with `tanh`
//!
//! The hash and statistical sections are scaled down (hash bytes land in
//! `±HASH_WEIGHT` rather than `[-1, 1]`) so that similarity is driven by
//! shared n-grams instead of per-text hash noise.
//!
//! The whole vector is then L2-normalized. No model, no I/O: identical text
//! and dimension always yield an identical vector.

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Hash section values lie in `[-HASH_WEIGHT, HASH_WEIGHT]`
const HASH_WEIGHT: f64 = 0.05;
/// Scale of each statistical feature after `tanh`
const STAT_WEIGHT: f64 = 0.1;
/// Gain applied to n-gram bucket sums before `tanh`
const NGRAM_GAIN: f64 = 8.0;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub const DEFAULT_DIMENSIONS: usize = 128;

/// Text to unit-vector mapper
#[derive(Debug, Clone)]
pub struct EmbeddingGenerator {
    dimensions: usize,
}

impl Default for EmbeddingGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl EmbeddingGenerator {
    /// # Panics
    /// If `dimensions < 3` (one slot per section is the minimum).
    pub fn new(dimensions: usize) -> Self {
        assert!(dimensions >= 3, "embedding needs at least 3 dimensions");
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn generate(&self, text: &str) -> Vec<f32> {
        let normalized = normalize_text(text);

        let hash_len = self.dimensions / 3;
        let stat_len = self.dimensions / 3;
        let ngram_len = self.dimensions - hash_len - stat_len;

        let mut vector = Vec::with_capacity(self.dimensions);
        hash_section(&normalized, hash_len, &mut vector);
        stat_section(&normalized, stat_len, &mut vector);
        ngram_section(&normalized, ngram_len, &mut vector);

        l2_normalize(&vector)
    }
}

/// Lowercase, strip punctuation, collapse whitespace
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    WHITESPACE.replace_all(&stripped, " ").trim().to_string()
}

fn hash_section(text: &str, len: usize, out: &mut Vec<f64>) {
    for i in 0..len {
        let digest = Sha256::digest(format!("{text}{i}").as_bytes());
        let value = f64::from(digest[0]) / 127.5 - 1.0;
        out.push(value * HASH_WEIGHT);
    }
}

fn stat_section(text: &str, len: usize, out: &mut Vec<f64>) {
    let chars: Vec<char> = text.chars().collect();
    let total = chars.len() as f64;

    let (entropy, vowel_ratio, digit_ratio) = if chars.is_empty() {
        (0.0, 0.0, 0.0)
    } else {
        let mut freq: HashMap<char, usize> = HashMap::new();
        for &c in &chars {
            *freq.entry(c).or_insert(0) += 1;
        }
        let entropy = freq
            .values()
            .map(|&n| {
                let p = n as f64 / total;
                -p * p.log2()
            })
            .sum::<f64>();
        let vowels = chars.iter().filter(|c| "aeiou".contains(**c)).count();
        let digits = chars.iter().filter(|c| c.is_ascii_digit()).count();
        (entropy, vowels as f64 / total, digits as f64 / total)
    };

    let words: Vec<&str> = text.split_whitespace().collect();
    let avg_word_len = if words.is_empty() {
        0.0
    } else {
        words.iter().map(|w| w.chars().count()).sum::<usize>() as f64 / words.len() as f64
    };

    // Centered so typical prose lands near zero
    let features = [
        ((total - 32.0) / 64.0).tanh(),
        (entropy - 4.0).tanh(),
        ((vowel_ratio - 0.35) * 5.0).tanh(),
        (digit_ratio * 5.0).tanh(),
        ((avg_word_len - 5.0) / 3.0).tanh(),
    ];

    out.extend(
        features
            .iter()
            .cycle()
            .take(len)
            .map(|f| f * STAT_WEIGHT),
    );
}

fn ngram_section(text: &str, len: usize, out: &mut Vec<f64>) {
    let chars: Vec<char> = text.chars().collect();
    let grams: Vec<String> = [2usize, 3]
        .iter()
        .flat_map(|&n| chars.windows(n).map(|w| w.iter().collect::<String>()))
        .collect();

    let mut buckets = vec![0.0f64; len];
    if !grams.is_empty() {
        let weight = 1.0 / grams.len() as f64;
        for gram in &grams {
            let h = fnv1a(gram.as_bytes());
            let sign = if (h >> 32) & 1 == 1 { 1.0 } else { -1.0 };
            buckets[(h % len as u64) as usize] += sign * weight;
        }
    }

    out.extend(buckets.into_iter().map(|b| (b * NGRAM_GAIN).tanh()));
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |h, &b| (h ^ u64::from(b)).wrapping_mul(FNV_PRIME))
}

/// Divide by the Euclidean norm; a zero vector is returned unchanged
fn l2_normalize(vector: &[f64]) -> Vec<f32> {
    let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vector.iter().map(|&x| x as f32).collect();
    }
    vector.iter().map(|&x| (x / norm) as f32).collect()
}

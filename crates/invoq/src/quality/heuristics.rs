//! Independent text signals that a description was misread by OCR.
//!
//! Base signals (alpha ratio, vowel-less tokens, noise) fire on their own.
//! The gibberish score and the weak consonant-cluster pattern only count when
//! a base signal already fired, which keeps long legitimate product names
//! from being flagged.

use std::sync::LazyLock;

use regex::Regex;

use super::allowlist::{is_domain_term, is_legitimate_word};
use super::dictionary::Dictionary;
use super::{WarnReason, WarnReasons};

static RE_PRODUCT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{2,5}-\d+$").unwrap());

const MIN_ALPHA_RATIO: f64 = 0.65;
const MIN_ALPHA_RATIO_LEN: usize = 5;
const NO_VOWEL_TOKEN_LEN: usize = 6;
const MAX_CONSONANT_RUN: usize = 4;
const MIN_SYMBOL_REPEAT: usize = 3;
const GIBBERISH_SHARE: f64 = 0.30;
const MIN_TYPO_TOKEN_LEN: usize = 4;

/// Computes every warn reason for a description.
pub fn description_warnings(text: &str, dictionary: &Dictionary) -> WarnReasons {
    let mut reasons = WarnReasons::new();
    let tokens: Vec<&str> = text.split_whitespace().collect();

    if has_low_alpha_ratio(&tokens) {
        reasons.insert(WarnReason::LowAlphaRatio);
    }
    if has_no_vowel_token(&tokens) {
        reasons.insert(WarnReason::NoVowelToken);
    }
    if has_ocr_noise(text, &tokens) {
        reasons.insert(WarnReason::OcrNoise);
    }

    let base_fired = !reasons.is_empty();

    if base_fired && gibberish_share(&tokens) > GIBBERISH_SHARE {
        reasons.insert(WarnReason::Gibberish);
    }

    for token in &tokens {
        let word = word_of(token);
        if is_legitimate_word(&word) {
            continue;
        }
        let shape = ClusterShape::of(&word);
        if shape.is_strong_misread() || (base_fired && shape.is_weak_misread()) {
            reasons.insert(WarnReason::ConsonantCluster);
            break;
        }
    }

    if has_typo(&tokens, dictionary) {
        reasons.insert(WarnReason::PossibleTypo);
    }

    reasons
}

fn is_vowel(c: char) -> bool {
    matches!(
        c.to_lowercase().next().unwrap_or(c),
        'a' | 'e' | 'i' | 'o' | 'u' | 'y'
            | 'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'æ'
            | 'è' | 'é' | 'ê' | 'ë'
            | 'ì' | 'í' | 'î' | 'ï'
            | 'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'œ'
            | 'ù' | 'ú' | 'û' | 'ü' | 'ý' | 'ÿ'
    )
}

fn is_consonant(c: char) -> bool {
    c.is_alphabetic() && !is_vowel(c)
}

/// Lowercased token with surrounding punctuation removed.
fn word_of(token: &str) -> String {
    token
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}

fn alpha_ratio(s: &str) -> f64 {
    let total = s.chars().filter(|c| !c.is_whitespace()).count();
    if total == 0 {
        return 0.0;
    }
    let alpha = s.chars().filter(|c| c.is_alphabetic()).count();
    alpha as f64 / total as f64
}

fn has_low_alpha_ratio(tokens: &[&str]) -> bool {
    let kept: String = tokens
        .iter()
        .filter(|t| !RE_PRODUCT_CODE.is_match(t))
        .copied()
        .collect();

    kept.chars().count() >= MIN_ALPHA_RATIO_LEN && alpha_ratio(&kept) < MIN_ALPHA_RATIO
}

fn is_vowelless_word(word: &str) -> bool {
    word.chars().count() >= NO_VOWEL_TOKEN_LEN
        && word.chars().all(char::is_alphabetic)
        && !word.chars().any(is_vowel)
}

fn has_no_vowel_token(tokens: &[&str]) -> bool {
    tokens.iter().any(|t| {
        let word = word_of(t);
        !is_legitimate_word(&word) && is_vowelless_word(&word)
    })
}

fn longest_consonant_run(word: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in word.chars() {
        if is_consonant(c) {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn has_repeated_symbols(text: &str) -> bool {
    let mut previous: Option<char> = None;
    let mut run = 0;
    for c in text.chars() {
        let is_symbol = !c.is_alphanumeric() && !c.is_whitespace();
        if is_symbol && previous == Some(c) {
            run += 1;
        } else if is_symbol {
            run = 1;
        } else {
            run = 0;
        }
        if run >= MIN_SYMBOL_REPEAT {
            return true;
        }
        previous = Some(c);
    }
    false
}

fn has_ocr_noise(text: &str, tokens: &[&str]) -> bool {
    if has_repeated_symbols(text) {
        return true;
    }
    tokens.iter().any(|t| {
        let word = word_of(t);
        !is_legitimate_word(&word) && longest_consonant_run(&word) > MAX_CONSONANT_RUN
    })
}

fn is_unusual_token(token: &str) -> bool {
    is_vowelless_word(&word_of(token)) || alpha_ratio(token) < 0.5
}

fn gibberish_share(tokens: &[&str]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let unusual = tokens.iter().filter(|t| is_unusual_token(t)).count();
    unusual as f64 / tokens.len() as f64
}

/// Letter-pattern statistics for one lowercase word.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClusterShape {
    len: usize,
    vowel_ratio: f64,
    /// Runs of exactly two distinct consonants ("pr", "nt"; not "tt").
    clusters: usize,
}

impl ClusterShape {
    fn of(word: &str) -> Self {
        let chars: Vec<char> = word.chars().collect();
        if chars.is_empty() || !chars.iter().all(|c| c.is_alphabetic()) {
            return Self {
                len: 0,
                vowel_ratio: 0.0,
                clusters: 0,
            };
        }

        let vowels = chars.iter().filter(|c| is_vowel(**c)).count();
        let mut clusters = 0;
        let mut i = 0;
        while i < chars.len() {
            if !is_consonant(chars[i]) {
                i += 1;
                continue;
            }
            let start = i;
            while i < chars.len() && is_consonant(chars[i]) {
                i += 1;
            }
            if i - start == 2 && chars[start] != chars[start + 1] {
                clusters += 1;
            }
        }

        Self {
            len: chars.len(),
            vowel_ratio: vowels as f64 / chars.len() as f64,
            clusters,
        }
    }

    fn density(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.clusters as f64 / self.len as f64
        }
    }

    /// Confident misreads such as "prontosaurvi" for "brontosaurus".
    fn is_strong_misread(&self) -> bool {
        self.len >= 10
            && self.clusters >= 3
            && (0.38..=0.45).contains(&self.vowel_ratio)
            && self.density() <= 0.3
    }

    fn is_weak_misread(&self) -> bool {
        self.len >= 8 && self.clusters >= 2 && (0.30..=0.50).contains(&self.vowel_ratio)
    }
}

fn is_acronym(token: &str) -> bool {
    token.chars().any(char::is_alphabetic)
        && token
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

fn has_typo(tokens: &[&str], dictionary: &Dictionary) -> bool {
    if !dictionary.is_ready() {
        return false;
    }

    tokens.iter().any(|raw| {
        let token = raw.trim_matches(|c: char| !c.is_alphanumeric());
        if token.chars().count() < MIN_TYPO_TOKEN_LEN
            || is_acronym(token)
            || token.chars().any(|c| c.is_ascii_digit())
            || !token.chars().all(char::is_alphabetic)
        {
            return false;
        }
        let word = token.to_lowercase();
        !is_domain_term(&word) && !dictionary.is_correct(&word)
    })
}

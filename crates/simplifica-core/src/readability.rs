//! Readability scoring with a Portuguese adaptation of Flesch reading ease.
//!
//! Formula: `248.835 - 1.015 * (words/sentences) - 84.6 * (syllables/words)`,
//! clamped to `0..=100`.
//!
//! Higher score = easier text. Sentences scoring below 70 are worth a
//! plain-language rewrite; below 50 they are hard for a lay reader.
//!
//! The coefficients are fixed. Changing them makes scores incomparable with
//! earlier runs, so they are constants rather than parameters.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Base constant of the Portuguese adaptation.
pub const BASE: f64 = 248.835;
/// Weight of the average sentence length (words per sentence).
pub const ASL_WEIGHT: f64 = 1.015;
/// Weight of the average word length (syllables per word).
pub const ASW_WEIGHT: f64 = 84.6;

/// Trimmed inputs shorter than this many characters are not scored.
pub const MIN_TEXT_CHARS: usize = 5;
/// Inputs with fewer words than this are not scored.
pub const MIN_WORDS: usize = 3;

/// Scores below this are [`Tier::Hard`].
pub const HARD_BELOW: f64 = 50.0;
/// Scores below this (and at least [`HARD_BELOW`]) are [`Tier::Medium`].
pub const MEDIUM_BELOW: f64 = 70.0;

/// Anything that is not a word character or whitespace.
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid regex"));

/// Runs of vowels, accented Portuguese vowels included.
static VOWEL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[aáàãâeéêiíoóõôuúü]+").expect("valid regex"));

/// Sentence delimiters for counting purposes.
static SENTENCE_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("valid regex"));

/// Coarse severity of a sentence's readability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Score at or above 70. Never highlighted.
    Easy,
    /// Score in `50..70`.
    Medium,
    /// Score below 50.
    Hard,
}

impl Tier {
    /// Classify a score.
    pub fn from_score(score: f64) -> Self {
        if score < HARD_BELOW {
            Self::Hard
        } else if score < MEDIUM_BELOW {
            Self::Medium
        } else {
            Self::Easy
        }
    }

    /// Lowercase name, used for marker styling (`sai-hard`, `sai-medium`).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Finer five-way split of the score, used for labels and colours.
///
/// Every band maps onto exactly one [`Tier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Band {
    /// Below 30.
    VeryHard,
    /// 30 to 50.
    Hard,
    /// 50 to 60.
    Moderate,
    /// 60 to 70.
    FairlySimple,
    /// 70 and above.
    VerySimple,
}

impl Band {
    /// Classify a score.
    pub fn from_score(score: f64) -> Self {
        if score < 30.0 {
            Self::VeryHard
        } else if score < HARD_BELOW {
            Self::Hard
        } else if score < 60.0 {
            Self::Moderate
        } else if score < MEDIUM_BELOW {
            Self::FairlySimple
        } else {
            Self::VerySimple
        }
    }

    /// The tier this band belongs to.
    pub const fn tier(&self) -> Tier {
        match self {
            Self::VeryHard | Self::Hard => Tier::Hard,
            Self::Moderate | Self::FairlySimple => Tier::Medium,
            Self::VerySimple => Tier::Easy,
        }
    }

    /// User-facing label.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::VeryHard => "Muito Complexo",
            Self::Hard => "Complexo",
            Self::Moderate => "Moderado",
            Self::FairlySimple => "Relativamente Simples",
            Self::VerySimple => "Muito Simples",
        }
    }

    /// Display colour as a hex string.
    pub const fn color(&self) -> &'static str {
        match self.tier() {
            Tier::Hard => "#EF4444",
            Tier::Medium => "#F59E0B",
            Tier::Easy => "#10B981",
        }
    }
}

/// Result of scoring a piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReadabilityResult {
    /// Reading-ease score in `0..=100`.
    pub score: f64,
    /// Severity tier derived from the score.
    pub tier: Tier,
    /// Five-way band derived from the score.
    pub band: Band,
    /// Number of words after punctuation stripping.
    pub word_count: usize,
    /// Number of sentence fragments (at least 1).
    pub sentence_count: usize,
    /// Estimated syllables across all words.
    pub syllable_count: usize,
    /// Average sentence length in words.
    pub avg_sentence_length: f64,
    /// Average syllables per word.
    pub avg_syllables_per_word: f64,
}

/// Score text for readability.
///
/// Returns `None` for input too short to judge: fewer than
/// [`MIN_TEXT_CHARS`] characters after trimming, or fewer than
/// [`MIN_WORDS`] words. That is a defined outcome, not an error.
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
pub fn score(text: &str) -> Option<ReadabilityResult> {
    let text = text.trim();
    if text.chars().count() < MIN_TEXT_CHARS {
        return None;
    }

    let words = extract_words(text);
    if words.len() < MIN_WORDS {
        return None;
    }

    let sentence_count = count_sentences(text);
    let syllable_count: usize = words.iter().map(|w| count_syllables(w)).sum();
    let word_count = words.len();

    let asl = word_count as f64 / sentence_count as f64;
    let asw = syllable_count as f64 / word_count as f64;
    // Unfused, so scores match the published formula to the last bit.
    #[allow(clippy::suboptimal_flops)]
    let score = (BASE - ASL_WEIGHT * asl - ASW_WEIGHT * asw).clamp(0.0, 100.0);

    Some(ReadabilityResult {
        score,
        tier: Tier::from_score(score),
        band: Band::from_score(score),
        word_count,
        sentence_count,
        syllable_count,
        avg_sentence_length: asl,
        avg_syllables_per_word: asw,
    })
}

/// Estimate the syllables in one Portuguese word.
///
/// Words of one or two letters count as one syllable. Longer words count
/// one syllable per run of consecutive vowels, so diphthongs and
/// triphthongs collapse into a single unit. Never returns less than 1.
pub fn count_syllables(word: &str) -> usize {
    let lower = word.trim().to_lowercase();
    if lower.chars().count() <= 2 {
        return 1;
    }
    VOWEL_RUN.find_iter(&lower).count().max(1)
}

/// Split text into words after replacing punctuation with spaces.
fn extract_words(text: &str) -> Vec<String> {
    NON_WORD
        .replace_all(text, " ")
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Count non-empty fragments between runs of `.`, `!` and `?`.
fn count_sentences(text: &str) -> usize {
    SENTENCE_DELIMITERS
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count()
        .max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_short_inputs_are_not_scored() {
        assert!(score("").is_none());
        assert!(score("    ").is_none());
        assert!(score("Olá").is_none());
        assert!(score("abcd").is_none());
        // Long enough but only two words.
        assert!(score("Frase simples.").is_none());
    }

    #[test]
    fn whitespace_around_input_is_ignored() {
        let text = "O gato subiu no telhado da casa.";
        assert_eq!(score(&format!("  {text}\n\t")), score(text));
    }

    #[test]
    fn score_follows_the_literal_formula() {
        let r = score("A empresa publicou o relatório anual ontem.").unwrap();
        assert_eq!((r.word_count, r.sentence_count, r.syllable_count), (7, 1, 16));
        let expected: f64 = 248.835 - 1.015 * (7.0 / 1.0) - 84.6 * (16.0 / 7.0);
        assert_eq!(r.score.to_bits(), expected.to_bits());
        assert_eq!(r.tier, Tier::Hard);
    }

    #[test]
    fn scoring_is_deterministic() {
        let text = "A implementação da reestruturação organizacional necessitou de protocolos.";
        let a = score(text).unwrap();
        let b = score(text).unwrap();
        assert_eq!(a.score.to_bits(), b.score.to_bits());
    }

    #[test]
    fn long_sentence_is_not_easy() {
        let r = score("Frase muito mais complicada e extensa que deveria ser marcada.").unwrap();
        assert_eq!(r.word_count, 10);
        assert_eq!(r.syllable_count, 21);
        assert_eq!(r.sentence_count, 1);
        assert_eq!(r.tier, Tier::Medium);
        assert!((r.score - 61.025).abs() < 1e-9);
    }

    #[test]
    fn bureaucratic_prose_is_hard() {
        let r = score(
            "A implementação da reestruturação organizacional necessitou do estabelecimento \
             de protocolos interdepartamentais de comunicação institucional.",
        )
        .unwrap();
        assert_eq!(r.tier, Tier::Hard);
        assert_eq!(r.band, Band::VeryHard);
    }

    #[test]
    fn short_plain_sentences_are_easy() {
        let r = score("O sol é bom. A casa é boa. Eu vou lá.").unwrap();
        assert_eq!(r.sentence_count, 3);
        assert_eq!(r.tier, Tier::Easy);
        assert!(r.score <= 100.0);
    }

    #[test]
    fn syllables_collapse_vowel_runs() {
        assert_eq!(count_syllables("é"), 1);
        assert_eq!(count_syllables("lá"), 1);
        assert_eq!(count_syllables("casa"), 2);
        assert_eq!(count_syllables("muito"), 2);
        assert_eq!(count_syllables("que"), 1);
        assert_eq!(count_syllables("Paraguai"), 3);
        assert_eq!(count_syllables("comunicação"), 5);
        assert_eq!(count_syllables("2024"), 1);
    }

    #[test]
    fn sentence_count_ignores_empty_fragments() {
        assert_eq!(count_sentences("Um. Dois!! Três?"), 3);
        assert_eq!(count_sentences("sem pontuação"), 1);
        assert_eq!(count_sentences("...?!"), 1);
    }

    #[test]
    fn tier_breakpoints() {
        assert_eq!(Tier::from_score(0.0), Tier::Hard);
        assert_eq!(Tier::from_score(49.99), Tier::Hard);
        assert_eq!(Tier::from_score(50.0), Tier::Medium);
        assert_eq!(Tier::from_score(69.99), Tier::Medium);
        assert_eq!(Tier::from_score(70.0), Tier::Easy);
    }

    #[test]
    fn bands_agree_with_tiers() {
        for s in [0.0, 10.0, 29.9, 30.0, 45.0, 50.0, 59.9, 60.0, 69.9, 70.0, 100.0] {
            assert_eq!(Band::from_score(s).tier(), Tier::from_score(s), "score {s}");
        }
        assert_eq!(Band::from_score(55.0).label(), "Moderado");
    }
}

//! Sentence segmentation.
//!
//! Turns a text snapshot into ordered [`SentenceUnit`]s. Two strategies share
//! one contract: units come out in source order, are trimmed of surrounding
//! whitespace, and every non-whitespace character of the input lands in
//! exactly one unit. Offsets are byte offsets into the snapshot and go stale
//! as soon as the text changes.

use std::sync::LazyLock;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::dictionaries::abbreviations::{
    is_abbreviation, is_letter_abbreviation, is_terminal_abbreviation,
};

/// Greedy sentence pattern: text up to a terminator run, or the unterminated tail.
static SIMPLE_SENTENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]*[.!?]+|[^.!?]+$").expect("valid regex"));

/// A maximal sentence-like span of a text snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SentenceUnit {
    /// The sentence, verbatim from the snapshot.
    pub text: String,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

/// Which segmentation strategy to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SegmenterKind {
    /// Portuguese-aware boundaries: abbreviations, initials, ellipses,
    /// lowercase continuations and paragraph breaks.
    #[default]
    Locale,
    /// Punctuation-only greedy matching.
    Simple,
}

/// Segment text with the default (Portuguese-aware) strategy.
pub fn segment(text: &str) -> Vec<SentenceUnit> {
    segment_with(text, SegmenterKind::Locale)
}

/// Segment text with the given strategy.
#[tracing::instrument(skip(text), fields(text_len = text.len()))]
pub fn segment_with(text: &str, kind: SegmenterKind) -> Vec<SentenceUnit> {
    let units = match kind {
        SegmenterKind::Locale => segment_locale(text),
        SegmenterKind::Simple => segment_simple(text),
    };
    tracing::debug!(units = units.len(), "segmented text");
    units
}

/// Split text into paragraphs (separated by blank lines).
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.split("\n\n")
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

fn segment_simple(text: &str) -> Vec<SentenceUnit> {
    SIMPLE_SENTENCE
        .find_iter(text)
        .filter_map(|m| unit(text, m.start(), m.end()))
        .collect()
}

fn segment_locale(text: &str) -> Vec<SentenceUnit> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut units = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < chars.len() {
        let (pos, ch) = chars[i];

        // Line breaks are hard boundaries, like paragraph separators.
        if ch == '\n' {
            units.extend(unit(text, start, pos));
            start = pos + ch.len_utf8();
            i += 1;
            continue;
        }

        if !is_terminator(ch) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        while j < chars.len() && (is_terminator(chars[j].1) || is_closing(chars[j].1)) {
            j += 1;
        }
        let end = chars.get(j).map_or(text.len(), |&(p, _)| p);
        let followed_by_space = chars.get(j).is_none_or(|&(_, c)| c.is_whitespace());

        if followed_by_space && is_boundary(&chars, i, j) {
            units.extend(unit(text, start, end));
            start = end;
        }
        i = j;
    }

    units.extend(unit(text, start, text.len()));
    units
}

/// Build a trimmed unit from `text[start..end]`, or `None` if it is blank.
fn unit(text: &str, start: usize, end: usize) -> Option<SentenceUnit> {
    let span = &text[start..end];
    let trimmed = span.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lead = span.len() - span.trim_start().len();
    let start = start + lead;
    Some(SentenceUnit {
        text: trimmed.to_string(),
        start,
        end: start + trimmed.len(),
    })
}

const fn is_terminator(ch: char) -> bool {
    matches!(ch, '.' | '!' | '?')
}

const fn is_closing(ch: char) -> bool {
    matches!(ch, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

const fn is_opening(ch: char) -> bool {
    matches!(ch, '"' | '\'' | '(' | '[' | '“' | '‘' | '«' | '—' | '-')
}

/// Decide whether the terminator run `chars[run_start..run_end]` ends a sentence.
fn is_boundary(chars: &[(usize, char)], run_start: usize, run_end: usize) -> bool {
    let next = chars[run_end..]
        .iter()
        .map(|&(_, c)| c)
        .find(|&c| !c.is_whitespace() && !is_opening(c));
    let Some(next) = next else {
        return true;
    };

    let run: Vec<char> = chars[run_start..run_end]
        .iter()
        .map(|&(_, c)| c)
        .filter(|&c| is_terminator(c))
        .collect();

    if run.iter().any(|&c| c == '!' || c == '?') {
        return true;
    }

    // Ellipsis continues the sentence unless a capital follows.
    if run.len() > 1 {
        return next.is_uppercase();
    }

    let word = word_before(chars, run_start);
    if is_terminal_abbreviation(&word) {
        return next.is_uppercase();
    }
    if is_abbreviation(&word) {
        return false;
    }
    if is_initial(&word) {
        return false;
    }
    if is_letter_abbreviation(&word) && next.is_ascii_digit() {
        return false;
    }

    !next.is_lowercase()
}

/// The word immediately before position `pos`, inner periods included.
fn word_before(chars: &[(usize, char)], pos: usize) -> String {
    let mut word: Vec<char> = chars[..pos]
        .iter()
        .rev()
        .map(|&(_, c)| c)
        .take_while(|&c| c.is_alphanumeric() || c == '.' || c == 'º' || c == '/')
        .collect();
    word.reverse();
    word.into_iter().collect()
}

/// A single capital letter, as in "J. Silva".
fn is_initial(word: &str) -> bool {
    let mut chars = word.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(units: &[SentenceUnit]) -> Vec<&str> {
        units.iter().map(|u| u.text.as_str()).collect()
    }

    fn non_whitespace(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn assert_lossless(input: &str, kind: SegmenterKind) {
        let units = segment_with(input, kind);
        let joined: String = units.iter().map(|u| u.text.as_str()).collect();
        assert_eq!(non_whitespace(&joined), non_whitespace(input), "{kind:?}: {input:?}");
        for u in &units {
            assert_eq!(&input[u.start..u.end], u.text);
        }
        assert!(units.windows(2).all(|w| w[0].end <= w[1].start));
    }

    #[test]
    fn basic_sentences() {
        let units = segment("Frase simples. Frase muito mais complicada e extensa.");
        assert_eq!(
            texts(&units),
            vec!["Frase simples.", "Frase muito mais complicada e extensa."]
        );
        assert_eq!(units[0].start, 0);
        assert_eq!(units[1].start, 15);
    }

    #[test]
    fn abbreviations_not_split() {
        let units = segment("O Sr. Silva chegou cedo. A Dra. Ana saiu.");
        assert_eq!(texts(&units), vec!["O Sr. Silva chegou cedo.", "A Dra. Ana saiu."]);
    }

    #[test]
    fn single_letter_before_capital_ends_sentence() {
        let units = segment("Marque a opção p. Depois envie o formulário ao setor.");
        assert_eq!(
            texts(&units),
            vec!["Marque a opção p.", "Depois envie o formulário ao setor."]
        );
        assert_eq!(segment("Escolha o item n. Em seguida, salve.").len(), 2);
    }

    #[test]
    fn single_letter_references_stay_joined() {
        assert_eq!(segment("Veja a p. 12 do relatório. Depois leia.").len(), 2);
        assert_eq!(segment("Consulte o n. 5 da lista e a p. seguinte.").len(), 1);
    }

    #[test]
    fn etc_ends_sentence_before_capital() {
        let units = segment("Comprei arroz, feijão etc. Depois voltei.");
        assert_eq!(units.len(), 2);
        let units = segment("Comprei arroz, feijão etc. e voltei.");
        assert_eq!(units.len(), 1);
    }

    #[test]
    fn decimals_urls_and_initials() {
        assert_eq!(segment("O valor é 3.14 hoje. Certo.").len(), 2);
        assert_eq!(segment("Veja www.gov.br agora. Ok.").len(), 2);
        assert_eq!(segment("Falei com J. Silva ontem. Ele veio.").len(), 2);
    }

    #[test]
    fn question_and_exclamation() {
        let units = segment("Você vem? Sim! Vou agora.");
        assert_eq!(texts(&units), vec!["Você vem?", "Sim!", "Vou agora."]);
    }

    #[test]
    fn ellipsis_continues_before_lowercase() {
        assert_eq!(segment("Eu pensei... talvez amanhã.").len(), 1);
        assert_eq!(segment("Eu pensei... Talvez amanhã.").len(), 2);
    }

    #[test]
    fn closing_quotes_stay_with_sentence() {
        let units = segment("Ele disse \"basta.\" Depois saiu.");
        assert_eq!(texts(&units), vec!["Ele disse \"basta.\"", "Depois saiu."]);
    }

    #[test]
    fn line_breaks_are_boundaries() {
        let units = segment("Título sem ponto\nPrimeira linha. Segunda");
        assert_eq!(texts(&units), vec!["Título sem ponto", "Primeira linha.", "Segunda"]);
    }

    #[test]
    fn simple_strategy_matches_greedy_pattern() {
        let units = segment_with("Um. Dois! Três? resto sem fim", SegmenterKind::Simple);
        assert_eq!(texts(&units), vec!["Um.", "Dois!", "Três?", "resto sem fim"]);
        // The simple strategy splits after abbreviations.
        assert_eq!(segment_with("O Sr. Silva.", SegmenterKind::Simple).len(), 2);
    }

    #[test]
    fn both_strategies_are_lossless() {
        let inputs = [
            "",
            "   ",
            "Sem pontuação nenhuma",
            "?? Começa com pontuação. E termina sem",
            "Frase simples.  Outra frase!\n\nParágrafo novo... continua? Sim.",
            "Ele disse \"basta.\" (E saiu.) Fim",
            "Coração, ação e emoção. Três palavras!",
        ];
        for input in inputs {
            assert_lossless(input, SegmenterKind::Locale);
            assert_lossless(input, SegmenterKind::Simple);
        }
    }

    #[test]
    fn empty_input() {
        assert!(segment("").is_empty());
        assert!(segment("  \n ").is_empty());
        assert!(segment_with("", SegmenterKind::Simple).is_empty());
    }

    #[test]
    fn split_paragraphs_basic() {
        let paras = split_paragraphs("Primeiro.\n\nSegundo.\n\n\n\nTerceiro.");
        assert_eq!(paras, vec!["Primeiro.", "Segundo.", "Terceiro."]);
    }
}

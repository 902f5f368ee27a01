//! Portuguese abbreviation dictionary for sentence boundary detection.
//!
//! A period after one of these words does not end the sentence, with the
//! exception of [`TERMINAL_ABBREVIATIONS`], which commonly close one.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Abbreviations that should not trigger sentence breaks.
pub static ABBREVIATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    let mut set = HashSet::new();

    // Forms of address and titles
    set.extend([
        "sr", "sra", "srs", "sras", "srta", "dr", "dra", "drs", "dras", "prof", "profa", "profs",
        "eng", "enga", "exmo", "exma", "ilmo", "ilma", "pe", "revmo", "v.ex", "v.exa", "v.s",
        "v.sa", "gen", "cel", "cap", "ten", "sgt", "dep", "sen", "pres",
    ]);

    // Addresses
    set.extend([
        "av", "rod", "pça", "pç", "al", "trav", "lgo", "apto", "ap", "bl", "cj", "qd",
        "lt", "km", "cep", "s/n",
    ]);

    // Months (as written in dates); "mar" and "dez" are also common words
    set.extend(["jan", "fev", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov"]);

    // References and citations
    set.extend([
        "pág", "pag", "págs", "pp", "cap", "art", "arts", "inc", "fig", "tab", "vol",
        "ed", "nº", "núm", "obs", "cf", "ex", "op. cit", "ibid", "id", "et al", "sec",
        "séc", "a.c", "d.c", "tel", "cel",
    ]);

    // Business
    set.extend(["ltda", "cia", "s.a", "s/a", "depto", "dept", "adm", "coord"]);

    // Measurement and common shortenings
    set.extend(["aprox", "máx", "mín", "hab", "qtd", "qtde", "etc"]);

    set
});

/// Abbreviations that frequently end a sentence. A following capital letter
/// still marks a boundary after these.
pub const TERMINAL_ABBREVIATIONS: &[&str] = &["etc"];

/// Single-letter abbreviations ("p. 12", "n. 5", "r. das Flores"). A bare
/// letter also ends sentences, so these only hold the sentence open when a
/// number or a lowercase word follows.
pub const LETTER_ABBREVIATIONS: &[&str] = &["p", "n", "r"];

/// Check if a word is a known abbreviation.
pub fn is_abbreviation(word: &str) -> bool {
    let word_lower = word.to_lowercase();
    let trimmed = word_lower.trim_matches('.');
    ABBREVIATIONS.contains(trimmed)
}

/// Check if a word is an abbreviation that may also close a sentence.
pub fn is_terminal_abbreviation(word: &str) -> bool {
    let word_lower = word.to_lowercase();
    TERMINAL_ABBREVIATIONS.contains(&word_lower.trim_matches('.'))
}

/// Check if a word is a single-letter abbreviation.
pub fn is_letter_abbreviation(word: &str) -> bool {
    let word_lower = word.to_lowercase();
    LETTER_ABBREVIATIONS.contains(&word_lower.trim_matches('.'))
}

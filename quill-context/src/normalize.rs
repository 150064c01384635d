//! Document text normalization.
//!
//! Normalization runs once over the whole document before chunking. The
//! default [`NormalizeMode::Readable`] mode keeps the text human-readable:
//! it removes bracketed citation markers (`[12]`) and any character outside
//! a fixed allow-list of ASCII alphanumerics, whitespace, and sentence
//! punctuation. The output is pure ASCII, so byte offsets into it are also
//! character offsets; the chunker relies on this.
//!
//! [`NormalizeMode::Keyword`] is a stricter variant for keyword-style
//! matching: lowercase, letters only, English stop-words removed, and each
//! token reduced by a small suffix stemmer.
//!
//! Both modes are idempotent: `normalize(normalize(x)) == normalize(x)`.

use regex::Regex;

/// Punctuation retained by readable normalization, matching what the
/// retrieval pipeline needs for legible context passages.
const ALLOWED_PUNCTUATION: &[char] = &[
    '.', ',', '!', '?', ';', ':', '(', ')', '[', ']', '{', '}', '\'', '"',
];

/// English stop-words dropped by keyword normalization.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "do", "does", "for",
    "from", "had", "has", "have", "he", "her", "his", "i", "if", "in", "into", "is", "it", "its",
    "no", "not", "of", "on", "or", "our", "she", "so", "such", "that", "the", "their", "them",
    "then", "there", "these", "they", "this", "to", "was", "we", "were", "what", "when", "which",
    "who", "will", "with", "you", "your",
];

/// Which normalization variant to apply to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NormalizeMode {
    /// Strip citation markers and disallowed characters, keep readability.
    #[default]
    Readable,
    /// Lowercase, letters only, stop-words removed, tokens stemmed.
    Keyword,
}

/// Normalizes raw document text ahead of chunking.
///
/// Holds the compiled citation-marker pattern so repeated calls do not
/// recompile it.
#[derive(Debug, Clone)]
pub struct Normalizer {
    citation: Regex,
    mode: NormalizeMode,
}

impl Normalizer {
    pub fn new(mode: NormalizeMode) -> Self {
        Self {
            citation: Regex::new(r"\[\d+\]").expect("citation pattern is valid"),
            mode,
        }
    }

    pub fn mode(&self) -> NormalizeMode {
        self.mode
    }

    /// Normalize `raw` according to the configured mode.
    ///
    /// Pure and idempotent. Returns an empty string only when the input
    /// contains no allowed characters at all.
    pub fn normalize(&self, raw: &str) -> String {
        match self.mode {
            NormalizeMode::Readable => self.normalize_readable(raw),
            NormalizeMode::Keyword => normalize_keyword(raw),
        }
    }

    fn normalize_readable(&self, raw: &str) -> String {
        // Filter first, strip citations second: filtering can merge the
        // pieces of a marker that was interrupted by disallowed characters
        // ("[1§]" becomes "[1]"), and markers must not survive one pass.
        let filtered: String = raw
            .chars()
            .filter_map(|c| {
                if c.is_ascii_alphanumeric() || ALLOWED_PUNCTUATION.contains(&c) {
                    Some(c)
                } else if c.is_whitespace() {
                    // Non-ASCII whitespace collapses to a plain space so the
                    // output stays ASCII.
                    Some(if c.is_ascii() { c } else { ' ' })
                } else {
                    None
                }
            })
            .collect();

        // Removing a marker can expose a new one ("[[12]3]" leaves "[3]"),
        // so strip to a fixed point. Each round shrinks the string.
        let mut text = filtered;
        loop {
            let next = self.citation.replace_all(&text, "").into_owned();
            if next.len() == text.len() {
                return next;
            }
            text = next;
        }
    }
}

fn normalize_keyword(raw: &str) -> String {
    let mut tokens = Vec::new();
    for word in raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphabetic() {
                c.to_ascii_lowercase()
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
    {
        let stemmed = stem(word);
        if stemmed.is_empty() || STOP_WORDS.contains(&stemmed.as_str()) {
            continue;
        }
        tokens.push(stemmed);
    }
    tokens.join(" ")
}

/// Reduce a lowercase token by stripping common English suffixes.
///
/// Stripping is iterated to a fixed point ("applies" -> "apply" -> "app"
/// would otherwise depend on how many passes ran), which makes the whole
/// keyword normalization idempotent.
fn stem(token: &str) -> String {
    let mut current = token.to_string();
    loop {
        let next = strip_suffix_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_suffix_once(token: &str) -> String {
    const SUFFIXES: &[(&str, &str)] = &[
        ("ies", "y"),
        ("ing", ""),
        ("ed", ""),
        ("ly", ""),
        ("es", ""),
        ("s", ""),
    ];
    for (suffix, replacement) in SUFFIXES {
        if let Some(stemmed) = token.strip_suffix(suffix) {
            // Keep short words intact; "was" should not become "wa".
            if stemmed.len() >= 3 && !(*suffix == "s" && stemmed.ends_with('s')) {
                return format!("{stemmed}{replacement}");
            }
        }
    }
    token.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_citation_markers() {
        let normalizer = Normalizer::new(NormalizeMode::Readable);
        assert_eq!(
            normalizer.normalize("Attention is all you need [1], see also [23]."),
            "Attention is all you need , see also ."
        );
    }

    #[test]
    fn keeps_allowed_punctuation() {
        let normalizer = Normalizer::new(NormalizeMode::Readable);
        let text = r#"Hello, world! (It works: "yes"; {fine}.)"#;
        assert_eq!(normalizer.normalize(text), text);
    }

    #[test]
    fn drops_disallowed_characters() {
        let normalizer = Normalizer::new(NormalizeMode::Readable);
        assert_eq!(normalizer.normalize("cafe\u{301} — 50% of $10"), "cafe  50 of 10");
    }

    #[test]
    fn non_ascii_whitespace_becomes_space() {
        let normalizer = Normalizer::new(NormalizeMode::Readable);
        assert_eq!(normalizer.normalize("a\u{00a0}b\u{2003}c"), "a b c");
    }

    #[test]
    fn readable_is_idempotent() {
        let normalizer = Normalizer::new(NormalizeMode::Readable);
        for input in [
            "plain text",
            "citations [1] and [234]",
            "[[12]3] nested",
            "[1§] interrupted marker",
            "mixed — punctuation: (kept) …dropped",
            "",
        ] {
            let once = normalizer.normalize(input);
            assert_eq!(normalizer.normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn keyword_is_idempotent() {
        let normalizer = Normalizer::new(NormalizeMode::Keyword);
        for input in [
            "The Transformer relies on self-attention mechanisms.",
            "Applies, applied, applying!",
            "Stories about classes of wasps",
        ] {
            let once = normalizer.normalize(input);
            assert_eq!(normalizer.normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn keyword_removes_stop_words_and_stems() {
        let normalizer = Normalizer::new(NormalizeMode::Keyword);
        assert_eq!(
            normalizer.normalize("The model relies on the attention mechanism"),
            "model rely attention mechanism"
        );
    }

    #[test]
    fn only_disallowed_input_becomes_empty() {
        let normalizer = Normalizer::new(NormalizeMode::Readable);
        assert_eq!(normalizer.normalize("§±∆"), "");
        // But anything allowed survives.
        assert!(!normalizer.normalize("x§").is_empty());
    }
}

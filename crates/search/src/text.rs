/// Fold text into the comparable form used by every scorer: lower-case, Latin
/// diacritics removed, `й`/`ё` folded to `и`/`е`, and every run of characters
/// outside `[a-z]`, `[а-яё]` and `[0-9]` collapsed into one space.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars().flat_map(char::to_lowercase) {
        match fold(ch) {
            Some(ch) if is_word_char(ch) => {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push(ch);
            }
            Some(_) => pending_space = true,
            // Combining marks vanish without splitting the word.
            None => {}
        }
    }
    out
}

fn fold(ch: char) -> Option<char> {
    if ('\u{0300}'..='\u{036f}').contains(&ch) {
        return None;
    }
    Some(match ch {
        'й' => 'и',
        'ё' => 'е',
        other => nucleo_matcher::chars::normalize(other),
    })
}

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_lowercase() || ch.is_ascii_digit() || ('а'..='я').contains(&ch) || ch == 'ё'
}

/// A parsed suggestion query.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryTokens {
    /// Normalized tokens, in input order
    pub tokens: Vec<String>,

    /// Last whitespace-delimited token of the raw input, as typed
    pub raw_last: String,
}

impl QueryTokens {
    pub fn parse(input: &str) -> Self {
        let tokens = normalize(input)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let raw_last = input
            .split_whitespace()
            .last()
            .unwrap_or_default()
            .to_string();
        Self { tokens, raw_last }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Combined character length of all tokens.
    pub fn total_len(&self) -> usize {
        self.tokens.iter().map(|t| t.chars().count()).sum()
    }

    /// A single long token satisfies this on its own; several short ones
    /// count together.
    pub fn meets_min_length(&self, min: usize) -> bool {
        !self.is_empty() && self.total_len() >= min
    }

    /// Whether the raw last token carries anything a remote lookup can match.
    pub fn has_lookup_token(&self) -> bool {
        !normalize(&self.raw_last).is_empty()
    }

    /// Cache key fragment identifying the normalized query.
    pub fn signature(&self) -> String {
        self.tokens.join(" ")
    }
}

/// Replace the last whitespace-delimited token of `input` with `replacement`.
/// Trailing whitespace counts as an empty last token.
pub fn replace_last_token(input: &str, replacement: &str) -> String {
    let start = input
        .char_indices()
        .rev()
        .find(|(_, ch)| ch.is_whitespace())
        .map_or(0, |(idx, ch)| idx + ch.len_utf8());
    format!("{}{replacement}", &input[..start])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn normalize_folds_case_and_punctuation() {
        assert_eq!(normalize("  Бетон, М-200!  "), "бетон м 200");
        assert_eq!(normalize("01-01-001"), "01 01 001");
        assert_eq!(normalize("***"), "");
    }

    #[test]
    fn normalize_strips_diacritics() {
        assert_eq!(normalize("Café Crème"), "cafe creme");
        assert_eq!(normalize("cafe\u{0301}"), "cafe");
        assert_eq!(normalize("Ёмкость стройки"), "емкость строики");
    }

    #[test]
    fn parse_keeps_raw_last_token() {
        let query = QueryTokens::parse("Бетон  М-20");
        assert_eq!(query.tokens, vec!["бетон", "м", "20"]);
        assert_eq!(query.raw_last, "М-20");
        assert_eq!(query.signature(), "бетон м 20");
        assert_eq!(query.total_len(), 8);
    }

    #[test]
    fn empty_input_has_no_tokens() {
        let query = QueryTokens::parse("  -- ");
        assert!(query.is_empty());
        assert!(!query.meets_min_length(0));
        assert_eq!(query.raw_last, "--");
        assert!(!query.has_lookup_token());
    }

    #[test]
    fn punctuation_only_last_token_is_not_looked_up() {
        let query = QueryTokens::parse("бетон --");
        assert_eq!(query.tokens, vec!["бетон"]);
        assert_eq!(query.raw_last, "--");
        assert!(!query.has_lookup_token());
        assert!(QueryTokens::parse("бетон М-20").has_lookup_token());
    }

    #[test]
    fn min_length_counts_tokens_together() {
        let query = QueryTokens::parse("a b");
        assert!(query.meets_min_length(2));
        assert!(!query.meets_min_length(3));
    }

    #[test]
    fn replace_last_token_keeps_prefix() {
        assert_eq!(replace_last_token("бетон кла", "Класс"), "бетон Класс");
        assert_eq!(replace_last_token("кла", "01-01"), "01-01");
        assert_eq!(replace_last_token("бетон ", "B15"), "бетон B15");
        assert_eq!(replace_last_token("", "x"), "x");
    }
}

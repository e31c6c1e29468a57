// ABOUTME: Text tokenizer splitting strings into word/number/punctuation/whitespace atoms.
// ABOUTME: Provides token counting used by the candidate scorer and a Jaro-Winkler wrapper.

/// Category of a single token produced by [`tokenize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Word,
    Number,
    PunctuationMark,
    WhiteSpace,
    Other,
}

/// A token is a maximal run of characters sharing one [`TokenKind`],
/// borrowed from the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub kind: TokenKind,
}

fn classify(ch: char) -> TokenKind {
    if ch.is_whitespace() {
        TokenKind::WhiteSpace
    } else if ch.is_numeric() {
        TokenKind::Number
    } else if ch.is_alphabetic() {
        TokenKind::Word
    } else if ch.is_ascii_punctuation() || is_unicode_punctuation(ch) {
        TokenKind::PunctuationMark
    } else {
        TokenKind::Other
    }
}

fn is_unicode_punctuation(ch: char) -> bool {
    // General punctuation, CJK symbols, Arabic comma/semicolon ranges.
    matches!(ch as u32,
        0x2000..=0x206F
        | 0x3000..=0x303F
        | 0x060C..=0x061F
        | 0x066A..=0x066D
        | 0x2E00..=0x2E7F
        | 0xFE10..=0xFE19
        | 0xFE50..=0xFE6F
        | 0xFF01..=0xFF0F
        | 0xFF1A..=0xFF20
        | 0xFF3B..=0xFF40
        | 0xFF5B..=0xFF65)
}

/// Splits `text` into maximal same-kind runs. Word and number runs absorb
/// each other's characters only at kind boundaries; every kind switch ends
/// the current token.
pub fn tokenize(text: &str) -> Tokens<'_> {
    Tokens { text, pos: 0 }
}

pub struct Tokens<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for Tokens<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let rest = &self.text[self.pos..];
        let mut chars = rest.char_indices();
        let (_, first) = chars.next()?;
        let kind = classify(first);
        let mut end = rest.len();
        for (idx, ch) in chars {
            if classify(ch) != kind {
                end = idx;
                break;
            }
        }
        let token = Token {
            text: &rest[..end],
            kind,
        };
        self.pos += end;
        Some(token)
    }
}

/// Per-kind token tallies over a text fragment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenCounts {
    pub words: usize,
    pub numbers: usize,
    pub punctuation: usize,
    pub whitespace: usize,
    pub other: usize,
}

impl TokenCounts {
    pub fn add(&mut self, kind: TokenKind) {
        match kind {
            TokenKind::Word => self.words += 1,
            TokenKind::Number => self.numbers += 1,
            TokenKind::PunctuationMark => self.punctuation += 1,
            TokenKind::WhiteSpace => self.whitespace += 1,
            TokenKind::Other => self.other += 1,
        }
    }

    pub fn merge(&mut self, other: TokenCounts) {
        self.words += other.words;
        self.numbers += other.numbers;
        self.punctuation += other.punctuation;
        self.whitespace += other.whitespace;
        self.other += other.other;
    }

    /// Word + number + punctuation tokens: the "content" share.
    pub fn content(&self) -> usize {
        self.words + self.numbers + self.punctuation
    }

    /// Every token regardless of kind.
    pub fn total(&self) -> usize {
        self.content() + self.whitespace + self.other
    }
}

/// Tally all tokens in `text`.
pub fn count_tokens(text: &str) -> TokenCounts {
    let mut counts = TokenCounts::default();
    for token in tokenize(text) {
        counts.add(token.kind);
    }
    counts
}

/// Jaro-Winkler similarity in [0, 1]; 1.0 means identical.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::jaro_winkler(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).map(|t| t.kind).collect()
    }

    #[test]
    fn test_tokenize_simple_sentence() {
        let tokens: Vec<_> = tokenize("Hello, world 42").collect();
        assert_eq!(tokens.len(), 6);
        assert_eq!(tokens[0].text, "Hello");
        assert_eq!(tokens[0].kind, TokenKind::Word);
        assert_eq!(tokens[1].kind, TokenKind::PunctuationMark);
        assert_eq!(tokens[2].kind, TokenKind::WhiteSpace);
        assert_eq!(tokens[3].text, "world");
        assert_eq!(tokens[5].text, "42");
        assert_eq!(tokens[5].kind, TokenKind::Number);
    }

    #[test]
    fn test_tokenize_empty() {
        assert_eq!(tokenize("").count(), 0);
    }

    #[test]
    fn test_tokenize_runs_do_not_merge_kinds() {
        assert_eq!(
            kinds("abc123"),
            vec![TokenKind::Word, TokenKind::Number]
        );
    }

    #[test]
    fn test_unicode_commas_are_punctuation() {
        let tokens: Vec<_> = tokenize("a\u{060C}b\u{FF0C}c").collect();
        let punct = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::PunctuationMark)
            .count();
        assert_eq!(punct, 2);
    }

    #[test]
    fn test_count_tokens() {
        let counts = count_tokens("One two, three. 7");
        assert_eq!(counts.words, 3);
        assert_eq!(counts.numbers, 1);
        assert_eq!(counts.punctuation, 2);
        assert_eq!(counts.whitespace, 4);
        assert_eq!(counts.content(), 6);
        assert_eq!(counts.total(), 10);
    }

    #[test]
    fn test_similarity_identical() {
        assert!((similarity("Real Title", "Real Title") - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_similarity_orders_candidates() {
        let close = similarity("Real Title", "Real Title | Site");
        let far = similarity("Real Title", "Completely unrelated");
        assert!(close > far);
        assert!(close >= 0.75);
    }
}

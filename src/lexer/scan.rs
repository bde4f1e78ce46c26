//! Character classification and token boundary scanning.
//!
//! Everything here is a pure function of `(text, offset)`. Offsets are byte
//! offsets into the text; an offset that falls inside a multi-byte character
//! is floored to the start of that character. Nothing in this module fails:
//! unterminated strings and comments simply run to the end of the text.

use super::token::{Token, TokenKind};

/// Characters grouped together when looking for a token boundary backwards.
const SYMBOLS: &str = ";:,.\\[]()|^&+-/*=%!~<>?@";

/// Non exhaustive keyword list (only the ones completion looks at).
pub const KEYWORDS: &[&str] = &[
    "class",
    "extends",
    "implements",
    "function",
    "new",
    "trait",
    "interface",
    "static",
    "public",
    "protected",
    "private",
    "abstract",
    "const",
    "use",
    "namespace",
    "instanceof",
];

/// ASCII letters, digits, underscore, or anything above `~`.
pub fn is_identifier(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || u32::from(ch) > 126
}

pub fn is_space(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

pub fn is_symbol(ch: char) -> bool {
    SYMBOLS.contains(ch)
}

/// Case-insensitive membership in [`KEYWORDS`].
pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Clamp `offset` into the text and floor it to a char boundary.
pub(crate) fn floor_boundary(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// The character starting at `offset`, `None` past the end of the text.
pub(crate) fn char_at(text: &str, offset: usize) -> Option<char> {
    text[floor_boundary(text, offset)..].chars().next()
}

/// Scan one token forward from `offset`.
///
/// Leading whitespace is skipped; if nothing but whitespace remains an
/// `EndOfInput` token is returned at the end of the text.
pub fn parse_from(text: &str, offset: usize) -> Token {
    let offset = floor_boundary(text, offset);
    let Some(skip) = text[offset..].find(|ch: char| !is_space(ch)) else {
        return Token::new(TokenKind::EndOfInput, text.len(), text.len());
    };
    let start = offset + skip;
    let rest = &text[start..];

    let mut chars = rest.chars();
    let Some(first) = chars.next() else {
        return Token::new(TokenKind::EndOfInput, text.len(), text.len());
    };
    let second = chars.next();

    let (kind, len) = match (first, second) {
        ('/', Some('/')) | ('#', _) => (TokenKind::Comment, line_end(rest)),
        ('/', Some('*')) => (TokenKind::Comment, block_comment_end(rest)),
        ('"' | '\'', _) => (TokenKind::StringLiteral, string_end(rest, first)),
        ('-', Some('>')) | (':', Some(':')) => (TokenKind::ScopeOperator, 2),
        ('$', _) => (TokenKind::Variable, 1 + identifier_run(&rest[1..])),
        (ch, _) if is_identifier(ch) => {
            let len = identifier_run(rest);
            if is_keyword(&rest[..len]) {
                (TokenKind::Keyword, len)
            } else {
                (TokenKind::Identifier, len)
            }
        }
        ('=', Some('>')) => (TokenKind::Assign, 2),
        ('=', Some('=')) => (TokenKind::Symbol, 1),
        ('=', _) => (TokenKind::Assign, 1),
        (ch, _) => (TokenKind::Symbol, ch.len_utf8()),
    };

    Token::new(kind, start, start + len)
}

/// Find the start of the token containing, or immediately preceding, `offset`.
///
/// Whitespace under the cursor (or a cursor at the very end of the text) is
/// skipped backwards first. A run of symbol characters counts as a single
/// boundary, so `->` or `::` are found from either of their characters.
pub fn find_start(text: &str, offset: usize) -> usize {
    let mut offset = floor_boundary(text, offset);

    if char_at(text, offset).map_or(true, is_space) {
        match text[..offset]
            .char_indices()
            .rev()
            .find(|&(_, ch)| !is_space(ch))
        {
            Some((i, _)) => offset = i,
            None => return 0,
        }
    }

    let wait_symbol = char_at(text, offset).is_some_and(is_symbol);
    for (i, ch) in text[..offset].char_indices().rev() {
        let boundary = if wait_symbol {
            !is_symbol(ch)
        } else {
            is_space(ch) || is_symbol(ch)
        };
        if boundary {
            return i + ch.len_utf8();
        }
    }
    0
}

fn identifier_run(s: &str) -> usize {
    s.find(|ch: char| !is_identifier(ch)).unwrap_or(s.len())
}

fn line_end(s: &str) -> usize {
    s.find(|ch: char| ch == '\r' || ch == '\n').unwrap_or(s.len())
}

fn block_comment_end(s: &str) -> usize {
    s[2..].find("*/").map_or(s.len(), |i| i + 4)
}

fn string_end(s: &str, quote: char) -> usize {
    let mut chars = s.char_indices().skip(1);
    while let Some((i, ch)) = chars.next() {
        if ch == '\\' {
            chars.next();
        } else if ch == quote {
            return i + ch.len_utf8();
        }
    }
    s.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(text: &str, offset: usize) -> (TokenKind, &str) {
        let token = parse_from(text, offset);
        (token.kind, token.text(text))
    }

    // ── parse_from ──

    #[test]
    fn object_operator_is_one_token() {
        assert_eq!(scan("->", 0), (TokenKind::ScopeOperator, "->"));
        assert_eq!(scan("Foo::bar", 3), (TokenKind::ScopeOperator, "::"));
    }

    #[test]
    fn lone_minus_and_colon_are_symbols() {
        assert_eq!(scan("- 1", 0), (TokenKind::Symbol, "-"));
        assert_eq!(scan(": x", 0), (TokenKind::Symbol, ":"));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(scan("ClAsS Foo", 0), (TokenKind::Keyword, "ClAsS"));
        assert_eq!(scan("NEW", 0), (TokenKind::Keyword, "NEW"));
        assert_eq!(scan("newer", 0), (TokenKind::Identifier, "newer"));
    }

    #[test]
    fn string_with_escaped_quote() {
        let text = r#""a\"b" rest"#;
        assert_eq!(scan(text, 0), (TokenKind::StringLiteral, r#""a\"b""#));
        assert_eq!(scan(r"'it\'s'", 0), (TokenKind::StringLiteral, r"'it\'s'"));
    }

    #[test]
    fn unterminated_string_runs_to_end() {
        assert_eq!(scan("'abc", 0), (TokenKind::StringLiteral, "'abc"));
        assert_eq!(scan(r#""abc\"#, 0), (TokenKind::StringLiteral, r#""abc\"#));
    }

    #[test]
    fn comments() {
        assert_eq!(scan("// hi\nx", 0), (TokenKind::Comment, "// hi"));
        assert_eq!(scan("# hi\r\nx", 0), (TokenKind::Comment, "# hi"));
        assert_eq!(scan("/* a\n b */x", 0), (TokenKind::Comment, "/* a\n b */"));
        assert_eq!(scan("/* open", 0), (TokenKind::Comment, "/* open"));
        assert_eq!(scan("/ 2", 0), (TokenKind::Symbol, "/"));
    }

    #[test]
    fn variables() {
        assert_eq!(scan("$this->x", 0), (TokenKind::Variable, "$this"));
        assert_eq!(scan("$", 0), (TokenKind::Variable, "$"));
    }

    #[test]
    fn assignments() {
        assert_eq!(scan("= 1", 0), (TokenKind::Assign, "="));
        assert_eq!(scan("=> 1", 0), (TokenKind::Assign, "=>"));
        assert_eq!(scan("== 1", 0), (TokenKind::Symbol, "="));
    }

    #[test]
    fn non_ascii_identifiers() {
        assert_eq!(scan("$café = 1", 0), (TokenKind::Variable, "$café"));
        assert_eq!(scan("ünïcode()", 0), (TokenKind::Identifier, "ünïcode"));
    }

    #[test]
    fn whitespace_then_end_of_input() {
        let token = parse_from("foo   ", 3);
        assert_eq!(token.kind, TokenKind::EndOfInput);
        assert_eq!((token.start, token.end), (6, 6));
        assert_eq!(parse_from("", 0).kind, TokenKind::EndOfInput);
        assert_eq!(parse_from("abc", 99).kind, TokenKind::EndOfInput);
    }

    #[test]
    fn whitespace_skipped_forward() {
        let token = parse_from("  \n\tfoo", 0);
        assert_eq!(token.kind, TokenKind::Identifier);
        assert_eq!((token.start, token.end), (4, 7));
    }

    // ── find_start ──

    #[test]
    fn find_start_inside_identifier() {
        assert_eq!(find_start("new Foo", 5), 4);
        assert_eq!(find_start("new Foo", 4), 4);
        assert_eq!(find_start("Foo", 2), 0);
    }

    #[test]
    fn find_start_groups_symbol_runs() {
        assert_eq!(find_start("$a->b", 2), 2);
        assert_eq!(find_start("$a->b", 3), 2);
        assert_eq!(find_start("Foo::", 4), 3);
    }

    #[test]
    fn find_start_walks_back_over_whitespace() {
        // Cursor sits on whitespace: the boundary is the word before it.
        assert_eq!(find_start("new   Foo", 5), 0);
        assert_eq!(find_start("x = new \n", 8), 4);
        assert_eq!(find_start("   ", 2), 0);
    }

    #[test]
    fn find_start_at_end_of_text() {
        assert_eq!(find_start("new Fo", 6), 4);
        assert_eq!(find_start("new ", 4), 0);
        assert_eq!(find_start("", 0), 0);
    }

    #[test]
    fn find_start_stops_at_first_character_boundary() {
        // A boundary character at index 0 is honoured.
        assert_eq!(find_start(" foo", 2), 1);
        assert_eq!(find_start("(foo", 3), 1);
    }

    #[test]
    fn find_start_floors_mid_character_offsets() {
        let text = "new Été";
        // Offset 5 is inside the two-byte 'É'.
        assert_eq!(find_start(text, 5), 4);
    }

    #[test]
    fn classification() {
        assert!(is_identifier('_'));
        assert!(is_identifier('é'));
        assert!(!is_identifier('$'));
        assert!(is_symbol('\\'));
        assert!(!is_symbol('{'));
        assert!(is_space('\r'));
    }
}

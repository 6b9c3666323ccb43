//! Lexical colouring of extracted snippets.
//!
//! The highlighter has no idea what the snippet means; it walks the text once,
//! recognising comments, string and character literals and identifiers, and
//! paints identifiers from a keyword list, a built-in type list and the single
//! character that follows them. Truncated input (an unterminated literal or
//! comment at the end of a snippet) is coloured to the end of the text.
//! Removing the escape sequences from the output always yields the input.

use colored::Colorize;
use once_cell::sync::Lazy;
use std::collections::HashSet;

static KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "alignas", "alignof", "and", "and_eq", "asm", "atomic_cancel", "atomic_commit",
        "atomic_noexcept", "bitand", "bitor", "break", "case", "catch", "class", "compl",
        "concept", "consteval", "constexpr", "constinit", "const", "const_cast", "continue",
        "co_await", "co_return", "co_yield", "decltype", "default", "delete", "do",
        "dynamic_cast", "else", "explicit", "export", "extern", "for", "friend", "goto", "if",
        "inline", "mutable", "namespace", "new", "noexcept", "not", "not_eq", "nullptr",
        "operator", "or", "or_eq", "private", "protected", "public", "reflexpr", "register",
        "reinterpret_cast", "requires", "return", "sizeof", "static", "static_assert",
        "static_cast", "struct", "switch", "synchronized", "template", "this", "thread_local",
        "throw", "try", "typedef", "typeid", "typename", "union", "using", "virtual", "void",
        "volatile", "while", "xor", "xor_eq",
    ]
    .into_iter()
    .collect()
});

static BUILTIN_TYPES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "auto", "bool", "char", "char8_t", "char16_t", "char32_t", "double", "enum", "false",
        "float", "int", "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t", "uint16_t",
        "uint32_t", "uint64_t", "long", "short", "signed", "size_t", "true", "unsigned",
        "wchar_t",
    ]
    .into_iter()
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    Comment,
    Keyword,
    BuiltinType,
    Label,
    Member,
    Call,
    TypeName,
    Literal,
    Plain,
}

/// Terminal colourer for C and C++ snippets
#[derive(Debug, Clone, Copy)]
pub struct Highlighter {
    enabled: bool,
}

impl Highlighter {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns `text` with ANSI styling, or unchanged when colouring is off
    pub fn colorize(&self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len() * 2);
        let mut after_class_keyword = false;
        let mut i = 0;

        while i < bytes.len() {
            let c = bytes[i];
            let next = bytes.get(i + 1).copied();

            let (end, token) = if c == b'/' && next == Some(b'/') {
                (line_comment_end(bytes, i), Token::Comment)
            } else if c == b'/' && next == Some(b'*') {
                (block_comment_end(bytes, i), Token::Comment)
            } else if is_identifier_start(c) {
                let end = identifier_end(bytes, i);
                let word = &text[i..end];
                let token = classify_word(word, bytes.get(end).copied(), after_class_keyword);
                after_class_keyword = word == "class" || word == "struct";
                (end, token)
            } else if c == b'"' || c == b'\'' {
                (literal_end(bytes, i), Token::Literal)
            } else {
                (plain_end(bytes, i), Token::Plain)
            };

            paint(&mut out, &text[i..end], token);
            i = end;
        }

        out
    }
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(true)
    }
}

fn paint(out: &mut String, text: &str, token: Token) {
    let styled = match token {
        Token::Comment => text.bright_black(),
        Token::Keyword => text.bright_magenta().bold(),
        Token::BuiltinType | Token::TypeName => text.bright_blue().bold(),
        Token::Label => text.bright_green().bold(),
        Token::Member => text.bright_cyan().bold(),
        Token::Call => text.bright_yellow().bold(),
        Token::Literal => text.bright_red().bold(),
        Token::Plain => {
            out.push_str(text);
            return;
        }
    };
    out.push_str(&styled.to_string());
}

fn classify_word(word: &str, following: Option<u8>, after_class_keyword: bool) -> Token {
    if KEYWORDS.contains(word) {
        return Token::Keyword;
    }
    if BUILTIN_TYPES.contains(word) {
        return Token::BuiltinType;
    }
    match following {
        Some(b':') => Token::Label,
        Some(b'.') => Token::Member,
        Some(b'(') => Token::Call,
        _ if after_class_keyword => Token::TypeName,
        _ => Token::Plain,
    }
}

fn is_identifier_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_identifier_continue(b: u8) -> bool {
    is_identifier_start(b) || b.is_ascii_digit()
}

fn identifier_end(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|&b| !is_identifier_continue(b))
        .map_or(bytes.len(), |n| start + n)
}

/// Stops before the first line break not preceded by a backslash
fn line_comment_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 2;
    while i < bytes.len() {
        if bytes[i] == b'\n' && bytes[i - 1] != b'\\' {
            break;
        }
        i += 1;
    }
    i
}

fn block_comment_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match (bytes[i], bytes.get(i + 1)) {
            (b'/', Some(b'*')) => {
                depth += 1;
                i += 2;
            }
            (b'*', Some(b'/')) => {
                depth = depth.saturating_sub(1);
                i += 2;
                if depth == 0 {
                    return i;
                }
            }
            _ => i += 1,
        }
    }
    bytes.len()
}

/// End of a quoted literal, just past the unescaped closing quote
fn literal_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut escaped = false;
    let mut i = start + 1;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if escaped {
            escaped = false;
        } else if b == b'\\' {
            escaped = true;
        } else if b == quote {
            return i;
        }
    }
    bytes.len()
}

/// Run of bytes that start no token; always at least one byte
fn plain_end(bytes: &[u8], start: usize) -> usize {
    bytes[start + 1..]
        .iter()
        .position(|&b| b == b'/' || b == b'"' || b == b'\'' || is_identifier_start(b))
        .map_or(bytes.len(), |n| start + 1 + n)
}

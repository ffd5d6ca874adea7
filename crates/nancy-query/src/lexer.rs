//! Tokenizer for queries and library modules.

use crate::error::QueryError;

/// A lexical token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// `prefix:local`, `local`, or `prefix:*`.
    Name {
        prefix: Option<String>,
        local: String,
    },
    Str(String),
    Number(f64),
    Slash,
    DoubleSlash,
    LBracket,
    RBracket,
    LParen,
    RParen,
    LBrace,
    RBrace,
    At,
    Comma,
    Semicolon,
    Pipe,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Dot,
    DotDot,
    ColonColon,
    Assign,
    Star,
    Plus,
    Question,
    Dollar,
}

impl Token {
    /// True if this is the unprefixed name `word`.
    pub(crate) fn is_word(&self, word: &str) -> bool {
        matches!(self, Self::Name { prefix: None, local } if local == word)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.')
}

/// Split `source` into tokens.
///
/// XQuery comments `(: ... :)` are skipped.
pub(crate) fn tokenize(source: &str) -> Result<Vec<Token>, QueryError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    let peek = |i: usize| chars.get(i).copied();

    while let Some(c) = peek(i) {
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '(' && peek(i + 1) == Some(':') {
            i = skip_comment(&chars, i).ok_or_else(|| QueryError::syntax(source, "unterminated comment"))?;
            continue;
        }

        let (token, next) = match c {
            '/' if peek(i + 1) == Some('/') => (Token::DoubleSlash, i + 2),
            '/' => (Token::Slash, i + 1),
            '[' => (Token::LBracket, i + 1),
            ']' => (Token::RBracket, i + 1),
            '(' => (Token::LParen, i + 1),
            ')' => (Token::RParen, i + 1),
            '{' => (Token::LBrace, i + 1),
            '}' => (Token::RBrace, i + 1),
            '@' => (Token::At, i + 1),
            ',' => (Token::Comma, i + 1),
            ';' => (Token::Semicolon, i + 1),
            '|' => (Token::Pipe, i + 1),
            '=' => (Token::Eq, i + 1),
            '!' if peek(i + 1) == Some('=') => (Token::NotEq, i + 2),
            '<' if peek(i + 1) == Some('=') => (Token::LtEq, i + 2),
            '<' => (Token::Lt, i + 1),
            '>' if peek(i + 1) == Some('=') => (Token::GtEq, i + 2),
            '>' => (Token::Gt, i + 1),
            ':' if peek(i + 1) == Some(':') => (Token::ColonColon, i + 2),
            ':' if peek(i + 1) == Some('=') => (Token::Assign, i + 2),
            '*' => (Token::Star, i + 1),
            '+' => (Token::Plus, i + 1),
            '?' => (Token::Question, i + 1),
            '$' => (Token::Dollar, i + 1),
            '.' if peek(i + 1) == Some('.') => (Token::DotDot, i + 2),
            '.' if peek(i + 1).is_some_and(|d| d.is_ascii_digit()) => lex_number(&chars, i),
            '.' => (Token::Dot, i + 1),
            '"' | '\'' => lex_string(&chars, i)
                .ok_or_else(|| QueryError::syntax(source, "unterminated string literal"))?,
            d if d.is_ascii_digit() => lex_number(&chars, i),
            n if is_name_start(n) => lex_name(&chars, i),
            other => {
                return Err(QueryError::syntax(
                    source,
                    format!("unexpected character '{other}'"),
                ));
            }
        };
        tokens.push(token);
        i = next;
    }

    Ok(tokens)
}

/// Skip a possibly nested `(: ... :)` comment starting at `start`.
fn skip_comment(chars: &[char], start: usize) -> Option<usize> {
    let mut depth = 0;
    let mut i = start;
    while i + 1 < chars.len() {
        match (chars[i], chars[i + 1]) {
            ('(', ':') => {
                depth += 1;
                i += 2;
            }
            (':', ')') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// Lex a quoted string; a doubled quote stands for itself.
fn lex_string(chars: &[char], start: usize) -> Option<(Token, usize)> {
    let quote = chars[start];
    let mut value = String::new();
    let mut i = start + 1;
    loop {
        let c = *chars.get(i)?;
        if c == quote {
            if chars.get(i + 1) == Some(&quote) {
                value.push(quote);
                i += 2;
                continue;
            }
            return Some((Token::Str(value), i + 1));
        }
        value.push(c);
        i += 1;
    }
}

fn lex_number(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start;
    let mut seen_dot = false;
    while let Some(&c) = chars.get(i) {
        if c.is_ascii_digit() {
            i += 1;
        } else if c == '.' && !seen_dot && chars.get(i + 1).is_some_and(char::is_ascii_digit) {
            seen_dot = true;
            i += 1;
        } else {
            break;
        }
    }
    let text: String = chars[start..i].iter().collect();
    (Token::Number(text.parse().unwrap_or(f64::NAN)), i)
}

/// Lex `local`, `prefix:local` or `prefix:*`.
///
/// A colon only joins a prefix when it is followed by a name or `*`, so
/// `ancestor::x` and `$v := 1` still lex as separate tokens.
fn lex_name(chars: &[char], start: usize) -> (Token, usize) {
    let mut i = start;
    while chars.get(i).copied().is_some_and(is_name_char) {
        i += 1;
    }
    let first: String = chars[start..i].iter().collect();

    if chars.get(i) == Some(&':') {
        match chars.get(i + 1) {
            Some('*') => {
                return (
                    Token::Name {
                        prefix: Some(first),
                        local: "*".to_owned(),
                    },
                    i + 2,
                );
            }
            Some(&c) if is_name_start(c) => {
                let local_start = i + 1;
                let mut j = local_start;
                while chars.get(j).copied().is_some_and(is_name_char) {
                    j += 1;
                }
                let local: String = chars[local_start..j].iter().collect();
                return (
                    Token::Name {
                        prefix: Some(first),
                        local,
                    },
                    j,
                );
            }
            _ => {}
        }
    }

    (
        Token::Name {
            prefix: None,
            local: first,
        },
        i,
    )
}

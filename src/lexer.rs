//! UTF-8 byte-stream lexer with line/column tracking.
//!
//! Ported near-verbatim from `original_source/src/lexer.c`: whitespace
//! (space/tab/CR) is skipped, `\n` emits a single [`TokenKind::Newline`],
//! `//` starts a line comment, numbers are a digit run with at most one
//! interior `.`, and string literals copy everything between the quotes with
//! **no escape processing** (spec.md §9 open question, resolved: match the C
//! original exactly — a string containing `\"` simply ends at the first
//! `"`).

use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_cont(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    fn peek(&self) -> u8 {
        *self.src.get(self.pos).unwrap_or(&0)
    }

    fn peek_at(&self, offset: usize) -> u8 {
        *self.src.get(self.pos + offset).unwrap_or(&0)
    }

    fn advance(&mut self) {
        if self.peek() == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
    }

    fn make(&self, kind: TokenKind, lexeme: String, line: u32, col: u32) -> Token {
        Token {
            kind,
            lexeme,
            line,
            col,
            number: 0.0,
        }
    }

    fn keyword_or_ident(&self, s: &str, line: u32, col: u32) -> Token {
        let kind = match s {
            "mesh" => TokenKind::Mesh,
            "part" => TokenKind::Part,
            "create" => TokenKind::Create,
            "return" => TokenKind::Return,
            "import" => TokenKind::Import,
            "override" => TokenKind::Override,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "const" => TokenKind::Const,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            _ => TokenKind::Ident,
        };
        self.make(kind, s.to_string(), line, col)
    }

    /// Scan and return the next token. Calling past EOF keeps returning EOF.
    pub fn next(&mut self) -> Token {
        loop {
            let c = self.peek();
            if c == 0 {
                return self.make(TokenKind::Eof, String::new(), self.line, self.col);
            }
            if c == b' ' || c == b'\t' || c == b'\r' {
                self.advance();
                continue;
            }
            if c == b'\n' {
                let (line, col) = (self.line, self.col);
                self.advance();
                return self.make(TokenKind::Newline, "\n".to_string(), line, col);
            }
            if c == b'/' && self.peek_at(1) == b'/' {
                while self.peek() != 0 && self.peek() != b'\n' {
                    self.advance();
                }
                continue;
            }

            let (line, col) = (self.line, self.col);
            match c {
                b'+' => {
                    self.advance();
                    return self.make(TokenKind::Plus, "+".to_string(), line, col);
                }
                b'-' => {
                    self.advance();
                    return self.make(TokenKind::Minus, "-".to_string(), line, col);
                }
                b'*' => {
                    self.advance();
                    return self.make(TokenKind::Star, "*".to_string(), line, col);
                }
                b'/' => {
                    self.advance();
                    return self.make(TokenKind::Slash, "/".to_string(), line, col);
                }
                b'(' => {
                    self.advance();
                    return self.make(TokenKind::LParen, "(".to_string(), line, col);
                }
                b')' => {
                    self.advance();
                    return self.make(TokenKind::RParen, ")".to_string(), line, col);
                }
                b'{' => {
                    self.advance();
                    return self.make(TokenKind::LBrace, "{".to_string(), line, col);
                }
                b'}' => {
                    self.advance();
                    return self.make(TokenKind::RBrace, "}".to_string(), line, col);
                }
                b'[' => {
                    self.advance();
                    return self.make(TokenKind::LBrack, "[".to_string(), line, col);
                }
                b']' => {
                    self.advance();
                    return self.make(TokenKind::RBrack, "]".to_string(), line, col);
                }
                b',' => {
                    self.advance();
                    return self.make(TokenKind::Comma, ",".to_string(), line, col);
                }
                b':' => {
                    self.advance();
                    return self.make(TokenKind::Colon, ":".to_string(), line, col);
                }
                b';' => {
                    self.advance();
                    return self.make(TokenKind::Semi, ";".to_string(), line, col);
                }
                b'.' => {
                    self.advance();
                    if self.peek() == b'.' {
                        self.advance();
                        if self.peek() == b'=' {
                            self.advance();
                            return self.make(TokenKind::DotDotEq, "..=".to_string(), line, col);
                        }
                        return self.make(TokenKind::DotDot, "..".to_string(), line, col);
                    }
                    return self.make(TokenKind::Dot, ".".to_string(), line, col);
                }
                b'=' => {
                    self.advance();
                    if self.peek() == b'=' {
                        self.advance();
                        return self.make(TokenKind::EqEq, "==".to_string(), line, col);
                    }
                    return self.make(TokenKind::Eq, "=".to_string(), line, col);
                }
                b'!' => {
                    self.advance();
                    if self.peek() == b'=' {
                        self.advance();
                        return self.make(TokenKind::Neq, "!=".to_string(), line, col);
                    }
                    // `!` alone has no production; treat as skipped, matching
                    // the original's catch-all `adv(L)` on unknown bytes.
                    continue;
                }
                b'<' => {
                    self.advance();
                    if self.peek() == b'=' {
                        self.advance();
                        return self.make(TokenKind::Lte, "<=".to_string(), line, col);
                    }
                    return self.make(TokenKind::Lt, "<".to_string(), line, col);
                }
                b'>' => {
                    self.advance();
                    if self.peek() == b'=' {
                        self.advance();
                        return self.make(TokenKind::Gte, ">=".to_string(), line, col);
                    }
                    return self.make(TokenKind::Gt, ">".to_string(), line, col);
                }
                b'"' => {
                    self.advance();
                    let start = self.pos;
                    while self.peek() != 0 && self.peek() != b'"' {
                        self.advance();
                    }
                    let s =
                        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
                    if self.peek() == b'"' {
                        self.advance();
                    }
                    return self.make(TokenKind::String, s, line, col);
                }
                _ => {}
            }

            if c.is_ascii_digit() || (c == b'.' && self.peek_at(1).is_ascii_digit()) {
                let start = self.pos;
                let mut seen_dot = false;
                while self.peek().is_ascii_digit()
                    || (self.peek() == b'.' && !seen_dot && self.peek_at(1).is_ascii_digit())
                {
                    if self.peek() == b'.' {
                        seen_dot = true;
                    }
                    self.advance();
                }
                let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
                let mut tok = self.make(TokenKind::Number, text.to_string(), line, col);
                tok.number = text.parse().unwrap_or(0.0);
                return tok;
            }

            if is_ident_start(c) {
                let start = self.pos;
                while is_ident_cont(self.peek()) {
                    self.advance();
                }
                let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
                return self.keyword_or_ident(text, line, col);
            }

            // Unknown byte: skip it, matching the C lexer's fallthrough `adv(L)`.
            self.advance();
        }
    }

    /// Scan the whole source into a token vector, always ending in `Eof`.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut out = Vec::new();
        loop {
            let t = self.next();
            let done = t.kind == TokenKind::Eof;
            out.push(t);
            if done {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn skips_whitespace_and_comments() {
        let ks = kinds("  // hello\n  ");
        assert_eq!(ks, vec![TokenKind::Newline, TokenKind::Eof]);
    }

    #[test]
    fn lexes_numbers() {
        let toks = Lexer::new("1 2.5 .75").tokenize();
        assert_eq!(toks[0].number, 1.0);
        assert_eq!(toks[1].number, 2.5);
        // no leading-dot number production without a following digit check above
        assert_eq!(toks[2].number, 0.75);
    }

    #[test]
    fn lexes_string_without_escapes() {
        let toks = Lexer::new(r#""a\"b""#).tokenize();
        assert_eq!(toks[0].kind, TokenKind::String);
        // the lexer stops at the first quote: `a\` then a bare `b"` remains
        assert_eq!(toks[0].lexeme, "a\\");
    }

    #[test]
    fn lexes_keywords_and_identifiers() {
        let ks = kinds("mesh part create return import override for in const if else foo");
        assert_eq!(
            ks,
            vec![
                TokenKind::Mesh,
                TokenKind::Part,
                TokenKind::Create,
                TokenKind::Return,
                TokenKind::Import,
                TokenKind::Override,
                TokenKind::For,
                TokenKind::In,
                TokenKind::Const,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lexes_ranges_and_comparisons() {
        let ks = kinds(".. ..= == != < > <= >=");
        assert_eq!(
            ks,
            vec![
                TokenKind::DotDot,
                TokenKind::DotDotEq,
                TokenKind::EqEq,
                TokenKind::Neq,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Lte,
                TokenKind::Gte,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn tracks_line_and_column() {
        let toks = Lexer::new("a\nbb").tokenize();
        // a
        assert_eq!((toks[0].line, toks[0].col), (1, 1));
        // newline
        assert_eq!((toks[1].line, toks[1].col), (1, 2));
        // bb
        assert_eq!((toks[2].line, toks[2].col), (2, 1));
    }
}

//! Token kinds, matching `original_source/include/token.h` one-to-one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Newline,
    Ident,
    Number,
    String,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    Comma,
    Colon,
    Semi,
    Dot,
    Eq,
    Plus,
    Minus,
    Star,
    Slash,
    For,
    In,
    DotDot,
    DotDotEq,
    Mesh,
    Part,
    Create,
    Return,
    Import,
    Override,
    Const,
    If,
    Else,
    EqEq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub line: u32,
    pub col: u32,
    pub number: f64,
}

impl Token {
    pub fn is_type_name(&self) -> bool {
        self.kind == TokenKind::Ident
            && matches!(
                self.lexeme.as_str(),
                "number" | "string" | "ring" | "ringlist" | "mesh" | "void"
            )
    }
}

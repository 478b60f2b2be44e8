//! Recursive-descent, precedence-climbing parser.
//!
//! Ported near line-for-line from `original_source/src/parser.c`: the
//! expression chain is primary → unary(`-`) → term(`*` `/`) → add(`+` `-`) →
//! compare(`==` `!=` `<` `>` `<=` `>=`) → (assignment peek) expr, and
//! `is_func_decl`/`parse_qualified_name` both speculate by cloning the whole
//! parser state (lexer position plus lookahead token) and discarding the
//! clone if the guess didn't pan out — cheap here since `Lexer` only holds a
//! byte-slice pointer and three integers.
//!
//! The C parser accumulates a `hasErr` flag and keeps limping through loops
//! after the first syntax error so it can report *a* location; this port
//! instead returns `Err` the moment one is found (spec.md §4.4: "parsing
//! stops at the first error"), which is the same observable behavior without
//! the dead-code continuation.

use crate::ast::{Ast, AstKind, FParam, Param, Program};
use crate::error::ParseError;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

type PResult<T> = Result<T, ParseError>;

#[derive(Clone)]
pub struct Parser<'a> {
    lex: Lexer<'a>,
    cur: Token,
}

impl<'a> Parser<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut lex = Lexer::new(src);
        let cur = lex.next();
        Parser { lex, cur }
    }

    fn advance(&mut self) {
        self.cur = self.lex.next();
    }

    fn accept(&mut self, kind: TokenKind) -> bool {
        if self.cur.kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> PResult<()> {
        if self.accept(kind) {
            Ok(())
        } else {
            Err(ParseError::Syntax {
                line: self.cur.line,
                col: self.cur.col,
                message: format!("expected {}", what),
            })
        }
    }

    fn skip_nl(&mut self) {
        while self.cur.kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn here(&self) -> (u32, u32) {
        (self.cur.line, self.cur.col)
    }

    fn node(&self, kind: AstKind, line: u32, col: u32) -> Ast {
        Ast::new(kind, line, col)
    }

    /// `ident(.ident)*` — dotted cross-mesh call/identifier names.
    fn parse_qualified_name(&mut self, first: Token) -> String {
        let mut parts = vec![first.lexeme];
        let mut probe = self.clone();
        while probe.cur.kind == TokenKind::Dot {
            probe.advance();
            if probe.cur.kind != TokenKind::Ident {
                break;
            }
            parts.push(probe.cur.lexeme.clone());
            probe.advance();
        }
        *self = probe;
        parts.join(".")
    }

    fn is_func_decl(&self) -> bool {
        let mut q = self.clone();
        if q.cur.kind != TokenKind::Ident {
            return false;
        }
        q.advance();
        q.skip_nl();
        if !q.accept(TokenKind::LParen) {
            return false;
        }
        q.skip_nl();
        if !q.accept(TokenKind::RParen) {
            loop {
                if q.cur.kind != TokenKind::Ident {
                    return false;
                }
                q.advance();
                q.skip_nl();
                if q.cur.kind != TokenKind::Ident {
                    return false;
                }
                q.advance();
                q.skip_nl();
                if q.accept(TokenKind::Comma) {
                    q.skip_nl();
                    continue;
                }
                break;
            }
            if !q.accept(TokenKind::RParen) {
                return false;
            }
        }
        q.skip_nl();
        if !q.accept(TokenKind::Colon) {
            return false;
        }
        q.skip_nl();
        if !q.cur.is_type_name() {
            return false;
        }
        q.advance();
        q.skip_nl();
        q.accept(TokenKind::LBrace)
    }

    fn parse_primary(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        if self.accept(TokenKind::LParen) {
            self.skip_nl();
            let e = self.parse_expr()?;
            self.skip_nl();
            self.expect(TokenKind::RParen, ")")?;
            return Ok(e);
        }

        if self.cur.kind == TokenKind::Ident {
            let id = self.cur.clone();
            self.advance();
            let qname = self.parse_qualified_name(id);

            if self.accept(TokenKind::LParen) {
                let mut args = Vec::new();
                if !self.accept(TokenKind::RParen) {
                    loop {
                        self.skip_nl();
                        args.push(self.parse_expr()?);
                        self.skip_nl();
                        if self.accept(TokenKind::Comma) {
                            continue;
                        }
                        self.expect(TokenKind::RParen, ")")?;
                        break;
                    }
                }
                return Ok(self.node(AstKind::Call { callee: qname, args }, line, col));
            }
            return Ok(self.node(AstKind::Ident(qname), line, col));
        }

        if self.cur.kind == TokenKind::Number {
            let n = self.cur.number;
            self.advance();
            return Ok(self.node(AstKind::Number(n), line, col));
        }

        if self.cur.kind == TokenKind::String {
            let s = self.cur.lexeme.clone();
            self.advance();
            return Ok(self.node(AstKind::Str(s), line, col));
        }

        if self.accept(TokenKind::LBrack) {
            let mut elems = Vec::new();
            if !self.accept(TokenKind::RBrack) {
                loop {
                    self.skip_nl();
                    elems.push(self.parse_expr()?);
                    self.skip_nl();
                    if self.accept(TokenKind::Comma) {
                        continue;
                    }
                    self.expect(TokenKind::RBrack, "]")?;
                    break;
                }
            }
            return Ok(self.node(AstKind::Array(elems), line, col));
        }

        Err(ParseError::Syntax {
            line,
            col,
            message: "expected expression".to_string(),
        })
    }

    fn parse_unary(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        if self.accept(TokenKind::Minus) {
            let inner = self.parse_unary()?;
            return Ok(self.node(AstKind::Neg(Box::new(inner)), line, col));
        }
        self.parse_primary()
    }

    fn parse_term(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        let mut lhs = self.parse_unary()?;
        self.skip_nl();
        loop {
            if self.cur.kind == TokenKind::Star {
                self.advance();
                self.skip_nl();
                let rhs = self.parse_unary()?;
                lhs = self.node(AstKind::Mul(Box::new(lhs), Box::new(rhs)), line, col);
                self.skip_nl();
                continue;
            }
            if self.cur.kind == TokenKind::Slash {
                self.advance();
                self.skip_nl();
                let rhs = self.parse_unary()?;
                lhs = self.node(AstKind::Div(Box::new(lhs), Box::new(rhs)), line, col);
                self.skip_nl();
                continue;
            }
            break;
        }
        Ok(lhs)
    }

    fn parse_add(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        let mut lhs = self.parse_term()?;
        self.skip_nl();
        loop {
            if self.cur.kind == TokenKind::Plus || self.cur.kind == TokenKind::Minus {
                let is_plus = self.cur.kind == TokenKind::Plus;
                self.advance();
                self.skip_nl();
                let rhs = self.parse_term()?;
                lhs = if is_plus {
                    self.node(AstKind::Add(Box::new(lhs), Box::new(rhs)), line, col)
                } else {
                    self.node(AstKind::Sub(Box::new(lhs), Box::new(rhs)), line, col)
                };
                self.skip_nl();
                continue;
            }
            break;
        }
        Ok(lhs)
    }

    fn parse_compare(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        let mut lhs = self.parse_add()?;
        self.skip_nl();
        loop {
            let build: fn(Box<Ast>, Box<Ast>) -> AstKind = if self.accept(TokenKind::EqEq) {
                AstKind::Eq
            } else if self.accept(TokenKind::Neq) {
                AstKind::Neq
            } else if self.accept(TokenKind::Lt) {
                AstKind::Lt
            } else if self.accept(TokenKind::Gt) {
                AstKind::Gt
            } else if self.accept(TokenKind::Lte) {
                AstKind::Lte
            } else if self.accept(TokenKind::Gte) {
                AstKind::Gte
            } else {
                break;
            };
            self.skip_nl();
            let rhs = self.parse_add()?;
            lhs = self.node(build(Box::new(lhs), Box::new(rhs)), line, col);
            self.skip_nl();
        }
        Ok(lhs)
    }

    fn parse_expr(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        if self.cur.kind == TokenKind::Ident {
            let mut probe = self.clone();
            probe.advance();
            probe.skip_nl();
            if probe.cur.kind == TokenKind::Eq {
                let id = self.cur.clone();
                self.advance();
                self.skip_nl();
                self.expect(TokenKind::Eq, "=")?;
                self.skip_nl();
                let rhs = self.parse_expr()?;
                return Ok(self.node(
                    AstKind::Assign {
                        name: id.lexeme,
                        rhs: Box::new(rhs),
                    },
                    line,
                    col,
                ));
            }
        }
        self.parse_compare()
    }

    fn parse_return(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        self.expect(TokenKind::Return, "return")?;
        self.skip_nl();
        let mut exprs = Vec::new();
        if self.cur.kind != TokenKind::Semi {
            loop {
                self.skip_nl();
                exprs.push(self.parse_expr()?);
                self.skip_nl();
                if self.accept(TokenKind::Comma) {
                    continue;
                }
                break;
            }
        }
        self.expect(TokenKind::Semi, ";")?;
        Ok(self.node(AstKind::Return(exprs), line, col))
    }

    fn parse_const(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        self.expect(TokenKind::Const, "const")?;
        let name_tok = self.cur.clone();
        self.expect(TokenKind::Ident, "identifier")?;
        self.skip_nl();
        self.expect(TokenKind::Eq, "=")?;
        self.skip_nl();
        let expr = self.parse_expr()?;
        self.expect(TokenKind::Semi, ";")?;
        Ok(self.node(
            AstKind::Const {
                name: name_tok.lexeme,
                expr: Box::new(expr),
            },
            line,
            col,
        ))
    }

    fn parse_block(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        self.skip_nl();
        self.expect(TokenKind::LBrace, "{")?;
        self.skip_nl();
        let mut stmts = Vec::new();
        while self.cur.kind != TokenKind::RBrace && self.cur.kind != TokenKind::Eof {
            if self.cur.kind == TokenKind::Newline {
                self.advance();
                continue;
            }
            stmts.push(self.parse_statement()?);
            self.skip_nl();
        }
        self.expect(TokenKind::RBrace, "}")?;
        Ok(self.node(AstKind::Block(stmts), line, col))
    }

    fn parse_if(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        self.expect(TokenKind::If, "if")?;
        self.expect(TokenKind::LParen, "(")?;
        let cond = self.parse_expr()?;
        self.expect(TokenKind::RParen, ")")?;
        self.skip_nl();
        let then_branch = self.parse_block()?;
        self.skip_nl();
        let else_branch = if self.accept(TokenKind::Else) {
            self.skip_nl();
            if self.cur.kind == TokenKind::If {
                Some(Box::new(self.parse_if()?))
            } else {
                Some(Box::new(self.parse_block()?))
            }
        } else {
            None
        };
        Ok(self.node(
            AstKind::If {
                cond: Box::new(cond),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            line,
            col,
        ))
    }

    fn parse_for(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        self.expect(TokenKind::For, "for")?;
        let it = self.cur.clone();
        self.expect(TokenKind::Ident, "identifier")?;
        self.skip_nl();
        self.expect(TokenKind::In, "in")?;
        self.skip_nl();
        let from = self.parse_expr()?;
        self.skip_nl();
        let inclusive = if self.accept(TokenKind::DotDotEq) {
            true
        } else {
            self.expect(TokenKind::DotDot, ".. or ..=")?;
            false
        };
        self.skip_nl();
        let to = self.parse_expr()?;
        self.skip_nl();
        let body = self.parse_block()?;
        Ok(self.node(
            AstKind::For {
                iter: it.lexeme,
                from: Box::new(from),
                to: Box::new(to),
                inclusive,
                body: Box::new(body),
            },
            line,
            col,
        ))
    }

    fn parse_statement(&mut self) -> PResult<Ast> {
        match self.cur.kind {
            TokenKind::Return => self.parse_return(),
            TokenKind::For => self.parse_for(),
            TokenKind::Const => self.parse_const(),
            TokenKind::If => self.parse_if(),
            _ => {
                let e = self.parse_expr()?;
                self.expect(TokenKind::Semi, ";")?;
                Ok(e)
            }
        }
    }

    fn parse_func(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        let name_tok = self.cur.clone();
        self.expect(TokenKind::Ident, "identifier")?;
        self.expect(TokenKind::LParen, "(")?;
        let mut params = Vec::new();
        if !self.accept(TokenKind::RParen) {
            loop {
                let ttype = self.cur.clone();
                self.expect(TokenKind::Ident, "type")?;
                let tname = self.cur.clone();
                self.expect(TokenKind::Ident, "param")?;
                params.push(FParam {
                    type_name: ttype.lexeme,
                    name: tname.lexeme,
                    has_default: false,
                });
                if self.accept(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen, ")")?;
                break;
            }
        }
        self.expect(TokenKind::Colon, ":")?;
        if !self.cur.is_type_name() {
            self.expect(TokenKind::Ident, "type")?;
        }
        let rt = self.cur.clone();
        self.advance();
        let body = self.parse_block()?;
        Ok(self.node(
            AstKind::Func {
                name: name_tok.lexeme,
                params,
                ret_type: rt.lexeme,
                body: Box::new(body),
            },
            line,
            col,
        ))
    }

    /// A typed `(type name [= default])` parameter, used by `part`/`mesh` heads.
    fn parse_typed_param(&mut self) -> PResult<Option<Param>> {
        if !self.cur.is_type_name() {
            return Ok(None);
        }
        let ttype = self.cur.clone();
        self.advance();
        self.skip_nl();
        let tname = self.cur.clone();
        self.expect(TokenKind::Ident, "param")?;
        self.skip_nl();
        let value = if self.accept(TokenKind::Eq) {
            self.skip_nl();
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Some(Param {
            name: tname.lexeme,
            type_name: Some(ttype.lexeme),
            value,
        }))
    }

    /// An untyped `(name [= default])` parameter, used by `create` heads.
    fn parse_param(&mut self) -> PResult<Option<Param>> {
        if self.cur.kind != TokenKind::Ident {
            return Ok(None);
        }
        let name = self.cur.lexeme.clone();
        self.advance();
        let value = if self.accept(TokenKind::Eq) {
            Some(Box::new(self.parse_unary()?))
        } else {
            None
        };
        Ok(Some(Param {
            name,
            type_name: None,
            value,
        }))
    }

    fn skip_annotation_to_lbrace(&mut self) {
        if !self.accept(TokenKind::Colon) {
            return;
        }
        self.skip_nl();
        if self.cur.kind == TokenKind::Ident || self.cur.kind == TokenKind::Mesh {
            self.advance();
        }
        self.skip_nl();
    }

    fn parse_part_head(&mut self, is_override: bool) -> PResult<(String, Vec<Param>, Ast)> {
        let name_tok = self.cur.clone();
        self.expect(TokenKind::Ident, "part name")?;
        self.expect(TokenKind::LParen, "(")?;
        let mut params = Vec::new();
        if !self.accept(TokenKind::RParen) {
            loop {
                if let Some(p) = self.parse_typed_param()? {
                    params.push(p);
                }
                if self.accept(TokenKind::Comma) {
                    continue;
                }
                self.expect(TokenKind::RParen, ")")?;
                break;
            }
        }
        self.skip_annotation_to_lbrace();
        let body = self.parse_block()?;
        let _ = is_override;
        Ok((name_tok.lexeme, params, body))
    }

    fn parse_mesh(&mut self) -> PResult<Ast> {
        let (line, col) = self.here();
        let name_tok = self.cur.clone();
        self.expect(TokenKind::Ident, "mesh name")?;
        let parent = if self.accept(TokenKind::Colon) {
            let p = self.cur.clone();
            self.expect(TokenKind::Ident, "parent name")?;
            Some(p.lexeme)
        } else {
            None
        };
        self.skip_nl();
        self.expect(TokenKind::LBrace, "{")?;
        let mut items = Vec::new();
        loop {
            if self.cur.kind == TokenKind::RBrace {
                self.advance();
                break;
            }
            if self.cur.kind == TokenKind::Eof {
                break;
            }
            if self.cur.kind == TokenKind::Newline {
                self.advance();
                continue;
            }
            if self.cur.kind == TokenKind::Part || self.cur.kind == TokenKind::Override {
                let (iline, icol) = self.here();
                let ov = self.cur.kind == TokenKind::Override;
                self.advance();
                let (name, params, body) = self.parse_part_head(ov)?;
                items.push(self.node(
                    AstKind::Part {
                        name,
                        params,
                        body: Box::new(body),
                        is_override: ov,
                    },
                    iline,
                    icol,
                ));
                continue;
            }
            if self.cur.kind == TokenKind::Create {
                let (iline, icol) = self.here();
                self.advance();
                self.expect(TokenKind::LParen, "(")?;
                let mut params = Vec::new();
                if !self.accept(TokenKind::RParen) {
                    loop {
                        if let Some(p) = self.parse_param()? {
                            params.push(p);
                        }
                        if self.accept(TokenKind::Comma) {
                            continue;
                        }
                        self.expect(TokenKind::RParen, ")")?;
                        break;
                    }
                }
                self.skip_annotation_to_lbrace();
                let body = self.parse_block()?;
                items.push(self.node(
                    AstKind::Create {
                        params,
                        body: Box::new(body),
                    },
                    iline,
                    icol,
                ));
                continue;
            }
            if self.cur.kind == TokenKind::Const {
                items.push(self.parse_const()?);
                continue;
            }
            if self.is_func_decl() {
                items.push(self.parse_func()?);
                continue;
            }
            self.advance();
        }
        Ok(self.node(
            AstKind::Mesh {
                name: name_tok.lexeme,
                parent,
                items,
            },
            line,
            col,
        ))
    }

    /// Parse a whole file into a [`Program`].
    pub fn parse_program(src: &'a str) -> PResult<Program> {
        let mut p = Parser::new(src);
        let mut program = Program::default();
        while p.cur.kind != TokenKind::Eof {
            if p.cur.kind == TokenKind::Newline {
                p.advance();
                continue;
            }
            if p.cur.kind == TokenKind::Import {
                let (line, col) = p.here();
                p.advance();
                let path_tok = p.cur.clone();
                p.expect(TokenKind::String, "\"file.tl\"")?;
                program
                    .globals
                    .push(p.node(AstKind::Import(path_tok.lexeme), line, col));
                p.expect(TokenKind::Semi, ";")?;
                continue;
            }
            if p.cur.kind == TokenKind::Const {
                let c = p.parse_const()?;
                program.globals.push(c);
                continue;
            }
            if p.cur.kind == TokenKind::Mesh {
                p.advance();
                let m = p.parse_mesh()?;
                program.meshes.push(m);
                continue;
            }
            p.advance();
        }
        Ok(program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_mesh_with_create() {
        let src = "mesh Box {\n  create() {\n    return;\n  }\n}\n";
        let prog = Parser::parse_program(src).unwrap();
        assert_eq!(prog.meshes.len(), 1);
        match &prog.meshes[0].kind {
            AstKind::Mesh { name, items, .. } => {
                assert_eq!(name, "Box");
                assert_eq!(items.len(), 1);
                assert!(matches!(items[0].kind, AstKind::Create { .. }));
            }
            _ => panic!("expected mesh node"),
        }
    }

    #[test]
    fn parses_part_with_typed_defaults_and_override() {
        let src = "mesh Box {\n  part face(number n = 4) {\n    vertex(n, 0, 0);\n  }\n  override face(number n = 6) {\n    vertex(n, 0, 0);\n  }\n}\n";
        let prog = Parser::parse_program(src).unwrap();
        let items = match &prog.meshes[0].kind {
            AstKind::Mesh { items, .. } => items,
            _ => panic!("expected mesh"),
        };
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[0].kind,
            AstKind::Part { is_override: false, .. }
        ));
        assert!(matches!(
            items[1].kind,
            AstKind::Part { is_override: true, .. }
        ));
    }

    #[test]
    fn parses_qualified_call_and_precedence() {
        let src = "mesh A {\n  create() {\n    x = 1 + 2 * 3;\n    Other.part(x);\n  }\n}\n";
        let prog = Parser::parse_program(src).unwrap();
        let body = match &prog.meshes[0].kind {
            AstKind::Mesh { items, .. } => match &items[0].kind {
                AstKind::Create { body, .. } => body.as_ref(),
                _ => panic!("expected create"),
            },
            _ => panic!("expected mesh"),
        };
        let stmts = match &body.kind {
            AstKind::Block(stmts) => stmts,
            _ => panic!("expected block"),
        };
        match &stmts[0].kind {
            AstKind::Assign { rhs, .. } => {
                assert!(matches!(rhs.kind, AstKind::Add(_, _)));
            }
            _ => panic!("expected assign"),
        }
        match &stmts[1].kind {
            AstKind::Call { callee, .. } => assert_eq!(callee, "Other.part"),
            _ => panic!("expected call"),
        }
    }

    #[test]
    fn parses_for_and_if_else() {
        let src = "mesh A {\n  create() {\n    for i in 0..5 {\n      if (i == 0) {\n        return;\n      } else {\n        return;\n      }\n    }\n  }\n}\n";
        let prog = Parser::parse_program(src).unwrap();
        match &prog.meshes[0].kind {
            AstKind::Mesh { items, .. } => match &items[0].kind {
                AstKind::Create { body, .. } => match &body.kind {
                    AstKind::Block(stmts) => {
                        assert!(matches!(stmts[0].kind, AstKind::For { inclusive: false, .. }));
                    }
                    _ => panic!(),
                },
                _ => panic!(),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn reports_syntax_error_with_location() {
        let src = "mesh A {\n  create( {\n  }\n}\n";
        let err = Parser::parse_program(src).unwrap_err();
        match err {
            ParseError::Syntax { line, .. } => assert_eq!(line, 2),
        }
    }
}

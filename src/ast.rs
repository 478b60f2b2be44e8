//! Abstract syntax tree.
//!
//! Node shape follows `original_source/include/ast.h`'s `NodeKind`/union
//! layout, extended with `If`/comparison nodes the way
//! `original_source/src/parser.c` actually constructs them (`ND_IF`, `ND_EQ`,
//! `ND_NEQ`, `ND_LT`, `ND_GT`, `ND_LTE`, `ND_GTE`) even though the on-disk
//! `ast.h` snapshot predates them. Arena-allocated tagged-union nodes become a
//! plain owned Rust enum: recursion goes through `Box`, lists through `Vec`,
//! and interned C strings through `String`.

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_name: Option<String>,
    pub value: Option<Box<Ast>>,
}

#[derive(Debug, Clone)]
pub struct FParam {
    pub type_name: String,
    pub name: String,
    /// Whether the source parameter carried a `= default` (spec.md §4.6's
    /// part/mesh heads); a call that leaves such a parameter unbound isn't
    /// a "missing argument" error, since the lowered body assigns it itself.
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub enum AstKind {
    Mesh {
        name: String,
        parent: Option<String>,
        items: Vec<Ast>,
    },
    Part {
        name: String,
        params: Vec<Param>,
        body: Box<Ast>,
        is_override: bool,
    },
    Create {
        params: Vec<Param>,
        body: Box<Ast>,
    },
    Func {
        name: String,
        params: Vec<FParam>,
        ret_type: String,
        body: Box<Ast>,
    },
    Block(Vec<Ast>),
    Assign {
        name: String,
        rhs: Box<Ast>,
    },
    Call {
        callee: String,
        args: Vec<Ast>,
    },
    Ident(String),
    Number(f64),
    Str(String),
    Return(Vec<Ast>),
    Import(String),
    Array(Vec<Ast>),
    Neg(Box<Ast>),
    Add(Box<Ast>, Box<Ast>),
    Sub(Box<Ast>, Box<Ast>),
    Mul(Box<Ast>, Box<Ast>),
    Div(Box<Ast>, Box<Ast>),
    Eq(Box<Ast>, Box<Ast>),
    Neq(Box<Ast>, Box<Ast>),
    Lt(Box<Ast>, Box<Ast>),
    Gt(Box<Ast>, Box<Ast>),
    Lte(Box<Ast>, Box<Ast>),
    Gte(Box<Ast>, Box<Ast>),
    For {
        iter: String,
        from: Box<Ast>,
        to: Box<Ast>,
        inclusive: bool,
        body: Box<Ast>,
    },
    Const {
        name: String,
        expr: Box<Ast>,
    },
    If {
        cond: Box<Ast>,
        then_branch: Box<Ast>,
        else_branch: Option<Box<Ast>>,
    },
}

#[derive(Debug, Clone)]
pub struct Ast {
    pub kind: AstKind,
    pub line: u32,
    pub col: u32,
}

impl Ast {
    pub fn new(kind: AstKind, line: u32, col: u32) -> Self {
        Ast { kind, line, col }
    }
}

/// A parsed `.tl` file: top-level `mesh` declarations plus the globals
/// (`import`/`const`) that precede or interleave them, matching `AstProgram`.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub meshes: Vec<Ast>,
    pub globals: Vec<Ast>,
}

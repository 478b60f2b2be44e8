//! Error types for the whole crate.
//!
//! Every layer (arena, lexer, parser, loader, evaluator, intrinsics, export)
//! gets its own `thiserror` enum; all of them convert into [`TopoError`], the
//! single `(line, col, message)` triple surfaced at the public API boundary.

use thiserror::Error;

/// Convenient `Result` alias — use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, TopoError>;

/// Bump-allocator failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ArenaError {
    #[error("arena OOM: requested {requested} bytes, {available} available")]
    OutOfMemory { requested: usize, available: usize },
}

/// Lexer-level failures. The lexer in this crate never actually fails (it
/// has no error productions, matching `original_source/src/lexer.c`), but the
/// type exists so future lexical extensions have somewhere to live.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexError {
    #[error("unterminated string literal")]
    UnterminatedString { line: u32, col: u32 },
}

/// Parser failures: stops at the first one, per spec.md §4.4.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("{message}")]
    Syntax {
        line: u32,
        col: u32,
        message: String,
    },
}

/// Module-loader failures (spec.md §4.5).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("import not found: {path}")]
    NotFound { path: String },
    #[error("import cycle detected: {path}")]
    Cycle { path: String },
    #[error("io error reading {path}: {message}")]
    Io { path: String, message: String },
    #[error("import depth exceeds limit of {limit} at {path}")]
    TooDeep { path: String, limit: usize },
    #[error("arena exhausted loading {path}: {source}")]
    OutOfMemory { path: String, source: ArenaError },
}

/// Evaluator failures (spec.md §4.7, §7).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("{message}")]
    Runtime {
        line: u32,
        col: u32,
        message: String,
    },
    /// A second `const` for an already-const name, or any assignment to one
    /// (spec.md §4.7's "binds the name as constant" rule).
    #[error("{message}")]
    ConstViolation {
        line: u32,
        col: u32,
        message: String,
    },
}

/// Intrinsic-usage failures (spec.md §4.8).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntrinsicError {
    #[error("{message}")]
    Usage { message: String },
}

impl From<ArenaError> for IntrinsicError {
    fn from(e: ArenaError) -> Self {
        IntrinsicError::Usage {
            message: e.to_string(),
        }
    }
}

/// Export (glTF/OBJ) failures.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Custom(String),
}

/// The one error type every public entry point returns: a `(line, col, message)`
/// triple, matching `TopoError` in `original_source/include/topolang.h`.
#[derive(Error, Debug)]
#[error("{line}:{col}: {message}")]
pub struct TopoError {
    pub line: u32,
    pub col: u32,
    pub message: String,
}

impl TopoError {
    pub fn new(line: u32, col: u32, message: impl Into<String>) -> Self {
        TopoError {
            line,
            col,
            message: message.into(),
        }
    }

    pub fn at(line: u32, col: u32, message: impl Into<String>) -> Self {
        Self::new(line, col, message)
    }

    pub fn without_location(message: impl Into<String>) -> Self {
        Self::new(0, 0, message)
    }
}

impl From<ArenaError> for TopoError {
    fn from(e: ArenaError) -> Self {
        TopoError::without_location(e.to_string())
    }
}

impl From<LexError> for TopoError {
    fn from(e: LexError) -> Self {
        match e {
            LexError::UnterminatedString { line, col } => {
                TopoError::at(line, col, "unterminated string literal")
            }
        }
    }
}

impl From<ParseError> for TopoError {
    fn from(e: ParseError) -> Self {
        match e {
            ParseError::Syntax { line, col, message } => TopoError::at(line, col, message),
        }
    }
}

impl From<LoadError> for TopoError {
    fn from(e: LoadError) -> Self {
        TopoError::without_location(e.to_string())
    }
}

impl From<EvalError> for TopoError {
    fn from(e: EvalError) -> Self {
        match e {
            EvalError::Runtime { line, col, message } => TopoError::at(line, col, message),
            EvalError::ConstViolation { line, col, message } => TopoError::at(line, col, message),
        }
    }
}

impl From<IntrinsicError> for TopoError {
    fn from(e: IntrinsicError) -> Self {
        TopoError::without_location(e.to_string())
    }
}

impl From<ExportError> for TopoError {
    fn from(e: ExportError) -> Self {
        TopoError::without_location(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topo_error_formats_as_line_col_message() {
        let e = TopoError::at(3, 7, "division by zero");
        assert_eq!(e.to_string(), "3:7: division by zero");
    }

    #[test]
    fn without_location_defaults_to_zero() {
        let e: TopoError = LoadError::Cycle {
            path: "b.tl".into(),
        }
        .into();
        assert_eq!(e.line, 0);
        assert_eq!(e.col, 0);
        assert!(e.message.contains("cycle"));
    }
}

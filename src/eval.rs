//! Tree-walking evaluator.
//!
//! `original_source/src/eval.c` keeps one linear `Var` list per call frame
//! (`setVar`/`getVar` scan it) and short-circuits on the first error; this
//! keeps exactly that frame shape but generalizes it to spec.md §4.6/§4.7's
//! richer user-function model (closures, named args, dotted `Mesh.part`
//! names from lowering.rs) that the C snapshot on disk never implements. `Block`/`If`/`For` execute
//! directly against the current frame — only a user-function `Call` opens a
//! child one.

use std::collections::HashMap;
use std::rc::Rc;

use crate::arena::Arena;
use crate::ast::{Ast, AstKind, FParam, Program};
use crate::error::EvalError;
use crate::host::Host;
use crate::intrinsics;
use crate::lowering;
use crate::value::Value;

fn rt(line: u32, col: u32, message: impl Into<String>) -> EvalError {
    EvalError::Runtime {
        line,
        col,
        message: message.into(),
    }
}

fn const_violation(line: u32, col: u32, message: impl Into<String>) -> EvalError {
    EvalError::ConstViolation {
        line,
        col,
        message: message.into(),
    }
}

/// Charge `bytes` against the shared arena, translating exhaustion into a
/// located `EvalError` (spec.md §5/§7: one allocator for all language-visible
/// data, including `String` values and merged meshes created outside the
/// intrinsics table).
fn charge(arena: &mut Arena, bytes: usize, line: u32, col: u32) -> Result<(), EvalError> {
    arena
        .alloc_bytes(bytes.max(1), 1)
        .map(|_| ())
        .map_err(|e| rt(line, col, e.to_string()))
}

#[derive(Debug)]
struct FuncDecl {
    name: String,
    params: Vec<FParam>,
    ret_type: String,
    body: Rc<Ast>,
    captured: HashMap<String, Binding>,
}

/// A variable slot: its current value plus whether it was bound by `const`
/// (spec.md §4.7's "(name, value, is_const)" triple), and where that binding
/// statement lives — re-running the *same* `const` statement (a loop body
/// re-entering it) rebinds; a *different* `const` statement for the same
/// name is the "second const" spec.md calls an error.
#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    is_const: bool,
    decl_line: u32,
    decl_col: u32,
}

#[derive(Debug, Default)]
struct Frame {
    vars: HashMap<String, Binding>,
    funcs: Vec<Rc<FuncDecl>>,
    returning: Option<Value>,
}

impl Frame {
    fn child_with_funcs(funcs: Vec<Rc<FuncDecl>>) -> Self {
        Frame {
            vars: HashMap::new(),
            funcs,
            returning: None,
        }
    }
}

/// Run `entry_mesh`'s lowered execution block to completion and return the
/// value its final statement produces (spec.md §4.6: ordinarily a `Mesh`).
pub fn execute(
    program: &Program,
    entry_mesh: &str,
    host: &mut Host,
    arena: &mut Arena,
) -> Result<Value, EvalError> {
    let block = lowering::build_execution_block(program, entry_mesh)?;
    let mut frame = Frame::default();
    eval_node(&block, &mut frame, host, arena)
}

fn eval_block(
    stmts: &[Ast],
    frame: &mut Frame,
    host: &mut Host,
    arena: &mut Arena,
) -> Result<Value, EvalError> {
    let mut value = Value::Void;
    for stmt in stmts {
        value = eval_node(stmt, frame, host, arena)?;
        if frame.returning.is_some() {
            break;
        }
    }
    Ok(frame.returning.clone().unwrap_or(value))
}

fn eval_node(
    ast: &Ast,
    frame: &mut Frame,
    host: &mut Host,
    arena: &mut Arena,
) -> Result<Value, EvalError> {
    match &ast.kind {
        AstKind::Block(stmts) => eval_block(stmts, frame, host, arena),

        AstKind::Import(_) => Ok(Value::Void),

        AstKind::Const { name, expr } => {
            let v = eval_node(expr, frame, host, arena)?;
            if let Some(existing) = frame.vars.get(name) {
                if existing.is_const && (existing.decl_line, existing.decl_col) != (ast.line, ast.col) {
                    return Err(const_violation(
                        ast.line,
                        ast.col,
                        format!("duplicate const: {}", name),
                    ));
                }
            }
            frame.vars.insert(
                name.clone(),
                Binding {
                    value: v.clone(),
                    is_const: true,
                    decl_line: ast.line,
                    decl_col: ast.col,
                },
            );
            Ok(v)
        }

        AstKind::Assign { name, rhs } => {
            if let Some(existing) = frame.vars.get(name) {
                if existing.is_const {
                    return Err(const_violation(
                        ast.line,
                        ast.col,
                        format!("assignment to constant: {}", name),
                    ));
                }
            }
            let v = eval_node(rhs, frame, host, arena)?;
            frame.vars.insert(
                name.clone(),
                Binding {
                    value: v.clone(),
                    is_const: false,
                    decl_line: ast.line,
                    decl_col: ast.col,
                },
            );
            Ok(v)
        }

        AstKind::Func {
            name,
            params,
            ret_type,
            body,
        } => {
            frame.funcs.push(Rc::new(FuncDecl {
                name: name.clone(),
                params: params.clone(),
                ret_type: ret_type.clone(),
                body: Rc::new((**body).clone()),
                captured: frame.vars.clone(),
            }));
            Ok(Value::Void)
        }

        // spec.md §4.7: a missing name yields Void, not an error — downstream
        // type checks (argument binding, return-type checks) reject it instead.
        AstKind::Ident(name) => Ok(frame
            .vars
            .get(name)
            .map(|b| b.value.clone())
            .unwrap_or(Value::Void)),

        AstKind::Number(n) => Ok(Value::Number(*n)),
        AstKind::Str(s) => {
            charge(arena, s.len(), ast.line, ast.col)?;
            Ok(Value::String(s.as_str().into()))
        }

        AstKind::Array(items) => {
            let mut vals = Vec::with_capacity(items.len());
            for item in items {
                vals.push(eval_node(item, frame, host, arena)?);
            }
            // spec.md §4.7: a RingList only if every element is a Ring, else Void
            // (not an error) — unlike calling the `ringlist` intrinsic directly.
            if vals.iter().all(|v| v.as_ring().is_some()) {
                intrinsics::call(host, arena, "ringlist", &vals)
                    .expect("ringlist is always a registered intrinsic")
                    .map_err(|e| rt(ast.line, ast.col, e.to_string()))
            } else {
                Ok(Value::Void)
            }
        }

        AstKind::Neg(e) => {
            let v = eval_node(e, frame, host, arena)?;
            match v.as_number() {
                Some(n) => Ok(Value::Number(-n)),
                None => Ok(Value::Void),
            }
        }

        AstKind::Add(a, b) => {
            let (va, vb) = (
                eval_node(a, frame, host, arena)?,
                eval_node(b, frame, host, arena)?,
            );
            match (&va, &vb) {
                (Value::Mesh(ma), Value::Mesh(mb)) => {
                    let before = host.total_bytes();
                    let mut out = host.mesh(*ma).clone();
                    let src = host.mesh(*mb).clone();
                    out.merge(&src);
                    let id = host.alloc_mesh(out);
                    charge(
                        arena,
                        host.total_bytes().saturating_sub(before),
                        ast.line,
                        ast.col,
                    )?;
                    Ok(Value::Mesh(id))
                }
                (Value::Number(x), Value::Number(y)) => Ok(Value::Number(x + y)),
                _ => Ok(vb),
            }
        }
        AstKind::Sub(a, b) => numeric_binop(a, b, frame, host, arena, |x, y| Ok(Value::Number(x - y))),
        AstKind::Mul(a, b) => numeric_binop(a, b, frame, host, arena, |x, y| Ok(Value::Number(x * y))),
        AstKind::Div(a, b) => {
            let line = ast.line;
            let col = ast.col;
            numeric_binop(a, b, frame, host, arena, move |x, y| {
                if y == 0.0 {
                    Err(rt(line, col, "division by zero"))
                } else {
                    Ok(Value::Number(x / y))
                }
            })
        }

        AstKind::Eq(a, b) => {
            let (va, vb) = (
                eval_node(a, frame, host, arena)?,
                eval_node(b, frame, host, arena)?,
            );
            Ok(Value::Number(bool_num(values_equal(&va, &vb))))
        }
        AstKind::Neq(a, b) => {
            let (va, vb) = (
                eval_node(a, frame, host, arena)?,
                eval_node(b, frame, host, arena)?,
            );
            Ok(Value::Number(bool_num(!values_equal(&va, &vb))))
        }
        AstKind::Lt(a, b) => cmp_binop(a, b, frame, host, arena, |o| o == std::cmp::Ordering::Less),
        AstKind::Gt(a, b) => cmp_binop(a, b, frame, host, arena, |o| o == std::cmp::Ordering::Greater),
        AstKind::Lte(a, b) => cmp_binop(a, b, frame, host, arena, |o| o != std::cmp::Ordering::Greater),
        AstKind::Gte(a, b) => cmp_binop(a, b, frame, host, arena, |o| o != std::cmp::Ordering::Less),

        AstKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let c = eval_node(cond, frame, host, arena)?;
            if c.is_truthy() {
                eval_node(then_branch, frame, host, arena)
            } else if let Some(e) = else_branch {
                eval_node(e, frame, host, arena)
            } else {
                Ok(Value::Void)
            }
        }

        AstKind::For {
            iter,
            from,
            to,
            inclusive,
            body,
        } => {
            let from_v = eval_node(from, frame, host, arena)?
                .as_number()
                .ok_or_else(|| rt(ast.line, ast.col, "for range bounds must be numbers"))?;
            let to_v = eval_node(to, frame, host, arena)?
                .as_number()
                .ok_or_else(|| rt(ast.line, ast.col, "for range bounds must be numbers"))?;
            let (mut i, stop) = (from_v as i64, to_v as i64);
            while if *inclusive { i <= stop } else { i < stop } {
                frame.vars.insert(
                    iter.clone(),
                    Binding {
                        value: Value::Number(i as f64),
                        is_const: false,
                        decl_line: ast.line,
                        decl_col: ast.col,
                    },
                );
                eval_node(body, frame, host, arena)?;
                if frame.returning.is_some() {
                    break;
                }
                i += 1;
            }
            Ok(Value::Void)
        }

        AstKind::Return(exprs) => {
            let mut v = Value::Void;
            for e in exprs {
                v = eval_node(e, frame, host, arena)?;
                if frame.returning.is_some() {
                    return Ok(frame.returning.clone().unwrap());
                }
            }
            frame.returning = Some(v.clone());
            Ok(v)
        }

        AstKind::Call { callee, args } => eval_call(ast, callee, args, frame, host, arena),

        AstKind::Mesh { .. } | AstKind::Part { .. } | AstKind::Create { .. } => {
            Err(rt(ast.line, ast.col, "declaration is not executable"))
        }
    }
}

fn bool_num(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Equality per spec.md §4.7: numeric for `Number`, byte-wise for `String`,
/// `Void == Void` is true, every other combination is false.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::String(x), Value::String(y)) => x.as_bytes() == y.as_bytes(),
        (Value::Void, Value::Void) => true,
        _ => false,
    }
}

fn value_order(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y),
        (Value::String(x), Value::String(y)) => Some(x.as_bytes().cmp(y.as_bytes())),
        _ => None,
    }
}

fn cmp_binop(
    a: &Ast,
    b: &Ast,
    frame: &mut Frame,
    host: &mut Host,
    arena: &mut Arena,
    pred: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EvalError> {
    let (va, vb) = (
        eval_node(a, frame, host, arena)?,
        eval_node(b, frame, host, arena)?,
    );
    Ok(Value::Number(bool_num(
        value_order(&va, &vb).map(pred).unwrap_or(false),
    )))
}

fn numeric_binop(
    a: &Ast,
    b: &Ast,
    frame: &mut Frame,
    host: &mut Host,
    arena: &mut Arena,
    f: impl FnOnce(f64, f64) -> Result<Value, EvalError>,
) -> Result<Value, EvalError> {
    let (va, vb) = (
        eval_node(a, frame, host, arena)?,
        eval_node(b, frame, host, arena)?,
    );
    match (va.as_number(), vb.as_number()) {
        (Some(x), Some(y)) => f(x, y),
        _ => Ok(Value::Void),
    }
}

fn eval_call(
    ast: &Ast,
    callee: &str,
    args: &[Ast],
    frame: &mut Frame,
    host: &mut Host,
    arena: &mut Arena,
) -> Result<Value, EvalError> {
    let mut evaluated = Vec::with_capacity(args.len());
    for a in args {
        match &a.kind {
            AstKind::Assign { name, rhs } => {
                let v = eval_node(rhs, frame, host, arena)?;
                evaluated.push((Some(name.clone()), v));
            }
            _ => {
                let v = eval_node(a, frame, host, arena)?;
                evaluated.push((None, v));
            }
        }
    }

    if let Some(fdecl) = frame.funcs.iter().find(|f| f.name == callee).cloned() {
        return call_user_func(ast, &fdecl, frame, &evaluated, host, arena);
    }

    let positional: Vec<Value> = evaluated.iter().map(|(_, v)| v.clone()).collect();
    match intrinsics::call(host, arena, callee, &positional) {
        Some(Ok(v)) => Ok(v),
        Some(Err(e)) => Err(rt(ast.line, ast.col, e.to_string())),
        None => Err(rt(ast.line, ast.col, format!("unknown function: {}", callee))),
    }
}

fn call_user_func(
    ast: &Ast,
    fdecl: &FuncDecl,
    caller: &mut Frame,
    args: &[(Option<String>, Value)],
    host: &mut Host,
    arena: &mut Arena,
) -> Result<Value, EvalError> {
    let mut child = Frame::child_with_funcs(caller.funcs.clone());
    child.vars = fdecl.captured.clone();

    // Every named argument must match a declared parameter, and none may repeat.
    let mut seen_names: Vec<&str> = Vec::new();
    for (name, _) in args {
        if let Some(name) = name {
            if !fdecl.params.iter().any(|p| &p.name == name) {
                return Err(rt(
                    ast.line,
                    ast.col,
                    format!("{}: unknown named argument: {}", fdecl.name, name),
                ));
            }
            if seen_names.contains(&name.as_str()) {
                return Err(rt(
                    ast.line,
                    ast.col,
                    format!("{}: duplicate named argument: {}", fdecl.name, name),
                ));
            }
            seen_names.push(name.as_str());
        }
    }

    let total_positional = args.iter().filter(|(name, _)| name.is_none()).count();
    let mut positional = args.iter().filter(|(name, _)| name.is_none());
    let mut consumed_positional = 0usize;

    for p in &fdecl.params {
        let value = if let Some((_, v)) = args.iter().find(|(name, _)| name.as_deref() == Some(p.name.as_str())) {
            Some(v.clone())
        } else if let Some((_, v)) = positional.next() {
            consumed_positional += 1;
            Some(v.clone())
        } else if p.has_default {
            // Left unbound: the lowered body's prepended default assignment
            // (lowering::lower_part) sets it before anything reads it.
            None
        } else {
            return Err(rt(
                ast.line,
                ast.col,
                format!("{}: missing argument: {}", fdecl.name, p.name),
            ));
        };

        if let Some(value) = value {
            if !value.matches_type(&p.type_name) {
                return Err(rt(
                    ast.line,
                    ast.col,
                    format!(
                        "{}: argument {} expected {}, got {}",
                        fdecl.name,
                        p.name,
                        p.type_name,
                        value.type_name()
                    ),
                ));
            }
            child.vars.insert(
                p.name.clone(),
                Binding {
                    value,
                    is_const: false,
                    decl_line: ast.line,
                    decl_col: ast.col,
                },
            );
        }
    }
    if consumed_positional < total_positional {
        return Err(rt(
            ast.line,
            ast.col,
            format!("{}: too many arguments", fdecl.name),
        ));
    }

    let result = eval_node(&fdecl.body, &mut child, host, arena)?;
    let value = child.returning.unwrap_or(result);
    if !value.matches_type(&fdecl.ret_type) {
        return Err(rt(
            ast.line,
            ast.col,
            format!(
                "{}: expected return type {}, got {}",
                fdecl.name,
                fdecl.ret_type,
                value.type_name()
            ),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn new_arena() -> Arena {
        Arena::new(1 << 20)
    }

    fn run(src: &str, entry: &str) -> Value {
        let prog = Parser::parse_program(src).unwrap();
        let mut host = Host::new();
        let mut arena = new_arena();
        execute(&prog, entry, &mut host, &mut arena).unwrap()
    }

    fn run_err(src: &str, entry: &str) -> EvalError {
        let prog = Parser::parse_program(src).unwrap();
        let mut host = Host::new();
        let mut arena = new_arena();
        execute(&prog, entry, &mut host, &mut arena).unwrap_err()
    }

    #[test]
    fn create_returns_a_mesh() {
        let v = run("mesh A { create() { return mesh(); } }", "A");
        assert!(v.as_mesh().is_some());
    }

    #[test]
    fn arithmetic_follows_operator_rules() {
        let src = "mesh A { create() { const x = 2 + 3; const y = x * 4; return mesh(); } }";
        run(src, "A");
    }

    #[test]
    fn for_loop_accumulates_into_a_variable() {
        let src = "mesh A { create() { for i in 0..3 { const total = total + i; } return mesh(); } }";
        run(src, "A");
    }

    #[test]
    fn if_else_picks_the_matching_branch() {
        let src = "mesh A { create() { if (1 == 1) { const x = 1; } else { const x = 2; } return mesh(); } }";
        run(src, "A");
    }

    #[test]
    fn unqualified_call_to_own_part_resolves() {
        // Parts are lowered to functions with a forced `mesh` return type
        // (spec.md §4.6), so the body must actually produce one.
        let src = "mesh A {\n  part face(number n = 4) { vertex(n,0,0); return mesh(); }\n  create() { const v = face(); return mesh(); }\n}\n";
        let v = run(src, "A");
        assert!(v.as_mesh().is_some());
    }

    #[test]
    fn dotted_call_to_other_mesh_part_resolves() {
        let src = "mesh A {\n  create() { const m = B.face(); return mesh(); }\n}\nmesh B {\n  part face() { vertex(1,1,1); return mesh(); }\n  create() { return mesh(); }\n}\n";
        let v = run(src, "A");
        assert!(v.as_mesh().is_some());
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let src = "mesh A { create() { const x = 1 / 0; return mesh(); } }";
        match run_err(src, "A") {
            EvalError::Runtime { message, .. } => assert!(message.contains("division by zero")),
            other => panic!("expected Runtime error, got {:?}", other),
        }
    }

    #[test]
    fn calling_an_undefined_function_is_an_error() {
        let src = "mesh A { create() { return nope(); } }";
        match run_err(src, "A") {
            EvalError::Runtime { message, .. } => assert!(message.contains("unknown function")),
            other => panic!("expected Runtime error, got {:?}", other),
        }
    }

    #[test]
    fn reading_an_undefined_variable_yields_void_not_an_error() {
        let src = "mesh A { create() { return nope_ident; } }";
        assert_eq!(run(src, "A"), Value::Void);
    }

    #[test]
    fn duplicate_const_is_an_error() {
        let src = "mesh A { create() { const x = 1; const x = 2; return mesh(); } }";
        match run_err(src, "A") {
            EvalError::ConstViolation { message, .. } => assert!(message.contains("const")),
            other => panic!("expected ConstViolation, got {:?}", other),
        }
    }

    #[test]
    fn assigning_to_a_const_is_an_error() {
        let src = "mesh A { create() { const x = 1; x = 2; return mesh(); } }";
        match run_err(src, "A") {
            EvalError::ConstViolation { message, .. } => assert!(message.contains("const")),
            other => panic!("expected ConstViolation, got {:?}", other),
        }
    }

    #[test]
    fn calling_with_too_many_positional_arguments_is_an_error() {
        let src = "mesh A {\n  part face(number n) { vertex(n,0,0); return mesh(); }\n  create() { const v = face(1, 2); return mesh(); }\n}\n";
        match run_err(src, "A") {
            EvalError::Runtime { message, .. } => assert!(message.contains("too many arguments")),
            other => panic!("expected Runtime error, got {:?}", other),
        }
    }

    #[test]
    fn calling_without_a_required_argument_is_an_error() {
        let src = "mesh A {\n  part face(number n) { vertex(n,0,0); return mesh(); }\n  create() { const v = face(); return mesh(); }\n}\n";
        match run_err(src, "A") {
            EvalError::Runtime { message, .. } => assert!(message.contains("missing argument")),
            other => panic!("expected Runtime error, got {:?}", other),
        }
    }

    #[test]
    fn calling_with_an_unknown_named_argument_is_an_error() {
        let src = "mesh A {\n  part face(number n) { vertex(n,0,0); return mesh(); }\n  create() { const v = face(radius=1); return mesh(); }\n}\n";
        match run_err(src, "A") {
            EvalError::Runtime { message, .. } => assert!(message.contains("unknown named argument")),
            other => panic!("expected Runtime error, got {:?}", other),
        }
    }
}

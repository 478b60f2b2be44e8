//! Builds the synthetic execution block for one entry mesh.
//!
//! spec.md §4.6 has no `original_source` counterpart (the C reference's
//! `eval.c`/`topolang.c` call `create`'s body directly, with no part→function
//! lowering step) — this implements the richer part-lowering behavior the
//! spec actually specifies.

use crate::ast::{Ast, AstKind, FParam, Program};
use crate::error::EvalError;

/// Build the block a program's entry mesh executes as, per spec.md §4.6:
/// one synthetic function per `part` across every mesh in the program
/// (own-mesh parts unqualified, other meshes' parts dotted `Mesh.part`),
/// followed by the program's globals, the entry mesh's own `const`/function
/// declarations, then the entry mesh's `create` body statements verbatim.
pub fn build_execution_block(program: &Program, entry_mesh: &str) -> Result<Ast, EvalError> {
    let entry = program
        .meshes
        .iter()
        .find(|m| matches!(&m.kind, AstKind::Mesh { name, .. } if name == entry_mesh))
        .ok_or_else(|| EvalError::Runtime {
            line: 0,
            col: 0,
            message: format!("unknown mesh: {}", entry_mesh),
        })?;

    let (entry_name, entry_items) = match &entry.kind {
        AstKind::Mesh { name, items, .. } => (name.clone(), items),
        _ => unreachable!(),
    };

    let mut stmts = Vec::new();

    for mesh in &program.meshes {
        let (mesh_name, items) = match &mesh.kind {
            AstKind::Mesh { name, items, .. } => (name, items),
            _ => continue,
        };
        for item in items {
            if let AstKind::Part {
                name, params, body, ..
            } = &item.kind
            {
                let func_name = if mesh_name == &entry_name {
                    name.clone()
                } else {
                    format!("{}.{}", mesh_name, name)
                };
                stmts.push(lower_part(&func_name, params, body, item.line, item.col));
            }
        }
    }

    stmts.extend(program.globals.iter().cloned());

    let create = entry_items.iter().find_map(|item| match &item.kind {
        AstKind::Create { body, .. } => Some(body),
        _ => None,
    });
    let create_body = create.ok_or_else(|| EvalError::Runtime {
        line: entry.line,
        col: entry.col,
        message: format!("no create() in mesh {}", entry_name),
    })?;

    for item in entry_items {
        match &item.kind {
            AstKind::Const { .. } | AstKind::Func { .. } => stmts.push(item.clone()),
            _ => {}
        }
    }

    match &create_body.kind {
        AstKind::Block(inner) => stmts.extend(inner.iter().cloned()),
        _ => stmts.push((**create_body).clone()),
    }

    Ok(Ast::new(AstKind::Block(stmts), entry.line, entry.col))
}

fn lower_part(
    func_name: &str,
    params: &[crate::ast::Param],
    part_body: &Ast,
    line: u32,
    col: u32,
) -> Ast {
    let fparams: Vec<FParam> = params
        .iter()
        .map(|p| FParam {
            type_name: p.type_name.clone().unwrap_or_else(|| "number".to_string()),
            name: p.name.clone(),
            has_default: p.value.is_some(),
        })
        .collect();

    let mut body_stmts = Vec::new();
    for p in params {
        if let Some(default) = &p.value {
            body_stmts.push(Ast::new(
                AstKind::Assign {
                    name: p.name.clone(),
                    rhs: default.clone(),
                },
                line,
                col,
            ));
        }
    }
    body_stmts.push(Ast::new(
        AstKind::Return(vec![part_body.clone()]),
        line,
        col,
    ));
    let func_body = Ast::new(AstKind::Block(body_stmts), line, col);

    Ast::new(
        AstKind::Func {
            name: func_name.to_string(),
            params: fparams,
            ret_type: "mesh".to_string(),
            body: Box::new(func_body),
        },
        line,
        col,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn program(src: &str) -> Program {
        Parser::parse_program(src).unwrap()
    }

    #[test]
    fn lowers_own_part_unqualified_and_other_part_dotted() {
        let src = "mesh A {\n  part face() { return mesh(); }\n  create() { return face(); }\n}\nmesh B {\n  part face() { return mesh(); }\n  create() { return mesh(); }\n}\n";
        let prog = program(src);
        let block = build_execution_block(&prog, "A").unwrap();
        let stmts = match block.kind {
            AstKind::Block(s) => s,
            _ => panic!(),
        };
        let names: Vec<String> = stmts
            .iter()
            .filter_map(|s| match &s.kind {
                AstKind::Func { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert!(names.contains(&"face".to_string()));
        assert!(names.contains(&"B.face".to_string()));
    }

    #[test]
    fn missing_create_is_an_error() {
        let src = "mesh A {\n  part face() { return mesh(); }\n}\n";
        let prog = program(src);
        let err = build_execution_block(&prog, "A").unwrap_err();
        match err {
            EvalError::Runtime { message, .. } => assert!(message.contains("no create()")),
            other => panic!("expected Runtime error, got {:?}", other),
        }
    }

    #[test]
    fn prepends_default_assignment_before_part_body() {
        let src = "mesh A {\n  part face(number n = 4) { return vertex(n,0,0); }\n  create() { return mesh(); }\n}\n";
        let prog = program(src);
        let block = build_execution_block(&prog, "A").unwrap();
        let stmts = match block.kind {
            AstKind::Block(s) => s,
            _ => panic!(),
        };
        let face = stmts
            .iter()
            .find(|s| matches!(&s.kind, AstKind::Func { name, .. } if name == "face"))
            .unwrap();
        match &face.kind {
            AstKind::Func { body, .. } => match &body.kind {
                AstKind::Block(inner) => {
                    assert!(matches!(inner[0].kind, AstKind::Assign { .. }));
                    assert!(matches!(inner[1].kind, AstKind::Return(_)));
                }
                _ => panic!(),
            },
            _ => panic!(),
        }
    }
}

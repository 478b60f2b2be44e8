//! Command-line demo driver.
//!
//! Mirrors `original_source/examples/demo.c`'s load -> compile -> execute ->
//! export flow, widened to take the source path, entry mesh, and output path
//! from argv (falling back to the same defaults the C demo hardcodes).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::info;

use topolang::{compile, execute, export_gltf, Arena, CompileOptions};

/// Same budget as the C demo's fixed arena (spec.md §7 kind 6).
const ARENA_BYTES: usize = 64 * 1024 * 1024;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let source_path = args
        .next()
        .unwrap_or_else(|| "demos/assets/box.tl".to_string());
    let entry_mesh = args.next().unwrap_or_else(|| "Box".to_string());
    let out_path = args.next().unwrap_or_else(|| "box.gltf".to_string());

    let code = std::fs::read_to_string(&source_path)
        .with_context(|| format!("cannot open {}", source_path))?;

    let mut arena = Arena::new(ARENA_BYTES);

    info!("compiling {}", source_path);
    let program = compile(&[(source_path.clone(), code)], CompileOptions::default(), &mut arena)
        .map_err(|e| anyhow::anyhow!("compile {}:{}: {}", e.line, e.col, e.message))?;

    info!("executing {}", entry_mesh);
    let scene = execute(&program, &entry_mesh, &mut arena)
        .map_err(|e| anyhow::anyhow!("execute: {}", e.message))?;

    let out_path: PathBuf = Path::new(&out_path).to_path_buf();
    export_gltf(&scene, &out_path)
        .map_err(|e| anyhow::anyhow!("gltf export: {}", e.message))?;

    println!(
        "OK: {} (+ .bin) - {} vertices, {} quads",
        out_path.display(),
        scene.vertex_count(),
        scene.quad_count()
    );
    Ok(())
}

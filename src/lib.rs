//! Public façade for the TopoLang front end, evaluator, and mesh kernel.
//!
//! Mirrors `original_source/src/topolang.c`'s `topo_compile`/`topo_execute`
//! API shape, widened into a builder-style `CompileOptions` descriptor struct
//! — this codebase's usual preference for configuration structs over bags of
//! positional arguments. Both entry points take a caller-supplied [`Arena`]:
//! every module's source text (compile) and every mesh/ring a program
//! allocates (execute) is charged against the same budget, so one arena spans
//! a whole compile-then-execute session the way `original_source/src/arena.c`
//! spans one `topo_compile`/`topo_execute` pair.

pub mod arena;
pub mod ast;
pub mod error;
pub mod eval;
pub mod export;
pub mod host;
pub mod intrinsics;
pub mod lexer;
pub mod loader;
pub mod lowering;
pub mod mesh;
pub mod parser;
pub mod scene;
pub mod token;
pub mod value;

use std::path::Path;

pub use arena::Arena;
pub use ast::Program;
pub use error::{Result, TopoError};
pub use loader::SourceLoader as ModuleLoaderHook;
pub use scene::Scene;
pub use value::Value;

use host::Host;
use loader::MapLoader;

/// Caller-tunable knobs for [`compile`].
pub struct CompileOptions {
    /// Import chains longer than this are rejected even if acyclic — the
    /// loader's cycle detection alone doesn't bound a long straight-line
    /// chain of imports.
    pub max_import_depth: usize,
    /// Override the default in-memory [`MapLoader`] with a caller-supplied
    /// resolver, e.g. one reading from the real filesystem.
    pub loader: Option<Box<dyn ModuleLoaderHook>>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            max_import_depth: 64,
            loader: None,
        }
    }
}

/// Parse and link `sources` (each an already-read `(path, text)` pair) into
/// one [`Program`], following every `import` transitively. Each loaded
/// module's source text is charged against `arena`.
pub fn compile(sources: &[(String, String)], options: CompileOptions, arena: &mut Arena) -> Result<Program> {
    log::debug!("compiling {} source file(s)", sources.len());
    let program = match options.loader {
        Some(mut hook) => loader::load_program(sources, hook.as_mut(), options.max_import_depth, arena)?,
        None => {
            let mut default_loader = MapLoader::new(sources.iter().cloned());
            loader::load_program(sources, &mut default_loader, options.max_import_depth, arena)?
        }
    };
    log::info!(
        "compiled {} mesh(es), {} global declaration(s)",
        program.meshes.len(),
        program.globals.len()
    );
    Ok(program)
}

/// Execute `entry_mesh`'s `create()` and copy the resulting mesh into a
/// caller-owned [`Scene`] (spec.md §4.9). Every `Mesh`/`Ring`/`String` value
/// the evaluator produces is charged against `arena` as it's created; an
/// execution that outgrows `arena`'s capacity fails with an arena error
/// instead of running unbounded (spec.md §7 kind 6).
pub fn execute(program: &Program, entry_mesh: &str, arena: &mut Arena) -> Result<Scene> {
    log::debug!("executing mesh {}", entry_mesh);
    let mut host = Host::new();
    let value = eval::execute(program, entry_mesh, &mut host, arena)?;

    let mesh_id = value.as_mesh().ok_or_else(|| {
        TopoError::without_location(format!(
            "create() for mesh {} did not return a mesh",
            entry_mesh
        ))
    })?;

    let scene = Scene::from(host.mesh(mesh_id));
    log::info!(
        "execution produced {} vertices, {} quads ({} of {} arena bytes used)",
        scene.vertex_count(),
        scene.quad_count(),
        arena.used(),
        arena.capacity(),
    );
    Ok(scene)
}

/// Write `scene` as glTF 2.0 (`<path>` JSON plus `<path>.bin`).
pub fn export_gltf(scene: &Scene, path: &Path) -> Result<()> {
    log::debug!("exporting glTF to {}", path.display());
    export::export_gltf(scene, path).map_err(Into::into)
}

/// Write `scene` as Wavefront OBJ, triangulating quads if `triangulate`.
pub fn export_obj(scene: &Scene, path: &Path, triangulate: bool) -> Result<()> {
    log::debug!("exporting OBJ to {}", path.display());
    export::export_obj(scene, path, triangulate).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_file(src: &str) -> Vec<(String, String)> {
        vec![("main.tl".to_string(), src.to_string())]
    }

    #[test]
    fn compiles_and_executes_a_capped_ring() {
        // n=16 segments -> k=n/4=4 -> a (k+1)x(k+1) cap grid: 25 vertices, 16 quads.
        let src = "mesh Cube { create() { return move(cap_plane(ring(0,0,1,1,16)), 0,0,0); } }";
        let mut arena = Arena::new(1 << 20);
        let program = compile(&one_file(src), CompileOptions::default(), &mut arena).unwrap();
        let scene = execute(&program, "Cube", &mut arena).unwrap();
        assert_eq!(scene.vertex_count(), 25);
        assert_eq!(scene.quad_count(), 16);
    }

    #[test]
    fn execution_over_budget_is_an_arena_error() {
        let src = "mesh A { create() { return cap_plane(ring(0,0,1,1,40)); } }";
        let mut setup_arena = Arena::new(1 << 20);
        let program = compile(&one_file(src), CompileOptions::default(), &mut setup_arena).unwrap();
        let mut tiny = Arena::new(200);
        let err = execute(&program, "A", &mut tiny).unwrap_err();
        assert!(err.message.contains("arena"));
    }

    #[test]
    fn unresolved_import_surfaces_as_a_compile_error() {
        let src = "import \"missing.tl\";\nmesh A { create() { return mesh(); } }";
        let mut arena = Arena::new(1 << 20);
        let err = compile(&one_file(src), CompileOptions::default(), &mut arena).unwrap_err();
        assert!(err.message.contains("missing.tl"));
    }
}

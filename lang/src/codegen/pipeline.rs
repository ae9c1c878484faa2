//! The compilation pipeline.
//!
//! 1. Scan and parse the source (includes are resolved by the scanner)
//! 2. Resolve names
//! 3. Typecheck
//! 4. Lower to textual LLVM IR
//! 5. Hand the IR to the external code generator (llc)
//! 6. Link against the runtime archive with gcc
//!
//! Every stage keeps running after errors for diagnostic coverage, but
//! code emission is suppressed once the translation unit is faulty.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use super::compiler::{self, CompileResult};
use crate::ddppath;
use crate::error::DdpError;
use crate::lexer::{Mode, Scanner};
use crate::parser;
use crate::resolver;
use crate::typechecker;

/// Outcome of the front-end stages: all collected diagnostics plus the
/// IR module if the translation unit was not faulty.
#[derive(Debug)]
pub struct FrontEndResult {
    pub diagnostics: Vec<DdpError>,
    pub result: Option<CompileResult>,
}

impl FrontEndResult {
    pub fn has_errors(&self) -> bool {
        self.result.is_none()
    }
}

/// Run scanner, parser, resolver, typechecker and emitter over in-memory
/// source text.
pub fn run_front_end(file: &str, source: &str, strict_capitalization: bool) -> FrontEndResult {
    let mode = Mode { strict_capitalization, alias: false };
    let mut scanner = Scanner::from_source(file, source, mode);
    front_end_from_scanner(&mut scanner, file)
}

/// Run the front end over a file on disk.
pub fn run_front_end_file(path: &Path, strict_capitalization: bool) -> Result<FrontEndResult, DdpError> {
    let mode = Mode { strict_capitalization, alias: false };
    let mut scanner = Scanner::from_file(path, mode)?;
    let file = path.display().to_string();
    Ok(front_end_from_scanner(&mut scanner, &file))
}

fn front_end_from_scanner(scanner: &mut Scanner, file: &str) -> FrontEndResult {
    let tokens = scanner.scan_all();
    let mut sink = std::mem::take(&mut scanner.errors);

    let (mut ast, parse_errors) = parser::parse(tokens, file);
    sink.extend(parse_errors);
    if sink.has_errors() {
        ast.faulty = true;
    }

    resolver::resolve(&mut ast, &mut sink);
    typechecker::typecheck(&mut ast, &mut sink);

    let result = compiler::compile(&ast).ok();
    FrontEndResult { diagnostics: sink.into_diagnostics(), result }
}

/// Errors of the build steps behind the front end.
#[derive(Debug)]
pub enum BuildError {
    Io(io::Error),
    /// an external tool failed (llc, gcc)
    Tool(String),
}

impl From<io::Error> for BuildError {
    fn from(err: io::Error) -> Self {
        BuildError::Io(err)
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::Io(err) => write!(f, "Ein-/Ausgabe-Fehler: {}", err),
            BuildError::Tool(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for BuildError {}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// optimization level forwarded to the external code generator (0-2)
    pub optimization_level: u8,
    /// stop after writing the textual IR
    pub emit_ir: bool,
    /// stop after the object file
    pub emit_object: bool,
    pub output: Option<PathBuf>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { optimization_level: 1, emit_ir: false, emit_object: false, output: None }
    }
}

/// Result of `build`: the diagnostics and, on success, the produced file.
#[derive(Debug)]
pub struct BuildOutcome {
    pub diagnostics: Vec<DdpError>,
    pub artifact: Option<PathBuf>,
}

/// Compile `input` to an executable (or IR/object dump per options).
pub fn build(input: &Path, options: &BuildOptions) -> Result<BuildOutcome, BuildError> {
    let front = match run_front_end_file(input, true) {
        Ok(front) => front,
        Err(err) => {
            return Ok(BuildOutcome { diagnostics: vec![err], artifact: None });
        }
    };
    let Some(result) = front.result else {
        return Ok(BuildOutcome { diagnostics: front.diagnostics, artifact: None });
    };

    let stem = input.with_extension("");
    let output = options.output.clone().unwrap_or(stem);

    if options.emit_ir {
        let ll_path = output.with_extension("ll");
        std::fs::write(&ll_path, &result.output)?;
        return Ok(BuildOutcome { diagnostics: front.diagnostics, artifact: Some(ll_path) });
    }

    let ll_path = unique_temp_path("ddp_program", "ll");
    std::fs::write(&ll_path, &result.output)?;

    let obj_path = if options.emit_object {
        output.with_extension("o")
    } else {
        unique_temp_path("ddp_program", "o")
    };
    let compiled = compile_ir_to_object(&ll_path, &obj_path, options.optimization_level);
    std::fs::remove_file(&ll_path).ok();
    compiled?;

    if options.emit_object {
        return Ok(BuildOutcome { diagnostics: front.diagnostics, artifact: Some(obj_path) });
    }

    let mut objects = vec![obj_path.clone()];
    objects.extend(result.dependencies.iter().cloned());
    let linked = link(&objects, &output);
    std::fs::remove_file(&obj_path).ok();
    linked?;

    Ok(BuildOutcome { diagnostics: front.diagnostics, artifact: Some(output) })
}

/// The list-type IR definitions consumed by the link step, as their own
/// module.
pub fn list_defs_module() -> String {
    super::ir::Module::new("ddp_list_defs").render()
}

/// Write the list definitions next to `prefix` (as .ll and/or .o).
pub fn dump_list_defs(prefix: &Path, emit_ir: bool, emit_object: bool) -> Result<Vec<PathBuf>, BuildError> {
    let mut produced = Vec::new();
    let ll_path = prefix.with_extension("ll");
    std::fs::write(&ll_path, list_defs_module())?;
    if emit_object {
        let obj_path = prefix.with_extension("o");
        compile_ir_to_object(&ll_path, &obj_path, 1)?;
        produced.push(obj_path);
    }
    if emit_ir {
        produced.insert(0, ll_path);
    } else {
        std::fs::remove_file(&ll_path).ok();
    }
    Ok(produced)
}

/// Drive the external code generator over a textual IR file.
pub fn compile_ir_to_object(ll: &Path, obj: &Path, optimization: u8) -> Result<(), BuildError> {
    let status = Command::new("llc")
        .arg("--filetype=obj")
        .arg("-relocation-model=pic")
        .arg(format!("-O{}", optimization.min(3)))
        .arg(ll)
        .arg("-o")
        .arg(obj)
        .status()
        .map_err(|err| BuildError::Tool(format!("llc konnte nicht gestartet werden: {}", err)))?;
    if !status.success() {
        return Err(BuildError::Tool(format!(
            "llc ist fehlgeschlagen (Exit-Code {:?})",
            status.code()
        )));
    }
    Ok(())
}

/// Link the objects against the runtime archive.
pub fn link(objects: &[PathBuf], output: &Path) -> Result<(), BuildError> {
    let runtime_archive = ddppath::lib().join("libddpruntime.a");
    let mut cmd = Command::new("gcc");
    for obj in objects {
        cmd.arg(obj);
    }
    let status = cmd
        .arg(&runtime_archive)
        .arg("-lm")
        .arg("-o")
        .arg(output)
        .status()
        .map_err(|err| BuildError::Tool(format!("gcc konnte nicht gestartet werden: {}", err)))?;
    if !status.success() {
        return Err(BuildError::Tool(format!(
            "gcc ist fehlgeschlagen (Exit-Code {:?})",
            status.code()
        )));
    }
    Ok(())
}

/// The version string of the linked gcc toolchain, e.g. "13.2.0".
pub fn gcc_version() -> Result<String, BuildError> {
    let output = Command::new("gcc")
        .arg("--version")
        .output()
        .map_err(|err| BuildError::Tool(format!("gcc konnte nicht gestartet werden: {}", err)))?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_line = stdout.lines().next().unwrap_or_default();
    let version = first_line.split_whitespace().last().unwrap_or("unbekannt");
    Ok(version.to_string())
}

fn unique_temp_path(base: &str, ext: &str) -> PathBuf {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let counter = COUNTER.fetch_add(1, Ordering::SeqCst);
    std::env::temp_dir().join(format!("{}_{}_{}.{}", base, std::process::id(), counter, ext))
}

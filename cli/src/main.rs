//! kddp - Der Kompilierer der Deutschen Programmiersprache.
//!
//! Usage:
//!   kddp build <in.ddp> [-o <out>] [-O 0|1|2] [--llvm-ir] [--object]
//!   kddp dump-list-defs -o <prefix> [--llvm-ir] [--object]
//!   kddp version [--wortreich]

mod output;

use clap::{Parser, Subcommand};
use ddp_lang::codegen::pipeline::{self, BuildOptions};
use ddp_lang::error::Severity;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "kddp")]
#[command(about = "Der Kompilierer der Deutschen Programmiersprache", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Kompiliert eine .ddp Datei zu einer ausführbaren Datei
    Build {
        /// die zu kompilierende Quelldatei
        input: PathBuf,
        /// Pfad der Ausgabe-Datei
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Optimierungsstufe des externen Code-Generators
        #[arg(short = 'O', default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=2))]
        optimization: u8,
        /// nur die textuelle LLVM-IR ausgeben
        #[arg(long = "llvm-ir")]
        llvm_ir: bool,
        /// nur die Objekt-Datei ausgeben
        #[arg(long)]
        object: bool,
        /// Diagnosen als JSON auf stdout ausgeben
        #[arg(long)]
        json: bool,
    },
    /// Schreibt die Listen-Typdefinitionen für den Link-Schritt
    DumpListDefs {
        /// Präfix der Ausgabe-Dateien
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long = "llvm-ir")]
        llvm_ir: bool,
        #[arg(long)]
        object: bool,
    },
    /// Zeigt die Compiler-Version
    Version {
        /// mehrzeilige, ausführliche Ausgabe
        #[arg(long)]
        wortreich: bool,
    },
}

fn main() -> ExitCode {
    match Cli::parse().command {
        Command::Build { input, output, optimization, llvm_ir, object, json } => {
            build(input, output, optimization, llvm_ir, object, json)
        }
        Command::DumpListDefs { output, llvm_ir, object } => dump_list_defs(output, llvm_ir, object),
        Command::Version { wortreich } => version(wortreich),
    }
}

fn build(
    input: PathBuf,
    output: Option<PathBuf>,
    optimization: u8,
    llvm_ir: bool,
    object: bool,
    json: bool,
) -> ExitCode {
    let options = BuildOptions {
        optimization_level: optimization,
        emit_ir: llvm_ir,
        emit_object: object,
        output,
    };

    // linking needs the installation layout; IR and object dumps do not
    if !llvm_ir && !object {
        if let Err(msg) = ddp_lang::ddppath::validate_installation() {
            eprintln!("{}", msg);
            return ExitCode::from(1);
        }
    }

    match pipeline::build(&input, &options) {
        Ok(outcome) => {
            let success = outcome.artifact.is_some()
                && !outcome.diagnostics.iter().any(|d| d.severity == Severity::Error);
            if json {
                output::print_json(success, outcome.artifact.as_deref(), &outcome.diagnostics);
            } else {
                output::print_human(&outcome.diagnostics);
            }
            if success {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(1)
        }
    }
}

fn dump_list_defs(output: PathBuf, llvm_ir: bool, object: bool) -> ExitCode {
    // without flags the textual IR is still the useful default
    let emit_ir = llvm_ir || !object;
    match pipeline::dump_list_defs(&output, emit_ir, object) {
        Ok(produced) => {
            for path in produced {
                println!("{}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", err);
            ExitCode::from(1)
        }
    }
}

fn version(wortreich: bool) -> ExitCode {
    let compiler_version = env!("CARGO_PKG_VERSION");
    let gcc = pipeline::gcc_version().unwrap_or_else(|_| "unbekannt".to_string());
    if wortreich {
        println!("kddp Version {}", compiler_version);
        println!("Ziel-Plattform {}", std::env::consts::ARCH);
        println!("GCC Version {}", gcc);
    } else {
        println!("kddp v{} (GCC {})", compiler_version, gcc);
    }
    ExitCode::SUCCESS
}

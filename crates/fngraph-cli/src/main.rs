//! fngraph command-line compiler.
//!
//! Usage: `fngraph compile <file> [--config FILE] [--library FILE] [--output FILE] [--no-layout] [--pretty]`

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fngraph_compiler::{compile_source, CompileOptions, SourceError, StaticHost};

#[derive(Parser, Debug)]
#[command(name = "fngraph")]
#[command(about = "Compile fngraph source into function node graphs")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a source file and print the graphs as JSON
    Compile {
        /// Source file to compile
        file: PathBuf,

        /// JSON settings file with compiler options
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSON library of importable functions and sibling graphs
        #[arg(long)]
        library: Option<PathBuf>,

        /// Write the JSON here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,

        /// Keep creation-order positions
        #[arg(long = "no-layout")]
        no_layout: bool,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    Compile(#[from] SourceError),
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fngraph_compiler=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    serde_json::from_str(&read(path)?).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn compile(
    file: &Path,
    config: Option<&Path>,
    library: Option<&Path>,
    output: Option<&Path>,
    no_layout: bool,
    pretty: bool,
) -> Result<(), CliError> {
    let mut options: CompileOptions = match config {
        Some(path) => read_json(path)?,
        None => CompileOptions::default(),
    };
    if no_layout {
        options.layout = false;
    }
    let host: StaticHost = match library {
        Some(path) => read_json(path)?,
        None => StaticHost::new(),
    };

    let text = read(file)?;
    let name = file.display().to_string();
    info!("Compiling {name}");
    let module = compile_source(&name, &text, &host, &options)?;

    let json = if pretty {
        serde_json::to_string_pretty(&module)?
    } else {
        serde_json::to_string(&module)?
    };
    match output {
        Some(path) => {
            fs::write(path, json).map_err(|source| CliError::Write {
                path: path.to_path_buf(),
                source,
            })?;
            info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn main() {
    init_logging();
    let args = Args::parse();

    let result = match &args.command {
        Command::Compile {
            file,
            config,
            library,
            output,
            no_layout,
            pretty,
        } => compile(
            file,
            config.as_deref(),
            library.as_deref(),
            output.as_deref(),
            *no_layout,
            *pretty,
        ),
    };

    if let Err(err) = result {
        if let CliError::Compile(source) = &err {
            for e in source.errors() {
                match &e.source_line {
                    Some(line) => error!("{e}\n    {line}"),
                    None => error!("{e}"),
                }
            }
        } else {
            error!("{err}");
        }
        process::exit(1);
    }
}

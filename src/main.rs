use std::io::{self, Write as _};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use toe::{generate, write_stub, FileConfig, GenerateRequest, Overrides, Phase, ResultNaming, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "toe",
    version,
    about = "Generate a test stub for a Go interface"
)]
struct Args {
    /// Declare the stub in an external `_test` package.
    #[arg(long)]
    test_package: bool,

    /// Directory the stub is written to; its name becomes the package name.
    #[arg(long, value_name = "DIR")]
    stub_dir: Option<PathBuf>,

    /// Output file, overriding `stub_<interface>.go` in the stub directory.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Configuration file; defaults to `toe.toml` in the input directory.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Import path of the package declaring `StubOptions`.
    #[arg(long, value_name = "PATH")]
    options_package: Option<String>,

    /// Field names for unnamed results in `Returns` records.
    #[arg(long, value_enum)]
    result_names: Option<ResultNaming>,

    /// Print the stub instead of writing it.
    #[arg(long)]
    stdout: bool,

    /// More logging; repeat for trace output.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory of the package declaring the interface.
    input_dir: PathBuf,

    /// Name of the interface to stub.
    interface: String,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => Some(FileConfig::load(path).map_err(|e| e.at(Phase::Config))?),
        None => FileConfig::discover(&args.input_dir).map_err(|e| e.at(Phase::Config))?,
    };
    let settings = Settings::merge(
        file_config,
        Overrides {
            stub_dir: args.stub_dir,
            options_package: args.options_package,
            result_names: args.result_names,
            test_package: args.test_package,
        },
    );

    let request = GenerateRequest {
        input_dir: args.input_dir,
        interface: args.interface,
        settings,
        output: args.output,
    };
    let stub = generate(&request)
        .with_context(|| format!("cannot generate stub for {}", request.interface))?;

    if args.stdout {
        io::stdout()
            .lock()
            .write_all(stub.source.as_bytes())
            .context("cannot write to stdout")?;
        return Ok(());
    }

    write_stub(&stub)?;
    println!("Stub generated in {}", stub.path.display());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

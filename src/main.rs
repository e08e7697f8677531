use bake::manifest::{DEFAULT_MANIFEST, Manifest, ManifestError};
use bake::output;
use bake::pipeline::{BuildError, BuildPipeline};
use bake::publish::{Destination, publisher_for};
use bake::types::BuildResult;
use clap::{CommandFactory, Parser};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

const EXIT_VERSION: u8 = 1;
const EXIT_USAGE: u8 = 2;
const EXIT_NO_MANIFEST: u8 = 3;
const EXIT_FATAL: u8 = 4;
const EXIT_PAGES_FAILED: u8 = 5;
const EXIT_PUBLISH: u8 = 6;

fn version_string() -> String {
    let hash = env!("BAKE_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION").to_string()
    } else {
        format!("{} ({hash})", env!("CARGO_PKG_VERSION"))
    }
}

#[derive(Parser)]
#[command(name = "bake")]
#[command(about = "bake builds and concatenates static websites from a list of templates")]
#[command(long_about = "\
bake builds and concatenates static websites from a list of templates

The build is driven by a JSON manifest (bakefile.json by default):

  {
    \"output_dir\": \"out\",
    \"static_dir\": \"assets\",
    \"header\": \"header.html\",
    \"footer\": \"footer.html\",
    \"pages\": [\"index.html\", \"posts/*.md\"]
  }

Every page is written to output_dir as header + page + footer. Markdown
pages (.md) are rendered to HTML first. Pages may be glob patterns.")]
#[command(disable_help_flag = true, disable_version_flag = true)]
struct Cli {
    /// Outputs version and exit
    #[arg(short = 'e', long)]
    version: bool,

    /// Bakefile, if specifying a build file other than bakefile.json
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_MANIFEST)]
    file: PathBuf,

    /// Displays this help and exit
    #[arg(short, long)]
    help: bool,

    /// Pushes the website out to its destination after building
    #[arg(short, long)]
    push: bool,

    /// Destination [protocol:]server[:uid[:pwd]]; overrides the manifest's "destination"
    #[arg(short, long, value_name = "DESCRIPTOR")]
    dest: Option<String>,

    /// Outputs debugging information
    #[arg(short, long)]
    verbose: bool,

    /// Captures log output to a file
    #[arg(short, long, value_name = "FILE")]
    log: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(EXIT_USAGE);
        }
    };

    if cli.help {
        eprintln!("{}", Cli::command().render_long_help());
        return ExitCode::from(EXIT_USAGE);
    }
    if cli.version {
        eprintln!("bake {}", version_string());
        return ExitCode::from(EXIT_VERSION);
    }

    if let Err(e) = init_logging(cli.verbose, cli.log.as_deref()) {
        eprintln!("bake: cannot open log file: {e}");
        return ExitCode::from(EXIT_FATAL);
    }

    let root = match std::env::current_dir() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("bake: cannot determine working directory: {e}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let manifest = match Manifest::load(&cli.file, &root) {
        Ok(manifest) => manifest,
        Err(ManifestError::NotFound(_)) => {
            println!("bake: {} does not exist!", cli.file.display());
            println!("bake -h, --help  displays usage options for 'bake'");
            println!("bake aborted.");
            return ExitCode::from(EXIT_NO_MANIFEST);
        }
        Err(e) => {
            eprintln!("bake: {e}");
            return ExitCode::from(EXIT_FATAL);
        }
    };

    let result = match build(&root, &manifest) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("bake: {e}");
            return ExitCode::from(EXIT_FATAL);
        }
    };
    output::print_build_summary(&result, &root);

    if !result.is_clean() {
        if cli.push {
            eprintln!("bake: not publishing, {} page(s) failed", result.failed.len());
        }
        return ExitCode::from(EXIT_PAGES_FAILED);
    }

    if cli.push {
        let descriptor = cli.dest.as_deref().or(manifest.destination.as_deref());
        if let Err(code) = publish(descriptor, &result) {
            return ExitCode::from(code);
        }
    }

    ExitCode::SUCCESS
}

/// Run the pipeline, streaming progress to stdout from a printer thread.
fn build(root: &Path, manifest: &Manifest) -> Result<BuildResult, BuildError> {
    let (tx, rx) = std::sync::mpsc::channel();
    let printer_root = root.to_path_buf();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_build_event(&event, &printer_root);
        }
    });

    let result = BuildPipeline::new(root).with_events(tx).build(manifest);
    // The pipeline (and its sender) is gone, so the printer drains and exits.
    let _ = printer.join();
    result
}

fn publish(descriptor: Option<&str>, result: &BuildResult) -> Result<(), u8> {
    let Some(descriptor) = descriptor else {
        eprintln!("bake: --push needs a destination (-d, or \"destination\" in the bakefile)");
        return Err(EXIT_PUBLISH);
    };

    let published = Destination::parse(descriptor)
        .and_then(|dest| publisher_for(&dest))
        .and_then(|publisher| publisher.publish(&result.output_dir));

    match published {
        Ok(report) => {
            output::print_publish_report(&report);
            Ok(())
        }
        Err(e) => {
            eprintln!("bake: publish failed: {e}");
            Err(EXIT_PUBLISH)
        }
    }
}

/// Install the tracing subscriber. `--verbose` forces debug level; otherwise
/// `RUST_LOG` decides, defaulting to warnings only.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

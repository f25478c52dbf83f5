//! CircuitLens CLI - circuit-diagram detections to SPICE netlists from the command line.

use anyhow::{Context, Result};
use circuitlens::netlist::NetlistExpectations;
use circuitlens::{
    Analysis, CanonicalType, CircuitDescription, CircuitLensCore, Diagnostic, PipelineConfig,
    PipelineOptions, PipelineOutput, PipelineRequest, ValidationReport,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "circuitlens")]
#[command(about = "Circuit-diagram detection fusion and SPICE netlist tool", long_about = None)]
#[command(version)]
struct Cli {
    /// Pipeline config JSON (IoU threshold, component cap, aliases, defaults)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log pipeline stages to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fuse a detection bundle and compile it to a netlist
    Run {
        /// Detection bundle JSON
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        compile: CompileArgs,
    },

    /// Compile a circuit description, skipping fusion and assembly
    Compile {
        /// Circuit description JSON
        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[command(flatten)]
        compile: CompileArgs,
    },

    /// Check the structure of an existing netlist file
    Validate {
        /// SPICE netlist file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Accept a netlist without component statements
        #[arg(long)]
        allow_empty: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "human")]
        format: OutputFormat,
    },

    /// List canonical component types
    Types {
        /// Show every label that resolves to each type
        #[arg(short, long)]
        labels: bool,
    },
}

#[derive(Args)]
struct CompileArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Analysis directive: op, dc:SRC,START,STOP,STEP, tran:STEP,STOP or ac:POINTS,START,STOP
    #[arg(short, long, default_value = "op", value_parser = Analysis::parse)]
    analysis: Analysis,

    /// Netlist title
    #[arg(short, long)]
    title: Option<String>,

    /// Also write the netlist text to this file
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Exit with error code if diagnostics are found at this severity or higher
    #[arg(long, value_enum)]
    fail_on: Option<FailOnSeverity>,
}

impl CompileArgs {
    fn options(&self) -> PipelineOptions {
        PipelineOptions {
            title: self.title.clone(),
            analysis: self.analysis.clone(),
            ..Default::default()
        }
    }
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts
    Json,
}

#[derive(Clone, ValueEnum)]
enum FailOnSeverity {
    Error,
    Warning,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };

    process::exit(exit_code);
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { file, compile } => handle_run(config, &file, &compile),
        Commands::Compile { file, compile } => handle_compile(config, &file, &compile),
        Commands::Validate {
            file,
            allow_empty,
            format,
        } => handle_validate(&file, allow_empty, &format),
        Commands::Types { labels } => {
            handle_types(&config, labels);
            Ok(0)
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Arc<PipelineConfig>> {
    let config = match path {
        Some(path) => PipelineConfig::load_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    Ok(Arc::new(config))
}

fn handle_run(config: Arc<PipelineConfig>, file: &Path, args: &CompileArgs) -> Result<i32> {
    let request = PipelineRequest::load_bundle(file)
        .with_context(|| format!("failed to read detection bundle {}", file.display()))?;
    let output = CircuitLensCore::new(config).run(request, &args.options())?;
    finish(file, &output, args)
}

fn handle_compile(config: Arc<PipelineConfig>, file: &Path, args: &CompileArgs) -> Result<i32> {
    let description = CircuitDescription::load_file(file)
        .with_context(|| format!("failed to read circuit description {}", file.display()))?;
    let output = CircuitLensCore::new(config).compile_description(description, &args.options())?;
    finish(file, &output, args)
}

fn finish(file: &Path, output: &PipelineOutput, args: &CompileArgs) -> Result<i32> {
    if let Some(path) = &args.output {
        std::fs::write(path, &output.netlist)
            .with_context(|| format!("failed to write netlist {}", path.display()))?;
    }

    match args.format {
        OutputFormat::Human => output_human(file, output),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(output)?),
    }

    if !output.is_valid() {
        return Ok(1);
    }
    if let Some(severity) = &args.fail_on {
        if should_fail(output, severity) {
            return Ok(1);
        }
    }
    Ok(0)
}

fn should_fail(output: &PipelineOutput, severity: &FailOnSeverity) -> bool {
    match severity {
        FailOnSeverity::Error => output.has_errors(),
        FailOnSeverity::Warning => output.has_errors() || output.has_warnings(),
    }
}

fn output_human(file: &Path, output: &PipelineOutput) {
    println!("File: {}", file.display());
    println!("{}", "─".repeat(60));
    print!("{}", output.netlist);
    println!("{}", "─".repeat(60));

    if let Some(summary) = &output.summary {
        println!(
            "  Detections: {} received, {} fused ({} quality)",
            summary.counters.received, summary.fused, summary.quality
        );
    }
    println!(
        "  Circuit:    {} components, {} nets, grounded: {}",
        output.circuit.component_count,
        output.circuit.net_count,
        if output.circuit.grounded { "yes" } else { "no" }
    );
    println!("  Pattern:    {}", output.circuit.pattern);
    if !output.topology_inferred && !output.components.is_empty() && output.summary.is_some() {
        println!("  Nets are synthesized; wiring was not traced.");
    }

    let errors: Vec<&Diagnostic> = output.diagnostics.errors().collect();
    let warnings: Vec<&Diagnostic> = output.diagnostics.warnings().collect();
    if !errors.is_empty() {
        println!("\n  ERRORS:");
        for d in errors {
            print_diagnostic(d);
        }
    }
    if !warnings.is_empty() {
        println!("\n  WARNINGS:");
        for d in warnings {
            print_diagnostic(d);
        }
    }

    print_report(&output.validation);
}

fn print_diagnostic(d: &Diagnostic) {
    match d.component_index {
        Some(idx) => println!("    - [{} #{}] {}: {}", d.stage, idx, d.code, d.message),
        None => println!("    - [{}] {}: {}", d.stage, d.code, d.message),
    }
}

fn print_report(report: &ValidationReport) {
    if report.valid {
        println!("\n  Netlist valid");
    } else {
        println!("\n  Netlist INVALID:");
        for reason in &report.reasons {
            println!("    - {}", reason);
        }
    }
}

fn handle_validate(file: &Path, allow_empty: bool, format: &OutputFormat) -> Result<i32> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read netlist {}", file.display()))?;
    let expectations = NetlistExpectations {
        expects_components: !allow_empty,
        ..Default::default()
    };
    let report = CircuitLensCore::validate_text(&text, &expectations);

    match format {
        OutputFormat::Human => {
            println!("File: {}", file.display());
            print_report(&report);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    Ok(if report.valid { 0 } else { 1 })
}

fn handle_types(config: &PipelineConfig, labels: bool) {
    println!("Canonical component types:\n");

    for kind in CanonicalType::ALL {
        let prefix = match kind {
            CanonicalType::Transformer => "L+L+K".to_string(),
            other => other
                .prefix()
                .map(String::from)
                .unwrap_or_else(|| "-".to_string()),
        };
        println!(
            "  {:<16} nodes: {:<7} statement: {}",
            kind.as_str(),
            kind.arity().to_string(),
            prefix
        );
        if labels {
            let known = config.types().labels_for(kind);
            if !known.is_empty() {
                println!("    labels: {}", known.join(", "));
            }
        }
    }
    if config.type_aliases().is_empty() {
        return;
    }
    println!("\nConfigured aliases:");
    for (label, kind) in config.type_aliases() {
        println!("  {} -> {}", label, kind);
    }
}

//! pcbclone CLI - repeat a KiCad PCB layout cell across a grid from the command line.

use clap::{Parser, ValueEnum};
use pcbclone::{CloneOptions, CloneReport, NetTieBreak, PcbCloneCore};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pcbclone")]
#[command(about = "Clone a KiCad PCB layout cell across a grid of hierarchical sheets", long_about = None)]
#[command(version)]
#[command(allow_negative_numbers = true)]
struct Cli {
    /// Board with the laid-out template cell (.kicad_pcb)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Text file listing the template references, separated by whitespace
    #[arg(value_name = "REFERENCES")]
    references: PathBuf,

    /// Where to save the result (default: overwrite INPUT)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Difference in the reference numbers between hierarchical sheets [default: 100]
    #[arg(short = 'd', long = "step", value_name = "N")]
    step: Option<u64>,

    /// Starting point of numbering in the first hierarchical sheet [default: 200]
    #[arg(short = 's', long = "start", value_name = "N")]
    start: Option<u64>,

    /// Spacing between clones in x direction, in mm; negative lays clones out to the left [default: 11]
    #[arg(short = 'x', long = "pitch-x", value_name = "MM")]
    pitch_x: Option<f64>,

    /// Spacing between clones in y direction, in mm; negative lays clones out upwards [default: 11]
    #[arg(short = 'y', long = "pitch-y", value_name = "MM")]
    pitch_y: Option<f64>,

    /// Number of clones in x direction [default: 4]
    #[arg(short = 'X', long = "columns", value_name = "N")]
    columns: Option<usize>,

    /// Number of clones in y direction [default: 4]
    #[arg(short = 'Y', long = "rows", value_name = "N")]
    rows: Option<usize>,

    /// Layer of the zone outlining the template cell [default: Cmts.User]
    #[arg(long, value_name = "LAYER")]
    marker_layer: Option<String>,

    /// Net to use when a cloned zone covers pads of several nets [default: last]
    #[arg(long, value_enum, value_name = "POLICY")]
    on_ambiguous_net: Option<TieBreakArg>,

    /// TOML file with cloning options; command line flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run the cloner and print the report without saving
    #[arg(long)]
    dry_run: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    /// Show per-component detail
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output for scripts
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum TieBreakArg {
    /// The last pad found inside the zone wins
    Last,
    /// The first pad found inside the zone wins
    First,
    /// Abort without saving
    Error,
}

impl From<TieBreakArg> for NetTieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::Last => NetTieBreak::Last,
            TieBreakArg::First => NetTieBreak::First,
            TieBreakArg::Error => NetTieBreak::Error,
        }
    }
}

fn main() {
    // Usage errors exit 1 like every other failure; --help and --version exit 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };
    init_logging(&cli);
    process::exit(handle_clone(&cli));
}

/// Progress goes to stdout, or to stderr when stdout carries the JSON report.
fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let writer = match cli.format {
        OutputFormat::Human => BoxMakeWriter::new(std::io::stdout),
        OutputFormat::Json => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .without_time()
        .with_target(false)
        .init();
}

fn build_options(cli: &Cli) -> Result<CloneOptions, pcbclone::PcbCloneError> {
    let mut options = match &cli.config {
        Some(path) => CloneOptions::from_toml_file(path)?,
        None => CloneOptions::default(),
    };

    if let Some(step) = cli.step {
        options.offset_step = step;
    }
    if let Some(start) = cli.start {
        options.offset_start = start;
    }
    if let Some(pitch_x) = cli.pitch_x {
        options.pitch_x = pitch_x;
    }
    if let Some(pitch_y) = cli.pitch_y {
        options.pitch_y = pitch_y;
    }
    if let Some(columns) = cli.columns {
        options.columns = columns;
    }
    if let Some(rows) = cli.rows {
        options.rows = rows;
    }
    if let Some(layer) = &cli.marker_layer {
        options.marker_layer = layer.clone();
    }
    if let Some(policy) = cli.on_ambiguous_net {
        options.net_tie_break = policy.into();
    }

    options.validate()?;
    Ok(options)
}

fn handle_clone(cli: &Cli) -> i32 {
    let options = match build_options(cli) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if !has_board_extension(&cli.input) {
        tracing::warn!("{} does not look like a .kicad_pcb file", cli.input.display());
    }

    match PcbCloneCore::clone_file(
        &cli.input,
        &cli.references,
        cli.output.as_deref(),
        &options,
        cli.dry_run,
    ) {
        Ok(report) => output_report(&report, &options, &cli.format),
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn has_board_extension(path: &Path) -> bool {
    path.extension().and_then(|s| s.to_str()) == Some("kicad_pcb")
}

fn output_report(report: &CloneReport, options: &CloneOptions, format: &OutputFormat) -> i32 {
    match format {
        OutputFormat::Human => {
            output_human(report, options);
            0
        }
        OutputFormat::Json => output_json(report),
    }
}

fn output_human(report: &CloneReport, options: &CloneOptions) {
    println!(
        "\nCloned into a {}x{} grid ({} x {} mm)",
        options.columns, options.rows, options.pitch_x, options.pitch_y
    );
    println!("{}", "─".repeat(60));

    for mapping in &report.templates {
        println!("  {} -> {}", mapping.template, mapping.clones.join(", "));
    }

    if !report.missing_templates.is_empty() {
        println!("\n  MISSING TEMPLATES:");
        for reference in &report.missing_templates {
            println!("    - {}", reference);
        }
    }
    if !report.missing_clones.is_empty() {
        println!("\n  MISSING CLONES:");
        for reference in &report.missing_clones {
            println!("    - {}", reference);
        }
    }
    if !report.ambiguous_zones.is_empty() {
        println!("\n  AMBIGUOUS ZONES:");
        for zone in &report.ambiguous_zones {
            println!(
                "    - slot {} on {}: pads of {} (using {})",
                zone.slot,
                zone.layer,
                zone.nets.join(", "),
                zone.chosen
            );
        }
    }

    println!("\n  Summary:");
    println!("    Components moved:   {}", report.stats.components_moved);
    println!("    Components flipped: {}", report.stats.components_flipped);
    println!("    Zones cloned:       {}", report.stats.zones_cloned);
    println!("    Tracks cloned:      {}", report.stats.tracks_cloned);

    match (&report.output, report.saved) {
        (Some(path), true) => println!("\n  Saved to {}", path.display()),
        _ => println!("\n  Dry run, nothing saved"),
    }
}

fn output_json(report: &CloneReport) -> i32 {
    match serde_json::to_string_pretty(report) {
        Ok(json) => {
            println!("{}", json);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

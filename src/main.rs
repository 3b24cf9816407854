use clap::{Parser, Subcommand};
use feedlot_mixer::cli;
use feedlot_mixer::error::MixerResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mixer")]
#[command(about = "Feedlot mixer planner: load and discharge routes from a ration workbook.")]
#[command(long_about = "Mixer - Feedlot mixer planning from Excel ration workbooks

Reads the diet inclusion table (Formula) and the daily ration table (Comida)
from an .xlsx workbook and derives, per mixer, what to load and where to
discharge it.

COMMANDS:
  extract   - Show located tables and canonical ration rows
  plan      - Load sequence and discharge route per mixer
  watch     - Re-plan whenever the workbook is saved
  normalize - Show how mixer identifiers are interpreted

EXAMPLES:
  mixer extract raciones.xlsx                 # What was found, and where
  mixer plan raciones.xlsx --mixer 2          # Route for one mixer
  mixer plan raciones.xlsx --order orden.yaml # Custom discharge order
  mixer normalize \"Mixer 2\" IV dos           # → 2, 4, 2

Set RUST_LOG=feedlot_mixer=debug to trace table discovery.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Locate the Formula, Comida and discharge order tables.

Tables are found by Excel table definitions first (names containing
'formula' / 'comida'), then by sheets whose names contain the keyword,
using the first row that looks like a header.

Use --json for machine-readable output.")]
    /// Show located tables and canonical ration rows
    Extract {
        /// Path to .xlsx workbook
        file: PathBuf,

        /// Leading rows inspected when looking for a header
        #[arg(long, default_value = "30")]
        header_rows: usize,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Plan ingredient loads and pen discharges per mixer.

LOADS:
  kg per ingredient = Σ kg per round × inclusion of the pen's diet,
  listed in the ingredient order of the Formula table.

DISCHARGES:
  pens in workbook order, or in the order given by --order / the config
  file; the running balance ends at zero.

EXAMPLES:
  mixer plan raciones.xlsx
  mixer plan raciones.xlsx --config planner.yaml --mixer 1
  mixer plan raciones.xlsx --json > plan.json")]
    /// Load sequence and discharge route per mixer
    Plan {
        /// Path to .xlsx workbook
        file: PathBuf,

        /// Planner configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Discharge order file (YAML, mixer → pens)
        #[arg(short, long)]
        order: Option<PathBuf>,

        /// Only show this mixer
        #[arg(short, long)]
        mixer: Option<u32>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Watch a workbook and re-plan on every save.

Runs that are overtaken by a newer save are discarded, so the output
always reflects the latest file contents.

Press Ctrl+C to stop.")]
    /// Re-plan whenever the workbook changes
    Watch {
        /// Path to .xlsx workbook
        file: PathBuf,

        /// Planner configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Discharge order file (YAML, mixer → pens)
        #[arg(short, long)]
        order: Option<PathBuf>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    #[command(long_about = "Show how mixer identifiers are interpreted.

ACCEPTED FORMS:
  Mixer 2, Carro Nº 3, M-4   → digits after a mixer word
  IV, XII                     → roman numerals
  uno, dos, tres              → Spanish number words
  '', 0, sin mixer            → Sin Mixer")]
    /// Normalise mixer identifiers
    Normalize {
        /// Values to normalise
        #[arg(required = true)]
        values: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "feedlot_mixer=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> MixerResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            file,
            header_rows,
            json,
            verbose,
        } => {
            init_tracing(verbose);
            cli::extract(file, header_rows, json, verbose)
        }

        Commands::Plan {
            file,
            config,
            order,
            mixer,
            json,
            verbose,
        } => {
            init_tracing(verbose);
            cli::plan(file, config, order, mixer, json, verbose)
        }

        Commands::Watch {
            file,
            config,
            order,
            verbose,
        } => {
            init_tracing(verbose);
            cli::watch(file, config, order, verbose)
        }

        Commands::Normalize { values } => {
            init_tracing(false);
            cli::normalize(values)
        }
    }
}

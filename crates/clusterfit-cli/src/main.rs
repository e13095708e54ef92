use clap::{Args, Parser, Subcommand};
use clusterfit_core::{Margin, Mode};

mod commands;

use commands::{OutputFormat, SolveOverrides, SweepOverrides};

#[derive(Parser)]
#[command(
    name = "clusterfit",
    about = "Clusterfit: cost-optimal job and node placement across clusters",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Inputs shared by every solving command.
#[derive(Args)]
struct Input {
    /// Dataset file (.toml or .json)
    #[arg(short, long)]
    dataset: String,
    /// Configuration file (clusterfit.toml)
    #[arg(short, long)]
    config: Option<String>,
    /// Output format: text or json
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and validate a dataset, then print a summary
    Validate {
        #[arg(short, long)]
        dataset: String,
    },
    /// Solve one allocation model
    Solve {
        #[command(flatten)]
        input: Input,
        /// Which entities may relocate: job-only, node-only or joint
        #[arg(short, long)]
        mode: Option<Mode>,
        /// Utilization margin in (0, 1]
        #[arg(long)]
        margin: Option<Margin>,
        /// Wall-clock budget in seconds
        #[arg(long)]
        time_limit: Option<u64>,
        /// Relative optimality gap accepted as success
        #[arg(long)]
        mip_gap: Option<f64>,
    },
    /// Solve the same mode over a descending grid of margins.
    ///
    /// The grid is read from [sweep] in the configuration file; --start,
    /// --stop and --step override individual bounds.
    Sweep {
        #[command(flatten)]
        input: Input,
        #[arg(short, long)]
        mode: Option<Mode>,
        #[arg(long)]
        start: Option<f64>,
        #[arg(long)]
        stop: Option<f64>,
        #[arg(long)]
        step: Option<f64>,
    },
    /// Solve all three modes at one margin and compare costs
    Compare {
        #[command(flatten)]
        input: Input,
        #[arg(long)]
        margin: Option<Margin>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clusterfit=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { dataset } => commands::validate::validate(&dataset),
        Commands::Solve {
            input,
            mode,
            margin,
            time_limit,
            mip_gap,
        } => {
            let overrides = SolveOverrides {
                mode,
                margin,
                time_limit_secs: time_limit,
                mip_gap,
            };
            commands::solve::solve(
                &input.dataset,
                input.config.as_deref(),
                &overrides,
                input.format,
            )
        }
        Commands::Sweep {
            input,
            mode,
            start,
            stop,
            step,
        } => {
            let overrides = SweepOverrides {
                mode,
                start,
                stop,
                step,
            };
            commands::sweep::sweep(
                &input.dataset,
                input.config.as_deref(),
                &overrides,
                input.format,
            )
        }
        Commands::Compare { input, margin } => commands::compare::compare(
            &input.dataset,
            input.config.as_deref(),
            margin,
            input.format,
        ),
    }
}

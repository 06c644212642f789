use std::io;
use std::path::PathBuf;
use std::process;

use clap::{value_parser, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fea2img::config::Config;
use fea2img::dataset::classification::create_classification_dataset;
use fea2img::dataset::convert::{convert_all_inp_files, convert_inp};
use fea2img::dataset::extract_parts::extract_parts_from_inp_files;
use fea2img::dataset::geometry_to_image::DatasetRenderer;
use fea2img::dataset::merge::write_merged;
use fea2img::dataset::paired::generate_paired_dataset;
use fea2img::error::DatasetError;
use fea2img::metrics::evaluation::{calculate_metrics, evaluate_folder};
use fea2img::structs_and_impls::FieldKind;

static ARGS_GLOBAL: &str = "Global options";

/// Turn finite element results of stented aortas into image datasets
#[derive(Debug, Parser)]
#[command(name = "fea2img", version, about)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted
    #[arg(help_heading = ARGS_GLOBAL, short = 'c', long, global = true, value_parser = value_parser!(PathBuf))]
    config: Option<PathBuf>,

    /// Override `dataset.data_dir`
    #[arg(help_heading = ARGS_GLOBAL, long, global = true, value_parser = value_parser!(PathBuf))]
    data_dir: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(help_heading = ARGS_GLOBAL, short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Write the aorta and stent parts of every case deck to their own files
    ExtractParts,
    /// Outer-join the nodes of a deck with one column of a result table
    Merge {
        #[arg(value_parser = value_parser!(PathBuf))]
        inp: PathBuf,
        #[arg(value_parser = value_parser!(PathBuf))]
        csv: PathBuf,
        /// Result column to keep
        #[arg(long)]
        column: String,
        #[arg(short = 'o', long, value_parser = value_parser!(PathBuf))]
        output: PathBuf,
    },
    /// Convert one deck, or every case deck when no file is given, to .vtk and .stl
    Convert {
        #[arg(value_parser = value_parser!(PathBuf))]
        inp: Option<PathBuf>,
        /// Write the volume mesh of a single deck as XML (.vtu)
        #[arg(long, requires = "inp")]
        vtu: bool,
    },
    /// Render rotating snapshots of every case
    Render {
        /// Transformations to render (raw, pressure, stress, curvature); the configured ones when omitted
        #[arg(value_delimiter = ',')]
        kinds: Vec<FieldKind>,
    },
    /// Build the side-by-side input/target dataset
    Pair,
    /// Sort snapshots into Good and BAD folders
    Classify,
    /// Average MSE, RMSE and SSIM over the `*_target.png`/`*_fake.png` pairs of a folder
    Metrics {
        #[arg(value_parser = value_parser!(PathBuf))]
        folder: PathBuf,
    },
    /// Mask and score the `*_real.png`/`*_fake.png` pairs of a folder, CSV on stdout
    Evaluate {
        #[arg(value_parser = value_parser!(PathBuf))]
        folder: PathBuf,
        /// Where the masked images go; `evaluation.mask_dir` when omitted
        #[arg(long, value_parser = value_parser!(PathBuf))]
        mask_dir: Option<PathBuf>,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

fn run(cli: Cli) -> Result<(), DatasetError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.dataset.data_dir = data_dir;
    }

    match cli.command {
        Command::ExtractParts => {
            extract_parts_from_inp_files(&config.dataset.patients_path(), &config.files)?;
        }
        Command::Merge { inp, csv, column, output } => {
            write_merged(&inp, &csv, &config.columns.node, &column, &output)?;
        }
        Command::Convert { inp: Some(inp), vtu } => {
            let (vtk, stl) = convert_inp(&inp, vtu)?;
            info!(vtk = %vtk.display(), stl = %stl.display(), "converted");
        }
        Command::Convert { inp: None, .. } => {
            convert_all_inp_files(&config.dataset.patients_path(), &config.files)?;
        }
        Command::Render { kinds } => {
            let kinds = if kinds.is_empty() { config.dataset.transformations.clone() } else { kinds };
            let stats = DatasetRenderer::new(&config).render_all(&kinds)?;
            info!(cases = stats.cases, failed = stats.failed, frames = stats.frames, "done");
        }
        Command::Pair => {
            let dataset = &config.dataset;
            generate_paired_dataset(
                &dataset.images_path(),
                &dataset.paired_path(),
                dataset,
                dataset.paired_input,
                dataset.paired_target,
            )?;
        }
        Command::Classify => {
            let dataset = &config.dataset;
            create_classification_dataset(
                &dataset.images_path(),
                &dataset.classification_path(),
                dataset,
                dataset.classification_source,
                &config.classification.good_cases,
            )?;
        }
        Command::Metrics { folder } => {
            let averages = calculate_metrics(&folder, config.evaluation.resize)?;
            println!("Average MSE: {}", averages.mse);
            println!("Average RMSE: {}", averages.rmse);
            println!("Average SSIM: {}", averages.ssim);
        }
        Command::Evaluate { folder, mask_dir } => {
            let mask_dir = mask_dir.unwrap_or_else(|| config.evaluation.mask_dir.clone());
            let summary = evaluate_folder(&folder, &config.evaluation, &mask_dir)?;
            summary.write_csv(io::stdout().lock())?;
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        process::exit(1);
    }
}

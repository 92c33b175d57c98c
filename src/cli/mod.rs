//! Command-line interface for the Cogent events pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "cogent-events")]
#[command(about = "Cogent log to events table and onset file conversion", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert Cogent logs to events tables
    Convert {
        /// Cogent log file, or log root with sub-NN directories (with --tree)
        input_path: PathBuf,
        /// Events table file, or table root (with --tree)
        output_path: PathBuf,
        /// Convert a whole tree of sub-NN/<stem>_<run>.log files
        #[arg(long)]
        tree: bool,
        /// Duration written to every row, in seconds
        #[arg(long)]
        duration: Option<f64>,
    },

    /// Write three-column onset files from events tables
    Onsets {
        /// Directory containing subject directories (sub-01, sub-02, ...)
        data_dir: PathBuf,
        /// Directory for the onset files (defaults to each table's directory)
        out_dir: Option<PathBuf>,
        /// Task names to process (defaults to all registered tasks)
        tasks: Vec<String>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            let head: String = value.chars().take(36).collect();
            format!("{}...", head)
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    // Dispatch to subcommands
    match cli.command {
        Commands::Convert {
            input_path,
            output_path,
            tree,
            duration,
        } => {
            cmd_convert(&input_path, &output_path, tree, duration, config);
        }
        Commands::Onsets {
            data_dir,
            out_dir,
            tasks,
        } => {
            cmd_onsets(&data_dir, out_dir.as_deref(), &tasks, &config);
        }
    }
}

fn cmd_convert(
    input_path: &Path,
    output_path: &Path,
    tree: bool,
    duration: Option<f64>,
    mut config: PipelineConfig,
) {
    use crate::processors::convert;

    let start = Instant::now();

    if let Some(duration) = duration {
        config.table.duration = duration;
    }

    if tree {
        println!("Converting Cogent log tree...");
        println!("Log root: {}", input_path.display());
        println!("Table root: {}", output_path.display());

        let spinner = create_spinner("Converting logs...");

        match convert::convert_tree(input_path, output_path, &config) {
            Ok(written) => {
                spinner.finish_and_clear();

                print_summary(
                    "Tree Conversion Complete",
                    &[
                        ("Log root", input_path.display().to_string()),
                        ("Table root", output_path.display().to_string()),
                        ("Tables written", written.len().to_string()),
                        ("Task", config.convert.task_name.clone()),
                        ("Duration", format!("{:.2?}", start.elapsed())),
                    ],
                );
            }
            Err(e) => {
                spinner.finish_and_clear();
                error!("Tree conversion failed: {:#}", e);
                std::process::exit(1);
            }
        }
    } else {
        println!("Converting single log...");
        println!("Input: {}", input_path.display());
        println!("Output: {}", output_path.display());

        match convert::convert_log(input_path, output_path, config.table.duration) {
            Ok(stimuli) => {
                print_summary(
                    "Conversion Complete",
                    &[
                        ("Input file", input_path.display().to_string()),
                        ("Output file", output_path.display().to_string()),
                        ("Stimuli", stimuli.to_string()),
                        ("Event duration", format!("{:.3}", config.table.duration)),
                        ("Duration", format!("{:.2?}", start.elapsed())),
                    ],
                );
            }
            Err(e) => {
                error!("Conversion failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}

fn cmd_onsets(data_dir: &Path, out_dir: Option<&Path>, tasks: &[String], config: &PipelineConfig) {
    use crate::processors::onsets;

    let start = Instant::now();

    // Create the output directory if it does not exist
    if let Some(dir) = out_dir {
        if !dir.exists() {
            if let Err(e) = fs::create_dir_all(dir) {
                error!("Failed to create output directory {}: {}", dir.display(), e);
                std::process::exit(1);
            }
        }
    }

    match onsets::write_all_tasks(data_dir, out_dir, tasks, &config.onsets) {
        Ok(written) => {
            let task_list = if tasks.is_empty() {
                onsets::task_names().join(", ")
            } else {
                tasks.join(", ")
            };

            print_summary(
                "Onset Extraction Complete",
                &[
                    ("Data directory", data_dir.display().to_string()),
                    (
                        "Output directory",
                        out_dir
                            .map(|d| d.display().to_string())
                            .unwrap_or_else(|| "(next to tables)".to_string()),
                    ),
                    ("Tasks", task_list),
                    ("Files written", written.len().to_string()),
                    ("Duration", format!("{:.2?}", start.elapsed())),
                ],
            );
        }
        Err(e) => {
            error!("Onset extraction failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

//! Inspection tool for zlabel project, annotation and config files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use zlabel::config::{AppConfig, LogLevel};
use zlabel::model::{Annotation, Project};
use zlabel::{ZlabelResult, logging};

#[derive(Parser, Debug)]
#[command(
    name = "zlabel",
    version,
    about = "Inspect zlabel project, annotation and config files"
)]
struct Cli {
    /// Log at debug level regardless of the configured level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the effective configuration
    Config,
    /// Summarize a project file
    Project {
        /// Path to a `.zproj` file
        file: PathBuf,
    },
    /// List the results of an annotation file
    Annotation {
        /// Path to a `.zlabel` file
        file: PathBuf,
    },
}

fn show_config() -> ZlabelResult<()> {
    let config = AppConfig::load_from_default_path().unwrap_or_default();
    match AppConfig::default_path() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory"),
    }
    println!("{}", config.to_json()?);
    Ok(())
}

fn show_project(path: &Path) -> ZlabelResult<()> {
    let project = Project::load_from_file(path)?;
    println!("{}", project);
    for label in project.labels() {
        let current = if project.key_label() == Some(label.id.as_str()) { "*" } else { " " };
        println!("{} label {} {:<20} {}", current, label.id, label.name, label.color);
    }
    for task in project.tasks() {
        let current = if project.key_task() == Some(task.anno_id.as_str()) { "*" } else { " " };
        let state = if task.finished { "done" } else { "open" };
        println!("{} task  {:<12} {:<5} {}", current, task.anno_id, state, task.filename);
    }
    Ok(())
}

fn show_annotation(path: &Path) -> ZlabelResult<()> {
    let anno = Annotation::load_from_file(path)?;
    println!(
        "Annotation {} for {} ({}x{}), {} results, updated {} by {}",
        anno.id,
        anno.image_path,
        anno.original_width,
        anno.original_height,
        anno.len(),
        anno.updated_at().format("%Y-%m-%d %H:%M:%S"),
        anno.updated_by
    );
    for result in anno.results() {
        let current = if anno.key_result() == Some(result.id.as_str()) { "*" } else { " " };
        let label = result.primary_label().map_or("-", |l| l.name.as_str());
        let r = result.bounding_rect();
        println!(
            "{} {} {:<9} {:<12} {:<10} score {:.2} bbox ({:.1}, {:.1}, {:.1}, {:.1})",
            current,
            result.id,
            result.kind().name(),
            label,
            result.origin,
            result.score,
            r.x,
            r.y,
            r.w,
            r.h
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        AppConfig::load_from_default_path()
            .map(|c| c.preferences.log_level)
            .unwrap_or_default()
    };
    logging::init(level);

    let outcome = match &cli.command {
        Commands::Config => show_config(),
        Commands::Project { file } => show_project(file),
        Commands::Annotation { file } => show_annotation(file),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

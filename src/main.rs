//! Dual Layout CLI
//!
//! Usage:
//!   dual-layout [OPTIONS] <COMMAND>
//!
//! Commands:
//!   devices              List the device registry
//!   tree <DIR>           Print the layer tree of an unpacked layout archive
//!   preview <DIR>        Render an SVG preview
//!   export <DIR>         Print the normalized layout JSON after re-import
//!
//! Options:
//!   --device <ID>        Device profile used for pixel conversion
//!   --settings <FILE>    Settings file (TOML format)
//!   -d, --debug          Verbose logging

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use log::{debug, LevelFilter};

use dual_layout::export::{LayoutArchive, LAYOUT_FILE};
use dual_layout::{
    load_archive, render_preview, Editor, LoadConfig, LoadError, Orientation, Settings,
};

#[derive(Parser)]
#[command(name = "dual-layout")]
#[command(about = "Two-orientation layout editor engine")]
struct Cli {
    /// Device profile used to convert between pixels and normalized fractions
    #[arg(long, global = true)]
    device: Option<String>,

    /// Settings file (TOML format)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the device registry
    Devices,

    /// Print the layer tree of an unpacked layout archive
    Tree {
        dir: PathBuf,
        #[arg(long, default_value = "portrait")]
        orientation: Orientation,
    },

    /// Render an SVG preview of an unpacked layout archive
    Preview {
        dir: PathBuf,
        /// Output file (stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long, default_value = "portrait")]
        orientation: Orientation,
    },

    /// Print the normalized layout JSON after re-import
    Export { dir: PathBuf },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.debug { LevelFilter::Debug } else { LevelFilter::Warn };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let settings = load_settings(cli.settings.as_deref());
    let mut config = LoadConfig::new().with_settings(settings);
    if let Some(device) = &cli.device {
        config = config.with_device(device.clone());
    }

    match cli.command {
        Command::Devices => {
            let registry = config.settings.registry();
            for profile in registry.iter() {
                println!(
                    "{:<20} {:<24} {}x{}",
                    profile.id, profile.name, profile.width, profile.height
                );
            }
        }
        Command::Tree { dir, orientation } => {
            let editor = load_dir(&dir, &config);
            print!("{}", editor.layer_outline(orientation));
        }
        Command::Preview {
            dir,
            output,
            orientation,
        } => {
            let editor = load_dir(&dir, &config);
            let svg = render_preview(&editor, orientation, &config.svg);
            match output {
                Some(path) => {
                    if let Err(e) = fs::write(&path, svg) {
                        eprintln!("Error writing '{}': {}", path.display(), e);
                        std::process::exit(1);
                    }
                }
                None => println!("{}", svg),
            }
        }
        Command::Export { dir } => {
            let editor = load_dir(&dir, &config);
            match editor.export_json() {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing layout: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Settings from `path`, or defaults when no file is given or it does not exist
fn load_settings(path: Option<&Path>) -> Settings {
    let Some(path) = path else {
        return Settings::default();
    };
    if !path.exists() {
        debug!("settings file {} not found, using defaults", path.display());
        return Settings::default();
    }
    match Settings::from_file(path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading settings '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn load_dir(dir: &Path, config: &LoadConfig) -> Editor {
    let archive = match LayoutArchive::from_dir(dir) {
        Ok(archive) => archive,
        Err(e) => {
            eprintln!("Error reading '{}': {}", dir.display(), e);
            std::process::exit(1);
        }
    };
    match load_archive(&archive, config) {
        Ok(editor) => editor,
        Err(LoadError::Import(e)) => {
            let source = String::from_utf8_lossy(archive.get(LAYOUT_FILE).unwrap_or_default());
            eprintln!("{}", e.format(&source, LAYOUT_FILE).trim_end());
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

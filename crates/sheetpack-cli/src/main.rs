use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use sheetpack_core::{PackOutput, TexturePacker, TexturePackerConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "sheetpack",
    about = "Pack a folder of images into texture atlas pages",
    version,
    author
)]
struct Cli {
    // Input/Output
    /// Config file (YAML or JSON, chosen by extension)
    #[arg(help_heading = "Input/Output")]
    config: PathBuf,
    /// Override inputDir
    #[arg(short, long, help_heading = "Input/Output")]
    input_dir: Option<PathBuf>,
    /// Override outputDir
    #[arg(short, long, help_heading = "Input/Output")]
    output_dir: Option<PathBuf>,
    /// Override outputName (files will be name_N.png/.json)
    #[arg(short, long, help_heading = "Input/Output")]
    name: Option<String>,

    // Layout
    /// Override packingOptions.maxWidth
    #[arg(long, help_heading = "Layout")]
    max_width: Option<u32>,
    /// Override packingOptions.maxHeight
    #[arg(long, help_heading = "Layout")]
    max_height: Option<u32>,

    // Export
    /// Print the merged configuration (after file + flags) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: compute layout and stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,

    // Logging/UX
    /// Show a progress spinner (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action = ArgAction::Set, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(short, long, default_value_t = false, help_heading = "Logging/UX")]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);

    let mut cfg = load_config(&cli.config)?;
    apply_overrides(&mut cfg, &cli);
    cfg.validate()
        .with_context(|| format!("config {}", cli.config.display()))?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let out = run(cfg, cli.dry_run, cli.progress && !cli.quiet)?;
    info!("{}", out.stats.summary());
    if cli.dry_run {
        for page in &out.atlas.pages {
            info!(
                image = %page.meta.image,
                w = page.meta.size.w,
                h = page.meta.size.h,
                frames = page.frames.len(),
                "dry run: page not written"
            );
        }
    }
    Ok(())
}

fn run(cfg: TexturePackerConfig, dry_run: bool, show_progress: bool) -> anyhow::Result<PackOutput> {
    let input = cfg.input_dir.clone();
    let output = cfg.output_dir.clone();
    let spinner = show_progress.then(new_spinner);

    let mut packer = TexturePacker::new(cfg).dry_run(dry_run);
    if let Some(s) = &spinner {
        s.set_message(format!("loading {}", input.display()));
    }
    packer
        .process()
        .with_context(|| format!("read images from {}", input.display()))?;

    if let Some(s) = &spinner {
        s.set_message(format!("packing {} images", packer.images().len()));
    }
    let out = packer
        .pack()
        .with_context(|| format!("pack atlas into {}", output.display()))?;

    if let Some(s) = spinner {
        s.finish_and_clear();
    }
    Ok(out)
}

fn new_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}

fn load_config(path: &Path) -> anyhow::Result<TexturePackerConfig> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_ascii_lowercase());
    let cfg = match ext.as_deref() {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("parse JSON config {}", path.display()))?,
        Some("yaml" | "yml") => serde_yaml::from_str(&text)
            .with_context(|| format!("parse YAML config {}", path.display()))?,
        _ => bail!(
            "unsupported config extension for {} (expected .yaml, .yml or .json)",
            path.display()
        ),
    };
    Ok(cfg)
}

fn apply_overrides(cfg: &mut TexturePackerConfig, cli: &Cli) {
    if let Some(v) = &cli.input_dir {
        cfg.input_dir = v.clone();
    }
    if let Some(v) = &cli.output_dir {
        cfg.output_dir = v.clone();
    }
    if let Some(v) = &cli.name {
        cfg.output_name = v.clone();
    }
    if let Some(v) = cli.max_width {
        cfg.packing_options.max_width = v;
    }
    if let Some(v) = cli.max_height {
        cfg.packing_options.max_height = v;
    }
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

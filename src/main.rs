use clap::{Parser, Subcommand};
use image_versions::catalog::JsonCatalog;
use image_versions::imaging::RustBackend;
use image_versions::records::{ImageId, ImageRecord};
use image_versions::store::LocalFileStore;
use image_versions::versions::{SourceFile, VersionOrchestrator};
use image_versions::{config, maintenance, output};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "image-versions")]
#[command(about = "Store images and derive named versions from them")]
#[command(long_about = "\
Store images and derive named versions from them

Each ingested image keeps its original plus one file per version configured
for its group, all under images_root:

  www/images/
  ├── 12_Xq3...9Lk.jpg           # original (autorotated)
  ├── 12_Xq3...9Lk_thumb.jpg     # version \"thumb\"
  └── 12_Xq3...9Lk_large.jpg     # version \"large\"

Records live in a JSON catalog (--catalog). Versions are generated in the
order the group lists them; if any one fails, the whole image is rolled back.

Run 'image-versions gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// JSON catalog holding image and version records
    #[arg(long, default_value = "images.json", global = true)]
    catalog: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store an image file and generate its group's versions
    Ingest {
        file: PathBuf,
        /// Group whose versions to generate (none: original only)
        #[arg(long)]
        group: Option<String>,
        /// Mark the image as temporary (see purge-temp)
        #[arg(long)]
        temp: bool,
    },
    /// Show an image with its versions
    Show { id: ImageId },
    /// Rotate an image clockwise by any angle (negative: counter-clockwise)
    Rotate {
        id: ImageId,
        #[arg(allow_negative_numbers = true)]
        degrees: i32,
    },
    /// Delete and regenerate all versions of an image
    Regenerate { id: ImageId },
    /// Delete an image with all its versions
    Delete { id: ImageId },
    /// Move pre-token files to the tokenized naming layout
    MigrateNames,
    /// Delete stored files that no record references
    Sweep {
        /// Only list what would be deleted
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete temporary images older than the given age
    PurgeTemp {
        #[arg(long)]
        older_than_hours: u32,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match cli.command {
        Command::GenConfig => print!("{}", config::stock_config_toml()),
        command => run(command, &cli.config_dir, &cli.catalog)?,
    }

    Ok(())
}

fn run(
    command: Command,
    config_dir: &Path,
    catalog: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load_config(config_dir)?;
    let catalog = JsonCatalog::open(catalog)?;
    let backend = RustBackend::new();
    let files = LocalFileStore::new();
    let orchestrator = VersionOrchestrator::new(&config, &backend, &files, &catalog);
    let show = |image: &ImageRecord| -> Result<(), Box<dyn std::error::Error>> {
        let versions = orchestrator.versions(image)?;
        output::print_image(image, &versions, orchestrator.namer());
        Ok(())
    };

    match command {
        Command::Ingest { file, group, temp } => {
            let upload = SourceFile::read(&file)?;
            let image = orchestrator.create_from_source(group.as_deref(), &upload, temp)?;
            show(&image)?;
        }
        Command::Show { id } => {
            show(&orchestrator.find_image(id)?)?;
        }
        Command::Rotate { id, degrees } => {
            let mut image = orchestrator.find_image(id)?;
            orchestrator.rotate(&mut image, degrees)?;
            show(&image)?;
        }
        Command::Regenerate { id } => {
            let image = orchestrator.find_image(id)?;
            orchestrator.regenerate_versions(&image)?;
            show(&image)?;
        }
        Command::Delete { id } => {
            let image = orchestrator.find_image(id)?;
            orchestrator.delete_image(&image)?;
            println!("Deleted image {id}");
        }
        Command::MigrateNames => {
            let report = maintenance::migrate_legacy_names(&orchestrator)?;
            output::print_lines(&output::format_migration(&report));
        }
        Command::Sweep { dry_run } => {
            let orphans = maintenance::sweep_orphans(&orchestrator, dry_run)?;
            output::print_lines(&output::format_sweep(&orphans, dry_run));
        }
        Command::PurgeTemp { older_than_hours } => {
            let cutoff = chrono::Utc::now().timestamp() - i64::from(older_than_hours) * 3600;
            let purged = maintenance::purge_temp_images(&orchestrator, cutoff)?;
            output::print_lines(&output::format_purge(&purged));
        }
        Command::GenConfig => unreachable!("gen-config is handled before any config is loaded"),
    }

    Ok(())
}

use crate::error::{GeoSyncError, Result};
use clap::{Parser, Subcommand};
use geo_sync_common::{presets, Job};
use std::path::Path;

#[derive(Parser)]
#[command(name = "geo-sync")]
#[command(about = "Geocode spreadsheet rows and sync them with the content admin", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Look rows up in the geocoders and write the results next to them
    Enrich {
        /// Preset name or job JSON file
        #[arg(required = true)]
        job: String,

        /// Use another worksheet of the same spreadsheet
        #[arg(short = 'w', long)]
        worksheet: Option<String>,

        /// Stop at the first failed lookup and write nothing
        #[arg(long)]
        abort_on_error: bool,

        /// Pause between lookups in milliseconds (default from settings)
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Create admin entries from rows through the browser
    Upload {
        /// Preset name or job JSON file
        #[arg(required = true)]
        job: String,

        #[arg(short = 'w', long)]
        worksheet: Option<String>,

        /// Fill forms without saving
        #[arg(long, conflicts_with = "no_dry_run")]
        dry_run: bool,

        /// Save forms (overrides DRY_RUN)
        #[arg(long)]
        no_dry_run: bool,

        /// Run the browser without a window
        #[arg(long)]
        headless: bool,

        /// Stop after the first failed row
        #[arg(long)]
        abort_on_error: bool,
    },

    /// Read fields from admin change pages into the sheet
    Extract {
        /// Preset name or job JSON file
        #[arg(required = true)]
        job: String,

        #[arg(short = 'w', long)]
        worksheet: Option<String>,

        #[arg(long)]
        headless: bool,
    },

    /// List built-in jobs
    Presets {
        /// Print the job as JSON
        #[arg(long)]
        show: Option<String>,
    },

    /// Show or edit settings
    Config {
        /// Save the Google Maps API key
        #[arg(long)]
        set_api_key: Option<String>,

        /// Show settings
        #[arg(long)]
        show: bool,

        /// Write a settings template to ./geo-sync.json
        #[arg(long)]
        init: bool,
    },
}

/// A job file when the path exists, otherwise a preset name
pub fn resolve_job(name_or_path: &str) -> Result<Job> {
    let path = Path::new(name_or_path);
    if path.is_file() {
        return Ok(Job::from_file(path)?);
    }
    presets::get(name_or_path).ok_or_else(|| {
        GeoSyncError::Config(format!(
            "{} is neither a job file nor a preset ({})",
            name_or_path,
            presets::names().collect::<Vec<_>>().join(", ")
        ))
    })
}

/// `Some(false)` for --no-dry-run, `Some(true)` for --dry-run
pub fn dry_run_override(dry_run: bool, no_dry_run: bool) -> Option<bool> {
    match (dry_run, no_dry_run) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

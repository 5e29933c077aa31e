use anyhow::{bail, Context, Result};
use clap::Parser;
use dialoguer::Input;
use geo_sheet_sync::admin::{
    login, ExtractReport, ExtractionPass, SubmissionPass, SubmissionReport, WebDriverConsole,
};
use geo_sheet_sync::cli::{dry_run_override, resolve_job, Cli, Commands};
use geo_sheet_sync::config::{Settings, LOCAL_CONFIG_FILE};
use geo_sheet_sync::geocode::{GoogleGeocoder, NominatimClient};
use geo_sheet_sync::logging;
use geo_sheet_sync::pass::EnrichmentPass;
use geo_sheet_sync::sheets::{open_store, TabularStore};
use geo_sync_common::{presets, EnrichJob, ExtractJob, Job, LookupFailurePolicy, UploadJob};
use std::path::PathBuf;
use std::time::Duration;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let mut settings = Settings::load().context("loading settings")?;

    match cli.command {
        Commands::Enrich {
            job,
            worksheet,
            abort_on_error,
            delay_ms,
        } => {
            let mut job = enrich_job(&job)?;
            if let Some(worksheet) = worksheet {
                job.source.set_worksheet(worksheet);
            }
            if abort_on_error {
                job.on_lookup_error = LookupFailurePolicy::Abort;
            }
            let delay = Duration::from_millis(delay_ms.unwrap_or(settings.request_delay_ms));

            println!("🌍 geo-sync - enrich {}\n", job.name);

            println!("[1/3] Opening {}...", job.source.worksheet());
            let mut store = open_store(&job.source, &settings).await?;

            println!("[2/3] Looking up rows...");
            let lookup = NominatimClient::new(&settings)?.with_country_codes(&job.country_codes);
            let localize = job.localize.is_some();
            let mut pass = EnrichmentPass::new(job, Box::new(lookup))
                .with_delay(delay)
                .with_progress(true);
            if localize {
                pass = pass.with_localizer(Box::new(GoogleGeocoder::new(&settings)?));
            }
            let report = pass
                .run(store.as_mut())
                .await
                .with_context(|| format!("enrich pass {}", pass.job().name))?;

            println!("[3/3] Written to {}", store.describe());
            println!("\n✅ {}", report);
        }

        Commands::Upload {
            job,
            worksheet,
            dry_run,
            no_dry_run,
            headless,
            abort_on_error,
        } => {
            let mut job = upload_job(&job)?;
            if let Some(worksheet) = worksheet {
                job.source.set_worksheet(worksheet);
            }
            if abort_on_error {
                job.on_row_failure = LookupFailurePolicy::Abort;
            }
            if let Some(dry_run) = dry_run_override(dry_run, no_dry_run) {
                settings.dry_run = dry_run;
            }
            settings.headless |= headless;

            println!(
                "🚡 geo-sync - upload {}{}\n",
                job.name,
                if settings.dry_run { " (dry run)" } else { "" }
            );

            let mut store = open_store(&job.source, &settings).await?;
            let mut console = WebDriverConsole::start(&settings).await?;

            let outcome = upload(&mut console, store.as_mut(), job, &settings).await;

            finish_browser(console, &settings).await?;
            let report = outcome.context("upload pass")?;
            println!("\n✅ {}", report);
        }

        Commands::Extract {
            job,
            worksheet,
            headless,
        } => {
            let mut job = extract_job(&job)?;
            if let Some(worksheet) = worksheet {
                job.source.set_worksheet(worksheet);
            }
            settings.headless |= headless;

            println!("🔎 geo-sync - extract {}\n", job.name);

            let mut store = open_store(&job.source, &settings).await?;
            let mut console = WebDriverConsole::start(&settings).await?;

            let outcome = extract(&mut console, store.as_mut(), job, &settings).await;

            finish_browser(console, &settings).await?;
            let report = outcome.context("extract pass")?;
            println!("\n✅ {}", report);
        }

        Commands::Presets { show } => match show {
            Some(name) => {
                let job = resolve_job(&name)?;
                println!("{}", serde_json::to_string_pretty(&job)?);
            }
            None => {
                println!("Built-in jobs:");
                for (name, description) in presets::describe() {
                    println!("  {:<16} {}", name, description);
                }
            }
        },

        Commands::Config {
            set_api_key,
            show,
            init,
        } => {
            if init {
                let path = PathBuf::from(LOCAL_CONFIG_FILE);
                if path.exists() {
                    bail!("{} already exists", path.display());
                }
                Settings::default().save(&path)?;
                println!("✔ Template written: {}", path.display());
            }

            if let Some(key) = set_api_key {
                settings.google_maps_api_key = Some(key);
                let path = Settings::user_config_path()?;
                settings.save(&path)?;
                println!("✔ API key saved to {}", path.display());
            }

            if show {
                print_settings(&settings);
            }
        }
    }

    Ok(())
}

fn enrich_job(name: &str) -> Result<EnrichJob> {
    match resolve_job(name)? {
        Job::Enrich(job) => Ok(job),
        other => wrong_pass(&other, "enrich"),
    }
}

fn upload_job(name: &str) -> Result<UploadJob> {
    match resolve_job(name)? {
        Job::Upload(job) => Ok(job),
        other => wrong_pass(&other, "upload"),
    }
}

fn extract_job(name: &str) -> Result<ExtractJob> {
    match resolve_job(name)? {
        Job::Extract(job) => Ok(job),
        other => wrong_pass(&other, "extract"),
    }
}

fn wrong_pass<T>(job: &Job, wanted: &str) -> Result<T> {
    bail!(
        "{} is an {} job, not {}; run `geo-sync {} {}`",
        job.name(),
        job.pass_name(),
        wanted,
        job.pass_name(),
        job.name()
    )
}

async fn upload(
    console: &mut WebDriverConsole,
    store: &mut dyn TabularStore,
    job: UploadJob,
    settings: &Settings,
) -> geo_sheet_sync::error::Result<SubmissionReport> {
    login::ensure_logged_in(console, settings, Duration::from_secs(1)).await?;
    SubmissionPass::new(job, settings)
        .with_progress(true)
        .run(console, store)
        .await
}

async fn extract(
    console: &mut WebDriverConsole,
    store: &mut dyn TabularStore,
    job: ExtractJob,
    settings: &Settings,
) -> geo_sheet_sync::error::Result<ExtractReport> {
    login::ensure_logged_in(console, settings, Duration::from_secs(1)).await?;
    ExtractionPass::new(job, settings)
        .with_progress(true)
        .run(console, store)
        .await
}

async fn finish_browser(console: WebDriverConsole, settings: &Settings) -> Result<()> {
    if settings.keep_browser_open {
        let _: String = Input::new()
            .with_prompt("Press Enter to exit (the browser stays open)")
            .allow_empty(true)
            .interact_text()
            .context("waiting for Enter")?;
    }
    console.close().await?;
    Ok(())
}

fn print_settings(settings: &Settings) {
    let mask = |v: &Option<String>| if v.is_some() { "set" } else { "not set" };
    println!("Settings:");
    println!("  Credentials:      {}", settings.credentials_path.display());
    println!("  Maps API key:     {}", mask(&settings.google_maps_api_key));
    println!("  Nominatim:        {}", settings.nominatim_url);
    println!("  Admin URL:        {}", settings.admin_url);
    println!("  WebDriver:        {}", settings.webdriver_url);
    println!("  Dry run:          {}", settings.dry_run);
    println!("  Headless:         {}", settings.headless);
    println!("  Keep browser:     {}", settings.keep_browser_open);
    println!(
        "  Google account:   {}",
        settings.google_account_identifier.as_deref().unwrap_or("not set")
    );
    println!("  Google password:  {}", mask(&settings.google_account_password));
    println!("  Timeout:          {}s", settings.timeout_seconds);
    println!("  Request delay:    {}ms", settings.request_delay_ms);
}

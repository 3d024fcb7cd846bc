use chrono::{DateTime, Duration, Local, Utc};
use clap::{Parser, Subcommand};
use drinklog_core::config::DataConfig;
use drinklog_core::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "drinklog")]
#[command(about = "Drink log with a live blood alcohol estimate", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the current estimate (default)
    Status,

    /// Log a drink
    Add {
        /// Drink type (beer, beer_fluitje, beer_vaasje, beer_pint, beer_blikje,
        /// wine, spirits, cocktail, other)
        drink_type: String,

        /// Backdate the drink by this many minutes
        #[arg(long, default_value_t = 0)]
        minutes_ago: i64,
    },

    /// Keep the estimate updated on screen
    Watch {
        /// Stop after this many updates
        #[arg(long)]
        ticks: Option<usize>,

        /// Seconds between updates (defaults to the configured interval)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Remove a logged drink by id
    Remove { id: uuid::Uuid },

    /// Remove every logged drink
    Clear,

    /// Per-day drinks and peak estimate
    History {
        /// Number of days to look back
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Show or update the body profile used for estimates
    Profile {
        /// Body mass in kilograms
        #[arg(long)]
        mass: Option<f64>,

        /// Physiology category (male, female, other)
        #[arg(long)]
        category: Option<String>,
    },

    /// Export the drink log to CSV
    Export { path: PathBuf },

    /// Import drinks from CSV
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    drinklog_core::logging::init();

    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_config_path);
    let config = if config_path.exists() {
        Config::load_from(&config_path)?
    } else {
        Config::default()
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let log_path = DataConfig::log_path(&data_dir);
    tracing::debug!("Using drink log {:?}", log_path);

    match cli.command {
        Some(Commands::Add {
            drink_type,
            minutes_ago,
        }) => cmd_add(&log_path, &drink_type, minutes_ago, &config),
        Some(Commands::Watch {
            ticks,
            interval_secs,
        }) => cmd_watch(&log_path, ticks, interval_secs, &config),
        Some(Commands::Remove { id }) => cmd_remove(&log_path, id),
        Some(Commands::Clear) => cmd_clear(&log_path),
        Some(Commands::History { days }) => cmd_history(&log_path, days, &config),
        Some(Commands::Profile { mass, category }) => {
            cmd_profile(&config_path, config, mass, category)
        }
        Some(Commands::Export { path }) => cmd_export(&log_path, &path),
        Some(Commands::Import { path }) => cmd_import(&log_path, &path),
        Some(Commands::Status) | None => cmd_status(&log_path, &config),
    }
}

fn current_estimate(log_path: &Path, config: &Config) -> Result<BacEstimate> {
    let entries = drinklog_core::log::read_entries(log_path)?;
    Ok(estimate_from(&entries, config, Utc::now()))
}

fn estimate_from(entries: &[DrinkEntry], config: &Config, now: DateTime<Utc>) -> BacEstimate {
    let profile = config.profile.to_profile();
    let lookback = config.live.to_settings().lookback;
    let events = events_since(entries, now, lookback);
    estimate(&events, profile.mass_kg, profile.category, now)
}

fn cmd_status(log_path: &Path, config: &Config) -> Result<()> {
    let now = Utc::now();
    let entries = drinklog_core::log::read_entries(log_path)?;
    let estimate = estimate_from(&entries, config, now);
    display_estimate(&estimate);

    // Most recent drink inside the live window
    let since = now
        .checked_sub_signed(config.live.to_settings().lookback)
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let recent = drinklog_core::log::entries_in_range(&entries, since, now);
    if let Some(last) = drinklog_core::log::last_entry(&recent) {
        println!(
            "  Last drink: {} at {}",
            drink_name(last.drink_type),
            last.occurred_at.with_timezone(&Local).format("%H:%M")
        );
    }
    Ok(())
}

fn cmd_add(log_path: &Path, drink_type: &str, minutes_ago: i64, config: &Config) -> Result<()> {
    let drink_type: DrinkType = drink_type.parse()?;
    if minutes_ago < 0 {
        return Err(Error::Other("--minutes-ago cannot be negative".into()));
    }

    let occurred_at = Duration::try_minutes(minutes_ago)
        .and_then(|ago| Utc::now().checked_sub_signed(ago))
        .ok_or_else(|| Error::Other(format!("--minutes-ago {} is out of range", minutes_ago)))?;

    let entry = DrinkEntry::new(drink_type, occurred_at);
    let mut log = JsonlLog::new(log_path);
    log.append(&entry)?;
    tracing::debug!("Logged {} at {}", entry.id, entry.occurred_at);

    match get_default_catalog().get(drink_type) {
        Some(spec) => println!("✓ Logged {} {} ml ({})", spec.name, spec.volume_ml, entry.id),
        None => println!("✓ Logged {} ({})", drink_type, entry.id),
    }

    let estimate = current_estimate(log_path, config)?;
    if estimate.is_configured {
        println!(
            "  BAC now {} ({})",
            format_concentration(estimate.concentration),
            trend_label(estimate.trend)
        );
    }
    Ok(())
}

fn cmd_watch(
    log_path: &Path,
    ticks: Option<usize>,
    interval_secs: Option<u64>,
    config: &Config,
) -> Result<()> {
    let mut settings = config.live.to_settings();
    if let Some(secs) = interval_secs {
        settings.refresh_interval = std::time::Duration::from_secs(secs.max(1));
    }

    let mut entries = drinklog_core::log::read_entries(log_path)?;
    let events: Vec<ConsumptionEvent> = entries.iter().map(DrinkEntry::to_event).collect();

    let (tx, rx) = mpsc::channel();
    let monitor = LiveMonitor::spawn(settings, events, config.profile.to_profile(), tx)?;

    let mut seen = 0;
    while let Ok(estimate) = rx.recv() {
        display_estimate_line(&estimate);
        seen += 1;
        if ticks.is_some_and(|limit| seen >= limit) {
            break;
        }

        // Drinks logged by another process trigger an immediate update
        let latest = drinklog_core::log::read_entries(log_path)?;
        if latest != entries {
            tracing::debug!("Drink log changed ({} drinks)", latest.len());
            entries = latest;
            monitor.update_events(entries.iter().map(DrinkEntry::to_event).collect());
        }
    }

    monitor.shutdown();
    Ok(())
}

fn cmd_remove(log_path: &Path, id: uuid::Uuid) -> Result<()> {
    if drinklog_core::log::remove_entry(log_path, id)? {
        println!("✓ Removed {}", id);
        Ok(())
    } else {
        tracing::warn!("Remove requested for unknown drink {}", id);
        Err(Error::Log(format!("No drink with id {}", id)))
    }
}

fn cmd_clear(log_path: &Path) -> Result<()> {
    let count = drinklog_core::log::clear(log_path)?;
    println!("✓ Removed {} drinks", count);
    Ok(())
}

fn cmd_history(log_path: &Path, days: i64, config: &Config) -> Result<()> {
    let profile = config.profile.to_profile();
    let entries = load_recent_entries(log_path, Utc::now(), days)?;
    if !profile.is_configured() {
        tracing::debug!("Profile incomplete, history peaks will be zero");
    }

    if entries.is_empty() {
        println!("No drinks in the last {} days.", days);
        return Ok(());
    }

    println!("{:<12} {:>6} {:>6} {:>6}", "Date", "Drinks", "kcal", "Peak");
    for day in daily_summaries(&entries, &profile, &Local) {
        println!(
            "{:<12} {:>6} {:>6} {:>6}",
            day.date.format("%Y-%m-%d"),
            day.count,
            day.calories,
            format_concentration(day.peak_concentration)
        );
    }

    let summary = PeriodSummary::compute(&entries, &profile, &Local);
    println!();
    println!(
        "  {} drinks on {} days, {} kcal",
        summary.drink_count, summary.drinking_days, summary.total_calories
    );
    if profile.is_configured() {
        println!(
            "  Highest peak {}, average peak {}",
            format_concentration(summary.highest_peak),
            format_concentration(summary.average_peak)
        );
    }
    Ok(())
}

fn cmd_profile(
    config_path: &Path,
    mut config: Config,
    mass: Option<f64>,
    category: Option<String>,
) -> Result<()> {
    let changed = mass.is_some() || category.is_some();

    if let Some(mass) = mass {
        config.profile.mass_kg = Some(mass);
    }
    if let Some(category) = category {
        config.profile.category = Some(category.parse::<DistributionCategory>()?);
    }

    if changed {
        config.validate()?;
        config.save_to(config_path)?;
        println!("✓ Profile saved");
    }

    let mass = config
        .profile
        .mass_kg
        .map(|m| format!("{} kg", m))
        .unwrap_or_else(|| "not set".into());
    let category = config
        .profile
        .category
        .map(|c| c.as_str().to_string())
        .unwrap_or_else(|| "not set".into());
    println!("  Mass:     {}", mass);
    println!("  Category: {}", category);
    Ok(())
}

fn cmd_export(log_path: &Path, path: &Path) -> Result<()> {
    let entries = drinklog_core::log::read_entries(log_path)?;
    let count = drinklog_core::csv_transfer::export_csv(&entries, path)?;
    println!("✓ Exported {} drinks to {}", count, path.display());
    Ok(())
}

fn cmd_import(log_path: &Path, path: &Path) -> Result<()> {
    let count = drinklog_core::csv_transfer::import_csv(path, log_path)?;
    println!("✓ Imported {} drinks", count);
    Ok(())
}

fn drink_name(drink_type: DrinkType) -> String {
    get_default_catalog()
        .get(drink_type)
        .map(|spec| spec.name.clone())
        .unwrap_or_else(|| drink_type.to_string())
}

fn trend_label(trend: Trend) -> &'static str {
    match trend {
        Trend::Rising => "rising",
        Trend::Declining => "declining",
        Trend::Zero => "zero",
    }
}

fn level_label(level: BacLevel) -> &'static str {
    match level {
        BacLevel::Zero => "zero",
        BacLevel::Low => "low",
        BacLevel::Moderate => "moderate",
        BacLevel::High => "high",
    }
}

fn display_estimate(estimate: &BacEstimate) {
    if !estimate.is_configured {
        println!("Profile not configured.");
        println!("  Run: drinklog profile --mass <kg> --category <male|female|other>");
        return;
    }

    let labels = TimeLabels::default();
    println!();
    println!(
        "  BAC:       {} ({})",
        format_concentration(estimate.concentration),
        level_label(BacLevel::classify(estimate.concentration))
    );
    println!("  Trend:     {}", trend_label(estimate.trend));
    println!(
        "  Sober in:  {}",
        format_time_to_zero(estimate.minutes_to_zero, &labels)
    );
    println!(
        "  Peak:      {}",
        format_concentration(estimate.peak_concentration)
    );
    println!();
}

fn display_estimate_line(estimate: &BacEstimate) {
    let stamp = Local::now().format("%H:%M:%S");
    if !estimate.is_configured {
        println!("[{}] profile not configured", stamp);
        return;
    }
    println!(
        "[{}] BAC {} {} | sober in {}",
        stamp,
        format_concentration(estimate.concentration),
        trend_label(estimate.trend),
        format_time_to_zero(estimate.minutes_to_zero, &TimeLabels::default())
    );
}

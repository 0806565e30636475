use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod grid;

use scheduling_cell::{parse_date, Scheduler};
use shared_config::AppConfig;

/// Prints one day of the front-office schedule grid.
#[derive(Parser, Debug)]
#[command(name = "front-office-grid")]
#[command(about = "Render the operatory schedule for a day")]
struct Args {
    /// Day to show (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<String>,

    /// Column width for each operatory
    #[arg(short, long, default_value_t = 18)]
    width: usize,

    /// Log filter, overrides RUST_LOG
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Loading Env Vars
    dotenv().ok();

    let args = Args::parse();

    // Initialize tracing
    let filter = args
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| "info".into());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let date: NaiveDate = match &args.date {
        Some(raw) => parse_date(raw).with_context(|| format!("invalid --date {}", raw))?,
        None => Local::now().date_naive(),
    };

    let config = AppConfig::from_env();
    if !config.is_configured() {
        anyhow::bail!("SCHEDULER_API_URL must be set");
    }

    info!("Loading schedule for {}", date);
    let mut scheduler = Scheduler::from_config(&config, date);

    if let Err(e) = scheduler.load_config().await {
        warn!("Using default scheduler config: {}", e);
    }
    scheduler
        .load_operatories()
        .await
        .context("failed to load operatories")?;
    scheduler
        .refresh_active_date()
        .await
        .context("failed to load appointments")?;

    let slots = scheduler.slots();
    let operatories = scheduler.operatories().to_vec();
    let index = scheduler.occupancy();

    print!("{}", grid::render_grid(&slots, &operatories, index, args.width));
    Ok(())
}

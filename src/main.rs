use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use israeli_bank_scrapers::clock::SystemClock;
use israeli_bank_scrapers::companies::{CompanyType, LoginField};
use israeli_bank_scrapers::config::{default_config_path, ScraperOptions};
use israeli_bank_scrapers::months::all_months;
use israeli_bank_scrapers::navigation::{current_url, navigate_to};
use israeli_bank_scrapers::scraper::{BrowserSession, BrowserSource};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SCRAPERS_GIT_COMMIT"), ")");

#[derive(Parser)]
#[command(name = "bank-scrapers")]
#[command(about = "Scrape transactions from Israeli banks and credit card companies")]
#[command(version = VERSION)]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Show the effective configuration
    Config,
    /// List the month windows a scrape would fetch
    Months,
    /// List supported institutions and their login fields
    Companies,
    /// Launch the browser, open a URL and print where it landed
    Probe {
        url: String,
    },
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,chromiumoxide=warn,chromiumoxide::conn=off,chromiumoxide::handler=off")
    });
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);
    if json {
        tracing_subscriber::registry().with(filter).with(layer.json()).init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

fn describe_fields(company: CompanyType) -> String {
    company
        .login_fields()
        .iter()
        .map(|field| match field {
            LoginField::Named(name) => (*name).to_string(),
            LoginField::Otp => "otpCodeRetriever | otpLongTermToken".to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

async fn probe(options: &ScraperOptions, url: &str) -> Result<()> {
    let mut session = BrowserSession::new(options.screenshot_path.clone());
    let result = async {
        session.initialize(&BrowserSource::Launch, options).await?;
        let page = session.require_page()?;
        navigate_to(
            page.as_ref(),
            url,
            Default::default(),
            options.navigation_retry_count,
        )
        .await?;
        current_url(page.as_ref(), true).await
    }
    .await;

    let teardown = session.terminate(result.is_ok()).await;
    let landed = result?;
    teardown?;
    println!("{landed}");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let options = ScraperOptions::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    match cli.command {
        Some(Command::Config) => {
            println!("Config file: {}", config_path.display());
            println!("{}", toml::to_string_pretty(&options)?);
        }
        Some(Command::Months) => {
            let clock = SystemClock;
            let start = options.effective_start_date(&clock);
            for month in all_months(start, options.future_months_to_scrape, &clock) {
                println!("{month}");
            }
        }
        Some(Command::Companies) => {
            for company in CompanyType::ALL {
                println!(
                    "{:<18} {:<28} {}",
                    company.id(),
                    company.display_name(),
                    describe_fields(company)
                );
            }
        }
        Some(Command::Probe { url }) => probe(&options, &url).await?,
        None => {
            println!("Israeli bank scrapers {VERSION}");
            println!("Config: {}\n", config_path.display());
            println!("Commands:");
            println!("  config     Show the effective configuration");
            println!("  months     List the month windows a scrape would fetch");
            println!("  companies  List supported institutions");
            println!("  probe      Open a URL in the scraping browser\n");
            println!("Run 'bank-scrapers --help' for more options.");
        }
    }

    Ok(())
}

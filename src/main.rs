use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use collector_dashboard::config::Config;
use collector_dashboard::db::PgSource;
use collector_dashboard::{report, Dashboard, DataSource, FixtureSource};

#[derive(Parser)]
#[command(name = "collector-dashboard")]
#[command(about = "Financial totals and system checks for collector management", long_about = None)]
struct Cli {
    /// Read records from a JSON fixture instead of Postgres
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,
    /// Rows requested per page (overrides DASHBOARD_PAGE_SIZE)
    #[arg(long, global = true)]
    page_size: Option<i64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print collected, pending and remaining totals
    Totals,
    /// Run the security, member number and role checks
    Checks {
        /// Also export one row per finding to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Generate a markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env(cli.page_size)?;

    let source: Arc<dyn DataSource> = match &cli.fixture {
        Some(path) => Arc::new(
            FixtureSource::load(path)
                .with_context(|| format!("failed to load fixture {}", path.display()))?,
        ),
        None => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set to a production Postgres instance")?;
            Arc::new(
                PgSource::connect(database_url, config.max_connections)
                    .await
                    .context("failed to connect to Postgres")?,
            )
        }
    };

    let dashboard = Dashboard::new(source).with_page_size(config.page_size);
    dashboard.refresh().await;

    match cli.command {
        Commands::Totals => {
            let totals = dashboard
                .load_totals()
                .await
                .context("failed to compute financial totals")?;
            println!("Financial totals:");
            print!("{}", report::render_totals(&totals));
        }
        Commands::Checks { csv } => {
            let groups = dashboard
                .load_checks()
                .await
                .context("failed to run system checks")?;
            print!("{}", report::render_groups(&groups));

            if let Some(path) = csv {
                let written = report::write_checks_csv(&path, &groups)?;
                println!("Exported {written} findings to {}.", path.display());
            }
        }
        Commands::Report { out } => {
            let (totals, groups) = tokio::try_join!(dashboard.load_totals(), dashboard.load_checks())
                .context("failed to gather report data")?;
            let report = report::build_report(chrono::Utc::now(), &totals, &groups);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

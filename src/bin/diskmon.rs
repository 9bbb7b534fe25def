use clap::Parser;
use disk_monitoring::config::Config;
use disk_monitoring::runner::{MonitorRunner, run_handler};
use tracing::{level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Environment file to load before reading configuration
    #[arg(short, long)]
    env_file: Option<String>,
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![
        ("disk_monitoring", LevelFilter::TRACE),
        ("diskmon", LevelFilter::TRACE),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    match &args.env_file {
        Some(path) => {
            dotenv::from_filename(path).ok();
        }
        None => {
            dotenv::dotenv().ok();
        }
    }
    init();
    trace!("started with args: {args:?}");

    let config = Config::from_env();
    let runner = MonitorRunner::new(config);

    let response = run_handler(&runner).await;
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if response.status_code != 200 {
        std::process::exit(1);
    }

    Ok(())
}

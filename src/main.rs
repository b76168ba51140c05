use clap::Parser;
use tracing_subscriber::EnvFilter;
use loadprobe::core::show_result_with_table::show_report_with_table;
use loadprobe::models::args::Args;
use loadprobe::{RunConfig, TargetConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = RunConfig::for_profile(args.profile);
    if let Some(dir) = args.reports_dir {
        config.reports_dir = dir;
    }
    if args.keep_awake {
        config.keep_awake = true;
    }
    // progress bars would interleave with debug output
    if args.verbose {
        config.show_progress = false;
    }

    let mut target = match &args.config {
        Some(path) => TargetConfig::load(path)?,
        None => TargetConfig::default(),
    };
    if let Some(base_url) = args.base_url {
        target.base_url = base_url;
    }
    if let Some(ws_url) = args.ws_url {
        target.duplex.url = Some(ws_url);
    }

    let outcome = loadprobe::run(&config, &target).await?;
    show_report_with_table(&outcome.report);
    println!("Reports written to:");
    println!("  {}", outcome.paths.markdown.display());
    println!("  {}", outcome.paths.json.display());
    Ok(())
}

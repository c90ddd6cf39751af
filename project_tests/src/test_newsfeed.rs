//! # Live Newsfeed Smoke Run
//!
//! Queries the real `newsfeed.search` method for a hashtag over the last few
//! hours, once sequentially and once concurrently, and checks that both runs
//! return one count per hour.
//!
//! Needs a service token in `VK_ACCESS_TOKEN` or in `vkservicetoken.txt`.
//! Counts of live data may drift between the two runs, so only shapes are compared.

use anyhow::{Context, Result, ensure};
use clap::Parser;

use lib_common::configs::NewsfeedSettings;
use lib_common::retrieve::DispatchMode;

#[derive(Parser, Debug)]
struct Args {
    #[clap(long, default_value = "#тест")]
    tag: String,

    #[clap(long, default_value_t = 5)]
    hours: u32,

    #[clap(long, default_value_t = 5)]
    concurrency: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut settings = NewsfeedSettings::default();
    let token = settings.resolve_token(None).context("no VK token available")?;

    println!("--- Starting newsfeed smoke run for {} ---", args.tag);

    // 1. Sequential batch
    println!("\n[Run 1] Sequential dispatch...");
    let sequential = settings.client(token.clone()).get_frequencies(&args.tag, args.hours).await?;
    ensure!(sequential.len() == args.hours as usize, "expected {} counts", args.hours);
    println!("✅ Sequential: {sequential:?}");

    // 2. Concurrent batch
    println!("\n[Run 2] Concurrent dispatch (limit {})...", args.concurrency);
    settings.dispatch = DispatchMode::concurrent(args.concurrency)?;
    let series = settings.client(token).get_frequency_series(&args.tag, args.hours).await?;
    ensure!(series.len() == args.hours as usize, "expected {} windows", args.hours);
    for point in &series {
        println!(
            "   {}h ago [{}, {}): {}",
            point.hours_before,
            point.window.start(),
            point.window.end(),
            point.count
        );
    }
    println!("✅ Concurrent run returned {} windows", series.len());

    println!("\n--- Newsfeed smoke run passed ---");
    Ok(())
}

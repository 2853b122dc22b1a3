//! Example: reactions for one keyword with a real browser.
//!
//! Usage: cargo run --example harvest_keyword -- "#keyword" [cookies.json]

use std::sync::Arc;

use trend_harvest::{
    provider_from_config, BrowserPool, ChromeDriver, HarvestConfig, Harvester, Target,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let keyword = args.next().unwrap_or_else(|| "#rustlang".to_string());

    let mut config = HarvestConfig::default();
    config.identity.cookies_file = args.next().map(Into::into);

    let pool = Arc::new(BrowserPool::new(config.browser.clone()));
    let identity = provider_from_config(&config.identity);
    let harvester = Harvester::new(Arc::new(ChromeDriver::new(Arc::clone(&pool))), identity, config)?;

    println!("Harvesting reactions for: {}", keyword);
    let harvest = harvester.acquire(&Target::keyword(keyword)).await?;

    println!(
        "Found {} reactions across {} candidate URLs",
        harvest.len(),
        harvest.tried_urls.len()
    );
    println!();

    for (i, item) in harvest.items.iter().take(10).enumerate() {
        println!("{}. {}", i + 1, item.text.replace('\n', " "));
        println!("   From: {}", item.source);
    }

    pool.shutdown().await;
    Ok(())
}

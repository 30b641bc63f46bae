//! Simple example of using reqwest-proxy-rotator.

use reqwest_proxy_rotator::{Anonymity, RotatorConfig};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("Initializing proxy rotator...");

    let config = RotatorConfig::builder()
        .anonymity(Anonymity::High)
        .secure(true)
        // check every harvested proxy, 20 at a time
        .live_check(true)
        .probe_batch_size(20)
        .max_pool_size(100)
        .refresh_interval(Duration::from_secs(600))
        .cache_dir(std::env::temp_dir().join("reqwest-proxy-rotator"))
        .max_rotations(5)
        // rate limit for requests through the rotator, avoid getting banned
        .max_requests_per_second(3.0)
        .build();

    let client = reqwest_proxy_rotator::client(config).await?;

    println!("Sending request...");
    let response = client.get("https://httpbin.org/ip").send().await?;

    println!("Status: {}", response.status());
    println!("Response: {}", response.text().await?);

    Ok(())
}

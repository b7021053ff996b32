//! Basic usage example for the Leprosorium client
//!
//! This example demonstrates how to:
//! - Create a client with default and custom settings
//! - Fetch the login page and save the captcha
//! - Log in and fetch a few resources
//!
//! Note: This example talks to the live site. Set LEPRA_USER and
//! LEPRA_PASSWORD, run it once to get the captcha, then run it again with
//! LEPRA_CAPTCHA and LEPRA_LOGIN_CODE set.

use lepra_client::{LepraClient, LoginResult};
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example 1: Create a client with default settings
    println!("=== Example 1: Default Client ===");
    let client = LepraClient::new()?;
    println!("✓ Client created with default base URL ({})", client.base_url());

    // Example 2: Create a client with custom HTTP configuration
    println!("\n=== Example 2: Custom HTTP Configuration ===");
    let _configured_client = LepraClient::builder()
        .client_builder(
            reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(30))
                .use_rustls_tls(),
        )
        .build()?;
    println!("✓ Client created with custom timeout (30s)");

    let (Ok(captcha), Ok(login_code)) = (
        std::env::var("LEPRA_CAPTCHA"),
        std::env::var("LEPRA_LOGIN_CODE"),
    ) else {
        println!("\nFetching login page...");
        let page = client.get_login_page()?;
        std::fs::write("captcha.png", client.get_image(&page.captcha_url)?)?;
        println!("✓ Captcha saved to captcha.png");
        println!("  Set LEPRA_CAPTCHA to its text and LEPRA_LOGIN_CODE={}", page.login_code);
        return Ok(());
    };

    let user = std::env::var("LEPRA_USER").expect("LEPRA_USER environment variable not set");
    let password =
        std::env::var("LEPRA_PASSWORD").expect("LEPRA_PASSWORD environment variable not set");

    println!("\nLogging in as {}...", user);
    match client.login(&user, &password, &captcha, &login_code)? {
        LoginResult::Success => println!("✓ Logged in"),
        LoginResult::Rejected { message } => {
            println!("✗ Login rejected: {}", message);
            return Ok(());
        }
    }

    let panel = client.get_lepro_panel()?;
    println!("\nKarma: {}, rating: {}", panel.karma, panel.rating);

    for post in client.get_latest_posts(None)?.iter().take(5) {
        println!("- #{} by {} ({} comments)", post.id, post.author, post.comment_count);
    }

    Ok(())
}

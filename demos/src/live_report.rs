//! Reads from a real Supabase project.
//!
//! Needs `SUPABASE_URL` and `SUPABASE_ANON_KEY`, plus `DEMO_EMAIL` and
//! `DEMO_PASSWORD` for an existing account. A `.env` file is honoured.

use std::env;

use civic_connect::prelude::*;
use log::warn;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    pretty_env_logger::init();

    let config = Config::from_env()?;
    let client = CivicClient::new(config);

    let email = env::var("DEMO_EMAIL").map_err(|_| "DEMO_EMAIL must be set")?;
    let password = env::var("DEMO_PASSWORD").map_err(|_| "DEMO_PASSWORD must be set")?;

    let signed_in = client.accounts().sign_in(&email, &password).await?;
    let ctx = signed_in.context();
    println!(
        "Signed in as {} -> {}",
        signed_in.user.id,
        client.accounts().home_route(&signed_in.user).path()
    );

    let open = client
        .issues()
        .list(&ctx, &IssueFilter::new().status(IssueStatus::Pending).limit(10))
        .await?;
    println!("{} pending issues", open.len());
    for issue in &open {
        let reporter = issue
            .reporter
            .as_ref()
            .and_then(|r| r.full_name.clone())
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  [{}] {} by {} ({} up, {} comments)",
            issue.category, issue.title, reporter, issue.upvotes, issue.comments_count
        );
    }

    match client.officials().list(&ctx).await {
        Ok(officials) => {
            for official in officials {
                println!("  {} / {}", official.department, official.name);
            }
        }
        Err(err) => warn!("Could not load officials: {}", err),
    }

    match client.notifications().unread_count(&ctx).await {
        Ok(count) => println!("{} unread notifications", count),
        Err(err) => warn!("Could not count notifications: {}", err),
    }

    client.accounts().sign_out(&ctx).await?;
    Ok(())
}

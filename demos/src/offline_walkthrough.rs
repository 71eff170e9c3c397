//! Walks a citizen report through its whole life against the in-memory backends.
//!
//! Run with `RUST_LOG=debug cargo run --bin offline_walkthrough` to see the
//! client's own logging.

use std::sync::Arc;

use civic_connect::geocode::AddressComponents;
use civic_connect::heatmap::HeatmapQuery;
use civic_connect::leaderboard::LeaderboardCategory;
use civic_connect::memory::{MemoryIdentity, MemoryMediaHost, MemoryStore, StaticGeocoder};
use civic_connect::prelude::*;
use log::info;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();

    let spot = Coordinates::new(12.9352, 77.6245)?;
    let geocoder = StaticGeocoder::new().with_address(
        spot,
        AddressComponents {
            street: Some("80 Feet Road".into()),
            city: Some("Bengaluru".into()),
            area: Some("Koramangala".into()),
            ward: Some("Ward 151".into()),
            ..Default::default()
        },
    );
    let identity = Arc::new(MemoryIdentity::new());
    let client = CivicClient::with_backends(
        identity.clone(),
        Arc::new(MemoryStore::new()),
        Arc::new(MemoryMediaHost::default()),
        Arc::new(geocoder),
        ClientOptions::default(),
    );

    println!("1. Sign up a citizen and an administrator");
    let citizen = client
        .accounts()
        .sign_up(SignUpRequest::new("asha@example.com", "secret1", UserType::Citizen).with_name("Asha Rao"))
        .await?;
    let admin = client
        .accounts()
        .sign_up(SignUpRequest::new("clerk@city.example", "secret1", UserType::Administrator))
        .await?;
    identity.grant_role(&admin.user.id, UserType::Administrator);

    let citizen_ctx = match citizen.session {
        Some(session) => RequestContext::from(session),
        None => return Err("citizen signup returned no session".into()),
    };
    let signed_in = client.accounts().sign_in("clerk@city.example", "secret1").await?;
    let admin_ctx = signed_in.context();
    println!("   admin lands on {}", client.accounts().home_route(&signed_in.user).path());

    println!("2. Pick a spot on the map and submit a report with photos");
    let mut draft = IssueDraft::new("Pothole", "Deep pothole in the left lane", IssueCategory::Roads)
        .with_priority(IssuePriority::High);
    let mut pick = MapPick::new();
    pick.tap(spot);
    let fix = client.location_capture().map_pick(&mut draft, pick).await?;
    println!("   location: {}", fix.coordinates.display());

    let photos = [
        MediaFile::new("front.jpg", vec![0xff, 0xd8, 0xff]),
        MediaFile::new("side.png", vec![0x89, 0x50, 0x4e, 0x47]),
    ];
    let submission = client.issues().submit(&citizen_ctx, draft, &photos).await?;
    let issue = submission.issue;
    println!("   issue {} in {:?} with {} images", issue.id, issue.area, issue.images.len());

    println!("3. Vote and comment");
    let vote = client.issues().vote(&citizen_ctx, &issue.id, VoteType::Upvote).await?;
    println!("   {:?} -> {} up / {} down", vote.action, vote.upvotes, vote.downvotes);
    client
        .issues()
        .comment(&citizen_ctx, &issue.id, NewComment::text("Two scooters fell here yesterday"))
        .await?;

    println!("4. Administrator works the issue");
    client.issues().transition(&admin_ctx, &issue.id, IssueStatus::InProgress).await?;
    let resolved = client.issues().transition(&admin_ctx, &issue.id, IssueStatus::Resolved).await?;
    info!("Issue {} is {}", resolved.id, resolved.status);
    if let Err(err) = client.issues().transition(&admin_ctx, &issue.id, IssueStatus::Pending).await {
        println!("   re-opening refused: {}", err);
    }

    println!("5. Leaderboard and heatmap");
    let board = client
        .leaderboard()
        .fetch(&citizen_ctx, Period::Month, LeaderboardCategory::All)
        .await?;
    for entry in &board.podium {
        println!("   #{} {} ({} points)", entry.rank, entry.name, entry.score);
    }
    let heatmap = client.heatmap().hotspots(&citizen_ctx, HeatmapQuery::new(Period::Week)).await?;
    for hotspot in &heatmap.hotspots {
        println!(
            "   {}: {} issues, mostly {} ({:?})",
            hotspot.area, hotspot.issue_count, hotspot.dominant_category, hotspot.intensity
        );
    }

    client.accounts().sign_out(&citizen_ctx).await?;
    println!("Done");
    Ok(())
}

mod common;

use civic_connect::lifecycle::VoteAction;
use civic_connect::memory::{MemoryIdentity, MemoryStore};
use civic_connect::postgrest::Table;
use civic_connect::prelude::*;
use common::{draft, located, Harness};

fn photo(name: &str) -> MediaFile {
    MediaFile::new(name, vec![0xff, 0xd8, 0xff, 0xe0])
}

#[tokio::test]
async fn test_incomplete_report_is_rejected_before_any_upload() {
    let h = Harness::new();
    let ctx = h.citizen("asha@example.com").await;

    let incomplete = IssueDraft {
        description: "Streetlight out".into(),
        category: Some(IssueCategory::Utilities),
        ..Default::default()
    };
    let err = h
        .client
        .issues()
        .submit(&ctx, incomplete, &[photo("a.jpg")])
        .await
        .unwrap_err();

    assert!(err.is_validation());
    assert!(err.to_string().contains("title"));
    assert!(h.media.is_empty());
    assert!(h.store.rows(Table::Issues).is_empty());
}

#[tokio::test]
async fn test_submitted_issue_starts_pending_with_zero_counters() {
    let h = Harness::new();
    let ctx = h.citizen("asha@example.com").await;

    let submission = h
        .client
        .issues()
        .submit(&ctx, draft("Pothole", IssueCategory::Roads), &[photo("a.jpg")])
        .await
        .unwrap();
    let issue = submission.issue;

    assert_eq!(issue.status, IssueStatus::Pending);
    assert_eq!((issue.upvotes, issue.downvotes, issue.comments_count), (0, 0, 0));
    assert_eq!(issue.user_id, ctx.session().unwrap().user_id());
    assert_eq!(issue.images.len(), 1);
    assert!(submission.failed_uploads.is_empty());

    let fetched = h.client.issues().get(&ctx, &issue.id).await.unwrap();
    let reporter = fetched.reporter.expect("reporter embedded");
    assert_eq!(reporter.full_name.as_deref(), Some("Test Citizen"));
}

#[tokio::test]
async fn test_partial_upload_keeps_successful_images() {
    let h = Harness::new();
    let ctx = h.citizen("asha@example.com").await;
    h.media.reject("blurry.jpg");

    let files = [photo("front.jpg"), photo("blurry.jpg"), photo("side.jpg")];
    let submission = h
        .client
        .issues()
        .submit(&ctx, draft("Broken bench", IssueCategory::Other), &files)
        .await
        .unwrap();

    assert_eq!(submission.issue.images.len(), 2);
    assert_eq!(submission.failed_uploads.len(), 1);
    assert_eq!(submission.failed_uploads[0].name, "blurry.jpg");
}

#[tokio::test]
async fn test_all_failed_uploads_abort_the_report() {
    let h = Harness::new();
    let ctx = h.citizen("asha@example.com").await;
    h.media.reject("only.jpg");

    let result = h
        .client
        .issues()
        .submit(&ctx, draft("Graffiti", IssueCategory::Environment), &[photo("only.jpg")])
        .await;

    assert!(matches!(result, Err(Error::Upload(_))));
    assert!(h.store.rows(Table::Issues).is_empty());
}

#[tokio::test]
async fn test_all_or_nothing_aborts_on_any_failure() {
    let h = Harness::with_options(ClientOptions::default().with_upload_policy(UploadPolicy::AllOrNothing));
    let ctx = h.citizen("asha@example.com").await;
    h.media.reject("blurry.jpg");

    let files = [photo("front.jpg"), photo("blurry.jpg")];
    let result = h
        .client
        .issues()
        .submit(&ctx, draft("Broken bench", IssueCategory::Other), &files)
        .await;

    match result {
        Err(Error::Upload(msg)) => assert!(msg.contains("blurry.jpg")),
        other => panic!("Expected Upload error, got {:?}", other),
    }
    assert!(h.store.rows(Table::Issues).is_empty());
}

#[tokio::test]
async fn test_anonymous_caller_cannot_report() {
    let h = Harness::new();
    let result = h
        .client
        .issues()
        .submit(&RequestContext::anonymous(), draft("Pothole", IssueCategory::Roads), &[])
        .await;
    assert!(matches!(result, Err(Error::Auth(_))));
}

#[tokio::test]
async fn test_vote_toggle_and_switch_keep_counters_exact() {
    let h = Harness::new();
    let asha = h.citizen("asha@example.com").await;
    let ravi = h.citizen("ravi@example.com").await;
    let issue = h
        .client
        .issues()
        .submit(&asha, draft("Pothole", IssueCategory::Roads), &[])
        .await
        .unwrap()
        .issue;
    let issues = h.client.issues();

    let up = issues.vote(&asha, &issue.id, VoteType::Upvote).await.unwrap();
    assert_eq!(up.action, VoteAction::Insert(VoteType::Upvote));
    let other = issues.vote(&ravi, &issue.id, VoteType::Upvote).await.unwrap();
    assert_eq!((other.upvotes, other.downvotes), (2, 0));

    let switched = issues.vote(&asha, &issue.id, VoteType::Downvote).await.unwrap();
    assert_eq!(switched.action, VoteAction::Update(VoteType::Downvote));
    assert_eq!((switched.upvotes, switched.downvotes), (1, 1));
    assert_eq!(switched.current_vote(), Some(VoteType::Downvote));

    let toggled = issues.vote(&asha, &issue.id, VoteType::Downvote).await.unwrap();
    assert_eq!(toggled.action, VoteAction::Delete);
    assert_eq!((toggled.upvotes, toggled.downvotes), (1, 0));

    assert_eq!(h.store.rows(Table::IssueVotes).len(), 1);
    assert_eq!(issues.my_vote(&asha, &issue.id).await.unwrap(), None);
    assert_eq!(issues.my_vote(&ravi, &issue.id).await.unwrap(), Some(VoteType::Upvote));
}

#[tokio::test]
async fn test_concurrent_votes_from_different_users_all_count() {
    let h = Harness::new();
    let reporter = h.citizen("asha@example.com").await;
    let issue = h
        .client
        .issues()
        .submit(&reporter, draft("Pothole", IssueCategory::Roads), &[])
        .await
        .unwrap()
        .issue;

    let a = h.citizen("voter1@example.com").await;
    let b = h.citizen("voter2@example.com").await;
    let c = h.citizen("voter3@example.com").await;
    let issues = h.client.issues();
    let (ra, rb, rc) = tokio::join!(
        issues.vote(&a, &issue.id, VoteType::Upvote),
        issues.vote(&b, &issue.id, VoteType::Upvote),
        issues.vote(&c, &issue.id, VoteType::Downvote),
    );
    ra.unwrap();
    rb.unwrap();
    rc.unwrap();

    let issue = issues.get(&reporter, &issue.id).await.unwrap();
    assert_eq!((issue.upvotes, issue.downvotes), (2, 1));
}

#[tokio::test]
async fn test_recount_mode_maintains_counters_without_triggers() {
    let h = Harness::build(
        MemoryIdentity::new(),
        MemoryStore::new().without_counter_triggers(),
        ClientOptions::default().with_counter_sync(CounterSync::Recount),
    );
    let asha = h.citizen("asha@example.com").await;
    let ravi = h.citizen("ravi@example.com").await;
    let issue = h
        .client
        .issues()
        .submit(&asha, draft("Leaking pipe", IssueCategory::Utilities), &[])
        .await
        .unwrap()
        .issue;
    let issues = h.client.issues();

    issues.vote(&asha, &issue.id, VoteType::Upvote).await.unwrap();
    let outcome = issues.vote(&ravi, &issue.id, VoteType::Downvote).await.unwrap();
    assert_eq!((outcome.upvotes, outcome.downvotes), (1, 1));

    issues
        .comment(&ravi, &issue.id, NewComment::text("Water everywhere"))
        .await
        .unwrap();
    issues
        .comment(&asha, &issue.id, NewComment::text("Still leaking"))
        .await
        .unwrap();

    let stored = issues.get(&asha, &issue.id).await.unwrap();
    assert_eq!((stored.upvotes, stored.downvotes, stored.comments_count), (1, 1, 2));
}

#[tokio::test]
async fn test_comments_count_and_order() {
    let h = Harness::new();
    let ctx = h.citizen("asha@example.com").await;
    let issue = h
        .client
        .issues()
        .submit(&ctx, draft("Fallen tree", IssueCategory::Safety), &[])
        .await
        .unwrap()
        .issue;
    let issues = h.client.issues();

    issues.comment(&ctx, &issue.id, NewComment::text("first")).await.unwrap();
    issues.comment(&ctx, &issue.id, NewComment::text("second")).await.unwrap();

    let comments = issues.comments(&ctx, &issue.id).await.unwrap();
    let contents: Vec<&str> = comments.iter().map(|c| c.content.as_str()).collect();
    assert_eq!(contents, ["second", "first"]);
    assert_eq!(
        comments[0].author.as_ref().and_then(|a| a.full_name.as_deref()),
        Some("Test Citizen")
    );
    assert_eq!(issues.get(&ctx, &issue.id).await.unwrap().comments_count, 2);

    let missing = issues.comment(&ctx, "no-such-issue", NewComment::text("hello")).await;
    assert!(matches!(missing, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_list_filters_combine_and_newest_comes_first() {
    let h = Harness::new();
    let ctx = h.citizen("asha@example.com").await;
    let issues = h.client.issues();

    let reports = [
        located("Pothole A", IssueCategory::Roads, "Indiranagar", 12.97, 77.64),
        located("Streetlight", IssueCategory::Utilities, "Indiranagar", 12.98, 77.64),
        located("Pothole B", IssueCategory::Roads, "Jayanagar", 12.93, 77.58),
        located("Pothole C", IssueCategory::Roads, "Indiranagar", 12.96, 77.65),
    ];
    for report in reports {
        issues.submit(&ctx, report, &[]).await.unwrap();
    }

    let all = issues.list(&ctx, &IssueFilter::new()).await.unwrap();
    let titles: Vec<&str> = all.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["Pothole C", "Pothole B", "Streetlight", "Pothole A"]);

    let roads_in_indiranagar = issues
        .list(
            &ctx,
            &IssueFilter::new()
                .category(IssueCategory::Roads)
                .area("Indiranagar"),
        )
        .await
        .unwrap();
    let titles: Vec<&str> = roads_in_indiranagar.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(titles, ["Pothole C", "Pothole A"]);

    let boxed = issues
        .list(
            &ctx,
            &IssueFilter::new().within(BoundingBox {
                min_lat: 12.95,
                min_lng: 77.60,
                max_lat: 12.975,
                max_lng: 77.66,
            }),
        )
        .await
        .unwrap();
    assert_eq!(boxed.len(), 2);
    assert!(boxed.iter().all(|i| i.category == IssueCategory::Roads));

    let limited = issues.list(&ctx, &IssueFilter::new().limit(1)).await.unwrap();
    assert_eq!(limited[0].title, "Pothole C");

    let none = issues
        .list(&ctx, &IssueFilter::new().status(IssueStatus::Resolved))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_status_workflow_is_forward_only_and_admin_only() {
    let h = Harness::new();
    let citizen = h.citizen("asha@example.com").await;
    let admin = h.admin().await;
    let issue = h
        .client
        .issues()
        .submit(&citizen, draft("Pothole", IssueCategory::Roads), &[])
        .await
        .unwrap()
        .issue;
    let issues = h.client.issues();

    let denied = issues.transition(&citizen, &issue.id, IssueStatus::InProgress).await;
    assert!(matches!(denied, Err(Error::Forbidden(_))));

    let working = issues
        .transition(&admin, &issue.id, IssueStatus::InProgress)
        .await
        .unwrap();
    assert_eq!(working.status, IssueStatus::InProgress);

    let back = issues.transition(&admin, &issue.id, IssueStatus::Pending).await;
    assert!(matches!(back, Err(Error::InvalidTransition { .. })));

    let done = issues
        .transition(&admin, &issue.id, IssueStatus::Resolved)
        .await
        .unwrap();
    assert_eq!(done.status, IssueStatus::Resolved);

    let reopen = issues.transition(&admin, &issue.id, IssueStatus::InProgress).await;
    match reopen {
        Err(Error::InvalidTransition { from, to }) => {
            assert_eq!(from, "resolved");
            assert_eq!(to, "in_progress");
        }
        other => panic!("Expected InvalidTransition, got {:?}", other),
    }
}

#[tokio::test]
async fn test_edit_and_assign_permissions() {
    let h = Harness::new();
    let asha = h.citizen("asha@example.com").await;
    let ravi = h.citizen("ravi@example.com").await;
    let admin = h.admin().await;
    let issue = h
        .client
        .issues()
        .submit(&asha, draft("Pothole", IssueCategory::Roads), &[])
        .await
        .unwrap()
        .issue;
    let issues = h.client.issues();

    let patch = IssuePatch {
        priority: Some(IssuePriority::High),
        ..Default::default()
    };
    let stranger = issues.update(&ravi, &issue.id, patch.clone()).await;
    assert!(matches!(stranger, Err(Error::Forbidden(_))));
    let edited = issues.update(&asha, &issue.id, patch).await.unwrap();
    assert_eq!(edited.priority, IssuePriority::High);

    let empty = issues.update(&asha, &issue.id, IssuePatch::default()).await;
    assert!(empty.unwrap_err().is_validation());

    assert!(matches!(
        issues.assign(&asha, &issue.id, "Roads Department").await,
        Err(Error::Forbidden(_))
    ));
    let assigned = issues
        .assign(&admin, &issue.id, "Roads Department")
        .await
        .unwrap();
    assert_eq!(assigned.assigned_to.as_deref(), Some("Roads Department"));
}

#[tokio::test]
async fn test_report_vote_resolve_end_to_end() {
    let h = Harness::new();
    let asha = h.citizen("asha@example.com").await;
    let admin = h.admin().await;
    let issues = h.client.issues();

    let issue = issues
        .submit(
            &asha,
            located("Open manhole", IssueCategory::Safety, "Koramangala", 12.93, 77.62),
            &[photo("manhole.jpg")],
        )
        .await
        .unwrap()
        .issue;
    issues.vote(&asha, &issue.id, VoteType::Upvote).await.unwrap();
    issues
        .comment(&admin, &issue.id, NewComment::text("Crew dispatched"))
        .await
        .unwrap();
    issues
        .transition(&admin, &issue.id, IssueStatus::Resolved)
        .await
        .unwrap();

    let mine = issues.mine(&asha).await.unwrap();
    assert_eq!(mine.len(), 1);
    let issue = &mine[0];
    assert_eq!(issue.status, IssueStatus::Resolved);
    assert_eq!(issue.score(), 1);
    assert_eq!(issue.comments_count, 1);
    assert_eq!(issue.area.as_deref(), Some("Koramangala"));

    let stats = issues.stats(&admin).await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.resolved, 1);
    assert_eq!(stats.pending, 0);
}

use civic_connect::models::IssueStatus;

const SCHEMA: &str = include_str!("../supabase/migrations/0001_schema.sql");

/// The body of a `create or replace function`, up to its closing `$$;`
fn function_body(name: &str) -> &'static str {
    let marker = format!("create or replace function public.{}(", name);
    let start = SCHEMA
        .find(&marker)
        .unwrap_or_else(|| panic!("function {} is missing", name));
    let rest = &SCHEMA[start..];
    let end = rest.find("$$;").expect("function body is terminated");
    &rest[..end]
}

fn policy(name: &str) -> &'static str {
    let marker = format!("create policy {} ", name);
    let start = SCHEMA
        .find(&marker)
        .unwrap_or_else(|| panic!("policy {} is missing", name));
    let rest = &SCHEMA[start..];
    let end = rest.find(");").map_or(rest.len(), |n| n + 2);
    &rest[..end]
}

#[test]
fn issue_updates_run_through_the_guard_trigger() {
    assert!(SCHEMA.contains(
        "create trigger issues_guard\n  before update on public.issues\n  for each row execute function public.guard_issue_update();"
    ));

    let guard = function_body("guard_issue_update");
    assert!(guard.contains("public.current_role_claim() <> 'administrator'"));
    assert!(guard.contains("'service_role'"));
}

#[test]
fn status_guard_allows_exactly_the_workflow_edges() {
    let guard = function_body("guard_issue_update");
    let all = [IssueStatus::Pending, IssueStatus::InProgress, IssueStatus::Resolved];

    for from in all {
        for to in all {
            let edge = format!("('{}', '{}')", from.as_str(), to.as_str());
            assert_eq!(
                guard.contains(&edge),
                from.can_transition_to(to),
                "edge {} disagrees with the client workflow",
                edge
            );
        }
    }
}

#[test]
fn counter_columns_only_accept_true_counts() {
    let guard = function_body("guard_issue_update");
    for column in ["upvotes", "downvotes", "comments_count"] {
        assert!(guard.contains(&format!("new.{}", column)), "{} is unguarded", column);
    }
    assert!(guard.contains("from public.issue_votes where issue_id = new.id and vote_type = 'upvote'"));
    assert!(guard.contains("from public.issue_votes where issue_id = new.id and vote_type = 'downvote'"));
    assert!(guard.contains("from public.issue_comments where issue_id = new.id"));
}

#[test]
fn signup_claims_only_self_service_roles() {
    assert!(SCHEMA.contains(
        "create trigger on_auth_user_claim_role\n  before insert on auth.users"
    ));
    let claim = function_body("claim_declared_role");
    assert!(claim.contains("in ('contractor', 'tender')"));
    assert!(claim.contains("then 'contractor' else 'citizen' end"));
    assert!(!claim.contains("'administrator'"));
}

#[test]
fn anonymous_profile_insert_is_tied_to_the_new_identity() {
    let insert = policy("profiles_insert");
    assert!(insert.contains("auth.uid() = id"));
    assert!(insert.contains("auth.uid() is null and public.is_fresh_signup(id, email, user_type)"));

    let fresh = function_body("is_fresh_signup");
    assert!(fresh.contains("security definer"));
    assert!(fresh.contains("u.id = p_id"));
    assert!(fresh.contains("lower(u.email) = lower(p_email)"));
    assert!(fresh.contains("= p_user_type"));
    assert!(fresh.contains("u.created_at > now() - interval '10 minutes'"));
}

#[test]
fn administrators_may_update_any_profile() {
    let admin = policy("profiles_admin_update");
    assert!(admin.contains("for update"));
    assert!(admin.contains("public.current_role_claim() = 'administrator'"));
}

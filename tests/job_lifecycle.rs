use std::sync::Arc;
use std::time::Duration;

use drmdeploy::engine::{JobOptions, JobServices, start_job};
use drmdeploy::log::DisplayHint;
use drmdeploy::template::CompiledTemplateBuilder;
use drmdeploy::types::JobState;
use drmdeploy_test_utils::builders::{RequestBodyBuilder, ResourceBuilder};
use drmdeploy_test_utils::fake_api::FakeResourceApi;
use drmdeploy_test_utils::{drain_job, init_tracing, summary_line};
use serde_json::json;

fn services(api: Arc<FakeResourceApi>) -> JobServices {
    JobServices::new(Arc::new(CompiledTemplateBuilder::new()), api)
}

fn options(batch_size: usize) -> JobOptions {
    JobOptions {
        batch_size,
        ..JobOptions::default()
    }
}

fn chain_body() -> String {
    RequestBodyBuilder::new()
        .resource(ResourceBuilder::new("A"))
        .resource(ResourceBuilder::new("B").depends_on(&["A"]))
        .build()
}

#[tokio::test]
async fn chain_deploys_in_order_and_sums_counters() {
    init_tracing();
    let api = FakeResourceApi::new()
        .with_counters("A", 2, 1)
        .with_counters("B", 3, 0)
        .shared();

    let mut job = start_job(chain_body(), services(api.clone()), options(5));
    let lines = drain_job(&mut job).await;

    assert_eq!(api.calls(), vec!["A", "B"]);
    assert!(
        lines
            .iter()
            .any(|l| l.text == "Template accepted. Getting ready to deploy..."),
        "acceptance line is rendered without a timestamp"
    );

    let summary = summary_line(&lines);
    assert!(summary.text.contains(&format!("JobId: {}", job.id())));
    assert!(summary.text.contains("Status: Succeeded"));
    assert!(summary.text.contains("Total Requests: 6"));
    assert!(summary.text.contains("Message: Deployment successful"));
    assert_eq!(summary.hint, DisplayHint::Info);

    // Exactly one summary, and it is the last line.
    assert_eq!(lines.iter().filter(|l| l.is_summary).count(), 1);
    assert!(lines.last().unwrap().is_summary);

    assert!(!job.is_failed());
    assert_eq!(job.state(), JobState::Succeeded);
    assert_eq!(job.total_requests(), 6);
}

#[tokio::test]
async fn rejected_resource_stops_later_groups() {
    init_tracing();
    let api = FakeResourceApi::new()
        .with_failure("b", "property 'sku' is invalid")
        .shared();

    let body = RequestBodyBuilder::new()
        .resource(ResourceBuilder::new("a"))
        .resource(ResourceBuilder::new("b"))
        .resource(ResourceBuilder::new("c").depends_on(&["a"]))
        .build();

    let mut job = start_job(body, services(api.clone()), options(5));
    let lines = drain_job(&mut job).await;

    let mut calls = api.calls();
    calls.sort();
    assert_eq!(calls, vec!["a", "b"], "group 2 must never start");

    let summary = summary_line(&lines);
    assert!(summary.text.contains("Status: Failed"));
    assert!(summary.text.contains(
        "Failures were found during deployment, please check the log for errors."
    ));
    assert_eq!(summary.hint, DisplayHint::Error);

    assert!(lines.iter().any(|l| l.hint == DisplayHint::Error
        && l.text.contains("'b'")
        && l.text.contains("property 'sku' is invalid")));

    // The sibling still deployed and was counted.
    assert!(summary.text.contains("Total Requests: 1"));
    assert!(job.is_failed());
}

#[tokio::test]
async fn infrastructure_exception_has_its_own_wording() {
    init_tracing();
    let api = FakeResourceApi::new()
        .with_exception("A", "connection refused")
        .shared();

    let mut job = start_job(chain_body(), services(api.clone()), options(5));
    let lines = drain_job(&mut job).await;

    assert_eq!(api.calls(), vec!["A"]);
    let summary = summary_line(&lines);
    assert!(summary.text.contains("likely cause: the resource API is unavailable"));
    assert!(job.is_failed());
}

#[tokio::test]
async fn panicking_deployment_counts_as_exception() {
    init_tracing();
    let api = FakeResourceApi::new().with_panic("A").shared();

    let mut job = start_job(chain_body(), services(api.clone()), options(5));
    let lines = drain_job(&mut job).await;

    assert!(lines.iter().any(|l| l.text.contains("deployment task crashed")));
    assert!(summary_line(&lines)
        .text
        .contains("likely cause: the resource API is unavailable"));
    assert!(job.is_failed());
}

#[tokio::test]
async fn exception_wins_over_failures_in_one_batch() {
    init_tracing();
    let api = FakeResourceApi::new()
        .with_failure("a", "rejected")
        .with_exception("b", "timeout")
        .shared();

    let body = RequestBodyBuilder::new()
        .resource(ResourceBuilder::new("a"))
        .resource(ResourceBuilder::new("b"))
        .build();

    let mut job = start_job(body, services(api), options(5));
    let lines = drain_job(&mut job).await;

    assert!(summary_line(&lines)
        .text
        .contains("There was a problem with the deployment workflow"));
}

#[tokio::test]
async fn malformed_request_fails_validation_without_deploying() {
    init_tracing();
    let api = FakeResourceApi::new().shared();

    let mut job = start_job("not json".to_string(), services(api.clone()), options(5));
    let lines = drain_job(&mut job).await;

    assert_eq!(api.call_count(), 0);
    assert!(lines.iter().any(|l| l.text.contains("InvalidRequest")));
    let summary = summary_line(&lines);
    assert!(summary.text.contains("Validation failed, please check the log for errors."));
    assert!(summary.text.contains("Total Requests: 0"));
    assert!(job.is_failed());
}

#[tokio::test]
async fn cycle_fails_before_any_deployment_call() {
    init_tracing();
    let api = FakeResourceApi::new().shared();

    let body = RequestBodyBuilder::new()
        .resource(ResourceBuilder::new("X").depends_on(&["Y"]))
        .resource(ResourceBuilder::new("Y").depends_on(&["X"]))
        .build();

    let mut job = start_job(body, services(api.clone()), options(5));
    let lines = drain_job(&mut job).await;

    assert_eq!(api.call_count(), 0);
    assert!(lines.iter().any(|l| l.text.contains("cycle detected")));
    assert!(summary_line(&lines).text.contains("Validation failed"));
    assert!(job.is_failed());
    assert_eq!(job.state(), JobState::Failed);
}

#[tokio::test]
async fn secret_reference_needs_a_token() {
    init_tracing();
    let api = FakeResourceApi::new().shared();

    let body = RequestBodyBuilder::new()
        .resource(ResourceBuilder::new("db").property("password", json!("[parameters('dbPassword')]")))
        .reference_parameter("dbPassword", "db-password")
        .build();

    let mut job = start_job(body, services(api.clone()), options(5));
    let lines = drain_job(&mut job).await;

    assert_eq!(api.call_count(), 0);
    assert!(lines.iter().any(|l| l.text.contains("MissingCredential")));
    assert!(job.is_failed());
}

#[tokio::test]
async fn access_token_reaches_the_api() {
    init_tracing();
    let api = FakeResourceApi::new().shared();

    let body = RequestBodyBuilder::new()
        .resource(ResourceBuilder::new("db").property("password", json!("[parameters('dbPassword')]")))
        .reference_parameter("dbPassword", "db-password")
        .access_token("tok-123")
        .build();

    let opts = JobOptions {
        access_token: Some("tok-123".to_string()),
        ..options(5)
    };
    let mut job = start_job(body, services(api.clone()), opts);
    drain_job(&mut job).await;

    assert!(!job.is_failed());
    assert_eq!(api.tokens(), vec![Some("tok-123".to_string())]);
}

#[tokio::test]
async fn batch_size_caps_concurrency() {
    init_tracing();
    let api = FakeResourceApi::new()
        .with_delay(Duration::from_millis(30))
        .shared();

    let mut builder = RequestBodyBuilder::new();
    for i in 0..7 {
        builder = builder.resource(ResourceBuilder::new(&format!("w{i}")));
    }

    let mut job = start_job(builder.build(), services(api.clone()), options(3));
    let lines = drain_job(&mut job).await;

    assert_eq!(api.call_count(), 7);
    assert_eq!(api.max_concurrency(), 3);
    assert!(summary_line(&lines).text.contains("Total Requests: 7"));
}

#[tokio::test]
async fn cancel_before_first_batch_deploys_nothing() {
    init_tracing();
    let api = FakeResourceApi::new().shared();

    let mut job = start_job(chain_body(), services(api.clone()), options(5));
    // The job has not been polled yet on this single-threaded runtime.
    job.cancel();
    let lines = drain_job(&mut job).await;

    assert_eq!(api.call_count(), 0);
    assert!(summary_line(&lines)
        .text
        .contains("Deployment cancelled, resources deployed so far remain in place."));
    assert!(job.is_failed());
}

#[tokio::test]
async fn verbose_entries_only_when_enabled() {
    init_tracing();

    let quiet_api = FakeResourceApi::new().shared();
    let mut quiet = start_job(chain_body(), services(quiet_api), options(5));
    let quiet_lines = drain_job(&mut quiet).await;
    assert!(!quiet_lines.iter().any(|l| l.hint == DisplayHint::Verbose));

    let loud_api = FakeResourceApi::new().shared();
    let opts = JobOptions {
        verbose: true,
        ..options(5)
    };
    let mut loud = start_job(chain_body(), services(loud_api), opts);
    let loud_lines = drain_job(&mut loud).await;
    assert!(loud_lines
        .iter()
        .any(|l| l.hint == DisplayHint::Verbose && l.text.starts_with("VERBOSE: Deploying resource 'A'")));
}

#[tokio::test]
async fn job_ids_are_32_lowercase_alphanumerics_and_unique() {
    let api = FakeResourceApi::new().shared();
    let a = start_job(chain_body(), services(api.clone()), options(5));
    let b = start_job(chain_body(), services(api), options(5));

    for id in [a.id(), b.id()] {
        assert_eq!(id.len(), 32);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }
    assert_ne!(a.id(), b.id());
}

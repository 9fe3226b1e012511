//! End-to-end tests of the webhook ingress against a mocked GitHub API.
use http::StatusCode;

use crate::tests::io::load_test_file;
use crate::tests::logs::CapturedLogs;
use crate::tests::mocks::World;
use crate::tests::tester::RelayTester;
use crate::tests::webhook::create_webhook_request;


fn feature_x_inputs() -> serde_json::Value {
    serde_json::json!({
        "repo": "acme/widgets",
        "branch": "feature-x",
        "pr_number": "42"
    })
}

#[tokio::test]
async fn opened_pull_request_is_dispatched() {
    let tester = RelayTester::start(World::default()).await;
    let status = tester
        .send_webhook(
            "pull_request",
            &load_test_file("webhook/pull-request-opened.json"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let github = tester.finish().await;
    github.assert_dispatched(&[feature_x_inputs()]).await;
}

#[tokio::test]
async fn target_not_installed() {
    let (logs, _guard) = CapturedLogs::start();
    let tester = RelayTester::start(World::default().not_installed()).await;
    let status = tester
        .send_webhook(
            "pull_request",
            &load_test_file("webhook/pull-request-opened.json"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let github = tester.finish().await;
    github.assert_dispatched(&[]).await;
    assert_eq!(github.token_requests().await, 0);
    assert_eq!(
        logs.lines_containing("App is not installed on acme/central").len(),
        1
    );
}

#[tokio::test]
async fn invalid_signature_is_not_relayed() {
    let tester = RelayTester::start(World::default()).await;
    let mut request = create_webhook_request(
        "pull_request",
        &load_test_file("webhook/pull-request-opened.json"),
    );
    request.headers_mut().insert(
        "x-hub-signature-256",
        "sha256=deadbeef".parse().unwrap(),
    );
    assert_eq!(tester.send_request(request).await, StatusCode::BAD_REQUEST);

    let github = tester.finish().await;
    github.assert_dispatched(&[]).await;
    assert_eq!(github.token_requests().await, 0);
}

#[tokio::test]
async fn closed_pull_request_is_ignored() {
    let tester = RelayTester::start(World::default()).await;
    let status = tester
        .send_webhook(
            "pull_request",
            &load_test_file("webhook/pull-request-closed.json"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let github = tester.finish().await;
    github.assert_dispatched(&[]).await;
}

#[tokio::test]
async fn synchronize_is_dispatched_when_enabled() {
    let tester = RelayTester::with_actions(
        World::default(),
        "opened,synchronize".parse().unwrap(),
    )
    .await;
    for file in [
        "webhook/pull-request-opened.json",
        "webhook/pull-request-synchronize.json",
    ] {
        let status = tester.send_webhook("pull_request", &load_test_file(file)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let github = tester.finish().await;
    github
        .assert_dispatched(&[feature_x_inputs(), feature_x_inputs()])
        .await;
}

#[tokio::test]
async fn failed_dispatch_does_not_stop_the_relay() {
    let tester = RelayTester::start(World::default().dispatch_status(422)).await;
    for _ in 0..2 {
        let status = tester
            .send_webhook(
                "pull_request",
                &load_test_file("webhook/pull-request-opened.json"),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let github = tester.finish().await;
    assert_eq!(github.dispatch_requests().await.len(), 2);
}

mod common;

use common::{HOME, LOGIN, MockElement, MockPage, MockView, home_view, test_config, test_profile};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use veyra_engine::diagnostics::{self, Diagnostics};
use veyra_engine::login::{GateOutcome, GateState, LoginGate, SessionEvidence};
use veyra_engine::protocol::Matcher;

fn gate(dir: &std::path::Path) -> LoginGate {
    LoginGate::new(
        &test_profile(),
        &test_config(dir),
        Diagnostics::new(dir, "instagram"),
    )
}

#[tokio::test(start_paused = true)]
async fn session_cookie_authenticates() {
    let dir = tempfile::tempdir().unwrap();
    let mut page = MockPage::new().view(HOME, MockView::new()).cookie("sessionid");

    let outcome = gate(dir.path())
        .wait(&mut page, &CancellationToken::new())
        .await;

    assert_eq!(
        outcome,
        GateOutcome::Authenticated(SessionEvidence::Cookie("sessionid".into()))
    );
    assert_eq!(page.gotos, [HOME]);
}

#[tokio::test(start_paused = true)]
async fn landmark_authenticates_without_cookie() {
    let dir = tempfile::tempdir().unwrap();
    let mut page = MockPage::new()
        .view(HOME, MockView::new().with(MockElement::css("post", ".new-post")))
        .cookie("csrftoken");

    let state = gate(dir.path()).poll_once(&mut page).await;

    assert_eq!(
        state,
        GateState::Authenticated(SessionEvidence::Landmark(Matcher::css(".new-post")))
    );
}

#[tokio::test(start_paused = true)]
async fn login_redirect_is_unauthenticated() {
    let dir = tempfile::tempdir().unwrap();
    let mut page = MockPage::new()
        .view(HOME, MockView::new().redirect_to(LOGIN))
        .view(LOGIN, MockView::new());

    let state = gate(dir.path()).poll_once(&mut page).await;

    assert_eq!(state, GateState::Unauthenticated);
    assert_eq!(page.url, LOGIN);
}

#[tokio::test(start_paused = true)]
async fn waiting_can_be_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let mut page = MockPage::new()
        .view(HOME, MockView::new().redirect_to(LOGIN))
        .view(LOGIN, MockView::new());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        trigger.cancel();
    });

    let outcome = gate(dir.path()).wait(&mut page, &cancel).await;

    assert_eq!(outcome, GateOutcome::Cancelled);
    assert!(page.gotos.len() > 1, "expected several poll cycles");
    assert!(
        Diagnostics::new(dir.path(), "instagram")
            .path_for(diagnostics::LOGIN_WAIT)
            .exists()
    );
}

#[tokio::test(start_paused = true)]
async fn already_cancelled_token_returns_before_navigating() {
    let dir = tempfile::tempdir().unwrap();
    let mut page = MockPage::new().view(HOME, home_view());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = gate(dir.path()).wait(&mut page, &cancel).await;

    assert_eq!(outcome, GateOutcome::Cancelled);
    assert!(page.gotos.is_empty());
}

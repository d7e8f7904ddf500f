mod common;

use async_trait::async_trait;
use common::{Effect, HOME, MockElement, MockPage, MockView, home_view, test_config, test_profile};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use veyra_engine::action::ActionOutcome;
use veyra_engine::config::{AgentConfig, CommentSource};
use veyra_engine::diagnostics::{self, Diagnostics};
use veyra_engine::error::EngineError;
use veyra_engine::generator::{
    GenerationContext, GenerationKind, GeneratorError, ResponseGenerator, SafeGenerator,
};
use veyra_engine::protocol::Matcher;
use veyra_engine::workflow::PostInteractionWorkflow;

const POST: &str = "https://chat.test/p/42/";

fn workflow(config: &AgentConfig) -> PostInteractionWorkflow {
    PostInteractionWorkflow::new(
        test_profile(),
        config.clone(),
        SafeGenerator::from_config(config),
        Diagnostics::new(&config.diagnostics_dir, "instagram"),
    )
}

/// Remembers every context it was asked to write for.
#[derive(Clone, Default)]
struct Recording(Arc<Mutex<Vec<(GenerationKind, GenerationContext)>>>);

impl Recording {
    fn requests(&self) -> Vec<(GenerationKind, GenerationContext)> {
        self.0.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseGenerator for Recording {
    async fn generate(
        &self,
        kind: GenerationKind,
        context: &GenerationContext,
    ) -> Result<String, GeneratorError> {
        self.0.lock().unwrap().push((kind, context.clone()));
        Ok("What a view!".to_string())
    }
}

fn generating_workflow(config: &AgentConfig, generator: &Recording) -> PostInteractionWorkflow {
    let mut config = config.clone();
    config.comment_source = CommentSource::Generator;
    PostInteractionWorkflow::new(
        test_profile(),
        config.clone(),
        SafeGenerator::new(Box::new(generator.clone()), &config.generator),
        Diagnostics::new(&config.diagnostics_dir, "instagram"),
    )
}

fn commentable(view: MockView) -> MockView {
    like_elements(view)
        .with(MockElement::css("box", "textarea.comment").editable())
        .on_enter(Effect::Send)
}

fn like_elements(view: MockView) -> MockView {
    view.with(
        MockElement::css("like", ".like")
            .on_click(Effect::Hide("like".into()))
            .on_click(Effect::Show("unlike".into())),
    )
    .with(MockElement::css("unlike", ".unlike").hidden())
}

#[tokio::test(start_paused = true)]
async fn like_and_comment_on_a_fresh_post() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut page = MockPage::new()
        .cookie("sessionid")
        .view(HOME, home_view())
        .view(
            POST,
            like_elements(MockView::new())
                .with(MockElement::new("box", Matcher::role("textbox")).editable())
                .on_enter(Effect::Send),
        );

    let report = workflow(&config)
        .run(&mut page, POST, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.like,
        ActionOutcome::Confirmed {
            via: Matcher::css(".like")
        }
    );
    // The first three comment-box candidates are absent; the generic textbox is
    // used and, with no post button on the page, Enter submits.
    assert_eq!(
        report.comment,
        ActionOutcome::Confirmed {
            via: Matcher::role("textbox")
        }
    );
    assert_eq!(report.comment_text, "Great shot!");
    assert_eq!(page.sent, [(POST.to_string(), "Great shot!".to_string())]);
    assert!(page.log.contains(&"key:Enter".to_string()));
}

#[tokio::test(start_paused = true)]
async fn failed_like_does_not_stop_the_comment() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut page = MockPage::new().cookie("sessionid").view(HOME, home_view()).view(
        POST,
        MockView::new()
            .with(MockElement::css("like", ".like"))
            .with(MockElement::css("box", "textarea.comment").editable())
            .with(MockElement::css("post", ".post-comment").on_click(Effect::Send)),
    );

    let report = workflow(&config)
        .run(&mut page, POST, &CancellationToken::new())
        .await
        .unwrap();

    assert!(matches!(report.like, ActionOutcome::AttemptedUnconfirmed { .. }));
    assert!(report.comment.is_confirmed());
    assert!(page.clicked("post"));
    assert!(
        Diagnostics::new(dir.path(), "instagram")
            .path_for(diagnostics::LIKE_FAIL)
            .exists()
    );
}

#[tokio::test(start_paused = true)]
async fn missing_comment_box_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut page = MockPage::new()
        .cookie("sessionid")
        .view(HOME, home_view())
        .view(POST, like_elements(MockView::new()));

    let report = workflow(&config)
        .run(&mut page, POST, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.like.is_confirmed());
    assert_eq!(report.comment, ActionOutcome::NotFound);
    assert!(
        Diagnostics::new(dir.path(), "instagram")
            .path_for(diagnostics::COMMENT_BOX_NOT_FOUND)
            .exists()
    );
}

#[tokio::test(start_paused = true)]
async fn off_platform_redirect_aborts_before_any_action() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut page = MockPage::new()
        .cookie("sessionid")
        .view(HOME, home_view())
        .view(POST, MockView::new().redirect_to("https://elsewhere.test/"))
        .view("https://elsewhere.test/", like_elements(MockView::new()));

    let err = workflow(&config)
        .run(&mut page, POST, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::StructuralMismatch { .. }));
    assert!(!page.clicked("like"));
}

#[tokio::test(start_paused = true)]
async fn unreachable_post_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut page = MockPage::new()
        .cookie("sessionid")
        .view(HOME, home_view())
        .fail_goto_from(POST, 1);

    let err = workflow(&config)
        .run(&mut page, POST, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Backend(_)));
}

#[tokio::test(start_paused = true)]
async fn generated_comment_is_written_for_the_post_caption() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let generator = Recording::default();
    let mut page = MockPage::new().cookie("sessionid").view(HOME, home_view()).view(
        POST,
        commentable(MockView::new())
            .with(MockElement::css("caption", ".caption").text("Sunset over the lake")),
    );

    let report = generating_workflow(&config, &generator)
        .run(&mut page, POST, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        generator.requests(),
        [(
            GenerationKind::Comment,
            GenerationContext {
                text: Some("Sunset over the lake".to_string()),
                sender_name: None,
            }
        )]
    );
    assert_eq!(report.comment_text, "What a view!");
    assert!(report.comment.is_confirmed());
}

#[tokio::test(start_paused = true)]
async fn missing_caption_still_gets_a_generated_comment() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let generator = Recording::default();
    let mut page = MockPage::new()
        .cookie("sessionid")
        .view(HOME, home_view())
        .view(POST, commentable(MockView::new()));

    let report = generating_workflow(&config, &generator)
        .run(&mut page, POST, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        generator.requests(),
        [(GenerationKind::Comment, GenerationContext::default())]
    );
    assert_eq!(page.sent, [(POST.to_string(), "What a view!".to_string())]);
    assert!(report.comment.is_confirmed());
}

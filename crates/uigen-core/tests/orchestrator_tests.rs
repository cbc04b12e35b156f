use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uigen_core::prompts::CONTINUE_INSTRUCTION;
use uigen_core::{
    AttemptKind, Budgets, ContinuationOrchestrator, FailureReason, GeneratorConfig, RewriteCause,
};
use uigen_stream::{FinishReason, Role, TransportError};
use uigen_syntax::CompletenessVerdict;
use uigen_test_utils::{
    broken, chunked, cut, fenced, stop, Script, ScriptedService, CLOCK, CLOCK_WITH_MOMENT,
    COUNTER, STRAY_BRACE,
};

fn orchestrator(service: &Arc<ScriptedService>, budgets: Budgets) -> ContinuationOrchestrator {
    let config = GeneratorConfig::new()
        .with_budgets(budgets)
        .with_transport_retries(2);
    ContinuationOrchestrator::new(service.clone(), &config)
        .unwrap()
        .with_retry_backoff(Duration::ZERO)
}

fn counter_halves() -> (String, String) {
    let split = COUNTER.find("  return (").unwrap();
    (
        format!("Here is the component:\n\n```tsx\n{}", &COUNTER[..split]),
        format!("{}```\n", &COUNTER[split..]),
    )
}

#[tokio::test]
async fn compliant_first_answer_needs_one_call() {
    let service = Arc::new(ScriptedService::new([stop(&fenced(COUNTER))]));
    let artifact = orchestrator(&service, Budgets::default())
        .generate("A counter with a debounced button", Budgets::default())
        .await
        .unwrap();

    assert_eq!(artifact.source, COUNTER);
    assert!(artifact.report.is_compliant());
    assert_eq!(artifact.rewrites_used, 0);
    assert_eq!(artifact.continuations_used, 0);
    assert_eq!(service.calls(), 1);

    let specifiers: Vec<_> = artifact.imports.iter().map(|i| i.specifier.as_str()).collect();
    assert_eq!(specifiers, ["react", "lodash"]);

    let first = &service.requests()[0];
    assert_eq!(first.max_output_tokens, 2000);
    assert_eq!(first.messages.len(), 1);
    assert_eq!(first.messages[0].role, Role::User);
    assert!(first.messages[0]
        .content
        .contains("REQUIREMENT:\nA counter with a debounced button"));
}

#[tokio::test]
async fn answer_cut_by_length_is_continued_once() {
    let (head, tail) = counter_halves();
    let service = Arc::new(ScriptedService::new([
        chunked(&[&head[..20], &head[20..]], FinishReason::Length),
        stop(&tail),
    ]));
    let artifact = orchestrator(&service, Budgets::default())
        .generate("A counter", Budgets::default())
        .await
        .unwrap();

    assert_eq!(artifact.source, COUNTER);
    assert_eq!(artifact.continuations_used, 1);
    assert_eq!(artifact.rewrites_used, 0);
    assert_eq!(artifact.attempts[1].kind, AttemptKind::Continuation);
    assert!(matches!(
        artifact.attempts[0].verdict,
        Some(CompletenessVerdict::Truncated(_))
    ));

    let resume = &service.requests()[1];
    assert_eq!(resume.messages.len(), 3);
    assert_eq!(resume.messages[1].role, Role::Assistant);
    assert_eq!(resume.messages[1].content, head);
    assert_eq!(resume.messages[2].content, CONTINUE_INSTRUCTION);
}

#[tokio::test]
async fn reopened_fence_and_repeated_tail_are_spliced() {
    let cut_at = COUNTER.find("setCount((c)").unwrap() + "setC".len();
    let head = &COUNTER[..cut_at];
    let resume_at = head.rfind("debounce").unwrap();
    let service = Arc::new(ScriptedService::new([
        cut(&format!("```tsx\n{head}")),
        stop(&format!("```tsx\n{}```\n", &COUNTER[resume_at..])),
    ]));
    let artifact = orchestrator(&service, Budgets::default())
        .generate("A counter", Budgets::default())
        .await
        .unwrap();
    assert_eq!(artifact.source, COUNTER);
    assert_eq!(artifact.continuations_used, 1);
}

const NESTED_PANEL: &str = r#"import React from 'react';

export const Panel = () => (
  <div className="outer">
        <div className="inner">
        <p>hello</p>
        </div>
        </div>
);
"#;

#[tokio::test]
async fn repeated_closing_tag_in_continuation_is_kept() {
    let closer = "        </div>\n";
    let split = NESTED_PANEL.find(closer).unwrap() + closer.len();
    let service = Arc::new(ScriptedService::new([
        cut(&format!("```tsx\n{}", &NESTED_PANEL[..split])),
        stop(&format!("{}```\n", &NESTED_PANEL[split..])),
    ]));
    let artifact = orchestrator(&service, Budgets::default())
        .generate("A nested panel", Budgets::default())
        .await
        .unwrap();

    assert_eq!(service.calls(), 2);
    assert_eq!(artifact.source, NESTED_PANEL);
}

#[tokio::test]
async fn broken_stream_is_continued() {
    let (head, tail) = counter_halves();
    let service = Arc::new(ScriptedService::new([broken(&head), stop(&tail)]));
    let artifact = orchestrator(&service, Budgets::default())
        .generate("A counter", Budgets::default())
        .await
        .unwrap();

    assert_eq!(artifact.continuations_used, 1);
    assert!(artifact.attempts[0].stream_error.is_some());
    assert_eq!(artifact.source, COUNTER);
}

#[tokio::test]
async fn disallowed_import_triggers_one_rewrite_naming_it() {
    let service = Arc::new(ScriptedService::new([
        stop(&fenced(CLOCK_WITH_MOMENT)),
        stop(&fenced(CLOCK)),
    ]));
    let artifact = orchestrator(&service, Budgets::default())
        .generate("A list of times", Budgets::default())
        .await
        .unwrap();

    assert_eq!(artifact.source, CLOCK);
    assert_eq!(artifact.rewrites_used, 1);
    assert_eq!(artifact.attempts[0].violations, ["moment"]);
    assert_eq!(
        artifact.attempts[1].kind,
        AttemptKind::Rewrite(RewriteCause::PolicyViolation(vec!["moment".to_string()]))
    );

    let rewrite = &service.requests()[1];
    assert_eq!(rewrite.messages.len(), 2, "rewrite starts from the original request");
    let instruction = &rewrite.messages[1].content;
    assert!(instruction.contains("'moment'"));
    assert!(!instruction.contains("'lodash'"));
}

#[tokio::test]
async fn interior_error_is_rewritten_not_continued() {
    let service = Arc::new(ScriptedService::new([
        stop(&fenced(STRAY_BRACE)),
        stop(&fenced(COUNTER)),
    ]));
    let artifact = orchestrator(&service, Budgets::default())
        .generate("A counter", Budgets::default())
        .await
        .unwrap();

    assert_eq!(artifact.rewrites_used, 1);
    assert_eq!(artifact.continuations_used, 0);
    assert!(matches!(
        artifact.attempts[0].verdict,
        Some(CompletenessVerdict::Invalid(_))
    ));
    assert_eq!(
        artifact.attempts[1].kind,
        AttemptKind::Rewrite(RewriteCause::Malformed)
    );
    assert!(service
        .last_message(1)
        .unwrap()
        .contains("syntactically malformed"));
}

#[tokio::test]
async fn continuation_budget_is_enforced() {
    let service = Arc::new(ScriptedService::new([
        cut("```tsx\nconst items = ["),
        cut("1, 2, "),
        cut("3, 4, "),
        stop("5];\n```\n"),
    ]));
    let budgets = Budgets::new(2, 2);
    let failure = orchestrator(&service, budgets)
        .generate("A list", budgets)
        .await
        .unwrap_err();

    assert_eq!(
        failure.reason,
        FailureReason::ExhaustedContinuations { used: 2 }
    );
    assert_eq!(failure.calls(), 3);
    assert_eq!(service.calls(), 3);
    assert_eq!(service.remaining(), 1);
    assert_eq!(failure.partial.as_deref(), Some("const items = [1, 2, 3, 4, "));
}

#[tokio::test]
async fn rewrite_budget_is_enforced() {
    let service = Arc::new(ScriptedService::new([
        stop(&fenced(CLOCK_WITH_MOMENT)),
        stop(&fenced(STRAY_BRACE)),
        stop(&fenced(COUNTER)),
    ]));
    let budgets = Budgets::new(3, 1);
    let failure = orchestrator(&service, budgets)
        .generate("A clock", budgets)
        .await
        .unwrap_err();

    assert_eq!(failure.reason, FailureReason::ExhaustedRewrites { used: 1 });
    assert_eq!(failure.calls(), 2);
}

#[tokio::test]
async fn zero_budgets_allow_exactly_one_call() {
    let service = Arc::new(ScriptedService::new([cut("```tsx\nconst a = (")]));
    let budgets = Budgets::new(0, 0);
    let failure = orchestrator(&service, budgets)
        .generate("anything", budgets)
        .await
        .unwrap_err();
    assert_eq!(
        failure.reason,
        FailureReason::ExhaustedContinuations { used: 0 }
    );
    assert_eq!(service.calls(), 1);
}

#[tokio::test]
async fn retryable_transport_errors_are_retried_within_one_call() {
    let service = Arc::new(ScriptedService::new([
        Script::Fail(TransportError::Status {
            status: 503,
            body: "busy".to_string(),
        }),
        Script::Fail(TransportError::Connect("refused".to_string())),
        stop(&fenced(COUNTER)),
    ]));
    let artifact = orchestrator(&service, Budgets::default())
        .generate("A counter", Budgets::default())
        .await
        .unwrap();

    assert_eq!(artifact.attempts.len(), 1);
    assert_eq!(artifact.attempts[0].transport_retries, 2);
    assert_eq!(service.calls(), 3);
}

#[tokio::test]
async fn exhausted_transport_retries_fail_the_request() {
    let unavailable = || {
        Script::Fail(TransportError::Status {
            status: 502,
            body: String::new(),
        })
    };
    let service = Arc::new(ScriptedService::new([
        unavailable(),
        unavailable(),
        unavailable(),
    ]));
    let failure = orchestrator(&service, Budgets::default())
        .generate("A counter", Budgets::default())
        .await
        .unwrap_err();

    assert!(matches!(
        failure.reason,
        FailureReason::TransportFailure(TransportError::Status { status: 502, .. })
    ));
    assert_eq!(service.calls(), 3);
    assert!(failure.partial.is_none());
}

#[tokio::test]
async fn hung_stream_times_out() {
    let service = Arc::new(ScriptedService::new([Script::Hang, Script::Hang]));
    let config = GeneratorConfig::new().with_transport_retries(1);
    let failure = ContinuationOrchestrator::new(service.clone(), &config)
        .unwrap()
        .with_retry_backoff(Duration::ZERO)
        .with_call_timeout(Duration::from_millis(50))
        .generate("A counter", Budgets::default())
        .await
        .unwrap_err();

    assert_eq!(
        failure.reason,
        FailureReason::TransportFailure(TransportError::Timeout)
    );
    assert_eq!(service.calls(), 2);
}

#[tokio::test]
async fn cancellation_stops_an_in_flight_call() {
    let service = Arc::new(ScriptedService::new([Script::Hang]));
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let failure = orchestrator(&service, Budgets::default())
        .generate_with_cancel("A counter", Budgets::default(), &token)
        .await
        .unwrap_err();
    assert_eq!(failure.reason, FailureReason::Cancelled);
    assert!(failure.partial.is_none());
}

#[tokio::test]
async fn cancelled_before_start_makes_no_call() {
    let service = Arc::new(ScriptedService::new([stop(&fenced(COUNTER))]));
    let token = CancellationToken::new();
    token.cancel();
    let failure = orchestrator(&service, Budgets::default())
        .generate_with_cancel("A counter", Budgets::default(), &token)
        .await
        .unwrap_err();
    assert_eq!(failure.reason, FailureReason::Cancelled);
    assert_eq!(service.calls(), 0);
}

#[test]
fn invalid_config_is_rejected() {
    let service = Arc::new(ScriptedService::default());
    let config = GeneratorConfig::new().with_max_output_tokens(0);
    assert!(ContinuationOrchestrator::new(service, &config).is_err());
}

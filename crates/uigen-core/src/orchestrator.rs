//! Continuation Orchestrator
//!
//! Drives one request through the state machine in [`crate::state`]:
//! call the service, classify the accumulated text, continue or rewrite,
//! and finally check the imports against the allow-list. Every loop-back
//! spends a budget counter, so a request makes at most
//! `max_continuations + max_rewrites + 1` logical calls.

use crate::budget::{AttemptBudget, Budgets};
use crate::config::GeneratorConfig;
use crate::error::{ConfigError, FailureReason, GenerationFailure};
use crate::prompts;
use crate::splice::splice_continuation;
use crate::state::{validate_transition, OrchestratorState};
use crate::types::{
    AttemptKind, AttemptRecord, FinalArtifact, GenerationRequest, RequestId, RewriteCause,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use uigen_policy::DependencyPolicyGate;
use uigen_stream::{
    ChatMessage, FinishReason, GenerationService, ServiceRequest, StreamError, StreamEvent,
    TransportError,
};
use uigen_syntax::{
    extract_code, CompletenessClassifier, CompletenessVerdict, SyntaxTreeAnalyzer, TerminalSignal,
};

/// Map how a call ended onto the classifier's signal
#[must_use]
pub fn terminal_signal(finish: Option<&FinishReason>, interrupted: bool) -> TerminalSignal {
    if interrupted {
        return TerminalSignal::Interrupted;
    }
    match finish {
        None => TerminalSignal::Absent,
        Some(FinishReason::Stop) => TerminalSignal::Stop,
        Some(FinishReason::Length) => TerminalSignal::LengthCeiling,
        Some(FinishReason::ContentFilter) => TerminalSignal::Other("content_filter".to_string()),
        Some(FinishReason::Other(other)) => TerminalSignal::Other(other.clone()),
    }
}

/// Signal for judging splice candidates by their text alone
///
/// A length ceiling or broken stream would make any candidate TRUNCATED.
fn shape_signal(signal: &TerminalSignal) -> TerminalSignal {
    match signal {
        TerminalSignal::LengthCeiling | TerminalSignal::Interrupted => TerminalSignal::Absent,
        other => other.clone(),
    }
}

/// Content of one successful call
#[derive(Debug, Default)]
struct CallOutput {
    segment: String,
    finish: Option<FinishReason>,
    stream_error: Option<StreamError>,
}

#[derive(Debug)]
enum CallFailure {
    Transport(TransportError),
    Cancelled,
}

/// Generates compliant components, resuming truncated answers
pub struct ContinuationOrchestrator {
    service: Arc<dyn GenerationService>,
    classifier: CompletenessClassifier,
    analyzer: SyntaxTreeAnalyzer,
    gate: DependencyPolicyGate,
    budgets: Budgets,
    max_output_tokens: u32,
    transport_retries: u32,
    call_timeout: Duration,
    retry_backoff: Duration,
    batch_concurrency: usize,
}

impl std::fmt::Debug for ContinuationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuationOrchestrator")
            .field("classifier", &self.classifier)
            .field("gate", &self.gate)
            .field("budgets", &self.budgets)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("transport_retries", &self.transport_retries)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl ContinuationOrchestrator {
    /// Create orchestrator over `service`
    ///
    /// # Errors
    /// Returns error if `config` does not validate.
    pub fn new(
        service: Arc<dyn GenerationService>,
        config: &GeneratorConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            service,
            classifier: CompletenessClassifier::new(),
            analyzer: SyntaxTreeAnalyzer::new(),
            gate: DependencyPolicyGate::new(config.allow_list()?),
            budgets: config.budgets,
            max_output_tokens: config.max_output_tokens,
            transport_retries: config.transport_retries,
            call_timeout: config.call_timeout(),
            retry_backoff: Duration::from_millis(250),
            batch_concurrency: config.batch_concurrency,
        })
    }

    /// With a custom classifier
    #[must_use]
    pub fn with_classifier(mut self, classifier: CompletenessClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// With a custom analyzer
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: SyntaxTreeAnalyzer) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// With base delay between transport retries (grows linearly)
    #[inline]
    #[must_use]
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// With per-call timeout
    #[inline]
    #[must_use]
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// With the number of concurrent requests for batch generation
    #[inline]
    #[must_use]
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    /// Policy gate in use
    #[inline]
    #[must_use]
    pub fn gate(&self) -> &DependencyPolicyGate {
        &self.gate
    }

    /// Budgets from configuration
    #[inline]
    #[must_use]
    pub fn default_budgets(&self) -> Budgets {
        self.budgets
    }

    /// Concurrent requests for batch generation
    #[inline]
    #[must_use]
    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
    }

    /// Generate a component for `requirement`
    ///
    /// # Errors
    /// Returns [`GenerationFailure`] when budgets run out, the service stays
    /// unreachable, or analysis contradicts classification.
    pub async fn generate(
        &self,
        requirement: &str,
        budgets: Budgets,
    ) -> Result<FinalArtifact, GenerationFailure> {
        self.generate_with_cancel(requirement, budgets, &CancellationToken::new())
            .await
    }

    /// [`generate`](Self::generate) with cooperative cancellation
    ///
    /// # Errors
    /// As [`generate`](Self::generate), plus [`FailureReason::Cancelled`].
    pub async fn generate_with_cancel(
        &self,
        requirement: &str,
        budgets: Budgets,
        cancel: &CancellationToken,
    ) -> Result<FinalArtifact, GenerationFailure> {
        let request = GenerationRequest::new(requirement, self.max_output_tokens);
        self.generate_request(&request, budgets, cancel).await
    }

    /// Run a fully specified request
    ///
    /// # Errors
    /// See [`generate_with_cancel`](Self::generate_with_cancel).
    pub async fn generate_request(
        &self,
        request: &GenerationRequest,
        budgets: Budgets,
        cancel: &CancellationToken,
    ) -> Result<FinalArtifact, GenerationFailure> {
        let request_id = RequestId::new();
        let span = tracing::info_span!("generate", %request_id);
        async move {
            tracing::info!(
                max_continuations = budgets.max_continuations,
                max_rewrites = budgets.max_rewrites,
                "generation started"
            );
            let result = Run::new(self, request_id, request, budgets).drive(cancel).await;
            match &result {
                Ok(artifact) => tracing::info!(
                    continuations = artifact.continuations_used,
                    rewrites = artifact.rewrites_used,
                    calls = artifact.attempts.len(),
                    "generation finished"
                ),
                Err(failure) => tracing::warn!(
                    reason = %failure.reason,
                    calls = failure.calls(),
                    "generation failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }

    /// One logical call: retried locally on retryable transport errors,
    /// each try bounded by the call timeout and raced against cancellation
    async fn call_with_retries(
        &self,
        request: &ServiceRequest,
        cancel: &CancellationToken,
        record: &mut AttemptRecord,
    ) -> Result<CallOutput, CallFailure> {
        let started = Instant::now();
        let mut retries = 0;

        let result = loop {
            let attempt = tokio::time::timeout(self.call_timeout, self.consume(request));
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => break Err(CallFailure::Cancelled),
                outcome = attempt => outcome.unwrap_or(Err(TransportError::Timeout)),
            };

            match outcome {
                Ok(output) => break Ok(output),
                Err(error) if error.is_retryable() && retries < self.transport_retries => {
                    retries += 1;
                    tracing::warn!(%error, retry = retries, "generation call failed, retrying");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break Err(CallFailure::Cancelled),
                        () = tokio::time::sleep(self.retry_backoff * retries) => {}
                    }
                }
                Err(error) => break Err(CallFailure::Transport(error)),
            }
        };

        record.transport_retries = retries;
        record.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        if let Ok(output) = &result {
            record.received_bytes = output.segment.len();
            record.finish.clone_from(&output.finish);
            record.stream_error.clone_from(&output.stream_error);
        }
        result
    }

    /// Open the stream and consume it to the end
    async fn consume(&self, request: &ServiceRequest) -> Result<CallOutput, TransportError> {
        let mut events = self.service.open(request).await?;
        let mut output = CallOutput::default();
        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Delta(text) => output.segment.push_str(&text),
                StreamEvent::FinishReason(reason) => output.finish = Some(reason),
                StreamEvent::StreamError(error) => {
                    tracing::warn!(%error, received = output.segment.len(), "stream broke off");
                    output.stream_error = Some(error);
                    break;
                }
            }
        }
        Ok(output)
    }
}

/// State of one request; owned by a single task
struct Run<'o> {
    orchestrator: &'o ContinuationOrchestrator,
    request_id: RequestId,
    max_output_tokens: u32,
    budget: AttemptBudget,
    state: OrchestratorState,
    base_history: Vec<ChatMessage>,
    history: Vec<ChatMessage>,
    artifact: String,
    next_kind: AttemptKind,
    attempts: Vec<AttemptRecord>,
    partial: Option<String>,
}

impl<'o> Run<'o> {
    fn new(
        orchestrator: &'o ContinuationOrchestrator,
        request_id: RequestId,
        request: &GenerationRequest,
        budgets: Budgets,
    ) -> Self {
        let mut base_history = request.history.clone();
        base_history.push(ChatMessage::user(prompts::initial_prompt(
            &request.requirement,
            orchestrator.gate.allow_list(),
        )));

        Self {
            orchestrator,
            request_id,
            max_output_tokens: request.max_output_tokens,
            budget: AttemptBudget::new(budgets),
            state: OrchestratorState::Requesting,
            history: base_history.clone(),
            base_history,
            artifact: String::new(),
            next_kind: AttemptKind::Initial,
            attempts: Vec::new(),
            partial: None,
        }
    }

    fn enter(&mut self, to: OrchestratorState) {
        let checked = validate_transition(self.state, to);
        debug_assert!(checked.is_ok(), "{checked:?}");
        tracing::debug!(from = %self.state, to = %to, "transition");
        self.state = to;
    }

    fn fail(mut self, reason: FailureReason) -> GenerationFailure {
        self.enter(OrchestratorState::Failed);
        GenerationFailure {
            request_id: self.request_id,
            reason,
            partial: self.partial.filter(|p| !p.trim().is_empty()),
            attempts: self.attempts,
            budget: self.budget,
        }
    }

    /// Discard the artifact and start over from the original request plus
    /// a corrective instruction
    fn restart(&mut self, instruction: String, cause: RewriteCause) {
        self.artifact.clear();
        self.history.clone_from(&self.base_history);
        self.history.push(ChatMessage::user(instruction));
        self.next_kind = AttemptKind::Rewrite(cause);
    }

    async fn drive(
        mut self,
        cancel: &CancellationToken,
    ) -> Result<FinalArtifact, GenerationFailure> {
        let orchestrator = self.orchestrator;
        loop {
            if cancel.is_cancelled() {
                self.partial = None;
                return Err(self.fail(FailureReason::Cancelled));
            }

            let call_number = u32::try_from(self.attempts.len() + 1).unwrap_or(u32::MAX);
            let mut record = AttemptRecord::started(call_number, self.next_kind.clone());
            let request = ServiceRequest {
                messages: self.history.clone(),
                max_output_tokens: self.max_output_tokens,
            };
            tracing::debug!(call = call_number, kind = ?record.kind, "issuing call");

            let call = match orchestrator
                .call_with_retries(&request, cancel, &mut record)
                .await
            {
                Ok(call) => call,
                Err(CallFailure::Cancelled) => {
                    self.attempts.push(record);
                    self.partial = None;
                    return Err(self.fail(FailureReason::Cancelled));
                }
                Err(CallFailure::Transport(error)) => {
                    tracing::error!(%error, "generation service unreachable");
                    record.transport_error = Some(error.clone());
                    self.attempts.push(record);
                    self.partial = Some(extract_code(&self.artifact).code);
                    return Err(self.fail(FailureReason::TransportFailure(error)));
                }
            };

            self.enter(OrchestratorState::Streaming);
            let signal = terminal_signal(call.finish.as_ref(), call.stream_error.is_some());
            if self.next_kind == AttemptKind::Continuation {
                let shape = shape_signal(&signal);
                splice_continuation(&mut self.artifact, &call.segment, |text| {
                    !matches!(
                        orchestrator.classifier.classify_text(text, &shape),
                        Ok((_, CompletenessVerdict::Invalid(_)))
                    )
                });
            } else {
                self.artifact.clone_from(&call.segment);
            }

            self.enter(OrchestratorState::Classifying);
            let (extracted, verdict) =
                match orchestrator.classifier.classify_text(&self.artifact, &signal) {
                    Ok(classified) => classified,
                    Err(error) => {
                        tracing::error!(%error, "classifier could not parse artifact");
                        self.attempts.push(record);
                        return Err(self.fail(FailureReason::InternalParseInconsistency(error)));
                    }
                };
            tracing::debug!(verdict = verdict.label(), ?signal, "artifact classified");
            record.verdict = Some(verdict.clone());
            self.partial = Some(extracted.code.clone());

            match verdict {
                CompletenessVerdict::Complete => {
                    self.enter(OrchestratorState::Validating);
                    let imports = match orchestrator.analyzer.analyze(&extracted.code) {
                        Ok(imports) => imports,
                        Err(error) => {
                            tracing::error!(%error, "COMPLETE artifact failed import analysis");
                            self.attempts.push(record);
                            return Err(
                                self.fail(FailureReason::InternalParseInconsistency(error))
                            );
                        }
                    };

                    let report = orchestrator.gate.evaluate(&imports);
                    if report.is_compliant() {
                        self.attempts.push(record);
                        self.enter(OrchestratorState::Done);
                        return Ok(FinalArtifact {
                            request_id: self.request_id,
                            source: extracted.code,
                            report,
                            imports,
                            continuations_used: self.budget.continuations_used(),
                            rewrites_used: self.budget.rewrites_used(),
                            attempts: self.attempts,
                        });
                    }

                    let modules: Vec<String> = report
                        .disallowed_modules()
                        .into_iter()
                        .map(str::to_string)
                        .collect();
                    record.violations.clone_from(&modules);
                    self.attempts.push(record);
                    if !self.budget.try_rewrite() {
                        let used = self.budget.rewrites_used();
                        return Err(self.fail(FailureReason::ExhaustedRewrites { used }));
                    }

                    self.enter(OrchestratorState::Rewriting);
                    let names: Vec<&str> = modules.iter().map(String::as_str).collect();
                    let instruction =
                        prompts::violation_rewrite(&names, orchestrator.gate.allow_list());
                    self.restart(instruction, RewriteCause::PolicyViolation(modules));
                }
                CompletenessVerdict::Truncated(diagnostic) => {
                    self.attempts.push(record);
                    if !self.budget.try_continue() {
                        let used = self.budget.continuations_used();
                        return Err(self.fail(FailureReason::ExhaustedContinuations { used }));
                    }

                    self.enter(OrchestratorState::Continuing);
                    tracing::debug!(%diagnostic, "requesting continuation");
                    self.history.push(ChatMessage::assistant(call.segment));
                    self.history.push(ChatMessage::user(prompts::CONTINUE_INSTRUCTION));
                    self.next_kind = AttemptKind::Continuation;
                }
                CompletenessVerdict::Invalid(diagnostic) => {
                    self.attempts.push(record);
                    if !self.budget.try_rewrite() {
                        let used = self.budget.rewrites_used();
                        return Err(self.fail(FailureReason::ExhaustedRewrites { used }));
                    }

                    self.enter(OrchestratorState::Rewriting);
                    tracing::debug!(%diagnostic, "requesting rewrite of malformed artifact");
                    self.restart(
                        prompts::malformed_rewrite(Some(&diagnostic)),
                        RewriteCause::Malformed,
                    );
                }
            }

            self.enter(OrchestratorState::Requesting);
        }
    }
}

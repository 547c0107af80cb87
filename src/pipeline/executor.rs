//! Async executor: runs resolutions off the UI task, one at a time
//!
//! The executor owns the [`ResponseRouter`] while idle. `submit` moves it
//! into a spawned worker, and the worker hands it back inside a
//! [`WorkerReport`] over an unbounded channel that the UI loop drains.
//! While the router is checked out every new submission is rejected, so
//! the cache and the knowledge store never see two resolutions at once.

use async_trait::async_trait;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::learning::LearningCoordinator;
use super::router::ResponseRouter;
use crate::config::LearningConfig;
use crate::error::AssistantError;
use crate::types::{LineStyle, PendingRequest, ResolutionResult};

/// Confirmation shown after a learned answer was stored
pub const LEARNED_LINE: &str = "✅ ¡Aprendido! Respuesta guardada.";
/// Shown when storing a learned answer failed
pub const LEARN_FAILED_LINE: &str = "❌ Error al guardar.";

/// What the executor needs from whoever draws the conversation
#[async_trait]
pub trait ChatFrontend: Send {
    /// Add one line to the transcript
    fn append(&mut self, line: &str, style: LineStyle);

    /// Show the typing indicator
    fn typing_started(&mut self);

    /// Remove the typing indicator
    fn typing_finished(&mut self);

    /// Ask the user for a canonical answer; `None` means skipped
    async fn learning_prompt(&mut self, question: &str) -> Option<String>;
}

/// Per-request lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Idle,
    Dispatched,
    Resolving,
    Displaying,
    Failed,
}

/// Result of a `submit` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A worker was dispatched
    Accepted,
    /// Another request is still in flight; nothing happened
    Busy,
    /// Blank input; nothing happened
    Empty,
}

/// Worker -> UI handoff
pub struct WorkerReport {
    pub request_id: Uuid,
    router: ResponseRouter,
    pub outcome: Result<ResolutionResult, AssistantError>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorSettings {
    /// Pause between a generated answer and the learning prompt
    pub prompt_delay: Duration,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self::from(&LearningConfig::default())
    }
}

impl From<&LearningConfig> for ExecutorSettings {
    fn from(config: &LearningConfig) -> Self {
        Self {
            prompt_delay: Duration::from_millis(config.prompt_delay_ms),
        }
    }
}

pub struct AsyncExecutor {
    router: Option<ResponseRouter>,
    learning: LearningCoordinator,
    settings: ExecutorSettings,
    pending: Option<PendingRequest>,
    state: ExecutorState,
    reports: mpsc::UnboundedSender<WorkerReport>,
}

impl AsyncExecutor {
    /// Executor plus the receiver the UI loop must drain into [`complete`](Self::complete)
    pub fn new(
        router: ResponseRouter,
        learning: LearningCoordinator,
        settings: ExecutorSettings,
    ) -> (Self, mpsc::UnboundedReceiver<WorkerReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let executor = Self {
            router: Some(router),
            learning,
            settings,
            pending: None,
            state: ExecutorState::Idle,
            reports: tx,
        };
        (executor, rx)
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == ExecutorState::Idle
    }

    /// Request currently in flight, if any
    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Echo `text` and start resolving it in the background
    pub fn submit<F: ChatFrontend + ?Sized>(&mut self, text: &str, ui: &mut F) -> SubmitOutcome {
        let query = text.trim();
        if query.is_empty() {
            return SubmitOutcome::Empty;
        }
        if self.state != ExecutorState::Idle {
            debug!("Submission rejected while {:?}", self.state);
            return SubmitOutcome::Busy;
        }
        let Some(mut router) = self.router.take() else {
            return SubmitOutcome::Busy;
        };

        self.state = ExecutorState::Dispatched;
        ui.append(query, LineStyle::User);
        ui.typing_started();

        let request = PendingRequest::new(query);
        let request_id = request.id;
        let query = request.query.clone();
        self.pending = Some(request);

        let reports = self.reports.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(router.resolve(&query))
                .catch_unwind()
                .await
                .map_err(|payload| AssistantError::Unexpected(panic_message(payload.as_ref())));

            let report = WorkerReport {
                request_id,
                router,
                outcome,
            };
            if reports.send(report).is_err() {
                warn!("Executor dropped before request {} finished", request_id);
            }
        });

        self.state = ExecutorState::Resolving;
        SubmitOutcome::Accepted
    }

    /// Display a worker's outcome, run the learning step and go back to idle
    pub async fn complete<F: ChatFrontend + ?Sized>(&mut self, report: WorkerReport, ui: &mut F) {
        let WorkerReport {
            request_id,
            router,
            outcome,
        } = report;
        self.router = Some(router);

        let request = self.pending.take();
        if request.as_ref().map(|r| r.id) != Some(request_id) {
            warn!("Report for unknown request {}", request_id);
        }

        ui.typing_finished();

        match outcome {
            Ok(result) => {
                self.state = ExecutorState::Displaying;
                ui.append(&result.display_line(), LineStyle::Bot);

                if let Some(request) = request {
                    if self.learning.should_prompt(&result) {
                        self.offer_learning(&request.query, ui).await;
                    }
                }
            }
            Err(e) => {
                self.state = ExecutorState::Failed;
                error!("Resolution failed: {}", e);
                ui.append(&format!("❌ Error: {}", e), LineStyle::Error);
            }
        }

        self.state = ExecutorState::Idle;
    }

    async fn offer_learning<F: ChatFrontend + ?Sized>(&self, question: &str, ui: &mut F) {
        if !self.settings.prompt_delay.is_zero() {
            tokio::time::sleep(self.settings.prompt_delay).await;
        }

        let Some(answer) = ui.learning_prompt(question).await else {
            return;
        };
        if answer.trim().is_empty() {
            return;
        }

        if self.learning.learn(question, &answer).await {
            ui.append(LEARNED_LINE, LineStyle::Bot);
        } else {
            ui.append(LEARN_FAILED_LINE, LineStyle::Error);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::{GenerationRequest, GenerationResponse, GenerativeService};
    use crate::config::Config;
    use crate::error::Result;
    use crate::memory::{KnowledgeEntry, KnowledgeRepository, VolatileKnowledgeStore};
    use crate::types::ResponseSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct Transcript {
        lines: Vec<(String, LineStyle)>,
        typing_started: usize,
        typing_finished: usize,
        prompts: Vec<String>,
        prompted: Arc<AtomicUsize>,
        reply: Option<String>,
    }

    #[async_trait]
    impl ChatFrontend for Transcript {
        fn append(&mut self, line: &str, style: LineStyle) {
            self.lines.push((line.to_string(), style));
        }

        fn typing_started(&mut self) {
            self.typing_started += 1;
        }

        fn typing_finished(&mut self) {
            self.typing_finished += 1;
        }

        async fn learning_prompt(&mut self, question: &str) -> Option<String> {
            self.prompts.push(question.to_string());
            self.prompted.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    struct GatedModel {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl GenerativeService for GatedModel {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResponse> {
            self.gate.notified().await;
            Ok(GenerationResponse { content: "Generado".to_string() })
        }
    }

    struct PanickingModel;

    #[async_trait]
    impl GenerativeService for PanickingModel {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResponse> {
            panic!("model exploded");
        }
    }

    struct ReadOnlyStore;

    #[async_trait]
    impl KnowledgeRepository for ReadOnlyStore {
        async fn fetch_all(&self) -> Result<Vec<KnowledgeEntry>> {
            Ok(Vec::new())
        }

        async fn insert(&self, _question: &str, _answer: &str) -> bool {
            false
        }
    }

    fn executor(
        repository: Arc<dyn KnowledgeRepository>,
        service: Arc<dyn GenerativeService>,
    ) -> (AsyncExecutor, mpsc::UnboundedReceiver<WorkerReport>) {
        let router = ResponseRouter::with_services(&Config::default(), repository.clone(), service);
        let learning = LearningCoordinator::new(repository, true);
        AsyncExecutor::new(
            router,
            learning,
            ExecutorSettings {
                prompt_delay: Duration::ZERO,
            },
        )
    }

    struct FixedModel;

    #[async_trait]
    impl GenerativeService for FixedModel {
        async fn generate(&self, _request: &GenerationRequest) -> Result<GenerationResponse> {
            Ok(GenerationResponse { content: "Generado".to_string() })
        }
    }

    fn fixed_model() -> Arc<dyn GenerativeService> {
        Arc::new(FixedModel)
    }

    #[tokio::test]
    async fn test_second_submit_is_rejected_while_resolving() {
        let gate = Arc::new(Notify::new());
        let (mut executor, mut reports) = executor(
            Arc::new(VolatileKnowledgeStore::new()),
            Arc::new(GatedModel { gate: gate.clone() }),
        );
        let mut ui = Transcript::default();

        assert_eq!(executor.submit("explica los lifetimes", &mut ui), SubmitOutcome::Accepted);
        assert_eq!(executor.state(), ExecutorState::Resolving);
        assert_eq!(executor.pending().map(|r| r.query.as_str()), Some("explica los lifetimes"));

        assert_eq!(executor.submit("otra pregunta", &mut ui), SubmitOutcome::Busy);
        assert_eq!(ui.lines.len(), 1);
        assert_eq!(ui.typing_started, 1);

        gate.notify_one();
        let report = reports.recv().await.unwrap();
        executor.complete(report, &mut ui).await;

        assert!(executor.is_idle());
        assert!(executor.pending().is_none());
        assert_eq!(ui.typing_finished, 1);
        assert_eq!(ui.lines[0], ("explica los lifetimes".to_string(), LineStyle::User));
        assert!(ui.lines[1].0.starts_with("Generado ("));
        assert!(ui.lines[1].0.ends_with("s)"));
        assert_eq!(ui.lines[1].1, LineStyle::Bot);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let (mut executor, _reports) = executor(Arc::new(VolatileKnowledgeStore::new()), fixed_model());
        let mut ui = Transcript::default();

        assert_eq!(executor.submit("   ", &mut ui), SubmitOutcome::Empty);
        assert!(ui.lines.is_empty());
        assert!(executor.is_idle());
    }

    #[tokio::test]
    async fn test_panic_becomes_error_line_and_executor_recovers() {
        let (mut executor, mut reports) =
            executor(Arc::new(VolatileKnowledgeStore::new()), Arc::new(PanickingModel));
        let mut ui = Transcript::default();

        executor.submit("algo raro", &mut ui);
        let report = reports.recv().await.unwrap();
        assert!(matches!(report.outcome, Err(AssistantError::Unexpected(ref m)) if m.contains("model exploded")));
        executor.complete(report, &mut ui).await;

        assert!(executor.is_idle());
        assert_eq!(ui.typing_finished, 1);
        let (line, style) = ui.lines.last().unwrap();
        assert_eq!(*style, LineStyle::Error);
        assert!(line.starts_with("❌ Error:"));
        assert!(ui.prompts.is_empty());

        // Router came back, so the next request is served
        assert_eq!(executor.submit("hola", &mut ui), SubmitOutcome::Accepted);
        let report = reports.recv().await.unwrap();
        executor.complete(report, &mut ui).await;
        assert!(ui.lines.last().unwrap().0.starts_with("¡Hola!"));
    }

    #[tokio::test]
    async fn test_learned_answer_is_served_next_time() {
        let store = Arc::new(VolatileKnowledgeStore::new());
        let (mut executor, mut reports) = executor(store.clone(), fixed_model());
        let mut ui = Transcript {
            reply: Some("  Un runtime asíncrono  ".to_string()),
            ..Default::default()
        };

        executor.submit("qué es tokio", &mut ui);
        let report = reports.recv().await.unwrap();
        assert_eq!(report.outcome.as_ref().unwrap().source, ResponseSource::Generative);
        executor.complete(report, &mut ui).await;

        assert_eq!(ui.prompts, vec!["qué es tokio".to_string()]);
        assert_eq!(ui.lines.last().unwrap(), &(LEARNED_LINE.to_string(), LineStyle::Bot));
        assert_eq!(store.count().await.unwrap(), 1);

        ui.reply = None;
        executor.submit("qué es tokio", &mut ui);
        let report = reports.recv().await.unwrap();
        let result = report.outcome.as_ref().unwrap().clone();
        executor.complete(report, &mut ui).await;

        assert_eq!(result.source, ResponseSource::Knowledge);
        assert_eq!(result.text, "Un runtime asíncrono");
        assert_eq!(ui.prompts.len(), 1);
    }

    #[tokio::test]
    async fn test_instant_answers_are_not_offered_for_learning() {
        let (mut executor, mut reports) = executor(Arc::new(VolatileKnowledgeStore::new()), fixed_model());
        let mut ui = Transcript {
            reply: Some("nunca".to_string()),
            ..Default::default()
        };

        executor.submit("gracias", &mut ui);
        let report = reports.recv().await.unwrap();
        executor.complete(report, &mut ui).await;

        assert!(ui.prompts.is_empty());
        assert_eq!(ui.lines.len(), 2);
    }

    #[tokio::test]
    async fn test_failed_insert_is_reported() {
        let (mut executor, mut reports) = executor(Arc::new(ReadOnlyStore), fixed_model());
        let mut ui = Transcript {
            reply: Some("respuesta".to_string()),
            ..Default::default()
        };

        executor.submit("pregunta nueva", &mut ui);
        let report = reports.recv().await.unwrap();
        executor.complete(report, &mut ui).await;

        assert_eq!(ui.lines.last().unwrap(), &(LEARN_FAILED_LINE.to_string(), LineStyle::Error));
        assert!(executor.is_idle());
    }

    #[tokio::test]
    async fn test_skipped_prompt_writes_nothing() {
        let store = Arc::new(VolatileKnowledgeStore::new());
        let (mut executor, mut reports) = executor(store.clone(), fixed_model());
        let mut ui = Transcript::default();

        executor.submit("pregunta nueva", &mut ui);
        let report = reports.recv().await.unwrap();
        executor.complete(report, &mut ui).await;

        assert_eq!(ui.prompts.len(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(ui.lines.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_learning_prompt_waits_for_delay() {
        let settings = ExecutorSettings::default();
        assert_eq!(settings.prompt_delay, Duration::from_millis(1000));

        let repository: Arc<dyn KnowledgeRepository> = Arc::new(VolatileKnowledgeStore::new());
        let router = ResponseRouter::with_services(&Config::default(), repository.clone(), fixed_model());
        let (mut executor, mut reports) =
            AsyncExecutor::new(router, LearningCoordinator::new(repository, true), settings);
        let mut ui = Transcript::default();
        let prompted = ui.prompted.clone();

        executor.submit("qué es tokio", &mut ui);
        let report = reports.recv().await.unwrap();
        let completion = tokio::spawn(async move {
            executor.complete(report, &mut ui).await;
            (executor, ui)
        });

        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(prompted.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(prompted.load(Ordering::SeqCst), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        let (executor, ui) = completion.await.unwrap();

        assert_eq!(prompted.load(Ordering::SeqCst), 1);
        assert_eq!(ui.prompts, vec!["qué es tokio".to_string()]);
        assert!(executor.is_idle());
    }
}

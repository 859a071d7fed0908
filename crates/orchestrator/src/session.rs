//! The session orchestrator: runs the full toolbelt flow for one user
//! request.
//!
//! A run is a linear state machine: plan capabilities, report them,
//! synthesize their implementations in parallel, record them, ask the
//! model which to call, execute the calls sequentially, and summarize.
//! Progress is streamed as it happens; the stream always ends with a
//! terminal event, including on phase failures.

use std::collections::HashMap;
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use db::{CapabilityRecord, CapabilityRepository, SessionRepository};
use events::{EventBus, EventEnvelope, SessionEvent};
use llm::{ModelClient, ResponseRequest, ToolChoice};
use toolbelt_core::{CallRequest, CallResult, CapabilitySpec, ThreadItem};

use crate::error::Result;
use crate::prompts::SystemPrompts;
use crate::registry::{CapabilityLoader, CapabilityRegistry};
use crate::spec_parser;
use crate::store::CapabilityStore;
use crate::synthesizer::CapabilitySynthesizer;

/// Ceiling for concurrently running synthesis calls within one run.
const MAX_CONCURRENT_SYNTHESIS: usize = 4;

/// Progress channel depth; the transport drains continuously.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Model selection per phase.
#[derive(Debug, Clone)]
pub struct PhaseModels {
    pub planner: String,
    pub synthesizer: String,
    pub invoker: String,
    pub summarizer: String,
}

impl Default for PhaseModels {
    fn default() -> Self {
        Self {
            planner: "gpt-5-mini".to_string(),
            synthesizer: "gpt-5-nano".to_string(),
            invoker: "gpt-5-nano".to_string(),
            summarizer: "gpt-5-mini".to_string(),
        }
    }
}

/// Configuration for one session run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Externally supplied session identifier
    pub session_id: String,
    /// Identifier of the originating user
    pub user_id: String,
    /// Per-phase model selection
    pub models: PhaseModels,
}

/// Collaborators a session run needs.
///
/// The registry and store are per-run parameters rather than globals;
/// the repositories and bus are optional, and their failures are never
/// fatal to a run.
pub struct SessionDeps {
    pub model: Arc<dyn ModelClient>,
    pub store: CapabilityStore,
    pub registry: Arc<CapabilityRegistry>,
    pub loader: Arc<dyn CapabilityLoader>,
    pub sessions: Option<SessionRepository>,
    pub capabilities: Option<CapabilityRepository>,
    pub bus: Option<EventBus>,
}

/// Runs the full toolbelt flow for a given user request.
pub struct ToolbeltSession {
    config: SessionConfig,
    deps: SessionDeps,
    planning_thread: Vec<ThreadItem>,
    execution_thread: Vec<ThreadItem>,
    specs: Vec<CapabilitySpec>,
    sources: HashMap<String, String>,
}

/// Delivers progress events to the run's stream, the observation bus,
/// and the accumulated log persisted at the end of the run.
struct ProgressSink {
    tx: mpsc::Sender<SessionEvent>,
    bus: Option<EventBus>,
    session_id: String,
    log: Vec<String>,
}

impl ProgressSink {
    async fn emit(&mut self, event: SessionEvent) {
        self.log.push(event.to_string());

        if let Some(bus) = &self.bus {
            bus.publish(EventEnvelope::new(self.session_id.clone(), event.clone()));
        }

        // The consumer may have disconnected; the run still completes.
        let _ = self.tx.send(event).await;
    }
}

impl ToolbeltSession {
    pub fn new(config: SessionConfig, deps: SessionDeps) -> Self {
        Self {
            config,
            deps,
            planning_thread: Vec::new(),
            execution_thread: Vec::new(),
            specs: Vec::new(),
            sources: HashMap::new(),
        }
    }

    /// Start the run.
    ///
    /// Returns the live, ordered progress stream; the pipeline executes
    /// on a background task and the stream terminates after the final
    /// answer or an earlier terminal event.
    pub fn run(self, user_request: String) -> ReceiverStream<SessionEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        tokio::spawn(async move {
            self.drive(user_request, tx).await;
        });

        ReceiverStream::new(rx)
    }

    async fn drive(mut self, user_request: String, tx: mpsc::Sender<SessionEvent>) {
        let mut sink = ProgressSink {
            tx,
            bus: self.deps.bus.clone(),
            session_id: self.config.session_id.clone(),
            log: Vec::new(),
        };

        info!(
            session_id = %self.config.session_id,
            user_id = %self.config.user_id,
            "Session run started"
        );

        self.note_session(&user_request).await;

        // 1. Planning
        sink.emit(SessionEvent::PlanningStarted).await;
        self.planning_thread.push(ThreadItem::user(&user_request));

        let request = ResponseRequest::new(&self.config.models.planner, self.planning_thread.clone())
            .with_instructions(SystemPrompts::tool_creation())
            .with_tools(vec![SystemPrompts::create_tool_schema()]);

        let response = match self.deps.model.create_response(request).await {
            Ok(response) => response,
            Err(e) => {
                self.finish_fatal(&mut sink, "planning", e.to_string()).await;
                return;
            }
        };

        self.planning_thread
            .extend(response.output.iter().filter_map(|item| item.as_thread_item()));
        self.specs = spec_parser::extract_specs(&response.output);

        if self.specs.is_empty() {
            warn!(session_id = %self.config.session_id, "Planner produced no tool definitions");
            sink.emit(SessionEvent::NoCapabilitiesPlanned).await;
        }

        // 2. Reporting
        for spec in &self.specs {
            sink.emit(SessionEvent::CapabilityPlanned {
                name: spec.name.clone(),
                description: spec.description.clone(),
            })
            .await;
        }

        // 3. Synthesis + 4. Persistence notification
        if !self.specs.is_empty() {
            sink.emit(SessionEvent::SynthesisStarted {
                count: self.specs.len(),
            })
            .await;

            match self.synthesize_all().await {
                Ok(sources) => {
                    self.sources = sources;
                    sink.emit(SessionEvent::SynthesisCompleted {
                        count: self.sources.len(),
                    })
                    .await;
                }
                Err(e) => {
                    // Synthesis failures are terminal: no partial
                    // capability set is carried forward.
                    self.finish_fatal(&mut sink, "synthesis", e.to_string()).await;
                    return;
                }
            }

            for spec in &self.specs {
                self.deps
                    .registry
                    .register(&spec.name, self.deps.loader.load(&spec.name));
            }

            let names: Vec<&str> = self.specs.iter().map(|s| s.name.as_str()).collect();
            self.planning_thread.push(ThreadItem::user(format!(
                "I have went ahead and successfully created {} tools: {}",
                names.len(),
                names.join(", ")
            )));

            self.persist_capabilities(&mut sink).await;
        }

        // 5. Invocation planning
        self.execution_thread.push(ThreadItem::user(&user_request));

        if self.specs.is_empty() {
            sink.emit(SessionEvent::CannotProceed).await;
            self.finish(&mut sink).await;
            return;
        }

        sink.emit(SessionEvent::InvocationStarted).await;

        let tools = self.specs.iter().map(|s| s.to_function_schema()).collect();
        let allowed: Vec<String> = self.specs.iter().map(|s| s.name.clone()).collect();
        let request = ResponseRequest::new(&self.config.models.invoker, self.execution_thread.clone())
            .with_instructions(SystemPrompts::use_tool())
            .with_tools(tools)
            .with_tool_choice(ToolChoice::required(allowed));

        let response = match self.deps.model.create_response(request).await {
            Ok(response) => response,
            Err(e) => {
                self.finish_fatal(&mut sink, "invocation", e.to_string()).await;
                return;
            }
        };

        self.execution_thread
            .extend(response.output.iter().filter_map(|item| item.as_thread_item()));

        // 6. Call extraction
        let calls = spec_parser::extract_calls(&response.output);
        if calls.is_empty() {
            sink.emit(SessionEvent::NoCallsRequested).await;
        } else {
            sink.emit(SessionEvent::CallsRequested { count: calls.len() }).await;
        }

        // 7. Dynamic execution
        let results = self.execute_calls(&calls, &mut sink).await;

        // 8. Result aggregation
        for result in &results {
            self.execution_thread.push(ThreadItem::function_call_output(
                &result.call_id,
                result.output.to_string(),
            ));
        }

        // 9. Summarization
        sink.emit(SessionEvent::Summarizing).await;

        let request = ResponseRequest::new(
            &self.config.models.summarizer,
            self.execution_thread.clone(),
        )
        .with_instructions(SystemPrompts::tool_summary());

        match self.deps.model.create_response(request).await {
            Ok(response) => {
                sink.emit(SessionEvent::FinalAnswer {
                    text: response.output_text(),
                })
                .await;
            }
            Err(e) => {
                self.finish_fatal(&mut sink, "summarization", e.to_string()).await;
                return;
            }
        }

        self.finish(&mut sink).await;
    }

    /// Synthesize every planned capability through a bounded worker
    /// pool. Any single failure fails the whole phase.
    async fn synthesize_all(&self) -> Result<HashMap<String, String>> {
        let synthesizer = CapabilitySynthesizer::new(
            Arc::clone(&self.deps.model),
            self.deps.store.clone(),
            self.config.models.synthesizer.clone(),
        );

        let results: Vec<(String, Result<String>)> = futures::stream::iter(self.specs.clone())
            .map(|spec| {
                let synthesizer = synthesizer.clone();
                async move {
                    let source = synthesizer.synthesize(&spec).await;
                    (spec.name, source)
                }
            })
            .buffer_unordered(MAX_CONCURRENT_SYNTHESIS)
            .collect()
            .await;

        let mut sources = HashMap::new();
        for (name, result) in results {
            sources.insert(name, result?);
        }

        Ok(sources)
    }

    /// Record the synthesized capabilities in the session store.
    /// Failures are reported and the run continues.
    async fn persist_capabilities(&self, sink: &mut ProgressSink) {
        let Some(repo) = &self.deps.capabilities else {
            return;
        };

        let records: Vec<CapabilityRecord> = self
            .specs
            .iter()
            .filter_map(|spec| {
                self.sources.get(&spec.name).map(|source| {
                    CapabilityRecord::from_spec(
                        spec,
                        source,
                        &self.config.session_id,
                        &self.config.user_id,
                    )
                })
            })
            .collect();

        if let Err(e) = repo.insert_batch(&records).await {
            warn!(
                session_id = %self.config.session_id,
                error = %e,
                "Failed to record capabilities"
            );
            sink.emit(SessionEvent::PersistenceFailed {
                message: e.to_string(),
            })
            .await;
        }
    }

    /// Execute the requested calls in order. Sequential by design:
    /// history append order is significant, and capability side effects
    /// may be order-sensitive. Each failure is isolated into its call's
    /// result.
    async fn execute_calls(
        &self,
        calls: &[CallRequest],
        sink: &mut ProgressSink,
    ) -> Vec<CallResult> {
        let total = calls.len();
        let mut results = Vec::with_capacity(total);

        for (index, call) in calls.iter().enumerate() {
            sink.emit(SessionEvent::LoadingCapability {
                name: call.name.clone(),
            })
            .await;

            let capability = match self.deps.registry.resolve(&call.name) {
                Ok(capability) => capability,
                Err(e) => {
                    sink.emit(SessionEvent::CallFailed {
                        name: call.name.clone(),
                        message: e.to_string(),
                    })
                    .await;
                    results.push(CallResult::error(&call.call_id, e.to_string()));
                    continue;
                }
            };

            sink.emit(SessionEvent::CapabilityLoaded {
                name: call.name.clone(),
            })
            .await;
            sink.emit(SessionEvent::ExecutingCall {
                name: call.name.clone(),
                index: index + 1,
                total,
            })
            .await;

            match capability.invoke(&call.arguments).await {
                Ok(output) => {
                    sink.emit(SessionEvent::CallCompleted {
                        name: call.name.clone(),
                    })
                    .await;
                    results.push(CallResult::ok(&call.call_id, output));
                }
                Err(e) => {
                    sink.emit(SessionEvent::CallFailed {
                        name: call.name.clone(),
                        message: e.to_string(),
                    })
                    .await;
                    results.push(CallResult::error(&call.call_id, e.to_string()));
                }
            }
        }

        results
    }

    /// Record the session row and its current query. Non-fatal.
    async fn note_session(&self, user_request: &str) {
        let Some(repo) = &self.deps.sessions else {
            return;
        };

        if let Err(e) = repo.upsert(&self.config.session_id, &self.config.user_id).await {
            warn!(
                session_id = %self.config.session_id,
                error = %e,
                "Failed to record session"
            );
            return;
        }

        if let Err(e) = repo
            .update_current_query(&self.config.session_id, user_request)
            .await
        {
            warn!(
                session_id = %self.config.session_id,
                error = %e,
                "Failed to record current query"
            );
        }
    }

    /// Phase-level failures are handled uniformly: a terminal error
    /// event, then a clean end of the stream.
    async fn finish_fatal(&self, sink: &mut ProgressSink, phase: &str, message: String) {
        warn!(
            session_id = %self.config.session_id,
            phase = phase,
            error = %message,
            "Session run failed"
        );

        sink.emit(SessionEvent::Fatal {
            phase: phase.to_string(),
            message,
        })
        .await;

        self.finish(sink).await;
    }

    async fn finish(&self, sink: &mut ProgressSink) {
        if let Some(repo) = &self.deps.sessions {
            if let Err(e) = repo.update_log(&self.config.session_id, &sink.log).await {
                warn!(
                    session_id = %self.config.session_id,
                    error = %e,
                    "Failed to persist session log"
                );
            }
        }

        info!(
            session_id = %self.config.session_id,
            events = sink.log.len(),
            "Session run finished"
        );
    }
}

//! Shared test helpers: a scripted transfer client and a log capture layer

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use crate::config::EndpointConfig;
use crate::sftp::{FileManifest, PullRequest, RemoteSession, SftpError, TransferClient};

/// What the next attempt does
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Files(Vec<String>),
    FailOpen(String),
    FailPull(String),
}

#[derive(Default)]
struct ScriptState {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<Step>,
    removals: Mutex<VecDeque<Result<Vec<String>, String>>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    pull_requests: Mutex<Vec<PullRequest>>,
    removal_masks: Mutex<Vec<String>>,
}

/// Fake [`TransferClient`] that plays back a fixed script
#[derive(Clone)]
pub(crate) struct ScriptedClient {
    state: Arc<ScriptState>,
}

impl ScriptedClient {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            state: Arc::new(ScriptState {
                steps: Mutex::new(steps.into()),
                ..Default::default()
            }),
        }
    }

    /// Every attempt does the same thing
    pub(crate) fn repeating(step: Step) -> Self {
        Self {
            state: Arc::new(ScriptState {
                fallback: Some(step),
                ..Default::default()
            }),
        }
    }

    pub(crate) fn with_removals(self, removals: Vec<Result<Vec<String>, String>>) -> Self {
        self.state.removals.lock().extend(removals);
        self
    }

    pub(crate) fn opens(&self) -> usize {
        self.state.opens.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    pub(crate) fn pull_requests(&self) -> Vec<PullRequest> {
        self.state.pull_requests.lock().clone()
    }

    pub(crate) fn removal_masks(&self) -> Vec<String> {
        self.state.removal_masks.lock().clone()
    }
}

impl ScriptState {
    fn next_step(&self) -> Option<Step> {
        self.steps
            .lock()
            .pop_front()
            .or_else(|| self.fallback.clone())
    }

    fn open_failure(&self) -> Option<String> {
        let mut steps = self.steps.lock();
        match steps.front() {
            Some(Step::FailOpen(_)) => match steps.pop_front() {
                Some(Step::FailOpen(msg)) => Some(msg),
                _ => None,
            },
            Some(_) => None,
            None => match &self.fallback {
                Some(Step::FailOpen(msg)) => Some(msg.clone()),
                _ => None,
            },
        }
    }
}

#[async_trait]
impl TransferClient for ScriptedClient {
    async fn open(&self, _endpoint: &EndpointConfig) -> Result<Box<dyn RemoteSession>, SftpError> {
        self.state.opens.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.state.open_failure() {
            return Err(SftpError::ConnectionFailed(msg));
        }
        Ok(Box::new(ScriptedSession {
            state: self.state.clone(),
        }))
    }
}

struct ScriptedSession {
    state: Arc<ScriptState>,
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn pull(&mut self, request: &PullRequest) -> Result<FileManifest, SftpError> {
        self.state.pull_requests.lock().push(request.clone());
        match self.state.next_step() {
            Some(Step::Files(files)) => Ok(FileManifest::new(files)),
            Some(Step::FailPull(msg)) => Err(SftpError::ProtocolError(msg)),
            Some(Step::FailOpen(msg)) => Err(SftpError::ConnectionFailed(msg)),
            None => Err(SftpError::ConnectionFailed("script exhausted".into())),
        }
    }

    async fn remove(&mut self, path_and_mask: &str) -> Result<Vec<String>, SftpError> {
        self.state
            .removal_masks
            .lock()
            .push(path_and_mask.to_string());
        match self.state.removals.lock().pop_front() {
            Some(Ok(files)) => Ok(files),
            Some(Err(msg)) => Err(SftpError::PermissionDenied(msg)),
            None => Ok(Vec::new()),
        }
    }

    async fn close(&mut self) -> Result<(), SftpError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every crate event as `(level, message)`
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs {
    entries: Arc<Mutex<Vec<(Level, String)>>>,
}

impl CapturedLogs {
    /// Capture events on the current thread until the guard drops
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::registry().with(self.clone());
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn last(&self) -> Option<(Level, String)> {
        self.entries.lock().last().cloned()
    }

    pub(crate) fn count(&self, level: Level, needle: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|(l, m)| *l == level && m.contains(needle))
            .count()
    }

    pub(crate) fn count_level(&self, level: Level) -> usize {
        self.entries.lock().iter().filter(|(l, _)| *l == level).count()
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !metadata.target().starts_with("ferrykit") {
            return;
        }
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        self.entries.lock().push((*metadata.level(), visitor.message));
    }
}

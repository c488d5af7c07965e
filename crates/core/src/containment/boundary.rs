use std::any::Any;
use std::backtrace::{Backtrace, BacktraceStatus};
use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Once};

use chrono::{DateTime, Utc};
use clubhouse_common::resilience::{
    ConnectivityMonitor, ErrorCategory, ErrorClassifier, RawFailure, Severity,
};
use clubhouse_common::time::{Clock, SystemClock};
use rand::Rng;
use serde::Serialize;
use tracing::{error, info};
use url::Url;

const ERROR_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ERROR_ID_SUFFIX_LEN: usize = 9;

/// What a boundary knows about the failure it caught
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainmentRecord {
    pub error_id: String,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub component_context: String,
    pub message: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BoundaryState {
    #[default]
    Clean,
    Failed(ContainmentRecord),
}

impl BoundaryState {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackAction {
    /// Reset the boundary and render the subtree again
    Retry,
    Reload,
    GoBack,
    ReportError,
}

/// Replacement view shown while a boundary is failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackView {
    pub error_id: String,
    pub badge: &'static str,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub message: String,
    pub suggestions: Vec<String>,
    pub actions: Vec<FallbackAction>,
}

impl From<&ContainmentRecord> for FallbackView {
    fn from(record: &ContainmentRecord) -> Self {
        Self {
            error_id: record.error_id.clone(),
            badge: record.category.label(),
            category: record.category,
            severity: record.severity,
            message: record.message.clone(),
            suggestions: record.suggestions.clone(),
            actions: vec![
                FallbackAction::Retry,
                FallbackAction::Reload,
                FallbackAction::GoBack,
                FallbackAction::ReportError,
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<V> {
    Content(V),
    Fallback(FallbackView),
}

impl<V> Rendered<V> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    pub fn content(self) -> Option<V> {
        match self {
            Self::Content(value) => Some(value),
            Self::Fallback(_) => None,
        }
    }
}

/// Pre-filled message for the support channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportReport {
    pub error_id: String,
    pub category: ErrorCategory,
    pub context: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl SupportReport {
    pub fn subject(&self) -> String {
        format!("Error report {}", self.error_id)
    }

    /// Plain-text body for an email or ticket
    pub fn to_message(&self) -> String {
        let mut body = format!(
            "Error ID: {}\nCategory: {}\nComponent: {}\nPage: {}\nTime: {}\n",
            self.error_id,
            self.category,
            self.context,
            self.url,
            self.timestamp.to_rfc3339(),
        );
        if let Some(stack) = &self.stack {
            body.push_str("\nStack:\n");
            body.push_str(stack);
            body.push('\n');
        }
        body.push_str("\nWhat were you doing when this happened?\n");
        body
    }
}

/// Supervisor for one presentation subtree
///
/// `Clean -> Failed` when the subtree panics or returns an error while
/// rendering, `Failed -> Clean` on [`retry`](Self::retry). While failed the
/// subtree is not invoked. Each boundary owns its state, so a failure never
/// reaches a sibling.
pub struct ContainmentBoundary {
    component_context: String,
    classifier: ErrorClassifier,
    clock: Arc<dyn Clock>,
    monitor: Option<Arc<ConnectivityMonitor>>,
    state: BoundaryState,
}

impl std::fmt::Debug for ContainmentBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainmentBoundary")
            .field("component_context", &self.component_context)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ContainmentBoundary {
    pub fn new(component_context: impl Into<String>, classifier: ErrorClassifier) -> Self {
        Self::with_clock(component_context, classifier, Arc::new(SystemClock))
    }

    pub fn with_clock(
        component_context: impl Into<String>,
        classifier: ErrorClassifier,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            component_context: component_context.into(),
            classifier,
            clock,
            monitor: None,
            state: BoundaryState::Clean,
        }
    }

    /// Classify failures against live connectivity
    ///
    /// Without a monitor the boundary assumes the client is online.
    pub fn with_monitor(mut self, monitor: Arc<ConnectivityMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn component_context(&self) -> &str {
        &self.component_context
    }

    pub fn state(&self) -> &BoundaryState {
        &self.state
    }

    /// Render the subtree, containing any panic or error it produces
    pub fn render<V, E, F>(&mut self, subtree: F) -> Rendered<V>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<RawFailure>,
    {
        if let BoundaryState::Failed(record) = &self.state {
            return Rendered::Fallback(FallbackView::from(record));
        }

        install_panic_capture();
        PANIC_STACK.with(|slot| slot.borrow_mut().take());
        let (failure, stack) = match catch_unwind(AssertUnwindSafe(subtree)) {
            Ok(Ok(content)) => return Rendered::Content(content),
            Ok(Err(err)) => (err.into(), None),
            Err(payload) => (
                RawFailure::error("panic", panic_message(payload.as_ref())),
                PANIC_STACK.with(|slot| slot.borrow_mut().take()),
            ),
        };

        let record = self.contain(&failure, stack);
        let view = FallbackView::from(&record);
        self.state = BoundaryState::Failed(record);
        Rendered::Fallback(view)
    }

    fn contain(&self, failure: &RawFailure, stack: Option<String>) -> ContainmentRecord {
        let offline = self.monitor.as_ref().is_some_and(|monitor| !monitor.is_online());
        let classified = self.classifier.classify(failure, offline);
        let millis = self.clock.millis_since_epoch();
        let error_id = generate_error_id(millis);
        let occurred_at = i64::try_from(millis)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        error!(
            error_id = %error_id,
            component = %self.component_context,
            category = %classified.category(),
            severity = %classified.severity(),
            message = %classified.message(),
            "render_failure_contained"
        );

        ContainmentRecord {
            error_id,
            category: classified.category(),
            severity: classified.severity(),
            component_context: self.component_context.clone(),
            message: classified.message().to_string(),
            suggestions: classified.suggestions().to_vec(),
            stack,
            occurred_at,
        }
    }

    /// Reset to `Clean` so the next render runs the subtree again
    ///
    /// Returns whether the boundary was failed.
    pub fn retry(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            BoundaryState::Failed(record) => {
                info!(
                    error_id = %record.error_id,
                    component = %self.component_context,
                    "boundary reset"
                );
                true
            }
            BoundaryState::Clean => false,
        }
    }

    /// Support report for the current failure, if any
    pub fn support_report(&self, page: &Url) -> Option<SupportReport> {
        let BoundaryState::Failed(record) = &self.state else {
            return None;
        };
        Some(SupportReport {
            error_id: record.error_id.clone(),
            category: record.category,
            context: record.component_context.clone(),
            url: page.to_string(),
            stack: record.stack.clone(),
            timestamp: record.occurred_at,
        })
    }
}

/// `err_<epoch millis>_<9 base36 chars>`
pub fn generate_error_id(millis: u64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ERROR_ID_SUFFIX_LEN)
        .map(|_| char::from(ERROR_ID_ALPHABET[rng.gen_range(0..ERROR_ID_ALPHABET.len())]))
        .collect();
    format!("err_{millis}_{suffix}")
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "render panicked".to_string()
    }
}

thread_local! {
    /// Backtrace recorded by the panic hook on the panicking thread
    static PANIC_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_CAPTURE: Once = Once::new();

/// Chain a hook that records the panic-site backtrace before unwinding
///
/// Capture follows `RUST_BACKTRACE`. A hook installed later by someone else
/// replaces this one, and panics then carry no stack.
fn install_panic_capture() {
    PANIC_CAPTURE.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            let backtrace = Backtrace::capture();
            if backtrace.status() == BacktraceStatus::Captured {
                let stack = backtrace.to_string();
                // The slot may already be gone during thread teardown.
                let _ = PANIC_STACK.try_with(|slot| *slot.borrow_mut() = Some(stack));
            }
            previous(info);
        }));
    });
}

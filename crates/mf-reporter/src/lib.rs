//! Uniform pending/success/failure reporting for asynchronous operations.
//!
//! Every long-running action in the interaction layer (listing reads, image
//! uploads, contract writes) surfaces its three phases through a
//! [`StatusSink`]. The view layer renders them however it likes; tests use
//! [`RecordingSink`] to assert on the exact sequence.

use std::future::Future;
use std::sync::Mutex;

/// The async actions the interaction layer reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    List,
    Upload,
    Register,
    Purchase,
}

/// Lifecycle phase of one operation invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Success,
    Failure,
}

/// Flavor of a one-off notification outside any operation (wallet
/// connect/disconnect, validation refusals).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Success,
    Failure,
    Info,
}

/// Receiver for operation phases and one-off notifications.
pub trait StatusSink: Send + Sync {
    /// Phase update for an in-flight operation.
    fn phase(&self, kind: OperationKind, phase: Phase, message: &str);

    /// One-off notification outside any operation.
    fn notify(&self, notice: Notice, message: &str);
}

/// Drive `operation` while reporting its phases to `sink`.
///
/// Reports `Pending` exactly once, before awaiting, then exactly one
/// terminal phase: `Success` with a message derived from the resolved value,
/// or `Failure` with the error's structured reason when `failure_reason`
/// yields one, else `fallback` verbatim.
pub async fn observe<T, E, F, M, R>(
    sink: &dyn StatusSink,
    kind: OperationKind,
    pending: &str,
    fallback: &str,
    operation: F,
    success_message: M,
    failure_reason: R,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    M: FnOnce(&T) -> String,
    R: FnOnce(&E) -> Option<String>,
{
    sink.phase(kind, Phase::Pending, pending);
    match operation.await {
        Ok(value) => {
            sink.phase(kind, Phase::Success, &success_message(&value));
            Ok(value)
        }
        Err(err) => {
            let message = failure_reason(&err).unwrap_or_else(|| fallback.to_owned());
            sink.phase(kind, Phase::Failure, &message);
            Err(err)
        }
    }
}

/// Sink that forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StatusSink for TracingSink {
    fn phase(&self, kind: OperationKind, phase: Phase, message: &str) {
        match phase {
            Phase::Pending => tracing::info!(operation = ?kind, "{message}"),
            Phase::Success => tracing::info!(operation = ?kind, "{message}"),
            Phase::Failure => tracing::error!(operation = ?kind, "{message}"),
        }
    }

    fn notify(&self, notice: Notice, message: &str) {
        match notice {
            Notice::Failure => tracing::error!("{message}"),
            Notice::Success | Notice::Info => tracing::info!("{message}"),
        }
    }
}

/// Everything a sink has seen, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Phase {
        kind: OperationKind,
        phase: Phase,
        message: String,
    },
    Notice {
        notice: Notice,
        message: String,
    },
}

/// Test double that records every report.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().expect("sink lock").clone()
    }

    /// Phase sequence recorded for one operation kind.
    pub fn phases(&self, wanted: OperationKind) -> Vec<(Phase, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Phase {
                    kind,
                    phase,
                    message,
                } if kind == wanted => Some((phase, message)),
                _ => None,
            })
            .collect()
    }

    /// All one-off notifications, in order.
    pub fn notices(&self) -> Vec<(Notice, String)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                SinkEvent::Notice { notice, message } => Some((notice, message)),
                _ => None,
            })
            .collect()
    }
}

impl StatusSink for RecordingSink {
    fn phase(&self, kind: OperationKind, phase: Phase, message: &str) {
        self.events.lock().expect("sink lock").push(SinkEvent::Phase {
            kind,
            phase,
            message: message.to_owned(),
        });
    }

    fn notify(&self, notice: Notice, message: &str) {
        self.events.lock().expect("sink lock").push(SinkEvent::Notice {
            notice,
            message: message.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeError {
        reason: Option<String>,
    }

    #[tokio::test]
    async fn observe_reports_pending_then_success() {
        let sink = RecordingSink::default();

        let result: Result<u32, FakeError> = observe(
            &sink,
            OperationKind::List,
            "loading",
            "load failed",
            async { Ok(3) },
            |count| format!("loaded {count}"),
            |err: &FakeError| err.reason.clone(),
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            sink.phases(OperationKind::List),
            vec![
                (Phase::Pending, "loading".to_owned()),
                (Phase::Success, "loaded 3".to_owned()),
            ],
        );
    }

    #[tokio::test]
    async fn observe_surfaces_structured_reason_on_failure() {
        let sink = RecordingSink::default();

        let result: Result<u32, FakeError> = observe(
            &sink,
            OperationKind::Purchase,
            "buying",
            "purchase failed",
            async {
                Err(FakeError {
                    reason: Some("Already sold".to_owned()),
                })
            },
            |_| unreachable!("operation fails"),
            |err: &FakeError| err.reason.clone(),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(
            sink.phases(OperationKind::Purchase),
            vec![
                (Phase::Pending, "buying".to_owned()),
                (Phase::Failure, "Already sold".to_owned()),
            ],
        );
    }

    #[tokio::test]
    async fn observe_falls_back_when_no_reason_is_available() {
        let sink = RecordingSink::default();

        let result: Result<u32, FakeError> = observe(
            &sink,
            OperationKind::Register,
            "registering",
            "registration failed",
            async { Err(FakeError { reason: None }) },
            |_| unreachable!("operation fails"),
            |err: &FakeError| err.reason.clone(),
        )
        .await;

        assert!(result.is_err());
        let phases = sink.phases(OperationKind::Register);
        assert_eq!(phases.len(), 2);
        assert_eq!(phases[1], (Phase::Failure, "registration failed".to_owned()));
    }

    #[test]
    fn recording_sink_keeps_notices_in_order() {
        let sink = RecordingSink::default();
        sink.notify(Notice::Success, "wallet connected");
        sink.notify(Notice::Info, "wallet disconnected");

        assert_eq!(
            sink.notices(),
            vec![
                (Notice::Success, "wallet connected".to_owned()),
                (Notice::Info, "wallet disconnected".to_owned()),
            ],
        );
    }
}

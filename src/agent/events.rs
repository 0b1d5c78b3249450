//! Narration side-channel.
//!
//! Roles emit [`AgentEvent`]s while they work; a consumer (normally the
//! terminal printer) drains them through an [`EventStream`]. Events never
//! feed back into control flow.

use super::role::Stage;
use tokio::sync::{mpsc, oneshot};

/// Observable progress of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StageStarted { stage: Stage },
    RoleStarted { role: String },
    /// Incremental narration text from the model.
    TextDelta(String),
    ToolCalled { name: String, arguments: String },
    ToolOutput { name: String, output: String },
    /// A stage finished; `output` is its pretty-printed JSON result.
    StageCompleted { stage: Stage, output: String },
    PipelineCompleted,
}

enum Envelope {
    Event(AgentEvent),
    Flush(oneshot::Sender<()>),
}

/// Producer half of the narration channel.
#[derive(Clone, Default)]
pub struct EventSink {
    tx: Option<mpsc::UnboundedSender<Envelope>>,
}

impl EventSink {
    /// A sink that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn emit(&self, event: AgentEvent) {
        if let Some(tx) = &self.tx {
            // A closed consumer only means nobody is watching.
            let _ = tx.send(Envelope::Event(event));
        }
    }

    /// Wait until the consumer has handled every event emitted so far.
    pub async fn flush(&self) {
        let Some(tx) = &self.tx else {
            return;
        };
        let (ack, done) = oneshot::channel();
        if tx.send(Envelope::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

/// Consumer half of the narration channel.
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl EventStream {
    /// Next event, or None once every sink has been dropped.
    ///
    /// Pending flushes are acknowledged when reached, i.e. after the caller
    /// has handled all earlier events.
    pub async fn next(&mut self) -> Option<AgentEvent> {
        loop {
            match self.rx.recv().await? {
                Envelope::Event(event) => return Some(event),
                Envelope::Flush(ack) => {
                    let _ = ack.send(());
                }
            }
        }
    }

    /// Drain every remaining event until all sinks are dropped.
    pub async fn collect(mut self) -> Vec<AgentEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}

/// Create a connected sink/stream pair.
pub fn event_channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx: Some(tx) }, EventStream { rx })
}

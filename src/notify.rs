//! Outbound notification hook, decoupled from the transaction boundary
//!
//! The workflow service hands every committed transition to a dispatcher
//! backed by a bounded channel and a worker thread. Delivery runs entirely
//! off the transition path: a full queue or a failing transport is logged
//! and dropped, never surfaced to the caller, and never rolls a committed
//! transition back.

use crate::document::{Action, Document};
use std::sync::Arc;
use std::thread::JoinHandle;

const QUEUE_DEPTH: usize = 256;

/// One committed transition, as seen by the notification subsystem.
#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub document: Document,
    pub action: Action,
    pub actor_id: String,
    pub comments: String,
}

/// Transport boundary. Implementations deliver by mail, webhook, or
/// whatever the deployment wires in; errors are logged by the dispatcher.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &NotificationEvent) -> anyhow::Result<()>;
}

/// Default transport: writes the event to the log and nothing else.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &NotificationEvent) -> anyhow::Result<()> {
        log::info!(
            "{} {}: '{}' by {}, now '{}'",
            event.document.kind,
            event.document.number.as_deref().unwrap_or("DRAFT"),
            event.action,
            event.actor_id,
            event.document.status,
        );
        Ok(())
    }
}

pub struct NotificationDispatcher {
    tx: Option<crossbeam_channel::Sender<NotificationEvent>>,
    worker: Option<JoinHandle<()>>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<NotificationEvent>(QUEUE_DEPTH);
        let worker = std::thread::spawn(move || {
            for event in rx.iter() {
                if let Err(err) = notifier.notify(&event) {
                    log::warn!(
                        "notification delivery failed for document {}: {err}",
                        event.document.id
                    );
                }
            }
        });

        Self {
            tx: Some(tx),
            worker: Some(worker),
        }
    }

    /// Queue an event without blocking. A full or closed queue drops the
    /// event with a warning.
    pub fn dispatch(&self, event: NotificationEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        if let Err(err) = tx.try_send(event) {
            log::warn!("notification queue unavailable, dropping event: {err}");
        }
    }
}

impl Drop for NotificationDispatcher {
    fn drop(&mut self) {
        // disconnect the channel so the worker drains what is queued and exits
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

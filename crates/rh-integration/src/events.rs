//! Session notifications
//!
//! Every observer gets its own bounded crossbeam channel, so each one sees
//! every event. A new observer first receives the most recent event.
//! Publishing never blocks the stepping thread: an observer that stops
//! draining loses newer events once its channel is full, and observers that
//! dropped their receiver are forgotten on the next publish.

use crate::session::SessionState;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};

const EVENT_CAPACITY: usize = 256;

/// Something observable happened to a session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    SurfaceCreated {
        generation: u32,
    },
    SurfaceChanged {
        width: u32,
        height: u32,
    },
    FrameRendered {
        frame: u64,
        presented: bool,
    },
    Faulted(String),
}

pub(crate) struct EventBus {
    subscribers: Vec<Sender<SessionEvent>>,
    latest: Option<SessionEvent>,
    dropped: u64,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            latest: None,
            dropped: 0,
        }
    }

    pub(crate) fn publish(&mut self, event: SessionEvent) {
        let mut dropped = 0;
        self.subscribers
            .retain(|sender| match sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(_)) => {
                    dropped += 1;
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });

        if dropped > 0 {
            self.dropped += dropped;
            tracing::trace!("Session event queue full, {} events dropped", self.dropped);
        }
        self.latest = Some(event);
    }

    pub(crate) fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (sender, receiver) = channel::bounded(EVENT_CAPACITY);
        if let Some(latest) = &self.latest {
            let _ = sender.try_send(latest.clone());
        }
        self.subscribers.push(sender);
        receiver
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

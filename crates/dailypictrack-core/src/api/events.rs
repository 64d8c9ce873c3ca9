use tokio::sync::broadcast;
use tracing::debug;

use super::client::LOGIN_PATH;
use crate::navigation::Route;

/// Buffered session events per subscriber before the slowest one lags
const SESSION_EVENT_CAPACITY: usize = 16;

/// Signals the API client raises for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The server answered 401. The stored credential has already been
    /// evicted; the front end should move to `redirect_to`.
    Invalidated { path: String, redirect_to: Route },
}

impl SessionEvent {
    /// True when a previously valid session was rejected. A 401 from the
    /// login exchange itself only means the credentials were wrong.
    pub fn ended_session(&self) -> bool {
        match self {
            SessionEvent::Invalidated { path, .. } => path != LOGIN_PATH,
        }
    }
}

/// Fan-out of session events to any number of subscribers.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SessionEvent) {
        // No subscribers is fine: nobody is showing a view.
        if self.tx.send(event).is_err() {
            debug!("Session event published with no subscribers");
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

use std::fmt;
use tokio::sync::broadcast::{self, Receiver, Sender};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Error(String),
    Warning(String),
    Success(String),
    Info(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Error(message)
            | Notification::Warning(message)
            | Notification::Success(message)
            | Notification::Info(message) => message,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Notification::Error(message) => write!(f, "error: {message}"),
            Notification::Warning(message) => write!(f, "warning: {message}"),
            Notification::Success(message) => write!(f, "{message}"),
            Notification::Info(message) => write!(f, "{message}"),
        }
    }
}

#[derive(Debug)]
pub struct NotificationBroadcast {
    tx: Sender<Notification>,
    rx: Receiver<Notification>,
}

impl NotificationBroadcast {
    pub fn new() -> Self {
        let (tx, rx) = broadcast::channel(20);
        Self { tx, rx }
    }

    pub fn subscribe(&self) -> Receiver<Notification> {
        self.rx.resubscribe()
    }

    /// Never fails: the broadcast keeps its own receiver alive.
    pub fn send_message(&self, message: Notification) {
        match &message {
            Notification::Error(text) => tracing::error!("{text}"),
            Notification::Warning(text) => tracing::warn!("{text}"),
            Notification::Success(text) | Notification::Info(text) => tracing::info!("{text}"),
        }

        _ = self.tx.send(message);
    }
}

impl Default for NotificationBroadcast {
    fn default() -> Self {
        Self::new()
    }
}

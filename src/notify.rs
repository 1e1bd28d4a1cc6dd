//! Fire-and-forget user notices (the console's toast channel).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn success<S: Into<String>>(msg: S) -> Self { Self { level: NoticeLevel::Success, message: msg.into(), at: Utc::now() } }
    pub fn error<S: Into<String>>(msg: S) -> Self { Self { level: NoticeLevel::Error, message: msg.into(), at: Utc::now() } }
}

/// Implementations must not block and must swallow their own failures.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

pub type SharedSink = Arc<dyn NotificationSink>;

/// Routes notices into the tracing pipeline.
#[derive(Debug, Default, Clone)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(target: "mmms::notice", "{}", notice.message),
            NoticeLevel::Error => warn!(target: "mmms::notice", "{}", notice.message),
        }
    }
}

/// Keeps notices in memory until drained.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    inner: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingSink {
    pub fn new() -> Self { Self::default() }

    pub fn drain(&self) -> Vec<Notice> { std::mem::take(&mut *self.inner.lock()) }

    pub fn messages(&self) -> Vec<String> { self.inner.lock().iter().map(|n| n.message.clone()).collect() }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notice: Notice) {
        self.inner.lock().push(notice);
    }
}

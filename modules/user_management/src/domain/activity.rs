//! Activity log: records user-related actions and answers queries over them.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::contract::model::{LogEntry, LogEvent, LogFilter, Severity, User, UserId};
use crate::domain::ports::LogSink;

/// Logger name used for events emitted by the user handlers.
pub const USERS_LOGGER: &str = "users";

/// Everything the log browser needs, derived from a single snapshot.
#[derive(Debug, Clone, Default)]
pub struct LogView {
    pub entries: Vec<LogEntry>,
    pub users: Vec<User>,
    pub severities: Vec<Severity>,
}

#[derive(Clone)]
pub struct ActivityLogService {
    sink: Arc<dyn LogSink>,
}

impl ActivityLogService {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    /// Append an event stamped with the current time. `user` is copied into the event.
    pub fn record(
        &self,
        severity: Severity,
        message: impl Into<String>,
        user: Option<&User>,
    ) -> LogEvent {
        let event = LogEvent {
            timestamp: Utc::now(),
            severity,
            logger: USERS_LOGGER.to_string(),
            message: message.into(),
            associated_user: user.cloned(),
        };
        mirror(&event);
        self.sink.append(event.clone());
        event
    }

    pub fn get_full_log(&self) -> Vec<LogEvent> {
        self.sink.snapshot()
    }

    pub fn get_user_log(&self, user_id: UserId) -> Vec<LogEvent> {
        self.sink
            .snapshot()
            .into_iter()
            .filter(|e| e.user_id() == Some(user_id))
            .collect()
    }

    pub fn get_entry(&self, index: usize) -> Option<LogEvent> {
        self.sink.get(index)
    }

    pub fn distinct_severities(&self) -> Vec<Severity> {
        distinct_severities(&self.sink.snapshot())
    }

    pub fn distinct_users(&self) -> Vec<User> {
        distinct_users(&self.sink.snapshot())
    }

    pub fn filter(&self, filter: &LogFilter) -> Vec<LogEntry> {
        apply_filter(&self.sink.snapshot(), filter)
    }

    /// Filtered entries plus dropdown options, all taken from the same snapshot.
    pub fn browse(&self, filter: &LogFilter) -> LogView {
        let events = self.sink.snapshot();
        let view = LogView {
            entries: apply_filter(&events, filter),
            users: distinct_users(&events),
            severities: distinct_severities(&events),
        };
        debug!(
            total = events.len(),
            matched = view.entries.len(),
            "Activity log browsed"
        );
        view
    }
}

fn mirror(event: &LogEvent) {
    let user_id = event.user_id();
    let logger = event.logger.as_str();
    let msg = event.message.as_str();
    match event.severity {
        Severity::Debug => debug!(logger, ?user_id, "{msg}"),
        Severity::Info => info!(logger, ?user_id, "{msg}"),
        Severity::Warn => warn!(logger, ?user_id, "{msg}"),
        Severity::Error | Severity::Fatal => error!(logger, ?user_id, severity = %event.severity, "{msg}"),
    }
}

pub fn distinct_severities(events: &[LogEvent]) -> Vec<Severity> {
    let mut seen = HashSet::new();
    events
        .iter()
        .map(|e| e.severity)
        .filter(|s| seen.insert(*s))
        .collect()
}

pub fn distinct_users(events: &[LogEvent]) -> Vec<User> {
    let mut seen = HashSet::new();
    events
        .iter()
        .filter_map(|e| e.associated_user.as_ref())
        .filter(|u| seen.insert(u.id))
        .cloned()
        .collect()
}

/// Apply `filter` to a snapshot. Entries keep their index into `events`.
pub fn apply_filter(events: &[LogEvent], filter: &LogFilter) -> Vec<LogEntry> {
    let by_position = match filter.severity_id {
        Some(pos) => match distinct_severities(events).get(pos) {
            Some(s) => Some(*s),
            // out-of-range index matches nothing
            None => return Vec::new(),
        },
        None => None,
    };

    events
        .iter()
        .enumerate()
        .filter(|(_, e)| filter.user_id.is_none_or(|id| e.user_id() == Some(id)))
        .filter(|(_, e)| filter.date_from.is_none_or(|from| e.timestamp > from))
        .filter(|(_, e)| filter.date_to.is_none_or(|to| e.timestamp < to))
        .filter(|(_, e)| by_position.is_none_or(|s| e.severity == s))
        .filter(|(_, e)| filter.severity.is_none_or(|s| e.severity == s))
        .map(|(index, e)| LogEntry {
            index,
            event: e.clone(),
        })
        .collect()
}

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};

pub type UserId = i64;

/// Pure user model for inter-module communication (no serde/schemas)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub forename: String,
    pub surname: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.forename, self.surname)
    }
}

/// Data for creating a new user; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub forename: String,
    pub surname: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
}

impl NewUser {
    pub fn with_id(self, id: UserId) -> User {
        User {
            id,
            forename: self.forename,
            surname: self.surname,
            email: self.email,
            date_of_birth: self.date_of_birth,
            is_active: self.is_active,
        }
    }
}

/// Severity of an activity log event, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown severity '{0}'")]
pub struct UnknownSeverity(pub String);

impl FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Severity::Debug),
            "INFO" => Ok(Severity::Info),
            "WARN" | "WARNING" => Ok(Severity::Warn),
            "ERROR" => Ok(Severity::Error),
            "FATAL" => Ok(Severity::Fatal),
            _ => Err(UnknownSeverity(s.to_string())),
        }
    }
}

/// One recorded action. The associated user is a snapshot taken when the
/// event was recorded, not a live reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub timestamp: DateTime<Utc>,
    pub severity: Severity,
    pub logger: String,
    pub message: String,
    pub associated_user: Option<User>,
}

impl LogEvent {
    pub fn user_id(&self) -> Option<UserId> {
        self.associated_user.as_ref().map(|u| u.id)
    }
}

/// An event together with its position in the full log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub index: usize,
    pub event: LogEvent,
}

/// Conjunctive log filter; `None` fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Keep events strictly after this instant.
    pub date_from: Option<DateTime<Utc>>,
    /// Keep events strictly before this instant.
    pub date_to: Option<DateTime<Utc>>,
    pub user_id: Option<UserId>,
    /// Position in the list of distinct severities of the full log, in first-seen order.
    pub severity_id: Option<usize>,
    pub severity: Option<Severity>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Debug < Severity::Info);
        assert!(Severity::Info < Severity::Warn);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("info".parse::<Severity>(), Ok(Severity::Info));
        assert_eq!("Warning".parse::<Severity>(), Ok(Severity::Warn));
        assert_eq!(" FATAL ".parse::<Severity>(), Ok(Severity::Fatal));
        assert!("loud".parse::<Severity>().is_err());
    }

    #[test]
    fn severity_display_matches_parse() {
        for s in [
            Severity::Debug,
            Severity::Info,
            Severity::Warn,
            Severity::Error,
            Severity::Fatal,
        ] {
            assert_eq!(s.to_string().parse::<Severity>(), Ok(s));
        }
    }

    #[test]
    fn new_user_with_id_keeps_fields() {
        let u = NewUser {
            forename: "Peter".into(),
            surname: "Loew".into(),
            email: "ploew@example.com".into(),
            date_of_birth: NaiveDate::from_ymd_opt(1991, 3, 14),
            is_active: true,
        }
        .with_id(1);
        assert_eq!(u.id, 1);
        assert_eq!(u.full_name(), "Peter Loew");
    }
}

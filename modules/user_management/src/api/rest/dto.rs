use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::contract::model::{LogEntry, LogFilter, NewUser, Severity, User, UserId};
use crate::domain::activity::LogView;
use crate::domain::error::FieldViolation;

/// Wire format of `dateOfBirth`.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// REST DTO for user representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: UserId,
    pub forename: String,
    pub surname: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserListViewModel {
    pub items: Vec<UserDto>,
}

/// Create/edit form state. `id` is absent on the create form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserFormViewModel {
    pub id: Option<UserId>,
    pub forename: String,
    pub surname: String,
    pub email: String,
    pub date_of_birth: Option<NaiveDate>,
    pub is_active: bool,
}

/// Submitted create/edit form. Missing text fields arrive empty and fail validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct UserForm {
    pub forename: String,
    pub surname: String,
    pub email: String,
    /// `YYYY-MM-DD`; blank means not given. Parsed by the conversions below.
    #[schema(value_type = Option<String>, format = Date, example = "1991-03-14")]
    pub date_of_birth: Option<String>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogEntryDto {
    /// Position in the full activity log; usable with `GET /logs/{id}`.
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub severity: String,
    pub logger: String,
    pub message: String,
    pub user: Option<UserDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserLogViewModel {
    pub user: UserDto,
    pub user_events: Vec<LogEntryDto>,
}

/// Dropdown entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SelectOption {
    pub value: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogListViewModel {
    pub events: Vec<LogEntryDto>,
    pub user_options: Vec<SelectOption>,
    pub severity_options: Vec<SelectOption>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Keep only users with this active flag
    #[serde(default, deserialize_with = "empty_as_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserIdQuery {
    pub id: UserId,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LogQuery {
    /// Keep events strictly after this instant
    #[serde(default, deserialize_with = "flexible_datetime")]
    #[param(value_type = Option<String>, example = "2024-05-01T12:00")]
    pub date_from: Option<DateTime<Utc>>,
    /// Keep events strictly before this instant
    #[serde(default, deserialize_with = "flexible_datetime")]
    #[param(value_type = Option<String>, example = "2024-05-02")]
    pub date_to: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub user_id: Option<UserId>,
    /// Position in `severityOptions`
    #[serde(default, deserialize_with = "empty_as_none")]
    pub severity_id: Option<usize>,
    /// Severity name, e.g. `INFO`
    #[serde(default, deserialize_with = "empty_as_none")]
    #[param(value_type = Option<String>, example = "ERROR")]
    pub severity: Option<Severity>,
}

// Conversion implementations between REST DTOs and contract models

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            forename: user.forename,
            surname: user.surname,
            email: user.email,
            date_of_birth: user.date_of_birth,
            is_active: user.is_active,
        }
    }
}

impl From<User> for UserFormViewModel {
    fn from(user: User) -> Self {
        Self {
            id: Some(user.id),
            forename: user.forename,
            surname: user.surname,
            email: user.email,
            date_of_birth: user.date_of_birth,
            is_active: user.is_active,
        }
    }
}

impl UserForm {
    pub fn parse_date_of_birth(&self) -> Result<Option<NaiveDate>, FieldViolation> {
        match self.date_of_birth.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map(Some)
                .map_err(|_| {
                    FieldViolation::new(
                        "dateOfBirth",
                        format!("'{raw}' is not a valid date (expected YYYY-MM-DD)"),
                    )
                }),
        }
    }

    /// New users always start active.
    pub fn to_new_user(&self) -> Result<NewUser, FieldViolation> {
        Ok(NewUser {
            forename: self.forename.clone(),
            surname: self.surname.clone(),
            email: self.email.clone(),
            date_of_birth: self.parse_date_of_birth()?,
            is_active: true,
        })
    }

    pub fn to_user(&self, id: UserId) -> Result<User, FieldViolation> {
        Ok(User {
            id,
            forename: self.forename.clone(),
            surname: self.surname.clone(),
            email: self.email.clone(),
            date_of_birth: self.parse_date_of_birth()?,
            is_active: self.is_active,
        })
    }
}

impl From<LogEntry> for LogEntryDto {
    fn from(entry: LogEntry) -> Self {
        let e = entry.event;
        Self {
            index: entry.index,
            timestamp: e.timestamp,
            severity: e.severity.to_string(),
            logger: e.logger,
            message: e.message,
            user: e.associated_user.map(UserDto::from),
        }
    }
}

impl From<LogView> for LogListViewModel {
    fn from(view: LogView) -> Self {
        Self {
            events: view.entries.into_iter().map(LogEntryDto::from).collect(),
            user_options: view
                .users
                .iter()
                .map(|u| SelectOption {
                    value: u.id.to_string(),
                    text: u.full_name(),
                })
                .collect(),
            severity_options: view
                .severities
                .iter()
                .enumerate()
                .map(|(pos, s)| SelectOption {
                    value: pos.to_string(),
                    text: s.to_string(),
                })
                .collect(),
        }
    }
}

impl LogQuery {
    pub fn into_filter(self) -> LogFilter {
        LogFilter {
            date_from: self.date_from,
            date_to: self.date_to,
            user_id: self.user_id,
            severity_id: self.severity_id,
            severity: self.severity,
        }
    }
}

// Query/form parsing helpers

/// Treat a missing or blank value as `None`, otherwise parse with `FromStr`.
fn empty_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    match Option::<String>::deserialize(de)? {
        Some(s) if !s.trim().is_empty() => s
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

fn flexible_datetime<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(de)? {
        Some(s) if !s.trim().is_empty() => parse_datetime(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

/// Parse RFC 3339, a zone-less `YYYY-MM-DDTHH:MM[:SS]` (taken as UTC) or a
/// bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_datetime(raw: &str) -> Result<DateTime<Utc>, String> {
    let s = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date/time '{raw}'"))
}

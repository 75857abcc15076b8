use crate::domain::error::ValidationError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(alias = "id")]
    pub subject_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub user_id: String,
    #[serde(default, with = "backend_datetime::option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Subject {
    /// First three letters of the name, upper-cased.
    pub fn abbreviation(&self) -> String {
        self.name.trim().chars().take(3).collect::<String>().to_uppercase()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    #[serde(alias = "id")]
    pub topic_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub subject_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NoteSource {
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "AI-generated")]
    AiGenerated,
    #[serde(rename = "extracted from slide")]
    ExtractedFromSlide,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub note_id: String,
    pub content: String,
    pub source: NoteSource,
    pub topic_id: String,
    #[serde(default, with = "backend_datetime::option")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct YouTubeSuggestion {
    pub suggestion_id: String,
    pub title: String,
    pub url: String,
    pub topic_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionState {
    #[serde(rename = "scheduled")]
    Scheduled,
    #[serde(rename = "in progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "missed")]
    Missed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudySession {
    #[serde(alias = "id")]
    pub session_id: String,
    #[serde(with = "backend_datetime")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "backend_datetime")]
    pub end_time: DateTime<Utc>,
    pub topic_id: String,
    pub user_id: String,
    #[serde(default)]
    pub calendar_event: Option<String>,
    #[serde(default = "default_number_sessions")]
    pub number_sessions: u32,
    #[serde(default = "default_session_state")]
    pub state: SessionState,
}

fn default_number_sessions() -> u32 {
    1
}

fn default_session_state() -> SessionState {
    SessionState::Scheduled
}

/// Profile kept in client storage after login. Backend OAuth tokens are not
/// part of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub google_calendar_connected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    /// Topic id.
    pub id: String,
    pub subject_abbr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    pub topic_name: String,
    pub subject_id: String,
}

impl HistoryItem {
    pub fn from_topic(subject: &Subject, topic: Topic) -> Self {
        Self {
            id: topic.topic_id,
            subject_abbr: subject.abbreviation(),
            subject_name: Some(subject.name.clone()),
            topic_name: topic.title,
            subject_id: subject.subject_id.clone(),
        }
    }
}

pub fn validate_non_empty(value: &str, field_name: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field_name));
    }
    Ok(())
}

/// Backend timestamps arrive either as RFC 3339 or as naive ISO 8601 (UTC).
pub mod backend_datetime {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        let value = value.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub mod option {
        use super::*;

        pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match value {
                Some(value) => serializer.serialize_some(&value.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                Some(raw) => parse(&raw).map(Some).ok_or_else(|| {
                    serde::de::Error::custom(format!("invalid timestamp '{raw}'"))
                }),
                None => Ok(None),
            }
        }
    }
}

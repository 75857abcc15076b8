use crate::domain::error::ValidationError;
use crate::domain::models::{
    Note, NoteSource, SessionState, StudySession, Subject, Topic, UserProfile, YouTubeSuggestion,
};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthCallback {
    pub user_id: String,
    pub profile: UserProfile,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewTopic {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub subject_id: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub content: String,
    pub source: NoteSource,
    pub topic_id: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<NoteSource>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GenerateContentRequest {
    pub prompt: String,
    pub topic_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GeneratedContent {
    pub response: String,
    #[serde(default)]
    pub model_used: Option<String>,
}

/// Session creation payload. Timestamps are ISO 8601 strings with the
/// configured zone's offset.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewStudySession {
    pub start_time: String,
    pub end_time: String,
    pub topic_id: String,
    pub user_id: String,
    pub number_sessions: u32,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<SessionState>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarEventRequest {
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub timezone: String,
}

#[async_trait]
pub trait OAuthGateway: Send + Sync {
    async fn login_url(&self) -> Result<String, InfraError>;

    async fn exchange_code(&self, code: &str) -> Result<OAuthCallback, InfraError>;
}

#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>, InfraError>;

    async fn get_subject(&self, subject_id: &str) -> Result<Subject, InfraError>;

    async fn create_subject(&self, subject: &NewSubject) -> Result<Subject, InfraError>;

    async fn delete_subject(&self, subject_id: &str) -> Result<(), InfraError>;

    async fn list_topics(&self, subject_id: &str) -> Result<Vec<Topic>, InfraError>;

    async fn get_topic(&self, topic_id: &str) -> Result<Topic, InfraError>;

    async fn create_topic(&self, topic: &NewTopic) -> Result<Topic, InfraError>;

    async fn delete_topic(&self, topic_id: &str) -> Result<(), InfraError>;
}

#[async_trait]
pub trait StudyContentGateway: Send + Sync {
    async fn list_notes(&self, topic_id: &str) -> Result<Vec<Note>, InfraError>;

    async fn create_note(&self, note: &NewNote) -> Result<Note, InfraError>;

    async fn update_note(&self, note_id: &str, update: &NoteUpdate) -> Result<Note, InfraError>;

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GeneratedContent, InfraError>;

    async fn suggest_video(&self, topic_id: &str) -> Result<YouTubeSuggestion, InfraError>;

    async fn list_video_suggestions(
        &self,
        topic_id: &str,
    ) -> Result<Vec<YouTubeSuggestion>, InfraError>;
}

#[async_trait]
pub trait StudySessionGateway: Send + Sync {
    async fn create_session(&self, session: &NewStudySession) -> Result<StudySession, InfraError>;

    async fn update_session(
        &self,
        session_id: &str,
        update: &StudySessionUpdate,
    ) -> Result<StudySession, InfraError>;

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<StudySession>, InfraError>;

    /// `Ok(None)` when the user has no calendar credential on file.
    async fn calendar_access_token(&self, user_id: &str) -> Result<Option<String>, InfraError>;

    /// Returns the external calendar event id.
    async fn create_calendar_event(
        &self,
        access_token: &str,
        event: &CalendarEventRequest,
    ) -> Result<String, InfraError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestBrainBuddyApi {
    client: Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
struct LoginUrlResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OAuthCallbackResponse {
    id: String,
    user: UserProfile,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(default, alias = "accessToken")]
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarEventResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl ReqwestBrainBuddyApi {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    fn ensure_non_empty(value: &str, field: &'static str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(ValidationError::EmptyField(field).into());
        }
        Ok(())
    }

    fn backend_http_error(status: StatusCode, body: &str) -> InfraError {
        if status == StatusCode::UNAUTHORIZED {
            return InfraError::AuthExpired;
        }
        let detail = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .map(|parsed| match parsed.detail {
                serde_json::Value::String(text) => text,
                other => other.to_string(),
            })
            .unwrap_or_else(|| body.trim().to_string());
        let message = if detail.is_empty() {
            "empty response body".to_string()
        } else {
            detail
        };
        InfraError::Api {
            status: status.as_u16(),
            message,
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                InfraError::InvalidConfig("backend base URL cannot be a base".to_string())
            })?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Collection endpoints are addressed with a trailing slash.
    fn collection_endpoint(&self, collection: &str) -> Result<Url, InfraError> {
        self.endpoint(&[collection, ""])
    }

    async fn execute(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<(StatusCode, String), InfraError> {
        let response = request
            .send()
            .await
            .map_err(|error| InfraError::Network(format!("{action} failed: {error}")))?;
        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Network(format!("failed reading {action} response: {error}"))
        })?;
        Ok((status, body))
    }

    async fn send_json<T>(&self, request: RequestBuilder, action: &str) -> Result<T, InfraError>
    where
        T: DeserializeOwned,
    {
        let (status, body) = self.execute(request, action).await?;
        if !status.is_success() {
            return Err(Self::backend_http_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|error| {
            InfraError::InvalidResponse(format!("invalid {action} payload: {error}; body={body}"))
        })
    }

    async fn send_without_body(&self, request: RequestBuilder, action: &str) -> Result<(), InfraError> {
        let (status, body) = self.execute(request, action).await?;
        if !status.is_success() {
            return Err(Self::backend_http_error(status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl OAuthGateway for ReqwestBrainBuddyApi {
    async fn login_url(&self) -> Result<String, InfraError> {
        let endpoint = self.endpoint(&["oauth", "login"])?;
        let parsed: LoginUrlResponse = self
            .send_json(self.client.get(endpoint), "oauth login")
            .await?;
        let url = parsed.url.trim();
        if url.is_empty() {
            return Err(InfraError::InvalidResponse(
                "oauth login response did not include url".to_string(),
            ));
        }
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthCallback, InfraError> {
        Self::ensure_non_empty(code, "authorization code")?;
        let endpoint = self.endpoint(&["oauth", "callback"])?;
        let parsed: OAuthCallbackResponse = self
            .send_json(
                self.client.get(endpoint).query(&[("code", code)]),
                "oauth callback",
            )
            .await?;
        let user_id = parsed.id.trim();
        if user_id.is_empty() {
            return Err(InfraError::InvalidResponse(
                "oauth callback response did not include id".to_string(),
            ));
        }
        Ok(OAuthCallback {
            user_id: user_id.to_string(),
            profile: parsed.user,
        })
    }
}

#[async_trait]
impl CatalogGateway for ReqwestBrainBuddyApi {
    async fn list_subjects(&self, user_id: &str) -> Result<Vec<Subject>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        let endpoint = self.endpoint(&["subjects", "user", user_id])?;
        self.send_json(self.client.get(endpoint), "list subjects").await
    }

    async fn get_subject(&self, subject_id: &str) -> Result<Subject, InfraError> {
        Self::ensure_non_empty(subject_id, "subject id")?;
        let endpoint = self.endpoint(&["subjects", subject_id])?;
        self.send_json(self.client.get(endpoint), "get subject").await
    }

    async fn create_subject(&self, subject: &NewSubject) -> Result<Subject, InfraError> {
        let endpoint = self.collection_endpoint("subjects")?;
        self.send_json(self.client.post(endpoint).json(subject), "create subject")
            .await
    }

    async fn delete_subject(&self, subject_id: &str) -> Result<(), InfraError> {
        Self::ensure_non_empty(subject_id, "subject id")?;
        let endpoint = self.endpoint(&["subjects", subject_id])?;
        self.send_without_body(self.client.delete(endpoint), "delete subject")
            .await
    }

    async fn list_topics(&self, subject_id: &str) -> Result<Vec<Topic>, InfraError> {
        Self::ensure_non_empty(subject_id, "subject id")?;
        let endpoint = self.endpoint(&["topics", "subject", subject_id])?;
        self.send_json(self.client.get(endpoint), "list topics").await
    }

    async fn get_topic(&self, topic_id: &str) -> Result<Topic, InfraError> {
        Self::ensure_non_empty(topic_id, "topic id")?;
        let endpoint = self.endpoint(&["topics", topic_id])?;
        self.send_json(self.client.get(endpoint), "get topic").await
    }

    async fn create_topic(&self, topic: &NewTopic) -> Result<Topic, InfraError> {
        let endpoint = self.collection_endpoint("topics")?;
        self.send_json(self.client.post(endpoint).json(topic), "create topic")
            .await
    }

    async fn delete_topic(&self, topic_id: &str) -> Result<(), InfraError> {
        Self::ensure_non_empty(topic_id, "topic id")?;
        let endpoint = self.endpoint(&["topics", topic_id])?;
        self.send_without_body(self.client.delete(endpoint), "delete topic")
            .await
    }
}

#[async_trait]
impl StudyContentGateway for ReqwestBrainBuddyApi {
    async fn list_notes(&self, topic_id: &str) -> Result<Vec<Note>, InfraError> {
        Self::ensure_non_empty(topic_id, "topic id")?;
        let endpoint = self.endpoint(&["notes", "topic", topic_id])?;
        self.send_json(self.client.get(endpoint), "list notes").await
    }

    async fn create_note(&self, note: &NewNote) -> Result<Note, InfraError> {
        let endpoint = self.collection_endpoint("notes")?;
        self.send_json(self.client.post(endpoint).json(note), "create note")
            .await
    }

    async fn update_note(&self, note_id: &str, update: &NoteUpdate) -> Result<Note, InfraError> {
        Self::ensure_non_empty(note_id, "note id")?;
        let endpoint = self.endpoint(&["notes", note_id])?;
        self.send_json(self.client.put(endpoint).json(update), "update note")
            .await
    }

    async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GeneratedContent, InfraError> {
        let endpoint = self.endpoint(&["gemini", "generate"])?;
        self.send_json(self.client.post(endpoint).json(request), "generate content")
            .await
    }

    async fn suggest_video(&self, topic_id: &str) -> Result<YouTubeSuggestion, InfraError> {
        Self::ensure_non_empty(topic_id, "topic id")?;
        let endpoint = self.endpoint(&["youtube-suggestions", "suggest"])?;
        self.send_json(
            self.client.get(endpoint).query(&[("topicId", topic_id)]),
            "suggest video",
        )
        .await
    }

    async fn list_video_suggestions(
        &self,
        topic_id: &str,
    ) -> Result<Vec<YouTubeSuggestion>, InfraError> {
        Self::ensure_non_empty(topic_id, "topic id")?;
        let endpoint = self.endpoint(&["youtube-suggestions", "topic", topic_id])?;
        self.send_json(self.client.get(endpoint), "list video suggestions")
            .await
    }
}

#[async_trait]
impl StudySessionGateway for ReqwestBrainBuddyApi {
    async fn create_session(&self, session: &NewStudySession) -> Result<StudySession, InfraError> {
        let endpoint = self.collection_endpoint("study-sessions")?;
        self.send_json(self.client.post(endpoint).json(session), "create study session")
            .await
    }

    async fn update_session(
        &self,
        session_id: &str,
        update: &StudySessionUpdate,
    ) -> Result<StudySession, InfraError> {
        Self::ensure_non_empty(session_id, "study session id")?;
        let endpoint = self.endpoint(&["study-sessions", session_id])?;
        self.send_json(self.client.put(endpoint).json(update), "update study session")
            .await
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<StudySession>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        let endpoint = self.endpoint(&["study-sessions", "user", user_id])?;
        self.send_json(self.client.get(endpoint), "list study sessions")
            .await
    }

    async fn calendar_access_token(&self, user_id: &str) -> Result<Option<String>, InfraError> {
        Self::ensure_non_empty(user_id, "user id")?;
        let endpoint = self.endpoint(&["users", user_id, "access-token"])?;
        let (status, body) = self
            .execute(self.client.get(endpoint), "fetch calendar access token")
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Self::backend_http_error(status, &body));
        }
        let parsed: AccessTokenResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::InvalidResponse(format!("invalid access token payload: {error}"))
        })?;
        Ok(parsed
            .access_token
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty()))
    }

    async fn create_calendar_event(
        &self,
        access_token: &str,
        event: &CalendarEventRequest,
    ) -> Result<String, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        let endpoint = self.endpoint(&["calendar", "events"])?;
        let parsed: CalendarEventResponse = self
            .send_json(
                self.client
                    .post(endpoint)
                    .query(&[("access_token", access_token)])
                    .json(event),
                "create calendar event",
            )
            .await?;
        parsed
            .id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                InfraError::InvalidResponse("calendar event response did not include id".to_string())
            })
    }
}

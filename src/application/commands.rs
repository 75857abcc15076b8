use crate::application::bootstrap::bootstrap_workspace_with_lookup;
use crate::application::history::{group_history, study_history, HistoryGroup};
use crate::application::scheduling::{ScheduleRequest, StudySessionScheduler, SubmissionReport};
use crate::application::session::{AuthState, LoginFlow, LoginOutcome, LoginStart, SessionContext};
use crate::application::topic_content::{self, TopicDetail};
use crate::domain::error::ValidationError;
use crate::domain::models::{
    validate_non_empty, Note, SessionState, StudySession, Subject, Topic, YouTubeSuggestion,
};
use crate::domain::recurrence::weekday_index;
use crate::infrastructure::backend_client::{
    CatalogGateway, NewSubject, NewTopic, ReqwestBrainBuddyApi, StudySessionGateway,
    StudySessionUpdate,
};
use crate::infrastructure::client_storage::SqliteClientStorage;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::logging::init_logging;
use chrono::{DateTime, Utc, Weekday};
use chrono_tz::Tz;
use futures::TryStreamExt;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Workspace locations and effective settings resolved at startup.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    pub workspace_root: PathBuf,
    pub config_dir: PathBuf,
    pub database_path: PathBuf,
    pub api_base_url: String,
    pub timezone: String,
}

pub struct AppState {
    workspace: WorkspaceInfo,
    time_zone: Tz,
    api: Arc<ReqwestBrainBuddyApi>,
    session: SessionContext,
    scheduler: StudySessionScheduler<ReqwestBrainBuddyApi>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        Self::new_with_lookup(workspace_root, |key| std::env::var(key).ok())
    }

    pub fn new_with_lookup<F>(workspace_root: PathBuf, lookup: F) -> Result<Self, InfraError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bootstrap = bootstrap_workspace_with_lookup(&workspace_root, lookup)?;
        init_logging(&bootstrap.logs_dir)?;

        let config = bootstrap.config;
        let time_zone = config.time_zone()?;
        let api_base_url = config.api_base_url()?;
        let workspace = WorkspaceInfo {
            workspace_root,
            config_dir: bootstrap.config_dir,
            database_path: bootstrap.database_path.clone(),
            api_base_url: api_base_url.to_string(),
            timezone: time_zone.name().to_string(),
        };
        let api = Arc::new(ReqwestBrainBuddyApi::new(api_base_url));
        let session = SessionContext::new(Arc::new(SqliteClientStorage::new(
            &bootstrap.database_path,
        )));
        let scheduler = StudySessionScheduler::new(Arc::clone(&api), time_zone)
            .with_calendar_mirroring(config.calendar_mirroring)
            .with_summary_prefix(config.session_summary_prefix.clone());

        Ok(Self {
            workspace,
            time_zone,
            api,
            session,
            scheduler,
        })
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        info!(command, "{message}");
    }

    pub fn log_error(&self, command: &str, message: &str) {
        error!(command, "{message}");
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDetail {
    pub subject: Subject,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StudySessionCard {
    pub session_id: String,
    pub topic_id: String,
    pub date: String,
    pub weekday: String,
    pub time_range: String,
    pub state: SessionState,
    pub calendar_event: Option<String>,
}

impl StudySessionCard {
    fn from_session(session: StudySession, time_zone: Tz) -> Self {
        let start = session.start_time.with_timezone(&time_zone);
        let end = session.end_time.with_timezone(&time_zone);
        Self {
            session_id: session.session_id,
            topic_id: session.topic_id,
            date: start.format("%Y-%m-%d").to_string(),
            weekday: start.format("%a").to_string(),
            time_range: format!("{} - {}", start.format("%H:%M"), end.format("%H:%M")),
            state: session.state,
            calendar_event: session.calendar_event,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleSessionsInput {
    pub topic_id: String,
    pub weekdays: Vec<String>,
    pub start_time: String,
    pub end_time: String,
    pub repeat_weeks: u32,
}

pub fn workspace_info_impl(state: &AppState) -> WorkspaceInfo {
    state.workspace.clone()
}

pub async fn begin_login_impl(state: &AppState) -> Result<LoginStart, InfraError> {
    let flow = LoginFlow::new(Arc::clone(&state.api), state.session.clone());
    let start = flow.begin().await?;
    state.log_info("login", "login flow started");
    Ok(start)
}

pub async fn complete_login_impl(
    state: &AppState,
    code: Option<String>,
    provider_error: Option<String>,
) -> Result<LoginOutcome, InfraError> {
    let flow = LoginFlow::new(Arc::clone(&state.api), state.session.clone());
    flow.complete(code.as_deref(), provider_error.as_deref())
        .await
}

pub fn logout_impl(state: &AppState) -> Result<bool, InfraError> {
    let was_authenticated = matches!(
        state.session.check_authentication()?,
        AuthState::Authenticated(_)
    );
    state.session.sign_out()?;
    state.log_info("logout", "client session cleared");
    Ok(was_authenticated)
}

pub fn auth_status_impl(state: &AppState) -> Result<AuthState, InfraError> {
    state.session.check_authentication()
}

pub async fn list_subjects_impl(state: &AppState) -> Result<Vec<Subject>, InfraError> {
    let user = state.session.require_user()?;
    state.api.list_subjects(&user.user_id).await
}

pub async fn create_subject_impl(
    state: &AppState,
    name: String,
    description: Option<String>,
) -> Result<Subject, InfraError> {
    let user = state.session.require_user()?;
    validate_non_empty(&name, "subject.name")?;
    let subject = state
        .api
        .create_subject(&NewSubject {
            name: name.trim().to_string(),
            description: normalize_optional(description),
            user_id: user.user_id,
        })
        .await?;
    state.log_info(
        "create_subject",
        &format!("created subject_id={}", subject.subject_id),
    );
    Ok(subject)
}

pub async fn delete_subject_impl(state: &AppState, subject_id: String) -> Result<bool, InfraError> {
    state.session.require_user()?;
    validate_non_empty(&subject_id, "subject_id")?;
    state.api.delete_subject(subject_id.trim()).await?;
    state.log_info("delete_subject", &format!("deleted subject_id={subject_id}"));
    Ok(true)
}

pub async fn subject_detail_impl(
    state: &AppState,
    subject_id: String,
) -> Result<SubjectDetail, InfraError> {
    state.session.require_user()?;
    validate_non_empty(&subject_id, "subject_id")?;
    let subject = state.api.get_subject(subject_id.trim()).await?;
    let topics = state.api.list_topics(&subject.subject_id).await?;
    Ok(SubjectDetail { subject, topics })
}

pub async fn create_topic_impl(
    state: &AppState,
    subject_id: String,
    title: String,
    description: Option<String>,
) -> Result<Topic, InfraError> {
    state.session.require_user()?;
    validate_non_empty(&subject_id, "topic.subject_id")?;
    validate_non_empty(&title, "topic.title")?;
    let topic = state
        .api
        .create_topic(&NewTopic {
            title: title.trim().to_string(),
            description: normalize_optional(description),
            subject_id: subject_id.trim().to_string(),
        })
        .await?;
    state.log_info("create_topic", &format!("created topic_id={}", topic.topic_id));
    Ok(topic)
}

pub async fn delete_topic_impl(state: &AppState, topic_id: String) -> Result<bool, InfraError> {
    state.session.require_user()?;
    validate_non_empty(&topic_id, "topic_id")?;
    state.api.delete_topic(topic_id.trim()).await?;
    state.log_info("delete_topic", &format!("deleted topic_id={topic_id}"));
    Ok(true)
}

pub async fn topic_detail_impl(state: &AppState, topic_id: String) -> Result<TopicDetail, InfraError> {
    state.session.require_user()?;
    validate_non_empty(&topic_id, "topic_id")?;
    topic_content::topic_detail(state.api.as_ref(), state.api.as_ref(), topic_id.trim()).await
}

pub async fn generate_topic_content_impl(
    state: &AppState,
    topic_id: String,
) -> Result<Note, InfraError> {
    state.session.require_user()?;
    validate_non_empty(&topic_id, "topic_id")?;
    let note = topic_content::generate_topic_content(
        state.api.as_ref(),
        state.api.as_ref(),
        topic_id.trim(),
    )
    .await?;
    state.log_info(
        "generate_topic_content",
        &format!("stored note_id={} for topic_id={topic_id}", note.note_id),
    );
    Ok(note)
}

pub async fn add_note_impl(
    state: &AppState,
    topic_id: String,
    content: String,
) -> Result<Note, InfraError> {
    state.session.require_user()?;
    topic_content::add_note(state.api.as_ref(), topic_id.trim(), &content).await
}

pub async fn edit_note_impl(
    state: &AppState,
    note_id: String,
    content: String,
) -> Result<Note, InfraError> {
    state.session.require_user()?;
    let note = topic_content::edit_note(state.api.as_ref(), note_id.trim(), &content).await?;
    state.log_info("edit_note", &format!("updated note_id={}", note.note_id));
    Ok(note)
}

pub async fn suggest_video_impl(
    state: &AppState,
    topic_id: String,
) -> Result<YouTubeSuggestion, InfraError> {
    state.session.require_user()?;
    topic_content::suggest_video(state.api.as_ref(), topic_id.trim()).await
}

pub async fn list_study_sessions_impl(
    state: &AppState,
    upcoming_only: bool,
) -> Result<Vec<StudySessionCard>, InfraError> {
    list_study_sessions_at(state, upcoming_only, Utc::now()).await
}

async fn list_study_sessions_at(
    state: &AppState,
    upcoming_only: bool,
    now: DateTime<Utc>,
) -> Result<Vec<StudySessionCard>, InfraError> {
    let user = state.session.require_user()?;
    let mut sessions = state.api.list_sessions(&user.user_id).await?;
    if upcoming_only {
        sessions.retain(|session| session.start_time >= now);
    }
    sessions.sort_by_key(|session| session.start_time);
    Ok(sessions
        .into_iter()
        .map(|session| StudySessionCard::from_session(session, state.time_zone))
        .collect())
}

pub async fn confirm_session_impl(
    state: &AppState,
    session_id: String,
) -> Result<StudySessionCard, InfraError> {
    set_session_state(state, "confirm_session", session_id, SessionState::Completed).await
}

pub async fn cancel_session_impl(
    state: &AppState,
    session_id: String,
) -> Result<StudySessionCard, InfraError> {
    set_session_state(state, "cancel_session", session_id, SessionState::Missed).await
}

async fn set_session_state(
    state: &AppState,
    command: &str,
    session_id: String,
    session_state: SessionState,
) -> Result<StudySessionCard, InfraError> {
    state.session.require_user()?;
    validate_non_empty(&session_id, "session_id")?;
    let updated = state
        .api
        .update_session(
            session_id.trim(),
            &StudySessionUpdate {
                calendar_event: None,
                state: Some(session_state),
            },
        )
        .await?;
    state.log_info(command, &format!("session_id={} updated", updated.session_id));
    Ok(StudySessionCard::from_session(updated, state.time_zone))
}

pub async fn schedule_sessions_impl(
    state: &AppState,
    input: ScheduleSessionsInput,
) -> Result<SubmissionReport, InfraError> {
    let user = state.session.require_user()?;
    validate_non_empty(&input.topic_id, "topic_id")?;
    let weekdays = input
        .weekdays
        .iter()
        .map(|value| parse_weekday_input(value))
        .collect::<Result<Vec<_>, _>>()?;
    let mut request = ScheduleRequest {
        topic_id: input.topic_id.trim().to_string(),
        topic_title: String::new(),
        topic_description: None,
        weekdays,
        start_time: input.start_time,
        end_time: input.end_time,
        repeat_weeks: input.repeat_weeks,
    };
    state.scheduler.check_request(&request)?;

    let topic = state.api.get_topic(&request.topic_id).await?;
    request.topic_id = topic.topic_id;
    request.topic_title = topic.title;
    request.topic_description = topic.description;
    let report = state.scheduler.submit(&user.user_id, &request).await?;
    state.log_info(
        "schedule_sessions",
        &format!(
            "created {} of {} sessions for topic_id={}",
            report.created.len(),
            report.attempted,
            request.topic_id
        ),
    );
    Ok(report)
}

pub async fn study_history_impl(state: &AppState) -> Result<Vec<HistoryGroup>, InfraError> {
    let user = state.session.require_user()?;
    let items = study_history(Arc::clone(&state.api), user.user_id)
        .try_collect::<Vec<_>>()
        .await?;
    Ok(group_history(items))
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Accepts weekday names or Sunday-based indices (`0` = Sunday).
fn parse_weekday_input(value: &str) -> Result<u8, ValidationError> {
    let trimmed = value.trim();
    if let Ok(index) = trimmed.parse::<u32>() {
        return u8::try_from(index)
            .ok()
            .filter(|index| *index <= 6)
            .ok_or(ValidationError::WeekdayOutOfRange(index));
    }
    parse_weekday(trimmed)
        .map(weekday_index)
        .ok_or_else(|| ValidationError::UnknownWeekday(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::scheduling::SubmissionPhase;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "brainbuddy-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self, server: &MockServer, timezone: &str) -> AppState {
            let api_url = format!("{}/api", server.uri());
            let timezone = timezone.to_string();
            AppState::new_with_lookup(self.path.clone(), move |key| match key {
                "BRAINBUDDY_API_URL" => Some(api_url.clone()),
                "BRAINBUDDY_TIMEZONE" => Some(timezone.clone()),
                _ => None,
            })
            .expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn signed_in(state: &AppState) {
        state
            .session()
            .sign_in(
                "user-1",
                &crate::domain::models::UserProfile {
                    name: "Ana".to_string(),
                    email: "ana@example.test".to_string(),
                    google_calendar_connected: false,
                },
            )
            .expect("sign in");
    }

    fn session_json(id: &str, start: &str, end: &str, state: &str) -> serde_json::Value {
        serde_json::json!({
            "sessionId": id,
            "startTime": start,
            "endTime": end,
            "topicId": "top-1",
            "userId": "user-1",
            "numberSessions": 1,
            "state": state
        })
    }

    #[tokio::test]
    async fn workspace_info_reports_startup_settings() {
        let server = MockServer::start().await;
        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "America/Sao_Paulo");

        let info = workspace_info_impl(&state);
        assert_eq!(info.workspace_root, workspace.path);
        assert_eq!(info.config_dir, workspace.path.join("config"));
        assert!(info.database_path.exists());
        assert_eq!(info.api_base_url, format!("{}/api/", server.uri()));
        assert_eq!(info.timezone, "America/Sao_Paulo");
        assert!(server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty());
    }

    #[test]
    fn parse_weekday_input_accepts_names_and_indices() {
        assert_eq!(parse_weekday_input("mon"), Ok(1));
        assert_eq!(parse_weekday_input(" Sunday "), Ok(0));
        assert_eq!(parse_weekday_input("6"), Ok(6));
        assert_eq!(
            parse_weekday_input("7"),
            Err(ValidationError::WeekdayOutOfRange(7))
        );
        assert_eq!(
            parse_weekday_input("300"),
            Err(ValidationError::WeekdayOutOfRange(300))
        );
        assert_eq!(
            parse_weekday_input("someday"),
            Err(ValidationError::UnknownWeekday("someday".to_string()))
        );
    }

    #[tokio::test]
    async fn catalog_commands_require_login() {
        let server = MockServer::start().await;
        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "UTC");

        let error = list_subjects_impl(&state).await.expect_err("anonymous");
        assert!(matches!(error, InfraError::NotAuthenticated));
        assert_eq!(
            state.command_error("list_subjects", &error),
            "not authenticated, log in first"
        );
    }

    #[tokio::test]
    async fn login_callback_persists_session_for_later_commands() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/oauth/callback"))
            .and(query_param("code", "abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "user-1",
                "user": {"name": "Ana", "email": "ana@example.test", "googleCalendarConnected": true}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/subjects/user/user-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"subjectId": "sub-1", "name": "Applied AI", "userId": "user-1",
                 "createdAt": "2026-02-16T08:00:00"}
            ])))
            .mount(&server)
            .await;

        let workspace = TempWorkspace::new();
        {
            let state = workspace.app_state(&server, "UTC");
            let outcome = complete_login_impl(&state, Some("abc".to_string()), None)
                .await
                .expect("complete login");
            assert!(matches!(outcome, LoginOutcome::SignedIn { .. }));
        }

        let state = workspace.app_state(&server, "UTC");
        let subjects = list_subjects_impl(&state).await.expect("list subjects");
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].abbreviation(), "APP");

        assert!(logout_impl(&state).expect("logout"));
        assert_eq!(auth_status_impl(&state).expect("status"), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn create_subject_rejects_blank_name_before_calling_backend() {
        let server = MockServer::start().await;
        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "UTC");
        signed_in(&state);

        let error = create_subject_impl(&state, "   ".to_string(), None)
            .await
            .expect_err("blank name");
        assert!(matches!(
            error,
            InfraError::Validation(ValidationError::EmptyField("subject.name"))
        ));
        assert!(server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty());
    }

    #[tokio::test]
    async fn list_study_sessions_formats_cards_in_configured_zone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/study-sessions/user/user-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                session_json("ses-2", "2026-03-02T17:00:00Z", "2026-03-02T18:00:00Z", "scheduled"),
                session_json("ses-1", "2026-02-23T17:00:00Z", "2026-02-23T18:30:00Z", "scheduled"),
                session_json("ses-0", "2026-02-09T17:00:00Z", "2026-02-09T18:00:00Z", "missed"),
            ])))
            .mount(&server)
            .await;

        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "America/Sao_Paulo");
        signed_in(&state);

        let now = DateTime::parse_from_rfc3339("2026-02-18T12:00:00Z")
            .expect("valid datetime")
            .with_timezone(&Utc);
        let cards = list_study_sessions_at(&state, true, now)
            .await
            .expect("list sessions");

        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].session_id, "ses-1");
        assert_eq!(cards[0].date, "2026-02-23");
        assert_eq!(cards[0].weekday, "Mon");
        assert_eq!(cards[0].time_range, "14:00 - 15:30");

        let all = list_study_sessions_at(&state, false, now)
            .await
            .expect("list all sessions");
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].session_id, "ses-0");
    }

    #[tokio::test]
    async fn confirm_and_cancel_update_session_state() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/study-sessions/ses-1"))
            .and(body_json(serde_json::json!({"state": "completed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(
                "ses-1",
                "2026-02-23T14:00:00Z",
                "2026-02-23T15:00:00Z",
                "completed",
            )))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/study-sessions/ses-2"))
            .and(body_json(serde_json::json!({"state": "missed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(
                "ses-2",
                "2026-02-25T14:00:00Z",
                "2026-02-25T15:00:00Z",
                "missed",
            )))
            .expect(1)
            .mount(&server)
            .await;

        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "UTC");
        signed_in(&state);

        let confirmed = confirm_session_impl(&state, "ses-1".to_string())
            .await
            .expect("confirm");
        assert_eq!(confirmed.state, SessionState::Completed);
        assert_eq!(confirmed.time_range, "14:00 - 15:00");

        let cancelled = cancel_session_impl(&state, "ses-2".to_string())
            .await
            .expect("cancel");
        assert_eq!(cancelled.state, SessionState::Missed);
    }

    #[tokio::test]
    async fn schedule_sessions_creates_every_occurrence_without_calendar_credential() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/topics/top-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "topicId": "top-1", "title": "SVM", "subjectId": "sub-1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users/user-1/access-token"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/study-sessions/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(session_json(
                "ses-new",
                "2026-02-23T14:00:00Z",
                "2026-02-23T15:00:00Z",
                "scheduled",
            )))
            .expect(4)
            .mount(&server)
            .await;

        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "UTC");
        signed_in(&state);

        let report = schedule_sessions_impl(
            &state,
            ScheduleSessionsInput {
                topic_id: "top-1".to_string(),
                weekdays: vec!["mon".to_string(), "3".to_string()],
                start_time: "14:00".to_string(),
                end_time: "15:00".to_string(),
                repeat_weeks: 2,
            },
        )
        .await
        .expect("schedule");

        assert_eq!(report.attempted, 4);
        assert_eq!(report.created.len(), 4);
        assert_eq!(report.mirrored_events, 0);
        assert_eq!(state.scheduler.phase(), SubmissionPhase::Succeeded);
    }

    #[tokio::test]
    async fn schedule_sessions_reports_aggregate_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/topics/top-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "topicId": "top-1", "title": "SVM", "subjectId": "sub-1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/users/user-1/access-token"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/study-sessions/"))
            .respond_with(ResponseTemplate::new(500).set_body_json(
                serde_json::json!({"detail": "Erro ao criar study session"}),
            ))
            .mount(&server)
            .await;

        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "UTC");
        signed_in(&state);

        let error = schedule_sessions_impl(
            &state,
            ScheduleSessionsInput {
                topic_id: "top-1".to_string(),
                weekdays: vec!["fri".to_string()],
                start_time: "09:00".to_string(),
                end_time: "10:00".to_string(),
                repeat_weeks: 3,
            },
        )
        .await
        .expect_err("all failed");
        assert!(matches!(error, InfraError::NoSessionsCreated { attempted: 3 }));
        assert_eq!(state.scheduler.phase(), SubmissionPhase::AllFailed);
    }

    #[tokio::test]
    async fn schedule_sessions_rejects_short_interval_before_topic_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/topics/top-1"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "UTC");
        signed_in(&state);

        let error = schedule_sessions_impl(
            &state,
            ScheduleSessionsInput {
                topic_id: "top-1".to_string(),
                weekdays: vec!["mon".to_string()],
                start_time: "10:00".to_string(),
                end_time: "10:20".to_string(),
                repeat_weeks: 1,
            },
        )
        .await
        .expect_err("interval too short");

        assert!(matches!(
            error,
            InfraError::Validation(ValidationError::IntervalTooShort { minutes: 20, minimum: 30 })
        ));
        assert!(error.to_string().contains("minimum interval 30 minutes"));
        assert_eq!(state.scheduler.phase(), SubmissionPhase::ValidationFailed);
        assert!(server
            .received_requests()
            .await
            .unwrap_or_default()
            .is_empty());
    }

    #[tokio::test]
    async fn study_history_groups_topics_by_subject() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/subjects/user/user-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"subjectId": "sub-1", "name": "Applied AI", "userId": "user-1"},
                {"subjectId": "sub-2", "name": "Databases", "userId": "user-1"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/topics/subject/sub-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"topicId": "t-1", "title": "SVM", "subjectId": "sub-1"},
                {"topicId": "t-2", "title": "Decision trees", "subjectId": "sub-1"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/topics/subject/sub-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"topicId": "t-3", "title": "Indexes", "subjectId": "sub-2"}
            ])))
            .mount(&server)
            .await;

        let workspace = TempWorkspace::new();
        let state = workspace.app_state(&server, "UTC");
        signed_in(&state);

        let groups = study_history_impl(&state).await.expect("history");
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Applied AI");
        assert_eq!(groups[0].items.len(), 2);
        assert_eq!(groups[1].items[0].subject_abbr, "DAT");
    }
}

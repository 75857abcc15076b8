use crate::domain::error::ValidationError;
use crate::domain::models::{validate_non_empty, StudySession};
use crate::domain::recurrence::{
    expand_recurring_sessions, ExpansionRequest, SessionDescriptor, TimeRange, WeekdaySelection,
};
use crate::infrastructure::backend_client::{
    CalendarEventRequest, NewStudySession, StudySessionGateway, StudySessionUpdate,
};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub const AUTH_EXPIRED_NOTICE: &str =
    "Google Calendar authorization expired. Log in again to sync your study sessions.";

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleRequest {
    pub topic_id: String,
    pub topic_title: String,
    pub topic_description: Option<String>,
    /// Sunday-based indices, 0 = Sunday.
    pub weekdays: Vec<u8>,
    pub start_time: String,
    pub end_time: String,
    pub repeat_weeks: u32,
}

impl ScheduleRequest {
    fn to_expansion(&self) -> Result<ExpansionRequest, ValidationError> {
        validate_non_empty(&self.topic_id, "topic_id")?;
        let weekdays = WeekdaySelection::from_indices(self.weekdays.iter().copied())?;
        let time_range = TimeRange::parse(&self.start_time, &self.end_time)?;
        ExpansionRequest::new(weekdays, time_range, self.repeat_weeks)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionPhase {
    Idle,
    Validating,
    ValidationFailed,
    Expanding,
    Submitting,
    Succeeded,
    AllFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFailure {
    pub start_time: DateTime<Utc>,
    pub message: String,
}

/// A calendar event that was created but could not be attached to its
/// stored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkedCalendarEvent {
    pub session_id: String,
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReport {
    pub attempted: usize,
    pub created: Vec<StudySession>,
    pub failures: Vec<SessionFailure>,
    pub mirrored_events: usize,
    pub mirror_failures: usize,
    pub unlinked_calendar_events: Vec<UnlinkedCalendarEvent>,
    pub notices: Vec<String>,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

enum MirrorOutcome {
    Linked(StudySession),
    Unlinked(UnlinkedCalendarEvent),
    AuthExpired,
    Failed,
}

/// Turns a weekly pattern into stored study sessions, one backend call at a
/// time in ascending start order, mirroring each to Google Calendar when a
/// credential is available.
pub struct StudySessionScheduler<G>
where
    G: StudySessionGateway,
{
    gateway: Arc<G>,
    time_zone: Tz,
    calendar_mirroring: bool,
    summary_prefix: String,
    now_provider: NowProvider,
    busy: AtomicBool,
    phase: Mutex<SubmissionPhase>,
}

impl<G> StudySessionScheduler<G>
where
    G: StudySessionGateway,
{
    pub fn new(gateway: Arc<G>, time_zone: Tz) -> Self {
        Self {
            gateway,
            time_zone,
            calendar_mirroring: true,
            summary_prefix: "Study".to_string(),
            now_provider: Arc::new(Utc::now),
            busy: AtomicBool::new(false),
            phase: Mutex::new(SubmissionPhase::Idle),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn with_calendar_mirroring(mut self, enabled: bool) -> Self {
        self.calendar_mirroring = enabled;
        self
    }

    pub fn with_summary_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.summary_prefix = prefix.into();
        self
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
            .lock()
            .map(|guard| *guard)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: SubmissionPhase) {
        match self.phase.lock() {
            Ok(mut guard) => *guard = phase,
            Err(poisoned) => *poisoned.into_inner() = phase,
        }
    }

    /// Runs form validation alone so callers can reject a request before
    /// doing any backend work for it. A rejected request leaves the phase at
    /// `ValidationFailed`; an accepted one leaves the phase untouched.
    pub fn check_request(&self, request: &ScheduleRequest) -> Result<(), InfraError> {
        if self.is_busy() {
            return Err(InfraError::SubmissionInProgress);
        }
        if let Err(error) = request.to_expansion() {
            self.set_phase(SubmissionPhase::ValidationFailed);
            return Err(error.into());
        }
        Ok(())
    }

    /// Validates, expands and submits one schedule. A call made while another
    /// is in flight fails with `SubmissionInProgress`.
    pub async fn submit(
        &self,
        user_id: &str,
        request: &ScheduleRequest,
    ) -> Result<SubmissionReport, InfraError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(InfraError::SubmissionInProgress);
        }
        let _busy = BusyGuard(&self.busy);

        self.set_phase(SubmissionPhase::Validating);
        let expansion = match validate_non_empty(user_id, "user_id")
            .and_then(|_| request.to_expansion())
        {
            Ok(expansion) => expansion,
            Err(error) => {
                self.set_phase(SubmissionPhase::ValidationFailed);
                return Err(error.into());
            }
        };

        self.set_phase(SubmissionPhase::Expanding);
        let reference = (self.now_provider)().with_timezone(&self.time_zone);
        let sessions = match expand_recurring_sessions(&expansion, &reference) {
            Ok(sessions) => sessions,
            Err(error) => {
                self.set_phase(SubmissionPhase::ValidationFailed);
                return Err(error.into());
            }
        };

        self.set_phase(SubmissionPhase::Submitting);
        let report = self.submit_sessions(user_id, request, &sessions).await;

        if report.created.is_empty() {
            self.set_phase(SubmissionPhase::AllFailed);
            warn!(
                attempted = report.attempted,
                topic_id = %request.topic_id,
                "no study sessions were created"
            );
            return Err(InfraError::NoSessionsCreated {
                attempted: report.attempted,
            });
        }

        self.set_phase(SubmissionPhase::Succeeded);
        info!(
            attempted = report.attempted,
            created = report.created.len(),
            mirrored = report.mirrored_events,
            topic_id = %request.topic_id,
            "study sessions submitted"
        );
        Ok(report)
    }

    async fn submit_sessions(
        &self,
        user_id: &str,
        request: &ScheduleRequest,
        sessions: &[SessionDescriptor],
    ) -> SubmissionReport {
        let mut report = SubmissionReport {
            attempted: sessions.len(),
            created: Vec::with_capacity(sessions.len()),
            failures: Vec::new(),
            mirrored_events: 0,
            mirror_failures: 0,
            unlinked_calendar_events: Vec::new(),
            notices: Vec::new(),
        };
        let number_sessions = u32::try_from(sessions.len()).unwrap_or(u32::MAX);
        let mut access_token = self.calendar_credential(user_id, &mut report).await;

        for descriptor in sessions {
            let start_time = descriptor.start.with_timezone(&self.time_zone).to_rfc3339();
            let end_time = descriptor.end.with_timezone(&self.time_zone).to_rfc3339();
            let payload = NewStudySession {
                start_time: start_time.clone(),
                end_time: end_time.clone(),
                topic_id: request.topic_id.clone(),
                user_id: user_id.to_string(),
                number_sessions,
            };

            let created = match self.gateway.create_session(&payload).await {
                Ok(created) => created,
                Err(error) => {
                    warn!(start_time = %start_time, %error, "study session skipped");
                    report.failures.push(SessionFailure {
                        start_time: descriptor.start,
                        message: error.to_string(),
                    });
                    continue;
                }
            };

            let Some(token) = access_token.as_deref() else {
                report.created.push(created);
                continue;
            };
            let event = CalendarEventRequest {
                summary: format!("{}: {}", self.summary_prefix, request.topic_title),
                description: request.topic_description.clone(),
                start_time,
                end_time,
                timezone: self.time_zone.name().to_string(),
            };
            match self.mirror(token, created.clone(), &event).await {
                MirrorOutcome::Linked(linked) => {
                    report.mirrored_events += 1;
                    report.created.push(linked);
                }
                MirrorOutcome::Unlinked(unlinked) => {
                    report.mirrored_events += 1;
                    report.unlinked_calendar_events.push(unlinked);
                    report.created.push(created);
                }
                MirrorOutcome::AuthExpired => {
                    report.mirror_failures += 1;
                    report.notices.push(AUTH_EXPIRED_NOTICE.to_string());
                    access_token = None;
                    report.created.push(created);
                }
                MirrorOutcome::Failed => {
                    report.mirror_failures += 1;
                    report.created.push(created);
                }
            }
        }
        report
    }

    async fn calendar_credential(
        &self,
        user_id: &str,
        report: &mut SubmissionReport,
    ) -> Option<String> {
        if !self.calendar_mirroring {
            return None;
        }
        match self.gateway.calendar_access_token(user_id).await {
            Ok(token) => token,
            Err(InfraError::AuthExpired) => {
                warn!("calendar credential expired, mirroring skipped");
                report.notices.push(AUTH_EXPIRED_NOTICE.to_string());
                None
            }
            Err(error) => {
                warn!(%error, "calendar credential unavailable, mirroring skipped");
                None
            }
        }
    }

    async fn mirror(
        &self,
        access_token: &str,
        created: StudySession,
        event: &CalendarEventRequest,
    ) -> MirrorOutcome {
        let event_id = match self.gateway.create_calendar_event(access_token, event).await {
            Ok(event_id) => event_id,
            Err(InfraError::AuthExpired) => {
                warn!(session_id = %created.session_id, "calendar authorization expired");
                return MirrorOutcome::AuthExpired;
            }
            Err(error) => {
                warn!(session_id = %created.session_id, %error, "calendar mirroring failed");
                return MirrorOutcome::Failed;
            }
        };

        let update = StudySessionUpdate {
            calendar_event: Some(event_id.clone()),
            state: None,
        };
        match self.gateway.update_session(&created.session_id, &update).await {
            Ok(linked) => MirrorOutcome::Linked(linked),
            Err(error) => {
                warn!(
                    session_id = %created.session_id,
                    event_id = %event_id,
                    %error,
                    "calendar event not linked to study session"
                );
                MirrorOutcome::Unlinked(UnlinkedCalendarEvent {
                    session_id: created.session_id,
                    event_id,
                })
            }
        }
    }
}

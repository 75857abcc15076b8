pub mod application;
mod cli;
pub mod domain;
pub mod infrastructure;

use application::commands::{
    add_note_impl, auth_status_impl, begin_login_impl, cancel_session_impl,
    complete_login_impl, confirm_session_impl, create_subject_impl, create_topic_impl,
    delete_subject_impl, delete_topic_impl, edit_note_impl, generate_topic_content_impl,
    list_study_sessions_impl, list_subjects_impl, logout_impl, schedule_sessions_impl,
    study_history_impl, subject_detail_impl, suggest_video_impl, topic_detail_impl,
    workspace_info_impl, AppState, ScheduleSessionsInput,
};
use clap::Parser;
use cli::{CliArgs, Command, NoteCommand, SessionCommand, SubjectCommand, TopicCommand};
use infrastructure::error::InfraError;
use serde::Serialize;
use serde_json::Value;
use std::process::ExitCode;

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: bool,
}

#[derive(Debug, Serialize)]
struct LogoutResponse {
    was_authenticated: bool,
}

fn render<T: Serialize>(value: T) -> Result<Value, InfraError> {
    Ok(serde_json::to_value(value)?)
}

async fn dispatch(state: &AppState, command: Command) -> Result<Value, InfraError> {
    match command {
        Command::Init => render(workspace_info_impl(state)),
        Command::Login => render(begin_login_impl(state).await?),
        Command::Callback { code, error } => {
            render(complete_login_impl(state, code, error).await?)
        }
        Command::Logout => render(LogoutResponse {
            was_authenticated: logout_impl(state)?,
        }),
        Command::Status => render(auth_status_impl(state)?),
        Command::Subjects(SubjectCommand::List) => render(list_subjects_impl(state).await?),
        Command::Subjects(SubjectCommand::Show { subject_id }) => {
            render(subject_detail_impl(state, subject_id).await?)
        }
        Command::Subjects(SubjectCommand::Create { name, description }) => {
            render(create_subject_impl(state, name, description).await?)
        }
        Command::Subjects(SubjectCommand::Delete { subject_id }) => render(DeletedResponse {
            deleted: delete_subject_impl(state, subject_id).await?,
        }),
        Command::Topics(TopicCommand::Show { topic_id }) => {
            render(topic_detail_impl(state, topic_id).await?)
        }
        Command::Topics(TopicCommand::Create {
            subject,
            title,
            description,
        }) => render(create_topic_impl(state, subject, title, description).await?),
        Command::Topics(TopicCommand::Delete { topic_id }) => render(DeletedResponse {
            deleted: delete_topic_impl(state, topic_id).await?,
        }),
        Command::Topics(TopicCommand::Generate { topic_id }) => {
            render(generate_topic_content_impl(state, topic_id).await?)
        }
        Command::Topics(TopicCommand::SuggestVideo { topic_id }) => {
            render(suggest_video_impl(state, topic_id).await?)
        }
        Command::Notes(NoteCommand::Add { topic, content }) => {
            render(add_note_impl(state, topic, content).await?)
        }
        Command::Notes(NoteCommand::Edit { note_id, content }) => {
            render(edit_note_impl(state, note_id, content).await?)
        }
        Command::Sessions(SessionCommand::List { upcoming }) => {
            render(list_study_sessions_impl(state, upcoming).await?)
        }
        Command::Sessions(SessionCommand::Confirm { session_id }) => {
            render(confirm_session_impl(state, session_id).await?)
        }
        Command::Sessions(SessionCommand::Cancel { session_id }) => {
            render(cancel_session_impl(state, session_id).await?)
        }
        Command::Schedule(args) => render(
            schedule_sessions_impl(
                state,
                ScheduleSessionsInput {
                    topic_id: args.topic,
                    weekdays: args.days,
                    start_time: args.start,
                    end_time: args.end,
                    repeat_weeks: args.weeks,
                },
            )
            .await?,
        ),
        Command::History => render(study_history_impl(state).await?),
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Init => "init",
        Command::Login => "login",
        Command::Callback { .. } => "callback",
        Command::Logout => "logout",
        Command::Status => "status",
        Command::Subjects(_) => "subjects",
        Command::Topics(_) => "topics",
        Command::Notes(_) => "notes",
        Command::Sessions(_) => "sessions",
        Command::Schedule(_) => "schedule",
        Command::History => "history",
    }
}

pub async fn run() -> ExitCode {
    let args = CliArgs::parse();
    let workspace_root = match args.workspace {
        Some(path) => path,
        None => match std::env::current_dir() {
            Ok(path) => path,
            Err(error) => {
                eprintln!("failed to resolve current directory: {error}");
                return ExitCode::FAILURE;
            }
        },
    };

    let result = match AppState::new(workspace_root) {
        Ok(state) => {
            let name = command_name(&args.command);
            dispatch(&state, args.command)
                .await
                .map_err(|error| state.command_error(name, &error))
        }
        Err(error) => Err(format!("failed to initialize app state: {error}")),
    };

    match result.and_then(|value| {
        serde_json::to_string_pretty(&value).map_err(|error| error.to_string())
    }) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

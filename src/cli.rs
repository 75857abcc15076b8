use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about = "BrainBuddy study planner client", long_about = None)]
pub struct CliArgs {
    /// Directory holding config/, state/ and logs/ (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Create the workspace layout and default config
    Init,
    /// Print the provider login URL, or the current user when already signed in
    Login,
    /// Finish the login redirect with the values the provider returned
    Callback {
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        error: Option<String>,
    },
    Logout,
    Status,
    #[command(subcommand)]
    Subjects(SubjectCommand),
    #[command(subcommand)]
    Topics(TopicCommand),
    #[command(subcommand)]
    Notes(NoteCommand),
    #[command(subcommand)]
    Sessions(SessionCommand),
    /// Expand a weekly pattern into sessions and submit them
    Schedule(ScheduleArgs),
    /// Topics studied so far, grouped by subject
    History,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum SubjectCommand {
    List,
    Show {
        subject_id: String,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        subject_id: String,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum TopicCommand {
    Show {
        topic_id: String,
    },
    Create {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
    Delete {
        topic_id: String,
    },
    /// Generate explanatory content and store it as a note
    Generate {
        topic_id: String,
    },
    /// Ask the backend for a video about the topic
    SuggestVideo {
        topic_id: String,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum NoteCommand {
    Add {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        content: String,
    },
    Edit {
        note_id: String,
        #[arg(long)]
        content: String,
    },
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum SessionCommand {
    List {
        #[arg(long)]
        upcoming: bool,
    },
    Confirm {
        session_id: String,
    },
    Cancel {
        session_id: String,
    },
}

#[derive(Args, Debug, PartialEq)]
pub struct ScheduleArgs {
    #[arg(long)]
    pub topic: String,
    /// Weekday names or indices with 0 = Sunday, comma separated
    #[arg(long, value_delimiter = ',', required = true)]
    pub days: Vec<String>,
    /// Local start time, HH:MM
    #[arg(long)]
    pub start: String,
    /// Local end time, HH:MM
    #[arg(long)]
    pub end: String,
    #[arg(long, default_value_t = 1)]
    pub weeks: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_schedule_with_day_list() {
        let args = CliArgs::try_parse_from([
            "brainbuddy", "schedule", "--topic", "top-1", "--days", "mon,3", "--start", "14:00",
            "--end", "15:30", "--weeks", "4",
        ])
        .expect("parse schedule");

        assert_eq!(
            args.command,
            Command::Schedule(ScheduleArgs {
                topic: "top-1".to_string(),
                days: vec!["mon".to_string(), "3".to_string()],
                start: "14:00".to_string(),
                end: "15:30".to_string(),
                weeks: 4,
            })
        );
    }

    #[test]
    fn parse_global_workspace_after_subcommand() {
        let args = CliArgs::try_parse_from(["brainbuddy", "history", "--workspace", "/tmp/bb"])
            .expect("parse history");
        assert_eq!(args.workspace, Some(PathBuf::from("/tmp/bb")));
        assert_eq!(args.command, Command::History);
    }

    #[test]
    fn parse_callback_with_provider_error() {
        let args = CliArgs::try_parse_from(["brainbuddy", "callback", "--error", "access_denied"])
            .expect("parse callback");
        assert_eq!(
            args.command,
            Command::Callback {
                code: None,
                error: Some("access_denied".to_string()),
            }
        );
    }

    #[test]
    fn parse_sessions_upcoming_flag() {
        let args = CliArgs::try_parse_from(["brainbuddy", "sessions", "list", "--upcoming"])
            .expect("parse sessions");
        assert_eq!(
            args.command,
            Command::Sessions(SessionCommand::List { upcoming: true })
        );
    }

    #[test]
    fn schedule_requires_days() {
        let result = CliArgs::try_parse_from([
            "brainbuddy", "schedule", "--topic", "top-1", "--start", "14:00", "--end", "15:00",
        ]);
        assert!(result.is_err());
    }
}

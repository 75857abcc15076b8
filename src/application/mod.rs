pub mod bootstrap;
pub mod commands;
pub mod history;
pub mod scheduling;
pub mod session;
pub mod topic_content;

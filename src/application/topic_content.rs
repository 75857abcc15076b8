use crate::domain::models::{
    validate_non_empty, Note, NoteSource, Subject, Topic, YouTubeSuggestion,
};
use crate::infrastructure::backend_client::{
    CatalogGateway, GenerateContentRequest, NewNote, NoteUpdate, StudyContentGateway,
};
use crate::infrastructure::error::InfraError;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDetail {
    pub topic: Topic,
    pub notes: Vec<Note>,
    pub video_suggestions: Vec<YouTubeSuggestion>,
}

pub async fn topic_detail<C, S>(
    catalog: &C,
    content: &S,
    topic_id: &str,
) -> Result<TopicDetail, InfraError>
where
    C: CatalogGateway + ?Sized,
    S: StudyContentGateway + ?Sized,
{
    let topic = catalog.get_topic(topic_id).await?;
    let notes = content.list_notes(&topic.topic_id).await?;
    let video_suggestions = content.list_video_suggestions(&topic.topic_id).await?;
    Ok(TopicDetail {
        topic,
        notes,
        video_suggestions,
    })
}

fn generation_context(subject: &Subject) -> String {
    match subject
        .description
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        Some(description) => format!("{}: {description}", subject.name),
        None => subject.name.clone(),
    }
}

/// Asks the backend model to explain a topic and stores the answer as an
/// AI-generated note on it.
pub async fn generate_topic_content<C, S>(
    catalog: &C,
    content: &S,
    topic_id: &str,
) -> Result<Note, InfraError>
where
    C: CatalogGateway + ?Sized,
    S: StudyContentGateway + ?Sized,
{
    let topic = catalog.get_topic(topic_id).await?;
    let subject = catalog.get_subject(&topic.subject_id).await?;
    let generated = content
        .generate_content(&GenerateContentRequest {
            prompt: topic.title.clone(),
            topic_id: topic.topic_id.clone(),
            context: Some(generation_context(&subject)),
        })
        .await?;

    let text = generated.response.trim();
    if text.is_empty() {
        return Err(InfraError::InvalidResponse(
            "content generation returned an empty response".to_string(),
        ));
    }
    let note = content
        .create_note(&NewNote {
            content: text.to_string(),
            source: NoteSource::AiGenerated,
            topic_id: topic.topic_id.clone(),
        })
        .await?;
    info!(
        topic_id = %topic.topic_id,
        model = generated.model_used.as_deref().unwrap_or("unknown"),
        "topic content generated"
    );
    Ok(note)
}

pub async fn add_note<S>(content: &S, topic_id: &str, text: &str) -> Result<Note, InfraError>
where
    S: StudyContentGateway + ?Sized,
{
    validate_non_empty(topic_id, "note.topic_id")?;
    validate_non_empty(text, "note.content")?;
    content
        .create_note(&NewNote {
            content: text.trim().to_string(),
            source: NoteSource::Manual,
            topic_id: topic_id.to_string(),
        })
        .await
}

pub async fn edit_note<S>(content: &S, note_id: &str, text: &str) -> Result<Note, InfraError>
where
    S: StudyContentGateway + ?Sized,
{
    validate_non_empty(note_id, "note.note_id")?;
    validate_non_empty(text, "note.content")?;
    content
        .update_note(
            note_id,
            &NoteUpdate {
                content: Some(text.trim().to_string()),
                source: None,
            },
        )
        .await
}

pub async fn suggest_video<S>(content: &S, topic_id: &str) -> Result<YouTubeSuggestion, InfraError>
where
    S: StudyContentGateway + ?Sized,
{
    validate_non_empty(topic_id, "topic_id")?;
    let suggestion = content.suggest_video(topic_id).await?;
    info!(topic_id, url = %suggestion.url, "video suggested");
    Ok(suggestion)
}

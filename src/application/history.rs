use crate::domain::models::{HistoryItem, Subject};
use crate::infrastructure::backend_client::CatalogGateway;
use crate::infrastructure::error::InfraError;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

struct HistoryCursor<C> {
    catalog: Arc<C>,
    user_id: String,
    subjects: Option<VecDeque<Subject>>,
    pending: VecDeque<HistoryItem>,
}

/// Topics of every subject owned by `user_id`, one item per topic.
///
/// Subjects are fetched on first poll and topics one subject at a time, so
/// a consumer that stops early never triggers the remaining requests. The
/// stream ends after the first error.
pub fn study_history<C>(
    catalog: Arc<C>,
    user_id: impl Into<String>,
) -> BoxStream<'static, Result<HistoryItem, InfraError>>
where
    C: CatalogGateway + 'static,
{
    let cursor = HistoryCursor {
        catalog,
        user_id: user_id.into(),
        subjects: None,
        pending: VecDeque::new(),
    };

    stream::try_unfold(cursor, |mut cursor| async move {
        loop {
            if let Some(item) = cursor.pending.pop_front() {
                return Ok::<_, InfraError>(Some((item, cursor)));
            }
            if cursor.subjects.is_none() {
                let subjects = cursor.catalog.list_subjects(&cursor.user_id).await?;
                cursor.subjects = Some(subjects.into());
            }
            let Some(subject) = cursor.subjects.as_mut().and_then(VecDeque::pop_front) else {
                return Ok(None);
            };
            let topics = cursor.catalog.list_topics(&subject.subject_id).await?;
            cursor.pending.extend(
                topics
                    .into_iter()
                    .map(|topic| HistoryItem::from_topic(&subject, topic)),
            );
        }
    })
    .boxed()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryGroup {
    pub subject_id: String,
    pub label: String,
    pub items: Vec<HistoryItem>,
}

/// Groups items by subject in first-seen order.
pub fn group_history(items: Vec<HistoryItem>) -> Vec<HistoryGroup> {
    let mut groups: Vec<HistoryGroup> = Vec::new();
    for item in items {
        match groups
            .iter_mut()
            .find(|group| group.subject_id == item.subject_id)
        {
            Some(group) => group.items.push(item),
            None => {
                let label = item
                    .subject_name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| item.subject_abbr.clone());
                groups.push(HistoryGroup {
                    subject_id: item.subject_id.clone(),
                    label,
                    items: vec![item],
                });
            }
        }
    }
    groups
}

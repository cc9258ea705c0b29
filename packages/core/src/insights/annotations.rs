//! User annotations on dashboard data
//!
//! Notes attached to a data type (Revenue, Registration, ...) that can be
//! shared with other users. Kept in memory behind a `tokio::sync::RwLock`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::insights::error::InsightsError;

const ENTITY: &str = "Annotation";

/// A note attached to a dashboard data type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataAnnotation {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub data_type: String,
    pub related_metric: Option<String>,
    pub related_dimension: Option<String>,
    pub created_by: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Fields supplied by the caller when creating an annotation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAnnotation {
    pub title: String,
    pub description: String,
    pub data_type: String,
    pub related_metric: Option<String>,
    pub related_dimension: Option<String>,
    pub created_by: String,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedAnnotation {
    pub annotation_id: u64,
    pub shared_with_user_id: String,
    pub shared_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct AnnotationStore {
    annotations: BTreeMap<u64, DataAnnotation>,
    shares: Vec<SharedAnnotation>,
    next_id: u64,
}

/// CRUD and sharing for annotations
#[derive(Debug, Default)]
pub struct AnnotationService {
    store: RwLock<AnnotationStore>,
}

fn matches_user(annotation: &DataAnnotation, user_id: Option<&str>) -> bool {
    match user_id {
        Some(user) if !user.is_empty() => annotation.user_id == user,
        _ => true,
    }
}

impl AnnotationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new annotation and return it with its assigned id
    pub async fn add(&self, new: NewAnnotation) -> Result<DataAnnotation, InsightsError> {
        if new.title.trim().is_empty() {
            return Err(InsightsError::invalid_data("annotation title must not be empty"));
        }

        let mut store = self.store.write().await;
        store.next_id += 1;
        let annotation = DataAnnotation {
            id: store.next_id,
            title: new.title,
            description: new.description,
            data_type: new.data_type,
            related_metric: new.related_metric,
            related_dimension: new.related_dimension,
            created_by: new.created_by,
            user_id: new.user_id,
            created_at: Utc::now(),
            modified_at: None,
        };
        store.annotations.insert(annotation.id, annotation.clone());

        tracing::info!(annotation_id = annotation.id, data_type = %annotation.data_type, "Added annotation");
        Ok(annotation)
    }

    /// Replace the editable fields of an existing annotation
    pub async fn update(&self, annotation: DataAnnotation) -> Result<DataAnnotation, InsightsError> {
        if annotation.title.trim().is_empty() {
            return Err(InsightsError::invalid_data("annotation title must not be empty"));
        }

        let mut store = self.store.write().await;
        let existing = store
            .annotations
            .get_mut(&annotation.id)
            .ok_or_else(|| InsightsError::not_found(ENTITY, annotation.id))?;

        existing.title = annotation.title;
        existing.description = annotation.description;
        existing.data_type = annotation.data_type;
        existing.related_metric = annotation.related_metric;
        existing.related_dimension = annotation.related_dimension;
        existing.modified_at = Some(Utc::now());

        tracing::info!(annotation_id = existing.id, "Updated annotation");
        Ok(existing.clone())
    }

    /// Remove an annotation and any shares of it
    pub async fn delete(&self, id: u64) -> Result<(), InsightsError> {
        let mut store = self.store.write().await;
        if store.annotations.remove(&id).is_none() {
            return Err(InsightsError::not_found(ENTITY, id));
        }
        store.shares.retain(|s| s.annotation_id != id);

        tracing::info!(annotation_id = id, "Deleted annotation");
        Ok(())
    }

    pub async fn get(&self, id: u64) -> Result<DataAnnotation, InsightsError> {
        self.store
            .read()
            .await
            .annotations
            .get(&id)
            .cloned()
            .ok_or_else(|| InsightsError::not_found(ENTITY, id))
    }

    /// Annotations of `data_type`, optionally limited to one author. An empty
    /// `data_type` matches every type.
    pub async fn for_data_type(
        &self,
        data_type: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<DataAnnotation>, InsightsError> {
        let store = self.store.read().await;
        Ok(store
            .annotations
            .values()
            .filter(|a| data_type.is_empty() || a.data_type == data_type)
            .filter(|a| matches_user(a, user_id))
            .cloned()
            .collect())
    }

    /// Annotations created between `start` and `end`, both inclusive
    pub async fn for_date_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> Result<Vec<DataAnnotation>, InsightsError> {
        if start > end {
            return Err(InsightsError::invalid_data(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }

        let store = self.store.read().await;
        Ok(store
            .annotations
            .values()
            .filter(|a| a.created_at >= start && a.created_at <= end)
            .filter(|a| matches_user(a, user_id))
            .cloned()
            .collect())
    }

    pub async fn revenue_annotations(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<DataAnnotation>, InsightsError> {
        self.for_data_type("Revenue", user_id).await
    }

    pub async fn registration_annotations(
        &self,
        user_id: Option<&str>,
    ) -> Result<Vec<DataAnnotation>, InsightsError> {
        self.for_data_type("Registration", user_id).await
    }

    /// Share an annotation with another user; sharing twice is a no-op
    pub async fn share(&self, id: u64, target_user_id: &str) -> Result<(), InsightsError> {
        if target_user_id.trim().is_empty() {
            return Err(InsightsError::invalid_data("target user id must not be empty"));
        }

        let mut store = self.store.write().await;
        if !store.annotations.contains_key(&id) {
            return Err(InsightsError::not_found(ENTITY, id));
        }
        let already_shared = store
            .shares
            .iter()
            .any(|s| s.annotation_id == id && s.shared_with_user_id == target_user_id);
        if !already_shared {
            store.shares.push(SharedAnnotation {
                annotation_id: id,
                shared_with_user_id: target_user_id.to_string(),
                shared_at: Utc::now(),
            });
        }

        tracing::info!(annotation_id = id, target_user_id, "Shared annotation");
        Ok(())
    }

    /// Annotations other users have shared with `user_id`
    pub async fn shared_with(&self, user_id: &str) -> Result<Vec<DataAnnotation>, InsightsError> {
        let store = self.store.read().await;
        Ok(store
            .shares
            .iter()
            .filter(|s| s.shared_with_user_id == user_id)
            .filter_map(|s| store.annotations.get(&s.annotation_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn note(title: &str, data_type: &str, user: &str) -> NewAnnotation {
        NewAnnotation {
            title: title.to_string(),
            description: "details".to_string(),
            data_type: data_type.to_string(),
            created_by: user.to_string(),
            user_id: user.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn add_assigns_increasing_ids() {
        let service = AnnotationService::new();
        let first = service.add(note("Promo", "Revenue", "u1")).await.unwrap();
        let second = service.add(note("Outage", "Revenue", "u1")).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(service.get(2).await.unwrap().title, "Outage");
    }

    #[tokio::test]
    async fn add_rejects_empty_title() {
        let result = AnnotationService::new().add(note("   ", "Revenue", "u1")).await;
        assert!(matches!(result, Err(InsightsError::InvalidData { .. })));
    }

    #[tokio::test]
    async fn update_sets_modified_time() {
        let service = AnnotationService::new();
        let mut annotation = service.add(note("Promo", "Revenue", "u1")).await.unwrap();
        annotation.title = "Spring promo".to_string();

        let updated = service.update(annotation).await.unwrap();

        assert_eq!(updated.title, "Spring promo");
        assert!(updated.modified_at.is_some());
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let service = AnnotationService::new();
        let err = service.get(9).await.unwrap_err();
        assert_eq!(err.to_string(), "Annotation with id 9 not found");
        assert!(matches!(service.delete(9).await, Err(InsightsError::NotFound { .. })));
        assert!(matches!(service.share(9, "u2").await, Err(InsightsError::NotFound { .. })));
    }

    #[tokio::test]
    async fn data_type_queries_filter_by_user() {
        let service = AnnotationService::new();
        service.add(note("A", "Revenue", "u1")).await.unwrap();
        service.add(note("B", "Revenue", "u2")).await.unwrap();
        service.add(note("C", "Registration", "u1")).await.unwrap();

        assert_eq!(service.revenue_annotations(None).await.unwrap().len(), 2);
        assert_eq!(service.revenue_annotations(Some("u2")).await.unwrap().len(), 1);
        assert_eq!(service.registration_annotations(Some("u1")).await.unwrap()[0].title, "C");
        assert_eq!(service.for_data_type("", None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn date_range_is_inclusive_and_validated() {
        let service = AnnotationService::new();
        let added = service.add(note("A", "Revenue", "u1")).await.unwrap();

        let hits = service
            .for_date_range(added.created_at, added.created_at, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);

        let past = added.created_at - Duration::days(2);
        assert!(service
            .for_date_range(past, past + Duration::days(1), None)
            .await
            .unwrap()
            .is_empty());
        assert!(service.for_date_range(added.created_at, past, None).await.is_err());
    }

    #[tokio::test]
    async fn sharing_and_deleting() {
        let service = AnnotationService::new();
        let annotation = service.add(note("A", "Revenue", "u1")).await.unwrap();

        service.share(annotation.id, "u2").await.unwrap();
        service.share(annotation.id, "u2").await.unwrap();
        assert_eq!(service.shared_with("u2").await.unwrap().len(), 1);

        service.delete(annotation.id).await.unwrap();
        assert!(service.shared_with("u2").await.unwrap().is_empty());
    }
}

//! In-memory sticky assignment store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::domain::experiment::{AssignmentStore, ExperimentId, Variant};
use crate::domain::DomainError;

/// Assignment store backed by a single map behind a lock.
///
/// The write lock is the serialization point: `get_or_insert` checks and inserts
/// under it, so the first stored variant for a session wins.
#[derive(Debug, Default)]
pub struct InMemoryAssignmentStore {
    assignments: RwLock<HashMap<ExperimentId, HashMap<String, Variant>>>,
}

impl InMemoryAssignmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AssignmentStore for InMemoryAssignmentStore {
    async fn get_or_insert(
        &self,
        experiment_id: &ExperimentId,
        session_key: &str,
        candidate: Variant,
    ) -> Result<Variant, DomainError> {
        let mut assignments = self
            .assignments
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))?;

        let variant = *assignments
            .entry(experiment_id.clone())
            .or_default()
            .entry(session_key.to_string())
            .or_insert(candidate);

        Ok(variant)
    }

    async fn get(
        &self,
        experiment_id: &ExperimentId,
        session_key: &str,
    ) -> Result<Option<Variant>, DomainError> {
        let assignments = self
            .assignments
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(assignments
            .get(experiment_id)
            .and_then(|sessions| sessions.get(session_key))
            .copied())
    }

    async fn count(
        &self,
        experiment_id: &ExperimentId,
        variant: Variant,
    ) -> Result<usize, DomainError> {
        let assignments = self
            .assignments
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        Ok(assignments
            .get(experiment_id)
            .map(|sessions| sessions.values().filter(|v| **v == variant).count())
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_insert_wins() {
        let store = InMemoryAssignmentStore::new();
        let id = ExperimentId::generate();

        let first = store.get_or_insert(&id, "user-1", Variant::B).await.unwrap();
        let second = store.get_or_insert(&id, "user-1", Variant::A).await.unwrap();

        assert_eq!(first, Variant::B);
        assert_eq!(second, Variant::B);
        assert_eq!(store.get(&id, "user-1").await.unwrap(), Some(Variant::B));
    }

    #[tokio::test]
    async fn test_experiments_are_isolated() {
        let store = InMemoryAssignmentStore::new();
        let exp1 = ExperimentId::generate();
        let exp2 = ExperimentId::generate();

        store.get_or_insert(&exp1, "user-1", Variant::A).await.unwrap();

        assert_eq!(store.get(&exp2, "user-1").await.unwrap(), None);
        assert_eq!(
            store.get_or_insert(&exp2, "user-1", Variant::B).await.unwrap(),
            Variant::B
        );
    }

    #[tokio::test]
    async fn test_count() {
        let store = InMemoryAssignmentStore::new();
        let id = ExperimentId::generate();

        store.get_or_insert(&id, "u1", Variant::A).await.unwrap();
        store.get_or_insert(&id, "u2", Variant::B).await.unwrap();
        store.get_or_insert(&id, "u3", Variant::B).await.unwrap();

        assert_eq!(store.count(&id, Variant::A).await.unwrap(), 1);
        assert_eq!(store.count(&id, Variant::B).await.unwrap(), 2);
        assert_eq!(
            store.count(&ExperimentId::generate(), Variant::A).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_concurrent_get_or_insert_agrees() {
        let store = Arc::new(InMemoryAssignmentStore::new());
        let id = ExperimentId::generate();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                let id = id.clone();
                let candidate = if i % 2 == 0 { Variant::A } else { Variant::B };
                tokio::spawn(async move { store.get_or_insert(&id, "shared", candidate).await })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert!(results.iter().all(|v| *v == results[0]));
    }
}

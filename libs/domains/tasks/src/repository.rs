use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{TaskError, TaskResult};
use crate::models::{CreateTask, Task, UpdateTask};

/// Storage abstraction for tasks.
///
/// `nearest` returns `(task, distance)` pairs ordered by ascending L2
/// distance, ties broken by ascending id. Rows without an embedding are
/// never returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn insert(&self, input: CreateTask, embedding: Vec<f32>) -> TaskResult<Task>;
    async fn get_all(&self) -> TaskResult<Vec<Task>>;
    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>>;
    async fn update(
        &self,
        id: Uuid,
        input: UpdateTask,
        embedding: Option<Vec<f32>>,
    ) -> TaskResult<Task>;
    async fn delete(&self, id: Uuid) -> TaskResult<bool>;
    async fn nearest(&self, query: &[f32], k: usize) -> TaskResult<Vec<(Task, f64)>>;
}

/// In-memory implementation for tests and local development.
#[derive(Clone, Default)]
pub struct InMemoryTaskRepository {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = (*x - *y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn insert(&self, input: CreateTask, embedding: Vec<f32>) -> TaskResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::now_v7(),
            title: input.title,
            description: input.description,
            status: input.status,
            embedding: Some(embedding),
            created_at: now,
            updated_at: now,
        };

        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_all(&self) -> TaskResult<Vec<Task>> {
        let tasks = self.tasks.read().await;
        let mut all: Vec<Task> = tasks.values().cloned().collect();
        all.sort_by_key(|t| t.id);
        Ok(all)
    }

    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.get(&id).cloned())
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateTask,
        embedding: Option<Vec<f32>>,
    ) -> TaskResult<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks.get_mut(&id).ok_or(TaskError::NotFound(id))?;

        if let Some(title) = input.title {
            task.title = title;
        }
        if let Some(description) = input.description {
            task.description = description;
        }
        if let Some(status) = input.status {
            task.status = status;
        }
        if let Some(vector) = embedding {
            task.embedding = Some(vector);
        }
        task.updated_at = Utc::now();

        Ok(task.clone())
    }

    async fn delete(&self, id: Uuid) -> TaskResult<bool> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.remove(&id).is_some())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> TaskResult<Vec<(Task, f64)>> {
        let tasks = self.tasks.read().await;

        let mut scored: Vec<(Task, f64)> = tasks
            .values()
            .filter_map(|t| {
                t.embedding
                    .as_ref()
                    .map(|e| (t.clone(), l2_distance(e, query)))
            })
            .collect();

        scored.sort_by(|(a, da), (b, db)| da.total_cmp(db).then(a.id.cmp(&b.id)));
        scored.truncate(k);
        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    fn create_input(title: &str, description: &str) -> CreateTask {
        CreateTask {
            title: title.to_string(),
            description: description.to_string(),
            status: TaskStatus::Todo,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = InMemoryTaskRepository::new();
        let task = repo
            .insert(create_input("Buy milk", "two liters"), vec![0.0; 4])
            .await
            .unwrap();

        let fetched = repo.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Buy milk");
        assert_eq!(fetched.status, TaskStatus::Todo);
        assert!(fetched.embedding.is_some());
    }

    #[tokio::test]
    async fn test_get_all_ordered_by_id() {
        let repo = InMemoryTaskRepository::new();
        let a = repo
            .insert(create_input("first", "a"), vec![0.0; 4])
            .await
            .unwrap();
        let b = repo
            .insert(create_input("second", "b"), vec![0.0; 4])
            .await
            .unwrap();

        let all = repo.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        // v7 uuids are time-ordered, so insertion order is id order
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[1].id, b.id);
    }

    #[tokio::test]
    async fn test_update_missing_task() {
        let repo = InMemoryTaskRepository::new();
        let result = repo
            .update(Uuid::now_v7(), UpdateTask::default(), None)
            .await;
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_stale_embedding() {
        let repo = InMemoryTaskRepository::new();
        let task = repo
            .insert(create_input("t", "original"), vec![1.0, 2.0])
            .await
            .unwrap();

        let updated = repo
            .update(
                task.id,
                UpdateTask {
                    description: Some("changed".to_string()),
                    ..Default::default()
                },
                None,
            )
            .await
            .unwrap();

        assert_eq!(updated.description, "changed");
        assert_eq!(updated.embedding, Some(vec![1.0, 2.0]));
    }

    #[tokio::test]
    async fn test_delete_is_reported_once() {
        let repo = InMemoryTaskRepository::new();
        let task = repo
            .insert(create_input("t", "d"), vec![0.0; 4])
            .await
            .unwrap();

        assert!(repo.delete(task.id).await.unwrap());
        assert!(!repo.delete(task.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_nearest_orders_by_distance() {
        let repo = InMemoryTaskRepository::new();
        // distances from the origin: 1.0, 2.0, 0.5
        let mid = repo
            .insert(create_input("mid", "mid"), vec![1.0, 0.0])
            .await
            .unwrap();
        let far = repo
            .insert(create_input("far", "far"), vec![2.0, 0.0])
            .await
            .unwrap();
        let near = repo
            .insert(create_input("near", "near"), vec![0.5, 0.0])
            .await
            .unwrap();

        let hits = repo.nearest(&[0.0, 0.0], 3).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|(t, _)| t.id).collect();
        let distances: Vec<_> = hits.iter().map(|(_, d)| *d).collect();
        assert_eq!(ids, vec![near.id, mid.id, far.id]);
        assert_eq!(distances, vec![0.5, 1.0, 2.0]);
    }

    #[tokio::test]
    async fn test_nearest_ties_break_by_id() {
        let repo = InMemoryTaskRepository::new();
        let a = repo
            .insert(create_input("a", "a"), vec![1.0, 0.0])
            .await
            .unwrap();
        let b = repo
            .insert(create_input("b", "b"), vec![1.0, 0.0])
            .await
            .unwrap();

        let hits = repo.nearest(&[0.0, 0.0], 10).await.unwrap();
        assert_eq!(hits[0].0.id, a.id.min(b.id));
        assert_eq!(hits[1].0.id, a.id.max(b.id));
    }

    #[tokio::test]
    async fn test_nearest_skips_tasks_without_embedding() {
        let repo = InMemoryTaskRepository::new();
        let task = repo
            .insert(create_input("t", "d"), vec![0.0, 0.0])
            .await
            .unwrap();

        // simulate a row that never received a vector
        {
            let mut tasks = repo.tasks.write().await;
            tasks.get_mut(&task.id).unwrap().embedding = None;
        }

        let hits = repo.nearest(&[0.0, 0.0], 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_updates_keep_both_fields() {
        let repo = InMemoryTaskRepository::new();
        let task = repo
            .insert(create_input("old title", "d"), vec![0.0; 4])
            .await
            .unwrap();

        let title_update = repo.update(
            task.id,
            UpdateTask {
                title: Some("new title".to_string()),
                ..Default::default()
            },
            None,
        );
        let status_update = repo.update(
            task.id,
            UpdateTask {
                status: Some(TaskStatus::Done),
                ..Default::default()
            },
            None,
        );

        let (a, b) = tokio::join!(title_update, status_update);
        a.unwrap();
        b.unwrap();

        // neither update clobbers the other's field
        let fetched = repo.get_by_id(task.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "new title");
        assert_eq!(fetched.status, TaskStatus::Done);
        assert_eq!(fetched.description, "d");
    }
}

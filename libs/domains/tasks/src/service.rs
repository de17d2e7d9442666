use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;
use validator::Validate;

use crate::embedding::EmbeddingClient;
use crate::error::{TaskError, TaskResult};
use crate::models::{CreateTask, Task, TaskUpdate, UpdateTask};
use crate::repository::TaskRepository;

pub const DEFAULT_SEARCH_LIMIT: usize = 3;
pub const MAX_SEARCH_LIMIT: usize = 50;

/// Business logic for tasks.
///
/// Embedding policy:
/// - create: the embedding is mandatory, a provider failure aborts the write
/// - update: best effort, the text change is persisted even when the
///   provider is down and the stored vector goes stale
/// - search: a provider failure makes search unavailable
pub struct TaskService<R: TaskRepository, E: EmbeddingClient> {
    repository: Arc<R>,
    embedder: Arc<E>,
}

impl<R: TaskRepository, E: EmbeddingClient> TaskService<R, E> {
    pub fn new(repository: R, embedder: E) -> Self {
        Self {
            repository: Arc::new(repository),
            embedder: Arc::new(embedder),
        }
    }

    pub async fn create_task(&self, input: CreateTask) -> TaskResult<Task> {
        input
            .validate()
            .map_err(|e| TaskError::Validation(e.to_string()))?;

        let embedding = self
            .embedder
            .embed(&input.description)
            .await
            .map_err(|e| {
                warn!(error = %e, "Embedding failed, refusing to create task");
                TaskError::EmbeddingRequired
            })?;

        self.repository.insert(input, embedding).await
    }

    pub async fn get_all_tasks(&self) -> TaskResult<Vec<Task>> {
        self.repository.get_all().await
    }

    pub async fn get_task(&self, id: Uuid) -> TaskResult<Task> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(TaskError::NotFound(id))
    }

    /// Updates a task. If the description changes, a fresh embedding is
    /// attempted; when the provider is down the update still goes through
    /// with the old vector and `embedding_refreshed` is false.
    pub async fn update_task(&self, id: Uuid, input: UpdateTask) -> TaskResult<TaskUpdate> {
        input
            .validate()
            .map_err(|e| TaskError::Validation(e.to_string()))?;

        if input.is_empty() {
            return Err(TaskError::NoFieldsSupplied);
        }

        let mut embedding = None;
        let mut embedding_refreshed = false;

        if let Some(description) = input.description.as_deref() {
            match self.embedder.embed(description).await {
                Ok(vector) => {
                    embedding = Some(vector);
                    embedding_refreshed = true;
                }
                Err(e) => {
                    warn!(
                        task_id = %id,
                        error = %e,
                        "Embedding failed, persisting update with stale vector"
                    );
                }
            }
        }

        let task = self.repository.update(id, input, embedding).await?;
        Ok(TaskUpdate {
            task,
            embedding_refreshed,
        })
    }

    pub async fn delete_task(&self, id: Uuid) -> TaskResult<()> {
        if !self.repository.delete(id).await? {
            return Err(TaskError::NotFound(id));
        }
        Ok(())
    }

    /// Semantic search over task descriptions. `k` defaults to
    /// [`DEFAULT_SEARCH_LIMIT`] and must stay within 1..=[`MAX_SEARCH_LIMIT`].
    pub async fn search_tasks(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> TaskResult<Vec<(Task, f64)>> {
        if query.trim().is_empty() {
            return Err(TaskError::Validation(
                "search query must not be empty".to_string(),
            ));
        }

        let k = k.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if k < 1 || k > MAX_SEARCH_LIMIT {
            return Err(TaskError::Validation(format!(
                "k must be between 1 and {}",
                MAX_SEARCH_LIMIT
            )));
        }

        let embedding = self.embedder.embed(query).await.map_err(|e| {
            warn!(error = %e, "Embedding failed, search unavailable");
            TaskError::SearchUnavailable
        })?;

        self.repository.nearest(&embedding, k).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, MockEmbeddingClient};
    use crate::models::TaskStatus;
    use crate::repository::MockTaskRepository;
    use chrono::Utc;
    use mockall::predicate::eq;

    fn sample_task(id: Uuid) -> Task {
        Task {
            id,
            title: "Buy groceries".to_string(),
            description: "milk and eggs".to_string(),
            status: TaskStatus::Todo,
            embedding: Some(vec![0.1; 4]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn create_input() -> CreateTask {
        CreateTask {
            title: "Buy groceries".to_string(),
            description: "milk and eggs".to_string(),
            status: TaskStatus::Todo,
        }
    }

    fn working_embedder() -> MockEmbeddingClient {
        let mut embedder = MockEmbeddingClient::new();
        embedder
            .expect_embed()
            .returning(|_| Ok(vec![0.1, 0.2, 0.3, 0.4]));
        embedder
    }

    fn broken_embedder() -> MockEmbeddingClient {
        let mut embedder = MockEmbeddingClient::new();
        embedder
            .expect_embed()
            .returning(|_| Err(EmbeddingError::Unavailable("connection refused".to_string())));
        embedder
    }

    #[tokio::test]
    async fn test_create_task_embeds_description() {
        let mut repo = MockTaskRepository::new();
        repo.expect_insert()
            .withf(|input, embedding| {
                input.description == "milk and eggs" && embedding.len() == 4
            })
            .returning(|_, _| Ok(sample_task(Uuid::now_v7())));

        let service = TaskService::new(repo, working_embedder());
        let task = service.create_task(create_input()).await.unwrap();
        assert_eq!(task.title, "Buy groceries");
    }

    #[tokio::test]
    async fn test_create_task_fails_when_provider_down() {
        let mut repo = MockTaskRepository::new();
        repo.expect_insert().never();

        let service = TaskService::new(repo, broken_embedder());
        let result = service.create_task(create_input()).await;
        assert!(matches!(result, Err(TaskError::EmbeddingRequired)));
    }

    #[tokio::test]
    async fn test_create_task_invalid_input_skips_provider() {
        let mut repo = MockTaskRepository::new();
        repo.expect_insert().never();
        let mut embedder = MockEmbeddingClient::new();
        embedder.expect_embed().never();

        let service = TaskService::new(repo, embedder);
        let result = service
            .create_task(CreateTask {
                title: String::new(),
                description: "d".to_string(),
                status: TaskStatus::Todo,
            })
            .await;
        assert!(matches!(result, Err(TaskError::Validation(_))));
    }

    #[tokio::test]
    async fn test_get_task_not_found() {
        let id = Uuid::now_v7();
        let mut repo = MockTaskRepository::new();
        repo.expect_get_by_id()
            .with(eq(id))
            .returning(|_| Ok(None));

        let service = TaskService::new(repo, MockEmbeddingClient::new());
        let result = service.get_task(id).await;
        assert!(matches!(result, Err(TaskError::NotFound(e)) if e == id));
    }

    #[tokio::test]
    async fn test_update_task_refreshes_embedding() {
        let id = Uuid::now_v7();
        let mut repo = MockTaskRepository::new();
        repo.expect_update()
            .withf(|_, _, embedding| embedding.is_some())
            .returning(move |_, _, _| Ok(sample_task(id)));

        let service = TaskService::new(repo, working_embedder());
        let result = service
            .update_task(
                id,
                UpdateTask {
                    description: Some("new text".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(result.embedding_refreshed);
    }

    #[tokio::test]
    async fn test_update_task_degrades_when_provider_down() {
        let id = Uuid::now_v7();
        let mut repo = MockTaskRepository::new();
        repo.expect_update()
            .withf(|_, input, embedding| {
                input.description.as_deref() == Some("new text") && embedding.is_none()
            })
            .returning(move |_, _, _| Ok(sample_task(id)));

        let service = TaskService::new(repo, broken_embedder());
        let result = service
            .update_task(
                id,
                UpdateTask {
                    description: Some("new text".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!result.embedding_refreshed);
    }

    #[tokio::test]
    async fn test_update_task_status_only_skips_provider() {
        let id = Uuid::now_v7();
        let mut repo = MockTaskRepository::new();
        repo.expect_update()
            .withf(|_, _, embedding| embedding.is_none())
            .returning(move |_, _, _| Ok(sample_task(id)));
        let mut embedder = MockEmbeddingClient::new();
        embedder.expect_embed().never();

        let service = TaskService::new(repo, embedder);
        let result = service
            .update_task(
                id,
                UpdateTask {
                    status: Some(TaskStatus::Done),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!result.embedding_refreshed);
    }

    #[tokio::test]
    async fn test_update_task_requires_a_field() {
        let service = TaskService::new(MockTaskRepository::new(), MockEmbeddingClient::new());
        let result = service.update_task(Uuid::now_v7(), UpdateTask::default()).await;
        assert!(matches!(result, Err(TaskError::NoFieldsSupplied)));
    }

    #[tokio::test]
    async fn test_delete_task_not_found() {
        let mut repo = MockTaskRepository::new();
        repo.expect_delete().returning(|_| Ok(false));

        let service = TaskService::new(repo, MockEmbeddingClient::new());
        let result = service.delete_task(Uuid::now_v7()).await;
        assert!(matches!(result, Err(TaskError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_search_rejects_empty_query() {
        let service = TaskService::new(MockTaskRepository::new(), MockEmbeddingClient::new());
        let result = service.search_tasks("   ", None).await;
        assert!(matches!(result, Err(TaskError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_rejects_out_of_range_k() {
        let service = TaskService::new(MockTaskRepository::new(), MockEmbeddingClient::new());
        assert!(matches!(
            service.search_tasks("query", Some(0)).await,
            Err(TaskError::Validation(_))
        ));
        assert!(matches!(
            service.search_tasks("query", Some(51)).await,
            Err(TaskError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_search_defaults_k() {
        let mut repo = MockTaskRepository::new();
        repo.expect_nearest()
            .withf(|_, k| *k == DEFAULT_SEARCH_LIMIT)
            .returning(|_, _| Ok(vec![]));

        let service = TaskService::new(repo, working_embedder());
        let hits = service.search_tasks("groceries", None).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_search_unavailable_when_provider_down() {
        let mut repo = MockTaskRepository::new();
        repo.expect_nearest().never();

        let service = TaskService::new(repo, broken_embedder());
        let result = service.search_tasks("groceries", Some(5)).await;
        assert!(matches!(result, Err(TaskError::SearchUnavailable)));
    }
}

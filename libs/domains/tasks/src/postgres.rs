//! PostgreSQL repository backed by SeaORM and pgvector.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::entity::prelude::PgVector;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, FromQueryResult,
    QueryOrder, Set, Statement,
};
use uuid::Uuid;

use crate::entity::{self, Entity as Tasks};
use crate::error::{TaskError, TaskResult};
use crate::models::{CreateTask, Task, TaskStatus, UpdateTask};
use crate::repository::TaskRepository;

/// L2 nearest-neighbor query. sea_query cannot express the pgvector `<->`
/// operator, so this stays raw SQL. The status enum is cast to text so the
/// row can be read back without registering the custom type.
const NEAREST_SQL: &str = "\
    SELECT id, title, description, CAST(status AS text) AS status, \
           created_at, updated_at, embedding <-> $1 AS distance \
    FROM tasks \
    WHERE embedding IS NOT NULL \
    ORDER BY distance ASC, id ASC \
    LIMIT $2";

#[derive(Debug, FromQueryResult)]
struct NearestRow {
    id: Uuid,
    title: String,
    description: String,
    status: String,
    created_at: sea_orm::prelude::DateTimeWithTimeZone,
    updated_at: sea_orm::prelude::DateTimeWithTimeZone,
    distance: f64,
}

impl NearestRow {
    fn into_hit(self) -> TaskResult<(Task, f64)> {
        let status = TaskStatus::from_str(&self.status)
            .map_err(|e| TaskError::Database(format!("unknown task status: {}", e)))?;
        let task = Task {
            id: self.id,
            title: self.title,
            description: self.description,
            status,
            // the vector itself is not part of search results
            embedding: None,
            created_at: self.created_at.with_timezone(&Utc),
            updated_at: self.updated_at.with_timezone(&Utc),
        };
        Ok((task, self.distance))
    }
}

#[derive(Clone)]
pub struct PgTaskRepository {
    db: DatabaseConnection,
}

impl PgTaskRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn map_db_err(id: Option<Uuid>, err: DbErr) -> TaskError {
    match (id, &err) {
        (Some(id), DbErr::RecordNotUpdated) => TaskError::NotFound(id),
        (Some(id), DbErr::RecordNotFound(_)) => TaskError::NotFound(id),
        _ => TaskError::Database(err.to_string()),
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn insert(&self, input: CreateTask, embedding: Vec<f32>) -> TaskResult<Task> {
        let model = entity::new_task(input, embedding)
            .insert(&self.db)
            .await
            .map_err(|e| map_db_err(None, e))?;
        Ok(model.into())
    }

    async fn get_all(&self) -> TaskResult<Vec<Task>> {
        let models = Tasks::find()
            .order_by_asc(entity::Column::Id)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err(None, e))?;
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn get_by_id(&self, id: Uuid) -> TaskResult<Option<Task>> {
        let model = Tasks::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(|e| map_db_err(Some(id), e))?;
        Ok(model.map(Into::into))
    }

    async fn update(
        &self,
        id: Uuid,
        input: UpdateTask,
        embedding: Option<Vec<f32>>,
    ) -> TaskResult<Task> {
        let mut active = entity::ActiveModel {
            id: Set(id),
            ..Default::default()
        };

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(vector) = embedding {
            active.embedding = Set(Some(PgVector::from(vector)));
        }
        active.updated_at = Set(Utc::now().into());

        let model = active
            .update(&self.db)
            .await
            .map_err(|e| map_db_err(Some(id), e))?;
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> TaskResult<bool> {
        let result = Tasks::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(|e| map_db_err(Some(id), e))?;
        Ok(result.rows_affected > 0)
    }

    async fn nearest(&self, query: &[f32], k: usize) -> TaskResult<Vec<(Task, f64)>> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEAREST_SQL,
            [PgVector::from(query.to_vec()).into(), (k as i64).into()],
        );

        let rows = NearestRow::find_by_statement(stmt)
            .all(&self.db)
            .await
            .map_err(|e| map_db_err(None, e))?;

        rows.into_iter().map(NearestRow::into_hit).collect()
    }
}

//! SeaORM entity for the `tasks` table.

use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use uuid::Uuid;

use crate::models::{CreateTask, Task, TaskStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub status: TaskStatus,
    #[sea_orm(column_type = "Vector(Some(384))", nullable)]
    pub embedding: Option<PgVector>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Task {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            status: model.status,
            embedding: model.embedding.map(|v| v.to_vec()),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Builds a fresh active model for insertion; the embedding is required at
/// creation time.
pub fn new_task(input: CreateTask, embedding: Vec<f32>) -> ActiveModel {
    let now = Utc::now();
    ActiveModel {
        id: Set(Uuid::now_v7()),
        title: Set(input.title),
        description: Set(input.description),
        status: Set(input.status),
        embedding: Set(Some(PgVector::from(embedding))),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_keeps_embedding_dimension() {
        let input = CreateTask {
            title: "t".to_string(),
            description: "d".to_string(),
            status: TaskStatus::Todo,
        };

        let active = new_task(input, vec![0.5; 384]);
        match active.embedding {
            sea_orm::ActiveValue::Set(Some(vector)) => assert_eq!(vector.to_vec().len(), 384),
            other => panic!("embedding not set: {:?}", other),
        }
    }

    #[test]
    fn test_model_converts_to_task() {
        let now = Utc::now();
        let model = Model {
            id: Uuid::now_v7(),
            title: "t".to_string(),
            description: "d".to_string(),
            status: TaskStatus::Done,
            embedding: Some(PgVector::from(vec![1.0, 2.0])),
            created_at: now.into(),
            updated_at: now.into(),
        };

        let task: Task = model.into();
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.embedding, Some(vec![1.0, 2.0]));
    }
}

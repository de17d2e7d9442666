use sea_orm_migration::sea_query::extension::postgres::Type;
use sea_orm_migration::{prelude::*, schema::*};

/// Embedding dimension produced by all-MiniLM-L6-v2 compatible providers.
const EMBEDDING_DIM: u32 = 384;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // pgvector extension must exist before the vector column type is usable
        manager
            .get_connection()
            .execute_unprepared("CREATE EXTENSION IF NOT EXISTS vector")
            .await?;

        // Create task_status enum
        manager
            .create_type(
                Type::create()
                    .as_enum(TaskStatus::Enum)
                    .values([TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done])
                    .to_owned(),
            )
            .await?;

        // Create tasks table
        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(pk_uuid(Tasks::Id))
                    .col(string(Tasks::Title))
                    .col(text(Tasks::Description))
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .enumeration(
                                TaskStatus::Enum,
                                [TaskStatus::Todo, TaskStatus::InProgress, TaskStatus::Done],
                            )
                            .not_null()
                            .default("todo"),
                    )
                    .col(
                        ColumnDef::new(Tasks::Embedding)
                            .custom(Alias::new(&format!("vector({})", EMBEDDING_DIM)))
                            .null(),
                    )
                    .col(
                        timestamp_with_time_zone(Tasks::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        timestamp_with_time_zone(Tasks::UpdatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Create indexes
        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_status")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tasks_created_at")
                    .table(Tasks::Table)
                    .col(Tasks::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // HNSW index for L2 nearest-neighbor lookups; sea_query has no
        // vector index support, so raw DDL it is
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX idx_tasks_embedding_l2 ON tasks \
                 USING hnsw (embedding vector_l2_ops)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(TaskStatus::Enum).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Tasks {
    Table,
    Id,
    Title,
    Description,
    Status,
    Embedding,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum TaskStatus {
    #[sea_orm(iden = "task_status")]
    Enum,
    #[sea_orm(iden = "todo")]
    Todo,
    #[sea_orm(iden = "in_progress")]
    InProgress,
    #[sea_orm(iden = "done")]
    Done,
}

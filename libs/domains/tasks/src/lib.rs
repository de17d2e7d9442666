//! Task domain: CRUD plus semantic search over task descriptions.
//!
//! Every task description is embedded through an external provider and the
//! resulting vector is stored next to the row, so search is a pgvector L2
//! nearest-neighbor lookup.
//!
//! Architecture:
//!
//! ```text
//! handlers (axum)
//!     |
//! TaskService ----> EmbeddingClient (HTTP provider)
//!     |
//! TaskRepository (PgTaskRepository / InMemoryTaskRepository)
//! ```
//!
//! Embedding failures are handled per operation: create and search fail
//! hard, update degrades and keeps the stale vector.

pub mod embedding;
pub mod entity;
pub mod error;
pub mod handlers;
pub mod models;
pub mod postgres;
pub mod repository;
pub mod service;

pub use embedding::{EmbeddingClient, EmbeddingConfig, EmbeddingError, HttpEmbeddingClient};
pub use error::{TaskError, TaskResult};
pub use handlers::{ApiDoc, router};
pub use models::{CreateTask, SearchHit, SearchQuery, Task, TaskStatus, TaskUpdate, UpdateTask};
pub use postgres::PgTaskRepository;
pub use repository::{InMemoryTaskRepository, TaskRepository};
pub use service::{DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT, TaskService};

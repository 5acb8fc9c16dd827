/// Store-assigned job and image ids (PostgreSQL BIGSERIAL).
pub type DbId = i64;

/// External-facing prompt id handed to clients that never see `DbId`s.
pub type PromptId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Backend-assigned primary keys (the reference backend uses a BIGSERIAL-style counter).
pub type DbId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "text"))]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    ArchiveIngest,
}

impl Display for TaskType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskType::ArchiveIngest => write!(f, "archive_ingest"),
        }
    }
}

impl FromStr for TaskType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "archive_ingest" => Ok(TaskType::ArchiveIngest),
            _ => Err(anyhow::anyhow!("Invalid task type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "task_status", rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Scheduled,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Scheduled => write!(f, "scheduled"),
        }
    }
}

impl FromStr for TaskStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "scheduled" => Ok(TaskStatus::Scheduled),
            _ => Err(anyhow::anyhow!("Invalid task status: {}", s)),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 3,
    #[default]
    Normal = 5,
    High = 7,
}

impl Priority {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(value: i32) -> Self {
        match value {
            0..=3 => Priority::Low,
            4..=6 => Priority::Normal,
            _ => Priority::High,
        }
    }
}

impl From<Priority> for i32 {
    fn from(priority: Priority) -> Self {
        priority as i32
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub priority: i32,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub max_attempts: i32,
    pub timeout_seconds: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(feature = "sqlx")]
impl sqlx::FromRow<'_, sqlx::postgres::PgRow> for Task {
    fn from_row(row: &sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(Task {
            id: row.get("id"),
            task_type: row.get::<String, _>("task_type").parse().map_err(|e| {
                sqlx::Error::Decode(format!("Failed to parse task_type: {}", e).into())
            })?,
            status: row.get("status"),
            priority: row.get("priority"),
            payload: row.get("payload"),
            result: row.get("result"),
            scheduled_at: row.get("scheduled_at"),
            started_at: row.get("started_at"),
            completed_at: row.get("completed_at"),
            retry_count: row.get("retry_count"),
            max_attempts: row.get("max_attempts"),
            timeout_seconds: row.get("timeout_seconds"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

impl Task {
    pub fn is_ready_to_run(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::Scheduled)
            && self.scheduled_at <= Utc::now()
    }

    /// Whether a failed attempt leaves room for another within the attempt
    /// budget. `retry_count` counts retries already consumed, so a task with
    /// `max_attempts = 3` runs at most three times.
    pub fn can_retry(&self) -> bool {
        self.retry_count + 1 < self.max_attempts
    }

    /// Extract the payload as a typed struct, returning an error on failure.
    pub fn try_payload_as<P: TaskPayload>(&self) -> Result<P, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }

    /// Create a new payload value from a typed struct.
    pub fn payload_from<P: TaskPayload>(payload: &P) -> serde_json::Value {
        serde_json::to_value(payload).unwrap_or_default()
    }
}

/// Trait for type-safe task payloads.
pub trait TaskPayload: Serialize + for<'de> Deserialize<'de> {
    fn task_type() -> TaskType;
}

/// Payload of an archive ingestion job: the temp path the uploaded ZIP was
/// written to and the optional purchase cutoff to stamp on created events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveIngestPayload {
    pub archive_path: PathBuf,
    pub order_deadline: Option<DateTime<Utc>>,
}

impl TaskPayload for ArchiveIngestPayload {
    fn task_type() -> TaskType {
        TaskType::ArchiveIngest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_round_trip() {
        assert_eq!(
            "archive_ingest".parse::<TaskType>().unwrap(),
            TaskType::ArchiveIngest
        );
        assert_eq!(TaskType::ArchiveIngest.to_string(), "archive_ingest");
        assert!("gift_wrap".parse::<TaskType>().is_err());
    }

    #[test]
    fn archive_ingest_payload_round_trip() {
        let payload = ArchiveIngestPayload {
            archive_path: PathBuf::from("/tmp/upload.zip"),
            order_deadline: None,
        };
        let value = serde_json::to_value(&payload).unwrap();
        let back: ArchiveIngestPayload = serde_json::from_value(value).unwrap();
        assert_eq!(back.archive_path, PathBuf::from("/tmp/upload.zip"));
        assert!(back.order_deadline.is_none());
    }

    #[test]
    fn attempt_budget_counts_the_first_run() {
        let mut task = Task {
            id: Uuid::new_v4(),
            task_type: TaskType::ArchiveIngest,
            status: TaskStatus::Running,
            priority: 5,
            payload: serde_json::Value::Null,
            result: None,
            scheduled_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retry_count: 0,
            max_attempts: 3,
            timeout_seconds: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        // First failure: two attempts used after the retry, one left.
        assert!(task.can_retry());
        task.retry_count = 1;
        assert!(task.can_retry());
        // Third attempt failing exhausts the budget.
        task.retry_count = 2;
        assert!(!task.can_retry());
    }

    #[test]
    fn priority_mapping() {
        assert_eq!(Priority::from_i32(5), Priority::Normal);
        assert_eq!(Priority::from_i32(2), Priority::Low);
        assert_eq!(Priority::from_i32(9), Priority::High);
        assert_eq!(Priority::Normal.as_i32(), 5);
    }
}

use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

use crate::models::conflict::Conflict;
use crate::services::rule_parser::ParseError;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("验证失败: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        details: Option<JsonValue>,
    },

    #[error("记录未找到")]
    NotFound,

    #[error("规则解析失败: {0}")]
    Parse(#[from] ParseError),

    #[error("存在不可覆盖的排班冲突")]
    ConflictBlocked { conflicts: Vec<Conflict> },

    #[error("存在需要管理员确认的排班冲突")]
    OverrideRequired { conflicts: Vec<Conflict> },

    #[error("排班已被其他用户修改 (期望版本 {expected}, 当前版本 {current})")]
    VersionConflict { expected: i64, current: i64 },

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl EngineError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "engine::validation", %message, "validation error");
        EngineError::Validation {
            message,
            source: None,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "engine::validation", %message, details = %details, "validation error with details");
        EngineError::Validation {
            message,
            source: None,
            details: Some(details),
        }
    }

    pub fn conflict_blocked(conflicts: Vec<Conflict>) -> Self {
        warn!(
            target: "engine::commit",
            count = conflicts.len(),
            "commit blocked by non-overridable conflicts"
        );
        EngineError::ConflictBlocked { conflicts }
    }

    pub fn override_required(conflicts: Vec<Conflict>) -> Self {
        warn!(
            target: "engine::commit",
            count = conflicts.len(),
            "commit requires explicit override acknowledgement"
        );
        EngineError::OverrideRequired { conflicts }
    }

    pub fn version_conflict(expected: i64, current: i64) -> Self {
        warn!(
            target: "engine::commit",
            expected,
            current,
            "stale assignment version rejected"
        );
        EngineError::VersionConflict { expected, current }
    }

    pub fn not_found() -> Self {
        warn!(target: "engine::repository", "resource not found");
        EngineError::NotFound
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "engine::other", %message, "other error");
        EngineError::Other(message)
    }

    /// Conflicts attached to a commit rejection, if any.
    pub fn conflicts(&self) -> Option<&[Conflict]> {
        match self {
            EngineError::ConflictBlocked { conflicts } => Some(conflicts),
            EngineError::OverrideRequired { conflicts } => Some(conflicts),
            _ => None,
        }
    }
}

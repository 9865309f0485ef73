use crate::domain::model::{CardId, Credits, FormErrors, ReadingRecord};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Form validation failed: {0}")]
    ValidationError(FormErrors),

    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCreditsError { required: Credits, available: Credits },

    #[error("Authentication required for {reading_type} readings")]
    AuthenticationRequiredError { reading_type: String },

    #[error("Card {card_id} has already been drawn in this session")]
    DuplicateDrawError { card_id: CardId },

    #[error("All {position_count} positions are already filled")]
    BoardFullError { position_count: usize },

    #[error("Card {card_id} is not part of the catalogue")]
    UnknownCardError { card_id: CardId },

    #[error("Cannot {action} during the {phase} phase")]
    InvalidTransitionError { action: String, phase: String },

    #[error("Persistence failed: {message}")]
    PersistenceError { message: String },

    #[error("Reading already stored under idempotency key {key}")]
    DuplicateSubmissionError {
        key: String,
        record: Box<ReadingRecord>,
    },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Credits,
    Authentication,
    Board,
    Persistence,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EngineError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::PersistenceError {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationError(_) => ErrorCategory::Validation,
            Self::InsufficientCreditsError { .. } => ErrorCategory::Credits,
            Self::AuthenticationRequiredError { .. } => ErrorCategory::Authentication,
            Self::DuplicateDrawError { .. }
            | Self::BoardFullError { .. }
            | Self::UnknownCardError { .. }
            | Self::InvalidTransitionError { .. } => ErrorCategory::Board,
            Self::PersistenceError { .. }
            | Self::DuplicateSubmissionError { .. }
            | Self::HttpError(_) => ErrorCategory::Persistence,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => ErrorCategory::Configuration,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation | ErrorCategory::Board => ErrorSeverity::Low,
            ErrorCategory::Credits | ErrorCategory::Authentication => ErrorSeverity::Medium,
            ErrorCategory::Persistence => match self {
                Self::DuplicateSubmissionError { .. } => ErrorSeverity::Low,
                _ => ErrorSeverity::Medium,
            },
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 失敗的命令一律非 0：處理錯誤 1、可重試 2、系統錯誤 3
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    /// 是否需要以通知方式呈現給使用者（表單錯誤與抽牌 no-op 不呈現）
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::InsufficientCreditsError { .. }
                | Self::AuthenticationRequiredError { .. }
                | Self::PersistenceError { .. }
                | Self::HttpError(_)
        )
    }

    /// 可由使用者以相同 idempotency key 重試
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PersistenceError { .. } | Self::HttpError(_))
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::ValidationError(errors) => {
                format!("Please fix {} form field(s) before continuing", errors.len())
            }
            Self::InsufficientCreditsError { required, available } => format!(
                "This reading needs {} credits but your balance is {}",
                required, available
            ),
            Self::AuthenticationRequiredError { .. } => {
                "Please sign in to use paid reading types".to_string()
            }
            Self::DuplicateDrawError { .. } | Self::BoardFullError { .. } => {
                "That card cannot be placed".to_string()
            }
            Self::UnknownCardError { card_id } => format!("Unknown card {}", card_id),
            Self::InvalidTransitionError { action, phase } => {
                format!("Cannot {} right now ({})", action, phase)
            }
            Self::PersistenceError { .. } | Self::HttpError(_) => {
                "Your reading could not be saved".to_string()
            }
            Self::DuplicateSubmissionError { .. } => "This reading is already saved".to_string(),
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::ConfigValidationError { .. } => format!("Configuration problem: {}", self),
            Self::IoError(e) => format!("File system error: {}", e),
            Self::SerializationError(e) => format!("Data format error: {}", e),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Correct the highlighted fields and save the form again",
            ErrorCategory::Credits => "Purchase more credits from the credits page",
            ErrorCategory::Authentication => "Sign in and select the reading type again",
            ErrorCategory::Board => "Continue with the next empty position",
            ErrorCategory::Persistence => "Retry the submission; it will not be charged twice",
            ErrorCategory::Configuration => "Check the configuration file and command line flags",
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

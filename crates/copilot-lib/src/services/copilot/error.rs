// Copilot Error Types
// Feature: AI Copilot orchestration core
//
// One error enum for every failure the copilot core can observe. Detection
// failures never leave the detector; turn failures end up inline in the
// assistant message via `to_user_message`.

use thiserror::Error;

/// Copilot Error
#[derive(Error, Debug, Clone)]
pub enum CopilotError {
    /// Tool registry rejected at construction time
    #[error("Invalid tool registry: {0}")]
    InvalidRegistry(String),

    /// Requested tool id is not registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Connection failed
    #[error("Cannot connect to AI service: {0}")]
    ConnectionFailed(String),

    /// Request timeout
    #[error("AI service response timeout")]
    Timeout,

    /// API error from the remote service
    #[error("AI service error: {0}")]
    ApiError(String),

    /// JSON parsing error
    #[error("Response parse error: {0}")]
    ParseError(String),

    /// Remote tool classification failed or returned an error payload
    #[error("Tool classification failed: {0}")]
    ClassificationFailed(String),

    /// Tool handler rejected the submission
    #[error("Tool handler failed: {0}")]
    HandlerFailed(String),

    /// Stream rejected mid-read
    #[error("Response stream failed: {0}")]
    StreamFailed(String),

    /// Canvas item extractor failed
    #[error("Canvas item parse error: {0}")]
    CanvasParseFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Storage error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for CopilotError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CopilotError::Timeout
        } else if err.is_connect() {
            CopilotError::ConnectionFailed(err.to_string())
        } else if err.is_decode() {
            CopilotError::ParseError(err.to_string())
        } else {
            CopilotError::ApiError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CopilotError {
    fn from(err: serde_json::Error) -> Self {
        CopilotError::ParseError(err.to_string())
    }
}

impl From<std::io::Error> for CopilotError {
    fn from(err: std::io::Error) -> Self {
        CopilotError::IoError(err.to_string())
    }
}

/// Result type for copilot operations
pub type CopilotResult<T> = Result<T, CopilotError>;

/// Copilot error codes for the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopilotErrorCode {
    InvalidRegistry,
    ToolNotFound,
    ConnectionFailed,
    Timeout,
    ApiError,
    ParseError,
    ClassificationFailed,
    HandlerFailed,
    StreamFailed,
    CanvasParseFailed,
    IoError,
    StorageError,
    InvalidConfig,
}

impl CopilotErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CopilotErrorCode::InvalidRegistry => "COPILOT_INVALID_REGISTRY",
            CopilotErrorCode::ToolNotFound => "COPILOT_TOOL_NOT_FOUND",
            CopilotErrorCode::ConnectionFailed => "COPILOT_CONNECTION_FAILED",
            CopilotErrorCode::Timeout => "COPILOT_TIMEOUT",
            CopilotErrorCode::ApiError => "COPILOT_API_ERROR",
            CopilotErrorCode::ParseError => "COPILOT_PARSE_ERROR",
            CopilotErrorCode::ClassificationFailed => "COPILOT_CLASSIFICATION_FAILED",
            CopilotErrorCode::HandlerFailed => "COPILOT_HANDLER_FAILED",
            CopilotErrorCode::StreamFailed => "COPILOT_STREAM_FAILED",
            CopilotErrorCode::CanvasParseFailed => "COPILOT_CANVAS_PARSE_FAILED",
            CopilotErrorCode::IoError => "COPILOT_IO_ERROR",
            CopilotErrorCode::StorageError => "COPILOT_STORAGE_ERROR",
            CopilotErrorCode::InvalidConfig => "COPILOT_INVALID_CONFIG",
        }
    }
}

impl CopilotError {
    pub fn code(&self) -> CopilotErrorCode {
        match self {
            CopilotError::InvalidRegistry(_) => CopilotErrorCode::InvalidRegistry,
            CopilotError::ToolNotFound(_) => CopilotErrorCode::ToolNotFound,
            CopilotError::ConnectionFailed(_) => CopilotErrorCode::ConnectionFailed,
            CopilotError::Timeout => CopilotErrorCode::Timeout,
            CopilotError::ApiError(_) => CopilotErrorCode::ApiError,
            CopilotError::ParseError(_) => CopilotErrorCode::ParseError,
            CopilotError::ClassificationFailed(_) => CopilotErrorCode::ClassificationFailed,
            CopilotError::HandlerFailed(_) => CopilotErrorCode::HandlerFailed,
            CopilotError::StreamFailed(_) => CopilotErrorCode::StreamFailed,
            CopilotError::CanvasParseFailed(_) => CopilotErrorCode::CanvasParseFailed,
            CopilotError::IoError(_) => CopilotErrorCode::IoError,
            CopilotError::StorageError(_) => CopilotErrorCode::StorageError,
            CopilotError::InvalidConfig(_) => CopilotErrorCode::InvalidConfig,
        }
    }

    /// Text shown inline as the assistant reply when a turn fails
    pub fn to_user_message(&self) -> String {
        format!("Sorry, I ran into a problem while answering: {}", self)
    }
}

impl From<CopilotError> for String {
    fn from(err: CopilotError) -> Self {
        err.to_string()
    }
}

use rusqlite;
use std::io;
use thiserror::Error;

/// Stable machine-readable codes for domain-level failures.
///
/// The wire string (see [`ErrorCode::as_str`]) is a compatibility surface:
/// callers match on it, so variants are never renamed, only added.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotEnactable,
    RsgMalformed,
    WindowInvalid,
    EligibilityViolation,
    SodConflict,
    BridgeClTooLow,
    MixedScale,
    GammaMistyped,
    WorkAlreadyEnded,
    NotFound,
    ReadOnly,
    StoreCorrupt,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotEnactable => "RSG.NOT_ENACTABLE",
            ErrorCode::RsgMalformed => "RSG.MALFORMED",
            ErrorCode::WindowInvalid => "WIN.INVALID",
            ErrorCode::EligibilityViolation => "ELIG.VIOLATION",
            ErrorCode::SodConflict => "SOD.CONFLICT",
            ErrorCode::BridgeClTooLow => "BRIDGE.CL_TOO_LOW",
            ErrorCode::MixedScale => "CG.MIXED_SCALE",
            ErrorCode::GammaMistyped => "Γ.MISTYPED",
            ErrorCode::WorkAlreadyEnded => "WORK.ALREADY_ENDED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::ReadOnly => "READONLY",
            ErrorCode::StoreCorrupt => "STORE.CORRUPT",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("SQLite error: {0}")]
    Rusqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(String),
    #[error("{code}: {message}")]
    Domain { code: ErrorCode, message: String },
}

impl LedgerError {
    pub fn domain(code: ErrorCode, message: impl Into<String>) -> Self {
        LedgerError::Domain {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::domain(ErrorCode::NotFound, format!("not found: {}", what))
    }

    /// The stable code for domain failures; infrastructure errors have none.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            LedgerError::Domain { code, .. } => Some(*code),
            _ => None,
        }
    }
}

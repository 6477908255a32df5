use std::fmt;

use crate::event::codec::CodecError;
use crate::model::ids::{ItemId, LocationId, UserId};

/// Machine-readable error codes for callers that branch on failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ItemNotFound,
    LocationNotFound,
    UserNotFound,
    PositionUnknown,
    InvalidInput,
    DuplicateIdentifier,
    ItemDeleted,
    ItemNotDeleted,
    UnknownEventKind,
    MalformedPayload,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ItemNotFound => "E2001",
            Self::LocationNotFound => "E2002",
            Self::UserNotFound => "E2003",
            Self::PositionUnknown => "E2004",
            Self::InvalidInput => "E2101",
            Self::DuplicateIdentifier => "E2201",
            Self::ItemDeleted => "E2202",
            Self::ItemNotDeleted => "E2203",
            Self::UnknownEventKind => "E3001",
            Self::MalformedPayload => "E3002",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ItemNotFound => "Item not found",
            Self::LocationNotFound => "Location not found",
            Self::UserNotFound => "User not found",
            Self::PositionUnknown => "Item has no recorded position",
            Self::InvalidInput => "Invalid input",
            Self::DuplicateIdentifier => "Identifier already in use",
            Self::ItemDeleted => "Item is deleted",
            Self::ItemNotDeleted => "Item is not deleted",
            Self::UnknownEventKind => "Unknown history event kind",
            Self::MalformedPayload => "Malformed history payload",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ItemNotFound | Self::PositionUnknown => None,
            Self::LocationNotFound => {
                Some("Use `sr location list` to find a valid, non-deleted location id.")
            }
            Self::UserNotFound => Some("Use `sr user list` to find a valid user id."),
            Self::InvalidInput => Some("Check the required fields and retry."),
            Self::DuplicateIdentifier => Some("Choose a different identifier or omit it."),
            Self::ItemDeleted => Some("Restore the item with `sr restore` first."),
            Self::ItemNotDeleted => None,
            Self::UnknownEventKind | Self::MalformedPayload => {
                Some("The history row was written by an incompatible version; it is skipped when listing.")
            }
            Self::StorageFailure => Some("Retry once. If persistent, check disk space and permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Coarse error taxonomy used by boundary layers to pick a response class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    NotFound,
    Validation,
    Conflict,
    CorruptData,
    Storage,
}

impl ErrorClass {
    /// Whether the caller (rather than the system) is at fault.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::NotFound | Self::Validation | Self::Conflict)
    }
}

/// Errors raised by the history engine and the lifecycle coordinator.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("item {item_id} not found")]
    ItemNotFound { item_id: ItemId },

    #[error("location {location_id} not found")]
    LocationNotFound { location_id: LocationId },

    #[error("user {user_id} not found")]
    UserNotFound { user_id: UserId },

    /// The item exists but no positional event was ever recorded for it.
    #[error("item {item_id} has no positional history event")]
    PositionUnknown { item_id: ItemId },

    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("identifier '{identifier}' is already used by another item")]
    DuplicateIdentifier { identifier: String },

    #[error("item {item_id} is deleted")]
    ItemDeleted { item_id: ItemId },

    #[error("item {item_id} is not deleted")]
    ItemNotDeleted { item_id: ItemId },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl StoreError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::ItemNotFound { .. } => ErrorCode::ItemNotFound,
            Self::LocationNotFound { .. } => ErrorCode::LocationNotFound,
            Self::UserNotFound { .. } => ErrorCode::UserNotFound,
            Self::PositionUnknown { .. } => ErrorCode::PositionUnknown,
            Self::Validation { .. } => ErrorCode::InvalidInput,
            Self::DuplicateIdentifier { .. } => ErrorCode::DuplicateIdentifier,
            Self::ItemDeleted { .. } => ErrorCode::ItemDeleted,
            Self::ItemNotDeleted { .. } => ErrorCode::ItemNotDeleted,
            Self::Codec(CodecError::UnknownEventKind { .. }) => ErrorCode::UnknownEventKind,
            Self::Codec(CodecError::MalformedPayload { .. }) => ErrorCode::MalformedPayload,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::ItemNotFound { .. }
            | Self::LocationNotFound { .. }
            | Self::UserNotFound { .. }
            | Self::PositionUnknown { .. } => ErrorClass::NotFound,
            Self::Validation { .. } => ErrorClass::Validation,
            Self::DuplicateIdentifier { .. }
            | Self::ItemDeleted { .. }
            | Self::ItemNotDeleted { .. } => ErrorClass::Conflict,
            Self::Codec(_) => ErrorClass::CorruptData,
            Self::Storage(_) => ErrorClass::Storage,
        }
    }

    /// True for the not-found variants.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self.class(), ErrorClass::NotFound)
    }
}

/// Result alias for store operations.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

use core::fmt;

use crate::{ComponentCategory, IdentifierStatus, Namespace, Operation};

/// A result type defaulting to the crate-wide [`enum@Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All errors that `sctid` can produce.
///
/// Codec and state-machine violations always surface through this type. The
/// only conditions absorbed without an error are the idempotent no-ops of the
/// lifecycle (for example publishing an already published identifier), which
/// are logged instead.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The identifier is structurally invalid: wrong length, non-digit
    /// characters, unknown partition, or a failing Verhoeff check digit.
    #[error("malformed identifier `{id}`: {reason}")]
    MalformedIdentifier {
        /// The offending input, verbatim.
        id: String,
        /// Why the input was rejected.
        reason: MalformedReason,
    },

    /// A namespace that is not exactly seven digits without a leading zero.
    #[error("invalid namespace `{namespace}`: expected 7 digits without a leading zero")]
    InvalidNamespace {
        /// The offending namespace, verbatim.
        namespace: String,
    },

    /// An item id outside the range representable for the namespace format.
    #[error("item id {item_id} is out of range for namespace {namespace}")]
    InvalidItemId {
        /// The rejected item id.
        item_id: u64,
        /// The namespace the item id was rendered into.
        namespace: Namespace,
    },

    /// No free candidate was found within the configured attempt budget.
    ///
    /// This is retryable by the caller (later, or in a wider namespace).
    #[error("no free {category} identifier in namespace {namespace} after {attempts} attempts")]
    GenerationExhausted {
        /// Namespace the allocation was requested for.
        namespace: Namespace,
        /// Category the allocation was requested for.
        category: ComponentCategory,
        /// Number of candidates tried.
        attempts: usize,
    },

    /// The operation is not permitted from the identifier's current status.
    #[error("cannot {operation} identifier `{id}` in status {status}")]
    InvalidState {
        /// The identifier the operation targeted.
        id: String,
        /// The status the identifier was found in.
        status: IdentifierStatus,
        /// The rejected operation.
        operation: Operation,
    },

    /// An all-or-nothing bulk registration could not be applied.
    #[error("bulk registration failed for {offending:?} (reverted: {reverted})")]
    PartialBulkFailure {
        /// Identifiers that could not be registered.
        offending: Vec<String>,
        /// `true` once every write made by the call has been undone.
        reverted: bool,
    },

    /// The backing store could not serve the request.
    #[error("identifier store unavailable: {reason}")]
    StoreUnavailable {
        /// Backend-specific description of the failure.
        reason: String,
    },

    /// The caller's cancellation signal fired before the operation finished.
    #[error("operation cancelled after {completed} identifiers")]
    Cancelled {
        /// Identifiers processed before cancellation was observed.
        completed: usize,
    },
}

impl Error {
    /// Returns `true` for conditions a caller may reasonably retry later.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::GenerationExhausted { .. } | Self::StoreUnavailable { .. }
        )
    }

    pub(crate) fn malformed(id: &str, reason: MalformedReason) -> Self {
        Self::MalformedIdentifier {
            id: id.to_owned(),
            reason,
        }
    }
}

/// Why a string failed to parse as an SCTID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum MalformedReason {
    /// The input was empty.
    Empty,
    /// The input contained something other than ASCII digits.
    NonDigit,
    /// The input was shorter than 6 or longer than 18 digits.
    Length {
        /// Observed length.
        len: usize,
    },
    /// The input started with `0`.
    LeadingZero,
    /// The partition identifier did not name a known format and category.
    Partition,
    /// A long-format identifier carried an invalid namespace.
    Namespace,
    /// The trailing digit is not the Verhoeff check digit of the rest.
    Checksum {
        /// The check digit found in the input.
        found: u8,
        /// The check digit computed over the preceding digits.
        expected: u8,
    },
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty input"),
            Self::NonDigit => f.write_str("non-digit character"),
            Self::Length { len } => write!(f, "invalid length {len}, expected 6..=18"),
            Self::LeadingZero => f.write_str("leading zero"),
            Self::Partition => f.write_str("unknown partition identifier"),
            Self::Namespace => f.write_str("invalid namespace segment"),
            Self::Checksum { found, expected } => {
                write!(f, "check digit {found} does not match {expected}")
            }
        }
    }
}

use core::fmt;

/// Lifecycle status of an identifier.
///
/// `Available` is virtual: it is never stored, and an identifier without a
/// record in the store is implicitly available.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IdentifierStatus {
    #[default]
    Available,
    Reserved,
    Assigned,
    Published,
    Deprecated,
}

impl IdentifierStatus {
    /// The serialized name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "Available",
            Self::Reserved => "Reserved",
            Self::Assigned => "Assigned",
            Self::Published => "Published",
            Self::Deprecated => "Deprecated",
        }
    }

    /// `true` for statuses that are backed by a stored record.
    #[must_use]
    pub const fn is_stored(self) -> bool {
        !matches!(self, Self::Available)
    }
}

impl fmt::Display for IdentifierStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use crate::{ComponentCategory, IdentifierStatus, Namespace, Sctid};

/// The persisted state of one identifier.
///
/// Exactly one record exists per reserved, assigned, published or deprecated
/// identifier. Released identifiers have their record removed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct IdentifierRecord {
    /// The full SCTID text.
    pub id: String,
    pub status: IdentifierStatus,
    pub namespace: Namespace,
    /// Two digit partition identifier: format digit then category digit.
    pub partition_id: String,
    /// The item id (sequence) component.
    pub sequence: u64,
    pub check_digit: u8,
}

impl IdentifierRecord {
    /// Creates a record for `sctid` in the given status.
    #[must_use]
    pub fn new(sctid: &Sctid, status: IdentifierStatus) -> Self {
        Self {
            id: sctid.as_str().to_owned(),
            status,
            namespace: sctid.namespace(),
            partition_id: sctid.partition_id(),
            sequence: sctid.item_id(),
            check_digit: sctid.check_digit(),
        }
    }

    /// Returns a copy of this record moved to `status`.
    #[must_use]
    pub fn with_status(&self, status: IdentifierStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// The category encoded in the partition identifier.
    #[must_use]
    pub fn category(&self) -> Option<ComponentCategory> {
        let digit = self.partition_id.bytes().nth(1)?.checked_sub(b'0')?;
        ComponentCategory::from_digit(digit)
    }
}

impl From<&Sctid> for IdentifierRecord {
    fn from(sctid: &Sctid) -> Self {
        Self::new(sctid, IdentifierStatus::Available)
    }
}

use core::fmt;

use crate::IdentifierStatus;

/// An allocator operation that changes identifier state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Operation {
    Generate,
    Reserve,
    Register,
    Deprecate,
    Release,
    Publish,
}

/// What an [`Operation`] does to an identifier in a given status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Plan {
    /// Move to the given status. [`IdentifierStatus::Available`] means the
    /// record is removed.
    Move(IdentifierStatus),
    /// Already in the operation's target state; nothing to write.
    Noop,
    /// Not permitted from this status.
    Reject,
}

impl Operation {
    pub const ALL: [Self; 6] = [
        Self::Generate,
        Self::Reserve,
        Self::Register,
        Self::Deprecate,
        Self::Release,
        Self::Publish,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generate => "generate",
            Self::Reserve => "reserve",
            Self::Register => "register",
            Self::Deprecate => "deprecate",
            Self::Release => "release",
            Self::Publish => "publish",
        }
    }

    /// The lifecycle table.
    ///
    /// | Operation   | Moves                            | No-op from          |
    /// |-------------|----------------------------------|---------------------|
    /// | `generate`  | available → assigned             |                     |
    /// | `reserve`   | available → reserved             |                     |
    /// | `register`  | available, reserved → assigned   | assigned, published |
    /// | `deprecate` | assigned, published → deprecated | deprecated          |
    /// | `release`   | assigned, reserved → available   | available           |
    /// | `publish`   | assigned → published             | published           |
    ///
    /// Every other combination is rejected.
    #[must_use]
    pub const fn plan(self, from: IdentifierStatus) -> Plan {
        use IdentifierStatus::{Assigned, Available, Deprecated, Published, Reserved};

        match (self, from) {
            (Self::Generate, Available) | (Self::Register, Available | Reserved) => {
                Plan::Move(Assigned)
            }
            (Self::Reserve, Available) => Plan::Move(Reserved),
            (Self::Deprecate, Assigned | Published) => Plan::Move(Deprecated),
            (Self::Release, Assigned | Reserved) => Plan::Move(Available),
            (Self::Publish, Assigned) => Plan::Move(Published),
            (Self::Register, Assigned | Published)
            | (Self::Deprecate, Deprecated)
            | (Self::Release, Available)
            | (Self::Publish, Published) => Plan::Noop,
            _ => Plan::Reject,
        }
    }

    /// The status an identifier ends up in after the operation succeeds.
    #[must_use]
    pub const fn target(self) -> IdentifierStatus {
        match self {
            Self::Generate | Self::Register => IdentifierStatus::Assigned,
            Self::Reserve => IdentifierStatus::Reserved,
            Self::Deprecate => IdentifierStatus::Deprecated,
            Self::Release => IdentifierStatus::Available,
            Self::Publish => IdentifierStatus::Published,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdentifierStatus::{Assigned, Available, Deprecated, Published, Reserved};

    #[test]
    fn lifecycle_table() {
        #[rustfmt::skip]
        let rows = [
            (Operation::Register, [Plan::Move(Assigned), Plan::Move(Assigned), Plan::Noop, Plan::Noop, Plan::Reject]),
            (Operation::Deprecate, [Plan::Reject, Plan::Reject, Plan::Move(Deprecated), Plan::Move(Deprecated), Plan::Noop]),
            (Operation::Release, [Plan::Noop, Plan::Move(Available), Plan::Move(Available), Plan::Reject, Plan::Reject]),
            (Operation::Publish, [Plan::Reject, Plan::Reject, Plan::Move(Published), Plan::Noop, Plan::Reject]),
            (Operation::Generate, [Plan::Move(Assigned), Plan::Reject, Plan::Reject, Plan::Reject, Plan::Reject]),
            (Operation::Reserve, [Plan::Move(Reserved), Plan::Reject, Plan::Reject, Plan::Reject, Plan::Reject]),
        ];
        let from = [Available, Reserved, Assigned, Published, Deprecated];

        for (operation, expected) in rows {
            for (status, plan) in from.into_iter().zip(expected) {
                assert_eq!(operation.plan(status), plan, "{operation} from {status}");
            }
        }
    }

    #[test]
    fn moves_land_on_target() {
        let from = [Available, Reserved, Assigned, Published, Deprecated];
        for operation in Operation::ALL {
            for status in from {
                if let Plan::Move(to) = operation.plan(status) {
                    assert_eq!(to, operation.target());
                }
            }
        }
    }

    #[test]
    fn displays_lowercase() {
        assert_eq!(Operation::Publish.to_string(), "publish");
        assert_eq!(Operation::Register.as_str(), "register");
    }
}

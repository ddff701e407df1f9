use core::{fmt, str::FromStr};

/// The kind of component an identifier names.
///
/// The discriminant is the partition digit rendered into every SCTID, so the
/// order of the variants is part of the identifier format and must never
/// change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ComponentCategory {
    Concept = 0,
    Description = 1,
    Relationship = 2,
}

impl ComponentCategory {
    /// Every category, in partition-digit order.
    pub const ALL: [Self; 3] = [Self::Concept, Self::Description, Self::Relationship];

    /// The partition digit encoding this category.
    #[must_use]
    pub const fn digit(self) -> u8 {
        self as u8
    }

    /// Resolves a partition digit back to its category.
    #[must_use]
    pub const fn from_digit(digit: u8) -> Option<Self> {
        match digit {
            0 => Some(Self::Concept),
            1 => Some(Self::Description),
            2 => Some(Self::Relationship),
            _ => None,
        }
    }

    /// Human readable name, as used in logs and error messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Concept => "concept",
            Self::Description => "description",
            Self::Relationship => "relationship",
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Returned when a string does not name a [`ComponentCategory`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown component category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for ComponentCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.display_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownCategory(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_follow_declaration_order() {
        for (index, category) in ComponentCategory::ALL.into_iter().enumerate() {
            assert_eq!(usize::from(category.digit()), index);
            assert_eq!(ComponentCategory::from_digit(category.digit()), Some(category));
        }
        assert_eq!(ComponentCategory::from_digit(3), None);
    }

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Concept".parse(), Ok(ComponentCategory::Concept));
        assert_eq!("RELATIONSHIP".parse(), Ok(ComponentCategory::Relationship));
        assert!("refset".parse::<ComponentCategory>().is_err());
    }
}

use core::{fmt, ops::RangeInclusive, str::FromStr};

use crate::{Error, Result};

const NAMESPACE_MIN: u32 = 1_000_000;
const NAMESPACE_MAX: u32 = 9_999_999;

/// Item ids available to the short (international) format.
pub const SHORT_ITEM_IDS: RangeInclusive<u64> = 100..=999_999_999_999_999;

/// Item ids available to the long (namespaced) format.
pub const LONG_ITEM_IDS: RangeInclusive<u64> = 1..=99_999_999;

/// The issuing authority embedded in an identifier.
///
/// The international namespace has no digits of its own and renders the
/// short format (`0` format digit). Every other namespace is a seven digit
/// code that is rendered in front of a `1` format digit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(into = "Option<String>", try_from = "Option<String>")
)]
pub struct Namespace(Option<u32>);

impl Namespace {
    /// The namespace-less (short format) space.
    pub const INTERNATIONAL: Self = Self(None);

    /// Parses a seven digit namespace. An empty string yields
    /// [`Namespace::INTERNATIONAL`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNamespace`] if the input is not empty and not a
    /// seven digit code without a leading zero.
    pub fn new(namespace: &str) -> Result<Self> {
        if namespace.is_empty() {
            return Ok(Self::INTERNATIONAL);
        }
        let invalid = || Error::InvalidNamespace {
            namespace: namespace.to_owned(),
        };
        if namespace.len() != 7 || !namespace.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let code: u32 = namespace.parse().map_err(|_| invalid())?;
        Self::from_code(code).ok_or_else(invalid)
    }

    /// Same as [`Namespace::new`], treating `None` as international.
    ///
    /// # Errors
    ///
    /// See [`Namespace::new`].
    pub fn from_optional(namespace: Option<&str>) -> Result<Self> {
        namespace.map_or(Ok(Self::INTERNATIONAL), Self::new)
    }

    /// Builds a namespace from its numeric code.
    #[must_use]
    pub const fn from_code(code: u32) -> Option<Self> {
        if code >= NAMESPACE_MIN && code <= NAMESPACE_MAX {
            Some(Self(Some(code)))
        } else {
            None
        }
    }

    /// The numeric namespace code, `None` for the international namespace.
    #[must_use]
    pub const fn code(self) -> Option<u32> {
        self.0
    }

    #[must_use]
    pub const fn is_international(self) -> bool {
        self.0.is_none()
    }

    /// The first digit of the partition identifier: `0` for the short format,
    /// `1` for the long (namespaced) format.
    #[must_use]
    pub const fn format_digit(self) -> u8 {
        match self.0 {
            None => 0,
            Some(_) => 1,
        }
    }

    /// The item ids that can be rendered into this namespace.
    #[must_use]
    pub const fn item_ids(self) -> RangeInclusive<u64> {
        match self.0 {
            None => SHORT_ITEM_IDS,
            Some(_) => LONG_ITEM_IDS,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            None => f.write_str("international"),
            Some(code) => write!(f, "{code}"),
        }
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Namespace> for Option<String> {
    fn from(namespace: Namespace) -> Self {
        namespace.0.map(|code| code.to_string())
    }
}

impl TryFrom<Option<String>> for Namespace {
    type Error = Error;

    fn try_from(namespace: Option<String>) -> Result<Self> {
        Self::from_optional(namespace.as_deref())
    }
}

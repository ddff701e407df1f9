use core::{fmt, str::FromStr};

use super::verhoeff::{compute_check_digit, verify_check_digit};
use crate::{ComponentCategory, Error, MalformedReason, Namespace, Result};

/// Shortest valid SCTID: three item id digits, partition, check digit.
pub const MIN_LEN: usize = 6;
/// Longest valid SCTID.
pub const MAX_LEN: usize = 18;

/// Partition digits plus the check digit.
const TRAILER_LEN: usize = 3;
const NAMESPACE_LEN: usize = 7;

/// A structurally valid, checksum-correct SNOMED CT identifier.
///
/// The textual layout is, left to right: item id, optional seven digit
/// namespace, format digit (`0` short, `1` namespaced), category digit, and a
/// Verhoeff check digit over everything before it. A `Sctid` can only be
/// obtained through [`Sctid::build`] or [`Sctid::parse`], so holding one is
/// proof of validity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sctid {
    text: String,
    item_id: u64,
    namespace: Namespace,
    category: ComponentCategory,
    check_digit: u8,
}

impl Sctid {
    /// Renders an identifier from its components and appends the check
    /// digit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidItemId`] if `item_id` does not fit the
    /// namespace's format.
    ///
    /// # Example
    ///
    /// ```
    /// use sctid::{ComponentCategory, Namespace, Sctid};
    ///
    /// let id = Sctid::build(100, Namespace::INTERNATIONAL, ComponentCategory::Concept).unwrap();
    /// assert_eq!(id.as_str(), "100005");
    /// ```
    pub fn build(item_id: u64, namespace: Namespace, category: ComponentCategory) -> Result<Self> {
        if !namespace.item_ids().contains(&item_id) {
            return Err(Error::InvalidItemId { item_id, namespace });
        }

        let mut text = match namespace.code() {
            Some(code) => format!("{item_id}{code}"),
            None => item_id.to_string(),
        };
        text.push(char::from(b'0' + namespace.format_digit()));
        text.push(char::from(b'0' + category.digit()));
        let check_digit = compute_check_digit(text.as_bytes());
        text.push(char::from(b'0' + check_digit));

        Ok(Self {
            text,
            item_id,
            namespace,
            category,
            check_digit,
        })
    }

    /// Parses and validates an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedIdentifier`] if the input is empty, contains
    /// non-digits, has the wrong length, starts with zero, fails the
    /// Verhoeff check, or carries an unknown partition or namespace.
    pub fn parse(id: &str) -> Result<Self> {
        let bytes = id.as_bytes();
        if bytes.is_empty() {
            return Err(Error::malformed(id, MalformedReason::Empty));
        }
        if !bytes.iter().all(u8::is_ascii_digit) {
            return Err(Error::malformed(id, MalformedReason::NonDigit));
        }
        if !(MIN_LEN..=MAX_LEN).contains(&bytes.len()) {
            return Err(Error::malformed(
                id,
                MalformedReason::Length { len: bytes.len() },
            ));
        }
        if bytes[0] == b'0' {
            return Err(Error::malformed(id, MalformedReason::LeadingZero));
        }

        let (body, check) = bytes.split_at(bytes.len() - 1);
        let found = check[0] - b'0';
        if !verify_check_digit(bytes) {
            return Err(Error::malformed(
                id,
                MalformedReason::Checksum {
                    found,
                    expected: compute_check_digit(body),
                },
            ));
        }

        let len = bytes.len();
        let category = ComponentCategory::from_digit(bytes[len - 2] - b'0')
            .ok_or_else(|| Error::malformed(id, MalformedReason::Partition))?;
        let (namespace, item_digits) = match bytes[len - TRAILER_LEN] {
            b'0' => (Namespace::INTERNATIONAL, &id[..len - TRAILER_LEN]),
            b'1' => {
                let item_end = len
                    .checked_sub(TRAILER_LEN + NAMESPACE_LEN)
                    .filter(|&end| end > 0)
                    .ok_or_else(|| Error::malformed(id, MalformedReason::Namespace))?;
                let namespace = Namespace::new(&id[item_end..len - TRAILER_LEN])
                    .map_err(|_| Error::malformed(id, MalformedReason::Namespace))?;
                (namespace, &id[..item_end])
            }
            _ => return Err(Error::malformed(id, MalformedReason::Partition)),
        };
        // At most 15 digits, so this always fits a u64.
        let item_id: u64 = item_digits
            .parse()
            .map_err(|_| Error::malformed(id, MalformedReason::Length { len }))?;

        Ok(Self {
            text: id.to_owned(),
            item_id,
            namespace,
            category,
            check_digit: found,
        })
    }

    /// Returns `true` if `id` parses as a valid identifier.
    #[must_use]
    pub fn is_valid(id: &str) -> bool {
        Self::parse(id).is_ok()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.text
    }

    /// The item id, also called the sequence.
    #[must_use]
    pub const fn item_id(&self) -> u64 {
        self.item_id
    }

    #[must_use]
    pub const fn namespace(&self) -> Namespace {
        self.namespace
    }

    #[must_use]
    pub const fn category(&self) -> ComponentCategory {
        self.category
    }

    #[must_use]
    pub const fn check_digit(&self) -> u8 {
        self.check_digit
    }

    /// The two digit partition identifier, e.g. `"00"` or `"11"`.
    #[must_use]
    pub fn partition_id(&self) -> String {
        let len = self.text.len();
        self.text[len - TRAILER_LEN..len - 1].to_owned()
    }
}

/// Returns `true` if `id` is a structurally valid, checksum-correct SCTID.
#[must_use]
pub fn validate(id: &str) -> bool {
    Sctid::is_valid(id)
}

impl fmt::Display for Sctid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for Sctid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl AsRef<str> for Sctid {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl From<Sctid> for String {
    fn from(sctid: Sctid) -> Self {
        sctid.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ns(code: &str) -> Namespace {
        Namespace::new(code).unwrap()
    }

    #[test]
    fn builds_short_format() {
        let cases = [
            (100, ComponentCategory::Concept, "100005"),
            (101, ComponentCategory::Description, "101013"),
            (102, ComponentCategory::Relationship, "102025"),
            (123_456, ComponentCategory::Concept, "123456001"),
        ];
        for (item_id, category, expected) in cases {
            let id = Sctid::build(item_id, Namespace::INTERNATIONAL, category).unwrap();
            assert_eq!(id.as_str(), expected);
            assert_eq!(id.partition_id(), format!("0{}", category.digit()));
        }
    }

    #[test]
    fn builds_long_format() {
        let concept = Sctid::build(1, ns("1000154"), ComponentCategory::Concept).unwrap();
        assert_eq!(concept.as_str(), "11000154102");
        assert_eq!(concept.partition_id(), "10");

        let description = Sctid::build(1, ns("1000154"), ComponentCategory::Description).unwrap();
        assert_eq!(description.as_str(), "11000154118");

        let relationship =
            Sctid::build(42, ns("1000154"), ComponentCategory::Relationship).unwrap();
        assert_eq!(relationship.as_str(), "421000154123");
    }

    #[test]
    fn rejects_out_of_range_item_ids() {
        assert!(matches!(
            Sctid::build(99, Namespace::INTERNATIONAL, ComponentCategory::Concept),
            Err(Error::InvalidItemId { item_id: 99, .. })
        ));
        assert!(matches!(
            Sctid::build(0, ns("1000154"), ComponentCategory::Concept),
            Err(Error::InvalidItemId { .. })
        ));
        assert!(matches!(
            Sctid::build(100_000_000, ns("1000154"), ComponentCategory::Concept),
            Err(Error::InvalidItemId { .. })
        ));
    }

    #[test]
    fn parses_published_identifiers() {
        let id = Sctid::parse("900000000000207008").unwrap();
        assert_eq!(id.item_id(), 900_000_000_000_207);
        assert!(id.namespace().is_international());
        assert_eq!(id.category(), ComponentCategory::Concept);
        assert_eq!(id.check_digit(), 8);

        let id = Sctid::parse("421000154123").unwrap();
        assert_eq!(id.item_id(), 42);
        assert_eq!(id.namespace(), ns("1000154"));
        assert_eq!(id.category(), ComponentCategory::Relationship);
    }

    #[test]
    fn reports_malformation_reasons() {
        let reason = |id: &str| match Sctid::parse(id) {
            Err(Error::MalformedIdentifier { reason, .. }) => reason,
            other => panic!("expected malformed for {id}, got {other:?}"),
        };

        assert_eq!(reason(""), MalformedReason::Empty);
        assert_eq!(reason("10000a"), MalformedReason::NonDigit);
        assert_eq!(reason("10005"), MalformedReason::Length { len: 5 });
        assert_eq!(
            reason("1234567890123456789"),
            MalformedReason::Length { len: 19 }
        );
        assert_eq!(reason("0100005"), MalformedReason::LeadingZero);
        assert_eq!(
            reason("100006"),
            MalformedReason::Checksum {
                found: 6,
                expected: 5
            }
        );
    }

    #[test]
    fn rejects_unknown_partitions() {
        // Correct check digits over partitions "03" and "20".
        let unknown_category = {
            let body = "10003";
            format!("{body}{}", compute_check_digit(body.as_bytes()))
        };
        assert!(matches!(
            Sctid::parse(&unknown_category),
            Err(Error::MalformedIdentifier {
                reason: MalformedReason::Partition,
                ..
            })
        ));

        let unknown_format = {
            let body = "10020";
            format!("{body}{}", compute_check_digit(body.as_bytes()))
        };
        assert!(matches!(
            Sctid::parse(&unknown_format),
            Err(Error::MalformedIdentifier {
                reason: MalformedReason::Partition,
                ..
            })
        ));
    }

    #[test]
    fn rejects_truncated_namespaces() {
        let body = "1234510";
        let id = format!("{body}{}", compute_check_digit(body.as_bytes()));
        assert!(matches!(
            Sctid::parse(&id),
            Err(Error::MalformedIdentifier {
                reason: MalformedReason::Namespace,
                ..
            })
        ));
    }

    #[test]
    fn validate_is_non_raising() {
        assert!(validate("900000000000441003"));
        assert!(!validate("900000000000441004"));
        assert!(!validate("not an id"));
    }

    fn any_namespace() -> impl Strategy<Value = Namespace> {
        prop_oneof![
            Just(Namespace::INTERNATIONAL),
            (1_000_000_u32..=9_999_999).prop_map(|code| Namespace::from_code(code).unwrap()),
        ]
    }

    fn any_category() -> impl Strategy<Value = ComponentCategory> {
        prop_oneof![
            Just(ComponentCategory::Concept),
            Just(ComponentCategory::Description),
            Just(ComponentCategory::Relationship),
        ]
    }

    proptest! {
        #[test]
        fn parse_recovers_built_components(
            namespace in any_namespace(),
            category in any_category(),
            seed in any::<u64>(),
        ) {
            let range = namespace.item_ids();
            let item_id = range.start() + seed % (range.end() - range.start() + 1);

            let built = Sctid::build(item_id, namespace, category).unwrap();
            prop_assert!(validate(built.as_str()));

            let parsed = Sctid::parse(built.as_str()).unwrap();
            prop_assert_eq!(parsed.item_id(), item_id);
            prop_assert_eq!(parsed.namespace(), namespace);
            prop_assert_eq!(parsed.category(), category);
            prop_assert_eq!(parsed, built);
        }
    }
}

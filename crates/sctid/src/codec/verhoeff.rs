//! Verhoeff check digits over ASCII decimal strings.
//!
//! The algorithm detects every single-digit error and every adjacent
//! transposition. Inputs are ASCII digit bytes; callers validate the alphabet
//! before calling in.

/// Multiplication table of the dihedral group D5.
const MULTIPLY: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

/// Position-dependent permutation, cycling every 8 digits.
const PERMUTE: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 7, 6, 8, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

const INVERSE: [u8; 10] = [0, 4, 3, 2, 1, 5, 6, 7, 8, 9];

#[inline]
fn fold(digits: &[u8], offset: usize) -> u8 {
    digits
        .iter()
        .rev()
        .enumerate()
        .fold(0_u8, |acc, (position, &byte)| {
            debug_assert!(byte.is_ascii_digit());
            let digit = usize::from(byte - b'0');
            MULTIPLY[usize::from(acc)][usize::from(PERMUTE[(position + offset) % 8][digit])]
        })
}

/// Computes the check digit (0..=9) to append to `digits`.
#[must_use]
pub fn compute_check_digit(digits: &[u8]) -> u8 {
    INVERSE[usize::from(fold(digits, 1))]
}

/// Returns `true` if the last byte of `digits` is the check digit of the
/// bytes before it.
#[must_use]
pub fn verify_check_digit(digits: &[u8]) -> bool {
    !digits.is_empty() && fold(digits, 0) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_check_digits() {
        assert_eq!(compute_check_digit(b"236"), 3);
        assert_eq!(compute_check_digit(b"12345"), 1);
        assert_eq!(compute_check_digit(b"100001"), 5);
    }

    #[test]
    fn verifies_published_identifiers() {
        for id in ["73211009", "22298006", "900000000000207008", "900000000000441003"] {
            assert!(verify_check_digit(id.as_bytes()), "{id}");
        }
    }

    #[test]
    fn detects_single_digit_errors_and_transpositions() {
        let valid = b"900000000000207008";
        for i in 0..valid.len() {
            for replacement in b'0'..=b'9' {
                if replacement == valid[i] {
                    continue;
                }
                let mut corrupted = *valid;
                corrupted[i] = replacement;
                assert!(!verify_check_digit(&corrupted));
            }
        }
        let mut swapped = *b"73211009";
        swapped.swap(0, 1);
        assert!(!verify_check_digit(&swapped));
    }

    #[test]
    fn empty_input_never_verifies() {
        assert!(!verify_check_digit(b""));
    }
}

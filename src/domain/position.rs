//! Signed logical positions shared by every store.
//!
//! Non-negative positions are absolute. Negative positions count from the end:
//! `-1` appends after the last element, `-2` inserts before it, and so on.

/// Converts a signed position into an absolute one without bound checks.
///
/// The result may still be negative or beyond `len`; use [`checked`] when the
/// caller needs a valid slot.
pub fn normalize(pos: isize, len: usize) -> isize {
    if pos >= 0 {
        pos
    } else {
        len as isize + pos + 1
    }
}

/// Normalizes `pos` once and accepts it only inside `[0, len]`.
pub fn checked(pos: isize, len: usize) -> Option<usize> {
    let abs = normalize(pos, len);
    if (0..=len as isize).contains(&abs) {
        Some(abs as usize)
    } else {
        None
    }
}

/// Integer ceiling division, `0` for an empty numerator.
pub fn div_ceil(n: usize, d: usize) -> usize {
    if d == 0 {
        0
    } else {
        n.div_ceil(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, 3, 0)]
    #[case(2, 3, 2)]
    #[case(3, 3, 3)]
    #[case(-1, 3, 3)]
    #[case(-2, 3, 2)]
    #[case(-4, 3, 0)]
    #[case(-1, 0, 0)]
    fn given_position_when_normalizing_then_matches_expected(
        #[case] pos: isize,
        #[case] len: usize,
        #[case] expected: isize,
    ) {
        assert_eq!(normalize(pos, len), expected);
    }

    #[test]
    fn given_append_position_when_normalizing_then_always_len() {
        for len in 0..50 {
            assert_eq!(checked(-1, len), Some(len));
        }
    }

    #[test]
    fn given_every_valid_position_when_checking_then_stays_in_bounds() {
        for len in 0..20usize {
            for pos in -1..=len as isize {
                let abs = checked(pos, len).expect("valid position");
                assert!(abs <= len);
            }
        }
    }

    #[rstest]
    #[case(4, 3)]
    #[case(-5, 3)]
    #[case(1, 0)]
    fn given_out_of_range_position_when_checking_then_none(#[case] pos: isize, #[case] len: usize) {
        assert_eq!(checked(pos, len), None);
    }

    #[test]
    fn test_div_ceil() {
        assert_eq!(div_ceil(0, 3), 0);
        assert_eq!(div_ceil(1, 3), 1);
        assert_eq!(div_ceil(3, 3), 1);
        assert_eq!(div_ceil(4, 3), 2);
        assert_eq!(div_ceil(4, 0), 0);
    }
}

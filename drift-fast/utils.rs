//! Bit tricks for the FAST segment test.
//!
//! The 16 pixels of the Bresenham circle are packed into a `u16`, bit `i`
//! standing for circle position `i`. A corner needs a run of set bits that may
//! wrap around from bit 15 to bit 0.

/// Packs per-position flags into a circle mask
pub fn circle_mask(flags: &[bool; 16]) -> u16 {
    flags
        .iter()
        .enumerate()
        .filter(|(_, f)| **f)
        .fold(0u16, |mask, (i, _)| mask | (1 << i))
}

/// True if `mask` holds at least `min_len` consecutive set bits, wrapping around
pub fn has_contiguous_arc(mask: u16, min_len: usize) -> bool {
    if min_len == 0 || min_len > 16 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    // AND the mask with its rotations; a bit survives only if it starts a long enough run
    let mut runs = mask;
    for i in 1..min_len as u32 {
        runs &= mask.rotate_right(i);
        if runs == 0 {
            return false;
        }
    }
    runs != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn longest_run(flags: &[bool; 16]) -> usize {
        let mut best = 0;
        let mut current = 0;
        for i in 0..32 {
            if flags[i % 16] {
                current += 1;
                best = best.max(current);
            } else {
                current = 0;
            }
        }
        best.min(16)
    }

    #[test]
    fn test_simple_run() {
        let mut flags = [false; 16];
        for f in flags.iter_mut().take(9) {
            *f = true;
        }
        let mask = circle_mask(&flags);
        assert!(has_contiguous_arc(mask, 9));
        assert!(!has_contiguous_arc(mask, 10));
    }

    #[test]
    fn test_wrap_around_run() {
        let mut flags = [false; 16];
        for i in (12..16).chain(0..5) {
            flags[i] = true;
        }
        assert!(has_contiguous_arc(circle_mask(&flags), 9));
    }

    #[test]
    fn test_alternating_bits_never_form_an_arc() {
        let mask = 0b0101_0101_0101_0101u16;
        assert!(has_contiguous_arc(mask, 1));
        assert!(!has_contiguous_arc(mask, 2));
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(!has_contiguous_arc(u16::MAX, 0));
        assert!(!has_contiguous_arc(u16::MAX, 17));
        assert!(has_contiguous_arc(u16::MAX, 16));
    }

    proptest! {
        #[test]
        fn prop_matches_linear_scan(bits in any::<u16>(), min_len in 1usize..=16) {
            let mut flags = [false; 16];
            for (i, f) in flags.iter_mut().enumerate() {
                *f = bits & (1 << i) != 0;
            }
            prop_assert_eq!(has_contiguous_arc(circle_mask(&flags), min_len), longest_run(&flags) >= min_len);
        }
    }
}

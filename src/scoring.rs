//! Strength scores for timeline points.
//!
//! Strength is an illustrative 0-100 confidence figure, not a calibrated
//! probability. Heading sections are scored from their text alone; paragraph
//! points start from a random base so callers that need reproducible output
//! pass a seeded RNG (see [`rng_for`]).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::classify::ThoughtKind;

/// Confidence signals and their deltas. Checks are independent and the
/// deltas accumulate.
pub const CONFIDENCE_SIGNALS: &[(&str, i32)] = &[
    ("certainly", 5),
    ("definitely", 5),
    ("clearly", 3),
    ("evidence", 4),
    ("proven", 5),
    ("suggests", -2),
    ("might", -3),
    ("perhaps", -3),
    ("possibly", -4),
    ("uncertain", -5),
];

pub const SECTION_BASE: i32 = 70;
pub const SINGLE_BLOCK_STRENGTH: u8 = 75;

/// Score a heading section: 70, plus one point per 100 characters (at most
/// 30), plus the signal deltas, clamped to `[0, 100]`.
pub fn section_strength(section: &str) -> u8 {
    let length_bonus = (section.chars().count() / 100).min(30) as i32;
    let lower = section.to_lowercase();
    let signals: i32 = CONFIDENCE_SIGNALS
        .iter()
        .filter(|(word, _)| lower.contains(word))
        .map(|(_, delta)| delta)
        .sum();
    (SECTION_BASE + length_bonus + signals).clamp(0, 100) as u8
}

/// Score a paragraph point from a random base in `[60, 90)`.
pub fn paragraph_strength<R: Rng + ?Sized>(kind: ThoughtKind, rng: &mut R) -> u8 {
    let base: f64 = rng.gen_range(60.0..90.0);
    let adjusted = match kind {
        ThoughtKind::Conclusion => (base + 15.0).min(100.0),
        ThoughtKind::Premise => (base + 10.0).min(100.0),
        ThoughtKind::Alternative => (base - 20.0).max(40.0),
        ThoughtKind::Reasoning | ThoughtKind::Evidence => base,
    };
    adjusted.round().clamp(0.0, 100.0) as u8
}

/// Seeded RNG when `seed` is set, entropy-seeded otherwise.
pub fn rng_for(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_section_strength_base() {
        assert_eq!(section_strength("Cats are mammals."), 70);
    }

    #[test]
    fn test_section_strength_length_bonus() {
        let text = "a".repeat(250);
        assert_eq!(section_strength(&text), 72);
    }

    #[test]
    fn test_section_strength_length_bonus_capped() {
        let text = "a ".repeat(10_000);
        assert_eq!(section_strength(&text), 100);
    }

    #[test]
    fn test_section_strength_signals_accumulate() {
        // certainly +5, clearly +3, proven +5
        assert_eq!(section_strength("Certainly and clearly proven."), 83);
        // might -3, perhaps -3, possibly -4, uncertain -5
        assert_eq!(section_strength("It might, perhaps possibly, be uncertain."), 55);
    }

    #[test]
    fn test_section_strength_is_case_insensitive() {
        assert_eq!(section_strength("DEFINITELY"), 75);
    }

    #[test]
    fn test_paragraph_strength_kind_bounds() {
        let mut rng = rng_for(Some(42));
        for _ in 0..200 {
            let c = paragraph_strength(ThoughtKind::Conclusion, &mut rng);
            assert!((75..=100).contains(&c));
            let p = paragraph_strength(ThoughtKind::Premise, &mut rng);
            assert!((70..=100).contains(&p));
            let a = paragraph_strength(ThoughtKind::Alternative, &mut rng);
            assert!((40..=70).contains(&a));
            let r = paragraph_strength(ThoughtKind::Reasoning, &mut rng);
            assert!((60..=90).contains(&r));
        }
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let mut a = rng_for(Some(9));
        let mut b = rng_for(Some(9));
        let xs: Vec<u8> = (0..10).map(|_| paragraph_strength(ThoughtKind::Evidence, &mut a)).collect();
        let ys: Vec<u8> = (0..10).map(|_| paragraph_strength(ThoughtKind::Evidence, &mut b)).collect();
        assert_eq!(xs, ys);
    }

    proptest! {
        #[test]
        fn prop_section_strength_in_range(s in ".{0,2000}") {
            let v = section_strength(&s);
            prop_assert!(v <= 100);
        }
    }
}

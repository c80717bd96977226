//! Word bank for drawing rounds.

use rand::seq::SliceRandom;

/// Words a drawer can be asked to draw. All lowercase so guess matching
/// can compare against them after normalization.
pub const WORDS: &[&str] = &[
    "elephant",
    "pizza",
    "rainbow",
    "guitar",
    "butterfly",
    "mountain",
    "bicycle",
    "castle",
    "octopus",
    "sunflower",
    "rocket",
    "penguin",
    "hamburger",
    "lighthouse",
    "dinosaur",
    "umbrella",
    "airplane",
    "flower",
    "house",
    "car",
    "tree",
    "cat",
    "dog",
    "fish",
    "bird",
    "sun",
    "moon",
    "star",
    "heart",
    "apple",
    "banana",
    "cake",
    "book",
    "phone",
    "computer",
    "chair",
];

/// Picks a uniformly random word for a new room.
pub fn random_word() -> &'static str {
    let mut rng = rand::thread_rng();
    WORDS
        .choose(&mut rng)
        .copied()
        .unwrap_or(WORDS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_is_lowercase_and_nonempty() {
        assert!(!WORDS.is_empty());
        for word in WORDS {
            assert_eq!(*word, word.to_lowercase());
            assert!(!word.trim().is_empty());
        }
    }

    #[test]
    fn random_word_comes_from_bank() {
        for _ in 0..32 {
            assert!(WORDS.contains(&random_word()));
        }
    }
}

//! Guess evaluation and reward rules.

/// Canonical form used for guess comparison. Whitespace at the ends is
/// ignored and matching is case-insensitive.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Whether a guess matches the room's current word. A room without a
/// word accepts nothing.
pub fn is_correct(guess: &str, current_word: Option<&str>) -> bool {
    match current_word {
        Some(word) => normalize(guess) == normalize(word),
        None => false,
    }
}

/// Points awarded for a correct guess at the given clock reading.
/// Faster guesses earn more, with a floor of 10 points.
pub fn reward(time_left: i32) -> i32 {
    (time_left / 10).max(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case_and_outer_whitespace() {
        assert!(is_correct("Elephant ", Some("elephant")));
        assert!(is_correct("  PIZZA", Some("pizza")));
        assert!(!is_correct("elephants", Some("elephant")));
    }

    #[test]
    fn no_word_never_matches() {
        assert!(!is_correct("anything", None));
        assert!(!is_correct("", None));
    }

    #[test]
    fn reward_scales_with_time_and_floors_at_ten() {
        assert_eq!(reward(600), 60);
        assert_eq!(reward(300), 30);
        assert_eq!(reward(105), 10);
        assert_eq!(reward(55), 10);
        assert_eq!(reward(0), 10);
    }
}

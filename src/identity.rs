//! Anonymous player identity generation.
//!
//! Players do not sign up. Each new visitor gets a generated handle like
//! `BraveDrawer42` which is persisted as their username.

use rand::seq::SliceRandom;
use rand::Rng;

const ADJECTIVES: &[&str] = &[
    "Cool", "Fast", "Smart", "Brave", "Happy", "Lucky", "Swift", "Bright", "Bold", "Quick",
];

const NOUNS: &[&str] = &[
    "Artist", "Player", "Gamer", "Drawer", "Painter", "Creator", "Master", "Hero", "Star", "Ace",
];

/// How many times a caller should retry on a username collision before
/// giving up and accepting the last candidate.
pub const USERNAME_RETRIES: usize = 5;

/// Generates a random `AdjectiveNounN` handle with `N` in `1..=999`.
pub fn generate_username() -> String {
    let mut rng = rand::thread_rng();
    let adjective = ADJECTIVES.choose(&mut rng).copied().unwrap_or(ADJECTIVES[0]);
    let noun = NOUNS.choose(&mut rng).copied().unwrap_or(NOUNS[0]);
    let number: u32 = rng.gen_range(1..=999);
    format!("{adjective}{noun}{number}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_has_expected_shape() {
        for _ in 0..64 {
            let name = generate_username();
            let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
            let number: u32 = digits.parse().expect("trailing number");
            assert!((1..=999).contains(&number));

            let stem: String = name.chars().filter(|c| !c.is_ascii_digit()).collect();
            assert!(ADJECTIVES.iter().any(|a| stem.starts_with(a)));
            assert!(NOUNS.iter().any(|n| stem.ends_with(n)));
        }
    }
}

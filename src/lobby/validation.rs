use rand::Rng;

use super::error::RoomError;
use super::types::{PlayerRecord, RoomRecord, UserId, ROOM_CODE_LEN};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a fresh join code. Collisions are possible and handled by
/// the caller re-rolling against the store.
pub fn generate_room_code() -> String {
    let mut rng = rand::thread_rng();
    (0..ROOM_CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

pub fn is_valid_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN
        && code
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Checks that `user_id` may take a seat in `room` given the current
/// roster.
pub fn ensure_can_join(
    room: &RoomRecord,
    players: &[PlayerRecord],
    user_id: UserId,
) -> Result<(), RoomError> {
    if room.is_active {
        return Err(RoomError::GameInProgress);
    }
    if players.iter().any(|p| p.user_id == user_id) {
        return Err(RoomError::AlreadyJoined);
    }
    if players.len() as i32 >= room.max_players {
        return Err(RoomError::RoomFull);
    }
    Ok(())
}

/// Whether a room should be offered to a quick-join caller.
pub fn is_quick_join_candidate(
    room: &RoomRecord,
    players: &[PlayerRecord],
    user_id: UserId,
) -> bool {
    room.is_public
        && !room.is_active
        && !players.is_empty()
        && (players.len() as i32) < room.max_players
        && !players.iter().any(|p| p.user_id == user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..64 {
            let code = generate_room_code();
            assert!(is_valid_room_code(&code), "bad code {code}");
        }
    }

    #[test]
    fn code_validation_rejects_wrong_shapes() {
        assert!(!is_valid_room_code("abc123"));
        assert!(!is_valid_room_code("ABCDE"));
        assert!(!is_valid_room_code("ABCDEFG"));
        assert!(!is_valid_room_code("ABC 12"));
        assert!(is_valid_room_code("ZQ9X0K"));
    }
}

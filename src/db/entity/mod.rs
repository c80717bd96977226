pub mod drawing_strokes;
pub mod guesses;
pub mod room_players;
pub mod rooms;
pub mod users;

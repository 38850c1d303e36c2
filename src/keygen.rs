//! Identifier generation helpers

use rand::Rng;

/// Alphabet for lecture keys. Uppercase letters and digits, with the
/// easily-confused characters (0/O, 1/I) removed so keys survive being
/// read aloud or written on a whiteboard.
const KEY_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Length of a shareable lecture key
pub const LECTURE_KEY_LENGTH: usize = 6;

/// Generate a short human-shareable lecture key
pub fn generate_lecture_key() -> String {
    let mut rng = rand::thread_rng();
    (0..LECTURE_KEY_LENGTH)
        .map(|_| KEY_ALPHABET[rng.gen_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// Generate an opaque meeting session identifier, used when the client does
/// not supply one of its own
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Length of a user's unique number
pub const UNIQUE_NUMBER_LENGTH: usize = 10;

/// Generate the 10-digit number that addresses a user's meeting sessions.
/// Kept as a string: it is an identifier, not a quantity, and may lead
/// with zero.
pub fn generate_unique_number() -> String {
    let mut rng = rand::thread_rng();
    (0..UNIQUE_NUMBER_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

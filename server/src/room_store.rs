//! In-memory registry of active rooms
//!
//! The store is a plain owned value: the session coordinator constructs one at
//! startup and is the only code holding a mutable reference to it.

use crate::room::Room;
use log::info;
use rand::Rng;
use std::collections::HashMap;

pub const ROOM_ID_LEN: usize = 6;
const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draws a random room code. Uniqueness is the store's job.
pub fn random_room_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..ROOM_ID_LEN)
        .map(|_| ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())] as char)
        .collect()
}

/// Normalizes a client-supplied room code for lookup.
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

#[derive(Debug, Default)]
pub struct RoomStore {
    rooms: HashMap<String, Room>,
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
        }
    }

    /// Creates an empty room under a fresh random code.
    pub fn create(&mut self) -> String {
        let mut rng = rand::thread_rng();
        self.create_with(|| random_room_code(&mut rng))
    }

    /// Creates an empty room, drawing codes from `next_code` until one is not
    /// already in use.
    pub fn create_with<F: FnMut() -> String>(&mut self, mut next_code: F) -> String {
        let id = loop {
            let candidate = next_code();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        self.rooms.insert(id.clone(), Room::new(id.clone()));
        info!("Created room {}, total rooms: {}", id, self.rooms.len());
        id
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    /// Deletes the room if it has no players left. Returns true when deleted.
    pub fn remove_if_empty(&mut self, id: &str) -> bool {
        let empty = self.rooms.get(id).map_or(false, Room::is_empty);
        if empty {
            self.rooms.remove(id);
            info!("Deleted empty room {}, total rooms: {}", id, self.rooms.len());
        }
        empty
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Player;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn player(id: u64) -> Player {
        Player::new(id, "p".into(), "cat".into(), "#FFF".into(), 0.0, 0.0)
    }

    #[test]
    fn test_random_room_code_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = random_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_ID_LEN);
            assert!(code
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_create_retries_on_collision() {
        let mut store = RoomStore::new();
        let first = store.create_with(|| "AAAAAA".to_string());
        assert_eq!(first, "AAAAAA");

        let mut codes = vec!["BBBBBB", "AAAAAA", "AAAAAA"];
        let second = store.create_with(|| codes.pop().unwrap().to_string());
        assert_eq!(second, "BBBBBB");
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_get_unknown_room() {
        let store = RoomStore::new();
        assert!(store.get("NOPE00").is_none());
    }

    #[test]
    fn test_remove_if_empty_only_removes_empty_rooms() {
        let mut store = RoomStore::new();
        let id = store.create();
        store.get_mut(&id).unwrap().add_player(player(1));

        assert!(!store.remove_if_empty(&id));
        assert!(store.contains(&id));

        store.get_mut(&id).unwrap().remove_player(1);
        assert!(store.remove_if_empty(&id));
        assert!(!store.contains(&id));
        assert!(store.is_empty());
        assert!(!store.remove_if_empty(&id));
    }

    #[test]
    fn test_normalize_room_code() {
        assert_eq!(normalize_room_code(" ab12cd "), "AB12CD");
    }
}

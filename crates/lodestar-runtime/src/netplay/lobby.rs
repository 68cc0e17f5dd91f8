use std::collections::HashMap;

use parking_lot::Mutex;

use crate::options::sanitize_value;

pub const MAX_LISTED_ROOMS: usize = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoomMethod {
    #[default]
    Direct,
    Traversal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LobbyRoom {
    pub name: String,
    pub game_id: String,
    pub player_count: u32,
    pub has_password: bool,
    pub in_game: bool,
    /// Address, or traversal host code, to join.
    pub server_id: String,
    pub method: RoomMethod,
    pub port: u16,
}

impl LobbyRoom {
    fn label(&self, index: usize) -> String {
        let mut label = format!(
            "{}: {} ({}) [{}]",
            index + 1,
            self.name,
            self.game_id,
            self.player_count
        );
        if self.has_password {
            label.push_str(" P");
        }
        if self.in_game {
            label.push_str(" InGame");
        }
        sanitize_value(&label)
    }
}

#[derive(Default)]
struct Listing {
    rooms: Vec<LobbyRoom>,
    labels: Vec<String>,
    by_label: HashMap<String, usize>,
}

/// Latest room listing, addressable by the labels published as option values.
#[derive(Default)]
pub(super) struct Lobby {
    listing: Mutex<Listing>,
}

impl Lobby {
    pub(super) fn replace(&self, rooms: Vec<LobbyRoom>) -> usize {
        let rooms: Vec<LobbyRoom> = rooms.into_iter().take(MAX_LISTED_ROOMS).collect();
        let labels: Vec<String> = rooms
            .iter()
            .enumerate()
            .map(|(index, room)| room.label(index))
            .collect();
        let by_label = labels
            .iter()
            .enumerate()
            .map(|(index, label)| (label.clone(), index))
            .collect();
        let count = rooms.len();
        *self.listing.lock() = Listing {
            rooms,
            labels,
            by_label,
        };
        count
    }

    pub(super) fn clear(&self) {
        *self.listing.lock() = Listing::default();
    }

    pub(super) fn labels(&self) -> Vec<String> {
        self.listing.lock().labels.clone()
    }

    pub(super) fn find(&self, label: &str) -> Option<LobbyRoom> {
        let listing = self.listing.lock();
        let index = *listing.by_label.get(label)?;
        listing.rooms.get(index).cloned()
    }
}

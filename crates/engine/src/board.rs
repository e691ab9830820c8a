use hexcomp_protocol::limits::{BOARD_COLS, BOARD_ROWS, MAX_ITEMS};
use hexcomp_protocol::{BoardPosition, Champion, Item, PlacedChampion};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::new_id;

/// Whether the same catalog champion may occupy several cells at once.
/// Applied to every placement path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Repeat placements become distinct board entries.
    #[default]
    AllowDistinct,
    Forbid,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("position {0} is already occupied")]
    Occupied(BoardPosition),
    #[error("champion {0} is already on the board")]
    Duplicate(String),
    #[error("position {0} is outside the board")]
    OutOfBounds(BoardPosition),
    #[error("{0} already holds {MAX_ITEMS} items")]
    SlotsFull(String),
    #[error("no empty cell left on the board")]
    BoardFull,
    #[error("no placed champion with id {0}")]
    NotFound(String),
}

impl BoardError {
    pub fn is_occupied_or_duplicate(&self) -> bool {
        matches!(self, Self::Occupied(_) | Self::Duplicate(_))
    }
}

/// The 7x4 hex board. Owns its placed champions; every mutation checks its
/// invariant before touching state, so a rejected call leaves the board as it was.
#[derive(Debug, Clone, Default)]
pub struct Board {
    champions: Vec<PlacedChampion>,
    policy: DuplicatePolicy,
}

impl Board {
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            champions: Vec::new(),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Placed champions in insertion order.
    pub fn champions(&self) -> &[PlacedChampion] {
        &self.champions
    }

    pub fn len(&self) -> usize {
        self.champions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.champions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.find_first_empty().is_none()
    }

    pub fn get(&self, placed_id: &str) -> Option<&PlacedChampion> {
        self.champions.iter().find(|pc| pc.id == placed_id)
    }

    pub fn at(&self, position: BoardPosition) -> Option<&PlacedChampion> {
        self.champions.iter().find(|pc| pc.position == position)
    }

    pub fn contains_champion(&self, champion_id: &str) -> bool {
        self.champions.iter().any(|pc| pc.champion.id == champion_id)
    }

    pub fn place(
        &mut self,
        champion: Arc<Champion>,
        position: BoardPosition,
    ) -> Result<&PlacedChampion, BoardError> {
        if !position.is_on_board() {
            return Err(BoardError::OutOfBounds(position));
        }
        if self.at(position).is_some() {
            return Err(BoardError::Occupied(position));
        }
        if self.policy == DuplicatePolicy::Forbid && self.contains_champion(&champion.id) {
            return Err(BoardError::Duplicate(champion.id.clone()));
        }

        let placed = PlacedChampion {
            id: new_id(&champion.id),
            champion,
            position,
            items: Vec::new(),
        };
        tracing::debug!(id = %placed.id, %position, "champion placed");
        self.champions.push(placed);
        let last = self.champions.len() - 1;
        Ok(&self.champions[last])
    }

    /// Click-to-place: first empty cell in row-major order.
    pub fn place_first_empty(
        &mut self,
        champion: Arc<Champion>,
    ) -> Result<&PlacedChampion, BoardError> {
        let position = self.find_first_empty().ok_or(BoardError::BoardFull)?;
        self.place(champion, position)
    }

    /// Scans row 0..4, and within a row column 0..7.
    pub fn find_first_empty(&self) -> Option<BoardPosition> {
        (0..BOARD_ROWS)
            .flat_map(|row| (0..BOARD_COLS).map(move |col| BoardPosition::new(col, row)))
            .find(|&pos| self.at(pos).is_none())
    }

    /// Moves an existing entry, keeping its id and items.
    pub fn move_to(&mut self, placed_id: &str, position: BoardPosition) -> Result<(), BoardError> {
        if !position.is_on_board() {
            return Err(BoardError::OutOfBounds(position));
        }
        let idx = self
            .index_of(placed_id)
            .ok_or_else(|| BoardError::NotFound(placed_id.to_string()))?;
        if self.champions[idx].position == position {
            return Ok(());
        }
        if self.at(position).is_some() {
            return Err(BoardError::Occupied(position));
        }
        self.champions[idx].position = position;
        tracing::debug!(id = placed_id, %position, "champion moved");
        Ok(())
    }

    /// Returns the removed entry; absent ids are a no-op.
    pub fn remove(&mut self, placed_id: &str) -> Option<PlacedChampion> {
        let idx = self.index_of(placed_id)?;
        let removed = self.champions.remove(idx);
        tracing::debug!(id = placed_id, "champion removed");
        Some(removed)
    }

    pub fn equip_item(&mut self, placed_id: &str, item: Arc<Item>) -> Result<(), BoardError> {
        let placed = self
            .champions
            .iter_mut()
            .find(|pc| pc.id == placed_id)
            .ok_or_else(|| BoardError::NotFound(placed_id.to_string()))?;
        if placed.items.len() >= MAX_ITEMS {
            return Err(BoardError::SlotsFull(placed_id.to_string()));
        }
        placed.items.push(item);
        Ok(())
    }

    /// Out-of-range indexes and unknown ids leave the board untouched.
    pub fn unequip_item(&mut self, placed_id: &str, item_index: usize) -> Option<Arc<Item>> {
        let placed = self.champions.iter_mut().find(|pc| pc.id == placed_id)?;
        if item_index >= placed.items.len() {
            return None;
        }
        Some(placed.items.remove(item_index))
    }

    /// Replaces the board wholesale. Input is trusted and not re-validated.
    pub fn load(&mut self, champions: Vec<PlacedChampion>) {
        tracing::debug!(count = champions.len(), "board loaded");
        self.champions = champions;
    }

    pub fn clear(&mut self) {
        self.champions.clear();
    }

    pub fn snapshot(&self) -> Vec<PlacedChampion> {
        self.champions.clone()
    }

    fn index_of(&self, placed_id: &str) -> Option<usize> {
        self.champions.iter().position(|pc| pc.id == placed_id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hexcomp_protocol::limits::BOARD_CELLS;
    use hexcomp_protocol::{Ability, ChampionStats};
    use std::collections::{BTreeMap, HashSet};

    pub(crate) fn champion(id: &str, cost: u8, traits: &[&str]) -> Arc<Champion> {
        Arc::new(Champion {
            id: id.to_string(),
            name: id.to_string(),
            cost,
            traits: traits.iter().map(|t| t.to_string()).collect(),
            stats: ChampionStats::default(),
            ability: Ability::default(),
            image: String::new(),
        })
    }

    pub(crate) fn item(id: &str) -> Arc<Item> {
        Arc::new(Item {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            stats: BTreeMap::new(),
            image: String::new(),
            recipe: Vec::new(),
        })
    }

    fn assert_unique_positions(board: &Board) {
        let positions: HashSet<_> = board.champions().iter().map(|pc| pc.position).collect();
        assert_eq!(positions.len(), board.len());
    }

    #[test]
    fn place_rejects_occupied_cell() {
        let mut board = Board::default();
        board.place(champion("annie", 1, &[]), BoardPosition::new(0, 0)).unwrap();
        let err = board
            .place(champion("jinx", 3, &[]), BoardPosition::new(0, 0))
            .unwrap_err();
        assert_eq!(err, BoardError::Occupied(BoardPosition::new(0, 0)));
        assert!(err.is_occupied_or_duplicate());
        assert_eq!(board.len(), 1);
        assert_unique_positions(&board);
    }

    #[test]
    fn place_rejects_off_board_position() {
        let mut board = Board::default();
        let err = board
            .place(champion("annie", 1, &[]), BoardPosition::new(7, 0))
            .unwrap_err();
        assert_eq!(err, BoardError::OutOfBounds(BoardPosition::new(7, 0)));
        assert!(board.is_empty());
    }

    #[test]
    fn same_champion_twice_gets_distinct_entries_by_default() {
        let mut board = Board::default();
        let annie = champion("annie", 1, &[]);
        let a = board.place(annie.clone(), BoardPosition::new(0, 0)).unwrap().id.clone();
        let b = board.place_first_empty(annie).unwrap().id.clone();
        assert_ne!(a, b);
        assert!(a.starts_with("annie-"));
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn forbid_policy_applies_to_every_placement_path() {
        let mut board = Board::new(DuplicatePolicy::Forbid);
        let annie = champion("annie", 1, &[]);
        board.place(annie.clone(), BoardPosition::new(3, 1)).unwrap();

        let drag = board.place(annie.clone(), BoardPosition::new(0, 0)).unwrap_err();
        assert_eq!(drag, BoardError::Duplicate("annie".to_string()));
        let click = board.place_first_empty(annie).unwrap_err();
        assert_eq!(click, BoardError::Duplicate("annie".to_string()));
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn moving_an_entry_is_not_a_duplicate() {
        let mut board = Board::new(DuplicatePolicy::Forbid);
        let id = board
            .place(champion("annie", 1, &[]), BoardPosition::new(0, 0))
            .unwrap()
            .id
            .clone();
        board.equip_item(&id, item("bf_sword")).unwrap();
        board.move_to(&id, BoardPosition::new(4, 2)).unwrap();

        let moved = board.get(&id).unwrap();
        assert_eq!(moved.position, BoardPosition::new(4, 2));
        assert_eq!(moved.items.len(), 1);
        assert!(board.at(BoardPosition::new(0, 0)).is_none());
    }

    #[test]
    fn move_onto_occupied_cell_is_rejected() {
        let mut board = Board::default();
        let a = board.place(champion("a", 1, &[]), BoardPosition::new(0, 0)).unwrap().id.clone();
        board.place(champion("b", 1, &[]), BoardPosition::new(1, 0)).unwrap();
        assert_eq!(
            board.move_to(&a, BoardPosition::new(1, 0)),
            Err(BoardError::Occupied(BoardPosition::new(1, 0)))
        );
        assert_eq!(board.move_to(&a, BoardPosition::new(0, 0)), Ok(()));
        assert_eq!(
            board.move_to("missing", BoardPosition::new(2, 2)),
            Err(BoardError::NotFound("missing".to_string()))
        );
        assert_unique_positions(&board);
    }

    #[test]
    fn find_first_empty_scans_row_major() {
        let mut board = Board::default();
        board.place(champion("a", 1, &[]), BoardPosition::new(0, 0)).unwrap();
        board.place(champion("b", 1, &[]), BoardPosition::new(1, 0)).unwrap();
        assert_eq!(board.find_first_empty(), Some(BoardPosition::new(2, 0)));

        // A free cell at the end of row 0 still precedes all of row 1.
        for col in 2..6 {
            board.place(champion("c", 1, &[]), BoardPosition::new(col, 0)).unwrap();
        }
        board.place(champion("d", 1, &[]), BoardPosition::new(0, 1)).unwrap();
        assert_eq!(board.find_first_empty(), Some(BoardPosition::new(6, 0)));
    }

    #[test]
    fn full_board_reports_board_full() {
        let mut board = Board::default();
        let annie = champion("annie", 1, &[]);
        for _ in 0..BOARD_CELLS {
            board.place_first_empty(annie.clone()).unwrap();
        }
        assert!(board.is_full());
        assert_eq!(board.find_first_empty(), None);
        assert_eq!(
            board.place_first_empty(annie).unwrap_err(),
            BoardError::BoardFull
        );
        assert_eq!(board.len(), BOARD_CELLS);
        assert_unique_positions(&board);
    }

    #[test]
    fn fourth_item_is_rejected_and_list_unchanged() {
        let mut board = Board::default();
        let id = board
            .place(champion("annie", 1, &[]), BoardPosition::new(0, 0))
            .unwrap()
            .id
            .clone();
        for name in ["a", "b", "c"] {
            board.equip_item(&id, item(name)).unwrap();
        }
        assert_eq!(
            board.equip_item(&id, item("d")),
            Err(BoardError::SlotsFull(id.clone()))
        );
        let ids: Vec<_> = board.get(&id).unwrap().items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn equip_on_unknown_entry_is_not_found() {
        let mut board = Board::default();
        assert_eq!(
            board.equip_item("ghost", item("a")),
            Err(BoardError::NotFound("ghost".to_string()))
        );
    }

    #[test]
    fn unequip_removes_by_index_and_ignores_out_of_range() {
        let mut board = Board::default();
        let id = board
            .place(champion("annie", 1, &[]), BoardPosition::new(0, 0))
            .unwrap()
            .id
            .clone();
        board.equip_item(&id, item("a")).unwrap();
        board.equip_item(&id, item("b")).unwrap();

        assert!(board.unequip_item(&id, 5).is_none());
        assert_eq!(board.get(&id).unwrap().items.len(), 2);

        let removed = board.unequip_item(&id, 0).unwrap();
        assert_eq!(removed.id, "a");
        assert_eq!(board.get(&id).unwrap().items[0].id, "b");
        assert!(board.unequip_item("ghost", 0).is_none());
    }

    #[test]
    fn remove_deletes_only_the_target_and_frees_its_cell() {
        let mut board = Board::default();
        let a = board.place(champion("a", 1, &[]), BoardPosition::new(0, 0)).unwrap().id.clone();
        let b = board.place(champion("b", 1, &[]), BoardPosition::new(1, 0)).unwrap().id.clone();

        let removed = board.remove(&a).unwrap();
        assert_eq!(removed.id, a);
        assert!(board.get(&b).is_some());
        assert_eq!(board.len(), 1);
        assert!(board.remove(&a).is_none());

        board.place(champion("c", 1, &[]), BoardPosition::new(0, 0)).unwrap();
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn load_round_trips_and_clear_is_idempotent() {
        let mut source = Board::default();
        let id = source
            .place(champion("annie", 1, &["Invoker"]), BoardPosition::new(2, 3))
            .unwrap()
            .id
            .clone();
        source.equip_item(&id, item("bf_sword")).unwrap();
        let snapshot = source.snapshot();

        let mut board = Board::default();
        board.load(snapshot.clone());
        assert_eq!(board.champions(), snapshot.as_slice());

        board.clear();
        assert!(board.is_empty());
        board.clear();
        assert!(board.is_empty());
        assert_eq!(board.find_first_empty(), Some(BoardPosition::new(0, 0)));
    }

    #[test]
    fn loaded_off_board_entry_does_not_hide_free_cells() {
        let mut entries = Vec::new();
        for row in 0..BOARD_ROWS {
            for col in 0..BOARD_COLS {
                if (col, row) != (6, 3) {
                    entries.push(PlacedChampion {
                        id: format!("pc-{col}-{row}"),
                        champion: champion("annie", 1, &[]),
                        position: BoardPosition::new(col, row),
                        items: Vec::new(),
                    });
                }
            }
        }
        entries.push(PlacedChampion {
            id: "stray".into(),
            champion: champion("jinx", 3, &[]),
            position: BoardPosition::new(9, 9),
            items: Vec::new(),
        });

        let mut board = Board::default();
        board.load(entries);
        assert_eq!(board.len(), 28);
        assert!(!board.is_full());
        assert_eq!(board.find_first_empty(), Some(BoardPosition::new(6, 3)));
        let placed = board.place_first_empty(champion("blitzcrank", 2, &[])).unwrap();
        assert_eq!(placed.position, BoardPosition::new(6, 3));
        assert!(board.is_full());
    }
}

//! Game board representation: hex types, labels and painted hexes.
//!
//! This module contains:
//! - `HexType`, the paintable terrain categories with their colors
//! - `HexLabel`, categorized short/long annotations attached to hexes
//! - `HexSpace`, one painted cell of the grid
//! - `GameBoard`, the aggregate that owns all of the above and keeps the
//!   references between them consistent
//! - `BoardSnapshot`, the plain shape a board is stored in
//!
//! Invariants held by `GameBoard` after every public operation:
//! - every hex's `type_id` names an existing type
//! - every hex's `label_id` is `None` or names an existing label
//!
//! Removing a type clears the hexes painted with it, and deleting a label
//! detaches it from the hexes that carry it, so neither can dangle.

use crate::color::{ColorError, Rgb};
use crate::hex::{HexCoord, InvalidHexKey, DEFAULT_RADIUS, MAX_RADIUS, MIN_RADIUS};
use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Identifier of a hex type, unique within a board
pub type TypeId = u32;

/// Identifier of a label, unique within a board (separate from type ids)
pub type LabelId = u32;

/// Errors returned by board operations. The board is unchanged when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum BoardError {
    #[error("Cannot paint a hex with unknown type id {0}")]
    InvalidTypeReference(TypeId),

    #[error("Unknown hex type id {0}")]
    UnknownType(TypeId),

    #[error("Unknown label id {0}")]
    UnknownLabel(LabelId),

    #[error("No hex painted at {0}")]
    EmptyHex(HexCoord),

    #[error(transparent)]
    InvalidHexKey(#[from] InvalidHexKey),

    #[error(transparent)]
    InvalidColor(#[from] ColorError),

    #[error("Corrupt board snapshot: {0}")]
    CorruptSnapshot(String),
}

/// A terrain or category that can be painted onto hexes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexType {
    pub id: TypeId,
    pub name: String,
    pub color: Rgb,
}

/// A short/long annotation, grouped under a free-text category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HexLabel {
    pub id: LabelId,
    pub category: String,
    /// Drawn inside the hex
    pub short_label: String,
    /// Shown when the hex is inspected
    pub long_label: String,
}

/// One painted cell of the grid.
///
/// Keyed by its location; there is never more than one `HexSpace` per location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexSpace {
    pub location: HexCoord,
    #[serde(rename = "labelID")]
    pub label_id: Option<LabelId>,
    #[serde(rename = "typeID")]
    pub type_id: TypeId,
}

impl HexSpace {
    /// Map key of this hex, `"x,y"`
    pub fn key(&self) -> String {
        self.location.key()
    }
}

/// A hex's type and label resolved against its board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexDetails<'a> {
    pub hex_type: &'a HexType,
    pub label: Option<&'a HexLabel>,
}

/// The complete game board.
///
/// Types, hexes and labels iterate in insertion order. Replacing an entry
/// keeps its position; removing one keeps the order of the rest.
#[derive(Debug, Clone, PartialEq)]
pub struct GameBoard {
    /// Unique name, also the persistence key
    name: String,
    types: IndexMap<TypeId, HexType>,
    hexes: IndexMap<HexCoord, HexSpace>,
    labels: IndexMap<LabelId, HexLabel>,
    /// Hex circumradius in pixels (display only)
    radius: f64,
}

impl GameBoard {
    /// Create an empty board
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: IndexMap::new(),
            hexes: IndexMap::new(),
            labels: IndexMap::new(),
            radius: DEFAULT_RADIUS,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Set the display radius, clamped to the range the editor offers
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = clamp_radius(radius);
    }

    // ==================== Types ====================

    /// All types, in insertion order
    pub fn types_list(&self) -> Vec<&HexType> {
        self.types.values().collect()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Look up a type by id
    pub fn type_by_id(&self, id: TypeId) -> Result<&HexType, BoardError> {
        self.types.get(&id).ok_or(BoardError::UnknownType(id))
    }

    /// Add a new type and return its id (the smallest id not in use).
    pub fn add_type(&mut self, name: &str, color: &str) -> Result<TypeId, BoardError> {
        let color: Rgb = color.parse()?;
        let id = smallest_unused_id(&self.types);
        self.types.insert(
            id,
            HexType {
                id,
                name: name.to_string(),
                color,
            },
        );
        debug!("Added type {name} with id {id}");
        Ok(id)
    }

    /// Remove a type along with every hex painted with it.
    ///
    /// Removing an id that does not exist is an error, not a no-op.
    pub fn remove_type(&mut self, id: TypeId) -> Result<(), BoardError> {
        if !self.types.contains_key(&id) {
            return Err(BoardError::UnknownType(id));
        }

        let before = self.hexes.len();
        self.hexes.retain(|_, hex| hex.type_id != id);
        self.types.shift_remove(&id);
        debug!(
            "Removed type {id} and {} hexes painted with it",
            before - self.hexes.len()
        );
        Ok(())
    }

    /// Change the display color of a type
    pub fn set_type_color(&mut self, id: TypeId, color: &str) -> Result<(), BoardError> {
        let color: Rgb = color.parse()?;
        let hex_type = self.types.get_mut(&id).ok_or(BoardError::UnknownType(id))?;
        hex_type.color = color;
        Ok(())
    }

    /// Rename a type. Names are display text and may repeat.
    pub fn rename_type(&mut self, id: TypeId, name: &str) -> Result<(), BoardError> {
        let hex_type = self.types.get_mut(&id).ok_or(BoardError::UnknownType(id))?;
        hex_type.name = name.to_string();
        Ok(())
    }

    // ==================== Hexes ====================

    /// All painted hexes, in the order they were first painted
    pub fn hexes(&self) -> impl Iterator<Item = &HexSpace> {
        self.hexes.values()
    }

    pub fn hex_count(&self) -> usize {
        self.hexes.len()
    }

    /// The hex painted at `location`, if any
    pub fn hex_at(&self, location: HexCoord) -> Option<&HexSpace> {
        self.hexes.get(&location)
    }

    /// Paint `location` with a type.
    ///
    /// An already painted hex keeps its label and its draw position; a fresh
    /// one starts without a label and is drawn last.
    pub fn set_hex_type(&mut self, location: HexCoord, type_id: TypeId) -> Result<(), BoardError> {
        if !self.types.contains_key(&type_id) {
            return Err(BoardError::InvalidTypeReference(type_id));
        }

        let label_id = self.hexes.get(&location).and_then(|hex| hex.label_id);
        self.hexes.insert(
            location,
            HexSpace {
                location,
                label_id,
                type_id,
            },
        );
        Ok(())
    }

    /// Remove the hex at `location`. Does nothing if it is not painted.
    pub fn clear_hex(&mut self, location: HexCoord) {
        if self.hexes.shift_remove(&location).is_some() {
            debug!("Removing hex {location} from the game.");
        }
    }

    /// Remove the hex with the given `"x,y"` key. Does nothing if it is not painted.
    pub fn clear_hex_by_key(&mut self, key: &str) -> Result<(), BoardError> {
        self.clear_hex(HexCoord::from_key(key)?);
        Ok(())
    }

    /// Keys of every hex painted with `type_id`, in paint order
    pub fn query_hexes_by_type_id(&self, type_id: TypeId) -> Vec<String> {
        self.hexes
            .values()
            .filter(|hex| hex.type_id == type_id)
            .map(HexSpace::key)
            .collect()
    }

    /// Attach a label to (or with `None`, detach it from) a painted hex
    pub fn set_hex_label(
        &mut self,
        location: HexCoord,
        label_id: Option<LabelId>,
    ) -> Result<(), BoardError> {
        if let Some(id) = label_id {
            if !self.labels.contains_key(&id) {
                return Err(BoardError::UnknownLabel(id));
            }
        }
        let hex = self
            .hexes
            .get_mut(&location)
            .ok_or(BoardError::EmptyHex(location))?;
        hex.label_id = label_id;
        Ok(())
    }

    /// [`GameBoard::set_hex_label`] addressed by `"x,y"` key
    pub fn set_hex_label_by_key(
        &mut self,
        key: &str,
        label_id: Option<LabelId>,
    ) -> Result<(), BoardError> {
        self.set_hex_label(HexCoord::from_key(key)?, label_id)
    }

    /// Resolve a hex's type and label
    pub fn details(&self, hex: &HexSpace) -> Result<HexDetails<'_>, BoardError> {
        Ok(HexDetails {
            hex_type: self.type_by_id(hex.type_id)?,
            label: hex.label_id.and_then(|id| self.labels.get(&id)),
        })
    }

    /// Details of the hex at `location`, `None` if it is not painted
    pub fn details_at(&self, location: HexCoord) -> Result<Option<HexDetails<'_>>, BoardError> {
        self.hexes
            .get(&location)
            .map(|hex| self.details(hex))
            .transpose()
    }

    /// [`GameBoard::details_at`] addressed by `"x,y"` key
    pub fn details_by_key(&self, key: &str) -> Result<Option<HexDetails<'_>>, BoardError> {
        self.details_at(HexCoord::from_key(key)?)
    }

    // ==================== Labels ====================

    /// All labels, in insertion order
    pub fn labels(&self) -> impl Iterator<Item = &HexLabel> {
        self.labels.values()
    }

    pub fn label_by_id(&self, id: LabelId) -> Result<&HexLabel, BoardError> {
        self.labels.get(&id).ok_or(BoardError::UnknownLabel(id))
    }

    /// Create a label under a fresh id (smallest id not in use)
    pub fn create_label(&mut self, category: &str, short_label: &str, long_label: &str) -> LabelId {
        let id = smallest_unused_id(&self.labels);
        self.update_label(id, category, short_label, long_label);
        id
    }

    /// Insert or replace the label stored under `id`
    pub fn update_label(&mut self, id: LabelId, category: &str, short_label: &str, long_label: &str) {
        self.labels.insert(
            id,
            HexLabel {
                id,
                category: category.to_string(),
                short_label: short_label.to_string(),
                long_label: long_label.to_string(),
            },
        );
    }

    /// Delete a label, detaching it from every hex that carries it first
    pub fn delete_label(&mut self, id: LabelId) -> Result<(), BoardError> {
        if !self.labels.contains_key(&id) {
            return Err(BoardError::UnknownLabel(id));
        }

        for hex in self.hexes.values_mut() {
            if hex.label_id == Some(id) {
                hex.label_id = None;
            }
        }
        self.labels.shift_remove(&id);
        debug!("Deleted label {id}");
        Ok(())
    }

    /// Labels grouped by category.
    ///
    /// Categories appear in the order they are first met while walking the
    /// labels in insertion order; labels keep that order within their category.
    pub fn category_label_map(&self) -> Vec<(String, Vec<&HexLabel>)> {
        let mut groups: Vec<(String, Vec<&HexLabel>)> = Vec::new();
        for label in self.labels.values() {
            match groups.iter_mut().find(|(category, _)| *category == label.category) {
                Some((_, labels)) => labels.push(label),
                None => groups.push((label.category.clone(), vec![label])),
            }
        }
        groups
    }

    /// Assign random labels to the hexes of one type.
    ///
    /// Each candidate hex gets a label drawn uniformly from `label_ids`.
    /// Hexes that already have a label are skipped unless `overwrite` is set.
    /// Returns the number of hexes that were assigned a label.
    pub fn random_fill_labels<R: Rng>(
        &mut self,
        type_id: TypeId,
        label_ids: &[LabelId],
        overwrite: bool,
        rng: &mut R,
    ) -> Result<usize, BoardError> {
        if let Some(&missing) = label_ids.iter().find(|id| !self.labels.contains_key(*id)) {
            return Err(BoardError::UnknownLabel(missing));
        }

        let candidates: Vec<HexCoord> = self
            .hexes
            .values()
            .filter(|hex| hex.type_id == type_id && (overwrite || hex.label_id.is_none()))
            .map(|hex| hex.location)
            .collect();

        if label_ids.is_empty() || candidates.is_empty() {
            warn!("Cannot assign labels randomly. Not enough hexes or options.");
            return Ok(0);
        }

        for location in &candidates {
            if let Some(hex) = self.hexes.get_mut(location) {
                hex.label_id = label_ids.choose(rng).copied();
            }
        }
        Ok(candidates.len())
    }

    // ==================== Snapshots ====================

    /// Plain snapshot of this board for storage
    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            name: self.name.clone(),
            types: self.types.clone(),
            hexes: self
                .hexes
                .values()
                .map(|hex| (hex.key(), *hex))
                .collect(),
            labels: self.labels.clone(),
            radius: self.radius,
        }
    }

    /// Rebuild a board from a snapshot, checking every reference in it
    pub fn from_snapshot(snapshot: BoardSnapshot) -> Result<Self, BoardError> {
        let corrupt = |msg: String| BoardError::CorruptSnapshot(msg);

        for (id, hex_type) in &snapshot.types {
            if hex_type.id != *id {
                return Err(corrupt(format!("type stored under {id} has id {}", hex_type.id)));
            }
        }
        for (id, label) in &snapshot.labels {
            if label.id != *id {
                return Err(corrupt(format!("label stored under {id} has id {}", label.id)));
            }
        }

        let mut hexes = IndexMap::with_capacity(snapshot.hexes.len());
        for (key, hex) in snapshot.hexes {
            if key != hex.key() {
                return Err(corrupt(format!("hex stored under {key:?} is at {}", hex.location)));
            }
            if !snapshot.types.contains_key(&hex.type_id) {
                return Err(corrupt(format!("hex {key} has unknown type {}", hex.type_id)));
            }
            if let Some(label_id) = hex.label_id {
                if !snapshot.labels.contains_key(&label_id) {
                    return Err(corrupt(format!("hex {key} has unknown label {label_id}")));
                }
            }
            hexes.insert(hex.location, hex);
        }

        Ok(Self {
            name: snapshot.name,
            types: snapshot.types,
            hexes,
            labels: snapshot.labels,
            radius: clamp_radius(snapshot.radius),
        })
    }

    /// Serialize to the stored JSON shape
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }

    /// Parse and validate the stored JSON shape
    pub fn from_json(json: &str) -> Result<Self, BoardError> {
        let snapshot: BoardSnapshot =
            serde_json::from_str(json).map_err(|e| BoardError::CorruptSnapshot(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }
}

/// Stored shape of a board.
///
/// Maps are keyed the same way the entities identify themselves: types and
/// labels by id, hexes by their `"x,y"` key. They keep the board's insertion
/// order through a JSON round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub name: String,
    pub types: IndexMap<TypeId, HexType>,
    pub hexes: IndexMap<String, HexSpace>,
    pub labels: IndexMap<LabelId, HexLabel>,
    #[serde(default = "default_radius")]
    pub radius: f64,
}

fn default_radius() -> f64 {
    DEFAULT_RADIUS
}

/// Non-finite radii fall back to the default
fn clamp_radius(radius: f64) -> f64 {
    if radius.is_finite() {
        radius.clamp(MIN_RADIUS, MAX_RADIUS)
    } else {
        DEFAULT_RADIUS
    }
}

/// Smallest id not used as a key of `map`.
///
/// Freed ids are handed out again; boards already stored rely on it.
fn smallest_unused_id<V>(map: &IndexMap<u32, V>) -> u32 {
    let mut id = 0;
    while map.contains_key(&id) {
        id += 1;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn board_with_grass() -> GameBoard {
        let mut board = GameBoard::new("Test");
        board.add_type("Grass", "#FFFFFF").unwrap();
        board
    }

    #[test]
    fn test_new_board_defaults() {
        let board = GameBoard::new("Fresh");
        assert_eq!(board.name(), "Fresh");
        assert_eq!(board.radius(), DEFAULT_RADIUS);
        assert_eq!(board.type_count(), 0);
        assert_eq!(board.hex_count(), 0);
    }

    #[test]
    fn test_add_then_remove_type_on_empty_board() {
        let mut board = GameBoard::new("Test");
        let id = board.add_type("Water", "#0000FF").unwrap();
        board.remove_type(id).unwrap();

        assert_eq!(board.type_count(), 0);
        assert_eq!(board.hex_count(), 0);
    }

    #[test]
    fn test_type_ids_reuse_smallest_free_id() {
        let mut board = GameBoard::new("Test");
        assert_eq!(board.add_type("A", "#111").unwrap(), 0);
        assert_eq!(board.add_type("B", "#222").unwrap(), 1);
        assert_eq!(board.add_type("C", "#333").unwrap(), 2);

        board.remove_type(1).unwrap();
        assert_eq!(board.add_type("D", "#444").unwrap(), 1);
        assert_eq!(board.add_type("E", "#555").unwrap(), 3);
    }

    #[test]
    fn test_add_type_rejects_bad_color() {
        let mut board = GameBoard::new("Test");
        let result = board.add_type("Bad", "#12");
        assert!(matches!(result, Err(BoardError::InvalidColor(_))));
        assert_eq!(board.type_count(), 0);
    }

    #[test]
    fn test_add_type_allows_repeated_name() {
        let mut board = board_with_grass();
        assert_eq!(board.add_type("Grass", "#00FF00"), Ok(1));
        assert_eq!(board.type_count(), 2);
        assert_eq!(board.type_by_id(1).unwrap().color, Rgb::new(0, 255, 0));
    }

    #[test]
    fn test_types_keep_insertion_order_when_ids_are_reused() {
        let mut board = GameBoard::new("Test");
        board.add_type("A", "#111").unwrap();
        board.add_type("B", "#222").unwrap();
        board.remove_type(0).unwrap();
        assert_eq!(board.add_type("C", "#333").unwrap(), 0);

        let names: Vec<&str> = board.types_list().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }

    #[test]
    fn test_remove_unknown_type_fails() {
        let mut board = board_with_grass();
        assert_eq!(board.remove_type(7), Err(BoardError::UnknownType(7)));
        assert_eq!(board.type_count(), 1);
    }

    #[test]
    fn test_remove_type_clears_its_hexes_only() {
        let mut board = board_with_grass();
        let water = board.add_type("Water", "#0000FF").unwrap();
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        board.set_hex_type(HexCoord::new(1, 0), water).unwrap();
        board.set_hex_type(HexCoord::new(2, 0), water).unwrap();

        board.remove_type(water).unwrap();

        assert_eq!(board.hex_count(), 1);
        assert!(board.hex_at(HexCoord::new(0, 0)).is_some());
        assert!(board.hex_at(HexCoord::new(1, 0)).is_none());
    }

    #[test]
    fn test_set_hex_type_twice_keeps_single_hex() {
        let mut board = board_with_grass();
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();

        assert_eq!(board.hex_count(), 1);
        let hex = board.hex_at(HexCoord::new(0, 0)).unwrap();
        assert_eq!(hex.key(), "0,0");
        assert_eq!(hex.label_id, None);
    }

    #[test]
    fn test_set_hex_type_preserves_label() {
        let mut board = board_with_grass();
        let sand = board.add_type("Sand", "#C2B280").unwrap();
        let label = board.create_label("Terrain", "Fo", "Forest");
        let at = HexCoord::new(3, 1);

        board.set_hex_type(at, 0).unwrap();
        board.set_hex_label(at, Some(label)).unwrap();
        board.set_hex_type(at, sand).unwrap();

        let hex = board.hex_at(at).unwrap();
        assert_eq!(hex.type_id, sand);
        assert_eq!(hex.label_id, Some(label));
    }

    #[test]
    fn test_set_hex_type_with_unknown_type() {
        let mut board = board_with_grass();
        assert_eq!(
            board.set_hex_type(HexCoord::new(0, 0), 9),
            Err(BoardError::InvalidTypeReference(9))
        );
        assert_eq!(board.hex_count(), 0);
    }

    #[test]
    fn test_clear_hex_is_noop_when_absent() {
        let mut board = board_with_grass();
        board.set_hex_type(HexCoord::new(1, 1), 0).unwrap();

        board.clear_hex(HexCoord::new(5, 5));
        assert_eq!(board.hex_count(), 1);

        board.clear_hex_by_key("1,1").unwrap();
        assert_eq!(board.hex_count(), 0);
        board.clear_hex_by_key("1,1").unwrap();
    }

    #[test]
    fn test_clear_hex_by_malformed_key() {
        let mut board = board_with_grass();
        assert!(matches!(
            board.clear_hex_by_key("nope"),
            Err(BoardError::InvalidHexKey(_))
        ));
    }

    #[test]
    fn test_query_hexes_by_type() {
        let mut board = board_with_grass();
        let water = board.add_type("Water", "#00F").unwrap();
        board.set_hex_type(HexCoord::new(0, 1), water).unwrap();
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        board.set_hex_type(HexCoord::new(2, 0), water).unwrap();

        assert_eq!(board.query_hexes_by_type_id(water), vec!["0,1", "2,0"]);
        assert_eq!(board.query_hexes_by_type_id(0), vec!["0,0"]);
        assert!(board.query_hexes_by_type_id(42).is_empty());
    }

    #[test]
    fn test_query_hexes_follows_paint_order() {
        let mut board = board_with_grass();
        board.set_hex_type(HexCoord::new(5, 5), 0).unwrap();
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();

        assert_eq!(board.query_hexes_by_type_id(0), vec!["5,5", "0,0"]);
    }

    #[test]
    fn test_repaint_keeps_position_and_clear_keeps_the_rest() {
        let mut board = board_with_grass();
        let water = board.add_type("Water", "#00F").unwrap();
        for x in [3, 1, 2] {
            board.set_hex_type(HexCoord::new(x, 0), 0).unwrap();
        }
        board.set_hex_type(HexCoord::new(3, 0), water).unwrap();
        board.clear_hex(HexCoord::new(1, 0));
        board.set_hex_type(HexCoord::new(1, 0), 0).unwrap();

        let keys: Vec<String> = board.hexes().map(HexSpace::key).collect();
        assert_eq!(keys, vec!["3,0", "2,0", "1,0"]);
    }

    #[test]
    fn test_details_resolve_type_and_label() {
        let mut board = board_with_grass();
        let label = board.create_label("Terrain", "Fo", "Forest");
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        board.set_hex_type(HexCoord::new(1, 0), 0).unwrap();
        board.set_hex_label(HexCoord::new(1, 0), Some(label)).unwrap();

        let plain = board.details_at(HexCoord::new(0, 0)).unwrap().unwrap();
        assert_eq!(plain.hex_type.name, "Grass");
        assert!(plain.label.is_none());

        let labeled = board.details_by_key("1,0").unwrap().unwrap();
        assert_eq!(labeled.label.map(|l| l.short_label.as_str()), Some("Fo"));

        assert_eq!(board.details_at(HexCoord::new(9, 9)), Ok(None));
    }

    #[test]
    fn test_details_of_foreign_hex_fails() {
        let board = board_with_grass();
        let stray = HexSpace {
            location: HexCoord::new(0, 0),
            label_id: None,
            type_id: 5,
        };
        assert_eq!(board.details(&stray), Err(BoardError::UnknownType(5)));
    }

    #[test]
    fn test_set_hex_label_errors() {
        let mut board = board_with_grass();
        let label = board.create_label("Terrain", "Fo", "Forest");

        assert_eq!(
            board.set_hex_label(HexCoord::new(0, 0), Some(label)),
            Err(BoardError::EmptyHex(HexCoord::new(0, 0)))
        );

        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        assert_eq!(
            board.set_hex_label(HexCoord::new(0, 0), Some(99)),
            Err(BoardError::UnknownLabel(99))
        );

        board.set_hex_label_by_key("0,0", Some(label)).unwrap();
        board.set_hex_label_by_key("0,0", None).unwrap();
        assert_eq!(board.hex_at(HexCoord::new(0, 0)).unwrap().label_id, None);
    }

    #[test]
    fn test_label_ids_are_independent_of_type_ids() {
        let mut board = GameBoard::new("Test");
        board.add_type("A", "#111").unwrap();
        board.add_type("B", "#222").unwrap();

        assert_eq!(board.create_label("Terrain", "Fo", "Forest"), 0);
        assert_eq!(board.create_label("Terrain", "Mt", "Mountain"), 1);
    }

    #[test]
    fn test_update_label_upserts() {
        let mut board = GameBoard::new("Test");
        let id = board.create_label("Terrain", "Fo", "Forest");
        board.update_label(id, "Terrain", "Fr", "Deep forest");
        board.update_label(7, "Events", "Ev", "Random event");

        assert_eq!(board.label_by_id(id).unwrap().short_label, "Fr");
        assert_eq!(board.label_by_id(7).unwrap().category, "Events");
        assert_eq!(board.create_label("Events", "Ot", "Other"), 1);
    }

    #[test]
    fn test_delete_label_detaches_hexes() {
        let mut board = board_with_grass();
        let label = board.create_label("Terrain", "Fo", "Forest");
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        board.set_hex_label(HexCoord::new(0, 0), Some(label)).unwrap();

        board.delete_label(label).unwrap();

        let hex = board.hex_at(HexCoord::new(0, 0)).unwrap();
        assert_eq!(hex.label_id, None);
        assert_eq!(hex.type_id, 0);
        assert_eq!(board.delete_label(label), Err(BoardError::UnknownLabel(label)));
    }

    #[test]
    fn test_category_label_map_groups_by_first_seen() {
        let mut board = GameBoard::new("Test");
        let forest = board.create_label("Terrain", "Fo", "Forest");
        board.create_label("Events", "Ra", "Raid");
        let mountain = board.create_label("Terrain", "Mt", "Mountain");

        let map = board.category_label_map();
        let categories: Vec<&str> = map.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(categories, vec!["Terrain", "Events"]);

        let terrain: Vec<LabelId> = map[0].1.iter().map(|l| l.id).collect();
        assert_eq!(terrain, vec![forest, mountain]);
    }

    #[test]
    fn test_category_label_map_with_reused_id() {
        let mut board = GameBoard::new("Test");
        assert_eq!(board.create_label("X", "X", "Ex"), 0);
        assert_eq!(board.create_label("Y", "Y", "Why"), 1);
        board.delete_label(0).unwrap();
        assert_eq!(board.create_label("Z", "Z", "Zed"), 0);

        let categories: Vec<String> = board
            .category_label_map()
            .into_iter()
            .map(|(category, _)| category)
            .collect();
        assert_eq!(categories, vec!["Y", "Z"]);
    }

    #[test]
    fn test_set_type_color_and_rename() {
        let mut board = board_with_grass();
        board.add_type("Water", "#00F").unwrap();

        board.set_type_color(0, "#00FF00").unwrap();
        assert_eq!(board.type_by_id(0).unwrap().color, Rgb::new(0, 255, 0));
        assert!(board.set_type_color(0, "green").is_err());
        assert_eq!(board.set_type_color(5, "#000"), Err(BoardError::UnknownType(5)));

        board.rename_type(0, "Meadow").unwrap();
        assert_eq!(board.type_by_id(0).unwrap().name, "Meadow");
        board.rename_type(0, "Water").unwrap();
        assert_eq!(board.type_by_id(0).unwrap().name, "Water");
        assert_eq!(board.rename_type(9, "Sea"), Err(BoardError::UnknownType(9)));
    }

    #[test]
    fn test_radius_is_clamped() {
        let mut board = GameBoard::new("Test");
        board.set_radius(5.0);
        assert_eq!(board.radius(), MIN_RADIUS);
        board.set_radius(500.0);
        assert_eq!(board.radius(), MAX_RADIUS);
        board.set_radius(42.0);
        assert_eq!(board.radius(), 42.0);
    }

    #[test]
    fn test_random_fill_only_empty() {
        let mut board = board_with_grass();
        let water = board.add_type("Water", "#00F").unwrap();
        let forest = board.create_label("Terrain", "Fo", "Forest");
        let mountain = board.create_label("Terrain", "Mt", "Mountain");
        let keep = board.create_label("Terrain", "Ke", "Keep");

        for x in 0..4 {
            board.set_hex_type(HexCoord::new(x, 0), 0).unwrap();
        }
        board.set_hex_type(HexCoord::new(0, 1), water).unwrap();
        board.set_hex_label(HexCoord::new(0, 0), Some(keep)).unwrap();

        let mut rng = StdRng::seed_from_u64(7);
        let filled = board
            .random_fill_labels(0, &[forest, mountain], false, &mut rng)
            .unwrap();

        assert_eq!(filled, 3);
        assert_eq!(board.hex_at(HexCoord::new(0, 0)).unwrap().label_id, Some(keep));
        for x in 1..4 {
            let label = board.hex_at(HexCoord::new(x, 0)).unwrap().label_id;
            assert!(label == Some(forest) || label == Some(mountain));
        }
        assert_eq!(board.hex_at(HexCoord::new(0, 1)).unwrap().label_id, None);
    }

    #[test]
    fn test_random_fill_overwrite() {
        let mut board = board_with_grass();
        let forest = board.create_label("Terrain", "Fo", "Forest");
        let keep = board.create_label("Terrain", "Ke", "Keep");
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        board.set_hex_label(HexCoord::new(0, 0), Some(keep)).unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        let filled = board.random_fill_labels(0, &[forest], true, &mut rng).unwrap();

        assert_eq!(filled, 1);
        assert_eq!(board.hex_at(HexCoord::new(0, 0)).unwrap().label_id, Some(forest));
    }

    #[test]
    fn test_random_fill_without_candidates() {
        let mut board = board_with_grass();
        let forest = board.create_label("Terrain", "Fo", "Forest");
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(board.random_fill_labels(0, &[forest], false, &mut rng), Ok(0));
        board.set_hex_type(HexCoord::new(0, 0), 0).unwrap();
        assert_eq!(board.random_fill_labels(0, &[], false, &mut rng), Ok(0));
        assert_eq!(
            board.random_fill_labels(0, &[forest, 8], false, &mut rng),
            Err(BoardError::UnknownLabel(8))
        );
        assert_eq!(board.hex_at(HexCoord::new(0, 0)).unwrap().label_id, None);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut board = board_with_grass();
        let label = board.create_label("Terrain", "Fo", "Forest");
        board.set_hex_type(HexCoord::new(1, 2), 0).unwrap();
        board.set_hex_label(HexCoord::new(1, 2), Some(label)).unwrap();
        board.set_radius(45.0);

        let restored = GameBoard::from_snapshot(board.snapshot()).unwrap();
        assert_eq!(restored, board);
    }

    #[test]
    fn test_stored_json_shape() {
        let mut board = board_with_grass();
        board.set_hex_type(HexCoord::new(1, 2), 0).unwrap();

        let value: serde_json::Value = serde_json::from_str(&board.to_json().unwrap()).unwrap();
        assert_eq!(value["name"], "Test");
        assert_eq!(value["types"]["0"]["color"], "#FFFFFF");
        assert_eq!(value["hexes"]["1,2"]["location"], serde_json::json!([1, 2]));
        assert_eq!(value["hexes"]["1,2"]["typeID"], 0);
        assert!(value["hexes"]["1,2"]["labelID"].is_null());
        assert_eq!(value["radius"], 30.0);
    }

    #[test]
    fn test_loads_stored_json() {
        let json = r##"{
            "name": "Stored",
            "types": { "0": { "id": 0, "name": "Default", "color": "#FFF" } },
            "hexes": { "2,3": { "location": [2, 3], "labelID": 0, "typeID": 0 } },
            "labels": { "0": { "id": 0, "category": "Terrain", "shortLabel": "Fo", "longLabel": "Forest" } },
            "radius": 30
        }"##;

        let board = GameBoard::from_json(json).unwrap();
        assert_eq!(board.name(), "Stored");
        assert_eq!(board.radius(), 30.0);
        assert_eq!(board.type_by_id(0).unwrap().color, Rgb::WHITE);
        let details = board.details_at(HexCoord::new(2, 3)).unwrap().unwrap();
        assert_eq!(details.label.unwrap().long_label, "Forest");
    }

    #[test]
    fn test_snapshot_with_dangling_type_is_rejected() {
        let mut snapshot = board_with_grass().snapshot();
        snapshot.hexes.insert(
            "0,0".to_string(),
            HexSpace {
                location: HexCoord::new(0, 0),
                label_id: None,
                type_id: 3,
            },
        );
        assert!(matches!(
            GameBoard::from_snapshot(snapshot),
            Err(BoardError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_snapshot_with_mismatched_key_is_rejected() {
        let mut snapshot = board_with_grass().snapshot();
        snapshot.hexes.insert(
            "5,5".to_string(),
            HexSpace {
                location: HexCoord::new(0, 0),
                label_id: None,
                type_id: 0,
            },
        );
        assert!(matches!(
            GameBoard::from_snapshot(snapshot),
            Err(BoardError::CorruptSnapshot(_))
        ));
    }

    #[test]
    fn test_snapshot_with_dangling_label_is_rejected() {
        let mut snapshot = board_with_grass().snapshot();
        snapshot.hexes.insert(
            "0,0".to_string(),
            HexSpace {
                location: HexCoord::new(0, 0),
                label_id: Some(4),
                type_id: 0,
            },
        );
        assert!(GameBoard::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_loads_types_sharing_a_name() {
        let json = r##"{
            "name": "Twins",
            "types": {
                "0": { "id": 0, "name": "Default", "color": "#FFFFFF" },
                "1": { "id": 1, "name": "Default", "color": "#000000" }
            },
            "hexes": {},
            "labels": {}
        }"##;

        let board = GameBoard::from_json(json).unwrap();
        assert_eq!(board.type_count(), 2);
        assert_eq!(board.type_by_id(1).unwrap().name, "Default");
    }

    #[test]
    fn test_loaded_radius_is_clamped() {
        let stored = |radius: &str| {
            format!(r#"{{ "name": "R", "types": {{}}, "hexes": {{}}, "labels": {{}}, "radius": {radius} }}"#)
        };

        assert_eq!(GameBoard::from_json(&stored("0")).unwrap().radius(), MIN_RADIUS);
        assert_eq!(GameBoard::from_json(&stored("-4")).unwrap().radius(), MIN_RADIUS);
        assert_eq!(GameBoard::from_json(&stored("250")).unwrap().radius(), MAX_RADIUS);
        assert_eq!(GameBoard::from_json(&stored("45")).unwrap().radius(), 45.0);

        let mut snapshot = GameBoard::new("R").snapshot();
        snapshot.radius = f64::NAN;
        assert_eq!(GameBoard::from_snapshot(snapshot).unwrap().radius(), DEFAULT_RADIUS);
    }

    #[test]
    fn test_json_keeps_insertion_order() {
        let mut board = board_with_grass();
        board.set_hex_type(HexCoord::new(4, 4), 0).unwrap();
        board.set_hex_type(HexCoord::new(0, 2), 0).unwrap();
        board.create_label("B", "b", "Bee");
        board.create_label("A", "a", "Ay");
        board.delete_label(0).unwrap();
        board.create_label("C", "c", "Sea");

        let restored = GameBoard::from_json(&board.to_json().unwrap()).unwrap();
        let keys: Vec<String> = restored.hexes().map(HexSpace::key).collect();
        assert_eq!(keys, vec!["4,4", "0,2"]);
        let labels: Vec<&str> = restored.labels().map(|l| l.category.as_str()).collect();
        assert_eq!(labels, vec!["A", "C"]);
    }
}

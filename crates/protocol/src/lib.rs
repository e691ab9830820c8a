use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub mod limits {
    pub const BOARD_COLS: u8 = 7;
    pub const BOARD_ROWS: u8 = 4;
    pub const BOARD_CELLS: usize = BOARD_COLS as usize * BOARD_ROWS as usize;
    pub const MAX_ITEMS: usize = 3;
}

/// Reward rank of an active breakpoint. Serialized as the raw game-data number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StyleTier {
    Bronze = 1,
    Silver = 2,
    Gold = 3,
    Prismatic = 4,
}

impl StyleTier {
    pub fn from_raw(raw: i64) -> Option<Self> {
        match raw {
            1 => Some(Self::Bronze),
            2 => Some(Self::Silver),
            3 => Some(Self::Gold),
            4 => Some(Self::Prismatic),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Bronze => "Bronze",
            Self::Silver => "Silver",
            Self::Gold => "Gold",
            Self::Prismatic => "Prismatic",
        }
    }
}

impl TryFrom<u8> for StyleTier {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::from_raw(i64::from(raw)).ok_or_else(|| format!("unknown style tier {raw}"))
    }
}

impl From<StyleTier> for u8 {
    fn from(tier: StyleTier) -> Self {
        tier as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl Rarity {
    /// Costs outside 1..=5 clamp to the nearest rarity.
    pub fn from_cost(cost: u8) -> Self {
        match cost {
            0 | 1 => Self::Common,
            2 => Self::Uncommon,
            3 => Self::Rare,
            4 => Self::Epic,
            _ => Self::Legendary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChampionStats {
    pub damage: f64,
    pub health: f64,
    pub armor: f64,
    pub magic_resist: f64,
    pub attack_speed: f64,
    pub range: f64,
}

impl Default for ChampionStats {
    fn default() -> Self {
        Self {
            damage: 50.0,
            health: 500.0,
            armor: 20.0,
            magic_resist: 20.0,
            attack_speed: 0.6,
            range: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ability {
    pub name: String,
    pub description: String,
    pub mana_cost: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub damage: Vec<f64>,
}

impl Default for Ability {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            description: "No description available".to_string(),
            mana_cost: 50,
            damage: Vec::new(),
        }
    }
}

fn default_cost() -> u8 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Champion {
    pub id: String,
    pub name: String,
    #[serde(default = "default_cost")]
    pub cost: u8,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub stats: ChampionStats,
    #[serde(default)]
    pub ability: Ability,
    #[serde(default)]
    pub image: String,
}

impl Champion {
    pub fn rarity(&self) -> Rarity {
        Rarity::from_cost(self.cost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Breakpoint {
    pub min_units: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_units: Option<u32>,
    pub style: StyleTier,
}

impl Breakpoint {
    pub fn new(min_units: u32, style: StyleTier) -> Self {
        Self {
            min_units,
            max_units: None,
            style,
        }
    }
}

/// A synergy category. Breakpoints are expected in ascending `min_units` order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trait {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(alias = "effects", default = "Trait::default_breakpoints")]
    pub breakpoints: Vec<Breakpoint>,
    #[serde(default)]
    pub image: String,
}

impl Trait {
    /// The 2/4/6 bronze/silver/gold ramp used when game data omits effects.
    pub fn default_breakpoints() -> Vec<Breakpoint> {
        vec![
            Breakpoint::new(2, StyleTier::Bronze),
            Breakpoint::new(4, StyleTier::Silver),
            Breakpoint::new(6, StyleTier::Gold),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stats: BTreeMap<String, f64>,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recipe: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Augment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_cost")]
    pub tier: u8,
    #[serde(default)]
    pub associated_traits: Vec<String>,
    #[serde(default)]
    pub image: String,
}

/// Hex cell on the board: `x` is the column (0..7), `y` the row (0..4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardPosition {
    pub x: u8,
    pub y: u8,
}

impl BoardPosition {
    pub const fn new(col: u8, row: u8) -> Self {
        Self { x: col, y: row }
    }

    pub fn is_on_board(self) -> bool {
        self.x < limits::BOARD_COLS && self.y < limits::BOARD_ROWS
    }
}

impl fmt::Display for BoardPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedChampion {
    pub id: String,
    pub champion: Arc<Champion>,
    pub position: BoardPosition,
    #[serde(default)]
    pub items: Vec<Arc<Item>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamComposition {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub champions: Vec<PlacedChampion>,
    pub created_at_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamExport {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub champions: Vec<PlacedChampion>,
    pub total_cost: u32,
    pub traits: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynergyView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub count: usize,
    pub active_level: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleTier>,
    pub style_label: String,
    pub breakpoints: Vec<Breakpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_breakpoint: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub units: usize,
    pub total_cost: u32,
    pub gold_or_better: usize,
    pub traits: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    pub champions: Vec<PlacedChampion>,
    pub synergies: Vec<SynergyView>,
    pub summary: TeamSummary,
    pub augments: Vec<Augment>,
}

/// Champion library row: the catalog champion with its cost rarity alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChampionView {
    #[serde(flatten)]
    pub champion: Arc<Champion>,
    pub rarity: Rarity,
}

impl From<Arc<Champion>> for ChampionView {
    fn from(champion: Arc<Champion>) -> Self {
        Self {
            rarity: champion.rarity(),
            champion,
        }
    }
}

/// Item panel split: standard components and everything built from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemGroups {
    pub basic: Vec<Arc<Item>>,
    pub combined: Vec<Arc<Item>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogInfo {
    pub version: String,
    pub champions: usize,
    pub traits: usize,
    pub items: usize,
    pub augments: usize,
    pub trait_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRequest {
    pub champion_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<BoardPosition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    pub placed_id: String,
    pub position: BoardPosition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipRequest {
    pub item_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTeamRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub code: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportShareRequest {
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_without_effects_gets_default_ramp() {
        let t: Trait = serde_json::from_str(r#"{"id":"TFT15_Sorcerer","name":"Sorcerer"}"#).unwrap();
        assert_eq!(t.breakpoints, Trait::default_breakpoints());
    }

    #[test]
    fn trait_reads_game_data_effects_key() {
        let t: Trait = serde_json::from_str(
            r#"{"id":"x","name":"X","effects":[{"minUnits":3,"maxUnits":5,"style":4}]}"#,
        )
        .unwrap();
        assert_eq!(t.breakpoints[0].min_units, 3);
        assert_eq!(t.breakpoints[0].max_units, Some(5));
        assert_eq!(t.breakpoints[0].style, StyleTier::Prismatic);
    }

    #[test]
    fn unknown_style_is_rejected() {
        let r: Result<Breakpoint, _> = serde_json::from_str(r#"{"minUnits":2,"style":9}"#);
        assert!(r.is_err());
    }

    #[test]
    fn champion_defaults_when_fields_missing() {
        let c: Champion = serde_json::from_str(r#"{"id":"annie","name":"Annie"}"#).unwrap();
        assert_eq!(c.cost, 1);
        assert_eq!(c.rarity(), Rarity::Common);
        assert_eq!(c.stats.health, 500.0);
        assert_eq!(c.ability.name, "Unknown");
    }

    #[test]
    fn positions_outside_grid_are_off_board() {
        assert!(BoardPosition::new(6, 3).is_on_board());
        assert!(!BoardPosition::new(7, 0).is_on_board());
        assert!(!BoardPosition::new(0, 4).is_on_board());
    }

    #[test]
    fn champion_view_flattens_with_rarity() {
        let c: Champion =
            serde_json::from_str(r#"{"id":"jinx","name":"Jinx","cost":3}"#).unwrap();
        let v = serde_json::to_value(ChampionView::from(Arc::new(c))).unwrap();
        assert_eq!(v["id"], "jinx");
        assert_eq!(v["cost"], 3);
        assert_eq!(v["rarity"], "rare");
    }
}

//! Link-embeddable team codes: base64 (URL-safe, unpadded) over a compact JSON body.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hexcomp_protocol::{BoardPosition, PlacedChampion};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::board::{Board, BoardError, DuplicatePolicy};
use crate::catalog::Catalog;

pub const UNTITLED_TEAM: &str = "Untitled Team";

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share code is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("share code payload is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown champion {0}")]
    UnknownChampion(String),
    #[error("unknown item {0}")]
    UnknownItem(String),
    #[error(transparent)]
    Board(#[from] BoardError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedChampion {
    #[serde(alias = "championId")]
    pub id: String,
    pub position: BoardPosition,
    #[serde(default)]
    pub items: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedTeam {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub champions: Vec<SharedChampion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl SharedTeam {
    pub fn from_board(name: &str, description: &str, champions: &[PlacedChampion]) -> Self {
        let name = name.trim();
        Self {
            name: if name.is_empty() {
                UNTITLED_TEAM.to_string()
            } else {
                name.to_string()
            },
            description: description.to_string(),
            champions: champions
                .iter()
                .map(|pc| SharedChampion {
                    id: pc.champion.id.clone(),
                    position: pc.position,
                    items: pc.items.iter().map(|i| i.id.clone()).collect(),
                })
                .collect(),
            created_at: Some(crate::rfc3339_from_ms(crate::now_ms())),
        }
    }

    /// Rebuilds a board through the regular placement and equip checks, so a
    /// hand-edited code cannot stack champions or overfill item slots.
    pub fn hydrate(&self, catalog: &Catalog, policy: DuplicatePolicy) -> Result<Board, ShareError> {
        let mut board = Board::new(policy);
        for shared in &self.champions {
            let champion = catalog
                .champion(&shared.id)
                .ok_or_else(|| ShareError::UnknownChampion(shared.id.clone()))?;
            let placed_id = board.place(champion, shared.position)?.id.clone();
            for item_id in &shared.items {
                let item = catalog
                    .item(item_id)
                    .ok_or_else(|| ShareError::UnknownItem(item_id.clone()))?;
                board.equip_item(&placed_id, item)?;
            }
        }
        Ok(board)
    }
}

pub fn encode_share(
    name: &str,
    description: &str,
    champions: &[PlacedChampion],
) -> Result<String, ShareError> {
    let json = serde_json::to_vec(&SharedTeam::from_board(name, description, champions))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

/// Accepts either base64 alphabet, padded or not.
pub fn decode_share(code: &str) -> Result<SharedTeam, ShareError> {
    let normalized: String = code
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();
    let bytes = URL_SAFE_NO_PAD.decode(normalized)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub fn share_url(origin: &str, code: &str) -> String {
    format!("{}/?team={code}", origin.trim_end_matches('/'))
}

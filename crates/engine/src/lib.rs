//! Planner core for hexcomp: board state, synergy resolution, catalogs,
//! share codes and the SQLite-backed composition store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod board;
pub mod catalog;
pub mod share;
pub mod store;
pub mod synergy;

pub use board::{Board, BoardError, DuplicatePolicy};
pub use catalog::{Catalog, ChampionQuery};
pub use share::{decode_share, encode_share, share_url, ShareError, SharedChampion, SharedTeam};
pub use store::{team_export, CompositionStore, StoreError};
pub use synergy::{
    audit_trait_links, relevant_augments, resolve, resolve_active, strip_set_prefix, summarize,
    trait_key, TraitActivation, UnlinkedTrait,
};

static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(i64::MAX)
}

/// `{prefix}-{millis}-{counter}`; the counter keeps ids unique within one millisecond.
pub(crate) fn new_id(prefix: &str) -> String {
    let c = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}-{}-{c}", now_ms())
}

pub(crate) fn rfc3339_from_ms(ms: i64) -> String {
    use time::format_description::well_known::Rfc3339;

    time::OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000)
        .ok()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_default()
}

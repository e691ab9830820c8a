use hexcomp_protocol::{PlacedChampion, TeamComposition, TeamExport};
use rusqlite::{Connection, OpenFlags, OptionalExtension};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::{new_id, now_ms, rfc3339_from_ms};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("a team name is required")]
    NameRequired,
    #[error("cannot save an empty team")]
    EmptyTeam,
    #[error("no saved team with id {0}")]
    NotFound(String),
    #[error("create db dir {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Named team snapshots persisted in SQLite.
#[derive(Debug, Clone)]
pub struct CompositionStore {
    db_path: PathBuf,
}

impl CompositionStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn open(&self) -> Result<Connection, StoreError> {
        let path = self.db_path.clone();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        migrate(&conn)?;
        Ok(conn)
    }

    pub fn save(
        &self,
        name: &str,
        description: Option<&str>,
        champions: &[PlacedChampion],
    ) -> Result<TeamComposition, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::NameRequired);
        }
        if champions.is_empty() {
            return Err(StoreError::EmptyTeam);
        }
        let description = description.map(str::trim).filter(|d| !d.is_empty());

        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let id = new_id("team");
        let ts = now_ms();
        let champions_json = serde_json::to_string(champions)?;
        tx.execute(
            "INSERT INTO compositions (id, name, description, champions_json, created_at_ms, updated_at_ms)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            (&id, name, description, &champions_json, ts),
        )?;
        append_event_tx(
            &tx,
            "composition.saved",
            Some(&id),
            serde_json::json!({ "id": id, "name": name, "units": champions.len() }),
        )?;
        tx.commit()?;
        tracing::info!(%id, name, units = champions.len(), "team saved");

        Ok(TeamComposition {
            id,
            name: name.to_string(),
            description: description.map(str::to_string),
            champions: champions.to_vec(),
            created_at_ms: ts,
        })
    }

    /// Oldest first. Rows whose snapshot no longer parses are skipped.
    pub fn list(&self) -> Result<Vec<TeamComposition>, StoreError> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, champions_json, created_at_ms FROM compositions ORDER BY created_at_ms ASC, rowid ASC",
        )?;
        let rows = stmt.query_map([], read_row)?;
        let mut teams = Vec::new();
        for row in rows {
            match row? {
                Ok(team) => teams.push(team),
                Err((id, e)) => tracing::warn!(%id, error = %e, "skipping unreadable saved team"),
            }
        }
        Ok(teams)
    }

    pub fn get(&self, id: &str) -> Result<TeamComposition, StoreError> {
        let conn = self.open()?;
        let row = conn
            .query_row(
                "SELECT id, name, description, champions_json, created_at_ms FROM compositions WHERE id = ?1",
                [id],
                read_row,
            )
            .optional()?;
        match row {
            Some(Ok(team)) => Ok(team),
            Some(Err((_, e))) => Err(StoreError::Json(e)),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    pub fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;
        let n = tx.execute("DELETE FROM compositions WHERE id = ?1", [id])?;
        if n > 0 {
            append_event_tx(
                &tx,
                "composition.deleted",
                Some(id),
                serde_json::json!({ "id": id }),
            )?;
        }
        tx.commit()?;
        Ok(n > 0)
    }

    pub fn get_rev(&self) -> Result<i64, StoreError> {
        let conn = self.open()?;
        let rev: Option<i64> =
            conn.query_row("SELECT MAX(seq) FROM event_log", [], |row| row.get(0))?;
        Ok(rev.unwrap_or(0))
    }
}

type RowResult = Result<TeamComposition, (String, serde_json::Error)>;

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowResult> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let champions_json: String = row.get(3)?;
    let created_at_ms: i64 = row.get(4)?;
    Ok(match serde_json::from_str(&champions_json) {
        Ok(champions) => Ok(TeamComposition {
            id,
            name,
            description,
            champions,
            created_at_ms,
        }),
        Err(e) => Err((id, e)),
    })
}

/// Download shape: the saved team plus derived cost and trait roll-ups.
pub fn team_export(team: &TeamComposition) -> TeamExport {
    let traits: BTreeSet<&str> = team
        .champions
        .iter()
        .flat_map(|pc| pc.champion.traits.iter().map(String::as_str))
        .collect();
    TeamExport {
        name: team.name.clone(),
        description: team.description.clone().unwrap_or_default(),
        champions: team.champions.clone(),
        total_cost: team
            .champions
            .iter()
            .map(|pc| u32::from(pc.champion.cost))
            .sum(),
        traits: traits.into_iter().map(str::to_string).collect(),
        created_at: rfc3339_from_ms(team.created_at_ms),
    }
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    let v: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if v < 1 {
        conn.execute_batch(
            r#"
-- Monotonic revision source so clients can tell when the saved list changed.
CREATE TABLE IF NOT EXISTS event_log (
  seq INTEGER PRIMARY KEY AUTOINCREMENT,
  ts_ms INTEGER NOT NULL,
  kind TEXT NOT NULL,
  entity_id TEXT,
  payload_json TEXT NOT NULL DEFAULT '{}'
);

CREATE INDEX IF NOT EXISTS idx_event_log_kind ON event_log(kind);

-- Board snapshots are stored whole; they are only ever read back whole.
CREATE TABLE IF NOT EXISTS compositions (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL,
  description TEXT,
  champions_json TEXT NOT NULL DEFAULT '[]',
  created_at_ms INTEGER NOT NULL,
  updated_at_ms INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_compositions_created_at ON compositions(created_at_ms);
"#,
        )?;

        conn.pragma_update(None, "user_version", 1_i64)?;
    }

    Ok(())
}

fn append_event_tx(
    tx: &rusqlite::Transaction<'_>,
    kind: &str,
    entity_id: Option<&str>,
    payload: serde_json::Value,
) -> Result<i64, StoreError> {
    let ts = now_ms();
    let payload_json = payload.to_string();
    tx.execute(
        "INSERT INTO event_log (ts_ms, kind, entity_id, payload_json) VALUES (?1, ?2, ?3, ?4)",
        (ts, kind, entity_id, payload_json),
    )?;
    Ok(tx.last_insert_rowid())
}

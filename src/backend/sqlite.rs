use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{ReleaseRow, SearchBackend};
use crate::error::BackendError;
use crate::sanitize::sanitize;

const COLUMNS: &str = "id, name, team, cat, genre, url, size, files, pre_at";

/// Full-text release store: a bulk-loaded `releases` table and an append-only
/// `releases_rt` table, each with its own FTS5 index on `name`. A row in
/// `releases_rt` shadows the row with the same id in `releases`.
#[derive(Clone)]
pub struct SqliteBackend {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteBackend {
    /// Open or create the release database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;

        // journal_mode PRAGMA always returns the resulting mode, so use query_row
        let _: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;

        Self::run_migrations(&conn)?;

        info!("Release store opened at: {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        for table in ["releases", "releases_rt"] {
            conn.execute_batch(&format!(
                "
                CREATE TABLE IF NOT EXISTS {t} (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL DEFAULT '',
                    team TEXT NOT NULL DEFAULT '',
                    cat TEXT NOT NULL DEFAULT '',
                    genre TEXT NOT NULL DEFAULT '',
                    url TEXT NOT NULL DEFAULT '',
                    size REAL NOT NULL DEFAULT 0,
                    files INTEGER NOT NULL DEFAULT 0,
                    pre_at INTEGER NOT NULL DEFAULT 0
                );

                CREATE VIRTUAL TABLE IF NOT EXISTS {t}_fts USING fts5(
                    name,
                    content={t},
                    content_rowid=id
                );

                CREATE TRIGGER IF NOT EXISTS {t}_fts_insert AFTER INSERT ON {t} BEGIN
                    INSERT INTO {t}_fts(rowid, name) VALUES (NEW.id, NEW.name);
                END;

                CREATE TRIGGER IF NOT EXISTS {t}_fts_delete AFTER DELETE ON {t} BEGIN
                    INSERT INTO {t}_fts({t}_fts, rowid, name)
                        VALUES('delete', OLD.id, OLD.name);
                END;

                CREATE TRIGGER IF NOT EXISTS {t}_fts_update AFTER UPDATE ON {t} BEGIN
                    INSERT INTO {t}_fts({t}_fts, rowid, name)
                        VALUES('delete', OLD.id, OLD.name);
                    INSERT INTO {t}_fts(rowid, name) VALUES (NEW.id, NEW.name);
                END;
                ",
                t = table
            ))
            .with_context(|| format!("Failed to migrate table {}", table))?;
        }
        Ok(())
    }

    async fn latest(&self, max: i64) -> Result<Vec<ReleaseRow>, BackendError> {
        // Each branch walks its primary key backwards and stops after `max`
        // rows, so this stays cheap however large the tables grow.
        let sql = format!(
            "SELECT {c} FROM (
                SELECT * FROM (
                    SELECT {c} FROM releases
                    WHERE id NOT IN (SELECT id FROM releases_rt)
                    ORDER BY id DESC LIMIT ?1
                )
                UNION ALL
                SELECT * FROM (
                    SELECT {c} FROM releases_rt ORDER BY id DESC LIMIT ?1
                )
            )
            ORDER BY id DESC
            LIMIT ?1",
            c = COLUMNS
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params![max], parse_release_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    async fn matching(&self, expr: &str, max: i64) -> Result<Vec<ReleaseRow>, BackendError> {
        let sql = format!(
            "SELECT {c} FROM (
                SELECT {c} FROM releases
                WHERE id IN (SELECT rowid FROM releases_fts WHERE releases_fts MATCH ?1)
                  AND id NOT IN (SELECT id FROM releases_rt)
                UNION ALL
                SELECT {c} FROM releases_rt
                WHERE id IN (SELECT rowid FROM releases_rt_fts WHERE releases_rt_fts MATCH ?1)
            )
            ORDER BY id DESC
            LIMIT ?2",
            c = COLUMNS
        );

        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(rusqlite::params![expr, max], parse_release_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[async_trait]
impl SearchBackend for SqliteBackend {
    async fn search(&self, query: &str, max: usize) -> Result<Vec<ReleaseRow>, BackendError> {
        if max == 0 {
            return Ok(Vec::new());
        }
        let max = i64::try_from(max).unwrap_or(i64::MAX);

        let expr = match_expression(query);
        debug!("FTS query {:?} -> {:?}", query, expr);
        if expr.is_empty() {
            self.latest(max).await
        } else {
            self.matching(&expr, max).await
        }
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

/// Build an FTS5 MATCH expression from user text. Each term becomes a string
/// literal so operator characters are matched as text; a trailing `*` stays
/// outside the literal and turns the term into a prefix query.
fn match_expression(query: &str) -> String {
    sanitize(query)
        .split_whitespace()
        .filter_map(|term| {
            let (body, prefix) = match term.strip_suffix('*') {
                Some(body) => (body, "*"),
                None => (term, ""),
            };
            if body.is_empty() {
                return None;
            }
            Some(format!("\"{}\"{}", body.replace('"', "\"\""), prefix))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_release_row(row: &rusqlite::Row) -> rusqlite::Result<ReleaseRow> {
    Ok(ReleaseRow {
        id: row.get(0)?,
        name: row.get(1)?,
        team: row.get(2)?,
        cat: row.get(3)?,
        genre: row.get(4)?,
        url: row.get(5)?,
        size: row.get(6)?,
        files: row.get(7)?,
        pre_at: row.get(8)?,
    })
}

#[cfg(test)]
impl SqliteBackend {
    /// Insert or replace a release in `releases` or, with `realtime`, in `releases_rt`.
    pub async fn upsert(&self, realtime: bool, row: &ReleaseRow) -> Result<()> {
        let table = if realtime { "releases_rt" } else { "releases" };
        let conn = self.conn.lock().await;
        conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                 ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name, team = excluded.team, cat = excluded.cat,
                    genre = excluded.genre, url = excluded.url, size = excluded.size,
                    files = excluded.files, pre_at = excluded.pre_at",
                table, COLUMNS
            ),
            rusqlite::params![
                row.id, row.name, row.team, row.cat, row.genre, row.url, row.size, row.files,
                row.pre_at,
            ],
        )
        .context("Failed to store release")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(id: i64, name: &str) -> ReleaseRow {
        ReleaseRow {
            id,
            name: name.to_string(),
            team: name.rsplit('-').next().unwrap_or_default().to_string(),
            cat: "TV".to_string(),
            size: 1024.0 * id as f64,
            files: id,
            pre_at: 1_500_000_000 + id,
            ..Default::default()
        }
    }

    async fn seeded() -> SqliteBackend {
        let store = SqliteBackend::open_in_memory().unwrap();
        for id in 1..=6 {
            store
                .upsert(false, &release(id, &format!("Plain.Show.S01E0{}-GRP", id)))
                .await
                .unwrap();
        }
        for id in 7..=9 {
            store
                .upsert(true, &release(id, &format!("Live.Show.S01E0{}-RT", id)))
                .await
                .unwrap();
        }
        store
    }

    fn ids(rows: &[ReleaseRow]) -> Vec<i64> {
        rows.iter().map(|r| r.id).collect()
    }

    #[test]
    fn test_match_expression_quotes_terms() {
        assert_eq!(match_expression("foo bar"), r#""foo" "bar""#);
        assert_eq!(match_expression("  "), "");
        assert_eq!(match_expression("show*"), r#""show"*"#);
        assert_eq!(match_expression(r#"say "hi""#), r#""say" """hi""""#);
        assert_eq!(match_expression("a (b)"), r#""a" "\(b\)""#);
    }

    #[tokio::test]
    async fn test_latest_returns_newest_first() {
        let store = seeded().await;
        let rows = store.search("", 5).await.unwrap();
        assert_eq!(ids(&rows), vec![9, 8, 7, 6, 5]);
    }

    #[tokio::test]
    async fn test_latest_returns_fewer_when_fewer_exist() {
        let store = SqliteBackend::open_in_memory().unwrap();
        store.upsert(false, &release(1, "Only.One-GRP")).await.unwrap();
        let rows = store.search("", 5).await.unwrap();
        assert_eq!(ids(&rows), vec![1]);
    }

    #[tokio::test]
    async fn test_match_spans_both_tables() {
        let store = seeded().await;
        let rows = store.search("show", 10).await.unwrap();
        assert_eq!(ids(&rows), vec![9, 8, 7, 6, 5, 4, 3, 2, 1]);

        let rows = store.search("live", 10).await.unwrap();
        assert_eq!(ids(&rows), vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn test_match_truncates_to_max() {
        let store = seeded().await;
        let rows = store.search("plain", 3).await.unwrap();
        assert_eq!(ids(&rows), vec![6, 5, 4]);
        assert_eq!(rows[0].name, "Plain.Show.S01E06-GRP");
        assert_eq!(rows[0].team, "GRP");
        assert_eq!(rows[0].pre_at, 1_500_000_006);
    }

    #[tokio::test]
    async fn test_prefix_search() {
        let store = seeded().await;
        let rows = store.search("pla*", 10).await.unwrap();
        assert_eq!(rows.len(), 6);
    }

    #[tokio::test]
    async fn test_parentheses_are_not_syntax() {
        let store = SqliteBackend::open_in_memory().unwrap();
        store
            .upsert(false, &release(1, "Movie.(2019).1080p-GRP"))
            .await
            .unwrap();
        let rows = store.search("movie (2019)", 5).await.unwrap();
        assert_eq!(ids(&rows), vec![1]);

        let rows = store.search("((", 5).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_realtime_shadows_plain() {
        let store = seeded().await;
        store.upsert(true, &release(3, "Fixed.Name-RT")).await.unwrap();

        let rows = store.search("fixed", 5).await.unwrap();
        assert_eq!(ids(&rows), vec![3]);

        let rows = store.search("plain", 10).await.unwrap();
        assert_eq!(ids(&rows), vec![6, 5, 4, 2, 1]);

        let rows = store.search("", 10).await.unwrap();
        assert_eq!(ids(&rows), vec![9, 8, 7, 6, 5, 4, 3, 2, 1]);
        assert_eq!(rows[6].name, "Fixed.Name-RT");
    }

    #[tokio::test]
    async fn test_update_reindexes_name() {
        let store = SqliteBackend::open_in_memory().unwrap();
        store.upsert(false, &release(1, "Old.Name-GRP")).await.unwrap();
        store.upsert(false, &release(1, "New.Name-GRP")).await.unwrap();

        assert!(store.search("old", 5).await.unwrap().is_empty());
        assert_eq!(ids(&store.search("new", 5).await.unwrap()), vec![1]);
    }

    #[tokio::test]
    async fn test_zero_max() {
        let store = seeded().await;
        assert!(store.search("", 0).await.unwrap().is_empty());
    }
}

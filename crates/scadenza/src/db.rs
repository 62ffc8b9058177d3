//! SQLite issue store
//!
//! This module handles:
//! - Database initialization and embedded migrations
//! - Reading issues
//! - Applying due-date patches

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

use crate::types::{format_timestamp, DueDatePatch, Issue};

/// Migrations compiled into the binary, applied in order
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_initial_schema",
    include_str!("../db/migrations/001_initial_schema.sql"),
)];

const ISSUE_COLUMNS: &str = "id, title, due_date, created_at, updated_at";

/// Open (or create) the database at the given path and run pending migrations
pub fn init_db(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?;

    let count = run_migrations(&conn)?;
    if count > 0 {
        info!(count = count, path = %db_path.display(), "Applied migrations");
    }

    Ok(conn)
}

/// Apply every migration not yet recorded in `schema_migrations`
pub fn run_migrations(conn: &Connection) -> Result<usize> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL
        );",
    )?;

    let mut applied = 0;

    for (version, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
            [version],
            |row| row.get(0),
        )?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("Failed to apply migration: {}", version))?;

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            [version],
        )?;

        debug!(version = %version, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}

fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        due_date: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

/// All issues, oldest first
pub fn list_issues(conn: &Connection) -> Result<Vec<Issue>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ISSUE_COLUMNS} FROM issues ORDER BY created_at ASC, title ASC"
    ))?;

    let issues = stmt
        .query_map([], issue_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(issues)
}

pub fn get_issue(conn: &Connection, id: &str) -> Result<Option<Issue>> {
    let issue = conn
        .query_row(
            &format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE id = ?1"),
            [id],
            issue_from_row,
        )
        .optional()?;

    Ok(issue)
}

pub fn insert_issue(conn: &Connection, issue: &Issue) -> Result<()> {
    conn.execute(
        &format!("INSERT INTO issues ({ISSUE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
        params![
            issue.id,
            issue.title,
            issue.due_date,
            issue.created_at,
            issue.updated_at,
        ],
    )?;
    Ok(())
}

/// Write a due-date patch and bump `updated_at`. Returns false if the issue
/// does not exist.
pub fn apply_due_date_patch(
    conn: &Connection,
    id: &str,
    patch: &DueDatePatch,
    now: DateTime<Utc>,
) -> Result<bool> {
    let affected = conn.execute(
        "UPDATE issues SET due_date = ?1, updated_at = ?2 WHERE id = ?3",
        params![patch.due_date, format_timestamp(now), id],
    )?;
    Ok(affected > 0)
}

pub fn count_issues(conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM issues", [], |row| row.get(0))?;
    Ok(count as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn setup_test_db() -> (TempDir, Connection) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let conn = init_db(&db_path).unwrap();
        (temp_dir, conn)
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, 0, 0).unwrap()
    }

    fn make_issue(title: &str, due: Option<&str>, h: u32) -> Issue {
        Issue::new(title.to_string(), due.map(str::to_string), at(h))
    }

    // ========== init_db tests ==========

    #[test]
    fn test_init_db_creates_tables() {
        let (_temp_dir, conn) = setup_test_db();

        let table_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='issues'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(table_exists);
    }

    #[test]
    fn test_init_db_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let conn = init_db(&db_path).unwrap();
        insert_issue(&conn, &make_issue("Keep me", None, 1)).unwrap();
        drop(conn);

        let conn = init_db(&db_path).unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), 0);
        assert_eq!(count_issues(&conn).unwrap(), 1);
    }

    // ========== issue tests ==========

    #[test]
    fn test_insert_and_get_issue() {
        let (_temp_dir, conn) = setup_test_db();
        let issue = make_issue("Ship it", Some("2024-06-01T09:00:00.000Z"), 1);

        insert_issue(&conn, &issue).unwrap();
        let loaded = get_issue(&conn, &issue.id).unwrap().unwrap();
        assert_eq!(loaded, issue);
    }

    #[test]
    fn test_get_nonexistent_issue() {
        let (_temp_dir, conn) = setup_test_db();
        assert!(get_issue(&conn, "nope").unwrap().is_none());
    }

    #[test]
    fn test_insert_duplicate_id_fails() {
        let (_temp_dir, conn) = setup_test_db();
        let issue = make_issue("Once", None, 1);
        insert_issue(&conn, &issue).unwrap();
        assert!(insert_issue(&conn, &issue).is_err());
    }

    #[test]
    fn test_list_issues_oldest_first() {
        let (_temp_dir, conn) = setup_test_db();
        insert_issue(&conn, &make_issue("Second", None, 5)).unwrap();
        insert_issue(&conn, &make_issue("First", None, 2)).unwrap();

        let titles: Vec<_> = list_issues(&conn)
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    // ========== apply_due_date_patch tests ==========

    #[test]
    fn test_patch_sets_due_date() {
        let (_temp_dir, conn) = setup_test_db();
        let issue = make_issue("Task", None, 1);
        insert_issue(&conn, &issue).unwrap();

        let patch = DueDatePatch::set(at(20));
        assert!(apply_due_date_patch(&conn, &issue.id, &patch, at(3)).unwrap());

        let loaded = get_issue(&conn, &issue.id).unwrap().unwrap();
        assert_eq!(loaded.due_date.as_deref(), Some("2024-05-01T20:00:00.000Z"));
        assert_eq!(loaded.updated_at, "2024-05-01T03:00:00.000Z");
        assert!(loaded.was_updated());
    }

    #[test]
    fn test_patch_clears_due_date() {
        let (_temp_dir, conn) = setup_test_db();
        let issue = make_issue("Task", Some("2024-06-01T09:00:00.000Z"), 1);
        insert_issue(&conn, &issue).unwrap();

        assert!(apply_due_date_patch(&conn, &issue.id, &DueDatePatch::clear(), at(2)).unwrap());
        let loaded = get_issue(&conn, &issue.id).unwrap().unwrap();
        assert!(loaded.due_date.is_none());
    }

    #[test]
    fn test_patch_unknown_issue() {
        let (_temp_dir, conn) = setup_test_db();
        assert!(!apply_due_date_patch(&conn, "missing", &DueDatePatch::clear(), at(1)).unwrap());
    }

    #[test]
    fn test_count_issues() {
        let (_temp_dir, conn) = setup_test_db();
        assert_eq!(count_issues(&conn).unwrap(), 0);
        insert_issue(&conn, &make_issue("a", None, 1)).unwrap();
        insert_issue(&conn, &make_issue("b", None, 1)).unwrap();
        assert_eq!(count_issues(&conn).unwrap(), 2);
    }
}

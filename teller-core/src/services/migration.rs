//! Migration service - applies embedded schema migrations
//!
//! Each applied migration is recorded in `sys_migrations`, so running the
//! service again is a no-op.

use anyhow::{Context, Result};
use duckdb::Connection;

use crate::migrations::{BOOTSTRAP_MIGRATION, MIGRATIONS};

/// Result of running migrations
#[derive(Debug)]
pub struct MigrationResult {
    /// Names of newly applied migrations
    pub applied: Vec<String>,
    /// Count of migrations that were already applied
    pub already_applied: usize,
}

/// Applies a fixed list of migrations to one connection
pub struct MigrationService<'a> {
    conn: &'a Connection,
    migrations: &'a [(&'a str, &'a str)],
}

impl<'a> MigrationService<'a> {
    /// Migration service for the ledger schema
    pub fn new(conn: &'a Connection) -> Self {
        Self::with_migrations(conn, MIGRATIONS)
    }

    pub fn with_migrations(conn: &'a Connection, migrations: &'a [(&'a str, &'a str)]) -> Self {
        Self { conn, migrations }
    }

    /// Run all pending migrations in order.
    ///
    /// The bootstrap migration creates `sys_migrations` itself, so it runs
    /// first whenever that table is missing.
    pub fn run_pending(&self) -> Result<MigrationResult> {
        let mut applied = Vec::new();

        if !self.migrations_table_exists()? {
            let (name, sql) = self
                .migrations
                .iter()
                .find(|(n, _)| *n == BOOTSTRAP_MIGRATION)
                .context("bootstrap migration missing")?;
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        let already = self.get_applied()?;
        let already_applied = already.len() - applied.len();

        for (name, sql) in self.migrations {
            if already.iter().any(|a| a == name) {
                continue;
            }
            self.apply(name, sql)?;
            applied.push(name.to_string());
        }

        Ok(MigrationResult {
            applied,
            already_applied,
        })
    }

    /// Names of migrations not yet recorded
    pub fn get_pending(&self) -> Result<Vec<String>> {
        let applied = if self.migrations_table_exists()? {
            self.get_applied()?
        } else {
            Vec::new()
        };
        Ok(self
            .migrations
            .iter()
            .map(|(name, _)| name.to_string())
            .filter(|name| !applied.contains(name))
            .collect())
    }

    /// Get list of already applied migration names
    pub fn get_applied(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_name FROM sys_migrations ORDER BY migration_name")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Run one migration and record it in the same transaction
    fn apply(&self, name: &str, sql: &str) -> Result<()> {
        self.conn
            .execute_batch(&format!(
                "BEGIN TRANSACTION;\n{}\nINSERT INTO sys_migrations (migration_name) VALUES ('{}');\nCOMMIT;",
                sql,
                name.replace('\'', "''")
            ))
            .or_else(|e| {
                let _ = self.conn.execute_batch("ROLLBACK");
                Err(e)
            })
            .with_context(|| format!("Failed to apply migration {}", name))
    }

    fn migrations_table_exists(&self) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'sys_migrations'",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_run_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);

        let result = service.run_pending().unwrap();
        assert_eq!(result.applied.len(), MIGRATIONS.len());
        assert_eq!(result.already_applied, 0);

        // Running again should apply nothing
        let result2 = service.run_pending().unwrap();
        assert!(result2.applied.is_empty());
        assert_eq!(result2.already_applied, MIGRATIONS.len());
        assert!(service.get_pending().unwrap().is_empty());
    }

    #[test]
    fn test_get_pending_on_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        let service = MigrationService::new(&conn);
        assert_eq!(service.get_pending().unwrap().len(), MIGRATIONS.len());
    }

    #[test]
    fn test_failed_migration_is_not_recorded() {
        let conn = Connection::open_in_memory().unwrap();
        let broken: &[(&str, &str)] = &[
            (BOOTSTRAP_MIGRATION, MIGRATIONS[0].1),
            ("001_broken.sql", "CREATE TABLE ok_table (id INTEGER); THIS IS NOT SQL;"),
        ];
        let service = MigrationService::with_migrations(&conn, broken);

        assert!(service.run_pending().is_err());
        assert_eq!(service.get_applied().unwrap(), vec![BOOTSTRAP_MIGRATION.to_string()]);
        assert_eq!(service.get_pending().unwrap(), vec!["001_broken.sql".to_string()]);
    }
}

//! Database migrations - embedded SQL files
//!
//! Migrations are compiled into the binary at build time using include_str!.
//! Each migration is a tuple of (name, sql_content), applied in name order.

/// Name of the bootstrap migration that creates `sys_migrations`
pub const BOOTSTRAP_MIGRATION: &str = "000_migrations.sql";

/// All migrations, embedded at compile time.
///
/// When adding a migration, create `NNN_description.sql` next to this file
/// and append it here.
pub const MIGRATIONS: &[(&str, &str)] = &[
    (BOOTSTRAP_MIGRATION, include_str!("000_migrations.sql")),
    ("001_accounts.sql", include_str!("001_accounts.sql")),
    ("002_transfers.sql", include_str!("002_transfers.sql")),
    ("003_contacts.sql", include_str!("003_contacts.sql")),
];

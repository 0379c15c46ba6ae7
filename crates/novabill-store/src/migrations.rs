//! Embedded SQL migrations, compiled into the binary from
//! `migrations/sqlite/` at the workspace root. Applied automatically on
//! pool open; each migration runs at most once, tracked in
//! `_sqlx_migrations`.

/// The workspace migrator.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

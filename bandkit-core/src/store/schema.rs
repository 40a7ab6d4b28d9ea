//! Store schema management.

use rusqlite::{Connection, OptionalExtension};

use super::error::{map_db_err, StorageError, StorageResult};

pub(super) const SCHEMA_VERSION: i64 = 1;

pub(super) fn ensure_schema(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS core_meta (
            schema_version  INTEGER NOT NULL,
            created_at      INTEGER NOT NULL,
            updated_at      INTEGER NOT NULL
        );",
    )
    .map_err(|err| map_db_err(&err))?;

    let existing: Option<i64> = conn
        .query_row(
            "SELECT schema_version FROM core_meta LIMIT 1;",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|err| map_db_err(&err))?;

    match existing {
        Some(version) if version == SCHEMA_VERSION => ensure_tables(conn),
        Some(version) => Err(StorageError::Db(format!(
            "unsupported schema version {version}, expected {SCHEMA_VERSION}"
        ))),
        None => {
            ensure_tables(conn)?;
            insert_meta(conn)
        }
    }
}

fn ensure_tables(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id              TEXT    NOT NULL PRIMARY KEY,
            email           TEXT    NOT NULL UNIQUE,
            password_hash   TEXT    NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sessions (
            token_hash      TEXT    NOT NULL PRIMARY KEY,
            user_id         TEXT    NOT NULL REFERENCES users (id),
            created_at      INTEGER NOT NULL,
            expires_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_expiry
        ON sessions (expires_at);

        CREATE TABLE IF NOT EXISTS provisioned_bands (
            band_id         TEXT    NOT NULL PRIMARY KEY,
            secret          TEXT    NOT NULL,
            created_at      INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS bands (
            id              TEXT    NOT NULL PRIMARY KEY,
            band_id         TEXT    NOT NULL UNIQUE,
            user_id         TEXT    NOT NULL REFERENCES users (id),
            status          TEXT    NOT NULL DEFAULT 'active',
            created_at      INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_bands_by_owner
        ON bands (user_id, band_id);

        CREATE TABLE IF NOT EXISTS profiles (
            id                          TEXT    NOT NULL PRIMARY KEY,
            band_id                     TEXT    NOT NULL UNIQUE
                                        REFERENCES bands (band_id),
            full_name                   TEXT    NOT NULL DEFAULT '',
            emergency_contact           TEXT    NOT NULL DEFAULT '',
            city_country                TEXT    NOT NULL DEFAULT '',
            blood_group                 TEXT    NOT NULL DEFAULT 'O+',
            emergency_note              TEXT    NOT NULL DEFAULT '',
            full_name_public            INTEGER NOT NULL DEFAULT 1,
            emergency_contact_public    INTEGER NOT NULL DEFAULT 1,
            city_country_public         INTEGER NOT NULL DEFAULT 0,
            blood_group_public          INTEGER NOT NULL DEFAULT 1,
            emergency_note_public       INTEGER NOT NULL DEFAULT 1,
            pdf_data                    BLOB,
            pdf_filename                TEXT,
            pdf_public                  INTEGER NOT NULL DEFAULT 0,
            updated_at                  INTEGER NOT NULL
        );",
    )
    .map_err(|err| map_db_err(&err))?;
    Ok(())
}

fn insert_meta(conn: &Connection) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO core_meta (schema_version, created_at, updated_at)
         VALUES (?1, strftime('%s','now'), strftime('%s','now'))",
        [SCHEMA_VERSION],
    )
    .map_err(|err| map_db_err(&err))?;
    Ok(())
}

//! Row conversion for the `person_identity` table.

use crate::models::{DocumentValues, IdentityRecord, LinkageKey, MaskedAttributes, SourceCounters};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Row;

/// Column list shared by every `SELECT` against `person_identity`.
///
/// Order must match [`read_identity_row`].
pub const IDENTITY_COLUMNS: &str = "linkage_key, hashed_forename, hashed_secondname, \
     hashed_lastname, hashed_dob, hashed_address, gender, \
     hashed_aadhaar_number, hashed_pan_number, hashed_voter_id, hashed_dl_number, \
     aadhaar_counter, pan_counter, voter_id_counter, dl_counter, \
     forked_from, created_at, updated_at";

/// Schema of the identity table and its lookup index.
pub const IDENTITY_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS person_identity (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        linkage_key TEXT NOT NULL UNIQUE,
        hashed_forename TEXT,
        hashed_secondname TEXT,
        hashed_lastname TEXT,
        hashed_dob TEXT,
        hashed_address TEXT,
        gender TEXT,
        hashed_aadhaar_number TEXT,
        hashed_pan_number TEXT,
        hashed_voter_id TEXT,
        hashed_dl_number TEXT,
        aadhaar_counter INTEGER NOT NULL DEFAULT 0 CHECK (aadhaar_counter >= 0),
        pan_counter INTEGER NOT NULL DEFAULT 0 CHECK (pan_counter >= 0),
        voter_id_counter INTEGER NOT NULL DEFAULT 0 CHECK (voter_id_counter >= 0),
        dl_counter INTEGER NOT NULL DEFAULT 0 CHECK (dl_counter >= 0),
        forked_from TEXT,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_person_identity_forename_dob
        ON person_identity(hashed_forename, hashed_dob, seq DESC);
";

/// Converts a row selected with [`IDENTITY_COLUMNS`] into a record.
///
/// # Errors
///
/// Returns a `rusqlite` error if a column has an unexpected type.
pub fn read_identity_row(row: &Row<'_>) -> rusqlite::Result<IdentityRecord> {
    let key: String = row.get(0)?;
    let forked_from: Option<String> = row.get(15)?;
    let created_at: i64 = row.get(16)?;
    let updated_at: i64 = row.get(17)?;

    Ok(IdentityRecord {
        key: LinkageKey::new(key),
        attributes: MaskedAttributes {
            forename: row.get(1)?,
            secondname: row.get(2)?,
            lastname: row.get(3)?,
            dob: row.get(4)?,
            address: row.get(5)?,
        },
        gender: row.get(6)?,
        documents: DocumentValues::from_array([row.get(7)?, row.get(8)?, row.get(9)?, row.get(10)?]),
        counters: SourceCounters::from_array([
            row.get(11)?,
            row.get(12)?,
            row.get(13)?,
            row.get(14)?,
        ]),
        forked_from: forked_from.map(LinkageKey::new),
        created_at: from_millis(created_at),
        updated_at: from_millis(updated_at),
    })
}

/// Converts epoch milliseconds to a UTC timestamp.
fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fs::read;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::Transaction;
use tempfile::tempdir;

use crate::encode::Card;
use crate::encode::Note;
use crate::error::ErrorReport;
use crate::error::Fallible;
use crate::error::fail;
use crate::schema::CollectionRow;
use crate::schema::SCHEMA;

/// An in-memory collection for one package. Single writer: every insert
/// goes through `&mut self`.
pub struct CollectionDb {
    conn: Connection,
}

impl CollectionDb {
    pub fn new() -> Fallible<Self> {
        let mut conn = Connection::open_in_memory()?;
        {
            let tx = conn.transaction()?;
            tx.execute_batch(SCHEMA)?;
            tx.commit()?;
        }
        Ok(Self { conn })
    }

    /// Write the `col` row.
    pub fn insert_collection(&mut self, row: &CollectionRow) -> Fallible<()> {
        let sql = "insert into col (id, crt, mod, scm, ver, dty, usn, ls, conf, models, decks, dconf, tags) values (1, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?, ?, ?);";
        self.conn.execute(
            sql,
            (
                row.crt,
                row.modified,
                row.scm,
                row.ver,
                &row.conf,
                &row.models,
                &row.decks,
                &row.dconf,
                &row.tags,
            ),
        )?;
        Ok(())
    }

    /// Insert every note and its card in one transaction. Any failure, such
    /// as two notes with the same checksum, rolls back the whole batch.
    pub fn insert_notes(&mut self, rows: &[(Note, Card)]) -> Fallible<()> {
        let tx = self.conn.transaction()?;
        for (note, card) in rows {
            insert_note(&tx, note).map_err(|e| describe_note_error(e, note))?;
            insert_card(&tx, card)?;
        }
        tx.commit()?;
        log::debug!("Inserted {} notes.", rows.len());
        Ok(())
    }

    pub fn note_count(&self) -> Fallible<usize> {
        count(&self.conn, "select count(*) from notes;")
    }

    pub fn card_count(&self) -> Fallible<usize> {
        count(&self.conn, "select count(*) from cards;")
    }

    /// Serialize the database into the bytes of a standalone SQLite file.
    pub fn to_bytes(&self) -> Fallible<Vec<u8>> {
        let dir = tempdir()?;
        let path = dir.path().join("collection.anki2");
        let path_str = path
            .to_str()
            .ok_or_else(|| ErrorReport::new("invalid temporary path"))?;
        self.conn.execute("vacuum into ?;", [path_str])?;
        let bytes = read(&path)?;
        Ok(bytes)
    }
}

fn insert_note(tx: &Transaction, note: &Note) -> rusqlite::Result<()> {
    let sql = "insert into notes (id, guid, mid, mod, usn, tags, flds, sfld, csum, flags, data) values (?, ?, ?, ?, 0, ?, ?, ?, ?, 0, '');";
    tx.execute(
        sql,
        (
            note.id,
            &note.guid,
            note.model_id,
            note.modified,
            &note.tags,
            note.joined_fields(),
            note.sort_field(),
            note.checksum,
        ),
    )?;
    Ok(())
}

fn insert_card(tx: &Transaction, card: &Card) -> Fallible<()> {
    // A new card: type 0, queue 0, no interval, no reviews.
    let sql = "insert into cards (id, nid, did, ord, mod, usn, type, queue, due, ivl, factor, reps, lapses, left, odue, odid, flags, data) values (?, ?, ?, ?, ?, 0, 0, 0, ?, 0, 2500, 0, 0, 0, 0, 0, 0, '');";
    tx.execute(
        sql,
        (
            card.id,
            card.note_id,
            card.deck_id,
            card.ordinal,
            card.modified,
            card.due,
        ),
    )?;
    Ok(())
}

fn describe_note_error(e: rusqlite::Error, note: &Note) -> ErrorReport {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            ErrorReport::new(format!(
                "note {} ('{}') collides with an earlier note (checksum {}).",
                note.id,
                note.sort_field(),
                note.checksum
            ))
        }
        _ => ErrorReport::from(e),
    }
}

fn count(conn: &Connection, sql: &str) -> Fallible<usize> {
    let count: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    match usize::try_from(count) {
        Ok(count) => Ok(count),
        Err(_) => fail("negative row count"),
    }
}

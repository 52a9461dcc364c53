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

use std::fmt::Display;
use std::fmt::Formatter;

use rusqlite::ToSql;
use rusqlite::types::ToSqlOutput;

/// Anki's base91 alphabet for note GUIDs.
const BASE91: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_`{|}~";

/// A note's globally unique identifier.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Guid(String);

impl Guid {
    /// Derive a GUID from the note's joined field text and its position in
    /// the package. Two notes with identical fields at different positions
    /// get different GUIDs.
    pub fn for_note(joined_fields: &str, position: i64) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(joined_fields.as_bytes());
        hasher.update(&position.to_le_bytes());
        let hash = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        Self(base91(u64::from_le_bytes(head)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn base91(mut n: u64) -> String {
    if n == 0 {
        return (BASE91[0] as char).to_string();
    }
    let radix = BASE91.len() as u64;
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE91[(n % radix) as usize]);
        n /= radix;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

impl ToSql for Guid {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl Display for Guid {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

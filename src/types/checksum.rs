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
use sha1::Digest;
use sha1::Sha1;

/// A note's `csum` column: the first 32 bits of the SHA-1 digest, read as a
/// big-endian integer (the first eight hex digits).
///
/// The digest covers the full `\x1f`-joined field text rather than only the
/// sort field, so notes that share a first field still get distinct values.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Checksum(u32);

impl Checksum {
    pub fn of_fields(joined_fields: &str) -> Self {
        let digest = Sha1::digest(joined_fields.as_bytes());
        Self(u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl ToSql for Checksum {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.value())))
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        // sha1("") = da39a3ee...
        assert_eq!(Checksum::of_fields("").value(), 0xda39a3ee);
        // sha1("test") = a94a8fe5...
        assert_eq!(Checksum::of_fields("test").value(), 2840236005);
    }

    #[test]
    fn test_shared_sort_field() {
        let a = Checksum::of_fields("Yo hablo.\u{1f}I speak.");
        let b = Checksum::of_fields("Yo hablo.\u{1f}I talk.");
        assert_ne!(a, b);
    }
}

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

//! Fixtures shared by unit tests.

use tempfile::TempDir;
use tempfile::tempdir;

use crate::error::Fallible;
use crate::types::card_record::CardKind;
use crate::types::card_record::CardRecord;

/// A scratch directory removed when the handle drops.
pub fn create_tmp_directory() -> Fallible<TempDir> {
    Ok(tempdir()?)
}

/// The two directions of "Yo hablo." for tier 1, present tense.
pub fn sample_cards() -> Vec<CardRecord> {
    vec![
        CardRecord::new(
            CardKind::Recognition,
            "Yo hablo.",
            "I speak.",
            1,
            "present",
            "yo",
        )
        .with_verb("HABLAR"),
        CardRecord::new(
            CardKind::Production,
            "I speak.",
            "Yo hablo.",
            1,
            "present",
            "yo",
        )
        .with_verb("HABLAR"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tmp_directory() -> Fallible<()> {
        let dir = create_tmp_directory()?;
        assert!(dir.path().is_dir());
        Ok(())
    }
}

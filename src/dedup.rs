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

use std::collections::HashMap;
use std::fmt::Display;
use std::fmt::Formatter;

use thiserror::Error;

use crate::types::card_record::CardRecord;

/// Two records with the same key would become the same note.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub front: String,
    pub verb: String,
    pub tense: String,
    pub subject: String,
}

impl CardKey {
    pub fn of(card: &CardRecord) -> Self {
        Self {
            front: card.front.clone(),
            verb: card.verb.clone(),
            tense: card.tense.clone(),
            subject: card.subject.clone(),
        }
    }
}

impl Display for CardKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "'{}' (verb '{}', tense '{}', subject '{}')",
            self.front, self.verb, self.tense, self.subject
        )
    }
}

#[derive(Debug, Error, PartialEq)]
#[error("duplicate card {key}: records {first} and {second} share the same key")]
pub struct DuplicateKeyError {
    pub key: CardKey,
    /// Index of the first record with this key.
    pub first: usize,
    /// Index of the record that repeats it.
    pub second: usize,
}

/// Pass the records through unchanged if their keys are pairwise distinct.
/// Duplicates are the producer's bug, so they are reported rather than
/// dropped.
pub fn unique_cards(cards: Vec<CardRecord>) -> Result<Vec<CardRecord>, DuplicateKeyError> {
    let mut seen: HashMap<CardKey, usize> = HashMap::new();
    for (index, card) in cards.iter().enumerate() {
        let key = CardKey::of(card);
        if let Some(first) = seen.get(&key) {
            return Err(DuplicateKeyError {
                key,
                first: *first,
                second: index,
            });
        }
        seen.insert(key, index);
    }
    Ok(cards)
}

/// Keep the first record for each key. For callers that choose to tolerate
/// duplicates; returns the kept records and the number dropped.
pub fn drop_duplicates(cards: Vec<CardRecord>) -> (Vec<CardRecord>, usize) {
    let mut seen = HashMap::new();
    let mut kept = Vec::with_capacity(cards.len());
    let mut dropped = 0;
    for (index, card) in cards.into_iter().enumerate() {
        let key = CardKey::of(&card);
        if let Some(first) = seen.get(&key) {
            log::warn!("Dropping duplicate card {key} (first seen at record {first}).");
            dropped += 1;
            continue;
        }
        seen.insert(key, index);
        kept.push(card);
    }
    (kept, dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::card_record::CardKind;

    fn card(front: &str, subject: &str) -> CardRecord {
        CardRecord::new(CardKind::Recognition, front, "x", 1, "present", subject).with_verb("HABLAR")
    }

    #[test]
    fn test_unique_passes_through() {
        let cards = vec![card("Hablo.", "yo"), card("Hablo.", "nosotros")];
        assert_eq!(unique_cards(cards.clone()), Ok(cards));
    }

    #[test]
    fn test_duplicate_reported() {
        let cards = vec![card("Hablo.", "yo"), card("Hablas.", "tú"), card("Hablo.", "yo")];
        let err = unique_cards(cards).err();
        assert_eq!(
            err,
            Some(DuplicateKeyError {
                key: CardKey::of(&card("Hablo.", "yo")),
                first: 0,
                second: 2,
            })
        );
    }

    #[test]
    fn test_error_message() {
        let err = DuplicateKeyError {
            key: CardKey::of(&card("Hablo.", "yo")),
            first: 0,
            second: 1,
        };
        assert_eq!(
            err.to_string(),
            "duplicate card 'Hablo.' (verb 'HABLAR', tense 'present', subject 'yo'): records 0 and 1 share the same key"
        );
    }

    #[test]
    fn test_drop_duplicates() {
        let cards = vec![card("Hablo.", "yo"), card("Hablo.", "yo"), card("Hablas.", "tú")];
        let (kept, dropped) = drop_duplicates(cards);
        assert_eq!(kept.len(), 2);
        assert_eq!(dropped, 1);
        assert_eq!(kept[1].front, "Hablas.");
    }
}

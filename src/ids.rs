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

use serde::Deserialize;

use crate::error::Fallible;
use crate::error::fail;
use crate::types::note_kind::NoteKind;

pub type ModelId = i64;
pub type DeckId = i64;
pub type NoteId = i64;
pub type CardId = i64;

/// Subdeck IDs for a tier live in `[tier_base + 1, tier_base + 1000)`.
pub const SUBDECK_CAPACITY: i64 = 1000;

/// The fixed ID bases for one generation run. Built once and passed to every
/// builder; nothing reads IDs from global state.
///
/// Deck IDs are a function of tier and subdeck position only, so packages
/// generated separately for different tiers can be imported side by side
/// without their decks colliding.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageIdentitySpace {
    pub basic_model_id: ModelId,
    pub cloze_model_id: ModelId,
    pub deck_base_id: DeckId,
    /// Anki's built-in "Default" deck.
    pub default_deck_id: DeckId,
}

impl Default for PackageIdentitySpace {
    fn default() -> Self {
        Self {
            basic_model_id: 1607392319,
            cloze_model_id: 1607392321,
            deck_base_id: 1607392320,
            default_deck_id: 1,
        }
    }
}

impl PackageIdentitySpace {
    pub fn validate(&self) -> Fallible<()> {
        if self.basic_model_id == self.cloze_model_id {
            return fail("the basic and cloze note types must have different IDs.");
        }
        if self.default_deck_id >= self.deck_base_id {
            return fail("the default deck ID must be below the deck base ID.");
        }
        Ok(())
    }

    pub fn model_id(&self, kind: NoteKind) -> ModelId {
        match kind {
            NoteKind::Basic => self.basic_model_id,
            NoteKind::Cloze => self.cloze_model_id,
        }
    }

    /// The ID of a tier's top-level deck. Fails if the ID would not fit in
    /// an `i64`.
    pub fn tier_deck_id(&self, tier: u32) -> Fallible<DeckId> {
        match i64::from(tier)
            .checked_mul(SUBDECK_CAPACITY)
            .and_then(|offset| self.deck_base_id.checked_add(offset))
        {
            Some(id) => Ok(id),
            None => fail(format!(
                "deck ID for tier {tier} overflows with deck base ID {}.",
                self.deck_base_id
            )),
        }
    }

    /// The ID of the `counter`th subdeck (1-based) of a tier. Running past the
    /// capacity would hand out the next tier's IDs, so it is an error.
    pub fn subdeck_id(&self, tier: u32, counter: i64) -> Fallible<DeckId> {
        if counter < 1 || counter >= SUBDECK_CAPACITY {
            return fail(format!(
                "tier {tier} needs subdeck #{counter}, but only {} fit in one tier's ID range.",
                SUBDECK_CAPACITY - 1
            ));
        }
        let tier_id = self.tier_deck_id(tier)?;
        match tier_id.checked_add(counter) {
            Some(id) => Ok(id),
            None => fail(format!("subdeck #{counter} of tier {tier} overflows the deck ID range.")),
        }
    }
}

/// Hands out note and card row IDs. Starts at 1 for every package: the IDs
/// only need to be unique within one collection's tables.
pub struct RowIds {
    next_note: NoteId,
    next_card: CardId,
}

impl RowIds {
    pub fn new() -> Self {
        Self {
            next_note: 1,
            next_card: 1,
        }
    }

    pub fn next_note(&mut self) -> NoteId {
        let id = self.next_note;
        self.next_note += 1;
        id
    }

    pub fn next_card(&mut self) -> CardId {
        let id = self.next_card;
        self.next_card += 1;
        id
    }
}

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

use std::collections::HashSet;

use crate::ids::CardId;
use crate::ids::DeckId;
use crate::ids::ModelId;
use crate::ids::NoteId;
use crate::ids::PackageIdentitySpace;
use crate::ids::RowIds;
use crate::types::card_record::CardKind;
use crate::types::card_record::CardRecord;
use crate::types::checksum::Checksum;
use crate::types::guid::Guid;
use crate::types::note_kind::NoteKind;
use crate::types::timestamp::Timestamp;

/// Separates fields in the `flds` column.
pub const FIELD_SEPARATOR: &str = "\u{1f}";

/// A row of the `notes` table.
#[derive(Clone, Debug, PartialEq)]
pub struct Note {
    pub id: NoteId,
    pub guid: Guid,
    pub model_id: ModelId,
    pub modified: i64,
    /// Space-separated, with a leading and trailing space, as Anki stores
    /// them. Empty if the note has no tags.
    pub tags: String,
    pub fields: Vec<String>,
    pub checksum: Checksum,
}

impl Note {
    pub fn joined_fields(&self) -> String {
        self.fields.join(FIELD_SEPARATOR)
    }

    pub fn sort_field(&self) -> &str {
        self.fields.first().map(String::as_str).unwrap_or_default()
    }
}

/// A row of the `cards` table. The scheduling columns are those of a new,
/// never-reviewed card and are filled in on insert.
#[derive(Clone, Debug, PartialEq)]
pub struct Card {
    pub id: CardId,
    pub note_id: NoteId,
    pub deck_id: DeckId,
    pub ordinal: i64,
    pub modified: i64,
    /// Position in the new-card queue.
    pub due: i64,
}

/// Turns card records into note/card rows for one package.
pub struct NoteEncoder<'a> {
    ids: &'a PackageIdentitySpace,
    rows: RowIds,
    modified: i64,
    media: Vec<String>,
    seen_media: HashSet<String>,
}

impl<'a> NoteEncoder<'a> {
    pub fn new(ids: &'a PackageIdentitySpace, now: Timestamp) -> Self {
        Self {
            ids,
            rows: RowIds::new(),
            modified: now.secs(),
            media: Vec::new(),
            seen_media: HashSet::new(),
        }
    }

    /// Encode one card record into its note and card. Does not deduplicate:
    /// the same record encoded twice yields two notes with the same checksum.
    pub fn encode(&mut self, card: &CardRecord, deck_id: DeckId) -> (Note, Card) {
        let note_id = self.rows.next_note();
        let card_id = self.rows.next_card();
        if let Some(audio) = &card.audio_file {
            if self.seen_media.insert(audio.clone()) {
                self.media.push(audio.clone());
            }
        }
        let kind = NoteKind::for_card(card.kind);
        let fields = render_fields(card);
        let joined = fields.join(FIELD_SEPARATOR);
        let note = Note {
            id: note_id,
            guid: Guid::for_note(&joined, note_id),
            model_id: self.ids.model_id(kind),
            modified: self.modified,
            tags: anki_tags(card),
            checksum: Checksum::of_fields(&joined),
            fields,
        };
        let card = Card {
            id: card_id,
            note_id,
            deck_id,
            ordinal: 0,
            modified: self.modified,
            due: card_id,
        };
        (note, card)
    }

    /// Audio file names referenced so far, in first-seen order.
    pub fn media(&self) -> &[String] {
        &self.media
    }
}

/// The note's fields, `[front, back]` for both note types, with a sound tag
/// on the side where the audio should play: on the prompt for recognition
/// cards, after the answer is revealed otherwise.
pub fn render_fields(card: &CardRecord) -> Vec<String> {
    let mut front = card.front.clone();
    let mut back = card.back.clone();
    if let Some(audio) = &card.audio_file {
        let sound = format!("[sound:{audio}]");
        match card.kind {
            CardKind::Recognition => front.push_str(&sound),
            CardKind::Production | CardKind::Cloze => back.push_str(&sound),
        }
    }
    vec![front, back]
}

/// The note's tag string in Anki's format.
///
/// Anki splits tags on whitespace, so whitespace inside a tag becomes `_`.
/// Slashes in subject values (`él/ella/usted`) become `-`.
pub fn anki_tags(card: &CardRecord) -> String {
    let mut tags: Vec<String> = Vec::new();
    let mut push = |tag: String| {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    };
    for tag in &card.tags {
        push(normalize_tag(tag));
    }
    // Filled in from the record when its tags don't already carry them.
    let derived = [
        ("verb", card.verb.clone()),
        ("tense", card.tense.clone()),
        ("subject", card.subject.clone()),
        ("tier", card.tier.to_string()),
    ];
    for (namespace, value) in derived {
        let prefix = format!("{namespace}::");
        if card.tags.iter().any(|tag| tag.trim().starts_with(&prefix)) {
            continue;
        }
        if !value.trim().is_empty() {
            push(normalize_tag(&format!("{prefix}{value}")));
        }
    }
    if tags.is_empty() {
        String::new()
    } else {
        format!(" {} ", tags.join(" "))
    }
}

fn normalize_tag(tag: &str) -> String {
    let tag: String = tag
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    match tag.strip_prefix("subject::") {
        Some(subject) => format!("subject::{}", subject.replace('/', "-")),
        None => tag,
    }
}

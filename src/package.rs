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

use std::io::Cursor;
use std::io::Write;
use std::time::Instant;

use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::config::EngineConfig;
use crate::db::CollectionDb;
use crate::dedup::unique_cards;
use crate::deck;
use crate::deck::DeckTree;
use crate::encode::NoteEncoder;
use crate::error::Fallible;
use crate::media::bundle::MediaManifest;
use crate::media::bundle::bundle;
use crate::media::load::MediaLoader;
use crate::schema;
use crate::schema::NoteType;
use crate::types::card_record::CardRecord;
use crate::types::timestamp::Timestamp;

/// Name of the collection database inside the archive.
pub const COLLECTION_ENTRY: &str = "collection.anki2";

/// Name of the media manifest inside the archive.
pub const MEDIA_ENTRY: &str = "media";

/// A finished `.apkg`.
#[derive(Debug)]
pub struct Package {
    pub bytes: Vec<u8>,
    pub note_count: usize,
    pub deck_count: usize,
    pub media_count: usize,
}

/// Builds packages from card records. The time is captured once, when the
/// builder is created. Each package gets its own database, row counters and
/// media manifest.
pub struct PackageBuilder<'a> {
    config: &'a EngineConfig,
    media: Option<MediaLoader>,
    now: Timestamp,
}

impl<'a> PackageBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self {
            config,
            media: None,
            now: Timestamp::now(),
        }
    }

    /// Bundle audio from this directory.
    pub fn with_media(mut self, loader: MediaLoader) -> Self {
        self.media = Some(loader);
        self
    }

    /// Use a fixed time for every timestamp in the package.
    #[cfg(test)]
    pub fn with_timestamp(mut self, now: Timestamp) -> Self {
        self.now = now;
        self
    }

    /// Build the package for one tier. Returns `None` if the tier has no
    /// cards.
    ///
    /// Only this tier's records are checked for duplicates, so a bad record
    /// in another tier does not affect this package.
    pub fn build_tier(&self, tier: u32, cards: &[CardRecord]) -> Fallible<Option<Package>> {
        let cards: Vec<CardRecord> = cards
            .iter()
            .filter(|card| card.tier == tier)
            .cloned()
            .collect();
        let cards = unique_cards(cards)?;
        let tree = deck::build(tier, self.config, &cards)?;
        if tree.is_empty() {
            log::info!("Tier {tier} has no cards, skipping.");
            return Ok(None);
        }
        self.build_trees(&[tree]).map(Some)
    }

    /// Build one package holding every configured tier side by side.
    /// Returns `None` if no tier has cards.
    pub fn build_uber(&self, cards: &[CardRecord]) -> Fallible<Option<Package>> {
        let cards = unique_cards(cards.to_vec())?;
        deck::warn_unconfigured_tiers(self.config, &cards);
        let mut trees = Vec::new();
        for tier in self.config.tier_numbers() {
            let tree = deck::build(tier, self.config, &cards)?;
            if !tree.is_empty() {
                trees.push(tree);
            }
        }
        if trees.is_empty() {
            log::info!("No tier has cards, skipping the complete package.");
            return Ok(None);
        }
        self.build_trees(&trees).map(Some)
    }

    fn build_trees(&self, trees: &[DeckTree]) -> Fallible<Package> {
        let start = Instant::now();
        let ids = &self.config.identity;

        let mut encoder = NoteEncoder::new(ids, self.now);
        let mut rows = Vec::new();
        let mut decks = Vec::new();
        for tree in trees {
            for leaf in tree.leaves() {
                for card in leaf.cards {
                    rows.push(encoder.encode(card, leaf.deck.id));
                }
            }
            decks.extend(tree.decks());
        }
        log::debug!("Encoded {} notes.", rows.len());

        let note_types = NoteType::all(ids);
        let col = schema::build(
            &decks,
            &note_types,
            self.config.deck_limits,
            ids,
            self.now,
            rows.len(),
        )?;
        for (_, card) in &rows {
            col.ensure_deck(card.deck_id)?;
        }

        let mut db = CollectionDb::new()?;
        db.insert_collection(&col)?;
        db.insert_notes(&rows)?;

        let note_count = db.note_count()?;
        log::debug!(
            "Collection holds {note_count} notes and {} cards.",
            db.card_count()?
        );

        let manifest = self.bundle_media(encoder.media());
        if manifest.is_empty() {
            log::debug!("No media to bundle.");
        }
        let db_bytes = db.to_bytes()?;
        let bytes = assemble(&db_bytes, &manifest)?;

        let duration = start.elapsed().as_millis();
        log::debug!("Package built in {duration}ms ({} bytes).", bytes.len());
        Ok(Package {
            bytes,
            note_count,
            deck_count: decks.len(),
            media_count: manifest.len(),
        })
    }

    fn bundle_media(&self, names: &[String]) -> MediaManifest {
        if names.is_empty() {
            return MediaManifest::empty();
        }
        match &self.media {
            Some(loader) => bundle(&loader.resolve_all(names)),
            None => {
                log::warn!(
                    "{} audio files referenced but no media directory given; packaging text only.",
                    names.len()
                );
                MediaManifest::empty()
            }
        }
    }
}

/// Zip the collection database and the media into an `.apkg`.
pub fn assemble(db: &[u8], manifest: &MediaManifest) -> Fallible<Vec<u8>> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

    zip.start_file(COLLECTION_ENTRY, options)?;
    zip.write_all(db)?;

    zip.start_file(MEDIA_ENTRY, options)?;
    zip.write_all(manifest.to_json()?.as_bytes())?;

    for entry in manifest.entries() {
        zip.start_file(entry.key.as_str(), options)?;
        zip.write_all(&entry.bytes)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

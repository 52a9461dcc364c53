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

pub mod check;
pub mod generate;

use std::fs::read_to_string;
use std::path::Path;

use crate::config::EngineConfig;
use crate::dedup::drop_duplicates;
use crate::error::Fallible;
use crate::error::fail;
use crate::types::card_record::CardRecord;

/// Read the card file and keep the cards that belong to the configured
/// region.
pub fn load_cards(path: &Path, config: &EngineConfig, dedupe: bool) -> Fallible<Vec<CardRecord>> {
    if !path.exists() {
        return fail(format!("card file {} does not exist.", path.display()));
    }
    let text = read_to_string(path)?;
    let cards: Vec<CardRecord> = serde_json::from_str(&text)?;
    let total = cards.len();
    let cards: Vec<CardRecord> = cards
        .into_iter()
        .filter(|card| config.region.admits(card))
        .collect();
    log::debug!(
        "Loaded {total} cards, {} in region '{}'.",
        cards.len(),
        config.region.name
    );
    if dedupe {
        let (cards, dropped) = drop_duplicates(cards);
        if dropped > 0 {
            log::info!("Dropped {dropped} duplicate cards.");
        }
        return Ok(cards);
    }
    Ok(cards)
}

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

use std::path::Path;

use crate::cmd::load_cards;
use crate::config::EngineConfig;
use crate::dedup::unique_cards;
use crate::deck;
use crate::deck::Skill;
use crate::error::Fallible;

pub fn check_cards(cards: &Path, config: Option<&Path>) -> Fallible<()> {
    for line in check_lines(cards, config)? {
        println!("{line}");
    }
    println!("ok");
    Ok(())
}

/// One line per subdeck with its card count, then per-skill totals.
fn check_lines(cards: &Path, config: Option<&Path>) -> Fallible<Vec<String>> {
    let config = EngineConfig::load(config)?;
    let cards = unique_cards(load_cards(cards, &config, false)?)?;
    let mut lines = Vec::new();
    let unconfigured = deck::warn_unconfigured_tiers(&config, &cards);
    if unconfigured > 0 {
        lines.push(format!("Unconfigured tiers: {unconfigured} cards skipped"));
    }
    let mut totals = [0usize; 3];
    for tier in config.tier_numbers() {
        let tree = deck::build(tier, &config, &cards)?;
        if tree.is_empty() {
            lines.push(format!("Tier {}: no cards", tree.root.number));
            continue;
        }
        for leaf in tree.leaves() {
            lines.push(format!("{}: {}", leaf.deck.name, leaf.cards.len()));
            totals[leaf.skill.index()] += leaf.cards.len();
        }
    }
    let totals: Vec<String> = Skill::ALL
        .iter()
        .zip(totals)
        .map(|(skill, count)| format!("{}: {count}", skill.label()))
        .collect();
    lines.push(format!("Totals: {}", totals.join(", ")));
    Ok(lines)
}

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

use crate::config::EngineConfig;
use crate::error::Fallible;
use crate::error::fail;
use crate::ids::DeckId;
use crate::types::card_record::CardKind;
use crate::types::card_record::CardRecord;

/// Anki nests decks by joining path segments with this.
pub const DECK_SEPARATOR: &str = "::";

/// A flattened deck, ready to be written to the `decks` blob.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Deck {
    pub id: DeckId,
    pub name: String,
}

/// What a subdeck trains.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Skill {
    Recognition,
    Production,
    Grammar,
}

impl Skill {
    /// In subdeck order.
    pub const ALL: [Skill; 3] = [Skill::Recognition, Skill::Production, Skill::Grammar];

    pub fn of(kind: CardKind) -> Self {
        match kind {
            CardKind::Recognition => Skill::Recognition,
            CardKind::Production => Skill::Production,
            CardKind::Cloze => Skill::Grammar,
        }
    }

    /// Position in [`Skill::ALL`].
    pub fn index(self) -> usize {
        match self {
            Skill::Recognition => 0,
            Skill::Production => 1,
            Skill::Grammar => 2,
        }
    }

    /// The letter prefix keeps Anki's alphabetical deck list in teaching
    /// order.
    pub fn label(self) -> &'static str {
        match self {
            Skill::Recognition => "A Recognition (ES→EN)",
            Skill::Production => "B Production (EN→ES)",
            Skill::Grammar => "C Grammar (Cloze)",
        }
    }
}

/// One tier's decks: tier → tense → skill. Only skill leaves hold cards.
#[derive(Debug)]
pub struct DeckTree {
    pub root: TierNode,
}

#[derive(Debug)]
pub struct TierNode {
    pub id: DeckId,
    pub number: u32,
    pub segment: String,
    pub tenses: Vec<TenseNode>,
}

#[derive(Debug)]
pub struct TenseNode {
    pub segment: String,
    pub skills: Vec<SkillNode>,
}

#[derive(Debug)]
pub struct SkillNode {
    pub id: DeckId,
    pub skill: Skill,
    pub segment: String,
    pub cards: Vec<CardRecord>,
}

/// A subdeck and the cards filed under it.
pub struct Leaf<'a> {
    pub deck: Deck,
    pub skill: Skill,
    pub cards: &'a [CardRecord],
}

/// Group a tier's cards into subdecks.
///
/// Cards of other tiers are ignored. Cards whose tense has no slot in the
/// tier's tense order are skipped with a warning. Empty (tense, skill)
/// buckets produce no subdeck, so a tier without cards yields an empty tree.
pub fn build(tier_number: u32, config: &EngineConfig, cards: &[CardRecord]) -> Fallible<DeckTree> {
    let tier = config.tier(tier_number)?;
    let ids = &config.identity;

    // buckets[tense][skill]
    let mut buckets: Vec<[Vec<CardRecord>; 3]> = tier
        .tense_order
        .iter()
        .map(|_| [Vec::new(), Vec::new(), Vec::new()])
        .collect();
    for card in cards.iter().filter(|card| card.tier == tier_number) {
        match tier.tense_order.iter().position(|t| *t == card.tense) {
            Some(tense_index) => {
                let skill = Skill::of(card.kind);
                buckets[tense_index][skill.index()].push(card.clone());
            }
            None => {
                log::warn!(
                    "Skipping card '{}': tense '{}' is not taught in tier {}.",
                    card.front,
                    card.tense,
                    tier_number
                );
            }
        }
    }

    let root_segment = checked_segment(tier.deck_name())?;
    let mut tenses = Vec::new();
    let mut counter: i64 = 1;
    for (tense, skill_buckets) in tier.tense_order.iter().zip(buckets) {
        if skill_buckets.iter().all(Vec::is_empty) {
            continue;
        }
        let position = tenses.len() + 1;
        let segment = checked_segment(format!(
            "{position:02} {}",
            config.tense_display(tense)
        ))?;
        let mut skills = Vec::new();
        for (skill, cards) in Skill::ALL.into_iter().zip(skill_buckets) {
            if cards.is_empty() {
                continue;
            }
            let id = ids.subdeck_id(tier_number, counter)?;
            counter += 1;
            skills.push(SkillNode {
                id,
                skill,
                segment: skill.label().to_string(),
                cards,
            });
        }
        tenses.push(TenseNode {
            segment,
            skills,
        });
    }

    let tree = DeckTree {
        root: TierNode {
            id: ids.tier_deck_id(tier_number)?,
            number: tier_number,
            segment: root_segment,
            tenses,
        },
    };
    log::debug!(
        "Tier {tier_number}: {} cards in {} subdecks.",
        tree.card_count(),
        tree.leaves().len()
    );
    Ok(tree)
}

/// Warn about records whose tier is not configured; they land in no
/// package. Returns how many there are.
pub fn warn_unconfigured_tiers(config: &EngineConfig, cards: &[CardRecord]) -> usize {
    let tiers = config.tier_numbers();
    let mut count = 0;
    for card in cards.iter().filter(|card| !tiers.contains(&card.tier)) {
        log::warn!(
            "Skipping card '{}': tier {} is not configured.",
            card.front,
            card.tier
        );
        count += 1;
    }
    count
}

fn checked_segment(segment: String) -> Fallible<String> {
    if segment.contains(DECK_SEPARATOR) || segment.trim().is_empty() {
        return fail(format!("invalid deck name segment: '{segment}'"));
    }
    Ok(segment)
}

impl DeckTree {
    pub fn is_empty(&self) -> bool {
        self.root.tenses.is_empty()
    }

    pub fn card_count(&self) -> usize {
        self.root
            .tenses
            .iter()
            .flat_map(|tense| &tense.skills)
            .map(|skill| skill.cards.len())
            .sum()
    }

    /// The subdecks in tree order, with their full `::`-joined names.
    pub fn leaves(&self) -> Vec<Leaf<'_>> {
        let mut leaves = Vec::new();
        for tense in &self.root.tenses {
            for skill in &tense.skills {
                let name = [
                    self.root.segment.as_str(),
                    tense.segment.as_str(),
                    skill.segment.as_str(),
                ]
                .join(DECK_SEPARATOR);
                leaves.push(Leaf {
                    deck: Deck { id: skill.id, name },
                    skill: skill.skill,
                    cards: &skill.cards,
                });
            }
        }
        leaves
    }

    /// Every deck that gets a row: the tier deck and its subdecks. The tense
    /// level has no row of its own; Anki derives it from the subdeck names.
    pub fn decks(&self) -> Vec<Deck> {
        let root = Deck {
            id: self.root.id,
            name: self.root.segment.clone(),
        };
        std::iter::once(root)
            .chain(self.leaves().into_iter().map(|leaf| leaf.deck))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper::sample_cards;

    #[test]
    fn test_example_scenario() -> Fallible<()> {
        let config = EngineConfig::default();
        let tree = build(1, &config, &sample_cards())?;
        let names: Vec<String> = tree.leaves().into_iter().map(|l| l.deck.name).collect();
        assert_eq!(
            names,
            vec![
                "Tier 1: Foundations::01 Present::A Recognition (ES→EN)",
                "Tier 1: Foundations::01 Present::B Production (EN→ES)",
            ]
        );
        for leaf in tree.leaves() {
            assert_eq!(leaf.cards.len(), 1);
        }
        Ok(())
    }

    #[test]
    fn test_tense_order_not_input_order() -> Fallible<()> {
        let config = EngineConfig::default();
        let cards = vec![
            CardRecord::new(CardKind::Recognition, "Hablé.", "I spoke.", 1, "preterite", "yo"),
            CardRecord::new(CardKind::Cloze, "{{c1::Hablo}}.", "", 1, "present", "yo"),
            CardRecord::new(CardKind::Recognition, "Hablo.", "I speak.", 1, "present", "yo"),
        ];
        let tree = build(1, &config, &cards)?;
        let decks = tree.decks();
        let ids = &config.identity;
        assert_eq!(
            decks,
            vec![
                Deck {
                    id: ids.tier_deck_id(1)?,
                    name: "Tier 1: Foundations".to_string()
                },
                Deck {
                    id: ids.tier_deck_id(1)? + 1,
                    name: "Tier 1: Foundations::01 Present::A Recognition (ES→EN)".to_string()
                },
                Deck {
                    id: ids.tier_deck_id(1)? + 2,
                    name: "Tier 1: Foundations::01 Present::C Grammar (Cloze)".to_string()
                },
                Deck {
                    id: ids.tier_deck_id(1)? + 3,
                    name: "Tier 1: Foundations::02 Preterite::A Recognition (ES→EN)".to_string()
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_hierarchy_for_every_tier() -> Fallible<()> {
        let config = EngineConfig::default();
        for tier in config.tier_numbers() {
            let tense = config.tier(tier)?.tense_order[0].clone();
            let cards = vec![
                CardRecord::new(CardKind::Recognition, "a", "b", tier, &tense, "yo"),
                CardRecord::new(CardKind::Production, "b", "a", tier, &tense, "yo"),
            ];
            let tree = build(tier, &config, &cards)?;
            for leaf in tree.leaves() {
                let segments: Vec<&str> = leaf.deck.name.split(DECK_SEPARATOR).collect();
                assert_eq!(segments.len(), 3);
                assert_eq!(segments[0], config.tier(tier)?.deck_name());
                assert!(segments[1].starts_with("01 "));
            }
        }
        Ok(())
    }

    #[test]
    fn test_empty_tier() -> Fallible<()> {
        let config = EngineConfig::default();
        let tree = build(2, &config, &sample_cards())?;
        assert!(tree.is_empty());
        assert_eq!(tree.card_count(), 0);
        assert_eq!(tree.decks().len(), 1);
        Ok(())
    }

    #[test]
    fn test_untaught_tense_skipped() -> Fallible<()> {
        let config = EngineConfig::default();
        let cards = vec![
            CardRecord::new(CardKind::Recognition, "Hablaré.", "I will speak.", 5, "future", "yo"),
            CardRecord::new(CardKind::Recognition, "Me gusta.", "I like it.", 5, "present", "yo"),
        ];
        let tree = build(5, &config, &cards)?;
        assert_eq!(tree.card_count(), 1);
        Ok(())
    }

    #[test]
    fn test_unconfigured_tiers_counted() {
        let config = EngineConfig::default();
        let mut cards = sample_cards();
        cards.push(CardRecord::new(CardKind::Recognition, "Hablaría.", "I would speak.", 9, "conditional", "yo"));
        assert_eq!(warn_unconfigured_tiers(&config, &sample_cards()), 0);
        assert_eq!(warn_unconfigured_tiers(&config, &cards), 1);
    }

    #[test]
    fn test_unknown_tier() {
        let config = EngineConfig::default();
        assert!(build(42, &config, &sample_cards()).is_err());
    }
}

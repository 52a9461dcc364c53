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

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashSet;
use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;

use crate::deck::DECK_SEPARATOR;
use crate::error::Fallible;
use crate::error::fail;
use crate::ids::PackageIdentitySpace;
use crate::ids::SUBDECK_CAPACITY;
use crate::types::card_record::CardRecord;

/// Everything the engine needs besides the cards themselves.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub tiers: Vec<TierConfig>,
    pub tense_names: BTreeMap<String, String>,
    pub region: RegionConfig,
    pub identity: PackageIdentitySpace,
    pub deck_limits: DeckLimits,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierConfig {
    pub number: u32,
    pub display_name: String,
    /// Tenses in teaching order. Subdecks follow this order.
    pub tense_order: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegionConfig {
    pub name: String,
    pub allowed_subjects: BTreeSet<String>,
    pub allowed_regions: BTreeSet<String>,
    pub file_prefix: String,
}

/// Daily limits written into the deck options preset.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeckLimits {
    pub new_per_day: u32,
    pub reviews_per_day: u32,
}

const UNIVERSAL_REGION: &str = "universal";

impl EngineConfig {
    /// Load the configuration from a TOML file, or use the built-in tiers if
    /// no path is given.
    pub fn load(path: Option<&Path>) -> Fallible<Self> {
        let config = match path {
            Some(path) => {
                if !path.exists() {
                    return fail(format!(
                        "configuration file {} does not exist.",
                        path.display()
                    ));
                }
                let text = read_to_string(path)?;
                toml::from_str(&text)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Fallible<()> {
        if self.tiers.is_empty() {
            return fail("no tiers configured.");
        }
        let mut numbers = HashSet::new();
        for tier in &self.tiers {
            if tier.number == 0 {
                return fail("tier numbers start at 1.");
            }
            if !numbers.insert(tier.number) {
                return fail(format!("tier {} is configured twice.", tier.number));
            }
            if tier.tense_order.is_empty() {
                return fail(format!("tier {} has no tenses.", tier.number));
            }
            let mut tenses = HashSet::new();
            for tense in &tier.tense_order {
                if !tenses.insert(tense) {
                    return fail(format!(
                        "tier {} lists tense '{tense}' twice.",
                        tier.number
                    ));
                }
            }
            if tier.display_name.contains(DECK_SEPARATOR) {
                return fail(format!(
                    "tier {} name must not contain '{DECK_SEPARATOR}'.",
                    tier.number
                ));
            }
        }
        for (tense, name) in &self.tense_names {
            if name.contains(DECK_SEPARATOR) {
                return fail(format!(
                    "display name for tense '{tense}' must not contain '{DECK_SEPARATOR}'."
                ));
            }
        }
        let prefix = &self.region.file_prefix;
        if prefix.is_empty()
            || !prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return fail(format!("invalid region file prefix: '{prefix}'."));
        }
        self.identity.validate()?;
        // Every tier's whole subdeck range must be addressable.
        for tier in &self.tiers {
            self.identity
                .subdeck_id(tier.number, SUBDECK_CAPACITY - 1)?;
        }
        Ok(())
    }

    pub fn tier(&self, number: u32) -> Fallible<&TierConfig> {
        match self.tiers.iter().find(|tier| tier.number == number) {
            Some(tier) => Ok(tier),
            None => fail(format!("tier {number} is not configured.")),
        }
    }

    pub fn tier_numbers(&self) -> Vec<u32> {
        self.tiers.iter().map(|tier| tier.number).collect()
    }

    /// The human-readable name of a tense; unknown tenses show their key.
    pub fn tense_display<'a>(&'a self, tense: &'a str) -> &'a str {
        self.tense_names
            .get(tense)
            .map(String::as_str)
            .unwrap_or(tense)
    }
}

impl TierConfig {
    fn new(number: u32, display_name: &str, tense_order: &[&str]) -> Self {
        Self {
            number,
            display_name: display_name.to_string(),
            tense_order: tense_order.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// The top-level deck segment, e.g. `Tier 1: Foundations`.
    pub fn deck_name(&self) -> String {
        format!("Tier {}: {}", self.number, self.display_name)
    }

    /// The display name with everything but ASCII letters and digits removed,
    /// for use in file names.
    pub fn file_stem(&self) -> String {
        self.display_name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect()
    }
}

impl RegionConfig {
    /// Whether a card's subject and region belong to this region.
    pub fn admits(&self, card: &CardRecord) -> bool {
        if !self.allowed_subjects.contains(&card.subject) {
            return false;
        }
        match card.region.as_deref() {
            None | Some(UNIVERSAL_REGION) => true,
            Some(region) => self.allowed_regions.contains(region),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let tiers = vec![
            TierConfig::new(
                1,
                "Foundations",
                &[
                    "present",
                    "present-progressive",
                    "going-to",
                    "preterite",
                    "present-perfect",
                    "future",
                ],
            ),
            TierConfig::new(
                2,
                "Daily Routines",
                &["present", "present-progressive", "going-to", "preterite"],
            ),
            TierConfig::new(
                3,
                "Irregular Essentials",
                &[
                    "present",
                    "present-progressive",
                    "going-to",
                    "preterite",
                    "present-perfect",
                ],
            ),
            TierConfig::new(
                4,
                "Emotional & Cognitive",
                &[
                    "present",
                    "present-progressive",
                    "going-to",
                    "present-perfect",
                ],
            ),
            TierConfig::new(5, "Gustar-Type Verbs", &["present", "going-to", "preterite"]),
        ];
        let tense_names = [
            ("present", "Present"),
            ("present-progressive", "Gerund"),
            ("going-to", "Going-to Future"),
            ("preterite", "Preterite"),
            ("present-perfect", "Present Perfect"),
            ("future", "Simple Future"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Self {
            tiers,
            tense_names,
            region: RegionConfig::default(),
            identity: PackageIdentitySpace::default(),
            deck_limits: DeckLimits::default(),
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        let subjects = [
            "yo", "tú", "él", "ella", "usted", "nosotros", "ellos", "ellas", "ustedes",
        ];
        Self {
            name: "Mexico / Latin America".to_string(),
            allowed_subjects: subjects.iter().map(|s| s.to_string()).collect(),
            allowed_regions: [UNIVERSAL_REGION.to_string()].into_iter().collect(),
            file_prefix: "mexico".to_string(),
        }
    }
}

impl Default for DeckLimits {
    fn default() -> Self {
        Self {
            new_per_day: 20,
            reviews_per_day: 200,
        }
    }
}

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

use serde::Serialize;

use crate::config::DeckLimits;
use crate::deck::Deck;
use crate::error::Fallible;
use crate::error::fail;
use crate::ids::DeckId;
use crate::ids::ModelId;
use crate::ids::PackageIdentitySpace;
use crate::types::note_kind::NoteKind;
use crate::types::timestamp::Timestamp;

/// The tables and indexes of a collection file, in Anki's schema 11 layout.
pub const SCHEMA: &str = include_str!("schema.sql");

/// The schema version written to `col.ver`.
const SCHEMA_VERSION: i64 = 11;

/// The ID of the single deck options preset.
const DECK_OPTIONS_ID: i64 = 1;

const LATEX_PRE: &str = "\\documentclass[12pt]{article}\\special{papersize=3in,5in}\\usepackage[utf8]{inputenc}\\usepackage{amssymb,amsmath}\\pagestyle{empty}\\setlength{\\parindent}{0in}\\begin{document}";
const LATEX_POST: &str = "\\end{document}";

const BASIC_CSS: &str = ".card { font-family: arial; font-size: 20px; text-align: center; color: black; background-color: white; }";
const CLOZE_CSS: &str = ".card { font-family: arial; font-size: 20px; text-align: center; color: black; background-color: white; } .cloze { font-weight: bold; color: #0066cc; }";

/// A note type (Anki calls these models). Field order decides how the
/// `\x1f`-joined `flds` column is decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct NoteType {
    pub id: ModelId,
    pub kind: NoteKind,
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<Template>,
    pub css: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    pub name: String,
    pub front: String,
    pub back: String,
}

impl NoteType {
    pub fn basic(id: ModelId) -> Self {
        Self {
            id,
            kind: NoteKind::Basic,
            name: "Drillmaster Translation".to_string(),
            fields: vec!["Front".to_string(), "Back".to_string()],
            templates: vec![Template {
                name: "Card 1".to_string(),
                front: "{{Front}}".to_string(),
                back: "{{Front}}<hr id=answer>{{Back}}".to_string(),
            }],
            css: BASIC_CSS.to_string(),
        }
    }

    pub fn cloze(id: ModelId) -> Self {
        Self {
            id,
            kind: NoteKind::Cloze,
            name: "Drillmaster Cloze".to_string(),
            fields: vec!["Text".to_string(), "Extra".to_string()],
            templates: vec![Template {
                name: "Cloze".to_string(),
                front: "{{cloze:Text}}".to_string(),
                back: "{{cloze:Text}}<br>{{Extra}}".to_string(),
            }],
            css: CLOZE_CSS.to_string(),
        }
    }

    /// Both note types, with IDs from the identity space.
    pub fn all(ids: &PackageIdentitySpace) -> Vec<NoteType> {
        vec![
            NoteType::basic(ids.model_id(NoteKind::Basic)),
            NoteType::cloze(ids.model_id(NoteKind::Cloze)),
        ]
    }
}

/// The contents of the single `col` row.
#[derive(Debug)]
pub struct CollectionRow {
    pub crt: i64,
    pub modified: i64,
    pub scm: i64,
    pub ver: i64,
    pub conf: String,
    pub models: String,
    pub decks: String,
    pub dconf: String,
    pub tags: String,
    deck_ids: BTreeSet<DeckId>,
}

impl CollectionRow {
    /// Fails if `deck_id` is not in the `decks` blob.
    pub fn ensure_deck(&self, deck_id: DeckId) -> Fallible<()> {
        if !self.deck_ids.contains(&deck_id) {
            return fail(format!("deck {deck_id} is referenced but not defined."));
        }
        Ok(())
    }
}

/// Build the `col` row. Every timestamp comes from `now`. The blobs are
/// serialized and re-parsed here, so a bad blob fails construction instead of
/// reaching the database.
///
/// The "Default" deck (`ids.default_deck_id`) is always added.
pub fn build(
    decks: &[Deck],
    note_types: &[NoteType],
    limits: DeckLimits,
    ids: &PackageIdentitySpace,
    now: Timestamp,
    card_count: usize,
) -> Fallible<CollectionRow> {
    let secs = now.secs();

    let mut deck_ids = BTreeSet::new();
    let mut deck_names = BTreeSet::new();
    let mut deck_map = BTreeMap::new();
    let default_deck = Deck {
        id: ids.default_deck_id,
        name: "Default".to_string(),
    };
    for deck in std::iter::once(&default_deck).chain(decks) {
        if deck.name.trim().is_empty() {
            return fail(format!("deck {} has an empty name.", deck.id));
        }
        if !deck_ids.insert(deck.id) {
            return fail(format!("deck ID {} is used twice.", deck.id));
        }
        if !deck_names.insert(deck.name.as_str()) {
            return fail(format!("deck name '{}' is used twice.", deck.name));
        }
        deck_map.insert(deck.id.to_string(), DeckJson::new(deck, secs));
    }

    let mut model_map = BTreeMap::new();
    for note_type in note_types {
        let model = ModelJson::new(note_type, ids.default_deck_id, secs);
        if model_map.insert(note_type.id.to_string(), model).is_some() {
            return fail(format!("note type ID {} is used twice.", note_type.id));
        }
    }
    let current_model = match note_types.first() {
        Some(note_type) => note_type.id,
        None => return fail("a collection needs at least one note type."),
    };

    let conf = GlobalConfJson {
        active_decks: vec![ids.default_deck_id],
        cur_deck: ids.default_deck_id,
        new_spread: 0,
        collapse_time: 1200,
        time_lim: 0,
        est_times: true,
        due_counts: true,
        cur_model: current_model,
        next_pos: card_count + 1,
        sort_type: "noteFld",
        sort_backwards: false,
        add_to_cur: true,
        new_bury: true,
    };

    let mut dconf = BTreeMap::new();
    dconf.insert(
        DECK_OPTIONS_ID.to_string(),
        DeckOptionsJson::new(limits, secs),
    );

    Ok(CollectionRow {
        crt: secs,
        modified: now.millis(),
        scm: now.millis(),
        ver: SCHEMA_VERSION,
        conf: to_checked_json(&conf)?,
        models: to_checked_json(&model_map)?,
        decks: to_checked_json(&deck_map)?,
        dconf: to_checked_json(&dconf)?,
        tags: "{}".to_string(),
        deck_ids,
    })
}

fn to_checked_json<T: Serialize>(value: &T) -> Fallible<String> {
    let json = serde_json::to_string(value)?;
    let _: serde_json::Value = serde_json::from_str(&json)?;
    Ok(json)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GlobalConfJson {
    active_decks: Vec<DeckId>,
    cur_deck: DeckId,
    new_spread: u8,
    collapse_time: u32,
    time_lim: u32,
    est_times: bool,
    due_counts: bool,
    cur_model: ModelId,
    next_pos: usize,
    sort_type: &'static str,
    sort_backwards: bool,
    add_to_cur: bool,
    new_bury: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeckJson {
    id: DeckId,
    name: String,
    desc: String,
    #[serde(rename = "mod")]
    modified: i64,
    usn: i64,
    #[serde(rename = "dyn")]
    dynamic: u8,
    conf: i64,
    collapsed: bool,
    browser_collapsed: bool,
    extend_new: u32,
    extend_rev: u32,
    new_today: [i64; 2],
    rev_today: [i64; 2],
    lrn_today: [i64; 2],
    time_today: [i64; 2],
}

impl DeckJson {
    fn new(deck: &Deck, secs: i64) -> Self {
        Self {
            id: deck.id,
            name: deck.name.clone(),
            desc: String::new(),
            modified: secs,
            usn: 0,
            dynamic: 0,
            conf: DECK_OPTIONS_ID,
            collapsed: false,
            browser_collapsed: false,
            extend_new: 10,
            extend_rev: 50,
            new_today: [0, 0],
            rev_today: [0, 0],
            lrn_today: [0, 0],
            time_today: [0, 0],
        }
    }
}

#[derive(Serialize)]
struct ModelJson {
    id: ModelId,
    name: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(rename = "mod")]
    modified: i64,
    usn: i64,
    sortf: u32,
    did: DeckId,
    tmpls: Vec<TemplateJson>,
    flds: Vec<FieldJson>,
    css: String,
    #[serde(rename = "latexPre")]
    latex_pre: &'static str,
    #[serde(rename = "latexPost")]
    latex_post: &'static str,
    latexsvg: bool,
    req: Vec<(usize, &'static str, Vec<usize>)>,
    tags: Vec<String>,
    vers: Vec<String>,
}

impl ModelJson {
    fn new(note_type: &NoteType, default_deck_id: DeckId, secs: i64) -> Self {
        let tmpls = note_type
            .templates
            .iter()
            .enumerate()
            .map(|(ord, template)| TemplateJson {
                name: template.name.clone(),
                ord,
                qfmt: template.front.clone(),
                afmt: template.back.clone(),
                bqfmt: String::new(),
                bafmt: String::new(),
                did: None,
                bfont: String::new(),
                bsize: 0,
            })
            .collect();
        let flds = note_type
            .fields
            .iter()
            .enumerate()
            .map(|(ord, name)| FieldJson {
                name: name.clone(),
                ord,
                sticky: false,
                rtl: false,
                font: "Arial",
                size: 20,
                media: Vec::new(),
            })
            .collect();
        // Every template needs the first field.
        let req = (0..note_type.templates.len())
            .map(|ord| (ord, "any", vec![0]))
            .collect();
        Self {
            id: note_type.id,
            name: note_type.name.clone(),
            kind: note_type.kind.model_type(),
            modified: secs,
            usn: 0,
            sortf: 0,
            did: default_deck_id,
            tmpls,
            flds,
            css: note_type.css.clone(),
            latex_pre: LATEX_PRE,
            latex_post: LATEX_POST,
            latexsvg: false,
            req,
            tags: Vec::new(),
            vers: Vec::new(),
        }
    }
}

#[derive(Serialize)]
struct TemplateJson {
    name: String,
    ord: usize,
    qfmt: String,
    afmt: String,
    bqfmt: String,
    bafmt: String,
    did: Option<DeckId>,
    bfont: String,
    bsize: u32,
}

#[derive(Serialize)]
struct FieldJson {
    name: String,
    ord: usize,
    sticky: bool,
    rtl: bool,
    font: &'static str,
    size: u32,
    media: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeckOptionsJson {
    id: i64,
    name: &'static str,
    #[serde(rename = "mod")]
    modified: i64,
    usn: i64,
    max_taken: u32,
    autoplay: bool,
    timer: u8,
    replayq: bool,
    #[serde(rename = "dyn")]
    dynamic: bool,
    new: NewCardOptionsJson,
    rev: ReviewOptionsJson,
    lapse: LapseOptionsJson,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewCardOptionsJson {
    delays: Vec<f64>,
    ints: [u32; 3],
    initial_factor: u32,
    separate: bool,
    order: u8,
    per_day: u32,
    bury: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewOptionsJson {
    per_day: u32,
    ease4: f64,
    fuzz: f64,
    min_space: u32,
    ivl_fct: f64,
    max_ivl: u32,
    bury: bool,
    hard_factor: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LapseOptionsJson {
    delays: Vec<f64>,
    mult: f64,
    min_int: u32,
    leech_fails: u32,
    leech_action: u8,
}

impl DeckOptionsJson {
    fn new(limits: DeckLimits, secs: i64) -> Self {
        Self {
            id: DECK_OPTIONS_ID,
            name: "Default",
            modified: secs,
            usn: 0,
            max_taken: 60,
            autoplay: true,
            timer: 0,
            replayq: true,
            dynamic: false,
            new: NewCardOptionsJson {
                delays: vec![1.0, 10.0],
                ints: [1, 4, 7],
                initial_factor: 2500,
                separate: true,
                order: 1,
                per_day: limits.new_per_day,
                bury: true,
            },
            rev: ReviewOptionsJson {
                per_day: limits.reviews_per_day,
                ease4: 1.3,
                fuzz: 0.05,
                min_space: 1,
                ivl_fct: 1.0,
                max_ivl: 36500,
                bury: true,
                hard_factor: 1.2,
            },
            lapse: LapseOptionsJson {
                delays: vec![10.0],
                mult: 0.0,
                min_int: 1,
                leech_fails: 8,
                leech_action: 0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::types::timestamp::fixed_timestamp;

    fn tier_decks() -> Vec<Deck> {
        vec![
            Deck {
                id: 1607393320,
                name: "Tier 1: Foundations".to_string(),
            },
            Deck {
                id: 1607393321,
                name: "Tier 1: Foundations::01 Present::A Recognition (ES→EN)".to_string(),
            },
        ]
    }

    fn row() -> Fallible<CollectionRow> {
        let ids = PackageIdentitySpace::default();
        build(
            &tier_decks(),
            &NoteType::all(&ids),
            DeckLimits::default(),
            &ids,
            fixed_timestamp(),
            2,
        )
    }

    #[test]
    fn test_timestamps_from_one_clock() -> Fallible<()> {
        let row = row()?;
        assert_eq!(row.crt, 1_700_000_000);
        assert_eq!(row.modified, 1_700_000_000_000);
        assert_eq!(row.scm, row.modified);
        assert_eq!(row.ver, 11);
        Ok(())
    }

    #[test]
    fn test_decks_blob() -> Fallible<()> {
        let row = row()?;
        let decks: Value = serde_json::from_str(&row.decks)?;
        assert_eq!(decks["1"]["name"], "Default");
        assert_eq!(
            decks["1607393321"]["name"],
            "Tier 1: Foundations::01 Present::A Recognition (ES→EN)"
        );
        assert_eq!(decks["1607393321"]["conf"], 1);
        row.ensure_deck(1607393321)?;
        assert!(row.ensure_deck(1607393399).is_err());
        Ok(())
    }

    #[test]
    fn test_models_blob() -> Fallible<()> {
        let row = row()?;
        let models: Value = serde_json::from_str(&row.models)?;
        let basic = &models["1607392319"];
        assert_eq!(basic["type"], 0);
        assert_eq!(basic["flds"][0]["name"], "Front");
        assert_eq!(basic["flds"][1]["name"], "Back");
        assert_eq!(basic["did"], 1);
        assert_eq!(basic["req"], serde_json::json!([[0, "any", [0]]]));
        let cloze = &models["1607392321"];
        assert_eq!(cloze["type"], 1);
        assert_eq!(cloze["flds"][0]["name"], "Text");
        assert_eq!(cloze["tmpls"][0]["qfmt"], "{{cloze:Text}}");
        assert_eq!(cloze["latexPost"], "\\end{document}");
        Ok(())
    }

    #[test]
    fn test_conf_and_dconf() -> Fallible<()> {
        let row = row()?;
        let conf: Value = serde_json::from_str(&row.conf)?;
        assert_eq!(conf["curModel"], 1607392319);
        assert_eq!(conf["nextPos"], 3);
        let dconf: Value = serde_json::from_str(&row.dconf)?;
        assert_eq!(dconf["1"]["new"]["perDay"], 20);
        assert_eq!(dconf["1"]["rev"]["perDay"], 200);
        Ok(())
    }

    #[test]
    fn test_quotes_in_names_survive() -> Fallible<()> {
        let ids = PackageIdentitySpace::default();
        let decks = vec![Deck {
            id: 1607393320,
            name: "Tier 1: It's \"quoted\"".to_string(),
        }];
        let row = build(
            &decks,
            &NoteType::all(&ids),
            DeckLimits::default(),
            &ids,
            fixed_timestamp(),
            0,
        )?;
        let parsed: Value = serde_json::from_str(&row.decks)?;
        assert_eq!(parsed["1607393320"]["name"], "Tier 1: It's \"quoted\"");
        Ok(())
    }

    #[test]
    fn test_duplicate_deck_rejected() {
        let ids = PackageIdentitySpace::default();
        let mut decks = tier_decks();
        decks.push(decks[0].clone());
        let result = build(
            &decks,
            &NoteType::all(&ids),
            DeckLimits::default(),
            &ids,
            fixed_timestamp(),
            0,
        );
        assert!(result.is_err());
    }
}

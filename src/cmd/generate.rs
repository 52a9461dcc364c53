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

use std::collections::BTreeSet;
use std::fs::create_dir_all;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use tempfile::NamedTempFile;

use crate::cmd::load_cards;
use crate::config::EngineConfig;
use crate::error::Fallible;
use crate::error::fail;
use crate::media::load::MediaLoader;
use crate::package::Package;
use crate::package::PackageBuilder;

pub struct GenerateOptions {
    pub cards: PathBuf,
    pub tier: Option<String>,
    pub output: PathBuf,
    pub config: Option<PathBuf>,
    pub media_dir: Option<PathBuf>,
    pub dedupe: bool,
}

/// Which packages to build.
#[derive(Debug, PartialEq)]
pub struct TierSelection {
    pub tiers: BTreeSet<u32>,
    /// Also build the package with every tier in it.
    pub complete: bool,
}

/// Parse a selection like `1`, `1,3,5`, `1-3`, `all` or `1-5,all`. With no
/// selection, every configured tier is built separately.
pub fn parse_tiers(arg: Option<&str>, config: &EngineConfig) -> Fallible<TierSelection> {
    let known: BTreeSet<u32> = config.tier_numbers().into_iter().collect();
    let Some(arg) = arg else {
        return Ok(TierSelection {
            tiers: known,
            complete: false,
        });
    };
    let mut tiers = BTreeSet::new();
    let mut complete = false;
    for part in arg.split(',') {
        let part = part.trim();
        if part == "all" {
            complete = true;
        } else if let Some((start, end)) = part.split_once('-') {
            let start = parse_tier(start)?;
            let end = parse_tier(end)?;
            if start > end {
                return fail(format!("invalid tier range: '{part}'."));
            }
            tiers.extend(start..=end);
        } else {
            tiers.insert(parse_tier(part)?);
        }
    }
    if let Some(unknown) = tiers.difference(&known).next() {
        return fail(format!("tier {unknown} is not configured."));
    }
    Ok(TierSelection { tiers, complete })
}

fn parse_tier(s: &str) -> Fallible<u32> {
    match s.trim().parse::<u32>() {
        Ok(n) => Ok(n),
        Err(_) => fail(format!("invalid tier: '{s}'.")),
    }
}

pub fn generate_packages(options: GenerateOptions) -> Fallible<()> {
    let config = EngineConfig::load(options.config.as_deref())?;
    let selection = parse_tiers(options.tier.as_deref(), &config)?;
    let cards = load_cards(&options.cards, &config, options.dedupe)?;
    println!("Found {} cards.", cards.len());

    let mut builder = PackageBuilder::new(&config);
    if let Some(loader) = media_loader(&options)? {
        log::debug!("Reading media from {}.", loader.root().display());
        builder = builder.with_media(loader);
    }

    create_dir_all(&options.output)?;
    let prefix = &config.region.file_prefix;
    let mut failed: Vec<String> = Vec::new();

    for tier in &selection.tiers {
        let stem = config.tier(*tier)?.file_stem();
        let path = options
            .output
            .join(format!("DrillMaster-Tier{tier}-{stem}-{prefix}.apkg"));
        let result = builder.build_tier(*tier, &cards);
        if !report(&format!("Tier {tier}"), result, &path) {
            failed.push(format!("tier {tier}"));
        }
    }
    if selection.complete {
        let path = options
            .output
            .join(format!("DrillMaster-Complete-{prefix}.apkg"));
        let result = builder.build_uber(&cards);
        if !report("Complete package", result, &path) {
            failed.push("complete package".to_string());
        }
    }

    if !failed.is_empty() {
        return fail(format!("failed to build: {}.", failed.join(", ")));
    }
    Ok(())
}

/// An explicit media directory must exist. Otherwise audio is looked up next
/// to the card file, if that directory exists.
fn media_loader(options: &GenerateOptions) -> Fallible<Option<MediaLoader>> {
    if let Some(dir) = &options.media_dir {
        return MediaLoader::new(dir).map(Some);
    }
    let dir = match options.cards.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if dir.is_dir() {
        Ok(Some(MediaLoader::new(&dir)?))
    } else {
        Ok(None)
    }
}

/// Write a built package, or log why there is none. Returns false if the
/// package failed.
fn report(label: &str, result: Fallible<Option<Package>>, path: &Path) -> bool {
    let package = match result {
        Ok(Some(package)) => package,
        Ok(None) => {
            println!("{label}: no cards, skipped.");
            return true;
        }
        Err(e) => {
            log::error!("{label} failed: {e}");
            return false;
        }
    };
    match write_atomically(path, &package.bytes) {
        Ok(()) => {
            log::info!(
                "{label}: {} notes in {} decks, {} media files.",
                package.note_count,
                package.deck_count,
                package.media_count
            );
            println!("Wrote {}.", path.display());
            true
        }
        Err(e) => {
            log::error!("{label} failed: {e}");
            false
        }
    }
}

/// Write to a temporary file in the target directory, then rename it into
/// place, so a failed write never leaves a partial package behind.
fn write_atomically(path: &Path, bytes: &[u8]) -> Fallible<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

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

use std::fs::File;
use std::fs::create_dir;
use std::fs::read_dir;
use std::fs::write;
use std::io::Read;
use std::path::Path;
use std::process::Command;
use std::process::Output;

use rusqlite::Connection;
use tempfile::TempDir;
use tempfile::tempdir;
use zip::ZipArchive;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const CARDS: &str = r#"[
    {"type":"recognition","front":"Yo hablo.","back":"I speak.","tags":"verb::HABLAR;tense::present","tier":1,"tense":"present","subject":"yo","verb":"HABLAR","audioFile":"hablo.mp3"},
    {"type":"production","front":"I speak.","back":"Yo hablo.","tags":["verb::HABLAR","tense::present"],"tier":1,"tense":"present","subject":"yo","verb":"HABLAR","audioFile":"missing.mp3"},
    {"type":"recognition","front":"Voy a comer.","back":"I am going to eat.","tier":3,"tense":"going-to","subject":"yo","verb":"COMER"}
]"#;

fn drillmaster(args: &[&str]) -> std::io::Result<Output> {
    Command::new(env!("CARGO_BIN_EXE_drillmaster"))
        .args(args)
        .output()
}

fn setup() -> Result<TempDir, Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    write(dir.path().join("cards.json"), CARDS)?;
    create_dir(dir.path().join("audio"))?;
    write(dir.path().join("audio").join("hablo.mp3"), b"ID3 hablo")?;
    Ok(dir)
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn entries(dir: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let mut names = Vec::new();
    for entry in read_dir(dir)? {
        names.push(entry?.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

#[test]
fn test_generate_tier_one() -> TestResult {
    let dir = setup()?;
    let output = dir.path().join("out");
    let result = drillmaster(&[
        "generate",
        "--cards",
        &path_arg(&dir.path().join("cards.json")),
        "--tier",
        "1,2",
        "--output",
        &path_arg(&output),
        "--media-dir",
        &path_arg(&dir.path().join("audio")),
    ])?;
    assert!(result.status.success(), "{result:?}");
    // Tier 2 has no cards and gets no file.
    assert_eq!(
        entries(&output)?,
        vec!["DrillMaster-Tier1-Foundations-mexico.apkg"]
    );

    let mut archive = ZipArchive::new(File::open(
        output.join("DrillMaster-Tier1-Foundations-mexico.apkg"),
    )?)?;
    let mut media = String::new();
    archive.by_name("media")?.read_to_string(&mut media)?;
    assert_eq!(media, r#"{"0":"hablo.mp3"}"#);
    let mut audio = Vec::new();
    archive.by_name("0")?.read_to_end(&mut audio)?;
    assert_eq!(audio, b"ID3 hablo");

    let mut db = Vec::new();
    archive.by_name("collection.anki2")?.read_to_end(&mut db)?;
    let db_path = dir.path().join("collection.anki2");
    write(&db_path, db)?;
    let conn = Connection::open(&db_path)?;

    let mut stmt = conn.prepare("select name from sqlite_master where type = 'table' order by name")?;
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    assert_eq!(tables, vec!["cards", "col", "graves", "notes", "revlog"]);

    let mut stmt = conn.prepare("select flds, tags from notes order by id")?;
    let notes: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<_, _>>()?;
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0].0, "Yo hablo.[sound:hablo.mp3]\u{1f}I speak.");
    assert_eq!(notes[1].0, "I speak.\u{1f}Yo hablo.[sound:missing.mp3]");
    assert!(notes[0].1.contains(" verb::HABLAR "));

    let csums: i64 = conn.query_row("select count(distinct csum) from notes", [], |row| row.get(0))?;
    assert_eq!(csums, 2);
    Ok(())
}

#[test]
fn test_generate_complete_package() -> TestResult {
    let dir = setup()?;
    let output = dir.path().join("out");
    let result = drillmaster(&[
        "generate",
        "--cards",
        &path_arg(&dir.path().join("cards.json")),
        "--tier",
        "all",
        "--output",
        &path_arg(&output),
    ])?;
    assert!(result.status.success(), "{result:?}");
    assert_eq!(entries(&output)?, vec!["DrillMaster-Complete-mexico.apkg"]);

    let mut archive = ZipArchive::new(File::open(output.join("DrillMaster-Complete-mexico.apkg"))?)?;
    // Without --media-dir, audio is looked up next to the cards, where there is none.
    let mut media = String::new();
    archive.by_name("media")?.read_to_string(&mut media)?;
    assert_eq!(media, "{}");
    let mut db = Vec::new();
    archive.by_name("collection.anki2")?.read_to_end(&mut db)?;
    let db_path = dir.path().join("collection.anki2");
    write(&db_path, db)?;
    let conn = Connection::open(&db_path)?;
    let notes: i64 = conn.query_row("select count(*) from notes", [], |row| row.get(0))?;
    assert_eq!(notes, 3);
    let decks: i64 = conn.query_row("select count(distinct did) from cards", [], |row| row.get(0))?;
    assert_eq!(decks, 3);
    Ok(())
}

#[test]
fn test_duplicates_fail_without_dedupe() -> TestResult {
    let dir = tempdir()?;
    let hablo = r#"{"type":"recognition","front":"Yo hablo.","back":"I speak.","tier":1,"tense":"present","subject":"yo"}"#;
    write(dir.path().join("cards.json"), format!("[{hablo},{hablo}]"))?;
    let output = dir.path().join("out");
    let cards = path_arg(&dir.path().join("cards.json"));

    let result = drillmaster(&["generate", "--cards", &cards, "--tier", "1", "--output", &path_arg(&output)])?;
    assert!(!result.status.success());
    assert!(entries(&output)?.is_empty());

    let result = drillmaster(&[
        "generate",
        "--cards",
        &cards,
        "--tier",
        "1",
        "--output",
        &path_arg(&output),
        "--dedupe",
    ])?;
    assert!(result.status.success(), "{result:?}");
    assert_eq!(entries(&output)?.len(), 1);
    Ok(())
}

#[test]
fn test_failing_tier_does_not_block_others() -> TestResult {
    let dir = tempdir()?;
    let hablo = r#"{"type":"recognition","front":"Yo hablo.","back":"I speak.","tier":1,"tense":"present","subject":"yo"}"#;
    let comer = r#"{"type":"recognition","front":"Voy a comer.","back":"I am going to eat.","tier":3,"tense":"going-to","subject":"yo"}"#;
    write(dir.path().join("cards.json"), format!("[{hablo},{comer},{comer}]"))?;
    let output = dir.path().join("out");
    let result = drillmaster(&[
        "generate",
        "--cards",
        &path_arg(&dir.path().join("cards.json")),
        "--tier",
        "1,3",
        "--output",
        &path_arg(&output),
    ])?;
    assert!(!result.status.success());
    assert_eq!(
        entries(&output)?,
        vec!["DrillMaster-Tier1-Foundations-mexico.apkg"]
    );
    let stderr = String::from_utf8(result.stderr)?;
    assert!(stderr.contains("tier 3"), "{stderr}");
    Ok(())
}

#[test]
fn test_check() -> TestResult {
    let dir = setup()?;
    let result = drillmaster(&["check", "--cards", &path_arg(&dir.path().join("cards.json"))])?;
    assert!(result.status.success(), "{result:?}");
    let stdout = String::from_utf8(result.stdout)?;
    assert!(stdout.contains("Tier 1: Foundations::01 Present::A Recognition (ES→EN): 1\n"));
    assert!(stdout.contains("Tier 3: Irregular Essentials::01 Going-to Future::A Recognition (ES→EN): 1\n"));
    assert!(stdout.ends_with("ok\n"));
    Ok(())
}

#[test]
fn test_unknown_tier_rejected() -> TestResult {
    let dir = setup()?;
    let result = drillmaster(&[
        "generate",
        "--cards",
        &path_arg(&dir.path().join("cards.json")),
        "--tier",
        "9",
        "--output",
        &path_arg(&dir.path().join("out")),
    ])?;
    assert!(!result.status.success());
    let stderr = String::from_utf8(result.stderr)?;
    assert!(stderr.contains("tier 9 is not configured"));
    Ok(())
}

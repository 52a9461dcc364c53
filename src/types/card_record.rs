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
use serde::Deserializer;
use serde::Serialize;

/// The direction a card drills.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    /// Spanish prompt, English answer.
    #[serde(alias = "trans-es-en")]
    Recognition,
    /// English prompt, Spanish answer.
    #[serde(alias = "trans-en-es")]
    Production,
    /// Cloze-marked Spanish text.
    Cloze,
}

/// One flashcard as produced by the corpus layer. Immutable once it reaches
/// the engine.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardRecord {
    #[serde(rename = "type")]
    pub kind: CardKind,
    pub front: String,
    pub back: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<String>,
    pub tier: u32,
    pub tense: String,
    pub subject: String,
    #[serde(default)]
    pub verb: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_file: Option<String>,
}

#[cfg(test)]
impl CardRecord {
    pub fn new(
        kind: CardKind,
        front: impl Into<String>,
        back: impl Into<String>,
        tier: u32,
        tense: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            front: front.into(),
            back: back.into(),
            tags: Vec::new(),
            tier,
            tense: tense.into(),
            subject: subject.into(),
            verb: String::new(),
            region: None,
            audio_file: None,
        }
    }

    pub fn with_verb(mut self, verb: impl Into<String>) -> Self {
        self.verb = verb.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_audio(mut self, audio_file: impl Into<String>) -> Self {
        self.audio_file = Some(audio_file.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// Tags arrive either as a list or in the legacy `;`-joined form.
fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTags {
        List(Vec<String>),
        Joined(String),
    }

    let tags = match RawTags::deserialize(deserializer)? {
        RawTags::List(list) => list,
        RawTags::Joined(joined) => joined.split(';').map(str::to_string).collect(),
    };
    Ok(tags
        .into_iter()
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect())
}

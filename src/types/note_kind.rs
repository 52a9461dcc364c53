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

use crate::types::card_record::CardKind;

/// The two note types a package carries.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NoteKind {
    /// Front/Back.
    Basic,
    /// Text/Extra.
    Cloze,
}

impl NoteKind {
    pub fn for_card(kind: CardKind) -> Self {
        match kind {
            CardKind::Recognition | CardKind::Production => NoteKind::Basic,
            CardKind::Cloze => NoteKind::Cloze,
        }
    }

    /// The model `type` value Anki expects: 0 for standard, 1 for cloze.
    pub fn model_type(self) -> u8 {
        match self {
            NoteKind::Basic => 0,
            NoteKind::Cloze => 1,
        }
    }
}

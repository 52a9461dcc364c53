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

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::check::check_cards;
use crate::cmd::generate::GenerateOptions;
use crate::cmd::generate::generate_packages;
use crate::error::Fallible;

#[derive(Parser)]
#[command(version, about, long_about = None)]
enum Command {
    /// Build Anki packages from a card file.
    Generate {
        /// Path to the JSON card file.
        #[arg(long)]
        cards: PathBuf,
        /// Tiers to build: `1`, `1,3,5`, `1-3`, `all` for the complete
        /// package, or a combination like `1-5,all`. Defaults to every
        /// tier as a separate package.
        #[arg(long)]
        tier: Option<String>,
        /// Directory the packages are written to.
        #[arg(long, default_value = "output")]
        output: PathBuf,
        /// Optional path to a TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Directory holding the audio files. Defaults to the directory of
        /// the card file.
        #[arg(long)]
        media_dir: Option<PathBuf>,
        /// Drop duplicate cards instead of failing.
        #[arg(long)]
        dedupe: bool,
    },
    /// Check a card file without writing anything.
    Check {
        /// Path to the JSON card file.
        #[arg(long)]
        cards: PathBuf,
        /// Optional path to a TOML configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

pub fn entrypoint() -> Fallible<()> {
    let cli: Command = Command::parse();
    match cli {
        Command::Generate {
            cards,
            tier,
            output,
            config,
            media_dir,
            dedupe,
        } => generate_packages(GenerateOptions {
            cards,
            tier,
            output,
            config,
            media_dir,
            dedupe,
        }),
        Command::Check { cards, config } => check_cards(&cards, config.as_deref()),
    }
}

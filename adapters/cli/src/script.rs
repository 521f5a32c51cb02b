use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use siege_core::{Intent, PlayerId};
use siege_sync::ClientMessage;

/// Client message scheduled for a given tick of a headless run.
#[derive(Debug, Deserialize)]
struct ScriptedMessage {
    tick: u64,
    #[serde(default = "default_player")]
    player: u32,
    #[serde(flatten)]
    message: ClientMessage,
}

fn default_player() -> u32 {
    1
}

/// Intent due at a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ScriptedIntent {
    pub(crate) tick: u64,
    pub(crate) player: PlayerId,
    pub(crate) sequence: u64,
    pub(crate) intent: Intent,
}

/// Intents of a headless run, ordered by tick then file order.
#[derive(Debug, Default)]
pub(crate) struct Script {
    intents: Vec<ScriptedIntent>,
    cursor: usize,
}

impl Script {
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read script {}", path.display()))?;
        Self::parse(&json).with_context(|| format!("invalid script {}", path.display()))
    }

    pub(crate) fn parse(json: &str) -> Result<Self> {
        let messages: Vec<ScriptedMessage> = serde_json::from_str(json)?;
        let mut intents = Vec::with_capacity(messages.len());
        for (index, scripted) in messages.into_iter().enumerate() {
            let Some((sequence, intent)) = scripted.message.intent() else {
                bail!("entry {index} is not a game action");
            };
            intents.push(ScriptedIntent {
                tick: scripted.tick,
                player: PlayerId::new(scripted.player),
                sequence,
                intent,
            });
        }
        intents.sort_by_key(|scripted| scripted.tick);
        Ok(Self { intents, cursor: 0 })
    }

    /// Intents scheduled for `tick` that have not been taken yet.
    pub(crate) fn due(&mut self, tick: u64) -> &[ScriptedIntent] {
        let start = self.cursor;
        while self
            .intents
            .get(self.cursor)
            .is_some_and(|scripted| scripted.tick <= tick)
        {
            self.cursor += 1;
        }
        &self.intents[start..self.cursor]
    }
}

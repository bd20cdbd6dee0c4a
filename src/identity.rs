//! Manual identity resolutions: a cross-run cache of "this tournament entry is
//! roster player N" answers, plus the prompt that produces new ones.

use crate::error::Result;
use crate::tournaments::TournamentEntry;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Persisted map from `"<CR_id>.<startRank>"` to resolved `Id_No`. Losing it
/// only costs repeated prompts, so a missing or corrupt file degrades to an
/// empty cache instead of failing the run. The user is expected to delete the
/// file when the tournament source data changes.
#[derive(Debug)]
pub struct IdentityCache {
    path: PathBuf,
    entries: HashMap<String, u32>,
}

impl IdentityCache {
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(entries) => entries,
                Err(e) => {
                    eprintln!(
                        "Ignoring unreadable identity cache {}: {e}",
                        path.display()
                    );
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { path, entries }
    }

    pub fn key(tournament: &TournamentEntry, start_rank: u32) -> String {
        format!("{}.{start_rank}", tournament.cr_id)
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.entries.get(key).copied()
    }

    pub fn insert(&mut self, key: String, id: u32) {
        self.entries.insert(key, id);
    }

    /// Flushes to disk, merging with whatever another run may have written
    /// since we loaded; our entries win on conflict.
    pub fn save(&self) -> Result<()> {
        let mut merged: HashMap<String, u32> = std::fs::read_to_string(&self.path)
            .ok()
            .and_then(|text| serde_json::from_str(&text).ok())
            .unwrap_or_default();
        merged.extend(self.entries.iter().map(|(k, v)| (k.clone(), *v)));
        let file = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(file, &merged)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Resolves a participant that neither the results page nor the cache could
/// identify. The only suspension point of a run.
pub trait IdentityResolver {
    /// `Ok(None)` means the human declined or could not identify the player.
    fn resolve(
        &mut self,
        tournament: &TournamentEntry,
        name: &str,
        start_rank: u32,
    ) -> Result<Option<u32>>;
}

/// Interactive stdin prompt, as used when replaying a real federation cycle.
#[derive(Debug, Default)]
pub struct ConsoleResolver;

impl IdentityResolver for ConsoleResolver {
    fn resolve(
        &mut self,
        tournament: &TournamentEntry,
        name: &str,
        start_rank: u32,
    ) -> Result<Option<u32>> {
        println!();
        println!(
            "\tPlayer with unknown ID in tournament {} ({}): {name} (starting rank {start_rank})",
            tournament.seq, tournament.name
        );
        print!("\tPlease enter this player's ID (blank to give up): ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        Ok(answer.trim().parse().ok())
    }
}

/// Canned answers keyed by participant name; for tests and scripted reruns.
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    answers: HashMap<String, u32>,
}

impl ScriptedResolver {
    pub fn new(answers: HashMap<String, u32>) -> Self {
        Self { answers }
    }
}

impl IdentityResolver for ScriptedResolver {
    fn resolve(
        &mut self,
        _tournament: &TournamentEntry,
        name: &str,
        _start_rank: u32,
    ) -> Result<Option<u32>> {
        Ok(self.answers.get(name).copied())
    }
}

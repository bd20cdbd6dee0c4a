//! The resumable tournament batch: fetch, resolve, compute, persist, advance.

use crate::audit::AuditRecorder;
use crate::constants::{audit_file, snapshot_file};
use crate::engine::{self, GameResult};
use crate::error::{RatingError, Result};
use crate::fetch::{RawParticipant, ResultsFetcher, TournamentGames};
use crate::identity::{IdentityCache, IdentityResolver};
use crate::policy::RatingPolicy;
use crate::roster::{PlayerRecord, Roster};
use crate::tournaments::TournamentEntry;
use chrono::Local;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub struct BatchRunner<F, R> {
    tournaments: Vec<TournamentEntry>,
    fetcher: F,
    resolver: R,
    cache: IdentityCache,
    policy: RatingPolicy,
    players_list: PathBuf,
    out_dir: PathBuf,
}

impl<F: ResultsFetcher, R: IdentityResolver> BatchRunner<F, R> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tournaments: Vec<TournamentEntry>,
        fetcher: F,
        resolver: R,
        cache: IdentityCache,
        policy: RatingPolicy,
        players_list: PathBuf,
        out_dir: PathBuf,
    ) -> Self {
        Self {
            tournaments,
            fetcher,
            resolver,
            cache,
            policy,
            players_list,
            out_dir,
        }
    }

    /// Processes the tournaments whose `#` falls in `[first, first + count)`,
    /// strictly in order. Each tournament starts from the roster produced by
    /// the previous one; the starting roster is the initial players list for
    /// `first == 1`, otherwise the snapshot written after `first - 1`.
    pub fn run(&mut self, first: u32, count: u32) -> Result<()> {
        let selected: Vec<TournamentEntry> = self
            .tournaments
            .iter()
            .filter(|t| t.seq >= first && t.seq < first.saturating_add(count))
            .cloned()
            .collect();
        if selected.is_empty() {
            return Err(RatingError::validation(format!(
                "no tournaments numbered in [{first}, {})",
                first.saturating_add(count)
            )));
        }

        let mut roster = self.load_starting_roster(first)?;
        for tournament in selected {
            roster = self.run_tournament(&tournament, roster)?;
        }
        Ok(())
    }

    fn load_starting_roster(&self, first: u32) -> Result<Roster> {
        let path = if first <= 1 {
            self.players_list.clone()
        } else {
            let snapshot = self.out_dir.join(snapshot_file(first - 1));
            if !snapshot.exists() {
                return Err(RatingError::validation(format!(
                    "cannot resume at tournament {first}: {} not found",
                    snapshot.display()
                )));
            }
            snapshot
        };
        println!("Reading from {}", path.display());
        Roster::load(&path)
    }

    /// One full pass of the per-tournament state machine. Nothing is renamed
    /// into place until both output files are complete, so any failure leaves
    /// the previous snapshot as the valid resumption point.
    fn run_tournament(&mut self, tournament: &TournamentEntry, roster: Roster) -> Result<Roster> {
        println!(
            "[{}] Running tournament {} ({})...",
            Local::now().format("%F %T"),
            tournament.seq,
            tournament.name
        );

        let games = self.fetcher.fetch(tournament)?;
        let ids_by_rank = self.resolve(tournament, &games, &roster)?;
        let (updates, recorder) = self.compute(tournament, &games, &roster, &ids_by_rank)?;
        let new_roster = roster.apply_batch(updates, &self.policy)?;

        let snapshot_path = self.out_dir.join(snapshot_file(tournament.seq));
        // Audit first: a visible snapshot implies its audit trail exists.
        recorder.save_atomic(&self.out_dir.join(audit_file(tournament.seq)))?;
        new_roster.save_atomic(&snapshot_path)?;
        println!("Writing to {}", snapshot_path.display());
        Ok(new_roster)
    }

    /// Matches every participant to a roster id: the results page id when it
    /// has one, else the cache, else the resolver (whose answer is flushed to
    /// the cache immediately). No implicit player creation: an id unknown to
    /// the roster is as unresolved as no id at all.
    fn resolve(
        &mut self,
        tournament: &TournamentEntry,
        games: &TournamentGames,
        roster: &Roster,
    ) -> Result<BTreeMap<u32, u32>> {
        let mut ids_by_rank = BTreeMap::new();
        for participant in &games.participants {
            let id = match participant.id_no {
                Some(id) => id,
                None => {
                    let key = IdentityCache::key(tournament, participant.start_rank);
                    match self.cache.get(&key) {
                        Some(id) => id,
                        None => {
                            let answer = self.resolver.resolve(
                                tournament,
                                &participant.name,
                                participant.start_rank,
                            )?;
                            match answer {
                                Some(id) => {
                                    self.cache.insert(key, id);
                                    self.cache.save()?;
                                    id
                                }
                                None => {
                                    return Err(RatingError::UnresolvedPlayer {
                                        tournament: tournament.seq,
                                        name: participant.name.clone(),
                                        start_rank: participant.start_rank,
                                    })
                                }
                            }
                        }
                    }
                }
            };
            if !roster.contains(id) {
                return Err(RatingError::UnresolvedPlayer {
                    tournament: tournament.seq,
                    name: format!("{} (id {id} not in rating list)", participant.name),
                    start_rank: participant.start_rank,
                });
            }
            ids_by_rank.insert(participant.start_rank, id);
        }
        Ok(ids_by_rank)
    }

    /// Runs the engine per participant in ascending `Id_No` order, always
    /// against the pre-tournament roster.
    fn compute(
        &self,
        tournament: &TournamentEntry,
        games: &TournamentGames,
        roster: &Roster,
        ids_by_rank: &BTreeMap<u32, u32>,
    ) -> Result<(BTreeMap<u32, PlayerRecord>, AuditRecorder)> {
        let mut participants: Vec<&RawParticipant> = games.participants.iter().collect();
        participants.sort_by_key(|p| ids_by_rank[&p.start_rank]);

        let mut updates = BTreeMap::new();
        let mut recorder = AuditRecorder::new();
        for participant in participants {
            let id = ids_by_rank[&participant.start_rank];
            let prior = roster.get(id).ok_or_else(|| {
                RatingError::validation(format!("player {id} vanished from roster"))
            })?;
            let game_results = participant
                .games
                .iter()
                .map(|game| {
                    let opponent_id =
                        ids_by_rank.get(&game.opponent_rank).ok_or_else(|| {
                            RatingError::fetch(
                                tournament.seq,
                                format!(
                                    "opponent with starting rank {} has no rated games of their own",
                                    game.opponent_rank
                                ),
                            )
                        })?;
                    let opponent = roster.get(*opponent_id).ok_or_else(|| {
                        RatingError::validation(format!(
                            "player {opponent_id} vanished from roster"
                        ))
                    })?;
                    Ok(GameResult {
                        opponent_rating: opponent.rating,
                        score: game.score,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let (updated, audit) =
                engine::update(prior, &game_results, tournament.flags(), &self.policy, tournament.seq)?;
            if updates.insert(id, updated).is_some() {
                return Err(RatingError::validation(format!(
                    "player {id} appears twice in tournament {}",
                    tournament.seq
                )));
            }
            recorder.record(audit);
        }
        Ok((updates, recorder))
    }
}

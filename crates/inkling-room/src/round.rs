//! Pure round rules: selection, completion and scoring.
//!
//! Nothing here touches the store or the clock, so the rules can be
//! tested exhaustively on plain values.

use std::collections::HashSet;

use inkling_protocol::{PlayerId, RoundResult, Tally, Winner};
use inkling_store::{ParticipantRecord, PlayerRecord, PromptPair, VoteRecord};
use rand::Rng;

/// Picks one prompt pair uniformly at random.
pub fn pick_prompt<'a, R: Rng + ?Sized>(
    rng: &mut R,
    prompts: &'a [PromptPair],
) -> Option<&'a PromptPair> {
    if prompts.is_empty() {
        return None;
    }
    prompts.get(rng.random_range(0..prompts.len()))
}

/// Picks the imposter uniformly among `players`.
pub fn pick_imposter<R: Rng + ?Sized>(rng: &mut R, players: &[PlayerRecord]) -> Option<PlayerId> {
    if players.is_empty() {
        return None;
    }
    players.get(rng.random_range(0..players.len())).map(|p| p.id)
}

/// Ids of the participants still taking part, in id order.
pub fn active_ids(participants: &[ParticipantRecord]) -> Vec<PlayerId> {
    participants
        .iter()
        .filter(|p| p.active)
        .map(|p| p.player_id)
        .collect()
}

/// `true` once every active participant is in `finished`.
///
/// A round with no active participants is never complete; it ends through
/// the "all players left" path instead.
pub fn everyone_finished(participants: &[ParticipantRecord], finished: &HashSet<PlayerId>) -> bool {
    let mut active = participants.iter().filter(|p| p.active).peekable();
    active.peek().is_some() && active.all(|p| finished.contains(&p.player_id))
}

/// Vote counts per accused player.
pub fn tally(votes: &[VoteRecord]) -> Tally {
    let mut tally = Tally::new();
    for vote in votes {
        *tally.entry(vote.target_id).or_insert(0) += 1;
    }
    tally
}

/// The player with the most votes. Ties go to the lowest id.
pub fn voted_out(tally: &Tally) -> Option<PlayerId> {
    let mut best: Option<(PlayerId, u32)> = None;
    // Ascending id order; strict `>` keeps the first of equal counts.
    for (&id, &count) in tally {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((id, count));
        }
    }
    best.map(|(id, _)| id)
}

/// Scores a round. Nobody voted out means the imposter wins.
pub fn verdict(imposter_id: PlayerId, votes: &[VoteRecord]) -> RoundResult {
    let tally = tally(votes);
    let voted_out_id = voted_out(&tally);
    let winner = if voted_out_id == Some(imposter_id) {
        Winner::Artists
    } else {
        Winner::Imposter
    };
    RoundResult {
        imposter_id,
        voted_out_id,
        winner,
        tally,
    }
}

/// Trims `raw` and cuts it to `max_len` characters. A missing or blank
/// name becomes `Player<n>`.
pub fn display_name<R: Rng + ?Sized>(rng: &mut R, raw: Option<&str>, max_len: usize) -> String {
    let trimmed = raw.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return format!("Player{}", rng.random_range(0..1000));
    }
    trimmed.chars().take(max_len).collect()
}

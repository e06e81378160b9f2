//! Standings ranking and winner identification.

use crate::domain::{StandingsEntry, UserPointTotal};

/// Rank aggregated point totals into a leaderboard.
///
/// Ordering is points descending, username ascending (byte-wise) on equal
/// points, so two runs over the same data always produce the same list.
/// Ranks follow the standard competition ("1224") scheme: a tied entry
/// inherits the rank of the entry above it, and the next distinct points
/// value takes its positional rank, skipping over the tied group.
pub fn rank_standings(mut totals: Vec<UserPointTotal>) -> Vec<StandingsEntry> {
    totals.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| a.username.cmp(&b.username))
    });

    let mut entries: Vec<StandingsEntry> = Vec::with_capacity(totals.len());
    for (idx, total) in totals.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(prev) if prev.points == total.points => prev.rank,
            _ => idx as i64 + 1,
        };

        entries.push(StandingsEntry {
            user_id: total.user_id,
            username: total.username,
            points: total.points,
            rank,
            is_tied: false,
        });
    }

    // A tie can be with either neighbor, so flags are set once ranks exist.
    let len = entries.len();
    for idx in 0..len {
        let tied_above = idx > 0 && entries[idx - 1].points == entries[idx].points;
        let tied_below = idx + 1 < len && entries[idx + 1].points == entries[idx].points;
        entries[idx].is_tied = tied_above || tied_below;
    }

    entries
}

/// All entries holding rank 1.
///
/// `requested` is advisory only: a tied leading group is always returned
/// whole, even when it is larger than the requested winner count.
pub fn top_ranked(entries: &[StandingsEntry], requested: usize) -> Vec<StandingsEntry> {
    let winners: Vec<StandingsEntry> = entries.iter().filter(|e| e.rank == 1).cloned().collect();

    if requested != 0 && winners.len() > requested {
        tracing::debug!(
            requested,
            tied = winners.len(),
            "tied leading group exceeds requested winner count; returning the full group"
        );
    }

    winners
}

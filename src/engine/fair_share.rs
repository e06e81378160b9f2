//! Fair-share computation for retroactive backfills.

use crate::domain::FixtureId;

/// Points assigned to one fixture of a backfilled round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixturePoints {
    pub fixture_id: FixtureId,
    pub points: i64,
}

/// The computed backfill plan for one round.
///
/// `points_awarded` is the sum actually distributed across fixtures. It
/// equals `minimum_participant_score` whenever the round's fixtures can
/// carry it at one point per fixture; a shortfall means the round's scoring
/// data awarded more than one point per fixture and the plan must not be
/// applied as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FairShare {
    pub minimum_participant_score: i64,
    pub participant_count: usize,
    pub points_awarded: i64,
    pub fixture_points: Vec<FixturePoints>,
}

impl FairShare {
    /// True when the distribution reached the target minimum exactly.
    pub fn is_exact(&self) -> bool {
        self.points_awarded == self.minimum_participant_score
    }
}

/// Compute the backfill share for a round.
///
/// The target is the worst existing participant's total (0 with no
/// participants): a late joiner must gain nothing by joining late and lose
/// nothing against the weakest player who was there. Distribution walks the
/// fixtures in ascending id order assigning one point each until the target
/// is met, zero thereafter, mirroring the one-point-per-fixture granularity
/// of normal scoring.
pub fn fair_share(participant_totals: &[i64], fixtures: &[FixtureId]) -> FairShare {
    let minimum = participant_totals.iter().copied().min().unwrap_or(0);

    let mut ordered: Vec<FixtureId> = fixtures.to_vec();
    ordered.sort_unstable();

    let mut remaining = minimum;
    let fixture_points: Vec<FixturePoints> = ordered
        .into_iter()
        .map(|fixture_id| {
            let points = if remaining > 0 { 1 } else { 0 };
            remaining -= points;
            FixturePoints { fixture_id, points }
        })
        .collect();

    FairShare {
        minimum_participant_score: minimum,
        participant_count: participant_totals.len(),
        points_awarded: fixture_points.iter().map(|fp| fp.points).sum(),
        fixture_points,
    }
}

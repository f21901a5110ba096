//! Match decision policy.
//!
//! Given a scored, descending candidate list the decider either accepts a
//! single winner or explains why it could not. Pure logic, no IO: the
//! matcher scores, the decider judges.

use tracing::debug;

use super::movies::{Movie, MovieMatchCandidate, NonMatchReason};

pub const DEFAULT_MATCH_THRESHOLD: i32 = 90;

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched {
        movie: Movie,
        /// The candidates that cleared the threshold, winner included.
        potential_matches: Vec<MovieMatchCandidate>,
    },
    Unmatched {
        /// Every candidate that was considered, for later manual review.
        potential_matches: Vec<MovieMatchCandidate>,
        reason: NonMatchReason,
    },
}

#[derive(Debug, Clone)]
pub struct MatchDecider {
    threshold: i32,
}

impl MatchDecider {
    pub fn new(threshold: i32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i32 {
        self.threshold
    }

    /// Accept the top candidate iff it clears the threshold and no other
    /// candidate ties its score. Assumes `candidates` is sorted descending
    /// by score, as the matcher produces it.
    pub fn try_match(&self, candidates: Vec<MovieMatchCandidate>) -> MatchOutcome {
        let acceptable: Vec<&MovieMatchCandidate> = candidates
            .iter()
            .filter(|c| c.score >= self.threshold)
            .collect();

        let Some(best) = acceptable.first() else {
            debug!(
                threshold = self.threshold,
                candidates = candidates.len(),
                "no candidate reached the acceptance threshold"
            );
            return MatchOutcome::Unmatched {
                potential_matches: candidates,
                reason: NonMatchReason::LowThreshold,
            };
        };

        let tied_at_top = candidates
            .iter()
            .filter(|c| c.score == best.score)
            .count();
        if tied_at_top != 1 {
            debug!(
                score = best.score,
                tied = tied_at_top,
                "multiple candidates tied at the top score"
            );
            return MatchOutcome::Unmatched {
                potential_matches: candidates,
                reason: NonMatchReason::MultipleCandidates,
            };
        }

        let movie = best.to_movie();
        let potential_matches: Vec<MovieMatchCandidate> =
            acceptable.into_iter().cloned().collect();
        MatchOutcome::Matched {
            movie,
            potential_matches,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn candidate(title: &str, score: i32) -> MovieMatchCandidate {
        MovieMatchCandidate {
            title: title.into(),
            score,
            external_id: format!("id-{title}-{score}"),
            source: "tmdb".into(),
            ..Default::default()
        }
    }

    #[test]
    fn all_below_threshold_is_low_threshold() {
        let decider = MatchDecider::new(DEFAULT_MATCH_THRESHOLD);
        let candidates = vec![
            candidate("a", 45),
            candidate("b", 28),
            candidate("c", 10),
        ];
        let outcome = decider.try_match(candidates.clone());
        assert_matches!(
            outcome,
            MatchOutcome::Unmatched {
                reason: NonMatchReason::LowThreshold,
                ref potential_matches,
            } if *potential_matches == candidates
        );
    }

    #[test]
    fn tie_at_top_is_multiple_candidates() {
        let decider = MatchDecider::new(DEFAULT_MATCH_THRESHOLD);
        let candidates = vec![
            candidate("a", 92),
            candidate("b", 92),
            candidate("c", 81),
            candidate("d", 80),
        ];
        let outcome = decider.try_match(candidates.clone());
        assert_matches!(
            outcome,
            MatchOutcome::Unmatched {
                reason: NonMatchReason::MultipleCandidates,
                ref potential_matches,
            } if *potential_matches == candidates
        );
    }

    #[test]
    fn clear_winner_is_matched() {
        let decider = MatchDecider::new(DEFAULT_MATCH_THRESHOLD);
        let outcome = decider.try_match(vec![
            candidate("winner", 92),
            candidate("runner-up", 90),
            candidate("c", 81),
        ]);
        match outcome {
            MatchOutcome::Matched {
                movie,
                potential_matches,
            } => {
                assert_eq!(movie.title, "winner");
                // Only candidates over the threshold are retained.
                assert_eq!(potential_matches.len(), 2);
                assert_eq!(potential_matches[0].title, "winner");
                assert_eq!(potential_matches[1].title, "runner-up");
            }
            other => panic!("expected a match, got {other:?}"),
        }
    }

    #[test]
    fn empty_candidates_is_low_threshold() {
        let decider = MatchDecider::new(DEFAULT_MATCH_THRESHOLD);
        assert_matches!(
            decider.try_match(vec![]),
            MatchOutcome::Unmatched {
                reason: NonMatchReason::LowThreshold,
                ref potential_matches,
            } if potential_matches.is_empty()
        );
    }
}

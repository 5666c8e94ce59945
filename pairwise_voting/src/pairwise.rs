use log::debug;

use crate::{CandidateId, PairwiseStats, VoteCount, VoteInternal};

/// A pair (winner, loser) that a majority of the weighted ballots agrees with.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub(crate) struct StrongPair {
    pub(crate) winner: CandidateId,
    pub(crate) loser: CandidateId,
    pub(crate) strength: VoteCount,
}

/// The pairwise preferences between all the candidates.
///
/// Stored as a dense matrix: `wins[a * n + b]` is the count of ballots that
/// strictly prefer `a` to `b`.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct PairwiseModel {
    num_candidates: usize,
    wins: Vec<VoteCount>,
}

impl PairwiseModel {
    pub(crate) fn compute_margins(votes: &[VoteInternal], num_candidates: usize) -> PairwiseModel {
        let mut wins = vec![VoteCount::EMPTY; num_candidates * num_candidates];
        for v in votes.iter() {
            for a in 0..num_candidates {
                for b in 0..num_candidates {
                    if v.ranks[a] < v.ranks[b] {
                        wins[a * num_candidates + b] += v.count;
                    }
                }
            }
        }
        PairwiseModel {
            num_candidates,
            wins,
        }
    }

    pub(crate) fn num_candidates(&self) -> usize {
        self.num_candidates
    }

    pub(crate) fn margin(&self, a: CandidateId, b: CandidateId) -> VoteCount {
        self.wins[a.index() * self.num_candidates + b.index()]
    }

    fn candidate_ids(&self) -> impl Iterator<Item = CandidateId> {
        (0..self.num_candidates as u32).map(CandidateId)
    }

    /// All the strong pairs, ordered by (winner, loser).
    pub(crate) fn strong_pairs(&self) -> Vec<StrongPair> {
        let mut res: Vec<StrongPair> = Vec::new();
        for a in self.candidate_ids() {
            for b in self.candidate_ids() {
                let (ab, ba) = (self.margin(a, b), self.margin(b, a));
                if ab > ba {
                    res.push(StrongPair {
                        winner: a,
                        loser: b,
                        strength: VoteCount(ab.0 - ba.0),
                    });
                }
            }
        }
        res
    }

    /// The candidate that wins all its pairwise comparisons, if any.
    ///
    /// With a single candidate, this candidate is trivially the winner.
    pub(crate) fn detect_condorcet_winner(&self) -> Option<CandidateId> {
        let winner = self.candidate_ids().find(|&c| {
            self.candidate_ids()
                .filter(|&x| x != c)
                .all(|x| self.margin(c, x) > self.margin(x, c))
        });
        debug!("detect_condorcet_winner: {:?}", winner);
        winner
    }

    pub(crate) fn stats(&self, candidates: &[String]) -> PairwiseStats {
        let name = |cid: CandidateId| candidates[cid.index()].clone();
        let mut pairs: Vec<((String, String), u64)> = Vec::new();
        for a in self.candidate_ids() {
            for b in self.candidate_ids().filter(|&b| b != a) {
                pairs.push(((name(a), name(b)), self.margin(a, b).0));
            }
        }
        let strong_pairs = self
            .strong_pairs()
            .iter()
            .map(|sp| ((name(sp.winner), name(sp.loser)), sp.strength.0))
            .collect();
        PairwiseStats {
            candidates: candidates.to_vec(),
            pairs,
            strong_pairs,
            condorcet_winner: self.detect_condorcet_winner().map(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vote(ranks: &[u32], count: u64) -> VoteInternal {
        VoteInternal {
            ranks: ranks.to_vec(),
            count: VoteCount(count),
        }
    }

    // 3 A>B>C, 2 B>C>A, 2 C>A>B
    fn cyclic_votes() -> Vec<VoteInternal> {
        vec![
            vote(&[1, 2, 3], 3),
            vote(&[3, 1, 2], 2),
            vote(&[2, 3, 1], 2),
        ]
    }

    #[test]
    fn margins_count_strict_preferences_only() {
        let votes = vec![vote(&[1, 1, 2], 4), vote(&[2, 1, 1], 1)];
        let pm = PairwiseModel::compute_margins(&votes, 3);
        assert_eq!(pm.margin(CandidateId(0), CandidateId(1)), VoteCount(0));
        assert_eq!(pm.margin(CandidateId(1), CandidateId(0)), VoteCount(1));
        assert_eq!(pm.margin(CandidateId(0), CandidateId(2)), VoteCount(4));
        assert_eq!(pm.margin(CandidateId(2), CandidateId(0)), VoteCount(1));
        assert_eq!(pm.margin(CandidateId(1), CandidateId(2)), VoteCount(4));
    }

    #[test]
    fn strong_pairs_in_cycle() {
        let pm = PairwiseModel::compute_margins(&cyclic_votes(), 3);
        let sp = pm.strong_pairs();
        assert_eq!(
            sp,
            vec![
                StrongPair {
                    winner: CandidateId(0),
                    loser: CandidateId(1),
                    strength: VoteCount(3)
                },
                StrongPair {
                    winner: CandidateId(1),
                    loser: CandidateId(2),
                    strength: VoteCount(3)
                },
                StrongPair {
                    winner: CandidateId(2),
                    loser: CandidateId(0),
                    strength: VoteCount(1)
                },
            ]
        );
        assert_eq!(pm.detect_condorcet_winner(), None);
    }

    #[test]
    fn condorcet_winner_found() {
        let votes = vec![vote(&[2, 1, 3], 3), vote(&[1, 2, 3], 2)];
        let pm = PairwiseModel::compute_margins(&votes, 3);
        assert_eq!(pm.detect_condorcet_winner(), Some(CandidateId(1)));
    }

    #[test]
    fn exact_tie_has_no_condorcet_winner() {
        let votes = vec![vote(&[1, 2], 1), vote(&[2, 1], 1)];
        let pm = PairwiseModel::compute_margins(&votes, 2);
        assert!(pm.strong_pairs().is_empty());
        assert_eq!(pm.detect_condorcet_winner(), None);
    }

    #[test]
    fn single_candidate_is_condorcet_winner() {
        let pm = PairwiseModel::compute_margins(&[vote(&[1], 1)], 1);
        assert_eq!(pm.detect_condorcet_winner(), Some(CandidateId(0)));
    }

    #[test]
    fn stats_report_names() {
        let names: Vec<String> = vec!["A".into(), "B".into(), "C".into()];
        let stats = PairwiseModel::compute_margins(&cyclic_votes(), 3).stats(&names);
        assert_eq!(stats.pairs.len(), 6);
        assert_eq!(stats.pairs[0], (("A".to_string(), "B".to_string()), 5));
        assert_eq!(
            stats.strong_pairs[2],
            (("C".to_string(), "A".to_string()), 1)
        );
        assert_eq!(stats.condorcet_winner, None);
    }
}

use log::debug;

use std::collections::BTreeSet;

pub use crate::config::*;
use crate::{run_ranked_pairs, run_schulze_stv, MalformedBallotSnafu};

/// A builder for assembling ballots before a tabulation.
///
/// The ballots added to the builder may be partial: the candidates a voter
/// did not rank are placed together after all the ranked ones.
///
/// ```
/// pub use pairwise_voting::builder::Builder;
/// pub use pairwise_voting::TallyRules;
/// # use pairwise_voting::VotingErrors;
///
/// let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)?
///     .candidates(&["Anna".to_string(), "Bob".to_string(), "Clara".to_string()])?;
///
/// builder.add_ordered(&[vec!["Bob".to_string()]], 3)?;
/// builder.add_ordered(&[vec!["Anna".to_string(), "Clara".to_string()]], 2)?;
///
/// let result = builder.ranked_pairs()?;
/// assert_eq!(result.winners, vec!["Bob".to_string()]);
/// # Ok::<(), VotingErrors>(())
/// ```
pub struct Builder {
    rules: TallyRules,
    candidates: Option<Vec<String>>,
    ballots: Vec<Ballot>,
}

impl Builder {
    pub fn new(rules: &TallyRules) -> Result<Builder, VotingErrors> {
        Ok(Builder {
            rules: rules.clone(),
            candidates: None,
            ballots: Vec::new(),
        })
    }

    /// Declares the candidates of the election.
    ///
    /// Without this list, the candidates are all the names found in the
    /// ballots. With it, a ballot naming any other candidate is rejected.
    /// Any ballot previously added is discarded.
    pub fn candidates(self, cands: &[String]) -> Result<Builder, VotingErrors> {
        let unique: BTreeSet<String> = cands.iter().cloned().collect();
        Ok(Builder {
            rules: self.rules,
            candidates: Some(unique.into_iter().collect()),
            ballots: Vec::new(),
        })
    }

    /// Adds a ballot with the given ranks (lower is preferred).
    pub fn add_ranking(&mut self, ranking: &[(String, u32)], count: u64) -> Result<(), VotingErrors> {
        self.add_ballot(&Ballot {
            ranking: ranking.to_vec(),
            count,
        })
    }

    /// Adds a ballot given as ordered groups of candidates.
    ///
    /// The candidates of the first group are the most preferred, and the
    /// candidates inside one group are equally preferred. Empty groups are
    /// ignored.
    pub fn add_ordered(&mut self, groups: &[Vec<String>], count: u64) -> Result<(), VotingErrors> {
        let mut ranking: Vec<(String, u32)> = Vec::new();
        let mut rank = 1;
        for group in groups.iter().filter(|g| !g.is_empty()) {
            for name in group.iter() {
                ranking.push((name.clone(), rank));
            }
            rank += 1;
        }
        self.add_ranking(&ranking, count)
    }

    pub fn add_ballot(&mut self, ballot: &Ballot) -> Result<(), VotingErrors> {
        let index = self.ballots.len();
        if ballot.count == 0 {
            return MalformedBallotSnafu {
                index,
                reason: "the count must be positive",
            }
            .fail();
        }
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        for (name, _) in ballot.ranking.iter() {
            if !seen.insert(name.as_str()) {
                return MalformedBallotSnafu {
                    index,
                    reason: format!("candidate {} is ranked more than once", name),
                }
                .fail();
            }
            if let Some(cands) = self.candidates.as_deref() {
                if cands.binary_search(name).is_err() {
                    return MalformedBallotSnafu {
                        index,
                        reason: format!("{} is not a declared candidate", name),
                    }
                    .fail();
                }
            }
        }
        self.ballots.push(ballot.clone());
        Ok(())
    }

    /// The ballots added so far, completed with all the candidates.
    pub fn ballots(&self) -> Vec<Ballot> {
        let candidates = match self.candidates.as_deref() {
            Some(cands) => cands.to_vec(),
            None => obtain_candidates(&self.ballots),
        };
        complete_ballots(&self.ballots, &candidates)
    }

    pub fn ranked_pairs(&self) -> Result<RankedPairsResult, VotingErrors> {
        run_ranked_pairs(&self.ballots(), &self.rules)
    }

    pub fn schulze_stv(&self) -> Result<SchulzeStvResult, VotingErrors> {
        run_schulze_stv(&self.ballots(), &self.rules)
    }
}

/// All the names found in the ballots, sorted.
pub fn obtain_candidates(ballots: &[Ballot]) -> Vec<String> {
    let names: BTreeSet<&String> = ballots
        .iter()
        .flat_map(|b| b.ranking.iter().map(|(name, _)| name))
        .collect();
    names.into_iter().cloned().collect()
}

/// Gives a rank to every candidate on every ballot.
///
/// The candidates missing from a ballot are tied together, after the least
/// preferred candidate of this ballot.
pub fn complete_ballots(ballots: &[Ballot], candidates: &[String]) -> Vec<Ballot> {
    ballots
        .iter()
        .map(|b| {
            let max_rank = b.ranking.iter().map(|(_, r)| *r).max().unwrap_or(0);
            let (mut ranking, last) = match max_rank.checked_add(1) {
                Some(last) => (b.ranking.clone(), last),
                // No room after the last rank: renumber the ranks first.
                None => dense_ranking(&b.ranking),
            };
            let ranked: BTreeSet<&String> = b.ranking.iter().map(|(name, _)| name).collect();
            for name in candidates.iter().filter(|c| !ranked.contains(c)) {
                ranking.push((name.clone(), last));
            }
            if ranking.len() > b.ranking.len() {
                debug!(
                    "complete_ballots: {} candidates added at rank {}",
                    ranking.len() - b.ranking.len(),
                    last
                );
            }
            Ballot {
                ranking,
                count: b.count,
            }
        })
        .collect()
}

// Replaces the ranks by 1, 2, ... in the same order, and returns the rank
// following the last one.
fn dense_ranking(ranking: &[(String, u32)]) -> (Vec<(String, u32)>, u32) {
    let distinct: Vec<u32> = ranking
        .iter()
        .map(|(_, r)| *r)
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .collect();
    let dense: Vec<(String, u32)> = ranking
        .iter()
        .map(|(name, r)| {
            let pos = distinct.binary_search(r).unwrap_or_default();
            (name.clone(), pos as u32 + 1)
        })
        .collect();
    (dense, distinct.len() as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(x: &str) -> String {
        x.to_string()
    }

    #[test]
    fn missing_candidates_are_tied_last() {
        let ballots = vec![
            Ballot::new(&[("B", 1), ("A", 3)], 2),
            Ballot::new(&[("C", 1)], 1),
            Ballot::new(&[], 1),
        ];
        let cands = obtain_candidates(&ballots);
        assert_eq!(cands, vec![s("A"), s("B"), s("C")]);
        let completed = complete_ballots(&ballots, &cands);
        assert_eq!(completed[0], Ballot::new(&[("B", 1), ("A", 3), ("C", 4)], 2));
        assert_eq!(completed[1], Ballot::new(&[("C", 1), ("A", 2), ("B", 2)], 1));
        assert_eq!(
            completed[2],
            Ballot::new(&[("A", 1), ("B", 1), ("C", 1)], 1)
        );
    }

    #[test]
    fn largest_rank_is_still_before_missing_candidates() {
        let ballots = vec![
            Ballot::new(&[("A", u32::MAX), ("C", 7)], 1),
            Ballot::new(&[("B", 1)], 1),
        ];
        let completed = complete_ballots(&ballots, &obtain_candidates(&ballots));
        assert_eq!(completed[0], Ballot::new(&[("A", 2), ("C", 1), ("B", 3)], 1));
        assert_eq!(completed[1], Ballot::new(&[("B", 1), ("A", 2), ("C", 2)], 1));

        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES).unwrap();
        builder.add_ranking(&[(s("A"), u32::MAX)], 3).unwrap();
        builder.add_ranking(&[(s("B"), 1), (s("A"), 2)], 1).unwrap();
        assert_eq!(builder.ranked_pairs().unwrap().winners, vec![s("A")]);
    }

    #[test]
    fn ordered_groups() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES).unwrap();
        builder
            .add_ordered(&[vec![s("B"), s("C")], vec![], vec![s("A")]], 4)
            .unwrap();
        assert_eq!(
            builder.ballots(),
            vec![Ballot::new(&[("B", 1), ("C", 1), ("A", 2)], 4)]
        );
    }

    #[test]
    fn declared_candidates() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES)
            .unwrap()
            .candidates(&[s("B"), s("A"), s("B")])
            .unwrap();
        builder.add_ranking(&[(s("A"), 1)], 1).unwrap();
        assert!(matches!(
            builder.add_ranking(&[(s("Zed"), 1)], 1),
            Err(VotingErrors::MalformedBallot { index: 1, .. })
        ));
        assert_eq!(builder.ballots(), vec![Ballot::new(&[("A", 1), ("B", 2)], 1)]);
    }

    #[test]
    fn rejects_bad_ballots() {
        let mut builder = Builder::new(&TallyRules::DEFAULT_RULES).unwrap();
        assert!(matches!(
            builder.add_ranking(&[(s("A"), 1)], 0),
            Err(VotingErrors::MalformedBallot { index: 0, .. })
        ));
        assert!(matches!(
            builder.add_ranking(&[(s("A"), 1), (s("A"), 2)], 1),
            Err(VotingErrors::MalformedBallot { index: 0, .. })
        ));
    }

    #[test]
    fn runs_schulze_stv() {
        let rules = TallyRules {
            number_of_winners: 2,
            ..TallyRules::DEFAULT_RULES
        };
        let mut builder = Builder::new(&rules).unwrap();
        builder
            .add_ordered(&[vec![s("A")], vec![s("B")], vec![s("C")]], 60)
            .unwrap();
        builder
            .add_ordered(&[vec![s("C")], vec![s("B")]], 40)
            .unwrap();
        let res = builder.schulze_stv().unwrap();
        assert_eq!(res.winners, vec![s("A"), s("C")]);
    }
}

/*!
Tabulation of ranked ballots with pairwise (Condorcet) methods.

Two methods are provided:
- [run_ranked_pairs]: the Ranked Pairs (Tideman) method for a single winner.
- [run_schulze_stv]: the Schulze STV method, a proportional method for
  multiple winners.

Both methods first look for a Condorcet winner (a candidate preferred to every
other candidate by a majority). If there is one, it is elected directly.

```
use pairwise_voting::*;

let ballots = vec![
    Ballot::new(&[("Anna", 1), ("Bob", 2), ("Clara", 3)], 3),
    Ballot::new(&[("Bob", 1), ("Clara", 2), ("Anna", 3)], 2),
    Ballot::new(&[("Clara", 1), ("Anna", 2), ("Bob", 3)], 2),
];
let result = run_ranked_pairs(&ballots, &TallyRules::DEFAULT_RULES)?;
assert_eq!(result.winners, vec!["Anna".to_string()]);
# Ok::<(), VotingErrors>(())
```

All the computations are deterministic: given the same ballots and the same
rules (including the tie-break seed), the results are identical.
*/
mod completion;
mod config;
mod pairwise;
mod ranked_pairs;
mod schulze_stv;
mod tiebreak;

pub mod builder;
pub mod graph;
pub mod manual;
pub mod max_flow;

use log::debug;

use std::{
    collections::{BTreeSet, HashMap},
    ops::{Add, AddAssign},
};

pub use crate::config::*;
pub use crate::ranked_pairs::run_ranked_pairs;
pub use crate::schulze_stv::run_schulze_stv;

// **** Private structures ****

/// Index of a candidate in the canonical order of the election.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

impl CandidateId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

// A validated ballot.
// Invariant: ranks[cid] is the rank of the candidate cid, for all the candidates.
#[derive(Eq, PartialEq, Debug, Clone)]
struct VoteInternal {
    ranks: Vec<u32>,
    count: VoteCount,
}

impl VoteInternal {
    fn rank(&self, cid: CandidateId) -> u32 {
        self.ranks[cid.index()]
    }
}

struct CheckResult {
    votes: Vec<VoteInternal>,
    // Sorted, the position is the CandidateId.
    candidates: Vec<String>,
}

impl CheckResult {
    fn names(&self, cids: &[CandidateId]) -> Vec<String> {
        cids.iter()
            .map(|cid| self.candidates[cid.index()].clone())
            .collect()
    }
}

// The candidates are all the names found in the ballots, in sorted order.
fn checks(coll: &[Ballot]) -> Result<CheckResult, VotingErrors> {
    debug!("checks: coll size: {:?}", coll.len());
    let names: BTreeSet<&str> = coll
        .iter()
        .flat_map(|b| b.ranking.iter().map(|(name, _)| name.as_str()))
        .collect();
    let candidates: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    let cids: HashMap<&str, CandidateId> = names
        .iter()
        .enumerate()
        .map(|(idx, name)| (*name, CandidateId(idx as u32)))
        .collect();

    let mut votes: Vec<VoteInternal> = Vec::with_capacity(coll.len());
    // Bounds every margin computed later.
    let mut total_count: u64 = 0;
    for (index, ballot) in coll.iter().enumerate() {
        if ballot.count == 0 {
            return MalformedBallotSnafu {
                index,
                reason: "the count must be positive",
            }
            .fail();
        }
        total_count = match total_count.checked_add(ballot.count) {
            Some(t) => t,
            None => {
                return MalformedBallotSnafu {
                    index,
                    reason: "the total count of the ballots is too large",
                }
                .fail();
            }
        };
        let mut ranks: Vec<Option<u32>> = vec![None; candidates.len()];
        for (name, rank) in ballot.ranking.iter() {
            // All the names have been collected above.
            let cid = cids[name.as_str()];
            if ranks[cid.index()].replace(*rank).is_some() {
                return MalformedBallotSnafu {
                    index,
                    reason: format!("candidate {} is ranked more than once", name),
                }
                .fail();
            }
        }
        let mut complete_ranks: Vec<u32> = Vec::with_capacity(candidates.len());
        for (idx, rank) in ranks.iter().enumerate() {
            match rank {
                Some(r) => complete_ranks.push(*r),
                None => {
                    return MalformedBallotSnafu {
                        index,
                        reason: format!(
                            "candidate {} is not ranked (the ballot must be completed first)",
                            candidates[idx]
                        ),
                    }
                    .fail();
                }
            }
        }
        votes.push(VoteInternal {
            ranks: complete_ranks,
            count: VoteCount(ballot.count),
        });
    }
    debug!(
        "checks: {:?} votes, candidates: {:?}",
        votes.len(),
        candidates
    );
    Ok(CheckResult { votes, candidates })
}

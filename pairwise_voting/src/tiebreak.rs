use log::{debug, info};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::{CandidateId, InconsistentTieBreakSnafu, TieBreakMode, VotingErrors};

/// A total order over the candidates, generated once at the start of a
/// tabulation. All the ties of that tabulation are resolved against it.
#[derive(Eq, PartialEq, Debug, Clone)]
pub(crate) struct TieBreaker {
    order: Vec<CandidateId>,
    // position[cid] is the place of cid in the order (0 is the most favoured).
    position: Vec<usize>,
    seed: Option<u64>,
}

impl TieBreaker {
    pub(crate) fn generate(num_candidates: usize, mode: TieBreakMode) -> TieBreaker {
        let mut order: Vec<CandidateId> = (0..num_candidates as u32).map(CandidateId).collect();
        let seed = match mode {
            TieBreakMode::UseCandidateOrder => None,
            TieBreakMode::Random(seed) => Some(seed),
            TieBreakMode::Unseeded => {
                let seed: u64 = rand::random();
                info!("TieBreaker: drawing tie break seed {}", seed);
                Some(seed)
            }
        };
        if let Some(s) = seed {
            let mut rng = ChaCha8Rng::seed_from_u64(s);
            order.shuffle(&mut rng);
        }
        let mut position = vec![0; num_candidates];
        for (pos, cid) in order.iter().enumerate() {
            position[cid.index()] = pos;
        }
        debug!("TieBreaker: order: {:?}", order);
        TieBreaker {
            order,
            position,
            seed,
        }
    }

    pub(crate) fn order(&self) -> &[CandidateId] {
        &self.order
    }

    pub(crate) fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn position(&self, cid: CandidateId) -> Result<usize, VotingErrors> {
        match self.position.get(cid.index()) {
            Some(pos) => Ok(*pos),
            None => InconsistentTieBreakSnafu {
                reason: format!("candidate {:?} is not part of the tie break order", cid),
            }
            .fail(),
        }
    }

    /// Picks the candidate that comes first in the order.
    pub(crate) fn break_candidate_tie(
        &self,
        tied: &[CandidateId],
    ) -> Result<CandidateId, VotingErrors> {
        self.pick(tied, |cid| Ok(vec![self.position(*cid)?]))
    }

    /// Picks the pair whose better placed member comes first, then whose other
    /// member comes first.
    pub(crate) fn break_pair_tie(
        &self,
        tied: &[(CandidateId, CandidateId)],
    ) -> Result<(CandidateId, CandidateId), VotingErrors> {
        self.pick(tied, |(a, b)| {
            let (pa, pb) = (self.position(*a)?, self.position(*b)?);
            Ok(vec![pa.min(pb), pa.max(pb)])
        })
    }

    /// Picks the set whose members, ordered by their place, come first
    /// lexicographically.
    pub(crate) fn break_subset_tie(
        &self,
        tied: &[Vec<CandidateId>],
    ) -> Result<Vec<CandidateId>, VotingErrors> {
        self.pick(tied, |subset| {
            let mut key: Vec<usize> = Vec::with_capacity(subset.len());
            for cid in subset.iter() {
                key.push(self.position(*cid)?);
            }
            key.sort_unstable();
            Ok(key)
        })
    }

    fn pick<T: Clone + std::fmt::Debug>(
        &self,
        tied: &[T],
        key: impl Fn(&T) -> Result<Vec<usize>, VotingErrors>,
    ) -> Result<T, VotingErrors> {
        let mut best: Option<(Vec<usize>, &T)> = None;
        for elt in tied.iter() {
            let k = key(elt)?;
            let better = match &best {
                Some((best_key, _)) => k < *best_key,
                None => true,
            };
            if better {
                best = Some((k, elt));
            }
        }
        match best {
            Some((_, elt)) => {
                debug!("TieBreaker: picked {:?} among {:?}", elt, tied);
                Ok(elt.clone())
            }
            None => InconsistentTieBreakSnafu {
                reason: "no option to choose from",
            }
            .fail(),
        }
    }
}

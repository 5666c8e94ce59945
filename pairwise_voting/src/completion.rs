use log::debug;

use std::collections::BTreeMap;

use crate::{CandidateId, CompletionMode, VoteInternal};

/// How a ballot compares one candidate `c` with another candidate.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub(crate) enum Preference {
    /// `c` is ranked strictly before the other candidate.
    PrefersCandidate,
    Tie,
    /// The other candidate is ranked strictly before `c`.
    PrefersOther,
}

const STRICT: [Preference; 2] = [Preference::PrefersCandidate, Preference::PrefersOther];

/// One entry per candidate in `others`, in the same order.
pub(crate) type Pattern = Vec<Preference>;

fn tie_count(pattern: &[Preference]) -> usize {
    pattern.iter().filter(|p| **p == Preference::Tie).count()
}

/// All the ways of replacing the ties of the pattern by strict preferences.
fn strict_refinements(pattern: &[Preference]) -> Vec<Pattern> {
    let mut res: Vec<Pattern> = vec![Vec::with_capacity(pattern.len())];
    for pref in pattern.iter() {
        let choices: &[Preference] = if *pref == Preference::Tie {
            &STRICT
        } else {
            std::slice::from_ref(pref)
        };
        res = res
            .iter()
            .flat_map(|prefix| {
                choices.iter().map(move |c| {
                    let mut p = prefix.clone();
                    p.push(*c);
                    p
                })
            })
            .collect();
    }
    res
}

/// The aggregated weight of the ballots for each pattern, for a fixed
/// candidate and a fixed list of other candidates.
#[derive(PartialEq, Debug, Clone)]
pub(crate) struct PatternWeights {
    arity: usize,
    weights: BTreeMap<Pattern, f64>,
}

impl PatternWeights {
    pub(crate) fn tally(
        candidate: CandidateId,
        others: &[CandidateId],
        votes: &[VoteInternal],
    ) -> PatternWeights {
        let mut weights: BTreeMap<Pattern, f64> = BTreeMap::new();
        for v in votes.iter() {
            let c_rank = v.rank(candidate);
            let pattern: Pattern = others
                .iter()
                .map(|other| {
                    let o_rank = v.rank(*other);
                    if c_rank < o_rank {
                        Preference::PrefersCandidate
                    } else if c_rank == o_rank {
                        Preference::Tie
                    } else {
                        Preference::PrefersOther
                    }
                })
                .collect();
            *weights.entry(pattern).or_insert(0.0) += v.count.0 as f64;
        }
        PatternWeights {
            arity: others.len(),
            weights,
        }
    }

    pub(crate) fn arity(&self) -> usize {
        self.arity
    }

    #[cfg(test)]
    pub(crate) fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    #[cfg(test)]
    pub(crate) fn weight(&self, pattern: &[Preference]) -> f64 {
        self.weights.get(pattern).cloned().unwrap_or(0.0)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&Pattern, f64)> {
        self.weights.iter().map(|(p, w)| (p, *w))
    }

    /// Replaces all the patterns with ties by strict patterns, starting with
    /// the patterns that have the most ties. All the strict patterns are
    /// present at the end, possibly with a zero weight.
    pub(crate) fn complete(&mut self, mode: CompletionMode) {
        while let Some(pattern) = self.most_ambiguous() {
            self.complete_pattern(&pattern, mode);
        }
        for pattern in strict_refinements(&vec![Preference::Tie; self.arity]) {
            self.weights.entry(pattern).or_insert(0.0);
        }
    }

    fn most_ambiguous(&self) -> Option<Pattern> {
        self.weights
            .keys()
            .filter(|p| tie_count(p) > 0)
            .max_by(|a, b| tie_count(a).cmp(&tie_count(b)).then_with(|| b.cmp(a)))
            .cloned()
    }

    fn complete_pattern(&mut self, pattern: &[Preference], mode: CompletionMode) {
        let weight = self.weights.remove(pattern).unwrap_or(0.0);
        // Targets and the weight that supports each of them.
        let mut targets: BTreeMap<Pattern, f64> = BTreeMap::new();
        match mode {
            CompletionMode::Refinement => {
                for target in strict_refinements(pattern) {
                    if let Some(w) = self.weights.get(&target) {
                        targets.insert(target, *w);
                    }
                }
            }
            CompletionMode::Projection => {
                for (other, w) in self.weights.iter() {
                    let informative = pattern
                        .iter()
                        .zip(other.iter())
                        .any(|(p, o)| *p == Preference::Tie && *o != Preference::Tie);
                    if informative {
                        let target: Pattern = pattern
                            .iter()
                            .zip(other.iter())
                            .map(|(p, o)| if *p == Preference::Tie { *o } else { *p })
                            .collect();
                        *targets.entry(target).or_insert(0.0) += *w;
                    }
                }
            }
        }
        let denominator: f64 = targets.values().sum();
        if denominator > 0.0 {
            for (target, support) in targets {
                *self.weights.entry(target).or_insert(0.0) += weight * support / denominator;
            }
        } else {
            // Nobody takes a side: spread evenly over the strict patterns.
            let refinements = strict_refinements(pattern);
            let share = weight / refinements.len() as f64;
            for target in refinements {
                *self.weights.entry(target).or_insert(0.0) += share;
            }
        }
        debug!(
            "complete_pattern: {:?} weight {} distributed ({:?})",
            pattern, weight, mode
        );
    }
}

/// Tallies the ballots for `candidate` against `others`, and completes the
/// indifferent patterns.
pub(crate) fn proportional_completion(
    candidate: CandidateId,
    others: &[CandidateId],
    votes: &[VoteInternal],
    mode: CompletionMode,
) -> PatternWeights {
    let mut pw = PatternWeights::tally(candidate, others, votes);
    pw.complete(mode);
    pw
}

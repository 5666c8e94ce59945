use log::{debug, info};

use crate::graph::DiGraph;
use crate::pairwise::{PairwiseModel, StrongPair};
use crate::tiebreak::TieBreaker;
use crate::*;

/// Runs the Ranked Pairs (Tideman) method on completed ballots.
///
/// The pairs are locked in from the strongest to the weakest, skipping the
/// pairs that would close a cycle. The winner is the candidate that no
/// locked pair defeats.
///
/// Only the tie-break mode is read from the rules.
pub fn run_ranked_pairs(
    coll: &[Ballot],
    rules: &TallyRules,
) -> Result<RankedPairsResult, VotingErrors> {
    info!(
        "run_ranked_pairs: processing {:?} ballots, rules: {:?}",
        coll.len(),
        rules
    );
    let cr = checks(coll)?;
    let num_candidates = cr.candidates.len();
    if num_candidates == 0 {
        return InsufficientCandidatesSnafu {}.fail();
    }
    let model = PairwiseModel::compute_margins(&cr.votes, num_candidates);
    let pairwise = model.stats(&cr.candidates);

    if let Some(cid) = model.detect_condorcet_winner() {
        info!(
            "run_ranked_pairs: Condorcet winner: {:?}",
            cr.candidates[cid.index()]
        );
        return Ok(RankedPairsResult {
            pairwise,
            winners: cr.names(&[cid]),
            rounds: Vec::new(),
            tied_winners: None,
            tie_breaker: None,
            tie_break_seed: None,
        });
    }

    let tb = TieBreaker::generate(num_candidates, rules.tiebreak_mode);
    let outcome = lock_pairs(&model, &tb)?;

    let tie_breaker_used = outcome.used_tie_breaker || outcome.tied_winners.is_some();
    let result = RankedPairsResult {
        pairwise,
        winners: cr.names(&[outcome.winner]),
        rounds: outcome
            .rounds
            .iter()
            .map(|r| PairRound {
                pair: (
                    cr.candidates[r.pair.winner.index()].clone(),
                    cr.candidates[r.pair.loser.index()].clone(),
                ),
                strength: r.pair.strength.0,
                action: r.action,
                tied_pairs: r.tied_pairs.as_ref().map(|tps| {
                    tps.iter()
                        .map(|(a, b)| {
                            (
                                cr.candidates[a.index()].clone(),
                                cr.candidates[b.index()].clone(),
                            )
                        })
                        .collect()
                }),
            })
            .collect(),
        tied_winners: outcome.tied_winners.map(|tw| cr.names(&tw)),
        tie_breaker: if tie_breaker_used {
            Some(cr.names(tb.order()))
        } else {
            None
        },
        tie_break_seed: if tie_breaker_used { tb.seed() } else { None },
    };
    info!("run_ranked_pairs: winners: {:?}", result.winners);
    Ok(result)
}

struct Round {
    pair: StrongPair,
    action: RoundAction,
    tied_pairs: Option<Vec<(CandidateId, CandidateId)>>,
}

struct LockOutcome {
    rounds: Vec<Round>,
    winner: CandidateId,
    tied_winners: Option<Vec<CandidateId>>,
    used_tie_breaker: bool,
}

fn lock_pairs(model: &PairwiseModel, tb: &TieBreaker) -> Result<LockOutcome, VotingErrors> {
    let num_candidates = model.num_candidates();
    let mut graph: DiGraph<CandidateId> = DiGraph::new();
    for idx in 0..num_candidates {
        graph.add_node(CandidateId(idx as u32));
    }
    let mut remaining: Vec<StrongPair> = model.strong_pairs();
    let mut rounds: Vec<Round> = Vec::with_capacity(remaining.len());
    let mut used_tie_breaker = false;

    while let Some(max_strength) = remaining.iter().map(|sp| sp.strength).max() {
        let strongest: Vec<(CandidateId, CandidateId)> = remaining
            .iter()
            .filter(|sp| sp.strength == max_strength)
            .map(|sp| (sp.winner, sp.loser))
            .collect();
        let (selected, tied_pairs) = if strongest.len() > 1 {
            used_tie_breaker = true;
            (tb.break_pair_tie(&strongest)?, Some(strongest))
        } else {
            (strongest[0], None)
        };
        let (winner, loser) = selected;

        // Adding winner -> loser closes a cycle iff loser already reaches winner.
        let action = if graph.reaches(loser.index(), winner.index()) {
            RoundAction::Skipped
        } else {
            graph.add_edge(winner.index(), loser.index(), max_strength.0 as f64);
            RoundAction::Added
        };
        debug!(
            "lock_pairs: {:?} -> {:?} ({:?}): {:?}",
            winner, loser, max_strength, action
        );

        let pos = remaining
            .iter()
            .position(|sp| sp.winner == winner && sp.loser == loser);
        let pair = match pos {
            Some(p) => remaining.remove(p),
            None => {
                return InconsistentTieBreakSnafu {
                    reason: format!("selected pair {:?} is not a remaining pair", selected),
                }
                .fail();
            }
        };
        rounds.push(Round {
            pair,
            action,
            tied_pairs,
        });
    }
    debug_assert!(!graph.has_cycle());

    let sources: Vec<CandidateId> = graph
        .node_ids()
        .into_iter()
        .filter(|id| graph.in_degree(*id) == 0)
        .map(|id| *graph.node(id))
        .collect();
    let (winner, tied_winners) = if sources.len() == 1 {
        (sources[0], None)
    } else {
        debug!("lock_pairs: tied winners: {:?}", sources);
        (tb.break_candidate_tie(&sources)?, Some(sources))
    };
    Ok(LockOutcome {
        rounds,
        winner,
        tied_winners,
        used_tie_breaker,
    })
}

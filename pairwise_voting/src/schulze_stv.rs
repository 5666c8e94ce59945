use itertools::Itertools;
use log::{debug, info};

use crate::completion::{proportional_completion, PatternWeights, Preference};
use crate::graph::{remove_weak_edges, schwartz_set_heuristic, DiGraph, GraphAction};
use crate::max_flow::FlowNetwork;
use crate::pairwise::PairwiseModel;
use crate::tiebreak::TieBreaker;
use crate::*;

/// Runs the Schulze STV method on completed ballots, electing
/// `rules.number_of_winners` candidates.
///
/// Every set of `number_of_winners + 1` candidates is examined: for each of
/// its members, the strength with which the voters can exclude that member
/// in favour of the others is computed. These strengths define a graph over
/// the sets of winners, whose undominated node is the winning set.
///
/// The work grows with the binomial coefficient of the number of candidates
/// over the number of winners plus one. Use `rules.max_subsets` to put a
/// bound on it.
pub fn run_schulze_stv(
    coll: &[Ballot],
    rules: &TallyRules,
) -> Result<SchulzeStvResult, VotingErrors> {
    info!(
        "run_schulze_stv: processing {:?} ballots, rules: {:?}",
        coll.len(),
        rules
    );
    let cr = checks(coll)?;
    let num_candidates = cr.candidates.len();
    if num_candidates == 0 {
        return InsufficientCandidatesSnafu {}.fail();
    }
    let k = rules.number_of_winners as usize;
    if k == 0 || k > num_candidates {
        return InvalidWinnerCountSnafu {
            requested: rules.number_of_winners,
            candidates: num_candidates,
        }
        .fail();
    }
    let model = PairwiseModel::compute_margins(&cr.votes, num_candidates);
    let pairwise = model.stats(&cr.candidates);

    let short_circuit = if k == num_candidates {
        info!("run_schulze_stv: all the candidates are elected");
        Some(cr.candidates.clone())
    } else if k == 1 {
        model.detect_condorcet_winner().map(|cid| {
            info!(
                "run_schulze_stv: Condorcet winner: {:?}",
                cr.candidates[cid.index()]
            );
            cr.names(&[cid])
        })
    } else {
        None
    };
    if let Some(winners) = short_circuit {
        return Ok(SchulzeStvResult {
            pairwise,
            winners,
            actions: Vec::new(),
            tied_winners: None,
            tie_breaker: None,
            tie_break_seed: None,
        });
    }

    let num_subsets = binomial(num_candidates as u64, (k + 1) as u64);
    if let Some(limit) = rules.max_subsets {
        if num_subsets > limit {
            return SubsetLimitExceededSnafu {
                subsets: num_subsets,
                limit,
            }
            .fail();
        }
    }
    debug!("run_schulze_stv: {} candidate sets to score", num_subsets);

    let tb = TieBreaker::generate(num_candidates, rules.tiebreak_mode);
    let outcome = elect_winning_set(&cr.votes, num_candidates, k, rules, &tb)?;

    let name_sets = |ids: &[Vec<CandidateId>]| -> Vec<Vec<String>> {
        ids.iter().map(|s| cr.names(s)).collect()
    };
    let actions: Vec<ReductionAction> = outcome
        .actions
        .iter()
        .map(|action| match action {
            SetAction::Nodes(sets) => ReductionAction::Nodes(name_sets(sets.as_slice())),
            SetAction::Edges { weight, edges } => ReductionAction::Edges {
                weight: *weight,
                edges: edges
                    .iter()
                    .map(|(u, v)| (cr.names(u), cr.names(v)))
                    .collect(),
            },
        })
        .collect();
    let tie_breaker_used = outcome.tied_winners.is_some();
    let result = SchulzeStvResult {
        pairwise,
        winners: cr.names(&outcome.winners),
        actions,
        tied_winners: outcome.tied_winners.as_deref().map(name_sets),
        tie_breaker: if tie_breaker_used {
            Some(cr.names(tb.order()))
        } else {
            None
        },
        tie_break_seed: if tie_breaker_used { tb.seed() } else { None },
    };
    info!("run_schulze_stv: winners: {:?}", result.winners);
    Ok(result)
}

/// The number of ways to choose k elements among n, saturating at u64::MAX.
fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut res: u128 = 1;
    for i in 0..k {
        // Exact at every step: res * (n - i) is divisible by (i + 1).
        res = res * (n - i) as u128 / (i + 1) as u128;
        if res > u64::MAX as u128 {
            return u64::MAX;
        }
    }
    res as u64
}

/// A candidate considered for exclusion from a set of candidates.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Exclusion {
    candidate: CandidateId,
    // Sorted.
    others: Vec<CandidateId>,
}

fn exclusions(num_candidates: usize, k: usize) -> Vec<Exclusion> {
    (0..num_candidates as u32)
        .map(CandidateId)
        .combinations(k + 1)
        .flat_map(|set| {
            set.iter()
                .map(|c| Exclusion {
                    candidate: *c,
                    others: set.iter().filter(|x| *x != c).cloned().collect(),
                })
                .collect::<Vec<Exclusion>>()
        })
        .collect()
}

fn score_exclusion(
    votes: &[VoteInternal],
    exclusion: &Exclusion,
    rules: &TallyRules,
) -> Result<f64, VotingErrors> {
    let profile = proportional_completion(
        exclusion.candidate,
        &exclusion.others,
        votes,
        rules.completion_mode,
    );
    let strength = strength_of_vote_management(&profile, rules)?;
    debug!(
        "score_exclusion: {:?} against {:?}: {}",
        exclusion.candidate, exclusion.others, strength
    );
    Ok(strength)
}

#[cfg(feature = "parallel")]
fn score_exclusions(
    votes: &[VoteInternal],
    exclusions: &[Exclusion],
    rules: &TallyRules,
) -> Result<Vec<f64>, VotingErrors> {
    use rayon::prelude::*;
    if rules.parallel {
        exclusions
            .par_iter()
            .map(|e| score_exclusion(votes, e, rules))
            .collect()
    } else {
        exclusions
            .iter()
            .map(|e| score_exclusion(votes, e, rules))
            .collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn score_exclusions(
    votes: &[VoteInternal],
    exclusions: &[Exclusion],
    rules: &TallyRules,
) -> Result<Vec<f64>, VotingErrors> {
    if rules.parallel {
        log::warn!("score_exclusions: built without the parallel feature, scoring sequentially");
    }
    exclusions
        .iter()
        .map(|e| score_exclusion(votes, e, rules))
        .collect()
}

/// The limit of the strength of the vote management.
///
/// The voters of each strict pattern can send their weight to any of the
/// other candidates they prefer to the excluded candidate. Each of these
/// candidates can absorb at most `r`. Starting from the total weight of
/// the voters that prefer at least one of them, `r` is repeatedly replaced by
/// the maximum flow divided by the number of candidates, until it stabilizes.
fn strength_of_vote_management(
    profile: &PatternWeights,
    rules: &TallyRules,
) -> Result<f64, VotingErrors> {
    let arity = profile.arity();
    let patterns: Vec<(&Vec<Preference>, f64)> = profile
        .iter()
        .filter(|(p, _)| p.iter().any(|pref| *pref == Preference::PrefersOther))
        .collect();
    // Nodes: source, one per pattern, one per candidate, sink.
    let first_candidate = 1 + patterns.len();
    let sink = first_candidate + arity;
    let mut network = FlowNetwork::new(sink + 1);
    for (idx, (pattern, weight)) in patterns.iter().enumerate() {
        network.set_capacity(0, 1 + idx, *weight);
        for (pos, pref) in pattern.iter().enumerate() {
            if *pref == Preference::PrefersOther {
                network.set_capacity(1 + idx, first_candidate + pos, f64::INFINITY);
            }
        }
    }

    let total: f64 = patterns.iter().map(|(_, w)| *w).sum();
    let mut r = total / arity as f64;
    let mut delta = f64::INFINITY;
    for iteration in 1..=rules.max_flow_iterations {
        for pos in 0..arity {
            network.set_capacity(first_candidate + pos, sink, r);
        }
        let next = network.max_flow(0, sink) / arity as f64;
        delta = (next - r).abs();
        r = next;
        if delta < rules.convergence_tolerance {
            debug!(
                "strength_of_vote_management: converged to {} after {} iterations",
                r, iteration
            );
            return Ok(r);
        }
    }
    NonConvergenceSnafu {
        iterations: rules.max_flow_iterations,
        delta,
    }
    .fail()
}

#[derive(PartialEq, Debug, Clone)]
enum SetAction {
    Nodes(Vec<Vec<CandidateId>>),
    Edges {
        weight: f64,
        edges: Vec<(Vec<CandidateId>, Vec<CandidateId>)>,
    },
}

struct SetOutcome {
    winners: Vec<CandidateId>,
    actions: Vec<SetAction>,
    tied_winners: Option<Vec<Vec<CandidateId>>>,
}

// Scores all the exclusions, builds the graph over the sets of k candidates
// and reduces it to its undominated sets.
fn elect_winning_set(
    votes: &[VoteInternal],
    num_candidates: usize,
    k: usize,
    rules: &TallyRules,
    tb: &TieBreaker,
) -> Result<SetOutcome, VotingErrors> {
    let exclusions = exclusions(num_candidates, k);
    let strengths = score_exclusions(votes, &exclusions, rules)?;

    let mut graph: DiGraph<Vec<CandidateId>> = DiGraph::new();
    for set in (0..num_candidates as u32).map(CandidateId).combinations(k) {
        graph.add_node(set);
    }
    for (exclusion, strength) in exclusions.iter().zip(strengths.iter()) {
        let from = graph.add_node(exclusion.others.clone());
        // The sets where the candidate replaces one of the others.
        for replaced in exclusion.others.iter() {
            let mut target: Vec<CandidateId> = exclusion
                .others
                .iter()
                .filter(|x| *x != replaced)
                .cloned()
                .collect();
            target.push(exclusion.candidate);
            target.sort();
            let to = graph.add_node(target);
            graph.add_edge(from, to, *strength);
        }
    }
    debug!(
        "elect_winning_set: {} sets, {} edges",
        graph.node_ids().len(),
        graph.edge_count()
    );

    remove_weak_edges(&mut graph, rules.convergence_tolerance);
    let graph_actions = schwartz_set_heuristic(&mut graph, rules.convergence_tolerance);
    let actions: Vec<SetAction> = graph_actions
        .iter()
        .map(|action| match action {
            GraphAction::Nodes(ids) => {
                SetAction::Nodes(ids.iter().map(|id| graph.node(*id).clone()).collect())
            }
            GraphAction::Edges { weight, edges } => SetAction::Edges {
                weight: *weight,
                edges: edges
                    .iter()
                    .map(|(u, v)| (graph.node(*u).clone(), graph.node(*v).clone()))
                    .collect(),
            },
        })
        .collect();

    let undominated: Vec<Vec<CandidateId>> = graph
        .node_ids()
        .iter()
        .map(|id| graph.node(*id).clone())
        .collect();
    if undominated.len() == 1 {
        Ok(SetOutcome {
            winners: undominated[0].clone(),
            actions,
            tied_winners: None,
        })
    } else {
        debug!("elect_winning_set: tied sets: {:?}", undominated);
        let winners = tb.break_subset_tie(&undominated)?;
        Ok(SetOutcome {
            winners,
            actions,
            tied_winners: Some(undominated),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn rules(k: u32) -> TallyRules {
        TallyRules {
            number_of_winners: k,
            ..TallyRules::DEFAULT_RULES
        }
    }

    #[test]
    fn binomials() {
        assert_eq!(binomial(5, 0), 1);
        assert_eq!(binomial(5, 2), 10);
        assert_eq!(binomial(10, 7), 120);
        assert_eq!(binomial(2, 3), 0);
        assert_eq!(binomial(200, 100), u64::MAX);
    }

    #[test]
    fn exclusions_cover_all_sets() {
        let ex = exclusions(3, 1);
        assert_eq!(ex.len(), 6);
        assert_eq!(
            ex[0],
            Exclusion {
                candidate: CandidateId(0),
                others: vec![CandidateId(1)]
            }
        );
        assert_eq!(
            ex[5],
            Exclusion {
                candidate: CandidateId(2),
                others: vec![CandidateId(1)]
            }
        );
    }

    #[test]
    fn vote_management_converges() {
        // Excluding B from {A, B, C}: 60 voters A>B>C, 40 voters C>B>A.
        let votes = vec![
            VoteInternal {
                ranks: vec![1, 2, 3],
                count: VoteCount(60),
            },
            VoteInternal {
                ranks: vec![3, 2, 1],
                count: VoteCount(40),
            },
        ];
        let profile = proportional_completion(
            CandidateId(1),
            &[CandidateId(0), CandidateId(2)],
            &votes,
            CompletionMode::Refinement,
        );
        let strength = strength_of_vote_management(&profile, &TallyRules::DEFAULT_RULES).unwrap();
        assert!((strength - 40.0).abs() < 1e-5);
    }

    #[test]
    fn vote_management_reports_non_convergence() {
        let votes = vec![
            VoteInternal {
                ranks: vec![1, 2, 3],
                count: VoteCount(60),
            },
            VoteInternal {
                ranks: vec![3, 2, 1],
                count: VoteCount(40),
            },
        ];
        let profile = proportional_completion(
            CandidateId(1),
            &[CandidateId(0), CandidateId(2)],
            &votes,
            CompletionMode::Refinement,
        );
        let rules = TallyRules {
            max_flow_iterations: 3,
            ..TallyRules::DEFAULT_RULES
        };
        assert!(matches!(
            strength_of_vote_management(&profile, &rules),
            Err(VotingErrors::NonConvergence { iterations: 3, .. })
        ));
    }

    #[test]
    fn two_factions_share_the_seats() {
        init();
        let ballots = vec![
            Ballot::new(&[("A", 1), ("B", 2), ("C", 3)], 60),
            Ballot::new(&[("C", 1), ("B", 2), ("A", 3)], 40),
        ];
        let res = run_schulze_stv(&ballots, &rules(2)).unwrap();
        assert_eq!(res.winners, names(&["A", "C"]));
        assert_eq!(
            res.actions,
            vec![ReductionAction::Nodes(vec![
                names(&["A", "B"]),
                names(&["B", "C"])
            ])]
        );
        assert_eq!(res.tied_winners, None);
        assert_eq!(res.tie_breaker, None);
    }

    #[test]
    fn single_winner_is_condorcet_winner() {
        let ballots = vec![
            Ballot::new(&[("A", 2), ("B", 1), ("C", 3)], 3),
            Ballot::new(&[("A", 1), ("B", 2), ("C", 3)], 2),
            Ballot::new(&[("A", 3), ("B", 2), ("C", 1)], 2),
        ];
        let res = run_schulze_stv(&ballots, &rules(1)).unwrap();
        assert_eq!(res.winners, names(&["B"]));
        assert!(res.actions.is_empty());
        assert_eq!(res.tie_breaker, None);
        assert_eq!(res.tie_break_seed, None);

        // The management graph reaches the same conclusion on its own.
        let cr = checks(&ballots).unwrap();
        let tb = TieBreaker::generate(3, TieBreakMode::UseCandidateOrder);
        let outcome = elect_winning_set(&cr.votes, 3, 1, &rules(1), &tb).unwrap();
        assert_eq!(outcome.winners, vec![CandidateId(1)]);
        assert_eq!(outcome.tied_winners, None);
    }

    // Six groups of voters, most of them indifferent between some candidates.
    fn indifferent_ballots() -> Vec<Ballot> {
        vec![
            Ballot::new(&[("A", 1), ("B", 1), ("C", 2), ("D", 3)], 5),
            Ballot::new(&[("B", 1), ("C", 1), ("D", 1), ("A", 2)], 3),
            Ballot::new(&[("C", 1), ("D", 1), ("B", 2), ("A", 3)], 4),
            Ballot::new(&[("A", 1), ("C", 2), ("D", 2), ("B", 3)], 2),
            Ballot::new(&[("D", 1), ("A", 2), ("B", 2), ("C", 2)], 6),
            Ballot::new(&[("A", 1), ("B", 2), ("C", 3), ("D", 4)], 1),
        ]
    }

    fn assert_strengths(mode: CompletionMode, expected: &[f64]) {
        let cr = checks(&indifferent_ballots()).unwrap();
        let rules = TallyRules {
            completion_mode: mode,
            ..rules(2)
        };
        let strengths = score_exclusions(&cr.votes, &exclusions(4, 2), &rules).unwrap();
        assert_eq!(strengths.len(), expected.len());
        for (idx, (s, e)) in strengths.iter().zip(expected.iter()).enumerate() {
            assert!((s - e).abs() < 1e-4, "exclusion {}: {} != {}", idx, s, e);
        }
    }

    #[test]
    fn indifferent_voters_with_projection() {
        init();
        // Exclusions in order: A|BC, B|AC, C|AB, A|BD, B|AD, D|AB,
        // A|CD, C|AD, D|AC, B|CD, C|BD, D|BC.
        assert_strengths(
            CompletionMode::Projection,
            &[7.35, 6.3, 6.65, 8.25, 6.3, 4.5, 6.5, 8.75, 5.75, 7.0, 8.75, 5.25],
        );
        let rules = TallyRules {
            completion_mode: CompletionMode::Projection,
            ..rules(2)
        };
        let res = run_schulze_stv(&indifferent_ballots(), &rules).unwrap();
        assert_eq!(res.winners, names(&["B", "D"]));
        assert_eq!(res.tied_winners, None);
    }

    #[test]
    fn indifferent_voters_with_refinement() {
        init();
        assert_strengths(
            CompletionMode::Refinement,
            &[5.6, 10.5, 6.0, 6.5, 28.0 / 3.0, 4.0, 6.5, 8.0, 4.0, 6.75, 9.0, 3.75],
        );
        let res = run_schulze_stv(&indifferent_ballots(), &rules(2)).unwrap();
        assert_eq!(res.winners, names(&["A", "D"]));
        assert_eq!(res.tied_winners, None);
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_scoring_matches_sequential() {
        let cr = checks(&indifferent_ballots()).unwrap();
        let ex = exclusions(4, 2);
        let sequential = score_exclusions(&cr.votes, &ex, &rules(2)).unwrap();
        let parallel_rules = TallyRules {
            parallel: true,
            ..rules(2)
        };
        let parallel = score_exclusions(&cr.votes, &ex, &parallel_rules).unwrap();
        assert_eq!(parallel, sequential);
        assert_eq!(
            run_schulze_stv(&indifferent_ballots(), &parallel_rules),
            run_schulze_stv(&indifferent_ballots(), &rules(2))
        );
    }

    #[test]
    fn exact_tie_between_sets() {
        let ballots = vec![
            Ballot::new(&[("A", 1), ("B", 2)], 1),
            Ballot::new(&[("A", 2), ("B", 1)], 1),
        ];
        let res = run_schulze_stv(&ballots, &rules(1)).unwrap();
        assert_eq!(res.winners, names(&["A"]));
        assert_eq!(res.tied_winners, Some(vec![names(&["A"]), names(&["B"])]));
        assert_eq!(res.tie_breaker, Some(names(&["A", "B"])));
    }

    #[test]
    fn everybody_wins() {
        let ballots = vec![Ballot::new(&[("A", 1), ("B", 2)], 1)];
        let res = run_schulze_stv(&ballots, &rules(2)).unwrap();
        assert_eq!(res.winners, names(&["A", "B"]));
    }

    #[test]
    fn invalid_winner_counts() {
        let ballots = vec![Ballot::new(&[("A", 1), ("B", 2)], 1)];
        assert_eq!(
            run_schulze_stv(&ballots, &rules(0)),
            Err(VotingErrors::InvalidWinnerCount {
                requested: 0,
                candidates: 2
            })
        );
        assert_eq!(
            run_schulze_stv(&ballots, &rules(3)),
            Err(VotingErrors::InvalidWinnerCount {
                requested: 3,
                candidates: 2
            })
        );
        assert_eq!(
            run_schulze_stv(&[], &rules(1)),
            Err(VotingErrors::InsufficientCandidates {})
        );
    }

    #[test]
    fn subset_limit() {
        let ballots = vec![Ballot::new(&[("A", 1), ("B", 2), ("C", 3), ("D", 4)], 1)];
        let rules = TallyRules {
            max_subsets: Some(3),
            ..rules(2)
        };
        assert_eq!(
            run_schulze_stv(&ballots, &rules),
            Err(VotingErrors::SubsetLimitExceeded {
                subsets: 4,
                limit: 3
            })
        );
    }

    const NAMES: [&str; 4] = ["A", "B", "C", "D"];

    fn arb_ballots() -> impl Strategy<Value = Vec<Ballot>> {
        proptest::collection::vec(
            (proptest::collection::vec(1u32..5, NAMES.len()), 1u64..10).prop_map(
                |(ranks, count)| {
                    let ranking: Vec<(&str, u32)> =
                        NAMES.iter().cloned().zip(ranks.into_iter()).collect();
                    Ballot::new(&ranking, count)
                },
            ),
            1..8,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn same_seed_same_result(ballots in arb_ballots(), seed in any::<u64>()) {
            let rules = TallyRules {
                tiebreak_mode: TieBreakMode::Random(seed),
                number_of_winners: 2,
                ..TallyRules::DEFAULT_RULES
            };
            let first = run_schulze_stv(&ballots, &rules);
            let second = run_schulze_stv(&ballots, &rules);
            if let Ok(res) = &first {
                prop_assert_eq!(res.winners.len(), 2);
            }
            prop_assert_eq!(first, second);
        }
    }
}

// ********* Input data structures ***********

use snafu::Snafu;

/// A ranked ballot.
///
/// Each candidate is associated with a rank: lower ranks are preferred, and
/// candidates sharing the same rank are considered equivalent by this voter.
/// The resolvers expect completed ballots, in which every candidate of the
/// election receives a rank. See [crate::builder] to fill the missing ones.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct Ballot {
    pub ranking: Vec<(String, u32)>,
    /// Number of identical ballots. Must be positive.
    pub count: u64,
}

impl Ballot {
    pub fn new(ranking: &[(&str, u32)], count: u64) -> Ballot {
        Ballot {
            ranking: ranking
                .iter()
                .map(|(name, rank)| (name.to_string(), *rank))
                .collect(),
            count,
        }
    }
}

// ******** Output data structures *********

/// The pairwise comparison of all the candidates, as computed from the ballots.
#[derive(PartialEq, Debug, Clone)]
pub struct PairwiseStats {
    /// All the candidates, in their canonical (sorted) order.
    pub candidates: Vec<String>,
    /// For each ordered pair (A, B) of distinct candidates, the total
    /// count of the ballots strictly preferring A to B.
    pub pairs: Vec<((String, String), u64)>,
    /// The pairs (A, B) for which A is preferred to B by more voters than the
    /// opposite, with the difference between the two counts.
    pub strong_pairs: Vec<((String, String), u64)>,
    pub condorcet_winner: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum RoundAction {
    Added,
    Skipped,
}

impl RoundAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoundAction::Added => "added",
            RoundAction::Skipped => "skipped",
        }
    }
}

/// Statistics for one round of Ranked Pairs.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct PairRound {
    pub pair: (String, String),
    pub strength: u64,
    pub action: RoundAction,
    /// Set when several pairs were equally strong in this round.
    pub tied_pairs: Option<Vec<(String, String)>>,
}

#[derive(PartialEq, Debug, Clone)]
pub struct RankedPairsResult {
    pub pairwise: PairwiseStats,
    pub winners: Vec<String>,
    pub rounds: Vec<PairRound>,
    pub tied_winners: Option<Vec<String>>,
    /// The tie-break order, only reported if it was consulted.
    pub tie_breaker: Option<Vec<String>>,
    pub tie_break_seed: Option<u64>,
}

/// One step of the reduction of the graph of candidate sets.
#[derive(PartialEq, Debug, Clone)]
pub enum ReductionAction {
    /// These sets are defeated by a set that they cannot defeat back.
    Nodes(Vec<Vec<String>>),
    /// No set could be dropped: the weakest defeats are removed.
    Edges {
        weight: f64,
        edges: Vec<(Vec<String>, Vec<String>)>,
    },
}

#[derive(PartialEq, Debug, Clone)]
pub struct SchulzeStvResult {
    pub pairwise: PairwiseStats,
    pub winners: Vec<String>,
    pub actions: Vec<ReductionAction>,
    pub tied_winners: Option<Vec<Vec<String>>>,
    /// The tie-break order, only reported if it was consulted.
    pub tie_breaker: Option<Vec<String>>,
    pub tie_break_seed: Option<u64>,
}

/// Errors that prevent the algorithms from completing successfully.
#[derive(PartialEq, Debug, Clone, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum VotingErrors {
    #[snafu(display("The election does not have any candidate"))]
    InsufficientCandidates {},
    #[snafu(display("Cannot elect {requested} winner(s) among {candidates} candidate(s)"))]
    InvalidWinnerCount { requested: u32, candidates: usize },
    #[snafu(display("Ballot #{index} is malformed: {reason}"))]
    MalformedBallot { index: usize, reason: String },
    #[snafu(display(
        "The strength of vote management did not converge after {iterations} iterations (last change: {delta})"
    ))]
    NonConvergence { iterations: u32, delta: f64 },
    #[snafu(display("Inconsistent tie break: {reason}"))]
    InconsistentTieBreak { reason: String },
    #[snafu(display("{subsets} candidate sets to score, above the limit of {limit}"))]
    SubsetLimitExceeded { subsets: u64, limit: u64 },
}

// ********* Configuration **********

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TieBreakMode {
    /// Ties are resolved in favour of the candidates that come first in the
    /// canonical (sorted) order.
    UseCandidateOrder,
    /// A seeded permutation of the candidates. The same seed always produces
    /// the same permutation.
    Random(u64),
    /// Like `Random`, with a seed drawn from the system entropy. The seed is
    /// reported in the results so that the outcome can be reproduced.
    Unseeded,
}

/// How the ballots with indifferences are turned into strict preferences
/// before computing the strength of the vote management.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum CompletionMode {
    /// The weight of an indifferent pattern goes to the strict patterns that
    /// refine it, in proportion to their weight.
    Refinement,
    /// Every pattern that takes a side on at least one of the indifferent
    /// positions contributes, in proportion to its weight, to the pattern
    /// obtained by copying these positions.
    Projection,
}

#[derive(PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub tiebreak_mode: TieBreakMode,
    /// Only used by Schulze STV.
    pub number_of_winners: u32,
    pub completion_mode: CompletionMode,
    pub max_flow_iterations: u32,
    pub convergence_tolerance: f64,
    /// Upper bound on the number of candidate sets scored by Schulze STV.
    pub max_subsets: Option<u64>,
    /// Scores the candidate sets concurrently. Requires the `parallel` feature.
    pub parallel: bool,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        tiebreak_mode: TieBreakMode::UseCandidateOrder,
        number_of_winners: 1,
        completion_mode: CompletionMode::Refinement,
        max_flow_iterations: 1000,
        convergence_tolerance: 1e-6,
        max_subsets: None,
        parallel: false,
    };
}

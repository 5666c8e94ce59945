use crate::election::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: String,
    #[serde(rename = "contestDate")]
    pub contest_date: Option<String>,
    #[serde(rename = "contestJurisdiction")]
    pub contest_jurisdiction: Option<String>,
    #[serde(rename = "contestOffice")]
    pub contest_office: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub contest: String,
    pub date: Option<String>,
    pub jurisdiction: Option<String>,
    pub office: Option<String>,
    pub method: String,
    #[serde(rename = "numberOfWinners")]
    pub number_of_winners: u32,
}

/// A source of ballots, read from a separate file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BallotFile {
    /// `csv` or `json`
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    /// (1-based) The column with the number of identical ballots. Every ballot
    /// counts once if absent.
    #[serde(rename = "countColumnIndex")]
    pub count_column_index: Option<usize>,
    /// (1-based) The first column with a choice.
    #[serde(rename = "firstVoteColumnIndex")]
    pub first_vote_column_index: Option<usize>,
    /// (1-based) The first row with a ballot.
    #[serde(rename = "firstVoteRowIndex")]
    pub first_vote_row_index: Option<usize>,
    /// Separates the candidates ranked equally in one cell. Defaults to `=`.
    #[serde(rename = "tieDelimiter")]
    pub tie_delimiter: Option<String>,
}

impl BallotFile {
    pub fn simple(provider: &str, file_path: &str) -> BallotFile {
        BallotFile {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            count_column_index: None,
            first_vote_column_index: None,
            first_vote_row_index: None,
            tie_delimiter: None,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ElectionCandidate {
    pub name: String,
    pub excluded: Option<bool>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ElectionRules {
    pub method: Option<String>,
    #[serde(rename = "numberOfWinners")]
    pub number_of_winners: Option<u32>,
    #[serde(rename = "tiebreakMode")]
    pub tiebreak_mode: Option<String>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "completionMode")]
    pub completion_mode: Option<String>,
    #[serde(rename = "maxFlowIterations")]
    pub max_flow_iterations: Option<u32>,
    #[serde(rename = "convergenceTolerance")]
    pub convergence_tolerance: Option<f64>,
    #[serde(rename = "maxSubsets")]
    pub max_subsets: Option<u64>,
    pub parallel: Option<bool>,
}

/// A ballot written inline, either with explicit ranks or as ordered groups
/// of equally ranked candidates.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ConfigBallot {
    pub ranking: Option<BTreeMap<String, u32>>,
    pub order: Option<Vec<Vec<String>>>,
    pub count: Option<u64>,
}

impl ConfigBallot {
    pub fn to_parsed(&self, id: String) -> ElectionResult<ParsedBallot> {
        let choices = match (&self.ranking, &self.order) {
            (Some(ranking), None) => BallotChoices::Ranking(
                ranking.iter().map(|(n, r)| (n.clone(), *r)).collect(),
            ),
            (None, Some(order)) => BallotChoices::Ordered(order.clone()),
            _ => whatever!(
                "Ballot {}: exactly one of 'ranking' or 'order' must be provided",
                id
            ),
        };
        Ok(ParsedBallot {
            id: Some(id),
            count: self.count.unwrap_or(1),
            choices,
        })
    }
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct ElectionConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(default)]
    pub rules: ElectionRules,
    pub candidates: Option<Vec<ElectionCandidate>>,
    pub ballots: Option<Vec<ConfigBallot>>,
    #[serde(rename = "ballotFiles")]
    pub ballot_files: Option<Vec<BallotFile>>,
}

pub fn read_config(path: &str) -> ElectionResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}

pub fn read_summary(path: &str) -> ElectionResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_summary: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })?;
    Ok(js)
}

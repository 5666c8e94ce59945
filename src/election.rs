use log::{debug, info, warn};

use pairwise_voting::builder::Builder;
use pairwise_voting::*;
use snafu::{prelude::*, Snafu};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::election::config_reader::*;

pub mod config_reader;
mod io_csv;
mod io_json;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing the JSON content of {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error formatting the summary"))]
    FormattingJson { source: serde_json::Error },
    #[snafu(display("Error writing the summary to {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening the CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing line {lineno} of a CSV file"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Line {lineno}: cannot read the count from {content:?}"))]
    CsvCount { lineno: usize, content: String },
    #[snafu(display("The configuration file has no parent directory"))]
    MissingParentDir {},
    #[snafu(display("Tabulation failed: {source}"))]
    Voting { source: VotingErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type ElectionResult<T> = Result<T, CliError>;

/// The choices of a ballot, as read from the inputs.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum BallotChoices {
    Ranking(Vec<(String, u32)>),
    /// Groups of equally ranked candidates, the most preferred first.
    Ordered(Vec<Vec<String>>),
}

/// A ballot, as parsed by the readers.
/// This is before removing the excluded candidates and completing the rankings.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: Option<String>,
    pub count: u64,
    pub choices: BallotChoices,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Method {
    RankedPairs,
    SchulzeStv,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::RankedPairs => "rankedPairs",
            Method::SchulzeStv => "schulzeSTV",
        }
    }
}

pub(crate) fn simplify_file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(path)
        .to_string()
}

fn validate_rules(er: &ElectionRules, args: &Args) -> ElectionResult<(Method, TallyRules)> {
    let defaults = TallyRules::DEFAULT_RULES;
    let method_s = args
        .method
        .clone()
        .or_else(|| er.method.clone())
        .unwrap_or_else(|| Method::RankedPairs.as_str().to_string());
    let method = match method_s.as_str() {
        "rankedPairs" | "tideman" => Method::RankedPairs,
        "schulzeSTV" => Method::SchulzeStv,
        x => whatever!("Unknown method {:?}", x),
    };

    let tiebreak_mode = match (args.seed, er.tiebreak_mode.as_deref()) {
        (Some(seed), _) => TieBreakMode::Random(seed),
        (None, None) | (None, Some("useCandidateOrder")) => TieBreakMode::UseCandidateOrder,
        (None, Some("random")) => {
            let seed = match er.random_seed.as_ref().map(|s| s.parse::<u64>()) {
                Some(Ok(x)) => x,
                x => whatever!("Cannot use tiebreak mode random with seed {:?}", x),
            };
            TieBreakMode::Random(seed)
        }
        (None, Some("unseeded")) => TieBreakMode::Unseeded,
        (None, Some(x)) => whatever!("Cannot use tiebreak mode {:?}", x),
    };

    let number_of_winners = args
        .winners
        .or(er.number_of_winners)
        .unwrap_or(defaults.number_of_winners);
    if method == Method::RankedPairs && number_of_winners != 1 {
        whatever!(
            "Ranked Pairs elects a single winner, {} requested",
            number_of_winners
        );
    }

    let completion_mode = match er.completion_mode.as_deref() {
        None | Some("refinement") => CompletionMode::Refinement,
        Some("projection") => CompletionMode::Projection,
        Some(x) => whatever!("Unknown completion mode {:?}", x),
    };

    let convergence_tolerance = match er.convergence_tolerance {
        None => defaults.convergence_tolerance,
        Some(t) if t.is_finite() && t > 0.0 => t,
        Some(t) => whatever!("The convergence tolerance must be positive, got {}", t),
    };

    let rules = TallyRules {
        tiebreak_mode,
        number_of_winners,
        completion_mode,
        max_flow_iterations: er
            .max_flow_iterations
            .unwrap_or(defaults.max_flow_iterations),
        convergence_tolerance,
        max_subsets: er.max_subsets,
        parallel: er.parallel.unwrap_or(defaults.parallel),
    };
    Ok((method, rules))
}

fn read_ballot_file(root: &Path, cfs: &BallotFile) -> ElectionResult<Vec<ParsedBallot>> {
    let p: PathBuf = root.join(&cfs.file_path);
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read ballot file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_ballots(&p2, cfs),
        "json" => io_json::read_json_ballots(&p2),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn collect_ballots(
    config: &ElectionConfig,
    root: &Path,
    args: &Args,
) -> ElectionResult<Vec<ParsedBallot>> {
    let mut data: Vec<ParsedBallot> = Vec::new();
    for (idx, b) in config.ballots.iter().flatten().enumerate() {
        data.push(b.to_parsed(format!("ballot-{:08}", idx + 1))?);
    }
    for cfs in config.ballot_files.iter().flatten() {
        let mut file_data = read_ballot_file(root, cfs)?;
        data.append(&mut file_data);
    }
    if let Some(input) = &args.input {
        let provider = args.input_type.clone().unwrap_or_else(|| "csv".to_string());
        let cfs = BallotFile::simple(&provider, input);
        let mut file_data = read_ballot_file(Path::new(""), &cfs)?;
        data.append(&mut file_data);
    }
    if data.is_empty() {
        whatever!("No ballots found: provide ballots in the configuration or with --input");
    }
    Ok(data)
}

// Drops the excluded candidates and feeds the ballots to the builder.
fn make_builder(
    config: &ElectionConfig,
    rules: &TallyRules,
    data: &[ParsedBallot],
) -> ElectionResult<Builder> {
    let declared = config.candidates.as_deref().unwrap_or(&[]);
    let excluded: BTreeSet<&str> = declared
        .iter()
        .filter(|c| c.excluded.unwrap_or(false))
        .map(|c| c.name.as_str())
        .collect();
    let mut builder = Builder::new(rules).context(VotingSnafu {})?;
    if config.candidates.is_some() {
        let names: Vec<String> = declared
            .iter()
            .filter(|c| !excluded.contains(c.name.as_str()))
            .map(|c| c.name.clone())
            .collect();
        builder = builder.candidates(&names).context(VotingSnafu {})?;
    }

    for pb in data.iter() {
        debug!("make_builder: ballot {:?}", pb);
        let added = match &pb.choices {
            BallotChoices::Ranking(ranking) => {
                let kept: Vec<(String, u32)> = ranking
                    .iter()
                    .filter(|(name, _)| !excluded.contains(name.as_str()))
                    .cloned()
                    .collect();
                builder.add_ranking(&kept, pb.count)
            }
            BallotChoices::Ordered(groups) => {
                let kept: Vec<Vec<String>> = groups
                    .iter()
                    .map(|g| {
                        g.iter()
                            .filter(|name| !excluded.contains(name.as_str()))
                            .cloned()
                            .collect()
                    })
                    .collect();
                builder.add_ordered(&kept, pb.count)
            }
        };
        added.context(VotingSnafu {})?;
    }
    Ok(builder)
}

fn names_js(names: &[String]) -> JSValue {
    json!(names)
}

fn pair_js(pair: &(String, String)) -> JSValue {
    json!([pair.0, pair.1])
}

fn pairwise_to_json(stats: &PairwiseStats, res: &mut JSMap<String, JSValue>) {
    res.insert("candidates".to_string(), names_js(&stats.candidates));
    let pairs: Vec<JSValue> = stats
        .pairs
        .iter()
        .map(|(p, c)| json!({"pair": pair_js(p), "count": c.to_string()}))
        .collect();
    res.insert("pairs".to_string(), json!(pairs));
    let strong_pairs: Vec<JSValue> = stats
        .strong_pairs
        .iter()
        .map(|(p, s)| json!({"pair": pair_js(p), "strength": s.to_string()}))
        .collect();
    res.insert("strongPairs".to_string(), json!(strong_pairs));
    if let Some(cw) = &stats.condorcet_winner {
        res.insert("condorcetWinner".to_string(), json!(cw));
    }
}

fn tie_break_to_json(
    tie_breaker: &Option<Vec<String>>,
    seed: &Option<u64>,
    res: &mut JSMap<String, JSValue>,
) {
    if let Some(tb) = tie_breaker {
        res.insert("tieBreaker".to_string(), names_js(tb));
    }
    if let Some(s) = seed {
        res.insert("tieBreakSeed".to_string(), json!(s.to_string()));
    }
}

fn ranked_pairs_to_json(rp: &RankedPairsResult) -> JSValue {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    pairwise_to_json(&rp.pairwise, &mut res);
    let rounds: Vec<JSValue> = rp
        .rounds
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            let mut round: JSMap<String, JSValue> = JSMap::new();
            round.insert("round".to_string(), json!(idx + 1));
            round.insert("pair".to_string(), pair_js(&r.pair));
            round.insert("strength".to_string(), json!(r.strength.to_string()));
            round.insert("action".to_string(), json!(r.action.as_str()));
            if let Some(tps) = &r.tied_pairs {
                let tied: Vec<JSValue> = tps.iter().map(pair_js).collect();
                round.insert("tiedPairs".to_string(), json!(tied));
            }
            JSValue::Object(round)
        })
        .collect();
    res.insert("rounds".to_string(), json!(rounds));
    if let Some(tw) = &rp.tied_winners {
        res.insert("tiedWinners".to_string(), names_js(tw));
    }
    tie_break_to_json(&rp.tie_breaker, &rp.tie_break_seed, &mut res);
    res.insert("winners".to_string(), names_js(&rp.winners));
    JSValue::Object(res)
}

fn schulze_stv_to_json(stv: &SchulzeStvResult) -> JSValue {
    let mut res: JSMap<String, JSValue> = JSMap::new();
    pairwise_to_json(&stv.pairwise, &mut res);
    let actions: Vec<JSValue> = stv
        .actions
        .iter()
        .map(|action| match action {
            ReductionAction::Nodes(sets) => json!({ "nodes": sets }),
            ReductionAction::Edges { weight, edges } => {
                let edges_js: Vec<JSValue> = edges.iter().map(|(u, v)| json!([u, v])).collect();
                json!({"edges": edges_js, "weight": weight})
            }
        })
        .collect();
    res.insert("actions".to_string(), json!(actions));
    if let Some(tw) = &stv.tied_winners {
        res.insert("tiedWinners".to_string(), json!(tw));
    }
    tie_break_to_json(&stv.tie_breaker, &stv.tie_break_seed, &mut res);
    res.insert("winners".to_string(), names_js(&stv.winners));
    JSValue::Object(res)
}

fn build_summary_js(
    settings: &OutputSettings,
    method: Method,
    rules: &TallyRules,
    results: JSValue,
) -> JSValue {
    let c = OutputConfig {
        contest: settings.contest_name.clone(),
        date: settings.contest_date.clone(),
        jurisdiction: settings.contest_jurisdiction.clone(),
        office: settings.contest_office.clone(),
        method: method.as_str().to_string(),
        number_of_winners: rules.number_of_winners,
    };
    json!({
        "config": c,
        "results": results })
}

/// Runs the tabulation and returns the summary of the election.
pub fn tabulate(
    config: &ElectionConfig,
    data: &[ParsedBallot],
    method: Method,
    rules: &TallyRules,
) -> ElectionResult<JSValue> {
    let builder = make_builder(config, rules, data)?;
    let results = match method {
        Method::RankedPairs => ranked_pairs_to_json(&builder.ranked_pairs().context(VotingSnafu {})?),
        Method::SchulzeStv => schulze_stv_to_json(&builder.schulze_stv().context(VotingSnafu {})?),
    };
    Ok(build_summary_js(
        &config.output_settings,
        method,
        rules,
        results,
    ))
}

fn write_summary(out: &Option<String>, pretty_js: &str) -> ElectionResult<()> {
    match out.as_deref() {
        None | Some("stdout") | Some("") => {
            println!("{}", pretty_js);
        }
        Some(path) => {
            info!("Writing summary to {:?}", path);
            fs::write(path, pretty_js).context(WritingOutputSnafu { path })?;
        }
    }
    Ok(())
}

pub fn run_election(args: &Args) -> ElectionResult<()> {
    let (config, root) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root)
        }
        None => (ElectionConfig::default(), PathBuf::new()),
    };
    info!("config: {:?}", config);

    // Validate the rules:
    let (method, rules) = validate_rules(&config.rules, args)?;
    let data = collect_ballots(&config, &root, args)?;
    info!("{} ballots read", data.len());

    let result_js = tabulate(&config, &data, method, &rules)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(FormattingJsonSnafu {})?;
    write_summary(&args.out, &pretty_js_stats)?;

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(FormattingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

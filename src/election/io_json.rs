// Ballots stored in a JSON file: an array of ballots written like the
// ballots of the election description.

use crate::election::*;

pub fn read_json_ballots(path: &str) -> ElectionResult<Vec<ParsedBallot>> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    parse_json_ballots(&contents, &simplify_file_name(path)).context(ParsingJsonSnafu { path })?
}

fn parse_json_ballots(
    contents: &str,
    file_name: &str,
) -> Result<ElectionResult<Vec<ParsedBallot>>, serde_json::Error> {
    let ballots: Vec<ConfigBallot> = serde_json::from_str(contents)?;
    Ok(ballots
        .iter()
        .enumerate()
        .map(|(idx, b)| b.to_parsed(format!("{}-{:08}", file_name, idx + 1)))
        .collect())
}

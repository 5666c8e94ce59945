// Primitives for reading CSV files.
//
// One ballot per row. The choices are listed in order of preference, one
// cell per rank. A cell may contain several candidates separated by the tie
// delimiter: they are then ranked equally.

use std::io::Read;

use crate::election::*;

pub fn read_csv_ballots(path: &str, cfs: &BallotFile) -> ElectionResult<Vec<ParsedBallot>> {
    let rdr = csv_builder()
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    read_records(rdr, cfs, &simplify_file_name(path))
}

fn csv_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.has_headers(false).flexible(true);
    builder
}

fn one_based(name: &str, value: Option<usize>, default: usize) -> ElectionResult<usize> {
    match value {
        None => Ok(default),
        Some(0) => whatever!("{} starts at 1, got 0", name),
        Some(x) => Ok(x),
    }
}

pub fn read_records<R: Read>(
    rdr: csv::Reader<R>,
    cfs: &BallotFile,
    file_name: &str,
) -> ElectionResult<Vec<ParsedBallot>> {
    let count_idx = match cfs.count_column_index {
        Some(_) => Some(one_based("countColumnIndex", cfs.count_column_index, 1)?),
        None => None,
    };
    let first_col = one_based(
        "firstVoteColumnIndex",
        cfs.first_vote_column_index,
        count_idx.map(|c| c + 1).unwrap_or(1),
    )?;
    let first_row = one_based("firstVoteRowIndex", cfs.first_vote_row_index, 1)?;
    let delimiter = cfs.tie_delimiter.clone().unwrap_or_else(|| "=".to_string());

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, line_r) in rdr.into_records().enumerate() {
        // The index starts at 1 to respect most conventions in the spreadsheet world.
        let lineno = idx + 1;
        if lineno < first_row {
            continue;
        }
        let line = line_r.context(CsvLineParseSnafu { lineno })?;
        let count: u64 = match count_idx {
            Some(c) => {
                let cell = line.get(c - 1).context(CsvLineTooShortSnafu { lineno })?;
                cell.trim()
                    .parse::<u64>()
                    .ok()
                    .context(CsvCountSnafu {
                        lineno,
                        content: cell.to_string(),
                    })?
            }
            None => 1,
        };
        let choices: Vec<Vec<String>> = line
            .iter()
            .skip(first_col - 1)
            .map(|cell| {
                cell.split(delimiter.as_str())
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .map(|s| s.to_string())
                    .collect()
            })
            .collect();
        debug!("read_records: lineno: {:?} choices: {:?}", lineno, &choices);
        res.push(ParsedBallot {
            id: Some(format!("{}-{:08}", file_name, lineno)),
            count,
            choices: BallotChoices::Ordered(choices),
        });
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(content: &str, cfs: &BallotFile) -> ElectionResult<Vec<ParsedBallot>> {
        read_records(csv_builder().from_reader(content.as_bytes()), cfs, "test.csv")
    }

    fn groups(gs: &[&[&str]]) -> BallotChoices {
        BallotChoices::Ordered(
            gs.iter()
                .map(|g| g.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn plain_choices() {
        let res = read("A,B,C\nC,,A\n", &BallotFile::simple("csv", "test.csv")).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].count, 1);
        assert_eq!(res[0].choices, groups(&[&["A"], &["B"], &["C"]]));
        assert_eq!(res[1].choices, groups(&[&["C"], &[], &["A"]]));
        assert_eq!(res[1].id, Some("test.csv-00000002".to_string()));
    }

    #[test]
    fn counts_header_and_ties() {
        let cfs = BallotFile {
            count_column_index: Some(1),
            first_vote_row_index: Some(2),
            ..BallotFile::simple("csv", "test.csv")
        };
        let res = read("count,first,second\n3,A = B,C\n2,C\n", &cfs).unwrap();
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].count, 3);
        assert_eq!(res[0].choices, groups(&[&["A", "B"], &["C"]]));
        assert_eq!(res[1].count, 2);
    }

    #[test]
    fn bad_count() {
        let cfs = BallotFile {
            count_column_index: Some(1),
            ..BallotFile::simple("csv", "test.csv")
        };
        assert!(matches!(
            read("x,A\n", &cfs),
            Err(CliError::CsvCount { lineno: 1, .. })
        ));
    }

    #[test]
    fn zero_index_is_rejected() {
        let cfs = BallotFile {
            first_vote_column_index: Some(0),
            ..BallotFile::simple("csv", "test.csv")
        };
        assert!(read("A\n", &cfs).is_err());
    }
}

use clap::Parser;

/// This is a tabulation program for Ranked Pairs and Schulze STV elections.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The file containing the election description in JSON format.
    /// For more information about the file format, read the documentation of the
    /// `pairwise_voting::manual` module.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the outcome of an election in JSON format. If provided,
    /// pairvote will check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will be written in JSON
    /// format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) A file of ballots. It is read in addition to the ballots declared in the
    /// configuration file.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (csv or json, default csv) The format of the file passed with --input.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (rankedPairs or schulzeSTV) The tabulation method. Overrides the method in the configuration.
    #[clap(short, long, value_parser)]
    pub method: Option<String>,

    /// The number of candidates to elect (Schulze STV only).
    #[clap(short, long, value_parser)]
    pub winners: Option<u32>,

    /// If specified, ties are broken with a random order generated from this seed.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

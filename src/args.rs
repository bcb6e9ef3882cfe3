use clap::Parser;

/// This is a ranked choice voting tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The file containing the election data. The first line holds the
    /// number of candidates, the following lines hold the candidate names (one per
    /// line, in ballot-column order) and then the ballots (one per line, as
    /// whitespace-separated ranks). Reading stops at the first blank line.
    #[clap(short, long, value_parser)]
    pub input: String,

    /// (file path, 'stdout' or empty) If specified, the summary of the election will
    /// be written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the expected summary of the election
    /// in JSON format. If provided, irvtab will check that the tabulated output
    /// matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// Declares a tie only when all remaining candidates hold exactly the same
    /// number of votes, instead of as soon as the trailing candidates are out of
    /// votes.
    #[clap(long, takes_value = false)]
    pub strict_ties: bool,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// How the terminal tie between the remaining candidates is detected.
///
/// In most cases the default is what you want; see the variants for the exact
/// conditions.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum TiePolicy {
    /// Declares the candidates holding the maximum vote count tied as soon as
    /// some trailing candidate holds zero votes. Eliminated candidates count
    /// as trailing, so after the first elimination this fires whenever the
    /// majority check fails.
    TrailersExhausted,
    /// Declares a tie only when every candidate still in the running holds
    /// exactly the same number of votes.
    AllEqual,
}

/// The rules that govern one tabulation run.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRules {
    pub tie_policy: TiePolicy,
}

impl TallyRules {
    pub const DEFAULT_RULES: TallyRules = TallyRules {
        tie_policy: TiePolicy::TrailersExhausted,
    };
}

// ******** Output data structures *********

/// Where the ballots of one eliminated candidate went.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct EliminationStats {
    pub name: String,
    pub transfers: Vec<(String, u64)>,
    pub exhausted: u64,
}

/// Statistics for one round
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RoundStats {
    pub round: u32,
    pub tally: Vec<(String, u64)>,
    pub elected: Vec<String>,
    pub eliminated: Vec<EliminationStats>,
}

/// The outcome of a completed tabulation.
///
/// A single name in `winners` is a majority winner. Two or more names are the
/// tied candidates, in roster order.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionResult {
    pub winners: Vec<String>,
    pub round_stats: Vec<RoundStats>,
}

/// Errors reported while setting up or tabulating an election.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ElectionError {
    /// The election was declared with no candidates.
    EmptyElection,
    /// More candidates were registered than the declared roster capacity.
    RosterFull,
    /// A ballot arrived, or tabulation started, before every declared
    /// candidate was registered.
    RosterIncomplete,
    /// The ballot does not rank every candidate exactly once.
    InvalidBallot,
    /// The round loop ran out of rounds without reaching a winner or a tie.
    NoConvergence,
}

impl Error for ElectionError {}

impl Display for ElectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElectionError::EmptyElection => write!(f, "the election has no candidates"),
            ElectionError::RosterFull => write!(f, "the candidate roster is already full"),
            ElectionError::RosterIncomplete => {
                write!(f, "the candidate roster is not fully registered yet")
            }
            ElectionError::InvalidBallot => {
                write!(f, "the ballot is not a permutation of the ranks 1..=n")
            }
            ElectionError::NoConvergence => write!(f, "the tabulation did not converge"),
        }
    }
}

use log::{debug, info, warn};

use instant_runoff::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

#[derive(Debug, Snafu)]
pub enum TallyError {
    #[snafu(display("Error opening election file {path}"))]
    OpeningElectionFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The election file should start with the number of candidates"))]
    MissingCandidateCount {},
    #[snafu(display("Could not parse the number of candidates: {line}"))]
    ParsingCandidateCount { line: String },
    #[snafu(display("The election file declares {expected} candidates but only {found} names follow"))]
    MissingCandidateNames { expected: usize, found: usize },
    #[snafu(display("Could not parse ballot line {lineno}: {line}"))]
    ParsingBallot { lineno: usize, line: String },
    #[snafu(display("Ballot line {lineno} was rejected: {line}"))]
    InvalidBallotLine { lineno: usize, line: String },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening reference summary"))]
    OpeningJson { source: std::io::Error },
    #[snafu(display("Error handling summary JSON"))]
    ParsingJson { source: serde_json::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

type TallyResult<T> = Result<T, TallyError>;

/// Builds an election from the textual election data.
///
/// The expected layout is the candidate count on the first line, then one
/// candidate name per line, then one ballot per line as whitespace-separated
/// ranks. The first blank line ends the ballot section. The first malformed
/// or rejected ballot line aborts the whole read.
pub fn parse_election(contents: &str, rules: &TallyRules) -> TallyResult<Election> {
    let mut lines = contents.lines();
    let count_line = lines.next().context(MissingCandidateCountSnafu {})?;
    let num_candidates: usize = count_line
        .trim()
        .parse()
        .ok()
        .context(ParsingCandidateCountSnafu { line: count_line })?;

    let mut election = match Election::with_rules(num_candidates, rules) {
        Ok(e) => e,
        Err(e) => whatever!("Could not create the election: {}", e),
    };

    for idx in 0..num_candidates {
        let name = lines.next().context(MissingCandidateNamesSnafu {
            expected: num_candidates,
            found: idx,
        })?;
        match election.add_candidate(name.trim_end()) {
            Ok(()) => {}
            Err(e) => whatever!("Could not register candidate {:?}: {}", name, e),
        }
    }

    for (idx, line) in lines.enumerate() {
        // Line numbers are 1-based; the ballots start after the header.
        let lineno = num_candidates + 2 + idx;
        if line.trim().is_empty() {
            break;
        }
        let mut ranks: Vec<u32> = Vec::new();
        for tok in line.split_whitespace() {
            let rank = tok
                .parse::<u32>()
                .ok()
                .context(ParsingBallotSnafu { lineno, line })?;
            ranks.push(rank);
        }
        debug!("parse_election: line {}: ranks {:?}", lineno, ranks);
        match election.add_ballot(&ranks) {
            Ok(()) => {}
            Err(ElectionError::InvalidBallot) => {
                return InvalidBallotLineSnafu { lineno, line }.fail();
            }
            Err(e) => whatever!("Could not add ballot at line {}: {}", lineno, e),
        }
    }
    Ok(election)
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
struct OutputConfig {
    contest: String,
    candidates: usize,
}

fn result_stats_to_json(result: &ElectionResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for round_stat in result.round_stats.iter() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for (name, count) in round_stat.tally.iter() {
            tally.insert(name.clone(), json!(count.to_string()));
        }

        let mut tally_results: Vec<JSValue> = Vec::new();
        for elim_stats in round_stat.eliminated.iter() {
            let mut transfers: JSMap<String, JSValue> = JSMap::new();
            for (name, count) in elim_stats.transfers.iter() {
                transfers.insert(name.clone(), json!(count.to_string()));
            }
            if elim_stats.exhausted > 0 {
                transfers.insert(
                    "exhausted".to_string(),
                    json!(elim_stats.exhausted.to_string()),
                );
            }
            tally_results.push(json!({
                "eliminated": elim_stats.name,
                "transfers": transfers
            }));
        }
        for winner_name in round_stat.elected.iter() {
            tally_results.push(json!({
                "elected": winner_name,
                "transfers": {}
            }));
        }

        let js = json!({"round": round_stat.round, "tally": tally, "tallyResults": tally_results});
        l.push(js);
    }
    l
}

fn build_summary_js(contest: &str, num_candidates: usize, result: &ElectionResult) -> JSValue {
    let c = OutputConfig {
        contest: contest.to_string(),
        candidates: num_candidates,
    };
    json!({
        "config": c,
        "results": result_stats_to_json(result),
        "winners": result.winners,
    })
}

fn read_summary(path: &str) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn announce_winner(result: &ElectionResult) {
    if result.winners.len() == 1 {
        println!("Winner is {}", result.winners[0]);
    } else {
        println!("Tie!  Remaining candidates are:");
        for name in result.winners.iter() {
            println!("   {}", name);
        }
    }
}

pub fn run_election(args: &Args) -> TallyResult<()> {
    let rules = if args.strict_ties {
        TallyRules {
            tie_policy: TiePolicy::AllEqual,
        }
    } else {
        TallyRules::DEFAULT_RULES
    };

    let contents = fs::read_to_string(&args.input).context(OpeningElectionFileSnafu {
        path: args.input.clone(),
    })?;
    let mut election = parse_election(&contents, &rules)?;
    let num_candidates = election.num_candidates();

    let result = match election.select_winner() {
        Ok(x) => x,
        Err(e) => whatever!("Tabulation error: {}", e),
    };
    info!("result: {:?}", result);

    announce_winner(&result);

    let contest = Path::new(&args.input)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("election");
    let summary_js = build_summary_js(contest, num_candidates, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&summary_js).context(ParsingJsonSnafu {})?;

    match args.out.as_deref() {
        Some("stdout") => println!("{}", pretty_js_stats),
        Some(path) => fs::write(path, &pretty_js_stats).context(WritingSummarySnafu { path })?,
        None => {}
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = &args.reference {
        let summary_ref = read_summary(summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference summary");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_str(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }

    Ok(())
}

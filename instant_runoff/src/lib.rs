//! Instant-runoff vote tabulation.
//!
//! See the [manual] module for the ballot model and the full description of
//! the algorithm.

mod config;
pub mod manual;

use log::{debug, info};

use std::ops::AddAssign;

pub use crate::config::*;

// **** Private structures ****

type RoundId = u32;

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(usize);

/// Stable handle into the election's ballot arena. Candidates hold handles,
/// never the ballots themselves, so a ballot moves between candidates without
/// being copied.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct BallotId(usize);

/// The preference a voter gave to one candidate position. 1 is the most
/// preferred.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct Rank(u32);

#[derive(Eq, PartialEq, Debug, Clone, Copy, PartialOrd, Ord, Hash)]
struct VoteCount(u64);

impl VoteCount {
    const EMPTY: VoteCount = VoteCount(0);
}

impl std::iter::Sum for VoteCount {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        VoteCount(iter.map(|vc| vc.0).sum())
    }
}

impl AddAssign for VoteCount {
    fn add_assign(&mut self, rhs: VoteCount) {
        self.0 += rhs.0;
    }
}

/// One voter's complete ranking of the candidates.
///
/// The position in the vector identifies the candidate, the value at that
/// position is the rank the voter gave to this candidate. At construction the
/// ranks are a permutation of `1..=n`. When a candidate is eliminated, its
/// position is overwritten with the sentinel rank `n + 1` so that it can never
/// be selected as a top choice again; the relative order of the other
/// positions is untouched.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Ballot {
    ranks: Vec<Rank>,
}

impl Ballot {
    fn new(ranks: &[u32]) -> Ballot {
        Ballot {
            ranks: ranks.iter().map(|&r| Rank(r)).collect(),
        }
    }

    // One more than any rank a voter can assign.
    fn sentinel(&self) -> Rank {
        Rank(self.ranks.len() as u32 + 1)
    }

    /// The position holding the numerically smallest rank, or `None` once
    /// every position has been struck out.
    fn top_choice(&self) -> Option<CandidateId> {
        let mut top_rank = self.sentinel();
        let mut top_idx: Option<usize> = None;
        for (idx, &r) in self.ranks.iter().enumerate() {
            if r < top_rank {
                top_rank = r;
                top_idx = Some(idx);
            }
        }
        top_idx.map(CandidateId)
    }

    /// Strikes a candidate position out of this ballot. Striking the same
    /// position again has no further effect.
    fn eliminate_candidate(&mut self, cid: CandidateId) {
        let sentinel = self.sentinel();
        self.ranks[cid.0] = sentinel;
    }
}

/// A person running for office.
///
/// A candidate accumulates the handles of the ballots on which it is
/// currently the top choice. The list is empty once the candidate has been
/// eliminated.
#[derive(Eq, PartialEq, Debug, Clone)]
struct Candidate {
    name: String,
    eliminated: bool,
    ballots: Vec<BallotId>,
}

impl Candidate {
    fn new(name: &str) -> Candidate {
        Candidate {
            name: name.to_string(),
            eliminated: false,
            ballots: Vec::new(),
        }
    }

    /// The caller guarantees that this candidate is the ballot's current top
    /// choice.
    fn add_ballot(&mut self, ballot: BallotId) {
        self.ballots.push(ballot);
    }

    fn vote_count(&self) -> VoteCount {
        VoteCount(self.ballots.len() as u64)
    }

    /// Removes this candidate from the running. Marking and draining happen
    /// in one step so that no ballot stays attached to an eliminated
    /// candidate.
    fn eliminate(&mut self) -> Vec<BallotId> {
        self.eliminated = true;
        std::mem::take(&mut self.ballots)
    }

    fn is_eliminated(&self) -> bool {
        self.eliminated
    }
}

// What one round of tabulation decided.
#[derive(Eq, PartialEq, Debug, Clone)]
enum RoundOutcome {
    /// The leading candidate holds strictly more than half of the live votes.
    Majority(CandidateId),
    /// The remaining contenders are judged equally supported.
    Tied(Vec<CandidateId>),
    /// One candidate was eliminated. Holds the ballot transfers to each
    /// receiving candidate and the number of ballots that ran out of choices.
    Eliminated(CandidateId, Vec<(CandidateId, VoteCount)>, VoteCount),
}

/// A single election: the candidate roster and the ballots cast.
///
/// The roster capacity is fixed at construction and filled incrementally with
/// [`Election::add_candidate`]. Ballots are accepted once the roster is
/// complete and are assigned to their top-choice candidate as they arrive.
/// [`Election::select_winner`] then runs the instant-runoff rounds to
/// completion.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Election {
    rules: TallyRules,
    num_candidates: usize,
    candidates: Vec<Candidate>,
    // Arena of all accepted ballots. Candidates refer to entries by handle.
    ballots: Vec<Ballot>,
}

impl Election {
    /// Creates an election with a fixed roster capacity and the default
    /// rules.
    pub fn new(num_candidates: usize) -> Result<Election, ElectionError> {
        Election::with_rules(num_candidates, &TallyRules::DEFAULT_RULES)
    }

    pub fn with_rules(
        num_candidates: usize,
        rules: &TallyRules,
    ) -> Result<Election, ElectionError> {
        if num_candidates == 0 {
            return Err(ElectionError::EmptyElection);
        }
        Ok(Election {
            rules: rules.clone(),
            num_candidates,
            candidates: Vec::with_capacity(num_candidates),
            ballots: Vec::new(),
        })
    }

    /// The roster capacity declared at construction.
    pub fn num_candidates(&self) -> usize {
        self.num_candidates
    }

    /// Registers a candidate. The position in the roster is the candidate's
    /// column on the ballots and stays fixed for the whole run.
    pub fn add_candidate(&mut self, name: &str) -> Result<(), ElectionError> {
        if self.candidates.len() >= self.num_candidates {
            return Err(ElectionError::RosterFull);
        }
        self.candidates.push(Candidate::new(name));
        Ok(())
    }

    /// Validates and accepts one ballot, handing it to its top-choice
    /// candidate. A rejected ballot leaves the election untouched.
    pub fn add_ballot(&mut self, ranks: &[u32]) -> Result<(), ElectionError> {
        if self.candidates.len() < self.num_candidates {
            return Err(ElectionError::RosterIncomplete);
        }
        if !self.is_ballot_valid(ranks) {
            return Err(ElectionError::InvalidBallot);
        }
        let bid = BallotId(self.ballots.len());
        self.ballots.push(Ballot::new(ranks));
        self.assign_ballot(bid);
        Ok(())
    }

    // The ranks must hold exactly one entry per candidate and, once sorted,
    // read 1, 2, ..., n.
    fn is_ballot_valid(&self, ranks: &[u32]) -> bool {
        if ranks.len() != self.num_candidates {
            return false;
        }
        let mut sorted = ranks.to_vec();
        sorted.sort_unstable();
        sorted.iter().enumerate().all(|(idx, &r)| r == idx as u32 + 1)
    }

    /// Hands the ballot to its highest-ranked candidate still in the running.
    /// Positions pointing at eliminated candidates are struck out along the
    /// way so they are never visited again. Returns the receiving candidate,
    /// or `None` if the ballot ran out of choices.
    fn assign_ballot(&mut self, bid: BallotId) -> Option<CandidateId> {
        loop {
            let top = self.ballots[bid.0].top_choice()?;
            if self.candidates[top.0].is_eliminated() {
                self.ballots[bid.0].eliminate_candidate(top);
            } else {
                self.candidates[top.0].add_ballot(bid);
                return Some(top);
            }
        }
    }

    /// Runs the instant-runoff rounds to completion.
    ///
    /// Returns the sole majority winner, or the full set of tied candidates
    /// in roster order, together with the round-by-round statistics.
    pub fn select_winner(&mut self) -> Result<ElectionResult, ElectionError> {
        if self.candidates.len() < self.num_candidates {
            return Err(ElectionError::RosterIncomplete);
        }
        info!(
            "select_winner: tabulating {} ballots over {} candidates",
            self.ballots.len(),
            self.num_candidates
        );
        let mut round_stats: Vec<RoundStats> = Vec::new();
        // Every round eliminates exactly one candidate, so the roster size
        // bounds the number of rounds.
        for round in 1..=(self.num_candidates as RoundId) {
            let tally = self.tally();
            debug!("select_winner: round {} tally: {:?}", round, tally);
            let outcome = self.run_one_round(&tally);
            round_stats.push(self.round_to_stats(round, &tally, &outcome));
            match outcome {
                RoundOutcome::Majority(cid) => {
                    info!(
                        "select_winner: round {}: winner is {}",
                        round, self.candidates[cid.0].name
                    );
                    return Ok(ElectionResult {
                        winners: vec![self.candidates[cid.0].name.clone()],
                        round_stats,
                    });
                }
                RoundOutcome::Tied(cids) => {
                    let winners: Vec<String> = cids
                        .iter()
                        .map(|cid| self.candidates[cid.0].name.clone())
                        .collect();
                    info!("select_winner: round {}: tie between {:?}", round, winners);
                    return Ok(ElectionResult {
                        winners,
                        round_stats,
                    });
                }
                RoundOutcome::Eliminated(_, _, _) => {
                    // Continue with the next round.
                }
            }
        }
        Err(ElectionError::NoConvergence)
    }

    // Current vote count per candidate, in roster order. Eliminated
    // candidates hold zero.
    fn tally(&self) -> Vec<(CandidateId, VoteCount)> {
        self.candidates
            .iter()
            .enumerate()
            .map(|(idx, c)| (CandidateId(idx), c.vote_count()))
            .collect()
    }

    fn run_one_round(&mut self, tally: &[(CandidateId, VoteCount)]) -> RoundOutcome {
        let total: VoteCount = tally.iter().map(|(_, vc)| *vc).sum();
        let active: Vec<(CandidateId, VoteCount)> = tally
            .iter()
            .filter(|(cid, _)| !self.candidates[cid.0].is_eliminated())
            .cloned()
            .collect();

        // A sole remaining candidate wins by any standard.
        if active.len() == 1 {
            let (cid, _) = active[0];
            debug!("run_one_round: only one candidate left: {:?}", cid);
            return RoundOutcome::Majority(cid);
        }

        // Majority check: strictly more than half of the live votes, with
        // integer division. A candidate holding exactly half does not win.
        let (mut leader, mut leader_count) = active[0];
        for &(cid, vc) in active.iter().skip(1) {
            if vc > leader_count {
                leader = cid;
                leader_count = vc;
            }
        }
        if leader_count > VoteCount(total.0 / 2) {
            debug!(
                "run_one_round: leader {:?} holds {:?} of {:?} votes",
                leader, leader_count, total
            );
            return RoundOutcome::Majority(leader);
        }

        if self.is_tied(tally, &active, leader_count) {
            let tied: Vec<CandidateId> = active
                .iter()
                .filter(|(_, vc)| *vc == leader_count)
                .map(|(cid, _)| *cid)
                .collect();
            return RoundOutcome::Tied(tied);
        }

        // No winner yet: eliminate the weakest candidate, first by roster
        // order among equals, and redistribute its ballots.
        let (mut lowest, mut lowest_count) = active[0];
        for &(cid, vc) in active.iter().skip(1) {
            if vc < lowest_count {
                lowest = cid;
                lowest_count = vc;
            }
        }
        self.eliminate_and_transfer(lowest)
    }

    // The terminal-tie predicate, isolated so the two policies can be read
    // side by side.
    fn is_tied(
        &self,
        tally: &[(CandidateId, VoteCount)],
        active: &[(CandidateId, VoteCount)],
        leader_count: VoteCount,
    ) -> bool {
        match self.rules.tie_policy {
            TiePolicy::TrailersExhausted => tally
                .iter()
                .any(|(_, vc)| *vc < leader_count && *vc == VoteCount::EMPTY),
            TiePolicy::AllEqual => active.iter().all(|(_, vc)| *vc == leader_count),
        }
    }

    /// Drains the ballots of the eliminated candidate and hands each one to
    /// its next choice still in the running. The drain and the reassignment
    /// happen in the same pass; nothing else reads the candidate's ballots in
    /// between.
    fn eliminate_and_transfer(&mut self, cid: CandidateId) -> RoundOutcome {
        info!("Eliminating {}", self.candidates[cid.0].name);
        let drained = self.candidates[cid.0].eliminate();
        let mut transfers: Vec<(CandidateId, VoteCount)> = Vec::new();
        let mut exhausted = VoteCount::EMPTY;
        for bid in drained {
            self.ballots[bid.0].eliminate_candidate(cid);
            match self.assign_ballot(bid) {
                Some(target) => {
                    match transfers.iter_mut().find(|(tcid, _)| *tcid == target) {
                        Some((_, vc)) => *vc += VoteCount(1),
                        None => transfers.push((target, VoteCount(1))),
                    }
                }
                None => exhausted += VoteCount(1),
            }
        }
        transfers.sort_by_key(|(tcid, _)| *tcid);
        debug!(
            "eliminate_and_transfer: {:?} transfers: {:?} exhausted: {:?}",
            cid, transfers, exhausted
        );
        RoundOutcome::Eliminated(cid, transfers, exhausted)
    }

    fn round_to_stats(
        &self,
        round: RoundId,
        tally: &[(CandidateId, VoteCount)],
        outcome: &RoundOutcome,
    ) -> RoundStats {
        let mut stats = RoundStats {
            round,
            tally: tally
                .iter()
                .map(|(cid, vc)| (self.candidates[cid.0].name.clone(), vc.0))
                .collect(),
            elected: Vec::new(),
            eliminated: Vec::new(),
        };
        match outcome {
            RoundOutcome::Majority(cid) => {
                stats.elected.push(self.candidates[cid.0].name.clone());
            }
            RoundOutcome::Tied(cids) => {
                for cid in cids.iter() {
                    stats.elected.push(self.candidates[cid.0].name.clone());
                }
            }
            RoundOutcome::Eliminated(cid, transfers, exhausted) => {
                stats.eliminated.push(EliminationStats {
                    name: self.candidates[cid.0].name.clone(),
                    transfers: transfers
                        .iter()
                        .map(|(tcid, vc)| (self.candidates[tcid.0].name.clone(), vc.0))
                        .collect(),
                    exhausted: exhausted.0,
                });
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn election_3() -> Election {
        let mut election = Election::new(3).unwrap();
        election.add_candidate("Alice").unwrap();
        election.add_candidate("Bob").unwrap();
        election.add_candidate("Charlie").unwrap();
        election
    }

    fn add_ballots(election: &mut Election, ballots: &[(&[u32], usize)]) {
        for (ranks, n) in ballots {
            for _ in 0..*n {
                election.add_ballot(ranks).unwrap();
            }
        }
    }

    #[test]
    fn top_choice_round_trip() {
        let ballot = Ballot::new(&[2, 1, 3]);
        assert_eq!(ballot.top_choice(), Some(CandidateId(1)));
        let ballot = Ballot::new(&[3, 2, 1]);
        assert_eq!(ballot.top_choice(), Some(CandidateId(2)));
    }

    #[test]
    fn elimination_advances_top_choice() {
        let mut ballot = Ballot::new(&[2, 1, 3]);
        ballot.eliminate_candidate(CandidateId(1));
        assert_eq!(ballot.top_choice(), Some(CandidateId(0)));
        ballot.eliminate_candidate(CandidateId(0));
        // The survivor stays on top once everyone else is struck out.
        assert_eq!(ballot.top_choice(), Some(CandidateId(2)));
        ballot.eliminate_candidate(CandidateId(2));
        assert_eq!(ballot.top_choice(), None);
    }

    #[test]
    fn elimination_is_idempotent() {
        let mut ballot = Ballot::new(&[3, 1, 2]);
        ballot.eliminate_candidate(CandidateId(1));
        let once = ballot.clone();
        ballot.eliminate_candidate(CandidateId(1));
        assert_eq!(ballot, once);
        assert_eq!(ballot.top_choice(), Some(CandidateId(2)));
    }

    #[test]
    fn candidate_eliminate_drains_once() {
        let mut candidate = Candidate::new("Alice");
        candidate.add_ballot(BallotId(0));
        candidate.add_ballot(BallotId(4));
        assert_eq!(candidate.vote_count(), VoteCount(2));
        let drained = candidate.eliminate();
        assert_eq!(drained, vec![BallotId(0), BallotId(4)]);
        assert!(candidate.is_eliminated());
        assert_eq!(candidate.vote_count(), VoteCount::EMPTY);
        assert!(candidate.eliminate().is_empty());
    }

    #[test]
    fn majority_in_first_round() {
        let mut election = election_3();
        add_ballots(
            &mut election,
            &[(&[1, 2, 3], 6), (&[2, 1, 3], 2), (&[2, 3, 1], 2)],
        );
        let res = election.select_winner().unwrap();
        assert_eq!(res.winners, vec!["Alice".to_string()]);
        // 6 of 10 votes is a majority outright: no elimination happens.
        assert_eq!(res.round_stats.len(), 1);
        assert_eq!(
            res.round_stats[0].tally,
            vec![
                ("Alice".to_string(), 6),
                ("Bob".to_string(), 2),
                ("Charlie".to_string(), 2)
            ]
        );
        assert!(res.round_stats[0].eliminated.is_empty());
    }

    #[test]
    fn exact_half_is_not_a_majority() {
        let mut election = election_3();
        add_ballots(
            &mut election,
            &[(&[1, 2, 3], 4), (&[2, 1, 3], 3), (&[3, 2, 1], 1)],
        );
        let res = election.select_winner().unwrap();
        // Alice holds 4 of 8 in round one, which is not strictly more than
        // half, so Charlie is eliminated. His ballot brings Bob level at 4
        // and the tie rule decides.
        assert_eq!(res.round_stats.len(), 2);
        assert_eq!(res.winners, vec!["Alice".to_string(), "Bob".to_string()]);
    }

    #[test]
    fn runoff_redistributes_to_next_choice() {
        let mut election = election_3();
        add_ballots(
            &mut election,
            &[(&[1, 2, 3], 3), (&[2, 1, 3], 3), (&[2, 3, 1], 2)],
        );
        let res = election.select_winner().unwrap();
        assert_eq!(res.winners, vec!["Alice".to_string()]);
        assert_eq!(res.round_stats.len(), 2);
        let elim = &res.round_stats[0].eliminated;
        assert_eq!(elim.len(), 1);
        assert_eq!(elim[0].name, "Charlie");
        assert_eq!(elim[0].transfers, vec![("Alice".to_string(), 2)]);
        assert_eq!(elim[0].exhausted, 0);
        assert_eq!(
            res.round_stats[1].tally,
            vec![
                ("Alice".to_string(), 5),
                ("Bob".to_string(), 3),
                ("Charlie".to_string(), 0)
            ]
        );
    }

    #[test]
    fn equal_leaders_over_drained_field_are_tied() {
        let mut election = election_3();
        add_ballots(
            &mut election,
            &[
                (&[1, 2, 3], 4),
                (&[2, 1, 3], 4),
                (&[2, 3, 1], 1),
                (&[3, 2, 1], 1),
            ],
        );
        let res = election.select_winner().unwrap();
        // Charlie's two ballots split between Alice and Bob, leaving them at
        // five votes each with no ballot able to move. Both names come back,
        // in roster order.
        assert_eq!(res.winners, vec!["Alice".to_string(), "Bob".to_string()]);
        assert_eq!(res.round_stats.len(), 2);
        let elim = &res.round_stats[0].eliminated;
        assert_eq!(elim[0].name, "Charlie");
        assert_eq!(
            elim[0].transfers,
            vec![("Alice".to_string(), 1), ("Bob".to_string(), 1)]
        );
    }

    #[test]
    fn invalid_ballots_are_rejected() {
        let mut election = election_3();
        election.add_ballot(&[1, 2, 3]).unwrap();
        // Wrong length, duplicate rank, out-of-range values, gaps.
        assert_eq!(election.add_ballot(&[1, 2]), Err(ElectionError::InvalidBallot));
        assert_eq!(
            election.add_ballot(&[1, 1, 2]),
            Err(ElectionError::InvalidBallot)
        );
        assert_eq!(
            election.add_ballot(&[0, 1, 2]),
            Err(ElectionError::InvalidBallot)
        );
        assert_eq!(
            election.add_ballot(&[2, 3, 4]),
            Err(ElectionError::InvalidBallot)
        );
        // The rejected ballots did not move any vote counts.
        let res = election.select_winner().unwrap();
        assert_eq!(
            res.round_stats[0].tally,
            vec![
                ("Alice".to_string(), 1),
                ("Bob".to_string(), 0),
                ("Charlie".to_string(), 0)
            ]
        );
    }

    #[test]
    fn setup_errors() {
        assert_eq!(Election::new(0).err(), Some(ElectionError::EmptyElection));
        let mut election = Election::new(1).unwrap();
        election.add_candidate("Alice").unwrap();
        assert_eq!(
            election.add_candidate("Bob"),
            Err(ElectionError::RosterFull)
        );
    }

    #[test]
    fn ballots_wait_for_the_full_roster() {
        let mut election = Election::new(2).unwrap();
        election.add_candidate("Alice").unwrap();
        assert_eq!(
            election.add_ballot(&[1, 2]),
            Err(ElectionError::RosterIncomplete)
        );
        assert_eq!(
            election.select_winner().err(),
            Some(ElectionError::RosterIncomplete)
        );
    }

    #[test]
    fn strict_tie_policy_stops_on_equal_counts() {
        let rules = TallyRules {
            tie_policy: TiePolicy::AllEqual,
        };
        let mut election = Election::with_rules(2, &rules).unwrap();
        election.add_candidate("Alice").unwrap();
        election.add_candidate("Bob").unwrap();
        add_ballots(&mut election, &[(&[1, 2], 2), (&[2, 1], 2)]);
        let res = election.select_winner().unwrap();
        assert_eq!(res.winners, vec!["Alice".to_string(), "Bob".to_string()]);
        assert_eq!(res.round_stats.len(), 1);
    }

    #[test]
    fn default_tie_policy_keeps_eliminating_on_equal_counts() {
        // Same election as above under the default policy: the first
        // candidate by roster order is eliminated and her ballots carry Bob
        // over the majority line.
        let mut election = Election::new(2).unwrap();
        election.add_candidate("Alice").unwrap();
        election.add_candidate("Bob").unwrap();
        add_ballots(&mut election, &[(&[1, 2], 2), (&[2, 1], 2)]);
        let res = election.select_winner().unwrap();
        assert_eq!(res.winners, vec!["Bob".to_string()]);
        assert_eq!(res.round_stats.len(), 2);
    }

    #[test]
    fn transfers_spread_over_several_candidates() {
        let mut election = Election::new(4).unwrap();
        election.add_candidate("Alice").unwrap();
        election.add_candidate("Bob").unwrap();
        election.add_candidate("Charlie").unwrap();
        election.add_candidate("Dan").unwrap();
        add_ballots(
            &mut election,
            &[
                (&[1, 2, 3, 4], 4),
                (&[2, 1, 3, 4], 4),
                (&[4, 3, 2, 1], 4),
                (&[2, 4, 1, 3], 1),
                (&[4, 2, 1, 3], 1),
                (&[3, 4, 1, 2], 1),
            ],
        );
        let res = election.select_winner().unwrap();
        // Charlie goes out first and his three ballots split between the
        // survivors, who end up level at five votes each.
        let elim = &res.round_stats[0].eliminated;
        assert_eq!(elim[0].name, "Charlie");
        assert_eq!(
            elim[0].transfers,
            vec![
                ("Alice".to_string(), 1),
                ("Bob".to_string(), 1),
                ("Dan".to_string(), 1)
            ]
        );
        assert_eq!(
            res.winners,
            vec!["Alice".to_string(), "Bob".to_string(), "Dan".to_string()]
        );
        assert_eq!(res.round_stats.len(), 2);
    }
}

/*!

This is the long-form manual for `instant_runoff` and `irvtab`.

## The ballot model

An election has a fixed roster of `n` candidates. Every ballot ranks all of
them: it is a vector with one entry per candidate position, and the value at a
position is the rank the voter gave to that candidate. `1` is the most
preferred. A well-formed ballot is a permutation of the numbers `1` to `n`,
so there are no ties, gaps or duplicates within one ballot.

For example, with the candidates `Alice`, `Bob` and `Charlie` (in that
order), the ballot `2 1 3` puts `Bob` first, `Alice` second and `Charlie`
last.

## The algorithm

Tabulation proceeds in rounds:

1. Every ballot counts for its top choice: the highest-preferred candidate
   still in the running.
2. If the leading candidate holds strictly more than half of the live votes,
   that candidate wins and the count stops. Exactly half is not enough.
3. If the remaining contenders are judged equally supported (see
   [Ties](#ties) below), all the candidates holding the maximum count are
   returned together and the count stops.
4. Otherwise the candidate with the fewest votes is eliminated (first by
   roster order among equals). Each of its ballots moves to the next ranked
   candidate still in the running, and a new round starts.

A round always removes exactly one candidate, so the process finishes after
at most `n` rounds. A sole remaining candidate is declared the winner
outright.

## Ties

Two tie policies are available through
[`TallyRules`](crate::TallyRules):

* [`TiePolicy::TrailersExhausted`](crate::TiePolicy) (the default): the
  candidates holding the maximum count are declared tied as soon as some
  trailing candidate is down to zero votes. Eliminated candidates hold zero
  votes, so once the field has been thinned the check fires whenever the
  majority test fails.
* [`TiePolicy::AllEqual`](crate::TiePolicy): a tie is declared only when
  every candidate still in the running holds exactly the same count. This is
  the stricter, symmetric reading of "equally supported".

The two policies agree on most elections but can diverge when candidates are
level early: under the default policy a perfectly split two-candidate
election is resolved by eliminating the first candidate in roster order,
while the strict policy reports the tie.

## Library usage

```
use instant_runoff::{Election, ElectionError};

let mut election = Election::new(3)?;
election.add_candidate("Alice")?;
election.add_candidate("Bob")?;
election.add_candidate("Charlie")?;

election.add_ballot(&[1, 2, 3])?;
election.add_ballot(&[1, 3, 2])?;
election.add_ballot(&[2, 1, 3])?;

let result = election.select_winner()?;
assert_eq!(result.winners, vec!["Alice".to_string()]);
# Ok::<(), ElectionError>(())
```

[`Election::select_winner`](crate::Election::select_winner) also returns the
round-by-round statistics: the tally per candidate, and for every eliminated
candidate the number of ballots transferred to each receiver.

## The election file format (`irvtab`)

The command line program reads a plain text file laid out as follows:

```text
3
Alice
Bob
Charlie
1 2 3
2 1 3
3 1 2

```

1. The first line holds the number of candidates.
2. The following lines hold the candidate names, one per line, in the same
   order as the columns on the ballots.
3. The remaining lines hold the ballots, one per line, as whitespace
   separated integers. Reading stops at the first blank line or at the end of
   the file.

The whole file is rejected on the first malformed or invalid ballot line.

*/

/*!

This is the long-form manual for `pairwise_voting` and `pairvote`.

## Methods

### Ranked Pairs (`rankedPairs`, also accepted as `tideman`)

A single winner method. All the pairs of candidates are compared: the pair
(A, B) is a strong pair when more voters prefer A to B than B to A, and its
strength is the difference between these two counts. The strong pairs are then
locked in a graph, from the strongest to the weakest. A pair that would create
a cycle with the pairs already locked is skipped. The winner is the candidate
that is not defeated by any locked pair.

If several pairs are equally strong, the tie-break order decides which one is
considered first. The summary then lists the tied pairs for that round.

### Schulze STV (`schulzeSTV`)

A proportional method for multiple winners. For every set of candidates one
larger than the number of seats, and every candidate `c` of this set, the
method computes how strongly the voters can elect all the other members of
the set against `c` (the strength of the vote management). These strengths
define a graph over the possible sets of winners, which is reduced to its
undominated set.

The number of sets grows quickly with the number of candidates. For example,
with 20 candidates and 5 seats, 38760 sets of 6 candidates are examined, each
of them six times. Use `maxSubsets` to fail early instead.

With one seat, Schulze STV elects the same candidate as the Schulze method.

Both methods elect the Condorcet winner directly when there is one.

## Ballots

Lower ranks are preferred, and candidates sharing a rank are equally
preferred. The candidates missing from a ballot are placed together after all
the candidates ranked on this ballot.

Ballots can be written directly in the election description, either with
explicit ranks:

```text
{"ranking": {"Anna": 1, "Bob": 2, "Clara": 2}, "count": 3}
```

or as ordered groups of equally preferred candidates:

```text
{"order": [["Anna"], ["Bob", "Clara"]], "count": 3}
```

The `count` is the number of identical ballots (1 if absent).

### `csv` ballot files

One ballot per row. Each cell is one rank, in order of preference. A cell can
hold several candidates separated by `=` (or the `tieDelimiter` option) to
rank them equally. Empty cells are skipped.

```text
count,choice 1,choice 2,choice 3
20,A,B=C,
10,C,,A
```

Options (all 1-based and optional):
- `countColumnIndex`: the column with the counts. Every row counts once if absent.
- `firstVoteColumnIndex`: the first column with a choice. Defaults to the
  column following the count column, or the first column.
- `firstVoteRowIndex`: the first row with a ballot, to skip headers.

### `json` ballot files

An array of ballots, written as in the election description.

## Configuration

```text
{
  "outputSettings": {"contestName": "Board election", "contestDate": "2022-10-01"},
  "rules": {
    "method": "schulzeSTV",
    "numberOfWinners": 2,
    "tiebreakMode": "random",
    "randomSeed": "42"
  },
  "candidates": [{"name": "Anna"}, {"name": "Bob"}, {"name": "Clara", "excluded": true}],
  "ballots": [{"order": [["Anna"], ["Bob"]], "count": 2}],
  "ballotFiles": [{"provider": "csv", "filePath": "ballots.csv", "countColumnIndex": 1}]
}
```

The paths of the ballot files are relative to the configuration file.

If `candidates` is provided, the ballots may only name these candidates. The
excluded candidates are removed from all the ballots before tabulating.

Rules:
- `method`: `rankedPairs` (default) or `schulzeSTV`
- `numberOfWinners`: 1 by default. Ranked Pairs only accepts 1.
- `tiebreakMode`:
  - `useCandidateOrder` (default): the candidates are ordered by name
  - `random`: a permutation generated from `randomSeed` (a string containing an integer)
  - `unseeded`: a permutation generated from a fresh seed. The seed is reported
    in the summary as `tieBreakSeed` so that the outcome can be reproduced.
- `completionMode`: how the ballots with equally ranked candidates are
  handled by Schulze STV.
  - `refinement` (default): the weight of a ballot that does not take sides
    goes to the strict preferences compatible with it, in proportion to the
    ballots that do take sides.
  - `projection`: any ballot that takes a side on at least one of these
    candidates contributes.
- `maxFlowIterations` (default 1000) and `convergenceTolerance` (default 1e-6):
  the iterative computation of the strength of the vote management stops when
  two successive values are closer than the tolerance, and fails after the
  given number of iterations.
- `maxSubsets`: fail instead of examining more sets of candidates.
- `parallel`: examine the sets concurrently (requires the `parallel` feature).

The command line options `--method`, `--winners` and `--seed` override the
rules of the configuration. A configuration file is not required:

```bash
pairvote --input ballots.csv --method schulzeSTV --winners 2
```

## Summary

The summary is written in JSON. Besides the winners, it contains the table of
all the pairwise comparisons (`pairs`), the strong pairs, the rounds of Ranked
Pairs or the reduction steps of Schulze STV (`actions`), and the tie-break
order if it was used. With `--reference`, the summary is compared with a
previous summary and the differences are printed.

 */

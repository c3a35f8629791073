/*!

This is the long-form manual for `ballot_components` and the `tally` program.

## Voting methods

Every component of a ballot names a voting method with a `type` and a
`version`. The following methods are available, all at version `v1`:
* `YesNo` a question answered with yes or no
* `FirstPastThePost` pick one candidate
* `RankedChoice` rank the candidates, counted with instant-runoff
* `ApprovalVote` approve any number of candidates

Voters may always answer `null` to abstain. Abstentions and components left
out of a vote are counted as non-responses.

### `YesNo`

No options. The options of the component are always `{}`.

Submitted values: `true`, `false` or `null`.

Results: the number of `yes`, `no` and `abstained` votes.

### `FirstPastThePost`

Options:
 - `candidates` (array of distinct non-empty strings, at least 2, required)

Submitted values: one of the candidates, or `null`.

Results: the count of every candidate, in the order of the options, and the
`winners`: all the candidates with the highest count. Ties are reported with
`tie: true` and are never broken.

### `ApprovalVote`

Options:
 - `candidates` (as above)
 - `max_approvals` (integer, optional): the largest number of candidates one
   voter may approve. Defaults to the number of candidates.

Submitted values: an array of distinct candidates, or `null`.

Results: as for `FirstPastThePost`, one vote counting for every approved
candidate.

### `RankedChoice`

Options:
 - `candidates` (as above)
 - `max_rankings` (integer, optional): the longest ranking a voter may submit.
   Defaults to the number of candidates.

Submitted values: an array of distinct candidates, most preferred first, or
`null`. Rankings may be partial.

Results are computed with instant-runoff. Each round counts the first
preference of every ballot among the candidates still running. A candidate
with a strict majority of the active ballots wins. Otherwise the last
candidate is eliminated and its ballots move to their next preference still
running. A ballot without such a preference is exhausted and leaves the count.

Every round reports the tally, the number of active ballots, the majority
threshold and, for the eliminated candidates, the transfers to the other
candidates and the number of exhausted ballots.

When several candidates share the lowest count, they are eliminated together
if they all have no vote, or if their votes added together stay below the next
candidate. In any other case, the order of elimination could change the
winner: counting stops and the outcome is an `elimination_tie` listing the
tied candidates and the round. Two candidates left with the same count end
the same way.

## Vote codes

Secret ballots hand out anonymous codes: `{"quantity": n}` with `n` between 1
and 10000. Public ballots link every code to a voter: `{"voters": [..]}`
with between 1 and 10000 distinct voters, none of them holding a code
already. Codes have 12 letters and digits.

## Snapshot files

The `tally` program reads a JSON snapshot of one ballot:

```text
{
  "outputSettings": {"contestName": "Annual meeting", "resultsFile": "summary.json",
                     "csvFile": "votes.csv", "voteIdLabel": "Code"},
  "ballot": {"id": 1, "electionId": 1, "title": "Board", "isSecret": true},
  "components": [
    {"id": 1, "type": "YesNo", "version": "v1", "title": "Budget", "order": 1},
    {"id": 2, "type": "RankedChoice", "version": "v1", "title": "Chair", "order": 2,
     "options": {"candidates": ["Anna", "Bob", "Clara"]}}
  ],
  "votes": [
    {"id": "Z3k9", "values": {"1": true, "2": ["Anna", "Clara"]}},
    {"id": "p0Qa", "values": {"1": null}}
  ]
}
```

`resultsFile`, `csvFile` and `voteIdLabel` are optional. Component fields
`description`, `order`, `options`, `active` and `finished` are optional.
Every stored value must be one a voter could have submitted, otherwise the
tally stops with a data integrity error naming the vote and the component.

The summary written by `tally` looks as follows:

```text
{
  "config": {"contest": "Annual meeting", "ballot": "Board", "components": 2, "castVotes": 2},
  "results": {
    "1": {"results": {"yes": 1, "no": 0, "abstained": 1}, "title": "Budget", ...},
    "2": {"results": {"rounds": [...], "outcome": {"status": "elected", "winner": "Anna"}, ...}, ...}
  }
}
```

Pass `--reference` with a previous summary to check that the results did not
change. The differences are printed line by line.

 */

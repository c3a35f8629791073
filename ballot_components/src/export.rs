use log::debug;
use serde::Serialize;
use snafu::prelude::*;

use crate::config::*;
use crate::error::{BallotResult, CsvFlushSnafu, CsvWriteSnafu};
use crate::registry::Registry;
use crate::results::in_ballot_order;

/// The label of the first column when the caller does not provide one.
pub const DEFAULT_VOTE_ID_LABEL: &str = "Vote ID";

/// One row per cast vote, one column per component.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ResultsTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Builds the table of the values of every cast vote.
///
/// The header is the vote id label followed by the component titles in ballot
/// order. Rows keep the order of `votes`, and every row has exactly one cell
/// per header column.
pub fn results_table(
    registry: &Registry,
    components: &[BallotComponent],
    votes: &[Vote],
    vote_id_label: &str,
) -> BallotResult<ResultsTable> {
    let ordered = in_ballot_order(components);
    let mut methods = Vec::with_capacity(ordered.len());
    for c in ordered.iter() {
        methods.push((c.id, registry.resolve_component(c)?));
    }

    let mut header: Vec<String> = vec![vote_id_label.to_string()];
    header.extend(ordered.iter().map(|c| c.title.clone()));

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(votes.len());
    for vote in votes.iter() {
        let mut row: Vec<String> = Vec::with_capacity(header.len());
        row.push(vote.id.to_string());
        for (cid, method) in methods.iter() {
            row.push(method.values_to_csv(vote, *cid)?);
        }
        rows.push(row);
    }
    debug!(
        "results_table: {} columns, {} rows",
        header.len(),
        rows.len()
    );
    Ok(ResultsTable { header, rows })
}

impl ResultsTable {
    /// Renders the table as CSV bytes.
    pub fn to_csv(&self) -> BallotResult<Vec<u8>> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(&self.header).context(CsvWriteSnafu {})?;
        for row in self.rows.iter() {
            wtr.write_record(row).context(CsvWriteSnafu {})?;
        }
        wtr.into_inner()
            .map_err(|e| e.into_error())
            .context(CsvFlushSnafu {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::methods::tests::{component, ranked};
    use serde_json::json;

    fn components() -> Vec<BallotComponent> {
        let mut rc = component(
            4,
            VotingMethodKind::RankedChoice,
            json!({"candidates": ["A", "B", "C"]}),
        );
        rc.order = 2;
        rc.title = "Chair".to_string();
        let mut yn = component(9, VotingMethodKind::YesNo, json!({}));
        yn.order = 1;
        yn.title = "Budget, 2027".to_string();
        let mut av = component(1, VotingMethodKind::ApprovalVote, json!({"candidates": ["A", "B"]}));
        av.order = 3;
        av.title = "Committee".to_string();
        vec![rc, yn, av]
    }

    fn votes() -> Vec<Vote> {
        vec![
            Vote {
                id: VoteId("zz01".to_string()),
                ballot_id: BallotId(1),
                voter: None,
                cast: true,
                values: [
                    (ComponentId(4), ranked(&["C", "A"])),
                    (ComponentId(9), VoteValue::Boolean(false)),
                    (ComponentId(1), VoteValue::Set(vec!["A".into(), "B".into()])),
                ]
                .into_iter()
                .collect(),
            },
            Vote {
                id: VoteId("aa02".to_string()),
                ballot_id: BallotId(1),
                voter: None,
                cast: true,
                values: [(ComponentId(9), VoteValue::Abstain)].into_iter().collect(),
            },
        ]
    }

    #[test]
    fn header_and_rows_are_aligned() {
        let r = Registry::builtin();
        let t = results_table(&r, &components(), &votes(), DEFAULT_VOTE_ID_LABEL).unwrap();
        assert_eq!(t.header, vec!["Vote ID", "Budget, 2027", "Chair", "Committee"]);
        assert_eq!(t.rows.len(), 2);
        for row in t.rows.iter() {
            assert_eq!(row.len(), t.header.len());
        }
        assert_eq!(t.rows[0], vec!["zz01", "No", "C;A", "A;B"]);
        assert_eq!(t.rows[1], vec!["aa02", "", "", ""]);
    }

    #[test]
    fn csv_quotes_cells() {
        let r = Registry::builtin();
        let t = results_table(&r, &components(), &votes(), "Code").unwrap();
        let bytes = t.to_csv().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Code,\"Budget, 2027\",Chair,Committee");
        assert_eq!(lines[1], "zz01,No,C;A,A;B");
        assert_eq!(lines[2], "aa02,,,");
    }

    #[test]
    fn no_votes_gives_a_header_only() {
        let r = Registry::builtin();
        let t = results_table(&r, &components(), &[], "Code").unwrap();
        assert_eq!(t.header.len(), 4);
        assert!(t.rows.is_empty());
    }
}

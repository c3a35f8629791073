pub mod snapshot;

use log::{debug, info, warn};

use ballot_components::builder::Builder;
use ballot_components::export::DEFAULT_VOTE_ID_LABEL;
use ballot_components::service::BallotService;
use ballot_components::store::{MemoryStore, VoteStore};
use ballot_components::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tally::snapshot::*;

#[derive(Debug, Snafu)]
pub enum TallyError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing summary"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error tallying the ballot"))]
    Tally { source: BallotError },
    #[snafu(display("Difference detected between calculated summary and reference summary"))]
    ReferenceMismatch {},

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TallyResult<T> = Result<T, TallyError>;

pub fn run(args: &Args) -> TallyResult<()> {
    if args.list_methods {
        let tree = Registry::builtin().component_tree();
        let pretty = serde_json::to_string_pretty(&tree).context(WritingJsonSnafu {})?;
        println!("{}", pretty);
        return Ok(());
    }
    let snapshot_path = match args.snapshot.clone() {
        Some(p) => p,
        None => whatever!("No snapshot provided, use --snapshot"),
    };
    run_tally(
        &snapshot_path,
        args.out.clone(),
        args.csv.clone(),
        args.reference.clone(),
        args.vote_id_label.clone(),
    )?;
    Ok(())
}

pub fn read_snapshot(path: &str) -> TallyResult<Snapshot> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(&contents).context(ParsingJsonSnafu { path })
}

pub fn read_summary(path: &str) -> TallyResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

/// Puts the snapshot in a memory store. Every stored value is checked against
/// the rules of its component.
pub fn load_snapshot(snapshot: &Snapshot) -> BallotResult<BallotService<MemoryStore>> {
    let ballot = snapshot.ballot.to_ballot();
    let mut builder = Builder::new(&ballot);
    for sc in snapshot.components.iter() {
        builder = builder.component(sc.to_component(ballot.id)?)?;
    }
    for v in snapshot.votes.iter() {
        builder.add_vote(&v.id, v.voter.as_deref(), &v.values)?;
    }
    builder.build()
}

fn build_summary_js(
    snapshot: &Snapshot,
    results: &BallotResults,
    cast_votes: usize,
) -> TallyResult<JSValue> {
    let c = OutputConfig {
        contest: snapshot.output_settings.contest_name.clone(),
        ballot: snapshot.ballot.title.clone(),
        components: results.len(),
        cast_votes,
    };
    let results_js = serde_json::to_value(results).context(WritingJsonSnafu {})?;
    Ok(json!({
        "config": c,
        "results": results_js }))
}

// Paths in the snapshot are relative to the snapshot itself.
fn relative_to(snapshot_path: &str, p: &str) -> String {
    let path = Path::new(p);
    if p == "stdout" || path.is_absolute() {
        return p.to_string();
    }
    let root: PathBuf = Path::new(snapshot_path)
        .parent()
        .map(|d| d.to_path_buf())
        .unwrap_or_default();
    root.join(path).display().to_string()
}

/// Tallies a snapshot and returns the summary.
///
/// Command line paths take precedence over the ones of the snapshot.
pub fn run_tally(
    snapshot_path: &str,
    out: Option<String>,
    csv: Option<String>,
    check_summary_path: Option<String>,
    vote_id_label: Option<String>,
) -> TallyResult<JSValue> {
    let snapshot = read_snapshot(snapshot_path)?;
    info!(
        "snapshot: {} components, {} votes",
        snapshot.components.len(),
        snapshot.votes.len()
    );
    let settings = &snapshot.output_settings;

    let service = load_snapshot(&snapshot).context(TallySnafu {})?;
    let ballot_id = BallotId(snapshot.ballot.id);
    let results = service
        .calculate_results(ballot_id)
        .context(TallySnafu {})?;
    let cast_votes = service
        .store()
        .cast_votes(ballot_id)
        .context(TallySnafu {})?
        .len();

    let result_js = build_summary_js(&snapshot, &results, cast_votes)?;
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(WritingJsonSnafu {})?;

    let out_path = out.or_else(|| {
        settings
            .results_file
            .as_ref()
            .map(|p| relative_to(snapshot_path, p))
    });
    match out_path.as_deref() {
        None | Some("stdout") => println!("{}", pretty_js_stats),
        Some(p) => {
            info!("Writing summary to {}", p);
            fs::write(p, &pretty_js_stats).context(WritingFileSnafu { path: p })?;
        }
    }

    let csv_path = csv.or_else(|| {
        settings
            .csv_file
            .as_ref()
            .map(|p| relative_to(snapshot_path, p))
    });
    if let Some(p) = csv_path {
        let label = vote_id_label
            .or_else(|| settings.vote_id_label.clone())
            .unwrap_or_else(|| DEFAULT_VOTE_ID_LABEL.to_string());
        let bytes = service
            .export_results_csv(ballot_id, &label)
            .context(TallySnafu {})?;
        info!("Writing votes table to {}", p);
        fs::write(&p, bytes).context(WritingFileSnafu { path: p.clone() })?;
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(&summary_p)?;
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            return ReferenceMismatchSnafu {}.fail();
        }
    }

    Ok(result_js)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("tally-{}-{}", std::process::id(), name))
            .display()
            .to_string()
    }

    fn snapshot_js() -> JSValue {
        json!({
            "outputSettings": {"contestName": "Annual meeting"},
            "ballot": {"id": 1, "electionId": 3, "title": "Board", "isSecret": true},
            "components": [
                {"id": 2, "type": "RankedChoice", "version": "v1", "title": "Chair", "order": 2,
                 "options": {"candidates": ["Anna", "Bob", "Clara"]}},
                {"id": 1, "type": "YesNo", "version": "v1", "title": "Budget", "order": 1}
            ],
            "votes": [
                {"id": "c1", "values": {"1": true, "2": ["Anna", "Bob"]}},
                {"id": "c2", "values": {"1": false, "2": ["Bob", "Clara"]}},
                {"id": "c3", "values": {"1": null, "2": ["Clara", "Anna"]}},
                {"id": "c4", "values": {"2": ["Anna"]}},
                {"id": "c5", "values": {"2": ["Bob"]}}
            ]
        })
    }

    fn write_snapshot(name: &str, js: &JSValue) -> String {
        let p = temp_path(name);
        fs::write(&p, serde_json::to_string_pretty(js).unwrap()).unwrap();
        p
    }

    #[test]
    fn summary_of_a_snapshot() {
        init();
        let snap = write_snapshot("summary.json", &snapshot_js());
        let out = temp_path("summary-out.json");
        let csv = temp_path("summary-out.csv");
        let js = run_tally(&snap, Some(out.clone()), Some(csv.clone()), None, None).unwrap();

        assert_eq!(
            js["config"],
            json!({"contest": "Annual meeting", "ballot": "Board", "components": 2, "castVotes": 5})
        );
        assert_eq!(
            js["results"]["1"]["results"],
            json!({"yes": 1, "no": 1, "abstained": 3})
        );
        let chair = &js["results"]["2"]["results"];
        assert_eq!(chair["outcome"], json!({"status": "elected", "winner": "Anna"}));
        assert_eq!(chair["rounds"].as_array().unwrap().len(), 2);

        let written: JSValue = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written, js);
        let table = fs::read_to_string(&csv).unwrap();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines[0], "Vote ID,Budget,Chair");
        assert_eq!(lines[1], "c1,Yes,Anna;Bob");
        assert_eq!(lines[4], "c4,,Anna");
    }

    #[test]
    fn reference_summary_is_checked() {
        init();
        let snap = write_snapshot("reference.json", &snapshot_js());
        let out = temp_path("reference-out.json");
        let js = run_tally(&snap, Some(out.clone()), None, None, None).unwrap();

        // Same results: the check passes.
        assert!(run_tally(&snap, Some(out.clone()), None, Some(out.clone()), None).is_ok());

        let mut changed = js.clone();
        changed["config"]["castVotes"] = json!(6);
        let reference = temp_path("reference-changed.json");
        fs::write(&reference, serde_json::to_string_pretty(&changed).unwrap()).unwrap();
        let err = run_tally(&snap, Some(out), None, Some(reference), None).unwrap_err();
        assert!(matches!(err, TallyError::ReferenceMismatch {}));
    }

    #[test]
    fn unknown_voting_method_is_reported() {
        init();
        let mut js = snapshot_js();
        js["components"][1]["type"] = json!("Borda");
        let snap = write_snapshot("unknown.json", &js);
        let err = run_tally(&snap, Some(temp_path("unknown-out.json")), None, None, None)
            .unwrap_err();
        match err {
            TallyError::Tally { source } => assert!(source.is_not_found()),
            x => panic!("unexpected error {:?}", x),
        }
    }

    #[test]
    fn invalid_stored_vote_is_a_data_integrity_fault() {
        init();
        let mut js = snapshot_js();
        js["votes"][2]["values"]["2"] = json!(["Clara", "Zoe"]);
        let snap = write_snapshot("integrity.json", &js);
        let err = run_tally(&snap, Some(temp_path("integrity-out.json")), None, None, None)
            .unwrap_err();
        match err {
            TallyError::Tally {
                source: BallotError::DataIntegrity {
                    component, vote, ..
                },
            } => {
                assert_eq!(component, ComponentId(2));
                assert_eq!(vote, Some(VoteId("c3".to_string())));
            }
            x => panic!("unexpected error {:?}", x),
        }
    }

    #[test]
    fn missing_snapshot_file() {
        let err = read_snapshot(&temp_path("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, TallyError::OpeningJson { .. }));
    }

    #[test]
    fn snapshot_paths_are_relative_to_the_snapshot() {
        assert_eq!(relative_to("/data/snap.json", "out.json"), "/data/out.json");
        assert_eq!(relative_to("/data/snap.json", "/tmp/out.json"), "/tmp/out.json");
        assert_eq!(relative_to("/data/snap.json", "stdout"), "stdout");
    }
}

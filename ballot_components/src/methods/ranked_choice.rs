use log::{debug, info};

use std::{
    collections::{HashMap, HashSet},
    ops::{Add, AddAssign},
};

use serde_json::Value as JSValue;

use crate::config::*;
use crate::error::{integrity, BallotResult};
use crate::methods::{
    candidate_options, candidates_rules, cap_rules, decode_string_list, wrong_shape,
    BallotComponentType, MethodSettings, MethodStrings,
};
use crate::validation::{self, RuleSet};

/// Rank the candidates. Counted with instant-runoff.
#[derive(Debug, Clone)]
pub struct RankedChoice {
    settings: MethodSettings,
}

impl RankedChoice {
    pub fn v1() -> RankedChoice {
        RankedChoice {
            settings: MethodSettings {
                needs_options: true,
                options_validator: candidates_rules().field("options.max_rankings", cap_rules()),
                preset_options: JSValue::Null,
                form: Some("ranked-choice.v1"),
            },
        }
    }
}

impl BallotComponentType for RankedChoice {
    fn kind(&self) -> VotingMethodKind {
        VotingMethodKind::RankedChoice
    }

    fn settings(&self) -> &MethodSettings {
        &self.settings
    }

    fn strings(&self) -> MethodStrings {
        MethodStrings {
            name: "Ranked choice",
            description: "Voters rank the candidates. The last candidate is eliminated and its ballots move to their next choice until a candidate holds a majority.",
            instructions: "Rank the candidates, starting with your favourite.",
        }
    }

    fn submission_validator(
        &self,
        component: &BallotComponent,
        _ballot: &Ballot,
    ) -> BallotResult<RuleSet> {
        let opts = candidate_options(component)?;
        let max_rankings = max_rankings(opts.max_rankings, &opts.candidates);
        Ok(RuleSet::new().field(
            component.id.to_string(),
            vec![
                validation::present_key(),
                validation::nullable(),
                validation::array(),
                validation::min(1),
                validation::max(max_rankings as i64),
                validation::distinct(),
                validation::each_one_of(opts.candidates),
            ],
        ))
    }

    fn decode_value(
        &self,
        _component: &BallotComponent,
        raw: &JSValue,
    ) -> Result<VoteValue, String> {
        if raw.is_null() {
            return Ok(VoteValue::Abstain);
        }
        decode_string_list(raw).map(VoteValue::Ranked)
    }

    fn calculate_results(
        &self,
        votes: &[Vote],
        component: &BallotComponent,
    ) -> BallotResult<ComponentResults> {
        let opts = candidate_options(component)?;
        let limit = max_rankings(opts.max_rankings, &opts.candidates);
        let candidate_set: HashSet<&String> = opts.candidates.iter().collect();

        let mut rankings: Vec<&[String]> = Vec::new();
        let mut abstained: u64 = 0;
        for vote in votes.iter() {
            match vote.value_for(component.id) {
                None | Some(VoteValue::Abstain) => abstained += 1,
                Some(VoteValue::Ranked(ranks)) => {
                    check_ranking(ranks, &candidate_set, limit)
                        .map_err(|msg| integrity(component.id, Some(&vote.id), msg))?;
                    rankings.push(ranks);
                }
                Some(x) => return Err(wrong_shape(component.id, vote, "ranking", x)),
            }
        }

        let res = run_voting_stats(&opts.candidates, &rankings, abstained)
            .map_err(|e| integrity(component.id, None, e.to_string()))?;
        Ok(ComponentResults::RankedChoice(res))
    }

    fn values_to_csv(&self, vote: &Vote, component_id: ComponentId) -> BallotResult<String> {
        match vote.value_for(component_id) {
            Some(VoteValue::Ranked(ranks)) => Ok(ranks.join(";")),
            None | Some(VoteValue::Abstain) => Ok(String::new()),
            Some(x) => Err(wrong_shape(component_id, vote, "ranking", x)),
        }
    }
}

fn max_rankings(configured: Option<u32>, candidates: &[String]) -> usize {
    configured
        .map(|m| (m as usize).min(candidates.len()))
        .unwrap_or(candidates.len())
}

// A stored ranking must be something the submission validator accepts.
fn check_ranking(
    ranks: &[String],
    candidates: &HashSet<&String>,
    limit: usize,
) -> Result<(), String> {
    if ranks.is_empty() {
        return Err("empty ranking".to_string());
    }
    if ranks.len() > limit {
        return Err(format!("{} ranks, at most {} allowed", ranks.len(), limit));
    }
    let mut seen: HashSet<&String> = HashSet::new();
    for c in ranks.iter() {
        if !candidates.contains(c) {
            return Err(format!("unknown candidate {:?}", c));
        }
        if !seen.insert(c) {
            return Err(format!("candidate {:?} ranked twice", c));
        }
    }
    Ok(())
}

// **** Instant-runoff ****

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
struct CandidateId(u32);

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

impl Add for VoteCount {
    type Output = VoteCount;
    fn add(self: VoteCount, rhs: VoteCount) -> VoteCount {
        VoteCount(self.0 + rhs.0)
    }
}

// Identical rankings, aggregated.
// Invariant: `ranks` is never empty and its head is a candidate still running.
#[derive(Eq, PartialEq, Debug, Clone)]
struct VoteInternal {
    ranks: Vec<CandidateId>,
    count: VoteCount,
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum RoundCandidateStatusInternal {
    StillRunning,
    Elected,
    /// the transfers of the votes to each candidate, and the number of exhausted votes
    Eliminated(Vec<(CandidateId, VoteCount)>, VoteCount),
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct RoundStatistics {
    candidate_stats: Vec<(CandidateId, VoteCount, RoundCandidateStatusInternal)>,
    active: VoteCount,
    threshold: VoteCount,
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum RoundOutcome {
    Continue,
    Elected(CandidateId),
    Tie(Vec<CandidateId>),
    NoActiveBallots,
}

#[derive(Eq, PartialEq, Debug, Clone)]
struct RoundResult {
    votes: Vec<VoteInternal>,
    stats: RoundStatistics,
    outcome: RoundOutcome,
}

#[derive(Eq, PartialEq, Debug, Clone)]
enum TabulationError {
    NoConvergence,
    UnknownCandidate,
}

impl std::fmt::Display for TabulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TabulationError::NoConvergence => write!(f, "instant-runoff did not converge"),
            TabulationError::UnknownCandidate => {
                write!(f, "round statistics refer to an unknown candidate")
            }
        }
    }
}

/// Runs instant-runoff over checked rankings.
///
/// Arguments:
/// * `candidates` the declared candidates, in ballot order
/// * `rankings` one entry per counted vote; every ranking is non-empty, without
///   duplicates, and only names declared candidates
/// * `abstained` the number of votes without a ranking, reported as is
fn run_voting_stats(
    candidates: &[String],
    rankings: &[&[String]],
    abstained: u64,
) -> Result<RankedChoiceResults, TabulationError> {
    info!(
        "Processing {:?} rankings, candidates: {:?}",
        rankings.len(),
        candidates
    );
    let candidates_by_name: HashMap<&String, CandidateId> = candidates
        .iter()
        .enumerate()
        .map(|(idx, c)| (c, CandidateId((idx + 1) as u32)))
        .collect();
    let candidates_by_id: HashMap<CandidateId, String> = candidates_by_name
        .iter()
        .map(|(name, cid)| (*cid, (*name).clone()))
        .collect();

    let checked_votes = aggregate_rankings(rankings, &candidates_by_name)?;
    debug!(
        "run_voting_stats: {:?} distinct rankings",
        checked_votes.len()
    );

    // The candidates that are still running, in the order of the ballot.
    let mut cur_candidates: Vec<CandidateId> = (1..=candidates.len())
        .map(|idx| CandidateId(idx as u32))
        .collect();
    let mut cur_votes: Vec<VoteInternal> = checked_votes;
    let mut cur_stats: Vec<RoundStatistics> = Vec::new();

    // Every round either stops or eliminates at least one candidate.
    while cur_stats.len() <= candidates.len() {
        let round_id = (cur_stats.len() + 1) as u32;
        debug!(
            "Round id: {:?} cur_candidates: {:?}",
            round_id, cur_candidates
        );
        let round_res = run_one_round(&cur_votes, &cur_candidates);
        info!("Round id: {:?} stats: {:?}", round_id, round_res.stats);

        cur_votes = round_res.votes;
        let eliminated: HashSet<CandidateId> = round_res
            .stats
            .candidate_stats
            .iter()
            .filter_map(|(cid, _, s)| match s {
                RoundCandidateStatusInternal::Eliminated(_, _) => Some(*cid),
                _ => None,
            })
            .collect();
        cur_candidates.retain(|cid| !eliminated.contains(cid));
        cur_stats.push(round_res.stats);

        let outcome = match round_res.outcome {
            RoundOutcome::Continue => continue,
            RoundOutcome::Elected(cid) => RankedOutcome::Elected {
                winner: name_of(&candidates_by_id, cid)?,
            },
            RoundOutcome::Tie(cids) => RankedOutcome::EliminationTie {
                round: round_id,
                candidates: cids
                    .iter()
                    .map(|cid| name_of(&candidates_by_id, *cid))
                    .collect::<Result<Vec<String>, TabulationError>>()?,
            },
            RoundOutcome::NoActiveBallots => RankedOutcome::NoActiveBallots,
        };
        let rounds = round_results_to_stats(&cur_stats, &candidates_by_id)?;
        let exhausted = rounds
            .iter()
            .flat_map(|r| r.eliminated.iter().map(|e| e.exhausted))
            .sum();
        return Ok(RankedChoiceResults {
            rounds,
            outcome,
            exhausted,
            abstained,
        });
    }
    Err(TabulationError::NoConvergence)
}

fn name_of(
    candidates_by_id: &HashMap<CandidateId, String>,
    cid: CandidateId,
) -> Result<String, TabulationError> {
    candidates_by_id
        .get(&cid)
        .cloned()
        .ok_or(TabulationError::UnknownCandidate)
}

// Identical rankings are counted once with a weight. The order of first
// appearance is kept so that the statistics do not depend on hashing.
fn aggregate_rankings(
    rankings: &[&[String]],
    candidates_by_name: &HashMap<&String, CandidateId>,
) -> Result<Vec<VoteInternal>, TabulationError> {
    let mut positions: HashMap<Vec<CandidateId>, usize> = HashMap::new();
    let mut res: Vec<VoteInternal> = Vec::new();
    for ranking in rankings.iter() {
        let ranks: Vec<CandidateId> = ranking
            .iter()
            .map(|name| {
                candidates_by_name
                    .get(name)
                    .cloned()
                    .ok_or(TabulationError::UnknownCandidate)
            })
            .collect::<Result<Vec<CandidateId>, TabulationError>>()?;
        if ranks.is_empty() {
            continue;
        }
        if let Some(&pos) = positions.get(&ranks) {
            res[pos].count += VoteCount(1);
        } else {
            positions.insert(ranks.clone(), res.len());
            res.push(VoteInternal {
                ranks,
                count: VoteCount(1),
            });
        }
    }
    Ok(res)
}

fn get_threshold(active: VoteCount) -> VoteCount {
    if active == VoteCount::EMPTY {
        VoteCount::EMPTY
    } else {
        VoteCount((active.0 / 2) + 1)
    }
}

// The tally of first preferences, in candidate order. Candidates without
// any vote are included.
fn compute_tally(votes: &[VoteInternal], candidates: &[CandidateId]) -> Vec<(CandidateId, VoteCount)> {
    let mut counts: HashMap<CandidateId, VoteCount> =
        candidates.iter().map(|cid| (*cid, VoteCount::EMPTY)).collect();
    for v in votes.iter() {
        if let Some(vc) = v.ranks.first().and_then(|cid| counts.get_mut(cid)) {
            *vc += v.count;
        }
    }
    candidates
        .iter()
        .map(|cid| (*cid, counts.get(cid).cloned().unwrap_or(VoteCount::EMPTY)))
        .collect()
}

fn run_one_round(votes: &[VoteInternal], candidates: &[CandidateId]) -> RoundResult {
    let tally = compute_tally(votes, candidates);
    let active: VoteCount = tally.iter().map(|(_, vc)| *vc).sum();
    let threshold = get_threshold(active);
    debug!(
        "run_one_round: tally: {:?} active: {:?} threshold: {:?}",
        tally, active, threshold
    );

    let still_running = |tally: &[(CandidateId, VoteCount)]| RoundStatistics {
        candidate_stats: tally
            .iter()
            .map(|(cid, vc)| (*cid, *vc, RoundCandidateStatusInternal::StillRunning))
            .collect(),
        active,
        threshold,
    };

    if active == VoteCount::EMPTY {
        return RoundResult {
            votes: votes.to_vec(),
            stats: still_running(&tally),
            outcome: RoundOutcome::NoActiveBallots,
        };
    }

    // At most one candidate can hold a strict majority. This also covers the
    // last candidate standing.
    if let Some((winner, _)) = tally.iter().find(|(_, vc)| *vc >= threshold) {
        debug!("run_one_round: {:?} reached the threshold", winner);
        let mut stats = still_running(&tally);
        for (cid, _, status) in stats.candidate_stats.iter_mut() {
            if cid == winner {
                *status = RoundCandidateStatusInternal::Elected;
            }
        }
        return RoundResult {
            votes: votes.to_vec(),
            stats,
            outcome: RoundOutcome::Elected(*winner),
        };
    }

    let eliminated_candidates: Vec<CandidateId> = match find_eliminated_candidates(&tally) {
        Ok(cids) => cids,
        Err(tied) => {
            info!("run_one_round: tie for elimination between {:?}", tied);
            return RoundResult {
                votes: votes.to_vec(),
                stats: still_running(&tally),
                outcome: RoundOutcome::Tie(tied),
            };
        }
    };
    debug!(
        "run_one_round: eliminated_candidates: {:?}",
        eliminated_candidates
    );
    let eliminated: HashSet<CandidateId> = eliminated_candidates.iter().cloned().collect();

    // For every eliminated candidate, the transfers to the next preference and
    // the exhausted ballots.
    let mut elimination_stats: HashMap<CandidateId, (HashMap<CandidateId, VoteCount>, VoteCount)> =
        eliminated
            .iter()
            .map(|cid| (*cid, (HashMap::new(), VoteCount::EMPTY)))
            .collect();

    let rem_votes: Vec<VoteInternal> = votes
        .iter()
        .filter_map(|va| {
            let old_first = *va.ranks.first()?;
            if !eliminated.contains(&old_first) {
                return Some(va.clone());
            }
            let e = elimination_stats
                .entry(old_first)
                .or_insert((HashMap::new(), VoteCount::EMPTY));
            // Lazily skip the candidates eliminated in this or earlier rounds.
            let rest: Vec<CandidateId> = va
                .ranks
                .iter()
                .skip_while(|cid| !candidates.contains(cid) || eliminated.contains(cid))
                .cloned()
                .collect();
            match rest.first() {
                None => {
                    e.1 += va.count;
                    None
                }
                Some(new_first) => {
                    let t = e.0.entry(*new_first).or_insert(VoteCount::EMPTY);
                    *t += va.count;
                    Some(VoteInternal {
                        ranks: rest,
                        count: va.count,
                    })
                }
            }
        })
        .collect();

    let candidate_stats = tally
        .iter()
        .map(|(cid, vc)| match elimination_stats.get(cid) {
            Some((transfers, exhausted)) => {
                // Transfers are listed in candidate order.
                let ordered: Vec<(CandidateId, VoteCount)> = candidates
                    .iter()
                    .filter_map(|c| transfers.get(c).map(|t| (*c, *t)))
                    .collect();
                (
                    *cid,
                    *vc,
                    RoundCandidateStatusInternal::Eliminated(ordered, *exhausted),
                )
            }
            None => (*cid, *vc, RoundCandidateStatusInternal::StillRunning),
        })
        .collect();

    RoundResult {
        votes: rem_votes,
        stats: RoundStatistics {
            candidate_stats,
            active,
            threshold,
        },
        outcome: RoundOutcome::Continue,
    }
}

/// The candidates to eliminate this round, or the candidates tied for the
/// elimination when no order-independent choice exists.
///
/// Candidates tied at the lowest count are removed together when they all have
/// zero votes, or when their combined votes stay below the next lowest
/// candidate: in both cases they would be eliminated one after the other
/// whatever the order, and the outcome is the same.
fn find_eliminated_candidates(
    tally: &[(CandidateId, VoteCount)],
) -> Result<Vec<CandidateId>, Vec<CandidateId>> {
    let min_count: VoteCount = tally
        .iter()
        .map(|(_, vc)| *vc)
        .min()
        .unwrap_or(VoteCount::EMPTY);
    let all_smallest: Vec<CandidateId> = tally
        .iter()
        .filter_map(|(cid, vc)| if *vc == min_count { Some(*cid) } else { None })
        .collect();
    debug!(
        "find_eliminated_candidates: all_smallest: {:?}",
        all_smallest
    );

    if all_smallest.len() == 1 || min_count == VoteCount::EMPTY {
        return Ok(all_smallest);
    }

    let group_total = VoteCount(min_count.0 * all_smallest.len() as u64);
    let next_count: Option<VoteCount> = tally
        .iter()
        .map(|(_, vc)| *vc)
        .filter(|vc| *vc > min_count)
        .min();
    match next_count {
        Some(next) if group_total < next => Ok(all_smallest),
        _ => Err(all_smallest),
    }
}

fn round_results_to_stats(
    results: &[RoundStatistics],
    candidates_by_id: &HashMap<CandidateId, String>,
) -> Result<Vec<RoundStats>, TabulationError> {
    let mut res: Vec<RoundStats> = Vec::new();
    for (idx, r) in results.iter().enumerate() {
        res.push(round_result_to_stat(r, (idx + 1) as u32, candidates_by_id)?);
    }
    Ok(res)
}

fn round_result_to_stat(
    stats: &RoundStatistics,
    round_id: u32,
    candidates_by_id: &HashMap<CandidateId, String>,
) -> Result<RoundStats, TabulationError> {
    let mut rs = RoundStats {
        round: round_id,
        tally: Vec::new(),
        active: stats.active.0,
        threshold: stats.threshold.0,
        eliminated: Vec::new(),
        elected: None,
    };

    for (cid, c, status) in stats.candidate_stats.iter() {
        let name = name_of(candidates_by_id, *cid)?;
        rs.tally.push(CandidateTally {
            candidate: name.clone(),
            votes: c.0,
        });
        match status {
            RoundCandidateStatusInternal::StillRunning => {}
            RoundCandidateStatusInternal::Elected => {
                rs.elected = Some(name);
            }
            RoundCandidateStatusInternal::Eliminated(transfers, exhausted) => {
                let mut pub_transfers: Vec<CandidateTally> = Vec::new();
                for (t_cid, t_count) in transfers {
                    pub_transfers.push(CandidateTally {
                        candidate: name_of(candidates_by_id, *t_cid)?,
                        votes: t_count.0,
                    });
                }
                rs.eliminated.push(EliminationStats {
                    candidate: name,
                    transfers: pub_transfers,
                    exhausted: exhausted.0,
                });
            }
        }
    }
    Ok(rs)
}

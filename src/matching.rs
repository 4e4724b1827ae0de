// Matching module: assign reviewers to reviewees, and mentors to students.
//
// Peer review uses positional offsets over an ordered participant list:
// the reviewer at index i reviews indices (i+1)..=(i+k) modulo n. Offsets
// start at 1, so with k < n nobody reviews themselves and every participant
// reviews exactly k others and is reviewed exactly k times.
//
// Strategies differ in how the list is ordered and how a pair is scored:
//   random       shuffled (Fisher–Yates), neutral score
//   skill        input order, Jaccard similarity of skills
//   performance  sorted by performance, 1 − |a − b| / 100
//   preference   input order, Jaccard similarity of interests
//   instructor   input order, 1.0 when the instructor assigned the pair

use crate::error::{AnalyticsError, Result};
use crate::types::{MatchPair, Participant};
use crate::util::{finite_or_zero, round_to};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// Score used when a strategy has no attribute data to compare.
pub const BASELINE_SCORE: f64 = 0.5;
const RANDOM_SCORE: f64 = 0.5;
const INSTRUCTOR_MATCH_SCORE: f64 = 1.0;
const INSTRUCTOR_MISS_SCORE: f64 = 0.25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    #[default]
    Random,
    SkillBased,
    PerformanceBased,
    PreferenceBased,
    InstructorAssigned,
}

impl fmt::Display for MatchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchStrategy::Random => write!(f, "random"),
            MatchStrategy::SkillBased => write!(f, "skill"),
            MatchStrategy::PerformanceBased => write!(f, "performance"),
            MatchStrategy::PreferenceBased => write!(f, "preference"),
            MatchStrategy::InstructorAssigned => write!(f, "instructor"),
        }
    }
}

impl FromStr for MatchStrategy {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(MatchStrategy::Random),
            "skill" | "skill_based" | "skill-based" => Ok(MatchStrategy::SkillBased),
            "performance" | "performance_based" | "performance-based" => {
                Ok(MatchStrategy::PerformanceBased)
            }
            "preference" | "preference_based" | "preference-based" => {
                Ok(MatchStrategy::PreferenceBased)
            }
            "instructor" | "instructor_assigned" | "instructor-assigned" => {
                Ok(MatchStrategy::InstructorAssigned)
            }
            other => Err(AnalyticsError::invalid(format!(
                "unknown matching strategy: {}",
                other
            ))),
        }
    }
}

fn normalized_set(items: &[String]) -> BTreeSet<String> {
    items
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// |A ∩ B| / |A ∪ B| over case-insensitive sets. Returns (similarity, shared).
fn jaccard(a: &[String], b: &[String]) -> (f64, usize) {
    let a = normalized_set(a);
    let b = normalized_set(b);
    let shared = a.intersection(&b).count();
    let union = a.union(&b).count();
    if union == 0 {
        return (0.0, 0);
    }
    (shared as f64 / union as f64, shared)
}

fn fallback(attribute: &str) -> (f64, String) {
    (
        BASELINE_SCORE,
        format!("No {} data available; baseline score", attribute),
    )
}

/// Compatibility of `reviewer` with `reviewee` under `strategy`, in 0..=1,
/// with a human-readable reason.
pub fn compatibility(
    strategy: MatchStrategy,
    reviewer: &Participant,
    reviewee: &Participant,
) -> (f64, String) {
    let (score, reason) = match strategy {
        MatchStrategy::Random => (RANDOM_SCORE, "Random assignment".to_string()),
        MatchStrategy::SkillBased => {
            if reviewer.skills.is_empty() || reviewee.skills.is_empty() {
                fallback("skill")
            } else {
                let (similarity, shared) = jaccard(&reviewer.skills, &reviewee.skills);
                (similarity, format!("{} shared skill(s)", shared))
            }
        }
        MatchStrategy::PerformanceBased => match (reviewer.performance, reviewee.performance) {
            (Some(a), Some(b)) => {
                let gap = (finite_or_zero(a) - finite_or_zero(b)).abs();
                (
                    1.0 - gap / 100.0,
                    format!("Performance gap of {:.0} points", gap),
                )
            }
            _ => fallback("performance"),
        },
        MatchStrategy::PreferenceBased => {
            if reviewer.interests.is_empty() || reviewee.interests.is_empty() {
                fallback("preference")
            } else {
                let (similarity, shared) = jaccard(&reviewer.interests, &reviewee.interests);
                (similarity, format!("{} shared interest(s)", shared))
            }
        }
        MatchStrategy::InstructorAssigned => {
            if reviewer.assigned.is_empty() {
                fallback("instructor assignment")
            } else if reviewer.assigned.iter().any(|id| id == &reviewee.id) {
                (INSTRUCTOR_MATCH_SCORE, "Assigned by instructor".to_string())
            } else {
                (
                    INSTRUCTOR_MISS_SCORE,
                    "Not on instructor's assignment list".to_string(),
                )
            }
        }
    };
    (round_to(score.clamp(0.0, 1.0), 4), reason)
}

fn check_unique(participants: &[Participant]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for p in participants {
        if !seen.insert(p.id.as_str()) {
            return Err(AnalyticsError::invalid(format!(
                "participant '{}' appears more than once",
                p.id
            )));
        }
    }
    Ok(())
}

/// Generate a peer-review match set.
///
/// Fails with `InvalidConfiguration` when `reviews_per_participant` is not
/// smaller than the number of participants (this includes an empty list)
/// or when participant ids repeat. Zero reviews yields an empty set.
pub fn generate_matches<R: Rng + ?Sized>(
    participants: &[Participant],
    reviews_per_participant: usize,
    strategy: MatchStrategy,
    rng: &mut R,
) -> Result<Vec<MatchPair>> {
    let n = participants.len();
    if reviews_per_participant >= n {
        return Err(AnalyticsError::invalid(format!(
            "{} reviews per participant needs more than {} participants",
            reviews_per_participant, n
        )));
    }
    check_unique(participants)?;
    if reviews_per_participant == 0 {
        return Ok(Vec::new());
    }

    let mut order: Vec<&Participant> = participants.iter().collect();
    match strategy {
        MatchStrategy::Random => order.shuffle(rng),
        MatchStrategy::PerformanceBased => order.sort_by(|a, b| {
            let pa = a.performance.map(finite_or_zero).unwrap_or(0.0);
            let pb = b.performance.map(finite_or_zero).unwrap_or(0.0);
            pb.partial_cmp(&pa).unwrap_or(Ordering::Equal)
        }),
        _ => {}
    }

    let mut pairs = Vec::with_capacity(n * reviews_per_participant);
    for (i, reviewer) in order.iter().enumerate() {
        for offset in 1..=reviews_per_participant {
            let reviewee = order[(i + offset) % n];
            let (compatibility_score, reason) = compatibility(strategy, reviewer, reviewee);
            pairs.push(MatchPair {
                reviewer_id: reviewer.id.clone(),
                reviewee_id: reviewee.id.clone(),
                compatibility_score,
                reason,
            });
        }
    }

    tracing::debug!(
        participants = n,
        reviews_per_participant,
        strategy = %strategy,
        pairs = pairs.len(),
        "matches generated"
    );
    Ok(pairs)
}

/// Peer-review matching over bare ids (no attribute data).
pub fn generate_matches_for_ids<S: AsRef<str>, R: Rng + ?Sized>(
    ids: &[S],
    reviews_per_participant: usize,
    strategy: MatchStrategy,
    rng: &mut R,
) -> Result<Vec<MatchPair>> {
    let participants: Vec<Participant> = ids.iter().map(|id| Participant::new(id.as_ref())).collect();
    generate_matches(&participants, reviews_per_participant, strategy, rng)
}

/// Assign each student the most compatible mentor that still has capacity.
///
/// Students are served in input order; ties go to the earlier mentor (after
/// shuffling mentors for the random strategy). A mentor is never assigned
/// to themselves.
pub fn assign_mentors<R: Rng + ?Sized>(
    students: &[Participant],
    mentors: &[Participant],
    capacity: usize,
    strategy: MatchStrategy,
    rng: &mut R,
) -> Result<Vec<MatchPair>> {
    if students.is_empty() {
        return Ok(Vec::new());
    }
    if mentors.is_empty() {
        return Err(AnalyticsError::invalid("no mentors available"));
    }
    if capacity == 0 {
        return Err(AnalyticsError::invalid("mentor capacity must be at least 1"));
    }
    if mentors.len() * capacity < students.len() {
        return Err(AnalyticsError::invalid(format!(
            "{} mentors with capacity {} cannot take {} students",
            mentors.len(),
            capacity,
            students.len()
        )));
    }
    check_unique(students)?;
    check_unique(mentors)?;

    let mut order: Vec<&Participant> = mentors.iter().collect();
    if strategy == MatchStrategy::Random {
        order.shuffle(rng);
    }
    let mut remaining = vec![capacity; order.len()];
    let mut pairs = Vec::with_capacity(students.len());

    for student in students {
        let mut best: Option<(usize, f64, String)> = None;
        for (idx, mentor) in order.iter().enumerate() {
            if remaining[idx] == 0 || mentor.id == student.id {
                continue;
            }
            let (score, reason) = compatibility(strategy, mentor, student);
            let better = match &best {
                Some((_, best_score, _)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((idx, score, reason));
            }
        }

        let Some((idx, compatibility_score, reason)) = best else {
            return Err(AnalyticsError::invalid(format!(
                "no mentor with remaining capacity for '{}'",
                student.id
            )));
        };
        remaining[idx] -= 1;
        pairs.push(MatchPair {
            reviewer_id: order[idx].id.clone(),
            reviewee_id: student.id.clone(),
            compatibility_score,
            reason,
        });
    }

    tracing::debug!(
        students = students.len(),
        mentors = mentors.len(),
        strategy = %strategy,
        "mentors assigned"
    );
    Ok(pairs)
}

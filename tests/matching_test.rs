use mentor_analytics::matching::{self, MatchStrategy};
use mentor_analytics::types::{MatchPair, Participant};
use mentor_analytics::AnalyticsError;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

fn ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("p{}", i)).collect()
}

fn count_by<'a>(pairs: &'a [MatchPair], reviewer: bool) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for p in pairs {
        let key = if reviewer { &p.reviewer_id } else { &p.reviewee_id };
        *counts.entry(key.as_str()).or_default() += 1;
    }
    counts
}

fn assert_valid_match_set(pairs: &[MatchPair], ids: &[String], k: usize) {
    assert_eq!(pairs.len(), ids.len() * k);
    let reviewers = count_by(pairs, true);
    let reviewees = count_by(pairs, false);
    for id in ids {
        assert_eq!(reviewers.get(id.as_str()).copied().unwrap_or(0), k, "reviewer {}", id);
        assert_eq!(reviewees.get(id.as_str()).copied().unwrap_or(0), k, "reviewee {}", id);
    }
    for p in pairs {
        assert_ne!(p.reviewer_id, p.reviewee_id);
        assert!((0.0..=1.0).contains(&p.compatibility_score));
        assert!(!p.reason.is_empty());
    }
    // no reviewer gets the same reviewee twice
    let mut seen = std::collections::HashSet::new();
    for p in pairs {
        assert!(seen.insert((p.reviewer_id.as_str(), p.reviewee_id.as_str())));
    }
}

#[test]
fn every_strategy_keeps_match_invariants() {
    let strategies = [
        MatchStrategy::Random,
        MatchStrategy::SkillBased,
        MatchStrategy::PerformanceBased,
        MatchStrategy::PreferenceBased,
        MatchStrategy::InstructorAssigned,
    ];
    let participants: Vec<Participant> = ids(7)
        .into_iter()
        .enumerate()
        .map(|(i, id)| Participant {
            skills: if i % 2 == 0 { vec!["rust".into(), "sql".into()] } else { vec!["go".into()] },
            interests: vec![format!("topic-{}", i % 3)],
            performance: Some(40.0 + i as f64 * 8.0),
            assigned: vec![format!("p{}", (i + 1) % 7)],
            id,
        })
        .collect();
    let all_ids: Vec<String> = participants.iter().map(|p| p.id.clone()).collect();

    for strategy in strategies {
        for k in 1..7 {
            let mut rng = ChaCha8Rng::seed_from_u64(k as u64);
            let pairs = matching::generate_matches(&participants, k, strategy, &mut rng).unwrap();
            assert_valid_match_set(&pairs, &all_ids, k);
        }
    }
}

#[test]
fn reviews_must_be_fewer_than_participants() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    for n in 0..6 {
        for k in n..n + 3 {
            let result =
                matching::generate_matches_for_ids(&ids(n), k, MatchStrategy::Random, &mut rng);
            assert!(
                matches!(result, Err(AnalyticsError::InvalidConfiguration(_))),
                "n={} k={}",
                n,
                k
            );
        }
    }
}

#[test]
fn random_shuffle_varies_with_seed() {
    let people = ids(10);
    let orders: std::collections::HashSet<Vec<String>> = (0..20)
        .map(|seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            matching::generate_matches_for_ids(&people, 1, MatchStrategy::Random, &mut rng)
                .unwrap()
                .into_iter()
                .map(|p| p.reviewer_id)
                .collect()
        })
        .collect();
    assert!(orders.len() > 1);
}

#[test]
fn instructor_assignment_pairs_score_highest() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let participants: Vec<Participant> = ["a", "b", "c"]
        .iter()
        .enumerate()
        .map(|(i, id)| Participant {
            assigned: vec![["b", "c", "a"][i].to_string()],
            ..Participant::new(*id)
        })
        .collect();
    let pairs =
        matching::generate_matches(&participants, 1, MatchStrategy::InstructorAssigned, &mut rng)
            .unwrap();
    assert!(pairs.iter().all(|p| p.compatibility_score == 1.0));
    assert!(pairs.iter().all(|p| p.reason == "Assigned by instructor"));
}

#[test]
fn bare_ids_fall_back_to_baseline_for_attribute_strategies() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let pairs =
        matching::generate_matches_for_ids(&ids(4), 2, MatchStrategy::PreferenceBased, &mut rng)
            .unwrap();
    assert!(pairs
        .iter()
        .all(|p| p.compatibility_score == matching::BASELINE_SCORE && p.reason.contains("baseline")));
}

#[test]
fn every_student_gets_one_mentor() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let mentors: Vec<Participant> = ["m1", "m2", "m3"].iter().map(|id| Participant::new(*id)).collect();
    let students: Vec<Participant> = ids(6).into_iter().map(Participant::new).collect();
    let pairs = matching::assign_mentors(&students, &mentors, 2, MatchStrategy::Random, &mut rng)
        .unwrap();
    assert_eq!(pairs.len(), 6);
    let load = count_by(&pairs, true);
    assert!(load.values().all(|&n| n <= 2));
    let served = count_by(&pairs, false);
    assert_eq!(served.len(), 6);
}

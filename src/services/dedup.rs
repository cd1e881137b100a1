//! Contact deduplication engine
//!
//! Pure and deterministic: candidates go in file row order, the first
//! occurrence of each phone wins, and every later occurrence is reported
//! with a reason. No I/O happens here; the caller supplies a snapshot of
//! the user's persisted phone keys taken at run start.

use std::collections::HashSet;

use crate::types::{CandidateContact, DuplicateContact, DuplicateReason};

/// Comparison key for a normalized phone.
///
/// A leading `+` is presentation, not identity: `+12345678900` and
/// `12345678900` must collide, so comparison happens on the digit string.
pub fn dedup_key(phone: &str) -> &str {
    phone.strip_prefix('+').unwrap_or(phone)
}

/// Partition of the candidate list produced by [`partition`]
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// First occurrence of each novel phone, in file order
    pub to_create: Vec<CandidateContact>,
    /// Every skipped occurrence, in file order, with its reason
    pub duplicates: Vec<DuplicateContact>,
}

/// Split normalized candidates into rows to create and duplicates to
/// report.
///
/// For each candidate, in order: a phone already persisted for the user is
/// a store duplicate; otherwise a phone already accepted earlier in this
/// batch is an in-file duplicate; otherwise the candidate is accepted and
/// its phone joins the batch-seen set. Duplicate records carry the
/// *current* row's name fields so the report shows what was skipped, not
/// what was kept.
pub fn partition(candidates: Vec<CandidateContact>, existing: &HashSet<String>) -> DedupOutcome {
    let mut outcome = DedupOutcome::default();
    let mut seen_in_batch: HashSet<String> = HashSet::new();

    for candidate in candidates {
        let key = dedup_key(&candidate.phone).to_string();

        if existing.contains(&key) {
            outcome
                .duplicates
                .push(candidate.duplicate_record(DuplicateReason::AlreadyExists));
        } else if seen_in_batch.contains(&key) {
            outcome
                .duplicates
                .push(candidate.duplicate_record(DuplicateReason::WithinFile));
        } else {
            seen_in_batch.insert(key);
            outcome.to_create.push(candidate);
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(row: usize, phone: &str, first_name: Option<&str>) -> CandidateContact {
        CandidateContact {
            row,
            phone: phone.to_string(),
            first_name: first_name.map(|s| s.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_occurrence_wins_second_is_reported() {
        let outcome = partition(
            vec![
                candidate(0, "5551111", Some("Ann")),
                candidate(1, "5551111", Some("Anna")),
            ],
            &HashSet::new(),
        );
        assert_eq!(outcome.to_create.len(), 1);
        assert_eq!(outcome.to_create[0].row, 0);
        assert_eq!(outcome.duplicates.len(), 1);
        assert_eq!(outcome.duplicates[0].reason, DuplicateReason::WithinFile);
        // The report carries the skipped row's name, not the kept row's.
        assert_eq!(outcome.duplicates[0].first_name.as_deref(), Some("Anna"));
    }

    #[test]
    fn test_persisted_phone_is_store_duplicate() {
        let existing: HashSet<String> = ["5551111".to_string()].into_iter().collect();
        let outcome = partition(vec![candidate(0, "5551111", Some("Ann"))], &existing);
        assert!(outcome.to_create.is_empty());
        assert_eq!(outcome.duplicates[0].reason, DuplicateReason::AlreadyExists);
    }

    #[test]
    fn test_store_duplicate_takes_priority_over_batch() {
        let existing: HashSet<String> = ["5551111".to_string()].into_iter().collect();
        let outcome = partition(
            vec![
                candidate(0, "5551111", None),
                candidate(1, "5551111", None),
            ],
            &existing,
        );
        assert_eq!(outcome.duplicates.len(), 2);
        assert!(outcome
            .duplicates
            .iter()
            .all(|d| d.reason == DuplicateReason::AlreadyExists));
    }

    #[test]
    fn test_plus_prefix_collides_with_bare_digits() {
        let outcome = partition(
            vec![
                candidate(0, "+12345678900", None),
                candidate(1, "12345678900", None),
            ],
            &HashSet::new(),
        );
        assert_eq!(outcome.to_create.len(), 1);
        assert_eq!(outcome.to_create[0].phone, "+12345678900");
        assert_eq!(outcome.duplicates[0].reason, DuplicateReason::WithinFile);
    }

    #[test]
    fn test_distinct_phones_all_created_in_order() {
        let outcome = partition(
            vec![
                candidate(0, "5551111", None),
                candidate(1, "5552222", None),
                candidate(2, "5553333", None),
            ],
            &HashSet::new(),
        );
        assert_eq!(outcome.to_create.len(), 3);
        let rows: Vec<usize> = outcome.to_create.iter().map(|c| c.row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
        assert!(outcome.duplicates.is_empty());
    }
}

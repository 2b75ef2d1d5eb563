//! Deduplication engine
//!
//! Two paths share this engine:
//! - the per-candidate check used during event creation (authoritative
//!   source-id lookup, then same-day fuzzy title matching), and
//! - the cross-source batch sweep that catches the same real-world event
//!   independently reported by two uncoordinated sources.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use gather_domain::constants::{TITLE_SIMILARITY_THRESHOLD, VENUE_TITLE_SIMILARITY_THRESHOLD};
use gather_domain::utils::similarity::{jaccard_similarity, normalize_promo_title};
use gather_domain::{title_similarity, Event, EventDraft, Result};
use tracing::{debug, info, instrument};

use crate::ports::EventRepository;

/// Outcome of a cross-source dedup sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Events considered by the sweep.
    pub examined: usize,
    /// Duplicates deleted.
    pub removed: usize,
}

/// Duplicate detection over the persisted event store.
pub struct DedupEngine {
    events: Arc<dyn EventRepository>,
}

impl DedupEngine {
    pub fn new(events: Arc<dyn EventRepository>) -> Self {
        Self { events }
    }

    /// Find an existing event the candidate duplicates, if any.
    ///
    /// The (source_name, source_id) pair is authoritative: a hit there is
    /// the same upstream record and short-circuits fuzzy matching entirely.
    /// Otherwise comparison is restricted to events starting on the same
    /// calendar day, using normalized-title Jaccard similarity.
    #[instrument(skip(self, candidate), fields(title = %candidate.title))]
    pub async fn find_duplicate(&self, candidate: &EventDraft) -> Result<Option<Event>> {
        let Some(starts_at) = candidate.starts_at else {
            return Ok(None);
        };

        if candidate.has_source_ref() {
            let name = candidate.source_name.as_deref().unwrap_or_default();
            let id = candidate.source_id.as_deref().unwrap_or_default();
            if let Some(existing) = self.events.find_by_source_ref(name, id).await? {
                debug!(source_name = name, source_id = id, "authoritative id match");
                return Ok(Some(existing));
            }
        }

        let same_day = self.events.find_by_day(starts_at.date_naive()).await?;
        for event in same_day {
            let similarity = title_similarity(&event.title, &candidate.title);
            if similarity > TITLE_SIMILARITY_THRESHOLD {
                debug!(existing = %event.id, similarity, "fuzzy title match");
                return Ok(Some(event));
            }
        }

        Ok(None)
    }

    /// Cross-source sweep over a day window: pairwise-compare
    /// source-attributed events within each day bucket, keep the more
    /// complete record of each duplicate pair, delete the other.
    #[instrument(skip(self))]
    pub async fn sweep(&self, from: NaiveDate, to: NaiveDate) -> Result<SweepOutcome> {
        let events = self.events.find_source_attributed(from, to).await?;
        let examined = events.len();

        let mut buckets: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();
        for event in events {
            buckets.entry(event.start_date()).or_default().push(event);
        }

        let mut removed = 0;
        let mut deleted: HashSet<String> = HashSet::new();

        for (day, bucket) in &buckets {
            if bucket.len() < 2 {
                continue;
            }
            for i in 0..bucket.len() {
                for j in (i + 1)..bucket.len() {
                    let (a, b) = (&bucket[i], &bucket[j]);
                    if deleted.contains(&a.id) || deleted.contains(&b.id) {
                        continue;
                    }
                    if !are_cross_source_duplicates(a, b) {
                        continue;
                    }

                    // Keep the record with more data
                    let (keeper, loser) = if a.completeness_score() >= b.completeness_score() {
                        (a, b)
                    } else {
                        (b, a)
                    };

                    info!(
                        day = %day,
                        keeper = %keeper.title,
                        duplicate = %loser.title,
                        "removing cross-source duplicate"
                    );
                    self.events.delete_event(&loser.id).await?;
                    deleted.insert(loser.id.clone());
                    removed += 1;
                }
            }
        }

        info!(examined, removed, "dedup sweep completed");
        Ok(SweepOutcome { examined, removed })
    }
}

/// Batch-pass duplicate test between two persisted events.
///
/// Uses the extended normalization (promoter filler stripped) and three
/// rules: high Jaccard similarity, substring containment, or exact venue
/// match on the same date with moderate title similarity.
fn are_cross_source_duplicates(a: &Event, b: &Event) -> bool {
    if a.id == b.id {
        return false;
    }
    // Identical attribution is the same upstream record, not a cross-source
    // duplicate; the uniqueness constraint already handles it.
    if a.source_name.is_some() && a.source_name == b.source_name && a.source_id == b.source_id {
        return false;
    }

    let t1 = normalize_promo_title(&a.title);
    let t2 = normalize_promo_title(&b.title);
    if t1.is_empty() || t2.is_empty() {
        return false;
    }

    let similarity = jaccard_similarity(&t1, &t2);
    if similarity > TITLE_SIMILARITY_THRESHOLD {
        return true;
    }

    if t1.contains(&t2) || t2.contains(&t1) {
        return true;
    }

    if let (Some(v1), Some(v2)) = (a.venue.as_deref(), b.venue.as_deref()) {
        let v1 = normalize_promo_title(v1);
        let v2 = normalize_promo_title(v2);
        let venue_match = !v1.is_empty() && v1 == v2;
        let date_match = a.start_date() == b.start_date();
        if venue_match && date_match && similarity > VENUE_TITLE_SIMILARITY_THRESHOLD {
            return true;
        }
    }

    false
}

//! Fuzzy matching of scraped names against stored rows.
//!
//! Three rules, strictest first: exact key equality, substring containment
//! in either direction, then Sørensen–Dice bigram similarity above a
//! threshold. Anything below threshold is reported as unmatched together
//! with the best score so a reviewer can decide — a wrong merge is worse
//! than a visible miss.

use serde::Serialize;
use strsim::sorensen_dice;

/// A stored row eligible for matching.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub id: i64,
    /// Normalized comparison key.
    pub key: String,
    /// Whether the row already carries a portal identifier. Used to break
    /// ties: a row the portal has confirmed before wins over one it hasn't.
    pub has_external_id: bool,
}

/// Which rule produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    Exact,
    Substring,
    Bigram,
}

/// Result of matching one scraped entity against a candidate set.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched {
        id: i64,
        score: f64,
        rule: MatchRule,
    },
    /// No candidate cleared the bar. `best` carries the runner-up for audit.
    Unmatched { best: Option<(i64, f64)> },
}

impl MatchOutcome {
    pub fn matched_id(&self) -> Option<i64> {
        match self {
            MatchOutcome::Matched { id, .. } => Some(*id),
            MatchOutcome::Unmatched { .. } => None,
        }
    }
}

/// Match a set of candidate keys (most specific first) against stored rows.
///
/// All keys are tried per rule before falling through to the next rule, so
/// an exact hit on the club-only key beats a substring hit on the full
/// label.
pub fn best_match(keys: &[String], candidates: &[Candidate], threshold: f64) -> MatchOutcome {
    if candidates.is_empty() || keys.is_empty() {
        return MatchOutcome::Unmatched { best: None };
    }

    // Rule 1: exact equality
    for key in keys {
        if let Some(c) = pick(candidates.iter().filter(|c| &c.key == key)) {
            return MatchOutcome::Matched {
                id: c.id,
                score: 1.0,
                rule: MatchRule::Exact,
            };
        }
    }

    // Rule 2: substring containment either direction
    for key in keys {
        if key.is_empty() {
            continue;
        }
        let contained = candidates
            .iter()
            .filter(|c| !c.key.is_empty() && (c.key.contains(key.as_str()) || key.contains(&c.key)));
        if let Some(c) = pick(contained) {
            return MatchOutcome::Matched {
                id: c.id,
                score: 1.0,
                rule: MatchRule::Substring,
            };
        }
    }

    // Rule 3: bigram similarity, highest scorer wins
    let mut best: Option<(&Candidate, f64)> = None;
    for key in keys {
        for c in candidates {
            let score = sorensen_dice(key, &c.key);
            let better = match best {
                Some((prev, prev_score)) => {
                    score > prev_score
                        || (score == prev_score && c.has_external_id && !prev.has_external_id)
                }
                None => true,
            };
            if better {
                best = Some((c, score));
            }
        }
    }

    match best {
        Some((c, score)) if score >= threshold => MatchOutcome::Matched {
            id: c.id,
            score,
            rule: MatchRule::Bigram,
        },
        Some((c, score)) => MatchOutcome::Unmatched {
            best: Some((c.id, score)),
        },
        None => MatchOutcome::Unmatched { best: None },
    }
}

/// Choose among equally ranked candidates: prior external id first, then
/// lowest id for determinism.
fn pick<'a, I>(iter: I) -> Option<&'a Candidate>
where
    I: Iterator<Item = &'a Candidate>,
{
    let mut hits: Vec<&Candidate> = iter.collect();
    hits.sort_by_key(|c| (!c.has_external_id, c.id));
    hits.first().copied()
}

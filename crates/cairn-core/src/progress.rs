//! Per-topic research progress.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
  pub topic:              String,
  pub subtopics_explored: Vec<String>,
  /// Disjoint from `subtopics_explored` at all times.
  pub subtopics_pending:  Vec<String>,
  pub total_sessions:     u64,
  pub total_hours:        f64,
  pub last_session:       Option<DateTime<Utc>>,
}

impl Progress {
  pub fn new(topic: impl Into<String>) -> Self {
    Self {
      topic:              topic.into(),
      subtopics_explored: Vec::new(),
      subtopics_pending:  Vec::new(),
      total_sessions:     0,
      total_hours:        0.0,
      last_session:       None,
    }
  }

  /// Apply one committed session: touched subtopics move to explored.
  pub fn record_session(
    &mut self,
    subtopics: &[String],
    hours: f64,
    now: DateTime<Utc>,
  ) -> Result<()> {
    check_hours(hours)?;
    for subtopic in clean(subtopics) {
      self.subtopics_pending.retain(|p| *p != subtopic);
      if !self.subtopics_explored.contains(&subtopic) {
        self.subtopics_explored.push(subtopic);
      }
    }
    self.total_sessions += 1;
    self.total_hours += hours;
    self.last_session = Some(now);
    Ok(())
  }

  /// Queue subtopics for future sessions. Already explored or pending ones
  /// are skipped. Returns how many were added.
  pub fn plan(&mut self, subtopics: &[String]) -> usize {
    let mut added = 0;
    for subtopic in clean(subtopics) {
      if self.subtopics_explored.contains(&subtopic)
        || self.subtopics_pending.contains(&subtopic)
      {
        continue;
      }
      self.subtopics_pending.push(subtopic);
      added += 1;
    }
    added
  }
}

pub fn check_hours(hours: f64) -> Result<()> {
  if !hours.is_finite() || hours < 0.0 {
    return Err(Error::InvalidInput(format!(
      "session hours must be a non-negative number, got {hours}"
    )));
  }
  Ok(())
}

fn clean(subtopics: &[String]) -> impl Iterator<Item = String> + '_ {
  subtopics
    .iter()
    .map(|s| s.trim())
    .filter(|s| !s.is_empty())
    .map(str::to_owned)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn names(v: &[&str]) -> Vec<String> { v.iter().map(|s| s.to_string()).collect() }

  fn disjoint(p: &Progress) -> bool {
    p.subtopics_explored
      .iter()
      .all(|e| !p.subtopics_pending.contains(e))
  }

  #[test]
  fn session_moves_pending_to_explored() {
    let mut p = Progress::new("topic-x");
    assert_eq!(p.plan(&names(&["gold-standard", "fed-history"])), 2);

    p.record_session(&names(&["gold-standard"]), 2.5, Utc::now()).unwrap();
    assert_eq!(p.subtopics_explored, names(&["gold-standard"]));
    assert_eq!(p.subtopics_pending, names(&["fed-history"]));
    assert_eq!(p.total_sessions, 1);
    assert_eq!(p.total_hours, 2.5);
    assert!(p.last_session.is_some());
    assert!(disjoint(&p));
  }

  #[test]
  fn counters_never_decrease_and_sets_stay_disjoint() {
    let mut p = Progress::new("t");
    let mut last = (0, 0.0);
    let steps: [(&[&str], &[&str], f64); 4] = [
      (&["a", "b"], &["a"], 1.0),
      (&["a", "c"], &["b", "b"], 0.0),
      (&[], &["c", " "], 3.25),
      (&["d"], &[], 0.5),
    ];
    for (plan, touched, hours) in steps {
      p.plan(&names(plan));
      p.record_session(&names(touched), hours, Utc::now()).unwrap();
      assert!(p.total_sessions > last.0);
      assert!(p.total_hours >= last.1);
      assert!(disjoint(&p));
      last = (p.total_sessions, p.total_hours);
    }
    assert_eq!(p.subtopics_explored, names(&["a", "b", "c"]));
    assert_eq!(p.subtopics_pending, names(&["d"]));
  }

  #[test]
  fn plan_skips_explored() {
    let mut p = Progress::new("t");
    p.record_session(&names(&["a"]), 1.0, Utc::now()).unwrap();
    assert_eq!(p.plan(&names(&["a", "b", "b"])), 1);
    assert_eq!(p.subtopics_pending, names(&["b"]));
  }

  #[test]
  fn negative_or_nan_hours_are_rejected() {
    let mut p = Progress::new("t");
    assert!(p.record_session(&[], -1.0, Utc::now()).is_err());
    assert!(p.record_session(&[], f64::NAN, Utc::now()).is_err());
    assert_eq!(p.total_sessions, 0);
  }
}

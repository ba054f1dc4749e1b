//! Canonicalization of finding text into a stable content fingerprint.
//!
//! Normalization lower-cases, collapses runs of whitespace, and strips
//! punctuation from both ends, so trivial formatting differences between two
//! restatements of the same passage hash identically.

use sha2::{Digest, Sha256};

use crate::{
  Error, Result,
  finding::{Finding, Fingerprint, NormalizedFinding},
};

/// Characters trimmed from either end of the text.
fn is_edge_punctuation(c: char) -> bool {
  c.is_ascii_punctuation()
    || matches!(
      c,
      '\u{2018}'..='\u{201F}' | '\u{2026}' | '\u{2013}' | '\u{2014}' | '«' | '»' | '¿' | '¡'
    )
}

/// Canonical form of `raw`. May be empty; callers decide whether that is an
/// error.
pub fn normalize_text(raw: &str) -> String {
  let collapsed = raw
    .split_whitespace()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();
  collapsed
    .trim_matches(|c: char| is_edge_punctuation(c) || c.is_whitespace())
    .to_owned()
}

/// SHA-256 over already-normalized text.
pub fn fingerprint(normalized: &str) -> Fingerprint {
  let digest = Sha256::digest(normalized.as_bytes());
  let mut bytes = [0u8; 32];
  bytes.copy_from_slice(&digest);
  Fingerprint::from_bytes(bytes)
}

/// Normalize a finding's text and compute its fingerprint.
///
/// Fails with [`Error::InvalidInput`] when nothing but whitespace and
/// punctuation remains.
pub fn normalize(finding: &Finding) -> Result<NormalizedFinding> {
  let text = normalize_text(&finding.text);
  if text.is_empty() {
    return Err(Error::InvalidInput(
      "finding text is empty after normalization".into(),
    ));
  }
  let fingerprint = fingerprint(&text);
  Ok(NormalizedFinding { text, fingerprint })
}

/// Check the metadata of a finding that the normalizer does not look at.
pub fn validate(finding: &Finding) -> Result<()> {
  if finding.topic.trim().is_empty() {
    return Err(Error::InvalidInput("finding topic is empty".into()));
  }
  if !finding.confidence.is_finite() || !(0.0..=1.0).contains(&finding.confidence) {
    return Err(Error::InvalidInput(format!(
      "extraction confidence must be within [0, 1], got {}",
      finding.confidence
    )));
  }
  Ok(())
}

/// The canonical claim text for a finding: its explicit claim when the
/// extraction collaborator supplied one, otherwise its normalized text.
pub fn canonical_claim(
  finding: &Finding,
  normalized: &NormalizedFinding,
) -> Result<String> {
  match finding.claim.as_deref() {
    Some(raw) => {
      let claim = normalize_text(raw);
      if claim.is_empty() {
        return Err(Error::InvalidInput("claim text is empty".into()));
      }
      Ok(claim)
    }
    None => Ok(normalized.text.clone()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn finding(text: &str) -> Finding { Finding::new("topic", text, "test", 0.8) }

  #[test]
  fn formatting_differences_share_a_fingerprint() {
    let a = normalize(&finding("Fed created in 1913.")).unwrap();
    let b = normalize(&finding("  fed   CREATED in\t1913 ")).unwrap();
    let c = normalize(&finding("\"Fed created in 1913!\"")).unwrap();
    assert_eq!(a.text, "fed created in 1913");
    assert_eq!(a.fingerprint, b.fingerprint);
    assert_eq!(a.fingerprint, c.fingerprint);
  }

  #[test]
  fn inner_punctuation_is_kept() {
    let n = normalize(&finding("U.S. dollar: 1971.")).unwrap();
    assert_eq!(n.text, "u.s. dollar: 1971");
  }

  #[test]
  fn distinct_text_has_distinct_fingerprint() {
    let a = normalize(&finding("Fed created in 1913")).unwrap();
    let b = normalize(&finding("Fed created in 1914")).unwrap();
    assert_ne!(a.fingerprint, b.fingerprint);
  }

  #[test]
  fn empty_and_punctuation_only_text_is_rejected() {
    for text in ["", "   \n\t", "...", " -- ! "] {
      assert!(
        matches!(normalize(&finding(text)), Err(Error::InvalidInput(_))),
        "{text:?} should be rejected"
      );
    }
  }

  #[test]
  fn validate_rejects_bad_metadata() {
    let mut f = finding("ok");
    f.confidence = 1.5;
    assert!(validate(&f).is_err());
    f.confidence = f64::NAN;
    assert!(validate(&f).is_err());
    let mut f = finding("ok");
    f.topic = " ".into();
    assert!(validate(&f).is_err());
    assert!(validate(&finding("ok")).is_ok());
  }

  #[test]
  fn claim_defaults_to_normalized_text() {
    let f = finding("Nixon ended the gold standard.");
    let n = normalize(&f).unwrap();
    assert_eq!(canonical_claim(&f, &n).unwrap(), "nixon ended the gold standard");

    let f = f.with_claim("  Gold standard ENDED ");
    assert_eq!(canonical_claim(&f, &n).unwrap(), "gold standard ended");
  }
}

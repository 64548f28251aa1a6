//! Spirit classifier: maps a normalized probe result to a verdict.

use crate::types::{ProbeResult, Verdict};

/// Classify a probe result.
///
/// An available target is `Healthy`, any probe failure is `Unhealthy`, and a
/// target that answered but reported itself unavailable is `Indeterminate`.
pub fn classify(result: &ProbeResult) -> Verdict {
    match result {
        ProbeResult::Reported { availability: true } => Verdict::Healthy,
        ProbeResult::Failed { .. } => Verdict::Unhealthy,
        ProbeResult::Reported { availability: false } => Verdict::Indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_is_healthy() {
        assert_eq!(classify(&ProbeResult::available(true)), Verdict::Healthy);
    }

    #[test]
    fn any_error_is_unhealthy() {
        for msg in ["timeout", "connection refused", "unexpected status 503", ""] {
            assert_eq!(classify(&ProbeResult::failed(msg)), Verdict::Unhealthy);
        }
    }

    #[test]
    fn unavailable_is_indeterminate() {
        assert_eq!(
            classify(&ProbeResult::available(false)),
            Verdict::Indeterminate
        );
    }

    #[test]
    fn classification_is_deterministic() {
        let result = ProbeResult::available(false);
        let first = classify(&result);
        for _ in 0..100 {
            assert_eq!(classify(&result), first);
        }
    }
}

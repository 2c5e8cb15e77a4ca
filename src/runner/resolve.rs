use crate::locator::Locator;
use crate::trace::{EngineEvent, EventSink};
use crate::{Error, Result};
use std::future::Future;

/// Probe errors kept for the final report are cut to this many characters.
const ERROR_SNIPPET: usize = 100;

/// The first candidate whose probe succeeded.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub locator: Locator,
    pub value: T,
    /// Probes run, including the successful one.
    pub attempts: usize,
}

/// Probe `candidates` in order and stop at the first success.
///
/// Later candidates are never probed once one succeeds. A fatal error ends the
/// search at once; any other error is recorded and the next candidate is tried.
pub async fn resolve<T, F, Fut>(
    sink: &dyn EventSink,
    step: u32,
    target: &str,
    candidates: &[Locator],
    mut probe: F,
) -> Result<Resolved<T>>
where
    F: FnMut(Locator) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = candidates.len();
    let mut last_error = String::from("no candidates");

    for (i, locator) in candidates.iter().enumerate() {
        sink.emit(EngineEvent::CandidateAttempted {
            step,
            index: i + 1,
            total,
            locator: locator.to_string(),
        });

        match probe(locator.clone()).await {
            Ok(value) => {
                sink.emit(EngineEvent::CandidateSucceeded {
                    step,
                    locator: locator.to_string(),
                    attempts: i + 1,
                });
                return Ok(Resolved {
                    locator: locator.clone(),
                    value,
                    attempts: i + 1,
                });
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                last_error = truncate(&e.to_string(), ERROR_SNIPPET);
                sink.emit(EngineEvent::CandidateFailed {
                    step,
                    locator: locator.to_string(),
                    error: last_error.clone(),
                });
            }
        }
    }

    Err(Error::AllCandidatesExhausted {
        target: target.to_string(),
        tried: total,
        last_error,
    })
}

/// At most `max` characters of `s`.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::MemorySink;
    use std::cell::Cell;

    fn candidates(n: usize) -> Vec<Locator> {
        (0..n).map(|i| Locator::css(format!("#c{i}"))).collect()
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let sink = MemorySink::new();
        let calls = Cell::new(0);
        let list = candidates(6);

        let resolved = resolve(&sink, 1, "thing", &list, |loc| {
            calls.set(calls.get() + 1);
            async move {
                if loc.expr() == "#c2" {
                    Ok(loc.expr().len())
                } else {
                    Err(Error::LocatorNotFound(loc.to_string()))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(calls.get(), 3);
        assert_eq!(resolved.attempts, 3);
        assert_eq!(resolved.locator, Locator::css("#c2"));
        let attempted = sink
            .events()
            .iter()
            .filter(|e| matches!(e, EngineEvent::CandidateAttempted { .. }))
            .count();
        assert_eq!(attempted, 3);
    }

    #[tokio::test]
    async fn exhaustion_reports_count_and_last_error() {
        let sink = MemorySink::new();
        let long = "x".repeat(300);
        let err = resolve::<(), _, _>(&sink, 1, "thing", &candidates(4), |_| {
            let long = long.clone();
            async move { Err(Error::Timeout(long)) }
        })
        .await
        .unwrap_err();

        match err {
            Error::AllCandidatesExhausted {
                tried, last_error, ..
            } => {
                assert_eq!(tried, 4);
                assert_eq!(last_error.chars().count(), ERROR_SNIPPET);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn fatal_error_stops_search() {
        let sink = MemorySink::new();
        let calls = Cell::new(0);
        let err = resolve::<(), _, _>(&sink, 1, "thing", &candidates(5), |_| {
            calls.set(calls.get() + 1);
            async { Err(Error::Driver("connection closed".into())) }
        })
        .await
        .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn empty_list_is_exhausted() {
        let sink = MemorySink::new();
        let err = resolve::<(), _, _>(&sink, 1, "thing", &[], |_| async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AllCandidatesExhausted { tried: 0, .. }));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}

use futures::StreamExt;
use std::future::Future;

/// Most remote requests a batch keeps outstanding at once.
pub const MAX_IN_FLIGHT: usize = 5;

/// Runs `task` for every item with at most [`MAX_IN_FLIGHT`] futures pending.
/// Results arrive in completion order; callers sort them.
pub async fn run_bounded<I, F, Fut>(items: I, task: F) -> Vec<Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    futures::stream::iter(items)
        .map(task)
        .buffer_unordered(MAX_IN_FLIGHT)
        .collect::<Vec<_>>()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_the_in_flight_limit() {
        let current = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut results = run_bounded(0..20, |n| {
            let current = Arc::clone(&current);
            let peak = Arc::clone(&peak);
            async move {
                let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                current.fetch_sub(1, Ordering::SeqCst);
                n * 2
            }
        })
        .await;

        results.sort_unstable();
        assert_eq!(results, (0..20).map(|n| n * 2).collect::<Vec<_>>());
        assert_eq!(peak.load(Ordering::SeqCst), MAX_IN_FLIGHT);
    }
}

//! Bounded-batch async mapping.

use futures::future::join_all;
use std::future::Future;

/// Map `items` through `f` with at most `batch_size` futures in flight.
/// Batches are sequential: batch N+1 starts only after batch N has fully
/// resolved. Output order matches input order.
pub async fn map_batched<T, U, F, Fut>(items: Vec<T>, batch_size: usize, f: F) -> Vec<U>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = U>,
{
    debug_assert!(batch_size > 0);
    let mut results = Vec::with_capacity(items.len());
    let mut iter = items.into_iter();
    loop {
        let batch: Vec<T> = iter.by_ref().take(batch_size.max(1)).collect();
        if batch.is_empty() {
            break;
        }
        results.extend(join_all(batch.into_iter().map(&f)).await);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn preserves_input_order() {
        let out = map_batched(vec![3_u64, 1, 2], 2, |n| async move {
            // Later inputs finish first; order must still hold.
            tokio::time::sleep(Duration::from_millis(n * 10)).await;
            n * 100
        })
        .await;
        assert_eq!(out, vec![300, 100, 200]);
    }

    #[tokio::test]
    async fn never_exceeds_batch_size_in_flight() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let items: Vec<usize> = (0..10).collect();
        map_batched(items, 4, |_| {
            let in_flight = in_flight.clone();
            let max_seen = max_seen.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert!(max_seen.load(Ordering::SeqCst) <= 4);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let out: Vec<i32> = map_batched(Vec::<i32>::new(), 4, |n| async move { n }).await;
        assert!(out.is_empty());
    }
}

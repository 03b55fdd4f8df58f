use std::future::Future;

use futures::future::try_join_all;

/// Maps `items` through `f`, at most `limit` calls in flight at a time.
///
/// Items are cut into consecutive chunks of `limit`. The calls of one chunk
/// run concurrently and the next chunk starts only after the whole chunk has
/// settled. Results come back in input order. The first failure fails the
/// call; siblings already running in that chunk are dropped with it.
pub async fn bounded_concurrent_map<T, R, E, F, Fut>(
    items: Vec<T>,
    limit: usize,
    mut f: F,
) -> Result<Vec<R>, E>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let limit = limit.max(1);
    let mut results = Vec::with_capacity(items.len());
    let mut remaining = items.into_iter().peekable();
    while remaining.peek().is_some() {
        let chunk: Vec<Fut> = remaining.by_ref().take(limit).map(&mut f).collect();
        results.extend(try_join_all(chunk).await?);
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[tokio::test]
    async fn runs_sequential_groups_of_limit() {
        let completed = AtomicUsize::new(0);
        let group_marks = Mutex::new(BTreeSet::new());
        let items: Vec<usize> = (0..1200).collect();

        let results = bounded_concurrent_map(items, 500, |item| {
            // Every call of a group starts before any call of that group completes.
            group_marks
                .lock()
                .unwrap()
                .insert(completed.load(Ordering::SeqCst));
            let completed = &completed;
            async move {
                tokio::task::yield_now().await;
                completed.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(item * 2)
            }
        })
        .await
        .unwrap();

        assert_eq!(results.len(), 1200);
        assert!(results.iter().enumerate().all(|(index, value)| *value == index * 2));
        assert_eq!(
            group_marks.into_inner().unwrap(),
            BTreeSet::from([0, 500, 1000])
        );
    }

    #[tokio::test]
    async fn failure_stops_later_groups() {
        let started = AtomicUsize::new(0);
        let result = bounded_concurrent_map((0..10).collect::<Vec<u32>>(), 3, |item| {
            started.fetch_add(1, Ordering::SeqCst);
            async move {
                if item == 4 {
                    Err(format!("item {item} failed"))
                } else {
                    Ok(item)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap_err(), "item 4 failed");
        assert_eq!(started.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn zero_limit_is_treated_as_one() {
        let results = bounded_concurrent_map(vec![1, 2, 3], 0, |item| async move {
            Ok::<_, ()>(item + 1)
        })
        .await
        .unwrap();
        assert_eq!(results, vec![2, 3, 4]);
    }
}

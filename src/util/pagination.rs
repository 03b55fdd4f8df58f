use std::future::Future;

use futures::stream::{self, Stream, TryStreamExt};

/// One page of results plus the token that fetches the next one.
#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_page_token: Option<String>) -> Self {
        Self {
            items,
            next_page_token,
        }
    }

    /// A page with no successor.
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }

    /// Absent and empty tokens both mark the last page.
    pub fn has_more(&self) -> bool {
        self.next_page_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

/// Lazily walks a token-paginated listing.
///
/// `fetch_page` receives `None` for the first page and the previous page's
/// token afterwards. Nothing is fetched until the stream is polled, and each
/// call starts a fresh pass. The stream ends after the last page or after the
/// first error, which is yielded.
pub fn paginate<T, E, F, Fut>(fetch_page: F) -> impl Stream<Item = Result<Page<T>, E>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    // `None` once the listing is exhausted, otherwise the token to fetch with.
    let cursor: Option<Option<String>> = Some(None);
    stream::unfold((fetch_page, cursor), |(mut fetch_page, cursor)| async move {
        let token = cursor?;
        match fetch_page(token).await {
            Ok(page) => {
                let next = if page.has_more() {
                    Some(page.next_page_token.clone())
                } else {
                    None
                };
                Some((Ok(page), (fetch_page, next)))
            }
            Err(err) => Some((Err(err), (fetch_page, None))),
        }
    })
}

/// Drains every page of a listing into one vector.
pub async fn collect_all<T, E, F, Fut>(fetch_page: F) -> Result<Vec<T>, E>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
{
    paginate(fetch_page)
        .try_fold(Vec::new(), |mut items, page| async move {
            items.extend(page.items);
            Ok(items)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use std::pin::pin;
    use std::sync::Mutex;

    fn pages() -> Vec<Page<u32>> {
        vec![
            Page::new(vec![1, 2], Some("a".into())),
            Page::new(vec![3], Some("b".into())),
            Page::new(vec![4], Some(String::new())),
        ]
    }

    #[tokio::test]
    async fn walks_pages_until_token_is_empty() {
        let seen_tokens = Mutex::new(Vec::new());
        let source = pages();
        let items = collect_all(|token: Option<String>| {
            seen_tokens.lock().unwrap().push(token.clone());
            let index = match token.as_deref() {
                None => 0,
                Some("a") => 1,
                Some("b") => 2,
                Some(other) => panic!("unexpected token {other}"),
            };
            let page = source[index].clone();
            async move { Ok::<_, String>(page) }
        })
        .await
        .unwrap();
        assert_eq!(items, vec![1, 2, 3, 4]);
        assert_eq!(
            *seen_tokens.lock().unwrap(),
            vec![None, Some("a".to_string()), Some("b".to_string())]
        );
    }

    #[tokio::test]
    async fn nothing_is_fetched_until_polled() {
        let calls = Mutex::new(0);
        let mut stream = pin!(paginate(|_token: Option<String>| {
            *calls.lock().unwrap() += 1;
            async { Ok::<_, String>(Page::last(vec![1u32])) }
        }));
        assert_eq!(*calls.lock().unwrap(), 0);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.items, vec![1]);
        assert!(stream.next().await.is_none());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn stops_after_an_error() {
        let mut stream = pin!(paginate(|token: Option<String>| async move {
            match token {
                None => Ok(Page::new(vec![1u32], Some("next".into()))),
                Some(_) => Err("boom".to_string()),
            }
        }));
        assert!(stream.next().await.unwrap().is_ok());
        assert_eq!(stream.next().await.unwrap().unwrap_err(), "boom");
        assert!(stream.next().await.is_none());
    }
}

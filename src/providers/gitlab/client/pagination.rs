use log::debug;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::api::GitLabApi;
use crate::error::Result;

pub const PER_PAGE: u32 = 100;

/// One page of a REST collection.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Value>,
    pub next_page: Option<u32>,
}

/// Next page number from GitLab's `x-next-page` header, falling back to the
/// `rel="next"` entry of the `Link` header.
pub fn next_page_from_headers(headers: &HeaderMap) -> Option<u32> {
    let from_header = headers
        .get("x-next-page")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok());

    from_header.or_else(|| {
        headers
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(next_page_from_link)
    })
}

fn next_page_from_link(link: &str) -> Option<u32> {
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.contains("rel=\"next\"") {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = Url::parse(target).ok()?;
        let mut pairs = url.query_pairs();
        let page = pairs.find(|(k, _)| k == "page")?;
        page.1.parse().ok()
    })
}

/// Follows pagination until the collection is exhausted or `max_items` is reached,
/// concatenating pages in the order they were served.
pub async fn fetch_all<T: DeserializeOwned>(
    api: &dyn GitLabApi,
    path: &str,
    query: &[(&str, String)],
    max_items: Option<usize>,
) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut page = 1;

    loop {
        let per_page = match max_items {
            #[allow(clippy::cast_possible_truncation)]
            Some(max) => (max.saturating_sub(items.len()).min(PER_PAGE as usize) as u32).max(1),
            None => PER_PAGE,
        };

        let result = api.get_page(path, query, page, per_page).await?;
        let fetched = result.items.len();
        for item in result.items {
            items.push(serde_json::from_value(item)?);
        }

        debug!("{path} page {page}: {fetched} items (total: {})", items.len());

        if max_items.is_some_and(|max| items.len() >= max) {
            break;
        }

        match result.next_page {
            // A server repeating the same page would otherwise loop forever
            Some(next) if next > page => page = next,
            _ => break,
        }
    }

    if let Some(max) = max_items {
        items.truncate(max);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::gitlab::client::testing::MockGitLab;
    use reqwest::header::HeaderValue;
    use serde_json::json;

    #[test]
    fn test_next_page_from_x_next_page() {
        let mut headers = HeaderMap::new();
        headers.insert("x-next-page", HeaderValue::from_static("3"));

        assert_eq!(next_page_from_headers(&headers), Some(3));
    }

    #[test]
    fn test_empty_x_next_page_means_last_page() {
        let mut headers = HeaderMap::new();
        headers.insert("x-next-page", HeaderValue::from_static(""));

        assert_eq!(next_page_from_headers(&headers), None);
    }

    #[test]
    fn test_next_page_from_link_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            reqwest::header::LINK,
            HeaderValue::from_static(
                "<https://gitlab.example.com/api/v4/projects/1/issues?page=1&per_page=2>; rel=\"prev\", \
                 <https://gitlab.example.com/api/v4/projects/1/issues?page=3&per_page=2>; rel=\"next\"",
            ),
        );

        assert_eq!(next_page_from_headers(&headers), Some(3));
    }

    #[test]
    fn test_no_pagination_headers() {
        assert_eq!(next_page_from_headers(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_fetch_all_concatenates_pages_in_order() {
        let api = MockGitLab::new().with_pages(
            "projects/1/repository/commits",
            vec![
                vec![json!({"n": 1}), json!({"n": 2})],
                vec![json!({"n": 3})],
            ],
        );

        let items: Vec<Value> = fetch_all(&api, "projects/1/repository/commits", &[], None)
            .await
            .unwrap();

        let ns: Vec<i64> = items.iter().map(|v| v["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_all_stops_at_max_items() {
        let api = MockGitLab::new().with_pages(
            "projects/1/pipelines",
            vec![
                vec![json!({"n": 1}), json!({"n": 2})],
                vec![json!({"n": 3}), json!({"n": 4})],
            ],
        );

        let items: Vec<Value> = fetch_all(&api, "projects/1/pipelines", &[], Some(3))
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(api.page_requests("projects/1/pipelines"), vec![1, 2]);
    }
}

use serde::Deserialize;

use crate::BASE_URL;
use crate::client::{self, ClientConfig};

/// One page of the request-history endpoint.
///
/// Records stay raw JSON; the shapes that matter are picked apart by the
/// fee extractor.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestsPage {
    pub requests: Option<Vec<serde_json::Value>>,
    pub continuation: Option<String>,
}

/// Fetch one page of request history for a wallet.
///
/// Returns `None` once the client has exhausted its retries.
pub async fn fetch_requests_page(
    cfg: &ClientConfig,
    wallet: &str,
    continuation: Option<&str>,
) -> Option<RequestsPage> {
    let mut query = vec![("user", wallet), ("privateChainsToInclude", "")];
    if let Some(token) = continuation {
        query.push(("continuation", token));
    }
    client::get_json(cfg, BASE_URL, &query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── RequestsPage deserialization ───────────────────────────────

    #[test]
    fn empty_body_has_no_requests() {
        let page: RequestsPage = serde_json::from_value(json!({})).expect("valid page");
        assert!(page.requests.is_none());
        assert!(page.continuation.is_none());
    }

    #[test]
    fn empty_requests_list_is_present() {
        let page: RequestsPage =
            serde_json::from_value(json!({ "requests": [] })).expect("valid page");
        assert_eq!(page.requests.expect("requests list").len(), 0);
    }

    #[test]
    fn unknown_fields_ignored() {
        let page: RequestsPage = serde_json::from_value(json!({
            "requests": [{ "id": "r1" }],
            "continuation": "abc",
            "extra": { "ignored": true }
        }))
        .expect("valid page");
        assert_eq!(page.requests.expect("requests list").len(), 1);
        assert_eq!(page.continuation.as_deref(), Some("abc"));
    }
}

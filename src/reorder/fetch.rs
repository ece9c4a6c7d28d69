//! Paginated child-page retrieval for one folder.

use anyhow::{Context, Result};

use crate::auth::AuthMode;
use crate::cortex::search::SearchQuery;
use crate::cortex::CortexApi;
use crate::types::PageRecord;

const PAGE_FIELDS: &str = "CoreField.Identifier,CoreField.OriginalFileName";
const PAGE_SORT: &str = "manual order";
const PAGE_SIZE: u32 = 100;

/// Fetch every `Page` child of `folder_uid` in the server's manual order.
///
/// Stops at the first empty result page.
pub async fn fetch_pages(api: &CortexApi, folder_uid: &str) -> Result<Vec<PageRecord>> {
    let mut pages = Vec::new();
    let mut page_number = 1;
    loop {
        let query = SearchQuery {
            query: format!("ParentFolderIdentifier:{folder_uid} AND DocSubType:Page"),
            fields: PAGE_FIELDS,
            sort: Some(PAGE_SORT),
            page_number,
            count_per_page: PAGE_SIZE,
        };
        let response = api
            .search(&query, AuthMode::Cookie)
            .await
            .with_context(|| format!("Failed to fetch pages of {folder_uid} (page {page_number})"))?;

        let items = response.into_items();
        if items.is_empty() {
            break;
        }
        for item in items {
            let page: PageRecord = serde_json::from_value(item)
                .with_context(|| format!("Malformed page record in folder {folder_uid}"))?;
            if page.identifier.is_empty() {
                tracing::warn!(folder = folder_uid, "Skipping page without an identifier");
                continue;
            }
            pages.push(page);
        }
        page_number += 1;
    }

    tracing::debug!(folder = folder_uid, count = pages.len(), "Fetched pages");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cortex::fake::{CallKind, FakeCortex};

    #[tokio::test]
    async fn test_fetch_preserves_manual_order() {
        let fake = FakeCortex::new();
        fake.add_folder("F1", "10", "Score", &[("1", "b.tif"), ("2", "a.tif"), ("3", "c.tif")]);
        let pages = fetch_pages(&fake.api(), "F1").await.unwrap();
        let ids: Vec<_> = pages.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(pages[0].original_file_name, "b.tif");
    }

    #[tokio::test]
    async fn test_fetch_paginates_until_empty_page() {
        let fake = FakeCortex::new();
        let children: Vec<(String, String)> = (0..250)
            .map(|i| (i.to_string(), format!("{i:04}.tif")))
            .collect();
        let refs: Vec<(&str, &str)> = children
            .iter()
            .map(|(a, b)| (a.as_str(), b.as_str()))
            .collect();
        fake.add_folder("F1", "10", "Score", &refs);

        let pages = fetch_pages(&fake.api(), "F1").await.unwrap();
        assert_eq!(pages.len(), 250);
        // 100 + 100 + 50 + one empty page.
        assert_eq!(fake.count(CallKind::Search), 4);
    }

    #[tokio::test]
    async fn test_fetch_empty_folder() {
        let fake = FakeCortex::new();
        fake.add_folder("F1", "10", "Score", &[]);
        assert!(fetch_pages(&fake.api(), "F1").await.unwrap().is_empty());
        assert_eq!(fake.count(CallKind::Search), 1);
    }

    #[tokio::test]
    async fn test_fetch_uses_cookie_and_recovers_from_401() {
        let fake = FakeCortex::new();
        fake.add_folder("F1", "10", "Score", &[("1", "a")]);
        let api = fake.api();
        api.authenticate().await.unwrap();
        fake.reject_next_authorized(1);

        let pages = fetch_pages(&api, "F1").await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(fake.last_cookie().as_deref(), Some("cookie-2"));
        assert_eq!(fake.count(CallKind::TokenExchange), 2);
    }
}

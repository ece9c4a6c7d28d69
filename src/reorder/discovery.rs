//! Parent folder discovery across document subtypes.

use anyhow::{Context, Result};

use crate::auth::AuthMode;
use crate::cortex::search::SearchQuery;
use crate::cortex::CortexApi;
use crate::pacing::Throttle;
use crate::state::DiscoverySnapshot;
use crate::types::ParentFolder;

const DISCOVERY_FIELDS: &str = "CoreField.Unique-Identifier,RecordID,ChildCount";
const DISCOVERY_PAGE_SIZE: u32 = 300;

/// Subtypes searched when none are configured, in search order.
pub const DEFAULT_SUBTYPES: [&str; 5] = [
    "Concert Program",
    "Score",
    "Part",
    "Business Document",
    "Press Clippings",
];

/// Return every parent folder with at least one child.
///
/// An existing snapshot is returned as-is without contacting the server.
/// Otherwise each subtype is paged through in order and the merged list is
/// persisted as the new snapshot. Folders matching several subtypes appear
/// once per match.
pub async fn discover_parents(
    api: &CortexApi,
    snapshot: &DiscoverySnapshot,
    subtypes: &[String],
    throttle: Throttle,
) -> Result<Vec<ParentFolder>> {
    if let Some(folders) = snapshot
        .load()
        .await
        .context("Failed to read discovery snapshot")?
    {
        tracing::info!(
            count = folders.len(),
            path = %snapshot.path().display(),
            "Using cached parent folder list"
        );
        return Ok(folders);
    }

    let mut folders = Vec::new();
    for subtype in subtypes {
        let found = discover_subtype(api, subtype, throttle).await?;
        tracing::info!(subtype = %subtype, count = found.len(), "Discovered parent folders");
        folders.extend(found);
    }

    snapshot
        .store(&folders)
        .await
        .context("Failed to write discovery snapshot")?;
    tracing::info!(count = folders.len(), "Saved parent folder list");
    Ok(folders)
}

async fn discover_subtype(
    api: &CortexApi,
    subtype: &str,
    throttle: Throttle,
) -> Result<Vec<ParentFolder>> {
    let mut folders = Vec::new();
    let mut page_number = 1;
    loop {
        let query = SearchQuery {
            query: format!("DocSubType:{subtype}"),
            fields: DISCOVERY_FIELDS,
            sort: None,
            page_number,
            count_per_page: DISCOVERY_PAGE_SIZE,
        };
        let response = api
            .search(&query, AuthMode::Bearer)
            .await
            .with_context(|| format!("Parent discovery failed for {subtype} (page {page_number})"))?;
        tracing::debug!(
            subtype,
            page = page_number,
            items = response.items().len(),
            "Fetched discovery page"
        );

        let has_next = response.has_next_page();
        let items = response.into_items();
        let exhausted = items.is_empty();
        folders.extend(items.iter().filter_map(ParentFolder::from_search_item));
        throttle.pause().await;

        if exhausted || !has_next {
            return Ok(folders);
        }
        page_number += 1;
    }
}

//! Cortex DAM API client: search, batch field edit and single-record update.

pub mod error;
#[cfg(test)]
pub(crate) mod fake;
pub mod search;
pub mod transport;

use std::sync::Arc;

use serde_json::json;

use crate::auth::error::AuthError;
use crate::auth::{AuthMode, SessionManager};

use self::error::ApiError;
use self::search::{SearchQuery, SearchResponse};
use self::transport::ApiRequest;

/// Field holding a page's parent folder record id.
const PARENT_FOLDER_FIELD: &str = "CoreField.Parent-folder";

/// Cheaply cloneable handle to the Cortex API; clones share one session.
#[derive(Clone, Debug)]
pub struct CortexApi {
    session: Arc<SessionManager>,
}

impl CortexApi {
    pub fn new(session: SessionManager) -> Self {
        Self {
            session: Arc::new(session),
        }
    }

    pub async fn authenticate(&self) -> Result<(), AuthError> {
        self.session.authenticate().await
    }

    /// Fetch one page of search results.
    pub async fn search(
        &self,
        query: &SearchQuery<'_>,
        mode: AuthMode,
    ) -> Result<SearchResponse, ApiError> {
        let url = &self.session.endpoints().search;
        let mut request = ApiRequest::get(url);
        request.query = query.to_params();
        let response = self.session.send(request, mode).await?;
        response.json(url)
    }

    /// Clear the parent-folder field of every listed page in one batch edit.
    ///
    /// Returns the HTTP status of the successful call.
    pub async fn clear_parent(&self, page_ids: &[String]) -> Result<u16, ApiError> {
        let url = &self.session.endpoints().batch_edit;
        let request = ApiRequest::post(url).json(json!({
            "documents": page_ids,
            "fieldAssignments": [{
                "field": PARENT_FOLDER_FIELD,
                "value": "",
                "batchsettings": {"batchOption": "None"}
            }],
            "ignoreNotEditableDocuments": true,
            "ignoreInvalidDocuments": true,
        }));
        let response = self.session.send(request, AuthMode::Bearer).await?;
        Ok(response.status)
    }

    /// Set one page's parent folder. Cortex appends the page to the end of
    /// that folder's manual order.
    pub async fn assign_parent(&self, page_id: &str, parent_record_id: &str) -> Result<u16, ApiError> {
        let url = &self.session.endpoints().page_update;
        // The trailing colon on the field key is what the DataTable API expects.
        let request = ApiRequest::post(url)
            .query("CoreField.Identifier", page_id)
            .query(format!("{PARENT_FOLDER_FIELD}:"), parent_record_id);
        let response = self.session.send(request, AuthMode::Cookie).await?;
        Ok(response.status)
    }
}

//! Cortex endpoint paths, resolved against a configurable base URL.

pub(crate) const TOKEN_PATH: &str = "/webapi/security/oauth2/token_48I_v1";
pub(crate) const LOGIN_PATH: &str = "/API/Authentication/v1.0/Login";
pub(crate) const SEARCH_PATH: &str = "/API/search/v3.0/search";
pub(crate) const BATCH_EDIT_PATH: &str =
    "/webapi/objectmanagement/multiobjectstools/batchedit/batcheditfields_4FQ_v1";
pub(crate) const PAGE_UPDATE_PATH: &str = "/API/DataTable/v2.2/Documents.Image.Page:Update";

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub token: String,
    pub login: String,
    pub search: String,
    pub batch_edit: String,
    pub page_update: String,
}

impl Endpoints {
    /// Build endpoint URLs under `base`. A path prefix on the base is kept.
    pub fn for_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            token: format!("{base}{TOKEN_PATH}"),
            login: format!("{base}{LOGIN_PATH}"),
            search: format!("{base}{SEARCH_PATH}"),
            batch_edit: format!("{base}{BATCH_EDIT_PATH}"),
            page_update: format!("{base}{PAGE_UPDATE_PATH}"),
        }
    }
}

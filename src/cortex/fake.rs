//! In-memory Cortex server for tests.
//!
//! Models folders whose children keep a manual order, batch detach, and
//! reattach-appends-to-end. Issues numbered tokens (`bearer-N`, `cookie-N`)
//! and rejects requests carrying stale ones.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use super::error::ApiError;
use super::transport::{ApiRequest, ApiResponse, Transport};
use super::CortexApi;
use crate::auth::endpoints::{
    Endpoints, BATCH_EDIT_PATH, LOGIN_PATH, PAGE_UPDATE_PATH, SEARCH_PATH, TOKEN_PATH,
};
use crate::auth::{Credentials, SessionManager};

pub(crate) const BASE_URL: &str = "http://cortex.test";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    TokenExchange,
    Login,
    Search,
    BatchEdit,
    PageUpdate,
}

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub kind: CallKind,
    pub page_ids: Vec<String>,
}

struct FakeFolder {
    uid: String,
    record_id: String,
    subtype: String,
    children: Vec<(String, String)>,
}

struct InjectedFailure {
    kind: CallKind,
    skip: usize,
    status: u16,
}

#[derive(Default)]
struct FakeState {
    folders: Vec<FakeFolder>,
    detached: HashMap<String, String>,
    generation: u32,
    login_succeeds: bool,
    reject_authorized: u32,
    failures: Vec<InjectedFailure>,
    calls: Vec<Call>,
    last_bearer: Option<String>,
    last_cookie: Option<String>,
}

#[derive(Clone)]
pub(crate) struct FakeCortex {
    state: Arc<Mutex<FakeState>>,
}

fn respond(status: u16, body: Value) -> ApiResponse {
    ApiResponse {
        status,
        body: body.to_string(),
    }
}

fn paginate<T: Clone>(items: &[T], request: &ApiRequest) -> (Vec<T>, bool) {
    let page: usize = request
        .query_value("pagenumber")
        .and_then(|p| p.parse().ok())
        .unwrap_or(1);
    let per_page: usize = request
        .query_value("countperpage")
        .and_then(|p| p.parse().ok())
        .unwrap_or(100);
    let start = page.saturating_sub(1) * per_page;
    let slice: Vec<T> = items.iter().skip(start).take(per_page).cloned().collect();
    let has_next = start + per_page < items.len();
    (slice, has_next)
}

fn search_body(items: Vec<Value>, has_next: bool) -> Value {
    let global_info = if has_next {
        json!({"NextPage": {"href": "next"}})
    } else {
        json!({})
    };
    json!({"APIResponse": {"Items": items, "GlobalInfo": global_info}})
}

impl FakeCortex {
    pub fn new() -> Self {
        let state = FakeState {
            login_succeeds: true,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints::for_base(BASE_URL)
    }

    /// An API client whose transport is this fake.
    pub fn api(&self) -> CortexApi {
        CortexApi::new(SessionManager::new(
            Box::new(self.clone()),
            self.endpoints(),
            Credentials {
                client_id: "id".into(),
                client_secret: "secret".into(),
                username: "user".into(),
                password: "pw".into(),
            },
        ))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn add_folder(&self, uid: &str, record_id: &str, subtype: &str, pages: &[(&str, &str)]) {
        self.lock().folders.push(FakeFolder {
            uid: uid.to_string(),
            record_id: record_id.to_string(),
            subtype: subtype.to_string(),
            children: pages
                .iter()
                .map(|(id, name)| (id.to_string(), name.to_string()))
                .collect(),
        });
    }

    /// Current manual order of a folder's children, as filenames.
    pub fn child_names(&self, uid: &str) -> Vec<String> {
        self.lock()
            .folders
            .iter()
            .find(|f| f.uid == uid)
            .map(|f| f.children.iter().map(|(_, n)| n.clone()).collect())
            .unwrap_or_default()
    }

    pub fn detached_count(&self) -> usize {
        self.lock().detached.len()
    }

    pub fn set_login_succeeds(&self, succeeds: bool) {
        self.lock().login_succeeds = succeeds;
    }

    /// Answer the next `n` authorized (non-auth) requests with 401.
    pub fn reject_next_authorized(&self, n: u32) {
        self.lock().reject_authorized = n;
    }

    pub fn fail_next(&self, kind: CallKind, status: u16) {
        self.fail_after(kind, 0, status);
    }

    /// Let `skip` calls of `kind` through, then fail the next one.
    pub fn fail_after(&self, kind: CallKind, skip: usize, status: u16) {
        self.lock()
            .failures
            .push(InjectedFailure { kind, skip, status });
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.lock().calls.iter().filter(|c| c.kind == kind).count()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Page ids of every successful single update, in call order.
    pub fn update_order(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind == CallKind::PageUpdate && !c.page_ids.is_empty())
            .flat_map(|c| c.page_ids)
            .collect()
    }

    pub fn batch_edits(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind == CallKind::BatchEdit && !c.page_ids.is_empty())
            .map(|c| c.page_ids)
            .collect()
    }

    pub fn last_bearer(&self) -> Option<String> {
        self.lock().last_bearer.clone()
    }

    pub fn last_cookie(&self) -> Option<String> {
        self.lock().last_cookie.clone()
    }

    fn kind_of(url: &str) -> Option<CallKind> {
        if url.ends_with(TOKEN_PATH) {
            Some(CallKind::TokenExchange)
        } else if url.ends_with(LOGIN_PATH) {
            Some(CallKind::Login)
        } else if url.ends_with(SEARCH_PATH) {
            Some(CallKind::Search)
        } else if url.ends_with(BATCH_EDIT_PATH) {
            Some(CallKind::BatchEdit)
        } else if url.ends_with(PAGE_UPDATE_PATH) {
            Some(CallKind::PageUpdate)
        } else {
            None
        }
    }

    fn handle(&self, kind: CallKind, request: &ApiRequest) -> ApiResponse {
        let mut state = self.lock();
        state.calls.push(Call {
            kind,
            page_ids: Vec::new(),
        });

        if let Some(pos) = state.failures.iter().position(|f| f.kind == kind) {
            if state.failures[pos].skip == 0 {
                let failure = state.failures.remove(pos);
                return respond(failure.status, json!({"error": "injected failure"}));
            }
            state.failures[pos].skip -= 1;
        }

        match kind {
            CallKind::TokenExchange => {
                state.generation += 1;
                respond(
                    200,
                    json!({"access_token": format!("bearer-{}", state.generation)}),
                )
            }
            CallKind::Login => {
                if state.login_succeeds {
                    respond(
                        200,
                        json!({"APIResponse": {"Code": "SUCCESS", "Token": format!("cookie-{}", state.generation)}}),
                    )
                } else {
                    respond(200, json!({"APIResponse": {"Code": "INVALID_LOGIN"}}))
                }
            }
            _ => {
                if !Self::authorized(&mut state, request) {
                    return respond(401, json!({"error": "unauthorized"}));
                }
                match kind {
                    CallKind::Search => Self::search(&state, request),
                    CallKind::BatchEdit => Self::batch_edit(&mut state, request),
                    _ => Self::page_update(&mut state, request),
                }
            }
        }
    }

    fn authorized(state: &mut FakeState, request: &ApiRequest) -> bool {
        if state.reject_authorized > 0 {
            state.reject_authorized -= 1;
            return false;
        }
        if let Some(auth) = request.header_value("Authorization") {
            let bearer = auth.trim_start_matches("Bearer ").to_string();
            let ok = bearer == format!("bearer-{}", state.generation);
            state.last_bearer = Some(bearer);
            return ok;
        }
        let cookie = request.query_value("token").unwrap_or("").to_string();
        let ok = cookie == format!("cookie-{}", state.generation);
        state.last_cookie = Some(cookie);
        ok
    }

    fn search(state: &FakeState, request: &ApiRequest) -> ApiResponse {
        let query = request.query_value("query").unwrap_or("");
        if let Some(rest) = query.strip_prefix("ParentFolderIdentifier:") {
            let uid = rest.split(" AND ").next().unwrap_or("");
            let children: Vec<Value> = state
                .folders
                .iter()
                .find(|f| f.uid == uid)
                .map(|f| {
                    f.children
                        .iter()
                        .map(|(id, name)| {
                            json!({"CoreField.Identifier": id, "CoreField.OriginalFileName": name})
                        })
                        .collect()
                })
                .unwrap_or_default();
            let (items, has_next) = paginate(&children, request);
            return respond(200, search_body(items, has_next));
        }
        if let Some(subtype) = query.strip_prefix("DocSubType:") {
            let folders: Vec<Value> = state
                .folders
                .iter()
                .filter(|f| f.subtype == subtype)
                .map(|f| {
                    let record_id = f
                        .record_id
                        .parse::<u64>()
                        .map(Value::from)
                        .unwrap_or_else(|_| Value::from(f.record_id.clone()));
                    json!({
                        "CoreField.Unique-Identifier": f.uid,
                        "RecordID": record_id,
                        "ChildCount": f.children.len().to_string(),
                    })
                })
                .collect();
            let (items, has_next) = paginate(&folders, request);
            return respond(200, search_body(items, has_next));
        }
        respond(400, json!({"error": "unsupported query"}))
    }

    fn take_page(state: &mut FakeState, id: &str) -> Option<String> {
        if let Some(name) = state.detached.remove(id) {
            return Some(name);
        }
        for folder in &mut state.folders {
            if let Some(pos) = folder.children.iter().position(|(cid, _)| cid == id) {
                return Some(folder.children.remove(pos).1);
            }
        }
        None
    }

    fn batch_edit(state: &mut FakeState, request: &ApiRequest) -> ApiResponse {
        let body = request.json.clone().unwrap_or(Value::Null);
        let assignment = &body["fieldAssignments"][0];
        if assignment["field"] != "CoreField.Parent-folder" || assignment["value"] != "" {
            return respond(400, json!({"error": "unexpected field assignment"}));
        }
        let ids: Vec<String> = body["documents"]
            .as_array()
            .map(|docs| {
                docs.iter()
                    .filter_map(|d| d.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        for id in &ids {
            if let Some(name) = Self::take_page(state, id) {
                state.detached.insert(id.clone(), name);
            }
        }
        if let Some(call) = state.calls.last_mut() {
            call.page_ids = ids;
        }
        respond(200, json!({"status": "ok"}))
    }

    fn page_update(state: &mut FakeState, request: &ApiRequest) -> ApiResponse {
        let id = request
            .query_value("CoreField.Identifier")
            .unwrap_or("")
            .to_string();
        let record_id = request
            .query_value("CoreField.Parent-folder:")
            .unwrap_or("")
            .to_string();
        if !state.folders.iter().any(|f| f.record_id == record_id) {
            return respond(400, json!({"error": "unknown parent record"}));
        }
        let name = match Self::take_page(state, &id) {
            Some(name) => name,
            None => return respond(404, json!({"error": "unknown page"})),
        };
        if let Some(folder) = state.folders.iter_mut().find(|f| f.record_id == record_id) {
            folder.children.push((id.clone(), name));
        }
        if let Some(call) = state.calls.last_mut() {
            call.page_ids = vec![id];
        }
        respond(200, json!({"APIResponse": {"Code": "SUCCESS"}}))
    }
}

#[async_trait::async_trait]
impl Transport for FakeCortex {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        match Self::kind_of(&request.url) {
            Some(kind) => Ok(self.handle(kind, &request)),
            None => Err(ApiError::Network {
                url: request.url.clone(),
                message: "no route".into(),
            }),
        }
    }
}

use serde::Deserialize;
use serde_json::{Map, Value};

/// One page of a `/API/search/v3.0/search` query.
#[derive(Debug, Clone)]
pub struct SearchQuery<'a> {
    pub query: String,
    pub fields: &'a str,
    pub sort: Option<&'a str>,
    pub page_number: u32,
    pub count_per_page: u32,
}

impl SearchQuery<'_> {
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![
            ("query".to_string(), self.query.clone()),
            ("fields".to_string(), self.fields.to_string()),
            ("format".to_string(), "json".to_string()),
            ("pagenumber".to_string(), self.page_number.to_string()),
            ("countperpage".to_string(), self.count_per_page.to_string()),
        ];
        if let Some(sort) = self.sort {
            params.push(("sort".to_string(), sort.to_string()));
        }
        params
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(rename = "APIResponse", default)]
    pub api_response: SearchBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchBody {
    #[serde(rename = "Items", default)]
    pub items: Vec<Value>,
    #[serde(rename = "GlobalInfo", default)]
    pub global_info: Option<Map<String, Value>>,
}

impl SearchResponse {
    pub fn items(&self) -> &[Value] {
        &self.api_response.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.api_response.items
    }

    /// Whether the server advertised a further page.
    pub fn has_next_page(&self) -> bool {
        self.api_response
            .global_info
            .as_ref()
            .is_some_and(|info| info.contains_key("NextPage"))
    }
}

use serde::Serialize;

/// JSON object shape of one projected record.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

///
/// ListResponse
///
/// `items` and/or `totalRecords` depending on the requested response mode;
/// `cursor` resumes keyset pagination when the page was full.
///

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub items: Vec<JsonMap>,
    pub total_records: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

///
/// LookupListResponse
///
/// Typeahead page: `has_more` is probed with one extra candidate, never a
/// count query.
///

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupListResponse {
    pub items: Vec<JsonMap>,
    pub has_more: bool,
}

//! Audit log handler.

use serde::Serialize;

use crate::http::codec::Response;
use crate::state::AppState;
use crate::store::ActivityEntry;
use crate::types::Result;

/// Wire shape expected by the admin console.
#[derive(Debug, Serialize)]
struct ActivityRecord<'a> {
    #[serde(rename = "fecha")]
    date: String,
    #[serde(rename = "hora")]
    time: String,
    #[serde(rename = "clave")]
    code: &'a str,
    #[serde(rename = "estado")]
    status: String,
}

impl<'a> From<&'a ActivityEntry> for ActivityRecord<'a> {
    fn from(entry: &'a ActivityEntry) -> Self {
        Self {
            date: entry.date.format("%Y/%m/%d").to_string(),
            time: entry.time.format("%H:%M:%S").to_string(),
            code: entry.code.as_str(),
            status: entry.status.as_flag().to_string(),
        }
    }
}

/// `GET /log`
pub fn list(state: &AppState) -> Result<Response> {
    let entries = state.activity.snapshot()?;
    let records: Vec<ActivityRecord<'_>> = entries.iter().map(ActivityRecord::from).collect();
    Ok(Response::json(serde_json::to_vec(&records)?))
}

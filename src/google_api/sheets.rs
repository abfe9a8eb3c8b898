//! Sheets API v4 — the two calls backing the contacts table.
//!
//! `read_all_rows` pulls a worksheet's value range (first row = header).
//! `write_rows` clears the existing range, grows the grid when the table
//! outruns it, and writes header + rows back with RAW input.

use serde::Deserialize;

use super::{send_with_retry, GoogleApiError, RetryPolicy};
use crate::contacts::table::Table;

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Debug, Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: u32,
}

// ============================================================================
// Sink operations
// ============================================================================

/// Read the whole worksheet as a table. The first row is the header; a
/// never-written worksheet comes back with an empty schema.
pub async fn read_all_rows(
    client: &reqwest::Client,
    access_token: &str,
    spreadsheet_id: &str,
    title: &str,
) -> Result<Table, GoogleApiError> {
    let url = format!("{}/{}/values/'{}'", SHEETS_BASE, spreadsheet_id, title);

    let resp = send_with_retry(
        client.get(&url).bearer_auth(access_token),
        &RetryPolicy::default(),
    )
    .await?;
    let range: ValueRange = parse_response(resp).await?;

    let values = range
        .values
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect();
    Ok(Table::from_sheet_values(values))
}

/// Write the table back: clear the worksheet range, grow the grid when the
/// data outruns it, then write header + rows starting at `A{start_row}`.
pub async fn write_rows(
    client: &reqwest::Client,
    access_token: &str,
    spreadsheet_id: &str,
    title: &str,
    table: &Table,
    start_row: u32,
) -> Result<(), GoogleApiError> {
    // Clear first so stale rows below the new table cannot survive.
    let url = format!("{}/{}/values/'{}':clear", SHEETS_BASE, spreadsheet_id, title);
    let resp = send_with_retry(
        client
            .post(&url)
            .bearer_auth(access_token)
            .json(&serde_json::json!({})),
        &RetryPolicy::default(),
    )
    .await?;
    check_status(resp).await?;

    // Header + rows, offset to the start position.
    let needed_rows = start_row.saturating_sub(1) + table.len() as u32 + 1;
    let sheet = sheet_properties(client, access_token, spreadsheet_id, title).await?;
    if sheet.grid_properties.row_count < needed_rows {
        log::warn!(
            "Data rows exceed worksheet capacity ({} < {}), expanding",
            sheet.grid_properties.row_count,
            needed_rows
        );
        resize_rows(client, access_token, spreadsheet_id, sheet.sheet_id, needed_rows).await?;
    }

    let url = format!(
        "{}/{}/values/'{}'!A{}?valueInputOption=RAW",
        SHEETS_BASE, spreadsheet_id, title, start_row
    );
    let body = serde_json::json!({
        "majorDimension": "ROWS",
        "values": table.to_sheet_values(),
    });
    let resp = send_with_retry(
        client.put(&url).bearer_auth(access_token).json(&body),
        &RetryPolicy::default(),
    )
    .await?;
    check_status(resp).await?;

    Ok(())
}

/// Properties of one worksheet, located by title.
async fn sheet_properties(
    client: &reqwest::Client,
    access_token: &str,
    spreadsheet_id: &str,
    title: &str,
) -> Result<SheetProperties, GoogleApiError> {
    let url = format!(
        "{}/{}?fields=sheets(properties(sheetId,title,gridProperties(rowCount)))",
        SHEETS_BASE, spreadsheet_id
    );
    let resp = send_with_retry(
        client.get(&url).bearer_auth(access_token),
        &RetryPolicy::default(),
    )
    .await?;
    let meta: SpreadsheetMeta = parse_response(resp).await?;

    meta.sheets
        .into_iter()
        .map(|s| s.properties)
        .find(|p| p.title == title)
        .ok_or_else(|| GoogleApiError::ApiError {
            status: 404,
            message: format!("worksheet {:?} not found", title),
        })
}

async fn resize_rows(
    client: &reqwest::Client,
    access_token: &str,
    spreadsheet_id: &str,
    sheet_id: i64,
    row_count: u32,
) -> Result<(), GoogleApiError> {
    let url = format!("{}/{}:batchUpdate", SHEETS_BASE, spreadsheet_id);
    let body = serde_json::json!({
        "requests": [{
            "updateSheetProperties": {
                "properties": {
                    "sheetId": sheet_id,
                    "gridProperties": { "rowCount": row_count }
                },
                "fields": "gridProperties.rowCount"
            }
        }]
    });
    let resp = send_with_retry(
        client.post(&url).bearer_auth(access_token).json(&body),
        &RetryPolicy::default(),
    )
    .await?;
    check_status(resp).await?;
    Ok(())
}

// ============================================================================
// Response handling
// ============================================================================

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GoogleApiError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::AuthExpired);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, GoogleApiError> {
    let resp = check_status(resp).await?;
    Ok(resp.json().await?)
}

/// Formatted cell values are strings; anything else prints its JSON form.
fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

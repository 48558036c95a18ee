//! CSV download responses.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use crate::export::{write_comments_csv, ExportError, ExportRow};

/// Wrap CSV bytes in an attachment response.
pub fn csv_attachment(body: Vec<u8>, filename: &str) -> Response {
    let safe_name: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() && c != '"' && c != '\\' { c } else { '_' })
        .collect();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{safe_name}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// Serialize `rows` as `comments.csv`.
pub fn comments_csv_response(rows: &[ExportRow]) -> Result<Response, ExportError> {
    let body = write_comments_csv(Vec::new(), rows)?;
    Ok(csv_attachment(body, "comments.csv"))
}

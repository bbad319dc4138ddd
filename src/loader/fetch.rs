//! Remote files - download a document from a URL

use reqwest::{Client, StatusCode, Url};

use crate::document::extension_of;
use crate::{Error, Result};

/// A downloaded file held in memory
#[derive(Debug, Clone)]
pub struct FetchedFile {
    pub url: String,
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Accept only absolute http(s) URLs with a host
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|_| Error::InvalidUrl(url.to_string()))?;

    let scheme_ok = matches!(parsed.scheme(), "http" | "https");
    let host_ok = parsed.host_str().is_some_and(|h| !h.is_empty());
    if !scheme_ok || !host_ok {
        return Err(Error::InvalidUrl(url.to_string()));
    }

    Ok(parsed)
}

/// File extension for a response content type
pub fn extension_for_content_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type.split(';').next().unwrap_or("").trim().to_lowercase();
    match mime.as_str() {
        "application/pdf" | "application/x-pdf" => Some("pdf"),
        "text/plain" => Some("txt"),
        "text/markdown" | "text/x-markdown" => Some("md"),
        "text/csv" => Some("csv"),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => Some("docx"),
        "application/msword" => Some("doc"),
        _ => None,
    }
}

/// Pick a file name for a download: the last path segment when it has an
/// extension, otherwise `download.<ext>` from the content type.
pub fn file_name_for(url: &Url, content_type: Option<&str>) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");

    if extension_of(segment).is_some() {
        return segment.to_string();
    }

    match content_type.and_then(extension_for_content_type) {
        Some(ext) => format!("download.{}", ext),
        None => "download".to_string(),
    }
}

/// Download a file of at most `max_bytes`. Anything other than `200 OK` is
/// an error.
pub async fn fetch_url(client: &Client, url: &str, max_bytes: usize) -> Result<FetchedFile> {
    let parsed = validate_url(url)?;
    tracing::info!("Downloading {}", parsed);

    let mut response = client.get(parsed.clone()).send().await.map_err(download_error)?;
    let status = response.status();
    if status != StatusCode::OK {
        tracing::warn!("Download of {} returned {}", parsed, status);
        return Err(Error::DownloadStatus(status.as_u16()));
    }

    if response.content_length().is_some_and(|len| len > max_bytes as u64) {
        return Err(Error::TooLarge(max_bytes));
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let file_name = file_name_for(response.url(), content_type.as_deref());

    // content-length may be absent or wrong, so count while streaming
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(download_error)? {
        if bytes.len() + chunk.len() > max_bytes {
            tracing::warn!("Download of {} exceeded {} bytes", parsed, max_bytes);
            return Err(Error::TooLarge(max_bytes));
        }
        bytes.extend_from_slice(&chunk);
    }
    tracing::debug!("Downloaded {} bytes as {}", bytes.len(), file_name);

    Ok(FetchedFile {
        url: parsed.to_string(),
        file_name,
        content_type,
        bytes,
    })
}

fn download_error(err: reqwest::Error) -> Error {
    tracing::warn!("Download failed: {}", err);
    Error::Download(err.to_string())
}

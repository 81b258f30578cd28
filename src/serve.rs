//! HTTP surface for the analyzer
//!
//! `beatbuddy serve` → `POST /analyze` with a multipart `audio` field, or the
//! raw file as body and its name in `?name=song.mp3`

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::io::Read;
use tiny_http::{Header, Method, Request, Response, Server};

use crate::audio::{analysis, decode};
use crate::error::{AnalysisError, UploadError};
use crate::present::report::Report;
use crate::upload::UploadPolicy;

const SERVICE_NAME: &str = "BeatBuddy Music Analyzer";
/// Form field carrying the uploaded file.
const FIELD_NAME: &str = "audio";
/// Room for boundaries and part headers on top of the file size limit.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

#[derive(Serialize)]
pub struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }

    fn failure(message: String) -> Self {
        Self { ok: false, data: None, error: Some(message) }
    }
}

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    timestamp: String,
    service: &'static str,
}

#[derive(Deserialize, Debug, Default)]
pub struct AnalyzeQuery {
    #[serde(default)]
    pub name: Option<String>,
}

pub fn start(port: u16, policy: UploadPolicy) -> Result<()> {
    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;

    log::info!("Listening on http://localhost:{}", port);
    log::info!("Upload limit: {} MB", policy.max_bytes / (1024 * 1024));

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &policy) {
            log::error!("Failed to answer request: {}", e);
        }
    }

    Ok(())
}

pub(crate) fn handle_request(mut request: Request, policy: &UploadPolicy) -> std::io::Result<()> {
    let url = request.url().to_string();
    let path = url.split('?').next().unwrap_or("/");
    let method = request.method().clone();

    match (&method, path) {
        (&Method::Get, "/health") => {
            let json = serde_json::to_string(&health())?;
            request.respond(json_response(200, json))
        }

        (&Method::Post, "/analyze") => {
            let content_type = header_value(&request, "Content-Type");
            let declared = request.body_length().map(|n| n as u64);

            let (status, json) = match content_type.as_deref().and_then(multipart_boundary) {
                Some(boundary) => {
                    let limit = policy.max_bytes + MULTIPART_OVERHEAD;
                    match read_limited(&mut request, limit, declared)? {
                        Some(body) => analyze_multipart(policy, &boundary, &body),
                        None => error_reply(&policy.too_large(declared.unwrap_or(limit + 1)).into()),
                    }
                }
                None => {
                    let name = parse_query(&url).name.unwrap_or_default();
                    let precheck = declared.map_or(Ok(()), |len| policy.validate(&name, content_type.as_deref(), len));
                    match precheck {
                        Ok(()) => match read_limited(&mut request, policy.max_bytes, None)? {
                            Some(body) => analyze_upload(policy, &name, content_type.as_deref(), &body),
                            None => error_reply(&policy.too_large(policy.max_bytes + 1).into()),
                        },
                        Err(e) => error_reply(&e.into()),
                    }
                }
            };
            log::info!("POST /analyze -> {}", status);
            request.respond(json_response(status, json))
        }

        _ => request.respond(Response::from_string("Not found").with_status_code(404)),
    }
}

/// Read at most `limit` bytes. `None` when the declared or actual length exceeds it.
fn read_limited(request: &mut Request, limit: u64, declared: Option<u64>) -> std::io::Result<Option<Vec<u8>>> {
    if declared.is_some_and(|len| len > limit) {
        return Ok(None);
    }
    let mut body = Vec::new();
    request.as_reader().take(limit + 1).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Ok(None);
    }
    Ok(Some(body))
}

/// Analyze the `audio` part of a multipart form, using the part's file name and type.
pub fn analyze_multipart(policy: &UploadPolicy, boundary: &str, body: &[u8]) -> (u16, String) {
    let parts = parse_multipart(body, boundary);
    match parts.iter().find(|p| p.field == FIELD_NAME && p.file_name.is_some()) {
        Some(part) => analyze_upload(
            policy,
            part.file_name.as_deref().unwrap_or_default(),
            part.content_type.as_deref(),
            part.data,
        ),
        None => error_reply(&UploadError::Missing.into()),
    }
}

/// Validate and analyze one uploaded file. Returns the HTTP status and JSON body.
pub fn analyze_upload(policy: &UploadPolicy, name: &str, mime: Option<&str>, body: &[u8]) -> (u16, String) {
    let outcome = policy
        .validate(name, mime, body.len() as u64)
        .map_err(AnalysisError::from)
        .and_then(|()| decode::decode_bytes(body).map_err(AnalysisError::from))
        .map(|buffer| Report::new(analysis::analyze(&buffer), Some(name.to_string())));

    match outcome {
        Ok(report) => match serde_json::to_string(&ApiResponse::success(report)) {
            Ok(json) => (200, json),
            Err(e) => (500, failure_json(e.to_string())),
        },
        Err(e) => error_reply(&e),
    }
}

fn error_reply(err: &AnalysisError) -> (u16, String) {
    log::warn!("Analysis rejected: {}", err);
    (status_for(err), failure_json(err.user_message()))
}

pub fn status_for(err: &AnalysisError) -> u16 {
    match err {
        AnalysisError::Upload(_) => 400,
        AnalysisError::Decode(_) | AnalysisError::EmptyBuffer | AnalysisError::InvalidSampleRate(_) => 422,
    }
}

fn failure_json(message: String) -> String {
    serde_json::to_string(&ApiResponse::<()>::failure(message))
        .unwrap_or_else(|_| r#"{"ok":false,"data":null,"error":"internal error"}"#.to_string())
}

pub fn health() -> Health {
    Health {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
        service: SERVICE_NAME,
    }
}

fn parse_query(url: &str) -> AnalyzeQuery {
    url.split_once('?')
        .and_then(|(_, query)| serde_urlencoded::from_str(query).ok())
        .unwrap_or_default()
}

fn header_value(request: &Request, field: &'static str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|h| h.field.equiv(field))
        .map(|h| h.value.as_str().to_string())
}

#[derive(Debug)]
pub struct FormPart<'a> {
    pub field: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: &'a [u8],
}

/// Boundary of a `multipart/form-data` content type, if that is what it is.
pub fn multipart_boundary(content_type: &str) -> Option<String> {
    let mut params = content_type.split(';');
    let mime = params.next()?.trim();
    if !mime.eq_ignore_ascii_case("multipart/form-data") {
        return None;
    }
    params
        .find_map(|p| header_param(p, "boundary"))
        .filter(|b| !b.is_empty())
}

pub fn parse_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<FormPart<'a>> {
    let opening = format!("--{}", boundary);
    let closing = format!("\r\n--{}", boundary);
    let mut parts = Vec::new();

    let Some(first) = find(body, opening.as_bytes()) else {
        return parts;
    };
    let mut rest = &body[first + opening.len()..];

    // Each iteration starts right after a delimiter; `--` marks the last one.
    while !rest.starts_with(b"--") {
        rest = rest.strip_prefix(b"\r\n").unwrap_or(rest);
        let Some(header_end) = find(rest, b"\r\n\r\n") else {
            break;
        };
        let headers = String::from_utf8_lossy(&rest[..header_end]);
        let content = &rest[header_end + 4..];
        let Some(end) = find(content, closing.as_bytes()) else {
            break;
        };

        let mut part = FormPart {
            field: String::new(),
            file_name: None,
            content_type: None,
            data: &content[..end],
        };
        for line in headers.lines() {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            if name.trim().eq_ignore_ascii_case("Content-Disposition") {
                for param in value.split(';').skip(1) {
                    if let Some(field) = header_param(param, "name") {
                        part.field = field;
                    } else if let Some(file_name) = header_param(param, "filename") {
                        part.file_name = Some(file_name);
                    }
                }
            } else if name.trim().eq_ignore_ascii_case("Content-Type") {
                part.content_type = Some(value.trim().to_string());
            }
        }
        parts.push(part);
        rest = &content[end + closing.len()..];
    }

    parts
}

/// `key=value` or `key="value"` from a header parameter list entry.
fn header_param(param: &str, key: &str) -> Option<String> {
    let (k, v) = param.trim().split_once('=')?;
    k.trim()
        .eq_ignore_ascii_case(key)
        .then(|| v.trim().trim_matches('"').to_string())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn json_response(status: u16, json: String) -> Response<std::io::Cursor<Vec<u8>>> {
    let response = Response::from_string(json).with_status_code(status);
    match Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        Ok(header) => response.with_header(header),
        Err(()) => response,
    }
}

use super::error::HttpError;
use super::layout;

/// One header field, with the name as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpField {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub target: String,
    pub version: String,
    pub fields: Vec<HttpField>,
}

impl HttpRequest {
    /// Methods are case-sensitive; only the exact token `GET` matches.
    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// First value of the header `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.fields, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub version: String,
    pub status_code: u16,
    pub reason: String,
    pub fields: Vec<HttpField>,
}

impl HttpResponse {
    pub fn is_switching_protocols(&self) -> bool {
        self.status_code == layout::STATUS_SWITCHING_PROTOCOLS
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.fields, name)
    }
}

/// HTTP view of a TCP payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMessage {
    Request(HttpRequest),
    Response(HttpResponse),
    /// The payload is not an HTTP/1.x message head.
    Invalid,
}

impl HttpMessage {
    pub fn from_payload(payload: &[u8]) -> Self {
        parse_http(payload).unwrap_or(HttpMessage::Invalid)
    }

    pub fn as_request(&self) -> Option<&HttpRequest> {
        match self {
            HttpMessage::Request(request) => Some(request),
            _ => None,
        }
    }

    pub fn as_response(&self) -> Option<&HttpResponse> {
        match self {
            HttpMessage::Response(response) => Some(response),
            _ => None,
        }
    }
}

/// Parse the head of an HTTP/1.x request or response.
///
/// The head ends at the first blank line, or at the end of the payload when
/// the segment carries no terminator. Any body is ignored. On success the
/// result is never [`HttpMessage::Invalid`].
pub fn parse_http(payload: &[u8]) -> Result<HttpMessage, HttpError> {
    if payload.is_empty() {
        return Err(HttpError::Empty);
    }
    let head_len = payload
        .windows(layout::HEAD_TERMINATOR.len())
        .position(|window| window == layout::HEAD_TERMINATOR)
        .unwrap_or(payload.len());
    let head = std::str::from_utf8(&payload[..head_len]).map_err(|_| HttpError::NotUtf8)?;

    let mut lines = head.lines();
    let start_line = lines.next().unwrap_or("");
    if start_line.starts_with(layout::VERSION_PREFIX) {
        let (version, status_code, reason) = parse_status_line(start_line)?;
        Ok(HttpMessage::Response(HttpResponse {
            version,
            status_code,
            reason,
            fields: parse_fields(lines),
        }))
    } else {
        let (method, target, version) = parse_request_line(start_line)?;
        Ok(HttpMessage::Request(HttpRequest {
            method,
            target,
            version,
            fields: parse_fields(lines),
        }))
    }
}

fn parse_request_line(line: &str) -> Result<(String, String, String), HttpError> {
    let invalid = || HttpError::InvalidRequestLine(truncate_for_error(line));
    let mut parts = line.split(' ');
    let method = parts.next().filter(|m| is_method_token(m)).ok_or_else(invalid)?;
    let target = parts.next().filter(|t| !t.is_empty()).ok_or_else(invalid)?;
    let version = parts
        .next()
        .filter(|v| v.starts_with(layout::VERSION_PREFIX))
        .ok_or_else(invalid)?;
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok((method.to_string(), target.to_string(), version.to_string()))
}

fn parse_status_line(line: &str) -> Result<(String, u16, String), HttpError> {
    let invalid = || HttpError::InvalidStatusLine(truncate_for_error(line));
    let mut parts = line.splitn(3, ' ');
    let version = parts.next().ok_or_else(invalid)?;
    let status_code = parts
        .next()
        .filter(|code| code.len() == layout::STATUS_CODE_LEN)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(invalid)?;
    let reason = parts.next().unwrap_or("");
    Ok((version.to_string(), status_code, reason.to_string()))
}

fn parse_fields<'a>(lines: impl Iterator<Item = &'a str>) -> Vec<HttpField> {
    lines
        .take_while(|line| !line.is_empty())
        .filter_map(|line| line.split_once(layout::HEADER_SEPARATOR))
        .map(|(name, value)| HttpField {
            name: name.trim().to_string(),
            value: value.trim().to_string(),
        })
        .collect()
}

fn find_header<'a>(fields: &'a [HttpField], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|field| field.name.eq_ignore_ascii_case(name))
        .map(|field| field.value.as_str())
}

fn is_method_token(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_uppercase())
}

fn truncate_for_error(line: &str) -> String {
    line.chars().take(64).collect()
}

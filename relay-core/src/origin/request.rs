//! Origin request construction.

use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RANGE};
use url::Url;

/// Contiguous span of the resource to ask the origin for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteWindow {
    /// `length` bytes starting at `offset`
    Bounded { offset: u64, length: u64 },
    /// Everything from `offset` to the end of the resource
    ToEnd { offset: u64 },
}

impl ByteWindow {
    /// Value for the `Range` header, if this window needs one.
    ///
    /// Open-ended windows are requested without a `Range` header, and so are
    /// bounded windows of zero bytes.
    pub fn range_header_value(&self) -> Option<String> {
        match *self {
            ByteWindow::Bounded { offset, length } => {
                let last = offset.saturating_add(length.checked_sub(1)?);
                Some(format!("bytes={offset}-{last}"))
            }
            ByteWindow::ToEnd { .. } => None,
        }
    }
}

/// GET request about to be sent to the origin.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
}

impl OriginRequest {
    /// Builds the request for `window`, or for the whole resource when `None`.
    pub fn build(url: &Url, window: Option<ByteWindow>) -> Self {
        let mut headers = HeaderMap::new();

        let range = window.and_then(|window| window.range_header_value());
        if let Some(range) = range {
            // "bytes=<digits>-<digits>" is always a valid header value
            if let Ok(value) = HeaderValue::from_str(&range) {
                headers.insert(RANGE, value);
            }
        }

        Self {
            method: Method::GET,
            url: url.clone(),
            headers,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Sets a header, replacing any previous value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// `Range` header value, if one will be sent.
    pub fn range(&self) -> Option<&str> {
        self.headers
            .get(RANGE)
            .and_then(|value| value.to_str().ok())
    }

    pub(crate) fn into_parts(self) -> (Method, Url, HeaderMap) {
        (self.method, self.url, self.headers)
    }
}

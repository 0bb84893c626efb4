//! Protocol tokens and their wire text.
//!
//! HTTP versions, status codes with mechanically derived reason phrases, and
//! the connection-persistence rule shared by requests and responses.

use crate::http::headers::{CONNECTION, HeaderMap};

/// HTTP protocol version of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    Http10,
    Http11,
    /// Anything else; rejected by the parser as a bad request.
    Unknown,
}

impl Version {
    pub fn parse(s: &str) -> Self {
        match s {
            "HTTP/1.0" => Version::Http10,
            "HTTP/1.1" => Version::Http11,
            _ => Version::Unknown,
        }
    }

    /// Wire text of a known version.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Version::Http10 => Some("HTTP/1.0"),
            Version::Http11 => Some("HTTP/1.1"),
            Version::Unknown => None,
        }
    }
}

macro_rules! status_codes {
    ($( $variant:ident = $code:literal, $ident:literal; )+) => {
        /// HTTP status codes.
        ///
        /// Each code carries its CamelCase identifier; the reason phrase is
        /// derived from it by splitting at case boundaries.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum StatusCode {
            $( $variant, )+
        }

        impl StatusCode {
            /// Returns the numeric HTTP status code.
            ///
            /// ```
            /// # use plainwire::http::protocol::StatusCode;
            /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
            /// ```
            pub fn as_u16(&self) -> u16 {
                match self {
                    $( StatusCode::$variant => $code, )+
                }
            }

            /// The status identifier the reason phrase is derived from.
            pub fn identifier(&self) -> &'static str {
                match self {
                    $( StatusCode::$variant => $ident, )+
                }
            }

            pub fn from_u16(code: u16) -> Option<Self> {
                match code {
                    $( $code => Some(StatusCode::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

status_codes! {
    Continue = 100, "Continue";
    SwitchingProtocols = 101, "SwitchingProtocols";
    Ok = 200, "OK";
    Created = 201, "Created";
    Accepted = 202, "Accepted";
    NonAuthoritativeInformation = 203, "NonAuthoritativeInformation";
    NoContent = 204, "NoContent";
    ResetContent = 205, "ResetContent";
    PartialContent = 206, "PartialContent";
    MultipleChoices = 300, "MultipleChoices";
    MovedPermanently = 301, "MovedPermanently";
    Found = 302, "Found";
    SeeOther = 303, "SeeOther";
    NotModified = 304, "NotModified";
    UseProxy = 305, "UseProxy";
    TemporaryRedirect = 307, "TemporaryRedirect";
    PermanentRedirect = 308, "PermanentRedirect";
    BadRequest = 400, "BadRequest";
    Unauthorized = 401, "Unauthorized";
    PaymentRequired = 402, "PaymentRequired";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "NotFound";
    MethodNotAllowed = 405, "MethodNotAllowed";
    NotAcceptable = 406, "NotAcceptable";
    ProxyAuthenticationRequired = 407, "ProxyAuthenticationRequired";
    RequestTimeout = 408, "RequestTimeout";
    Conflict = 409, "Conflict";
    Gone = 410, "Gone";
    LengthRequired = 411, "LengthRequired";
    PreconditionFailed = 412, "PreconditionFailed";
    RequestEntityTooLarge = 413, "RequestEntityTooLarge";
    RequestUriTooLong = 414, "RequestUriTooLong";
    UnsupportedMediaType = 415, "UnsupportedMediaType";
    RequestedRangeNotSatisfiable = 416, "RequestedRangeNotSatisfiable";
    ExpectationFailed = 417, "ExpectationFailed";
    UpgradeRequired = 426, "UpgradeRequired";
    InternalServerError = 500, "InternalServerError";
    NotImplemented = 501, "NotImplemented";
    BadGateway = 502, "BadGateway";
    ServiceUnavailable = 503, "ServiceUnavailable";
    GatewayTimeout = 504, "GatewayTimeout";
    HttpVersionNotSupported = 505, "HttpVersionNotSupported";
}

impl StatusCode {
    /// Reason phrase, e.g. `"Not Found"` for `NotFound`.
    pub fn reason_phrase(&self) -> String {
        uncamel_case(self.identifier())
    }

    /// Code and phrase as they appear on the status line: `"404 Not Found"`.
    pub fn status_text(&self) -> String {
        format!("{} {}", self.as_u16(), self.reason_phrase())
    }
}

/// Splits a CamelCase identifier into space separated words.
///
/// A leading lowercase run is a word, an uppercase run not followed by a
/// lowercase letter is a single word (acronyms), and an uppercase letter
/// followed by lowercase letters is a word. Other characters are dropped.
pub fn uncamel_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let len = chars.len();
    let mut words: Vec<String> = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        if i == 0 && c.is_lowercase() {
            let start = i;
            while i < len && chars[i].is_lowercase() {
                i += 1;
            }
            words.push(chars[start..i].iter().collect());
            continue;
        }

        if !c.is_uppercase() {
            i += 1;
            continue;
        }

        let start = i;
        let mut end = i;
        while end < len && chars[end].is_uppercase() {
            end += 1;
        }

        let followed_by_lower = end < len && chars[end].is_lowercase();
        if !followed_by_lower {
            words.push(chars[start..end].iter().collect());
            i = end;
        } else if end - start > 1 {
            // last capital starts the next word
            words.push(chars[start..end - 1].iter().collect());
            i = end - 1;
        } else {
            let mut j = end;
            while j < len && chars[j].is_lowercase() {
                j += 1;
            }
            words.push(chars[start..j].iter().collect());
            i = j;
        }
    }

    words.join(" ")
}

/// Whether a message of `version` carrying `headers` keeps the connection open.
///
/// HTTP/1.0 needs a `Connection` header other than `close`; HTTP/1.1 is
/// persistent unless `Connection: close` is present. Unknown versions never are.
pub fn is_connection_persistent(version: Version, headers: &HeaderMap) -> bool {
    let is_close = |v: &str| v.eq_ignore_ascii_case("close");

    match version {
        Version::Http10 => headers.get(CONNECTION).is_some_and(|v| !is_close(v)),
        Version::Http11 => headers.get(CONNECTION).map_or(true, |v| !is_close(v)),
        Version::Unknown => false,
    }
}

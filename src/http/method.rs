use std::fmt;
use strum::EnumString;

#[derive(EnumString, Debug, Clone, PartialEq, Eq)]
pub enum Method {
    #[strum(serialize = "GET")]
    GET,
    #[strum(serialize = "POST")]
    POST,
    #[strum(serialize = "HEAD")]
    HEAD,
    #[strum(serialize = "PUT")]
    PUT,
    #[strum(serialize = "DELETE")]
    DELETE,
    #[strum(serialize = "OPTIONS")]
    OPTIONS,
    #[strum(serialize = "PATCH")]
    PATCH,
    /// Any token not listed above. Rejected at dispatch, not at parse time.
    #[strum(default)]
    Other(String),
}

impl Method {
    /// Uppercases the token before matching, so `get` and `GET` are the same.
    pub fn from_token(token: &str) -> Method {
        let upper = token.to_ascii_uppercase();
        match upper.parse() {
            Ok(m) => m,
            Err(_) => Method::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::HEAD => "HEAD",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::PATCH => "PATCH",
            Method::Other(s) => s,
        }
    }

    /// Methods the dispatcher knows how to serve.
    pub fn is_supported(&self) -> bool {
        matches!(self, Method::GET | Method::POST | Method::HEAD)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

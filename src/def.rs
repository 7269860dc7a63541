use std::fmt::{self, Display, Formatter};
use thiserror::Error;

// methods are case-sensitive, "head" is an extension method and not HEAD
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    OPTIONS,
    TRACE,
    CONNECT,
    PATCH,
    Extension(String),
}

impl Method {
    pub fn parse(method: &str) -> Self {
        match method {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "OPTIONS" => Method::OPTIONS,
            "TRACE" => Method::TRACE,
            "CONNECT" => Method::CONNECT,
            "PATCH" => Method::PATCH,
            other => Method::Extension(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
            Method::CONNECT => "CONNECT",
            Method::PATCH => "PATCH",
            Method::Extension(method) => method,
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    V1,
    V11,
}

impl Version {
    /// Maps a `major.minor` pair onto the versions this server speaks.
    /// Every HTTP/1.x above 1.0 is treated as 1.1.
    pub fn from_numbers(major: u32, minor: u32) -> Result<Self, ParsingError> {
        match (major, minor) {
            (1, 0) => Ok(Version::V1),
            (1, _) => Ok(Version::V11),
            (0, _) => Err(ParsingError::Head),
            _ => Err(ParsingError::Version),
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Version::V1 => write!(f, "HTTP/1.0"),
            Version::V11 => write!(f, "HTTP/1.1"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    UriTooLong,
    RequestHeaderFieldsTooLarge,
    NotImplemented,
    VersionNotSupported,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::UriTooLong => 414,
            Status::RequestHeaderFieldsTooLarge => 431,
            Status::NotImplemented => 501,
            Status::VersionNotSupported => 505,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad Request",
            Status::UriTooLong => "URI Too Long",
            Status::RequestHeaderFieldsTooLarge => "Request Header Fields Too Large",
            Status::NotImplemented => "Not Implemented",
            Status::VersionNotSupported => "HTTP Version Not Supported",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// typed header values the server emits, name keeps the canonical casing
pub trait ToHeader {
    fn name() -> &'static str;
    fn value(&self) -> &'static str;
}

const CONTENT_TYPE_PLAIN: &'static str = "text/plain";

#[derive(Clone, Copy, Debug)]
pub enum ContentType {
    Plain,
}

impl ToHeader for ContentType {
    fn name() -> &'static str { "Content-Type" }
    fn value(&self) -> &'static str {
        match self {
            ContentType::Plain => CONTENT_TYPE_PLAIN,
        }
    }
}

const CONNECTION_CLOSE: &'static str = "close";
const CONNECTION_KEEP_ALIVE: &'static str = "keep-alive";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connection {
    Close,
    KeepAlive,
}

impl Connection {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            CONNECTION_CLOSE => Some(Connection::Close),
            CONNECTION_KEEP_ALIVE => Some(Connection::KeepAlive),
            _ => None,
        }
    }
}

impl ToHeader for Connection {
    fn name() -> &'static str { "Connection" }
    fn value(&self) -> &'static str {
        match self {
            Connection::Close => CONNECTION_CLOSE,
            Connection::KeepAlive => CONNECTION_KEEP_ALIVE,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum AcceptRanges {
    Bytes,
}

impl ToHeader for AcceptRanges {
    fn name() -> &'static str { "Accept-Ranges" }
    fn value(&self) -> &'static str {
        match self {
            AcceptRanges::Bytes => "bytes",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParsingError {
    #[error("malformed request line")]
    Head,
    #[error("malformed header line")]
    Header,
    #[error("request line too long")]
    HeadTooLong,
    #[error("header line too long")]
    HeaderTooLong,
    #[error("too many headers")]
    TooManyHeaders,
    #[error("unsupported protocol version")]
    Version,
}

impl ParsingError {
    /// Status a server answers with when a request fails to parse.
    pub fn status(&self) -> Status {
        match self {
            ParsingError::Head | ParsingError::Header => Status::BadRequest,
            ParsingError::HeadTooLong => Status::UriTooLong,
            ParsingError::HeaderTooLong | ParsingError::TooManyHeaders => Status::RequestHeaderFieldsTooLarge,
            ParsingError::Version => Status::VersionNotSupported,
        }
    }
}

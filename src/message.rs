use std::borrow::Cow;
use std::fmt::Display;
use lazy_static::lazy_static;
use regex::Regex;
use crate::def::*;

const NEWLINE: &'static str = "\r\n";

pub const MAX_LINE: usize = 65536;
pub const MAX_HEADERS: usize = 100;

lazy_static! {
    static ref HEADLINE_REGEX: Regex = Regex::new(
        r"^(?P<method>[!#$%&'*+\-.^_`|~0-9A-Za-z]+) (?P<target>[^\s]+) HTTP/(?P<major>\d{1,3})\.(?P<minor>\d{1,3})$"
    ).unwrap();
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header<'a> {
    pub name: Cow<'a, str>,
    pub value: Cow<'a, str>
}

impl<'a> Header<'a> {
    pub fn new<N: Into<Cow<'a, str>>, V: Into<Cow<'a, str>>>(name: N, value: V) -> Self {
        Self { name: name.into(), value: value.into() }
    }

    pub fn from<T: ToHeader>(to_header: T) -> Self {
        Self::new(T::name(), to_header.value())
    }

    pub fn parse(header: &'a str) -> Option<Self> {
        let colon_index = header.find(':')?;
        let name = &header[..colon_index];
        if name.is_empty() || name.ends_with(char::is_whitespace) { return None }

        Some(Self::new(name, header[(colon_index + 1)..].trim()))
    }

    pub fn construct(&self) -> String {
        format!("{}: {}", self.name, self.value)
    }
}

/// Header list in arrival (or insertion) order. Lookups ignore name case.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers<'a>(Vec<Header<'a>>);

impl<'a> Headers<'a> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn add(&mut self, header: Header<'a>) {
        self.0.push(header);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().find(|h| h.name.eq_ignore_ascii_case(name)).map(|h| &*h.value)
    }

    pub fn list(&self) -> std::slice::Iter<'_, Header<'a>> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn construct(&self) -> Vec<u8> {
        let mut headers = Vec::new();
        for header in self.list() {
            headers.extend(header.construct().as_bytes());
            headers.extend(NEWLINE.as_bytes());
        }

        headers
    }
}

pub struct Headline;

impl Headline {
    pub fn construct(first: impl Display, second: impl Display, third: impl Display) -> Vec<u8> {
        format!("{} {} {}{}", first, second, third, NEWLINE).into_bytes()
    }
}

// walks `\n` terminated lines over a buffer that may still be filling up
struct Lines<'a> {
    buffer: &'a [u8],
    position: usize
}

impl<'a> Lines<'a> {
    // Ok(None) means the line is not complete yet
    fn next(&mut self, limit: usize, too_long: ParsingError) -> Result<Option<&'a [u8]>, ParsingError> {
        let rest = &self.buffer[self.position..];
        match rest.iter().position(|&b| b == b'\n') {
            Some(end) => {
                let line = &rest[..end];
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                if line.len() > limit { return Err(too_long) }
                self.position += end + 1;
                Ok(Some(line))
            }
            // a lone `\r` may be waiting for its `\n`
            None if rest.strip_suffix(b"\r").unwrap_or(rest).len() > limit => Err(too_long),
            None => Ok(None)
        }
    }
}

#[derive(Debug)]
pub struct Request<'a> {
    pub method: Method,
    pub target: Cow<'a, str>,
    pub version: Version,
    pub headers: Headers<'a>,
    line: Cow<'a, str>
}

impl<'a> Request<'a> {
    /// Parses one request head from the front of `buffer`.
    ///
    /// Returns `Ok(None)` while the head is incomplete, otherwise the request and the
    /// number of bytes it occupied (leading empty lines included). Bodies are not read.
    pub fn parse(buffer: &'a [u8]) -> Result<Option<(Self, usize)>, ParsingError> {
        let mut lines = Lines { buffer, position: 0 };

        let line = loop {
            match lines.next(MAX_LINE, ParsingError::HeadTooLong)? {
                Some(line) if line.is_empty() => {
                    if lines.position > MAX_LINE { return Err(ParsingError::Head) }
                    continue
                }
                Some(line) => break String::from_utf8_lossy(line),
                None => return Ok(None)
            }
        };

        let mut headers = Headers::new();
        loop {
            let header = match lines.next(MAX_LINE, ParsingError::HeaderTooLong)? {
                Some(header) if header.is_empty() => break,
                Some(header) => header,
                None => return Ok(None)
            };
            if headers.len() >= MAX_HEADERS { return Err(ParsingError::TooManyHeaders) }
            headers.add(parse_header(header)?);
        }

        let (method, target, version) = {
            let capture = HEADLINE_REGEX.captures(&line).ok_or(ParsingError::Head)?;
            let major = capture["major"].parse::<u32>().or(Err(ParsingError::Head))?;
            let minor = capture["minor"].parse::<u32>().or(Err(ParsingError::Head))?;
            let version = Version::from_numbers(major, minor)?;
            (Method::parse(&capture["method"]), Cow::Owned(capture["target"].to_string()), version)
        };

        Ok(Some((Self { method, target, version, headers, line }, lines.position)))
    }

    pub fn headline(&self) -> &str {
        &self.line
    }

    pub fn connection(&self) -> Option<Connection> {
        self.headers.get(Connection::name()).and_then(Connection::parse)
    }
}

fn parse_header(line: &[u8]) -> Result<Header<'_>, ParsingError> {
    match String::from_utf8_lossy(line) {
        Cow::Borrowed(header) => Header::parse(header).ok_or(ParsingError::Header),
        Cow::Owned(header) => {
            let parsed = Header::parse(&header).ok_or(ParsingError::Header)?;
            Ok(Header::new(parsed.name.into_owned(), parsed.value.into_owned()))
        }
    }
}

/// A response head. Responses from this crate never carry a payload.
#[derive(Clone, Debug)]
pub struct Response<'a> {
    pub version: Version,
    pub status: Status,
    pub headers: Headers<'a>
}

impl<'a> Response<'a> {
    pub fn new(status: Status) -> Self {
        Self { version: Version::V11, status, headers: Headers::new() }
    }

    pub fn header(mut self, header: Header<'a>) -> Self {
        self.headers.add(header);
        self
    }

    pub fn construct(&self) -> Vec<u8> {
        let mut response = Vec::new();
        response.extend(Headline::construct(self.version, self.status, self.status.message()));
        response.extend(self.headers.construct());
        response.extend(NEWLINE.as_bytes());

        response
    }
}

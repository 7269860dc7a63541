//! The canned resource served to HEAD requests.
//!
//! Every HEAD gets the same response head: a plain text resource of 100 bytes, last modified
//! on a fixed date, with a fixed ETag. The body is never sent.

use std::borrow::Cow;
use lazy_static::lazy_static;
use crate::def::*;
use crate::message::*;

pub const CONTENT_LENGTH: &'static str = "100";
pub const LAST_MODIFIED: &'static str = "Thu, 28 Jul 2016 05:37:47 GMT";
pub const ETAG: &'static str = "\"57999a2b-2\"";

lazy_static! {
    static ref HEAD_RESPONSE: Vec<u8> = head_response().construct();
}

/// The response head in wire order.
pub fn head_response() -> Response<'static> {
    Response::new(Status::Ok)
        .header(Header::from(ContentType::Plain))
        .header(Header::new("Content-Length", CONTENT_LENGTH))
        .header(Header::new("Last-Modified", LAST_MODIFIED))
        .header(Header::from(Connection::KeepAlive))
        .header(Header::new("ETag", ETAG))
        .header(Header::from(AcceptRanges::Bytes))
}

pub fn error_response(status: Status) -> Response<'static> {
    Response::new(status)
        .header(Header::from(Connection::Close))
        .header(Header::new("Content-Length", "0"))
}

/// What to write back for one request, and whether the connection ends after it.
#[derive(Debug)]
pub struct Reply {
    pub status: Status,
    pub bytes: Cow<'static, [u8]>,
    pub close: bool
}

impl Reply {
    fn head() -> Self {
        Self { status: Status::Ok, bytes: Cow::Borrowed(HEAD_RESPONSE.as_slice()), close: false }
    }

    fn error(status: Status) -> Self {
        Self { status, bytes: Cow::Owned(error_response(status).construct()), close: true }
    }
}

pub fn respond(request: &Request) -> Reply {
    match request.method {
        Method::HEAD => {
            let mut reply = Reply::head();
            reply.close = request.connection() == Some(Connection::Close);
            reply
        }
        _ => Reply::error(Status::NotImplemented)
    }
}

pub fn reject(error: &ParsingError) -> Reply {
    Reply::error(error.status())
}

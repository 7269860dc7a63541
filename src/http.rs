use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::io::{self, Read, Write};
use std::net::{SocketAddr, ToSocketAddrs};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use thiserror::Error;
use tracing::{debug, info, warn};
use crate::fixture::{self, Reply};
use crate::message::*;

pub const DEFAULT_DOMAIN: &'static str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8887;

const LISTENER: Token = Token(0);
const EVENTS_CAPACITY: usize = 128;
const READ_CHUNK: usize = 4096;
const MAX_PENDING: usize = 64 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Address<'a> {
    domain: Cow<'a, str>,
    port: u16
}

impl<'a> Address<'a> {
    pub fn new<S: Into<Cow<'a, str>>>(domain: S, port: Option<u16>) -> Self {
        Self { domain: domain.into(), port: port.unwrap_or(DEFAULT_PORT) }
    }

    pub fn resolve(&self) -> Result<SocketAddr, ServerError> {
        let unresolved = || ServerError::Resolve(self.to_string());
        (&*self.domain, self.port).to_socket_addrs()
            .map_err(|_| unresolved())?
            .next()
            .ok_or_else(unresolved)
    }
}

impl Default for Address<'static> {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAIN, None)
    }
}

impl<'a> Display for Address<'a> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.port)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to resolve {0}")]
    Resolve(String),
    #[error("failed to bind {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },
    #[error("failed on IO: {0}")]
    Io(#[from] io::Error),
}

// one accepted connection and its pending bytes in both directions
struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    incoming: Vec<u8>,
    outgoing: Vec<u8>,
    // the socket may hold unread bytes, edge triggered readiness will not repeat
    readable: bool,
    eof: bool,
    closing: bool
}

impl Session {
    fn new(stream: TcpStream, peer: SocketAddr) -> Self {
        Self {
            stream, peer,
            incoming: Vec::new(), outgoing: Vec::new(),
            readable: false, eof: false, closing: false
        }
    }

    // replies the client has not taken yet; past the cap we stop reading and parsing
    fn backlogged(&self) -> bool {
        self.outgoing.len() >= MAX_PENDING
    }

    fn receive(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; READ_CHUNK];
        let limit = self.incoming.len() + MAX_PENDING;
        while self.incoming.len() < limit {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    self.readable = false;
                    return Ok(())
                }
                Ok(size) => self.incoming.extend_from_slice(&chunk[..size]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    self.readable = false;
                    return Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e)
            }
        }

        Ok(())
    }

    fn process(&mut self) {
        let mut offset = 0;
        while !self.closing && !self.backlogged() {
            let (reply, used): (Reply, usize) = match Request::parse(&self.incoming[offset..]) {
                Ok(Some((request, used))) => {
                    let reply = fixture::respond(&request);
                    info!(peer = %self.peer, "\"{}\" {}", request.headline(), reply.status);
                    (reply, used)
                }
                Ok(None) => break,
                Err(e) => {
                    let reply = fixture::reject(&e);
                    warn!(peer = %self.peer, "rejected request: {} ({})", e, reply.status);
                    (reply, self.incoming.len() - offset)
                }
            };

            self.outgoing.extend_from_slice(&reply.bytes);
            self.closing = reply.close;
            offset += used;
        }
        self.incoming.drain(..offset);

        // answer what already arrived, then hang up
        if self.eof && !self.backlogged() {
            self.closing = true;
        }
        if self.closing {
            self.incoming.clear();
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut written = 0;
        while written < self.outgoing.len() {
            match self.stream.write(&self.outgoing[written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(size) => written += size,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e)
            }
        }
        self.outgoing.drain(..written);

        Ok(())
    }

    // Ok(false) when the session is over and should be dropped
    fn drive(&mut self, readable: bool) -> io::Result<bool> {
        self.readable |= readable;
        loop {
            self.process();
            self.flush()?;
            if self.closing || self.backlogged() || !self.readable { break }
            self.receive()?;
        }

        Ok(!(self.closing && self.outgoing.is_empty()))
    }
}

/// Single threaded fixture server. Owns the listening socket and every live connection.
pub struct Server {
    listener: TcpListener,
    address: SocketAddr,
    poll: Poll,
    sessions: HashMap<Token, Session>,
    next_token: usize
}

impl Server {
    pub fn bind(address: &Address) -> Result<Self, ServerError> {
        let address = address.resolve()?;
        let mut listener = TcpListener::bind(address).map_err(|source| ServerError::Bind { address, source })?;
        let address = listener.local_addr()?;
        let poll = Poll::new()?;
        poll.registry().register(&mut listener, LISTENER, Interest::READABLE)?;
        info!(%address, "listening");

        Ok(Self { listener, address, poll, sessions: HashMap::new(), next_token: LISTENER.0 + 1 })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Serves connections until polling itself fails. There is no shutdown.
    pub fn run(mut self) -> Result<(), ServerError> {
        let mut events = Events::with_capacity(EVENTS_CAPACITY);

        loop {
            if let Err(e) = self.poll.poll(&mut events, None) {
                if e.kind() == io::ErrorKind::Interrupted { continue }
                return Err(e.into())
            }

            for event in events.iter() {
                match event.token() {
                    LISTENER => self.accept(),
                    token => self.ready(token, event.is_readable() || event.is_read_closed())
                }
            }
        }
    }

    fn accept(&mut self) {
        loop {
            let (mut stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("failed to accept connection: {}", e);
                    return
                }
            };

            let token = self.token();
            if let Err(e) = self.poll.registry().register(&mut stream, token, Interest::READABLE.add(Interest::WRITABLE)) {
                warn!(%peer, "failed to register connection: {}", e);
                continue
            }
            debug!(%peer, "connection opened");
            self.sessions.insert(token, Session::new(stream, peer));
        }
    }

    fn ready(&mut self, token: Token, readable: bool) {
        let session = match self.sessions.get_mut(&token) {
            Some(session) => session,
            None => return
        };

        let open = session.drive(readable).unwrap_or_else(|e| {
            debug!(peer = %session.peer, "connection failed: {}", e);
            false
        });

        if !open {
            if let Some(mut session) = self.sessions.remove(&token) {
                let _ = self.poll.registry().deregister(&mut session.stream);
                debug!(peer = %session.peer, "connection closed");
            }
        }
    }

    fn token(&mut self) -> Token {
        loop {
            self.next_token = self.next_token.wrapping_add(1).max(LISTENER.0 + 1);
            let token = Token(self.next_token);
            if !self.sessions.contains_key(&token) {
                return token
            }
        }
    }
}

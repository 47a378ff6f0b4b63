use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use tracing::{debug, info, trace, warn};

use crate::config::{timeout_from_secs, ChannelConfig};
use crate::error::{ChannelError, Result};
use crate::reader::MessageReader;
use crate::status::Status;
use crate::sys;
use crate::writer::{read_ack, write_ack, write_reject, MessageWriter};

/// Pending-connection backlog passed to `listen`.
pub const LISTEN_BACKLOG: i32 = 10;

/// Pause between accept retries after a non-timeout failure.
const ACCEPT_RETRY_PAUSE: Duration = Duration::from_millis(100);

/// Which end of the connection a handle was opened as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleRole {
    /// Bound and listening; accepts one peer at a time.
    Listener,
    /// Connected outward to a listener.
    Client,
}

/// One end of a point-to-point message connection.
///
/// Handles are always returned by the `open_*` constructors. A handle that
/// failed to open is invalid; its [`status`](Self::status) tells why and
/// every operation on it fails with `INVALID_HANDLE`. Every operation
/// records its outcome as the handle's latest status.
///
/// A listener holds at most one accepted peer. Accepting again closes the
/// previous one.
#[derive(Debug)]
pub struct ConnectionHandle {
    role: HandleRole,
    host: Option<String>,
    port: u16,
    accept_timeout: Option<Duration>,
    io_timeout: Option<Duration>,
    listener: Option<TcpListener>,
    peer: Option<TcpStream>,
    valid: bool,
    status: Status,
    setup_error: Option<ChannelError>,
    created_at: SystemTime,
    config: ChannelConfig,
    reader: MessageReader,
    writer: MessageWriter,
}

impl ConnectionHandle {
    /// Bind a listening socket on `host:port` (all interfaces when `host`
    /// is `None`, IPv6 dual-stack preferred).
    ///
    /// Timeouts are whole seconds; `0` means wait forever. Values above
    /// [`MAX_TIMEOUT_SECS`](crate::MAX_TIMEOUT_SECS) are rejected with
    /// `ILLEGAL_INPUT`.
    pub fn open_for_recv(
        host: Option<&str>,
        port: u16,
        accept_timeout_secs: u64,
        io_timeout_secs: u64,
    ) -> Self {
        Self::open_for_recv_with_config(
            host,
            port,
            accept_timeout_secs,
            io_timeout_secs,
            ChannelConfig::default(),
        )
    }

    pub fn open_for_recv_with_config(
        host: Option<&str>,
        port: u16,
        accept_timeout_secs: u64,
        io_timeout_secs: u64,
        config: ChannelConfig,
    ) -> Self {
        let mut handle = Self::new(HandleRole::Listener, host, port, config);
        let result = handle.bind_listener(accept_timeout_secs, io_timeout_secs);
        handle.finish_open(result, Status::ListenerCreated)
    }

    /// Connect to `host:port`, trying each resolved address in order.
    ///
    /// `io_timeout_secs` bounds every send and (in acknowledgement mode)
    /// the ack read; `0` means wait forever.
    pub fn open_for_send(host: &str, port: u16, io_timeout_secs: u64) -> Self {
        Self::open_for_send_with_config(host, port, io_timeout_secs, ChannelConfig::default())
    }

    pub fn open_for_send_with_config(
        host: &str,
        port: u16,
        io_timeout_secs: u64,
        config: ChannelConfig,
    ) -> Self {
        let mut handle = Self::new(HandleRole::Client, Some(host), port, config);
        let result = handle.connect(io_timeout_secs);
        handle.finish_open(result, Status::ClientConnected)
    }

    fn new(role: HandleRole, host: Option<&str>, port: u16, config: ChannelConfig) -> Self {
        Self {
            role,
            host: host.map(str::to_owned),
            port,
            accept_timeout: None,
            io_timeout: None,
            listener: None,
            peer: None,
            valid: false,
            status: Status::InvalidHandle,
            setup_error: None,
            created_at: SystemTime::now(),
            reader: MessageReader::new(config.chunk_size),
            writer: MessageWriter::new(),
            config,
        }
    }

    fn finish_open(mut self, result: Result<()>, success: Status) -> Self {
        match result {
            Ok(()) => {
                self.valid = true;
                self.status = success;
                debug!(
                    role = ?self.role,
                    host = self.host.as_deref().unwrap_or("*"),
                    port = self.port,
                    status = %success,
                    "connection handle opened"
                );
            }
            Err(err) => {
                self.valid = false;
                self.status = err.status();
                warn!(
                    role = ?self.role,
                    host = self.host.as_deref().unwrap_or("*"),
                    port = self.port,
                    status = %self.status,
                    error = %err,
                    "connection handle failed to open"
                );
                self.setup_error = Some(err);
            }
        }
        self
    }

    fn bind_listener(&mut self, accept_timeout_secs: u64, io_timeout_secs: u64) -> Result<()> {
        self.accept_timeout = timeout_from_secs("accept", accept_timeout_secs)?;
        self.io_timeout = timeout_from_secs("read", io_timeout_secs)?;

        let candidates = match self.host.as_deref() {
            None => vec![
                SocketAddr::from((Ipv6Addr::UNSPECIFIED, self.port)),
                SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port)),
            ],
            Some(host) => resolve(host, self.port)?,
        };

        // std sets SO_REUSEADDR before binding on unix.
        let mut last_err = None;
        for addr in candidates {
            match TcpListener::bind(addr) {
                Ok(listener) => {
                    if let Some(timeout) = self.accept_timeout {
                        sys::set_accept_timeout(&listener, timeout).map_err(|source| {
                            ChannelError::OptionSet {
                                option: "SO_RCVTIMEO",
                                source,
                            }
                        })?;
                    }
                    trace!(%addr, "listener bound");
                    self.listener = Some(listener);
                    return Ok(());
                }
                Err(source) => {
                    debug!(%addr, error = %source, "bind attempt failed");
                    let addr = addr.to_string();
                    last_err = Some(if sys::is_family_unsupported(&source) {
                        ChannelError::SocketCreate { addr, source }
                    } else {
                        ChannelError::Bind { addr, source }
                    });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ChannelError::AddressResolution {
            addr: self.addr_label(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no usable address"),
        }))
    }

    fn connect(&mut self, io_timeout_secs: u64) -> Result<()> {
        self.io_timeout = timeout_from_secs("write", io_timeout_secs)?;
        let host = self.host.as_deref().unwrap_or_default();
        let candidates = resolve(host, self.port)?;

        let mut connected = None;
        for addr in candidates {
            let attempt = match self.io_timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    connected = Some(stream);
                    break;
                }
                Err(err) => debug!(
                    %addr,
                    status = %Status::ConnectError,
                    error = %err,
                    "connect attempt failed"
                ),
            }
        }

        let stream = connected.ok_or_else(|| ChannelError::NoConnect {
            addr: self.addr_label(),
        })?;
        apply_io_timeouts(&stream, self.io_timeout)?;
        self.peer = Some(stream);
        Ok(())
    }

    /// Wait for one client to connect (blocking).
    ///
    /// Each accept wait is bounded by the accept timeout. When a wait
    /// expires and `cancel` is set, returns `CONNECT_TIMEOUT`; otherwise
    /// waits again. Other accept failures are retried after a short pause
    /// unless `cancel` is set, in which case `ACCEPT_ERROR` is returned.
    pub fn listen(&mut self, cancel: &AtomicBool) -> Result<Status> {
        let result = self.accept_peer(cancel);
        self.record(result, Status::ClientConnected)
    }

    fn accept_peer(&mut self, cancel: &AtomicBool) -> Result<Status> {
        self.ensure_valid()?;
        let listener = self
            .listener
            .as_ref()
            .ok_or(ChannelError::InvalidHandle("handle is not a listener"))?;

        if let Some(previous) = self.peer.take() {
            debug!("closing previous peer before accepting");
            let _ = previous.shutdown(std::net::Shutdown::Both);
        }
        self.reader.clear();

        sys::listen(listener, LISTEN_BACKLOG).map_err(ChannelError::Listen)?;

        loop {
            match listener.accept() {
                Ok((stream, addr)) => {
                    apply_io_timeouts(&stream, self.io_timeout)?;
                    info!(peer = %addr, "client connected");
                    self.peer = Some(stream);
                    return Ok(Status::ClientConnected);
                }
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) if crate::reader::is_timeout(&err) => {
                    if cancel.load(Ordering::SeqCst) {
                        return Err(ChannelError::ConnectTimeout);
                    }
                    trace!("accept wait expired; waiting again");
                }
                Err(err) => {
                    if cancel.load(Ordering::SeqCst) {
                        return Err(ChannelError::Accept(err));
                    }
                    warn!(status = %Status::AcceptError, error = %err, "accept failed; retrying");
                    std::thread::sleep(ACCEPT_RETRY_PAUSE);
                }
            }
        }
    }

    /// Send one message to the peer (blocking).
    ///
    /// A write failure or a missing acknowledgement closes the peer
    /// connection; the caller reconnects. A message the receiver refused
    /// fails with [`ChannelError::Rejected`] and the connection stays open.
    pub fn send_message(&mut self, payload: &[u8]) -> Result<Status> {
        let result = self.send_inner(payload);
        self.record(result, Status::MessageSent)
    }

    fn send_inner(&mut self, payload: &[u8]) -> Result<Status> {
        self.ensure_valid()?;
        let Some(stream) = self.peer.as_mut() else {
            return Err(ChannelError::NoConnect {
                addr: self.addr_label(),
            });
        };

        if let Err(err) = self.writer.send(stream, payload) {
            self.disconnect_peer();
            return Err(ChannelError::NotSent(err));
        }

        if self.config.await_ack {
            match read_ack(stream) {
                Ok(()) => {}
                // The stream is still in sync; only this message was refused.
                Err(ChannelError::Rejected) => return Err(ChannelError::Rejected),
                Err(err) => {
                    self.disconnect_peer();
                    return Err(err);
                }
            }
        }

        trace!(bytes = payload.len(), "message sent");
        Ok(Status::MessageSent)
    }

    /// Receive one message into `out` (blocking up to the read timeout).
    ///
    /// Returns the number of bytes written, terminator included; use
    /// [`message_payload`](crate::message_payload) to strip it. If `cancel`
    /// is already set, returns `MESSAGE_RECV_TIMEOUT` without reading.
    /// If the peer is gone, the peer connection is closed and
    /// `MESSAGE_NOT_RECVD` is reported. In acknowledgement mode an
    /// overflowing message is answered with [`REJECT_BYTE`](crate::REJECT_BYTE).
    pub fn receive_message(&mut self, out: &mut [u8], cancel: &AtomicBool) -> Result<usize> {
        let result = self.receive_inner(out, cancel);
        self.record(result, Status::MessageRecvd)
    }

    fn receive_inner(&mut self, out: &mut [u8], cancel: &AtomicBool) -> Result<usize> {
        self.ensure_valid()?;
        if cancel.load(Ordering::SeqCst) {
            return Err(ChannelError::RecvTimeout);
        }
        let Some(stream) = self.peer.as_mut() else {
            return Err(ChannelError::InvalidHandle("no connected peer"));
        };

        match self.reader.read_message(stream, out) {
            Ok(n) => {
                if self.config.await_ack {
                    if let Err(err) = write_ack(stream) {
                        warn!(error = %err, "failed to write acknowledgement");
                    }
                }
                trace!(bytes = n, "message received");
                Ok(n)
            }
            Err(err @ ChannelError::Overflow { .. }) => {
                if self.config.await_ack {
                    if let Err(reply) = write_reject(stream) {
                        warn!(error = %reply, "failed to write rejection");
                    }
                }
                Err(err)
            }
            Err(err @ (ChannelError::Disconnected | ChannelError::Io(_))) => {
                debug!(error = %err, "peer lost");
                self.disconnect_peer();
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Close the accepted or connected peer, keeping the listener.
    pub fn disconnect_peer(&mut self) {
        if let Some(peer) = self.peer.take() {
            let _ = peer.shutdown(std::net::Shutdown::Both);
        }
        self.reader.clear();
    }

    /// Release every socket and invalidate the handle. Idempotent.
    pub fn close(&mut self) {
        if !self.valid && self.listener.is_none() && self.peer.is_none() {
            return;
        }
        self.disconnect_peer();
        self.listener = None;
        self.valid = false;
        self.host = None;
        debug!(role = ?self.role, port = self.port, "connection handle closed");
    }

    /// Port the listener is bound to (useful after binding port 0).
    pub fn local_port(&self) -> Option<u16> {
        self.listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
            .map(|addr| addr.port())
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer.as_ref().and_then(|peer| peer.peer_addr().ok())
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// True while a peer is attached.
    pub fn is_connected(&self) -> bool {
        self.valid && self.peer.is_some()
    }

    pub fn role(&self) -> HandleRole {
        self.role
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Outcome of the most recent operation.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Why the handle failed to open, if it did.
    pub fn setup_error(&self) -> Option<&ChannelError> {
        self.setup_error.as_ref()
    }

    fn ensure_valid(&self) -> Result<()> {
        if self.valid {
            Ok(())
        } else {
            Err(ChannelError::InvalidHandle("handle is closed or failed to open"))
        }
    }

    fn record<T>(&mut self, result: Result<T>, success: Status) -> Result<T> {
        self.status = match &result {
            Ok(_) => success,
            Err(err) => err.status(),
        };
        result
    }

    fn addr_label(&self) -> String {
        format!("{}:{}", self.host.as_deref().unwrap_or("*"), self.port)
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|source| ChannelError::AddressResolution {
            addr: format!("{host}:{port}"),
            source,
        })?
        .collect();
    if addrs.is_empty() {
        return Err(ChannelError::AddressResolution {
            addr: format!("{host}:{port}"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
        });
    }
    Ok(addrs)
}

fn apply_io_timeouts(stream: &TcpStream, timeout: Option<Duration>) -> Result<()> {
    stream
        .set_read_timeout(timeout)
        .map_err(|source| ChannelError::OptionSet {
            option: "SO_RCVTIMEO",
            source,
        })?;
    stream
        .set_write_timeout(timeout)
        .map_err(|source| ChannelError::OptionSet {
            option: "SO_SNDTIMEO",
            source,
        })
}

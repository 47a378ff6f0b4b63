use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use msgcomm_channel::{message_payload, ChannelError, ConnectionHandle, Message};
use msgcomm_queue::OwnedQueue;
use msgcomm_worker::{Runnable, ShutdownSignal};
use tracing::{debug, info, trace, warn, Span};

use crate::config::MessageWorkerConfig;
use crate::message_worker::Role;

/// Thread body shared by both roles.
pub(crate) struct Endpoint {
    pub(crate) role: Role,
    pub(crate) host: Option<String>,
    pub(crate) port: u16,
    pub(crate) config: MessageWorkerConfig,
    pub(crate) queue: Arc<OwnedQueue<Message>>,
    pub(crate) bound_port: Arc<AtomicU16>,
    pub(crate) span: Span,
}

impl Runnable for Endpoint {
    fn main_loop(&mut self, shutdown: &ShutdownSignal) {
        let span = self.span.clone();
        let _entered = span.enter();
        debug!("worker loop entered");
        match self.role {
            Role::Sender => self.run_sender(shutdown),
            Role::Receiver => self.run_receiver(shutdown),
        }
        debug!(pending = self.queue.len(), "worker loop exited");
    }
}

impl Endpoint {
    fn run_sender(&self, shutdown: &ShutdownSignal) {
        let host = self.host.as_deref().unwrap_or("localhost");

        while !shutdown.is_requested() {
            let mut handle = ConnectionHandle::open_for_send_with_config(
                host,
                self.port,
                self.config.io_timeout_secs,
                self.config.channel.clone(),
            );
            if !handle.is_valid() {
                debug!(status = %handle.status(), "connect failed; backing off");
                shutdown.sleep(self.config.backoff);
                continue;
            }
            info!(host, port = self.port, "connected to receiver");

            loop {
                if !self.drain_to(&mut handle) {
                    break;
                }
                if shutdown.sleep(self.config.send_interval) {
                    // Deliver what was queued right before shutdown.
                    self.drain_to(&mut handle);
                    break;
                }
            }
            handle.close();
        }
    }

    /// Send every message queued at the start of the pass.
    ///
    /// On failure the message goes back to the tail and `false` is
    /// returned so the caller reconnects. A message the receiver rejected
    /// is dropped.
    pub(crate) fn drain_to(&self, handle: &mut ConnectionHandle) -> bool {
        for _ in 0..self.queue.len() {
            let Some(message) = self.queue.dequeue() else {
                break;
            };
            match handle.send_message(message.as_bytes()) {
                Ok(_) => trace!(bytes = message.len(), "message delivered"),
                Err(err @ ChannelError::Rejected) => {
                    // Resending would be refused again.
                    warn!(status = %err.status(), bytes = message.len(), "receiver rejected message; dropped");
                }
                Err(err) => {
                    warn!(status = %err.status(), error = %err, "send failed; message requeued");
                    self.queue.enqueue(message);
                    return false;
                }
            }
        }
        true
    }

    fn run_receiver(&self, shutdown: &ShutdownSignal) {
        let mut buf = vec![0u8; self.config.max_message_len];

        'setup: while !shutdown.is_requested() {
            let mut handle = ConnectionHandle::open_for_recv_with_config(
                self.host.as_deref(),
                self.port,
                self.config.accept_timeout_secs,
                self.config.io_timeout_secs,
                self.config.channel.clone(),
            );
            if !handle.is_valid() {
                warn!(status = %handle.status(), port = self.port, "listener setup failed; backing off");
                shutdown.sleep(self.config.backoff);
                continue;
            }
            if let Some(port) = handle.local_port() {
                self.bound_port.store(port, Ordering::SeqCst);
                info!(port, "listening");
            }

            while !shutdown.is_requested() {
                match handle.listen(shutdown.as_flag()) {
                    Ok(_) => self.receive_from_peer(&mut handle, &mut buf, shutdown),
                    Err(ChannelError::ConnectTimeout) => break,
                    Err(err) if err.status().is_setup_error() => {
                        warn!(status = %err.status(), error = %err, "listener failed; rebuilding");
                        handle.close();
                        shutdown.sleep(self.config.backoff);
                        continue 'setup;
                    }
                    Err(err) => debug!(status = %err.status(), error = %err, "listen returned"),
                }
            }
            handle.close();
        }
    }

    /// Receive from the accepted peer until it goes away or shutdown.
    fn receive_from_peer(
        &self,
        handle: &mut ConnectionHandle,
        buf: &mut [u8],
        shutdown: &ShutdownSignal,
    ) {
        while !shutdown.is_requested() {
            match handle.receive_message(buf, shutdown.as_flag()) {
                Ok(n) => {
                    let message = Message::copy_from_slice(message_payload(&buf[..n]));
                    trace!(bytes = message.len(), "message received");
                    self.queue.enqueue(message);
                }
                Err(ChannelError::RecvTimeout) => {}
                Err(err @ ChannelError::Overflow { .. }) => {
                    warn!(status = %err.status(), error = %err, "message dropped");
                }
                Err(err) => {
                    debug!(status = %err.status(), error = %err, "peer lost; listening again");
                    handle.disconnect_peer();
                    return;
                }
            }
        }
    }
}

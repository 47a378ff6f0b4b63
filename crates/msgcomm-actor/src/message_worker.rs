use std::fmt;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;

use msgcomm_channel::Message;
use msgcomm_queue::OwnedQueue;
use msgcomm_worker::{Result, Worker, WorkerState};
use tracing::{info, info_span, warn};

use crate::config::MessageWorkerConfig;
use crate::endpoint::Endpoint;

/// Direction a [`MessageWorker`] moves messages in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Queue to wire.
    Sender,
    /// Wire to queue.
    Receiver,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Sender => "sender",
            Role::Receiver => "receiver",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A background worker that bridges an [`OwnedQueue`] and one TCP peer.
///
/// Application threads only touch the queue (`enqueue`/`dequeue`) and the
/// lifecycle (`start`/`signal_shutdown`/`join`). Dropping the worker joins
/// it and discards anything still queued.
pub struct MessageWorker {
    worker: Worker<Endpoint>,
    queue: Arc<OwnedQueue<Message>>,
    bound_port: Arc<AtomicU16>,
    role: Role,
    host: Option<String>,
    port: u16,
}

impl MessageWorker {
    /// A worker that connects to `host:port` and sends whatever is enqueued.
    pub fn sender(
        name: impl Into<String>,
        host: &str,
        port: u16,
        config: MessageWorkerConfig,
    ) -> Self {
        Self::new(name.into(), Role::Sender, Some(host.to_owned()), port, config)
    }

    /// A worker that listens on `host:port` (all interfaces when `None`)
    /// and enqueues every message received. Port `0` binds an ephemeral
    /// port; see [`bound_port`](Self::bound_port).
    pub fn receiver(
        name: impl Into<String>,
        host: Option<&str>,
        port: u16,
        config: MessageWorkerConfig,
    ) -> Self {
        Self::new(name.into(), Role::Receiver, host.map(str::to_owned), port, config)
    }

    fn new(
        name: String,
        role: Role,
        host: Option<String>,
        port: u16,
        config: MessageWorkerConfig,
    ) -> Self {
        let queue = Arc::new(OwnedQueue::new(name.clone()));
        let bound_port = Arc::new(AtomicU16::new(0));
        let span = info_span!("message_worker", worker = %name, role = %role, port);
        let body = Endpoint {
            role,
            host: host.clone(),
            port,
            config,
            queue: Arc::clone(&queue),
            bound_port: Arc::clone(&bound_port),
            span,
        };
        Self {
            worker: Worker::new(name, body),
            queue,
            bound_port,
            role,
            host,
            port,
        }
    }

    /// Start the worker thread. `Ok(false)` if it was already started.
    pub fn start(&self) -> Result<bool> {
        self.worker.start()
    }

    pub fn signal_shutdown(&self, requested: bool) {
        self.worker.signal_shutdown(requested);
    }

    /// Signal shutdown and wait for the thread to exit.
    pub fn join(&self) -> Result<()> {
        self.worker.join()
    }

    /// Hand a message to the worker (sender) or push one back (receiver).
    pub fn enqueue(&self, message: impl Into<Message>) {
        self.queue.enqueue(message.into());
    }

    /// Take the oldest queued message, if any.
    pub fn dequeue(&self) -> Option<Message> {
        self.queue.dequeue()
    }

    /// Messages waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The receiver's listening port, once its listener exists.
    pub fn bound_port(&self) -> Option<u16> {
        match self.bound_port.load(Ordering::SeqCst) {
            0 => None,
            port => Some(port),
        }
    }

    pub fn name(&self) -> &str {
        self.worker.name()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> WorkerState {
        self.worker.state()
    }

    pub fn is_shutdown_signaled(&self) -> bool {
        self.worker.is_shutdown_signaled()
    }
}

impl Drop for MessageWorker {
    fn drop(&mut self) {
        if let Err(err) = self.worker.join() {
            warn!(worker = %self.name(), error = %err, "worker ended abnormally");
        }
        let discarded = self.queue.drain_and_dispose();
        if discarded > 0 {
            info!(worker = %self.name(), discarded, "undelivered messages discarded");
        }
    }
}

impl fmt::Debug for MessageWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageWorker")
            .field("name", &self.name())
            .field("role", &self.role)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    use msgcomm_channel::ConnectionHandle;

    use super::*;

    const LOOPBACK: &str = "127.0.0.1";

    fn fast_config() -> MessageWorkerConfig {
        MessageWorkerConfig {
            accept_timeout_secs: 1,
            io_timeout_secs: 1,
            backoff: Duration::from_millis(100),
            send_interval: Duration::from_millis(20),
            ..MessageWorkerConfig::default()
        }
    }

    fn wait_for<T>(timeout: Duration, mut check: impl FnMut() -> Option<T>) -> Option<T> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Some(value) = check() {
                return Some(value);
            }
            thread::sleep(Duration::from_millis(10));
        }
        None
    }

    fn started_receiver(name: &str, port: u16) -> (MessageWorker, u16) {
        let receiver = MessageWorker::receiver(name, Some(LOOPBACK), port, fast_config());
        assert!(receiver.start().unwrap());
        let port = wait_for(Duration::from_secs(5), || receiver.bound_port())
            .expect("receiver never bound");
        (receiver, port)
    }

    fn recv_text(receiver: &MessageWorker) -> Option<String> {
        wait_for(Duration::from_secs(5), || receiver.dequeue())
            .map(|message| message.to_text().into_owned())
    }

    #[test]
    fn delivers_hello_end_to_end() {
        let (receiver, port) = started_receiver("e2e-receiver", 0);
        let sender = MessageWorker::sender("e2e-sender", LOOPBACK, port, fast_config());
        assert!(sender.start().unwrap());
        assert_eq!(sender.role(), Role::Sender);
        assert_eq!(receiver.role(), Role::Receiver);

        sender.enqueue("hello");
        assert_eq!(recv_text(&receiver).as_deref(), Some("hello"));
        assert_eq!(sender.pending(), 0);

        sender.join().unwrap();
        receiver.join().unwrap();
        assert_eq!(receiver.state(), WorkerState::Joined);
    }

    #[test]
    fn acknowledged_mode_preserves_order() {
        let mut config = fast_config();
        config.channel.await_ack = true;
        let receiver = MessageWorker::receiver("order-receiver", Some(LOOPBACK), 0, config.clone());
        receiver.start().unwrap();
        let port = wait_for(Duration::from_secs(5), || receiver.bound_port()).unwrap();
        let sender = MessageWorker::sender("order-sender", LOOPBACK, port, config);
        for i in 0..20 {
            sender.enqueue(format!("msg-{i}"));
        }
        sender.start().unwrap();

        for i in 0..20 {
            assert_eq!(recv_text(&receiver), Some(format!("msg-{i}")));
        }
    }

    #[test]
    fn unacknowledged_burst_arrives_message_by_message() {
        let (receiver, port) = started_receiver("burst-receiver", 0);
        let sender = MessageWorker::sender("burst-sender", LOOPBACK, port, fast_config());
        for i in 0..200 {
            sender.enqueue(format!("m{i}"));
        }
        sender.start().unwrap();

        for i in 0..200 {
            assert_eq!(recv_text(&receiver), Some(format!("m{i}")));
        }
        assert_eq!(receiver.pending(), 0);
    }

    #[test]
    fn rejected_message_is_dropped_not_retried() {
        let mut config = fast_config();
        config.channel.await_ack = true;
        config.max_message_len = 8;
        let receiver = MessageWorker::receiver("small-receiver", Some(LOOPBACK), 0, config.clone());
        receiver.start().unwrap();
        let port = wait_for(Duration::from_secs(5), || receiver.bound_port()).unwrap();

        let sender = MessageWorker::sender("oversize-sender", LOOPBACK, port, config);
        sender.enqueue("far too long");
        sender.enqueue("ok");
        sender.start().unwrap();

        assert_eq!(recv_text(&receiver).as_deref(), Some("ok"));
        assert!(wait_for(Duration::from_secs(5), || (sender.pending() == 0).then_some(())).is_some());
        thread::sleep(Duration::from_millis(200));
        assert!(receiver.dequeue().is_none());
        assert_eq!(sender.pending(), 0);
    }

    #[test]
    fn receiver_shutdown_is_bounded_by_accept_timeout() {
        let (receiver, _) = started_receiver("idle-receiver", 0);
        let started = Instant::now();
        receiver.signal_shutdown(true);
        receiver.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn sender_started_before_receiver_retries() {
        let port = {
            let ephemeral = TcpListener::bind((LOOPBACK, 0)).unwrap();
            ephemeral.local_addr().unwrap().port()
        };
        let sender = MessageWorker::sender("early-sender", LOOPBACK, port, fast_config());
        sender.start().unwrap();
        sender.enqueue("waited");
        thread::sleep(Duration::from_millis(300));
        assert_eq!(sender.pending(), 1);

        let (receiver, _) = started_receiver("late-receiver", port);
        assert_eq!(recv_text(&receiver).as_deref(), Some("waited"));
    }

    #[test]
    fn receiver_listens_again_after_peer_leaves() {
        let (receiver, port) = started_receiver("relisten-receiver", 0);

        let first = MessageWorker::sender("first-sender", LOOPBACK, port, fast_config());
        first.start().unwrap();
        first.enqueue("one");
        assert_eq!(recv_text(&receiver).as_deref(), Some("one"));
        drop(first);

        let second = MessageWorker::sender("second-sender", LOOPBACK, port, fast_config());
        second.start().unwrap();
        second.enqueue("two");
        assert_eq!(recv_text(&receiver).as_deref(), Some("two"));
    }

    #[test]
    fn message_queued_just_before_shutdown_is_delivered() {
        let (receiver, port) = started_receiver("final-receiver", 0);
        let sender = MessageWorker::sender("final-sender", LOOPBACK, port, fast_config());
        sender.start().unwrap();
        sender.enqueue("warmup");
        assert_eq!(recv_text(&receiver).as_deref(), Some("warmup"));

        sender.enqueue(":SHUTDOWN:");
        sender.signal_shutdown(true);
        sender.join().unwrap();
        assert_eq!(recv_text(&receiver).as_deref(), Some(":SHUTDOWN:"));
    }

    #[test]
    fn failed_send_requeues_at_tail() {
        let queue = Arc::new(OwnedQueue::new("requeue"));
        queue.enqueue(Message::from("a"));
        queue.enqueue(Message::from("b"));
        let endpoint = Endpoint {
            role: Role::Sender,
            host: Some(LOOPBACK.to_string()),
            port: 1,
            config: fast_config(),
            queue: Arc::clone(&queue),
            bound_port: Arc::new(AtomicU16::new(0)),
            span: tracing::Span::none(),
        };

        let mut handle = ConnectionHandle::open_for_send(LOOPBACK, 1, 86_401);
        assert!(!handle.is_valid());
        assert!(!endpoint.drain_to(&mut handle));
        assert_eq!(queue.dequeue().map(Message::into_bytes).as_deref(), Some(&b"b"[..]));
        assert_eq!(queue.dequeue().map(Message::into_bytes).as_deref(), Some(&b"a"[..]));
    }

    #[test]
    fn write_failure_requeues_message() {
        let raw = TcpListener::bind((LOOPBACK, 0)).unwrap();
        let port = raw.local_addr().unwrap().port();
        let queue = Arc::new(OwnedQueue::new("write-failure"));
        let endpoint = Endpoint {
            role: Role::Sender,
            host: Some(LOOPBACK.to_string()),
            port,
            config: fast_config(),
            queue: Arc::clone(&queue),
            bound_port: Arc::new(AtomicU16::new(0)),
            span: tracing::Span::none(),
        };

        let mut handle = ConnectionHandle::open_for_send(LOOPBACK, port, 1);
        let (peer, _) = raw.accept().unwrap();
        drop(peer);

        let mut failed = false;
        for _ in 0..100 {
            queue.enqueue(Message::from("x"));
            if !endpoint.drain_to(&mut handle) {
                failed = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        assert!(failed, "a write to a closed peer should fail");
        assert_eq!(queue.len(), 1);
        assert!(!handle.is_connected());
    }

    #[test]
    fn drop_discards_undelivered_messages() {
        let sender = MessageWorker::sender("doomed", LOOPBACK, 1, fast_config());
        sender.start().unwrap();
        sender.enqueue("never");
        sender.enqueue("sent");
        let started = Instant::now();
        drop(sender);
        assert!(started.elapsed() < Duration::from_secs(3));
    }
}

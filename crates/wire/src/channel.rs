//! Request/response over UDP.
//!
//! Every outbound call uses a fresh ephemeral socket and waits for exactly
//! one datagram back. Inbound datagrams are each handled on their own task,
//! so a slow or panicking handler never blocks the receive loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use common::StoreCode;
use metrics::Label;
use tokio::net::UdpSocket;
use tracing::{debug, error, instrument, warn};

use crate::codec::{MAX_DATAGRAM_LEN, Operation, Request, Response};
use crate::codes;
use crate::directory::PeerDirectory;
use crate::error::ChannelError;

/// Default time to wait for a peer's answer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends requests to other store nodes.
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// Sends `request` to `store` and waits for its response.
    async fn call(&self, store: &StoreCode, request: &Request) -> Result<Response, ChannelError>;
}

/// Serves requests arriving from other store nodes.
#[async_trait]
pub trait InboundHandler: Send + Sync + 'static {
    /// Produces the response for one request. Never fails: business
    /// failures are negative responses.
    async fn handle(&self, request: Request) -> Response;
}

/// [`PeerClient`] over real UDP sockets.
#[derive(Debug, Clone)]
pub struct UdpPeerClient {
    directory: PeerDirectory,
    timeout: Duration,
}

impl UdpPeerClient {
    pub fn new(directory: PeerDirectory, timeout: Duration) -> Self {
        Self { directory, timeout }
    }

    pub fn directory(&self) -> &PeerDirectory {
        &self.directory
    }

    async fn exchange(
        &self,
        store: &StoreCode,
        addr: SocketAddr,
        payload: &[u8],
    ) -> Result<Response, ChannelError> {
        let unreachable = |source: io::Error| ChannelError::Unreachable {
            store: store.clone(),
            source,
        };
        let local: SocketAddr = if addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await.map_err(unreachable)?;
        socket.connect(addr).await.map_err(unreachable)?;
        socket.send(payload).await.map_err(unreachable)?;

        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        let len = match tokio::time::timeout(self.timeout, socket.recv(&mut buf)).await {
            Ok(Ok(len)) => len,
            Ok(Err(source)) => return Err(unreachable(source)),
            Err(_) => {
                return Err(ChannelError::Timeout {
                    store: store.clone(),
                    after: self.timeout,
                });
            }
        };
        Response::from_bytes(&buf[..len]).map_err(|source| ChannelError::Malformed {
            store: store.clone(),
            source,
        })
    }
}

#[async_trait]
impl PeerClient for UdpPeerClient {
    #[instrument(skip(self, request), fields(op = %request.operation))]
    async fn call(&self, store: &StoreCode, request: &Request) -> Result<Response, ChannelError> {
        let start = Instant::now();
        let addr = self
            .directory
            .address(store)
            .ok_or_else(|| ChannelError::UnknownStore(store.clone()))?;
        let payload = request.encode().map_err(ChannelError::Encode)?;

        let result = self.exchange(store, addr, payload.as_bytes()).await;

        let outcome = match &result {
            Ok(response) if response.success => "success",
            Ok(_) => "rejected",
            Err(e) => e.code(),
        };
        metrics::counter!(
            "peer_requests_total",
            peer_request_labels(request.operation, outcome)
        )
        .increment(1);
        metrics::histogram!(
            "peer_request_duration_seconds",
            "op" => request.operation.as_str()
        )
        .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(response) => debug!(%store, success = response.success, "peer responded"),
            Err(e) => warn!(%store, error = %e, "peer call failed"),
        }
        result
    }
}

/// Receives peer requests on one UDP socket.
#[derive(Debug)]
pub struct UdpListener {
    socket: Arc<UdpSocket>,
}

impl UdpListener {
    /// Binds the listening socket. Port 0 picks an ephemeral port.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self {
            socket: Arc::new(socket),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs the receive loop until the socket fails.
    ///
    /// Dropping the returned future stops receiving; requests already
    /// dispatched run to completion.
    pub async fn serve<H: InboundHandler>(self, handler: Arc<H>) -> io::Result<()> {
        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            let (len, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                // ICMP errors from earlier sends surface here on some platforms.
                Err(e) if is_transient(&e) => {
                    debug!(error = %e, "ignoring transient receive error");
                    continue;
                }
                Err(e) => {
                    error!(error = %e, "peer listener stopped");
                    return Err(e);
                }
            };
            let datagram = buf[..len].to_vec();
            let socket = Arc::clone(&self.socket);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                let response = dispatch(handler, &datagram).await;
                let payload = encode_or_fallback(&response);
                if let Err(e) = socket.send_to(payload.as_bytes(), peer).await {
                    warn!(%peer, error = %e, "failed to send peer response");
                }
            });
        }
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused
    )
}

async fn dispatch<H: InboundHandler>(handler: Arc<H>, datagram: &[u8]) -> Response {
    let request = match Request::from_bytes(datagram) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "malformed peer request");
            return Response::failure(format!("Malformed request: {e}"), codes::MALFORMED);
        }
    };
    let operation = request.operation;
    debug!(%operation, "peer request received");

    match tokio::spawn(async move { handler.handle(request).await }).await {
        Ok(response) => response,
        Err(e) => {
            error!(%operation, error = %e, "peer request handler failed");
            Response::failure("Processing error", codes::PROCESSING_ERROR)
        }
    }
}

fn encode_or_fallback(response: &Response) -> String {
    match response.encode() {
        Ok(encoded) => encoded,
        Err(e) => {
            error!(error = %e, "response could not be encoded");
            Response::failure("Processing error", codes::PROCESSING_ERROR).render()
        }
    }
}

/// Labels of `peer_requests_total`.
fn peer_request_labels(op: Operation, outcome: &'static str) -> Vec<Label> {
    vec![
        Label::new("op", op.as_str()),
        Label::new("outcome", outcome),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    use common::{CustomerId, ItemId};

    struct Echo;

    #[async_trait]
    impl InboundHandler for Echo {
        async fn handle(&self, request: Request) -> Response {
            match request.operation {
                Operation::ExchangeReturn => panic!("handler blew up"),
                op => Response::ok(op.as_str()),
            }
        }
    }

    async fn start() -> (PeerDirectory, StoreCode) {
        let listener = UdpListener::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(listener.serve(Arc::new(Echo)));
        let store = StoreCode::new("QC").unwrap();
        (PeerDirectory::new([(store.clone(), addr)]), store)
    }

    fn customer() -> CustomerId {
        CustomerId::new("QCU1111").unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_over_udp() {
        let (directory, store) = start().await;
        let client = UdpPeerClient::new(directory, DEFAULT_TIMEOUT);
        let response = client
            .call(&store, &Request::find(customer(), "tea"))
            .await
            .unwrap();
        assert!(response.success);
        assert_eq!(response.message, "FIND");
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_processing_error() {
        let (directory, store) = start().await;
        let client = UdpPeerClient::new(directory, DEFAULT_TIMEOUT);
        let request = Request::exchange_return(customer(), ItemId::new("QC1001").unwrap());
        let response = client.call(&store, &request).await.unwrap();
        assert!(!response.success);
        assert_eq!(response.error_code.as_deref(), Some(codes::PROCESSING_ERROR));

        // The listener keeps serving after a handler panic.
        let again = client
            .call(&store, &Request::find(customer(), "tea"))
            .await
            .unwrap();
        assert!(again.success);
    }

    #[tokio::test]
    async fn test_unknown_store() {
        let client = UdpPeerClient::new(PeerDirectory::default(), DEFAULT_TIMEOUT);
        let store = StoreCode::new("NB").unwrap();
        let err = client
            .call(&store, &Request::find(customer(), "tea"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::UnknownStore(_)));
        assert!(!err.outcome_unknown());
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        // Bound but never read, so the request is swallowed.
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let store = StoreCode::new("BC").unwrap();
        let directory = PeerDirectory::new([(store.clone(), silent.local_addr().unwrap())]);
        let client = UdpPeerClient::new(directory, Duration::from_millis(100));
        let err = client
            .call(&store, &Request::find(customer(), "tea"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::Timeout { .. }));
        assert!(err.outcome_unknown());
    }

    #[test]
    fn test_peer_request_labels() {
        let labels = peer_request_labels(Operation::ExchangePrepare, codes::TIMEOUT);
        let pairs: Vec<(&str, &str)> = labels.iter().map(|l| (l.key(), l.value())).collect();
        assert_eq!(
            pairs,
            [("op", "EXCHANGE_PREPARE"), ("outcome", codes::TIMEOUT)]
        );
    }
}

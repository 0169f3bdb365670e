// Server loop module
// Accepts connections until shutdown is requested, then drains in-flight connections

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{watch, Notify};

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Main accept loop
///
/// Each accepted connection is served on its own task. Returns once `shutdown` is
/// notified and in-flight connections have finished or the grace period ran out.
/// Idle keep-alive connections are asked to close as soon as shutdown begins.
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    active_connections: Arc<AtomicUsize>,
    shutdown: Arc<Notify>,
) {
    let (closing_tx, closing_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &state,
                            &active_connections,
                            &closing_rx,
                        );
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            () = shutdown.notified() => {
                logger::log_info("No longer accepting connections");
                break;
            }
        }
    }

    // Close the listening socket before waiting on open connections
    drop(listener);
    closing_tx.send_replace(true);

    let grace = Duration::from_secs(state.config.performance.shutdown_grace);
    drain_connections(&active_connections, grace).await;
}

/// Wait until no connection is active or `grace` has elapsed
async fn drain_connections(active_connections: &AtomicUsize, grace: Duration) {
    let deadline = tokio::time::Instant::now() + grace;

    loop {
        let remaining = active_connections.load(Ordering::SeqCst);
        if remaining == 0 {
            logger::log_info("All connections closed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            logger::log_warning(&format!(
                "Shutdown grace period elapsed with {remaining} connection(s) still open"
            ));
            return;
        }
        tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_listener;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn raw_request(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_conversion_over_tcp() {
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(AppState::new(Config::for_tests()));
        let counter = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());

        let server = tokio::spawn(start_server_loop(
            listener,
            state,
            Arc::clone(&counter),
            Arc::clone(&shutdown),
        ));

        let response = raw_request(
            addr,
            "POST /md5 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.contains("content-type: application/json"), "{response}");
        assert!(response.ends_with(
            r#"{"code":200,"message":"Success","data":"5d41402abc4b2a76b9719d911017c592"}"#
        ));

        let response = raw_request(
            addr,
            "GET /md5 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 405"), "{response}");
        assert!(response.contains("not allowed method GET, must be POST"));

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_keep_alive() {
        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let mut config = Config::for_tests();
        config.performance.shutdown_grace = 30;
        let state = Arc::new(AppState::new(config));
        let counter = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(Notify::new());

        let server = tokio::spawn(start_server_loop(
            listener,
            state,
            Arc::clone(&counter),
            Arc::clone(&shutdown),
        ));

        // Complete one request and leave the connection open
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"POST /md5 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 1024];
        let n = stream.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"HTTP/1.1 200 OK"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        shutdown.notify_one();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("idle connection held the server past shutdown")
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        // The server side has closed the socket
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
    }

    #[tokio::test]
    async fn test_drain_returns_after_grace() {
        let counter = AtomicUsize::new(1);
        let started = tokio::time::Instant::now();
        drain_connections(&counter, Duration::from_millis(120)).await;
        assert!(started.elapsed() >= Duration::from_millis(120));
    }

    #[tokio::test]
    async fn test_drain_returns_immediately_when_idle() {
        let counter = AtomicUsize::new(0);
        tokio::time::timeout(
            Duration::from_millis(50),
            drain_connections(&counter, Duration::from_secs(30)),
        )
        .await
        .unwrap();
    }
}

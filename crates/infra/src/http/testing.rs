//! Raw TCP server for body-stage failures wiremock cannot produce

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Answers every connection with `200` and a `content-length` for `body`.
///
/// The first `stalls` connections get only half of the body and then go
/// quiet; later connections get the full body.
pub(crate) struct StallingServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StallingServer {
    pub(crate) async fn start(stalls: usize, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let hit = counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(async move {
                    let mut request = [0u8; 8192];
                    let _ = socket.read(&mut request).await;

                    let head = format!(
                        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\n\
                         content-length: {}\r\nconnection: close\r\n\r\n",
                        body.len()
                    );
                    let _ = socket.write_all(head.as_bytes()).await;

                    if hit < stalls {
                        let _ = socket.write_all(&body.as_bytes()[..body.len() / 2]).await;
                        let _ = socket.flush().await;
                        tokio::time::sleep(Duration::from_secs(10)).await;
                    } else {
                        let _ = socket.write_all(body.as_bytes()).await;
                        let _ = socket.flush().await;
                    }
                });
            }
        });

        Self { addr, hits }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Connections accepted so far, one per attempt
    pub(crate) fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

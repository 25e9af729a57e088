//! Accept loop: one tokio task per connection, HTTP/1 served by hyper.

use std::net::SocketAddr;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::routes::{handle, AppState};

/// A bound listener that has not started serving yet. Splitting bind
/// from run lets callers learn the actual address when binding port 0.
pub struct ProxyServer {
    listener: TcpListener,
    state: AppState,
}

impl ProxyServer {
    pub async fn bind(addr: &str, state: AppState) -> Result<Self, std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.listener.local_addr()
    }

    /// Serve until the process is killed. Per-connection failures are
    /// logged and never stop the loop.
    pub async fn run(self) -> Result<(), std::io::Error> {
        let local = self.local_addr()?;
        log::info!("detection proxy listening on http://{local}");

        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        let service = service_fn(move |request| {
                            let state = state.clone();
                            async move {
                                Ok::<_, std::convert::Infallible>(handle(state, request).await)
                            }
                        });
                        if let Err(e) = http1::Builder::new()
                            .serve_connection(TokioIo::new(stream), service)
                            .await
                        {
                            log::warn!("connection from {peer} ended with error: {e}");
                        }
                    });
                }
                Err(e) => {
                    log::warn!("accept error: {e}");
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                }
            }
        }
    }
}

/// Bind and serve in one step.
pub async fn serve(addr: &str, state: AppState) -> Result<(), std::io::Error> {
    ProxyServer::bind(addr, state).await?.run().await
}

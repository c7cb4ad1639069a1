use std::{net::SocketAddr, sync::Arc};

use crate::{
    foundation::error::{QrBrandError, QrBrandResult},
    serve::handler::{RequestHandler, Response},
};

/// Bound HTTP listener, ready to run worker threads.
pub struct Listener {
    server: Arc<tiny_http::Server>,
    addr: SocketAddr,
}

impl Listener {
    /// Bind `addr`. Port 0 picks a free port; see [`Listener::local_addr`].
    pub fn bind(addr: SocketAddr) -> QrBrandResult<Self> {
        let server = tiny_http::Server::http(addr)
            .map_err(|e| anyhow::anyhow!("bind http listener on {addr}: {e}"))?;
        let addr = server.server_addr().to_ip().unwrap_or(addr);
        Ok(Self {
            server: Arc::new(server),
            addr,
        })
    }

    /// Address actually bound.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Serve requests on `workers` threads until the listener shuts down.
    pub fn run(self, workers: usize, handler: Arc<RequestHandler>) -> QrBrandResult<()> {
        if workers == 0 {
            return Err(QrBrandError::config("workers must be at least 1"));
        }
        tracing::info!(addr = %self.addr, workers, "listening");

        let threads = (0..workers)
            .map(|i| {
                let server = self.server.clone();
                let handler = handler.clone();
                std::thread::Builder::new()
                    .name(format!("qrbrand-worker-{i}"))
                    .spawn(move || worker_loop(&server, &handler))
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| anyhow::anyhow!("spawn worker thread: {e}"))?;

        for t in threads {
            if t.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
        Ok(())
    }
}

/// Bind `addr` and serve until shutdown.
pub fn serve(addr: SocketAddr, workers: usize, handler: Arc<RequestHandler>) -> QrBrandResult<()> {
    Listener::bind(addr)?.run(workers, handler)
}

fn worker_loop(server: &tiny_http::Server, handler: &RequestHandler) {
    for request in server.incoming_requests() {
        let method = request.method().as_str().to_string();
        let url = request.url().to_string();
        let resp = handler.handle(&method, &url);
        if let Err(err) = request.respond(to_tiny_http(resp)) {
            tracing::warn!(error = %err, "failed to write response");
        }
    }
}

fn to_tiny_http(resp: Response) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let mut out = tiny_http::Response::from_data(resp.body).with_status_code(resp.status);
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], resp.content_type.as_bytes());
    if let Ok(h) = header {
        out.add_header(h);
    }
    out
}

use anyhow::{anyhow, bail, Context, Result};
use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::LOCATION;
use axum::http::{HeaderValue, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tower::ServiceExt;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{debug, error, info, info_span, warn, Level};

use crate::config::ServerConfig;
use crate::overlay::OverlayNode;
use crate::readiness::{ReadinessError, ReadinessPoller};
use crate::tls::{self, CertificateProvider};

const ACCEPT_ERROR_DELAY: Duration = Duration::from_secs(1);

/// Open the listeners for the configured mode and serve until one of them
/// fails. Never returns `Ok` under normal operation.
pub async fn run(config: Arc<ServerConfig>, node: Arc<dyn OverlayNode>, files: Router) -> Result<()> {
    let files = if config.debug {
        with_request_logging(files)
    } else {
        files
    };

    if config.use_https {
        run_https(config, node, files).await
    } else {
        run_plain(config, node, files).await
    }
}

async fn run_plain(config: Arc<ServerConfig>, node: Arc<dyn OverlayNode>, files: Router) -> Result<()> {
    let listener = node
        .listen(config.http_port)
        .await
        .context("Failed to open HTTP listener")?;

    info!(
        "Serving bucket {} on http://{}",
        config.storage.bucket,
        listener.local_addr()?
    );
    serve_http(listener, files).await
}

async fn run_https(config: Arc<ServerConfig>, node: Arc<dyn OverlayNode>, files: Router) -> Result<()> {
    // Certificates are fetched per handshake, so this listener does not wait
    // for the node to be ready.
    let tls_listener = node
        .listen(config.https_port)
        .await
        .context("Failed to open HTTPS listener")?;
    info!(
        "Serving bucket {} on https://{}",
        config.storage.bucket,
        tls_listener.local_addr()?
    );

    let (ready_tx, ready_rx) = oneshot::channel();
    let poller = ReadinessPoller::new(config.readiness_attempts, config.readiness_interval);
    let control = node.control();
    tokio::spawn(async move {
        poller.signal(control.as_ref(), ready_tx).await;
    });

    let redirect = tokio::spawn(run_redirect(config.clone(), node.clone(), ready_rx));

    tokio::select! {
        res = serve_tls(tls_listener, node.certificates(), files) => {
            res.context("HTTPS server failed")
        }
        res = redirect => match res {
            Ok(Ok(())) => bail!("HTTP redirect listener stopped unexpectedly"),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow!("HTTP redirect task failed: {}", e)),
        },
    }
}

/// Wait for readiness, then redirect all plaintext traffic to HTTPS.
async fn run_redirect(
    config: Arc<ServerConfig>,
    node: Arc<dyn OverlayNode>,
    ready: oneshot::Receiver<Result<(), ReadinessError>>,
) -> Result<()> {
    match ready.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => return Err(e).context("tailnet did not become ready"),
        Err(_) => bail!("readiness poller stopped without reporting"),
    }

    let listener = node
        .listen(config.http_port)
        .await
        .context("Failed to open HTTP redirect listener")?;

    let name = node
        .control()
        .expand_sni_name(&config.node.name)
        .await
        .ok_or_else(|| anyhow!("can't get hostname for https redirect"))?;

    info!(
        "Redirecting http://{} to https://{}",
        listener.local_addr()?,
        name
    );

    let router = redirect_router(name);
    let router = if config.debug {
        with_request_logging(router)
    } else {
        router
    };
    serve_http(listener, router).await
}

fn redirect_router(host: String) -> Router {
    Router::new()
        .fallback(redirect_to_https)
        .with_state(Arc::<str>::from(host))
}

async fn redirect_to_https(State(host): State<Arc<str>>, uri: Uri) -> Response {
    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let target = format!("https://{}{}", host, path);

    match HeaderValue::from_str(&target) {
        Ok(location) => (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response(),
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn serve_http(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("HTTP server failed")?;
    Ok(())
}

async fn serve_tls(
    listener: TcpListener,
    certificates: Arc<dyn CertificateProvider>,
    app: Router,
) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                if let Some(delay) = accept_backoff(&e) {
                    error!("Failed to accept TLS connection: {}", e);
                    tokio::time::sleep(delay).await;
                }
                continue;
            }
        };

        let certificates = certificates.clone();
        let app = app.clone();
        tokio::spawn(async move {
            let stream = match tls::accept(stream, certificates.as_ref()).await {
                Ok(s) => s,
                Err(e) => {
                    warn!("TLS handshake with {} failed: {}", peer, e);
                    return;
                }
            };

            let service = service_fn(move |mut req: Request<Incoming>| {
                req.extensions_mut().insert(ConnectInfo(peer));
                app.clone().oneshot(req)
            });

            if let Err(e) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), service)
                .await
            {
                debug!("Error serving TLS connection from {}: {}", peer, e);
            }
        });
    }
}

/// Delay before the next accept. Errors that belong to a single connection
/// are retried at once; anything else (e.g. out of file descriptors) waits.
fn accept_backoff(err: &io::Error) -> Option<Duration> {
    match err.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset => None,
        _ => Some(ACCEPT_ERROR_DELAY),
    }
}

/// Log method, remote address and URI of every request.
fn with_request_logging(router: Router) -> Router {
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(|req: &Request<Body>| {
                let remote = req
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.to_string())
                    .unwrap_or_else(|| "-".to_string());
                info_span!(
                    "request",
                    method = %req.method(),
                    remote = %remote,
                    uri = %req.uri(),
                )
            })
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

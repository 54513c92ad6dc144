//! The viewer facing HTTP server: an index page and the MJPEG feed.

use std::{io, net::SocketAddr};

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse},
    routing::get,
};
use comms::{MJPEG_CONTENT_TYPE, encode_part};
use futures::{Stream, stream};
use log::{debug, info};
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::hub::{FrameFeed, FrameHub};

pub const INDEX_HTML: &str = r#"<html>
<head>
    <style>
        body, html {
            margin: 0;
            padding: 0;
            overflow: hidden;
        }
        img {
            position: absolute;
            top: 0;
            left: 0;
            width: 100%;
            height: 100%;
        }
    </style>
</head>
<body>
    <img src="/video_feed">
</body>
</html>
"#;

/// Accepts viewers and serves them frames from a `FrameHub`.
pub struct HttpServer {
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    /// Binds a new `HttpServer`.
    ///
    /// # Arguments
    /// * `addr` - Where to listen.
    /// * `hub` - Where viewers get their frames from.
    ///
    /// # Returns
    /// A new `HttpServer` instance or an io error if binding failed.
    pub async fn bind<A: ToSocketAddrs>(addr: A, hub: FrameHub) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            router: router(hub),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves connections until the listener fails.
    pub async fn run(self) -> io::Result<()> {
        axum::serve(self.listener, self.router).await
    }
}

/// Builds the routes: `/`, `/video_feed` and a 404 for everything else.
///
/// Other methods on known paths are answered with a 405.
pub fn router(hub: FrameHub) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/video_feed", get(video_feed))
        .fallback(not_found)
        .with_state(hub)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn video_feed(State(hub): State<FrameHub>) -> impl IntoResponse {
    info!(viewers = hub.viewers() + 1; "viewer joined the video feed");

    let headers = [
        (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
        (header::CACHE_CONTROL, "no-cache, private"),
        (header::PRAGMA, "no-cache"),
    ];

    (headers, Body::from_stream(mjpeg_stream(hub.subscribe())))
}

async fn not_found(uri: Uri) -> (StatusCode, &'static str) {
    debug!("no route for {uri}");
    (StatusCode::NOT_FOUND, "not found\n")
}

/// A viewer's position in its feed, logs how far it got once dropped.
struct Viewer<F> {
    feed: F,
    sent: u64,
}

impl<F> Drop for Viewer<F> {
    fn drop(&mut self) {
        info!("viewer left after {} frames", self.sent);
    }
}

/// Turns every frame of `feed` into an MJPEG part.
///
/// The stream ends with the feed, and the feed is dropped as soon as the
/// viewer goes away.
///
/// # Arguments
/// * `feed` - Where the frames come from.
///
/// # Returns
/// A body stream for a `multipart/x-mixed-replace` response.
pub fn mjpeg_stream<F>(feed: F) -> impl Stream<Item = io::Result<Vec<u8>>> + Send + 'static
where
    F: FrameFeed + 'static,
{
    let viewer = Viewer { feed, sent: 0 };

    stream::unfold(viewer, |mut viewer| async move {
        let jpeg = viewer.feed.next_frame().await?;
        viewer.sent += 1;
        debug!(len = jpeg.len(); "sending part");
        Some((Ok(encode_part(&jpeg)), viewer))
    })
}

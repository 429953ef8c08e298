//! Local fixture server
//!
//! Serves a tiny stand-in for the signing service's download screen on an
//! ephemeral loopback port.

use axum::http::header;
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::Router;

/// Bytes served as `/signed.pdf`; deliberately not valid UTF-8
pub const SIGNED_PDF: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n1 0 obj\n<<>>\nendobj\n%%EOF\n";

const DOWNLOAD_PAGE: &str = r##"<!doctype html>
<html>
<body>
  <a class="downloader__btn" href="#"
     onclick="fetch('/signed.pdf').then(r => r.arrayBuffer()); return false;">Download</a>
  <a id="not-a-pdf" href="#"
     onclick="fetch('/notes.txt').then(r => r.text()); return false;">Notes</a>
</body>
</html>"##;

fn router() -> Router {
    Router::new()
        .route("/", get(|| async { Html(DOWNLOAD_PAGE) }))
        .route("/signed.pdf", get(signed_pdf))
        .route("/notes.txt", get(notes))
}

async fn signed_pdf() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/pdf")], SIGNED_PDF)
}

async fn notes() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "not a pdf")
}

/// Start the fixture server, returning its base URL (no trailing slash)
pub async fn start() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Should bind loopback port");
    let addr = listener.local_addr().expect("Should have local address");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            eprintln!("Fixture server stopped: {}", e);
        }
    });
    format!("http://{}", addr)
}

use axum::Router;
use log::info;
use std::net::SocketAddr;

/// Serve `app` on all interfaces until the process is stopped.
pub async fn serve(app: Router, port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on port {}", port);
    axum::serve(listener, app).await
}

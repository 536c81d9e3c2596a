use sessionist::api;
use sessionist::logger::*;
use sessionist::server::*;
use sessionist::settings::*;
use std::fs;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

fn ensure_file(what: &str, path: &str) -> anyhow::Result<()> {
    if !fs::metadata(path)?.is_file() {
        return Err(anyhow::anyhow!("TLS {} is not a regular file: {:?}", what, path));
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("could not listen for SIGINT: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.apply(&project_settings.log)?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;
    let server = Arc::new(Server::try_new(&project_settings).await?);

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.clone()))
        .recover(api::v1::recover_error)
        .with(warp::trace::request());

    match (&project_settings.http.cert_path, &project_settings.http.key_path) {
        (Some(cert_path), Some(key_path)) => {
            ensure_file("cert", cert_path)?;
            ensure_file("key", key_path)?;
            let (bound, serving) = warp::serve(api_v1)
                .tls()
                .cert_path(cert_path)
                .key_path(key_path)
                .bind_with_graceful_shutdown(address, shutdown_signal());
            info!(%bound, "listening with TLS");
            serving.await;
        }
        (None, None) => {
            warn!("no TLS configured; cookies marked secure will not be sent back over plain http");
            let (bound, serving) =
                warp::serve(api_v1).bind_with_graceful_shutdown(address, shutdown_signal());
            info!(%bound, "listening");
            serving.await;
        }
        _ => anyhow::bail!("http.cert_path and http.key_path must be set together"),
    }

    info!("server stopped");
    Ok(())
}

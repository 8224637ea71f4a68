use crate::config::{InjectorConfig, ServerConfig};
use crate::injector::{injector_handler, load_ssl, FluentdInjectorContext};
use crate::logging::init_logger;
use fluentd_macros::{fluentd_error, fluentd_info, fluentd_log, logger, with_dollar_sign};
use futures_util::stream::StreamExt;
use hyper::server::accept;
use hyper::server::conn::AddrIncoming;
use hyper::service::{make_service_fn, service_fn};
use hyper::Server;
use std::convert::Infallible;
use std::error::Error;
use std::future::ready;
use std::net::SocketAddr;
use std::sync::Arc;
use tls_listener::TlsListener;

mod config;
mod errors;
mod injector;
mod logging;
mod patch;
mod policy;

pub type Acceptor = tokio_rustls::TlsAcceptor;

logger!("Main");

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let server_config = ServerConfig::from_env()?;
    init_logger(&server_config.log_config_file)?;

    let injector_config = InjectorConfig::from_env();
    info!("Sidecar configuration: {:?}", injector_config);
    let fluentd_injector_context = Arc::new(FluentdInjectorContext { injector_config });

    let ssl_config = load_ssl(&server_config)?;
    let addr: SocketAddr = ([0, 0, 0, 0], server_config.port).into();
    let tls_acceptor: Acceptor = Arc::new(ssl_config).into();
    let make_service = {
        make_service_fn(move |_conn| {
            let fluentd_injector_context = fluentd_injector_context.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    injector_handler(req, fluentd_injector_context.clone())
                }))
            }
        })
    };
    let incoming = TlsListener::new(tls_acceptor, AddrIncoming::bind(&addr)?).filter(|c| {
        if let Err(e) = c {
            error!("Error accepting connection: {:?}", e);
            ready(false)
        } else {
            ready(true)
        }
    });

    info!("Starting Fluentd Injector server on {}", addr);
    let server = Server::builder(accept::from_stream(incoming)).serve(make_service);
    server.await?;
    Ok(())
}

use crate::Dispatcher;
use nano_http::connection::HttpConnection;
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};

pub struct ServerBuilder {
    dispatcher: Option<Dispatcher>,
    address: Option<String>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { dispatcher: None, address: None }
    }

    /// The address to listen on, anything `tokio::net::TcpListener::bind` resolves.
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn dispatcher(mut self, dispatcher: Dispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        let dispatcher = self.dispatcher.ok_or(ServerError::MissingDispatcher)?;
        let address = self.address.ok_or(ServerError::MissingAddress)?;
        Ok(Server { dispatcher: Arc::new(dispatcher), address })
    }
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder").field("address", &self.address).finish_non_exhaustive()
    }
}

/// Accepts connections and serves each one on its own task.
#[derive(Debug)]
pub struct Server {
    dispatcher: Arc<Dispatcher>,
    address: String,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("dispatcher must be set")]
    MissingDispatcher,
    #[error("address must be set")]
    MissingAddress,
    #[error("failed to bind {address}: {source}")]
    Bind { address: String, source: io::Error },
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Binds the listener and serves until the process ends.
    ///
    /// A fmt subscriber at `INFO` is installed unless the application
    /// already installed one.
    pub async fn start(self) -> Result<(), ServerError> {
        if tracing_subscriber::fmt().with_max_level(Level::INFO).try_init().is_err() {
            debug!("global tracing subscriber already installed");
        }

        let tcp_listener = TcpListener::bind(self.address.as_str())
            .await
            .map_err(|source| ServerError::Bind { address: self.address.clone(), source })?;
        info!(address = %self.address, routes = self.dispatcher.router().len(), "start listening");

        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let dispatcher = Arc::clone(&self.dispatcher);
            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer);
                match connection.process(dispatcher).await {
                    Ok(()) => debug!(remote = %remote_addr, "finished process, connection shutdown"),
                    Err(e) => error!(cause = %e, remote = %remote_addr, "service has error, connection shutdown"),
                }
            });
        }
    }
}

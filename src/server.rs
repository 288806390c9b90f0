//! Line-oriented TCP command server.
//!
//! Accepts client connections and runs one task per connection. Within a
//! connection the loop is strictly sequential: read one `\n`-terminated
//! line, dispatch it, write the response line, repeat. There is no
//! pipelining within a connection; only a transport-level disconnect ends
//! a session.

use crate::dispatch::Dispatcher;
use crate::error::AppResult;
use log::{error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// TCP front end over a shared [`Dispatcher`].
pub struct CommandServer {
    listener: TcpListener,
    dispatcher: Arc<Dispatcher>,
}

impl CommandServer {
    /// Bind the listener socket.
    pub async fn bind(addr: &str, dispatcher: Arc<Dispatcher>) -> AppResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("Command server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            dispatcher,
        })
    }

    /// The bound address (useful when binding to port 0).
    pub fn local_addr(&self) -> AppResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> AppResult<()> {
        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    let dispatcher = self.dispatcher.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_client(socket, addr, dispatcher).await {
                            warn!("Client {} error: {}", addr, e);
                        }
                    });
                }
                Err(e) => error!("Accept error: {}", e),
            }
        }
    }
}

/// Per-connection command loop.
async fn handle_client(
    socket: TcpStream,
    addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
) -> AppResult<()> {
    info!("Client connected: {}", addr);

    let (reader, mut writer) = socket.into_split();
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        let n = reader.read_until(b'\n', &mut line).await?;
        if n == 0 {
            info!("Client {} disconnected", addr);
            return Ok(());
        }

        let response = dispatcher.handle(&line).await;
        writer.write_all(&response).await?;
        writer.write_all(b"\n").await?;
    }
}

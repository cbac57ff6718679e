//! Server network layer handling TCP accepts and simulation startup

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::net::TcpListener;

use crate::connection::handle_connection;
use crate::registry::SessionRegistry;
use crate::scheduler::Scheduler;

/// Main server owning the listener, the room registry and the tick driver.
pub struct GameServer {
    listener: TcpListener,
    registry: Arc<SessionRegistry>,
    tick_period: Duration,
}

impl GameServer {
    /// Binds the listen socket. This is the only fatal startup error; once
    /// the port is ours, everything later is handled per connection.
    pub async fn bind(
        addr: &str,
        tick_period: Duration,
        max_obstacles: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(GameServer {
            listener,
            registry: Arc::new(SessionRegistry::new(max_obstacles)),
            tick_period,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept loop. Runs until the process shuts down.
    pub async fn run(self) {
        let scheduler = Scheduler::new(Arc::clone(&self.registry), self.tick_period);
        tokio::spawn(scheduler.run());

        loop {
            match self.listener.accept().await {
                Ok((socket, addr)) => {
                    info!("Client connected from {}", addr);
                    if let Err(e) = socket.set_nodelay(true) {
                        warn!("{}: failed to disable Nagle: {}", addr, e);
                    }
                    let registry = Arc::clone(&self.registry);
                    tokio::spawn(handle_connection(socket, addr, registry));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

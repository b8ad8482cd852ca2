use std::{
    io,
    net::{Ipv4Addr, SocketAddrV4, TcpListener},
};

use tracing::debug;

/// Editor-side communication endpoint handed to the driver script through
/// `EDITOR_PORT`.
///
/// Only the port is consumed by the launch workflow; serving the connection
/// is owned elsewhere.
pub struct EditorServer {
    listener: TcpListener,
}

impl EditorServer {
    /// Binds to `port` on the loopback interface, or to an ephemeral port
    /// when none is configured.
    pub fn bind(port: Option<u16>) -> io::Result<Self> {
        let addr = SocketAddrV4::new(Ipv4Addr::LOCALHOST, port.unwrap_or(0));
        let listener = TcpListener::bind(addr)?;

        debug!(addr = %listener.local_addr()?, "editor server bound");

        Ok(Self { listener })
    }

    pub fn server_port(&self) -> io::Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }
}

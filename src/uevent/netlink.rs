use async_trait::async_trait;
use netlink_sys::{protocols::NETLINK_KOBJECT_UEVENT, AsyncSocket, AsyncSocketExt, SocketAddr, TokioSocket};
use std::io;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, trace};

use super::channel::{ChannelState, EventChannel, MulticastGroup, RawEvent};
use crate::error::ChannelError;

/// Kernel uevent channel backed by a `NETLINK_KOBJECT_UEVENT` socket
pub struct NetlinkChannel {
    group: MulticastGroup,
    socket: Option<TokioSocket>,
}

impl NetlinkChannel {
    pub fn new(group: MulticastGroup) -> Self {
        Self {
            group,
            socket: None,
        }
    }

    pub fn group(&self) -> MulticastGroup {
        self.group
    }
}

#[async_trait]
impl EventChannel for NetlinkChannel {
    async fn open(&mut self) -> Result<(), ChannelError> {
        if self.socket.is_some() {
            debug!("uevent channel already open");
            return Ok(());
        }

        let mut socket = TokioSocket::new(NETLINK_KOBJECT_UEVENT).map_err(ChannelError::Create)?;

        let addr = SocketAddr::new(std::process::id(), self.group.mask());
        socket
            .socket_mut()
            .bind(&addr)
            .map_err(ChannelError::Bind)?;

        info!(group = %self.group, "uevent netlink socket bound");
        self.socket = Some(socket);
        Ok(())
    }

    async fn read_timeout(&mut self, timeout: Duration) -> Result<Option<RawEvent>, ChannelError> {
        let socket = self.socket.as_mut().ok_or(ChannelError::NotOpen)?;
        let deadline = Instant::now() + timeout;

        loop {
            match timeout_at(deadline, socket.recv_from_full()).await {
                Err(_) => return Ok(None),
                Ok(Ok((payload, _from))) => {
                    trace!(len = payload.len(), "uevent datagram received");
                    return Ok(Some(RawEvent::new(payload)));
                }
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => {
                    trace!("uevent read interrupted, retrying");
                    continue;
                }
                Ok(Err(e)) => return Err(ChannelError::Read(e)),
            }
        }
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            debug!("uevent netlink socket closed");
        }
    }

    fn state(&self) -> ChannelState {
        if self.socket.is_some() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }
}

impl Drop for NetlinkChannel {
    fn drop(&mut self) {
        self.close();
    }
}

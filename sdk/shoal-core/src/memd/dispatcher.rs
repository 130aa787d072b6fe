use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::memd::client::ResponseContext;
use crate::memd::connection::ConnectionType;
use crate::memd::error::Result;
use crate::memd::packet::{RequestPacket, ResponsePacket};
use crate::memd::pendingop::ClientPendingOp;

/// Invoked for server-initiated packets (cluster map change notifications and
/// other duplex traffic); these carry no opaque correlation.
pub type UnsolicitedPacketHandler =
    Arc<dyn Fn(ResponsePacket) -> BoxFuture<'static, ()> + Send + Sync>;

/// Invoked for responses whose opaque no longer has a registered completion,
/// typically because the caller timed out or cancelled.
pub type OrphanResponseHandler = Arc<dyn Fn(ResponsePacket) + Send + Sync>;

pub struct DispatcherOptions {
    pub unsolicited_packet_handler: UnsolicitedPacketHandler,
    pub orphan_handler: Option<OrphanResponseHandler>,
    pub on_read_close_tx: oneshot::Sender<()>,
    pub disable_decompression: bool,
    pub id: String,
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    fn new(conn: ConnectionType, opts: DispatcherOptions) -> Self;
    async fn dispatch<'a>(
        &self,
        packet: RequestPacket<'a>,
        response_context: Option<ResponseContext>,
    ) -> Result<ClientPendingOp>;
    async fn close(&self) -> Result<()>;
}

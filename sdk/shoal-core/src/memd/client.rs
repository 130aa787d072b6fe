use async_trait::async_trait;
use futures::SinkExt;
use log::{debug, error, info, trace, warn};
use snap::raw::Decoder as SnappyDecoder;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::StreamExt;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::memd::client_response::ClientResponse;
use crate::memd::codec::KeyValueCodec;
use crate::memd::connection::{ConnectionType, Stream};
use crate::memd::datatype::DataTypeFlag;
use crate::memd::dispatcher::{
    Dispatcher, DispatcherOptions, OrphanResponseHandler, UnsolicitedPacketHandler,
};
use crate::memd::error;
use crate::memd::error::{CancellationErrorKind, Error};
use crate::memd::magic::Magic;
use crate::memd::packet::{RequestPacket, ResponsePacket};
use crate::memd::pendingop::ClientPendingOp;
use crate::memd::subdoc::SubdocRequestInfo;

pub(crate) type ResponseSender = Sender<error::Result<ClientResponse>>;
pub(crate) type OpaqueMap = HashMap<u32, SenderContext>;

const MAX_OUTSTANDING_REQUESTS: usize = 1024;

#[derive(Debug, Clone)]
pub struct ResponseContext {
    pub cas: Option<u64>,
    pub subdoc_info: Option<SubdocRequestInfo>,
    // A persistent handler stays registered after the first response; used by
    // operations which stream multiple responses under one opaque.
    pub is_persistent: bool,
    pub scope_name: Option<String>,
    pub collection_name: Option<String>,
}

impl Default for ResponseContext {
    fn default() -> Self {
        Self {
            cas: None,
            subdoc_info: None,
            is_persistent: false,
            scope_name: None,
            collection_name: None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct SenderContext {
    pub sender: ResponseSender,
    pub context: Option<ResponseContext>,
}

impl SenderContext {
    fn is_persistent(&self) -> bool {
        self.context
            .as_ref()
            .map(|c| c.is_persistent)
            .unwrap_or_default()
    }
}

struct ReadLoopOptions {
    pub client_id: String,
    pub unsolicited_packet_handler: UnsolicitedPacketHandler,
    pub orphan_handler: Option<OrphanResponseHandler>,
    pub on_read_close_tx: Option<tokio::sync::oneshot::Sender<()>>,
    pub on_close_cancel: CancellationToken,
    pub disable_decompression: bool,
}

#[derive(Debug)]
pub struct Client {
    current_opaque: AtomicU32,
    opaque_map: Arc<std::sync::Mutex<OpaqueMap>>,

    client_id: String,

    writer: Mutex<FramedWrite<WriteHalf<Box<dyn Stream>>, KeyValueCodec>>,
    on_close_cancel: DropGuard,

    local_addr: SocketAddr,
    peer_addr: SocketAddr,

    closed: AtomicBool,
}

impl Client {
    fn register_handler(&self, context: SenderContext) -> error::Result<u32> {
        let mut map = self.opaque_map.lock().unwrap();

        if map.len() >= MAX_OUTSTANDING_REQUESTS {
            return Err(Error::new_message_error(
                "too many outstanding requests on connection",
            ));
        }

        let opaque = self.current_opaque.fetch_add(1, Ordering::SeqCst);
        map.insert(opaque, context);

        Ok(opaque)
    }

    async fn drain_opaque_map(opaque_map: Arc<std::sync::Mutex<OpaqueMap>>) {
        let senders: Vec<SenderContext> = {
            let mut guard = opaque_map.lock().unwrap();
            guard.drain().map(|(_, v)| v).collect()
        };

        for context in senders {
            context
                .sender
                .send(Err(Error::new_cancelled_error(
                    CancellationErrorKind::ClosedInFlight,
                )))
                .await
                .unwrap_or_default();
        }
    }

    async fn on_read_loop_close(
        stream: FramedRead<ReadHalf<Box<dyn Stream>>, KeyValueCodec>,
        opaque_map: Arc<std::sync::Mutex<OpaqueMap>>,
        opts: &mut ReadLoopOptions,
    ) {
        drop(stream);

        Self::drain_opaque_map(opaque_map).await;

        if let Some(tx) = opts.on_read_close_tx.take() {
            if tx.send(()).is_err() {
                debug!("{} read close receiver already gone", opts.client_id);
            }
        }

        debug!("{} read loop shut down", opts.client_id);
    }

    fn decompress_value(packet: &mut ResponsePacket) -> error::Result<()> {
        let value = match &packet.value {
            Some(v) => v,
            None => return Ok(()),
        };

        let mut decoder = SnappyDecoder::new();
        let new_value = decoder
            .decompress_vec(value)
            .map_err(|e| Error::new_decompression_error().with(e))?;

        packet.datatype &= !u8::from(DataTypeFlag::Compressed);
        packet.value = Some(new_value);

        Ok(())
    }

    async fn read_loop(
        mut stream: FramedRead<ReadHalf<Box<dyn Stream>>, KeyValueCodec>,
        opaque_map: Arc<std::sync::Mutex<OpaqueMap>>,
        mut opts: ReadLoopOptions,
    ) {
        loop {
            select! {
                _ = opts.on_close_cancel.cancelled() => {
                    Self::on_read_loop_close(stream, opaque_map, &mut opts).await;
                    return;
                },
                next = stream.next() => {
                    let mut packet = match next {
                        Some(Ok(packet)) => packet,
                        Some(Err(e)) => {
                            warn!("{} failed to read frame {}", opts.client_id, e);
                            Self::on_read_loop_close(stream, opaque_map, &mut opts).await;
                            return;
                        }
                        None => {
                            Self::on_read_loop_close(stream, opaque_map, &mut opts).await;
                            return;
                        }
                    };

                    if packet.magic == Magic::ServerReq {
                        trace!(
                            "Handling server request on {}. Opcode={}",
                            opts.client_id,
                            packet.op_code,
                        );

                        (opts.unsolicited_packet_handler)(packet).await;
                        continue;
                    }

                    trace!(
                        "Resolving response on {}. Opcode={}. Opaque={}. Status={}",
                        opts.client_id,
                        packet.op_code,
                        packet.opaque,
                        packet.status,
                    );

                    let opaque = packet.opaque;
                    let context = {
                        let mut map = opaque_map.lock().unwrap();
                        map.remove(&opaque)
                    };

                    let context = match context {
                        Some(context) => context,
                        None => {
                            if let Some(ref orphan_handler) = opts.orphan_handler {
                                orphan_handler(packet);
                            }
                            continue;
                        }
                    };

                    if !opts.disable_decompression
                        && (packet.datatype & u8::from(DataTypeFlag::Compressed)) != 0
                    {
                        if let Err(e) = Self::decompress_value(&mut packet) {
                            if let Err(e) = context.sender.send(Err(e)).await {
                                debug!("Sending response to caller failed: {e}");
                            }
                            continue;
                        }
                    }

                    if context.is_persistent() {
                        let mut map = opaque_map.lock().unwrap();
                        map.insert(opaque, context.clone());
                    }

                    let resp = ClientResponse::new(packet, context.context.clone());
                    if let Err(e) = context.sender.send(Ok(resp)).await {
                        debug!("Sending response to caller failed: {e}");
                        Self::on_read_loop_close(stream, opaque_map, &mut opts).await;
                        return;
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Dispatcher for Client {
    fn new(conn: ConnectionType, opts: DispatcherOptions) -> Self {
        let local_addr = *conn.local_addr();
        let peer_addr = *conn.peer_addr();

        let (r, w) = tokio::io::split(conn.into_inner());

        let codec = KeyValueCodec::default();
        let reader = FramedRead::new(r, codec);
        let writer = FramedWrite::new(w, codec);

        let cancel_token = CancellationToken::new();
        let cancel_child = cancel_token.child_token();
        let cancel_guard = cancel_token.drop_guard();

        let opaque_map = Arc::new(std::sync::Mutex::new(OpaqueMap::default()));

        let read_opaque_map = Arc::clone(&opaque_map);
        let read_id = opts.id.clone();

        tokio::spawn(async move {
            Client::read_loop(
                reader,
                read_opaque_map,
                ReadLoopOptions {
                    client_id: read_id,
                    unsolicited_packet_handler: opts.unsolicited_packet_handler,
                    orphan_handler: opts.orphan_handler,
                    on_read_close_tx: Some(opts.on_read_close_tx),
                    on_close_cancel: cancel_child,
                    disable_decompression: opts.disable_decompression,
                },
            )
            .await;
        });

        Self {
            current_opaque: AtomicU32::new(1),
            opaque_map,
            client_id: opts.id,

            on_close_cancel: cancel_guard,

            writer: Mutex::new(writer),

            local_addr,
            peer_addr,

            closed: AtomicBool::new(false),
        }
    }

    async fn dispatch<'a>(
        &self,
        mut packet: RequestPacket<'a>,
        response_context: Option<ResponseContext>,
    ) -> error::Result<ClientPendingOp> {
        let is_persistent = response_context
            .as_ref()
            .map(|c| c.is_persistent)
            .unwrap_or_default();

        let (response_tx, response_rx) = mpsc::channel(1);

        let opaque = self.register_handler(SenderContext {
            sender: response_tx,
            context: response_context,
        })?;
        packet.opaque = Some(opaque);
        let op_code = packet.op_code;

        trace!(
            "Writing request on {}. Opcode={}. Opaque={}",
            &self.client_id,
            op_code,
            opaque,
        );

        let mut writer = self.writer.lock().await;
        match writer.send(packet).await {
            Ok(_) => Ok(ClientPendingOp::new(
                opaque,
                self.opaque_map.clone(),
                response_rx,
                is_persistent,
            )),
            Err(e) => {
                debug!(
                    "{} failed to write packet {} {} {}",
                    self.client_id, opaque, op_code, e
                );

                {
                    let mut map = self.opaque_map.lock().unwrap();
                    map.remove(&opaque);
                }

                Err(Error::new_dispatch_error(opaque, op_code, Box::new(e)))
            }
        }
    }

    async fn close(&self) -> error::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("Closing client {}", self.client_id);

        let mut close_err = None;
        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.close().await {
                close_err = Some(e);
            }
        }

        Self::drain_opaque_map(self.opaque_map.clone()).await;

        if let Some(e) = close_err {
            return Err(Error::new_close_error(e.to_string(), Box::new(e)));
        }

        Ok(())
    }
}

impl Client {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        debug!("Dropping client {}", self.client_id);
    }
}

use crate::memd::client::ResponseContext;
use crate::memd::packet::ResponsePacket;

#[derive(Debug)]
pub struct ClientResponse {
    packet: ResponsePacket,
    response_context: Option<ResponseContext>,
}

impl ClientResponse {
    pub fn new(packet: ResponsePacket, response_context: Option<ResponseContext>) -> Self {
        Self {
            packet,
            response_context,
        }
    }

    pub fn packet(&self) -> &ResponsePacket {
        &self.packet
    }

    pub fn response_context(&self) -> Option<&ResponseContext> {
        self.response_context.as_ref()
    }
}

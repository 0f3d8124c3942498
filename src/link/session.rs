//! Request/response coordination over a [`Framer`].
//!
//! A `Session` owns the one connection's link state. It drives a single
//! exchange to `Done` before another may start, sleeping for the poll
//! interval between framer steps.

use log::{debug, warn};

use super::framer::{FrameState, Framer};
use super::telemetry::ExchangeSink;
use super::transport::Transport;
use crate::config::LinkConfig;
use crate::error::{CommError, Result, SchemaError};
use crate::packet::{
    DATA_IDX, MIN_PACK_LEN, MSG_IDX, PACKLEN_IDX, PacketSchema, SENDER_IDX, SchemaRegistry,
    SearchTag, TARGET_IDX,
};

pub struct Session<T: Transport> {
    framer: Framer<T>,
}

impl<T: Transport> Session<T> {
    pub fn new(transport: T, config: LinkConfig) -> Self {
        Self {
            framer: Framer::new(transport, config),
        }
    }

    /// Report every exchange to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn ExchangeSink>) -> Self {
        self.framer.set_sink(Some(sink));
        self
    }

    pub fn framer(&self) -> &Framer<T> {
        &self.framer
    }

    pub fn transport_mut(&mut self) -> &mut T {
        self.framer.transport_mut()
    }

    /// Send `schema` and wait for the reply packet.
    pub fn send(&mut self, schema: &PacketSchema) -> Result<()> {
        self.transmit(schema, true)
    }

    /// Send `schema` to a device that does not answer it.
    pub fn send_without_reply(&mut self, schema: &PacketSchema) -> Result<()> {
        self.transmit(schema, false)
    }

    fn transmit(&mut self, schema: &PacketSchema, expect_response: bool) -> Result<()> {
        if !schema.is_outgoing() {
            warn!("'{}' ({}) is not an outgoing message", schema.name(), schema.search_tag());
            return Err(CommError::InvalidMessage.into());
        }

        self.framer.begin(&schema.full_buffer(), expect_response)?;
        let poll = self.framer.config().poll_interval();
        while self.framer.step()? != FrameState::Done {
            std::thread::sleep(poll);
        }

        match self.framer.last_error() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// The last packet received, checksum included. Empty after a failed
    /// or reply-less exchange.
    pub fn received(&self) -> &[u8] {
        self.framer.link().received()
    }

    /// Resolve the received packet to its schema and load its payload.
    ///
    /// The three-part tag is tried first, then the four-part tag carrying
    /// the received length.
    pub fn handle_response(&mut self, registry: &mut SchemaRegistry) -> Result<SearchTag> {
        let rx = self.framer.link().received();
        if rx.len() < MIN_PACK_LEN {
            warn!("no response packet to handle");
            return Err(CommError::UnknownResponse.into());
        }

        let base = SearchTag::new(rx[TARGET_IDX], rx[SENDER_IDX], rx[MSG_IDX]);
        let extended = base.with_length(rx[PACKLEN_IDX]);
        let tag = if registry.lookup_by_tag(&base).is_some() {
            base
        } else if registry.lookup_by_tag(&extended).is_some() {
            extended
        } else {
            warn!("unknown response {} (0x{})", extended, hex::encode_upper(rx));
            return Err(CommError::UnknownResponse.into());
        };

        let payload = &rx[DATA_IDX..rx.len() - 1];
        let schema = registry
            .lookup_by_tag_mut(&tag)
            .ok_or(SchemaError::NotFound)?;
        if schema.assign_incoming(payload) {
            debug!("response {} decoded as '{}'", tag, schema.name());
        }
        Ok(tag)
    }

    /// Send the schema registered under `tag` and decode its reply.
    pub fn exchange(&mut self, registry: &mut SchemaRegistry, tag: &SearchTag) -> Result<SearchTag> {
        let schema = registry.lookup_by_tag(tag).ok_or(SchemaError::NotFound)?;
        self.send(schema)?;
        self.handle_response(registry)
    }
}

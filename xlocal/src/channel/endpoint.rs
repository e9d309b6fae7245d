//! The file-backing object of one side of a pair.

use std::sync::Arc;

use crate::file::{File, FileOps};
use crate::io::{ReadUio, WriteUio};
use crate::poll::PollEvents;
use crate::Result;

use super::Channel;

/// Backing object of one file in a socket pair.
///
/// Writes go to `send`, reads come from `receive`. The peer endpoint holds
/// the same two channels the other way round. Dropping the endpoint detaches
/// it from both channels, which is how the peer learns about the close.
#[derive(Debug)]
pub struct LocalEndpoint {
    send: Arc<Channel>,
    receive: Arc<Channel>,
}

impl LocalEndpoint {
    /// Pairs an outgoing and an incoming channel; nothing is attached yet.
    pub fn new(send: Arc<Channel>, receive: Arc<Channel>) -> Self {
        Self { send, receive }
    }

    /// Channel this endpoint writes into.
    pub fn send_channel(&self) -> &Arc<Channel> {
        &self.send
    }

    /// Channel this endpoint reads from.
    pub fn receive_channel(&self) -> &Arc<Channel> {
        &self.receive
    }
}

impl FileOps for LocalEndpoint {
    fn init(&self, file: &Arc<File>) -> Result<()> {
        self.send.attach_sender(file);
        self.receive.attach_receiver(file);
        log::debug!("local endpoint attached");
        Ok(())
    }

    fn read(&self, _file: &File, uio: &mut ReadUio<'_>) -> Result<()> {
        self.receive.read(uio);
        Ok(())
    }

    fn write(&self, _file: &File, uio: &mut WriteUio<'_>) -> Result<()> {
        self.send.write(uio).map(|_| ())
    }

    fn poll(&self, _file: &File, events: PollEvents) -> PollEvents {
        let mut revents = PollEvents::empty();
        if events.contains(PollEvents::IN) {
            revents |= self.receive.read_events();
        }
        if events.contains(PollEvents::OUT) {
            revents |= self.send.write_events();
        }
        revents
    }
}

impl Drop for LocalEndpoint {
    fn drop(&mut self) {
        self.send.detach_sender();
        self.receive.detach_receiver();
    }
}

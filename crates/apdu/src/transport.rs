//! Card transport abstraction.

use std::fmt;

use bytes::Bytes;
use thiserror::Error;
use tracing::trace;

use crate::{Command, Error, Response};

/// Errors raised by a card transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// No card is present or the connection was lost.
    #[error("not connected to a card")]
    NotConnected,

    /// The reader returned fewer bytes than a status word.
    #[error("reader returned a response shorter than a status word")]
    ResponseTooShort,

    /// A device or driver level failure.
    #[error("device error: {0}")]
    Device(String),
}

/// A connection to a smart card.
///
/// Implementations move raw bytes; framing and status-word interpretation
/// live above this trait.
pub trait CardTransport: fmt::Debug + Send {
    /// Send a raw command APDU and return the raw response.
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Whether a card is currently connected.
    fn is_connected(&self) -> bool;

    /// Reset the connection to the card.
    fn reset(&mut self) -> Result<(), TransportError>;

    /// Send a [`Command`] and parse the reply into a [`Response`].
    fn transmit(&mut self, command: &Command) -> Result<Response, Error> {
        let raw = command.to_bytes()?;
        trace!(command = %hex::encode(&raw), "transmit");
        let reply = self.transmit_raw(&raw)?;
        trace!(response = %hex::encode(&reply), "received");
        Response::from_bytes(&reply)
    }
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        (**self).transmit_raw(command)
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        (**self).reset()
    }
}

/// Responder callback for simulated cards.
pub type MockResponder = Box<dyn FnMut(&[u8]) -> Bytes + Send>;

/// Scripted transport for tests.
///
/// Responses are consumed in FIFO order and every transmitted command is
/// recorded, making APDU construction observable to test suites. When the
/// script runs dry an optional responder callback — typically a card
/// simulator — takes over.
pub struct MockTransport {
    responses: std::collections::VecDeque<Bytes>,
    responder: Option<MockResponder>,
    transmitted: Vec<Bytes>,
    connected: bool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockTransport")
            .field("scripted", &self.responses.len())
            .field("has_responder", &self.responder.is_some())
            .field("transmitted", &self.transmitted.len())
            .field("connected", &self.connected)
            .finish()
    }
}

impl MockTransport {
    /// Create an empty mock. Transmitting without a scripted response
    /// fails with [`TransportError::NotConnected`].
    pub fn new() -> Self {
        Self {
            responses: Default::default(),
            responder: None,
            transmitted: Vec::new(),
            connected: true,
        }
    }

    /// Create a mock answering through a responder callback.
    pub fn with_responder(responder: impl FnMut(&[u8]) -> Bytes + Send + 'static) -> Self {
        let mut mock = Self::new();
        mock.responder = Some(Box::new(responder));
        mock
    }

    /// Create a mock preloaded with responses, consumed in order.
    pub fn with_responses<I, B>(responses: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        let mut mock = Self::new();
        for response in responses {
            mock.push_response(response);
        }
        mock
    }

    /// Queue one more scripted response.
    pub fn push_response<B: Into<Bytes>>(&mut self, response: B) {
        self.responses.push_back(response.into());
    }

    /// Every command transmitted so far, in order.
    pub fn transmitted(&self) -> &[Bytes] {
        &self.transmitted
    }

    /// The most recently transmitted command.
    pub fn last_transmitted(&self) -> Option<&Bytes> {
        self.transmitted.last()
    }

    /// Simulate card removal: subsequent transmits fail.
    pub fn disconnect(&mut self) {
        self.connected = false;
    }
}

impl CardTransport for MockTransport {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.transmitted.push(Bytes::copy_from_slice(command));

        if let Some(response) = self.responses.pop_front() {
            return Ok(response);
        }
        match &mut self.responder {
            Some(responder) => Ok(responder(command)),
            None => Err(TransportError::NotConnected),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }
}

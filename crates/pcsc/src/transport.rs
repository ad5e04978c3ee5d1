//! PC/SC transport implementation.

use std::{ffi::CString, fmt};

use bytes::Bytes;
use cairn_apdu::{CardTransport, TransportError};
use pcsc::{Card, Context, Disposition};
use tracing::{debug, warn};

use crate::{config::PcscConfig, error::PcscError};

/// Maximum short-APDU response: 256 data bytes plus the status word.
const RESPONSE_BUFFER_LEN: usize = 258;

/// Transport implementation backed by a PC/SC reader.
pub struct PcscTransport {
    context: Context,
    card: Option<Card>,
    reader_name: String,
    config: PcscConfig,
}

impl fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscTransport")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl PcscTransport {
    pub(crate) fn new(
        context: Context,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<Self, PcscError> {
        let mut transport = Self {
            context,
            card: None,
            reader_name: reader_name.to_string(),
            config,
        };

        // Connect eagerly; a missing card is reported on first transmit.
        let _ = transport.connect_card();

        Ok(transport)
    }

    fn connect_card(&mut self) -> Result<(), PcscError> {
        if self.card.is_some() {
            return Ok(());
        }

        let reader_cstr = CString::new(self.reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(self.reader_name.clone()))?;

        match self.context.connect(
            &reader_cstr,
            self.config.share_mode.into(),
            self.config.protocols,
        ) {
            Ok(card) => {
                debug!(reader = %self.reader_name, "connected to card");
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard) => Err(PcscError::NoCard(self.reader_name.clone())),
            Err(e) => Err(e.into()),
        }
    }

    /// ATR of the currently connected card.
    pub fn atr(&self) -> Result<Vec<u8>, PcscError> {
        self.card.as_ref().map_or_else(
            || Err(PcscError::NoCard(self.reader_name.clone())),
            |card| {
                card.get_attribute_owned(pcsc::Attribute::AtrString)
                    .map_err(Into::into)
            },
        )
    }

    /// Name of the reader this transport is bound to.
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }

    /// Disconnect from the card, leaving it powered. Idempotent.
    pub fn close(&mut self) {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::LeaveCard);
        }
    }

    fn transmit_command(&mut self, command: &[u8]) -> Result<Bytes, PcscError> {
        self.connect_card()?;

        let card = self
            .card
            .as_mut()
            .ok_or_else(|| PcscError::NoCard(self.reader_name.clone()))?;

        let mut response_buffer = [0u8; RESPONSE_BUFFER_LEN];
        match card.transmit(command, &mut response_buffer) {
            Ok(response) => Ok(Bytes::copy_from_slice(response)),
            Err(e) => {
                if matches!(e, pcsc::Error::ResetCard | pcsc::Error::RemovedCard) {
                    warn!(reader = %self.reader_name, error = %e, "card connection lost");
                    self.card = None;

                    if self.config.auto_reconnect && e == pcsc::Error::ResetCard {
                        if self.connect_card().is_ok() {
                            return self.transmit_command(command);
                        }
                    }
                }

                Err(e.into())
            }
        }
    }
}

impl CardTransport for PcscTransport {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.transmit_command(command).map_err(TransportError::from)
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    fn reset(&mut self) -> Result<(), TransportError> {
        if let Some(card) = self.card.take() {
            let _ = card.disconnect(Disposition::ResetCard);
        }
        self.connect_card().map_err(Into::into)
    }
}

impl Drop for PcscTransport {
    fn drop(&mut self) {
        self.close();
    }
}

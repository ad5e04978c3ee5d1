//! PC/SC context management and reader enumeration.

use pcsc::{Context, Scope};

use crate::config::PcscConfig;
use crate::error::PcscError;
use crate::transport::PcscTransport;

/// Entry point for PC/SC operations.
///
/// Owns the PC/SC context; transports opened through it share the context.
pub struct PcscManager {
    context: Context,
}

impl std::fmt::Debug for PcscManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscManager").finish_non_exhaustive()
    }
}

impl PcscManager {
    /// Establish a user-scoped PC/SC context.
    pub fn new() -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context })
    }

    /// List the names of all attached readers.
    pub fn list_readers(&self) -> Result<Vec<String>, PcscError> {
        let readers = self.context.list_readers_owned()?;
        if readers.is_empty() {
            return Err(PcscError::NoReadersAvailable);
        }

        Ok(readers
            .into_iter()
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    /// Open a connection to the named reader with default configuration.
    pub fn open_reader(&self, reader_name: &str) -> Result<PcscTransport, PcscError> {
        self.open_reader_with_config(reader_name, PcscConfig::default())
    }

    /// Open a connection to the named reader.
    pub fn open_reader_with_config(
        &self,
        reader_name: &str,
        config: PcscConfig,
    ) -> Result<PcscTransport, PcscError> {
        let known = self.list_readers()?;
        if !known.iter().any(|name| name == reader_name) {
            return Err(PcscError::ReaderNotFound(reader_name.to_string()));
        }

        PcscTransport::new(self.context.clone(), reader_name, config)
    }
}

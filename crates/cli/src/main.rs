//! Demo CLI for the cairn-keycard library.
//!
//! Exercises the protocol stack end to end against a real reader. This
//! binary is a usage example, not a wallet: pairing records are printed
//! for the user to keep, not stored.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cairn_keycard::{Keycard, KeyPath, PairingInfo, Secrets};
use cairn_pcsc::{PcscManager, PcscTransport};

#[derive(Parser)]
#[command(name = "cairn-keycard", about = "Status Keycard command line client")]
struct Cli {
    /// Reader name; defaults to the first available reader
    #[arg(long, global = true)]
    reader: Option<String>,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// List attached smart card readers
    Readers,
    /// Select the applet and print its application info
    Info,
    /// Initialize the card with PIN, PUK and pairing password
    Init {
        #[arg(long)]
        pin: Option<String>,
        #[arg(long)]
        puk: Option<String>,
        #[arg(long)]
        pairing_password: Option<String>,
    },
    /// Pair with the card and print the pairing record
    Pair {
        #[arg(long)]
        pairing_password: String,
    },
    /// Show PIN/PUK retry counters and key status
    Status {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Generate a master key on the card
    GenerateKey {
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Sign a 32-byte hash
    Sign {
        /// Hash to sign, 64 hex characters
        hash: String,
        /// Derivation path, e.g. m/44'/60'/0'/0/0
        #[arg(long)]
        path: Option<String>,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Remove a pairing slot
    Unpair {
        slot: u8,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Reset the card to factory state
    FactoryReset,
}

/// Credentials for commands that need an authenticated secure channel.
#[derive(clap::Args)]
struct SessionArgs {
    /// Pairing slot index from a previous `pair`
    #[arg(long)]
    index: u8,
    /// Pairing key from a previous `pair`, 64 hex characters
    #[arg(long)]
    pairing_key: String,
    /// User PIN
    #[arg(long)]
    pin: String,
}

impl SessionArgs {
    fn pairing_info(&self) -> Result<PairingInfo> {
        let key: [u8; 32] = hex::decode(&self.pairing_key)
            .ok()
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| anyhow!("pairing key must be 64 hex characters"))?;

        // The salt is only needed to re-derive the key; a zero salt is
        // fine when the key itself is supplied.
        Ok(PairingInfo {
            key,
            index: self.index,
            salt: [0u8; 32],
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let CliCommand::Readers = cli.command {
        for name in PcscManager::new()?.list_readers()? {
            println!("{name}");
        }
        return Ok(());
    }

    let transport = connect(cli.reader.as_deref())?;
    let mut keycard = Keycard::new(transport);
    let info = keycard.select().context("selecting the Keycard applet")?;

    match cli.command {
        CliCommand::Readers => unreachable!("handled above"),
        CliCommand::Info => println!("{info}"),
        CliCommand::Init {
            pin,
            puk,
            pairing_password,
        } => {
            let secrets = match (pin, puk, pairing_password) {
                (Some(pin), Some(puk), Some(pass)) => Secrets::new(&pin, &puk, &pass)?,
                (None, None, None) => Secrets::generate(),
                _ => bail!("provide all of --pin, --puk and --pairing-password, or none"),
            };

            keycard.init_with_secrets(&secrets)?;
            println!("Card initialized.");
            println!("  PIN:              {}", secrets.pin());
            println!("  PUK:              {}", secrets.puk());
            println!("  Pairing password: {}", secrets.pairing_pass());
        }
        CliCommand::Pair { pairing_password } => {
            let pairing = keycard.pair(&pairing_password)?;
            println!("Paired. Keep these to reuse the pairing:");
            println!("  Index: {}", pairing.index);
            println!("  Key:   {}", hex::encode(pairing.key));
            println!("  Salt:  {}", hex::encode(pairing.salt));
        }
        CliCommand::Status { session } => {
            open_session(&mut keycard, &session)?;
            println!("{}", keycard.get_status()?);
            println!("Current path: {}", keycard.get_key_path()?);
        }
        CliCommand::GenerateKey { session } => {
            open_session(&mut keycard, &session)?;
            let key_uid = keycard.generate_key()?;
            println!("Key UID: {}", hex::encode(key_uid));
        }
        CliCommand::Sign {
            hash,
            path,
            session,
        } => {
            let hash = hex::decode(&hash).context("hash must be hex")?;
            let path = match path {
                Some(path) => path.parse::<KeyPath>()?,
                None => KeyPath::current(),
            };

            open_session(&mut keycard, &session)?;
            let signature = keycard.sign(&hash, &path, None)?;
            println!("r: {}", hex::encode(signature.r));
            println!("s: {}", hex::encode(signature.s));
            if let Some(recovery_id) = signature.recovery_id {
                println!("recovery id: {recovery_id}");
            }
        }
        CliCommand::Unpair { slot, session } => {
            open_session(&mut keycard, &session)?;
            keycard.unpair(slot)?;
            println!("Slot {slot} unpaired.");
        }
        CliCommand::FactoryReset => {
            keycard.factory_reset()?;
            println!("Card reset to factory state.");
        }
    }

    Ok(())
}

fn connect(reader: Option<&str>) -> Result<PcscTransport> {
    let manager = PcscManager::new().context("establishing PC/SC context")?;

    let name = match reader {
        Some(name) => name.to_string(),
        None => manager
            .list_readers()?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no smart card readers found"))?,
    };

    tracing::debug!(reader = %name, "connecting");
    Ok(manager.open_reader(&name)?)
}

fn open_session<T: cairn_apdu::CardTransport>(
    keycard: &mut Keycard<T>,
    session: &SessionArgs,
) -> Result<()> {
    keycard.set_pairing_info(session.pairing_info()?);
    keycard.open_secure_channel()?;
    keycard.verify_pin(&session.pin)?;
    Ok(())
}

//! Select the Keycard applet on the first reader and print its info.

use cairn_keycard::Keycard;
use cairn_pcsc::PcscManager;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manager = PcscManager::new()?;
    let reader = manager
        .list_readers()?
        .into_iter()
        .next()
        .ok_or("no readers attached")?;

    let transport = manager.open_reader(&reader)?;
    let mut keycard = Keycard::new(transport);

    let info = keycard.select()?;
    println!("{info}");

    Ok(())
}

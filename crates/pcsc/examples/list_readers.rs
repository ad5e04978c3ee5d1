//! List attached PC/SC readers.

use cairn_pcsc::PcscManager;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manager = PcscManager::new()?;

    for (i, name) in manager.list_readers()?.iter().enumerate() {
        println!("{i}: {name}");
    }

    Ok(())
}

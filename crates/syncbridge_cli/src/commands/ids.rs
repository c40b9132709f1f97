//! Record id conversion commands.

use syncbridge_codec::{base64_to_uuid4, uuid4_to_base64};

/// Prints the client UUID of a sync record id.
pub fn to_uuid(sync_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", base64_to_uuid4(sync_id.trim())?);
    Ok(())
}

/// Prints the sync record id of a client UUID.
pub fn to_sync_id(uuid: &str) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", uuid4_to_base64(uuid.trim())?);
    Ok(())
}

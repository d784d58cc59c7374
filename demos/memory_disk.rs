//! SCSI target example with in-memory storage
//!
//! Plays the part of a USB mass storage host: enumerates the target,
//! writes a block, reads it back and finishes with an unsupported
//! command followed by REQUEST SENSE.

use scsi_target::{
    CommandStatus, MemoryBlockDevice, MemoryTransport, ScsiTarget, ScsiTargetConfig,
};

fn rw10(opcode: u8, lba: u32, blocks: u16) -> [u8; 10] {
    let mut cdb = [0u8; 10];
    cdb[0] = opcode;
    cdb[2..6].copy_from_slice(&lba.to_be_bytes());
    cdb[7..9].copy_from_slice(&blocks.to_be_bytes());
    cdb
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::init();

    // 1 MB in-memory storage with 512-byte blocks
    let storage = MemoryBlockDevice::new(2048, 512);

    let config = ScsiTargetConfig::builder()
        .vendor_id("ACME")
        .product_id("Memory Disk")
        .product_rev("0.1")
        .build(storage, MemoryTransport::new())?;

    let mut target = ScsiTarget::new();
    target.start(config);

    let block = [0x42u8; 512];
    let commands: Vec<(&str, Vec<u8>)> = vec![
        ("INQUIRY", vec![0x12, 0, 0, 0, 36, 0]),
        ("TEST UNIT READY", vec![0x00, 0, 0, 0, 0, 0]),
        ("READ CAPACITY (10)", vec![0x25, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        ("MODE SENSE (6)", vec![0x1A, 0, 0x3F, 0, 4, 0]),
        ("WRITE (10)", rw10(0x2A, 7, 1).to_vec()),
        ("READ (10)", rw10(0x28, 7, 1).to_vec()),
        ("SYNCHRONIZE CACHE (10)", vec![0x35, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
        ("REQUEST SENSE", vec![0x03, 0, 0, 0, 18, 0]),
    ];

    for (name, cdb) in commands {
        if cdb[0] == 0x2A {
            if let Some(config) = target.config_mut() {
                config.transport.push_incoming(&block);
            }
        }

        let status = target.dispatch(&cdb)?;
        let reply = target
            .config_mut()
            .map(|config| config.transport.take_sent())
            .unwrap_or_default();

        match status {
            CommandStatus::Passed => println!("{:<24} passed, {} bytes", name, reply.len()),
            CommandStatus::Failed => {
                let sense = target.sense();
                println!(
                    "{:<24} failed: key={:#04x} asc={:#04x} ascq={:#04x}",
                    name,
                    sense.sense_key(),
                    sense.asc(),
                    sense.ascq()
                );
            }
        }
        if !reply.is_empty() && reply.len() <= 36 {
            println!("    {}", hex::encode(&reply));
        }
    }

    if let Some(config) = target.stop() {
        let data = config.device.data();
        println!(
            "\nBlock 7 after write: {}",
            if data[7 * 512..8 * 512] == block[..] { "matches" } else { "differs" }
        );
    }

    Ok(())
}

pub mod i2c;
pub mod sim;

/// Largest SMBus block transfer, in bytes.
pub const MAX_BLOCK_LEN: usize = 32;

pub trait Bus {
    fn write_block(&mut self, address: u16, register: u8, data: &[u8]) -> std::io::Result<()>;
    fn read_block(&mut self, address: u16, register: u8, len: usize) -> std::io::Result<Vec<u8>>;
}

pub(crate) fn check_block_len(len: usize) -> std::io::Result<()> {
    if len > MAX_BLOCK_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("block transfer of {len} bytes exceeds {MAX_BLOCK_LEN}"),
        ));
    }
    Ok(())
}

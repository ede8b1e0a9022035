//! In-memory image of a single block, plus the fixed-width codec used
//! for the raw integer fields the packed records don't cover (chain
//! successor pointers and free-list slots). All integers in the image
//! are little-endian.

/// One block's worth of bytes. The unit of exchange between the device
/// and every higher layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualBlock {
    data: Vec<u8>,
}

impl VirtualBlock {
    pub fn new(block_size: usize) -> Self {
        Self {
            data: vec![0; block_size],
        }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Usable payload bytes: everything but the trailing successor field.
    pub fn payload_len(&self) -> usize {
        self.data.len() - 4
    }

    pub fn get_u32(&self, offset: usize) -> u32 {
        let mut buf = [0; 4];
        buf.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(buf)
    }

    pub fn put_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// The successor block number stored in the block's last 4 bytes.
    /// Zero terminates a chain.
    pub fn next_block(&self) -> u32 {
        self.get_u32(self.data.len() - 4)
    }

    pub fn set_next_block(&mut self, block: u32) {
        let offset = self.data.len() - 4;
        self.put_u32(offset, block);
    }

    pub fn write_bytes(&mut self, offset: usize, bytes: &[u8]) {
        self.data[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn zero(&mut self) {
        self.data.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_round_trip_is_little_endian() {
        let mut block = VirtualBlock::new(32);
        block.put_u32(4, 0x0403_0201);
        assert_eq!(&block.as_slice()[4..8], &[1, 2, 3, 4]);
        assert_eq!(block.get_u32(4), 0x0403_0201);
    }

    #[test]
    fn next_block_lives_in_last_four_bytes() {
        let mut block = VirtualBlock::new(64);
        block.set_next_block(7);
        assert_eq!(block.get_u32(60), 7);
        assert_eq!(block.next_block(), 7);
        assert_eq!(block.payload_len(), 60);
    }

    #[test]
    fn zero_clears_everything() {
        let mut block = VirtualBlock::from_slice(&[0xff; 32]);
        block.zero();
        assert!(block.as_slice().iter().all(|&b| b == 0));
    }
}

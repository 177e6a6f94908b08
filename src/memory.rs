use crate::error::BytePusherError;
use std::io::{self, Read};

// NB. addresses are u32 holding 24 significant bits; every computed address
//     goes through wrap_address() so nothing can index past the top of RAM

/// how much RAM we have: one byte for every 3-byte address
pub const MEMORY_SIZE: usize = 1 << 24;

/// the top of the 24-bit address space
pub const ADDRESS_MASK: u32 = 0x00ff_ffff;

/// bring any computed address back into the address space
#[inline]
pub fn wrap_address(addr: u32) -> u32 {
    addr & ADDRESS_MASK
}

/// Represents the flat, self-modifying memory image
pub trait MemoryMap {
    /// get one byte; the address is wrapped first
    fn read_byte(&self, addr: u32) -> u8;

    /// set one byte; the address is wrapped first
    fn write_byte(&mut self, addr: u32, value: u8);

    /// zero everything, then place `rom` at address 0. nothing changes if the
    /// rom doesn't fit
    fn load(&mut self, rom: &[u8]) -> Result<(), BytePusherError>;

    /// copy one byte from `src` to `dst`: the machine's only instruction
    fn copy_byte(&mut self, src: u32, dst: u32) {
        let value = self.read_byte(src);
        self.write_byte(dst, value);
    }

    /// read 1 to 4 bytes big-endian, wrapping at the top of memory
    fn read_be(&self, addr: u32, len: usize) -> u32 {
        debug_assert!(len <= 4, "read_be is limited to 4 bytes");
        (0..len as u32).fold(0, |acc, i| {
            (acc << 8) | self.read_byte(addr.wrapping_add(i)) as u32
        })
    }

    /// write the low `len` bytes of `value` big-endian, wrapping at the top
    fn write_be(&mut self, addr: u32, len: usize, value: u32) {
        debug_assert!(len <= 4, "write_be is limited to 4 bytes");
        for i in 0..len {
            let shift = 8 * (len - 1 - i);
            self.write_byte(addr.wrapping_add(i as u32), (value >> shift) as u8);
        }
    }

    /// get an owned copy of `len` bytes from `addr`, wrapping at the top
    fn copy_range(&self, addr: u32, len: usize) -> Vec<u8> {
        (0..len as u32)
            .map(|i| self.read_byte(addr.wrapping_add(i)))
            .collect()
    }

    /// load unknown len of data from a reader
    fn load_program(&mut self, reader: &mut impl io::Read) -> Result<(), BytePusherError>
    where
        Self: Sized,
    {
        let mut buf = Vec::new();
        // one byte over the limit is enough to know it won't fit
        reader
            .take(MEMORY_SIZE as u64 + 1)
            .read_to_end(&mut buf)?;
        self.load(&buf)
    }
}

/// The whole 16MiB address space, allocated once
pub struct BytePusherMemory {
    bytes: Box<[u8]>,
}

impl BytePusherMemory {
    /// zeroed memory; a zeroed machine just copies 0 to 0 forever
    pub fn new() -> Self {
        // NB. heap-allocated directly; 16MiB would blow the stack as an array
        BytePusherMemory {
            bytes: vec![0u8; MEMORY_SIZE].into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for BytePusherMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMap for BytePusherMemory {
    #[inline]
    fn read_byte(&self, addr: u32) -> u8 {
        self.bytes[wrap_address(addr) as usize]
    }

    #[inline]
    fn write_byte(&mut self, addr: u32, value: u8) {
        self.bytes[wrap_address(addr) as usize] = value;
    }

    fn load(&mut self, rom: &[u8]) -> Result<(), BytePusherError> {
        if rom.len() > MEMORY_SIZE {
            return Err(BytePusherError::RomTooLarge {
                len: rom.len(),
                max: MEMORY_SIZE,
            });
        }
        self.bytes.fill(0);
        self.bytes[..rom.len()].copy_from_slice(rom);
        Ok(())
    }

    fn copy_range(&self, addr: u32, len: usize) -> Vec<u8> {
        let start = wrap_address(addr) as usize;
        if start + len <= MEMORY_SIZE {
            return self.bytes[start..start + len].to_vec();
        }
        let mut out = Vec::with_capacity(len);
        out.extend_from_slice(&self.bytes[start..]);
        while out.len() < len {
            let take = (len - out.len()).min(MEMORY_SIZE);
            out.extend_from_slice(&self.bytes[..take]);
        }
        out
    }
}

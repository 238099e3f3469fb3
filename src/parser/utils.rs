/*!
Provides IO utility functions for reading bytes of different lengths and converting to corresponding structs.
*/
use std::net::{Ipv4Addr, Ipv6Addr};

use bytes::{Buf, Bytes};

use crate::error::ParserError;

impl ReadUtils for Bytes {}

// Allow checked big-endian reads from byte buffers
pub trait ReadUtils: Buf {
    #[inline]
    fn has_n_remaining(&self, n: usize) -> Result<(), ParserError> {
        if self.remaining() < n {
            Err(ParserError::TruncatedData {
                needed: n,
                available: self.remaining(),
            })
        } else {
            Ok(())
        }
    }

    #[inline]
    fn read_u8(&mut self) -> Result<u8, ParserError> {
        self.has_n_remaining(1)?;
        Ok(self.get_u8())
    }

    #[inline]
    fn read_u16(&mut self) -> Result<u16, ParserError> {
        self.has_n_remaining(2)?;
        Ok(self.get_u16())
    }

    #[inline]
    fn read_u32(&mut self) -> Result<u32, ParserError> {
        self.has_n_remaining(4)?;
        Ok(self.get_u32())
    }

    #[inline]
    fn read_u64(&mut self) -> Result<u64, ParserError> {
        self.has_n_remaining(8)?;
        Ok(self.get_u64())
    }

    fn read_ipv4_address(&mut self) -> Result<Ipv4Addr, ParserError> {
        let addr = self.read_u32()?;
        Ok(Ipv4Addr::from(addr))
    }

    fn read_ipv6_address(&mut self) -> Result<Ipv6Addr, ParserError> {
        self.has_n_remaining(16)?;
        let buf = self.get_u128();
        Ok(Ipv6Addr::from(buf))
    }

    fn read_n_bytes(&mut self, n_bytes: usize) -> Result<Bytes, ParserError> {
        self.has_n_remaining(n_bytes)?;
        Ok(self.copy_to_bytes(n_bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_integers() {
        let mut data = Bytes::from_static(&[0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03]);
        assert_eq!(data.read_u8().unwrap(), 1);
        assert_eq!(data.read_u16().unwrap(), 2);
        assert_eq!(data.read_u32().unwrap(), 3);
        assert!(matches!(
            data.read_u64(),
            Err(ParserError::TruncatedData {
                needed: 8,
                available: 0
            })
        ));
    }

    #[test]
    fn test_read_addresses() {
        let mut data = Bytes::from_static(&[203, 0, 113, 0]);
        assert_eq!(
            data.read_ipv4_address().unwrap(),
            Ipv4Addr::new(203, 0, 113, 0)
        );

        let mut data = Bytes::from_static(&[
            0x20, 0x01, 0x0d, 0xb8, 0x0b, 0xad, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]);
        assert_eq!(
            data.read_ipv6_address().unwrap(),
            "2001:db8:bad::".parse::<Ipv6Addr>().unwrap()
        );

        let mut short = Bytes::from_static(&[1, 2, 3]);
        assert!(short.read_ipv4_address().is_err());
    }

    #[test]
    fn test_read_n_bytes() {
        let mut data = Bytes::from_static(&[1, 2, 3, 4, 5]);
        assert_eq!(data.read_n_bytes(3).unwrap(), Bytes::from_static(&[1, 2, 3]));
        assert!(matches!(
            data.read_n_bytes(3),
            Err(ParserError::TruncatedData {
                needed: 3,
                available: 2
            })
        ));
    }
}

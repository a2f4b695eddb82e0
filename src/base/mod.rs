//! Base integer codecs for ELF object file structures
//!
//! Every multi-byte field of an ELF64 little-endian object is one of the
//! fixed-width integers below. The record types in [`crate::header`],
//! [`crate::symbol`], and [`crate::relocation`] are built on top of these
//! codecs.

use std::{
    io::{Read, Seek, Write},
    mem::size_of,
};

use crate::{error::Error, FromReader, HasWrittenSize, ToWriter};

/// Raw representation of a byte in an ELF file
pub type RawElfByte = u8;
/// Raw representation of a half-word in an ELF class 64 file
pub type RawElfHalfWord = u16;
/// Raw representation of a word in an ELF class 64 file
pub type RawElfWord = u32;
/// Raw representation of an extended word in an ELF class 64 file
pub type RawElfExtendedWord = u64;
/// Raw representation of a signed extended word in an ELF class 64 file
pub type RawElfSignedExtendedWord = i64;

macro_rules! little_endian_codec {
    ($($ty:ty),*) => {
        $(
            impl<R> FromReader<R> for $ty
            where
                R: Read + Seek,
            {
                type Error = Error;

                fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
                    let mut buf = [0; size_of::<$ty>()];
                    reader
                        .read_exact(&mut buf)
                        .map_err(|e| Error::Io { kind: e.kind() })?;
                    Ok(<$ty>::from_le_bytes(buf))
                }
            }

            impl<W> ToWriter<W> for $ty
            where
                W: Write,
            {
                type Error = Error;

                fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
                    writer
                        .write_all(&self.to_le_bytes())
                        .map_err(|e| Error::Io { kind: e.kind() })?;
                    Ok(())
                }
            }

            impl HasWrittenSize for $ty {
                const SIZE: usize = size_of::<$ty>();
            }
        )*
    };
}

little_endian_codec!(
    RawElfByte,
    RawElfHalfWord,
    RawElfWord,
    RawElfExtendedWord,
    RawElfSignedExtendedWord
);

/// Read the NUL-terminated string beginning at `offset` in `data`. Returns
/// an empty string when the offset is out of bounds or the data contains no
/// terminator, matching the degenerate string table entries found in
/// stripped objects.
pub fn read_string(data: &[u8], offset: usize) -> String {
    data.get(offset..)
        .and_then(|tail| tail.split(|&b| b == 0).next())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

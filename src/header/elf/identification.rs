//! Implementation of the `ident` field of the ELF header. This field is
//! located at the beginning of an ELF object file and specifies how the
//! rest of the file is to be decoded.

use std::{
    io::{Read, Seek, Write},
    mem::size_of,
};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use typed_builder::TypedBuilder;

use crate::{error::Error, FromReader, HasWrittenSize, ToWriter};

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The file's class/capacity, i.e. whether it is 32-bit or 64-bit.
///
/// Class ELFCLASS32 files use objects that occupy 1, 2, and 4 bytes. Class
/// ELFCLASS64 files use objects that occupy 1, 2, 4, and 8 bytes. Only
/// ELFCLASS64 inputs are accepted by the linker.
pub enum ElfClass {
    /// Unspecified class
    None = 0,
    /// 32-bit
    Elf32 = 1,
    /// 64-bit
    #[default]
    Elf64 = 2,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The file's data encoding, i.e. whether it is little-endian or big-endian.
///
/// Encoding ELFDATA2LSB specifies 2's complement values with the least
/// significant byte occupying the lowest address. Only ELFDATA2LSB inputs
/// are accepted by the linker.
pub enum ElfDataEncoding {
    /// Unspecified data encoding
    None = 0,
    /// Little-endian
    #[default]
    LittleEndian = 1,
    /// Big-endian
    BigEndian = 2,
}

/// The expected value of the `version` identification byte
pub const ELF_VERSION_CURRENT: u8 = 1;

/// The OS ABI identification byte for System V, the only ABI the linker
/// emits
pub const ELF_OS_ABI_SYSV: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
/// The 16-byte identification block at the beginning of every ELF object
/// file
pub struct ElfHeaderIdentifier {
    #[builder(default)]
    /// The file's class
    pub class: ElfClass,
    #[builder(default)]
    /// The file's data encoding
    pub data_encoding: ElfDataEncoding,
    #[builder(default = ELF_VERSION_CURRENT)]
    /// The ELF header version number
    pub version: u8,
    #[builder(default = ELF_OS_ABI_SYSV)]
    /// Operating system and ABI identification
    pub os_abi: u8,
    #[builder(default)]
    /// The version of the ABI identified by `os_abi`
    pub abi_version: u8,
}

impl ElfHeaderIdentifier {
    /// The four magic bytes every ELF object file begins with
    pub const MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];
}

impl<R> FromReader<R> for ElfHeaderIdentifier
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        let mut ident = [0; Self::SIZE];
        reader
            .read_exact(&mut ident)
            .map_err(|e| Error::Io { kind: e.kind() })?;

        if ident[0..4] != Self::MAGIC {
            return Err(Error::InvalidMagic);
        }

        Ok(Self {
            class: ElfClass::from_u8(ident[4]).ok_or(Error::UnsupportedClass { class: ident[4] })?,
            data_encoding: ElfDataEncoding::from_u8(ident[5])
                .ok_or(Error::UnsupportedData { encoding: ident[5] })?,
            version: ident[6],
            os_abi: ident[7],
            abi_version: ident[8],
        })
    }
}

impl<W> ToWriter<W> for ElfHeaderIdentifier
where
    W: Write,
{
    type Error = Error;

    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        let mut ident = [0; Self::SIZE];
        ident[0..4].copy_from_slice(&Self::MAGIC);
        ident[4] = self.class as u8;
        ident[5] = self.data_encoding as u8;
        ident[6] = self.version;
        ident[7] = self.os_abi;
        ident[8] = self.abi_version;
        writer
            .write_all(&ident)
            .map_err(|e| Error::Io { kind: e.kind() })?;
        Ok(())
    }
}

impl HasWrittenSize for ElfHeaderIdentifier {
    const SIZE: usize = 16 * size_of::<u8>();
}

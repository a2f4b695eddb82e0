//! Implementation of the ELF header. This header is located at the
//! beginning of the ELF object file and is the only header type in the ELF
//! specification which must be located at a specific offset (0) in the
//! file.

use std::io::{Read, Seek, Write};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use typed_builder::TypedBuilder;

use crate::{error::Error, FromReader, HasWrittenSize, ToWriter};

use self::identification::ElfHeaderIdentifier;

pub mod identification;

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The ELF object type
///
/// The OS-specific range of types is [0xfe00, 0xfeff] and the
/// processor-specific range of types is [0xff00, 0xffff]; neither range is
/// meaningful to a static link, so values in them are rejected along with
/// any other unknown value.
pub enum ElfType {
    /// No file type
    None = 0,
    /// Relocatable file type
    Relocatable = 1,
    /// Executable file type
    Executable = 2,
    /// Shared object file type
    Dynamic = 3,
    /// Core file
    Core = 4,
}

impl<R> FromReader<R> for ElfType
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        let value = u16::from_reader(reader)?;
        Self::from_u16(value).ok_or(Error::UnsupportedType { value })
    }
}

impl<W> ToWriter<W> for ElfType
where
    W: Write,
{
    type Error = Error;

    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        (*self as u16).to_writer(writer)
    }
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The ELF object's machine
///
/// The full registry assigns well over two hundred values; only the
/// machines a linker for x86-64 can plausibly be handed are named here, so
/// rejection messages stay readable. Anything else fails decoding with the
/// raw value.
pub enum ElfMachine {
    /// No machine
    None = 0,
    /// Intel 80386
    I386 = 3,
    /// 64-bit PowerPC
    Ppc64 = 21,
    /// IBM System/390 Processor
    S390 = 22,
    /// ARM 32-bit architecture (AARCH32)
    Arm = 40,
    /// AMD x86-64 architecture
    X86_64 = 62,
    /// ARM 64-bit architecture (AARCH64)
    Aarch64 = 183,
    /// RISC-V
    RiscV = 243,
}

impl<R> FromReader<R> for ElfMachine
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        let machine = u16::from_reader(reader)?;
        Self::from_u16(machine).ok_or(Error::UnsupportedMachine { machine })
    }
}

impl<W> ToWriter<W> for ElfMachine
where
    W: Write,
{
    type Error = Error;

    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        (*self as u16).to_writer(writer)
    }
}

/// The expected value of the ELF header `version` field
pub const ELF_VERSION_CURRENT: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
/// The 64-byte ELF header record
pub struct ElfHeader {
    #[builder(default = ElfHeaderIdentifier::builder().build())]
    /// The identification block describing how to decode the file
    pub identifier: ElfHeaderIdentifier,
    /// The object file type
    pub r#type: ElfType,
    #[builder(default = ElfMachine::X86_64)]
    /// The machine the object file targets
    pub machine: ElfMachine,
    #[builder(default = ELF_VERSION_CURRENT)]
    /// The object file version
    pub version: u32,
    #[builder(default)]
    /// The virtual address execution transfers to, or zero when the file
    /// has no entry point
    pub entry: u64,
    #[builder(default)]
    /// The file offset of the program header table, or zero when the file
    /// has none
    pub program_header_offset: u64,
    #[builder(default)]
    /// The file offset of the section header table, or zero when the file
    /// has none
    pub section_header_offset: u64,
    #[builder(default)]
    /// Processor-specific flags
    pub flags: u32,
    #[builder(default = ElfHeader::SIZE as u16)]
    /// The size of this header in bytes
    pub header_size: u16,
    #[builder(default)]
    /// The size of one program header table entry in bytes
    pub program_header_entry_size: u16,
    #[builder(default)]
    /// The number of program header table entries
    pub program_header_count: u16,
    #[builder(default)]
    /// The size of one section header table entry in bytes
    pub section_header_entry_size: u16,
    #[builder(default)]
    /// The number of section header table entries
    pub section_header_count: u16,
    #[builder(default)]
    /// The section header table index of the section name string table
    pub section_name_table_index: u16,
}

impl<R> FromReader<R> for ElfHeader
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            identifier: ElfHeaderIdentifier::from_reader(reader)?,
            r#type: ElfType::from_reader(reader)?,
            machine: ElfMachine::from_reader(reader)?,
            version: u32::from_reader(reader)?,
            entry: u64::from_reader(reader)?,
            program_header_offset: u64::from_reader(reader)?,
            section_header_offset: u64::from_reader(reader)?,
            flags: u32::from_reader(reader)?,
            header_size: u16::from_reader(reader)?,
            program_header_entry_size: u16::from_reader(reader)?,
            program_header_count: u16::from_reader(reader)?,
            section_header_entry_size: u16::from_reader(reader)?,
            section_header_count: u16::from_reader(reader)?,
            section_name_table_index: u16::from_reader(reader)?,
        })
    }
}

impl<W> ToWriter<W> for ElfHeader
where
    W: Write,
{
    type Error = Error;

    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        self.identifier.to_writer(writer)?;
        self.r#type.to_writer(writer)?;
        self.machine.to_writer(writer)?;
        self.version.to_writer(writer)?;
        self.entry.to_writer(writer)?;
        self.program_header_offset.to_writer(writer)?;
        self.section_header_offset.to_writer(writer)?;
        self.flags.to_writer(writer)?;
        self.header_size.to_writer(writer)?;
        self.program_header_entry_size.to_writer(writer)?;
        self.program_header_count.to_writer(writer)?;
        self.section_header_entry_size.to_writer(writer)?;
        self.section_header_count.to_writer(writer)?;
        self.section_name_table_index.to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for ElfHeader {
    const SIZE: usize = 64;
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    // Header of a twelve-section relocatable produced by gcc
    const RELOCATABLE_HEADER: [u8; 64] = [
        0x7F, b'E', b'L', b'F', 0x02, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        0x00, // identification
        0x01, 0x00, // type: relocatable
        0x3E, 0x00, // machine: x86-64
        0x01, 0x00, 0x00, 0x00, // version
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // entry
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // program header offset
        0xC8, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // section header offset
        0x00, 0x00, 0x00, 0x00, // flags
        0x40, 0x00, // header size
        0x00, 0x00, // program header entry size
        0x00, 0x00, // program header count
        0x40, 0x00, // section header entry size
        0x0C, 0x00, // section header count
        0x0B, 0x00, // section name table index
    ];

    #[test]
    fn test_header_parse() {
        let header = ElfHeader::from_reader(&mut Cursor::new(RELOCATABLE_HEADER)).unwrap();
        assert_eq!(header.r#type, ElfType::Relocatable);
        assert_eq!(header.machine, ElfMachine::X86_64);
        assert_eq!(header.version, ELF_VERSION_CURRENT);
        assert_eq!(header.entry, 0);
        assert_eq!(header.section_header_offset, 456);
        assert_eq!(header.header_size, 64);
        assert_eq!(header.section_header_entry_size, 64);
        assert_eq!(header.section_header_count, 12);
        assert_eq!(header.section_name_table_index, 11);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = ElfHeader::from_reader(&mut Cursor::new(RELOCATABLE_HEADER)).unwrap();
        let mut buf = Vec::new();
        header.to_writer(&mut buf).unwrap();
        assert_eq!(buf, RELOCATABLE_HEADER);
    }

    #[test]
    fn test_unsupported_machine() {
        let mut bad = RELOCATABLE_HEADER;
        bad[18] = 0x08; // MIPS
        assert_eq!(
            ElfHeader::from_reader(&mut Cursor::new(bad)),
            Err(Error::UnsupportedMachine { machine: 8 })
        );
    }
}

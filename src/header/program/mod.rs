//! Implementation of the ELF program header
//!
//! Program headers are only meaningful in executable and shared object
//! files. They describe the segments the program loader maps into memory;
//! the linker emits one read-execute and one read-write load segment.

use std::io::{Read, Seek, Write};

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use typed_builder::TypedBuilder;

use crate::{error::Error, FromReader, HasWrittenSize, ToWriter};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The type of the segment a program header describes
pub enum ProgramHeaderType {
    /// Unused entry; the other members' values are undefined
    Null = 0,
    /// A loadable segment, described by the file size and memory size
    /// members. The bytes from the file are mapped to the beginning of the
    /// memory segment; if the memory size is larger than the file size the
    /// extra bytes hold zero.
    Load = 1,
    /// Dynamic linking information
    Dynamic = 2,
    /// The location and size of a null-terminated path name to invoke as
    /// an interpreter
    Interpreter = 3,
    /// The location and size of auxiliary information
    Note = 4,
    /// This segment type is reserved but has unspecified semantics
    SharedLibrary = 5,
    /// The location and size of the program header table itself
    ProgramHeaderTable = 6,
}

impl<R> FromReader<R> for ProgramHeaderType
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        let value = u32::from_reader(reader)?;
        Self::from_u32(value).ok_or(Error::UnsupportedSegmentType { value })
    }
}

impl<W> ToWriter<W> for ProgramHeaderType
where
    W: Write,
{
    type Error = Error;

    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        (*self as u32).to_writer(writer)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    /// The access permissions of a loaded segment
    pub struct ProgramHeaderFlags: u32 {
        /// Execute permission
        const EXECUTE = 0x1;
        /// Write permission
        const WRITE = 0x2;
        /// Read permission
        const READ = 0x4;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
/// The 56-byte ELF program header record
pub struct ProgramHeader {
    /// The kind of segment this header describes
    pub r#type: ProgramHeaderType,
    #[builder(default)]
    /// The segment's access permissions once loaded
    pub flags: ProgramHeaderFlags,
    #[builder(default)]
    /// The offset from the beginning of the file of the segment's first
    /// byte
    pub offset: u64,
    #[builder(default)]
    /// The virtual address of the segment's first byte in memory
    pub virtual_address: u64,
    #[builder(default)]
    /// The segment's physical address, for systems where physical
    /// addressing is relevant; equal to the virtual address here
    pub physical_address: u64,
    #[builder(default)]
    /// The number of bytes in the file image of the segment
    pub file_size: u64,
    #[builder(default)]
    /// The number of bytes in the memory image of the segment
    pub memory_size: u64,
    #[builder(default)]
    /// The alignment constraint: the offset and virtual address must be
    /// congruent modulo this value
    pub align: u64,
}

impl<R> FromReader<R> for ProgramHeader
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            r#type: ProgramHeaderType::from_reader(reader)?,
            flags: ProgramHeaderFlags::from_bits_retain(u32::from_reader(reader)?),
            offset: u64::from_reader(reader)?,
            virtual_address: u64::from_reader(reader)?,
            physical_address: u64::from_reader(reader)?,
            file_size: u64::from_reader(reader)?,
            memory_size: u64::from_reader(reader)?,
            align: u64::from_reader(reader)?,
        })
    }
}

impl<W> ToWriter<W> for ProgramHeader
where
    W: Write,
{
    type Error = Error;

    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        self.r#type.to_writer(writer)?;
        self.flags.bits().to_writer(writer)?;
        self.offset.to_writer(writer)?;
        self.virtual_address.to_writer(writer)?;
        self.physical_address.to_writer(writer)?;
        self.file_size.to_writer(writer)?;
        self.memory_size.to_writer(writer)?;
        self.align.to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for ProgramHeader {
    const SIZE: usize = 56;
}

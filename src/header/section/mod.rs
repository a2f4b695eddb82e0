//! Implementation of the ELF section header

use std::io::{Read, Seek, Write};

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use typed_builder::TypedBuilder;

use crate::{error::Error, FromReader, HasWrittenSize, ToWriter};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The type of an ELF section
pub enum SectionHeaderType {
    /// Marks the section header as inactive; it does not have an
    /// associated section. Other members of the section header have
    /// undefined values.
    Null = 0,
    /// Holds information defined by the program, whose format and meaning
    /// are determined solely by the program.
    ProgramBits = 1,
    /// Holds a symbol table. Typically provides symbols for link editing,
    /// though it may also be used for dynamic linking. As a complete
    /// symbol table, it may contain many symbols unnecessary for dynamic
    /// linking.
    SymbolTable = 2,
    /// The section holds a string table. An object file may have multiple
    /// string table sections.
    StringTable = 3,
    /// Holds relocation entries with explicit addends, type Elf64_Rela for
    /// the 64-bit class of object files. An object file may have multiple
    /// relocation sections.
    RelocationExplicit = 4,
    /// Holds a symbol hash table. A dynamically linked object file must
    /// contain one.
    Hash = 5,
    /// The section holds information for dynamic linking.
    Dynamic = 6,
    /// The section holds information that marks the file in some way.
    Note = 7,
    /// A section of this type occupies no space in the file but otherwise
    /// resembles ProgramBits. Although this section contains no bytes, the
    /// sh_offset member contains the conceptual file offset.
    NoBits = 8,
    /// The section holds relocation entries without explicit addends, type
    /// Elf64_Rel for the 64-bit class of object files.
    RelocationImplicit = 9,
    /// This section type is reserved but has unspecified semantics
    SectionHeaderLibrary = 10,
    /// Holds a minimal set of dynamic linking symbols, to save space over
    /// a full SymbolTable section.
    DynamicSymbol = 11,
    /// This section contains an array of pointers to initialization
    /// functions. Each pointer in the array is taken as a parameterless
    /// procedure with a void return.
    InitializerArray = 14,
    /// This section contains an array of pointers to termination
    /// functions. Each pointer in the array is taken as a parameterless
    /// procedure with a void return.
    FinalizerArray = 15,
    /// This section contains an array of pointers to functions that are
    /// invoked before all other initialization functions.
    PreInitializerArray = 16,
    /// This section defines a section group: a set of sections that are
    /// related and that must be treated specially by the linker. Sections
    /// of this type may appear only in relocatable objects.
    Group = 17,
    /// This section is associated with a symbol table section and is
    /// required if any of the section header indexes referenced by that
    /// symbol table contain the escape value 0xFFFF.
    SymbolTableSectionHeaderIndex = 18,
    /// RELR Relative Relocations
    RelR = 19,
    /// GNU-specific symbol hash table
    GnuHash = 0x6FFFFFF6,
    /// GNU-specific version definitions
    GnuVersionDefinition = 0x6FFFFFFD,
    /// GNU-specific version needs
    GnuVersionNeeds = 0x6FFFFFFE,
    /// GNU-specific version symbol table
    GnuVersionSymbolTable = 0x6FFFFFFF,
    /// x86-64 unwind table
    X86_64Unwind = 0x70000001,
}

impl<R> FromReader<R> for SectionHeaderType
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        let value = u32::from_reader(reader)?;
        Self::from_u32(value).ok_or(Error::UnsupportedSectionType { value })
    }
}

impl<W> ToWriter<W> for SectionHeaderType
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
    /// The flags of an ELF section
    pub struct SectionHeaderFlags: u64 {
        /// The section contains data that should be writable during
        /// process execution
        const WRITE = 0x1;
        /// The section occupies memory during process execution. Some
        /// control sections do not reside in the memory image of an object
        /// file; this attribute is off for those sections.
        const ALLOC = 0x2;
        /// Contains executable machine instructions
        const EXECINSTR = 0x4;
        /// The data in the section may be merged to eliminate duplication
        const MERGE = 0x10;
        /// The data elements in the section consist of null-terminated
        /// character strings
        const STRINGS = 0x20;
        /// The sh_info field of this section header holds a section header
        /// table index
        const INFO_LINK = 0x40;
        /// This section must appear in the output in the same relative
        /// order as the section referenced by its sh_link field
        const LINK_ORDER = 0x80;
        /// This section requires special OS-specific processing beyond the
        /// standard linking rules to avoid incorrect behavior
        const OS_NONCONFORMING = 0x100;
        /// This section is a member of a section group
        const GROUP = 0x200;
        /// This section holds thread-local storage: each separate
        /// execution flow has its own distinct instance of this data
        const TLS = 0x400;
        /// This section contains compressed data
        const COMPRESSED = 0x800;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
/// The 64-byte ELF section header record
pub struct SectionHeader {
    #[builder(default)]
    /// The name of the section: an index into the section header string
    /// table section giving the location of a null-terminated string
    pub name: u32,
    /// The section's contents and semantics
    pub r#type: SectionHeaderType,
    #[builder(default)]
    /// Bit-flags that describe miscellaneous attributes
    pub flags: SectionHeaderFlags,
    #[builder(default)]
    /// If the section will appear in the memory image of a process, the
    /// address at which the section's first byte should reside; otherwise
    /// zero
    pub address: u64,
    #[builder(default)]
    /// The byte offset from the beginning of the file to the first byte in
    /// the section. A section of type NoBits occupies no space in the
    /// file, and its offset locates the conceptual placement in the file.
    pub offset: u64,
    #[builder(default)]
    /// The section's size in bytes. A section of type NoBits may have a
    /// non-zero size, but it occupies no space in the file.
    pub size: u64,
    #[builder(default)]
    /// A section header table index link whose interpretation depends on
    /// the section type: the associated symbol table for relocation
    /// sections, the associated string table for symbol table sections
    pub link: u32,
    #[builder(default)]
    /// Extra information whose interpretation depends on the section type:
    /// the target section index for relocation sections, one greater than
    /// the index of the last local symbol for symbol table sections
    pub info: u32,
    #[builder(default)]
    /// Address alignment constraint. Only 0 and positive integral powers
    /// of two are allowed; 0 and 1 mean the section has no constraint.
    pub address_align: u64,
    #[builder(default)]
    /// For sections holding a table of fixed-size entries, the size in
    /// bytes of each entry; zero otherwise
    pub entry_size: u64,
}

impl SectionHeader {
    /// Whether the section should be writable during process execution
    pub fn is_writable(&self) -> bool {
        self.flags.contains(SectionHeaderFlags::WRITE)
    }

    /// Whether the section occupies memory during process execution
    pub fn is_allocated(&self) -> bool {
        self.flags.contains(SectionHeaderFlags::ALLOC)
    }
}

impl<R> FromReader<R> for SectionHeader
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            name: u32::from_reader(reader)?,
            r#type: SectionHeaderType::from_reader(reader)?,
            flags: SectionHeaderFlags::from_bits_retain(u64::from_reader(reader)?),
            address: u64::from_reader(reader)?,
            offset: u64::from_reader(reader)?,
            size: u64::from_reader(reader)?,
            link: u32::from_reader(reader)?,
            info: u32::from_reader(reader)?,
            address_align: u64::from_reader(reader)?,
            entry_size: u64::from_reader(reader)?,
        })
    }
}

impl<W> ToWriter<W> for SectionHeader
where
    W: Write,
{
    type Error = Error;

    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        self.name.to_writer(writer)?;
        self.r#type.to_writer(writer)?;
        self.flags.bits().to_writer(writer)?;
        self.address.to_writer(writer)?;
        self.offset.to_writer(writer)?;
        self.size.to_writer(writer)?;
        self.link.to_writer(writer)?;
        self.info.to_writer(writer)?;
        self.address_align.to_writer(writer)?;
        self.entry_size.to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for SectionHeader {
    const SIZE: usize = 64;
}

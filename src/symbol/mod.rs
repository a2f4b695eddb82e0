//! Implementation of ELF symbol table entries
//!
//! A symbol is a named, typed pointer into a section (or one of the
//! reserved pseudo-sections). The 24-byte on-disk record is wrapped with
//! the name resolved from the symbol string table so the resolver can work
//! by name across objects.

use std::io::{Read, Seek, Write};

use num_derive::{FromPrimitive, ToPrimitive};
use num_traits::FromPrimitive;
use typed_builder::TypedBuilder;

use crate::{error::Error, FromReader, HasWrittenSize, ToWriter};

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The type of a symbol, stored in the low nibble of the info byte
pub enum SymbolType {
    /// The symbol's type is not specified. Undefined references carry this
    /// type.
    NoType = 0,
    /// The symbol is associated with a data object, such as a variable or
    /// an array
    Object = 1,
    /// The symbol is associated with a function or other executable code
    Function = 2,
    /// The symbol is associated with a section; primarily used for
    /// relocations
    Section = 3,
    /// The symbol's name gives the name of the source file associated with
    /// the object file
    File = 4,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// The binding of a symbol, stored in the high nibble of the info byte
pub enum SymbolBinding {
    /// Not visible outside the object file containing its definition.
    /// Local symbols of the same name may exist in multiple files without
    /// interfering with each other.
    Local = 0,
    /// Visible to all object files being combined. One file's definition
    /// of a global symbol satisfies another file's undefined reference to
    /// it.
    Global = 1,
    /// Resembles a global symbol, but its definition has lower precedence
    Weak = 2,
}

/// Symbol section index value marking an undefined reference
pub const SECTION_INDEX_UNDEFINED: u16 = 0;
/// Lowest of the reserved symbol section index values
pub const SECTION_INDEX_RESERVED_LOW: u16 = 0xFF00;
/// Symbol section index value marking an absolute value that relocation
/// does not change
pub const SECTION_INDEX_ABSOLUTE: u16 = 0xFFF1;
/// Symbol section index value marking a common block that has not yet been
/// allocated
pub const SECTION_INDEX_COMMON: u16 = 0xFFF2;

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
/// A 24-byte symbol table entry wrapped with its resolved name
pub struct Symbol {
    #[builder(default, setter(into))]
    /// The symbol's name, resolved from the symbol string table
    pub name: String,
    #[builder(default)]
    /// The offset of the symbol's name in the symbol string table
    pub name_offset: u32,
    #[builder(default)]
    /// The symbol's type in the low nibble and binding in the high nibble
    pub info: u8,
    #[builder(default)]
    /// Reserved; holds symbol visibility in extended ABIs
    pub other: u8,
    #[builder(default)]
    /// The index of the section the symbol is defined in, or one of the
    /// reserved `SECTION_INDEX_*` values
    pub section_index: u16,
    #[builder(default)]
    /// The symbol's value: an offset within its section for relocatable
    /// files, a virtual address in executables
    pub value: u64,
    #[builder(default)]
    /// The size of the object the symbol describes, or zero when unknown
    pub size: u64,
}

impl Symbol {
    /// Pack a binding and a type into an info byte
    pub const fn info_byte(binding: SymbolBinding, r#type: SymbolType) -> u8 {
        ((binding as u8) << 4) | (r#type as u8 & 0x0F)
    }

    /// The symbol's type, from the low nibble of the info byte
    pub fn r#type(&self) -> Option<SymbolType> {
        SymbolType::from_u8(self.info & 0x0F)
    }

    /// The symbol's binding, from the high nibble of the info byte
    pub fn binding(&self) -> Option<SymbolBinding> {
        SymbolBinding::from_u8(self.info >> 4)
    }

    /// Whether the symbol's section index names an actual section rather
    /// than one of the reserved values
    pub fn has_defining_section(&self) -> bool {
        self.section_index != SECTION_INDEX_UNDEFINED
            && self.section_index < SECTION_INDEX_RESERVED_LOW
    }
}

impl<R> FromReader<R> for Symbol
where
    R: Read + Seek,
{
    type Error = Error;

    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            name: String::new(),
            name_offset: u32::from_reader(reader)?,
            info: u8::from_reader(reader)?,
            other: u8::from_reader(reader)?,
            section_index: u16::from_reader(reader)?,
            value: u64::from_reader(reader)?,
            size: u64::from_reader(reader)?,
        })
    }
}

impl<W> ToWriter<W> for Symbol
where
    W: Write,
{
    type Error = Error;

    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        self.name_offset.to_writer(writer)?;
        self.info.to_writer(writer)?;
        self.other.to_writer(writer)?;
        self.section_index.to_writer(writer)?;
        self.value.to_writer(writer)?;
        self.size.to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for Symbol {
    const SIZE: usize = 24;
}

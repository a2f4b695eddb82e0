//! Implementation of ELF relocation entries
//!
//! Relocations come in two on-disk shapes: Rela entries (24 bytes) carry
//! an explicit addend, Rel entries (16 bytes) do not. Both decode into the
//! same [`Relocation`] record with the addend defaulted to zero, so the
//! relocation engine consumes one uniform shape. The referenced symbol's
//! name is cached on the record at parse time so the entry stays
//! meaningful after its home object's symbol table is gone.

use std::io::{Read, Seek, Write};

use typed_builder::TypedBuilder;

use crate::{error::Error, FromReader, HasWrittenSize, ToWriter};

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
/// A relocation entry, uniform over the Rel and Rela on-disk shapes
pub struct Relocation {
    #[builder(default)]
    /// The offset of the patch site within the section the relocation
    /// applies to
    pub offset: u64,
    #[builder(default)]
    /// The packed info word: the symbol table index in the high 32 bits
    /// and the relocation type in the low 32 bits
    pub info: u64,
    #[builder(default)]
    /// The constant added when computing the relocated value; zero for
    /// entries decoded from a Rel section
    pub addend: i64,
    #[builder(default, setter(into))]
    /// The name of the referenced symbol, cached at parse time
    pub symbol_name: String,
}

impl Relocation {
    /// Pack a symbol table index and a relocation type into an info word
    pub const fn info_word(symbol_index: u32, kind: u32) -> u64 {
        ((symbol_index as u64) << 32) | kind as u64
    }

    /// The symbol table index of the referenced symbol
    pub fn symbol_index(&self) -> u32 {
        (self.info >> 32) as u32
    }

    /// The raw relocation type value
    pub fn kind_value(&self) -> u32 {
        self.info as u32
    }

    /// Decode a 16-byte Rel entry; the addend is zero
    pub fn rel_from_reader<R>(reader: &mut R) -> Result<Self, Error>
    where
        R: Read + Seek,
    {
        Ok(Self {
            offset: u64::from_reader(reader)?,
            info: u64::from_reader(reader)?,
            addend: 0,
            symbol_name: String::new(),
        })
    }

    /// The size of a Rel entry when written
    pub const REL_SIZE: usize = 16;
}

impl<R> FromReader<R> for Relocation
where
    R: Read + Seek,
{
    type Error = Error;

    /// Decode a 24-byte Rela entry
    fn from_reader(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            offset: u64::from_reader(reader)?,
            info: u64::from_reader(reader)?,
            addend: i64::from_reader(reader)?,
            symbol_name: String::new(),
        })
    }
}

impl<W> ToWriter<W> for Relocation
where
    W: Write,
{
    type Error = Error;

    /// Encode as a 24-byte Rela entry
    fn to_writer(&self, writer: &mut W) -> Result<(), Self::Error> {
        self.offset.to_writer(writer)?;
        self.info.to_writer(writer)?;
        self.addend.to_writer(writer)?;
        Ok(())
    }
}

impl HasWrittenSize for Relocation {
    const SIZE: usize = 24;
}

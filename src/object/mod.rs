//! Parsed object images
//!
//! An [`ObjectImage`] is one fully decoded ELF file: its header, its
//! sections paired with their raw contents, and its flat symbol table.
//! Cross-references between sections, symbols, and relocations are stored
//! as indices into the image's own vectors, never as pointers, so images
//! can be moved and mutated freely during the link.

use std::{
    collections::HashMap,
    fs,
    io::{Cursor, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use tracing::warn;

use crate::{
    base::read_string,
    error::Error,
    header::{
        elf::{
            identification::{ElfClass, ElfDataEncoding},
            ElfHeader, ElfMachine, ElfType,
        },
        program::ProgramHeader,
        section::{SectionHeader, SectionHeaderType},
    },
    relocation::Relocation,
    symbol::Symbol,
    FromReader, HasWrittenSize, Result, ToWriter,
};

/// The largest input file the linker will buffer, 1 GiB
pub const MAX_INPUT_SIZE: u64 = 1 << 30;

#[derive(Debug, Clone, PartialEq)]
/// A section header paired with the section's raw contents, the symbols
/// defined inside it, and the relocations that patch it
pub struct Section {
    /// The section's header record
    pub header: SectionHeader,
    /// The section's name, resolved from the section name string table
    pub name: String,
    /// The section's raw contents. NoBits sections own an empty buffer but
    /// keep their declared size in the header.
    pub data: Vec<u8>,
    /// Indices into the owning image's symbol table of the symbols defined
    /// in this section
    pub symbols: Vec<usize>,
    /// The relocations whose patch sites lie in this section
    pub relocations: Vec<Relocation>,
}

impl Section {
    /// Create a section from a header, resolved name, and raw contents
    pub fn new(header: SectionHeader, name: String, data: Vec<u8>) -> Self {
        Self {
            header,
            name,
            data,
            symbols: Vec::new(),
            relocations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A fully decoded ELF file
pub struct ObjectImage {
    /// The file's ELF header
    pub header: ElfHeader,
    /// The file's program headers; empty for relocatable objects
    pub program_headers: Vec<ProgramHeader>,
    /// The file's sections, in section header table order. Index 0 is the
    /// null section.
    pub sections: Vec<Section>,
    /// The file's symbols, in symbol table order. Index 0 is the null
    /// symbol.
    pub symbols: Vec<Symbol>,
    /// The path the image was read from
    pub origin: PathBuf,
}

impl ObjectImage {
    /// Read and decode the object file at `path`, rejecting files larger
    /// than [`MAX_INPUT_SIZE`]
    pub fn from_file(path: &Path) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| Error::File {
            path: path.to_path_buf(),
            kind: e.kind(),
        })?;
        if metadata.len() > MAX_INPUT_SIZE {
            return Err(Error::InputTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
            });
        }

        let buffer = fs::read(path).map_err(|e| Error::File {
            path: path.to_path_buf(),
            kind: e.kind(),
        })?;

        Self::parse(&buffer, path)
    }

    /// Decode a complete in-memory ELF file
    ///
    /// Rejects anything that is not 64-bit, little-endian x86-64. Symbol
    /// and relocation tables are decoded for relocatable images only;
    /// executables keep their sections and raw contents but carry no
    /// symbol requirement, so the linker's own output can be re-read.
    pub fn parse(buffer: &[u8], origin: &Path) -> Result<Self> {
        if buffer.len() < ElfHeader::SIZE {
            return Err(Error::ShortRead {
                expected: ElfHeader::SIZE,
                actual: buffer.len(),
            });
        }

        let mut cursor = Cursor::new(buffer);
        let header = ElfHeader::from_reader(&mut cursor)?;

        if header.identifier.class != ElfClass::Elf64 {
            return Err(Error::UnsupportedClass {
                class: header.identifier.class as u8,
            });
        }
        if header.identifier.data_encoding != ElfDataEncoding::LittleEndian {
            return Err(Error::UnsupportedData {
                encoding: header.identifier.data_encoding as u8,
            });
        }
        if header.machine != ElfMachine::X86_64 {
            return Err(Error::UnsupportedMachine {
                machine: header.machine as u16,
            });
        }

        let program_headers = Self::parse_program_headers(&header, buffer, &mut cursor)?;
        let sections = Self::parse_sections(&header, buffer, &mut cursor)?;

        let mut image = Self {
            header,
            program_headers,
            sections,
            symbols: Vec::new(),
            origin: origin.to_path_buf(),
        };

        if image.header.r#type == ElfType::Relocatable {
            image.decode_symbols()?;
            image.decode_relocations()?;
        }

        Ok(image)
    }

    fn parse_program_headers(
        header: &ElfHeader,
        buffer: &[u8],
        cursor: &mut Cursor<&[u8]>,
    ) -> Result<Vec<ProgramHeader>> {
        let count = header.program_header_count as usize;
        let base = header.program_header_offset;
        let end = base as usize + count * ProgramHeader::SIZE;
        if end > buffer.len() {
            return Err(Error::ShortRead {
                expected: end,
                actual: buffer.len(),
            });
        }

        let mut program_headers = Vec::with_capacity(count);
        cursor
            .seek(SeekFrom::Start(base))
            .map_err(|e| Error::Io { kind: e.kind() })?;
        for _ in 0..count {
            program_headers.push(ProgramHeader::from_reader(cursor)?);
        }
        Ok(program_headers)
    }

    fn parse_sections(
        header: &ElfHeader,
        buffer: &[u8],
        cursor: &mut Cursor<&[u8]>,
    ) -> Result<Vec<Section>> {
        let count = header.section_header_count as usize;
        let base = header.section_header_offset;
        let end = base as usize + count * SectionHeader::SIZE;
        if end > buffer.len() {
            return Err(Error::ShortRead {
                expected: end,
                actual: buffer.len(),
            });
        }

        let mut headers = Vec::with_capacity(count);
        cursor
            .seek(SeekFrom::Start(base))
            .map_err(|e| Error::Io { kind: e.kind() })?;
        for _ in 0..count {
            headers.push(SectionHeader::from_reader(cursor)?);
        }

        let name_table_base = headers
            .get(header.section_name_table_index as usize)
            .map(|h| h.offset)
            .ok_or(Error::MissingStringTable)?;

        headers
            .into_iter()
            .map(|section_header| {
                let name = read_string(
                    buffer,
                    (name_table_base + section_header.name as u64) as usize,
                );
                let data = if section_header.r#type == SectionHeaderType::NoBits {
                    Vec::new()
                } else {
                    let start = section_header.offset as usize;
                    let end = start + section_header.size as usize;
                    buffer
                        .get(start..end)
                        .ok_or(Error::ShortRead {
                            expected: end,
                            actual: buffer.len(),
                        })?
                        .to_vec()
                };
                Ok(Section::new(section_header, name, data))
            })
            .collect()
    }

    /// Decode the symbol table, resolving each symbol's name from the
    /// `.strtab` string table and recording each symbol in the section
    /// that defines it
    fn decode_symbols(&mut self) -> Result<()> {
        let symbol_table = self
            .sections
            .iter()
            .position(|s| s.header.r#type == SectionHeaderType::SymbolTable)
            .ok_or(Error::MissingSymbolTable)?;
        let string_table = self
            .sections
            .iter()
            .position(|s| s.header.r#type == SectionHeaderType::StringTable && s.name == ".strtab")
            .ok_or(Error::MissingStringTable)?;

        let symbol_data = self.sections[symbol_table].data.clone();
        if symbol_data.len() % Symbol::SIZE != 0 {
            return Err(Error::TruncatedRecord {
                record: "symbol",
                offset: self.sections[symbol_table].header.offset
                    + (symbol_data.len() - symbol_data.len() % Symbol::SIZE) as u64,
            });
        }

        let mut cursor = Cursor::new(symbol_data.as_slice());
        for _ in 0..symbol_data.len() / Symbol::SIZE {
            let mut symbol = Symbol::from_reader(&mut cursor)?;
            symbol.name = read_string(
                &self.sections[string_table].data,
                symbol.name_offset as usize,
            );
            if symbol.has_defining_section() {
                let section = symbol.section_index as usize;
                if section < self.sections.len() {
                    self.sections[section].symbols.push(self.symbols.len());
                }
            }
            self.symbols.push(symbol);
        }

        Ok(())
    }

    /// Decode every Rel and Rela section, attaching each entry to the
    /// section its `info` field targets with the referenced symbol's name
    /// cached on the entry
    fn decode_relocations(&mut self) -> Result<()> {
        for index in 0..self.sections.len() {
            let explicit_addend = match self.sections[index].header.r#type {
                SectionHeaderType::RelocationExplicit => true,
                SectionHeaderType::RelocationImplicit => false,
                _ => continue,
            };

            let target = self.sections[index].header.info as usize;
            if target >= self.sections.len() {
                warn!(
                    "Relocation section {} targets nonexistent section {target}, skipping",
                    self.sections[index].name
                );
                continue;
            }

            let entry_size = if explicit_addend {
                Relocation::SIZE
            } else {
                Relocation::REL_SIZE
            };
            let data = self.sections[index].data.clone();
            if data.len() % entry_size != 0 {
                return Err(Error::TruncatedRecord {
                    record: "relocation",
                    offset: self.sections[index].header.offset
                        + (data.len() - data.len() % entry_size) as u64,
                });
            }

            let mut cursor = Cursor::new(data.as_slice());
            for _ in 0..data.len() / entry_size {
                let mut relocation = if explicit_addend {
                    Relocation::from_reader(&mut cursor)?
                } else {
                    Relocation::rel_from_reader(&mut cursor)?
                };

                match self.symbols.get(relocation.symbol_index() as usize) {
                    Some(symbol) => relocation.symbol_name = symbol.name.clone(),
                    None => {
                        warn!(
                            "Relocation in {} references nonexistent symbol {}, skipping",
                            self.sections[index].name,
                            relocation.symbol_index()
                        );
                        continue;
                    }
                }

                self.sections[target].relocations.push(relocation);
            }
        }

        Ok(())
    }
}

fn pad_to<W>(writer: &mut W, position: &mut usize, target: usize) -> Result<()>
where
    W: Write,
{
    if target > *position {
        let zeros = vec![0u8; target - *position];
        writer
            .write_all(&zeros)
            .map_err(|e| Error::Io { kind: e.kind() })?;
        *position = target;
    }
    Ok(())
}

impl<W> ToWriter<W> for ObjectImage
where
    W: Write,
{
    type Error = Error;

    /// Serialize the image: ELF header, program headers, each section's
    /// contents at its declared offset (zero-padding any gap, which also
    /// materializes NoBits ranges), then the section header table at the
    /// declared section header offset
    fn to_writer(&self, writer: &mut W) -> Result<()> {
        let mut position = 0;
        self.header.to_writer(writer)?;
        position += ElfHeader::SIZE;

        if !self.program_headers.is_empty() {
            pad_to(writer, &mut position, self.header.program_header_offset as usize)?;
            for program_header in &self.program_headers {
                program_header.to_writer(writer)?;
                position += ProgramHeader::SIZE;
            }
        }

        for section in &self.sections {
            if section.data.is_empty() {
                continue;
            }
            pad_to(writer, &mut position, section.header.offset as usize)?;
            writer
                .write_all(&section.data)
                .map_err(|e| Error::Io { kind: e.kind() })?;
            position += section.data.len();
        }

        pad_to(writer, &mut position, self.header.section_header_offset as usize)?;
        for section in &self.sections {
            section.header.to_writer(writer)?;
        }

        Ok(())
    }
}

#[derive(Debug)]
/// The executable being constructed: an [`ObjectImage`] that grows
/// monotonically during the merge, plus name lookups for merge-time
/// dispatch and relocation-time symbol addressing
pub struct OutputImage {
    /// The image under construction
    pub image: ObjectImage,
    section_index: HashMap<String, usize>,
    symbol_index: HashMap<String, usize>,
}

impl OutputImage {
    /// Create an empty output image
    pub fn new() -> Self {
        Self {
            image: ObjectImage {
                header: ElfHeader::builder().r#type(ElfType::Executable).build(),
                program_headers: Vec::new(),
                sections: Vec::new(),
                symbols: Vec::new(),
                origin: PathBuf::new(),
            },
            section_index: HashMap::new(),
            symbol_index: HashMap::new(),
        }
    }

    /// The index of the output section with the given name
    pub fn section_by_name(&self, name: &str) -> Option<usize> {
        self.section_index.get(name).copied()
    }

    /// Append a section to the output and record it in the name lookup,
    /// returning its index
    pub fn adopt_section(&mut self, section: Section) -> usize {
        let index = self.image.sections.len();
        self.section_index.insert(section.name.clone(), index);
        self.image.sections.push(section);
        index
    }

    /// Stably partition the output sections so every section without the
    /// write flag precedes every section with it, then rebuild the name
    /// lookup. The null section stays first and relative order inside each
    /// partition is preserved.
    pub fn sort_sections(&mut self) {
        self.image
            .sections
            .sort_by_key(|section| section.header.is_writable());
        self.section_index = self
            .image
            .sections
            .iter()
            .enumerate()
            .map(|(index, section)| (section.name.clone(), index))
            .collect();
    }

    /// Rebuild the name to symbol index lookup after the merge has
    /// populated the flat symbol table
    pub fn index_symbols(&mut self) {
        self.symbol_index = self
            .image
            .symbols
            .iter()
            .enumerate()
            .map(|(index, symbol)| (symbol.name.clone(), index))
            .collect();
    }

    /// The index of the output symbol with the given name
    pub fn symbol_by_name(&self, name: &str) -> Option<usize> {
        self.symbol_index.get(name).copied()
    }
}

impl Default for OutputImage {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
pub(crate) mod fixtures {
    //! Builders for synthetic relocatable objects used across the test
    //! modules

    use crate::{
        header::{
            elf::{ElfHeader, ElfType},
            section::{SectionHeader, SectionHeaderFlags, SectionHeaderType},
        },
        object::{ObjectImage, Section},
        relocation::Relocation,
        symbol::{Symbol, SymbolBinding, SymbolType},
        HasWrittenSize, ToWriter,
    };
    use std::path::PathBuf;

    /// A section of a synthetic relocatable
    pub(crate) struct SectionSpec {
        pub name: &'static str,
        pub r#type: SectionHeaderType,
        pub flags: SectionHeaderFlags,
        pub data: Vec<u8>,
        /// Declared size for NoBits sections; ignored otherwise
        pub size: u64,
    }

    impl SectionSpec {
        pub(crate) fn progbits(
            name: &'static str,
            flags: SectionHeaderFlags,
            data: Vec<u8>,
        ) -> Self {
            Self {
                name,
                r#type: SectionHeaderType::ProgramBits,
                flags,
                data,
                size: 0,
            }
        }

        pub(crate) fn text(data: Vec<u8>) -> Self {
            Self::progbits(
                ".text",
                SectionHeaderFlags::ALLOC | SectionHeaderFlags::EXECINSTR,
                data,
            )
        }

        pub(crate) fn data(data: Vec<u8>) -> Self {
            Self::progbits(
                ".data",
                SectionHeaderFlags::ALLOC | SectionHeaderFlags::WRITE,
                data,
            )
        }

        pub(crate) fn bss(size: u64) -> Self {
            Self {
                name: ".bss",
                r#type: SectionHeaderType::NoBits,
                flags: SectionHeaderFlags::ALLOC | SectionHeaderFlags::WRITE,
                data: Vec::new(),
                size,
            }
        }
    }

    /// A symbol of a synthetic relocatable. An empty `section` means the
    /// symbol is an undefined reference.
    pub(crate) struct SymbolSpec {
        pub name: &'static str,
        pub binding: SymbolBinding,
        pub r#type: SymbolType,
        pub section: &'static str,
        pub value: u64,
    }

    impl SymbolSpec {
        pub(crate) fn func(name: &'static str, value: u64) -> Self {
            Self {
                name,
                binding: SymbolBinding::Global,
                r#type: SymbolType::Function,
                section: ".text",
                value,
            }
        }

        pub(crate) fn undefined(name: &'static str) -> Self {
            Self {
                name,
                binding: SymbolBinding::Global,
                r#type: SymbolType::NoType,
                section: "",
                value: 0,
            }
        }
    }

    /// A relocation of a synthetic relocatable, emitted into a
    /// `.rela.<section>` section targeting `section`
    pub(crate) struct RelocationSpec {
        pub section: &'static str,
        pub offset: u64,
        pub kind: u32,
        pub symbol: &'static str,
        pub addend: i64,
    }

    /// Assemble a complete relocatable object file image from the given
    /// sections, symbols, and relocations. The produced byte layout is the
    /// writer's own: header, section contents in order, section header
    /// table last.
    pub(crate) fn relocatable(
        sections: &[SectionSpec],
        symbols: &[SymbolSpec],
        relocations: &[RelocationSpec],
    ) -> Vec<u8> {
        // Section order: null, user sections, rela sections, .symtab,
        // .strtab, .shstrtab
        let mut names: Vec<String> = vec![String::new()];
        names.extend(sections.iter().map(|s| s.name.to_string()));
        let rela_targets: Vec<&'static str> = {
            let mut targets: Vec<&'static str> = Vec::new();
            for relocation in relocations {
                if !targets.contains(&relocation.section) {
                    targets.push(relocation.section);
                }
            }
            targets
        };
        names.extend(rela_targets.iter().map(|t| format!(".rela{t}")));
        let symtab_index = names.len();
        names.push(".symtab".to_string());
        let strtab_index = names.len();
        names.push(".strtab".to_string());
        let shstrtab_index = names.len();
        names.push(".shstrtab".to_string());

        let section_index_of = |name: &str| -> u16 {
            if name.is_empty() {
                0
            } else {
                names.iter().position(|n| n == name).unwrap() as u16
            }
        };

        // String table: null byte then each symbol name
        let mut strtab = vec![0u8];
        let mut symtab = Vec::new();
        Symbol::builder().build().to_writer(&mut symtab).unwrap();
        for spec in symbols {
            let name_offset = strtab.len() as u32;
            strtab.extend_from_slice(spec.name.as_bytes());
            strtab.push(0);
            Symbol::builder()
                .name_offset(name_offset)
                .info(Symbol::info_byte(spec.binding, spec.r#type))
                .section_index(section_index_of(spec.section))
                .value(spec.value)
                .build()
                .to_writer(&mut symtab)
                .unwrap();
        }

        let symbol_index_of = |name: &str| -> u32 {
            symbols.iter().position(|s| s.name == name).unwrap() as u32 + 1
        };

        // Relocation section contents, one buffer per distinct target
        let mut rela_data: Vec<Vec<u8>> = Vec::new();
        for target in &rela_targets {
            let mut data = Vec::new();
            for spec in relocations.iter().filter(|r| r.section == *target) {
                Relocation::builder()
                    .offset(spec.offset)
                    .info(Relocation::info_word(symbol_index_of(spec.symbol), spec.kind))
                    .addend(spec.addend)
                    .build()
                    .to_writer(&mut data)
                    .unwrap();
            }
            rela_data.push(data);
        }

        // Section name table
        let mut shstrtab = Vec::new();
        let mut name_offsets = Vec::new();
        for name in &names {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(name.as_bytes());
            shstrtab.push(0);
        }

        // Assemble headers and contents in order, assigning offsets as we go
        let mut image_sections = Vec::new();
        let mut offset = ElfHeader::SIZE as u64;
        let mut push_section =
            |index: usize, r#type, flags, data: Vec<u8>, size, link, info, entry_size| {
                let header = SectionHeader::builder()
                    .name(name_offsets[index])
                    .r#type(r#type)
                    .flags(flags)
                    .offset(offset)
                    .size(size)
                    .link(link)
                    .info(info)
                    .address_align(1)
                    .entry_size(entry_size)
                    .build();
                if r#type != SectionHeaderType::NoBits {
                    offset += data.len() as u64;
                }
                image_sections.push(Section::new(header, names[index].clone(), data));
            };

        push_section(0, SectionHeaderType::Null, SectionHeaderFlags::empty(), Vec::new(), 0, 0, 0, 0);
        for (position, spec) in sections.iter().enumerate() {
            let size = if spec.r#type == SectionHeaderType::NoBits {
                spec.size
            } else {
                spec.data.len() as u64
            };
            push_section(
                position + 1,
                spec.r#type,
                spec.flags,
                spec.data.clone(),
                size,
                0,
                0,
                0,
            );
        }
        for (position, target) in rela_targets.iter().enumerate() {
            let data = rela_data[position].clone();
            let size = data.len() as u64;
            push_section(
                sections.len() + 1 + position,
                SectionHeaderType::RelocationExplicit,
                SectionHeaderFlags::empty(),
                data,
                size,
                symtab_index as u32,
                section_index_of(target) as u32,
                Relocation::SIZE as u64,
            );
        }
        let symtab_size = symtab.len() as u64;
        push_section(
            symtab_index,
            SectionHeaderType::SymbolTable,
            SectionHeaderFlags::empty(),
            symtab,
            symtab_size,
            strtab_index as u32,
            1,
            Symbol::SIZE as u64,
        );
        let strtab_size = strtab.len() as u64;
        push_section(
            strtab_index,
            SectionHeaderType::StringTable,
            SectionHeaderFlags::empty(),
            strtab,
            strtab_size,
            0,
            0,
            0,
        );
        let shstrtab_size = shstrtab.len() as u64;
        push_section(
            shstrtab_index,
            SectionHeaderType::StringTable,
            SectionHeaderFlags::empty(),
            shstrtab,
            shstrtab_size,
            0,
            0,
            0,
        );

        let header = ElfHeader::builder()
            .r#type(ElfType::Relocatable)
            .section_header_offset(offset)
            .section_header_entry_size(SectionHeader::SIZE as u16)
            .section_header_count(image_sections.len() as u16)
            .section_name_table_index(shstrtab_index as u16)
            .build();

        let image = ObjectImage {
            header,
            program_headers: Vec::new(),
            sections: image_sections,
            symbols: Vec::new(),
            origin: PathBuf::from("fixture.o"),
        };

        let mut buffer = Vec::new();
        image.to_writer(&mut buffer).unwrap();
        buffer
    }
}

//! The link driver
//!
//! Owns the per-link state: the parsed input images, the resolver, and the
//! output image under construction. A link runs as a fixed sequence of
//! in-order passes: parse and resolve each input, merge mergeable
//! sections, partition and lay out the output, build program headers,
//! apply relocations, and write the executable.

use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    os::unix::fs::OpenOptionsExt,
    path::Path,
    time::Instant,
};

use tracing::{debug, info, warn};

use crate::{
    error::Error,
    header::{
        elf::{ElfHeader, ElfType},
        program::{ProgramHeader, ProgramHeaderFlags, ProgramHeaderType},
    },
    object::{ObjectImage, OutputImage, Section},
    resolver::{Resolver, SymbolRef},
    Config, HasWrittenSize, Result, ToWriter,
};

mod relocations;

/// The fixed offset added to a section's file offset to produce its
/// virtual address in the loaded process image
pub const VIRTUAL_ADDRESS_BASE: u64 = 0x400000;

/// The alignment of the loadable segments
pub const LOAD_ALIGN: u64 = 0x1000;

/// The file offset of the first section: the ELF header followed by the
/// two load program headers
pub const CONTENT_BASE: u64 = (ElfHeader::SIZE + 2 * ProgramHeader::SIZE) as u64;

/// The section names that are concatenated into the output. Everything
/// else is either a relocation section, whose entries were attached to
/// their target section at parse time, or is dropped.
const MERGEABLE_NAMES: [&str; 7] = [
    "",
    ".text",
    ".data",
    ".bss",
    ".strtab",
    ".rodata",
    ".shstrtab",
];

#[derive(Debug)]
/// All state for one link invocation
pub struct Linker {
    /// The configuration the link runs under
    pub config: Config,
    /// The parsed input images, in input order
    pub objects: Vec<ObjectImage>,
    /// The global symbol table
    pub resolver: Resolver,
    /// The executable being constructed
    pub output: OutputImage,
}

fn timed<T, F>(profile: bool, label: &str, body: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let started = Instant::now();
    let result = body()?;
    if profile {
        info!("{label} took {:?}", started.elapsed());
    }
    Ok(result)
}

impl Linker {
    /// Link the given relocatable objects into one executable, written to
    /// the path configured in `config`. Returns the linker so the
    /// constructed output image remains inspectable.
    pub fn link<P>(inputs: &[P], config: &Config) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let profile = config.profile;
        let mut linker = Self {
            config: config.clone(),
            objects: Vec::new(),
            resolver: Resolver::new(),
            output: OutputImage::new(),
        };

        timed(profile, "Parsing and resolution", || {
            for input in inputs {
                linker.load(input.as_ref())?;
            }
            linker.resolver.finish()
        })?;
        timed(profile, "Section merging", || linker.merge())?;
        timed(profile, "Layout", || linker.layout())?;
        timed(profile, "Relocation", || linker.relocate())?;
        timed(profile, "Writing", || linker.write())?;

        Ok(linker)
    }

    /// Parse one input file and fold its symbols into the resolver
    fn load(&mut self, path: &Path) -> Result<()> {
        info!("Reading {}", path.display());
        let image = ObjectImage::from_file(path)?;
        if image.header.r#type != ElfType::Relocatable {
            return Err(Error::UnsupportedType {
                value: image.header.r#type as u16,
            });
        }

        let object = self.objects.len();
        for (index, symbol) in image.symbols.iter().enumerate() {
            self.resolver.update(symbol, SymbolRef { object, symbol: index })?;
        }
        self.objects.push(image);
        Ok(())
    }

    /// Merge every mergeable section of every input into the output, in
    /// input order then section order
    fn merge(&mut self) -> Result<()> {
        let defined = self.resolver.defined_by_section(&self.objects);

        for object in 0..self.objects.len() {
            for section in 0..self.objects[object].sections.len() {
                let name = self.objects[object].sections[section].name.clone();
                if MERGEABLE_NAMES.contains(&name.as_str()) {
                    let bucket = defined.get(&(object, section)).map(Vec::as_slice);
                    self.merge_section(object, section, bucket.unwrap_or(&[]));
                } else if name.starts_with(".rel") {
                    debug!("Relocation section {name} was consumed at parse time");
                } else {
                    debug!("Section was skipped because its name is not mergeable: {name}");
                }
            }
        }

        self.output.index_symbols();
        Ok(())
    }

    /// Merge one input section: adopt it when the output has no section of
    /// its name yet, concatenate otherwise, and re-home the canonical
    /// definitions it owns
    fn merge_section(&mut self, object: usize, section: usize, defined: &[SymbolRef]) {
        let input = &self.objects[object].sections[section];
        let name = input.name.clone();

        let (output_index, previous_size) = match self.output.section_by_name(&name) {
            None => {
                let mut adopted =
                    Section::new(input.header.clone(), name.clone(), input.data.clone());
                adopted.relocations = input.relocations.clone();
                if name == ".strtab" || name == ".shstrtab" {
                    // rebuilt from scratch once every section has merged
                    adopted.data = Vec::new();
                    adopted.header.size = 0;
                }
                (self.output.adopt_section(adopted), 0)
            }
            Some(output_index) => {
                let appended_data = input.data.clone();
                let appended_size = input.header.size;
                let appended_relocations = input.relocations.clone();

                let out = &mut self.output.image.sections[output_index];
                let previous_size = out.header.size;
                if name != ".strtab" && name != ".shstrtab" {
                    out.data.extend_from_slice(&appended_data);
                    for mut relocation in appended_relocations {
                        relocation.offset += previous_size;
                        out.relocations.push(relocation);
                    }
                    out.header.size += appended_size;
                }
                (output_index, previous_size)
            }
        };

        for reference in defined {
            let mut symbol = self.objects[reference.object].symbols[reference.symbol].clone();
            symbol.value += previous_size;
            let flat = self.output.image.symbols.len();
            self.output.image.symbols.push(symbol);
            self.output.image.sections[output_index].symbols.push(flat);
        }
    }

    /// Order sections, rebuild the string tables, assign file offsets,
    /// build the program headers, and finalize the executable header
    fn layout(&mut self) -> Result<()> {
        self.output.sort_sections();
        self.rebuild_string_tables()?;
        self.assign_offsets();
        self.build_program_headers();
        self.finalize_header()
    }

    /// Rebuild `.shstrtab` and `.strtab` from the merged sections and
    /// symbols, rewriting every name offset and re-pointing every symbol
    /// at its output section
    fn rebuild_string_tables(&mut self) -> Result<()> {
        let shstrtab = self
            .output
            .section_by_name(".shstrtab")
            .ok_or(Error::MissingStringTable)?;
        let strtab = self
            .output
            .section_by_name(".strtab")
            .ok_or(Error::MissingStringTable)?;

        let mut section_names = Vec::new();
        let mut symbol_names = Vec::new();
        for index in 0..self.output.image.sections.len() {
            self.output.image.sections[index].header.name = section_names.len() as u32;
            section_names.extend_from_slice(self.output.image.sections[index].name.as_bytes());
            section_names.push(0);

            for flat in self.output.image.sections[index].symbols.clone() {
                let symbol = &mut self.output.image.symbols[flat];
                symbol.name_offset = symbol_names.len() as u32;
                symbol_names.extend_from_slice(symbol.name.as_bytes());
                symbol_names.push(0);
                symbol.section_index = index as u16;
            }
        }

        let section = &mut self.output.image.sections[shstrtab];
        section.header.size = section_names.len() as u64;
        section.data = section_names;
        let section = &mut self.output.image.sections[strtab];
        section.header.size = symbol_names.len() as u64;
        section.data = symbol_names;
        Ok(())
    }

    /// Assign each output section its file offset: a running sum starting
    /// just past the program header table
    fn assign_offsets(&mut self) {
        let mut running = CONTENT_BASE;
        for section in &mut self.output.image.sections {
            section.header.offset = running;
            running += section.header.size;
        }
    }

    /// Build the two load program headers: a read-execute segment covering
    /// every section before the first writable one and a read-write
    /// segment covering the rest. Each segment's offset and size are
    /// computed independently from its own sections.
    fn build_program_headers(&mut self) {
        let sections = &self.output.image.sections;
        let first_writable = sections.iter().position(|s| s.header.is_writable());
        let end = sections
            .last()
            .map_or(CONTENT_BASE, |s| s.header.offset + s.header.size);

        let read_execute_offset = sections.first().map_or(CONTENT_BASE, |s| s.header.offset);
        let read_execute_size: u64 = sections
            .iter()
            .filter(|s| !s.header.is_writable())
            .map(|s| s.header.size)
            .sum();
        let read_write_offset = first_writable.map_or(end, |index| sections[index].header.offset);
        let read_write_size: u64 = sections
            .iter()
            .filter(|s| s.header.is_writable())
            .map(|s| s.header.size)
            .sum();

        self.output.image.program_headers = vec![
            ProgramHeader::builder()
                .r#type(ProgramHeaderType::Load)
                .flags(ProgramHeaderFlags::READ | ProgramHeaderFlags::EXECUTE)
                .offset(read_execute_offset)
                .virtual_address(read_execute_offset + VIRTUAL_ADDRESS_BASE)
                .physical_address(read_execute_offset + VIRTUAL_ADDRESS_BASE)
                .file_size(read_execute_size)
                .memory_size(read_execute_size)
                .align(LOAD_ALIGN)
                .build(),
            ProgramHeader::builder()
                .r#type(ProgramHeaderType::Load)
                .flags(ProgramHeaderFlags::READ | ProgramHeaderFlags::WRITE)
                .offset(read_write_offset)
                .virtual_address(read_write_offset + VIRTUAL_ADDRESS_BASE)
                .physical_address(read_write_offset + VIRTUAL_ADDRESS_BASE)
                .file_size(read_write_size)
                .memory_size(read_write_size)
                .align(LOAD_ALIGN)
                .build(),
        ];

        for section in &mut self.output.image.sections {
            if section.header.is_allocated() {
                section.header.address = section.header.offset + VIRTUAL_ADDRESS_BASE;
            }
        }
    }

    /// Fill the remaining executable header fields now that the layout is
    /// final
    fn finalize_header(&mut self) -> Result<()> {
        let entry = self.entry_point();
        let section_header_offset = self
            .output
            .image
            .sections
            .last()
            .map_or(CONTENT_BASE, |s| s.header.offset + s.header.size);
        let section_name_table_index = self
            .output
            .section_by_name(".shstrtab")
            .ok_or(Error::MissingStringTable)? as u16;

        let header = &mut self.output.image.header;
        header.entry = entry;
        header.program_header_offset = ElfHeader::SIZE as u64;
        header.program_header_entry_size = ProgramHeader::SIZE as u16;
        header.program_header_count = self.output.image.program_headers.len() as u16;
        header.section_header_offset = section_header_offset;
        header.section_header_entry_size = 64;
        header.section_header_count = self.output.image.sections.len() as u16;
        header.section_name_table_index = section_name_table_index;
        Ok(())
    }

    /// The executable's entry point: `_start` when defined, else `main`,
    /// else the start of `.text`
    fn entry_point(&self) -> u64 {
        for name in ["_start", "main"] {
            if let Some(address) = self.symbol_virtual_address(name) {
                return address;
            }
        }
        match self.output.section_by_name(".text") {
            Some(index) => self.section_virtual_address(index),
            None => {
                warn!("No entry symbol and no .text section, entry point is zero");
                0
            }
        }
    }

    /// The virtual address of an output section
    pub fn section_virtual_address(&self, index: usize) -> u64 {
        self.output.image.sections[index].header.offset + VIRTUAL_ADDRESS_BASE
    }

    /// The virtual address of an output symbol: its section's virtual
    /// address plus its offset within the section
    pub fn symbol_virtual_address(&self, name: &str) -> Option<u64> {
        let symbol = &self.output.image.symbols[self.output.symbol_by_name(name)?];
        Some(self.section_virtual_address(symbol.section_index as usize) + symbol.value)
    }

    /// Serialize the output image to the configured path, opened once for
    /// truncated write with executable permissions
    fn write(&self) -> Result<()> {
        let path = &self.config.output;
        info!("Writing executable {}", path.display());

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o755)
            .open(path)
            .map_err(|e| Error::File {
                path: path.clone(),
                kind: e.kind(),
            })?;
        let mut writer = BufWriter::new(file);
        self.output.image.to_writer(&mut writer).map_err(|e| match e {
            Error::Io { kind } => Error::File {
                path: path.clone(),
                kind,
            },
            other => other,
        })?;
        writer.flush().map_err(|e| Error::File {
            path: path.clone(),
            kind: e.kind(),
        })?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        arch::x86_64::RelocationKind,
        base::read_string,
        header::elf::identification::ElfClass,
        header::elf::ElfMachine,
        object::fixtures::{relocatable, RelocationSpec, SectionSpec, SymbolSpec},
        symbol::{SymbolBinding, SymbolType},
    };
    use std::{collections::HashSet, fs, path::PathBuf};

    /// Scratch input and output paths for one end-to-end link, removed on
    /// drop
    struct LinkFixture {
        paths: Vec<PathBuf>,
        output: PathBuf,
    }

    impl LinkFixture {
        fn new(name: &str, images: &[Vec<u8>]) -> Self {
            let dir = std::env::temp_dir();
            let paths = images
                .iter()
                .enumerate()
                .map(|(index, image)| {
                    let path = dir.join(format!("sold-{}-{name}-{index}.o", std::process::id()));
                    fs::write(&path, image).unwrap();
                    path
                })
                .collect();
            let output = dir.join(format!("sold-{}-{name}.out", std::process::id()));
            Self { paths, output }
        }

        fn config(&self) -> Config {
            Config::builder().output(&self.output).build()
        }

        fn strict_config(&self) -> Config {
            Config::builder().output(&self.output).strict(true).build()
        }

        fn read_output(&self) -> ObjectImage {
            let bytes = fs::read(&self.output).unwrap();
            ObjectImage::parse(&bytes, &self.output).unwrap()
        }
    }

    impl Drop for LinkFixture {
        fn drop(&mut self) {
            for path in &self.paths {
                let _ = fs::remove_file(path);
            }
            let _ = fs::remove_file(&self.output);
        }
    }

    fn section<'a>(image: &'a ObjectImage, name: &str) -> &'a Section {
        image
            .sections
            .iter()
            .find(|section| section.name == name)
            .unwrap()
    }

    #[test]
    fn test_single_input_no_relocations() {
        let fixture = LinkFixture::new(
            "single",
            &[relocatable(
                &[SectionSpec::text(vec![0xC3])],
                &[SymbolSpec::func("main", 0)],
                &[],
            )],
        );
        let linker = Linker::link(&fixture.paths, &fixture.config()).unwrap();

        let output = fixture.read_output();
        assert_eq!(output.header.r#type, ElfType::Executable);
        assert_eq!(output.header.identifier.class, ElfClass::Elf64);
        assert_eq!(output.header.machine, ElfMachine::X86_64);
        assert_eq!(output.program_headers.len(), 2);
        assert!(output
            .program_headers
            .iter()
            .all(|ph| ph.r#type == ProgramHeaderType::Load));

        let text = section(&output, ".text");
        assert_eq!(text.data, [0xC3]);
        assert_eq!(text.header.offset, CONTENT_BASE);
        // main is at offset 0, so the entry point is the start of .text
        assert_eq!(
            output.header.entry,
            text.header.offset + VIRTUAL_ADDRESS_BASE
        );
        assert_eq!(linker.symbol_virtual_address("main"), Some(output.header.entry));
    }

    #[test]
    fn test_two_inputs_text_concatenation() {
        let fixture = LinkFixture::new(
            "concat",
            &[
                relocatable(
                    &[SectionSpec::text(vec![0x90, 0xC3])],
                    &[SymbolSpec::func("f", 0)],
                    &[],
                ),
                relocatable(
                    &[SectionSpec::text(vec![0x90, 0x90, 0xC3])],
                    &[SymbolSpec::func("g", 0)],
                    &[],
                ),
            ],
        );
        let linker = Linker::link(&fixture.paths, &fixture.config()).unwrap();

        let output = fixture.read_output();
        assert_eq!(section(&output, ".text").data, [0x90, 0xC3, 0x90, 0x90, 0xC3]);

        let symbols = &linker.output.image.symbols;
        let f = symbols.iter().find(|s| s.name == "f").unwrap();
        let g = symbols.iter().find(|s| s.name == "g").unwrap();
        assert_eq!(f.value, 0);
        assert_eq!(g.value, 2);
        assert_eq!(
            linker.output.section_by_name(".text"),
            Some(f.section_index as usize)
        );
        assert_eq!(f.section_index, g.section_index);
    }

    #[test]
    fn test_duplicate_strong_symbol() {
        let defines_dup = || {
            relocatable(
                &[SectionSpec::text(vec![0xC3])],
                &[SymbolSpec::func("dup", 0)],
                &[],
            )
        };
        let fixture = LinkFixture::new("dup", &[defines_dup(), defines_dup()]);
        assert_eq!(
            Linker::link(&fixture.paths, &fixture.config()).err(),
            Some(Error::DuplicateStrongSymbol {
                name: "dup".to_string()
            })
        );
        assert!(!fixture.output.exists());
    }

    #[test]
    fn test_weak_override() {
        let weak = relocatable(
            &[SectionSpec::text(vec![0x90, 0xC3])],
            &[SymbolSpec {
                name: "w",
                binding: SymbolBinding::Weak,
                r#type: SymbolType::Function,
                section: ".text",
                value: 0,
            }],
            &[],
        );
        let strong = relocatable(
            &[SectionSpec::text(vec![0x90, 0x90, 0xC3])],
            &[SymbolSpec::func("w", 1)],
            &[],
        );

        // the global definition wins regardless of input order
        let fixture = LinkFixture::new("weak-first", &[weak.clone(), strong.clone()]);
        let linker = Linker::link(&fixture.paths, &fixture.config()).unwrap();
        let w = linker.output.image.symbols.iter().find(|s| s.name == "w").unwrap();
        assert_eq!(w.binding(), Some(SymbolBinding::Global));
        // the strong definition merged second, after the weak object's two
        // .text bytes
        assert_eq!(w.value, 3);

        let fixture = LinkFixture::new("strong-first", &[strong, weak]);
        let linker = Linker::link(&fixture.paths, &fixture.config()).unwrap();
        let w = linker.output.image.symbols.iter().find(|s| s.name == "w").unwrap();
        assert_eq!(w.binding(), Some(SymbolBinding::Global));
        assert_eq!(w.value, 1);
    }

    #[test]
    fn test_two_weak_definitions_first_wins() {
        let first = relocatable(
            &[SectionSpec::text(vec![0x90, 0xC3])],
            &[SymbolSpec {
                name: "w",
                binding: SymbolBinding::Weak,
                r#type: SymbolType::Function,
                section: ".text",
                value: 0,
            }],
            &[],
        );
        let second = relocatable(
            &[SectionSpec::text(vec![0xC3])],
            &[SymbolSpec {
                name: "w",
                binding: SymbolBinding::Weak,
                r#type: SymbolType::Function,
                section: ".text",
                value: 0,
            }],
            &[],
        );
        let fixture = LinkFixture::new("weak-weak", &[first, second]);
        let linker = Linker::link(&fixture.paths, &fixture.config()).unwrap();
        let w = linker.output.image.symbols.iter().find(|s| s.name == "w").unwrap();
        assert_eq!(w.binding(), Some(SymbolBinding::Weak));
        assert_eq!(w.value, 0);
    }

    #[test]
    fn test_cross_object_pc32_call() {
        let caller = relocatable(
            &[SectionSpec::text(vec![0x90, 0x00, 0x00, 0x00, 0x00, 0xC3])],
            &[SymbolSpec::undefined("g")],
            &[RelocationSpec {
                section: ".text",
                offset: 1,
                kind: RelocationKind::PcRelative32 as u32,
                symbol: "g",
                addend: -4,
            }],
        );
        let callee = relocatable(
            &[SectionSpec::text(vec![0xC3])],
            &[SymbolSpec::func("g", 0)],
            &[],
        );
        let fixture = LinkFixture::new("pc32", &[caller, callee]);
        Linker::link(&fixture.paths, &fixture.config()).unwrap();

        let output = fixture.read_output();
        let text = section(&output, ".text");
        let text_address = text.header.offset + VIRTUAL_ADDRESS_BASE;
        // g landed after the caller's six bytes
        let expected = (text_address + 6) as i64 - (text_address + 1 + 4) as i64;
        assert_eq!(
            text.data[1..5],
            (expected as i32).to_le_bytes(),
        );
        assert_eq!(expected, 1);
    }

    #[test]
    fn test_unresolved_reference() {
        let fixture = LinkFixture::new(
            "unresolved",
            &[relocatable(
                &[SectionSpec::text(vec![0xC3])],
                &[SymbolSpec::func("main", 0), SymbolSpec::undefined("missing")],
                &[],
            )],
        );
        assert_eq!(
            Linker::link(&fixture.paths, &fixture.config()).err(),
            Some(Error::UnresolvedSymbols {
                names: vec!["missing".to_string()]
            })
        );
        assert!(!fixture.output.exists());
    }

    #[test]
    fn test_pc32_overflow() {
        let overflowing = || {
            relocatable(
                &[SectionSpec::text(vec![0x00, 0x00, 0x00, 0x00])],
                &[SymbolSpec::func("f", 0)],
                &[RelocationSpec {
                    section: ".text",
                    offset: 0,
                    kind: RelocationKind::PcRelative32 as u32,
                    symbol: "f",
                    addend: 0x8000_0000,
                }],
            )
        };

        let fixture = LinkFixture::new("overflow-strict", &[overflowing()]);
        assert_eq!(
            Linker::link(&fixture.paths, &fixture.strict_config()).err(),
            Some(Error::RelocationOverflow {
                symbol: "f".to_string(),
                value: 0x8000_0000,
            })
        );

        // by default the value is truncated and the output still written
        let fixture = LinkFixture::new("overflow-lenient", &[overflowing()]);
        Linker::link(&fixture.paths, &fixture.config()).unwrap();
        let output = fixture.read_output();
        assert_eq!(
            section(&output, ".text").data[0..4],
            (0x8000_0000u32 as i32).to_le_bytes()
        );
    }

    #[test]
    fn test_unsupported_relocation_kind() {
        let with_got_relocation = || {
            relocatable(
                &[SectionSpec::text(vec![0x00, 0x00, 0x00, 0x00])],
                &[SymbolSpec::func("f", 0)],
                &[RelocationSpec {
                    section: ".text",
                    offset: 0,
                    kind: RelocationKind::GotPcRelative as u32,
                    symbol: "f",
                    addend: 0,
                }],
            )
        };

        let fixture = LinkFixture::new("got-strict", &[with_got_relocation()]);
        assert_eq!(
            Linker::link(&fixture.paths, &fixture.strict_config()).err(),
            Some(Error::UnsupportedRelocation {
                value: RelocationKind::GotPcRelative as u32
            })
        );

        // by default the entry is skipped and the patch site left alone
        let fixture = LinkFixture::new("got-lenient", &[with_got_relocation()]);
        Linker::link(&fixture.paths, &fixture.config()).unwrap();
        let output = fixture.read_output();
        assert_eq!(section(&output, ".text").data, [0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_entry_point_preference() {
        let fixture = LinkFixture::new(
            "entry",
            &[relocatable(
                &[SectionSpec::text(vec![0x90, 0x90, 0xC3])],
                &[SymbolSpec::func("main", 1), SymbolSpec::func("_start", 2)],
                &[],
            )],
        );
        Linker::link(&fixture.paths, &fixture.config()).unwrap();
        let output = fixture.read_output();
        let text = section(&output, ".text");
        assert_eq!(
            output.header.entry,
            text.header.offset + VIRTUAL_ADDRESS_BASE + 2
        );
    }

    #[test]
    fn test_layout_invariants() {
        let fixture = LinkFixture::new(
            "layout",
            &[
                relocatable(
                    &[
                        SectionSpec::text(vec![0x90, 0x90, 0xC3]),
                        SectionSpec::progbits(
                            ".rodata",
                            crate::header::section::SectionHeaderFlags::ALLOC,
                            b"abc".to_vec(),
                        ),
                        SectionSpec::data(vec![0x01, 0x02]),
                        SectionSpec::bss(8),
                    ],
                    &[
                        SymbolSpec::func("main", 0),
                        SymbolSpec {
                            name: "table",
                            binding: SymbolBinding::Global,
                            r#type: SymbolType::Object,
                            section: ".data",
                            value: 0,
                        },
                    ],
                    &[],
                ),
                relocatable(
                    &[
                        SectionSpec::text(vec![0xC3]),
                        SectionSpec::data(vec![0x03]),
                        SectionSpec::bss(4),
                    ],
                    &[
                        SymbolSpec::func("helper", 0),
                        SymbolSpec {
                            name: "slot",
                            binding: SymbolBinding::Global,
                            r#type: SymbolType::Object,
                            section: ".bss",
                            value: 0,
                        },
                    ],
                    &[],
                ),
            ],
        );
        let linker = Linker::link(&fixture.paths, &fixture.config()).unwrap();
        let output = fixture.read_output();

        // every non-writable section precedes every writable one
        let first_writable = output
            .sections
            .iter()
            .position(|s| s.header.is_writable())
            .unwrap();
        assert!(output.sections[first_writable..]
            .iter()
            .all(|s| s.header.is_writable()));

        // offsets are monotonic, ranges disjoint, and the last section
        // ends at the section header table
        for pair in output.sections.windows(2) {
            assert!(pair[0].header.offset + pair[0].header.size <= pair[1].header.offset);
        }
        let last = output.sections.last().unwrap();
        assert!(last.header.offset + last.header.size <= output.header.section_header_offset);

        // merged contents concatenated in input order
        assert_eq!(section(&output, ".text").data, [0x90, 0x90, 0xC3, 0xC3]);
        assert_eq!(section(&output, ".data").data, [0x01, 0x02, 0x03]);
        assert_eq!(section(&output, ".bss").header.size, 12);

        // each segment's size is the sum of its own sections' sizes
        let (read_execute, read_write) = (&output.program_headers[0], &output.program_headers[1]);
        let non_writable_total: u64 = output
            .sections
            .iter()
            .filter(|s| !s.header.is_writable())
            .map(|s| s.header.size)
            .sum();
        let writable_total: u64 = output
            .sections
            .iter()
            .filter(|s| s.header.is_writable())
            .map(|s| s.header.size)
            .sum();
        assert_eq!(read_execute.file_size, non_writable_total);
        assert_eq!(read_write.file_size, writable_total);
        assert_eq!(
            read_write.offset,
            output.sections[first_writable].header.offset
        );
        assert_eq!(
            read_write.virtual_address,
            read_write.offset + VIRTUAL_ADDRESS_BASE
        );

        // every output symbol points at a real output section and its name
        // is recorded in the rebuilt string table
        let strtab = section(&output, ".strtab");
        for symbol in &linker.output.image.symbols {
            let index = symbol.section_index as usize;
            assert!(index < output.sections.len());
            assert!(!output.sections[index].name.is_empty());
            assert_eq!(
                read_string(&strtab.data, symbol.name_offset as usize),
                symbol.name
            );
        }

        // the output symbols are exactly the resolver's canonical names
        let output_names: HashSet<&str> = linker
            .output
            .image
            .symbols
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        let canonical_names: HashSet<&str> = linker
            .resolver
            .defined_names()
            .map(String::as_str)
            .collect();
        assert_eq!(output_names, canonical_names);
    }

    #[test]
    fn test_single_input_rejects_non_relocatable() {
        let fixture = LinkFixture::new(
            "exec-input",
            &[relocatable(
                &[SectionSpec::text(vec![0xC3])],
                &[SymbolSpec::func("main", 0)],
                &[],
            )],
        );
        Linker::link(&fixture.paths, &fixture.config()).unwrap();

        // feeding the produced executable back in is rejected
        let paths = vec![fixture.output.clone()];
        let second = std::env::temp_dir().join(format!("sold-{}-exec-input-second.out", std::process::id()));
        let config = Config::builder().output(&second).build();
        assert_eq!(
            Linker::link(&paths, &config).err(),
            Some(Error::UnsupportedType {
                value: ElfType::Executable as u16
            })
        );
        let _ = fs::remove_file(&second);
    }
}

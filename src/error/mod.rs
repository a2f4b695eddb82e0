//! Error types for object parsing, symbol resolution, and linking

use std::path::PathBuf;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
/// Error type for errors during a link
pub enum Error {
    #[error("An I/O error occurred: {kind}")]
    /// An I/O error occurred while encoding or decoding a record
    Io {
        /// The kind of I/O error which occurred
        kind: std::io::ErrorKind,
    },
    #[error("An I/O error occurred on {path}: {kind}")]
    /// An I/O error occurred while opening, reading, or writing a named file
    File {
        /// The path of the file being accessed
        path: PathBuf,
        /// The kind of I/O error which occurred
        kind: std::io::ErrorKind,
    },
    #[error("Input file {path} is {size} bytes, larger than the 1 GiB input limit")]
    /// An input file exceeds the input size limit
    InputTooLarge {
        /// The path of the rejected file
        path: PathBuf,
        /// The size of the rejected file in bytes
        size: u64,
    },
    #[error("Input is {actual} bytes, smaller than the declared {expected} bytes")]
    /// The input buffer is smaller than its headers declare
    ShortRead {
        /// The number of bytes the headers require
        expected: usize,
        /// The number of bytes actually present
        actual: usize,
    },
    #[error("Truncated {record} record at offset {offset:#x}")]
    /// A fixed-size record is cut off by the end of the input
    TruncatedRecord {
        /// The name of the record being decoded
        record: &'static str,
        /// The offset at which the record begins
        offset: u64,
    },
    #[error("Invalid magic in ELF file")]
    /// The input does not begin with the ELF magic bytes
    InvalidMagic,
    #[error("Unsupported ELF class {class}, only ELFCLASS64 is supported")]
    /// The input is not a 64-bit ELF object
    UnsupportedClass {
        /// The class byte found in the identification field
        class: u8,
    },
    #[error("Unsupported data encoding {encoding}, only little-endian is supported")]
    /// The input is not little-endian
    UnsupportedData {
        /// The data encoding byte found in the identification field
        encoding: u8,
    },
    #[error("Unsupported machine {machine:#x}, only x86-64 is supported")]
    /// The input targets a machine other than x86-64
    UnsupportedMachine {
        /// The machine value found in the header
        machine: u16,
    },
    #[error("Unsupported object type {value}, only relocatable inputs are supported")]
    /// The input is not a relocatable object file
    UnsupportedType {
        /// The object type value found in the header
        value: u16,
    },
    #[error("Unknown section type {value:#x}")]
    /// A section header's type is outside the known set
    UnsupportedSectionType {
        /// The section type value
        value: u32,
    },
    #[error("Unknown program header type {value:#x}")]
    /// A program header's type is outside the known set
    UnsupportedSegmentType {
        /// The program header type value
        value: u32,
    },
    #[error("No symbol table found")]
    /// The input has no section of type SymbolTable
    MissingSymbolTable,
    #[error("No string table found")]
    /// The input has no .strtab string table section
    MissingStringTable,
    #[error("Two strong symbols with the same name: {name}")]
    /// Two inputs both define the same global symbol
    DuplicateStrongSymbol {
        /// The name defined twice
        name: String,
    },
    #[error("Undefined references remain after all inputs: {names:?}")]
    /// References remain with no definition in any input
    UnresolvedSymbols {
        /// The names with no definition, in sorted order
        names: Vec<String>,
    },
    #[error("Unsupported relocation type {value}")]
    /// A relocation's type is outside the supported set
    UnsupportedRelocation {
        /// The relocation type value
        value: u32,
    },
    #[error("Relocation against {symbol} does not fit its patch site: {value:#x}")]
    /// A PC-relative relocation's value overflows the signed patch width
    RelocationOverflow {
        /// The name of the symbol the relocation references
        symbol: String,
        /// The computed relocation value
        value: i64,
    },
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Io { kind: value.kind() }
    }
}

/// Result type alias for link operations
pub type Result<T> = std::result::Result<T, Error>;

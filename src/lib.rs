//! A static linker for ELF64 object files targeting x86-64
//!
//! Consumes one or more relocatable object files and produces a single
//! executable with a valid file header, a program header table describing
//! the loadable segments, the merged section contents, a section header
//! table, and all supported symbol relocations applied in place.

#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic, missing_docs)]

use std::{
    io::{Read, Seek, Write},
    path::{Path, PathBuf},
};

use typed_builder::TypedBuilder;

pub mod arch;
pub mod base;
pub mod error;
pub mod header;
pub mod linker;
pub mod object;
pub mod relocation;
pub mod resolver;
pub mod symbol;

pub use error::{Error, Result};

/// Decode an owned instance of a type from a reader
pub trait FromReader<R>
where
    R: Read + Seek,
    Self: Sized,
{
    /// The error type for this operation
    type Error;

    /// Decode an instance of this type from a reader
    fn from_reader(reader: &mut R) -> std::result::Result<Self, Self::Error>;
}

/// Encode an instance of a type to a writer
pub trait ToWriter<W>
where
    W: Write,
    Self: Sized,
{
    /// The error type for this operation
    type Error;

    /// Encode an instance of this type to a writer
    fn to_writer(&self, writer: &mut W) -> std::result::Result<(), Self::Error>;
}

/// A type which always has a known size when written to a writer
pub trait HasWrittenSize {
    /// The size when written
    const SIZE: usize;
}

#[derive(Debug, Clone, TypedBuilder)]
/// A configuration for a link invocation
pub struct Config {
    #[builder(default = PathBuf::from("a.out"), setter(into))]
    /// The path the executable is written to
    pub output: PathBuf,
    #[builder(default)]
    /// Whether conditions that are warnings by default (unsupported
    /// relocation kinds, relocation overflow) abort the link instead
    pub strict: bool,
    #[builder(default)]
    /// Whether per-phase wall clock timings are reported
    pub profile: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::builder().build()
    }
}

/// Link the given relocatable object files into one executable, written to
/// the path configured in `config`
pub fn link<P>(inputs: &[P], config: &Config) -> Result<()>
where
    P: AsRef<Path>,
{
    linker::Linker::link(inputs, config).map(|_| ())
}

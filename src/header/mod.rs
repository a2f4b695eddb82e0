//! Implementations of the ELF file, section, and program header records

pub mod elf;
pub mod program;
pub mod section;

//! Architecture specific definitions for x86_64

// NOTE: x86_64 defines no e_flags values

use num_derive::{FromPrimitive, ToPrimitive};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive, ToPrimitive)]
#[non_exhaustive]
/// Relocation types for x86_64
///
/// Only [`RelocationKind::Absolute64`], [`RelocationKind::PcRelative32`],
/// and [`RelocationKind::PcRelative64`] are applied by the relocation
/// engine; the rest are named so skipped entries can be reported by name
/// instead of by number.
pub enum RelocationKind {
    /// No relocation
    None = 0,
    /// Direct 64-bit: S + A
    Absolute64 = 1,
    /// PC-relative 32-bit signed: S + A - P
    PcRelative32 = 2,
    /// 32-bit GOT entry offset
    Got32 = 3,
    /// 32-bit PLT-relative address
    PltRelative32 = 4,
    /// Copy the symbol at runtime
    Copy = 5,
    /// Set a GOT entry to the address of the symbol
    GlobalData = 6,
    /// Set a GOT entry to the address of the symbol's PLT entry
    JumpSlot = 7,
    /// Adjust by the load address
    Relative = 8,
    /// 32-bit signed PC-relative offset to the symbol's GOT entry
    GotPcRelative = 9,
    /// Direct 32-bit zero-extended: S + A
    Absolute32 = 10,
    /// Direct 32-bit sign-extended: S + A
    Absolute32Signed = 11,
    /// Direct 16-bit zero-extended: S + A
    Absolute16 = 12,
    /// PC-relative 16-bit signed: S + A - P
    PcRelative16 = 13,
    /// Direct 8-bit sign-extended: S + A
    Absolute8 = 14,
    /// PC-relative 8-bit signed: S + A - P
    PcRelative8 = 15,
    /// PC-relative 64-bit: S + A - P
    PcRelative64 = 24,
}

impl RelocationKind {
    /// The width in bytes of the patch the relocation engine writes for
    /// this kind, or `None` when the kind is outside the supported set
    pub fn patch_width(&self) -> Option<usize> {
        match self {
            RelocationKind::Absolute64 | RelocationKind::PcRelative64 => Some(8),
            RelocationKind::PcRelative32 => Some(4),
            _ => None,
        }
    }

    /// Whether the relocated value is computed relative to the patch site
    /// address
    pub fn is_pc_relative(&self) -> bool {
        matches!(
            self,
            RelocationKind::PcRelative8
                | RelocationKind::PcRelative16
                | RelocationKind::PcRelative32
                | RelocationKind::PcRelative64
        )
    }
}

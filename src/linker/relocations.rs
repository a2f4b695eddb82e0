//! Application of x86-64 relocations against the final layout
//!
//! Runs after layout, when every output section and canonical symbol has
//! its final virtual address. Each relocation is evaluated as S + A (or
//! S + A - P for PC-relative kinds) and the result is written
//! little-endian over the patch site in the output section's contents.

use num_traits::FromPrimitive;
use tracing::{debug, warn};

use crate::{arch::x86_64::RelocationKind, error::Error, relocation::Relocation, Result};

use super::Linker;

impl Linker {
    /// Apply every relocation carried by every output section, in the
    /// order the merge appended them
    pub(super) fn relocate(&mut self) -> Result<()> {
        for section in 0..self.output.image.sections.len() {
            if self.output.image.sections[section].relocations.is_empty() {
                continue;
            }
            let section_address = self.section_virtual_address(section);
            let relocations = self.output.image.sections[section].relocations.clone();
            for relocation in &relocations {
                self.apply(section, section_address, relocation)?;
            }
        }
        Ok(())
    }

    /// Apply one relocation to the section holding its patch site
    fn apply(&mut self, section: usize, section_address: u64, relocation: &Relocation) -> Result<()> {
        let Some(kind) = RelocationKind::from_u32(relocation.kind_value()) else {
            return self.unsupported(relocation);
        };
        if kind == RelocationKind::None {
            debug!("Skipping no-op relocation against {}", relocation.symbol_name);
            return Ok(());
        }
        let Some(width) = kind.patch_width() else {
            return self.unsupported(relocation);
        };

        let Some(symbol_address) = self.symbol_virtual_address(&relocation.symbol_name) else {
            // The name resolved, but its definition was not carried into
            // the output (it lives in a section the merge dropped)
            if self.config.strict {
                return Err(Error::UnresolvedSymbols {
                    names: vec![relocation.symbol_name.clone()],
                });
            }
            warn!(
                "Relocation against {} has no definition in the output, skipping",
                relocation.symbol_name
            );
            return Ok(());
        };

        let place = section_address + relocation.offset;
        let mut value = (symbol_address as i64).wrapping_add(relocation.addend);
        if kind.is_pc_relative() {
            value = value.wrapping_sub(place as i64);
        }
        debug!(
            "Applying {kind:?} against {} at {place:#x}: {value:#x}",
            relocation.symbol_name
        );

        let strict = self.config.strict;
        let start = relocation.offset as usize;
        let data = &mut self.output.image.sections[section].data;
        if start + width > data.len() {
            if strict {
                return Err(Error::TruncatedRecord {
                    record: "relocation patch site",
                    offset: relocation.offset,
                });
            }
            warn!(
                "Patch site for relocation against {} lies outside its section, skipping",
                relocation.symbol_name
            );
            return Ok(());
        }

        if width == 8 {
            data[start..start + 8].copy_from_slice(&value.to_le_bytes());
        } else {
            let narrowed = match i32::try_from(value) {
                Ok(narrowed) => narrowed,
                Err(_) => {
                    if strict {
                        return Err(Error::RelocationOverflow {
                            symbol: relocation.symbol_name.clone(),
                            value,
                        });
                    }
                    warn!(
                        "Relocation against {} overflows its 32-bit patch site, truncating",
                        relocation.symbol_name
                    );
                    value as i32
                }
            };
            data[start..start + 4].copy_from_slice(&narrowed.to_le_bytes());
        }

        Ok(())
    }

    /// Report a relocation outside the supported set: an error in strict
    /// mode, a warning otherwise
    fn unsupported(&self, relocation: &Relocation) -> Result<()> {
        if self.config.strict {
            return Err(Error::UnsupportedRelocation {
                value: relocation.kind_value(),
            });
        }
        warn!(
            "Unsupported relocation type {} against {}, skipping",
            relocation.kind_value(),
            relocation.symbol_name
        );
        Ok(())
    }
}

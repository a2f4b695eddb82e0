//! Global symbol resolution across input objects
//!
//! The resolver keeps one entry per unique symbol name and arbitrates
//! between strong definitions, weak definitions, and undefined references
//! as symbols arrive in input order. Canonical definitions are recorded as
//! (object index, symbol index) pairs rather than pointers so they stay
//! valid while images move and mutate.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::{
    error::Error,
    object::ObjectImage,
    symbol::{Symbol, SymbolBinding, SymbolType},
    Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// A reference to a symbol in a parsed input: the index of its object and
/// its slot in that object's symbol table
pub struct SymbolRef {
    /// The index of the input object in parse order
    pub object: usize,
    /// The index of the symbol in its object's symbol table
    pub symbol: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// The resolution state of one symbol name
pub enum ResolverEntry {
    /// Only undefined references to the name have been seen
    Undefined,
    /// The name has a strong definition; no other strong definition may
    /// appear
    Defined(SymbolRef),
    /// The name has a weak definition which a strong definition may still
    /// displace
    Weak(SymbolRef),
}

impl ResolverEntry {
    /// The canonical definition this entry has settled on, if any
    pub fn canonical(&self) -> Option<SymbolRef> {
        match self {
            ResolverEntry::Undefined => None,
            ResolverEntry::Defined(reference) | ResolverEntry::Weak(reference) => Some(*reference),
        }
    }
}

#[derive(Debug, Default)]
/// The global name-indexed symbol table for one link
pub struct Resolver {
    entries: HashMap<String, ResolverEntry>,
    undefined: HashSet<String>,
}

/// How one incoming symbol participates in resolution
enum Participation {
    Reference,
    StrongDefinition,
    WeakDefinition,
    Ignored,
}

fn classify(symbol: &Symbol) -> Participation {
    if symbol.name.is_empty() {
        return Participation::Ignored;
    }
    match (symbol.r#type(), symbol.binding()) {
        (Some(SymbolType::NoType), Some(SymbolBinding::Global | SymbolBinding::Weak)) => {
            Participation::Reference
        }
        (
            Some(SymbolType::Function | SymbolType::Object),
            Some(SymbolBinding::Global),
        ) => Participation::StrongDefinition,
        (
            Some(SymbolType::Function | SymbolType::Object),
            Some(SymbolBinding::Weak),
        ) => Participation::WeakDefinition,
        // Section and File symbols participate in the output through
        // their sections; local symbols never resolve across objects
        _ => Participation::Ignored,
    }
}

impl Resolver {
    /// Create an empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one parsed symbol into the table. Must be called once per
    /// symbol, in input order, so first-wins ties are deterministic.
    ///
    /// Fails with [`Error::DuplicateStrongSymbol`] when two strong
    /// definitions of the same name meet.
    pub fn update(&mut self, symbol: &Symbol, origin: SymbolRef) -> Result<()> {
        let participation = classify(symbol);
        let name = symbol.name.as_str();

        match (self.entries.get(name), &participation) {
            (_, Participation::Ignored) => {}
            (None, Participation::Reference) => {
                self.entries.insert(name.to_string(), ResolverEntry::Undefined);
                self.undefined.insert(name.to_string());
            }
            (None, Participation::StrongDefinition) => {
                self.entries
                    .insert(name.to_string(), ResolverEntry::Defined(origin));
            }
            (None, Participation::WeakDefinition) => {
                self.entries
                    .insert(name.to_string(), ResolverEntry::Weak(origin));
            }
            (Some(ResolverEntry::Undefined), Participation::Reference) => {}
            (Some(ResolverEntry::Undefined), Participation::StrongDefinition) => {
                self.entries
                    .insert(name.to_string(), ResolverEntry::Defined(origin));
                self.undefined.remove(name);
            }
            (Some(ResolverEntry::Undefined), Participation::WeakDefinition) => {
                self.entries
                    .insert(name.to_string(), ResolverEntry::Weak(origin));
                self.undefined.remove(name);
            }
            (Some(ResolverEntry::Weak(_)), Participation::Reference) => {}
            (Some(ResolverEntry::Weak(_)), Participation::WeakDefinition) => {
                // first weak definition wins
                debug!("Keeping first weak definition of {name}");
            }
            (Some(ResolverEntry::Weak(_)), Participation::StrongDefinition) => {
                self.entries
                    .insert(name.to_string(), ResolverEntry::Defined(origin));
            }
            (Some(ResolverEntry::Defined(_)), Participation::Reference) => {}
            (Some(ResolverEntry::Defined(_)), Participation::WeakDefinition) => {}
            (Some(ResolverEntry::Defined(_)), Participation::StrongDefinition) => {
                return Err(Error::DuplicateStrongSymbol {
                    name: name.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Verify every reference found a definition once all inputs have been
    /// processed
    pub fn finish(&self) -> Result<()> {
        if self.undefined.is_empty() {
            return Ok(());
        }
        let mut names: Vec<String> = self.undefined.iter().cloned().collect();
        names.sort();
        Err(Error::UnresolvedSymbols { names })
    }

    /// The canonical definition of a name, if one has been seen
    pub fn canonical(&self, name: &str) -> Option<SymbolRef> {
        self.entries.get(name).and_then(ResolverEntry::canonical)
    }

    /// The names in the table, for post-link verification
    pub fn defined_names(&self) -> impl Iterator<Item = &String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.canonical().is_some())
            .map(|(name, _)| name)
    }

    /// Bucket every canonical definition under the input section that owns
    /// it, keyed by (object index, section index). This index drives the
    /// merge: when a section is concatenated into the output, the
    /// definitions it owns are re-homed with it.
    pub fn defined_by_section(
        &self,
        objects: &[ObjectImage],
    ) -> HashMap<(usize, usize), Vec<SymbolRef>> {
        let mut index: HashMap<(usize, usize), Vec<SymbolRef>> = HashMap::new();
        for entry in self.entries.values() {
            let Some(reference) = entry.canonical() else {
                continue;
            };
            let symbol = &objects[reference.object].symbols[reference.symbol];
            if !symbol.has_defining_section() {
                debug!(
                    "Canonical definition {} lives in a reserved section, not re-homed",
                    symbol.name
                );
                continue;
            }
            index
                .entry((reference.object, symbol.section_index as usize))
                .or_default()
                .push(reference);
        }
        // Stable order within a bucket regardless of hash iteration
        for bucket in index.values_mut() {
            bucket.sort_by_key(|reference| reference.symbol);
        }
        index
    }
}

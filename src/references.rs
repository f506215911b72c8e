//! Reverse index from symbol to every place it occurs.

use std::collections::HashMap;
use std::hash::Hash;

use rayon::prelude::*;

use crate::frontend::SymbolResolver;
use crate::types::{FileId, Package, SourceFileInfo, SymbolReference};

/// Occurrences of every resolved symbol, in discovery order
/// (package order, then file order, then source order).
#[derive(Debug)]
pub struct ReferenceIndex<S> {
    /// Symbol to its occurrences.
    refs: HashMap<S, Vec<SymbolReference>>,
}

impl<S: Clone + Eq + Hash + Send> ReferenceIndex<S> {
    /// Walk every parsed file and record each identifier against the symbol
    /// it resolves to.
    ///
    /// An identifier denoting an embedded field is recorded twice: against
    /// the field and against the embedded type. Unresolved identifiers are
    /// skipped. Packages are scanned in parallel, each into its own list, and
    /// the lists are merged in package order.
    pub fn build<R>(packages: &[Package], resolver: &R) -> Self
    where
        R: SymbolResolver<Symbol = S>,
    {
        let per_package: Vec<Vec<(S, SymbolReference)>> = packages
            .par_iter()
            .map(|pkg| return collect_package_references(pkg, resolver))
            .collect();

        let mut refs: HashMap<S, Vec<SymbolReference>> = HashMap::new();
        for (symbol, reference) in per_package.into_iter().flatten() {
            refs.entry(symbol).or_default().push(reference);
        }
        return Self { refs };
    }

    /// Whether no symbol was resolved at all.
    pub fn is_empty(&self) -> bool {
        return self.refs.is_empty();
    }

    /// Number of distinct symbols with at least one occurrence.
    pub fn len(&self) -> usize {
        return self.refs.len();
    }

    /// Occurrences of one symbol; empty if it never occurs.
    pub fn references(&self, symbol: &S) -> &[SymbolReference] {
        return self.refs.get(symbol).map(Vec::as_slice).unwrap_or_default();
    }
}

/// Occurrences found in one package's files, in file order.
fn collect_package_references<R: SymbolResolver>(
    pkg: &Package,
    resolver: &R,
) -> Vec<(R::Symbol, SymbolReference)> {
    let mut found = Vec::new();
    for (index, file) in pkg.files().iter().enumerate() {
        if file.ast.is_none() {
            continue;
        }
        let id = FileId { index, package: pkg.id };
        collect_file_references(id, file, resolver, &mut found);
    }
    return found;
}

/// Occurrences found in one file, in source order.
fn collect_file_references<R: SymbolResolver>(
    id: FileId,
    file: &SourceFileInfo,
    resolver: &R,
    found: &mut Vec<(R::Symbol, SymbolReference)>,
) {
    for ident in resolver.identifiers(file) {
        let Some(symbol) = resolver.object_of(file, &ident) else {
            continue;
        };
        let reference = SymbolReference { file: id, position: ident.position };
        let embedded = resolver.is_embedded_field(&symbol);
        found.push((symbol, reference));

        // The embedded type is navigable on its own, so it gets the occurrence too.
        if embedded && let Some(used) = resolver.used_object(file, &ident) {
            found.push((used, reference));
        }
    }
}

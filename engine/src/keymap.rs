//! User-defined key mappings (`:map`, `:noremap`, `:unmap`) keyed by the
//! mode they apply in. Grounded in `core/src/keymap.rs`'s `MapSet`/
//! `KeyMap` (per-`State` `EnumMap` of chord tries) but generalized from
//! compiled-in `Action` closures to data: mappings here are defined at
//! runtime via `:map`, not wired up in Rust.

use std::collections::HashMap;

use crate::input::Input;
use crate::mode::Mode;

/// Bounded so a mapping that (directly or through `:map`, not
/// `:noremap`) expands into itself can't recurse forever; matches the
/// conventional Vim `maxmapdepth` default order of magnitude.
const MAX_EXPANSION_DEPTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapMode {
    Normal,
    Visual,
    Insert,
    OperatorPending,
}

impl MapMode {
    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Normal => MapMode::Normal,
            Mode::Visual(_) => MapMode::Visual,
            Mode::Insert | Mode::Replace => MapMode::Insert,
            Mode::Cmdline => MapMode::Normal,
        }
    }
}

#[derive(Debug, Clone)]
struct Mapping {
    rhs: Vec<Input>,
    /// `:noremap`-defined mappings never get re-expanded even if their
    /// right-hand side happens to match another mapping's left-hand
    /// side; `:map`-defined ones do.
    recursive: bool,
}

#[derive(Debug, Default)]
pub struct MappingResolver {
    tables: HashMap<MapMode, HashMap<Vec<Input>, Mapping>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapLookup {
    /// No mapping starts with this prefix; pass `lhs` through unchanged.
    NoMatch,
    /// `lhs` is itself a complete mapping's left-hand side.
    Match(Vec<Input>),
    /// `lhs` is a strict prefix of some mapping's left-hand side; the
    /// host should keep buffering.
    Prefix,
}

impl MappingResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, mode: MapMode, lhs: Vec<Input>, rhs: Vec<Input>, recursive: bool) {
        self.tables
            .entry(mode)
            .or_default()
            .insert(lhs, Mapping { rhs, recursive });
    }

    pub fn unmap(&mut self, mode: MapMode, lhs: &[Input]) -> bool {
        self.tables
            .get_mut(&mode)
            .map(|t| t.remove(lhs).is_some())
            .unwrap_or(false)
    }

    pub fn clear(&mut self, mode: MapMode) {
        self.tables.remove(&mode);
    }

    fn lookup_once(&self, mode: MapMode, buffer: &[Input]) -> MapLookup {
        let Some(table) = self.tables.get(&mode) else {
            return MapLookup::NoMatch;
        };
        if let Some(mapping) = table.get(buffer) {
            return MapLookup::Match(mapping.rhs.clone());
        }
        let is_prefix = table
            .keys()
            .any(|lhs| lhs.len() > buffer.len() && lhs[..buffer.len()] == buffer[..]);
        if is_prefix {
            MapLookup::Prefix
        } else {
            MapLookup::NoMatch
        }
    }

    /// Resolves `buffer` against the mapping table for `mode`, fully
    /// expanding any `:map`-defined (recursive) mapping whose expansion
    /// is itself a complete mapping, up to `MAX_EXPANSION_DEPTH` levels.
    /// Returns `Prefix`/`NoMatch` for the caller to keep buffering or
    /// forward the buffer verbatim, `Match(expanded)` once resolved.
    pub fn lookup(&self, mode: MapMode, buffer: &[Input]) -> MapLookup {
        match self.lookup_once(mode, buffer) {
            MapLookup::Match(rhs) => {
                let mapping_is_recursive = self
                    .tables
                    .get(&mode)
                    .and_then(|t| t.get(buffer))
                    .map(|m| m.recursive)
                    .unwrap_or(false);
                if !mapping_is_recursive {
                    return MapLookup::Match(rhs);
                }
                let mut expanded = rhs;
                for _ in 0..MAX_EXPANSION_DEPTH {
                    match self.lookup_once(mode, &expanded) {
                        MapLookup::Match(next) if next != expanded => expanded = next,
                        _ => break,
                    }
                }
                MapLookup::Match(expanded)
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Input;

    fn i(c: char) -> Input {
        Input::char(c)
    }

    #[test]
    fn exact_match_resolves() {
        let mut r = MappingResolver::new();
        r.map(MapMode::Normal, vec![i('j')], vec![i('g'), i('g')], false);
        assert_eq!(
            r.lookup(MapMode::Normal, &[i('j')]),
            MapLookup::Match(vec![i('g'), i('g')])
        );
    }

    #[test]
    fn prefix_requests_more_input() {
        let mut r = MappingResolver::new();
        r.map(
            MapMode::Normal,
            vec![i('j'), i('j')],
            vec![Input::key(crate::input::KeyCode::Esc)],
            true,
        );
        assert_eq!(r.lookup(MapMode::Normal, &[i('j')]), MapLookup::Prefix);
    }

    #[test]
    fn noremap_does_not_re_expand() {
        let mut r = MappingResolver::new();
        r.map(MapMode::Normal, vec![i('a')], vec![i('b')], false);
        r.map(MapMode::Normal, vec![i('b')], vec![i('c')], false);
        assert_eq!(
            r.lookup(MapMode::Normal, &[i('a')]),
            MapLookup::Match(vec![i('b')])
        );
    }

    #[test]
    fn recursive_map_expands_transitively() {
        let mut r = MappingResolver::new();
        r.map(MapMode::Normal, vec![i('a')], vec![i('b')], true);
        r.map(MapMode::Normal, vec![i('b')], vec![i('c')], true);
        assert_eq!(
            r.lookup(MapMode::Normal, &[i('a')]),
            MapLookup::Match(vec![i('c')])
        );
    }
}

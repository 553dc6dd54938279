//! Object-graph serializer with a compact, versionable binary format.

/// Node format, schema-directed classify/declassify walkers, and file wrappers.
pub mod classify;

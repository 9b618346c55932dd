//! Tourly event store.
//!
//! Holds booking event streams in process memory. Durable storage is a
//! deployment concern outside this workspace.

pub mod memory_event_repository;

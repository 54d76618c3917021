//! Protocol decoding modules.
//!
//! Each protocol follows a layered structure:
//! - `layout`: wire constants and byte offsets (source of truth)
//! - `reader`: safe byte access and protocol conventions
//! - `frame`: stream framing, stateful across reads
//! - `parser`: domain-level decoding (no direct byte indexing)
//! - `error`: explicit, actionable errors
//!
//! Decoders are pure and contain no I/O; sources and the poll layer handle
//! device access and scheduling.

pub mod ted;

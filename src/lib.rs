// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
#![allow(clippy::too_many_arguments)]
// - 'source.rs' uses mmap to map a file into memory

//! # rootscope
//!
//! A high-performance, cross-platform framework for reading and writing ROOT-style
//! scientific binary containers. Built in pure Rust, `rootscope` implements the
//! versioned, self-describing object serialization format used by decades of physics
//! datasets: byte-exact, losslessly, and without the original writer.
//!
//! ## Features
//!
//! - **📦 Byte-exact codec** - Big-endian primitives, version tags and byte-count frames
//!   reproduced exactly, including the legacy quirks old files rely on
//! - **🔍 Polymorphic object graphs** - Class-factory dispatch with back-reference
//!   resolution, so shared objects round-trip as shared
//! - **⚡ Columnar row streaming** - Leaf bindings resolve type dispatch once per
//!   dataset-open and then stream rows without per-row allocation
//! - **🔧 Cross-platform** - Works on Windows, Linux, macOS, and any Rust-supported
//!   platform
//! - **🛡️ Memory safe** - Bounds-checked parsing with sticky-error buffers; corrupt
//!   input fails loudly, never silently
//!
//! ## Quick Start
//!
//! Add `rootscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! rootscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! ```rust
//! use rootscope::prelude::*;
//!
//! // Encode a named object and decode it back
//! let named = Named::new("run2024", "physics run");
//! let mut w = WriteBuffer::new();
//! named.marshal(&mut w)?;
//! let bytes = w.into_bytes()?;
//!
//! let mut out = Named::default();
//! out.unmarshal(&mut ReadBuffer::new(&bytes))?;
//! assert_eq!(out.name, "run2024");
//! # Ok::<(), rootscope::Error>(())
//! ```
//!
//! ### Row Streaming
//!
//! Columns ("leaves") bind once to typed destination slots, then stream row by row:
//!
//! ```rust
//! use rootscope::prelude::*;
//!
//! struct NoCounts;
//! impl CountResolver for NoCounts {
//!     fn count_fn(&self, _leaf: &str) -> Option<CountFn> { None }
//!     fn count_leaf(&self, _leaf: &str) -> Option<&Leaf> { None }
//! }
//!
//! let mut leaf = Leaf::new(LeafKind::Float64);
//! leaf.set_name("energy");
//!
//! let energy = Slot::<f64>::new();
//! let binding = LeafBinding::bind(&leaf, LeafTarget::F64(energy.clone()), &NoCounts)?;
//!
//! let mut w = WriteBuffer::new();
//! w.write_f64(13.6);
//! let bytes = w.into_bytes()?;
//!
//! binding.read_row(&mut ReadBuffer::new(&bytes))?;
//! assert_eq!(energy.get(), 13.6);
//! # Ok::<(), rootscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `rootscope` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`buffer`] - The versioned buffer protocol: primitive codec, framing, sticky
//!   errors, back-references
//! - [`objects`] - The storable object capability and the base object types
//! - [`registry`] - The class factory resolving polymorphic type tags
//! - [`containers`] - Codecs for the standard container classes
//! - [`tree`] - Columnar leaf descriptors, typed bindings and row streaming
//! - [`source`] - Memory-mapped byte acquisition for file-backed hosts
//!
//! Byte acquisition beyond [`source`] (seek tables, compression blocks, network
//! transport) is deliberately out of scope: hosts resolve those and hand the codec a
//! contiguous byte region.
//!
//! ## Concurrency Model
//!
//! Buffers are exclusively owned by one (de)serialization call graph and must not be
//! shared concurrently; nested decode recurses synchronously within the same buffer.
//! The class registry is populated at startup and read-only during decoding. Row
//! streaming is a synchronous pull loop driven entirely by the caller.

#[macro_use]
pub(crate) mod error;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use rootscope::prelude::*;
///
/// let mut w = WriteBuffer::new();
/// w.write_u32(42);
/// let bytes = w.into_bytes()?;
/// assert_eq!(ReadBuffer::new(&bytes).read_u32(), 42);
/// # Ok::<(), rootscope::Error>(())
/// ```
pub mod prelude;

/// The versioned buffer protocol.
///
/// Primitive big-endian encode/decode, version-tag and byte-count framing, sticky
/// first-error cursors and the polymorphic object operations with back-reference
/// resolution.
pub mod buffer;

/// Codecs for the standard container classes of the format.
pub mod containers;

/// The storable object capability and base object types.
pub mod objects;

/// The class factory mapping on-disk class names to constructors.
pub mod registry;

/// Memory-mapped byte acquisition for file-backed hosts.
pub mod source;

/// Columnar leaf descriptors, typed bindings and row streaming.
pub mod tree;

/// The generic Error type covering all errors this library can return
pub use error::Error;

/// The result type used throughout rootscope
pub use error::Result;

/// Decode cursor over one serialized byte region
pub use buffer::ReadBuffer;

/// Encode cursor producing one serialized byte region
pub use buffer::WriteBuffer;

/// The storable object capability trait
pub use objects::RootObject;

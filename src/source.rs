//! Memory-mapped byte acquisition for hosts feeding the codec from disk.
//!
//! The codec itself only ever consumes a contiguous, already-resident byte region;
//! seek tables, compression and transport belong to external collaborators. This module
//! provides the [`crate::source::MappedFile`] backend that maps a file read-only into
//! the process's address space so such a region can be handed to
//! [`crate::buffer::reader::ReadBuffer`] without loading the whole file upfront.
//!
//! # Usage Examples
//!
//! ```rust,no_run
//! use rootscope::source::MappedFile;
//! use rootscope::ReadBuffer;
//! use std::path::Path;
//!
//! let file = MappedFile::open(Path::new("dataset.bin"))?;
//! let mut r = ReadBuffer::new(file.data());
//! let _tag = r.read_u32();
//! # Ok::<(), rootscope::Error>(())
//! ```

use memmap2::Mmap;
use std::{fs, path::Path};

use crate::{Error, Result};

/// A read-only memory-mapped file serving as a contiguous byte region.
///
/// The operating system pages content in on demand, so large legacy containers can be
/// opened without reading them into memory. All slice access is bounds-checked.
pub struct MappedFile {
    data: Mmap,
}

impl MappedFile {
    /// Map a file read-only into memory.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped, and
    /// [`crate::Error::Empty`] for an empty file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = fs::File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Err(Error::Empty);
        }

        // Safety: the map is read-only and the file handle stays open for its lifetime
        let data = unsafe { Mmap::map(&file)? };
        Ok(MappedFile { data })
    }

    /// The complete mapped byte region.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Length of the mapped region in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the mapped region is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// A bounds-checked slice of the mapped region.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `offset + len` exceeds the region.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        if offset + len > self.data.len() {
            return Err(out_of_bounds_error!());
        }
        Ok(&self.data[offset..offset + len])
    }
}

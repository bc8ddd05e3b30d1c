use crate::persistence::region::{AtomicBuffer, RegionError};
use log::info;
use memmap2::{MmapMut, MmapOptions};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// File-backed region that owns the mapping handed out as [`AtomicBuffer`] views.
#[derive(Debug)]
pub struct MappedRegionFile {
    path: PathBuf,
    mmap: MmapMut,
    base: *mut u8,
    len: usize,
}

impl MappedRegionFile {
    /// Deletes any file at `path`, then creates and maps a zero-filled file of `len` bytes.
    pub fn create_new(path: impl Into<PathBuf>, len: usize) -> Result<Self, RegionError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        if let Err(err) = fs::remove_file(&path) {
            if err.kind() != io::ErrorKind::NotFound {
                return Err(err.into());
            }
        }
        let file = OpenOptions::new()
            .create_new(true)
            .read(true)
            .write(true)
            .open(&path)?;
        file.set_len(len as u64)?;
        file.sync_all()?;
        let region = Self::map(path, &file, len)?;
        info!(
            "event=position_region_created path={} len={}",
            region.path.display(),
            len
        );
        Ok(region)
    }

    /// Maps an existing file without modifying it.
    pub fn open_existing(path: impl Into<PathBuf>) -> Result<Self, RegionError> {
        let path = path.into();
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let len = usize::try_from(file.metadata()?.len()).map_err(|_| RegionError::Capacity {
            capacity: usize::MAX,
            reason: "file does not fit in the address space",
        })?;
        let region = Self::map(path, &file, len)?;
        info!(
            "event=position_region_mapped path={} len={}",
            region.path.display(),
            len
        );
        Ok(region)
    }

    fn map(path: PathBuf, file: &File, len: usize) -> Result<Self, RegionError> {
        if len == 0 {
            return Err(RegionError::Capacity {
                capacity: 0,
                reason: "region is empty",
            });
        }
        // SAFETY: the file is private to this process for the lifetime of the mapping;
        // all later access goes through `AtomicBuffer`.
        let mut mmap = unsafe { MmapOptions::new().len(len).map_mut(file)? };
        let base = mmap.as_mut_ptr();
        Ok(Self {
            path,
            mmap,
            base,
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn buffer(&self) -> Result<AtomicBuffer<'_>, RegionError> {
        // SAFETY: `base` points into `self.mmap`, which outlives the returned view and is
        // never dereferenced as a plain slice after mapping.
        unsafe { AtomicBuffer::from_raw_parts(self.base, self.len) }
    }

    /// Flushes dirty pages to the backing file.
    pub fn flush(&self) -> Result<(), RegionError> {
        self.mmap.flush()?;
        Ok(())
    }
}

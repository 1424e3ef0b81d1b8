//! Directory-backed keyed blob container
//!
//! A key is a list of path segments; each leaf is one file holding a small
//! little-endian header followed by the payload:
//!
//! ```text
//! magic "LTBL" | version: u32 | length: u64 | payload
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use tracing::debug;

use crate::error::{store_err, Result};

const MAGIC: &[u8; 4] = b"LTBL";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: u64 = 4 + 4 + 8;

/// Keyed container of binary blobs rooted at a directory
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create an empty store, discarding anything already at `root`
    pub fn create(root: &Path) -> Result<Self> {
        if root.exists() {
            if root.is_dir() {
                fs::remove_dir_all(root)?;
            } else {
                fs::remove_file(root)?;
            }
        }
        fs::create_dir_all(root)?;
        debug!(root = %root.display(), "created blob store");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Open an existing store
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            return Err(store_err!("no artifact store at {}", root.display()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn open_or_create(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            fs::create_dir_all(root)?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn leaf(&self, key: &[&str]) -> Result<PathBuf> {
        let Some((last, dirs)) = key.split_last() else {
            return Err(store_err!("empty blob key"));
        };
        let mut path = self.root.clone();
        for segment in dirs {
            path.push(check_segment(segment)?);
        }
        path.push(format!("{}.blob", check_segment(last)?));
        Ok(path)
    }

    pub fn contains(&self, key: &[&str]) -> bool {
        self.leaf(key).map(|p| p.is_file()).unwrap_or(false)
    }

    /// Write `bytes` under `key` unless the key already exists.
    ///
    /// Returns whether anything was written.
    pub fn put(&self, key: &[&str], bytes: &[u8]) -> Result<bool> {
        let path = self.leaf(key)?;
        if path.is_file() {
            debug!(key = %key.join("/"), "blob exists, skipping");
            return Ok(false);
        }
        write_leaf(&path, bytes)?;
        Ok(true)
    }

    /// Write `bytes` under `key`, replacing any previous value
    pub fn replace(&self, key: &[&str], bytes: &[u8]) -> Result<()> {
        write_leaf(&self.leaf(key)?, bytes)
    }

    pub fn get(&self, key: &[&str]) -> Result<Vec<u8>> {
        self.read_with(key, |payload| Ok(payload.to_vec()))
    }

    /// Hand the mapped payload under `key` to `f` without copying it
    pub fn read_with<T, F>(&self, key: &[&str], f: F) -> Result<T>
    where
        F: FnOnce(&[u8]) -> Result<T>,
    {
        let path = self.leaf(key)?;
        if !path.is_file() {
            return Err(store_err!("no entry {} in {}", key.join("/"), self.root.display()));
        }
        map_leaf(&path, f)
    }
}

fn check_segment(segment: &str) -> Result<&str> {
    if segment.is_empty() || segment == "." || segment == ".." || segment.contains(['/', '\\']) {
        return Err(store_err!("invalid blob key segment {:?}", segment));
    }
    Ok(segment)
}

fn write_leaf(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        writer.write_all(MAGIC)?;
        writer.write_u32::<LittleEndian>(FORMAT_VERSION)?;
        writer.write_u64::<LittleEndian>(bytes.len() as u64)?;
        writer.write_all(bytes)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn map_leaf<T, F>(path: &Path, f: F) -> Result<T>
where
    F: FnOnce(&[u8]) -> Result<T>,
{
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    if file_len < HEADER_LEN {
        return Err(store_err!("{} is truncated", path.display()));
    }
    // SAFETY: the file is opened read-only and the map does not outlive this function.
    let mmap = unsafe { Mmap::map(&file)? };
    let mut cursor = Cursor::new(&mmap[..]);

    let mut magic = [0u8; 4];
    cursor.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(store_err!("{} is not a blob file", path.display()));
    }
    let version = cursor.read_u32::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(store_err!("{} has unsupported format version {}", path.display(), version));
    }
    let len = cursor.read_u64::<LittleEndian>()?;
    if len != file_len - HEADER_LEN {
        return Err(store_err!(
            "{} declares {} payload bytes but holds {}",
            path.display(),
            len,
            file_len - HEADER_LEN
        ));
    }
    f(&mmap[HEADER_LEN as usize..])
}

//! A simple mountable file system: flat single-directory namespace, direct +
//! singly-indirect inode blocks, bitmap allocator, persistent
//! superblock/inode/directory/bitmap regions. Single-threaded: all state is
//! exclusively owned by whichever caller holds the `Sfs` value.

pub mod bitmap;
pub mod directory;
pub mod disk;
pub mod inode;
pub mod layout;
pub mod superblock;

use std::mem::size_of;

use bytemuck::{bytes_of, bytes_of_mut, Pod};
use tracing::{debug, error, warn};

use crate::error::SfsError;
use bitmap::Bitmap;
use directory::{RawDirectoryEntry, MAX_FILENAME};
use disk::DiskEmu;
use fd::FdTable;
use inode::RawInode;
use layout::{
    BITMAP_BLOCK_OFFSET, BLOCK_SIZE, DIR_TABLE_OFFSET, INODE_TABLE_OFFSET, MAX_DATA_BLOCKS_PER_FILE,
    MAX_DATA_BLOCKS_SCALED_DOWN, NUM_DATA_BLOCKS_FOR_BITMAP, NUM_DATA_BLOCKS_FOR_DIR, NUM_DIRECT_POINTERS,
    NUM_FILE_INODES, NUM_INODES, NUM_INODE_BLOCKS, NUM_TOTAL_BLOCKS, PTRS_PER_INDIRECT,
};
use superblock::RawSuperblock;

pub mod fd;

/// A mounted file system. Construct with [`Sfs::format`] for a fresh image
/// or [`Sfs::mount`] for an existing one.
pub struct Sfs {
    disk: DiskEmu,
    superblock: RawSuperblock,
    inodes: Vec<RawInode>,
    directory: Vec<RawDirectoryEntry>,
    bitmap: Bitmap,
    fds: FdTable,
    num_files: u32,
    curr_file: u32,
}

impl Sfs {
    /// Formats a brand new image at `path`, overwriting anything there.
    pub fn format(path: impl AsRef<std::path::Path>) -> Result<Self, SfsError> {
        let disk = DiskEmu::init_fresh(path, BLOCK_SIZE, NUM_TOTAL_BLOCKS)?;
        let mut inodes = vec![RawInode::free(); NUM_INODES as usize];
        inodes[0].allocate();
        let directory = vec![RawDirectoryEntry::free(); NUM_FILE_INODES as usize];
        let bitmap = Bitmap::empty();
        let superblock = RawSuperblock::fresh();

        let mut sfs = Self {
            disk,
            superblock,
            inodes,
            directory,
            bitmap,
            fds: FdTable::new(),
            num_files: 0,
            curr_file: 0,
        };
        sfs.persist_superblock()?;
        sfs.persist_inodes()?;
        sfs.persist_directory()?;
        sfs.persist_bitmap()?;
        debug!("formatted fresh SFS image");
        Ok(sfs)
    }

    /// Mounts an existing image at `path`, reading all four persistent
    /// regions and recomputing `num_files` from the inode table.
    pub fn mount(path: impl AsRef<std::path::Path>) -> Result<Self, SfsError> {
        let mut disk = DiskEmu::init_existing(path, BLOCK_SIZE, NUM_TOTAL_BLOCKS)?;

        let superblock: RawSuperblock = read_record(&mut disk, 0)?;
        superblock.validate()?;

        let inodes = read_region(&mut disk, INODE_TABLE_OFFSET, NUM_INODE_BLOCKS, NUM_INODES as usize)?;
        let directory = read_region(
            &mut disk,
            DIR_TABLE_OFFSET,
            NUM_DATA_BLOCKS_FOR_DIR,
            NUM_FILE_INODES as usize,
        )?;
        let mut bitmap_bytes = vec![0u8; (NUM_DATA_BLOCKS_FOR_BITMAP * BLOCK_SIZE) as usize];
        disk.read_blocks(BITMAP_BLOCK_OFFSET, NUM_DATA_BLOCKS_FOR_BITMAP, &mut bitmap_bytes)?;
        bitmap_bytes.truncate(MAX_DATA_BLOCKS_SCALED_DOWN as usize);
        let bitmap = Bitmap::from_bytes(bitmap_bytes);

        let num_files = inodes.iter().filter(|i| i.is_in_use()).count() as u32 - 1; // exclude root
        debug!(num_files, "mounted existing SFS image");

        Ok(Self {
            disk,
            superblock,
            inodes,
            directory,
            bitmap,
            fds: FdTable::new(),
            num_files,
            curr_file: 0,
        })
    }

    // ----- §4.5 directory traversal -----------------------------------

    /// Returns the next used directory entry's name into `out`, advancing
    /// the shared cursor. Returns `false` once the cursor runs past the end
    /// (and resets it to 0 for the next traversal), matching the original's
    /// 1/0 return convention.
    pub fn getnextfilename(&mut self, out: &mut String) -> bool {
        if self.num_files > 0 {
            let mut counter = 0u32;
            for entry in &self.directory {
                if !entry.is_used() {
                    continue;
                }
                if counter == self.curr_file {
                    out.clear();
                    out.push_str(entry.name());
                    self.curr_file += 1;
                    return true;
                }
                counter += 1;
            }
        }
        self.curr_file = 0;
        false
    }

    pub fn getfilesize(&self, name: &str) -> i64 {
        match self.find_entry(name) {
            Some(i) => self.inodes[i as usize + 1].size as i64,
            None => -1,
        }
    }

    // ----- §4.6 open / close ------------------------------------------

    pub fn open(&mut self, name: &str) -> i32 {
        match self.open_inner(name) {
            Ok(fd) => fd,
            Err(e) => {
                warn!(error = %e, name, "sfs open failed");
                -1
            }
        }
    }

    fn open_inner(&mut self, name: &str) -> Result<i32, SfsError> {
        if name.is_empty() || name.len() >= MAX_FILENAME {
            return Err(SfsError::NameTooLong(name.to_string(), MAX_FILENAME));
        }

        if let Some(i) = self.find_entry(name) {
            let inode_idx = i + 1;
            if self.fds.is_open_for_inode(inode_idx) {
                return Err(SfsError::AlreadyOpen(name.to_string()));
            }
            let size = self.inodes[inode_idx as usize].size;
            let fd = self.fds.open(inode_idx, size)?;
            self.inodes[inode_idx as usize].set_open(true);
            self.persist_inodes()?;
            return Ok(fd);
        }

        let free_inode = (1..NUM_INODES)
            .find(|&i| !self.inodes[i as usize].is_in_use())
            .ok_or(SfsError::InodesExhausted)?;
        let fd = self.fds.open(free_inode, 0)?;

        self.inodes[free_inode as usize].allocate();
        self.directory[free_inode as usize - 1].occupy(name);
        self.num_files += 1;

        self.persist_inodes()?;
        self.persist_directory()?;
        Ok(fd)
    }

    pub fn close(&mut self, fd: i32) -> i32 {
        match self.close_inner(fd) {
            Ok(()) => 0,
            Err(e) => {
                warn!(error = %e, fd, "sfs close failed");
                -1
            }
        }
    }

    fn close_inner(&mut self, fd: i32) -> Result<(), SfsError> {
        let inode_idx = self.fds.inode_of(fd)?;
        self.fds.close(fd)?;
        if inode_idx > 0 && !self.fds.is_open_for_inode(inode_idx) {
            self.inodes[inode_idx as usize].set_open(false);
        }
        Ok(())
    }

    // ----- §4.7 seek ----------------------------------------------------

    pub fn seek(&mut self, fd: i32, loc: i64) -> i32 {
        match self.seek_inner(fd, loc) {
            Ok(()) => 0,
            Err(e) => {
                warn!(error = %e, fd, loc, "sfs seek failed");
                -1
            }
        }
    }

    fn seek_inner(&mut self, fd: i32, loc: i64) -> Result<(), SfsError> {
        let inode_idx = self.fds.inode_of(fd)?;
        if inode_idx == 0 {
            return Err(SfsError::DescriptorNotOpen(fd));
        }
        let size = self.inodes[inode_idx as usize].size as i64;
        let cap = (MAX_DATA_BLOCKS_PER_FILE as i64) * (BLOCK_SIZE as i64);
        if loc < 0 || loc > size || loc >= cap {
            return Err(SfsError::SeekOutOfBounds { loc, size });
        }
        self.fds.set_rwptr(fd, loc as u32)
    }

    // ----- §4.7 write -----------------------------------------------------

    pub fn write(&mut self, fd: i32, buf: &[u8]) -> i32 {
        match self.write_inner(fd, buf) {
            Ok(n) => n as i32,
            Err(e) => {
                error!(error = %e, fd, "sfs write aborted");
                0
            }
        }
    }

    fn write_inner(&mut self, fd: i32, buf: &[u8]) -> Result<usize, SfsError> {
        let length = buf.len();
        let inode_idx = match self.fds.inode_of(fd) {
            Ok(i) if i > 0 => i,
            _ => return Ok(0),
        };
        let rwptr = self.fds.rwptr(fd)?;
        let size = self.inodes[inode_idx as usize].size;
        let cap = MAX_DATA_BLOCKS_PER_FILE * BLOCK_SIZE;

        if length == 0 || rwptr > size || rwptr >= cap {
            return Ok(0);
        }

        let mut indirect_buf = self.load_indirect_if_present(inode_idx)?;
        let mut bytes_written = 0usize;
        let mut rwptr = rwptr;
        let former_size = size;

        while bytes_written < length {
            let current_block = rwptr / BLOCK_SIZE;
            if current_block >= MAX_DATA_BLOCKS_PER_FILE {
                break;
            }

            let lba = match self.block_lba_for_write(inode_idx, current_block, &mut indirect_buf)? {
                Some(lba) => lba,
                // bitmap exhausted allocating the indirect block itself: stop
                // here, keeping whatever was already written.
                None => break,
            };

            let mut block_buf = vec![0u8; BLOCK_SIZE as usize];
            if lba != 0 {
                self.disk.read_blocks(lba, 1, &mut block_buf)?;
            }
            let allocated_lba = if lba == 0 {
                match self.allocate_block_for(inode_idx, current_block, &mut indirect_buf)? {
                    Some(lba) => lba,
                    // bitmap exhausted: stop, same as above.
                    None => break,
                }
            } else {
                lba
            };

            let block_offset = (rwptr % BLOCK_SIZE) as usize;
            let room = BLOCK_SIZE as usize - block_offset;
            let remaining = length - bytes_written;
            let chunk = room.min(remaining);

            block_buf[block_offset..block_offset + chunk]
                .copy_from_slice(&buf[bytes_written..bytes_written + chunk]);
            self.disk.write_blocks(allocated_lba, 1, &block_buf)?;

            bytes_written += chunk;
            rwptr += chunk as u32;
        }

        if bytes_written > 0 {
            let new_end = former_size.max(rwptr);
            self.inodes[inode_idx as usize].size = new_end;
            self.fds.set_rwptr(fd, rwptr)?;
            if let Some(buf) = &indirect_buf {
                let indirect_lba = self.inodes[inode_idx as usize].indirect;
                self.write_ptr_block(indirect_lba, buf)?;
            }
            self.persist_inodes()?;
            self.persist_bitmap()?;
        }

        Ok(bytes_written)
    }

    /// Returns the currently-recorded LBA for `block_index` within `inode`,
    /// or 0 if unallocated, allocating an indirect block (but not the data
    /// block itself) on first use past the direct pointers. `Ok(None)` means
    /// the bitmap is exhausted and the caller should stop, not abort: a
    /// short write persists and reports whatever it managed so far.
    fn block_lba_for_write(
        &mut self,
        inode: u32,
        block_index: u32,
        indirect_buf: &mut Option<Vec<u32>>,
    ) -> Result<Option<u32>, SfsError> {
        if block_index < NUM_DIRECT_POINTERS {
            return Ok(Some(self.inodes[inode as usize].direct[block_index as usize]));
        }
        if indirect_buf.is_none() {
            let lba = match self.bitmap.allocate() {
                Ok(lba) => lba,
                Err(SfsError::BlocksExhausted) => return Ok(None),
                Err(e) => return Err(e),
            };
            self.inodes[inode as usize].indirect = lba;
            *indirect_buf = Some(vec![0u32; PTRS_PER_INDIRECT as usize]);
        }
        let ptr_index = (block_index - NUM_DIRECT_POINTERS) as usize;
        Ok(Some(indirect_buf.as_ref().unwrap()[ptr_index]))
    }

    /// Allocates a fresh data block for `block_index` and records its LBA in
    /// the appropriate pointer slot. `Ok(None)` means the bitmap is
    /// exhausted; see [`Self::block_lba_for_write`].
    fn allocate_block_for(
        &mut self,
        inode: u32,
        block_index: u32,
        indirect_buf: &mut Option<Vec<u32>>,
    ) -> Result<Option<u32>, SfsError> {
        let lba = match self.bitmap.allocate() {
            Ok(lba) => lba,
            Err(SfsError::BlocksExhausted) => return Ok(None),
            Err(e) => return Err(e),
        };
        if block_index < NUM_DIRECT_POINTERS {
            self.inodes[inode as usize].direct[block_index as usize] = lba;
        } else {
            let ptr_index = (block_index - NUM_DIRECT_POINTERS) as usize;
            indirect_buf.as_mut().unwrap()[ptr_index] = lba;
        }
        Ok(Some(lba))
    }

    fn load_indirect_if_present(&mut self, inode: u32) -> Result<Option<Vec<u32>>, SfsError> {
        let lba = self.inodes[inode as usize].indirect;
        if lba == 0 {
            return Ok(None);
        }
        Ok(Some(self.read_ptr_block(lba)?))
    }

    fn read_ptr_block(&mut self, lba: u32) -> Result<Vec<u32>, SfsError> {
        let mut raw = vec![0u8; BLOCK_SIZE as usize];
        self.disk.read_blocks(lba, 1, &mut raw)?;
        Ok(bytemuck::cast_slice::<u8, u32>(&raw).to_vec())
    }

    fn write_ptr_block(&mut self, lba: u32, ptrs: &[u32]) -> Result<(), SfsError> {
        let bytes = bytemuck::cast_slice::<u32, u8>(ptrs);
        self.disk.write_blocks(lba, 1, bytes)
    }

    // ----- §4.7 read ------------------------------------------------------

    pub fn read(&mut self, fd: i32, buf: &mut [u8]) -> i32 {
        match self.read_inner(fd, buf) {
            Ok(n) => n as i32,
            Err(e) => {
                warn!(error = %e, fd, "sfs read aborted");
                0
            }
        }
    }

    fn read_inner(&mut self, fd: i32, buf: &mut [u8]) -> Result<usize, SfsError> {
        let length = buf.len();
        let inode_idx = match self.fds.inode_of(fd) {
            Ok(i) if i > 0 => i,
            _ => return Ok(0),
        };
        let rwptr = self.fds.rwptr(fd)?;
        let size = self.inodes[inode_idx as usize].size;

        if length == 0 || rwptr >= size {
            return Ok(0);
        }

        let clamp = (size - rwptr) as usize;
        let to_read = clamp.min(length);

        let indirect_buf = self.load_indirect_if_present(inode_idx)?;
        let mut bytes_read = 0usize;
        let mut rwptr = rwptr;

        while bytes_read < to_read {
            let current_block = rwptr / BLOCK_SIZE;
            if current_block >= MAX_DATA_BLOCKS_PER_FILE {
                break;
            }
            let lba = if current_block < NUM_DIRECT_POINTERS {
                self.inodes[inode_idx as usize].direct[current_block as usize]
            } else {
                match &indirect_buf {
                    Some(ptrs) => ptrs[(current_block - NUM_DIRECT_POINTERS) as usize],
                    None => 0,
                }
            };
            if lba == 0 {
                break; // first zero pointer ends the readable range
            }

            let mut block_buf = vec![0u8; BLOCK_SIZE as usize];
            self.disk.read_blocks(lba, 1, &mut block_buf)?;

            let block_offset = (rwptr % BLOCK_SIZE) as usize;
            let room = BLOCK_SIZE as usize - block_offset;
            let remaining = to_read - bytes_read;
            let chunk = room.min(remaining);

            buf[bytes_read..bytes_read + chunk].copy_from_slice(&block_buf[block_offset..block_offset + chunk]);
            bytes_read += chunk;
            rwptr += chunk as u32;
        }

        self.fds.set_rwptr(fd, rwptr)?;
        Ok(bytes_read)
    }

    // ----- §4.8 remove ------------------------------------------------

    pub fn remove(&mut self, name: &str) -> i32 {
        match self.remove_inner(name) {
            Ok(inode) => inode as i32,
            Err(e) => {
                warn!(error = %e, name, "sfs remove failed");
                -1
            }
        }
    }

    fn remove_inner(&mut self, name: &str) -> Result<u32, SfsError> {
        let i = self.find_entry(name).ok_or_else(|| SfsError::NotFound(name.to_string()))?;
        let inode_idx = i + 1;

        self.directory[i as usize].clear();
        self.fds.close_inode(inode_idx);

        if self.inodes[inode_idx as usize].is_in_use() {
            for slot in 0..NUM_DIRECT_POINTERS as usize {
                let ptr = self.inodes[inode_idx as usize].direct[slot];
                if ptr != 0 {
                    self.zero_and_free(ptr)?;
                }
                self.inodes[inode_idx as usize].direct[slot] = 0;
            }

            let indirect = self.inodes[inode_idx as usize].indirect;
            if indirect != 0 {
                let ptrs = self.read_ptr_block(indirect)?;
                for &ptr in &ptrs {
                    if ptr != 0 {
                        self.zero_and_free(ptr)?;
                    }
                }
                self.zero_and_free(indirect)?;
                self.inodes[inode_idx as usize].indirect = 0;
            }

            self.inodes[inode_idx as usize].deallocate();
            self.num_files -= 1;
        }

        self.persist_inodes()?;
        self.persist_directory()?;
        self.persist_bitmap()?;
        Ok(inode_idx)
    }

    fn zero_and_free(&mut self, lba: u32) -> Result<(), SfsError> {
        let zero = vec![0u8; BLOCK_SIZE as usize];
        self.disk.write_blocks(lba, 1, &zero)?;
        self.bitmap.free(lba);
        Ok(())
    }

    // ----- helpers ------------------------------------------------------

    fn find_entry(&self, name: &str) -> Option<u32> {
        self.directory
            .iter()
            .position(|e| e.is_used() && e.name() == name)
            .map(|i| i as u32)
    }

    fn persist_superblock(&mut self) -> Result<(), SfsError> {
        write_record(&mut self.disk, 0, &self.superblock)
    }

    fn persist_inodes(&mut self) -> Result<(), SfsError> {
        write_region(&mut self.disk, INODE_TABLE_OFFSET, NUM_INODE_BLOCKS, &self.inodes)
    }

    fn persist_directory(&mut self) -> Result<(), SfsError> {
        write_region(&mut self.disk, DIR_TABLE_OFFSET, NUM_DATA_BLOCKS_FOR_DIR, &self.directory)
    }

    fn persist_bitmap(&mut self) -> Result<(), SfsError> {
        let mut bytes = self.bitmap.as_bytes().to_vec();
        bytes.resize((NUM_DATA_BLOCKS_FOR_BITMAP * BLOCK_SIZE) as usize, 0);
        self.disk.write_blocks(BITMAP_BLOCK_OFFSET, NUM_DATA_BLOCKS_FOR_BITMAP, &bytes)
    }

    /// Number of user files currently present (excludes the root directory
    /// inode). Exposed mainly for tests.
    pub fn num_files(&self) -> u32 {
        self.num_files
    }

    /// Whether every data block in the bitmap is free. Exposed mainly for
    /// tests asserting `remove` leaves no blocks leaked.
    pub fn bitmap_all_free(&self) -> bool {
        self.bitmap.all_free()
    }
}

fn read_record<T: Pod + Default>(disk: &mut DiskEmu, lba: u32) -> Result<T, SfsError> {
    let mut value = T::default();
    let mut raw = vec![0u8; disk.block_size() as usize];
    disk.read_blocks(lba, 1, &mut raw)?;
    bytes_of_mut(&mut value).copy_from_slice(&raw[..size_of::<T>()]);
    Ok(value)
}

fn write_record<T: Pod>(disk: &mut DiskEmu, lba: u32, value: &T) -> Result<(), SfsError> {
    let mut raw = vec![0u8; disk.block_size() as usize];
    raw[..size_of::<T>()].copy_from_slice(bytes_of(value));
    disk.write_blocks(lba, 1, &raw)
}

fn read_region<T: Pod + Default + Clone>(
    disk: &mut DiskEmu,
    offset: u32,
    blocks: u32,
    count: usize,
) -> Result<Vec<T>, SfsError> {
    let mut raw = vec![0u8; (blocks * disk.block_size()) as usize];
    disk.read_blocks(offset, blocks, &mut raw)?;
    let item_size = size_of::<T>();
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let mut item = T::default();
        let start = i * item_size;
        bytes_of_mut(&mut item).copy_from_slice(&raw[start..start + item_size]);
        out.push(item);
    }
    Ok(out)
}

fn write_region<T: Pod>(disk: &mut DiskEmu, offset: u32, blocks: u32, items: &[T]) -> Result<(), SfsError> {
    let item_size = size_of::<T>();
    let mut raw = vec![0u8; (blocks * disk.block_size()) as usize];
    for (i, item) in items.iter().enumerate() {
        let start = i * item_size;
        raw[start..start + item_size].copy_from_slice(bytes_of(item));
    }
    disk.write_blocks(offset, blocks, &raw)
}

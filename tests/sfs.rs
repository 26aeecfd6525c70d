//! End-to-end tests against a freshly formatted SFS image. Each test
//! formats its own disk image in a temp directory so they can run in
//! parallel without clobbering each other.

use taskfs::sfs::layout::{BLOCK_SIZE, MAX_DATA_BLOCKS_SCALED_DOWN};
use taskfs::sfs::Sfs;

fn fresh(dir: &tempfile::TempDir, name: &str) -> Sfs {
    Sfs::format(dir.path().join(name)).expect("format should succeed on a fresh temp file")
}

#[test]
fn tiny_write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = fresh(&dir, "tiny.disk");

    let fd = fs.open("hello.txt");
    assert!(fd > 0);

    let payload = b"hello, sfs";
    assert_eq!(fs.write(fd, payload), payload.len() as i32);
    assert_eq!(fs.seek(fd, 0), 0);

    let mut buf = [0u8; 32];
    let n = fs.read(fd, &mut buf);
    assert_eq!(n as usize, payload.len());
    assert_eq!(&buf[..n as usize], payload);

    assert_eq!(fs.close(fd), 0);
}

#[test]
fn write_spanning_multiple_blocks_reads_back_intact() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = fresh(&dir, "multiblock.disk");

    let fd = fs.open("big.bin");
    assert!(fd > 0);

    // just over three 1024-byte blocks, with a distinct byte pattern so a
    // misplaced block boundary would corrupt the read-back.
    let payload: Vec<u8> = (0..3200u32).map(|i| (i % 251) as u8).collect();
    assert_eq!(fs.write(fd, &payload), payload.len() as i32);
    assert_eq!(fs.seek(fd, 0), 0);

    let mut buf = vec![0u8; payload.len()];
    let n = fs.read(fd, &mut buf);
    assert_eq!(n as usize, payload.len());
    assert_eq!(buf, payload);
}

#[test]
fn write_past_direct_pointers_exercises_the_indirect_block() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = fresh(&dir, "indirect.disk");

    let fd = fs.open("spread.bin");
    // 12 direct pointers * 1024 bytes = 12288; push well past that.
    let payload = vec![0x5au8; 12288 + 4096];
    assert_eq!(fs.write(fd, &payload), payload.len() as i32);

    assert_eq!(fs.seek(fd, 0), 0);
    let mut buf = vec![0u8; payload.len()];
    let n = fs.read(fd, &mut buf);
    assert_eq!(n as usize, payload.len());
    assert_eq!(buf, payload);
}

#[test]
fn write_past_bitmap_capacity_persists_the_partial_count() {
    use taskfs::sfs::layout::MAX_DATA_BLOCKS_PER_FILE;

    let dir = tempfile::tempdir().unwrap();
    let mut fs = fresh(&dir, "exhausted.disk");

    // fill up whole files (each pinned at the per-file block cap) until the
    // disk-wide bitmap has only a few blocks of headroom left.
    let full_file = vec![0xabu8; MAX_DATA_BLOCKS_PER_FILE as usize * BLOCK_SIZE as usize];
    let blocks_total = MAX_DATA_BLOCKS_SCALED_DOWN;
    let full_files_needed = (blocks_total / MAX_DATA_BLOCKS_PER_FILE) as usize;
    let remaining_blocks = blocks_total - full_files_needed as u32 * MAX_DATA_BLOCKS_PER_FILE;
    assert!(remaining_blocks > 0 && remaining_blocks < MAX_DATA_BLOCKS_PER_FILE, "test assumption about disk geometry no longer holds");

    for i in 0..full_files_needed {
        let fd = fs.open(&format!("filler{i}.bin"));
        assert_eq!(fs.write(fd, &full_file), full_file.len() as i32);
        fs.close(fd);
    }

    // only `remaining_blocks` blocks are left on the whole disk; this write
    // asks for a full file's worth, so the bitmap runs dry mid-write.
    let fd = fs.open("too_big.bin");
    let written = fs.write(fd, &full_file);

    assert!(written > 0);
    assert!((written as usize) < full_file.len());
    assert_eq!(written as u32, remaining_blocks * BLOCK_SIZE);
    assert_eq!(fs.getfilesize("too_big.bin"), written as i64);
    assert!(!fs.bitmap_all_free());

    assert_eq!(fs.seek(fd, 0), 0);
    let mut buf = vec![0u8; written as usize];
    let n = fs.read(fd, &mut buf);
    assert_eq!(n, written);
    assert_eq!(buf, &full_file[..written as usize]);
}

#[test]
fn remove_frees_every_block_it_held() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = fresh(&dir, "remove.disk");

    let fd = fs.open("doomed.bin");
    let payload = vec![0xffu8; 12288 + 2048];
    fs.write(fd, &payload);
    fs.close(fd);

    assert!(!fs.bitmap_all_free());
    let removed_inode = fs.remove("doomed.bin");
    assert!(removed_inode > 0);
    assert!(fs.bitmap_all_free());
    assert_eq!(fs.remove("doomed.bin"), -1); // second removal: no longer found
}

#[test]
fn seek_rejects_locations_past_end_of_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = fresh(&dir, "seek.disk");

    let fd = fs.open("f.txt");
    fs.write(fd, b"abcdef");
    assert_eq!(fs.seek(fd, 3), 0);
    assert_eq!(fs.seek(fd, 6), 0); // exactly at end of file is legal
    assert_eq!(fs.seek(fd, 7), -1); // past end of file is not
    assert_eq!(fs.seek(fd, -1), -1);
}

#[test]
fn getnextfilename_enumerates_every_entry_then_wraps() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = fresh(&dir, "enum.disk");

    for name in ["a.txt", "b.txt", "c.txt"] {
        let fd = fs.open(name);
        fs.close(fd);
    }

    let mut seen = Vec::new();
    let mut name = String::new();
    while fs.getnextfilename(&mut name) {
        seen.push(name.clone());
    }
    seen.sort();
    assert_eq!(seen, vec!["a.txt", "b.txt", "c.txt"]);

    // cursor wraps, a second pass yields the same three names again
    let mut again = Vec::new();
    while fs.getnextfilename(&mut name) {
        again.push(name.clone());
    }
    again.sort();
    assert_eq!(again, seen);
}

#[test]
fn open_on_missing_name_creates_and_reopen_reuses_inode() {
    let dir = tempfile::tempdir().unwrap();
    let mut fs = fresh(&dir, "reopen.disk");

    let fd1 = fs.open("once.txt");
    fs.write(fd1, b"data");
    fs.close(fd1);

    let fd2 = fs.open("once.txt");
    assert_ne!(fd2, -1);
    assert_eq!(fs.getfilesize("once.txt"), 4);
    fs.close(fd2);
}

#[test]
fn getfilesize_is_negative_one_for_unknown_name() {
    let dir = tempfile::tempdir().unwrap();
    let fs = fresh(&dir, "nofile.disk");
    assert_eq!(fs.getfilesize("nope.txt"), -1);
}

#[test]
fn mount_recovers_prior_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.disk");
    {
        let mut fs = Sfs::format(&path).unwrap();
        let fd = fs.open("persisted.txt");
        fs.write(fd, b"still here");
        fs.close(fd);
    }
    let mut remounted = Sfs::mount(&path).unwrap();
    assert_eq!(remounted.getfilesize("persisted.txt"), 10);
    let fd = remounted.open("persisted.txt");
    // reopening an existing file starts the r/w pointer at end-of-file
    // (append semantics), so rewind before reading it back.
    assert_eq!(remounted.seek(fd, 0), 0);
    let mut buf = [0u8; 16];
    let n = remounted.read(fd, &mut buf);
    assert_eq!(&buf[..n as usize], b"still here");
}

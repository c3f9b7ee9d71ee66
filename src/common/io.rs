use std::fs::{self, File};
use std::io;
use std::ops::Deref;
use std::path::Path;

#[cfg(target_os = "linux")]
use std::sync::atomic::{AtomicBool, Ordering};

use memmap2::{Mmap, MmapOptions};

/// Holds the query's input bytes — either a zero-copy mmap of the source
/// file or an owned Vec when mapping is unavailable. Dereferences to
/// `&[u8]` so the scan code never cares which it got.
///
/// The mapping is released exactly once, when the value drops at the end
/// of query execution; every field slice handed out during the scan must
/// end its borrow before that point.
pub enum FileData {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Deref for FileData {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            FileData::Mmap(m) => m,
            FileData::Owned(v) => v,
        }
    }
}

/// Track whether O_NOATIME is supported to avoid repeated failed open()
/// attempts. After the first EPERM, we never try O_NOATIME again.
#[cfg(target_os = "linux")]
static NOATIME_SUPPORTED: AtomicBool = AtomicBool::new(true);

/// Open a file with O_NOATIME on Linux to avoid atime inode writes.
#[cfg(target_os = "linux")]
pub fn open_noatime(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    if NOATIME_SUPPORTED.load(Ordering::Relaxed) {
        match fs::OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOATIME)
            .open(path)
        {
            Ok(f) => return Ok(f),
            Err(ref e) if e.raw_os_error() == Some(libc::EPERM) => {
                // O_NOATIME requires file ownership or CAP_FOWNER
                NOATIME_SUPPORTED.store(false, Ordering::Relaxed);
            }
            Err(e) => return Err(e),
        }
    }
    File::open(path)
}

#[cfg(not(target_os = "linux"))]
pub fn open_noatime(path: &Path) -> io::Result<File> {
    File::open(path)
}

/// Map a file read-only for the scan phase.
///
/// MADV_SEQUENTIAL lets the kernel prefetch ahead of the linear scan;
/// HUGEPAGE cuts TLB misses once the file spans multiple 2MB regions.
/// Falls back to an ordinary read when the kernel refuses the mapping
/// (some filesystems and all pipes).
pub fn map_file(path: &Path) -> io::Result<FileData> {
    let file = open_noatime(path)?;
    let metadata = file.metadata()?;
    let len = metadata.len();

    if len == 0 {
        return Ok(FileData::Owned(Vec::new()));
    }

    // SAFETY: read-only mapping of a regular file.
    match unsafe { MmapOptions::new().populate().map(&file) } {
        Ok(mmap) => {
            #[cfg(target_os = "linux")]
            {
                let _ = mmap.advise(memmap2::Advice::Sequential);
                let _ = mmap.advise(memmap2::Advice::WillNeed);
                if len >= 2 * 1024 * 1024 {
                    let _ = mmap.advise(memmap2::Advice::HugePage);
                }
            }
            Ok(FileData::Mmap(mmap))
        }
        Err(_) => {
            let mut buf = Vec::with_capacity(len as usize);
            let mut reader = file;
            io::Read::read_to_end(&mut reader, &mut buf)?;
            Ok(FileData::Owned(buf))
        }
    }
}

/// Advise the kernel that access is about to become random (the sort
/// phase jumps between arbitrary rows when gathering output).
pub fn advise_random(data: &FileData) {
    #[cfg(target_os = "linux")]
    if let FileData::Mmap(mmap) = data {
        let _ = mmap.advise(memmap2::Advice::Random);
    }
    #[cfg(not(target_os = "linux"))]
    let _ = data;
}

/// Get file size without reading it (the strategy router keys off this).
pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
}

//! Target geometry probing.
//!
//! Block devices are asked for their byte size and logical sector size;
//! regular files are cut into default-sized sectors, dropping any partial
//! tail.

use crate::error::FdpatternError;
use crate::record::RECORD_SIZE;
use std::fs::{File, FileType};

/// Sector size assumed for regular files and for devices that cannot report
/// one.
pub const DEFAULT_SECTOR_SIZE: u64 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    BlockDevice,
    RegularFile,
}

impl TargetKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::BlockDevice => "block device",
            Self::RegularFile => "regular file",
        }
    }
}

/// Geometry of the target, derived once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub kind: TargetKind,
    /// Logical sector size in bytes; a power of two.
    pub sector_size: u64,
    pub total_sectors: u64,
    /// `total_sectors * sector_size`.
    pub byte_len: u64,
}

impl DeviceDescriptor {
    /// Builds a descriptor from raw geometry, truncating `byte_len` to whole
    /// sectors.
    pub fn from_geometry(
        kind: TargetKind,
        sector_size: u64,
        byte_len: u64,
    ) -> Result<Self, FdpatternError> {
        if !sector_size.is_power_of_two() {
            return Err(FdpatternError::Probe(format!(
                "sector size {} is not a power of two",
                sector_size
            )));
        }
        if sector_size < RECORD_SIZE as u64 {
            return Err(FdpatternError::Probe(format!(
                "sector size {} is smaller than a {}-byte record",
                sector_size, RECORD_SIZE
            )));
        }
        let total_sectors = byte_len / sector_size;
        Ok(Self {
            kind,
            sector_size,
            total_sectors,
            byte_len: total_sectors * sector_size,
        })
    }

    /// Byte offset of `sector` from the start of the target.
    pub fn sector_offset(&self, sector: u64) -> u64 {
        sector * self.sector_size
    }

    pub fn sector_len(&self) -> usize {
        self.sector_size as usize
    }
}

/// Resolves the geometry of an open target.
pub fn probe(file: &File) -> Result<DeviceDescriptor, FdpatternError> {
    let metadata = file
        .metadata()
        .map_err(|e| FdpatternError::Probe(format!("fstat failed, couldn't stat image: {}", e)))?;
    let file_type = metadata.file_type();

    let descriptor = if is_block_device(&file_type) {
        let (sector_size, byte_len) = block_device_geometry(file)?;
        DeviceDescriptor::from_geometry(TargetKind::BlockDevice, sector_size, byte_len)?
    } else if file_type.is_file() {
        DeviceDescriptor::from_geometry(TargetKind::RegularFile, DEFAULT_SECTOR_SIZE, metadata.len())?
    } else {
        return Err(FdpatternError::Probe(
            "target is neither a block device nor a regular file".to_string(),
        ));
    };

    log::debug!(
        "Probed {}: {} sectors of {} bytes",
        descriptor.kind.name(),
        descriptor.total_sectors,
        descriptor.sector_size
    );
    Ok(descriptor)
}

#[cfg(unix)]
fn is_block_device(file_type: &FileType) -> bool {
    use std::os::unix::fs::FileTypeExt;
    file_type.is_block_device()
}

#[cfg(not(unix))]
fn is_block_device(_file_type: &FileType) -> bool {
    false
}

#[cfg(target_os = "linux")]
mod ioctls {
    use nix::sys::ioctl::ioctl_num_type;

    /// `_IOR(0x12, 114, size_t)`; the kernel encodes `size_t` even though it
    /// writes a u64.
    pub const BLKGETSIZE64: ioctl_num_type =
        nix::request_code_read!(0x12, 114, std::mem::size_of::<libc::size_t>());
    /// `_IO(0x12, 104)`
    pub const BLKSSZGET: ioctl_num_type = 0x1268;

    nix::ioctl_read_bad!(blkgetsize64, BLKGETSIZE64, u64);
    nix::ioctl_read_bad!(blksszget, BLKSSZGET, libc::c_int);
}

/// Returns `(sector_size, byte_len)` for a block device.
#[cfg(target_os = "linux")]
fn block_device_geometry(file: &File) -> Result<(u64, u64), FdpatternError> {
    use nix::errno::Errno;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();

    let mut byte_len: u64 = 0;
    // SAFETY: fd is open for the lifetime of `file` and the kernel writes a
    // single u64 through the pointer.
    let res = unsafe { ioctls::blkgetsize64(fd, &mut byte_len) };
    res.map_err(|e| {
        FdpatternError::Probe(format!("BLKGETSIZE64 failed, couldn't stat image: {}", e))
    })?;

    let mut sector_size: libc::c_int = 0;
    // SAFETY: as above, the kernel writes a single int.
    let sector_size = match unsafe { ioctls::blksszget(fd, &mut sector_size) } {
        Ok(_) => u64::try_from(sector_size).map_err(|_| {
            FdpatternError::Probe(format!("BLKSSZGET returned {}", sector_size))
        })?,
        Err(Errno::ENOTTY | Errno::EINVAL | Errno::EOPNOTSUPP) => {
            log::warn!(
                "BLKSSZGET unsupported, assuming {} byte sectors",
                DEFAULT_SECTOR_SIZE
            );
            DEFAULT_SECTOR_SIZE
        }
        Err(e) => {
            return Err(FdpatternError::Probe(format!("BLKSSZGET failed: {}", e)));
        }
    };

    Ok((sector_size, byte_len))
}

/// Returns `(sector_size, byte_len)` for a block device, sized by seeking to
/// its end.
#[cfg(not(target_os = "linux"))]
fn block_device_geometry(file: &File) -> Result<(u64, u64), FdpatternError> {
    use std::io::{Seek, SeekFrom};

    let mut handle = file;
    let byte_len = handle
        .seek(SeekFrom::End(0))
        .and_then(|len| handle.rewind().map(|_| len))
        .map_err(|e| FdpatternError::Probe(format!("couldn't size device: {}", e)))?;
    Ok((DEFAULT_SECTOR_SIZE, byte_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_geometry_exact() {
        let d = DeviceDescriptor::from_geometry(TargetKind::BlockDevice, 4096, 4096 * 10).unwrap();
        assert_eq!(d.total_sectors, 10);
        assert_eq!(d.byte_len, 40960);
        assert_eq!(d.sector_offset(3), 12288);
        assert_eq!(d.sector_len(), 4096);
    }

    #[test]
    fn test_from_geometry_truncates_tail() {
        let d = DeviceDescriptor::from_geometry(TargetKind::RegularFile, 512, 1000).unwrap();
        assert_eq!(d.total_sectors, 1);
        assert_eq!(d.byte_len, 512);
    }

    #[test]
    fn test_from_geometry_rejects_bad_sector_size() {
        assert!(matches!(
            DeviceDescriptor::from_geometry(TargetKind::BlockDevice, 500, 5000),
            Err(FdpatternError::Probe(_))
        ));
        assert!(matches!(
            DeviceDescriptor::from_geometry(TargetKind::BlockDevice, 0, 5000),
            Err(FdpatternError::Probe(_))
        ));
        assert!(matches!(
            DeviceDescriptor::from_geometry(TargetKind::BlockDevice, 8, 64),
            Err(FdpatternError::Probe(_))
        ));
    }

    #[test]
    fn test_probe_regular_file_uses_default_sector_size() {
        let file = tempfile::tempfile().unwrap();
        file.set_len(1024 * 1024).unwrap();

        let d = probe(&file).unwrap();
        assert_eq!(d.kind, TargetKind::RegularFile);
        assert_eq!(d.sector_size, DEFAULT_SECTOR_SIZE);
        assert_eq!(d.total_sectors, 2048);
        assert_eq!(d.byte_len, 1024 * 1024);
    }

    #[test]
    fn test_probe_empty_file() {
        let file = tempfile::tempfile().unwrap();
        let d = probe(&file).unwrap();
        assert_eq!(d.total_sectors, 0);
        assert_eq!(d.byte_len, 0);
    }

    #[cfg(all(
        target_os = "linux",
        any(target_arch = "x86", target_arch = "x86_64", target_arch = "arm", target_arch = "aarch64")
    ))]
    #[test]
    fn test_blkgetsize64_request_encodes_size_t() {
        let expected: u32 = if cfg!(target_pointer_width = "64") {
            0x8008_1272
        } else {
            0x8004_1272
        };
        assert_eq!(ioctls::BLKGETSIZE64 as u32, expected);
        assert_eq!(ioctls::BLKSSZGET as u32, 0x1268);
    }

    #[cfg(unix)]
    #[test]
    fn test_probe_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = File::open(dir.path()).unwrap();
        assert!(matches!(probe(&file), Err(FdpatternError::Probe(_))));
    }
}

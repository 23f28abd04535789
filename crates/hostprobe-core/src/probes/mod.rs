//! Probe abstractions over the operating system's counter sources.
//!
//! Every raw read the engine performs goes through one of three small
//! traits so that tests can substitute in-memory doubles:
//!
//! - [`FileSystem`] — pseudo-filesystem reads (`/proc`, `/sys`, `/etc`)
//! - [`MountUsage`] — statvfs-equivalent usage for a mount point
//! - [`CommandRunner`] — external command invocation (GPU vendor tooling)
//!
//! [`RealProbes`] bundles the production implementations; [`MockProbes`]
//! (in [`mock`]) bundles the in-memory ones.

pub mod mock;
pub mod parser;

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use mock::{MockFs, MockProbes};

/// Error type for sampler-level failures.
#[derive(Debug)]
pub enum ProbeError {
    /// I/O error reading a counter source.
    Io(io::Error),
    /// A counter source existed but could not be parsed.
    Parse(String),
    /// A requested entity (e.g. a GPU PCI id) does not exist.
    Missing(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::Io(e) => write!(f, "I/O error: {}", e),
            ProbeError::Parse(msg) => write!(f, "parse error: {}", msg),
            ProbeError::Missing(what) => write!(f, "not found: {}", what),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<io::Error> for ProbeError {
    fn from(e: io::Error) -> Self {
        ProbeError::Io(e)
    }
}

impl From<parser::ParseError> for ProbeError {
    fn from(e: parser::ParseError) -> Self {
        ProbeError::Parse(e.message)
    }
}

/// Abstraction for pseudo-filesystem access.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Lists entries in a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Resolves a symlink target (used for PCI driver links).
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Filesystem usage for one mount point, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FsUsage {
    pub total: u64,
    pub used: u64,
    pub available: u64,
}

/// statvfs-equivalent usage lookup.
pub trait MountUsage: Send + Sync {
    fn usage(&self, path: &Path) -> io::Result<FsUsage>;
}

/// External command invocation with a hard deadline.
pub trait CommandRunner: Send + Sync {
    /// Runs `program` with `args`, returning captured stdout. The command
    /// is killed once `timeout` elapses.
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> io::Result<String>;
}

/// Umbrella bound for everything the engine needs from its probe bundle.
pub trait Probes: FileSystem + MountUsage + CommandRunner {}

impl<T: FileSystem + MountUsage + CommandRunner> Probes for T {}

// ---------------------------------------------------------------------------
// Production implementations
// ---------------------------------------------------------------------------

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(path)? {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::read_link(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Production probe bundle: `std::fs`, `statvfs(2)`, `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealProbes {
    fs: RealFs,
}

impl RealProbes {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FileSystem for RealProbes {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.fs.read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.fs.read_dir(path)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        self.fs.read_link(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.fs.exists(path)
    }
}

#[cfg(unix)]
impl MountUsage for RealProbes {
    fn usage(&self, path: &Path) -> io::Result<FsUsage> {
        use std::os::unix::ffi::OsStrExt;

        let c_path = std::ffi::CString::new(path.as_os_str().as_bytes())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))?;

        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if ret != 0 {
            return Err(io::Error::last_os_error());
        }

        let block_size = stat.f_frsize as u64;
        let total = stat.f_blocks as u64 * block_size;
        let free = stat.f_bfree as u64 * block_size;
        let available = stat.f_bavail as u64 * block_size;

        Ok(FsUsage {
            total,
            used: total.saturating_sub(free),
            available,
        })
    }
}

#[cfg(not(unix))]
impl MountUsage for RealProbes {
    fn usage(&self, _path: &Path) -> io::Result<FsUsage> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "statvfs not available on this platform",
        ))
    }
}

impl CommandRunner for RealProbes {
    fn run(&self, program: &str, args: &[&str], timeout: Duration) -> io::Result<String> {
        use std::process::{Command, Stdio};
        use std::time::Instant;

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()?;

        let deadline = Instant::now() + timeout;
        loop {
            match child.try_wait()? {
                Some(status) if status.success() => break,
                Some(status) => {
                    return Err(io::Error::other(format!(
                        "{} exited with {}",
                        program, status
                    )));
                }
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("{} timed out after {:?}", program, timeout),
                    ));
                }
                None => std::thread::sleep(Duration::from_millis(10)),
            }
        }

        let mut output = String::new();
        if let Some(mut stdout) = child.stdout.take() {
            use std::io::Read;
            stdout.read_to_string(&mut output)?;
        }
        Ok(output)
    }
}

//! Network namespace selection.
//!
//! A [`Target`] is resolved to a namespace file, which is opened and held
//! for as long as the command runs. Entering the namespace happens only
//! while a netlink socket is created (see
//! [`NetlinkSocket::new_in_namespace`](crate::netlink::NetlinkSocket::new_in_namespace));
//! the calling thread always returns to its original namespace.

mod docker;

use std::fs::File;
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

pub use docker::{ContainerRuntime, DockerCli};

use crate::command::Target;
use crate::config::Config;
use crate::error::{Error, Result};

/// The runtime directory where named network namespaces are stored.
pub const NETNS_RUN_DIR: &str = "/var/run/netns";

/// An open namespace file.
#[derive(Debug)]
pub struct NamespaceFd {
    file: File,
    path: PathBuf,
}

impl NamespaceFd {
    /// Open a namespace file by path.
    pub fn open_path<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// The path the namespace was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AsRawFd for NamespaceFd {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Switch the calling thread into `ns`.
///
/// The returned guard switches back on [`NamespaceGuard::restore`] or drop.
pub fn enter(ns: &NamespaceFd) -> io::Result<NamespaceGuard> {
    let original = File::open("/proc/self/ns/net")?;

    // SAFETY: setns only reads the descriptor. `ns` keeps it open for the
    // call, and CLONE_NEWNET limits the switch to the network namespace.
    let ret = unsafe { libc::setns(ns.as_raw_fd(), libc::CLONE_NEWNET) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    tracing::debug!(path = %ns.path().display(), "entered network namespace");

    Ok(NamespaceGuard {
        original: Some(original),
    })
}

/// Restores the thread's original namespace.
#[derive(Debug)]
pub struct NamespaceGuard {
    original: Option<File>,
}

impl NamespaceGuard {
    /// Restore the original namespace, reporting failure.
    pub fn restore(mut self) -> io::Result<()> {
        match self.original.take() {
            Some(original) => switch_back(&original),
            None => Ok(()),
        }
    }
}

fn switch_back(original: &File) -> io::Result<()> {
    // SAFETY: `original` was opened from /proc/self/ns/net and is still open.
    let ret = unsafe { libc::setns(original.as_raw_fd(), libc::CLONE_NEWNET) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    tracing::debug!("restored original network namespace");
    Ok(())
}

impl Drop for NamespaceGuard {
    fn drop(&mut self) {
        if let Some(original) = self.original.take()
            && let Err(e) = switch_back(&original)
        {
            tracing::warn!(error = %e, "failed to restore network namespace");
        }
    }
}

/// A namespace held open for the duration of one command.
#[derive(Debug)]
pub enum NamespaceHandle {
    /// The caller's own namespace; nothing was opened.
    Current,
    /// A namespace file opened on the caller's behalf.
    Opened(NamespaceFd),
}

impl NamespaceHandle {
    pub fn fd(&self) -> Option<&NamespaceFd> {
        match self {
            Self::Current => None,
            Self::Opened(fd) => Some(fd),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.fd().map(NamespaceFd::path)
    }

    /// Close the namespace file.
    pub fn release(self) {
        if let Self::Opened(fd) = self {
            tracing::debug!(path = %fd.path().display(), "released network namespace");
        }
    }
}

/// Maps command targets to namespace files.
#[derive(Debug)]
pub struct NamespaceResolver<R> {
    runtime: R,
    netns_dir: PathBuf,
    proc_dir: PathBuf,
}

impl<R: ContainerRuntime> NamespaceResolver<R> {
    pub fn new(runtime: R, config: &Config) -> Self {
        Self {
            runtime,
            netns_dir: config.netns_dir.clone(),
            proc_dir: config.proc_dir.clone(),
        }
    }

    /// The namespace file for `target`, or `None` for the current namespace.
    ///
    /// A netns name containing `/` is taken as a path to a namespace file.
    pub fn path_for(&self, target: &Target) -> Result<Option<PathBuf>> {
        match target {
            Target::Current => Ok(None),
            Target::NetNs(name) if name.contains('/') => Ok(Some(PathBuf::from(name))),
            Target::NetNs(name) => Ok(Some(self.netns_dir.join(name))),
            Target::Pid(0) => Err(Error::InvalidPid {
                pid: "0".to_string(),
            }),
            Target::Pid(pid) => Ok(Some(
                self.proc_dir.join(pid.to_string()).join("ns").join("net"),
            )),
            Target::Docker(name) => self.runtime.namespace_path(name).map(Some),
        }
    }

    /// Locate and open the namespace for `target`.
    pub fn resolve(&self, target: &Target) -> Result<NamespaceHandle> {
        let Some(path) = self.path_for(target)? else {
            return Ok(NamespaceHandle::Current);
        };
        let fd = NamespaceFd::open_path(&path)
            .map_err(|source| Error::NamespaceNotFound { path, source })?;
        tracing::debug!(%target, path = %fd.path().display(), "opened network namespace");
        Ok(NamespaceHandle::Opened(fd))
    }
}

//! Where koro looks for namespaces and the container runtime.

use std::path::{Path, PathBuf};

use crate::namespace::NETNS_RUN_DIR;

/// Filesystem locations used to resolve targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding named namespaces (`ip netns add`).
    pub netns_dir: PathBuf,
    /// procfs mount point.
    pub proc_dir: PathBuf,
    /// Docker CLI binary; a bare name is looked up on `PATH`.
    pub docker: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            netns_dir: PathBuf::from(NETNS_RUN_DIR),
            proc_dir: PathBuf::from("/proc"),
            docker: PathBuf::from("docker"),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_netns_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.netns_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_proc_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.proc_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn with_docker(mut self, binary: impl AsRef<Path>) -> Self {
        self.docker = binary.as_ref().to_path_buf();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.netns_dir, Path::new("/var/run/netns"));
        assert_eq!(config.proc_dir, Path::new("/proc"));
        assert_eq!(config.docker, Path::new("docker"));
    }

    #[test]
    fn test_builders() {
        let config = Config::new()
            .with_netns_dir("/tmp/ns")
            .with_proc_dir("/tmp/proc")
            .with_docker("/usr/local/bin/podman");
        assert_eq!(config.netns_dir, Path::new("/tmp/ns"));
        assert_eq!(config.proc_dir, Path::new("/tmp/proc"));
        assert_eq!(config.docker, Path::new("/usr/local/bin/podman"));
    }
}

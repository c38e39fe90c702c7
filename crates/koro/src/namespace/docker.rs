//! Container runtimes.

use std::path::PathBuf;
use std::process::Command;

use crate::config::Config;
use crate::error::{Error, Result};

/// Finds the network namespace of a container.
pub trait ContainerRuntime {
    /// Path of the namespace file for `container` (a name or ID).
    fn namespace_path(&self, container: &str) -> Result<PathBuf>;
}

/// Asks the Docker CLI for the container's init process.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: PathBuf,
    proc_dir: PathBuf,
}

impl DockerCli {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: config.docker.clone(),
            proc_dir: config.proc_dir.clone(),
        }
    }

    fn inspect(&self, container: &str) -> Result<u32> {
        let not_found = |reason: String| Error::ContainerNotFound {
            name: container.to_string(),
            reason,
        };

        tracing::debug!(binary = %self.binary.display(), container, "inspecting container");
        let output = Command::new(&self.binary)
            .args(["inspect", "--format", "{{.State.Pid}}", container])
            .output()
            .map_err(|e| not_found(format!("cannot run {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(not_found(stderr.trim().to_string()));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        match parse_inspect_pid(&stdout) {
            Some(0) => Err(not_found("container is not running".into())),
            Some(pid) => Ok(pid),
            None => Err(not_found(format!(
                "unexpected inspect output {:?}",
                stdout.trim()
            ))),
        }
    }
}

impl ContainerRuntime for DockerCli {
    fn namespace_path(&self, container: &str) -> Result<PathBuf> {
        let pid = self.inspect(container)?;
        Ok(self.proc_dir.join(pid.to_string()).join("ns").join("net"))
    }
}

/// The PID printed by `inspect --format {{.State.Pid}}`.
fn parse_inspect_pid(output: &str) -> Option<u32> {
    output.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::tests::scratch_dir;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn fake_docker(dir: &Path, script: &str) -> PathBuf {
        let path = dir.join("docker");
        std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn cli(docker: &Path) -> DockerCli {
        DockerCli::new(&Config::new().with_docker(docker).with_proc_dir("/proc"))
    }

    #[test]
    fn test_parse_inspect_pid() {
        assert_eq!(parse_inspect_pid("1234\n"), Some(1234));
        assert_eq!(parse_inspect_pid("0"), Some(0));
        assert_eq!(parse_inspect_pid("<no value>"), None);
        assert_eq!(parse_inspect_pid(""), None);
    }

    #[test]
    fn test_running_container() {
        let dir = scratch_dir("docker-ok");
        let docker = fake_docker(&dir, r#"[ "$4" = web ] && echo 4321"#);
        let path = cli(&docker).namespace_path("web").unwrap();
        assert_eq!(path, PathBuf::from("/proc/4321/ns/net"));
    }

    #[test]
    fn test_inspect_failure_reports_stderr() {
        let dir = scratch_dir("docker-missing");
        let docker = fake_docker(&dir, "echo 'Error: No such object: ghost' >&2; exit 1");
        let err = cli(&docker).namespace_path("ghost").unwrap_err();
        match err {
            Error::ContainerNotFound { name, reason } => {
                assert_eq!(name, "ghost");
                assert_eq!(reason, "Error: No such object: ghost");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stopped_container() {
        let dir = scratch_dir("docker-stopped");
        let docker = fake_docker(&dir, "echo 0");
        let err = cli(&docker).namespace_path("idle").unwrap_err();
        assert!(err.to_string().contains("not running"));
    }

    #[test]
    fn test_missing_binary() {
        let err = cli(Path::new("/nonexistent/docker"))
            .namespace_path("web")
            .unwrap_err();
        assert!(err.is_not_found());
    }
}

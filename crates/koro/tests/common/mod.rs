//! Shared helpers for integration tests.
//!
//! Provides `TestNamespace` for isolated network namespace testing and a
//! macro to skip tests when not running as root.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};

use koro::netlink::{self, Connection};
use koro::namespace::{NETNS_RUN_DIR, NamespaceFd};

pub type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

static NAMESPACE_COUNTER: AtomicU32 = AtomicU32::new(0);

fn unique_ns_name(prefix: &str) -> String {
    let id = NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("koro-test-{}-{}-{}", prefix, std::process::id(), id)
}

/// A named network namespace, deleted on drop.
pub struct TestNamespace {
    name: String,
}

impl TestNamespace {
    pub fn new(prefix: &str) -> netlink::Result<Self> {
        let name = unique_ns_name(prefix);
        run("ip", &["netns", "add", &name])?;
        let ns = Self { name };
        ns.link_up("lo")?;
        Ok(ns)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> PathBuf {
        Path::new(NETNS_RUN_DIR).join(&self.name)
    }

    /// A netlink connection inside this namespace.
    pub fn connection(&self) -> netlink::Result<Connection> {
        let fd = NamespaceFd::open_path(self.path())?;
        Connection::new_in_namespace(&fd)
    }

    /// Run a command in the namespace and return its stdout.
    pub fn exec(&self, cmd: &str, args: &[&str]) -> netlink::Result<String> {
        let mut full = vec!["netns", "exec", &self.name, cmd];
        full.extend_from_slice(args);
        run("ip", &full)
    }

    pub fn add_dummy(&self, name: &str) -> netlink::Result<()> {
        self.exec("ip", &["link", "add", name, "type", "dummy"])?;
        self.link_up(name)
    }

    pub fn link_up(&self, name: &str) -> netlink::Result<()> {
        self.exec("ip", &["link", "set", name, "up"])?;
        Ok(())
    }

    pub fn add_addr(&self, dev: &str, addr: &str) -> netlink::Result<()> {
        self.exec("ip", &["addr", "add", addr, "dev", dev])?;
        Ok(())
    }

    /// `ip route show` output for one destination.
    pub fn route_show(&self, dst: &str) -> netlink::Result<String> {
        self.exec("ip", &["route", "show", dst])
    }

    /// `ip addr show` output for one device.
    pub fn addr_show(&self, dev: &str) -> netlink::Result<String> {
        self.exec("ip", &["addr", "show", "dev", dev])
    }
}

impl Drop for TestNamespace {
    fn drop(&mut self) {
        let _ = Command::new("ip").args(["netns", "del", &self.name]).status();
    }
}

fn run(program: &str, args: &[&str]) -> netlink::Result<String> {
    let output = Command::new(program).args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(netlink::Error::InvalidMessage(format!(
            "{program} {args:?} failed: {}",
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}

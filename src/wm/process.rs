//! Child processes
//!
//! Spawning commands, reaping them, and the `/proc` lookups used for
//! swallowing and status bar signalling.

use std::fs;
use std::os::unix::process::CommandExt;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use nix::sys::wait::{WaitPidFlag, WaitStatus, waitpid};
use nix::unistd::{Pid, setsid};
use tracing::{debug, info};

/// Start `cmd` in its own session.
pub fn spawn(cmd: &[String]) -> Result<()> {
    let Some((program, args)) = cmd.split_first() else {
        bail!("empty command");
    };
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    // SAFETY: setsid is async-signal-safe
    unsafe {
        command.pre_exec(|| {
            setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }
    let child = command
        .spawn()
        .with_context(|| format!("Failed to execute {}", program))?;
    info!("Spawned {:?} (pid {})", cmd, child.id());
    Ok(())
}

/// Collect every exited child without blocking.
pub fn reap_children() {
    loop {
        match waitpid(Pid::from_raw(-1), Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) | Err(_) => break,
            Ok(status) => debug!("Reaped child: {:?}", status),
        }
    }
}

/// Parent pid from `/proc/<pid>/stat`.
pub fn parent_pid(pid: u32) -> Option<u32> {
    let stat = fs::read_to_string(format!("/proc/{}/stat", pid)).ok()?;
    parse_ppid(&stat)
}

/// The command name may contain spaces and parentheses, so fields are
/// counted from the last `)`.
fn parse_ppid(stat: &str) -> Option<u32> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(1)?.parse().ok()
}

/// Whether `child` descends from `ancestor`.
pub fn is_descendant(ancestor: u32, child: u32) -> bool {
    is_descendant_with(ancestor, child, parent_pid)
}

fn is_descendant_with(ancestor: u32, mut child: u32, parent: impl Fn(u32) -> Option<u32>) -> bool {
    while child != ancestor && child > 1 {
        match parent(child) {
            Some(p) if p != child => child = p,
            _ => return false,
        }
    }
    child == ancestor
}

/// Pid of the first process whose `comm` is `name`.
pub fn find_process(name: &str) -> Option<i32> {
    let entries = fs::read_dir("/proc").ok()?;
    for entry in entries.flatten() {
        let Some(pid) = entry
            .file_name()
            .to_str()
            .and_then(|s| s.parse::<i32>().ok())
        else {
            continue;
        };
        let Ok(comm) = fs::read_to_string(entry.path().join("comm")) else {
            continue;
        };
        if comm.trim_end() == name {
            return Some(pid);
        }
    }
    None
}

/// Queue `SIGRTMIN + signal` carrying `value` to `pid`.
pub fn signal_status(pid: i32, signal: i32, value: i32) -> Result<()> {
    let sig = libc::SIGRTMIN() + signal;
    let sv = libc::sigval {
        sival_ptr: value as isize as *mut libc::c_void,
    };
    // SAFETY: plain syscall wrapper, no memory is shared
    let ret = unsafe { libc::sigqueue(pid, sig, sv) };
    if ret != 0 {
        return Err(std::io::Error::last_os_error())
            .with_context(|| format!("sigqueue({}, {}) failed", pid, sig));
    }
    debug!("Sent signal {} with value {} to {}", sig, value, pid);
    Ok(())
}

// Copyright (c) 2022 Huawei Technologies Co.,Ltd. All rights reserved.
//
// sysMaster is licensed under Mulan PSL v2.
// You can use this software according to the terms and conditions of the Mulan
// PSL v2.
// You may obtain a copy of Mulan PSL v2 at:
//         http://license.coscl.org.cn/MulanPSL2
// THIS SOFTWARE IS PROVIDED ON AN "AS IS" BASIS, WITHOUT WARRANTIES OF ANY
// KIND, EITHER EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO
// NON-INFRINGEMENT, MERCHANTABILITY OR FIT FOR A PARTICULAR PURPOSE.
// See the Mulan PSL v2 for more details.

//! A named service bound to at most one live process.
//!
//! The binding is a cached [`ProcessDescriptor`], set by [`Service::start`] from
//! the pid of the spawn, or resolved from the process table by pattern when
//! nothing is cached. A cached descriptor is checked against the process table
//! on every query, so it never outlives the process it describes.
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::fmt;
use std::fs::File;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

use crate::config::{SectionLauncher, ServiceEntry};
use crate::directory::{ProcessDescriptor, ProcessDirectory, ProcfsDirectory};
use crate::error::*;

const WAIT_INTERVAL: Duration = Duration::from_millis(50);
/// how long to wait for the exit after SIGKILL
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Whether a service holds a cached process, the process table is not consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Unbound,
    Bound,
}

pub struct Service {
    name: String,
    pattern: String,
    command: String,
    directory: PathBuf,
    settings: SectionLauncher,
    procs: Arc<dyn ProcessDirectory>,

    bound: Option<ProcessDescriptor>,
    // only set when this instance spawned the process, used to reap it
    child: Option<Child>,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("command", &self.command)
            .field("directory", &self.directory)
            .field("bound", &self.bound)
            .finish()
    }
}

impl Service {
    /// Create a service against the live `/proc` table with the default
    /// launcher settings.
    pub fn new(
        name: impl Into<String>,
        pattern: impl Into<String>,
        command: impl Into<String>,
        directory: impl Into<PathBuf>,
    ) -> Service {
        Service {
            name: name.into(),
            pattern: pattern.into(),
            command: command.into(),
            directory: directory.into(),
            settings: SectionLauncher::default(),
            procs: Arc::new(ProcfsDirectory),
            bound: None,
            child: None,
        }
    }

    /// Create a service from a registry entry.
    pub fn from_entry(
        entry: &ServiceEntry,
        settings: &SectionLauncher,
        procs: Arc<dyn ProcessDirectory>,
    ) -> Service {
        Service::new(
            entry.name.clone(),
            entry.pattern.clone(),
            entry.command.clone(),
            entry.directory.clone(),
        )
        .with_settings(settings.clone())
        .with_process_directory(procs)
    }

    pub fn with_settings(mut self, settings: SectionLauncher) -> Service {
        self.settings = settings;
        self
    }

    pub fn with_process_directory(mut self, procs: Arc<dyn ProcessDirectory>) -> Service {
        self.procs = procs;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `<log directory>/<name>.log`
    pub fn log_path(&self) -> PathBuf {
        self.settings
            .log_directory()
            .join(format!("{}.log", self.name))
    }

    pub fn state(&self) -> ServiceState {
        match self.bound {
            Some(_) => ServiceState::Bound,
            None => ServiceState::Unbound,
        }
    }

    /// Spawn the command through the shell, in its own process group, with
    /// stdout and stderr going to [`Service::log_path`].
    ///
    /// Nothing stops a second start while a process is bound: the new process
    /// replaces the binding and the old one keeps running.
    pub fn start(&mut self) -> Result<Pid> {
        let path = self.log_path();
        let stdout = File::create(&path).context(LogFileSnafu { path: path.clone() })?;
        let stderr = stdout
            .try_clone()
            .context(LogFileSnafu { path: path.clone() })?;

        let mut child = Command::new(&self.settings.Shell)
            .arg("-c")
            .arg(&self.command)
            .current_dir(&self.directory)
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .spawn()
            .context(SpawnSnafu { name: &self.name })?;

        let pid = Pid::from_raw(child.id() as i32);
        log::debug!("service {} spawned as pid {}", self.name, pid);

        match self.procs.find_by_pid(pid)? {
            Some(desc) => {
                self.bound = Some(desc);
                self.child = Some(child);
                Ok(pid)
            }
            None => {
                // the lookup missed it; do not leave it running unsupervised
                if let Err(e) = child.kill() {
                    log::debug!("failed to kill lost pid {}: {}", pid, e);
                }
                if let Err(e) = child.wait() {
                    log::debug!("failed to reap lost pid {}: {}", pid, e);
                }
                self.bound = None;
                self.child = None;
                LostSnafu {
                    name: &self.name,
                    pid: pid.as_raw(),
                }
                .fail()
            }
        }
    }

    /// The pid of the bound process, resolving it by pattern if nothing is cached.
    pub fn pid(&mut self) -> Result<Pid> {
        match self.resolve()? {
            Some(desc) => Ok(desc.pid),
            None => NotRunningSnafu { name: &self.name }.fail(),
        }
    }

    /// Whether a process can be resolved for this service. Absence is `Ok(false)`.
    pub fn is_running(&mut self) -> Result<bool> {
        match self.pid() {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_running() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Terminate the process group of the resolved process.
    ///
    /// SIGTERM first; if any member of the group is still in the table after
    /// the stop timeout, SIGKILL. A group that outlives the SIGKILL grace is a
    /// `StopTimeout` error and the service stays bound. With a zero timeout the
    /// SIGTERM is all that happens. Stopping a service that is not running
    /// succeeds.
    pub fn stop(&mut self) -> Result<()> {
        let target = match self.resolve()? {
            Some(t) => t,
            None => {
                log::debug!("service {} is not running, nothing to stop", self.name);
                return Ok(());
            }
        };

        self.procs.kill(target.pid, Signal::SIGTERM)?;

        let timeout = self.settings.stop_timeout();
        if !timeout.is_zero() {
            let left = self.wait_group_gone(&target, timeout)?;
            if let Some(member) = left.first() {
                log::debug!(
                    "service {}: {} process(es) of group {} survived SIGTERM for {:?}, sending SIGKILL",
                    self.name,
                    left.len(),
                    target.pgid,
                    timeout
                );
                self.procs.kill(member.pid, Signal::SIGKILL)?;
                if !self.wait_group_gone(&target, KILL_GRACE)?.is_empty() {
                    return StopTimeoutSnafu {
                        name: &self.name,
                        pid: target.pid.as_raw(),
                    }
                    .fail();
                }
            }
        }

        if let Some(mut child) = self.child.take() {
            let _ = child.try_wait();
        }
        self.bound = None;

        Ok(())
    }

    /// Drop whatever is cached if its process has gone, then fall back to
    /// the pattern. The pattern result is cached and revalidated next time.
    fn resolve(&mut self) -> Result<Option<ProcessDescriptor>> {
        if let Some(bound) = self.bound.clone() {
            if self.still_bound(&bound)? {
                return Ok(Some(bound));
            }
            log::debug!("service {} lost pid {}", self.name, bound.pid);
            self.bound = None;
            self.child = None;
        }

        let mut found = self.procs.find_all_by_cmdline(&self.pattern)?;
        if found.len() > 1 {
            let pids: Vec<i32> = found.iter().map(|d| d.pid.as_raw()).collect();
            if self.settings.StrictMatch {
                return AmbiguousMatchSnafu {
                    pattern: &self.pattern,
                    pids,
                }
                .fail();
            }
            log::warn!(
                "service {}: pattern '{}' matches pids {:?}, using {}",
                self.name,
                self.pattern,
                pids,
                pids[0]
            );
        }

        if found.is_empty() {
            return Ok(None);
        }
        let desc = found.swap_remove(0);
        self.bound = Some(desc.clone());
        Ok(Some(desc))
    }

    fn still_bound(&mut self, bound: &ProcessDescriptor) -> Result<bool> {
        if self.reaped(bound.pid) {
            return Ok(false);
        }

        // same pgid guards against the pid having been reused meanwhile
        Ok(matches!(
            self.procs.find_by_pid(bound.pid)?,
            Some(now) if now.pgid == bound.pgid
        ))
    }

    /// Whether our own child `pid` has exited, reaping it if so.
    fn reaped(&mut self, pid: Pid) -> bool {
        match &mut self.child {
            Some(child) if child.id() as i32 == pid.as_raw() => {
                matches!(child.try_wait(), Ok(Some(_)))
            }
            _ => false,
        }
    }

    /// Poll until nothing a kill of `target` reaches is left, or `timeout`
    /// passes. Returns the members still alive.
    fn wait_group_gone(
        &mut self,
        target: &ProcessDescriptor,
        timeout: Duration,
    ) -> Result<Vec<ProcessDescriptor>> {
        let start = Instant::now();
        loop {
            // reap our own leader so it does not linger as a zombie
            self.reaped(target.pid);
            let left = self.procs.find_group(target)?;
            if left.is_empty() || start.elapsed() >= timeout {
                return Ok(left);
            }
            sleep(WAIT_INTERVAL);
        }
    }
}

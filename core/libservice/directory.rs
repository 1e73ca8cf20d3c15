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

//! The process directory: the only view of the OS process table the services need.
//!
//! A service never persists its pid. Every cold lookup goes back to the live
//! process table, either by pid or by a substring of the command line, which
//! lets a restarted launcher find the services it started in a previous life.
pub use basic::process::ProcessDescriptor;
use nix::sys::signal::Signal;
use nix::unistd::Pid;

use crate::error::Result;

/// Read access to the process table plus the ability to signal a process group.
pub trait ProcessDirectory: Send + Sync {
    /// Look up `pid`. `Ok(None)` when no live process has it.
    fn find_by_pid(&self, pid: Pid) -> Result<Option<ProcessDescriptor>>;

    /// Every live process whose command line contains `pattern`, by ascending pid.
    fn find_all_by_cmdline(&self, pattern: &str) -> Result<Vec<ProcessDescriptor>>;

    /// The first match of `find_all_by_cmdline`.
    fn find_by_cmdline(&self, pattern: &str) -> Result<Option<ProcessDescriptor>> {
        Ok(self.find_all_by_cmdline(pattern)?.into_iter().next())
    }

    /// Send `signal` to the process group of `pid`. A process that no longer
    /// exists is not an error.
    fn kill(&self, pid: Pid, signal: Signal) -> Result<()>;

    /// The live processes a `kill` of `target` reaches, by ascending pid. The
    /// group leader may be gone while other members are still alive.
    fn find_group(&self, target: &ProcessDescriptor) -> Result<Vec<ProcessDescriptor>>;
}

/// The process directory backed by `/proc`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcfsDirectory;

impl ProcessDirectory for ProcfsDirectory {
    fn find_by_pid(&self, pid: Pid) -> Result<Option<ProcessDescriptor>> {
        Ok(basic::process::find_by_pid(pid)?)
    }

    fn find_all_by_cmdline(&self, pattern: &str) -> Result<Vec<ProcessDescriptor>> {
        Ok(basic::process::find_all_by_cmdline(pattern)?)
    }

    fn kill(&self, pid: Pid, signal: Signal) -> Result<()> {
        Ok(basic::process::kill_group(pid, signal)?)
    }

    fn find_group(&self, target: &ProcessDescriptor) -> Result<Vec<ProcessDescriptor>> {
        Ok(basic::process::find_group(target)?)
    }
}

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

//! process table functions, backed by /proc
use crate::error::*;
use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::{getpgrp, getpid, Pid};
use procfs::process::Process;
use procfs::ProcError;

const ZOMBIE_STATE: char = 'Z';

/// A point-in-time snapshot of one entry of the process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    /// the process id
    pub pid: Pid,
    /// the process group the process belongs to
    pub pgid: Pid,
    /// argv joined by single spaces, empty for kernel threads
    pub cmdline: String,
}

impl ProcessDescriptor {
    /// The function `matches` checks whether the command line contains `pattern`.
    ///
    /// Arguments:
    ///
    /// * `pattern`: a plain substring, no wildcard or regex syntax is interpreted.
    ///
    /// Returns:
    ///
    /// true if `pattern` occurs anywhere in the joined command line.
    pub fn matches(&self, pattern: &str) -> bool {
        !pattern.is_empty() && self.cmdline.contains(pattern)
    }
}

/// The process has gone away between listing and reading it. procfs reports
/// that either as NotFound or as a raw io error depending on which file it
/// was reading at the time.
fn vanished(err: &ProcError) -> bool {
    match err {
        ProcError::NotFound(_) => true,
        ProcError::Io(e, _) => matches!(
            e.raw_os_error().map(Errno::from_i32),
            Some(Errno::ENOENT) | Some(Errno::ESRCH)
        ),
        _ => false,
    }
}

fn describe(process: &Process) -> Result<Option<ProcessDescriptor>> {
    if process.stat.state == ZOMBIE_STATE {
        return Ok(None);
    }

    let cmdline = match process.cmdline() {
        Ok(argv) => argv.join(" "),
        Err(e) if vanished(&e) => return Ok(None),
        Err(e) => return Err(Error::Proc { source: e }),
    };

    Ok(Some(ProcessDescriptor {
        pid: Pid::from_raw(process.stat.pid),
        pgid: Pid::from_raw(process.stat.pgrp),
        cmdline,
    }))
}

/// The function `valid_pid` checks if a given process ID (`pid`) is valid or not.
pub fn valid_pid(pid: Pid) -> bool {
    pid > Pid::from_raw(0)
}

/// Look up a single pid in the process table.
///
/// Arguments:
///
/// * `pid`: the process to look up.
///
/// Returns:
///
/// `Ok(None)` if there is no such process or it is a zombie. Absence is the
/// common answer for a stopped service and is not reported as an error.
pub fn find_by_pid(pid: Pid) -> Result<Option<ProcessDescriptor>> {
    if !valid_pid(pid) {
        return Err(Error::Invalid {
            what: format!("pid {}", pid),
        });
    }

    let process = match Process::new(pid.as_raw()) {
        Ok(p) => p,
        Err(e) if vanished(&e) => return Ok(None),
        Err(e) => return Err(Error::Proc { source: e }),
    };

    describe(&process)
}

/// Every live process except the caller that satisfies `filter`, by ascending pid.
fn scan<F>(filter: F) -> Result<Vec<ProcessDescriptor>>
where
    F: Fn(&ProcessDescriptor) -> bool,
{
    let myself = getpid();
    let all_processes = procfs::process::all_processes().context(ProcSnafu)?;

    let mut found = Vec::new();
    for process in all_processes.iter() {
        if process.stat.pid == myself.as_raw() {
            continue;
        }
        match describe(process) {
            Ok(Some(desc)) if filter(&desc) => found.push(desc),
            Ok(_) => {}
            // e.g. hidepid mounts, other users' processes are not readable
            Err(e) => log::debug!("skip pid {}: {}", process.stat.pid, e),
        }
    }
    found.sort_by_key(|d| d.pid);

    Ok(found)
}

/// Scan the whole process table for command lines containing `pattern`.
///
/// The calling process is never part of the result. Matches are ordered by
/// ascending pid, so the first element is what `find_by_cmdline` returns.
pub fn find_all_by_cmdline(pattern: &str) -> Result<Vec<ProcessDescriptor>> {
    if pattern.is_empty() {
        return Err(Error::Invalid {
            what: "empty command line pattern".to_string(),
        });
    }

    scan(|desc| desc.matches(pattern))
}

/// Live members of process group `pgid`, by ascending pid. Zombies are not
/// members.
pub fn find_by_pgid(pgid: Pid) -> Result<Vec<ProcessDescriptor>> {
    if !valid_pid(pgid) {
        return Err(Error::Invalid {
            what: format!("process group {}", pgid),
        });
    }

    scan(|desc| desc.pgid == pgid)
}

/// First process, by ascending pid, whose command line contains `pattern`.
pub fn find_by_cmdline(pattern: &str) -> Result<Option<ProcessDescriptor>> {
    Ok(find_all_by_cmdline(pattern)?.into_iter().next())
}

/// whether a signal for a member of `pgid` goes to the whole group
fn signals_group(pgid: Pid) -> bool {
    valid_pid(pgid) && pgid != getpgrp()
}

/// send `signal` to the process group of `pid`
///
/// Children started by a shell wrapper share its group, so they receive the
/// signal too. When `pid` lives in our own group only `pid` is signalled.
/// A process that is already gone counts as success.
pub fn kill_group(pid: Pid, signal: Signal) -> Result<()> {
    let target = match find_by_pid(pid)? {
        Some(t) => t,
        None => {
            log::debug!("pid {} is already gone, not sending {}", pid, signal);
            return Ok(());
        }
    };

    let ret = if signals_group(target.pgid) {
        log::debug!("sending {} to process group {}", signal, target.pgid);
        killpg(target.pgid, signal)
    } else {
        log::debug!("sending {} to pid {}", signal, pid);
        kill(pid, signal)
    };

    match ret {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => Ok(()),
        Err(e) if errno_is_privilege(e) => Err(Error::Permission {
            pid: pid.as_raw(),
            source: e,
        }),
        Err(e) => Err(Error::Nix { source: e }),
    }
}

/// The live processes `kill_group` on `target` reaches: the members of its
/// group, or `target` alone when it shares our group.
pub fn find_group(target: &ProcessDescriptor) -> Result<Vec<ProcessDescriptor>> {
    if signals_group(target.pgid) {
        return find_by_pgid(target.pgid);
    }

    Ok(find_by_pid(target.pid)?
        .filter(|now| now.pgid == target.pgid)
        .into_iter()
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::{CommandExt, ExitStatusExt};
    use std::process::{Child, Command};

    fn spawn_sleep(secs: &str) -> Child {
        Command::new("sleep")
            .arg(secs)
            .process_group(0)
            .spawn()
            .expect("Failed to fork sleep")
    }

    #[test]
    fn test_find_by_pid() {
        let mut child = spawn_sleep("1011.5");
        let pid = Pid::from_raw(child.id() as i32);

        let desc = find_by_pid(pid).unwrap().unwrap();
        assert_eq!(desc.pid, pid);
        assert_eq!(desc.pgid, pid);
        assert_eq!(desc.cmdline, "sleep 1011.5");

        child.kill().unwrap();
        child.wait().unwrap();
        assert_eq!(find_by_pid(pid).unwrap(), None);
    }

    #[test]
    fn test_find_by_pid_invalid() {
        assert!(find_by_pid(Pid::from_raw(0)).is_err());
        assert!(find_by_pid(Pid::from_raw(-4)).is_err());
        assert_eq!(find_by_pid(Pid::from_raw(i32::MAX)).unwrap(), None);
    }

    #[test]
    fn test_find_by_cmdline() {
        let mut child = spawn_sleep("1012.5");
        let pid = Pid::from_raw(child.id() as i32);

        let desc = find_by_cmdline("sleep 1012.5").unwrap().unwrap();
        assert_eq!(desc.pid, pid);
        assert_eq!(find_by_cmdline("sleep 1012.25").unwrap(), None);

        child.kill().unwrap();
        child.wait().unwrap();
        assert_eq!(find_by_cmdline("sleep 1012.5").unwrap(), None);
    }

    #[test]
    fn test_find_all_by_cmdline_sorted() {
        let mut a = spawn_sleep("1013.5");
        let mut b = spawn_sleep("1013.5");

        let found = find_all_by_cmdline("sleep 1013.5").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found[0].pid < found[1].pid);

        for c in [&mut a, &mut b] {
            c.kill().unwrap();
            c.wait().unwrap();
        }
    }

    #[test]
    fn test_empty_pattern() {
        assert!(find_all_by_cmdline("").is_err());
        let desc = ProcessDescriptor {
            pid: Pid::from_raw(10),
            pgid: Pid::from_raw(10),
            cmdline: "sleep 10".to_string(),
        };
        assert!(!desc.matches(""));
        assert!(desc.matches("eep 1"));
    }

    #[test]
    fn test_kill_group() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("sleep 1014.5 & sleep 1014.75; wait")
            .process_group(0)
            .spawn()
            .expect("Failed to fork sh");
        let pid = Pid::from_raw(child.id() as i32);
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(find_by_cmdline("sleep 1014.5").unwrap().is_some());

        kill_group(pid, Signal::SIGTERM).unwrap();
        let status = child.wait().unwrap();
        assert_eq!(status.signal(), Some(Signal::SIGTERM as i32));

        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(find_by_cmdline("sleep 1014.5").unwrap().is_none());
        assert!(find_by_cmdline("sleep 1014.75").unwrap().is_none());
    }

    #[test]
    fn test_kill_group_gone() {
        assert!(kill_group(Pid::from_raw(i32::MAX), Signal::SIGTERM).is_ok());
    }

    #[test]
    fn test_find_group() {
        let mut child = Command::new("sh")
            .arg("-c")
            .arg("sleep 1015.5 & sleep 1015.75; wait")
            .process_group(0)
            .spawn()
            .expect("Failed to fork sh");
        let pid = Pid::from_raw(child.id() as i32);
        std::thread::sleep(std::time::Duration::from_millis(200));

        let leader = find_by_pid(pid).unwrap().unwrap();
        let members = find_group(&leader).unwrap();
        assert_eq!(members.len(), 3);
        assert_eq!(members[0].pid, pid);
        assert!(members.iter().all(|m| m.pgid == pid));
        assert_eq!(find_by_pgid(pid).unwrap(), members);

        kill_group(pid, Signal::SIGKILL).unwrap();
        child.wait().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(find_group(&leader).unwrap().is_empty());
    }

    #[test]
    fn test_find_group_of_own_group() {
        let me = find_by_pid(getpid()).unwrap().unwrap();
        // only the target itself, never the rest of our group
        assert_eq!(find_group(&me).unwrap(), vec![me]);
        assert!(find_by_pgid(Pid::from_raw(0)).is_err());
    }
}

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

//! Error define. Everything the launcher can fail with is an explicit value of
//! this enum, nothing here is retried or logged on behalf of the caller.
//! Failures of the process table itself come from the `basic` crate and are
//! wrapped in `Directory`.

pub use nix::errno::Errno;
use snafu::prelude::*;
#[allow(unused_imports)]
pub use snafu::ResultExt;
use std::path::PathBuf;

#[allow(missing_docs)]
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
#[non_exhaustive]
pub enum Error {
    /// neither a cached process nor a pattern match exists
    #[snafu(display("Service '{}' is not running.", name))]
    NotRunning { name: String },

    #[snafu(display("Failed to spawn service '{}': {}", name, source))]
    Spawn {
        name: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to create log file {:?}: {}", path, source))]
    LogFile {
        path: PathBuf,
        source: std::io::Error,
    },

    /// spawned, but the pid was gone before it could be looked up
    #[snafu(display("Service '{}' was spawned as pid {} but lost track of.", name, pid))]
    Lost { name: String, pid: i32 },

    /// the process group outlived SIGKILL
    #[snafu(display("Service '{}' (pid {}) did not exit after SIGKILL.", name, pid))]
    StopTimeout { name: String, pid: i32 },

    #[snafu(display("Permission denied to signal pid {}: {}", pid, source))]
    Permission { pid: i32, source: nix::Error },

    #[snafu(display("Pattern '{}' matches more than one process: {:?}", pattern, pids))]
    AmbiguousMatch { pattern: String, pids: Vec<i32> },

    #[snafu(display("Service '{}' is defined twice.", name))]
    DuplicateService { name: String },

    #[snafu(display("Process directory: {}", source))]
    Directory { source: basic::Error },

    #[snafu(display("Confique error: {}", source))]
    Config { source: confique::Error },
}

impl Error {
    /// whether the error only says that the service has no live process
    pub fn is_not_running(&self) -> bool {
        matches!(self, Error::NotRunning { .. })
    }

    /// Translate the error to an error number, for callers that exit with one.
    pub fn get_errno(&self) -> i32 {
        match self {
            Error::NotRunning { .. } => Errno::ESRCH as i32,
            Error::Spawn { source, .. } | Error::LogFile { source, .. } => {
                source.raw_os_error().unwrap_or(Errno::EIO as i32)
            }
            Error::Lost { .. } => Errno::ESRCH as i32,
            Error::StopTimeout { .. } => Errno::ETIMEDOUT as i32,
            Error::Permission { source, .. } => *source as i32,
            Error::AmbiguousMatch { .. } => Errno::ENOTUNIQ as i32,
            Error::DuplicateService { .. } => Errno::EEXIST as i32,
            Error::Directory { source } => source.get_errno(),
            Error::Config { .. } => Errno::EINVAL as i32,
        }
    }
}

impl From<basic::Error> for Error {
    fn from(e: basic::Error) -> Error {
        match e {
            basic::Error::Permission { pid, source } => Error::Permission { pid, source },
            e => Error::Directory { source: e },
        }
    }
}

/// Result alias of the launcher
pub type Result<T, E = Error> = std::result::Result<T, E>;

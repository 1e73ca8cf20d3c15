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
//
#![allow(non_snake_case)]
use confique::Config;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::*;

pub const LAUNCHER_CONFIG: &str = "/etc/servicelauncher/launcher.toml";

#[derive(Config, Default, Debug, Clone)]
pub struct LauncherConfig {
    #[config(nested)]
    pub Launcher: SectionLauncher,
}

#[derive(Config, Debug, Clone)]
pub struct SectionLauncher {
    /// where `<name>.log` of every started service goes
    #[config(default = "/tmp", env = "SERVICELAUNCHER_LOG_DIRECTORY")]
    pub LogDirectory: String,
    #[config(default = "bash")]
    pub Shell: String,
    /// 0 means stop only sends the signal and does not wait for the exit
    #[config(default = 5)]
    pub StopTimeoutSec: u64,
    /// refuse to pick one process when the pattern matches several
    #[config(default = false)]
    pub StrictMatch: bool,
}

impl Default for SectionLauncher {
    fn default() -> Self {
        SectionLauncher {
            LogDirectory: "/tmp".to_string(),
            Shell: "bash".to_string(),
            StopTimeoutSec: 5,
            StrictMatch: false,
        }
    }
}

impl SectionLauncher {
    pub fn log_directory(&self) -> PathBuf {
        PathBuf::from(&self.LogDirectory)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.StopTimeoutSec)
    }
}

impl LauncherConfig {
    /// Load from the environment and `file` (or the system file), falling back
    /// to the defaults if that fails.
    pub fn new(file: Option<&str>) -> LauncherConfig {
        match Self::load(Path::new(file.unwrap_or(LAUNCHER_CONFIG))) {
            Ok(c) => c,
            Err(e) => {
                log::warn!("using default launcher config: {}", e);
                LauncherConfig::default()
            }
        }
    }

    /// Load from the environment and `file`. A missing file is not an error.
    pub fn load(file: &Path) -> Result<LauncherConfig> {
        LauncherConfig::builder()
            .env()
            .file(file)
            .load()
            .context(ConfigSnafu)
    }
}

/// One service as a registry file would describe it.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub name: String,
    pub pattern: String,
    pub command: String,
    pub directory: PathBuf,
}

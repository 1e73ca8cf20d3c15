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

//! Lifecycle core of the service launcher.
//!
//! A [`Service`] is started through the shell in its own process group and is
//! found again later by a substring of its command line, so a launcher that
//! restarts can still report on and stop the services it launched before.
//! [`Services`] is the registry of services by name.
pub mod config;
pub mod directory;
pub mod error;
pub mod service;
pub mod services;

pub use config::{LauncherConfig, SectionLauncher, ServiceEntry, LAUNCHER_CONFIG};
pub use directory::{ProcessDescriptor, ProcessDirectory, ProcfsDirectory};
pub use error::{Error, Result};
pub use service::{Service, ServiceState};
pub use services::Services;

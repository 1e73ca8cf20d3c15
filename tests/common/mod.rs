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

#![allow(dead_code)]
use std::path::PathBuf;
use std::thread::sleep;
use std::time::{Duration, Instant};

use servicelauncher::SectionLauncher;

/// launcher settings logging into a fresh scratch dir named after the test
pub fn settings(test: &str) -> (SectionLauncher, PathBuf) {
    let dir = libtests::get_scratch_dir(test).expect("failed to create scratch dir");
    let settings = SectionLauncher {
        LogDirectory: dir.to_string_lossy().into_owned(),
        Shell: "sh".to_string(),
        StopTimeoutSec: 2,
        StrictMatch: false,
    };
    (settings, dir)
}

/// poll `cond` until it holds or `timeout` passes
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut cond: F) -> bool {
    let start = Instant::now();
    loop {
        if cond() {
            return true;
        }
        if start.elapsed() >= timeout {
            return false;
        }
        sleep(Duration::from_millis(50));
    }
}

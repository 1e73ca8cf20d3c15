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

//! This crate provides common functions for unit and integration tests
use std::{
    env, fs,
    io::{self, ErrorKind},
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
};

/// get the workspace root path, the first ancestor whose Cargo.toml declares a workspace
pub fn get_project_root() -> io::Result<PathBuf> {
    let path = env::current_dir()?;
    let mut current_path = Some(path.as_path());

    while let Some(p) = current_path {
        let manifest = p.join("Cargo.toml");
        if manifest.is_file() && fs::read_to_string(&manifest)?.contains("[workspace]") {
            return Ok(p.into());
        }

        current_path = p.parent();
    }

    Err(io::Error::new(ErrorKind::NotFound, "NotFound"))
}

/// get the crate root path
pub fn get_crate_root() -> io::Result<PathBuf> {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Ok(PathBuf::from(manifest_dir))
}

/// get the target test dir
pub fn get_target_test_dir() -> io::Result<PathBuf> {
    let test_dir = get_project_root()?.join("target").join("tests");

    if !test_dir.exists() {
        fs::create_dir_all(&test_dir)?;
    }

    Ok(test_dir)
}

/// get an empty scratch directory named `name` below the target test dir
pub fn get_scratch_dir(name: &str) -> io::Result<PathBuf> {
    let dir = get_target_test_dir()?.join(name);

    if dir.exists() {
        fs::remove_dir_all(&dir)?;
    }
    fs::create_dir_all(&dir)?;

    Ok(dir)
}

/// write an executable shell script `name` into `dir`
pub fn write_script(dir: &Path, name: &str, body: &str) -> io::Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;

    Ok(path)
}

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

//! The registry of services, addressed by name.
use std::collections::hash_map::{Iter, IterMut};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{LauncherConfig, ServiceEntry};
use crate::directory::ProcessDirectory;
use crate::error::*;
use crate::service::Service;

#[derive(Debug, Default)]
pub struct Services {
    services: HashMap<String, Service>,
}

impl Services {
    pub fn new() -> Services {
        Services::default()
    }

    /// Build the registry from entries the caller parsed, every service
    /// sharing `procs`. Two entries with the same name are an error.
    pub fn from_entries<I>(
        entries: I,
        config: &LauncherConfig,
        procs: Arc<dyn ProcessDirectory>,
    ) -> Result<Services>
    where
        I: IntoIterator<Item = ServiceEntry>,
    {
        let mut services = Services::new();
        for entry in entries {
            if services.contains(&entry.name) {
                return DuplicateServiceSnafu { name: entry.name }.fail();
            }
            services.insert(Service::from_entry(&entry, &config.Launcher, procs.clone()));
        }
        Ok(services)
    }

    /// Insert `service` under its name, returning the service it replaced.
    pub fn insert(&mut self, service: Service) -> Option<Service> {
        self.services.insert(service.name().to_string(), service)
    }

    pub fn get(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Service> {
        self.services.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Service> {
        self.services.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.services.contains_key(name)
    }

    /// service names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    pub fn iter(&self) -> Iter<'_, String, Service> {
        self.services.iter()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, String, Service> {
        self.services.iter_mut()
    }

    /// Names of the services that currently resolve to a process, sorted.
    pub fn running(&mut self) -> Result<Vec<String>> {
        let mut running = Vec::new();
        for (name, service) in self.services.iter_mut() {
            if service.is_running()? {
                running.push(name.clone());
            }
        }
        running.sort();
        Ok(running)
    }

    /// Stop every service. All of them are attempted, the first error is returned.
    pub fn stop_all(&mut self) -> Result<()> {
        let mut first_err = None;
        for service in self.services.values_mut() {
            if let Err(e) = service.stop() {
                log::debug!("failed to stop service {}: {}", service.name(), e);
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<'a> IntoIterator for &'a Services {
    type Item = (&'a String, &'a Service);
    type IntoIter = Iter<'a, String, Service>;

    fn into_iter(self) -> Self::IntoIter {
        self.services.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::fake::FakeDirectory;
    use nix::unistd::Pid;
    use std::path::PathBuf;

    fn entry(name: &str, pattern: &str) -> ServiceEntry {
        ServiceEntry {
            name: name.to_string(),
            pattern: pattern.to_string(),
            command: pattern.to_string(),
            directory: PathBuf::from("/srv"),
        }
    }

    fn config() -> LauncherConfig {
        let mut config = LauncherConfig::default();
        config.Launcher.StopTimeoutSec = 1;
        config
    }

    #[test]
    fn test_from_entries() {
        let procs = Arc::new(FakeDirectory::default());
        let services = Services::from_entries(
            vec![entry("web", "run-web.sh"), entry("db", "run-db.sh")],
            &config(),
            procs,
        )
        .unwrap();

        assert_eq!(services.len(), 2);
        assert_eq!(services.names(), vec!["db", "web"]);
        assert_eq!(services.get("web").unwrap().pattern(), "run-web.sh");
        assert!(services.get("cache").is_none());
    }

    #[test]
    fn test_duplicate_name() {
        let procs = Arc::new(FakeDirectory::default());
        let err = Services::from_entries(
            vec![entry("web", "run-web.sh"), entry("web", "run-web2.sh")],
            &config(),
            procs,
        )
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateService { name } if name == "web"));
    }

    #[test]
    fn test_running_and_stop_all() {
        let procs = Arc::new(FakeDirectory::default());
        procs.spawn(11, "sh run-web.sh");
        procs.spawn(12, "sh run-db.sh");
        let mut services = Services::from_entries(
            vec![
                entry("web", "run-web.sh"),
                entry("db", "run-db.sh"),
                entry("cache", "run-cache.sh"),
            ],
            &config(),
            procs.clone(),
        )
        .unwrap();

        assert_eq!(services.running().unwrap(), vec!["db", "web"]);
        assert_eq!(
            services.get_mut("web").unwrap().pid().unwrap(),
            Pid::from_raw(11)
        );

        services.stop_all().unwrap();
        assert!(services.running().unwrap().is_empty());
        assert!(!procs.contains(11));
        assert!(!procs.contains(12));
    }

    #[test]
    fn test_stop_all_reports_error() {
        let procs = Arc::new(FakeDirectory::denying_kill());
        procs.spawn(11, "sh run-web.sh");
        let mut services =
            Services::from_entries(vec![entry("web", "run-web.sh")], &config(), procs).unwrap();

        assert!(matches!(
            services.stop_all(),
            Err(Error::Permission { pid: 11, .. })
        ));
    }

    #[test]
    fn test_insert_and_remove() {
        let mut services = Services::new();
        assert!(services.is_empty());
        assert!(services
            .insert(Service::new("web", "a", "a", "/"))
            .is_none());
        let old = services.insert(Service::new("web", "b", "b", "/")).unwrap();
        assert_eq!(old.pattern(), "a");
        assert_eq!(services.len(), 1);

        let removed = services.remove("web").unwrap();
        assert_eq!(removed.pattern(), "b");
        assert!(!services.contains("web"));
        assert_eq!((&services).into_iter().count(), 0);
    }
}

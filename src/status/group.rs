// src/status/group.rs

//! Registry of statuses grouped by a tag.
//!
//! A task that starts several concurrent sub-operations registers each of
//! their statuses under one group tag, then hands the group's conjunctive
//! status to the scheduler so dependents wait for the whole group.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::cell::Status;

#[derive(Debug, Clone, Default)]
pub struct StatusGroups {
    groups: Arc<Mutex<HashMap<String, Vec<Status>>>>,
}

impl StatusGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `status` under `group`.
    pub fn add(&self, group: &str, status: Status) {
        let mut groups = self.groups.lock().unwrap_or_else(|p| p.into_inner());
        let members = groups.entry(group.to_string()).or_default();
        members.push(status);
        debug!(group, members = members.len(), "status added to group");
    }

    /// Number of statuses registered under `group`.
    pub fn len(&self, group: &str) -> usize {
        let groups = self.groups.lock().unwrap_or_else(|p| p.into_inner());
        groups.get(group).map(Vec::len).unwrap_or(0)
    }

    /// Conjunctive status over everything registered under `group`, or
    /// `None` if nothing was registered.
    pub fn combined(&self, group: &str) -> Option<Status> {
        let groups = self.groups.lock().unwrap_or_else(|p| p.into_inner());
        let members = groups.get(group)?;
        if members.is_empty() {
            return None;
        }
        Some(Status::all(members.iter().cloned()))
    }

    /// Forget a group. Statuses already combined are unaffected.
    pub fn clear(&self, group: &str) {
        let mut groups = self.groups.lock().unwrap_or_else(|p| p.into_inner());
        groups.remove(group);
    }
}

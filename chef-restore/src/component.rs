//! Restorable component kinds.

use crate::utils::errors::{RestoreError, Result};
use std::fmt;
use std::str::FromStr;

/// One restorable entity category. The variant order is the restore order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Clients,
    Users,
    Nodes,
    Roles,
    DataBags,
    Environments,
    Cookbooks,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 7] = [
        ComponentKind::Clients,
        ComponentKind::Users,
        ComponentKind::Nodes,
        ComponentKind::Roles,
        ComponentKind::DataBags,
        ComponentKind::Environments,
        ComponentKind::Cookbooks,
    ];

    /// Name of the component's subdirectory in a backup
    pub fn dir_name(self) -> &'static str {
        match self {
            ComponentKind::Clients => "clients",
            ComponentKind::Users => "users",
            ComponentKind::Nodes => "nodes",
            ComponentKind::Roles => "roles",
            ComponentKind::DataBags => "data_bags",
            ComponentKind::Environments => "environments",
            ComponentKind::Cookbooks => "cookbooks",
        }
    }

    /// Validate component names given on the command line.
    ///
    /// An empty list selects every component in restore order. Any unknown
    /// name fails the whole list, reporting every bad name at once.
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>> {
        if names.is_empty() {
            return Ok(Self::ALL.to_vec());
        }

        let mut kinds = Vec::with_capacity(names.len());
        let mut bad_names = Vec::new();

        for name in names {
            match name.as_ref().parse::<ComponentKind>() {
                Ok(kind) if !kinds.contains(&kind) => kinds.push(kind),
                Ok(_) => {}
                Err(bad) => bad_names.push(bad),
            }
        }

        if bad_names.is_empty() {
            Ok(kinds)
        } else {
            Err(RestoreError::InvalidComponents(bad_names))
        }
    }
}

impl FromStr for ComponentKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.dir_name() == s)
            .ok_or_else(|| s.to_string())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

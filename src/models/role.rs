use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::permission::Permission;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Backoffice,
    /// Lawyer reviewing documents and driving the IRN steps.
    Advogada,
    /// Read-only.
    Visualizador,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Backoffice, Role::Advogada, Role::Visualizador];

    pub fn code(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Backoffice => "BACKOFFICE",
            Role::Advogada => "ADVOGADA",
            Role::Visualizador => "VISUALIZADOR",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Backoffice => "Backoffice",
            Role::Advogada => "Advogada",
            Role::Visualizador => "Visualizador",
        }
    }

    /// Compiled-in permission set, used on first run and after a reset.
    pub fn default_permissions(self) -> BTreeSet<Permission> {
        match self {
            Role::Admin => Permission::ALL.into_iter().collect(),
            Role::Backoffice => Permission::ALL
                .into_iter()
                .filter(|p| *p != Permission::ManageUsers)
                .collect(),
            Role::Advogada => BTreeSet::from([
                Permission::ViewServices,
                Permission::EditService,
                Permission::ChangeStatus,
                Permission::ViewDocuments,
                Permission::UploadDocuments,
                Permission::ViewAllServices,
                Permission::ViewStatistics,
            ]),
            Role::Visualizador => BTreeSet::from([
                Permission::ViewServices,
                Permission::ViewDocuments,
                Permission::ViewStatistics,
            ]),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Role::ALL
            .into_iter()
            .find(|r| r.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| format!("Unknown role '{code}'"))
    }
}

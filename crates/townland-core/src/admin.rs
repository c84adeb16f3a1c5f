//! Admin units: county, barony, civil parish, electoral division

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::identity::AdminKey;

/// The four ancestor levels above a townland
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdminKind {
    County,
    Barony,
    CivilParish,
    ElectoralDivision,
}

impl AdminKind {
    /// All kinds, in the order ancestors are upserted
    pub const ALL: [AdminKind; 4] = [
        AdminKind::County,
        AdminKind::Barony,
        AdminKind::CivilParish,
        AdminKind::ElectoralDivision,
    ];

    /// Short label used in logs and table names
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminKind::County => "county",
            AdminKind::Barony => "barony",
            AdminKind::CivilParish => "civil_parish",
            AdminKind::ElectoralDivision => "electoral_division",
        }
    }
}

impl Display for AdminKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One county, barony, civil parish, or electoral division
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUnit {
    /// Which level this unit sits at
    pub kind: AdminKind,
    /// Canonical key (unique per kind)
    pub key: AdminKey,
    /// Display name
    pub name: Option<String>,
    /// Reference into the Logainm placenames database
    pub logainm_ref: Option<String>,
    /// Owning county, recorded for baronies only
    pub county: Option<AdminKey>,
}

impl AdminUnit {
    /// Create a unit with no names attached
    pub fn new(kind: AdminKind, key: AdminKey) -> Self {
        Self {
            kind,
            key,
            name: None,
            logainm_ref: None,
            county: None,
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the Logainm reference
    pub fn with_logainm_ref(mut self, logainm_ref: impl Into<String>) -> Self {
        self.logainm_ref = Some(logainm_ref.into());
        self
    }

    /// Set the owning county
    pub fn with_county(mut self, county: AdminKey) -> Self {
        self.county = Some(county);
        self
    }

    /// Merge a newer upsert into this unit
    ///
    /// Present fields overwrite; absent fields keep the stored value.
    pub fn merge_from(&mut self, newer: &AdminUnit) {
        if newer.name.is_some() {
            self.name.clone_from(&newer.name);
        }
        if newer.logainm_ref.is_some() {
            self.logainm_ref.clone_from(&newer.logainm_ref);
        }
        if newer.county.is_some() {
            self.county = newer.county;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_existing_for_blank_fields() {
        let mut stored = AdminUnit::new(AdminKind::Barony, AdminKey(7))
            .with_name("Upper Talbotstown")
            .with_logainm_ref("1234")
            .with_county(AdminKey(1));

        stored.merge_from(&AdminUnit::new(AdminKind::Barony, AdminKey(7)));
        assert_eq!(stored.name.as_deref(), Some("Upper Talbotstown"));
        assert_eq!(stored.logainm_ref.as_deref(), Some("1234"));
        assert_eq!(stored.county, Some(AdminKey(1)));

        stored.merge_from(&AdminUnit::new(AdminKind::Barony, AdminKey(7)).with_name("Talbotstown Upper"));
        assert_eq!(stored.name.as_deref(), Some("Talbotstown Upper"));
        assert_eq!(stored.logainm_ref.as_deref(), Some("1234"));
    }

    #[test]
    fn test_kind_labels_are_distinct() {
        let labels: std::collections::HashSet<_> = AdminKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(labels.len(), 4);
    }
}

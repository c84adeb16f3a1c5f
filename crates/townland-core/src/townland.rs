//! The townland record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::admin::AdminKind;
use crate::identity::{AdminKey, TownlandKey};

/// Links from a townland to its four ancestor units
///
/// Every link is optional: a townland may lack a recorded barony or
/// electoral division.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ancestors {
    pub county: Option<AdminKey>,
    pub barony: Option<AdminKey>,
    pub civil_parish: Option<AdminKey>,
    pub electoral_division: Option<AdminKey>,
}

impl Ancestors {
    /// The link for one kind
    pub fn get(&self, kind: AdminKind) -> Option<AdminKey> {
        match kind {
            AdminKind::County => self.county,
            AdminKind::Barony => self.barony,
            AdminKind::CivilParish => self.civil_parish,
            AdminKind::ElectoralDivision => self.electoral_division,
        }
    }

    /// Set the link for one kind
    pub fn set(&mut self, kind: AdminKind, key: Option<AdminKey>) {
        match kind {
            AdminKind::County => self.county = key,
            AdminKind::Barony => self.barony = key,
            AdminKind::CivilParish => self.civil_parish = key,
            AdminKind::ElectoralDivision => self.electoral_division = key,
        }
    }
}

/// Who last edited the source record, and under what terms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Last editor's user name
    pub editor: Option<String>,
    /// Last edit time
    pub edited_at: Option<DateTime<Utc>>,
    /// Attribution string
    pub attribution: Option<String>,
    /// Export timestamp of the source row (Unix seconds)
    pub epoch: Option<i64>,
}

/// A townland, the smallest historical Irish land division
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Townland {
    /// Canonical key
    pub key: TownlandKey,
    /// Primary name (`name` tag)
    pub name: String,
    /// Irish-language name
    pub name_ga: Option<String>,
    /// English-language name
    pub name_en: Option<String>,
    /// Alternate name
    pub alt_name: Option<String>,
    /// Alternate Irish-language name
    pub alt_name_ga: Option<String>,
    /// Centroid latitude (degrees)
    pub latitude: Option<f64>,
    /// Centroid longitude (degrees)
    pub longitude: Option<f64>,
    /// Area as reported by the attribute table
    pub area: Option<f64>,
    /// Link to the townlands.ie page
    pub url: Option<String>,
    /// Reference into the Logainm placenames database
    pub logainm_ref: Option<String>,
    /// Wikidata cross-reference, filled in by geometry ingestion
    pub wikidata: Option<String>,
    /// Source edit metadata
    pub provenance: Provenance,
    /// Ancestor admin units
    pub ancestors: Ancestors,
}

impl Townland {
    /// Create a townland with only its key and primary name
    pub fn new(key: TownlandKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            name_ga: None,
            name_en: None,
            alt_name: None,
            alt_name_ga: None,
            latitude: None,
            longitude: None,
            area: None,
            url: None,
            logainm_ref: None,
            wikidata: None,
            provenance: Provenance::default(),
            ancestors: Ancestors::default(),
        }
    }

    /// Set the ancestor links
    pub fn with_ancestors(mut self, ancestors: Ancestors) -> Self {
        self.ancestors = ancestors;
        self
    }

    /// Set the centroid
    pub fn with_centroid(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Every name this townland is known by, primary first
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(
            [
                &self.name_ga,
                &self.name_en,
                &self.alt_name,
                &self.alt_name_ga,
            ]
            .into_iter()
            .filter_map(|n| n.as_deref()),
        )
    }

    /// Apply an attribute re-load on top of the stored record
    ///
    /// The attribute table never carries the Wikidata cross-reference, so a
    /// re-load must not clear one that geometry ingestion already set.
    pub fn replace_attributes(&mut self, incoming: Townland) {
        let wikidata = self.wikidata.take();
        *self = incoming;
        if self.wikidata.is_none() {
            self.wikidata = wikidata;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_skip_blank_alternates() {
        let mut t = Townland::new(TownlandKey(1), "Ballybeg");
        t.name_ga = Some("An Baile Beag".into());
        t.alt_name = Some("Ballybegg".into());

        let names: Vec<_> = t.names().collect();
        assert_eq!(names, vec!["Ballybeg", "An Baile Beag", "Ballybegg"]);
    }

    #[test]
    fn test_reload_preserves_wikidata() {
        let mut stored = Townland::new(TownlandKey(1), "Ballybeg");
        stored.wikidata = Some("Q123".into());

        let mut incoming = Townland::new(TownlandKey(1), "Ballybeg");
        incoming.area = Some(10.0);
        stored.replace_attributes(incoming);

        assert_eq!(stored.wikidata.as_deref(), Some("Q123"));
        assert_eq!(stored.area, Some(10.0));
    }

    #[test]
    fn test_ancestor_accessors() {
        let mut ancestors = Ancestors::default();
        ancestors.set(AdminKind::Barony, Some(AdminKey(5)));
        assert_eq!(ancestors.get(AdminKind::Barony), Some(AdminKey(5)));
        assert_eq!(ancestors.get(AdminKind::County), None);
    }

    #[test]
    fn test_record_survives_postcard() {
        let mut t = Townland::new(TownlandKey(-44), "Derrylahan");
        t.provenance.edited_at = Some(Utc::now());
        t.provenance.epoch = Some(1_700_000_000);
        let bytes = postcard::to_allocvec(&t).unwrap();
        let back: Townland = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(back, t);
    }
}

//! Location → type → ULD view of a stock take, recomputed from the lists on
//! every change.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{AdditionalUld, CatalogUld, Condition};

/// Type group name additional ULDs are listed under.
pub const ADDITIONAL_GROUP: &str = "AdditionalUlds";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub total: usize,
    pub serviceable: usize,
    pub damaged: usize,
    /// Not found yet.
    pub open: usize,
}

impl Counts {
    fn record(&mut self, condition: Condition, is_found: bool) {
        self.total += 1;
        match condition {
            Condition::Serviceable => self.serviceable += 1,
            Condition::Damaged => self.damaged += 1,
        }
        if !is_found {
            self.open += 1;
        }
    }

    fn merge(&mut self, other: &Counts) {
        self.total += other.total;
        self.serviceable += other.serviceable;
        self.damaged += other.damaged;
        self.open += other.open;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UldEntry {
    pub identifier: String,
    pub condition: Condition,
    pub is_found: bool,
    pub is_additional: bool,
    pub original_location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeGroup {
    pub type_name: String,
    pub ulds: Vec<UldEntry>,
    pub counts: Counts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationGroup {
    pub location: String,
    pub types: Vec<TypeGroup>,
    pub counts: Counts,
}

impl LocationGroup {
    fn push(&mut self, type_name: &str, entry: UldEntry) {
        let idx = match self.types.iter().position(|t| t.type_name == type_name) {
            Some(idx) => idx,
            None => {
                self.types.push(TypeGroup {
                    type_name: type_name.to_string(),
                    ulds: Vec::new(),
                    counts: Counts::default(),
                });
                self.types.len() - 1
            }
        };
        let group = &mut self.types[idx];
        group.counts.record(entry.condition, entry.is_found);
        self.counts.record(entry.condition, entry.is_found);
        group.ulds.push(entry);
    }
}

/// Locations come out sorted by name. Within a location, catalog types keep
/// first-seen order and the additional group comes last.
pub fn group_by_location(catalog: &[CatalogUld], additional: &[AdditionalUld]) -> Vec<LocationGroup> {
    let mut locations: BTreeMap<&str, LocationGroup> = BTreeMap::new();
    for uld in catalog {
        locations
            .entry(uld.location.as_str())
            .or_insert_with(|| empty_location(&uld.location))
            .push(
                &uld.uld_type,
                UldEntry {
                    identifier: uld.identifier.clone(),
                    condition: uld.condition,
                    is_found: uld.is_found,
                    is_additional: false,
                    original_location: None,
                },
            );
    }
    for uld in additional {
        locations
            .entry(uld.location.as_str())
            .or_insert_with(|| empty_location(&uld.location))
            .push(
                ADDITIONAL_GROUP,
                UldEntry {
                    identifier: uld.identifier.clone(),
                    condition: uld.condition,
                    is_found: uld.is_found,
                    is_additional: true,
                    original_location: uld.original_location().map(str::to_string),
                },
            );
    }

    locations.into_values().collect()
}

fn empty_location(location: &str) -> LocationGroup {
    LocationGroup {
        location: location.to_string(),
        types: Vec::new(),
        counts: Counts::default(),
    }
}

/// Keeps the selected locations. An empty selection keeps everything.
pub fn filter_locations(groups: &[LocationGroup], selected: &[String]) -> Vec<LocationGroup> {
    groups
        .iter()
        .filter(|g| selected.is_empty() || selected.iter().any(|s| s == &g.location))
        .cloned()
        .collect()
}

pub fn location_names(groups: &[LocationGroup]) -> Vec<String> {
    groups.iter().map(|g| g.location.clone()).collect()
}

pub fn totals(groups: &[LocationGroup]) -> Counts {
    let mut counts = Counts::default();
    for group in groups {
        counts.merge(&group.counts);
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Displacement;

    fn fixture() -> (Vec<CatalogUld>, Vec<AdditionalUld>) {
        let mut found = CatalogUld::new("AKE12345LH", "AKE", "LH-FRA-Cargo", Condition::Serviceable);
        found.is_found = true;
        let catalog = vec![
            found,
            CatalogUld::new("PMC54321LH", "PMC", "LH-FRA-Cargo", Condition::Damaged),
            CatalogUld::new("AKE22222LH", "AKE", "LH-FRA-Cargo", Condition::Serviceable),
            CatalogUld::new("AKE33333LH", "AKE", "AB-FRA-Ramp", Condition::Serviceable),
        ];
        let additional = vec![AdditionalUld {
            identifier: "AKE44444LH".into(),
            uld_type: Some("AKE".into()),
            location: "LH-FRA-Cargo".into(),
            condition: Condition::Damaged,
            is_found: true,
            displaced_from: Some(Displacement {
                location: "AB-FRA-Ramp".into(),
                was_found: false,
            }),
        }];
        (catalog, additional)
    }

    #[test]
    fn groups_by_location_then_type() {
        let (catalog, additional) = fixture();
        let groups = group_by_location(&catalog, &additional);

        assert_eq!(location_names(&groups), vec!["AB-FRA-Ramp", "LH-FRA-Cargo"]);

        let cargo = &groups[1];
        let types: Vec<_> = cargo.types.iter().map(|t| t.type_name.as_str()).collect();
        assert_eq!(types, vec!["AKE", "PMC", ADDITIONAL_GROUP]);
        assert_eq!(cargo.types[0].ulds.len(), 2);
        assert_eq!(
            cargo.counts,
            Counts {
                total: 4,
                serviceable: 2,
                damaged: 2,
                open: 2
            }
        );

        let moved = &cargo.types[2].ulds[0];
        assert!(moved.is_additional);
        assert_eq!(moved.original_location.as_deref(), Some("AB-FRA-Ramp"));
    }

    #[test]
    fn totals_sum_every_location() {
        let (catalog, additional) = fixture();
        let groups = group_by_location(&catalog, &additional);
        assert_eq!(totals(&groups).total, 5);
        assert_eq!(totals(&groups).open, 3);
    }

    #[test]
    fn filter_keeps_selected_locations() {
        let (catalog, additional) = fixture();
        let groups = group_by_location(&catalog, &additional);

        assert_eq!(filter_locations(&groups, &[]).len(), 2);
        let ramp = filter_locations(&groups, &["AB-FRA-Ramp".to_string()]);
        assert_eq!(ramp.len(), 1);
        assert_eq!(ramp[0].counts.total, 1);
    }
}

//! ULD movement state machine.
//!
//! Every event is handled in two steps. Planning looks at the current state
//! and returns a [`Plan`]: the [`Transition`] that would be applied, plus the
//! [`Prompt`] that must be confirmed first, if any. Applying commits the
//! transition. Nothing is mutated while a confirmation is outstanding, so a
//! cancelled prompt simply drops the plan.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::confirm::Prompt;
use crate::domain::{AdditionalUld, CatalogUld, Condition, Displacement, UldState, UNKNOWN_LABEL};
use crate::error::StockTakeError;

/// A ULD reported at a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionEvent {
    pub identifier: String,
    pub location: String,
    #[serde(default)]
    pub condition: Condition,
}

impl AdditionEvent {
    pub fn new(identifier: impl Into<String>, location: impl Into<String>, condition: Condition) -> Self {
        Self {
            identifier: identifier.into(),
            location: location.into(),
            condition,
        }
    }
}

/// How a ULD's found flag is set when it goes back to its catalog location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// It was just seen there: found, with the reported condition.
    FoundAgain(Condition),
    /// The move is undone: the found flag from before the first move.
    AsBefore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A ULD nobody knew about becomes an additional ULD.
    Discover {
        identifier: String,
        location: String,
        condition: Condition,
    },
    /// Found where it is already recorded.
    MarkFound { identifier: String, condition: Condition },
    /// Found somewhere else than recorded.
    Relocate {
        identifier: String,
        to: String,
        condition: Condition,
    },
    /// An additional ULD returns to its catalog location.
    MoveBack { identifier: String, restore: Restore },
    /// A newly discovered ULD is dropped again.
    Discard { identifier: String },
}

impl Transition {
    pub fn identifier(&self) -> &str {
        match self {
            Transition::Discover { identifier, .. }
            | Transition::MarkFound { identifier, .. }
            | Transition::Relocate { identifier, .. }
            | Transition::MoveBack { identifier, .. }
            | Transition::Discard { identifier } => identifier,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub prompt: Option<Prompt>,
    pub transition: Transition,
}

impl Plan {
    fn silent(transition: Transition) -> Self {
        Self {
            prompt: None,
            transition,
        }
    }

    fn confirmed(prompt: Prompt, transition: Transition) -> Self {
        Self {
            prompt: Some(prompt),
            transition,
        }
    }

    fn confirmed_if(ask: bool, prompt: Prompt, transition: Transition) -> Self {
        Self {
            prompt: ask.then_some(prompt),
            transition,
        }
    }
}

fn same_location(a: &str, b: &str) -> bool {
    a.trim() == b.trim()
}

/// The ULDs of one stock take: the catalog list, the additional list and
/// the catalog records cached while their ULD is displaced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockTake {
    loaded: Vec<CatalogUld>,
    catalog: Vec<CatalogUld>,
    additional: Vec<AdditionalUld>,
    displaced: HashMap<String, CatalogUld>,
}

impl StockTake {
    /// Starts a stock take. Nothing counts as found yet; duplicate
    /// identifiers keep their first record.
    pub fn new(records: Vec<CatalogUld>) -> Self {
        let mut loaded: Vec<CatalogUld> = Vec::with_capacity(records.len());
        for mut record in records {
            if loaded.iter().any(|r| r.identifier == record.identifier) {
                debug!(uld = %record.identifier, "Skipping duplicate catalog record");
                continue;
            }
            record.is_found = false;
            loaded.push(record);
        }
        Self {
            catalog: loaded.clone(),
            loaded,
            additional: Vec::new(),
            displaced: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &[CatalogUld] {
        &self.catalog
    }

    /// Sorted by identifier.
    pub fn additional(&self) -> &[AdditionalUld] {
        &self.additional
    }

    pub fn state_of(&self, identifier: &str) -> UldState<'_> {
        if let Some(uld) = self.catalog.iter().find(|u| u.identifier == identifier) {
            return UldState::AtCatalogLocation(uld);
        }
        if let Some(uld) = self.additional.iter().find(|u| u.identifier == identifier) {
            return UldState::Additional(uld);
        }
        UldState::Unknown
    }

    pub fn plan_addition(&self, event: &AdditionEvent) -> Plan {
        let identifier = event.identifier.clone();
        let target = event.location.clone();
        let condition = event.condition;

        match self.state_of(&event.identifier) {
            UldState::Unknown => Plan::silent(Transition::Discover {
                identifier,
                location: target,
                condition,
            }),
            UldState::AtCatalogLocation(uld) if same_location(&uld.location, &target) => {
                Plan::confirmed(
                    Prompt::AlreadyFound {
                        identifier: identifier.clone(),
                        location: target,
                    },
                    Transition::MarkFound { identifier, condition },
                )
            }
            UldState::AtCatalogLocation(uld) => Plan::confirmed_if(
                uld.is_found,
                Prompt::ConfirmMove {
                    identifier: identifier.clone(),
                    from: uld.location.clone(),
                    to: target.clone(),
                },
                Transition::Relocate {
                    identifier,
                    to: target,
                    condition,
                },
            ),
            UldState::Additional(uld) => match uld.original_location() {
                Some(home) if same_location(home, &target) => Plan::confirmed(
                    Prompt::MoveBack {
                        identifier: identifier.clone(),
                        location: home.to_string(),
                    },
                    Transition::MoveBack {
                        identifier,
                        restore: Restore::FoundAgain(condition),
                    },
                ),
                _ if same_location(&uld.location, &target) => Plan::confirmed(
                    Prompt::AlreadyFound {
                        identifier: identifier.clone(),
                        location: target,
                    },
                    Transition::MarkFound { identifier, condition },
                ),
                _ => Plan::confirmed_if(
                    uld.is_found,
                    Prompt::ConfirmMove {
                        identifier: identifier.clone(),
                        from: uld.location.clone(),
                        to: target.clone(),
                    },
                    Transition::Relocate {
                        identifier,
                        to: target,
                        condition,
                    },
                ),
            },
        }
    }

    /// Only additional ULDs can be removed. One that was displaced from the
    /// catalog asks before going back home; a new discovery just goes.
    pub fn plan_removal(&self, identifier: &str) -> Result<Plan, StockTakeError> {
        match self.state_of(identifier) {
            UldState::Unknown => Err(StockTakeError::UnknownUld(identifier.to_string())),
            UldState::AtCatalogLocation(_) => Err(StockTakeError::NotAdditional(identifier.to_string())),
            UldState::Additional(uld) => Ok(match uld.original_location() {
                Some(home) => Plan::confirmed(
                    Prompt::MoveBack {
                        identifier: identifier.to_string(),
                        location: home.to_string(),
                    },
                    Transition::MoveBack {
                        identifier: identifier.to_string(),
                        restore: Restore::AsBefore,
                    },
                ),
                None => Plan::silent(Transition::Discard {
                    identifier: identifier.to_string(),
                }),
            }),
        }
    }

    pub fn apply(&mut self, transition: Transition) -> Result<(), StockTakeError> {
        match transition {
            Transition::Discover {
                identifier,
                location,
                condition,
            } => {
                if !matches!(self.state_of(&identifier), UldState::Unknown) {
                    return Err(StockTakeError::AlreadyTracked(identifier));
                }
                info!(uld = %identifier, %location, "New ULD discovered");
                self.insert_additional(AdditionalUld {
                    identifier,
                    uld_type: None,
                    location,
                    condition,
                    is_found: true,
                    displaced_from: None,
                });
            }
            Transition::MarkFound { identifier, condition } => {
                if let Some(uld) = self.catalog.iter_mut().find(|u| u.identifier == identifier) {
                    uld.is_found = true;
                    uld.condition = condition;
                } else if let Some(uld) = self.additional.iter_mut().find(|u| u.identifier == identifier) {
                    uld.is_found = true;
                    uld.condition = condition;
                } else {
                    return Err(StockTakeError::UnknownUld(identifier));
                }
                debug!(uld = %identifier, "ULD marked found");
            }
            Transition::Relocate {
                identifier,
                to,
                condition,
            } => self.relocate(identifier, to, condition)?,
            Transition::MoveBack { identifier, restore } => self.move_back(identifier, restore)?,
            Transition::Discard { identifier } => {
                let idx = self.additional_index(&identifier)?;
                self.additional.remove(idx);
                self.displaced.remove(&identifier);
                info!(uld = %identifier, "Additional ULD discarded");
            }
        }
        Ok(())
    }

    fn relocate(&mut self, identifier: String, to: String, condition: Condition) -> Result<(), StockTakeError> {
        if let Some(idx) = self.catalog.iter().position(|u| u.identifier == identifier) {
            let home = self.catalog.remove(idx);
            let displaced_from = Displacement {
                location: home.location.clone(),
                was_found: home.is_found,
            };
            info!(uld = %identifier, from = %home.location, %to, "ULD moved off its catalog location");
            let uld_type = Some(home.uld_type.clone());
            self.displaced.insert(identifier.clone(), home);
            self.insert_additional(AdditionalUld {
                identifier,
                uld_type,
                location: to,
                condition,
                is_found: true,
                displaced_from: Some(displaced_from),
            });
            return Ok(());
        }

        let idx = self.additional_index(&identifier)?;
        let uld = &mut self.additional[idx];
        info!(uld = %identifier, from = %uld.location, %to, "Additional ULD moved");
        uld.location = to;
        uld.condition = condition;
        uld.is_found = true;
        Ok(())
    }

    fn move_back(&mut self, identifier: String, restore: Restore) -> Result<(), StockTakeError> {
        let idx = self.additional_index(&identifier)?;
        let Some(origin) = self.additional[idx].displaced_from.clone() else {
            return Err(StockTakeError::NotDisplaced(identifier));
        };
        let uld = self.additional.remove(idx);

        let mut home = self.displaced.remove(&identifier).unwrap_or_else(|| {
            CatalogUld::new(
                identifier.clone(),
                uld.uld_type.clone().unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
                origin.location.clone(),
                uld.condition,
            )
        });
        home.location = origin.location;
        match restore {
            Restore::FoundAgain(condition) => {
                home.is_found = true;
                home.condition = condition;
            }
            Restore::AsBefore => home.is_found = origin.was_found,
        }
        info!(uld = %identifier, location = %home.location, found = home.is_found, "ULD moved back");
        self.catalog.push(home);
        Ok(())
    }

    /// Takes a record the backend knows but this stock take did not load.
    pub fn adopt(&mut self, mut record: CatalogUld) -> Result<(), StockTakeError> {
        if !matches!(self.state_of(&record.identifier), UldState::Unknown) {
            return Err(StockTakeError::AlreadyTracked(record.identifier));
        }
        record.is_found = false;
        debug!(uld = %record.identifier, location = %record.location, "Adopting catalog record");
        self.catalog.push(record);
        Ok(())
    }

    /// Flips the found flag and returns the new value.
    pub fn toggle_found(&mut self, identifier: &str) -> Result<bool, StockTakeError> {
        if let Some(uld) = self.catalog.iter_mut().find(|u| u.identifier == identifier) {
            uld.is_found = !uld.is_found;
            return Ok(uld.is_found);
        }
        if let Some(uld) = self.additional.iter_mut().find(|u| u.identifier == identifier) {
            uld.is_found = !uld.is_found;
            return Ok(uld.is_found);
        }
        Err(StockTakeError::UnknownUld(identifier.to_string()))
    }

    pub fn update_condition(&mut self, identifier: &str, condition: Condition) -> Result<(), StockTakeError> {
        if let Some(uld) = self.catalog.iter_mut().find(|u| u.identifier == identifier) {
            uld.condition = condition;
            return Ok(());
        }
        if let Some(uld) = self.additional.iter_mut().find(|u| u.identifier == identifier) {
            uld.condition = condition;
            return Ok(());
        }
        Err(StockTakeError::UnknownUld(identifier.to_string()))
    }

    /// Back to the freshly loaded catalog.
    pub fn reset(&mut self) {
        self.catalog = self.loaded.clone();
        self.additional.clear();
        self.displaced.clear();
    }

    fn additional_index(&self, identifier: &str) -> Result<usize, StockTakeError> {
        match self.additional.iter().position(|u| u.identifier == identifier) {
            Some(idx) => Ok(idx),
            None if self.catalog.iter().any(|u| u.identifier == identifier) => {
                Err(StockTakeError::NotAdditional(identifier.to_string()))
            }
            None => Err(StockTakeError::UnknownUld(identifier.to_string())),
        }
    }

    fn insert_additional(&mut self, uld: AdditionalUld) {
        let idx = self
            .additional
            .partition_point(|u| u.identifier < uld.identifier);
        self.additional.insert(idx, uld);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "LH-FRA-Cargo";
    const B: &str = "LH-FRA-Baggage";
    const C: &str = "XX-FRA-Standard";

    fn stock_take() -> StockTake {
        StockTake::new(vec![
            CatalogUld::new("AKE12345LH", "AKE", A, Condition::Serviceable),
            CatalogUld::new("PMC54321LH", "PMC", B, Condition::Damaged),
        ])
    }

    fn add(st: &mut StockTake, identifier: &str, location: &str) -> Plan {
        let plan = st.plan_addition(&AdditionEvent::new(identifier, location, Condition::Serviceable));
        st.apply(plan.transition.clone()).unwrap();
        plan
    }

    fn additional<'a>(st: &'a StockTake, identifier: &str) -> &'a AdditionalUld {
        match st.state_of(identifier) {
            UldState::Additional(uld) => uld,
            other => panic!("expected additional, got {other:?}"),
        }
    }

    fn catalog<'a>(st: &'a StockTake, identifier: &str) -> &'a CatalogUld {
        match st.state_of(identifier) {
            UldState::AtCatalogLocation(uld) => uld,
            other => panic!("expected catalog, got {other:?}"),
        }
    }

    #[test]
    fn loading_clears_found_flags_and_duplicates() {
        let mut found = CatalogUld::new("AKE12345LH", "AKE", A, Condition::Serviceable);
        found.is_found = true;
        let dup = CatalogUld::new("AKE12345LH", "AKE", B, Condition::Serviceable);
        let st = StockTake::new(vec![found, dup]);
        assert_eq!(st.catalog().len(), 1);
        assert!(!st.catalog()[0].is_found);
        assert_eq!(st.catalog()[0].location, A);
    }

    #[test]
    fn unknown_uld_is_discovered_without_prompt() {
        let mut st = stock_take();
        let plan = add(&mut st, "AKE77777XX", C);
        assert_eq!(plan.prompt, None);
        let uld = additional(&st, "AKE77777XX");
        assert!(uld.is_found);
        assert_eq!(uld.original_location(), None);
    }

    #[test]
    fn same_location_asks_then_marks_found() {
        let mut st = stock_take();
        let plan = st.plan_addition(&AdditionEvent::new("PMC54321LH", B, Condition::Serviceable));
        assert!(matches!(plan.prompt, Some(Prompt::AlreadyFound { .. })));
        st.apply(plan.transition).unwrap();

        let uld = catalog(&st, "PMC54321LH");
        assert!(uld.is_found);
        assert_eq!(uld.condition, Condition::Serviceable);
    }

    #[test]
    fn moving_an_unfound_uld_needs_no_confirmation() {
        let st = stock_take();
        let plan = st.plan_addition(&AdditionEvent::new("AKE12345LH", B, Condition::Serviceable));
        assert_eq!(plan.prompt, None);
        assert!(matches!(plan.transition, Transition::Relocate { .. }));
    }

    #[test]
    fn moving_a_found_uld_asks_first() {
        let mut st = stock_take();
        add(&mut st, "AKE12345LH", A);
        let plan = st.plan_addition(&AdditionEvent::new("AKE12345LH", B, Condition::Serviceable));
        assert_eq!(
            plan.prompt,
            Some(Prompt::ConfirmMove {
                identifier: "AKE12345LH".into(),
                from: A.into(),
                to: B.into(),
            })
        );
    }

    #[test]
    fn move_then_remove_restores_catalog_home_and_found_state() {
        let mut st = stock_take();
        add(&mut st, "AKE12345LH", A);
        add(&mut st, "AKE12345LH", B);

        let moved = additional(&st, "AKE12345LH");
        assert_eq!(moved.location, B);
        assert_eq!(moved.uld_type.as_deref(), Some("AKE"));
        assert_eq!(
            moved.displaced_from,
            Some(Displacement {
                location: A.into(),
                was_found: true
            })
        );

        let plan = st.plan_removal("AKE12345LH").unwrap();
        assert!(matches!(plan.prompt, Some(Prompt::MoveBack { ref location, .. }) if location == A));
        st.apply(plan.transition).unwrap();

        let home = catalog(&st, "AKE12345LH");
        assert_eq!(home.location, A);
        assert!(home.is_found);
        assert!(st.additional().is_empty());
    }

    #[test]
    fn removal_restores_unfound_state_too() {
        let mut st = stock_take();
        add(&mut st, "AKE12345LH", B);
        let plan = st.plan_removal("AKE12345LH").unwrap();
        st.apply(plan.transition).unwrap();
        assert!(!catalog(&st, "AKE12345LH").is_found);
    }

    #[test]
    fn original_location_survives_further_moves() {
        let mut st = stock_take();
        add(&mut st, "AKE12345LH", B);
        add(&mut st, "AKE12345LH", C);

        let uld = additional(&st, "AKE12345LH");
        assert_eq!(uld.location, C);
        assert_eq!(uld.original_location(), Some(A));
        assert_eq!(uld.original_is_found(), Some(false));
    }

    #[test]
    fn reporting_at_home_asks_to_move_back() {
        let mut st = stock_take();
        add(&mut st, "AKE12345LH", B);

        let plan = st.plan_addition(&AdditionEvent::new("AKE12345LH", A, Condition::Damaged));
        assert!(matches!(plan.prompt, Some(Prompt::MoveBack { .. })));
        st.apply(plan.transition).unwrap();

        let home = catalog(&st, "AKE12345LH");
        assert!(home.is_found);
        assert_eq!(home.condition, Condition::Damaged);
    }

    #[test]
    fn reporting_at_current_additional_location_marks_found() {
        let mut st = stock_take();
        add(&mut st, "AKE77777XX", C);
        st.toggle_found("AKE77777XX").unwrap();

        let plan = add(&mut st, "AKE77777XX", C);
        assert!(matches!(plan.prompt, Some(Prompt::AlreadyFound { .. })));
        assert!(additional(&st, "AKE77777XX").is_found);
    }

    #[test]
    fn new_discovery_is_removed_without_prompt() {
        let mut st = stock_take();
        add(&mut st, "AKE77777XX", C);
        let plan = st.plan_removal("AKE77777XX").unwrap();
        assert_eq!(plan.prompt, None);
        st.apply(plan.transition).unwrap();
        assert!(matches!(st.state_of("AKE77777XX"), UldState::Unknown));
    }

    #[test]
    fn only_additional_ulds_can_be_removed() {
        let st = stock_take();
        assert_eq!(
            st.plan_removal("AKE12345LH"),
            Err(StockTakeError::NotAdditional("AKE12345LH".into()))
        );
        assert_eq!(
            st.plan_removal("ZZZ00000ZZ"),
            Err(StockTakeError::UnknownUld("ZZZ00000ZZ".into()))
        );
    }

    #[test]
    fn additional_list_stays_sorted() {
        let mut st = stock_take();
        add(&mut st, "PMC99999XX", C);
        add(&mut st, "AKE11111XX", C);
        add(&mut st, "AKE55555XX", C);
        let ids: Vec<_> = st.additional().iter().map(|u| u.identifier.as_str()).collect();
        assert_eq!(ids, vec!["AKE11111XX", "AKE55555XX", "PMC99999XX"]);
    }

    #[test]
    fn reset_returns_to_loaded_catalog() {
        let mut st = stock_take();
        add(&mut st, "AKE12345LH", B);
        add(&mut st, "AKE77777XX", C);
        st.reset();
        assert_eq!(st, stock_take());
    }

    #[test]
    fn condition_and_found_flag_edits() {
        let mut st = stock_take();
        assert_eq!(st.toggle_found("PMC54321LH"), Ok(true));
        assert_eq!(st.toggle_found("PMC54321LH"), Ok(false));
        st.update_condition("PMC54321LH", Condition::Serviceable).unwrap();
        assert_eq!(catalog(&st, "PMC54321LH").condition, Condition::Serviceable);
        assert!(st.update_condition("NOPE", Condition::Damaged).is_err());
    }

    #[test]
    fn adopt_refuses_tracked_ulds() {
        let mut st = stock_take();
        let record = CatalogUld::new("AKE12345LH", "AKE", C, Condition::Serviceable);
        assert!(matches!(st.adopt(record), Err(StockTakeError::AlreadyTracked(_))));
        st.adopt(CatalogUld::new("AKE00001LH", "AKE", C, Condition::Serviceable))
            .unwrap();
        assert!(matches!(st.state_of("AKE00001LH"), UldState::AtCatalogLocation(_)));
    }
}

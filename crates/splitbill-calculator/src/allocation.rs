//! Per-person allocation of a bill.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use splitbill_types::{ChargeConfig, ItemId, LineItem, Person, PersonId, PersonTotal};
use tracing::{debug, instrument};

use crate::built_in::equal_split::EqualSplitCalculator;
use crate::built_in::round_up::RoundingPolicy;
use crate::charges::breakdown;

/// Answers whether a person shares the cost of a line item.
///
/// Implementations may hold entries for items or people that no longer
/// exist; the engine only ever asks about the current `items × people`.
pub trait AssignmentLookup {
    /// `true` when `person` is assigned to `item`
    fn is_assigned(&self, item: ItemId, person: PersonId) -> bool;
}

impl AssignmentLookup for HashSet<(ItemId, PersonId)> {
    fn is_assigned(&self, item: ItemId, person: PersonId) -> bool {
        self.contains(&(item, person))
    }
}

impl AssignmentLookup for HashMap<ItemId, HashMap<PersonId, bool>> {
    fn is_assigned(&self, item: ItemId, person: PersonId) -> bool {
        self.get(&item).and_then(|row| row.get(&person)).copied().unwrap_or(false)
    }
}

/// One person's line in an allocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonAllocation {
    /// Person the totals belong to
    pub person_id: PersonId,
    /// Display name at the time of the allocation
    pub name: String,
    /// Charge breakdown and headline total
    #[serde(flatten)]
    pub totals: PersonTotal,
    /// Headline total as a percentage of the grand total, 0 when the grand total is 0
    pub share_percent: f64,
}

/// Result of splitting a bill between people
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    people: Vec<PersonAllocation>,
    grand_total: f64,
    assigned_sum: f64,
    unassigned: Vec<ItemId>,
}

impl Allocation {
    /// Per-person lines in the order the people were given
    pub fn people(&self) -> &[PersonAllocation] {
        &self.people
    }

    /// Iterate over the per-person lines
    pub fn iter(&self) -> impl Iterator<Item = &PersonAllocation> {
        self.people.iter()
    }

    /// Totals for a single person, if present
    pub fn total_for(&self, person: PersonId) -> Option<&PersonTotal> {
        self.people.iter().find(|line| line.person_id == person).map(|line| &line.totals)
    }

    /// Each person's percentage of the grand total, in people order
    pub fn shares(&self) -> impl Iterator<Item = (PersonId, f64)> + '_ {
        self.people.iter().map(|line| (line.person_id, line.share_percent))
    }

    /// Sum of the per-person headline totals (after rounding, if enabled)
    pub fn grand_total(&self) -> f64 {
        self.grand_total
    }

    /// Sum of the prices of items assigned to at least one person
    pub fn assigned_sum(&self) -> f64 {
        self.assigned_sum
    }

    /// Items nobody is assigned to; they are excluded from every total
    pub fn unassigned(&self) -> &[ItemId] {
        &self.unassigned
    }

    /// Number of people in the allocation
    pub fn len(&self) -> usize {
        self.people.len()
    }

    /// `true` when there are no people to allocate to
    pub fn is_empty(&self) -> bool {
        self.people.is_empty()
    }
}

/// Split `items` between `people` and apply the charge configuration
///
/// Each item is divided evenly between the people assigned to it; an item
/// with nobody assigned is left out of every total and reported in
/// [`Allocation::unassigned`]. Service charge is applied to each person's
/// base, VAT to the base configured by [`ChargeConfig::vat_base`], and the
/// round-up policy to the headline total only. The grand total is the sum
/// of the already-rounded per-person totals.
///
/// Prices are assumed to be finite and positive; validation happens before
/// items enter the session.
#[instrument(skip_all, fields(items = items.len(), people = people.len()))]
pub fn allocate<A>(
    items: &[LineItem],
    people: &[Person],
    assignments: &A,
    config: &ChargeConfig,
) -> Allocation
where
    A: AssignmentLookup + ?Sized,
{
    let split = EqualSplitCalculator;
    let rounding = RoundingPolicy::from(config.round_up);

    let mut bases = vec![0.0_f64; people.len()];
    let mut sharing: Vec<usize> = Vec::with_capacity(people.len());
    let mut assigned_sum = 0.0;
    let mut unassigned = Vec::new();

    for item in items {
        sharing.clear();
        sharing.extend(
            people
                .iter()
                .enumerate()
                .filter(|(_, person)| assignments.is_assigned(item.id, person.id))
                .map(|(index, _)| index),
        );

        match split.calculate(item.price, sharing.len()) {
            Some(share) => {
                for &index in &sharing {
                    bases[index] += share;
                }
                assigned_sum += item.price;
            }
            None => unassigned.push(item.id),
        }
    }

    let mut lines: Vec<PersonAllocation> = people
        .iter()
        .zip(bases)
        .map(|(person, base)| {
            let mut totals = breakdown(base, config);
            totals.total = rounding.apply(totals.total);
            PersonAllocation {
                person_id: person.id,
                name: person.name.clone(),
                totals,
                share_percent: 0.0,
            }
        })
        .collect();

    let grand_total: f64 = lines.iter().map(|line| line.totals.total).sum();
    if grand_total != 0.0 {
        for line in &mut lines {
            line.share_percent = line.totals.total / grand_total * 100.0;
        }
    }

    debug!(grand_total, unassigned = unassigned.len(), "Allocation computed");

    Allocation { people: lines, grand_total, assigned_sum, unassigned }
}

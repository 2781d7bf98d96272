// Item edits on an existing booking
//
// Existing items keep the unit price frozen when they were added; new lines
// are priced when they are resolved. Totals are re-derived from the result.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashSet};

use crate::bookings::{
    BookingError, BookingItem, CartTotals, NewBookingItem, PriceCalculator, PricingRates,
};
use crate::catalog::{ResolvedLine, MAX_LINE_QUANTITY};

/// Row-level changes to apply to a booking's items in one transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemChanges {
    pub added: Vec<NewBookingItem>,
    pub removed_item_ids: Vec<i64>,
    /// (item id, new quantity, new subtotal)
    pub quantity_updates: Vec<(i64, i32, Decimal)>,
}

impl ItemChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed_item_ids.is_empty() && self.quantity_updates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ItemEditPlan {
    pub changes: ItemChanges,
    pub totals: CartTotals,
}

/// Work out the item changes and the new totals of an edit
///
/// A quantity change to zero or below removes the item. Ids that do not
/// belong to the booking are rejected, and the booking must keep at least
/// one item.
pub fn plan_item_edit(
    existing: &[BookingItem],
    added: Vec<ResolvedLine>,
    removed_item_ids: &[i64],
    quantity_changes: &BTreeMap<i64, i32>,
    rates: PricingRates,
) -> Result<ItemEditPlan, BookingError> {
    let known: HashSet<i64> = existing.iter().map(|item| item.id).collect();

    if let Some(id) = removed_item_ids.iter().find(|id| !known.contains(id)) {
        return Err(BookingError::invalid(
            "removed_item_ids",
            format!("Item {} does not belong to this booking", id),
        ));
    }
    if let Some(id) = quantity_changes.keys().find(|id| !known.contains(id)) {
        return Err(BookingError::invalid(
            "quantity_changes",
            format!("Item {} does not belong to this booking", id),
        ));
    }

    if let Some(id) = quantity_changes
        .iter()
        .find(|(_, quantity)| **quantity > MAX_LINE_QUANTITY)
        .map(|(id, _)| id)
    {
        return Err(BookingError::invalid(
            "quantity_changes",
            format!("Item {} cannot exceed {} portions", id, MAX_LINE_QUANTITY),
        ));
    }

    let mut removed: Vec<i64> = removed_item_ids.to_vec();
    let mut quantity_updates = Vec::new();
    let mut kept: Vec<(Decimal, i32)> = Vec::new();

    for item in existing {
        if removed.contains(&item.id) {
            continue;
        }
        match quantity_changes.get(&item.id) {
            Some(&quantity) if quantity <= 0 => removed.push(item.id),
            Some(&quantity) if quantity != item.quantity => {
                quantity_updates.push((
                    item.id,
                    quantity,
                    PriceCalculator::calculate_subtotal(quantity, item.unit_price),
                ));
                kept.push((item.unit_price, quantity));
            }
            _ => kept.push((item.unit_price, item.quantity)),
        }
    }

    let added: Vec<NewBookingItem> = added.into_iter().map(ResolvedLine::into_new_item).collect();
    kept.extend(added.iter().map(|item| (item.unit_price, item.quantity)));

    if kept.is_empty() {
        return Err(BookingError::invalid(
            "items",
            "A booking must keep at least one item",
        ));
    }

    let totals = PriceCalculator::totals_for_items(kept, rates)?;
    Ok(ItemEditPlan {
        changes: ItemChanges {
            added,
            removed_item_ids: removed,
            quantity_updates,
        },
        totals,
    })
}

// Typed resolution of a cart line against a menu's variants
//
// Selections arrive as variant id -> option id and are checked against the
// menu's own variant set before the line can be priced.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::bookings::{CartLine, NewBookingItem, PriceCalculator};
use crate::catalog::MenuDetail;

/// Most portions of one menu choice a single booking can order
pub const MAX_LINE_QUANTITY: i32 = 1000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SelectionError {
    #[error("Menu '{0}' is not available")]
    MenuInactive(String),

    #[error("Please choose {variant} for {menu}")]
    MissingRequiredVariant { menu: String, variant: String },

    #[error("Variant {variant_id} does not belong to {menu}")]
    UnknownVariant { menu: String, variant_id: i64 },

    #[error("Option {option_id} is not a choice of {variant}")]
    UnknownOption { variant: String, option_id: i64 },

    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(i32),

    #[error("At most {max} portions of {menu} can be ordered")]
    QuantityTooLarge { menu: String, max: i32 },
}

/// A cart line whose options are validated and whose unit price is locked
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLine {
    pub menu_id: i64,
    pub menu_name: String,
    pub base_price: Decimal,
    pub quantity: i32,
    pub option_adjustments: Vec<Decimal>,
    pub unit_price: Decimal,
    /// Variant name -> option name
    pub selected_options: BTreeMap<String, String>,
}

impl ResolvedLine {
    pub fn subtotal(&self) -> Decimal {
        PriceCalculator::calculate_subtotal(self.quantity, self.unit_price)
    }

    pub fn cart_line(&self) -> CartLine {
        CartLine {
            base_price: self.base_price,
            quantity: self.quantity,
            option_adjustments: self.option_adjustments.clone(),
        }
    }

    pub fn into_new_item(self) -> NewBookingItem {
        NewBookingItem {
            menu_id: self.menu_id,
            quantity: self.quantity,
            unit_price: self.unit_price,
            subtotal: self.subtotal(),
            selected_options: self.selected_options,
        }
    }

    fn same_choice(&self, other: &ResolvedLine) -> bool {
        self.menu_id == other.menu_id
            && self.unit_price == other.unit_price
            && self.selected_options == other.selected_options
    }
}

/// Resolve `selections` (variant id -> option id) for `quantity` portions of `menu`
pub fn resolve_selection(
    menu: &MenuDetail,
    selections: &BTreeMap<i64, i64>,
    quantity: i32,
) -> Result<ResolvedLine, SelectionError> {
    if !menu.is_active {
        return Err(SelectionError::MenuInactive(menu.name.clone()));
    }
    if quantity < 1 {
        return Err(SelectionError::InvalidQuantity(quantity));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(SelectionError::QuantityTooLarge {
            menu: menu.name.clone(),
            max: MAX_LINE_QUANTITY,
        });
    }

    for variant_id in selections.keys() {
        if !menu.variants.iter().any(|v| v.id == *variant_id) {
            return Err(SelectionError::UnknownVariant {
                menu: menu.name.clone(),
                variant_id: *variant_id,
            });
        }
    }

    let mut option_adjustments = Vec::new();
    let mut selected_options = BTreeMap::new();

    for variant in &menu.variants {
        match selections.get(&variant.id) {
            Some(option_id) => {
                let option = variant
                    .options
                    .iter()
                    .find(|o| o.id == *option_id)
                    .ok_or_else(|| SelectionError::UnknownOption {
                        variant: variant.name.clone(),
                        option_id: *option_id,
                    })?;
                option_adjustments.push(option.price_adjustment);
                selected_options.insert(variant.name.clone(), option.name.clone());
            }
            None if variant.is_required => {
                return Err(SelectionError::MissingRequiredVariant {
                    menu: menu.name.clone(),
                    variant: variant.name.clone(),
                });
            }
            None => {}
        }
    }

    Ok(ResolvedLine {
        menu_id: menu.id,
        menu_name: menu.name.clone(),
        base_price: menu.price,
        quantity,
        unit_price: PriceCalculator::unit_price(menu.price, &option_adjustments),
        option_adjustments,
        selected_options,
    })
}

/// Merge lines with the same menu and the same choices by summing quantities
///
/// A merged quantity above [`MAX_LINE_QUANTITY`] is rejected.
pub fn merge_lines(lines: Vec<ResolvedLine>) -> Result<Vec<ResolvedLine>, SelectionError> {
    let mut merged: Vec<ResolvedLine> = Vec::with_capacity(lines.len());
    for line in lines {
        match merged.iter_mut().find(|existing| existing.same_choice(&line)) {
            Some(existing) => {
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .filter(|quantity| *quantity <= MAX_LINE_QUANTITY)
                    .ok_or_else(|| SelectionError::QuantityTooLarge {
                        menu: line.menu_name.clone(),
                        max: MAX_LINE_QUANTITY,
                    })?;
            }
            None => merged.push(line),
        }
    }
    Ok(merged)
}

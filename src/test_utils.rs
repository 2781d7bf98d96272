// Shared test fixtures: an in-memory store standing in for Postgres, fixed
// clocks, and the Paket Hemat catalog used across service tests.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::types::Json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::availability::{AvailabilityService, BookingDate, BookingDateStore, Clock, UpsertBookingDate};
use crate::bookings::{
    Booking, BookingCounts, BookingError, BookingFilter, BookingItem, BookingOrder,
    BookingResponse, BookingService, BookingStatus, BookingStore, CapacityGuard, CartLineRequest,
    CodeGenerator, CreateBookingRequest, ItemChanges, NewBooking, NewBookingItem, PriceCalculator,
    PricingRates, CODE_PREFIX,
};
use crate::catalog::{CatalogCounts, MenuCatalog, MenuDetail, VariantDetail, VariantOption};
use crate::config::BookingConfig;
use crate::seating::{SeatingSpot, SpotDirectory};
use crate::settings::{SettingsError, SettingsProvider};
use crate::storage::{FileStorage, StorageError};

/// Clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Fixed clock in WIB (UTC+7)
pub fn fixed_clock(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> FixedClock {
    let wib = FixedOffset::east_opt(7 * 3600).unwrap();
    FixedClock(wib.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap())
}

#[derive(Default)]
struct MemoryState {
    bookings: BTreeMap<i64, Booking>,
    items: Vec<BookingItem>,
    menus: BTreeMap<i64, MenuDetail>,
    spots: BTreeMap<i64, SeatingSpot>,
    dates: BTreeMap<NaiveDate, BookingDate>,
    next_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn with_menu_name(&self, item: &BookingItem) -> BookingItem {
        BookingItem {
            menu_name: self.menus.get(&item.menu_id).map(|m| m.name.clone()),
            ..item.clone()
        }
    }

    fn push_items(&mut self, booking_id: i64, items: &[NewBookingItem]) {
        for item in items {
            let id = self.next_id();
            self.items.push(BookingItem {
                id,
                booking_id,
                menu_id: item.menu_id,
                menu_name: None,
                quantity: item.quantity,
                unit_price: item.unit_price,
                subtotal: item.subtotal,
                selected_options: Json(item.selected_options.clone()),
            });
        }
    }
}

/// Every store trait of the crate over one mutex-guarded state
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

impl InMemoryStore {
    /// Paket Hemat A plus three spots: Gazebo (unlimited), Lesehan (10), Rooftop (inactive)
    pub fn seeded() -> Self {
        let store = Self::default();
        store.put_menu(paket_hemat_menu());
        store.put_spot(spot(1, "Gazebo", None, true));
        store.put_spot(spot(2, "Lesehan", Some(10), true));
        store.put_spot(spot(3, "Rooftop", Some(20), false));
        store
    }

    pub fn put_menu(&self, menu: MenuDetail) {
        self.state.lock().unwrap().menus.insert(menu.id, menu);
    }

    pub fn put_spot(&self, spot: SeatingSpot) {
        self.state.lock().unwrap().spots.insert(spot.id, spot);
    }

    pub fn booking_count(&self) -> usize {
        self.state.lock().unwrap().bookings.len()
    }

    /// Overwrite a stored total behind the service's back
    pub fn corrupt_total(&self, booking_id: i64, total: Decimal) {
        if let Some(booking) = self.state.lock().unwrap().bookings.get_mut(&booking_id) {
            booking.total_amount = total;
        }
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert(
        &self,
        booking: &NewBooking,
        items: &[NewBookingItem],
        guard: Option<CapacityGuard>,
    ) -> Result<Booking, BookingError> {
        let mut state = self.state.lock().unwrap();

        if let Some(guard) = guard {
            let booked: i64 = state
                .bookings
                .values()
                .filter(|b| {
                    b.seating_spot_id == guard.spot_id
                        && b.booking_date == guard.booking_date
                        && b.status != BookingStatus::Cancelled
                })
                .map(|b| i64::from(b.guest_count))
                .sum();
            if booked + i64::from(guard.guests) > i64::from(guard.capacity) {
                return Err(BookingError::SpotFull {
                    spot_id: guard.spot_id,
                    date: guard.booking_date,
                    capacity: guard.capacity,
                    booked,
                });
            }
        }

        if state
            .bookings
            .values()
            .any(|b| b.booking_code == booking.booking_code)
        {
            return Err(BookingError::DuplicateCode);
        }

        let id = state.next_id();
        let now = Utc::now();
        let stored = Booking {
            id,
            booking_code: booking.booking_code.clone(),
            customer_name: booking.customer_name.clone(),
            booking_date: booking.booking_date,
            guest_count: booking.guest_count,
            whatsapp: booking.whatsapp.clone(),
            instagram: booking.instagram.clone(),
            seating_spot_id: booking.seating_spot_id,
            alternative_seating_spot_id: booking.alternative_seating_spot_id,
            subtotal_amount: booking.totals.subtotal,
            tax_amount: booking.totals.tax,
            total_amount: booking.totals.total,
            dp_amount: booking.totals.dp,
            payment_proof: Some(booking.payment_proof.clone()),
            status: BookingStatus::Pending,
            payment_status: None,
            paid_amount: None,
            confirmed_at: None,
            cancellation_reason: None,
            notes: booking.notes.clone(),
            created_at: now,
            updated_at: now,
        };
        state.bookings.insert(id, stored.clone());
        state.push_items(id, items);
        Ok(stored)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Booking>, BookingError> {
        Ok(self.state.lock().unwrap().bookings.get(&id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Booking>, BookingError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .bookings
            .values()
            .find(|b| b.booking_code == code)
            .cloned())
    }

    async fn items_for(&self, booking_id: i64) -> Result<Vec<BookingItem>, BookingError> {
        self.items_for_many(&[booking_id]).await
    }

    async fn items_for_many(&self, booking_ids: &[i64]) -> Result<Vec<BookingItem>, BookingError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .items
            .iter()
            .filter(|item| booking_ids.contains(&item.booking_id))
            .map(|item| state.with_menu_name(item))
            .collect())
    }

    async fn update(&self, booking: &Booking) -> Result<Booking, BookingError> {
        let mut state = self.state.lock().unwrap();
        match state.bookings.get_mut(&booking.id) {
            Some(stored) => {
                let totals = stored.totals();
                *stored = Booking {
                    updated_at: Utc::now(),
                    ..booking.clone()
                };
                stored.apply_totals(totals);
                Ok(stored.clone())
            }
            None => Err(BookingError::not_found("Booking", booking.id)),
        }
    }

    async fn replace_items(
        &self,
        booking_id: i64,
        changes: &ItemChanges,
        rates: PricingRates,
    ) -> Result<Booking, BookingError> {
        let mut state = self.state.lock().unwrap();
        if !state.bookings.contains_key(&booking_id) {
            return Err(BookingError::not_found("Booking", booking_id));
        }

        let mut items: Vec<BookingItem> = state
            .items
            .iter()
            .filter(|item| {
                item.booking_id == booking_id && !changes.removed_item_ids.contains(&item.id)
            })
            .cloned()
            .collect();
        for (item_id, quantity, subtotal) in &changes.quantity_updates {
            if let Some(item) = items.iter_mut().find(|item| item.id == *item_id) {
                item.quantity = *quantity;
                item.subtotal = *subtotal;
            }
        }
        let mut pending = MemoryState {
            next_id: state.next_id,
            ..MemoryState::default()
        };
        pending.push_items(booking_id, &changes.added);
        items.extend(pending.items);

        if items.is_empty() {
            return Err(BookingError::invalid(
                "items",
                "A booking must keep at least one item",
            ));
        }
        let totals = PriceCalculator::totals_for_items(
            items.iter().map(|item| (item.unit_price, item.quantity)),
            rates,
        )?;

        state.next_id = pending.next_id;
        state.items.retain(|item| item.booking_id != booking_id);
        state.items.extend(items);

        let booking = state
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| BookingError::not_found("Booking", booking_id))?;
        booking.apply_totals(totals);
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn delete(&self, id: i64) -> Result<Option<Booking>, BookingError> {
        let mut state = self.state.lock().unwrap();
        let removed = state.bookings.remove(&id);
        if removed.is_some() {
            state.items.retain(|item| item.booking_id != id);
        }
        Ok(removed)
    }

    async fn list(&self, filter: &BookingFilter) -> Result<(Vec<Booking>, i64), BookingError> {
        let state = self.state.lock().unwrap();
        let mut matches: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();

        match filter.order {
            BookingOrder::CreatedDesc => {
                matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            BookingOrder::BookingDateDesc => {
                matches.sort_by(|a, b| b.booking_date.cmp(&a.booking_date).then(b.id.cmp(&a.id)))
            }
        }

        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit.map_or(usize::MAX, |limit| limit as usize))
            .collect();
        Ok((page, total))
    }

    async fn stats(&self, today: NaiveDate) -> Result<BookingCounts, BookingError> {
        let state = self.state.lock().unwrap();
        let mut counts = BookingCounts::default();
        for booking in state.bookings.values() {
            counts.total += 1;
            match booking.status {
                BookingStatus::Pending => counts.pending += 1,
                BookingStatus::Confirmed => {
                    counts.confirmed += 1;
                    counts.confirmed_revenue += booking.total_amount;
                }
                BookingStatus::Cancelled => {}
            }
            if booking.booking_date == today && booking.status != BookingStatus::Cancelled {
                counts.today += 1;
            }
        }
        Ok(counts)
    }
}

#[async_trait]
impl MenuCatalog for InMemoryStore {
    async fn find_menu(&self, id: i64) -> Result<Option<MenuDetail>, sqlx::Error> {
        Ok(self.state.lock().unwrap().menus.get(&id).cloned())
    }

    async fn catalog_counts(&self) -> Result<CatalogCounts, sqlx::Error> {
        let state = self.state.lock().unwrap();
        let mut categories: Vec<i64> = state.menus.values().map(|m| m.category_id).collect();
        categories.sort_unstable();
        categories.dedup();
        Ok(CatalogCounts {
            menus: state.menus.len() as i64,
            categories: categories.len() as i64,
        })
    }
}

#[async_trait]
impl SpotDirectory for InMemoryStore {
    async fn find_spot(&self, id: i64) -> Result<Option<SeatingSpot>, sqlx::Error> {
        Ok(self.state.lock().unwrap().spots.get(&id).cloned())
    }

    async fn list_spots(&self, active_only: bool) -> Result<Vec<SeatingSpot>, sqlx::Error> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .spots
            .values()
            .filter(|spot| !active_only || spot.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingDateStore for InMemoryStore {
    async fn find_date(&self, date: NaiveDate) -> Result<Option<BookingDate>, sqlx::Error> {
        Ok(self.state.lock().unwrap().dates.get(&date).cloned())
    }

    async fn dates_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BookingDate>, sqlx::Error> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .dates
            .range(from..=to)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn upsert_date(&self, update: &UpsertBookingDate) -> Result<BookingDate, sqlx::Error> {
        let mut state = self.state.lock().unwrap();
        let now = Utc::now();
        let (id, created_at) = match state.dates.get(&update.date) {
            Some(existing) => (existing.id, existing.created_at),
            None => (state.next_id(), now),
        };
        let record = BookingDate {
            id,
            date: update.date,
            is_open: update.is_open,
            force_open: update.force_open,
            note: update.note.clone(),
            created_at,
            updated_at: now,
        };
        state.dates.insert(update.date, record.clone());
        Ok(record)
    }

    async fn delete_date(&self, date: NaiveDate) -> Result<bool, sqlx::Error> {
        Ok(self.state.lock().unwrap().dates.remove(&date).is_some())
    }
}

/// Settings from a fixed map
#[derive(Default)]
pub struct StaticSettings(pub HashMap<String, String>);

#[async_trait]
impl SettingsProvider for StaticSettings {
    async fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.0.get(key).cloned())
    }
}

/// Proof of payment the fixture bookings point at
pub const PROOF_REF: &str = "payments/proof.jpg";

/// File storage over a set of file names, recording deletions
#[derive(Default)]
pub struct MemoryStorage {
    stored: AtomicUsize,
    files: Mutex<HashSet<String>>,
    deleted: Mutex<Vec<String>>,
}

impl MemoryStorage {
    pub fn with_files(files: &[&str]) -> Self {
        let storage = Self::default();
        storage
            .files
            .lock()
            .unwrap()
            .extend(files.iter().map(|f| f.to_string()));
        storage
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn store(&self, dir: &str, _bytes: &[u8], extension: &str) -> Result<String, StorageError> {
        let n = self.stored.fetch_add(1, Ordering::SeqCst);
        let path_ref = format!("{}/{}.{}", dir, n, extension);
        self.files.lock().unwrap().insert(path_ref.clone());
        Ok(path_ref)
    }

    async fn delete(&self, path_ref: &str) -> Result<(), StorageError> {
        self.files.lock().unwrap().remove(path_ref);
        self.deleted.lock().unwrap().push(path_ref.to_string());
        Ok(())
    }

    async fn exists(&self, path_ref: &str) -> Result<bool, StorageError> {
        Ok(self.files.lock().unwrap().contains(path_ref))
    }

    fn public_url(&self, path_ref: &str) -> String {
        format!("http://localhost:3000/storage/{}", path_ref)
    }
}

/// Hands out the given suffixes in order, cycling
pub struct SequenceCodeGenerator {
    suffixes: Vec<String>,
    next: AtomicUsize,
}

impl SequenceCodeGenerator {
    pub fn new(suffixes: &[&str]) -> Self {
        Self {
            suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
            next: AtomicUsize::new(0),
        }
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self, day: NaiveDate) -> String {
        let i = self.next.fetch_add(1, Ordering::SeqCst) % self.suffixes.len();
        format!("{}{}{}", CODE_PREFIX, day.format("%Y%m%d"), self.suffixes[i])
    }
}

/// Booking service over a seeded in-memory store, clock on 15 March 2026
pub struct TestHarness {
    pub service: BookingService,
    pub store: Arc<InMemoryStore>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::at(10, 0)
    }

    pub fn at(hour: u32, minute: u32) -> Self {
        Self::build(hour, minute, Arc::new(MemoryStorage::with_files(&[PROOF_REF])))
    }

    pub fn with_storage(storage: Arc<MemoryStorage>) -> Self {
        Self::build(10, 0, storage)
    }

    fn build(hour: u32, minute: u32, storage: Arc<MemoryStorage>) -> Self {
        let store = Arc::new(InMemoryStore::seeded());
        let availability = AvailabilityService::new(
            store.clone(),
            Arc::new(fixed_clock(2026, 3, 15, hour, minute)),
            15,
        );
        let service = BookingService::new(
            BookingConfig::default(),
            store.clone(),
            store.clone(),
            store.clone(),
            availability,
            Arc::new(StaticSettings::default()),
            storage,
        );
        Self { service, store }
    }
}

pub fn spot(id: i64, name: &str, capacity: Option<i32>, is_active: bool) -> SeatingSpot {
    SeatingSpot {
        id,
        name: name.to_string(),
        description: None,
        capacity,
        image: None,
        is_active,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// 45000 base; required "Pilihan Ayam" with Paha (100, +0) and Dada (101, +5000)
pub fn paket_hemat_menu() -> MenuDetail {
    MenuDetail {
        id: 1,
        category_id: 1,
        name: "Paket Hemat A".to_string(),
        price: dec!(45000),
        description: Some("Nasi, ayam, sayur, es teh".to_string()),
        image: None,
        is_active: true,
        variants: vec![VariantDetail {
            id: 10,
            name: "Pilihan Ayam".to_string(),
            is_required: true,
            options: vec![
                VariantOption {
                    id: 100,
                    menu_variant_id: 10,
                    name: "Paha".to_string(),
                    price_adjustment: Decimal::ZERO,
                },
                VariantOption {
                    id: 101,
                    menu_variant_id: 10,
                    name: "Dada".to_string(),
                    price_adjustment: dec!(5000),
                },
            ],
        }],
    }
}

/// Cart line choosing `option_id` of the Pilihan Ayam variant
pub fn cart_line(menu_id: i64, quantity: i32, option_id: i64) -> CartLineRequest {
    CartLineRequest {
        menu_id,
        quantity,
        selections: BTreeMap::from([(10, option_id)]),
    }
}

/// Siti, 4 guests at the Gazebo on 15 March 2026, 2x Paket Hemat A (Dada)
pub fn create_request() -> CreateBookingRequest {
    CreateBookingRequest {
        customer_name: "Siti".to_string(),
        booking_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        guest_count: 4,
        whatsapp: "081234567890".to_string(),
        instagram: None,
        seating_spot_id: 1,
        alternative_seating_spot_id: None,
        items: vec![cart_line(1, 2, 101)],
        payment_proof: PROOF_REF.to_string(),
        notes: None,
    }
}

/// Stored item at 50000 per portion with the Dada option
pub fn booking_item(id: i64, menu_id: i64, name: &str, quantity: i32) -> BookingItem {
    BookingItem {
        id,
        booking_id: 1,
        menu_id,
        menu_name: Some(name.to_string()),
        quantity,
        unit_price: dec!(50000),
        subtotal: dec!(50000) * Decimal::from(quantity),
        selected_options: Json(BTreeMap::from([(
            "Pilihan Ayam".to_string(),
            "Dada".to_string(),
        )])),
    }
}

/// Pending BK20260315AB12 with one line of 2x Paket Hemat A (Dada)
pub fn sample_response() -> BookingResponse {
    let booking = Booking {
        id: 1,
        booking_code: "BK20260315AB12".to_string(),
        customer_name: "Siti".to_string(),
        booking_date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
        guest_count: 4,
        whatsapp: "6281234567890".to_string(),
        instagram: None,
        seating_spot_id: 1,
        alternative_seating_spot_id: None,
        subtotal_amount: dec!(100000),
        tax_amount: dec!(10000),
        total_amount: dec!(110000),
        dp_amount: dec!(55000),
        payment_proof: Some(PROOF_REF.to_string()),
        status: BookingStatus::Pending,
        payment_status: None,
        paid_amount: None,
        confirmed_at: None,
        cancellation_reason: None,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    BookingResponse {
        items: vec![booking_item(1, 1, "Paket Hemat A", 2)],
        seating_spot_name: Some("Gazebo".to_string()),
        alternative_seating_spot_name: None,
        remaining_balance: booking.remaining_balance(),
        payment_proof_url: Some("http://localhost:3000/storage/payments/proof.jpg".to_string()),
        booking,
    }
}

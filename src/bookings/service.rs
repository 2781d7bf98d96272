use chrono::{NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use validator::Validate;

use crate::availability::AvailabilityService;
use crate::bookings::{
    is_valid_code, plan_item_edit, Booking, BookingError, BookingFilter, BookingItem, BookingPage,
    BookingResponse, BookingStatus, BookingStore, BookingWithLink, CancelRequest, CapacityGuard,
    CartLineRequest, CodeGenerator, CreateBookingRequest, DashboardStats, EditItemsRequest, ItemChanges,
    KitchenSummary, MenuTally, NewBooking, PaymentRequest, PriceCalculator, QuoteRequest, Quote,
    QuotedLine, RandomCodeGenerator, ReplaceProofRequest, StatusMachine, UpdateDetailsRequest,
    ValidatedList,
};
use crate::catalog::{merge_lines, resolve_selection, MenuCatalog, MenuDetail, ResolvedLine};
use crate::config::BookingConfig;
use crate::notification::{
    booking_substitutions, wa_link, BraceTemplateRenderer, TemplateRenderer,
    DEFAULT_CONFIRM_TEMPLATE, DEFAULT_CUSTOMER_TEMPLATE,
};
use crate::seating::{SeatingSpot, SpotDirectory};
use crate::settings::{keys, SettingsProvider};
use crate::storage::{is_payment_proof_ref, FileStorage};
use crate::validation::{international_whatsapp, non_negative_amount};

/// Cafe number used when the `whatsapp` setting is empty
pub const DEFAULT_CAFE_WHATSAPP: &str = "6285813035292";

/// Minimum length of a cancellation reason
pub const MIN_CANCEL_REASON_CHARS: usize = 5;

/// Service for booking business logic
#[derive(Clone)]
pub struct BookingService {
    config: Arc<BookingConfig>,
    bookings: Arc<dyn BookingStore>,
    catalog: Arc<dyn MenuCatalog>,
    spots: Arc<dyn SpotDirectory>,
    availability: AvailabilityService,
    settings: Arc<dyn SettingsProvider>,
    storage: Arc<dyn FileStorage>,
    codes: Arc<dyn CodeGenerator>,
    renderer: Arc<dyn TemplateRenderer>,
}

impl BookingService {
    pub fn new(
        config: BookingConfig,
        bookings: Arc<dyn BookingStore>,
        catalog: Arc<dyn MenuCatalog>,
        spots: Arc<dyn SpotDirectory>,
        availability: AvailabilityService,
        settings: Arc<dyn SettingsProvider>,
        storage: Arc<dyn FileStorage>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            bookings,
            catalog,
            spots,
            availability,
            settings,
            storage,
            codes: Arc::new(RandomCodeGenerator),
            renderer: Arc::new(BraceTemplateRenderer),
        }
    }

    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    /// Resolve cart lines against the catalog and merge identical choices
    async fn resolve_cart(&self, lines: &[CartLineRequest]) -> Result<Vec<ResolvedLine>, BookingError> {
        let mut menus: HashMap<i64, MenuDetail> = HashMap::new();
        let mut resolved = Vec::with_capacity(lines.len());

        for line in lines {
            if !menus.contains_key(&line.menu_id) {
                let menu = self
                    .catalog
                    .find_menu(line.menu_id)
                    .await?
                    .ok_or_else(|| {
                        BookingError::invalid("items", format!("Menu {} does not exist", line.menu_id))
                    })?;
                menus.insert(line.menu_id, menu);
            }
            if let Some(menu) = menus.get(&line.menu_id) {
                resolved.push(resolve_selection(menu, &line.selections, line.quantity)?);
            }
        }

        Ok(merge_lines(resolved)?)
    }

    /// Price a cart without booking it
    pub async fn quote(&self, request: &QuoteRequest) -> Result<Quote, BookingError> {
        request.validate()?;
        let lines = self.resolve_cart(&request.items).await?;
        let cart: Vec<_> = lines.iter().map(ResolvedLine::cart_line).collect();
        let totals = PriceCalculator::price_cart(&cart, self.config.pricing_rates())?;

        Ok(Quote {
            lines: lines
                .into_iter()
                .map(|line| QuotedLine {
                    subtotal: line.subtotal(),
                    menu_id: line.menu_id,
                    menu_name: line.menu_name,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    selected_options: line.selected_options,
                })
                .collect(),
            totals,
        })
    }

    async fn active_spot(&self, field: &str, id: i64) -> Result<SeatingSpot, BookingError> {
        match self.spots.find_spot(id).await? {
            Some(spot) if spot.is_active => Ok(spot),
            Some(spot) => Err(BookingError::invalid(
                field,
                format!("Seating spot '{}' is not available", spot.name),
            )),
            None => Err(BookingError::invalid(
                field,
                format!("Seating spot {} does not exist", id),
            )),
        }
    }

    async fn check_alternative_spot(
        &self,
        priority: i64,
        alternative: Option<i64>,
        require_active: bool,
    ) -> Result<(), BookingError> {
        let Some(alternative) = alternative else {
            return Ok(());
        };
        if alternative == priority {
            return Err(BookingError::invalid(
                "alternative_seating_spot_id",
                "Alternative spot must differ from the priority spot",
            ));
        }
        if require_active {
            self.active_spot("alternative_seating_spot_id", alternative).await?;
        } else if self.spots.find_spot(alternative).await?.is_none() {
            return Err(BookingError::invalid(
                "alternative_seating_spot_id",
                format!("Seating spot {} does not exist", alternative),
            ));
        }
        Ok(())
    }

    /// The proof must be a file uploaded to the payment proof directory
    async fn check_payment_proof(&self, path_ref: &str) -> Result<String, BookingError> {
        let path_ref = path_ref.trim();
        if !is_payment_proof_ref(path_ref) {
            return Err(BookingError::invalid(
                "payment_proof",
                "Proof of payment must be an uploaded payment image",
            ));
        }
        if !self.storage.exists(path_ref).await? {
            return Err(BookingError::invalid(
                "payment_proof",
                format!("Proof of payment {} was not found", path_ref),
            ));
        }
        Ok(path_ref.to_string())
    }

    /// Remove a proof file, never touching anything outside the proof directory
    async fn discard_payment_proof(&self, path_ref: &str, booking_code: &str) {
        if !is_payment_proof_ref(path_ref) {
            tracing::warn!("Not deleting {} of {}: not a payment proof", path_ref, booking_code);
            return;
        }
        if let Err(e) = self.storage.delete(path_ref).await {
            tracing::warn!("Payment proof {} of {} not deleted: {}", path_ref, booking_code, e);
        }
    }

    /// Create a pending booking from a customer submission
    ///
    /// Preconditions are checked before anything is written. The booking and
    /// its items are inserted together; a colliding booking code is retried
    /// with a fresh one.
    pub async fn create(&self, request: &CreateBookingRequest) -> Result<BookingWithLink, BookingError> {
        request.validate()?;

        if !self.availability.is_available(request.booking_date).await? {
            return Err(BookingError::DateUnavailable(request.booking_date));
        }

        let lines = self.resolve_cart(&request.items).await?;
        let spot = self.active_spot("seating_spot_id", request.seating_spot_id).await?;
        self.check_alternative_spot(spot.id, request.alternative_seating_spot_id, true)
            .await?;
        let payment_proof = self.check_payment_proof(&request.payment_proof).await?;

        let cart: Vec<_> = lines.iter().map(ResolvedLine::cart_line).collect();
        let totals = PriceCalculator::price_cart(&cart, self.config.pricing_rates())?;
        let items: Vec<_> = lines.into_iter().map(ResolvedLine::into_new_item).collect();

        let guard = match spot.capacity {
            Some(capacity) if self.config.enforce_spot_capacity => Some(CapacityGuard {
                spot_id: spot.id,
                capacity,
                booking_date: request.booking_date,
                guests: request.guest_count,
            }),
            _ => None,
        };

        let today = self.availability.today();
        let mut new_booking = NewBooking {
            booking_code: String::new(),
            customer_name: request.customer_name.trim().to_string(),
            booking_date: request.booking_date,
            guest_count: request.guest_count,
            whatsapp: international_whatsapp(&request.whatsapp),
            instagram: non_empty(request.instagram.as_deref()),
            seating_spot_id: spot.id,
            alternative_seating_spot_id: request.alternative_seating_spot_id,
            totals,
            payment_proof,
            notes: non_empty(request.notes.as_deref()),
        };

        let max_attempts = self.config.max_code_attempts.max(1);
        let mut created = None;
        for attempt in 1..=max_attempts {
            new_booking.booking_code = self.codes.generate(today);
            match self.bookings.insert(&new_booking, &items, guard).await {
                Ok(booking) => {
                    created = Some(booking);
                    break;
                }
                Err(BookingError::DuplicateCode) => {
                    tracing::warn!(
                        "Booking code {} already taken (attempt {} of {})",
                        new_booking.booking_code,
                        attempt,
                        max_attempts
                    );
                }
                Err(e) => return Err(e),
            }
        }
        let booking = created.ok_or(BookingError::CodeExhausted(max_attempts))?;

        tracing::info!(
            "Created booking {} for {} on {} (total {})",
            booking.booking_code,
            booking.customer_name,
            booking.booking_date,
            booking.total_amount
        );

        let response = self.to_response(booking).await?;
        let cafe_number = self.setting_or(keys::WHATSAPP, DEFAULT_CAFE_WHATSAPP).await;
        let template = self
            .setting_or(keys::WA_TEMPLATE_CUSTOMER, DEFAULT_CUSTOMER_TEMPLATE)
            .await;
        let whatsapp_url = self.message_link(&cafe_number, &template, &response);

        Ok(BookingWithLink {
            booking: response,
            whatsapp_url,
        })
    }

    async fn load(&self, id: i64) -> Result<Booking, BookingError> {
        self.bookings
            .find_by_id(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", id))
    }

    fn ensure_mutable(booking: &Booking, action: &str) -> Result<(), BookingError> {
        if StatusMachine::is_mutable(booking.status) {
            Ok(())
        } else {
            Err(BookingError::InvalidState(format!(
                "Cannot {} booking {}: it is cancelled",
                action, booking.booking_code
            )))
        }
    }

    /// Confirm a pending booking and record what was paid
    pub async fn confirm(&self, id: i64, request: &PaymentRequest) -> Result<BookingWithLink, BookingError> {
        non_negative_amount("paid_amount", request.paid_amount)?;
        let mut booking = self.load(id).await?;

        booking.status = StatusMachine::transition(booking.status, BookingStatus::Confirmed)
            .map_err(BookingError::InvalidState)?;
        booking.payment_status = Some(request.payment_status);
        booking.paid_amount = Some(request.paid_amount);
        booking.confirmed_at = Some(self.availability.clock().now().with_timezone(&Utc));

        let booking = self.bookings.update(&booking).await?;
        tracing::info!(
            "Confirmed booking {} ({} {})",
            booking.booking_code,
            request.payment_status,
            request.paid_amount
        );

        let response = self.to_response(booking).await?;
        let template = self
            .setting_or(keys::WA_TEMPLATE_CONFIRM, DEFAULT_CONFIRM_TEMPLATE)
            .await;
        let whatsapp_url = self.message_link(&response.booking.whatsapp, &template, &response);

        Ok(BookingWithLink {
            booking: response,
            whatsapp_url,
        })
    }

    /// Cancel a pending or confirmed booking
    pub async fn cancel(&self, id: i64, request: &CancelRequest) -> Result<BookingResponse, BookingError> {
        let reason = request.reason.trim();
        if reason.chars().count() < MIN_CANCEL_REASON_CHARS {
            return Err(BookingError::invalid(
                "reason",
                format!(
                    "Cancellation reason must be at least {} characters",
                    MIN_CANCEL_REASON_CHARS
                ),
            ));
        }

        let mut booking = self.load(id).await?;
        booking.status = StatusMachine::transition(booking.status, BookingStatus::Cancelled)
            .map_err(BookingError::InvalidState)?;
        booking.cancellation_reason = Some(reason.to_string());

        let booking = self.bookings.update(&booking).await?;
        tracing::info!("Cancelled booking {}: {}", booking.booking_code, reason);
        self.to_response(booking).await
    }

    /// Correct the recorded payment without touching the status
    pub async fn update_payment(&self, id: i64, request: &PaymentRequest) -> Result<BookingResponse, BookingError> {
        non_negative_amount("paid_amount", request.paid_amount)?;
        let mut booking = self.load(id).await?;
        Self::ensure_mutable(&booking, "record a payment on")?;

        booking.payment_status = Some(request.payment_status);
        booking.paid_amount = Some(request.paid_amount);

        let booking = self.bookings.update(&booking).await?;
        tracing::info!(
            "Updated payment of {} to {} {}",
            booking.booking_code,
            request.payment_status,
            request.paid_amount
        );
        self.to_response(booking).await
    }

    /// Re-derive totals from the stored items and their frozen unit prices
    pub async fn recalculate_totals(&self, id: i64) -> Result<BookingResponse, BookingError> {
        let booking = self.load(id).await?;
        let items = self.bookings.items_for(id).await?;
        let totals = PriceCalculator::totals_for_items(
            items.iter().map(|item| (item.unit_price, item.quantity)),
            self.config.pricing_rates(),
        )?;

        if totals == booking.totals() {
            tracing::debug!("Totals of {} already consistent", booking.booking_code);
            return self.to_response_with_items(booking, items).await;
        }

        let previous_total = booking.total_amount;
        let booking = self
            .bookings
            .replace_items(id, &ItemChanges::default(), self.config.pricing_rates())
            .await?;
        tracing::info!(
            "Recalculated totals of {}: {} -> {}",
            booking.booking_code,
            previous_total,
            booking.total_amount
        );
        self.to_response(booking).await
    }

    /// Add, remove or re-quantify items; totals follow in the same write
    pub async fn edit_items(&self, id: i64, request: &EditItemsRequest) -> Result<BookingResponse, BookingError> {
        request.validate()?;
        let booking = self.load(id).await?;
        Self::ensure_mutable(&booking, "edit items of")?;

        let existing = self.bookings.items_for(id).await?;
        let added = self.resolve_cart(&request.added).await?;
        let plan = plan_item_edit(
            &existing,
            added,
            &request.removed_item_ids,
            &request.quantity_changes,
            self.config.pricing_rates(),
        )?;

        if plan.changes.is_empty() {
            return self.to_response_with_items(booking, existing).await;
        }

        let booking = self
            .bookings
            .replace_items(id, &plan.changes, self.config.pricing_rates())
            .await?;
        tracing::info!(
            "Edited items of {}: +{} -{} ~{}, new total {}",
            booking.booking_code,
            plan.changes.added.len(),
            plan.changes.removed_item_ids.len(),
            plan.changes.quantity_updates.len(),
            booking.total_amount
        );
        self.to_response(booking).await
    }

    /// Staff edit of the customer-facing details
    pub async fn update_details(&self, id: i64, request: &UpdateDetailsRequest) -> Result<BookingResponse, BookingError> {
        request.validate()?;
        let mut booking = self.load(id).await?;
        Self::ensure_mutable(&booking, "edit")?;

        if self.spots.find_spot(request.seating_spot_id).await?.is_none() {
            return Err(BookingError::invalid(
                "seating_spot_id",
                format!("Seating spot {} does not exist", request.seating_spot_id),
            ));
        }
        self.check_alternative_spot(
            request.seating_spot_id,
            request.alternative_seating_spot_id,
            false,
        )
        .await?;

        booking.customer_name = request.customer_name.trim().to_string();
        booking.booking_date = request.booking_date;
        booking.guest_count = request.guest_count;
        booking.whatsapp = international_whatsapp(&request.whatsapp);
        booking.instagram = non_empty(request.instagram.as_deref());
        booking.seating_spot_id = request.seating_spot_id;
        booking.alternative_seating_spot_id = request.alternative_seating_spot_id;
        booking.notes = non_empty(request.notes.as_deref());

        let booking = self.bookings.update(&booking).await?;
        tracing::info!("Updated details of {}", booking.booking_code);
        self.to_response(booking).await
    }

    /// Point the booking at a new proof file and remove the old one
    pub async fn replace_payment_proof(
        &self,
        id: i64,
        request: &ReplaceProofRequest,
    ) -> Result<BookingResponse, BookingError> {
        request.validate()?;
        let mut booking = self.load(id).await?;
        Self::ensure_mutable(&booking, "replace the payment proof of")?;
        let new_proof = self.check_payment_proof(&request.payment_proof).await?;

        let old = booking.payment_proof.replace(new_proof.clone());
        let booking = self.bookings.update(&booking).await?;

        if let Some(old) = old.filter(|old| *old != new_proof) {
            self.discard_payment_proof(&old, &booking.booking_code).await;
        }
        tracing::info!("Replaced payment proof of {}", booking.booking_code);
        self.to_response(booking).await
    }

    /// Hard delete; items cascade and the proof file is removed
    pub async fn delete(&self, id: i64) -> Result<(), BookingError> {
        let booking = self
            .bookings
            .delete(id)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", id))?;

        if let Some(proof) = &booking.payment_proof {
            self.discard_payment_proof(proof, &booking.booking_code).await;
        }
        tracing::info!("Deleted booking {}", booking.booking_code);
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<BookingResponse, BookingError> {
        let booking = self.load(id).await?;
        self.to_response(booking).await
    }

    /// Customer lookup by booking code, case-insensitive
    pub async fn find_by_code(&self, code: &str) -> Result<BookingResponse, BookingError> {
        let code = code.trim().to_uppercase();
        if !is_valid_code(&code) {
            return Err(BookingError::not_found("Booking", code));
        }
        let booking = self
            .bookings
            .find_by_code(&code)
            .await?
            .ok_or_else(|| BookingError::not_found("Booking", &code))?;
        self.to_response(booking).await
    }

    pub async fn list(&self, request: &ValidatedList) -> Result<BookingPage, BookingError> {
        let (bookings, total) = self.bookings.list(&request.filter).await?;
        Ok(BookingPage {
            data: self.to_responses(bookings).await?,
            page: request.page,
            limit: request.limit,
            total,
        })
    }

    /// Every booking matching `filter`, with items and spot names
    pub async fn export(&self, filter: &BookingFilter) -> Result<Vec<BookingResponse>, BookingError> {
        let filter = BookingFilter {
            limit: None,
            offset: 0,
            ..filter.clone()
        };
        let (bookings, _) = self.bookings.list(&filter).await?;
        tracing::debug!("Exporting {} bookings", bookings.len());
        self.to_responses(bookings).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, BookingError> {
        let today = self.availability.today();
        let bookings = self.bookings.stats(today).await?;
        let catalog = self.catalog.catalog_counts().await?;

        Ok(DashboardStats {
            bookings,
            menus: catalog.menus,
            categories: catalog.categories,
            today,
            past_cutoff: self.availability.is_past_cutoff(),
            today_force_open: self.availability.is_today_force_open().await?,
        })
    }

    /// What the kitchen has to prepare on `date`
    ///
    /// Without a status filter, cancelled bookings are left out.
    pub async fn kitchen_summary(
        &self,
        date: NaiveDate,
        status: Option<BookingStatus>,
    ) -> Result<KitchenSummary, BookingError> {
        let (bookings, _) = self.bookings.list(&BookingFilter::on_date(date, status)).await?;
        let bookings: Vec<Booking> = bookings
            .into_iter()
            .filter(|b| status.is_some() || b.status != BookingStatus::Cancelled)
            .collect();
        let responses = self.to_responses(bookings).await?;

        let total_pax = responses
            .iter()
            .map(|r| i64::from(r.booking.guest_count))
            .sum();
        let menu_summary = tally_menus(responses.iter().flat_map(|r| r.items.iter()));

        Ok(KitchenSummary {
            date,
            total_bookings: responses.len(),
            total_pax,
            menu_summary,
            bookings: responses,
        })
    }

    async fn setting_or(&self, key: &str, default: &str) -> String {
        match self.settings.get(key).await {
            Ok(Some(value)) if !value.trim().is_empty() => value,
            Ok(_) => default.to_string(),
            Err(e) => {
                tracing::warn!("Setting {} unavailable, using default: {}", key, e);
                default.to_string()
            }
        }
    }

    fn message_link(&self, number: &str, template: &str, booking: &BookingResponse) -> String {
        let message = self.renderer.render(template, &booking_substitutions(booking));
        wa_link(number, &message)
    }

    async fn spot_names(&self) -> Result<HashMap<i64, String>, BookingError> {
        Ok(self
            .spots
            .list_spots(false)
            .await?
            .into_iter()
            .map(|spot| (spot.id, spot.name))
            .collect())
    }

    fn assemble(
        &self,
        booking: Booking,
        items: Vec<BookingItem>,
        spot_names: &HashMap<i64, String>,
    ) -> BookingResponse {
        BookingResponse {
            seating_spot_name: spot_names.get(&booking.seating_spot_id).cloned(),
            alternative_seating_spot_name: booking
                .alternative_seating_spot_id
                .and_then(|id| spot_names.get(&id).cloned()),
            remaining_balance: booking.remaining_balance(),
            payment_proof_url: booking
                .payment_proof
                .as_deref()
                .map(|proof| self.storage.public_url(proof)),
            items,
            booking,
        }
    }

    async fn to_response(&self, booking: Booking) -> Result<BookingResponse, BookingError> {
        let items = self.bookings.items_for(booking.id).await?;
        self.to_response_with_items(booking, items).await
    }

    async fn to_response_with_items(
        &self,
        booking: Booking,
        items: Vec<BookingItem>,
    ) -> Result<BookingResponse, BookingError> {
        let spot_names = self.spot_names().await?;
        Ok(self.assemble(booking, items, &spot_names))
    }

    async fn to_responses(&self, bookings: Vec<Booking>) -> Result<Vec<BookingResponse>, BookingError> {
        if bookings.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = bookings.iter().map(|b| b.id).collect();
        let mut items_by_booking: HashMap<i64, Vec<BookingItem>> = HashMap::new();
        for item in self.bookings.items_for_many(&ids).await? {
            items_by_booking.entry(item.booking_id).or_default().push(item);
        }
        let spot_names = self.spot_names().await?;

        Ok(bookings
            .into_iter()
            .map(|booking| {
                let items = items_by_booking.remove(&booking.id).unwrap_or_default();
                self.assemble(booking, items, &spot_names)
            })
            .collect())
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Portions per menu, largest first
pub fn tally_menus<'a>(items: impl Iterator<Item = &'a BookingItem>) -> Vec<MenuTally> {
    let mut tallies: BTreeMap<i64, MenuTally> = BTreeMap::new();
    for item in items {
        let entry = tallies.entry(item.menu_id).or_insert_with(|| MenuTally {
            menu_id: item.menu_id,
            menu_name: item
                .menu_name
                .clone()
                .unwrap_or_else(|| format!("Menu #{}", item.menu_id)),
            quantity: 0,
        });
        entry.quantity += i64::from(item.quantity);
    }

    let mut summary: Vec<MenuTally> = tallies.into_values().collect();
    summary.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.menu_name.cmp(&b.menu_name)));
    summary
}

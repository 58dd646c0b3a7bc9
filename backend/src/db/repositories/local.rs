//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory behind a single lock, which also makes seat reservation atomic.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::*;

/// In-memory local repository.
///
/// # Example
/// ```
/// use tour_booking::db::repositories::LocalRepository;
/// use tour_booking::db::repository::TourRepository;
///
/// # tokio_test_block_on(async {
/// let repo = LocalRepository::new();
/// assert!(repo.health_check().await.unwrap());
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct LocalData {
    tours: BTreeMap<TourId, Tour>,
    blocks: BTreeMap<BlockId, TourBlock>,
    pricing: HashMap<TourId, TourPricing>,
    upsells: BTreeMap<UpsellId, Upsell>,
    packages: BTreeMap<PackageId, Package>,
    slots: BTreeMap<SlotId, AvailabilitySlot>,
    bookings: BTreeMap<BookingId, Booking>,
    pages: BTreeMap<PageId, StaticPage>,
    categories: BTreeMap<CategoryId, Category>,
    labels: BTreeMap<LabelId, SpecialLabel>,
    visits: Vec<PageVisit>,
    users: HashMap<String, UserProfile>,

    // Shared ID counter; ids are unique across entity types.
    next_id: i64,

    // Connection health
    is_unhealthy: bool,
    failing_operations: HashSet<&'static str>,
}

impl LocalData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

fn not_found(entity: &str, id: impl ToString, operation: &str) -> RepositoryError {
    let id = id.to_string();
    RepositoryError::not_found_with_context(
        format!("{} {} not found", entity, id),
        ErrorContext::new(operation)
            .with_entity(entity)
            .with_entity_id(id),
    )
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_unhealthy = !healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        let unhealthy = data.is_unhealthy;
        *data = LocalData {
            is_unhealthy: unhealthy,
            ..Default::default()
        };
    }

    /// Make a single named operation fail with a connection error.
    pub fn set_failing_operation(&self, operation: &'static str, failing: bool) {
        let mut data = self.data.write();
        if failing {
            data.failing_operations.insert(operation);
        } else {
            data.failing_operations.remove(operation);
        }
    }

    /// Number of stored bookings.
    pub fn booking_count(&self) -> usize {
        self.data.read().bookings.len()
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if self.data.read().is_unhealthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }

    fn check_operation(&self, operation: &'static str) -> RepositoryResult<()> {
        self.check_health()?;
        if self.data.read().failing_operations.contains(operation) {
            return Err(RepositoryError::connection_with_context(
                "Injected failure",
                ErrorContext::new(operation),
            ));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Tours ====================

#[async_trait]
impl TourRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(!self.data.read().is_unhealthy)
    }

    async fn list_tours(&self, filter: TourFilter) -> RepositoryResult<Vec<Tour>> {
        self.check_health()?;
        let data = self.data.read();
        Ok(data
            .tours
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    async fn get_tour(&self, tour_id: TourId) -> RepositoryResult<Tour> {
        self.check_health()?;
        self.data
            .read()
            .tours
            .get(&tour_id)
            .cloned()
            .ok_or_else(|| not_found("tour", tour_id, "get_tour"))
    }

    async fn get_tour_by_slug(&self, slug: &str) -> RepositoryResult<Tour> {
        self.check_health()?;
        self.data
            .read()
            .tours
            .values()
            .find(|t| t.slug == slug)
            .cloned()
            .ok_or_else(|| not_found("tour", slug, "get_tour_by_slug"))
    }

    async fn create_tour(&self, input: &TourInput) -> RepositoryResult<Tour> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.tours.values().any(|t| t.slug == input.slug) {
            return Err(RepositoryError::conflict_with_context(
                format!("Tour slug '{}' already exists", input.slug),
                ErrorContext::new("create_tour").with_entity("tour"),
            ));
        }
        let id = TourId(data.next_id());
        let now = Utc::now();
        let tour = Tour {
            id,
            slug: input.slug.clone(),
            translations: input.translations.clone(),
            category_id: input.category_id,
            label_ids: input.label_ids.clone(),
            duration_minutes: input.duration_minutes,
            meeting_point: input.meeting_point.clone(),
            cover_image_url: input.cover_image_url.clone(),
            gallery: input.gallery.clone(),
            published: input.published,
            created_at: now,
            updated_at: now,
        };
        data.tours.insert(id, tour.clone());
        Ok(tour)
    }

    async fn update_tour(&self, tour_id: TourId, input: &TourInput) -> RepositoryResult<Tour> {
        self.check_health()?;
        let mut data = self.data.write();
        if data
            .tours
            .values()
            .any(|t| t.slug == input.slug && t.id != tour_id)
        {
            return Err(RepositoryError::conflict_with_context(
                format!("Tour slug '{}' already exists", input.slug),
                ErrorContext::new("update_tour")
                    .with_entity("tour")
                    .with_entity_id(tour_id),
            ));
        }
        let tour = data
            .tours
            .get_mut(&tour_id)
            .ok_or_else(|| not_found("tour", tour_id, "update_tour"))?;
        tour.slug = input.slug.clone();
        tour.translations = input.translations.clone();
        tour.category_id = input.category_id;
        tour.label_ids = input.label_ids.clone();
        tour.duration_minutes = input.duration_minutes;
        tour.meeting_point = input.meeting_point.clone();
        tour.cover_image_url = input.cover_image_url.clone();
        tour.gallery = input.gallery.clone();
        tour.published = input.published;
        tour.updated_at = Utc::now();
        Ok(tour.clone())
    }

    async fn delete_tour(&self, tour_id: TourId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.tours.contains_key(&tour_id) {
            return Err(not_found("tour", tour_id, "delete_tour"));
        }
        if data.bookings.values().any(|b| b.tour_id == tour_id) {
            return Err(RepositoryError::conflict_with_context(
                "Tour has bookings and cannot be deleted",
                ErrorContext::new("delete_tour")
                    .with_entity("tour")
                    .with_entity_id(tour_id),
            ));
        }
        data.tours.remove(&tour_id);
        data.blocks.retain(|_, b| b.tour_id != tour_id);
        data.pricing.remove(&tour_id);
        data.upsells.retain(|_, u| u.tour_id != tour_id);
        data.packages.retain(|_, p| p.tour_id != tour_id);
        data.slots.retain(|_, s| s.tour_id != tour_id);
        Ok(())
    }

    async fn list_blocks(&self, tour_id: TourId) -> RepositoryResult<Vec<TourBlock>> {
        self.check_health()?;
        let data = self.data.read();
        let mut blocks: Vec<TourBlock> = data
            .blocks
            .values()
            .filter(|b| b.tour_id == tour_id)
            .cloned()
            .collect();
        blocks.sort_by_key(|b| (b.position, b.id));
        Ok(blocks)
    }

    async fn get_block(&self, block_id: BlockId) -> RepositoryResult<TourBlock> {
        self.check_health()?;
        self.data
            .read()
            .blocks
            .get(&block_id)
            .cloned()
            .ok_or_else(|| not_found("block", block_id, "get_block"))
    }

    async fn upsert_block(
        &self,
        tour_id: TourId,
        input: &TourBlockInput,
    ) -> RepositoryResult<TourBlock> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.tours.contains_key(&tour_id) {
            return Err(not_found("tour", tour_id, "upsert_block"));
        }
        let id = match input.id {
            Some(id) => {
                let existing = data
                    .blocks
                    .get(&id)
                    .ok_or_else(|| not_found("block", id, "upsert_block"))?;
                if existing.tour_id != tour_id {
                    return Err(RepositoryError::validation(format!(
                        "Block {} belongs to another tour",
                        id
                    )));
                }
                id
            }
            None => BlockId(data.next_id()),
        };
        let block = TourBlock {
            id,
            tour_id,
            kind: input.kind,
            position: input.position,
            translations: input.translations.clone(),
        };
        data.blocks.insert(id, block.clone());
        Ok(block)
    }

    async fn delete_block(&self, block_id: BlockId) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .blocks
            .remove(&block_id)
            .map(|_| ())
            .ok_or_else(|| not_found("block", block_id, "delete_block"))
    }

    async fn get_pricing(&self, tour_id: TourId) -> RepositoryResult<Option<TourPricing>> {
        self.check_health()?;
        Ok(self.data.read().pricing.get(&tour_id).cloned())
    }

    async fn set_pricing(
        &self,
        tour_id: TourId,
        config: &PricingConfig,
    ) -> RepositoryResult<TourPricing> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.tours.contains_key(&tour_id) {
            return Err(not_found("tour", tour_id, "set_pricing"));
        }
        let pricing = TourPricing {
            tour_id,
            config: config.clone(),
            updated_at: Utc::now(),
        };
        data.pricing.insert(tour_id, pricing.clone());
        Ok(pricing)
    }

    async fn list_upsells(&self, tour_id: TourId) -> RepositoryResult<Vec<Upsell>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .upsells
            .values()
            .filter(|u| u.tour_id == tour_id)
            .cloned()
            .collect())
    }

    async fn create_upsell(
        &self,
        tour_id: TourId,
        input: &UpsellInput,
    ) -> RepositoryResult<Upsell> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.tours.contains_key(&tour_id) {
            return Err(not_found("tour", tour_id, "create_upsell"));
        }
        let id = UpsellId(data.next_id());
        let upsell = Upsell {
            id,
            tour_id,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            per_person: input.per_person,
            active: input.active,
        };
        data.upsells.insert(id, upsell.clone());
        Ok(upsell)
    }

    async fn update_upsell(
        &self,
        upsell_id: UpsellId,
        input: &UpsellInput,
    ) -> RepositoryResult<Upsell> {
        self.check_health()?;
        let mut data = self.data.write();
        let upsell = data
            .upsells
            .get_mut(&upsell_id)
            .ok_or_else(|| not_found("upsell", upsell_id, "update_upsell"))?;
        upsell.name = input.name.clone();
        upsell.description = input.description.clone();
        upsell.price = input.price;
        upsell.per_person = input.per_person;
        upsell.active = input.active;
        Ok(upsell.clone())
    }

    async fn delete_upsell(&self, upsell_id: UpsellId) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .upsells
            .remove(&upsell_id)
            .map(|_| ())
            .ok_or_else(|| not_found("upsell", upsell_id, "delete_upsell"))
    }

    async fn list_packages(&self, tour_id: TourId) -> RepositoryResult<Vec<Package>> {
        self.check_health()?;
        Ok(self
            .data
            .read()
            .packages
            .values()
            .filter(|p| p.tour_id == tour_id)
            .cloned()
            .collect())
    }

    async fn create_package(
        &self,
        tour_id: TourId,
        input: &PackageInput,
    ) -> RepositoryResult<Package> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.tours.contains_key(&tour_id) {
            return Err(not_found("tour", tour_id, "create_package"));
        }
        let id = PackageId(data.next_id());
        let package = Package {
            id,
            tour_id,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            max_participants: input.max_participants,
            active: input.active,
        };
        data.packages.insert(id, package.clone());
        Ok(package)
    }

    async fn delete_package(&self, package_id: PackageId) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .packages
            .remove(&package_id)
            .map(|_| ())
            .ok_or_else(|| not_found("package", package_id, "delete_package"))
    }
}

// ==================== Availability ====================

#[async_trait]
impl AvailabilityRepository for LocalRepository {
    async fn list_slots(
        &self,
        tour_id: TourId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<AvailabilitySlot>> {
        self.check_health()?;
        let data = self.data.read();
        let mut slots: Vec<AvailabilitySlot> = data
            .slots
            .values()
            .filter(|s| s.tour_id == tour_id && s.date >= from && s.date <= to)
            .cloned()
            .collect();
        slots.sort_by_key(|s| (s.date, s.start_time, s.id));
        Ok(slots)
    }

    async fn get_slot(&self, slot_id: SlotId) -> RepositoryResult<AvailabilitySlot> {
        self.check_health()?;
        self.data
            .read()
            .slots
            .get(&slot_id)
            .cloned()
            .ok_or_else(|| not_found("slot", slot_id, "get_slot"))
    }

    async fn create_slot(
        &self,
        tour_id: TourId,
        input: &SlotInput,
    ) -> RepositoryResult<AvailabilitySlot> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.tours.contains_key(&tour_id) {
            return Err(not_found("tour", tour_id, "create_slot"));
        }
        let duplicate = data.slots.values().any(|s| {
            s.tour_id == tour_id && s.date == input.date && s.start_time == input.start_time
        });
        if duplicate {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "Tour {} already has a slot on {} at {}",
                    tour_id, input.date, input.start_time
                ),
                ErrorContext::new("create_slot").with_entity("slot"),
            ));
        }
        let id = SlotId(data.next_id());
        let slot = AvailabilitySlot {
            id,
            tour_id,
            date: input.date,
            start_time: input.start_time,
            capacity: input.capacity,
            booked: input.booked,
        };
        data.slots.insert(id, slot.clone());
        Ok(slot)
    }

    async fn delete_slot(&self, slot_id: SlotId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if !data.slots.contains_key(&slot_id) {
            return Err(not_found("slot", slot_id, "delete_slot"));
        }
        if data.bookings.values().any(|b| b.slot_id == slot_id) {
            return Err(RepositoryError::conflict_with_context(
                "Slot has bookings and cannot be deleted",
                ErrorContext::new("delete_slot")
                    .with_entity("slot")
                    .with_entity_id(slot_id),
            ));
        }
        data.slots.remove(&slot_id);
        Ok(())
    }

    async fn reserve_seats(
        &self,
        slot_id: SlotId,
        seats: u32,
    ) -> RepositoryResult<AvailabilitySlot> {
        self.check_health()?;
        let mut data = self.data.write();
        let slot = data
            .slots
            .get_mut(&slot_id)
            .ok_or_else(|| not_found("slot", slot_id, "reserve_seats"))?;
        if slot.booked.saturating_add(seats) > slot.capacity {
            return Err(RepositoryError::conflict_with_context(
                format!(
                    "Only {} seats left, {} requested",
                    slot.remaining(),
                    seats
                ),
                ErrorContext::new("reserve_seats")
                    .with_entity("slot")
                    .with_entity_id(slot_id),
            ));
        }
        slot.booked += seats;
        Ok(slot.clone())
    }

    async fn release_seats(
        &self,
        slot_id: SlotId,
        seats: u32,
    ) -> RepositoryResult<AvailabilitySlot> {
        self.check_health()?;
        let mut data = self.data.write();
        let slot = data
            .slots
            .get_mut(&slot_id)
            .ok_or_else(|| not_found("slot", slot_id, "release_seats"))?;
        slot.booked = slot.booked.saturating_sub(seats);
        Ok(slot.clone())
    }
}

// ==================== Bookings ====================

#[async_trait]
impl BookingRepository for LocalRepository {
    async fn create_booking(&self, booking: &NewBooking) -> RepositoryResult<Booking> {
        self.check_health()?;
        let mut data = self.data.write();
        if data
            .bookings
            .values()
            .any(|b| b.voucher_token == booking.voucher_token)
        {
            return Err(RepositoryError::conflict("Voucher token already in use"));
        }
        let id = BookingId(data.next_id());
        let now = Utc::now();
        let stored = Booking {
            id,
            voucher_token: booking.voucher_token.clone(),
            tour_id: booking.tour_id,
            slot_id: booking.slot_id,
            customer_name: booking.customer_name.clone(),
            customer_email: booking.customer_email.clone(),
            customer_phone: booking.customer_phone.clone(),
            language: booking.language,
            adults: booking.adults,
            children: booking.children,
            package_id: booking.package_id,
            status: booking.status,
            total_amount: booking.total_amount,
            currency: booking.currency.clone(),
            payment_intent_id: None,
            notes: booking.notes.clone(),
            items: booking.items.clone(),
            created_at: now,
            updated_at: now,
        };
        data.bookings.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_booking(&self, booking_id: BookingId) -> RepositoryResult<Booking> {
        self.check_health()?;
        self.data
            .read()
            .bookings
            .get(&booking_id)
            .cloned()
            .ok_or_else(|| not_found("booking", booking_id, "get_booking"))
    }

    async fn get_booking_by_token(&self, token: &str) -> RepositoryResult<Booking> {
        self.check_health()?;
        self.data
            .read()
            .bookings
            .values()
            .find(|b| b.voucher_token == token)
            .cloned()
            .ok_or_else(|| {
                RepositoryError::not_found_with_context(
                    "Booking not found",
                    ErrorContext::new("get_booking_by_token").with_entity("booking"),
                )
            })
    }

    async fn list_bookings(&self, filter: &BookingFilter) -> RepositoryResult<Vec<Booking>> {
        self.check_health()?;
        let data = self.data.read();
        let mut bookings: Vec<Booking> = data
            .bookings
            .values()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bookings)
    }

    async fn update_booking_status(
        &self,
        booking_id: BookingId,
        status: BookingStatus,
    ) -> RepositoryResult<Booking> {
        self.check_health()?;
        let mut data = self.data.write();
        let booking = data
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| not_found("booking", booking_id, "update_booking_status"))?;
        booking.status = status;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn transition_booking_status(
        &self,
        booking_id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    ) -> RepositoryResult<Option<Booking>> {
        self.check_operation("transition_booking_status")?;
        let mut data = self.data.write();
        let booking = data
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| not_found("booking", booking_id, "transition_booking_status"))?;
        if booking.status != from {
            return Ok(None);
        }
        booking.status = to;
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
    }

    async fn set_payment_intent(
        &self,
        booking_id: BookingId,
        payment_intent_id: &str,
    ) -> RepositoryResult<Booking> {
        self.check_operation("set_payment_intent")?;
        let mut data = self.data.write();
        let booking = data
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| not_found("booking", booking_id, "set_payment_intent"))?;
        booking.payment_intent_id = Some(payment_intent_id.to_string());
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn update_booking_notes(
        &self,
        booking_id: BookingId,
        notes: Option<String>,
    ) -> RepositoryResult<Booking> {
        self.check_health()?;
        let mut data = self.data.write();
        let booking = data
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| not_found("booking", booking_id, "update_booking_notes"))?;
        booking.notes = notes;
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }
}

// ==================== Content ====================

#[async_trait]
impl ContentRepository for LocalRepository {
    async fn list_pages(&self) -> RepositoryResult<Vec<StaticPage>> {
        self.check_health()?;
        Ok(self.data.read().pages.values().cloned().collect())
    }

    async fn get_page(&self, page_id: PageId) -> RepositoryResult<StaticPage> {
        self.check_health()?;
        self.data
            .read()
            .pages
            .get(&page_id)
            .cloned()
            .ok_or_else(|| not_found("page", page_id, "get_page"))
    }

    async fn get_page_by_slug(&self, slug: &str) -> RepositoryResult<StaticPage> {
        self.check_health()?;
        self.data
            .read()
            .pages
            .values()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| not_found("page", slug, "get_page_by_slug"))
    }

    async fn create_page(&self, input: &PageInput) -> RepositoryResult<StaticPage> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.pages.values().any(|p| p.slug == input.slug) {
            return Err(RepositoryError::conflict(format!(
                "Page slug '{}' already exists",
                input.slug
            )));
        }
        let id = PageId(data.next_id());
        let page = StaticPage {
            id,
            slug: input.slug.clone(),
            published: input.published,
            translations: input.translations.clone(),
            updated_at: Utc::now(),
        };
        data.pages.insert(id, page.clone());
        Ok(page)
    }

    async fn update_page(&self, page_id: PageId, input: &PageInput) -> RepositoryResult<StaticPage> {
        self.check_health()?;
        let mut data = self.data.write();
        if data
            .pages
            .values()
            .any(|p| p.slug == input.slug && p.id != page_id)
        {
            return Err(RepositoryError::conflict(format!(
                "Page slug '{}' already exists",
                input.slug
            )));
        }
        let page = data
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| not_found("page", page_id, "update_page"))?;
        page.slug = input.slug.clone();
        page.published = input.published;
        page.translations = input.translations.clone();
        page.updated_at = Utc::now();
        Ok(page.clone())
    }

    async fn delete_page(&self, page_id: PageId) -> RepositoryResult<()> {
        self.check_health()?;
        self.data
            .write()
            .pages
            .remove(&page_id)
            .map(|_| ())
            .ok_or_else(|| not_found("page", page_id, "delete_page"))
    }

    async fn upsert_page_translation(
        &self,
        page_id: PageId,
        language: Language,
        content: &PageContent,
    ) -> RepositoryResult<StaticPage> {
        self.check_health()?;
        let mut data = self.data.write();
        let page = data
            .pages
            .get_mut(&page_id)
            .ok_or_else(|| not_found("page", page_id, "upsert_page_translation"))?;
        page.translations.insert(language, content.clone());
        page.updated_at = Utc::now();
        Ok(page.clone())
    }

    async fn list_categories(&self) -> RepositoryResult<Vec<Category>> {
        self.check_health()?;
        let mut categories: Vec<Category> =
            self.data.read().categories.values().cloned().collect();
        categories.sort_by_key(|c| (c.position, c.id));
        Ok(categories)
    }

    async fn create_category(&self, input: &CategoryInput) -> RepositoryResult<Category> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.categories.values().any(|c| c.slug == input.slug) {
            return Err(RepositoryError::conflict(format!(
                "Category slug '{}' already exists",
                input.slug
            )));
        }
        let id = CategoryId(data.next_id());
        let category = Category {
            id,
            slug: input.slug.clone(),
            name: input.name.clone(),
            position: input.position,
        };
        data.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        category_id: CategoryId,
        input: &CategoryInput,
    ) -> RepositoryResult<Category> {
        self.check_health()?;
        let mut data = self.data.write();
        if data
            .categories
            .values()
            .any(|c| c.slug == input.slug && c.id != category_id)
        {
            return Err(RepositoryError::conflict(format!(
                "Category slug '{}' already exists",
                input.slug
            )));
        }
        let category = data
            .categories
            .get_mut(&category_id)
            .ok_or_else(|| not_found("category", category_id, "update_category"))?;
        category.slug = input.slug.clone();
        category.name = input.name.clone();
        category.position = input.position;
        Ok(category.clone())
    }

    async fn delete_category(&self, category_id: CategoryId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.categories.remove(&category_id).is_none() {
            return Err(not_found("category", category_id, "delete_category"));
        }
        for tour in data.tours.values_mut() {
            if tour.category_id == Some(category_id) {
                tour.category_id = None;
            }
        }
        Ok(())
    }

    async fn list_labels(&self) -> RepositoryResult<Vec<SpecialLabel>> {
        self.check_health()?;
        Ok(self.data.read().labels.values().cloned().collect())
    }

    async fn create_label(&self, input: &LabelInput) -> RepositoryResult<SpecialLabel> {
        self.check_health()?;
        let mut data = self.data.write();
        let id = LabelId(data.next_id());
        let label = SpecialLabel {
            id,
            name: input.name.clone(),
            color: input.color.clone(),
        };
        data.labels.insert(id, label.clone());
        Ok(label)
    }

    async fn update_label(
        &self,
        label_id: LabelId,
        input: &LabelInput,
    ) -> RepositoryResult<SpecialLabel> {
        self.check_health()?;
        let mut data = self.data.write();
        let label = data
            .labels
            .get_mut(&label_id)
            .ok_or_else(|| not_found("label", label_id, "update_label"))?;
        label.name = input.name.clone();
        label.color = input.color.clone();
        Ok(label.clone())
    }

    async fn delete_label(&self, label_id: LabelId) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.labels.remove(&label_id).is_none() {
            return Err(not_found("label", label_id, "delete_label"));
        }
        for tour in data.tours.values_mut() {
            tour.label_ids.retain(|l| *l != label_id);
        }
        Ok(())
    }
}

// ==================== Analytics ====================

#[async_trait]
impl AnalyticsRepository for LocalRepository {
    async fn record_visit(&self, visit: &NewPageVisit) -> RepositoryResult<PageVisit> {
        self.check_health()?;
        let mut data = self.data.write();
        let stored = PageVisit {
            id: VisitId(data.next_id()),
            path: visit.path.clone(),
            tour_id: visit.tour_id,
            session_id: visit.session_id.clone(),
            language: visit.language,
            referrer: visit.referrer.clone(),
            visited_at: visit.visited_at,
        };
        data.visits.push(stored.clone());
        Ok(stored)
    }

    async fn list_visits(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> RepositoryResult<Vec<PageVisit>> {
        self.check_health()?;
        let mut visits: Vec<PageVisit> = self
            .data
            .read()
            .visits
            .iter()
            .filter(|v| v.visited_at >= from && v.visited_at < to)
            .cloned()
            .collect();
        visits.sort_by_key(|v| (v.visited_at, v.id));
        Ok(visits)
    }
}

// ==================== Users ====================

#[async_trait]
impl UserRepository for LocalRepository {
    async fn get_user(&self, user_id: &str) -> RepositoryResult<Option<UserProfile>> {
        self.check_health()?;
        Ok(self.data.read().users.get(user_id).cloned())
    }

    async fn upsert_user(&self, profile: &UserProfile) -> RepositoryResult<UserProfile> {
        self.check_health()?;
        self.data
            .write()
            .users
            .insert(profile.user_id.clone(), profile.clone());
        Ok(profile.clone())
    }
}

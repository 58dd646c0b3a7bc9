use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use diesel::prelude::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::schema::{
    availability_slots, booking_items, bookings, categories, packages, page_visits,
    special_labels, static_pages, tour_blocks, tour_pricing, tours, upsells, user_profiles,
};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::*;

pub(super) fn to_json<T: Serialize>(value: &T) -> RepositoryResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| RepositoryError::internal(format!("Serialization error: {}", e)))
}

pub(super) fn from_json<T: DeserializeOwned>(value: Value, column: &str) -> RepositoryResult<T> {
    serde_json::from_value(value)
        .map_err(|e| RepositoryError::internal(format!("Invalid {} JSON: {}", column, e)))
}

fn parse_column<T: std::str::FromStr<Err = String>>(value: &str) -> RepositoryResult<T> {
    value.parse::<T>().map_err(RepositoryError::internal)
}

fn to_i32(value: u32, column: &str) -> RepositoryResult<i32> {
    i32::try_from(value)
        .map_err(|_| RepositoryError::validation(format!("{} is out of range", column)))
}

fn to_u32(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

// ==================== Tours ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tours)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TourRow {
    pub tour_id: i64,
    pub slug: String,
    pub translations: Value,
    pub category_id: Option<i64>,
    pub label_ids: Vec<i64>,
    pub duration_minutes: i32,
    pub meeting_point: Option<String>,
    pub cover_image_url: Option<String>,
    pub gallery: Value,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TourRow {
    pub fn into_tour(self) -> RepositoryResult<Tour> {
        Ok(Tour {
            id: TourId(self.tour_id),
            slug: self.slug,
            translations: from_json(self.translations, "tours.translations")?,
            category_id: self.category_id.map(CategoryId),
            label_ids: self.label_ids.into_iter().map(LabelId).collect(),
            duration_minutes: self.duration_minutes,
            meeting_point: self.meeting_point,
            cover_image_url: self.cover_image_url,
            gallery: from_json(self.gallery, "tours.gallery")?,
            published: self.published,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tours)]
#[diesel(treat_none_as_null = true)]
pub struct TourChanges {
    pub slug: String,
    pub translations: Value,
    pub category_id: Option<i64>,
    pub label_ids: Vec<i64>,
    pub duration_minutes: i32,
    pub meeting_point: Option<String>,
    pub cover_image_url: Option<String>,
    pub gallery: Value,
    pub published: bool,
    pub updated_at: DateTime<Utc>,
}

impl TourChanges {
    pub fn from_input(input: &TourInput) -> RepositoryResult<Self> {
        Ok(Self {
            slug: input.slug.clone(),
            translations: to_json(&input.translations)?,
            category_id: input.category_id.map(|c| c.0),
            label_ids: input.label_ids.iter().map(|l| l.0).collect(),
            duration_minutes: input.duration_minutes,
            meeting_point: input.meeting_point.clone(),
            cover_image_url: input.cover_image_url.clone(),
            gallery: to_json(&input.gallery)?,
            published: input.published,
            updated_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tour_blocks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BlockRow {
    pub block_id: i64,
    pub tour_id: i64,
    pub kind: String,
    pub position: i32,
    pub translations: Value,
}

impl BlockRow {
    pub fn into_block(self) -> RepositoryResult<TourBlock> {
        Ok(TourBlock {
            id: BlockId(self.block_id),
            tour_id: TourId(self.tour_id),
            kind: parse_column(&self.kind)?,
            position: self.position,
            translations: from_json(self.translations, "tour_blocks.translations")?,
        })
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = tour_blocks)]
pub struct BlockChanges {
    pub tour_id: i64,
    pub kind: String,
    pub position: i32,
    pub translations: Value,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = tour_pricing)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PricingRow {
    pub tour_id: i64,
    pub config: Value,
    pub updated_at: DateTime<Utc>,
}

impl PricingRow {
    pub fn into_pricing(self) -> RepositoryResult<TourPricing> {
        Ok(TourPricing {
            tour_id: TourId(self.tour_id),
            config: from_json(self.config, "tour_pricing.config")?,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = upsells)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UpsellRow {
    pub upsell_id: i64,
    pub tour_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub per_person: bool,
    pub active: bool,
}

impl From<UpsellRow> for Upsell {
    fn from(row: UpsellRow) -> Self {
        Upsell {
            id: UpsellId(row.upsell_id),
            tour_id: TourId(row.tour_id),
            name: row.name,
            description: row.description,
            price: row.price,
            per_person: row.per_person,
            active: row.active,
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = upsells)]
pub struct UpsellChanges {
    pub tour_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub per_person: bool,
    pub active: bool,
}

impl UpsellChanges {
    pub fn new(tour_id: TourId, input: &UpsellInput) -> Self {
        Self {
            tour_id: tour_id.0,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            per_person: input.per_person,
            active: input.active,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PackageRow {
    pub package_id: i64,
    pub tour_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub max_participants: Option<i32>,
    pub active: bool,
}

impl From<PackageRow> for Package {
    fn from(row: PackageRow) -> Self {
        Package {
            id: PackageId(row.package_id),
            tour_id: TourId(row.tour_id),
            name: row.name,
            description: row.description,
            price: row.price,
            max_participants: row.max_participants.map(to_u32),
            active: row.active,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = packages)]
pub struct NewPackageRow {
    pub tour_id: i64,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub max_participants: Option<i32>,
    pub active: bool,
}

impl NewPackageRow {
    pub fn new(tour_id: TourId, input: &PackageInput) -> RepositoryResult<Self> {
        Ok(Self {
            tour_id: tour_id.0,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            max_participants: input
                .max_participants
                .map(|m| to_i32(m, "max_participants"))
                .transpose()?,
            active: input.active,
        })
    }
}

// ==================== Availability ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = availability_slots)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SlotRow {
    pub slot_id: i64,
    pub tour_id: i64,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub capacity: i32,
    pub booked: i32,
}

impl From<SlotRow> for AvailabilitySlot {
    fn from(row: SlotRow) -> Self {
        AvailabilitySlot {
            id: SlotId(row.slot_id),
            tour_id: TourId(row.tour_id),
            date: row.slot_date,
            start_time: row.start_time,
            capacity: to_u32(row.capacity),
            booked: to_u32(row.booked),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = availability_slots)]
pub struct NewSlotRow {
    pub tour_id: i64,
    pub slot_date: NaiveDate,
    pub start_time: NaiveTime,
    pub capacity: i32,
    pub booked: i32,
}

impl NewSlotRow {
    pub fn new(tour_id: TourId, input: &SlotInput) -> RepositoryResult<Self> {
        Ok(Self {
            tour_id: tour_id.0,
            slot_date: input.date,
            start_time: input.start_time,
            capacity: to_i32(input.capacity, "capacity")?,
            booked: to_i32(input.booked, "booked")?,
        })
    }
}

// ==================== Bookings ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingRow {
    pub booking_id: i64,
    pub voucher_token: String,
    pub tour_id: i64,
    pub slot_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub language: String,
    pub adults: i32,
    pub children: i32,
    pub package_id: Option<i64>,
    pub status: String,
    pub total_amount: i64,
    pub currency: String,
    pub payment_intent_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingRow {
    pub fn into_booking(self, items: Vec<BookingItemRow>) -> RepositoryResult<Booking> {
        let items = items
            .into_iter()
            .map(BookingItemRow::into_item)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok(Booking {
            id: BookingId(self.booking_id),
            voucher_token: self.voucher_token,
            tour_id: TourId(self.tour_id),
            slot_id: SlotId(self.slot_id),
            customer_name: self.customer_name,
            customer_email: self.customer_email,
            customer_phone: self.customer_phone,
            language: parse_column(&self.language)?,
            adults: to_u32(self.adults),
            children: to_u32(self.children),
            package_id: self.package_id.map(PackageId),
            status: parse_column(&self.status)?,
            total_amount: self.total_amount,
            currency: self.currency,
            payment_intent_id: self.payment_intent_id,
            notes: self.notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBookingRow {
    pub voucher_token: String,
    pub tour_id: i64,
    pub slot_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub language: String,
    pub adults: i32,
    pub children: i32,
    pub package_id: Option<i64>,
    pub status: String,
    pub total_amount: i64,
    pub currency: String,
    pub notes: Option<String>,
}

impl NewBookingRow {
    pub fn new(booking: &NewBooking) -> RepositoryResult<Self> {
        Ok(Self {
            voucher_token: booking.voucher_token.clone(),
            tour_id: booking.tour_id.0,
            slot_id: booking.slot_id.0,
            customer_name: booking.customer_name.clone(),
            customer_email: booking.customer_email.clone(),
            customer_phone: booking.customer_phone.clone(),
            language: booking.language.code().to_string(),
            adults: to_i32(booking.adults, "adults")?,
            children: to_i32(booking.children, "children")?,
            package_id: booking.package_id.map(|p| p.0),
            status: booking.status.as_str().to_string(),
            total_amount: booking.total_amount,
            currency: booking.currency.clone(),
            notes: booking.notes.clone(),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = booking_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingItemRow {
    pub item_id: i64,
    pub booking_id: i64,
    pub kind: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
}

impl BookingItemRow {
    fn into_item(self) -> RepositoryResult<BookingItem> {
        Ok(BookingItem {
            kind: from_json(Value::String(self.kind), "booking_items.kind")?,
            description: self.description,
            quantity: to_u32(self.quantity),
            unit_price: self.unit_price,
            total: self.total,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = booking_items)]
pub struct NewBookingItemRow {
    pub booking_id: i64,
    pub kind: String,
    pub description: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub total: i64,
}

impl NewBookingItemRow {
    pub fn new(booking_id: i64, item: &BookingItem) -> RepositoryResult<Self> {
        let kind = match to_json(&item.kind)? {
            Value::String(kind) => kind,
            other => other.to_string(),
        };
        Ok(Self {
            booking_id,
            kind,
            description: item.description.clone(),
            quantity: to_i32(item.quantity, "quantity")?,
            unit_price: item.unit_price,
            total: item.total,
        })
    }
}

// ==================== Content ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = static_pages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PageRow {
    pub page_id: i64,
    pub slug: String,
    pub published: bool,
    pub translations: Value,
    pub updated_at: DateTime<Utc>,
}

impl PageRow {
    pub fn into_page(self) -> RepositoryResult<StaticPage> {
        Ok(StaticPage {
            id: PageId(self.page_id),
            slug: self.slug,
            published: self.published,
            translations: from_json(self.translations, "static_pages.translations")?,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = static_pages)]
pub struct PageChanges {
    pub slug: String,
    pub published: bool,
    pub translations: Value,
    pub updated_at: DateTime<Utc>,
}

impl PageChanges {
    pub fn from_input(input: &PageInput) -> RepositoryResult<Self> {
        Ok(Self {
            slug: input.slug.clone(),
            published: input.published,
            translations: to_json(&input.translations)?,
            updated_at: Utc::now(),
        })
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryRow {
    pub category_id: i64,
    pub slug: String,
    pub name: String,
    pub position: i32,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId(row.category_id),
            slug: row.slug,
            name: row.name,
            position: row.position,
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = categories)]
pub struct CategoryChanges<'a> {
    pub slug: &'a str,
    pub name: &'a str,
    pub position: i32,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = special_labels)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct LabelRow {
    pub label_id: i64,
    pub name: String,
    pub color: String,
}

impl From<LabelRow> for SpecialLabel {
    fn from(row: LabelRow) -> Self {
        SpecialLabel {
            id: LabelId(row.label_id),
            name: row.name,
            color: row.color,
        }
    }
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = special_labels)]
pub struct LabelChanges<'a> {
    pub name: &'a str,
    pub color: &'a str,
}

// ==================== Analytics & users ====================

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = page_visits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct VisitRow {
    pub visit_id: i64,
    pub path: String,
    pub tour_id: Option<i64>,
    pub session_id: String,
    pub language: String,
    pub referrer: Option<String>,
    pub visited_at: DateTime<Utc>,
}

impl VisitRow {
    pub fn into_visit(self) -> RepositoryResult<PageVisit> {
        Ok(PageVisit {
            id: VisitId(self.visit_id),
            path: self.path,
            tour_id: self.tour_id.map(TourId),
            session_id: self.session_id,
            language: parse_column(&self.language)?,
            referrer: self.referrer,
            visited_at: self.visited_at,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = page_visits)]
pub struct NewVisitRow<'a> {
    pub path: &'a str,
    pub tour_id: Option<i64>,
    pub session_id: &'a str,
    pub language: &'a str,
    pub referrer: Option<&'a str>,
    pub visited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = user_profiles)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl UserRow {
    pub fn into_profile(self) -> RepositoryResult<UserProfile> {
        Ok(UserProfile {
            user_id: self.user_id,
            email: self.email,
            role: parse_column(&self.role)?,
        })
    }
}

impl From<&UserProfile> for UserRow {
    fn from(profile: &UserProfile) -> Self {
        UserRow {
            user_id: profile.user_id.clone(),
            email: profile.email.clone(),
            role: profile.role.as_str().to_string(),
        }
    }
}

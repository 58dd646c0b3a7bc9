#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use tour_booking::db::repository::{AvailabilityRepository, TourRepository};
use tour_booking::db::LocalRepository;
use tour_booking::models::{
    AvailabilitySlot, Language, PackageInput, Package, PricingConfig, SlotInput, Tour, TourInput,
    TourText, Translations, Upsell, UpsellInput,
};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// This is panic-safe (restores variables on unwind) and also serializes access to
/// process-global env vars to avoid flaky tests when Rust runs tests in parallel.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().expect("ENV_LOCK poisoned");
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}

/// A published tour with adult/child pricing, one upsell, one package and a
/// ten-seat departure a week from today.
pub struct TourFixture {
    pub tour: Tour,
    pub slot: AvailabilitySlot,
    pub upsell: Upsell,
    pub package: Package,
}

pub fn tour_input(slug: &str, published: bool) -> TourInput {
    let mut translations = Translations::new();
    translations.insert(
        Language::En,
        TourText {
            title: "Old Town Walk".to_string(),
            summary: "Two hours through the historic centre".to_string(),
        },
    );
    translations.insert(
        Language::Es,
        TourText {
            title: "Paseo por el casco antiguo".to_string(),
            summary: "Dos horas por el centro".to_string(),
        },
    );
    TourInput {
        slug: slug.to_string(),
        translations,
        category_id: None,
        label_ids: Vec::new(),
        duration_minutes: 120,
        meeting_point: Some("Plaza Mayor".to_string()),
        cover_image_url: None,
        gallery: Vec::new(),
        published,
    }
}

pub fn next_week() -> NaiveDate {
    Utc::now()
        .date_naive()
        .checked_add_days(Days::new(7))
        .expect("date in range")
}

pub async fn seed_tour(repo: &LocalRepository) -> TourFixture {
    let tour = repo
        .create_tour(&tour_input("old-town-walk", true))
        .await
        .expect("create tour");
    repo.set_pricing(
        tour.id,
        &PricingConfig::AdultChild {
            adult_price: 3000,
            child_price: 1500,
        },
    )
    .await
    .expect("set pricing");
    let upsell = repo
        .create_upsell(
            tour.id,
            &UpsellInput {
                name: "Tapas tasting".to_string(),
                description: String::new(),
                price: 1200,
                per_person: true,
                active: true,
            },
        )
        .await
        .expect("create upsell");
    let package = repo
        .create_package(
            tour.id,
            &PackageInput {
                name: "Family pack".to_string(),
                description: String::new(),
                price: 8000,
                max_participants: Some(4),
                active: true,
            },
        )
        .await
        .expect("create package");
    let slot = repo
        .create_slot(
            tour.id,
            &SlotInput {
                date: next_week(),
                start_time: NaiveTime::from_hms_opt(10, 0, 0).expect("valid time"),
                capacity: 10,
                booked: 0,
            },
        )
        .await
        .expect("create slot");
    TourFixture {
        tour,
        slot,
        upsell,
        package,
    }
}

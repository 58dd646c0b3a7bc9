//! Page-visit tracking and the back-office dashboard.

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::error::{ServiceError, ServiceResult};
use crate::db::repository::{AnalyticsRepository, BookingRepository, TourRepository};
use crate::models::{
    BookingFilter, BookingStatus, NewPageVisit, PageVisit, TourFilter, TourId,
};

/// Longest dashboard range, in days.
pub const MAX_RANGE_DAYS: i64 = 366;

/// How many entries the top-N lists keep.
const TOP_N: usize = 5;

pub async fn record_visit<R>(repo: &R, visit: &NewPageVisit) -> ServiceResult<PageVisit>
where
    R: AnalyticsRepository + ?Sized,
{
    if !visit.path.starts_with('/') {
        return Err(ServiceError::validation("Path must start with '/'"));
    }
    if visit.path.len() > 2048 {
        return Err(ServiceError::validation("Path is too long"));
    }
    let session = visit.session_id.trim();
    if session.is_empty() || session.len() > 128 {
        return Err(ServiceError::validation("Invalid session id"));
    }
    Ok(repo.record_visit(visit).await?)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub visits: u64,
    pub bookings: u64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourRevenue {
    pub tour_id: TourId,
    pub slug: Option<String>,
    pub bookings: u64,
    pub revenue: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVisits {
    pub path: String,
    pub visits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_visits: u64,
    pub unique_sessions: u64,
    pub bookings: u64,
    pub confirmed_bookings: u64,
    /// Sum of confirmed booking totals, minor units.
    pub revenue: i64,
    /// Confirmed bookings per unique session.
    pub conversion_rate: f64,
    pub daily: Vec<DailyStats>,
    pub top_tours: Vec<TourRevenue>,
    pub top_pages: Vec<PageVisits>,
}

/// Aggregate visits and bookings over `from..=to`.
pub async fn dashboard<R>(repo: &R, from: NaiveDate, to: NaiveDate) -> ServiceResult<DashboardSummary>
where
    R: TourRepository + BookingRepository + AnalyticsRepository + ?Sized,
{
    if to < from {
        return Err(ServiceError::validation(
            "'to' must not be before 'from'",
        ));
    }
    if (to - from).num_days() >= MAX_RANGE_DAYS {
        return Err(ServiceError::validation(format!(
            "Dashboard range is limited to {} days",
            MAX_RANGE_DAYS
        )));
    }

    let start = from.and_time(NaiveTime::MIN).and_utc();
    let end = to
        .checked_add_days(Days::new(1))
        .ok_or_else(|| ServiceError::validation("Date out of range"))?
        .and_time(NaiveTime::MIN)
        .and_utc();
    let visits = repo.list_visits(start, end).await?;
    let bookings = repo
        .list_bookings(&BookingFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        })
        .await?;

    let mut daily: BTreeMap<NaiveDate, DailyStats> = from
        .iter_days()
        .take_while(|d| *d <= to)
        .map(|date| {
            (
                date,
                DailyStats {
                    date,
                    visits: 0,
                    bookings: 0,
                    revenue: 0,
                },
            )
        })
        .collect();

    let mut sessions = HashSet::new();
    let mut pages: HashMap<&str, u64> = HashMap::new();
    for visit in &visits {
        sessions.insert(visit.session_id.as_str());
        *pages.entry(visit.path.as_str()).or_default() += 1;
        if let Some(day) = daily.get_mut(&visit.visited_at.date_naive()) {
            day.visits += 1;
        }
    }

    let mut confirmed_bookings = 0u64;
    let mut revenue = 0i64;
    let mut per_tour: HashMap<TourId, (u64, i64)> = HashMap::new();
    for booking in &bookings {
        let confirmed = booking.status == BookingStatus::Confirmed;
        let amount = if confirmed { booking.total_amount } else { 0 };
        if confirmed {
            confirmed_bookings += 1;
            revenue += amount;
            let entry = per_tour.entry(booking.tour_id).or_default();
            entry.0 += 1;
            entry.1 += amount;
        }
        if let Some(day) = daily.get_mut(&booking.created_at.date_naive()) {
            day.bookings += 1;
            day.revenue += amount;
        }
    }

    let slugs: HashMap<TourId, String> = if per_tour.is_empty() {
        HashMap::new()
    } else {
        repo.list_tours(TourFilter::default())
            .await?
            .into_iter()
            .map(|t| (t.id, t.slug))
            .collect()
    };
    let mut top_tours: Vec<TourRevenue> = per_tour
        .into_iter()
        .map(|(tour_id, (bookings, revenue))| TourRevenue {
            slug: slugs.get(&tour_id).cloned(),
            tour_id,
            bookings,
            revenue,
        })
        .collect();
    top_tours.sort_by(|a, b| b.revenue.cmp(&a.revenue).then(a.tour_id.cmp(&b.tour_id)));
    top_tours.truncate(TOP_N);

    let mut top_pages: Vec<PageVisits> = pages
        .into_iter()
        .map(|(path, visits)| PageVisits {
            path: path.to_string(),
            visits,
        })
        .collect();
    top_pages.sort_by(|a, b| b.visits.cmp(&a.visits).then_with(|| a.path.cmp(&b.path)));
    top_pages.truncate(TOP_N);

    let unique_sessions = sessions.len() as u64;
    let conversion_rate = if unique_sessions == 0 {
        0.0
    } else {
        confirmed_bookings as f64 / unique_sessions as f64
    };

    Ok(DashboardSummary {
        from,
        to,
        total_visits: visits.len() as u64,
        unique_sessions,
        bookings: bookings.len() as u64,
        confirmed_bookings,
        revenue,
        conversion_rate,
        daily: daily.into_values().collect(),
        top_tours,
        top_pages,
    })
}

/// Dashboard for the last `days` days up to today.
pub async fn recent_dashboard<R>(repo: &R, days: u32) -> ServiceResult<DashboardSummary>
where
    R: TourRepository + BookingRepository + AnalyticsRepository + ?Sized,
{
    let to = Utc::now().date_naive();
    let from = to
        .checked_sub_days(Days::new(u64::from(days.max(1)) - 1))
        .ok_or_else(|| ServiceError::validation("Date out of range"))?;
    dashboard(repo, from, to).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::LocalRepository;
    use crate::models::Language;
    use chrono::{DateTime, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 3, day, hour, 0, 0).unwrap()
    }

    fn visit(path: &str, session: &str, when: DateTime<Utc>) -> NewPageVisit {
        NewPageVisit {
            path: path.to_string(),
            tour_id: None,
            session_id: session.to_string(),
            language: Language::En,
            referrer: None,
            visited_at: when,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 3, day).unwrap()
    }

    #[tokio::test]
    async fn test_record_visit_validates_path() {
        let repo = LocalRepository::new();
        assert!(record_visit(&repo, &visit("tours", "s1", at(1, 9))).await.is_err());
        assert!(record_visit(&repo, &visit("/tours", " ", at(1, 9))).await.is_err());
        assert!(record_visit(&repo, &visit("/tours", "s1", at(1, 9))).await.is_ok());
    }

    #[tokio::test]
    async fn test_dashboard_counts_visits_per_day() {
        let repo = LocalRepository::new();
        for (path, session, when) in [
            ("/", "a", at(1, 9)),
            ("/tours", "a", at(1, 10)),
            ("/tours", "b", at(2, 23)),
            ("/tours/tapas", "c", at(3, 0)),
            ("/", "d", at(5, 12)),
        ] {
            record_visit(&repo, &visit(path, session, when)).await.unwrap();
        }

        let summary = dashboard(&repo, date(1), date(3)).await.unwrap();
        assert_eq!(summary.total_visits, 4);
        assert_eq!(summary.unique_sessions, 3);
        assert_eq!(summary.daily.len(), 3);
        assert_eq!(summary.daily[0].visits, 2);
        assert_eq!(summary.daily[1].visits, 1);
        assert_eq!(summary.daily[2].visits, 1);
        assert_eq!(summary.top_pages[0].path, "/tours");
        assert_eq!(summary.top_pages[0].visits, 2);
        assert_eq!(summary.conversion_rate, 0.0);
    }

    #[tokio::test]
    async fn test_dashboard_rejects_bad_ranges() {
        let repo = LocalRepository::new();
        assert!(dashboard(&repo, date(3), date(1)).await.is_err());
        let far = date(1) + chrono::Duration::days(366);
        assert!(dashboard(&repo, date(1), far).await.is_err());
        let empty = dashboard(&repo, date(1), date(1)).await.unwrap();
        assert_eq!(empty.daily.len(), 1);
        assert!(empty.top_tours.is_empty());
    }
}

//! Seasonal calendar: category discount heuristics and sale-event lookup.

use chrono::{Datelike, Duration, NaiveDate, Utc};

use crate::shared::types::{PurchaseTiming, SaleEvent};

/// Sale events starting within this many days bias the forecast at half
/// weight.
const UPCOMING_WINDOW_DAYS: i64 = 14;

struct CategoryPattern {
    keywords: &'static [&'static str],
    best_month: u32,
    expected_discount: f64,
}

const PATTERNS: [CategoryPattern; 5] = [
    CategoryPattern {
        keywords: &["clothing", "coat", "пух"],
        best_month: 1,
        expected_discount: 30.0,
    },
    CategoryPattern {
        keywords: &["electronics", "phone", "ноут"],
        best_month: 11,
        expected_discount: 15.0,
    },
    CategoryPattern {
        keywords: &["home"],
        best_month: 8,
        expected_discount: 20.0,
    },
    CategoryPattern {
        keywords: &["books"],
        best_month: 4,
        expected_discount: 25.0,
    },
    CategoryPattern {
        keywords: &["sports"],
        best_month: 12,
        expected_discount: 18.0,
    },
];

/// Category-based monthly discount heuristics plus the queryable sale-event
/// discount lookup.
pub struct SeasonalCalendar;

impl SeasonalCalendar {
    pub fn new() -> Self {
        Self
    }

    /// Expected discount (%) for the category in the given month.
    /// Hardcoded rules: clothing bottoms out in summer, electronics near
    /// Black Friday, everything else gets a small baseline.
    pub fn category_discount(&self, category: &str, month: u32) -> f64 {
        let category = category.to_lowercase();
        if ["clothing", "coat", "пух"].iter().any(|k| category.contains(k)) {
            return match month {
                6..=8 => 20.0,
                9 | 10 => 10.0,
                _ => 5.0,
            };
        }
        if ["electronics", "phone", "ноут"].iter().any(|k| category.contains(k)) {
            return match month {
                10 | 11 => 15.0,
                12 => 8.0,
                _ => 5.0,
            };
        }
        5.0
    }

    /// Discount hint from the sale-event calendar: the largest hint among
    /// currently active events, else half the largest hint among events
    /// starting within the next 14 days, else 0.
    pub fn sale_event_discount(&self, events: &[SaleEvent], today: NaiveDate) -> f64 {
        let active = events
            .iter()
            .filter(|e| e.start_date <= today && e.end_date >= today)
            .map(|e| e.discount_hint)
            .fold(f64::NEG_INFINITY, f64::max);
        if active.is_finite() {
            return active;
        }

        let horizon = today + Duration::days(UPCOMING_WINDOW_DAYS);
        let upcoming = events
            .iter()
            .filter(|e| e.start_date > today && e.start_date <= horizon)
            .map(|e| e.discount_hint * 0.5)
            .fold(f64::NEG_INFINITY, f64::max);
        if upcoming.is_finite() {
            return upcoming;
        }
        0.0
    }

    /// Purchase-timing recommendation for a category.
    pub fn predict_best_purchase_time(&self, category: &str, current_month: u32) -> PurchaseTiming {
        let category = category.to_lowercase();
        let pattern = PATTERNS
            .iter()
            .find(|p| p.keywords.iter().any(|k| category.contains(k)));
        let (best_month, expected_discount) = match pattern {
            Some(p) => (p.best_month, p.expected_discount),
            None => (1, 10.0),
        };

        let months_to_wait = (best_month + 12 - current_month) % 12;
        PurchaseTiming {
            best_month,
            months_to_wait,
            expected_discount,
            recommendation: Self::recommendation(months_to_wait, expected_discount),
        }
    }

    pub fn predict_best_purchase_time_now(&self, category: &str) -> PurchaseTiming {
        self.predict_best_purchase_time(category, Utc::now().month())
    }

    fn recommendation(months_to_wait: u32, discount: f64) -> String {
        if months_to_wait == 0 {
            return "Now is the best time to buy - discounts are already in season.".to_string();
        }
        if months_to_wait <= 2 {
            return format!(
                "Wait {} month(s); the discount can reach {}%.",
                months_to_wait, discount
            );
        }
        format!(
            "The best buying window is roughly {} months away. Keep watching the trend.",
            months_to_wait
        )
    }
}

impl Default for SeasonalCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(start: NaiveDate, end: NaiveDate, hint: f64) -> SaleEvent {
        SaleEvent {
            name: "sale".to_string(),
            start_date: start,
            end_date: end,
            discount_hint: hint,
        }
    }

    #[test]
    fn test_active_event_full_weight() {
        let calendar = SeasonalCalendar::new();
        let today = date(2026, 11, 11);
        let events = vec![event(date(2026, 11, 10), date(2026, 11, 12), 20.0)];
        assert_eq!(calendar.sale_event_discount(&events, today), 20.0); // not 10
    }

    #[test]
    fn test_upcoming_event_half_weight() {
        let calendar = SeasonalCalendar::new();
        let today = date(2026, 11, 1);
        let events = vec![event(date(2026, 11, 10), date(2026, 11, 12), 20.0)];
        assert_eq!(calendar.sale_event_discount(&events, today), 10.0);
    }

    #[test]
    fn test_event_beyond_window_ignored() {
        let calendar = SeasonalCalendar::new();
        let today = date(2026, 10, 1);
        let events = vec![event(date(2026, 11, 10), date(2026, 11, 12), 20.0)];
        assert_eq!(calendar.sale_event_discount(&events, today), 0.0);
    }

    #[test]
    fn test_active_beats_upcoming() {
        let calendar = SeasonalCalendar::new();
        let today = date(2026, 11, 11);
        let events = vec![
            event(date(2026, 11, 10), date(2026, 11, 12), 15.0),
            event(date(2026, 11, 20), date(2026, 11, 22), 40.0),
        ];
        assert_eq!(calendar.sale_event_discount(&events, today), 15.0);
    }

    #[test]
    fn test_category_discount_clothing_summer() {
        let calendar = SeasonalCalendar::new();
        assert_eq!(calendar.category_discount("clothing", 7), 20.0);
        assert_eq!(calendar.category_discount("clothing", 10), 10.0);
        assert_eq!(calendar.category_discount("books", 7), 5.0);
    }

    #[test]
    fn test_purchase_timing_wraps_year() {
        let calendar = SeasonalCalendar::new();
        let timing = calendar.predict_best_purchase_time("electronics", 12);
        assert_eq!(timing.best_month, 11);
        assert_eq!(timing.months_to_wait, 11);
    }
}

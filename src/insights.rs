// 📊 Reporting & Analytics - aggregate snapshot over live data
// Recomputed from the store on every call; nothing is cached.

use crate::db::{parse_timestamp, Registry};
use crate::error::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusinessInsights {
    pub total_enrolled: i64,
    pub total_auth_attempts: i64,
    pub successful_auths: i64,
    pub failed_auths: i64,
    pub dedup_conflicts: i64,

    /// Mean age in completed years; None when no citizen has a birth date
    pub avg_age: Option<f64>,

    pub last_enrollment: Option<DateTime<Utc>>,
    pub first_enrollment: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryLevel {
    Warning,
    Info,
}

/// Threshold-triggered dashboard banner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub message: &'static str,
}

pub const FAILED_AUTH_ADVISORY: &str = "ALERT: A high number of failed authentication attempts has been detected. Investigate potential security issues.";
pub const DEDUP_ADVISORY: &str = "ALERT: The de-duplication process has flagged potential duplicate records. Manual review is required.";

impl BusinessInsights {
    /// Average age to two decimals, or "N/A"
    pub fn avg_age_display(&self) -> String {
        match self.avg_age {
            Some(age) => format!("{:.2}", age),
            None => "N/A".to_string(),
        }
    }

    /// Advisories raised by this snapshot. Failed attempts must exceed
    /// `failed_auth_threshold`; any conflict at all raises the review notice.
    pub fn advisories(&self, failed_auth_threshold: i64) -> Vec<Advisory> {
        let mut advisories = Vec::new();

        if self.failed_auths > failed_auth_threshold {
            advisories.push(Advisory {
                level: AdvisoryLevel::Warning,
                message: FAILED_AUTH_ADVISORY,
            });
        }

        if self.dedup_conflicts > 0 {
            advisories.push(Advisory {
                level: AdvisoryLevel::Info,
                message: DEDUP_ADVISORY,
            });
        }

        advisories
    }
}

impl Registry {
    pub fn get_business_insights(&self) -> Result<BusinessInsights> {
        self.get_business_insights_on(Utc::now().date_naive())
    }

    /// Same snapshot, with ages measured on `today`
    pub fn get_business_insights_on(&self, today: NaiveDate) -> Result<BusinessInsights> {
        self.with_conn(|conn| {
            let (total_enrolled, total_auth_attempts, successful_auths, dedup_conflicts, last, first) =
                conn.query_row(
                    "SELECT
                        (SELECT COUNT(*) FROM citizens),
                        (SELECT COUNT(*) FROM auth_log),
                        (SELECT COUNT(*) FROM auth_log WHERE status = 'success'),
                        (SELECT COUNT(*) FROM deduplication_conflicts),
                        (SELECT MAX(enrollment_date) FROM citizens),
                        (SELECT MIN(enrollment_date) FROM citizens)",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                            row.get::<_, Option<String>>(4)?,
                            row.get::<_, Option<String>>(5)?,
                        ))
                    },
                )?;

            // Completed years: year difference, minus one if the birthday
            // has not come round yet in the reference year
            let avg_age: Option<f64> = conn.query_row(
                "SELECT AVG(
                    (CAST(strftime('%Y', ?1) AS INTEGER) - CAST(strftime('%Y', dob) AS INTEGER))
                    - (strftime('%m-%d', ?1) < strftime('%m-%d', dob))
                 )
                 FROM citizens
                 WHERE dob IS NOT NULL",
                [today.format("%Y-%m-%d").to_string()],
                |row| row.get(0),
            )?;

            Ok(BusinessInsights {
                total_enrolled,
                total_auth_attempts,
                successful_auths,
                failed_auths: total_auth_attempts - successful_auths,
                dedup_conflicts,
                avg_age,
                last_enrollment: last.map(|s| parse_timestamp(4, &s)).transpose()?,
                first_enrollment: first.map(|s| parse_timestamp(5, &s)).transpose()?,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{new_citizen, test_registry};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_store_snapshot() {
        let registry = test_registry();
        let insights = registry.get_business_insights().unwrap();

        assert_eq!(insights.total_enrolled, 0);
        assert_eq!(insights.total_auth_attempts, 0);
        assert_eq!(insights.successful_auths, 0);
        assert_eq!(insights.failed_auths, 0);
        assert_eq!(insights.dedup_conflicts, 0);
        assert_eq!(insights.avg_age, None);
        assert_eq!(insights.avg_age_display(), "N/A");
        assert_eq!(insights.last_enrollment, None);
        assert_eq!(insights.first_enrollment, None);
        assert!(insights.advisories(10).is_empty());
    }

    #[test]
    fn test_average_age_in_completed_years() {
        let registry = test_registry();
        registry.create_citizen(&new_citizen("A1", "h1", "1990-06-15")).unwrap();
        registry.create_citizen(&new_citizen("A2", "h2", "2000-01-01")).unwrap();
        registry.create_citizen(&new_citizen("A3", "h3", "1980-06-14")).unwrap();

        // 33 (birthday tomorrow), 24, 44 (birthday today)
        let insights = registry.get_business_insights_on(ymd(2024, 6, 14)).unwrap();

        let expected = (33.0 + 24.0 + 44.0) / 3.0;
        assert!((insights.avg_age.unwrap() - expected).abs() < 1e-9);
        assert_eq!(insights.avg_age_display(), "33.67");
    }

    #[test]
    fn test_average_age_matches_chrono_today() {
        let registry = test_registry();
        let citizens = [
            registry.create_citizen(&new_citizen("A1", "h1", "1975-02-28")).unwrap(),
            registry.create_citizen(&new_citizen("A2", "h2", "2004-02-29")).unwrap(),
            registry.create_citizen(&new_citizen("A3", "h3", "1999-12-31")).unwrap(),
        ];

        let today = Utc::now().date_naive();
        let insights = registry.get_business_insights().unwrap();

        let expected: f64 = citizens
            .iter()
            .map(|c| c.age_on(today).unwrap() as f64)
            .sum::<f64>()
            / citizens.len() as f64;
        assert!((insights.avg_age.unwrap() - expected).abs() < 0.005);
    }

    #[test]
    fn test_counts_and_enrollment_bounds() {
        let registry = test_registry();
        let first = registry.create_citizen(&new_citizen("A1", "h1", "1990-01-01")).unwrap();
        let last = registry.create_citizen(&new_citizen("A2", "h2", "1990-01-01")).unwrap();

        registry.authenticate("A1", "h1").unwrap();
        registry.authenticate("A1", "bad").unwrap();
        registry.authenticate("A2", "bad").unwrap();
        registry.check_deduplication("h2").unwrap();

        let insights = registry.get_business_insights().unwrap();

        assert_eq!(insights.total_enrolled, 2);
        assert_eq!(insights.total_auth_attempts, 3);
        assert_eq!(insights.successful_auths, 1);
        assert_eq!(insights.failed_auths, 2);
        assert_eq!(insights.dedup_conflicts, 1);
        assert_eq!(insights.first_enrollment, Some(first.enrollment_date));
        assert_eq!(insights.last_enrollment, Some(last.enrollment_date));
    }

    #[test]
    fn test_advisories_follow_thresholds() {
        let mut insights = BusinessInsights {
            total_enrolled: 1,
            total_auth_attempts: 10,
            successful_auths: 0,
            failed_auths: 10,
            dedup_conflicts: 0,
            avg_age: Some(30.0),
            last_enrollment: None,
            first_enrollment: None,
        };

        // Threshold is exclusive
        assert!(insights.advisories(10).is_empty());

        insights.failed_auths = 11;
        insights.dedup_conflicts = 2;
        let advisories = insights.advisories(10);

        assert_eq!(advisories.len(), 2);
        assert_eq!(advisories[0].level, AdvisoryLevel::Warning);
        assert_eq!(advisories[1].level, AdvisoryLevel::Info);
    }
}

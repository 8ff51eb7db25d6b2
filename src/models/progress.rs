use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// A metric whose writes are rate limited per user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatedMetric {
    Bmi,
    Calories,
}

impl GatedMetric {
    /// Minimum elapsed time between two writes of this metric
    pub fn window(&self) -> Duration {
        match self {
            GatedMetric::Bmi => Duration::days(7),
            GatedMetric::Calories => Duration::hours(24),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GatedMetric::Bmi => "bmi",
            GatedMetric::Calories => "calories",
        }
    }
}

/// `last` absent, or at least one full window elapsed since it
pub fn can_update(metric: GatedMetric, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match last {
        None => true,
        Some(last) => now - last >= metric.window(),
    }
}

/// Earliest instant a new write is allowed, or `None` when allowed already
pub fn next_allowed_at(
    metric: GatedMetric,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match last {
        Some(last) if !can_update(metric, Some(last), now) => Some(last + metric.window()),
        _ => None,
    }
}

/// Whole days (BMI) or hours (calories) left in the cooldown, rounded up
pub fn remaining_units(metric: GatedMetric, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    let Some(last) = last else {
        return 0;
    };

    let elapsed_ms = (now - last).num_milliseconds() as f64;
    let (unit_ms, window_units) = match metric {
        GatedMetric::Bmi => (86_400_000.0, 7.0),
        GatedMetric::Calories => (3_600_000.0, 24.0),
    };

    (window_units - elapsed_ms / unit_ms).ceil().max(0.0) as i64
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Progress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bmi: Option<f64>,
    pub calories_intake: Option<f64>,
    pub calorie_deficit: Option<f64>,
    pub weight: Option<f64>,
    pub body_fat_percentage: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub last_bmi_update: Option<DateTime<Utc>>,
    pub last_calories_update: Option<DateTime<Utc>>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Progress {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn can_update_bmi(&self, now: DateTime<Utc>) -> bool {
        can_update(GatedMetric::Bmi, self.last_bmi_update, now)
    }

    pub fn can_update_calories(&self, now: DateTime<Utc>) -> bool {
        can_update(GatedMetric::Calories, self.last_calories_update, now)
    }

    pub fn days_until_next_bmi_update(&self, now: DateTime<Utc>) -> i64 {
        remaining_units(GatedMetric::Bmi, self.last_bmi_update, now)
    }

    pub fn hours_until_next_calories_update(&self, now: DateTime<Utc>) -> i64 {
        remaining_units(GatedMetric::Calories, self.last_calories_update, now)
    }

    pub fn apply(&mut self, update: ProgressUpdate, now: DateTime<Utc>) {
        macro_rules! set_if_some {
            ($($field:ident),*) => {
                $(if update.$field.is_some() { self.$field = update.$field; })*
            };
        }
        set_if_some!(
            bmi,
            calories_intake,
            calorie_deficit,
            weight,
            body_fat_percentage,
            muscle_mass,
            last_bmi_update,
            last_calories_update
        );
        if let Some(date) = update.date {
            self.date = date;
        }
        self.updated_at = now;
    }
}

/// Most recent gated writes across all of a user's entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricTimestamps {
    pub last_bmi_update: Option<DateTime<Utc>>,
    pub last_calories_update: Option<DateTime<Utc>>,
}

impl MetricTimestamps {
    pub fn last(&self, metric: GatedMetric) -> Option<DateTime<Utc>> {
        match metric {
            GatedMetric::Bmi => self.last_bmi_update,
            GatedMetric::Calories => self.last_calories_update,
        }
    }

    pub fn status(&self, metric: GatedMetric, now: DateTime<Utc>) -> MetricStatus {
        let last = self.last(metric);
        MetricStatus {
            can_update: can_update(metric, last, now),
            last_update: last,
            next_update_at: next_allowed_at(metric, last, now),
            remaining: remaining_units(metric, last, now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricStatus {
    pub can_update: bool,
    pub last_update: Option<DateTime<Utc>>,
    pub next_update_at: Option<DateTime<Utc>>,
    /// Days for BMI, hours for calories
    pub remaining: i64,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub bmi: MetricStatus,
    pub calories: MetricStatus,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ProgressRequest {
    #[validate(range(exclusive_min = 0.0, max = 300.0, message = "BMI must be greater than 0 and at most 300"))]
    pub bmi: Option<f64>,
    #[validate(range(min = 0.0, message = "Calories intake cannot be negative"))]
    pub calories_intake: Option<f64>,
    pub calorie_deficit: Option<f64>,
    #[validate(range(min = 20.0, max = 300.0, message = "Weight must be between 20 and 300"))]
    pub weight: Option<f64>,
    #[validate(range(min = 0.0, max = 100.0, message = "Body fat percentage must be between 0 and 100"))]
    pub body_fat_percentage: Option<f64>,
    #[validate(range(min = 0.0, message = "Muscle mass cannot be negative"))]
    pub muscle_mass: Option<f64>,
    pub date: Option<DateTime<Utc>>,
}

/// The calorie fields as they arrived in a request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CaloriePair {
    Absent,
    Complete { intake: f64, deficit: f64 },
    Partial,
}

impl ProgressRequest {
    pub fn calorie_pair(&self) -> CaloriePair {
        match (self.calories_intake, self.calorie_deficit) {
            (None, None) => CaloriePair::Absent,
            (Some(intake), Some(deficit)) => CaloriePair::Complete { intake, deficit },
            _ => CaloriePair::Partial,
        }
    }

    pub fn has_any_metric(&self) -> bool {
        self.bmi.is_some()
            || self.calories_intake.is_some()
            || self.calorie_deficit.is_some()
            || self.weight.is_some()
            || self.body_fat_percentage.is_some()
            || self.muscle_mass.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewProgress {
    pub user_id: Uuid,
    pub bmi: Option<f64>,
    pub calories_intake: Option<f64>,
    pub calorie_deficit: Option<f64>,
    pub weight: Option<f64>,
    pub body_fat_percentage: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub last_bmi_update: Option<DateTime<Utc>>,
    pub last_calories_update: Option<DateTime<Utc>>,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressUpdate {
    pub bmi: Option<f64>,
    pub calories_intake: Option<f64>,
    pub calorie_deficit: Option<f64>,
    pub weight: Option<f64>,
    pub body_fat_percentage: Option<f64>,
    pub muscle_mass: Option<f64>,
    pub last_bmi_update: Option<DateTime<Utc>>,
    pub last_calories_update: Option<DateTime<Utc>>,
    pub date: Option<DateTime<Utc>>,
}

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::auth::UserSession;
use crate::error::{AppError, Result};
use crate::models::{
    can_update, next_allowed_at, remaining_units, CaloriePair, GatedMetric, ListQuery, MetricTimestamps,
    NewProgress, PageRequest, Paginated, Progress, ProgressRequest, ProgressUpdate, UpdateStatusResponse,
};
use crate::repositories::ProgressRepository;

/// Body-metric history with per-user BMI and calorie cooldowns
#[derive(Clone)]
pub struct ProgressService {
    entries: Arc<dyn ProgressRepository>,
}

/// Timestamps to stamp on a write that passed the gates
struct GatedWrite {
    last_bmi_update: Option<DateTime<Utc>>,
    last_calories_update: Option<DateTime<Utc>>,
}

impl ProgressService {
    pub fn new(entries: Arc<dyn ProgressRepository>) -> Self {
        Self { entries }
    }

    pub async fn create(&self, session: &UserSession, request: ProgressRequest) -> Result<Progress> {
        request.validate()?;
        if !request.has_any_metric() {
            return Err(AppError::Validation(
                "Provide at least one metric: bmi, calories, weight, body fat or muscle mass".to_string(),
            ));
        }

        let now = Utc::now();
        let stamps = self.gate(session.user_id, &request, now).await?;

        let entry = self
            .entries
            .create(NewProgress {
                user_id: session.user_id,
                bmi: request.bmi,
                calories_intake: request.calories_intake,
                calorie_deficit: request.calorie_deficit,
                weight: request.weight,
                body_fat_percentage: request.body_fat_percentage,
                muscle_mass: request.muscle_mass,
                last_bmi_update: stamps.last_bmi_update,
                last_calories_update: stamps.last_calories_update,
                date: request.date.unwrap_or(now),
            })
            .await?;

        info!(entry_id = %entry.id, user_id = %session.user_id, "progress recorded");
        Ok(entry)
    }

    /// Edit an owned entry; BMI and the calorie pair are gated and re-stamped
    pub async fn update(&self, session: &UserSession, id: Uuid, request: ProgressRequest) -> Result<Progress> {
        request.validate()?;
        self.find_owned(session, id).await?;

        let now = Utc::now();
        let stamps = self.gate(session.user_id, &request, now).await?;

        self.entries
            .update(
                id,
                ProgressUpdate {
                    bmi: request.bmi,
                    calories_intake: request.calories_intake,
                    calorie_deficit: request.calorie_deficit,
                    weight: request.weight,
                    body_fat_percentage: request.body_fat_percentage,
                    muscle_mass: request.muscle_mass,
                    last_bmi_update: stamps.last_bmi_update,
                    last_calories_update: stamps.last_calories_update,
                    date: request.date,
                },
            )
            .await
            .map_err(AppError::from_repository("Progress entry"))
    }

    pub async fn update_status(&self, session: &UserSession) -> Result<UpdateStatusResponse> {
        let stamps = self.entries.latest_update_times(session.user_id).await?;
        let now = Utc::now();
        Ok(UpdateStatusResponse {
            bmi: stamps.status(GatedMetric::Bmi, now),
            calories: stamps.status(GatedMetric::Calories, now),
        })
    }

    pub async fn list_own(&self, session: &UserSession, query: &ListQuery) -> Result<Paginated<Progress>> {
        self.list_for_user(session.user_id, query).await
    }

    pub async fn list_for_user(&self, user_id: Uuid, query: &ListQuery) -> Result<Paginated<Progress>> {
        query.validate().map_err(|e| AppError::Validation(e.to_string()))?;
        let (entries, total) = self
            .entries
            .list_by_user(user_id, query.range(), PageRequest::from(query))
            .await?;
        Ok(Paginated::new(entries, total, query))
    }

    pub async fn get(&self, session: &UserSession, id: Uuid) -> Result<Progress> {
        self.find_owned(session, id).await
    }

    pub async fn delete(&self, session: &UserSession, id: Uuid) -> Result<()> {
        self.find_owned(session, id).await?;
        self.entries
            .delete(id)
            .await
            .map_err(AppError::from_repository("Progress entry"))
    }

    async fn find_owned(&self, session: &UserSession, id: Uuid) -> Result<Progress> {
        let entry = self
            .entries
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Progress entry"))?;
        if !entry.is_owned_by(session.user_id) {
            return Err(AppError::Forbidden("Not allowed to access this progress entry".to_string()));
        }
        Ok(entry)
    }

    /// Check both cooldowns against the user's latest writes
    async fn gate(&self, user_id: Uuid, request: &ProgressRequest, now: DateTime<Utc>) -> Result<GatedWrite> {
        let writes_calories = match request.calorie_pair() {
            CaloriePair::Partial => {
                return Err(AppError::Validation(
                    "calories_intake and calorie_deficit must be provided together".to_string(),
                ))
            }
            CaloriePair::Complete { .. } => true,
            CaloriePair::Absent => false,
        };
        let writes_bmi = request.bmi.is_some();

        if !writes_bmi && !writes_calories {
            return Ok(GatedWrite {
                last_bmi_update: None,
                last_calories_update: None,
            });
        }

        let latest = self.entries.latest_update_times(user_id).await?;
        if writes_bmi {
            check_cooldown(GatedMetric::Bmi, &latest, now)?;
        }
        if writes_calories {
            check_cooldown(GatedMetric::Calories, &latest, now)?;
        }

        Ok(GatedWrite {
            last_bmi_update: writes_bmi.then_some(now),
            last_calories_update: writes_calories.then_some(now),
        })
    }
}

fn check_cooldown(metric: GatedMetric, latest: &MetricTimestamps, now: DateTime<Utc>) -> Result<()> {
    let last = latest.last(metric);
    if can_update(metric, last, now) {
        return Ok(());
    }

    let next_update_at = next_allowed_at(metric, last, now).unwrap_or(now);
    debug!(metric = metric.as_str(), %next_update_at, "cooldown active");
    Err(AppError::Cooldown {
        metric,
        next_update_at,
        remaining: remaining_units(metric, last, now),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserRole;
    use crate::repositories::progress_repository::MockProgressRepository;
    use crate::test_utils::{session_for, InMemoryProgressRepository};
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn service() -> ProgressService {
        ProgressService::new(Arc::new(InMemoryProgressRepository::new()))
    }

    fn bmi(value: f64) -> ProgressRequest {
        ProgressRequest {
            bmi: Some(value),
            ..Default::default()
        }
    }

    fn calories(intake: f64, deficit: f64) -> ProgressRequest {
        ProgressRequest {
            calories_intake: Some(intake),
            calorie_deficit: Some(deficit),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_second_bmi_write_within_week_is_rejected() {
        let service = service();
        let member = session_for(UserRole::Member, true);

        let first = service.create(&member, bmi(24.1)).await.unwrap();
        assert!(first.last_bmi_update.is_some());
        assert_eq!(first.last_calories_update, None);

        let second = service.create(&member, bmi(24.0)).await;
        assert_matches!(
            second,
            Err(AppError::Cooldown { metric: GatedMetric::Bmi, remaining: 7, .. })
        );
    }

    #[tokio::test]
    async fn test_bmi_and_calories_are_gated_independently() {
        let service = service();
        let member = session_for(UserRole::Member, true);

        service.create(&member, bmi(24.1)).await.unwrap();
        let entry = service.create(&member, calories(2200.0, 300.0)).await.unwrap();
        assert!(entry.last_calories_update.is_some());

        assert_matches!(
            service.create(&member, calories(2100.0, 400.0)).await,
            Err(AppError::Cooldown { metric: GatedMetric::Calories, .. })
        );

        // Ungated metrics are always accepted
        let weight_only = ProgressRequest {
            weight: Some(81.5),
            ..Default::default()
        };
        assert!(service.create(&member, weight_only).await.is_ok());
    }

    #[tokio::test]
    async fn test_cooldowns_are_per_user() {
        let service = service();
        service.create(&session_for(UserRole::Member, true), bmi(24.1)).await.unwrap();

        let other = session_for(UserRole::Member, true);
        assert!(service.create(&other, bmi(30.2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_calorie_fields_must_come_together() {
        let service = service();
        let member = session_for(UserRole::Member, true);
        let partial = ProgressRequest {
            calories_intake: Some(2000.0),
            ..Default::default()
        };

        assert_matches!(service.create(&member, partial).await, Err(AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_empty_entry_is_rejected() {
        let service = service();
        let member = session_for(UserRole::Member, true);

        assert_matches!(
            service.create(&member, ProgressRequest::default()).await,
            Err(AppError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_bmi_allowed_once_window_has_passed() {
        let mut repo = MockProgressRepository::new();
        repo.expect_latest_update_times().returning(|_| {
            Ok(MetricTimestamps {
                last_bmi_update: Some(Utc::now() - Duration::days(7) - Duration::seconds(1)),
                last_calories_update: None,
            })
        });
        repo.expect_create().times(1).returning(|entry| {
            let now = Utc::now();
            Ok(Progress {
                id: Uuid::new_v4(),
                user_id: entry.user_id,
                bmi: entry.bmi,
                calories_intake: entry.calories_intake,
                calorie_deficit: entry.calorie_deficit,
                weight: entry.weight,
                body_fat_percentage: entry.body_fat_percentage,
                muscle_mass: entry.muscle_mass,
                last_bmi_update: entry.last_bmi_update,
                last_calories_update: entry.last_calories_update,
                date: entry.date,
                created_at: now,
                updated_at: now,
            })
        });

        let service = ProgressService::new(Arc::new(repo));
        let member = session_for(UserRole::Member, true);
        let entry = service.create(&member, bmi(23.4)).await.unwrap();

        assert_eq!(entry.bmi, Some(23.4));
        assert!(entry.last_bmi_update.is_some());
    }

    #[tokio::test]
    async fn test_patch_of_ungated_field_skips_cooldown() {
        let service = service();
        let member = session_for(UserRole::Member, true);
        let entry = service.create(&member, bmi(24.1)).await.unwrap();

        let weight = ProgressRequest {
            weight: Some(80.0),
            ..Default::default()
        };
        let updated = service.update(&member, entry.id, weight).await.unwrap();
        assert_eq!(updated.weight, Some(80.0));
        assert_eq!(updated.last_bmi_update, entry.last_bmi_update);

        assert_matches!(
            service.update(&member, entry.id, bmi(25.0)).await,
            Err(AppError::Cooldown { metric: GatedMetric::Bmi, .. })
        );
    }

    #[tokio::test]
    async fn test_entries_are_private_to_their_owner() {
        let service = service();
        let owner = session_for(UserRole::Member, true);
        let entry = service.create(&owner, bmi(24.1)).await.unwrap();

        let trainer = session_for(UserRole::Trainer, true);
        assert_matches!(service.get(&trainer, entry.id).await, Err(AppError::Forbidden(_)));
        assert_matches!(service.delete(&trainer, entry.id).await, Err(AppError::Forbidden(_)));

        let status = service.update_status(&owner).await.unwrap();
        assert!(!status.bmi.can_update);
        assert!(status.calories.can_update);
    }
}

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{UserRole, UserSession};
use crate::error::{AppError, Result};
use crate::models::{
    CreateWorkoutRequest, ListQuery, NewWorkout, PageRequest, Paginated, TrainerSummary,
    UpdateWorkoutRequest, Workout, WorkoutResponse, WorkoutUpdate,
};
use crate::repositories::{UserRepository, WorkoutRepository};

#[derive(Clone)]
pub struct WorkoutService {
    workouts: Arc<dyn WorkoutRepository>,
    users: Arc<dyn UserRepository>,
}

impl WorkoutService {
    pub fn new(workouts: Arc<dyn WorkoutRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { workouts, users }
    }

    pub async fn create(&self, session: &UserSession, request: CreateWorkoutRequest) -> Result<WorkoutResponse> {
        let request = request.normalized();
        request.validate()?;
        for exercise in &request.exercises {
            exercise.validate()?;
        }

        if let Some(trainer_id) = request.trainer_id {
            self.ensure_trainer(trainer_id).await?;
        }

        let workout = self
            .workouts
            .create(NewWorkout {
                user_id: session.user_id,
                trainer_id: request.trainer_id,
                date: request.date.unwrap_or_else(Utc::now),
                title: request.title,
                exercises: request.exercises,
                duration_minutes: request.duration_minutes,
                calories_burned: request.calories_burned,
                intensity: request.intensity.unwrap_or_default(),
                notes: request.notes,
                is_public: request.is_public.unwrap_or(false),
            })
            .await?;

        info!(workout_id = %workout.id, user_id = %session.user_id, "workout logged");
        Ok(workout.into())
    }

    /// The caller's own workouts, newest first
    pub async fn list_own(&self, session: &UserSession, query: &ListQuery) -> Result<Paginated<WorkoutResponse>> {
        self.list_for_user(session.user_id, query).await
    }

    pub async fn list_for_user(&self, user_id: Uuid, query: &ListQuery) -> Result<Paginated<WorkoutResponse>> {
        query.validate().map_err(|e| AppError::Validation(e.to_string()))?;
        let (workouts, total) = self
            .workouts
            .list_by_user(user_id, query.range(), PageRequest::from(query))
            .await?;
        Ok(Paginated::new(workouts, total, query).map(WorkoutResponse::from))
    }

    pub async fn list_trainer_public(
        &self,
        trainer_id: Uuid,
        query: &ListQuery,
    ) -> Result<Paginated<WorkoutResponse>> {
        query.validate().map_err(|e| AppError::Validation(e.to_string()))?;
        let (workouts, total) = self
            .workouts
            .list_public_by_trainer(trainer_id, PageRequest::from(query))
            .await?;
        Ok(Paginated::new(workouts, total, query).map(WorkoutResponse::from))
    }

    /// Trainers with an active membership, for assignment to workouts
    pub async fn available_trainers(&self) -> Result<Vec<TrainerSummary>> {
        let trainers = self.users.list_active_trainers(Utc::now()).await?;
        Ok(trainers.into_iter().map(TrainerSummary::from).collect())
    }

    /// Visible to the owner, the assigned trainer and admins
    pub async fn get(&self, session: &UserSession, id: Uuid) -> Result<WorkoutResponse> {
        let workout = self.find(id).await?;
        if !(workout.is_owned_by(session.user_id)
            || workout.is_assigned_to(session.user_id)
            || session.is_admin())
        {
            return Err(AppError::Forbidden("Not allowed to view this workout".to_string()));
        }
        Ok(workout.into())
    }

    pub async fn update(
        &self,
        session: &UserSession,
        id: Uuid,
        request: UpdateWorkoutRequest,
    ) -> Result<WorkoutResponse> {
        let request = request.normalized();
        request.validate()?;
        if let Some(exercises) = &request.exercises {
            for exercise in exercises {
                exercise.validate()?;
            }
        }

        let workout = self.find(id).await?;
        ensure_can_modify(&workout, session)?;

        let updated = self
            .workouts
            .update(id, WorkoutUpdate::from(request))
            .await
            .map_err(AppError::from_repository("Workout"))?;
        Ok(updated.into())
    }

    pub async fn delete(&self, session: &UserSession, id: Uuid) -> Result<()> {
        let workout = self.find(id).await?;
        ensure_can_modify(&workout, session)?;

        self.workouts
            .delete(id)
            .await
            .map_err(AppError::from_repository("Workout"))?;

        info!(workout_id = %id, deleted_by = %session.user_id, "workout deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Workout> {
        self.workouts.find_by_id(id).await?.ok_or(AppError::NotFound("Workout"))
    }

    async fn ensure_trainer(&self, trainer_id: Uuid) -> Result<()> {
        match self.users.find_by_id(trainer_id).await? {
            Some(user) if user.role == UserRole::Trainer => Ok(()),
            _ => Err(AppError::Validation("trainer_id does not reference a trainer".to_string())),
        }
    }
}

/// Owner or assigned trainer
fn ensure_can_modify(workout: &Workout, session: &UserSession) -> Result<()> {
    if workout.is_owned_by(session.user_id) || workout.is_assigned_to(session.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Only the owner or assigned trainer can modify this workout".to_string()))
    }
}

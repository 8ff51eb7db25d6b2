use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "workout_intensity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Moderate,
    High,
}

impl Default for Intensity {
    fn default() -> Self {
        Intensity::Moderate
    }
}

/// One entry of a workout, in the order it was performed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Exercise {
    #[validate(length(min = 1, message = "Exercise name is required"))]
    pub name: String,
    #[validate(range(min = 1, message = "Sets must be at least 1"))]
    pub sets: i32,
    #[validate(range(min = 1, message = "Reps must be at least 1"))]
    pub reps: i32,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Weight cannot be negative"))]
    pub weight: f64,
    #[validate(length(max = 500, message = "Exercise notes cannot exceed 500 characters"))]
    pub notes: Option<String>,
}

impl Exercise {
    pub fn volume(&self) -> f64 {
        f64::from(self.sets) * f64::from(self.reps) * self.weight
    }

    fn trimmed(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.notes = self.notes.map(|n| n.trim().to_string());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workout {
    pub id: Uuid,
    pub user_id: Uuid,
    pub trainer_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub title: String,
    pub exercises: Json<Vec<Exercise>>,
    pub duration_minutes: Option<i32>,
    pub calories_burned: Option<f64>,
    pub intensity: Intensity,
    pub notes: Option<String>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workout {
    /// Total lifted volume: sum of sets x reps x weight over all exercises
    pub fn calculate_performance(&self) -> f64 {
        self.exercises.iter().map(Exercise::volume).sum()
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    pub fn is_assigned_to(&self, trainer_id: Uuid) -> bool {
        self.trainer_id == Some(trainer_id)
    }

    pub fn apply(&mut self, update: WorkoutUpdate, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(exercises) = update.exercises {
            self.exercises = Json(exercises);
        }
        if update.duration_minutes.is_some() {
            self.duration_minutes = update.duration_minutes;
        }
        if update.calories_burned.is_some() {
            self.calories_burned = update.calories_burned;
        }
        if let Some(intensity) = update.intensity {
            self.intensity = intensity;
        }
        if update.notes.is_some() {
            self.notes = update.notes;
        }
        if let Some(is_public) = update.is_public {
            self.is_public = is_public;
        }
        self.updated_at = now;
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateWorkoutRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,
    pub date: Option<DateTime<Utc>>,
    pub trainer_id: Option<Uuid>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0.0, message = "Calories burned cannot be negative"))]
    pub calories_burned: Option<f64>,
    pub intensity: Option<Intensity>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    pub is_public: Option<bool>,
}

impl CreateWorkoutRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.trim().to_string();
        self.notes = self.notes.map(|n| n.trim().to_string());
        self.exercises = self.exercises.into_iter().map(Exercise::trimmed).collect();
        self
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateWorkoutRequest {
    #[validate(length(min = 1, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub exercises: Option<Vec<Exercise>>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_minutes: Option<i32>,
    #[validate(range(min = 0.0, message = "Calories burned cannot be negative"))]
    pub calories_burned: Option<f64>,
    pub intensity: Option<Intensity>,
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
    pub is_public: Option<bool>,
}

impl UpdateWorkoutRequest {
    pub fn normalized(mut self) -> Self {
        self.title = self.title.map(|t| t.trim().to_string());
        self.notes = self.notes.map(|n| n.trim().to_string());
        self.exercises = self
            .exercises
            .map(|list| list.into_iter().map(Exercise::trimmed).collect());
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewWorkout {
    pub user_id: Uuid,
    pub trainer_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub title: String,
    pub exercises: Vec<Exercise>,
    pub duration_minutes: Option<i32>,
    pub calories_burned: Option<f64>,
    pub intensity: Intensity,
    pub notes: Option<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone, Default)]
pub struct WorkoutUpdate {
    pub title: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub exercises: Option<Vec<Exercise>>,
    pub duration_minutes: Option<i32>,
    pub calories_burned: Option<f64>,
    pub intensity: Option<Intensity>,
    pub notes: Option<String>,
    pub is_public: Option<bool>,
}

impl From<UpdateWorkoutRequest> for WorkoutUpdate {
    fn from(request: UpdateWorkoutRequest) -> Self {
        Self {
            title: request.title,
            date: request.date,
            exercises: request.exercises,
            duration_minutes: request.duration_minutes,
            calories_burned: request.calories_burned,
            intensity: request.intensity,
            notes: request.notes,
            is_public: request.is_public,
        }
    }
}

/// Workout plus its aggregate metrics
#[derive(Debug, Serialize)]
pub struct WorkoutResponse {
    #[serde(flatten)]
    pub workout: Workout,
    pub total_volume: f64,
    pub exercise_count: usize,
}

impl From<Workout> for WorkoutResponse {
    fn from(workout: Workout) -> Self {
        let total_volume = workout.calculate_performance();
        let exercise_count = workout.exercises.len();
        Self {
            workout,
            total_volume,
            exercise_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(name: &str, sets: i32, reps: i32, weight: f64) -> Exercise {
        Exercise {
            name: name.to_string(),
            sets,
            reps,
            weight,
            notes: None,
        }
    }

    fn workout_with(exercises: Vec<Exercise>) -> Workout {
        let now = Utc::now();
        Workout {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            trainer_id: None,
            date: now,
            title: "Push day".to_string(),
            exercises: Json(exercises),
            duration_minutes: Some(60),
            calories_burned: None,
            intensity: Intensity::High,
            notes: None,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_calculate_performance_sums_volume() {
        let workout = workout_with(vec![
            exercise("Bench Press", 3, 10, 135.0),
            exercise("Push-up", 3, 20, 0.0),
            exercise("Overhead Press", 4, 8, 65.5),
        ]);

        assert_eq!(workout.calculate_performance(), 4050.0 + 0.0 + 2096.0);
    }

    #[test]
    fn test_empty_workout_has_zero_volume() {
        let response = WorkoutResponse::from(workout_with(vec![]));
        assert_eq!(response.total_volume, 0.0);
        assert_eq!(response.exercise_count, 0);
    }

    #[test]
    fn test_exercise_validation() {
        assert!(exercise("Squat", 5, 5, 225.0).validate().is_ok());
        assert!(exercise("", 5, 5, 225.0).validate().is_err());
        assert!(exercise("Squat", 0, 5, 225.0).validate().is_err());
        assert!(exercise("Squat", 5, 0, 225.0).validate().is_err());
        assert!(exercise("Squat", 5, 5, -1.0).validate().is_err());
    }

    #[test]
    fn test_exercise_weight_defaults_to_zero() {
        let parsed: Exercise =
            serde_json::from_str(r#"{"name": "Plank", "sets": 3, "reps": 1}"#).unwrap();
        assert_eq!(parsed.weight, 0.0);
    }

    #[test]
    fn test_create_request_is_trimmed() {
        let request: CreateWorkoutRequest = serde_json::from_value(serde_json::json!({
            "title": "  Leg day ",
            "exercises": [{"name": " Squat ", "sets": 5, "reps": 5, "weight": 100}]
        }))
        .unwrap();

        let request = request.normalized();
        assert_eq!(request.title, "Leg day");
        assert_eq!(request.exercises[0].name, "Squat");
    }
}

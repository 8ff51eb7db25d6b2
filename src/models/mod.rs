// Persistence models and request/response shapes

pub mod exercise_video;
pub mod pagination;
pub mod progress;
pub mod user;
pub mod workout;

pub use exercise_video::*;
pub use pagination::*;
pub use progress::*;
pub use user::*;
pub use workout::*;

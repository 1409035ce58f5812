pub mod moderation;
pub mod ratings;

pub use moderation::RatingModeration;
pub use ratings::RatingService;

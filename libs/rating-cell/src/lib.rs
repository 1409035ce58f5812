pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{CenterRating, RatingError, RatingSummary};
pub use services::{RatingModeration, RatingService};

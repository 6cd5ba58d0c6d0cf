pub mod prelude;

pub mod api_keys;
pub mod competencies;
pub mod event_indicators;
pub mod event_pictures;
pub mod events;
pub mod indicators;
pub mod roles;
pub mod universities;
pub mod user_competencies;
pub mod user_indicators;
pub mod user_preference_competencies;
pub mod users;

pub use super::api_keys::Entity as ApiKeys;
pub use super::competencies::Entity as Competencies;
pub use super::event_indicators::Entity as EventIndicators;
pub use super::event_pictures::Entity as EventPictures;
pub use super::events::Entity as Events;
pub use super::indicators::Entity as Indicators;
pub use super::roles::Entity as Roles;
pub use super::universities::Entity as Universities;
pub use super::user_competencies::Entity as UserCompetencies;
pub use super::user_indicators::Entity as UserIndicators;
pub use super::user_preference_competencies::Entity as UserPreferenceCompetencies;
pub use super::users::Entity as Users;

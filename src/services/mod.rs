pub mod error;
pub use error::ServiceError;

pub mod session;
pub use session::{KeySource, RandomKeySource, SessionManager, hash_key};

pub mod reference;
pub use reference::{ReferenceCache, ReferenceData};

pub mod authorization;
pub use authorization::{Operation, PolicyTable, ProfileScope, RoleGate};

pub mod picture;
pub use picture::PictureService;

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{
    Account, AccountService, CompetenceView, IndicatorDto, ProfileEdit, ProfileView,
    Registration, SessionInfo,
};
pub use account_service_impl::SeaOrmAccountService;

pub mod event_service;
pub mod event_service_impl;
pub use event_service::{EventDetails, EventEdit, EventService, EventSummary, NewEventRequest};
pub use event_service_impl::SeaOrmEventService;

#[cfg(test)]
pub(crate) mod testing;

pub mod event;
pub mod indicator;
pub mod reference;
pub mod session;
pub mod user;

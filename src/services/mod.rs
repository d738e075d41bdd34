pub mod booking;
pub mod conflict;
pub mod customers;
pub mod lifecycle;
pub mod messaging;
pub mod payment;

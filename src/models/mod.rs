pub mod appointment;
pub mod caller;
pub mod catalog;
pub mod customer;
pub mod ledger;

pub use appointment::{Appointment, AppointmentStatus, PaymentMethod, PaymentStatus};
pub use caller::{Caller, Role};
pub use catalog::{Branch, Category, Employee, Room, Service};
pub use customer::Customer;
pub use ledger::{Interval, LedgerEntry, LedgerStatus, ResourceKind};

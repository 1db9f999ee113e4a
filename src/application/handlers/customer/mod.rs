//! Customer handlers - Admin lookup, profile update and soft delete.

mod delete_customer;
mod get_customer;
mod update_customer;

pub use delete_customer::DeleteCustomerHandler;
pub use get_customer::{CustomerLookup, GetCustomerHandler};
pub use update_customer::{UpdateCustomerCommand, UpdateCustomerHandler};

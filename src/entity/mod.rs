pub mod audit_logs;
pub mod orders;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use orders::Entity as Orders;
pub use users::Entity as Users;

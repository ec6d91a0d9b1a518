pub mod attendance;
pub mod audit_log;
pub mod intern;
pub mod outbox;
pub mod payment;
pub mod receipt;
pub mod session;
pub mod user;

pub use attendance::{AttendanceListing, AttendanceRecord, AttendanceStatus, MarkAttendance};
pub use audit_log::{AuditAction, AuditLogEntry};
pub use intern::{CreateIntern, Intern, InternStatus, UpdateIntern};
pub use outbox::{OutboxEntry, OutboxKind, OutboxStatus};
pub use payment::{CreatePayment, Payment};
pub use receipt::{
    CreateReceipt, PaymentType, Receipt, ReceiptDetail, ReceiptStatus, ReceiptSummary,
    SearchReceiptsFilter, UpdateReceipt,
};
pub use session::Session;
pub use user::{SanitizedUser, User};

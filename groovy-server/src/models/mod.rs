//! Domain models with validation at construction
//!
//! All user input is validated when creating these types.
//! Invalid input returns ValidationError, not panic.

pub mod validation;
pub mod pagination;
pub mod email;
pub mod password;
pub mod profile;
pub mod status;
pub mod university;
pub mod notification;
pub mod content;

pub use validation::ValidationError;
pub use pagination::{Paginated, Pagination, PaginationParams};
pub use email::Email;
pub use password::PasswordHash;
pub use profile::{AdmissionClass, DeleteReason, Gender, Grade, ImageUrl, Nickname};
pub use status::{Decision, RequestStatus};
pub use university::{UniversityName, VerificationMethod};
pub use notification::{NotificationDraft, NotificationType};
pub use content::{ChatContent, GroupTitle, Suggestion};

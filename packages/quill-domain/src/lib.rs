pub mod identity;
pub mod insights;
pub mod note;
pub mod quota;
pub mod tags;
pub mod time_serde;

pub use identity::Identity;
pub use insights::{AiInsights, InsightKind, InsightUpdate};
pub use note::{Note, NoteDraft};
pub use quota::{GuestQuota, QuotaExceeded};
pub use tags::{TagCount, Tags, normalize_tag, tag_counts};

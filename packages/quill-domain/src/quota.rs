use crate::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Guests can create at most {limit} notes.")]
pub struct QuotaExceeded {
	pub limit: usize,
}

/// Note-count limit for guest identities, checked before a note is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestQuota {
	pub max_notes: usize,
}
impl GuestQuota {
	pub fn new(max_notes: usize) -> Self {
		Self { max_notes }
	}

	pub fn check(&self, identity: &Identity, existing_notes: usize) -> Result<(), QuotaExceeded> {
		if identity.is_guest && existing_notes >= self.max_notes {
			return Err(QuotaExceeded { limit: self.max_notes });
		}

		Ok(())
	}
}
impl Default for GuestQuota {
	fn default() -> Self {
		Self { max_notes: 3 }
	}
}
impl From<&quill_config::Quota> for GuestQuota {
	fn from(cfg: &quill_config::Quota) -> Self {
		Self { max_notes: cfg.guest_max_notes as usize }
	}
}

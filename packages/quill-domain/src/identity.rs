/// What the identity provider tells us about the acting user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
	pub user_id: String,
	pub is_guest: bool,
}
impl Identity {
	pub fn guest(user_id: impl Into<String>) -> Self {
		Self { user_id: user_id.into(), is_guest: true }
	}

	pub fn member(user_id: impl Into<String>) -> Self {
		Self { user_id: user_id.into(), is_guest: false }
	}
}

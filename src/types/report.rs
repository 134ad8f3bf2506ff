#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
	/// Every chunk sent and the device answered "Done".
	Confirmed,
	/// Every chunk sent but no "Done" arrived in time.
	Unconfirmed,
}

#[derive(Debug, Clone)]
pub struct UploadReport {
	pub outcome: UploadOutcome,
	pub chunks_sent: usize,
	pub bytes_sent: usize,
	pub notifications: Vec<String>,
}

impl UploadReport {
	pub fn confirmed(&self) -> bool {
		self.outcome == UploadOutcome::Confirmed
	}
}

use indicatif::ProgressBar;
use tracing::{debug, info, warn};

use crate::consts::{DONE_TOKEN, READY_TOKEN};
use crate::device::Link;
use crate::error::UploadError;
use crate::protocol::chunked::encode_chunked;
use crate::protocol::commands::build_send_image;
use crate::types::{
	NotificationLog, SessionState, TimeoutKind, UploadConfig, UploadOutcome, UploadReport,
};

/// One upload attempt over one connection.
///
/// Phases: send the image command and wait for "OK", stream every chunk with
/// a fixed pause between writes, then wait for "Done". A missing "OK" aborts
/// before any pixel data is written. A missing "Done" is reported as
/// [`UploadOutcome::Unconfirmed`].
pub struct UploadSession<'a, L: Link> {
	link: &'a L,
	config: UploadConfig,
	log: NotificationLog,
	state: SessionState,
	subscribed: bool,
}

impl<'a, L: Link> UploadSession<'a, L> {
	pub fn new(link: &'a L, config: UploadConfig) -> Self {
		Self {
			link,
			config,
			log: NotificationLog::new(),
			state: SessionState::Idle,
			subscribed: false,
		}
	}

	pub fn state(&self) -> SessionState {
		self.state
	}

	pub fn notifications(&self) -> &[String] {
		self.log.entries()
	}

	/// Uploads `frame` and always drops the notification subscription before returning.
	pub async fn run(
		&mut self,
		frame: &[u8],
		progress: &ProgressBar,
	) -> Result<UploadReport, UploadError> {
		let result = self.drive(frame, progress).await;
		self.unsubscribe().await;
		result
	}

	async fn drive(
		&mut self,
		frame: &[u8],
		progress: &ProgressBar,
	) -> Result<UploadReport, UploadError> {
		let command = build_send_image(self.config.chunk_size)?;
		let chunks = encode_chunked(frame, self.config.chunk_size, self.config.reverse)?;
		debug!(
			bytes = frame.len(),
			chunks = chunks.len(),
			reversed = self.config.reverse,
			"prepared frame"
		);

		self.subscribe().await?;
		self.link.write(&command).await?;
		self.state = SessionState::AwaitingReady;
		info!("sent image command, waiting for device");

		if !self.log.wait_for(READY_TOKEN, self.config.ready_timeout).await {
			self.state = SessionState::TimedOut(TimeoutKind::Ready);
			return Err(UploadError::ReadyTimeout(self.config.ready_timeout));
		}
		self.unsubscribe().await;
		self.state = SessionState::Transferring;
		info!("device ready");

		self.subscribe().await?;
		progress.set_length(chunks.len() as u64);
		let mut bytes_sent = 0;
		for chunk in &chunks {
			self.link.write(chunk).await?;
			bytes_sent += chunk.len();
			progress.inc(1);
			tokio::time::sleep(self.config.chunk_delay).await;
		}
		progress.finish_with_message("all chunks sent");
		info!(chunks = chunks.len(), bytes = bytes_sent, "all chunks sent");

		self.state = SessionState::AwaitingCompletion;
		let outcome = if self.log.wait_for(DONE_TOKEN, self.config.done_timeout).await {
			self.state = SessionState::Done;
			UploadOutcome::Confirmed
		} else {
			self.state = SessionState::TimedOut(TimeoutKind::Completion);
			warn!(
				timeout = ?self.config.done_timeout,
				"device did not confirm completion"
			);
			UploadOutcome::Unconfirmed
		};

		Ok(UploadReport {
			outcome,
			chunks_sent: chunks.len(),
			bytes_sent,
			notifications: self.log.entries().to_vec(),
		})
	}

	async fn subscribe(&mut self) -> Result<(), UploadError> {
		self.link.subscribe(self.log.sink()).await?;
		self.subscribed = true;
		Ok(())
	}

	async fn unsubscribe(&mut self) {
		if !self.subscribed {
			return;
		}
		self.subscribed = false;
		if let Err(e) = self.link.unsubscribe().await {
			warn!(error = %e, "failed to unsubscribe");
		}
	}
}

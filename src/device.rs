use std::pin::Pin;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use btleplug::api::{
	Central, CentralEvent, Characteristic, Manager as _, Peripheral as _, ScanFilter, WriteType,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures_util::{Stream, StreamExt};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::consts::{CHAR_UUID, NAME_TOKENS};
use crate::error::UploadError;
use crate::types::NotificationSink;

/// Transport seen by the upload session: one characteristic that takes
/// unacknowledged writes and pushes notifications.
pub trait Link {
	async fn write(&self, data: &[u8]) -> Result<(), UploadError>;
	async fn subscribe(&self, sink: NotificationSink) -> Result<(), UploadError>;
	/// Must be a no-op when not subscribed.
	async fn unsubscribe(&self) -> Result<(), UploadError>;
}

pub fn is_target_name(name: &str) -> bool {
	let name = name.to_lowercase();
	NAME_TOKENS.iter().all(|t| name.contains(t))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
	/// First device whose advertised name contains every token in [`NAME_TOKENS`].
	NamePattern,
	Address(String),
}

impl Target {
	pub fn matches(&self, name: Option<&str>, address: &str) -> bool {
		match self {
			Target::NamePattern => name.is_some_and(is_target_name),
			Target::Address(wanted) => address.eq_ignore_ascii_case(wanted),
		}
	}
}

pub struct DiscoveredDevice {
	pub name: String,
	pub address: String,
	peripheral: Peripheral,
}

impl DiscoveredDevice {
	/// Best-effort disconnect for a connection attempt that was cut short.
	pub async fn disconnect(&self) {
		match self.peripheral.is_connected().await {
			Ok(false) => {}
			Ok(true) => {
				if let Err(e) = self.peripheral.disconnect().await {
					warn!(error = %e, "failed to disconnect");
				}
			}
			Err(e) => warn!(error = %e, "failed to query connection state"),
		}
	}
}

type EventStream = Pin<Box<dyn Stream<Item = CentralEvent> + Send>>;

/// Active scan on the first Bluetooth adapter. Call [`Scanner::stop`] on
/// every exit path, including interrupts.
pub struct Scanner {
	adapter: Adapter,
	events: EventStream,
}

impl Scanner {
	pub async fn start() -> Result<Self, UploadError> {
		let manager = Manager::new().await?;
		let adapter = manager
			.adapters()
			.await?
			.into_iter()
			.next()
			.ok_or(UploadError::NoAdapter)?;

		let events = adapter.events().await?;
		adapter.start_scan(ScanFilter::default()).await?;
		Ok(Self { adapter, events })
	}

	/// Returns the first device matching `target` seen within `scan_timeout`.
	pub async fn find(
		&mut self,
		target: &Target,
		scan_timeout: Duration,
	) -> Result<DiscoveredDevice, UploadError> {
		debug!(timeout = ?scan_timeout, ?target, "scanning");
		let deadline = Instant::now() + scan_timeout;

		// The adapter may already know the device from an earlier scan.
		for peripheral in self.adapter.peripherals().await? {
			if let Some(device) = inspect(peripheral, target).await? {
				return Ok(device);
			}
		}

		loop {
			let id = match tokio::time::timeout_at(deadline, self.events.next()).await {
				Ok(Some(CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id))) => id,
				Ok(Some(_)) => continue,
				Ok(None) | Err(_) => return Err(UploadError::DeviceNotFound),
			};
			let peripheral = self.adapter.peripheral(&id).await?;
			if let Some(device) = inspect(peripheral, target).await? {
				return Ok(device);
			}
		}
	}

	pub async fn stop(&self) {
		if let Err(e) = self.adapter.stop_scan().await {
			warn!(error = %e, "failed to stop scan");
		}
	}
}

async fn inspect(
	peripheral: Peripheral,
	target: &Target,
) -> Result<Option<DiscoveredDevice>, UploadError> {
	let Some(props) = peripheral.properties().await? else {
		return Ok(None);
	};
	let address = props.address.to_string();
	if !target.matches(props.local_name.as_deref(), &address) {
		return Ok(None);
	}
	info!(name = ?props.local_name, %address, "found device");
	Ok(Some(DiscoveredDevice {
		name: props.local_name.unwrap_or_default(),
		address,
		peripheral,
	}))
}

/// Connected device with the upload characteristic resolved.
pub struct BleLink {
	peripheral: Peripheral,
	characteristic: Characteristic,
	listener: Mutex<Option<JoinHandle<()>>>,
}

impl BleLink {
	pub async fn connect(device: &DiscoveredDevice) -> Result<Self, UploadError> {
		let peripheral = device.peripheral.clone();
		peripheral
			.connect()
			.await
			.map_err(|e| UploadError::ConnectionFailed(e.to_string()))?;

		let characteristic = match resolve_characteristic(&peripheral).await {
			Ok(c) => c,
			Err(e) => {
				if let Err(de) = peripheral.disconnect().await {
					warn!(error = %de, "disconnect after failed setup");
				}
				return Err(e);
			}
		};

		Ok(Self {
			peripheral,
			characteristic,
			listener: Mutex::new(None),
		})
	}

	pub async fn disconnect(&self) -> Result<(), UploadError> {
		if self.peripheral.is_connected().await? {
			self.peripheral.disconnect().await?;
		}
		Ok(())
	}

	/// Best-effort teardown for every exit path, including interrupts.
	pub async fn release(&self) {
		if let Err(e) = self.unsubscribe().await {
			warn!(error = %e, "failed to unsubscribe");
		}
		if let Err(e) = self.disconnect().await {
			warn!(error = %e, "failed to disconnect");
		}
	}

	fn take_listener(&self) -> Option<JoinHandle<()>> {
		self.listener
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.take()
	}
}

async fn resolve_characteristic(peripheral: &Peripheral) -> Result<Characteristic, UploadError> {
	peripheral
		.discover_services()
		.await
		.map_err(|e| UploadError::ConnectionFailed(e.to_string()))?;
	peripheral
		.characteristics()
		.into_iter()
		.find(|c| c.uuid == CHAR_UUID)
		.ok_or(UploadError::CharacteristicMissing)
}

impl Link for BleLink {
	async fn write(&self, data: &[u8]) -> Result<(), UploadError> {
		self.peripheral
			.write(&self.characteristic, data, WriteType::WithoutResponse)
			.await?;
		Ok(())
	}

	async fn subscribe(&self, sink: NotificationSink) -> Result<(), UploadError> {
		self.unsubscribe().await?;

		// Open the stream first so nothing sent right after subscribing is missed.
		let mut stream = self.peripheral.notifications().await?;
		self.peripheral.subscribe(&self.characteristic).await?;

		let uuid = self.characteristic.uuid;
		let handle = tokio::spawn(async move {
			while let Some(n) = stream.next().await {
				if n.uuid == uuid && sink.send(n.value).is_err() {
					break;
				}
			}
		});
		*self.listener.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
		Ok(())
	}

	async fn unsubscribe(&self) -> Result<(), UploadError> {
		if let Some(handle) = self.take_listener() {
			handle.abort();
			self.peripheral.unsubscribe(&self.characteristic).await?;
		}
		Ok(())
	}
}

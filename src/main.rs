mod cli;
mod consts;
mod device;
mod error;
mod image;
mod protocol;
mod session;
mod types;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use consts::*;
use device::{BleLink, Scanner};
use protocol::commands::build_send_image;
use session::UploadSession;
use types::{UploadConfig, UploadReport};

const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> Result<ExitCode> {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) => {
			let code = if e.use_stderr() { 1 } else { 0 };
			e.print()?;
			return Ok(ExitCode::from(code));
		}
	};
	init_tracing(cli.verbose);

	eprintln!("Loading {}...", cli.image.display());
	let frame = crate::image::load_image(&cli.image)?;
	eprintln!(
		"  {} bytes RGB565, {}x{}",
		frame.len(),
		DISPLAY_WIDTH,
		DISPLAY_HEIGHT
	);

	if let Some(preview_path) = &cli.preview {
		return cmd_preview(&frame, preview_path);
	}

	cmd_upload(&cli, &frame).await
}

fn init_tracing(verbose: bool) {
	let default = if verbose { "debug" } else { "info" };
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
		)
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

fn cmd_preview(frame: &[u8], path: &Path) -> Result<ExitCode> {
	let img = crate::image::rgb565_to_image(frame, DISPLAY_WIDTH, DISPLAY_HEIGHT);
	img.save(path)?;
	println!("Preview saved to {}", path.display());
	Ok(ExitCode::SUCCESS)
}

async fn cmd_upload(cli: &Cli, frame: &[u8]) -> Result<ExitCode> {
	let config = cli.upload_config();
	build_send_image(config.chunk_size)?;
	tracing::debug!("upload config:\n{config}");

	// One listener for the whole run so Ctrl-C unwinds through every phase.
	let interrupt = tokio::signal::ctrl_c();
	tokio::pin!(interrupt);

	let spinner = ProgressBar::new_spinner();
	spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
	spinner.set_message("Scanning for Smart Sketch...");
	spinner.enable_steady_tick(Duration::from_millis(100));

	let Some(scanner) = or_interrupt(Scanner::start(), &mut interrupt).await else {
		spinner.finish_and_clear();
		return Ok(interrupted());
	};
	let mut scanner = scanner?;
	let found = or_interrupt(scanner.find(&cli.target(), cli.scan_duration()), &mut interrupt).await;
	scanner.stop().await;
	spinner.finish_and_clear();
	let Some(found) = found else {
		return Ok(interrupted());
	};
	let found = found?;
	eprintln!("Found: {} ({})", found.name, found.address);

	let Some(link) = or_interrupt(BleLink::connect(&found), &mut interrupt).await else {
		found.disconnect().await;
		return Ok(interrupted());
	};
	let link = link?;
	eprintln!("Connected.");

	let pb = ProgressBar::new(0);
	pb.set_style(
		ProgressStyle::default_bar()
			.template("{spinner:.cyan} [{bar:40.cyan/dim}] {pos}/{len} chunks ({eta}) {msg}")?
			.progress_chars("=> "),
	);

	let result = or_interrupt(upload(&link, config, frame, &pb), &mut interrupt).await;
	link.release().await;

	let Some(result) = result else {
		pb.abandon();
		return Ok(interrupted());
	};

	let report = result?;
	tracing::debug!(
		chunks = report.chunks_sent,
		bytes = report.bytes_sent,
		notifications = ?report.notifications,
		"upload finished"
	);
	if report.confirmed() {
		println!("Image successfully uploaded! Check the Smart Sketch projector.");
	} else {
		println!("Upload completed but the device did not answer 'Done'.");
		println!("Check whether the image appeared on the projector.");
	}
	Ok(ExitCode::SUCCESS)
}

/// Runs `fut` to completion unless `interrupt` resolves first.
async fn or_interrupt<F, I>(fut: F, interrupt: &mut Pin<&mut I>) -> Option<F::Output>
where
	F: Future,
	I: Future,
{
	tokio::select! {
		out = fut => Some(out),
		_ = interrupt.as_mut() => None,
	}
}

fn interrupted() -> ExitCode {
	eprintln!("\nInterrupted by user");
	ExitCode::from(EXIT_INTERRUPTED)
}

async fn upload(
	link: &BleLink,
	config: UploadConfig,
	frame: &[u8],
	pb: &ProgressBar,
) -> Result<UploadReport, error::UploadError> {
	let mut session = UploadSession::new(link, config);
	let result = session.run(frame, pb).await;
	tracing::debug!(state = ?session.state(), notifications = ?session.notifications(), "session finished");
	result
}

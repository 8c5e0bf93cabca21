//! Recording playback loop

use crate::ReplayError;
use dms::{AlarmEdge, DmsSession, Frame, SessionSummary};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

/// Playback options
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplayOptions {
    /// Sleep between frames to match their recorded timestamps
    pub realtime: bool,
}

/// Result of one replay
#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutcome {
    /// Lines parsed into frames
    pub frames_read: u64,
    /// Frames the session consumed
    pub frames_processed: u64,
    /// The frame-rate guard requested a shutdown and playback stopped
    pub shutdown_requested: bool,
    pub summary: SessionSummary,
}

/// Play a JSON-lines recording through `session`
///
/// The session is started at the first frame's timestamp and stopped when
/// the input ends or the frame-rate guard requests a shutdown.
pub async fn replay<R>(
    reader: R,
    session: &mut DmsSession,
    options: ReplayOptions,
) -> Result<ReplayOutcome, ReplayError>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_number = 0;
    let mut frames_read = 0;
    let mut frames_processed = 0;
    let mut shutdown_requested = false;
    let mut previous_timestamp: Option<f64> = None;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let frame: Frame = serde_json::from_str(line).map_err(|source| ReplayError::Frame {
            line: line_number,
            source,
        })?;
        frames_read += 1;

        match previous_timestamp {
            None => session.start(frame.timestamp),
            Some(previous) if options.realtime => {
                let gap = frame.timestamp - previous;
                if gap > 0.0 && gap.is_finite() {
                    tokio::time::sleep(Duration::from_secs_f64(gap)).await;
                }
            }
            Some(_) => {}
        }
        previous_timestamp = Some(frame.timestamp);

        let report = session.process_frame(&frame);
        if report.processed {
            frames_processed += 1;
        }

        match report.alarm_edge {
            Some(AlarmEdge::Started) => {
                warn!("t={:.2}s alarm started: {}", frame.timestamp, report.status.message)
            }
            Some(AlarmEdge::Stopped) => info!("t={:.2}s alarm stopped", frame.timestamp),
            None => {}
        }

        if report.shutdown_requested {
            warn!(
                "t={:.2}s protective shutdown requested, stopping playback",
                frame.timestamp
            );
            shutdown_requested = true;
            break;
        }
    }

    session.stop();
    debug!("Replay read {} frame(s) from {} line(s)", frames_read, line_number);

    Ok(ReplayOutcome {
        frames_read,
        frames_processed,
        shutdown_requested,
        summary: session.summary(),
    })
}

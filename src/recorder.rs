// ===============================
// src/recorder.rs
// ===============================
//
// JSONL writer for projected display events (feed for an external renderer):
// - One DisplayEvent per line.
// - BufWriter, flushed every 1s and every 100 events.
// - File target: parent directory is created; open failure is returned.
// - Write errors are logged and the event dropped; the dashboard never stalls
//   on its renderer.
//
// ENV: `RECORD_FILE=-` for stdout or `RECORD_FILE=/path/events.jsonl`.
//

use std::path::Path;
use tokio::{
    fs::{self, OpenOptions},
    io::{AsyncWrite, AsyncWriteExt, BufWriter},
    sync::mpsc,
    time::{interval, Duration, MissedTickBehavior},
};
use tracing::{error, info};

use crate::config::RecordTarget;
use crate::domain::DisplayEvent;

const FLUSH_EVERY_N_EVENTS: u32 = 100;

pub type Writer = BufWriter<Box<dyn AsyncWrite + Send + Unpin>>;

pub async fn open_writer(target: &RecordTarget) -> std::io::Result<Writer> {
    let inner: Box<dyn AsyncWrite + Send + Unpin> = match target {
        RecordTarget::Stdout => Box::new(tokio::io::stdout()),
        RecordTarget::File(path) => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).await?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path).await?;
            Box::new(file)
        }
    };
    Ok(BufWriter::new(inner))
}

pub async fn run<W>(mut rx: mpsc::Receiver<DisplayEvent>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    info!("recorder: started");

    let mut tick = interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut since_last_flush: u32 = 0;

    loop {
        tokio::select! {
            maybe_ev = rx.recv() => {
                let Some(ev) = maybe_ev else {
                    // Channel closed: flush dan keluar
                    let _ = writer.flush().await;
                    info!("recorder: channel closed, stopped");
                    break;
                };

                let mut line = match serde_json::to_string(&ev) {
                    Ok(s) => s,
                    Err(e) => {
                        error!(?e, "recorder: serialize error, skip event");
                        continue;
                    }
                };
                line.push('\n');

                if let Err(e) = writer.write_all(line.as_bytes()).await {
                    error!(?e, "recorder: write failed, drop event");
                    continue;
                }

                since_last_flush += 1;
                if since_last_flush >= FLUSH_EVERY_N_EVENTS {
                    let _ = writer.flush().await;
                    since_last_flush = 0;
                }
            }

            _ = tick.tick() => {
                if since_last_flush > 0 {
                    let _ = writer.flush().await;
                    since_last_flush = 0;
                }
            }
        }
    }
}

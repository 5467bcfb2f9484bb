//! Terminal output helpers for Beam CLI.

use std::io::{self, Write};
use std::time::Duration;

use beam_core::file::format_size;
use beam_core::transfer::{TransferProgress, TransferState};
use tokio::sync::watch;

/// Render progress updates as an in-place status line until the
/// transfer finishes one way or the other.
pub async fn display_progress(mut rx: watch::Receiver<TransferProgress>, verb: &str) {
    let mut last_state = TransferState::Waiting;

    loop {
        let changed = tokio::time::timeout(Duration::from_millis(200), rx.changed()).await;

        let progress = rx.borrow().clone();

        if progress.state != last_state {
            last_state = progress.state;

            match progress.state {
                TransferState::Connected => println!("  Connected!"),
                TransferState::Completed => {
                    println!(
                        "\r  \"{}\" {} ({})          ",
                        progress.file_name,
                        verb,
                        format_size(progress.total_bytes)
                    );
                    break;
                }
                TransferState::Failed => {
                    println!();
                    break;
                }
                TransferState::Waiting | TransferState::Transferring => {}
            }
        }

        if progress.state == TransferState::Transferring {
            print!(
                "\r  [{:>6.2}%] {} - {}/s - ETA: {}    ",
                progress.percentage(),
                progress.file_name,
                format_size(progress.speed_bps),
                format_eta(progress.eta)
            );
            let _ = io::stdout().flush();
        }

        // Sender side dropped; final state is already on screen
        if matches!(changed, Ok(Err(_))) {
            break;
        }
    }
}

fn format_eta(eta: Option<Duration>) -> String {
    match eta {
        None => "--".to_string(),
        Some(d) => {
            let total_secs = d.as_secs();
            if total_secs >= 60 {
                format!("{}m{:02}s", total_secs / 60, total_secs % 60)
            } else {
                format!("{total_secs}s")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_eta_unknown() {
        assert_eq!(format_eta(None), "--");
    }

    #[test]
    fn test_format_eta_seconds() {
        assert_eq!(format_eta(Some(Duration::from_secs(42))), "42s");
        assert_eq!(format_eta(Some(Duration::from_secs(0))), "0s");
    }

    #[test]
    fn test_format_eta_minutes() {
        assert_eq!(format_eta(Some(Duration::from_secs(65))), "1m05s");
        assert_eq!(format_eta(Some(Duration::from_secs(600))), "10m00s");
    }
}

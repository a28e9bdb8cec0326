use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

/// Exit code used when the run is interrupted after collection, as a shell would report SIGINT.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    CancelCollection,
    Exit,
}

fn on_interrupt(cancelation: &CancellationToken) -> Interrupt {
    if cancelation.is_cancelled() {
        Interrupt::Exit
    } else {
        cancelation.cancel();
        Interrupt::CancelCollection
    }
}

/// The first Ctrl-C cancels `cancelation` so running `git` processes are stopped and reported as
/// failed sources. Once `cancelation` is cancelled, by an earlier Ctrl-C or because collection is
/// over, Ctrl-C exits the process.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    loop {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        match on_interrupt(&cancelation) {
            Interrupt::CancelCollection => warn!("Interrupted, cancelling collection"),
            Interrupt::Exit => {
                warn!("Interrupted, exiting");
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        }
    }
}

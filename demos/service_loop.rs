use movepool::backends::hid::HidTransport;
use movepool::{Button, ControllerManager, DataFrame, Notification, NotificationFilter};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const RUN_FOR: Duration = Duration::from_secs(30);

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("movepool=info")),
        )
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let (frames_tx, frames) = mpsc::channel::<DataFrame>();
    let (notes_tx, notes) = mpsc::channel::<Notification>();

    let mut mgr = ControllerManager::new(HidTransport::new(), frames_tx)
        .with_config_path("movepool.toml");
    mgr.notification_bus()
        .add_listener(notes_tx, NotificationFilter::ConnectionChanges, None);
    mgr.startup()?;

    let mut rumble_sent = vec![0u8; mgr.capacity()];
    let start = Instant::now();
    while start.elapsed() < RUN_FOR {
        mgr.update(Instant::now());

        for note in notes.try_iter() {
            println!("{note}");
            println!("slots: {:?}", mgr.snapshot());
        }

        for frame in frames.try_iter() {
            let move_held = frame.button_bitmask & (1 << Button::Move.bit()) != 0;
            let rumble = if move_held { frame.trigger_value } else { 0 };
            if rumble_sent[frame.controller_id] != rumble {
                match mgr.set_controller_rumble(frame.controller_id, rumble) {
                    Ok(()) => rumble_sent[frame.controller_id] = rumble,
                    Err(err) => eprintln!("rumble on controller {}: {err}", frame.controller_id),
                }
            }
            println!(
                "#{} controller {} buttons={:08b} trigger={}",
                frame.sequence_number,
                frame.controller_id,
                frame.button_bitmask,
                frame.trigger_value
            );
        }

        // Sleep a touch to avoid pegging the CPU in the demo
        std::thread::sleep(Duration::from_millis(1));
    }

    mgr.shutdown();
    Ok(())
}

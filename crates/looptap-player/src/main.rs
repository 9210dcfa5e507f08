//! Looptap - live multi-track looper
//!
//! This is the main entry point for the terminal application. It:
//! 1. Loads the YAML config
//! 2. Starts the duplex audio stream with the loop engine on it
//! 3. Logs engine events from a background thread
//! 4. Reads control commands from stdin
//!
//! Set RUST_LOG=debug for verbose output.

mod commands;
mod config;

use std::io::BufRead;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};

use commands::{Command, HELP};
use config::PlayerConfig;
use looptap_core::audio::{get_input_devices, get_output_devices, start_audio_system, Direction};
use looptap_core::config::default_config_path;
use looptap_core::engine::{EventReceiver, LooperEvent, LooperHandle};

/// How often the event thread drains the engine's queue
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(20);

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("looptap starting up");

    let config_path = default_config_path();
    let mut config = config::load(&config_path);
    log::info!("Config: {:?}", config_path);

    let system = start_audio_system(&config.audio, config.looper.clone())
        .context("Failed to start audio")?;
    let mut looper = system.looper;

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                          Looptap                             ║");
    println!("║                 live multi-track loop recorder               ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!(
        "{} Hz, {} frames (~{:.1}ms), {} tracks",
        system.sample_rate,
        system.buffer_size,
        system.latency_ms,
        config.looper.track_slots()
    );
    println!("Type 'help' for commands.");

    let running = Arc::new(AtomicBool::new(true));
    let event_thread = spawn_event_logger(system.events, Arc::clone(&running))?;

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("Failed to read stdin")?;
        match commands::parse(&line) {
            Ok(Some(Command::Quit)) => break,
            Ok(Some(command)) => execute(command, &mut looper, &mut config, &config_path),
            Ok(None) => {}
            Err(e) => println!("{:#}", e),
        }
    }

    running.store(false, Ordering::Relaxed);
    if event_thread.join().is_err() {
        log::warn!("Event thread panicked");
    }
    drop(system.handle);
    log::info!("looptap stopped");
    Ok(())
}

fn spawn_event_logger(
    mut events: EventReceiver,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("looptap-events".to_string())
        .spawn(move || {
            while running.load(Ordering::Relaxed) {
                for event in events.drain() {
                    match event {
                        LooperEvent::RecordingStarted(track) => {
                            log::info!("Track {} recording", track)
                        }
                        LooperEvent::RecordingStopped(track) => {
                            log::info!("Track {} stopped recording", track)
                        }
                        LooperEvent::MasterLoopSet { track, length } => {
                            log::info!("Master loop set by track {}: {} samples", track, length)
                        }
                        LooperEvent::TriggerIgnored { absolute_index } => {
                            log::debug!("Onset at sample {} with no armed track", absolute_index)
                        }
                    }
                }
                thread::sleep(EVENT_POLL_INTERVAL);
            }
        })
        .context("Failed to spawn event thread")
}

fn execute(command: Command, looper: &mut LooperHandle, config: &mut PlayerConfig, config_path: &Path) {
    match command {
        Command::Record(ids) => {
            looper.start_sequential_recording(&ids);
        }
        Command::Next => {
            if !looper.is_recording_active() {
                println!("No sequential recording in progress");
            }
            looper.stop_recording_and_continue();
        }
        Command::Start(id) => {
            looper.start_recording(id);
        }
        Command::Stop(id) => {
            looper.stop_recording(id);
        }
        Command::Play(id) => {
            looper.start_playing(id);
        }
        Command::Pause(id) => {
            looper.stop_playing(id);
        }
        Command::Clear(id) => {
            looper.clear_track(id);
        }
        Command::Arm(ids) => {
            for id in ids {
                looper.arm_track(id, true);
            }
        }
        Command::Disarm(ids) => {
            for id in ids {
                looper.arm_track(id, false);
            }
        }
        Command::Threshold(value) => {
            looper.set_threshold(value);
            config.looper.trigger.threshold = looper.threshold();
        }
        Command::Mode(mode) => {
            looper.set_detection_mode(mode);
            config.looper.trigger.mode = mode;
        }
        Command::Gate(enabled) => {
            config.looper.gate.enabled = enabled;
            looper.set_gate(config.looper.gate);
        }
        Command::Monitor(enabled) => {
            looper.set_monitor_input(enabled);
            config.looper.monitor_input = enabled;
        }
        Command::Status => print_status(looper),
        Command::Devices => print_devices(),
        Command::SelectDevice { direction, index } => {
            let devices = match direction {
                Direction::Input => get_input_devices(),
                Direction::Output => get_output_devices(),
            };
            match devices.map(|list| list.into_iter().nth(index)) {
                Ok(Some(device)) => {
                    println!("{:?} device: {} (save and restart to apply)", direction, device);
                    config.select_device(direction, device.id);
                }
                Ok(None) => println!("No {:?} device {} (see 'devices')", direction, index),
                Err(e) => println!("Failed to list devices: {}", e),
            }
        }
        Command::Save => match config::save(config, config_path) {
            Ok(()) => println!("Saved {}", config_path.display()),
            Err(e) => println!("Failed to save config: {:#}", e),
        },
        Command::Reset => {
            looper.reset();
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
}

fn print_devices() {
    for (label, devices) in [("inputs", get_input_devices()), ("outputs", get_output_devices())] {
        println!("{}:", label);
        match devices {
            Ok(devices) => {
                for (i, device) in devices.iter().enumerate() {
                    println!(
                        "  {:>2}: {}{} ({} ch, {:?} Hz)",
                        i,
                        device,
                        if device.is_default { " *" } else { "" },
                        device.max_channels,
                        device.sample_rates
                    );
                }
            }
            Err(e) => println!("  {}", e),
        }
    }
}

fn print_status(looper: &LooperHandle) {
    let atomics = looper.atomics();
    match looper.master_loop_length() {
        Some(length) => println!(
            "master: {} samples, position {}",
            length,
            atomics.master_position()
        ),
        None => println!("master: none"),
    }
    if let Some(current) = looper.current_track_id() {
        let last = if looper.is_last_track_recording() { " (last)" } else { "" };
        println!("sequence: recording track {}{}", current, last);
    }
    println!(
        "input peak {:.3}, gate {:.2}, threshold {:.3}",
        atomics.input_peak(),
        atomics.gate_level(),
        looper.threshold()
    );
    for track in looper.tracks() {
        println!(
            "  track {:>2}: {:<9}{} read {:>8} length {:>8}",
            track.id,
            track.state.name(),
            if track.armed { " armed" } else { "      " },
            track.read_position,
            track.final_length.max(track.recorded_length)
        );
    }
}

//! Soma - body and hand movement to MIDI control changes

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use clap::Parser;
use soma::config::{self, SomaConfig};
use soma::engine::{list_midi_ports, ControlMessage, DispatchLoop, MidiSink, Scheduler};
use soma::mapping::MappingTable;
use soma::sources::{Recording, Sources};
use soma::viz::{self, MonitorState};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config: config_path,
            replay,
            looping,
            max_ticks,
            print,
            no_midi,
        } => {
            println!("Loading configuration from {:?}...", config_path);
            let cfg = config::load_config(&config_path)?;

            let (scheduler, frames) = build_scheduler(&cfg, &replay, looping, max_ticks)?;
            println!("Replaying {} frames from {:?}", frames, replay);

            let stop = scheduler.stop_handle();
            ctrlc::set_handler(move || stop.stop())?;

            let midi = open_midi(&cfg, no_midi)?;

            let rt = tokio::runtime::Runtime::new()?;
            let table = rt.block_on(scheduler.run(|message| {
                if print {
                    println!(
                        "  ch {:>2}  cc {:>3}  {:>7.2}",
                        message.channel, message.controller, message.value
                    );
                }
                send_midi(midi.as_ref(), &message);
            }));

            if let Some(sink) = &midi {
                sink.stop();
            }

            println!("\nFinal values:");
            print_table(&table);
        }

        Commands::Monitor {
            config: config_path,
            replay,
            looping,
            no_midi,
        } => {
            let cfg = config::load_config(&config_path)?;
            let (scheduler, _) = build_scheduler(&cfg, &replay, looping, None)?;

            let stop = scheduler.stop_handle();
            let handler_stop = stop.clone();
            ctrlc::set_handler(move || handler_stop.stop())?;

            let midi = open_midi(&cfg, no_midi)?;
            let state = Arc::new(Mutex::new(MonitorState::from_table(&cfg.mapping_table()?)));

            let dispatch_state = Arc::clone(&state);
            let dispatcher = std::thread::spawn(move || -> Result<()> {
                let rt = tokio::runtime::Runtime::new()?;
                rt.block_on(scheduler.run(|message| {
                    if let Ok(mut state) = dispatch_state.lock() {
                        state.record(&message);
                    }
                    send_midi(midi.as_ref(), &message);
                }));

                if let Some(sink) = &midi {
                    sink.stop();
                }
                if let Ok(mut state) = dispatch_state.lock() {
                    state.finish();
                }
                Ok(())
            });

            viz::run_monitor(state, stop.clone())?;
            stop.stop();

            match dispatcher.join() {
                Ok(result) => result?,
                Err(_) => bail!("dispatch thread panicked"),
            }
        }

        Commands::Check { config: config_path } => {
            println!("Checking configuration at {:?}...", config_path);

            match config::load_config(&config_path) {
                Ok(cfg) => {
                    let settings = cfg.dispatch_settings();
                    let profile = cfg.detection.machine.profile();

                    println!("Configuration is valid!");
                    println!("  Machine: {:?}", cfg.detection.machine);
                    println!("    Body model: {:?}", profile.body_model);
                    println!("    Hand model: {:?}", profile.hand_model);
                    println!("  Frame rate: {} fps", cfg.detection.fps);
                    println!(
                        "  Frame size: {}x{}",
                        cfg.detection.frame.width, cfg.detection.frame.height
                    );
                    println!(
                        "  Body: every {} frames, min confidence {:.2}",
                        settings.body.skip_size, settings.body.min_confidence
                    );
                    println!(
                        "  Hands: every {} frames, min confidence {:.2}, {:?} selection",
                        settings.hands.skip_size, settings.hands.min_confidence, settings.hand_selection
                    );
                    println!(
                        "  MIDI port: {}",
                        cfg.midi.port.as_deref().unwrap_or("(first available)")
                    );

                    let table = cfg.mapping_table()?;
                    if cfg.mappings.is_empty() {
                        println!("  Mappings: none configured, using default");
                    } else {
                        println!("  Mappings: {}", table.len());
                    }
                    for mapping in table.all() {
                        let window = mapping.input_window();
                        let range = mapping.output_range();
                        println!(
                            "    - {} {:?} [{:.2}, {:.2}] -> [{}, {}] glide {} -> ch {} cc {}",
                            mapping.landmark(),
                            mapping.axis(),
                            window.start(),
                            window.end(),
                            range.min(),
                            range.max(),
                            mapping.glide_step(),
                            mapping.channel(),
                            mapping.controller()
                        );
                    }
                }
                Err(e) => {
                    println!("Configuration is invalid: {:#}", e);
                    std::process::exit(1);
                }
            }
        }

        Commands::Ports => {
            println!("MIDI output ports:");
            let ports = list_midi_ports()?;
            if ports.is_empty() {
                println!("  (none)");
            }
            for (index, name) in ports.iter().enumerate() {
                println!("  {}: {}", index, name);
            }
        }

        Commands::Init => {
            let path = "soma.yaml";
            if Path::new(path).exists() {
                println!("soma.yaml already exists. Not overwriting.");
            } else {
                std::fs::write(path, config::EXAMPLE_CONFIG)?;
                println!("Created soma.yaml with example configuration.");
            }
        }
    }

    Ok(())
}

/// Wire a recording into a started dispatch loop. Returns the scheduler and
/// the number of recorded frames.
///
/// Without looping and an explicit tick limit, the run ends once the most
/// frequently polled stream has read every frame.
fn build_scheduler(
    cfg: &SomaConfig,
    replay: &Path,
    looping: bool,
    max_ticks: Option<u64>,
) -> Result<(Scheduler, usize)> {
    let recording = Recording::load(replay)?;

    let settings = cfg.dispatch_settings();
    let shortest_skip = settings.body.skip_size.min(settings.hands.skip_size);
    let table = cfg.mapping_table()?;

    let sources = Sources::new()
        .with_body(recording.pose_source(looping))
        .with_hands(recording.hand_source(looping));

    let mut dispatch = DispatchLoop::new(settings);
    dispatch.start(sources);

    let period = Scheduler::period_for_fps(cfg.detection.fps);
    // The binary has no live-edit path; the table is fixed by the config
    let (scheduler, _edits) = Scheduler::new(dispatch, table, period);

    let limit = match (max_ticks, looping) {
        (Some(ticks), _) => Some(ticks),
        (None, false) => Some(recording.len() as u64 * u64::from(shortest_skip)),
        (None, true) => None,
    };
    let scheduler = match limit {
        Some(ticks) => scheduler.with_max_ticks(ticks),
        None => scheduler,
    };

    Ok((scheduler, recording.len()))
}

fn open_midi(cfg: &SomaConfig, disabled: bool) -> Result<Option<MidiSink>> {
    if disabled {
        return Ok(None);
    }
    let sink = MidiSink::connect(cfg.midi.port.as_deref())?;
    println!("MIDI output: {}", sink.port_name());
    Ok(Some(sink))
}

fn send_midi(sink: Option<&MidiSink>, message: &ControlMessage) {
    if let Some(sink) = sink {
        if let Err(e) = sink.send(message) {
            warn!(error = %e, "failed to send control change");
        }
    }
}

fn print_table(table: &MappingTable) {
    for mapping in table.all() {
        println!(
            "  {} {:?} -> ch {} cc {}: {:.2}",
            mapping.landmark(),
            mapping.axis(),
            mapping.channel(),
            mapping.controller(),
            mapping.previous_value()
        );
    }
}

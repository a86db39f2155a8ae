//! Tilt Pinball headless runner
//!
//! Plays the table in autoplay at a simulated 60 Hz host frame rate and
//! prints the final frame snapshot as JSON.
//!
//! Usage: `tilt-pinball [--seconds N] [--seed N] [--tuning FILE]`

#[cfg(not(target_arch = "wasm32"))]
mod runner {
    use std::process::ExitCode;

    use tilt_pinball::Tuning;
    use tilt_pinball::consts::*;
    use tilt_pinball::sim::{GameEvent, SimulationState, TickInput, tick};

    /// Host frame delta the runner pretends to receive
    const HOST_DT: f32 = 1.0 / 60.0;

    struct Options {
        seconds: f32,
        seed: u64,
        tuning_path: Option<String>,
    }

    impl Default for Options {
        fn default() -> Self {
            Self {
                seconds: 30.0,
                seed: 0x5eed,
                tuning_path: None,
            }
        }
    }

    fn parse_args() -> Result<Options, String> {
        let mut options = Options::default();
        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            let mut value = |name: &str| args.next().ok_or_else(|| format!("{name} needs a value"));
            match arg.as_str() {
                "--seconds" => {
                    options.seconds = value("--seconds")?
                        .parse()
                        .map_err(|e| format!("bad --seconds: {e}"))?;
                }
                "--seed" => {
                    options.seed = value("--seed")?.parse().map_err(|e| format!("bad --seed: {e}"))?;
                }
                "--tuning" => options.tuning_path = Some(value("--tuning")?),
                other => return Err(format!("unknown argument: {other}")),
            }
        }
        Ok(options)
    }

    /// Load tuning from disk, falling back to defaults on any problem
    fn load_tuning(path: Option<&str>) -> Tuning {
        let Some(path) = path else {
            return Tuning::default();
        };
        let loaded = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|json| Tuning::from_json(&json).map_err(|e| e.to_string()));
        match loaded {
            Ok(tuning) => {
                log::info!("Loaded tuning from {}", path);
                tuning
            }
            Err(e) => {
                log::warn!("Failed to load tuning from {}: {} - using defaults", path, e);
                Tuning::default()
            }
        }
    }

    pub fn run() -> ExitCode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

        let options = match parse_args() {
            Ok(options) => options,
            Err(e) => {
                log::error!("{}", e);
                return ExitCode::FAILURE;
            }
        };

        let tuning = load_tuning(options.tuning_path.as_deref());
        let mut state = SimulationState::with_tuning(options.seed, tuning);
        let input = TickInput {
            autoplay: true,
            ..Default::default()
        };
        log::info!("Tilt Pinball starting (seed {}, {}s)", options.seed, options.seconds);

        let frames = (options.seconds.max(0.0) / HOST_DT).ceil() as u64;
        let mut accumulator = 0.0;
        let mut balls = 0u32;
        for _ in 0..frames {
            accumulator += HOST_DT;
            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                tick(&mut state, &input, SIM_DT);
                accumulator -= SIM_DT;
                substeps += 1;

                balls += state
                    .events
                    .iter()
                    .filter(|e| matches!(e, GameEvent::BallLost { .. }))
                    .count() as u32;
            }
        }

        log::info!(
            "Finished: {} balls played, best score {}",
            balls,
            state.game.history.best().unwrap_or(state.game.score)
        );

        match serde_json::to_string_pretty(&state.snapshot()) {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("Failed to serialize snapshot: {}", e);
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    runner::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation core is driven by the host page on the web
}

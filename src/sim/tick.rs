//! Frame update
//!
//! Advances the simulation by one step: evaluate, flippers, launcher,
//! collisions, integration, reset. The top-3 board is kept current by
//! `ScoreHistory::record` when a ball ends.

use glam::Vec3;

use super::response::collision_pass;
use super::state::{FlipperSide, GameEvent, SimulationState};
use crate::consts::*;

/// Input levels for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Left flipper button held
    pub left_flipper: bool,
    /// Right flipper button held
    pub right_flipper: bool,
    /// Plunger held (pulling back)
    pub plunger: bool,
    /// Reset pressed (one-shot, the host clears it after the tick)
    pub reset: bool,
    /// Demo mode - the simulation drives its own inputs
    pub autoplay: bool,
}

/// Clamp a host-supplied delta into something the integrator can use
fn sanitize_dt(dt: f32) -> f32 {
    if !dt.is_finite() || dt < 0.0 {
        0.0
    } else if dt > MAX_DT {
        log::warn!("Frame delta {:.3}s clamped to {:.3}s", dt, MAX_DT);
        MAX_DT
    } else {
        dt
    }
}

/// Advance the simulation by `dt` seconds
pub fn tick(state: &mut SimulationState, input: &TickInput, dt: f32) {
    let dt = sanitize_dt(dt);
    state.events.clear();

    let input = if input.autoplay {
        autoplay(state, input)
    } else {
        input.clone()
    };

    // Manual resets do not count as a finished ball
    if input.reset {
        state.game.reset_requested = true;
    }

    evaluate(state);

    state.left_flipper.is_active = input.left_flipper;
    state.right_flipper.is_active = input.right_flipper;
    let (speed, return_speed) = (state.tuning.flipper_speed, state.tuning.flipper_return_speed);
    state.left_flipper.advance(dt, speed, return_speed);
    state.right_flipper.advance(dt, speed, return_speed);

    advance_launcher(state, input.plunger, dt);

    if state.launcher.is_launched {
        collision_pass(state);
    }

    if state.game.game_started && state.launcher.is_launched {
        integrate(state, dt);
    }

    if state.game.reset_requested {
        state.reset();
    }

    state.time += f64::from(dt);
    state.time_ticks += 1;
}

/// Drain check, then difficulty
fn evaluate(state: &mut SimulationState) {
    if state.ball.position.y < TABLE_BOTTOM {
        state.lose_ball();
        return;
    }

    let target = state.tuning.level_for_score(state.game.score);
    if target > state.game.difficulty_level {
        state.game.set_level(target, &state.tuning);
        state.events.push(GameEvent::LevelUp {
            level: state.game.difficulty_level,
        });
        log::info!(
            "Difficulty up: level {} (gravity {}, ratio {})",
            state.game.difficulty_level,
            state.game.gravity,
            state.game.bounce_ratio
        );
    }
}

fn advance_launcher(state: &mut SimulationState, held: bool, dt: f32) {
    if held && !state.launcher.is_launched {
        state.game.game_started = true;
    }

    if let Some(power) = state.launcher.advance(held, dt, &state.tuning) {
        state.ball.velocity = Vec3::new(0.0, power, 0.0);
        state.events.push(GameEvent::Launched { power });
        log::info!("Ball launched with power {:.1}", power);
    }

    // An attached ball rides the plunger
    if state.launcher.is_attached {
        state.ball.position = state.launcher.ball_seat(state.ball.radius);
        state.ball.velocity = Vec3::ZERO;
    }
}

/// Gravity, speed cap, then keep the ball between the side walls and below
/// the top wall
fn integrate(state: &mut SimulationState, dt: f32) {
    let gravity = state.game.gravity_vector();
    let max_speed = state.tuning.max_ball_speed;
    let ratio = state.bounce_ratio(None);
    let ball = &mut state.ball;

    ball.velocity += gravity * dt;
    ball.velocity = ball.velocity.clamp_length_max(max_speed);
    ball.position += ball.velocity * dt;
    ball.position.z = 0.0;
    ball.velocity.z = 0.0;

    let inner = WALL_THICKNESS / 2.0 + ball.radius;
    let (min_x, max_x) = (TABLE_LEFT + inner, TABLE_RIGHT - inner);
    let max_y = TABLE_TOP - inner;

    if ball.position.x < min_x {
        ball.position.x = min_x;
        if ball.velocity.x < 0.0 {
            ball.velocity.x = -ball.velocity.x * ratio;
        }
    } else if ball.position.x > max_x {
        ball.position.x = max_x;
        if ball.velocity.x > 0.0 {
            ball.velocity.x = -ball.velocity.x * ratio;
        }
    }
    if ball.position.y > max_y {
        ball.position.y = max_y;
        if ball.velocity.y > 0.0 {
            ball.velocity.y = -ball.velocity.y * ratio;
        }
    }
}

/// How far above the pivot line the autoplay still bothers to flip
const AUTOPLAY_REACH: f32 = 1.5;

/// Demo driver: charge fully, release, then flip whenever the ball comes
/// down near a flipper
fn autoplay(state: &SimulationState, input: &TickInput) -> TickInput {
    let mut input = input.clone();
    let launcher = &state.launcher;

    if !launcher.is_launched {
        // Hold until the plunger bottoms out; letting go launches
        input.plunger = launcher.plunger_y > launcher.stick_lowest;
        input.left_flipper = false;
        input.right_flipper = false;
        return input;
    }

    input.plunger = false;
    let ball = &state.ball;
    let wants_flip = |side: FlipperSide| {
        let flipper = state.flipper(side);
        let near = (ball.position - flipper.pivot).length() < FLIPPER_LENGTH + ball.radius;
        near && ball.position.y < flipper.pivot.y + AUTOPLAY_REACH && ball.velocity.y < 0.0
    };
    // Keep a raised flipper up while the ball is still on it
    input.left_flipper = wants_flip(FlipperSide::Left) || (state.left_flipper.is_active && ball.velocity.y < 0.0);
    input.right_flipper = wants_flip(FlipperSide::Right) || (state.right_flipper.is_active && ball.velocity.y < 0.0);
    input
}

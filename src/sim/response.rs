//! Collision pass and per-obstacle response
//!
//! One pass per frame, in a fixed order: launcher, flippers, then the table
//! obstacles by stage. Each stage sees the ball as left by the previous one.

use glam::Vec3;
use rand::Rng;

use super::arc::ArcWall;
use super::collision::{Contact, reflect_velocity, sphere_box_contact, sphere_circle_contact};
use super::obb::Obb;
use super::state::{ContactKind, FlipperSide, GameEvent, SimulationState};
use super::table::{BoxBody, Bumper, Obstacle, SpeedBump, Wormhole};
use crate::{planar, polar_to_planar};

/// Run the full collision pass
pub fn collision_pass(state: &mut SimulationState) {
    collide_plunger(state);

    // The table is immutable apart from cooldown deadlines; lift it out so
    // responses can borrow the rest of the state mutably
    let mut table = std::mem::take(&mut state.table);
    let flipper_stage = ContactKind::Flipper(FlipperSide::Left).stage();
    let split = table.obstacles.partition_point(|o| o.kind().stage() < flipper_stage);
    let (launch_lane, playfield) = table.obstacles.split_at_mut(split);

    for obstacle in launch_lane {
        respond(state, obstacle);
    }
    collide_flipper(state, FlipperSide::Left);
    collide_flipper(state, FlipperSide::Right);
    for obstacle in playfield {
        respond(state, obstacle);
    }

    state.table = table;
}

/// Single dispatch point for table obstacles
pub fn respond(state: &mut SimulationState, obstacle: &mut Obstacle) {
    if let Some(obb) = obstacle.obb() {
        if !overlaps(state, obb) {
            return;
        }
    }

    let kind = obstacle.kind();
    let contact = match obstacle {
        Obstacle::Wall(body) | Obstacle::Ramp(body) | Obstacle::Barrier(body) => bounce_off_box(state, body),
        Obstacle::Bumper(bumper) => hit_bumper(state, bumper),
        Obstacle::SpeedBump(bump) => hit_speed_bump(state, bump),
        Obstacle::Arc(arc) => slide_along_arc(state, arc),
        Obstacle::Wormhole(wormhole) => enter_wormhole(state, wormhole),
    };

    if let Some(point) = contact {
        state.events.push(GameEvent::Collision { kind, point });
    }
}

/// OBB broad phase against the ball's bounding box
fn overlaps(state: &SimulationState, obb: &Obb) -> bool {
    state.ball.bounding_box().intersects(obb)
}

fn narrow_contact(state: &SimulationState, obb: &Obb) -> Option<Contact> {
    sphere_box_contact(state.ball.position, state.ball.radius, obb, true)
}

/// Broad then narrow phase, for the moving bodies that carry no cached box
fn box_contact(state: &SimulationState, obb: &Obb) -> Option<Contact> {
    if !overlaps(state, obb) {
        return None;
    }
    narrow_contact(state, obb)
}

/// Reflect (when approaching), scale, then push out of the surface
fn reflect_and_separate(state: &mut SimulationState, contact: &Contact, ratio: f32) {
    let epsilon = state.tuning.push_epsilon;
    let ball = &mut state.ball;
    if ball.velocity.dot(contact.normal) < 0.0 {
        ball.velocity = reflect_velocity(ball.velocity, contact.normal) * ratio;
    }
    ball.position = contact.resolve(ball.position, ball.radius, epsilon);
}

fn bounce_off_box(state: &mut SimulationState, body: &BoxBody) -> Option<Vec3> {
    let contact = narrow_contact(state, &body.obb)?;
    let ratio = state.bounce_ratio(body.restitution);
    reflect_and_separate(state, &contact, ratio);
    Some(contact.point)
}

fn hit_bumper(state: &mut SimulationState, bumper: &Bumper) -> Option<Vec3> {
    let ball = &state.ball;
    let contact = sphere_circle_contact(ball.position, ball.radius, bumper.center, bumper.radius)?;
    let n = contact.normal;

    let along = state.ball.velocity.dot(n);
    if along < 0.0 {
        let tangential = state.ball.velocity - n * along;
        let theta = state.rng.random_range(0.0..std::f32::consts::TAU);
        let mut jitter = polar_to_planar(bumper.jitter, theta);
        // Never kick back into the bumper
        if jitter.dot(n) < 0.0 {
            jitter = reflect_velocity(jitter, n);
        }
        state.ball.velocity = tangential + n * (along * bumper.restitution) + jitter;
    }

    let epsilon = state.tuning.push_epsilon;
    state.ball.position = contact.resolve(state.ball.position, state.ball.radius, epsilon);
    state.award(bumper.score);
    Some(contact.point)
}

fn hit_speed_bump(state: &mut SimulationState, bump: &mut SpeedBump) -> Option<Vec3> {
    if !bump.is_ready(state.time) {
        return None;
    }
    let contact = narrow_contact(state, &bump.body.obb)?;

    state.ball.velocity *= bump.multiplier;
    bump.cooldown_until = state.time + f64::from(bump.cooldown);
    state.award(bump.score);
    Some(contact.point)
}

fn slide_along_arc(state: &mut SimulationState, arc: &ArcWall) -> Option<Vec3> {
    let contact = arc.ray_contact(state.ball.position, state.ball.radius)?;
    let n = contact.normal;

    let ball = &mut state.ball;
    if ball.velocity.normalize_or_zero().dot(n) <= state.tuning.arc_tolerance {
        ball.velocity = planar(reflect_velocity(ball.velocity, n) * state.tuning.arc_damping);
    }

    // Back inside the polyline so the same segment does not fire again
    let limit = arc.inscribed_radius() - ball.radius - state.tuning.push_epsilon;
    let offset = planar(ball.position - arc.center);
    if offset.length() > limit {
        ball.position = arc.center + offset.normalize_or_zero() * limit;
    }
    Some(contact.point)
}

fn enter_wormhole(state: &mut SimulationState, wormhole: &Wormhole) -> Option<Vec3> {
    if state.time < state.wormhole_guard_until {
        return None;
    }
    if planar(state.ball.position - wormhole.center).length() > wormhole.radius {
        return None;
    }

    let from = state.ball.position;
    let speed = state.ball.speed();
    let theta = state.rng.random_range(0.0..std::f32::consts::TAU);
    state.ball.position = planar(wormhole.exit);
    state.ball.velocity = polar_to_planar(speed, theta);
    state.wormhole_guard_until = state.time + f64::from(wormhole.guard);

    state.events.push(GameEvent::Teleported {
        from,
        to: state.ball.position,
    });
    log::debug!("Wormhole teleport {:?} -> {:?}", from, state.ball.position);
    state.award(wormhole.score);
    Some(from)
}

/// Flipper response
///
/// A held flipper multiplies the bounce by the kick, a released one damps
/// it. While the blade is still swinging the ball is reflected in the frame
/// of its moving surface.
pub fn collide_flipper(state: &mut SimulationState, side: FlipperSide) {
    let flipper = state.flipper(side);
    let obb = flipper.obb();
    let Some(contact) = box_contact(state, &obb) else {
        return;
    };

    let surface = if flipper.is_swinging() {
        flipper.surface_velocity(contact.point)
    } else {
        Vec3::ZERO
    };
    let factor = if flipper.is_active {
        state.tuning.flipper_active_kick
    } else {
        state.tuning.flipper_passive_damping
    };
    let ratio = state.bounce_ratio(None);
    let epsilon = state.tuning.push_epsilon;

    let ball = &mut state.ball;
    let relative = ball.velocity - surface;
    if relative.dot(contact.normal) < 0.0 {
        let reflected = reflect_velocity(relative, contact.normal) * ratio + surface;
        ball.velocity = planar(reflected * factor);
    }
    ball.position = contact.resolve(ball.position, ball.radius, epsilon);

    state.events.push(GameEvent::Collision {
        kind: ContactKind::Flipper(side),
        point: contact.point,
    });
}

/// Plunger head: a ball falling back onto it ends the ball
pub fn collide_plunger(state: &mut SimulationState) {
    if !state.launcher.is_launched || state.ball.velocity.y >= 0.0 {
        return;
    }
    let obb = state.launcher.plunger_obb();
    let Some(contact) = box_contact(state, &obb) else {
        return;
    };

    state.events.push(GameEvent::Collision {
        kind: ContactKind::Plunger,
        point: contact.point,
    });
    state.events.push(GameEvent::FailedLaunch);
    log::debug!("Failed launch at score {}", state.game.score);
    state.lose_ball();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tuning;
    use crate::consts::*;
    use crate::sim::table::Table;
    use proptest::prelude::*;

    fn launched(table: Table) -> SimulationState {
        let mut state = SimulationState::with_table(7, Tuning::default(), table);
        state.launcher.is_attached = false;
        state.launcher.is_launched = true;
        state.game.game_started = true;
        state
    }

    fn wall_at(x: f32) -> Table {
        Table::new(vec![Obstacle::Wall(BoxBody::new(
            Vec3::new(x, 0.0, 0.0),
            Vec3::new(0.5, 5.0, 1.0),
            0.0,
        ))])
    }

    fn bumper_table() -> Table {
        let tuning = Tuning::default();
        Table::new(vec![Obstacle::Bumper(Bumper {
            center: Vec3::ZERO,
            radius: BUMPER_RADIUS,
            restitution: tuning.bumper_restitution,
            jitter: tuning.bumper_jitter,
            score: tuning.bumper_score,
        })])
    }

    #[test]
    fn test_wall_reflection_scaled_by_ratio() {
        let mut state = launched(wall_at(1.0));
        // 0.2 into the wall's right face, moving into it
        state.ball.position = Vec3::new(1.8, 0.0, 0.0);
        state.ball.velocity = Vec3::new(-5.0, 0.0, 0.0);
        let ratio = state.bounce_ratio(None);
        collision_pass(&mut state);

        assert!((state.ball.velocity - Vec3::new(5.0 * ratio, 0.0, 0.0)).length() < 1e-5);
        assert!(state.ball.position.x >= 1.5 + 0.5);
        assert!(matches!(
            state.events[0],
            GameEvent::Collision { kind: ContactKind::Wall, .. }
        ));
    }

    #[test]
    fn test_separating_ball_only_pushed_out() {
        let mut state = launched(wall_at(1.0));
        state.ball.position = Vec3::new(1.8, 0.0, 0.0);
        state.ball.velocity = Vec3::new(3.0, 0.0, 0.0);
        collision_pass(&mut state);
        assert_eq!(state.ball.velocity, Vec3::new(3.0, 0.0, 0.0));
        assert!(state.ball.position.x > 1.8);
    }

    #[test]
    fn test_ramp_override_restitution() {
        let tuning = Tuning::default();
        let body = BoxBody::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 5.0, 1.0), 0.0)
            .with_restitution(tuning.ramp_restitution);
        let mut state = launched(Table::new(vec![Obstacle::Ramp(body)]));
        state.ball.position = Vec3::new(0.2, 0.0, 0.0);
        state.ball.velocity = Vec3::new(4.0, 0.0, 0.0);
        collision_pass(&mut state);
        assert!((state.ball.velocity.x + 4.0 * tuning.ramp_restitution).abs() < 1e-5);
    }

    #[test]
    fn test_bumper_inverts_normal_and_scores() {
        let mut state = launched(bumper_table());
        state.ball.position = Vec3::new(0.0, 1.4, 0.0);
        state.ball.velocity = Vec3::new(0.0, -6.0, 0.0);
        collision_pass(&mut state);

        assert_eq!(state.game.score, 1);
        // 6 * 0.88 outward, jitter never points inward
        assert!(state.ball.velocity.y >= 6.0 * 0.88 - 1e-5);
        assert!(state.ball.velocity.y <= 6.0 * 0.88 + 0.3 + 1e-5);
        assert!(state.ball.position.y >= 1.5);
    }

    #[test]
    fn test_bumper_keeps_tangential_velocity() {
        let mut state = launched(bumper_table());
        state.ball.position = Vec3::new(0.0, 1.4, 0.0);
        state.ball.velocity = Vec3::new(2.0, -6.0, 0.0);
        let jitter = state.tuning.bumper_jitter;
        collision_pass(&mut state);

        // Normal (+y) inverted and damped, tangential (x) carried over
        assert!((state.ball.velocity.x - 2.0).abs() <= jitter + 1e-5);
        assert!(state.ball.velocity.y >= 6.0 * 0.88 - 1e-5);
    }

    #[test]
    fn test_speed_bump_cooldown() {
        let tuning = Tuning::default();
        let bump = SpeedBump {
            body: BoxBody::new(Vec3::ZERO, SPEED_BUMP_HALF_EXTENTS, 0.0),
            multiplier: tuning.speed_bump_multiplier,
            score: tuning.speed_bump_score,
            cooldown: tuning.speed_bump_cooldown,
            cooldown_until: 0.0,
        };
        let mut state = launched(Table::new(vec![Obstacle::SpeedBump(bump)]));
        state.ball.position = Vec3::new(0.0, 0.3, 0.0);
        state.ball.velocity = Vec3::new(2.0, 0.0, 0.0);

        collision_pass(&mut state);
        assert!((state.ball.velocity.x - 2.6).abs() < 1e-5);
        assert_eq!(state.game.score, 1);
        // Rolls over: no push-out
        assert_eq!(state.ball.position, Vec3::new(0.0, 0.3, 0.0));

        state.time = 0.5;
        collision_pass(&mut state);
        assert_eq!(state.game.score, 1);

        state.time = 1.0;
        collision_pass(&mut state);
        assert_eq!(state.game.score, 2);
    }

    #[test]
    fn test_arc_reflects_and_pulls_inside() {
        let arc = ArcWall::new(ARC_CENTER, ARC_RADIUS, 0.0, std::f32::consts::FRAC_PI_2, ARC_SEGMENTS);
        let limit = arc.inscribed_radius() - BALL_RADIUS;
        let mut state = launched(Table::new(vec![Obstacle::Arc(arc)]));
        let dir = polar_to_planar(1.0, std::f32::consts::FRAC_PI_4);
        state.ball.position = ARC_CENTER + dir * 4.7;
        state.ball.velocity = dir * 10.0;

        collision_pass(&mut state);
        assert!(state.ball.velocity.dot(dir) < 0.0);
        assert!((state.ball.speed() - 10.0 * 0.98).abs() < 1e-3);
        assert!((state.ball.position - ARC_CENTER).length() < limit);
    }

    #[test]
    fn test_plunger_failed_launch() {
        let mut state = launched(Table::default());
        state.ball.position = state.launcher.ball_seat(BALL_RADIUS) - Vec3::new(0.0, 0.1, 0.0);
        state.ball.velocity = Vec3::new(0.0, -3.0, 0.0);
        state.game.score = 4;
        collision_pass(&mut state);

        assert!(state.game.reset_requested);
        assert_eq!(state.game.history.entries, vec![4]);
        assert!(state.events.contains(&GameEvent::FailedLaunch));
    }

    #[test]
    fn test_plunger_ignores_rising_ball() {
        let mut state = launched(Table::default());
        state.ball.position = state.launcher.ball_seat(BALL_RADIUS);
        state.ball.velocity = Vec3::new(0.0, 20.0, 0.0);
        collision_pass(&mut state);
        assert!(!state.game.reset_requested);
    }

    #[test]
    fn test_swinging_flipper_launches_resting_ball() {
        let mut state = launched(Table::default());
        let tuning = state.tuning.clone();
        let flipper = &mut state.left_flipper;
        flipper.is_active = true;
        flipper.advance(SIM_DT, tuning.flipper_speed, tuning.flipper_return_speed);

        // Resting on the blade's upper face, near the tip
        let obb = state.left_flipper.obb();
        state.ball.position = obb.to_world(Vec3::new(2.0, 0.25 + 0.45, 0.0));
        state.ball.velocity = Vec3::ZERO;
        collision_pass(&mut state);

        assert!(state.ball.velocity.y > 0.0);
    }

    #[test]
    fn test_resting_flipper_damps() {
        let mut state = launched(Table::default());
        let obb = state.left_flipper.obb();
        let up = obb.axes[1];
        state.ball.position = obb.to_world(Vec3::new(0.5, 0.25 + 0.45, 0.0));
        state.ball.velocity = -up * 5.0;
        collision_pass(&mut state);

        assert!(!state.left_flipper.is_active);
        let expected = 5.0 * state.bounce_ratio(None) * state.tuning.flipper_passive_damping;
        assert!((state.ball.speed() - expected).abs() < 1e-4);
        assert!(state.ball.velocity.dot(up) > 0.0);
    }

    #[test]
    fn test_held_flipper_kicks() {
        let mut state = launched(Table::default());
        let tuning = state.tuning.clone();
        let flipper = &mut state.left_flipper;
        flipper.is_active = true;
        for _ in 0..60 {
            flipper.advance(SIM_DT, tuning.flipper_speed, tuning.flipper_return_speed);
        }
        // Raised and no longer moving
        assert_eq!(state.left_flipper.angle, state.left_flipper.max_angle);
        assert!(!state.left_flipper.is_swinging());

        let obb = state.left_flipper.obb();
        let up = obb.axes[1];
        state.ball.position = obb.to_world(Vec3::new(0.5, 0.25 + 0.45, 0.0));
        state.ball.velocity = -up * 5.0;
        collision_pass(&mut state);

        // 5 * 0.8 * 1.3
        let expected = 5.0 * state.bounce_ratio(None) * tuning.flipper_active_kick;
        assert!((expected - 5.2).abs() < 1e-4);
        assert!((state.ball.speed() - expected).abs() < 1e-4);
        assert!(state.ball.velocity.dot(up) > 0.0);
    }

    #[test]
    fn test_broad_phase_skips_distant_box() {
        let mut state = launched(wall_at(1.0));
        state.ball.position = Vec3::new(-3.0, 0.0, 0.0);
        state.ball.velocity = Vec3::new(4.0, 0.0, 0.0);
        let mut obstacle = state.table.obstacles[0].clone();
        respond(&mut state, &mut obstacle);
        assert!(state.events.is_empty());
        assert_eq!(state.ball.velocity, Vec3::new(4.0, 0.0, 0.0));
    }

    proptest! {
        #[test]
        fn prop_passive_bounces_do_not_create_energy(
            x in -1.5f32..1.5,
            y in -1.5f32..1.5,
            vx in -20.0f32..20.0,
            vy in -20.0f32..20.0,
            angle in -3.1f32..3.1,
        ) {
            let body = BoxBody::new(Vec3::ZERO, Vec3::new(1.5, 0.4, 1.0), angle);
            let mut state = launched(Table::new(vec![Obstacle::Wall(body.clone())]));
            state.ball.position = Vec3::new(x, y, 0.0);
            state.ball.velocity = Vec3::new(vx, vy, 0.0);
            let velocity = state.ball.velocity;
            let before = state.ball.speed();
            let ratio = state.bounce_ratio(None);
            let contact = sphere_box_contact(state.ball.position, state.ball.radius, &body.obb, true);
            collision_pass(&mut state);

            match contact {
                Some(c) if velocity.dot(c.normal) < 0.0 => {
                    prop_assert!(state.ball.speed() <= before * ratio + 1e-3);
                }
                _ => prop_assert_eq!(state.ball.velocity, velocity),
            }
            let after = sphere_box_contact(state.ball.position, state.ball.radius, &body.obb, true);
            prop_assert!(after.is_none_or(|c| c.distance >= state.ball.radius - 1e-4));
        }

        #[test]
        fn prop_wormhole_preserves_speed(vx in -30.0f32..30.0, vy in -30.0f32..30.0, seed in any::<u64>()) {
            let [a, b] = WORMHOLE_POSITIONS;
            let tuning = Tuning::default();
            let table = Table::new(vec![Obstacle::Wormhole(Wormhole {
                center: a,
                radius: WORMHOLE_RADIUS,
                exit: b,
                score: tuning.wormhole_score,
                guard: tuning.wormhole_guard,
            })]);
            let mut state = SimulationState::with_table(seed, tuning, table);
            state.launcher.is_launched = true;
            state.ball.position = a;
            state.ball.velocity = Vec3::new(vx, vy, 0.0);
            let before = state.ball.speed();
            collision_pass(&mut state);

            prop_assert_eq!(state.ball.position, b);
            prop_assert!((state.ball.speed() - before).abs() <= before * 1e-4 + 1e-4);
        }
    }
}

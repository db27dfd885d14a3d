//! Headless sandbox: runs a full merge-drop game without a window.
//!
//! Drops a random fruit every second and a half at a random horizontal
//! position, settles first-drops on contact, merges equal-kind pairs, and
//! triggers the game-over explosion sequence when a settled fruit crosses
//! the max line. Run with `RUST_LOG=info` for the play-by-play.

use glam::Vec2;
use suika_core::{
    ActiveFruits, Catalog, CollisionPair, GameContext, Mode, Rng, FIRST_DROP_TAG, MAX_LINE_TAG,
};

const WIDTH: f32 = 480.0;
const HEIGHT: f32 = 640.0;
const WALL_THICKNESS: f32 = 20.0;
const MAX_LINE_Y: f32 = HEIGHT - 120.0;

const FIXED_DT: f32 = 1.0 / 60.0;
/// Host frame rate deliberately off the tick rate to exercise accumulation.
const FRAME_DT: f32 = 1.0 / 50.0;
const DROP_INTERVAL: f64 = 1.5;
const MAX_SECONDS: f64 = 120.0;

fn build_container(ctx: &mut GameContext) {
    let half_w = WIDTH / 2.0;
    let half_t = WALL_THICKNESS / 2.0;
    // Floor, then the two side walls.
    ctx.physics.create_wall(
        Vec2::new(half_w, -half_t),
        Vec2::new(half_w + WALL_THICKNESS, half_t),
    );
    ctx.physics.create_wall(
        Vec2::new(-half_t, HEIGHT / 2.0),
        Vec2::new(half_t, HEIGHT / 2.0),
    );
    ctx.physics.create_wall(
        Vec2::new(WIDTH + half_t, HEIGHT / 2.0),
        Vec2::new(half_t, HEIGHT / 2.0),
    );
    ctx.physics
        .create_max_line(Vec2::new(half_w, MAX_LINE_Y), Vec2::new(half_w, 2.0));
}

fn handle_collision(pair: &CollisionPair, active: &mut ActiveFruits, ctx: &mut GameContext) {
    if !pair.started {
        return;
    }

    // First contact settles a falling fruit into normal play.
    for (id, tag) in [(pair.id_a, pair.tag_a), (pair.id_b, pair.tag_b)] {
        if tag == FIRST_DROP_TAG {
            if let Some(fruit) = active.get_mut(id) {
                let speed = fruit.scalar_velocity(&ctx.physics);
                log::info!("{} settled at {:.0} px/s", fruit, speed);
                fruit.normal(&mut ctx.physics, &mut ctx.stage);
            }
        }
    }

    // A settled fruit touching the max line means the container is full.
    if pair.tag_a == MAX_LINE_TAG || pair.tag_b == MAX_LINE_TAG {
        active.game_over(ctx);
        return;
    }

    // Equal kind tags merge toward their midpoint.
    let same_kind = pair.tag_a == pair.tag_b && active.catalog().is_valid(pair.tag_a as u8);
    if same_kind {
        if let Some(id) = active.merge_pair(pair.id_a, pair.id_b, ctx) {
            log::info!(
                "merged {:?} + {:?} -> {}",
                pair.id_a,
                pair.id_b,
                active.get(id).map(|f| f.name()).unwrap_or("?")
            );
        }
    }
}

/// Blink the pending fruit while the stack is close to the max line.
fn update_warning_blink(active: &mut ActiveFruits, ctx: &mut GameContext) {
    let crowded = active.iter().any(|f| {
        f.mode() == Mode::Normal
            && f.position(&ctx.physics).y + f.base_radius() > MAX_LINE_Y - 60.0
    });
    let now = ctx.now();
    if let Some(pending) = active.pending_mut() {
        pending.blink(crowded, now, &mut ctx.stage);
    }
}

fn tick(active: &mut ActiveFruits, ctx: &mut GameContext, next_drop: &mut f64, rng: &mut Rng) {
    ctx.step();

    let events: Vec<CollisionPair> = ctx.collisions().to_vec();
    for pair in &events {
        handle_collision(pair, active, ctx);
    }

    if !active.is_game_over() && ctx.now() >= *next_drop {
        if let Some(radius) = active.pending().map(|p| p.base_radius()) {
            let x = rng.next_range(radius + WALL_THICKNESS, WIDTH - radius - WALL_THICKNESS);
            active.drop_next(Vec2::new(x, HEIGHT - radius), ctx);
            active.prepare_random(ctx);
            *next_drop = ctx.now() + DROP_INTERVAL;
        }
    }

    update_warning_blink(active, ctx);
    active.update(ctx);
    active.cleanup(ctx);
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut ctx = GameContext::new(Vec2::new(0.0, -981.0), FIXED_DT);
    build_container(&mut ctx);

    let mut active = ActiveFruits::new(Catalog::mini(), WIDTH, HEIGHT, 0x5EED);
    let mut rng = Rng::new(0xD1CE);
    active.prepare_random(&mut ctx);
    let mut next_drop = DROP_INTERVAL;

    'frames: loop {
        let steps = ctx.clock.accumulate(FRAME_DT);
        for _ in 0..steps {
            tick(&mut active, &mut ctx, &mut next_drop, &mut rng);

            if active.is_game_over() && active.is_empty() {
                log::info!("teardown finished at t={:.2}s", ctx.now());
                break 'frames;
            }
            if ctx.now() > MAX_SECONDS {
                log::info!("time limit reached");
                break 'frames;
            }
        }
    }

    log::info!("final score: {}", active.score());
}

//! The active-fruit collection: owns every live fruit plus the single
//! pending "next" fruit, hands out ids, accumulates score and drives the
//! timed merge/game-over sequences.
//!
//! Fruits are stored in a `BTreeMap` keyed by id. Ids are allocated
//! monotonically by this collection and never reused, so iteration order is
//! creation order and the newest eligible fruit is always the last eligible
//! entry. The game-over explosion sequence leans on that.

use std::collections::BTreeMap;

use glam::Vec2;

use crate::catalog::Catalog;
use crate::context::GameContext;
use crate::core::rng::Rng;
use crate::fruit::{Fruit, FruitId};
use crate::modes::Mode;
use crate::scheduler::{ScheduledAction, Scheduler};
use crate::tuning::{
    GAMEOVER_ANIMATION_INTERVAL, GAMEOVER_ANIMATION_START, NEXT_FRUIT_MARGIN,
};

pub struct ActiveFruits {
    catalog: Catalog,
    fruits: BTreeMap<FruitId, Fruit>,
    /// Staged for the next drop, not part of the active set.
    pending: Option<Fruit>,
    next_id: u64,
    score: u32,
    window_width: f32,
    window_height: f32,
    game_over: bool,
    scheduler: Scheduler,
    rng: Rng,
}

impl ActiveFruits {
    pub fn new(catalog: Catalog, window_width: f32, window_height: f32, seed: u64) -> Self {
        Self {
            catalog,
            fruits: BTreeMap::new(),
            pending: None,
            // Id 0 is the sentinel reported for walls and other non-fruit
            // bodies in collision events; fruit ids start above it.
            next_id: 1,
            score: 0,
            window_width,
            window_height,
            game_over: false,
            scheduler: Scheduler::new(),
            rng: Rng::new(seed),
        }
    }

    // -- observers --

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Number of fruits in the active set, including already-removed
    /// entries not yet swept by [`ActiveFruits::cleanup`].
    pub fn len(&self) -> usize {
        self.fruits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fruits.is_empty()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn get(&self, id: FruitId) -> Option<&Fruit> {
        self.fruits.get(&id)
    }

    pub fn get_mut(&mut self, id: FruitId) -> Option<&mut Fruit> {
        self.fruits.get_mut(&id)
    }

    pub fn pending(&self) -> Option<&Fruit> {
        self.pending.as_ref()
    }

    pub fn pending_mut(&mut self) -> Option<&mut Fruit> {
        self.pending.as_mut()
    }

    /// Iterate the active set in id (creation) order.
    pub fn iter(&self) -> impl Iterator<Item = &Fruit> {
        self.fruits.values()
    }

    fn alloc_id(&mut self) -> FruitId {
        let id = FruitId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Preview slot for the pending fruit of radius `radius`: centered
    /// horizontally, just under the top edge.
    fn preview_slot(&self, radius: f32) -> Vec2 {
        Vec2::new(
            self.window_width / 2.0,
            self.window_height - radius - NEXT_FRUIT_MARGIN,
        )
    }

    // -- spawning --

    /// Stage the next fruit in its preview slot, mode `Wait`. Logged no-op
    /// if one is already pending or the game is over.
    pub fn prepare_next(&mut self, kind: u8, ctx: &mut GameContext) {
        if self.game_over {
            log::info!("prepare_next ignored, game over");
            return;
        }
        if let Some(pending) = &self.pending {
            log::warn!("prepare_next ignored, {} already pending", pending);
            return;
        }
        let id = self.alloc_id();
        let pos = self.preview_slot(self.catalog.def(kind).radius);
        let fruit = Fruit::new(id, kind, &self.catalog, pos, &mut ctx.physics, &mut ctx.stage);
        log::info!("prepared {}", fruit);
        self.pending = Some(fruit);
    }

    /// [`ActiveFruits::prepare_next`] with a kind sampled from the
    /// droppable subset of the catalog.
    pub fn prepare_random(&mut self, ctx: &mut GameContext) {
        let kind = self.catalog.random_kind(&mut self.rng);
        self.prepare_next(kind, ctx);
    }

    /// Release the pending fruit at `pos`: it joins the active set in mode
    /// `FirstDrop` and the pending slot empties. Returns the dropped
    /// fruit's id, or `None` when nothing was pending or the game is over.
    pub fn drop_next(&mut self, pos: Vec2, ctx: &mut GameContext) -> Option<FruitId> {
        if self.game_over {
            return None;
        }
        let mut fruit = self.pending.take()?;
        fruit.set_position(pos, &mut ctx.physics);
        fruit.drop(&mut ctx.physics, &mut ctx.stage);
        let id = fruit.id();
        log::info!("dropped {}", fruit);
        self.fruits.insert(id, fruit);
        Some(id)
    }

    /// Materialize a fruit directly into the active set with a fade-in,
    /// bypassing the drop sequence. Used for merge results.
    pub fn spawn(&mut self, kind: u8, pos: Vec2, ctx: &mut GameContext) -> FruitId {
        let id = self.alloc_id();
        let mut fruit = Fruit::new(id, kind, &self.catalog, pos, &mut ctx.physics, &mut ctx.stage);
        fruit.fade_in(ctx.now(), &mut ctx.physics, &mut ctx.stage);
        log::info!("spawned {}", fruit);
        self.fruits.insert(id, fruit);
        id
    }

    // -- merging --

    /// Send one fruit converging toward `dest`; its removal is scheduled at
    /// the merge delay. Lookup-miss is a no-op.
    pub fn merge_to(&mut self, id: FruitId, dest: Vec2, ctx: &mut GameContext) {
        if let Some(fruit) = self.fruits.get_mut(&id) {
            fruit.merge_to(
                dest,
                ctx.now(),
                &mut ctx.physics,
                &mut ctx.stage,
                &mut self.scheduler,
            );
        }
    }

    /// Merge a colliding same-kind pair: both converge on their midpoint
    /// and the next larger kind fades in there. Returns the new fruit's id,
    /// or `None` when the pair was invalid, mismatched, already merging, or
    /// of the terminal kind.
    pub fn merge_pair(
        &mut self,
        a: FruitId,
        b: FruitId,
        ctx: &mut GameContext,
    ) -> Option<FruitId> {
        let (kind, midpoint) = {
            let fa = self.fruits.get(&a)?;
            let fb = self.fruits.get(&b)?;
            if fa.kind() != fb.kind() {
                return None;
            }
            if fa.mode() == Mode::Merge || fb.mode() == Mode::Merge {
                return None;
            }
            (
                fa.kind(),
                (fa.position(&ctx.physics) + fb.position(&ctx.physics)) / 2.0,
            )
        };
        self.merge_to(a, midpoint, ctx);
        self.merge_to(b, midpoint, ctx);
        if kind < self.catalog.kind_count() {
            Some(self.spawn(kind + 1, midpoint, ctx))
        } else {
            None
        }
    }

    // -- removal --

    /// Remove a fruit by id, crediting its points to the score. Returns the
    /// points (0 if absent or already removed). The entry stays in the map
    /// until the next [`ActiveFruits::cleanup`].
    pub fn remove(&mut self, id: FruitId, ctx: &mut GameContext) -> u32 {
        let Some(fruit) = self.fruits.get_mut(&id) else {
            return 0;
        };
        let points = fruit.remove(&mut ctx.physics, &mut ctx.stage);
        self.score += points;
        points
    }

    /// Discard the pending fruit, crediting its points like any other
    /// removal. Returns 0 when nothing was pending.
    pub fn remove_next(&mut self, ctx: &mut GameContext) -> u32 {
        let Some(mut pending) = self.pending.take() else {
            return 0;
        };
        let points = pending.remove(&mut ctx.physics, &mut ctx.stage);
        self.score += points;
        points
    }

    /// Remove every active fruit and sweep the map. Returns the summed
    /// points.
    pub fn remove_all(&mut self, ctx: &mut GameContext) -> u32 {
        let ids: Vec<FruitId> = self.fruits.keys().copied().collect();
        let mut total = 0;
        for id in ids {
            total += self.remove(id, ctx);
        }
        self.cleanup(ctx);
        total
    }

    /// Two-phase sweep: force-remove live fruits that escaped below the
    /// window, then drop `Removed` entries from the map.
    pub fn cleanup(&mut self, ctx: &mut GameContext) {
        let escaped: Vec<FruitId> = self
            .fruits
            .values()
            .filter(|f| !f.is_removed() && f.is_offscreen(&ctx.physics, self.window_height))
            .map(|f| f.id())
            .collect();
        for id in escaped {
            log::warn!("fruit {:?} fell offscreen, removing", id);
            self.remove(id, ctx);
        }
        self.fruits.retain(|_, f| !f.is_removed());
    }

    // -- game over / reset --

    /// Enter game-over: the pending fruit is removed (its points still
    /// count) and a staggered explosion sequence starts after a short
    /// pause. Each step explodes the newest fruit still in play and
    /// reschedules itself while any fruit remains.
    pub fn game_over(&mut self, ctx: &mut GameContext) {
        if self.game_over {
            return;
        }
        log::info!("game over, score {}", self.score);
        self.game_over = true;
        self.remove_next(ctx);
        self.scheduler.schedule(
            ctx.now() + GAMEOVER_ANIMATION_START,
            ScheduledAction::ExplosionStep,
        );
    }

    fn explosion_step(&mut self, ctx: &mut GameContext) {
        let target = self
            .fruits
            .values()
            .filter(|f| matches!(f.mode(), Mode::Normal | Mode::FirstDrop))
            .map(|f| f.id())
            .max();
        if let Some(id) = target {
            if let Some(fruit) = self.fruits.get_mut(&id) {
                fruit.explode(ctx.now(), &mut ctx.physics, &mut ctx.stage);
            }
        }
        if !self.fruits.is_empty() {
            self.scheduler.schedule(
                ctx.now() + GAMEOVER_ANIMATION_INTERVAL,
                ScheduledAction::ExplosionStep,
            );
        }
    }

    /// Back to a fresh game: no fruits, no pending, zero score.
    pub fn reset(&mut self, ctx: &mut GameContext) {
        self.game_over = false;
        self.scheduler.clear();
        self.remove_all(ctx);
        self.remove_next(ctx);
        self.score = 0;
    }

    // -- per-tick driving --

    /// Once per tick: fire due scheduled actions, then push physics state
    /// into every visual proxy. Fruits whose explosion finished are removed
    /// here.
    pub fn update(&mut self, ctx: &mut GameContext) {
        let now = ctx.now();
        for action in self.scheduler.drain_due(now) {
            match action {
                ScheduledAction::RemoveFruit(id) => {
                    self.remove(id, ctx);
                }
                ScheduledAction::ExplosionStep => self.explosion_step(ctx),
            }
        }

        if let Some(pending) = &mut self.pending {
            pending.update(now, &mut ctx.physics, &mut ctx.stage);
        }
        let mut exploded = Vec::new();
        for fruit in self.fruits.values_mut() {
            if fruit.update(now, &mut ctx.physics, &mut ctx.stage) {
                exploded.push(fruit.id());
            }
        }
        for id in exploded {
            self.remove(id, ctx);
        }
    }

    /// Track a window resize and move the pending fruit's preview slot.
    pub fn on_resize(&mut self, width: f32, height: f32, ctx: &mut GameContext) {
        self.window_width = width;
        self.window_height = height;
        if let Some(pending) = &mut self.pending {
            pending.on_resize(width, height, &mut ctx.physics);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modes::FIRST_DROP_TAG;
    use crate::tuning::{EXPLOSION_DELAY, MERGE_DELAY};

    const W: f32 = 600.0;
    const H: f32 = 960.0;

    fn setup() -> (ActiveFruits, GameContext) {
        let ctx = GameContext::new(Vec2::new(0.0, -981.0), 1.0 / 60.0);
        let active = ActiveFruits::new(Catalog::standard(), W, H, 42);
        (active, ctx)
    }

    #[test]
    fn prepare_then_drop_moves_pending_into_the_active_set() {
        let (mut active, mut ctx) = setup();

        active.prepare_next(1, &mut ctx);
        let pending = active.pending().unwrap();
        assert_eq!(pending.mode(), Mode::Wait);
        let slot = pending.position(&ctx.physics);
        assert!((slot.x - W / 2.0).abs() < 1e-4);
        assert_eq!(active.len(), 0);

        let id = active.drop_next(Vec2::new(100.0, 100.0), &mut ctx).unwrap();
        assert!(active.pending().is_none());
        assert_eq!(active.len(), 1);
        let fruit = active.get(id).unwrap();
        assert_eq!(fruit.mode(), Mode::FirstDrop);
        assert_eq!(fruit.collision_tag(&ctx.physics), FIRST_DROP_TAG);
    }

    #[test]
    fn duplicate_prepare_is_ignored() {
        let (mut active, mut ctx) = setup();
        active.prepare_next(1, &mut ctx);
        active.prepare_next(3, &mut ctx);
        assert_eq!(active.pending().unwrap().kind(), 1);
    }

    #[test]
    fn drop_without_pending_is_a_no_op() {
        let (mut active, mut ctx) = setup();
        assert_eq!(active.drop_next(Vec2::new(100.0, 100.0), &mut ctx), None);
        assert_eq!(active.len(), 0);
    }

    #[test]
    fn random_prepare_only_yields_droppable_kinds() {
        let (mut active, mut ctx) = setup();
        for _ in 0..20 {
            active.prepare_random(&mut ctx);
            let kind = active.pending().unwrap().kind();
            assert!(active.catalog().droppable().contains(&kind));
            let id = active.drop_next(Vec2::new(100.0, 500.0), &mut ctx).unwrap();
            active.remove(id, &mut ctx);
        }
    }

    #[test]
    fn merge_removes_both_after_the_delay() {
        let (mut active, mut ctx) = setup();
        let pos = Vec2::new(200.0, 300.0);
        let a = active.spawn(1, pos, &mut ctx);
        let b = active.spawn(1, pos, &mut ctx);
        assert_eq!(active.len(), 2);

        let dest = Vec2::new(210.0, 300.0);
        active.merge_to(a, dest, &mut ctx);
        active.merge_to(b, dest, &mut ctx);
        assert_eq!(active.get(a).unwrap().mode(), Mode::Merge);
        assert_eq!(active.get(b).unwrap().mode(), Mode::Merge);

        ctx.clock.advance(MERGE_DELAY + 0.01);
        active.update(&mut ctx);
        assert!(active.get(a).unwrap().is_removed());
        assert!(active.get(b).unwrap().is_removed());
        assert_eq!(active.score(), 2);

        active.cleanup(&mut ctx);
        assert_eq!(active.len(), 0);
    }

    #[test]
    fn merge_pair_spawns_the_next_kind_at_the_midpoint() {
        let (mut active, mut ctx) = setup();
        let a = active.spawn(2, Vec2::new(200.0, 300.0), &mut ctx);
        let b = active.spawn(2, Vec2::new(240.0, 300.0), &mut ctx);

        let merged = active.merge_pair(a, b, &mut ctx).unwrap();
        let fruit = active.get(merged).unwrap();
        assert_eq!(fruit.kind(), 3);
        let pos = fruit.position(&ctx.physics);
        assert!((pos.x - 220.0).abs() < 1e-3);

        // Re-reporting the same collision must not spawn again.
        assert_eq!(active.merge_pair(a, b, &mut ctx), None);
    }

    #[test]
    fn merge_pair_rejects_mismatched_kinds_and_terminal_kind() {
        let (mut active, mut ctx) = setup();
        let a = active.spawn(1, Vec2::new(200.0, 300.0), &mut ctx);
        let b = active.spawn(2, Vec2::new(210.0, 300.0), &mut ctx);
        assert_eq!(active.merge_pair(a, b, &mut ctx), None);

        let top = active.catalog().kind_count();
        let c = active.spawn(top, Vec2::new(300.0, 300.0), &mut ctx);
        let d = active.spawn(top, Vec2::new(310.0, 300.0), &mut ctx);
        assert_eq!(active.merge_pair(c, d, &mut ctx), None);
        // Both still converge and get removed even without a successor.
        assert_eq!(active.get(c).unwrap().mode(), Mode::Merge);
        assert_eq!(active.get(d).unwrap().mode(), Mode::Merge);
    }

    #[test]
    fn remove_next_discards_and_credits_the_pending_fruit() {
        let (mut active, mut ctx) = setup();
        assert_eq!(active.remove_next(&mut ctx), 0);

        active.prepare_next(3, &mut ctx);
        assert_eq!(active.remove_next(&mut ctx), 3);
        assert!(active.pending().is_none());
        assert_eq!(active.score(), 3);
        assert_eq!(ctx.physics.body_count(), 0);
    }

    #[test]
    fn removing_an_unknown_id_returns_zero() {
        let (mut active, mut ctx) = setup();
        assert_eq!(active.remove(FruitId(999), &mut ctx), 0);
    }

    #[test]
    fn remove_all_then_cleanup_leaves_the_set_empty() {
        let (mut active, mut ctx) = setup();
        for kind in [1, 2, 3] {
            active.spawn(kind, Vec2::new(100.0, 500.0), &mut ctx);
        }
        assert_eq!(active.remove_all(&mut ctx), 6);
        assert_eq!(active.len(), 0);
        assert_eq!(ctx.physics.body_count(), 0);
        assert!(ctx.stage.is_empty());
    }

    #[test]
    fn cleanup_removes_offscreen_escapees() {
        let (mut active, mut ctx) = setup();
        let id = active.spawn(1, Vec2::new(100.0, 500.0), &mut ctx);
        // Kinematic while waiting for its fade; safe to teleport.
        active.get_mut(id).unwrap().drag_mode(Some(Vec2::new(100.0, 500.0)), &mut ctx.physics, &mut ctx.stage);
        active.get_mut(id).unwrap().set_position(Vec2::new(100.0, -H - 1.0), &mut ctx.physics);
        assert!(active.get(id).unwrap().is_offscreen(&ctx.physics, H));

        active.cleanup(&mut ctx);
        assert_eq!(active.len(), 0);
        assert_eq!(active.score(), 1, "escapees still credit their points");
    }

    #[test]
    fn game_over_explodes_newest_first_until_empty() {
        let (mut active, mut ctx) = setup();
        let mut ids = Vec::new();
        for _ in 0..3 {
            // spawn() leaves the fruit in Normal via its fade-in.
            ids.push(active.spawn(1, Vec2::new(100.0, 500.0), &mut ctx));
        }
        let (oldest, middle, newest) = (ids[0], ids[1], ids[2]);

        active.game_over(&mut ctx);
        assert!(active.is_game_over());

        ctx.clock.advance(GAMEOVER_ANIMATION_START);
        active.update(&mut ctx);
        assert_eq!(active.get(newest).unwrap().mode(), Mode::Merge);
        assert_eq!(active.get(middle).unwrap().mode(), Mode::Normal);
        assert_eq!(active.get(oldest).unwrap().mode(), Mode::Normal);

        ctx.clock.advance(GAMEOVER_ANIMATION_INTERVAL);
        active.update(&mut ctx);
        assert_eq!(active.get(middle).unwrap().mode(), Mode::Merge);
        assert_eq!(active.get(oldest).unwrap().mode(), Mode::Normal);

        ctx.clock.advance(GAMEOVER_ANIMATION_INTERVAL);
        active.update(&mut ctx);
        assert_eq!(active.get(oldest).unwrap().mode(), Mode::Merge);

        // Let every explosion finish and the sequence drain itself.
        for _ in 0..((EXPLOSION_DELAY / GAMEOVER_ANIMATION_INTERVAL) as usize + 2) {
            ctx.clock.advance(GAMEOVER_ANIMATION_INTERVAL);
            active.update(&mut ctx);
            active.cleanup(&mut ctx);
        }
        assert_eq!(active.len(), 0);
        assert_eq!(active.score(), 3);
        ctx.clock.advance(GAMEOVER_ANIMATION_INTERVAL);
        active.update(&mut ctx);
        // No fruits left: the sequence stopped rescheduling.
        ctx.clock.advance(10.0);
        active.update(&mut ctx);
        assert_eq!(active.len(), 0);
    }

    #[test]
    fn game_over_blocks_prepare_and_drop() {
        let (mut active, mut ctx) = setup();
        active.prepare_next(1, &mut ctx);
        active.game_over(&mut ctx);
        assert!(active.pending().is_none(), "pending is cleared");
        active.prepare_next(1, &mut ctx);
        assert!(active.pending().is_none());
        assert_eq!(active.drop_next(Vec2::new(100.0, 100.0), &mut ctx), None);
    }

    #[test]
    fn reset_restores_a_fresh_game() {
        let (mut active, mut ctx) = setup();
        active.spawn(3, Vec2::new(100.0, 500.0), &mut ctx);
        active.prepare_next(1, &mut ctx);
        active.game_over(&mut ctx);

        active.reset(&mut ctx);
        assert!(!active.is_game_over());
        assert_eq!(active.len(), 0);
        assert!(active.pending().is_none());
        assert_eq!(active.score(), 0);
        assert_eq!(ctx.physics.body_count(), 0);

        active.prepare_next(2, &mut ctx);
        assert!(active.pending().is_some());
    }

    #[test]
    fn ids_stay_unique_across_a_reset() {
        let (mut active, mut ctx) = setup();
        let first = active.spawn(1, Vec2::new(100.0, 500.0), &mut ctx);
        active.reset(&mut ctx);
        let second = active.spawn(1, Vec2::new(100.0, 500.0), &mut ctx);
        assert!(second > first, "the allocator never reuses ids");
    }

    #[test]
    fn resize_moves_the_preview_slot() {
        let (mut active, mut ctx) = setup();
        active.prepare_next(1, &mut ctx);
        active.on_resize(800.0, 700.0, &mut ctx);
        let pos = active.pending().unwrap().position(&ctx.physics);
        assert!((pos.x - 400.0).abs() < 1e-4);
    }
}

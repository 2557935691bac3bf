use crate::config::Variant;
use crate::model::{BrickGrid, GameState, BRICK_W, PADDLE_STEP};
use rand::Rng;
use std::time::Duration;

pub(crate) const MIN_INTERVAL_MS: u64 = 10;
pub(crate) const MAX_INTERVAL_MS: u64 = 10_000;

const BASE_DELAY_MS: f64 = 100.0;
const MIN_DELAY_MS: f64 = 30.0;
const SPEEDUP_PER_STEP: f64 = 0.9709;
const POINTS_PER_STEP: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PlayerAction {
    MoveLeft,
    MoveRight,
    Launch,
    Restart,
    Quit,
    Faster,
    Slower,
}

/// What one physics step produced, for the driver to act on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct StepReport {
    pub(crate) alerts: u32,
    pub(crate) brick_hit: bool,
    pub(crate) refilled: bool,
    /// Set only on the step that ended the game.
    pub(crate) game_over: bool,
}

/// Breakout cadence: 100ms, about 2.9% faster per three points, never below 30ms.
pub(crate) fn calculate_delay(score: u32) -> Duration {
    let steps = (score / POINTS_PER_STEP) as i32;
    let ms = (BASE_DELAY_MS * SPEEDUP_PER_STEP.powi(steps)).max(MIN_DELAY_MS);
    Duration::from_millis(ms as u64)
}

impl GameState {
    pub(crate) fn tick_delay(&self) -> Duration {
        if self.variant.has_bricks() {
            calculate_delay(self.score)
        } else {
            self.interval
        }
    }

    /// Move the ball and resolve collisions. Every check runs on every step,
    /// so one step may flip both axes.
    pub(crate) fn step(&mut self) -> StepReport {
        let mut report = StepReport::default();
        if self.game_over {
            return report;
        }

        let field = self.playfield();
        let prev = (self.ball.x, self.ball.y);

        if self.pinned() {
            self.ball.x = self.paddle.center();
            self.ball.y = self.paddle.row - 1;
        } else {
            self.ball.x += self.ball.dx;
            self.ball.y += self.ball.dy;
        }
        let in_play = !self.pinned();

        // side walls
        if self.ball.x >= field.right || self.ball.x <= field.left {
            self.ball.dx = -self.ball.dx;
            if in_play {
                report.alerts += 1;
            }
        }

        // top wall
        if self.ball.y < field.top {
            self.ball.dy = -self.ball.dy;
            report.alerts += 1;
        }

        // paddle
        if in_play && self.ball.y == self.paddle.row - 1 && self.paddle.covers(self.ball.x) {
            self.ball.dy = -self.ball.dy;
            if self.variant != Variant::Classic {
                self.ball.dx = self.deflect_dx();
            }
            report.alerts += 1;
        }

        if self.bricks.is_some() {
            if self.hit_brick(prev) {
                report.brick_hit = true;
                report.alerts += 1;
            }
            if self.bricks.as_ref().is_some_and(BrickGrid::is_cleared) {
                self.bricks = Some(BrickGrid::random(&mut self.rng, &field));
                report.refilled = true;
                report.alerts += 1;
                log::info!("brick grid cleared, refilled at score {}", self.score);
            }
        }

        if self.ball.y >= field.bottom {
            self.game_over = true;
            report.game_over = true;
            log::info!(
                "game over: score {} (high score {})",
                self.score,
                self.high_score
            );
        }

        report
    }

    /// Horizontal response by paddle third: outer thirds push outward, the
    /// middle third picks a fresh direction.
    fn deflect_dx(&mut self) -> i32 {
        let offset = self.ball.x - self.paddle.x;
        let third = self.paddle.len / 3;
        if offset < third {
            -1
        } else if offset >= self.paddle.len - third {
            1
        } else {
            self.rng.gen_range(-1..=1)
        }
    }

    /// Destroy the first alive brick under the ball, if any. At most one
    /// brick goes per step.
    fn hit_brick(&mut self, prev: (i32, i32)) -> bool {
        let field = self.playfield();
        let Some(grid) = self.bricks.as_mut() else {
            return false;
        };
        let (bx, by) = (self.ball.x, self.ball.y);

        let hit = grid.iter_alive().find(|&(r, c)| {
            let (x, y) = grid.brick_pos(&field, r, c);
            bx >= x && bx < x + BRICK_W && by == y
        });
        let Some((r, c)) = hit else {
            return false;
        };

        let (x, y) = grid.brick_pos(&field, r, c);
        grid.destroy(r, c);

        let from_side = prev.0 < x || prev.0 >= x + BRICK_W;
        let from_row = prev.1 != y;
        if from_side {
            self.ball.dx = -self.ball.dx;
        }
        if from_row || !from_side {
            self.ball.dy = -self.ball.dy;
        }

        self.score += 1;
        if self.score > self.high_score {
            self.high_score = self.score;
            if let Some(store) = &self.store {
                store.save_quietly(self.high_score);
            }
            log::info!("new high score {}", self.high_score);
        }
        true
    }

    pub(crate) fn apply(&mut self, action: PlayerAction) {
        let field = self.playfield();
        match action {
            PlayerAction::MoveLeft => {
                if !self.game_over {
                    self.paddle.x = (self.paddle.x - PADDLE_STEP).max(field.left);
                }
            }
            PlayerAction::MoveRight => {
                if !self.game_over {
                    self.paddle.x =
                        (self.paddle.x + PADDLE_STEP).min(field.right - self.paddle.len);
                }
            }
            PlayerAction::Launch => {
                if self.variant.launch_gated() && !self.game_over && !self.launched {
                    self.launched = true;
                    self.ball.dx = self.rng.gen_range(-1..=1);
                    self.ball.dy = -1;
                    log::info!("ball launched with dx {}", self.ball.dx);
                }
            }
            PlayerAction::Restart => self.new_game(),
            PlayerAction::Faster => {
                if self.variant == Variant::Classic {
                    self.interval = (self.interval / 2).max(Duration::from_millis(MIN_INTERVAL_MS));
                    log::debug!("tick interval now {:?}", self.interval);
                }
            }
            PlayerAction::Slower => {
                if self.variant == Variant::Classic {
                    self.interval = self
                        .interval
                        .saturating_mul(2)
                        .min(Duration::from_millis(MAX_INTERVAL_MS));
                    log::debug!("tick interval now {:?}", self.interval);
                }
            }
            PlayerAction::Quit => {}
        }
    }
}

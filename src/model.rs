use crate::config::Variant;
use crate::storage::HighScoreFile;
use rand::{rngs::StdRng, Rng};
use std::time::Duration;

pub(crate) const PADDLE_LEN: i32 = 10;
pub(crate) const PADDLE_STEP: i32 = 2;
pub(crate) const BALL_GLYPH: char = 'O';
pub(crate) const PADDLE_GLYPH: char = '*';

pub(crate) const BRICK_W: i32 = 5;
pub(crate) const BRICK_GAP: i32 = 1;
/// First brick row on screen; rows are separated by one blank row.
pub(crate) const BRICK_TOP: i32 = 2;
pub(crate) const BRICK_ROWS_MIN: usize = 3;
pub(crate) const BRICK_ROWS_MAX: usize = 7;

pub(crate) const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Ball {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) dx: i32,
    pub(crate) dy: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Paddle {
    /// column of the left edge
    pub(crate) x: i32,
    pub(crate) row: i32,
    pub(crate) len: i32,
}

impl Paddle {
    pub(crate) fn covers(&self, x: i32) -> bool {
        x >= self.x && x < self.x + self.len
    }

    pub(crate) fn center(&self) -> i32 {
        self.x + self.len / 2
    }
}

/// Bounds of the play area, derived from the live terminal size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Playfield {
    pub(crate) left: i32,
    pub(crate) right: i32,
    pub(crate) top: i32,
    pub(crate) bottom: i32,
    pub(crate) paddle_row: i32,
}

impl Playfield {
    pub(crate) fn from_size(variant: Variant, cols: u16, rows: u16) -> Self {
        let cols = cols as i32;
        let rows = rows as i32;
        let (left, right) = match variant {
            Variant::Classic => (cols / 4, cols * 3 / 4),
            Variant::Launch | Variant::Breakout => {
                let game_width = cols / 2;
                let left = (cols - game_width) / 2;
                (left, left + game_width - 1)
            }
        };
        let bottom = rows - 1;
        // breakout keeps two rows under the paddle for the score text
        let paddle_row = if variant.has_bricks() { rows - 3 } else { bottom };
        Self {
            left,
            right,
            top: 0,
            bottom,
            paddle_row,
        }
    }

    /// Columns strictly between the two boundary markers.
    pub(crate) fn inner_width(&self) -> i32 {
        (self.right - self.left - 1).max(0)
    }
}

/// Alive/destroyed table sized exactly to the rows and columns chosen at
/// creation time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct BrickGrid {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
}

impl BrickGrid {
    pub(crate) fn full(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![true; rows * cols],
        }
    }

    pub(crate) fn random(rng: &mut StdRng, field: &Playfield) -> Self {
        let rows = rng.gen_range(BRICK_ROWS_MIN..=BRICK_ROWS_MAX);
        Self::full(rows, Self::columns_for(field))
    }

    pub(crate) fn columns_for(field: &Playfield) -> usize {
        let pitch = BRICK_W + BRICK_GAP;
        // the last brick needs no trailing gap
        ((field.inner_width() + BRICK_GAP) / pitch).max(1) as usize
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    pub(crate) fn cols(&self) -> usize {
        self.cols
    }

    pub(crate) fn alive(&self, r: usize, c: usize) -> bool {
        r < self.rows && c < self.cols && self.cells[r * self.cols + c]
    }

    pub(crate) fn destroy(&mut self, r: usize, c: usize) {
        if r < self.rows && c < self.cols {
            self.cells[r * self.cols + c] = false;
        }
    }

    pub(crate) fn alive_count(&self) -> usize {
        self.cells.iter().filter(|&&b| b).count()
    }

    pub(crate) fn is_cleared(&self) -> bool {
        self.alive_count() == 0
    }

    /// Screen column of the grid's left edge, centring it in the playfield.
    pub(crate) fn origin_x(&self, field: &Playfield) -> i32 {
        let span = self.cols as i32 * (BRICK_W + BRICK_GAP) - BRICK_GAP;
        field.left + 1 + ((field.inner_width() - span) / 2).max(0)
    }

    /// Top-left cell of brick (r, c); every brick is `BRICK_W` wide and one row tall.
    pub(crate) fn brick_pos(&self, field: &Playfield, r: usize, c: usize) -> (i32, i32) {
        let x = self.origin_x(field) + c as i32 * (BRICK_W + BRICK_GAP);
        let y = BRICK_TOP + r as i32 * 2;
        (x, y)
    }

    pub(crate) fn iter_alive(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.rows)
            .flat_map(move |r| (0..self.cols).map(move |c| (r, c)))
            .filter(move |&(r, c)| self.alive(r, c))
    }
}

pub(crate) struct GameState {
    pub(crate) variant: Variant,
    pub(crate) cols: u16,
    pub(crate) rows: u16,
    pub(crate) ball: Ball,
    pub(crate) paddle: Paddle,
    pub(crate) bricks: Option<BrickGrid>,
    pub(crate) score: u32,
    pub(crate) high_score: u32,
    pub(crate) game_over: bool,
    pub(crate) launched: bool,
    /// Tick period for the fixed-cadence rules; `f`/`s` adjust it in classic.
    pub(crate) interval: Duration,
    pub(crate) rng: StdRng,
    pub(crate) store: Option<HighScoreFile>,
}

impl GameState {
    pub(crate) fn new(
        variant: Variant,
        cols: u16,
        rows: u16,
        rng: StdRng,
        store: Option<HighScoreFile>,
    ) -> Self {
        let high_score = store.as_ref().map(|s| s.load()).unwrap_or(0);
        let mut state = Self {
            variant,
            cols,
            rows,
            ball: Ball {
                x: 0,
                y: 0,
                dx: 1,
                dy: 1,
            },
            paddle: Paddle {
                x: 0,
                row: 0,
                len: PADDLE_LEN,
            },
            bricks: None,
            score: 0,
            high_score,
            game_over: false,
            launched: false,
            interval: DEFAULT_INTERVAL,
            rng,
            store,
        };
        state.new_game();
        state
    }

    pub(crate) fn playfield(&self) -> Playfield {
        Playfield::from_size(self.variant, self.cols, self.rows)
    }

    /// Track the live terminal size; bounds follow on the next use.
    pub(crate) fn resize(&mut self, cols: u16, rows: u16) {
        self.cols = cols;
        self.rows = rows;
    }

    /// Start a round. High score and tick interval carry over.
    pub(crate) fn new_game(&mut self) {
        let field = self.playfield();

        self.paddle = Paddle {
            x: (field.left + field.right) / 2 - PADDLE_LEN / 2,
            row: field.paddle_row,
            len: PADDLE_LEN,
        };

        if self.variant.launch_gated() {
            self.launched = false;
            self.ball = Ball {
                x: self.paddle.center(),
                y: self.paddle.row - 1,
                dx: self.rng.gen_range(-1..=1),
                dy: -1,
            };
        } else {
            self.launched = true;
            self.ball = Ball {
                x: (field.left + field.right) / 2,
                y: self.rows as i32 / 2,
                dx: 1,
                dy: 1,
            };
        }

        self.bricks = if self.variant.has_bricks() {
            Some(BrickGrid::random(&mut self.rng, &field))
        } else {
            None
        };

        self.score = 0;
        self.game_over = false;
        log::info!(
            "new {:?} game on {}x{} (bricks: {})",
            self.variant,
            self.cols,
            self.rows,
            self.bricks
                .as_ref()
                .map(|g| format!("{}x{}", g.rows(), g.cols()))
                .unwrap_or_else(|| "none".to_string())
        );
    }

    /// True while the ball rides the paddle waiting for a launch.
    pub(crate) fn pinned(&self) -> bool {
        self.variant.launch_gated() && !self.launched
    }
}

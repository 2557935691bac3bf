use crate::model::{GameState, BALL_GLYPH, PADDLE_GLYPH};
use anyhow::{Context, Result};
use crossterm::{
    cursor, execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use std::io::{self, Stdout, Write};

const WALL: Color = Color::DarkGrey;
const HUD: Color = Color::Cyan;
const BRICK_COLORS: [Color; 7] = [
    Color::Red,
    Color::DarkYellow,
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Blue,
    Color::Magenta,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Cell {
    pub(crate) ch: char,
    pub(crate) fg: Color,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::White,
        }
    }
}

/// Off-screen character grid the tick draws into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Frame {
    pub(crate) w: u16,
    pub(crate) h: u16,
    cells: Vec<Cell>,
}

impl Frame {
    pub(crate) fn new(w: u16, h: u16) -> Self {
        Self {
            w,
            h,
            cells: vec![Cell::default(); (w as usize) * (h as usize)],
        }
    }

    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.w as i32 || y >= self.h as i32 {
            return None;
        }
        Some((y as usize) * (self.w as usize) + (x as usize))
    }

    pub(crate) fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    /// Off-grid writes are dropped.
    pub(crate) fn put(&mut self, x: i32, y: i32, ch: char, fg: Color) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = Cell { ch, fg };
        }
    }

    pub(crate) fn put_str(&mut self, x: i32, y: i32, s: &str, fg: Color) {
        for (i, ch) in s.chars().enumerate() {
            self.put(x + i as i32, y, ch, fg);
        }
    }

    pub(crate) fn get(&self, x: i32, y: i32) -> Option<Cell> {
        self.idx(x, y).map(|i| self.cells[i])
    }

    #[cfg(test)]
    pub(crate) fn row_text(&self, y: i32) -> String {
        (0..self.w as i32)
            .filter_map(|x| self.get(x, y))
            .map(|c| c.ch)
            .collect()
    }
}

/// Walls, bricks, paddle, ball and score text for the current state.
pub(crate) fn draw_scene(state: &GameState, frame: &mut Frame) {
    let field = state.playfield();

    for y in 0..state.rows as i32 {
        frame.put(field.left, y, '|', WALL);
        frame.put(field.right, y, '|', WALL);
    }

    if let Some(grid) = &state.bricks {
        for (r, c) in grid.iter_alive() {
            let (x, y) = grid.brick_pos(&field, r, c);
            let fg = BRICK_COLORS[r % BRICK_COLORS.len()];
            frame.put_str(x, y, "[===]", fg);
        }
    }

    let paddle: String = std::iter::repeat(PADDLE_GLYPH)
        .take(state.paddle.len as usize)
        .collect();
    frame.put_str(state.paddle.x, state.paddle.row, &paddle, Color::White);
    frame.put(state.ball.x, state.ball.y, BALL_GLYPH, Color::Yellow);

    if state.variant.has_bricks() {
        let text_x = field.left + 2;
        frame.put_str(
            text_x,
            field.bottom - 1,
            &format!("High Score: {}", state.high_score),
            HUD,
        );
        frame.put_str(text_x, field.bottom, &format!("Score: {}", state.score), HUD);
    }

    if state.pinned() {
        let hint = "Space to launch";
        let x = (field.left + field.right) / 2 - hint.len() as i32 / 2;
        frame.put_str(x, state.rows as i32 / 2, hint, Color::DarkGrey);
    }
}

pub(crate) fn draw_game_over(frame: &mut Frame) {
    let cx = frame.w as i32 / 2;
    let cy = frame.h as i32 / 2;
    frame.put_str(cx - 5, cy, "Game Over!", Color::Red);
    frame.put_str(cx - 10, cy + 1, "Press 'N' to restart", Color::White);
    frame.put_str(cx - 8, cy + 2, "Press 'Q' to quit", Color::White);
}

/// What the game loop needs from a display.
pub(crate) trait Surface: Send {
    /// Current size, re-read on every call so resizes show up at once.
    fn size(&self) -> Result<(u16, u16)>;
    fn fit(&mut self, cols: u16, rows: u16) -> Result<()>;
    fn frame(&mut self) -> &mut Frame;
    fn present(&mut self) -> Result<()>;
    fn beep(&mut self, times: u32) -> Result<()>;
}

/// Full-screen terminal with a back buffer; only changed cells are written.
pub(crate) struct Screen {
    out: Stdout,
    prev: Frame,
    frame: Frame,
}

impl Screen {
    pub(crate) fn begin() -> Result<Self> {
        let mut out = io::stdout();
        terminal::enable_raw_mode().context("could not enable raw mode")?;
        execute!(
            out,
            EnterAlternateScreen,
            cursor::Hide,
            DisableLineWrap,
            Clear(ClearType::All)
        )
        .context("could not enter the alternate screen")?;

        let (cols, rows) = terminal::size().context("could not read terminal size")?;
        Ok(Self {
            out,
            prev: Frame::new(cols, rows),
            frame: Frame::new(cols, rows),
        })
    }

    pub(crate) fn dimensions(&self) -> (u16, u16) {
        (self.frame.w, self.frame.h)
    }
}

impl Surface for Screen {
    fn size(&self) -> Result<(u16, u16)> {
        terminal::size().context("could not read terminal size")
    }

    /// Reallocate on a size change; the next present repaints everything.
    fn fit(&mut self, cols: u16, rows: u16) -> Result<()> {
        if cols == self.frame.w && rows == self.frame.h {
            return Ok(());
        }
        log::debug!("terminal resized to {cols}x{rows}");
        self.frame = Frame::new(cols, rows);
        self.prev = Frame::new(cols, rows);
        execute!(self.out, Clear(ClearType::All))?;
        Ok(())
    }

    fn frame(&mut self) -> &mut Frame {
        &mut self.frame
    }

    fn present(&mut self) -> Result<()> {
        queue!(self.out, BeginSynchronizedUpdate)?;
        let mut last_fg = None;

        for y in 0..self.frame.h {
            for x in 0..self.frame.w {
                let (xi, yi) = (x as i32, y as i32);
                let (Some(c), Some(p)) = (self.frame.get(xi, yi), self.prev.get(xi, yi)) else {
                    continue;
                };
                if c == p {
                    continue;
                }
                queue!(self.out, cursor::MoveTo(x, y))?;
                if last_fg != Some(c.fg) {
                    queue!(self.out, SetForegroundColor(c.fg))?;
                    last_fg = Some(c.fg);
                }
                queue!(self.out, Print(c.ch))?;
            }
        }

        queue!(self.out, ResetColor, EndSynchronizedUpdate)?;
        self.out.flush()?;
        self.prev.clone_from(&self.frame);
        Ok(())
    }

    fn beep(&mut self, times: u32) -> Result<()> {
        for _ in 0..times {
            queue!(self.out, Print('\x07'))?;
        }
        self.out.flush()?;
        Ok(())
    }
}

/// Put the shell back; safe to call on any exit path.
pub(crate) fn restore_terminal() {
    let mut out = io::stdout();
    let _ = execute!(
        out,
        ResetColor,
        cursor::Show,
        EnableLineWrap,
        LeaveAlternateScreen
    );
    let _ = terminal::disable_raw_mode();
}

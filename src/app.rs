use crate::config::{DriverKind, Settings};
use crate::input::{next_action, pending_actions};
use crate::model::GameState;
use crate::render::{draw_game_over, draw_scene, Frame, Screen, Surface};
use crate::sim::{PlayerAction, StepReport};
use crate::storage::HighScoreFile;
use anyhow::{anyhow, Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

const INPUT_POLL: Duration = Duration::from_millis(50);

/// One update-and-render cycle against an off-screen frame.
pub(crate) fn tick(state: &mut GameState, frame: &mut Frame, cols: u16, rows: u16) -> StepReport {
    if state.game_over {
        frame.clear();
        draw_game_over(frame);
        return StepReport::default();
    }

    frame.clear();
    state.resize(cols, rows);
    draw_scene(state, frame);

    let report = state.step();
    if report.game_over {
        frame.clear();
        draw_game_over(frame);
    }
    report
}

/// Tick, then flush and ring the bell for whatever bounced.
fn tick_surface<S: Surface>(state: &mut GameState, surface: &mut S) -> Result<()> {
    let (cols, rows) = surface.size()?;
    surface.fit(cols, rows)?;
    let report = tick(state, surface.frame(), cols, rows);
    surface.present().context("could not draw frame")?;
    if report.brick_hit || report.refilled {
        log::trace!("score {} delay {:?}", state.score, state.tick_delay());
    }
    if report.alerts > 0 {
        surface.beep(report.alerts)?;
    }
    Ok(())
}

/// Key handling clamps against the bounds of the live terminal size.
fn apply_live<S: Surface>(state: &mut GameState, surface: &S, action: PlayerAction) -> Result<()> {
    let (cols, rows) = surface.size()?;
    state.resize(cols, rows);
    state.apply(action);
    Ok(())
}

/// Next tick time; an unrepresentable deadline keeps the previous one.
fn rearm(previous: Instant, from: Instant, delay: Duration) -> Instant {
    match from.checked_add(delay) {
        Some(t) => t,
        None => {
            log::warn!("tick delay {delay:?} out of range, keeping the old deadline");
            previous
        }
    }
}

/// Single-threaded loop: the wait for input never runs past the next tick
/// deadline, so ticks and key handling never overlap.
fn run_cooperative<S: Surface>(state: &mut GameState, surface: &mut S) -> Result<()> {
    let mut deadline = Instant::now();
    loop {
        let now = Instant::now();
        if now >= deadline {
            tick_surface(state, surface)?;
            deadline = rearm(now, now, state.tick_delay());
            continue;
        }

        let action = match next_action(state.variant, deadline - now) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("input read failed, quitting: {e:#}");
                return Ok(());
            }
        };
        match action {
            Some(PlayerAction::Quit) => return Ok(()),
            Some(a @ (PlayerAction::Faster | PlayerAction::Slower)) => {
                apply_live(state, surface, a)?;
                // re-arm with the new period
                deadline = rearm(deadline, Instant::now(), state.tick_delay());
            }
            Some(a) => apply_live(state, surface, a)?,
            None => {}
        }
    }
}

struct Shared<S> {
    state: GameState,
    surface: S,
}

/// Quit request shared by the two threads. Raising it wakes a physics
/// thread that is waiting out its tick delay.
#[derive(Default)]
struct Shutdown {
    raised: Mutex<bool>,
    wake: Condvar,
}

impl Shutdown {
    fn raise(&self) {
        *self.raised.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.wake.notify_all();
    }

    fn is_raised(&self) -> bool {
        *self.raised.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sleep for `delay` unless raised first; returns whether it was raised.
    fn wait(&self, delay: Duration) -> bool {
        let guard = self.raised.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .wake
            .wait_timeout_while(guard, delay, |raised| !*raised)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

fn lock<S>(shared: &Mutex<Shared<S>>) -> MutexGuard<'_, Shared<S>> {
    // a panicked holder leaves plain data behind; keep using it
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

fn physics_loop<S: Surface>(shared: &Mutex<Shared<S>>, shutdown: &Shutdown) -> Result<()> {
    while !shutdown.is_raised() {
        let delay = {
            let mut guard = lock(shared);
            let Shared { state, surface } = &mut *guard;
            if let Err(e) = tick_surface(state, surface) {
                shutdown.raise();
                return Err(e);
            }
            state.tick_delay()
        };
        if shutdown.wait(delay) {
            break;
        }
    }
    Ok(())
}

fn input_loop<S: Surface>(shared: &Mutex<Shared<S>>, shutdown: &Shutdown) -> Result<()> {
    let variant = lock(shared).state.variant;
    while !shutdown.is_raised() {
        let actions = match pending_actions(variant) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("input read failed, quitting: {e:#}");
                return Ok(());
            }
        };
        for action in actions {
            if action == PlayerAction::Quit {
                return Ok(());
            }
            let mut guard = lock(shared);
            let Shared { state, surface } = &mut *guard;
            apply_live(state, surface, action)?;
        }
        thread::sleep(INPUT_POLL);
    }
    Ok(())
}

/// Physics on its own thread, input here; both go through one mutex. On
/// quit the shutdown flag is raised and the physics thread joined.
fn run_threaded<S: Surface + 'static>(state: GameState, surface: S) -> Result<GameState> {
    let shared = Arc::new(Mutex::new(Shared { state, surface }));
    let shutdown = Arc::new(Shutdown::default());

    let physics = {
        let shared = Arc::clone(&shared);
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("physics".to_string())
            .spawn(move || physics_loop(&shared, &shutdown))
            .context("could not start the physics thread")?
    };

    let input_res = input_loop(&shared, &shutdown);
    shutdown.raise();
    let physics_res = physics
        .join()
        .map_err(|_| anyhow!("physics thread panicked"))?;
    input_res?;
    physics_res?;

    let shared = Arc::try_unwrap(shared)
        .map_err(|_| anyhow!("physics thread still holds the game state"))?;
    let Shared { state, .. } = shared.into_inner().unwrap_or_else(|e| e.into_inner());
    Ok(state)
}

pub(crate) fn run(settings: &Settings) -> Result<()> {
    let rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let store = settings
        .variant
        .has_bricks()
        .then(|| HighScoreFile::new(&settings.high_score_file));

    let mut screen = Screen::begin()?;
    let (cols, rows) = screen.dimensions();
    let mut state = GameState::new(settings.variant, cols, rows, rng, store);
    state.interval = settings.interval;
    log::info!(
        "starting {:?} with {:?} driver, high score {}",
        settings.variant,
        settings.driver,
        state.high_score
    );

    let state = match settings.driver {
        DriverKind::Cooperative => {
            run_cooperative(&mut state, &mut screen)?;
            state
        }
        DriverKind::Threaded => run_threaded(state, screen)?,
    };

    if let Some(store) = &state.store {
        store.save_quietly(state.high_score);
        log::info!(
            "saved high score {} to {}",
            state.high_score,
            store.path().display()
        );
    }
    log::info!("shutdown");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Variant;
    use crate::model::tests::game;
    use crate::model::Ball;

    #[test]
    fn test_tick_draws_before_moving() {
        let mut g = game(Variant::Classic, 80, 24);
        let mut f = Frame::new(80, 24);
        let start = g.ball;
        tick(&mut g, &mut f, 80, 24);
        assert_eq!(f.get(start.x, start.y).map(|c| c.ch), Some('O'));
        assert_eq!((g.ball.x, g.ball.y), (start.x + 1, start.y + 1));
    }

    #[test]
    fn test_tick_follows_resize() {
        let mut g = game(Variant::Classic, 80, 24);
        let mut f = Frame::new(100, 30);
        tick(&mut g, &mut f, 100, 30);
        assert_eq!(g.playfield().left, 25);
        assert_eq!(f.get(25, 29).map(|c| c.ch), Some('|'));
        assert_eq!(f.get(75, 0).map(|c| c.ch), Some('|'));
    }

    #[test]
    fn test_tick_game_over_overlay_persists() {
        let mut g = game(Variant::Launch, 80, 24);
        g.launched = true;
        g.paddle.x = g.playfield().left;
        g.ball = Ball { x: 50, y: 22, dx: 0, dy: 1 };
        let mut f = Frame::new(80, 24);

        let r = tick(&mut g, &mut f, 80, 24);
        assert!(r.game_over);
        assert!(f.row_text(12).contains("Game Over!"));

        let r = tick(&mut g, &mut f, 80, 24);
        assert_eq!(r, StepReport::default());
        assert!(f.row_text(12).contains("Game Over!"));
        assert!(f.row_text(14).contains("Press 'Q' to quit"));

        g.apply(PlayerAction::Restart);
        tick(&mut g, &mut f, 80, 24);
        assert!(!f.row_text(12).contains("Game Over!"));
    }

    /// Fixed-size surface that records what the loop did.
    struct Headless {
        frame: Frame,
        presents: u32,
        beeps: u32,
    }

    impl Headless {
        fn new(w: u16, h: u16) -> Self {
            Self {
                frame: Frame::new(w, h),
                presents: 0,
                beeps: 0,
            }
        }
    }

    impl Surface for Headless {
        fn size(&self) -> Result<(u16, u16)> {
            Ok((self.frame.w, self.frame.h))
        }
        fn fit(&mut self, _cols: u16, _rows: u16) -> Result<()> {
            Ok(())
        }
        fn frame(&mut self) -> &mut Frame {
            &mut self.frame
        }
        fn present(&mut self) -> Result<()> {
            self.presents += 1;
            Ok(())
        }
        fn beep(&mut self, times: u32) -> Result<()> {
            self.beeps += times;
            Ok(())
        }
    }

    #[test]
    fn test_tick_surface_beeps_per_alert() {
        let mut g = game(Variant::Classic, 80, 24);
        let field = g.playfield();
        g.ball = Ball { x: field.right - 1, y: 0, dx: 1, dy: -1 };
        let mut s = Headless::new(80, 24);
        tick_surface(&mut g, &mut s).unwrap();
        assert_eq!(s.presents, 1);
        assert_eq!(s.beeps, 2);
    }

    #[test]
    fn test_physics_thread_stops_on_shutdown_flag() {
        let mut g = game(Variant::Launch, 80, 24);
        g.interval = Duration::from_millis(5);
        let shared = Arc::new(Mutex::new(Shared {
            state: g,
            surface: Headless::new(80, 24),
        }));
        let shutdown = Arc::new(Shutdown::default());

        let handle = {
            let shared = Arc::clone(&shared);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || physics_loop(&shared, &shutdown))
        };

        // input side: launch under the same lock
        thread::sleep(Duration::from_millis(20));
        lock(&shared).state.apply(PlayerAction::Launch);
        thread::sleep(Duration::from_millis(30));

        shutdown.raise();
        handle.join().unwrap().unwrap();

        let guard = lock(&shared);
        assert!(guard.surface.presents >= 2);
        assert!(guard.state.launched);
        let presents = guard.surface.presents;
        drop(guard);

        // nothing ticks once the thread has been joined
        thread::sleep(Duration::from_millis(20));
        assert_eq!(lock(&shared).surface.presents, presents);
    }

    #[test]
    fn test_input_loop_exits_when_physics_stops() {
        let shared = Mutex::new(Shared {
            state: game(Variant::Breakout, 80, 24),
            surface: Headless::new(80, 24),
        });
        let shutdown = Shutdown::default();
        shutdown.raise();
        assert!(input_loop(&shared, &shutdown).is_ok());
    }

    #[test]
    fn test_quit_wakes_physics_thread_mid_delay() {
        let mut g = game(Variant::Classic, 80, 24);
        for _ in 0..5 {
            g.apply(PlayerAction::Slower);
        }
        assert_eq!(g.tick_delay(), Duration::from_millis(3200));
        let shared = Arc::new(Mutex::new(Shared {
            state: g,
            surface: Headless::new(80, 24),
        }));
        let shutdown = Arc::new(Shutdown::default());

        let handle = {
            let shared = Arc::clone(&shared);
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || physics_loop(&shared, &shutdown))
        };
        thread::sleep(Duration::from_millis(100));

        let asked = Instant::now();
        shutdown.raise();
        handle.join().unwrap().unwrap();
        assert!(asked.elapsed() < Duration::from_millis(500));
        assert_eq!(lock(&shared).surface.presents, 1);
    }

    #[test]
    fn test_shutdown_wait_times_out_when_not_raised() {
        let shutdown = Shutdown::default();
        assert!(!shutdown.wait(Duration::from_millis(5)));
        shutdown.raise();
        assert!(shutdown.wait(Duration::from_secs(60)));
    }

    #[test]
    fn test_rearm_after_many_slower_presses() {
        let mut g = game(Variant::Classic, 80, 24);
        for _ in 0..100 {
            g.apply(PlayerAction::Slower);
        }
        let now = Instant::now();
        let deadline = rearm(now, now, g.tick_delay());
        assert_eq!(deadline, now + g.tick_delay());

        // a delay no clock can hold keeps the previous deadline
        assert_eq!(rearm(now, now, Duration::MAX), now);
    }
}

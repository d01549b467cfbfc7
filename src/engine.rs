use crate::assets::{Assets, PendingLoad};
use crate::browser;
use anyhow::{anyhow, Error, Result};
use futures::future::try_join_all;
// wasm is a single threaded environment, so Rc RefCell > Mutex
use std::cell::RefCell;
use std::rc::Rc;

/// Capability interface a game hands to the loop. Every hook has a default
/// body, so implementers override only what they need; the loop supplies
/// orchestration and nothing else.
pub trait Game {
    /// Called once per `run()`, before any asset starts loading.
    fn init(&mut self) {
        log!("Game Initialized");
    }

    /// Return the pending load operations for this game's assets. An empty
    /// vec skips the load phase entirely.
    fn load(&mut self) -> Vec<PendingLoad> {
        Vec::new()
    }

    /// Called exactly once after every operation of a load batch resolved.
    fn on_load_complete(&mut self, _assets: &Assets) {}

    /// Called exactly once with the first failure of a load batch.
    fn on_load_error(&mut self, _error: Error) {}

    /// Advance the simulation by `dt` seconds.
    fn update(&mut self, _dt: f64) {}

    /// Draw the current frame. Runs after `update` within every tick.
    fn render(&mut self) {}
}

// A stopped loop holds no frame handle, so "stopped but scheduled" cannot
// be expressed.
#[derive(Clone, Copy, Debug)]
enum LoopPhase {
    Stopped,
    Running { frame_handle: i32 },
}

struct LoopState {
    phase: LoopPhase,
    loading_assets: bool,
    loading_failed: bool,
    // milliseconds, Performance.now timebase
    last_step: f64,
    assets: Option<Assets>,
}

type SharedLoopClosure = Rc<RefCell<Option<browser::LoopClosure>>>;

/// Drives a [`Game`]: one `update`/`render` pair per animation frame, with
/// asset loading aggregated concurrently off to the side. Loading never
/// gates frame ticks; games that need to wait for assets check readiness
/// themselves from `update`/`render`.
pub struct GameLoop {
    game: Rc<RefCell<dyn Game>>,
    state: Rc<RefCell<LoopState>>,
}

impl GameLoop {
    pub fn new(game: impl Game + 'static) -> Self {
        GameLoop {
            game: Rc::new(RefCell::new(game)),
            state: Rc::new(RefCell::new(LoopState {
                phase: LoopPhase::Stopped,
                loading_assets: false,
                loading_failed: false,
                last_step: 0.0,
                assets: None,
            })),
        }
    }

    /// Kickstart the game. A no-op while the loop is already running.
    ///
    /// Invokes `init`, starts the load batch if `load` returned any pending
    /// operations, and begins the frame chain. The frame chain starts
    /// immediately either way; it does not wait for the batch to settle.
    pub fn run(&mut self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        console_error_panic_hook::set_once();

        {
            let mut state = self.state.borrow_mut();
            state.loading_assets = false;
            state.loading_failed = false;
        }

        self.game.borrow_mut().init();

        let pending = self.game.borrow_mut().load();
        if !pending.is_empty() {
            self.state.borrow_mut().loading_assets = true;
            browser::spawn_local(Self::load_assets(
                pending,
                Rc::clone(&self.game),
                Rc::clone(&self.state),
            ));
        }

        self.state.borrow_mut().last_step = browser::now()?;

        let game = Rc::clone(&self.game);
        let state = Rc::clone(&self.state);
        let f: SharedLoopClosure = Rc::new(RefCell::new(None));
        let g = f.clone();
        *g.borrow_mut() = Some(browser::create_raf_closure(move |perf: f64| {
            let dt = {
                let mut state = state.borrow_mut();
                let dt = (perf - state.last_step) / 1000.0;
                state.last_step = perf;
                dt
            };
            {
                let mut game = game.borrow_mut();
                game.update(dt);
                game.render();
            }
            if let Ok(frame_handle) =
                browser::request_animation_frame(f.borrow().as_ref().unwrap())
            {
                state.borrow_mut().phase = LoopPhase::Running { frame_handle };
            }
        }));

        let frame_handle = browser::request_animation_frame(
            g.borrow()
                .as_ref()
                .ok_or_else(|| anyhow!("GameLoop: loop closure is None"))?,
        )?;
        self.state.borrow_mut().phase = LoopPhase::Running { frame_handle };

        Ok(())
    }

    /// Cancel the pending frame request and mark the loop stopped. A no-op
    /// while already stopped. An in-flight load batch is not cancelled.
    pub fn stop(&mut self) -> Result<()> {
        let phase = {
            let mut state = self.state.borrow_mut();
            std::mem::replace(&mut state.phase, LoopPhase::Stopped)
        };
        if let LoopPhase::Running { frame_handle } = phase {
            browser::cancel_animation_frame(frame_handle)?;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state.borrow().phase, LoopPhase::Running { .. })
    }

    /// True while a load batch is in flight.
    pub fn is_loading_assets(&self) -> bool {
        self.state.borrow().loading_assets
    }

    /// True after a load batch failed, until the next `run()`.
    pub fn loading_failed(&self) -> bool {
        self.state.borrow().loading_failed
    }

    /// The table built by the last successful load batch, if any.
    pub fn assets(&self) -> Option<Assets> {
        self.state.borrow().assets.clone()
    }

    // Fail-fast aggregation over the batch : the first rejection cancels
    // the remaining operations and reaches on_load_error unchanged.
    async fn load_assets(
        pending: Vec<PendingLoad>,
        game: Rc<RefCell<dyn Game>>,
        state: Rc<RefCell<LoopState>>,
    ) {
        match try_join_all(pending).await {
            Ok(descriptors) => {
                {
                    let mut state = state.borrow_mut();
                    state.assets = Some(Assets::from_descriptors(descriptors));
                    state.loading_assets = false;
                }
                let state = state.borrow();
                if let Some(assets) = state.assets.as_ref() {
                    game.borrow_mut().on_load_complete(assets);
                }
            }
            Err(error) => {
                {
                    let mut state = state.borrow_mut();
                    state.loading_assets = false;
                    state.loading_failed = true;
                }
                game.borrow_mut().on_load_error(error);
            }
        }
    }
}

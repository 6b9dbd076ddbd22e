//! Stream Runner entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, KeyboardEvent, Window};

    use stream_runner::Tuning;
    use stream_runner::consts::*;
    use stream_runner::persistence::{self, Autosave, SaveData};
    use stream_runner::platform::LocalStorageStore;
    use stream_runner::sim::{GameEvent, GamePhase, GameState, TickInput, tick};
    use stream_runner::view::{HudView, RaceView};

    /// Window property the JS renderer polls for the latest frame
    const VIEW_PROPERTY: &str = "streamRunnerView";

    /// Keys currently held down
    #[derive(Default)]
    struct HeldKeys {
        left: bool,
        right: bool,
        forward: bool,
    }

    /// Game instance holding all state
    struct Game {
        state: GameState,
        tuning: Tuning,
        accumulator: f32,
        last_time: f64,
        input: TickInput,
        keys: HeldKeys,
        autosave: Autosave,
        store: Option<LocalStorageStore>,
        best_time: Option<u64>,
    }

    impl Game {
        fn new(seed: u64, tuning: Tuning, store: Option<LocalStorageStore>) -> Self {
            let saved = store.as_ref().and_then(|s| persistence::load_progress(s));
            let best_time = saved.as_ref().and_then(|d| d.best_time);

            let state = match saved {
                Some(save) => GameState::resume(
                    seed,
                    tuning.clone(),
                    save.current_stage,
                    save.elapsed_time as f64,
                    save.total_distance,
                ),
                None => GameState::new(seed, tuning.clone()),
            };

            Self {
                state,
                autosave: Autosave::new(tuning.autosave_interval_secs),
                tuning,
                accumulator: 0.0,
                last_time: 0.0,
                input: TickInput::default(),
                keys: HeldKeys::default(),
                store,
                best_time,
            }
        }

        /// Run simulation ticks
        fn update(&mut self, dt: f32) {
            let dt = dt.min(0.1);
            self.accumulator += dt;

            self.input.steer_x = match (self.keys.left, self.keys.right) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => 0.0,
            };
            self.input.throttle = if self.keys.forward { 1.0 } else { 0.0 };

            let mut substeps = 0;
            while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                tick(&mut self.state, &self.input, SIM_DT);
                self.accumulator -= SIM_DT;
                substeps += 1;

                // Clear one-shot inputs after processing
                self.input.boost = false;
                self.input.pause = false;
            }

            for event in self.state.drain_events() {
                if let GameEvent::Won { elapsed_ms } = event {
                    self.record_win(elapsed_ms);
                }
            }

            if self.state.phase == GamePhase::Racing && self.autosave.tick(dt) {
                self.save_game();
            }
        }

        /// Save progress to LocalStorage
        fn save_game(&mut self) {
            let data = SaveData::from_state(&self.state, self.best_time);
            if let Some(store) = self.store.as_mut() {
                if let Err(err) = persistence::save_progress(store, &data) {
                    log::warn!("Autosave failed: {err}");
                }
            }
        }

        fn record_win(&mut self, elapsed_ms: u64) {
            let Some(store) = self.store.as_mut() else {
                return;
            };
            match persistence::record_win(store, elapsed_ms) {
                Ok(data) => self.best_time = data.best_time,
                Err(err) => log::warn!("Could not record win: {err}"),
            }
        }

        /// Start over from stage 1
        fn restart(&mut self, seed: u64) {
            self.state = GameState::new(seed, self.tuning.clone());
            self.accumulator = 0.0;
            self.input = TickInput::default();
            self.autosave.reset();
            log::info!("Race restarted with seed: {}", seed);
        }

        /// Drop any saved run and start over from stage 1
        fn new_game(&mut self, seed: u64) {
            if let Some(store) = self.store.as_mut() {
                if let Err(err) = persistence::clear_progress(store) {
                    log::warn!("Could not clear saved progress: {err}");
                }
            }
            self.restart(seed);
        }

        /// Publish the render snapshot as JSON on the window
        fn publish_view(&self, window: &Window) {
            let json = match RaceView::capture(&self.state).to_json() {
                Ok(json) => json,
                Err(err) => {
                    log::warn!("Could not serialize race view: {err}");
                    return;
                }
            };
            if let Err(err) = js_sys::Reflect::set(window, &VIEW_PROPERTY.into(), &json.into()) {
                log::warn!("Could not publish race view: {err:?}");
            }
        }

        /// Update HUD elements in DOM
        fn update_hud(&self, document: &Document) {
            let hud = HudView::capture(&self.state);

            let set_text = |selector: &str, text: &str| {
                if let Ok(Some(el)) = document.query_selector(selector) {
                    el.set_text_content(Some(text));
                }
            };

            set_text("#hud-stage .hud-value", &hud.stage.to_string());
            set_text("#hud-stage-name", hud.stage_name);
            set_text(
                "#hud-progress .hud-value",
                &format!("{:.0}%", hud.overall_progress * 100.0),
            );
            set_text(
                "#hud-position .hud-value",
                &format!("{}/{}", hud.race_position, hud.total_racers),
            );
            set_text("#hud-time .hud-value", &hud.elapsed_clock());

            if let Some(el) = document.get_element_by_id("hud-boost") {
                let width = format!("width: {:.0}%", hud.boost_progress * 100.0);
                let _ = el.set_attribute("style", &width);
                let class = if hud.can_boost { "ready" } else { "charging" };
                let _ = el.set_attribute("class", class);
            }

            // Show/hide pause menu
            if let Some(el) = document.get_element_by_id("pause-menu") {
                let class = if hud.phase == GamePhase::Paused { "" } else { "hidden" };
                let _ = el.set_attribute("class", class);
            }

            // Show/hide win screen
            if let Some(el) = document.get_element_by_id("win-screen") {
                if hud.phase == GamePhase::Won {
                    let _ = el.set_attribute("class", "");
                    set_text("#final-time", &hud.elapsed_clock());
                    if let Some(best) = self.best_time {
                        let secs = best / 1000;
                        set_text("#best-time", &format!("{}:{:02}", secs / 60, secs % 60));
                    }
                } else {
                    let _ = el.set_attribute("class", "hidden");
                }
            }
        }
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        if let Err(err) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::error_1(&format!("Failed to init logger: {err}").into());
        }

        log::info!("Stream Runner starting...");

        let Some(window) = web_sys::window() else {
            log::error!("No window");
            return;
        };

        if let Some(loading) = window
            .document()
            .and_then(|d| d.get_element_by_id("loading"))
        {
            let _ = loading.set_attribute("class", "hidden");
        }

        let store = match LocalStorageStore::open() {
            Ok(store) => Some(store),
            Err(err) => {
                log::warn!("Progress will not be saved: {err}");
                None
            }
        };

        let seed = js_sys::Date::now() as u64;
        let game = Rc::new(RefCell::new(Game::new(seed, Tuning::load(), store)));
        log::info!("Game initialized with seed: {}", seed);

        setup_input_handlers(game.clone());
        setup_auto_pause(game.clone());

        request_animation_frame(game);
        log::info!("Stream Runner running!");
    }

    fn setup_input_handlers(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };

        // Key down
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "ArrowLeft" | "a" | "A" => g.keys.left = true,
                    "ArrowRight" | "d" | "D" => g.keys.right = true,
                    "ArrowUp" | "w" | "W" => g.keys.forward = true,
                    " " => {
                        event.prevent_default();
                        if !event.repeat() {
                            g.input.boost = true;
                        }
                    }
                    "Escape" | "p" | "P" => g.input.pause = true,
                    "i" | "I" => {
                        g.input.autopilot = !g.input.autopilot;
                        log::info!("Autopilot: {}", g.input.autopilot);
                    }
                    "r" | "R" if g.state.phase == GamePhase::Won => {
                        g.restart(js_sys::Date::now() as u64);
                    }
                    "n" | "N" => g.new_game(js_sys::Date::now() as u64),
                    _ => {}
                }
            });
            let _ = window
                .add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Key up
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
                let mut g = game.borrow_mut();
                match event.key().as_str() {
                    "ArrowLeft" | "a" | "A" => g.keys.left = false,
                    "ArrowRight" | "d" | "D" => g.keys.right = false,
                    "ArrowUp" | "w" | "W" => g.keys.forward = false,
                    _ => {}
                }
            });
            let _ =
                window.add_event_listener_with_callback("keyup", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();

            // Calculate delta time
            let dt = if g.last_time > 0.0 {
                ((time - g.last_time) / 1000.0) as f32
            } else {
                SIM_DT
            };
            g.last_time = time;

            g.update(dt);
            if let Some(window) = web_sys::window() {
                if let Some(document) = window.document() {
                    g.update_hud(&document);
                }
                g.publish_view(&window);
            }
        }

        request_animation_frame(game);
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    let mut g = game.borrow_mut();
                    if g.state.phase == GamePhase::Racing {
                        g.input.pause = true;
                        g.save_game();
                        log::info!("Auto-paused (tab hidden)");
                    }
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                let mut g = game.borrow_mut();
                if g.state.phase == GamePhase::Racing {
                    g.input.pause = true;
                    log::info!("Auto-paused (window blur)");
                }
            });
            let _ =
                window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use stream_runner::consts::SIM_DT;
    use stream_runner::persistence::SaveData;
    use stream_runner::sim::{GameEvent, GamePhase, GameState, TickInput, tick};
    use stream_runner::view::HudView;

    env_logger::init();
    log::info!("Stream Runner (native) starting...");
    log::info!("Running a headless autopilot race; use `trunk serve` for the web version");

    let seed = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(42);
    let minutes: f32 = std::env::args()
        .nth(2)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(2.0);

    let tuning = stream_runner::Tuning::load();
    let mut state = GameState::new(seed, tuning);
    let input = TickInput {
        autopilot: true,
        ..Default::default()
    };

    let ticks = (minutes * 60.0 / SIM_DT) as u64;
    let mut bumps = 0u32;
    let mut pickups = 0u32;
    for _ in 0..ticks {
        tick(&mut state, &input, SIM_DT);
        for event in state.drain_events() {
            match event {
                GameEvent::PlayerBumped { .. } => bumps += 1,
                GameEvent::PowerupCollected { .. } => pickups += 1,
                _ => {}
            }
        }
        if state.phase == GamePhase::Won {
            break;
        }
    }

    let hud = HudView::capture(&state);
    log::info!(
        "Finished at stage {} ({}) in {}: {:.1}% of the run, position {}/{}, {} bumps, {} powerups",
        hud.stage,
        hud.stage_name,
        hud.elapsed_clock(),
        hud.overall_progress * 100.0,
        hud.race_position,
        hud.total_racers,
        bumps,
        pickups
    );

    match SaveData::from_state(&state, None).to_json() {
        Ok(json) => log::info!("Save blob: {json}"),
        Err(err) => log::warn!("Could not serialize progress: {err}"),
    }
}

//! Mineprint shell demo
//!
//! Opens a window with the configured clear colour and keeps it presenting.
//!
//! - Escape: close
//! - F5: toggle restart on close
//! - F11: toggle fullscreen
//! - V: cycle vsync mode

use std::cell::RefCell;
use std::rc::Rc;

use mineprint::prelude::*;

struct ShellDemo {
    base_title: String,
    title_timer: f32,
}

impl ShellDemo {
    const TITLE_REFRESH_SECONDS: f32 = 0.5;

    fn new(base_title: String) -> Self {
        Self {
            base_title,
            title_timer: 0.0,
        }
    }
}

impl AppLogic for ShellDemo {
    fn on_initialise(&mut self, ctx: &mut FrameContext<'_>) -> Result<(), AppError> {
        log::info!(
            "Window '{}' ready at {}x{} (vsync {})",
            ctx.window().title(),
            ctx.window().size().x,
            ctx.window().size().y,
            ctx.window().vsync()
        );
        Ok(())
    }

    fn on_update(&mut self, ctx: &mut FrameContext<'_>) {
        let (escape, f5, f11, v) = {
            let input = ctx.input();
            (
                input.is_key_down_this_frame(KeyCode::Escape),
                input.is_key_down_this_frame(KeyCode::F5),
                input.is_key_down_this_frame(KeyCode::F11),
                input.is_key_down_this_frame(KeyCode::V),
            )
        };

        if escape {
            ctx.close();
        }

        if f5 {
            let restart = !ctx.should_restart();
            ctx.request_restart(restart);
            log::info!("Restart on close: {restart}");
        }

        if f11 {
            if let Err(e) = ctx.window_mut().toggle_fullscreen() {
                log::warn!("Failed to toggle fullscreen: {e}");
            }
        }

        if v {
            let mode = ctx.window().vsync().next();
            match ctx.window_mut().set_vsync(mode) {
                Ok(()) => log::info!("VSync: {}", ctx.window().vsync()),
                Err(e) => log::warn!("Failed to change vsync: {e}"),
            }
        }

        self.title_timer += ctx.frame().delta_seconds;
        if self.title_timer >= Self::TITLE_REFRESH_SECONDS {
            self.title_timer = 0.0;
            let title = format!("{} - {} FPS", self.base_title, ctx.frame().fps);
            if let Err(e) = ctx.window_mut().set_title(&title) {
                log::warn!("Failed to update title: {e}");
            }
        }
    }

    fn on_shutdown(&mut self) {
        log::info!("Shell demo shutting down");
    }
}

fn launch() -> Result<ShutdownOutcome, AppError> {
    // Each launch has to ask for its own restart.
    Application::request_restart(false);

    let config = ApplicationConfig::load()?;
    let title = config.window.title.clone();
    let platform: SharedPlatform = Rc::new(RefCell::new(GlfwPlatform::new()));
    let mut app = Application::new(config, platform, NullGui::shared())?
        .with_logic(ShellDemo::new(title));

    let result = app.initialise().and_then(|()| app.run());
    let outcome = app.shutdown();
    result.map(|()| outcome)
}

fn main() {
    loop {
        match launch() {
            Ok(ShutdownOutcome::Exit) => break,
            Ok(ShutdownOutcome::Restart) => log::info!("Restarting application"),
            Err(e) => {
                eprintln!("Mineprint failed: {e}");
                log::error!("Mineprint failed: {e}");
                std::process::exit(1);
            }
        }
    }
}

//! End-to-end frame lifecycle on the headless platform

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use mineprint::core::CONFIG_ENV_VAR;
use mineprint::platform::{GraphicsCommand, PlatformEvent};
use mineprint::prelude::*;
use serial_test::serial;

fn quiet_config(name: &str) -> ApplicationConfig {
    let mut config = ApplicationConfig::new(name);
    config.logging.file = false;
    config
}

fn headless() -> (Rc<RefCell<HeadlessPlatform>>, SharedPlatform) {
    let platform = Rc::new(RefCell::new(HeadlessPlatform::new()));
    let shared: SharedPlatform = platform.clone();
    (platform, shared)
}

#[test]
#[serial]
fn test_restart_loop_builds_fresh_applications() {
    let launches = Rc::new(Cell::new(0));
    let mut outcome = ShutdownOutcome::Restart;

    while outcome == ShutdownOutcome::Restart {
        Application::request_restart(false);
        launches.set(launches.get() + 1);

        let (_headless, platform) = headless();
        let launch = launches.get();
        let mut app = Application::new(quiet_config("Restarting"), platform, NullGui::shared())
            .unwrap()
            .with_logic(move |ctx: &mut FrameContext<'_>| {
                // Only the first launch asks to come back.
                ctx.request_restart(launch == 1);
                ctx.close();
            });

        app.initialise().unwrap();
        app.run().unwrap();
        outcome = app.shutdown();
    }

    assert_eq!(launches.get(), 2);
    assert!(!Application::should_restart());
}

#[test]
#[serial]
fn test_config_file_drives_window_and_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.toml");

    let mut config = quiet_config("Configured");
    config.window.size = ivec2(800, 600);
    config.window.vsync = VSyncMode::Off;
    config.renderer.clear_color = [0.2, 0.3, 0.4, 1.0];
    config.save_to_file(&path).unwrap();

    std::env::set_var(CONFIG_ENV_VAR, &path);
    let loaded = ApplicationConfig::load();
    std::env::remove_var(CONFIG_ENV_VAR);
    let loaded = loaded.unwrap();
    assert_eq!(loaded.window.size, ivec2(800, 600));

    let (headless, platform) = headless();
    let mut app = Application::new(loaded, platform, NullGui::shared())
        .unwrap()
        .with_logic(|ctx: &mut FrameContext<'_>| ctx.close());
    app.initialise().unwrap();

    let id = app.window().id().unwrap();
    {
        let headless = headless.borrow();
        let window = headless.window(id).unwrap();
        assert_eq!(window.size, ivec2(800, 600));
        assert_eq!(window.title, "Configured");

        let device = headless.device().unwrap();
        assert_eq!(
            device.commands(),
            vec![
                GraphicsCommand::SetClearColor([0.2, 0.3, 0.4, 1.0]),
                GraphicsCommand::SetViewport {
                    x: 0,
                    y: 0,
                    width: 800,
                    height: 600,
                },
            ]
        );
    }

    app.run().unwrap();
    assert_eq!(app.renderer().frame_index(), 1);
    app.shutdown();
}

#[test]
#[serial]
fn test_resize_updates_viewport_before_logic() {
    let (headless, platform) = headless();
    let seen = Rc::new(Cell::new(ivec2(0, 0)));
    let observed = seen.clone();
    let mut app = Application::new(quiet_config("Resizing"), platform, NullGui::shared())
        .unwrap()
        .with_logic(move |ctx: &mut FrameContext<'_>| {
            observed.set(ctx.window().size());
            ctx.close();
        });
    app.initialise().unwrap();

    let id = app.window().id().unwrap();
    let device = headless.borrow().device().unwrap();
    device.clear_commands();
    headless.borrow_mut().push_event(PlatformEvent::Resized {
        window: id,
        size: ivec2(640, 480),
    });
    app.run().unwrap();

    assert_eq!(seen.get(), ivec2(640, 480));
    assert_eq!(
        device.commands().first(),
        Some(&GraphicsCommand::SetViewport {
            x: 0,
            y: 0,
            width: 640,
            height: 480,
        })
    );
    app.shutdown();
}

#[test]
#[serial]
fn test_draw_gui_runs_every_frame() {
    let (_headless, platform) = headless();
    let mut app = Application::new(quiet_config("Drawing"), platform, NullGui::shared())
        .unwrap()
        .with_logic(|ctx: &mut FrameContext<'_>| {
            if ctx.frame().frame_index == 4 {
                ctx.close();
            }
        });

    let frames = Rc::new(RefCell::new(Vec::new()));
    let recorded = frames.clone();
    app.on_draw_gui().bind(move |frame: &FrameInfo| {
        recorded.borrow_mut().push(frame.frame_index);
    });

    app.initialise().unwrap();
    app.run().unwrap();

    assert_eq!(*frames.borrow(), vec![0, 1, 2, 3, 4]);
    assert_eq!(app.renderer().frame_index(), 5);
    app.shutdown();
}

#[test]
#[serial]
fn test_shutdown_releases_native_resources() {
    let (headless, platform) = headless();
    let mut app = Application::new(quiet_config("Teardown"), platform, NullGui::shared())
        .unwrap()
        .with_logic(|ctx: &mut FrameContext<'_>| ctx.close());
    app.initialise().unwrap();
    assert_eq!(headless.borrow().window_count(), 1);
    assert_eq!(headless.borrow().context_count(), 1);

    app.run().unwrap();
    assert_eq!(app.shutdown(), ShutdownOutcome::Exit);
    assert_eq!(app.shutdown(), ShutdownOutcome::Exit);

    let headless = headless.borrow();
    assert_eq!(headless.window_count(), 0);
    assert_eq!(headless.context_count(), 0);
    assert!(!headless.is_initialized());
    assert!(!app.window().is_created());
}

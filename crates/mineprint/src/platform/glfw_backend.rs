//! GLFW platform backend
//!
//! Every native window gets its own event receiver; [`GlfwPlatform::poll_events`]
//! pumps GLFW once and translates whatever each receiver collected into
//! [`PlatformEvent`]s tagged with the window's handle. GLFW ties the OpenGL
//! context to its window, so a [`ContextId`] here is just a registration that
//! lets the shell create and destroy the two separately.

#![allow(unsafe_code)]

use std::rc::Rc;

use glfw::Context as _;
use slotmap::SlotMap;

use super::{
    ContextAttributes, ContextId, GlProfile, KeyboardEvent, MouseButtonEvent, MouseMotionEvent,
    MouseWheelEvent, Platform, PlatformError, PlatformEvent, SwapInterval, WindowId, WindowRect,
};
use crate::foundation::math::{centered_in, is_positive_extent, ivec2, IVec2, Vec2};
use crate::input::{KeyCode, Modifiers, MouseButton};
use crate::render::device::{GlDevice, GraphicsDevice};
use crate::render::gl_debug::DebugMessagePolicy;
use crate::render::window::WindowSpecification;

struct NativeWindow {
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
    context: Option<ContextId>,
}

/// Windows, contexts and events through GLFW
#[derive(Default)]
pub struct GlfwPlatform {
    glfw: Option<glfw::Glfw>,
    windows: SlotMap<WindowId, NativeWindow>,
    contexts: SlotMap<ContextId, WindowId>,
    current: Option<(WindowId, ContextId)>,
}

impl GlfwPlatform {
    /// Uninitialised backend; call [`Platform::init`] before use
    pub fn new() -> Self {
        Self::default()
    }

    fn glfw(&mut self) -> Result<&mut glfw::Glfw, PlatformError> {
        self.glfw.as_mut().ok_or(PlatformError::NotInitialized)
    }

    fn native(&mut self, id: WindowId) -> Result<&mut NativeWindow, PlatformError> {
        self.windows.get_mut(id).ok_or(PlatformError::UnknownWindow(id))
    }
}

fn extent(size: IVec2) -> Result<(u32, u32), PlatformError> {
    match (u32::try_from(size.x), u32::try_from(size.y)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(PlatformError::InvalidGeometry(format!("{}x{}", size.x, size.y))),
    }
}

/// Non-positive extents mean "no limit"
fn limit(size: IVec2) -> (Option<u32>, Option<u32>) {
    if is_positive_extent(&size) {
        (u32::try_from(size.x).ok(), u32::try_from(size.y).ok())
    } else {
        (None, None)
    }
}

impl Platform for GlfwPlatform {
    fn name(&self) -> &'static str {
        "GLFW"
    }

    fn init(&mut self) -> Result<(), PlatformError> {
        if self.glfw.is_some() {
            return Ok(());
        }
        let glfw = glfw::init(glfw::log_errors)
            .map_err(|e| PlatformError::InitializationFailed(format!("{e:?}")))?;
        log::info!("GLFW {} initialised", glfw::get_version_string());
        self.glfw = Some(glfw);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.glfw.is_some()
    }

    fn terminate(&mut self) {
        if self.glfw.is_none() {
            return;
        }
        glfw::make_context_current(None);
        self.current = None;
        self.contexts.clear();
        self.windows.clear();
        self.glfw = None;
        log::info!("GLFW terminated");
    }

    fn create_window(
        &mut self,
        spec: &WindowSpecification,
        attributes: &ContextAttributes,
    ) -> Result<WindowId, PlatformError> {
        let (width, height) = extent(spec.size)?;
        let glfw = self.glfw()?;

        glfw.default_window_hints();
        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::OpenGl));
        glfw.window_hint(glfw::WindowHint::ContextVersion(
            attributes.major_version,
            attributes.minor_version,
        ));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(match attributes.profile {
            GlProfile::Core => glfw::OpenGlProfileHint::Core,
            GlProfile::Compatibility => glfw::OpenGlProfileHint::Compat,
        }));
        glfw.window_hint(glfw::WindowHint::DoubleBuffer(attributes.double_buffer));
        glfw.window_hint(glfw::WindowHint::DepthBits(Some(attributes.depth_bits)));
        glfw.window_hint(glfw::WindowHint::StencilBits(Some(attributes.stencil_bits)));
        glfw.window_hint(glfw::WindowHint::OpenGlDebugContext(attributes.debug));
        glfw.window_hint(glfw::WindowHint::Visible(false));
        glfw.window_hint(glfw::WindowHint::Resizable(spec.resizable));
        #[cfg(target_os = "macos")]
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(true));

        let (mut window, events) = glfw
            .create_window(width, height, &spec.title, glfw::WindowMode::Windowed)
            .ok_or_else(|| {
                PlatformError::WindowCreationFailed(format!(
                    "GLFW could not create '{}' with OpenGL {}.{}",
                    spec.title, attributes.major_version, attributes.minor_version
                ))
            })?;
        window.set_all_polling(true);

        Ok(self.windows.insert(NativeWindow {
            window,
            events,
            context: None,
        }))
    }

    fn destroy_window(&mut self, window: WindowId) {
        if let Some(native) = self.windows.remove(window) {
            if let Some(context) = native.context {
                self.contexts.remove(context);
            }
            if self.current.is_some_and(|(current, _)| current == window) {
                glfw::make_context_current(None);
                self.current = None;
            }
            // Dropping the PWindow destroys the native window.
        }
    }

    fn create_context(&mut self, window: WindowId) -> Result<ContextId, PlatformError> {
        let native = self.native(window)?;
        if native.context.is_some() {
            return Err(PlatformError::ContextCreationFailed(
                "window already has a context".to_string(),
            ));
        }
        let context = self.contexts.insert(window);
        self.native(window)?.context = Some(context);
        Ok(context)
    }

    fn destroy_context(&mut self, context: ContextId) {
        if let Some(window) = self.contexts.remove(context) {
            if let Some(native) = self.windows.get_mut(window) {
                native.context = None;
            }
            if self.current.is_some_and(|(_, current)| current == context) {
                glfw::make_context_current(None);
                self.current = None;
            }
        }
    }

    fn make_context_current(&mut self, window: WindowId, context: ContextId) -> Result<(), PlatformError> {
        if self.contexts.get(context) != Some(&window) {
            return Err(PlatformError::UnknownContext(context));
        }
        self.native(window)?.window.make_current();
        self.current = Some((window, context));
        Ok(())
    }

    fn current_context(&self) -> Option<(WindowId, ContextId)> {
        self.current
    }

    fn set_swap_interval(&mut self, interval: SwapInterval) -> bool {
        if self.current.is_none() {
            return false;
        }
        let Some(glfw) = self.glfw.as_mut() else {
            return false;
        };

        let interval = match interval {
            SwapInterval::Immediate => glfw::SwapInterval::None,
            SwapInterval::Synchronized => glfw::SwapInterval::Sync(1),
            SwapInterval::Adaptive => {
                let supported = glfw.extension_supported("WGL_EXT_swap_control_tear")
                    || glfw.extension_supported("GLX_EXT_swap_control_tear");
                if !supported {
                    return false;
                }
                glfw::SwapInterval::Adaptive
            }
        };
        glfw.set_swap_interval(interval);
        true
    }

    fn swap_buffers(&mut self, window: WindowId) -> Result<(), PlatformError> {
        self.native(window)?.window.swap_buffers();
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        let Some(glfw) = self.glfw.as_mut() else {
            return Vec::new();
        };
        glfw.poll_events();

        let mut events = Vec::new();
        for (id, native) in &mut self.windows {
            for (_, event) in glfw::flush_messages(&native.events) {
                if matches!(event, glfw::WindowEvent::Close) {
                    // Closing is the application's decision, not GLFW's.
                    native.window.set_should_close(false);
                }
                if let Some(event) = translate_event(id, event) {
                    events.push(event);
                }
            }
        }
        events
    }

    fn set_window_title(&mut self, window: WindowId, title: &str) -> Result<(), PlatformError> {
        self.native(window)?.window.set_title(title);
        Ok(())
    }

    fn set_window_size(&mut self, window: WindowId, size: IVec2) -> Result<(), PlatformError> {
        extent(size)?;
        self.native(window)?.window.set_size(size.x, size.y);
        Ok(())
    }

    fn set_window_size_limits(&mut self, window: WindowId, min: IVec2, max: IVec2) -> Result<(), PlatformError> {
        let (min_w, min_h) = limit(min);
        let (max_w, max_h) = limit(max);
        self.native(window)?
            .window
            .set_size_limits(min_w, min_h, max_w, max_h);
        Ok(())
    }

    fn set_window_position(&mut self, window: WindowId, position: IVec2) -> Result<(), PlatformError> {
        self.native(window)?.window.set_pos(position.x, position.y);
        Ok(())
    }

    fn center_window(&mut self, window: WindowId) -> Result<IVec2, PlatformError> {
        let glfw = self.glfw.as_mut().ok_or(PlatformError::NotInitialized)?;
        let native = self
            .windows
            .get_mut(window)
            .ok_or(PlatformError::UnknownWindow(window))?;

        let (width, height) = native.window.get_size();
        let (origin, area) = glfw
            .with_primary_monitor(|_, monitor| {
                monitor.and_then(|m| {
                    let (x, y) = m.get_pos();
                    m.get_video_mode().map(|mode| {
                        (
                            ivec2(x, y),
                            ivec2(mode.width as i32, mode.height as i32),
                        )
                    })
                })
            })
            .ok_or(PlatformError::NoMonitor)?;

        let position = centered_in(origin, area, ivec2(width, height));
        native.window.set_pos(position.x, position.y);
        Ok(position)
    }

    fn set_window_fullscreen(
        &mut self,
        window: WindowId,
        fullscreen: bool,
        windowed: WindowRect,
    ) -> Result<WindowRect, PlatformError> {
        let glfw = self.glfw.as_mut().ok_or(PlatformError::NotInitialized)?;
        let native = self
            .windows
            .get_mut(window)
            .ok_or(PlatformError::UnknownWindow(window))?;

        if !fullscreen {
            let (width, height) = extent(windowed.size)?;
            native.window.set_monitor(
                glfw::WindowMode::Windowed,
                windowed.position.x,
                windowed.position.y,
                width,
                height,
                None,
            );
            return Ok(windowed);
        }

        glfw.with_primary_monitor(|_, monitor| {
            let monitor = monitor.ok_or(PlatformError::NoMonitor)?;
            let mode = monitor.get_video_mode().ok_or(PlatformError::NoMonitor)?;
            let (x, y) = monitor.get_pos();
            native.window.set_monitor(
                glfw::WindowMode::FullScreen(&*monitor),
                0,
                0,
                mode.width,
                mode.height,
                Some(mode.refresh_rate),
            );
            Ok(WindowRect {
                position: ivec2(x, y),
                size: ivec2(
                    i32::try_from(mode.width).unwrap_or(i32::MAX),
                    i32::try_from(mode.height).unwrap_or(i32::MAX),
                ),
            })
        })
    }

    fn set_window_resizable(&mut self, window: WindowId, resizable: bool) -> Result<(), PlatformError> {
        self.native(window)?.window.set_resizable(resizable);
        Ok(())
    }

    fn set_window_visible(&mut self, window: WindowId, visible: bool) -> Result<(), PlatformError> {
        let native = self.native(window)?;
        if visible {
            native.window.show();
        } else {
            native.window.hide();
        }
        Ok(())
    }

    fn set_cursor_locked(&mut self, window: WindowId, locked: bool) -> Result<(), PlatformError> {
        let mode = if locked {
            glfw::CursorMode::Disabled
        } else {
            glfw::CursorMode::Normal
        };
        self.native(window)?.window.set_cursor_mode(mode);
        Ok(())
    }

    fn is_cursor_locked(&self, window: WindowId) -> bool {
        self.windows
            .get(window)
            .is_some_and(|native| native.window.get_cursor_mode() == glfw::CursorMode::Disabled)
    }

    fn warp_cursor(&mut self, window: WindowId, position: Vec2) -> Result<(), PlatformError> {
        self.native(window)?
            .window
            .set_cursor_pos(f64::from(position.x), f64::from(position.y));
        Ok(())
    }

    fn load_graphics_device(
        &mut self,
        window: WindowId,
        debug: Option<DebugMessagePolicy>,
    ) -> Result<Rc<dyn GraphicsDevice>, PlatformError> {
        let context = self
            .native(window)?
            .context
            .ok_or_else(|| PlatformError::GraphicsLoadFailed("window has no graphics context".to_string()))?;
        self.make_context_current(window, context)?;

        let native = self.native(window)?;
        // SAFETY: the window's context was made current on this thread above and
        // stays current for as long as the shell renders into this window.
        let device = unsafe {
            GlDevice::load(|name| native.window.get_proc_address(name) as *const _, debug)
        };
        Ok(Rc::new(device))
    }

    fn show_message_box(&self, title: &str, message: &str, _parent: Option<WindowId>) {
        let _ = rfd::MessageDialog::new()
            .set_level(rfd::MessageLevel::Error)
            .set_title(title)
            .set_description(message)
            .set_buttons(rfd::MessageButtons::Ok)
            .show();
    }
}

fn translate_event(window: WindowId, event: glfw::WindowEvent) -> Option<PlatformEvent> {
    use glfw::WindowEvent as E;

    Some(match event {
        E::Close => PlatformEvent::CloseRequested { window },
        E::Size(w, h) => PlatformEvent::Resized {
            window,
            size: ivec2(w, h),
        },
        E::Pos(x, y) => PlatformEvent::Moved {
            window,
            position: ivec2(x, y),
        },
        E::Focus(focused) => PlatformEvent::FocusChanged { window, focused },
        E::Key(key, scancode, action, mods) => PlatformEvent::Keyboard(KeyboardEvent {
            window,
            key: map_key(key),
            scancode,
            pressed: action != glfw::Action::Release,
            repeat: action == glfw::Action::Repeat,
            modifiers: map_modifiers(mods),
        }),
        E::MouseButton(button, action, mods) => PlatformEvent::MouseButton(MouseButtonEvent {
            window,
            button: map_mouse_button(button),
            pressed: action != glfw::Action::Release,
            modifiers: map_modifiers(mods),
        }),
        E::CursorPos(x, y) => PlatformEvent::MouseMotion(MouseMotionEvent {
            window,
            x: x as f32,
            y: y as f32,
        }),
        E::Scroll(x, y) => PlatformEvent::MouseWheel(MouseWheelEvent {
            window,
            delta_x: x as f32,
            delta_y: y as f32,
        }),
        E::Char(character) => PlatformEvent::TextInput { window, character },
        _ => return None,
    })
}

fn map_modifiers(mods: glfw::Modifiers) -> Modifiers {
    let mut out = Modifiers::empty();
    out.set(Modifiers::SHIFT, mods.contains(glfw::Modifiers::Shift));
    out.set(Modifiers::CONTROL, mods.contains(glfw::Modifiers::Control));
    out.set(Modifiers::ALT, mods.contains(glfw::Modifiers::Alt));
    out.set(Modifiers::SUPER, mods.contains(glfw::Modifiers::Super));
    out.set(Modifiers::CAPS_LOCK, mods.contains(glfw::Modifiers::CapsLock));
    out.set(Modifiers::NUM_LOCK, mods.contains(glfw::Modifiers::NumLock));
    out
}

fn map_mouse_button(button: glfw::MouseButton) -> MouseButton {
    match button {
        glfw::MouseButton::Button1 => MouseButton::Left,
        glfw::MouseButton::Button2 => MouseButton::Right,
        glfw::MouseButton::Button3 => MouseButton::Middle,
        glfw::MouseButton::Button4 => MouseButton::Back,
        glfw::MouseButton::Button5 => MouseButton::Forward,
        other => MouseButton::Other(other as u8),
    }
}

fn map_key(key: glfw::Key) -> KeyCode {
    use glfw::Key as G;

    match key {
        G::A => KeyCode::A,
        G::B => KeyCode::B,
        G::C => KeyCode::C,
        G::D => KeyCode::D,
        G::E => KeyCode::E,
        G::F => KeyCode::F,
        G::G => KeyCode::G,
        G::H => KeyCode::H,
        G::I => KeyCode::I,
        G::J => KeyCode::J,
        G::K => KeyCode::K,
        G::L => KeyCode::L,
        G::M => KeyCode::M,
        G::N => KeyCode::N,
        G::O => KeyCode::O,
        G::P => KeyCode::P,
        G::Q => KeyCode::Q,
        G::R => KeyCode::R,
        G::S => KeyCode::S,
        G::T => KeyCode::T,
        G::U => KeyCode::U,
        G::V => KeyCode::V,
        G::W => KeyCode::W,
        G::X => KeyCode::X,
        G::Y => KeyCode::Y,
        G::Z => KeyCode::Z,
        G::Num0 => KeyCode::Num0,
        G::Num1 => KeyCode::Num1,
        G::Num2 => KeyCode::Num2,
        G::Num3 => KeyCode::Num3,
        G::Num4 => KeyCode::Num4,
        G::Num5 => KeyCode::Num5,
        G::Num6 => KeyCode::Num6,
        G::Num7 => KeyCode::Num7,
        G::Num8 => KeyCode::Num8,
        G::Num9 => KeyCode::Num9,
        G::F1 => KeyCode::F1,
        G::F2 => KeyCode::F2,
        G::F3 => KeyCode::F3,
        G::F4 => KeyCode::F4,
        G::F5 => KeyCode::F5,
        G::F6 => KeyCode::F6,
        G::F7 => KeyCode::F7,
        G::F8 => KeyCode::F8,
        G::F9 => KeyCode::F9,
        G::F10 => KeyCode::F10,
        G::F11 => KeyCode::F11,
        G::F12 => KeyCode::F12,
        G::Space => KeyCode::Space,
        G::Enter => KeyCode::Enter,
        G::Escape => KeyCode::Escape,
        G::Tab => KeyCode::Tab,
        G::Backspace => KeyCode::Backspace,
        G::Insert => KeyCode::Insert,
        G::Delete => KeyCode::Delete,
        G::Home => KeyCode::Home,
        G::End => KeyCode::End,
        G::PageUp => KeyCode::PageUp,
        G::PageDown => KeyCode::PageDown,
        G::Up => KeyCode::Up,
        G::Down => KeyCode::Down,
        G::Left => KeyCode::Left,
        G::Right => KeyCode::Right,
        G::LeftShift => KeyCode::LeftShift,
        G::RightShift => KeyCode::RightShift,
        G::LeftControl => KeyCode::LeftControl,
        G::RightControl => KeyCode::RightControl,
        G::LeftAlt => KeyCode::LeftAlt,
        G::RightAlt => KeyCode::RightAlt,
        G::LeftSuper => KeyCode::LeftSuper,
        G::RightSuper => KeyCode::RightSuper,
        G::CapsLock => KeyCode::CapsLock,
        G::GraveAccent => KeyCode::Grave,
        G::Minus => KeyCode::Minus,
        G::Equal => KeyCode::Equal,
        G::LeftBracket => KeyCode::LeftBracket,
        G::RightBracket => KeyCode::RightBracket,
        G::Backslash => KeyCode::Backslash,
        G::Semicolon => KeyCode::Semicolon,
        G::Apostrophe => KeyCode::Apostrophe,
        G::Comma => KeyCode::Comma,
        G::Period => KeyCode::Period,
        G::Slash => KeyCode::Slash,
        _ => KeyCode::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(map_key(glfw::Key::Escape), KeyCode::Escape);
        assert_eq!(map_key(glfw::Key::F11), KeyCode::F11);
        assert_eq!(map_key(glfw::Key::GraveAccent), KeyCode::Grave);
        assert_eq!(map_key(glfw::Key::Menu), KeyCode::Unknown);
    }

    #[test]
    fn test_mouse_button_mapping() {
        assert_eq!(map_mouse_button(glfw::MouseButton::Button1), MouseButton::Left);
        assert_eq!(map_mouse_button(glfw::MouseButton::Button2), MouseButton::Right);
        assert_eq!(map_mouse_button(glfw::MouseButton::Button3), MouseButton::Middle);
        assert_eq!(map_mouse_button(glfw::MouseButton::Button8), MouseButton::Other(7));
    }

    #[test]
    fn test_modifier_mapping() {
        let mods = map_modifiers(glfw::Modifiers::Shift | glfw::Modifiers::Control);
        assert_eq!(mods, Modifiers::SHIFT | Modifiers::CONTROL);
    }

    #[test]
    fn test_event_translation() {
        let id = WindowId::default();
        let event = translate_event(
            id,
            glfw::WindowEvent::Key(
                glfw::Key::Space,
                65,
                glfw::Action::Repeat,
                glfw::Modifiers::empty(),
            ),
        );
        match event {
            Some(PlatformEvent::Keyboard(key)) => {
                assert_eq!(key.key, KeyCode::Space);
                assert!(key.pressed && key.repeat);
                assert_eq!(key.scancode, 65);
            }
            other => panic!("unexpected {other:?}"),
        }

        assert_eq!(
            translate_event(id, glfw::WindowEvent::Size(640, 480)),
            Some(PlatformEvent::Resized {
                window: id,
                size: ivec2(640, 480),
            })
        );
        assert_eq!(translate_event(id, glfw::WindowEvent::Refresh), None);
    }

    #[test]
    fn test_limits_and_extent() {
        assert_eq!(limit(ivec2(0, 0)), (None, None));
        assert_eq!(limit(ivec2(320, 240)), (Some(320), Some(240)));
        assert!(extent(ivec2(-1, 10)).is_err());
        assert_eq!(extent(ivec2(800, 600)).unwrap(), (800, 600));
    }
}

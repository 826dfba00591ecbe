//! Input management system
//!
//! [`InputManager`] keeps a per-frame snapshot of keyboard and mouse state.
//! Call [`InputManager::pre_update`] exactly once per frame before polling
//! window events: it clears the "this frame" transitions, and the events that
//! follow set them again.

use std::collections::HashSet;
use std::hash::Hash;

use bitflags::bitflags;

use crate::foundation::math::Vec2;
use crate::platform::{KeyboardEvent, MouseButtonEvent, MouseMotionEvent, MouseWheelEvent};

/// Held state plus the transitions seen since the last `clear_frame`
#[derive(Debug)]
struct Transitions<T> {
    down: HashSet<T>,
    pressed: HashSet<T>,
    released: HashSet<T>,
}

impl<T: Copy + Eq + Hash> Transitions<T> {
    fn new() -> Self {
        Self {
            down: HashSet::new(),
            pressed: HashSet::new(),
            released: HashSet::new(),
        }
    }

    /// Duplicate presses of a held input are not new transitions
    fn press(&mut self, input: T) {
        if self.down.insert(input) {
            self.pressed.insert(input);
        }
    }

    fn release(&mut self, input: T) {
        if self.down.remove(&input) {
            self.released.insert(input);
        }
    }

    fn release_all(&mut self) {
        self.released.extend(self.down.drain());
    }

    fn clear_frame(&mut self) {
        self.pressed.clear();
        self.released.clear();
    }

    fn clear(&mut self) {
        self.down.clear();
        self.clear_frame();
    }
}

/// Input manager
#[derive(Debug)]
pub struct InputManager {
    initialized: bool,
    keys: Transitions<KeyCode>,
    scancodes: Transitions<i32>,
    buttons: Transitions<MouseButton>,
    mouse_position: Option<Vec2>,
    mouse_delta: Vec2,
    wheel_delta: Vec2,
    modifiers: Modifiers,
    text: String,
    focused: bool,
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager {
    /// Create a new input manager
    pub fn new() -> Self {
        Self {
            initialized: false,
            keys: Transitions::new(),
            scancodes: Transitions::new(),
            buttons: Transitions::new(),
            mouse_position: None,
            mouse_delta: Vec2::zeros(),
            wheel_delta: Vec2::zeros(),
            modifiers: Modifiers::empty(),
            text: String::new(),
            focused: true,
        }
    }

    /// Start tracking input
    pub fn init(&mut self) {
        self.reset();
        self.initialized = true;
        log::debug!("Input system initialised");
    }

    /// Stop tracking input and forget all state
    pub fn shutdown(&mut self) {
        if self.initialized {
            log::debug!("Input system shut down");
        }
        self.reset();
        self.initialized = false;
    }

    /// Whether `init` has been called without a matching `shutdown`
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Clear per-frame transitions. Call once per frame, before polling events.
    pub fn pre_update(&mut self) {
        self.keys.clear_frame();
        self.scancodes.clear_frame();
        self.buttons.clear_frame();
        self.mouse_delta = Vec2::zeros();
        self.wheel_delta = Vec2::zeros();
        self.text.clear();
    }

    /// Apply a key press or release.
    ///
    /// Every key is tracked by scancode; keys with a [`KeyCode`] are also
    /// tracked by name.
    pub fn process_keyboard_event(&mut self, event: &KeyboardEvent) {
        self.modifiers = event.modifiers;
        let named = event.key != KeyCode::Unknown;

        if event.pressed {
            // Auto-repeat must not re-trigger "down this frame".
            if event.repeat {
                return;
            }
            self.scancodes.press(event.scancode);
            if named {
                self.keys.press(event.key);
            }
        } else {
            self.scancodes.release(event.scancode);
            if named {
                self.keys.release(event.key);
            }
        }
    }

    /// Apply a mouse button press or release
    pub fn process_mouse_button_event(&mut self, event: &MouseButtonEvent) {
        self.modifiers = event.modifiers;
        if event.pressed {
            self.buttons.press(event.button);
        } else {
            self.buttons.release(event.button);
        }
    }

    /// Apply cursor movement
    pub fn process_mouse_motion_event(&mut self, event: &MouseMotionEvent) {
        let position = Vec2::new(event.x, event.y);
        // The first sample only establishes where the cursor is.
        if let Some(previous) = self.mouse_position {
            self.mouse_delta += position - previous;
        }
        self.mouse_position = Some(position);
    }

    /// Accumulate scroll wheel movement
    pub fn process_mouse_wheel_event(&mut self, event: &MouseWheelEvent) {
        self.wheel_delta += Vec2::new(event.delta_x, event.delta_y);
    }

    /// Append a typed character to this frame's text
    pub fn process_text_input(&mut self, character: char) {
        self.text.push(character);
    }

    /// Track window focus. Losing focus releases everything held, since the
    /// matching release events go to whichever window has focus instead.
    pub fn process_focus_event(&mut self, focused: bool) {
        self.focused = focused;
        if !focused {
            self.keys.release_all();
            self.scancodes.release_all();
            self.buttons.release_all();
            self.modifiers = Modifiers::empty();
        }
    }

    /// Whether `key` is currently held
    pub fn is_key_down(&self, key: KeyCode) -> bool {
        self.keys.down.contains(&key)
    }

    /// Whether `key` went down since the last `pre_update`
    pub fn is_key_down_this_frame(&self, key: KeyCode) -> bool {
        self.keys.pressed.contains(&key)
    }

    /// Whether `key` went up since the last `pre_update`
    pub fn is_key_up_this_frame(&self, key: KeyCode) -> bool {
        self.keys.released.contains(&key)
    }

    /// Whether the key with platform `scancode` is currently held
    pub fn is_scancode_down(&self, scancode: i32) -> bool {
        self.scancodes.down.contains(&scancode)
    }

    /// Whether the key with platform `scancode` went down since the last `pre_update`
    pub fn is_scancode_down_this_frame(&self, scancode: i32) -> bool {
        self.scancodes.pressed.contains(&scancode)
    }

    /// Whether the key with platform `scancode` went up since the last `pre_update`
    pub fn is_scancode_up_this_frame(&self, scancode: i32) -> bool {
        self.scancodes.released.contains(&scancode)
    }

    /// Whether `button` is currently held
    pub fn is_mouse_button_down(&self, button: MouseButton) -> bool {
        self.buttons.down.contains(&button)
    }

    /// Whether `button` went down since the last `pre_update`
    pub fn is_mouse_button_down_this_frame(&self, button: MouseButton) -> bool {
        self.buttons.pressed.contains(&button)
    }

    /// Whether `button` went up since the last `pre_update`
    pub fn is_mouse_button_up_this_frame(&self, button: MouseButton) -> bool {
        self.buttons.released.contains(&button)
    }

    /// Cursor position in window coordinates, zero until the first motion event
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position.unwrap_or_else(Vec2::zeros)
    }

    /// Cursor movement accumulated this frame
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Scroll accumulated this frame
    pub fn wheel_delta(&self) -> Vec2 {
        self.wheel_delta
    }

    /// Modifier keys reported by the most recent key or button event
    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// Characters typed this frame
    pub fn text_input(&self) -> &str {
        &self.text
    }

    /// Whether the window had input focus at the last focus event
    pub fn has_focus(&self) -> bool {
        self.focused
    }

    fn reset(&mut self) {
        self.keys.clear();
        self.scancodes.clear();
        self.buttons.clear();
        self.pre_update();
        self.mouse_position = None;
        self.modifiers = Modifiers::empty();
        self.focused = true;
    }
}

bitflags! {
    /// Modifier keys held during an input event
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Either Shift key
        const SHIFT = 1 << 0;
        /// Either Control key
        const CONTROL = 1 << 1;
        /// Either Alt key
        const ALT = 1 << 2;
        /// Either Super key
        const SUPER = 1 << 3;
        /// Caps Lock is active
        const CAPS_LOCK = 1 << 4;
        /// Num Lock is active
        const NUM_LOCK = 1 << 5;
    }
}

/// Physical key positions (US layout names)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A key
    A,
    /// B key
    B,
    /// C key
    C,
    /// D key
    D,
    /// E key
    E,
    /// F key
    F,
    /// G key
    G,
    /// H key
    H,
    /// I key
    I,
    /// J key
    J,
    /// K key
    K,
    /// L key
    L,
    /// M key
    M,
    /// N key
    N,
    /// O key
    O,
    /// P key
    P,
    /// Q key
    Q,
    /// R key
    R,
    /// S key
    S,
    /// T key
    T,
    /// U key
    U,
    /// V key
    V,
    /// W key
    W,
    /// X key
    X,
    /// Y key
    Y,
    /// Z key
    Z,
    /// 0 key on the main row
    Num0,
    /// 1 key on the main row
    Num1,
    /// 2 key on the main row
    Num2,
    /// 3 key on the main row
    Num3,
    /// 4 key on the main row
    Num4,
    /// 5 key on the main row
    Num5,
    /// 6 key on the main row
    Num6,
    /// 7 key on the main row
    Num7,
    /// 8 key on the main row
    Num8,
    /// 9 key on the main row
    Num9,
    /// F1 function key
    F1,
    /// F2 function key
    F2,
    /// F3 function key
    F3,
    /// F4 function key
    F4,
    /// F5 function key
    F5,
    /// F6 function key
    F6,
    /// F7 function key
    F7,
    /// F8 function key
    F8,
    /// F9 function key
    F9,
    /// F10 function key
    F10,
    /// F11 function key
    F11,
    /// F12 function key
    F12,
    /// Space bar
    Space,
    /// Enter key
    Enter,
    /// Escape key
    Escape,
    /// Tab key
    Tab,
    /// Backspace key
    Backspace,
    /// Insert key
    Insert,
    /// Delete key
    Delete,
    /// Home key
    Home,
    /// End key
    End,
    /// Page Up key
    PageUp,
    /// Page Down key
    PageDown,
    /// Up arrow
    Up,
    /// Down arrow
    Down,
    /// Left arrow
    Left,
    /// Right arrow
    Right,
    /// Left Shift
    LeftShift,
    /// Right Shift
    RightShift,
    /// Left Control
    LeftControl,
    /// Right Control
    RightControl,
    /// Left Alt
    LeftAlt,
    /// Right Alt
    RightAlt,
    /// Left Super / Windows / Command
    LeftSuper,
    /// Right Super / Windows / Command
    RightSuper,
    /// Caps Lock
    CapsLock,
    /// Grave accent / tilde
    Grave,
    /// Minus key
    Minus,
    /// Equals key
    Equal,
    /// Left bracket
    LeftBracket,
    /// Right bracket
    RightBracket,
    /// Backslash
    Backslash,
    /// Semicolon
    Semicolon,
    /// Apostrophe
    Apostrophe,
    /// Comma
    Comma,
    /// Period
    Period,
    /// Slash
    Slash,
    /// Key the platform could not identify
    Unknown,
}

/// Mouse buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left mouse button
    Left,
    /// Right mouse button
    Right,
    /// Middle mouse button
    Middle,
    /// Back side button
    Back,
    /// Forward side button
    Forward,
    /// Any other button, by platform index
    Other(u8),
}

//! In-memory platform
//!
//! [`HeadlessPlatform`] implements [`Platform`] without touching the display.
//! Windows are plain records, events are pushed by the caller, and graphics
//! calls go to a [`RecordingDevice`]. Tests use it to script whole frames; it
//! also lets the application shell run on machines without a GPU.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use slotmap::SlotMap;

use super::{
    ContextAttributes, ContextId, Platform, PlatformError, PlatformEvent, SwapInterval, WindowId,
    WindowRect,
};
use crate::foundation::math::{centered_in, ivec2, IVec2, Vec2};
use crate::render::device::{ClearMask, DeviceInfo, GraphicsDevice};
use crate::render::gl_debug::DebugMessagePolicy;
use crate::render::window::WindowSpecification;

/// Shared, ordered log of calls made against the headless platform and its devices
pub type CallTrace = Rc<RefCell<Vec<String>>>;

/// State of one headless window
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessWindow {
    /// Current title
    pub title: String,
    /// Client size in screen coordinates
    pub size: IVec2,
    /// Minimum size limit, zero when unset
    pub min_size: IVec2,
    /// Maximum size limit, zero when unset
    pub max_size: IVec2,
    /// Top-left position on the fake monitor
    pub position: IVec2,
    /// Whether the window is shown
    pub visible: bool,
    /// Whether the user may resize the window
    pub resizable: bool,
    /// Whether the window covers the monitor
    pub fullscreen: bool,
    /// Whether the cursor is captured
    pub cursor_locked: bool,
    /// Last position passed to `warp_cursor`
    pub cursor_position: Option<Vec2>,
    /// Context created for this window, if any
    pub context: Option<ContextId>,
    /// Attributes the context was requested with
    pub attributes: ContextAttributes,
    /// Number of presented frames
    pub swap_count: u64,
}

/// Graphics call recorded by [`RecordingDevice`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GraphicsCommand {
    /// `set_clear_color`
    SetClearColor([f32; 4]),
    /// `clear`
    Clear(ClearMask),
    /// `set_viewport`
    SetViewport {
        /// Left edge
        x: i32,
        /// Bottom edge
        y: i32,
        /// Width
        width: i32,
        /// Height
        height: i32,
    },
}

/// Graphics device that records every call
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: RefCell<Vec<GraphicsCommand>>,
    trace: Option<CallTrace>,
}

impl RecordingDevice {
    /// Create a device, optionally mirroring calls into `trace`
    pub fn new(trace: Option<CallTrace>) -> Self {
        Self {
            commands: RefCell::new(Vec::new()),
            trace,
        }
    }

    /// Every call so far, oldest first
    pub fn commands(&self) -> Vec<GraphicsCommand> {
        self.commands.borrow().clone()
    }

    /// Forget recorded calls
    pub fn clear_commands(&self) {
        self.commands.borrow_mut().clear();
    }

    fn record(&self, command: GraphicsCommand, name: &str) {
        self.commands.borrow_mut().push(command);
        if let Some(trace) = &self.trace {
            trace.borrow_mut().push(name.to_string());
        }
    }
}

impl GraphicsDevice for RecordingDevice {
    fn info(&self) -> DeviceInfo {
        DeviceInfo {
            version: "4.5 (headless)".to_string(),
            vendor: "Mineprint".to_string(),
            renderer: "Recording device".to_string(),
        }
    }

    fn set_clear_color(&self, color: [f32; 4]) {
        self.record(GraphicsCommand::SetClearColor(color), "device.set_clear_color");
    }

    fn clear(&self, mask: ClearMask) {
        self.record(GraphicsCommand::Clear(mask), "device.clear");
    }

    fn set_viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        self.record(
            GraphicsCommand::SetViewport {
                x,
                y,
                width,
                height,
            },
            "device.set_viewport",
        );
    }
}

/// Scripted platform with no native resources
#[derive(Debug)]
pub struct HeadlessPlatform {
    initialized: bool,
    windows: SlotMap<WindowId, HeadlessWindow>,
    contexts: SlotMap<ContextId, WindowId>,
    current: Option<(WindowId, ContextId)>,
    events: VecDeque<PlatformEvent>,
    monitor: Option<(IVec2, IVec2)>,
    adaptive_vsync_supported: bool,
    swap_interval: Option<SwapInterval>,
    fail_init: Option<String>,
    fail_window: Option<String>,
    fail_context: Option<String>,
    device: Option<Rc<RecordingDevice>>,
    debug_policy: Option<DebugMessagePolicy>,
    message_boxes: RefCell<Vec<(String, String)>>,
    trace: Option<CallTrace>,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    /// Platform with a single 1920x1080 monitor at the origin
    pub fn new() -> Self {
        Self {
            initialized: false,
            windows: SlotMap::with_key(),
            contexts: SlotMap::with_key(),
            current: None,
            events: VecDeque::new(),
            monitor: Some((ivec2(0, 0), ivec2(1920, 1080))),
            adaptive_vsync_supported: true,
            swap_interval: None,
            fail_init: None,
            fail_window: None,
            fail_context: None,
            device: None,
            debug_policy: None,
            message_boxes: RefCell::new(Vec::new()),
            trace: None,
        }
    }

    /// Queue an event for the next `poll_events`
    pub fn push_event(&mut self, event: PlatformEvent) {
        self.events.push_back(event);
    }

    /// Replace the primary monitor (origin, size), or remove it
    pub fn set_monitor(&mut self, monitor: Option<(IVec2, IVec2)>) {
        self.monitor = monitor;
    }

    /// Control whether adaptive vsync reports as available
    pub fn set_adaptive_vsync_supported(&mut self, supported: bool) {
        self.adaptive_vsync_supported = supported;
    }

    /// Make the next `init` fail
    pub fn fail_next_init(&mut self, reason: &str) {
        self.fail_init = Some(reason.to_string());
    }

    /// Make the next `create_window` fail
    pub fn fail_next_window(&mut self, reason: &str) {
        self.fail_window = Some(reason.to_string());
    }

    /// Make the next `create_context` fail
    pub fn fail_next_context(&mut self, reason: &str) {
        self.fail_context = Some(reason.to_string());
    }

    /// Mirror platform and device calls into `trace`
    pub fn set_trace(&mut self, trace: CallTrace) {
        self.trace = Some(trace);
    }

    /// State of a live window
    pub fn window(&self, id: WindowId) -> Option<&HeadlessWindow> {
        self.windows.get(id)
    }

    /// Number of live windows
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    /// Number of live graphics contexts
    pub fn context_count(&self) -> usize {
        self.contexts.len()
    }

    /// Swap interval last accepted by `set_swap_interval`
    pub fn swap_interval(&self) -> Option<SwapInterval> {
        self.swap_interval
    }

    /// Device handed out by the last `load_graphics_device`
    pub fn device(&self) -> Option<Rc<RecordingDevice>> {
        self.device.clone()
    }

    /// Debug policy passed to the last `load_graphics_device`
    pub fn debug_policy(&self) -> Option<&DebugMessagePolicy> {
        self.debug_policy.as_ref()
    }

    /// Every (title, message) shown through `show_message_box`
    pub fn message_boxes(&self) -> Vec<(String, String)> {
        self.message_boxes.borrow().clone()
    }

    fn record(&self, call: &str) {
        if let Some(trace) = &self.trace {
            trace.borrow_mut().push(call.to_string());
        }
    }

    fn window_mut(&mut self, id: WindowId) -> Result<&mut HeadlessWindow, PlatformError> {
        self.windows.get_mut(id).ok_or(PlatformError::UnknownWindow(id))
    }
}

impl Platform for HeadlessPlatform {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn init(&mut self) -> Result<(), PlatformError> {
        if let Some(reason) = self.fail_init.take() {
            return Err(PlatformError::InitializationFailed(reason));
        }
        self.initialized = true;
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn terminate(&mut self) {
        self.windows.clear();
        self.contexts.clear();
        self.current = None;
        self.events.clear();
        self.device = None;
        self.initialized = false;
    }

    fn create_window(
        &mut self,
        spec: &WindowSpecification,
        attributes: &ContextAttributes,
    ) -> Result<WindowId, PlatformError> {
        if !self.initialized {
            return Err(PlatformError::NotInitialized);
        }
        if let Some(reason) = self.fail_window.take() {
            return Err(PlatformError::WindowCreationFailed(reason));
        }

        Ok(self.windows.insert(HeadlessWindow {
            title: spec.title.clone(),
            size: spec.size,
            min_size: spec.min_size,
            max_size: spec.max_size,
            position: spec.position,
            visible: false,
            resizable: spec.resizable,
            fullscreen: false,
            cursor_locked: false,
            cursor_position: None,
            context: None,
            attributes: attributes.clone(),
            swap_count: 0,
        }))
    }

    fn destroy_window(&mut self, window: WindowId) {
        if let Some(removed) = self.windows.remove(window) {
            if let Some(context) = removed.context {
                self.contexts.remove(context);
            }
            if self.current.is_some_and(|(current, _)| current == window) {
                self.current = None;
            }
        }
    }

    fn create_context(&mut self, window: WindowId) -> Result<ContextId, PlatformError> {
        if let Some(reason) = self.fail_context.take() {
            return Err(PlatformError::ContextCreationFailed(reason));
        }
        if !self.windows.contains_key(window) {
            return Err(PlatformError::UnknownWindow(window));
        }
        let context = self.contexts.insert(window);
        self.window_mut(window)?.context = Some(context);
        Ok(context)
    }

    fn destroy_context(&mut self, context: ContextId) {
        if let Some(window) = self.contexts.remove(context) {
            if let Some(entry) = self.windows.get_mut(window) {
                entry.context = None;
            }
            if self.current.is_some_and(|(_, current)| current == context) {
                self.current = None;
            }
        }
    }

    fn make_context_current(&mut self, window: WindowId, context: ContextId) -> Result<(), PlatformError> {
        match self.contexts.get(context) {
            Some(owner) if *owner == window => {
                self.current = Some((window, context));
                Ok(())
            }
            Some(_) => Err(PlatformError::ContextCreationFailed(
                "context belongs to another window".to_string(),
            )),
            None => Err(PlatformError::UnknownContext(context)),
        }
    }

    fn current_context(&self) -> Option<(WindowId, ContextId)> {
        self.current
    }

    fn set_swap_interval(&mut self, interval: SwapInterval) -> bool {
        if self.current.is_none() {
            return false;
        }
        if interval == SwapInterval::Adaptive && !self.adaptive_vsync_supported {
            return false;
        }
        self.swap_interval = Some(interval);
        true
    }

    fn swap_buffers(&mut self, window: WindowId) -> Result<(), PlatformError> {
        self.window_mut(window)?.swap_count += 1;
        self.record("platform.swap_buffers");
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<PlatformEvent> {
        self.record("platform.poll_events");
        self.events.drain(..).collect()
    }

    fn set_window_title(&mut self, window: WindowId, title: &str) -> Result<(), PlatformError> {
        self.window_mut(window)?.title = title.to_string();
        Ok(())
    }

    fn set_window_size(&mut self, window: WindowId, size: IVec2) -> Result<(), PlatformError> {
        self.window_mut(window)?.size = size;
        Ok(())
    }

    fn set_window_size_limits(&mut self, window: WindowId, min: IVec2, max: IVec2) -> Result<(), PlatformError> {
        let entry = self.window_mut(window)?;
        entry.min_size = min;
        entry.max_size = max;
        Ok(())
    }

    fn set_window_position(&mut self, window: WindowId, position: IVec2) -> Result<(), PlatformError> {
        self.window_mut(window)?.position = position;
        Ok(())
    }

    fn center_window(&mut self, window: WindowId) -> Result<IVec2, PlatformError> {
        let (origin, area) = self.monitor.ok_or(PlatformError::NoMonitor)?;
        let entry = self.window_mut(window)?;
        entry.position = centered_in(origin, area, entry.size);
        Ok(entry.position)
    }

    fn set_window_fullscreen(
        &mut self,
        window: WindowId,
        fullscreen: bool,
        windowed: WindowRect,
    ) -> Result<WindowRect, PlatformError> {
        let monitor = self.monitor;
        let entry = self.window_mut(window)?;
        let rect = if fullscreen {
            let (position, size) = monitor.ok_or(PlatformError::NoMonitor)?;
            WindowRect { position, size }
        } else {
            windowed
        };
        entry.position = rect.position;
        entry.size = rect.size;
        entry.fullscreen = fullscreen;
        Ok(rect)
    }

    fn set_window_resizable(&mut self, window: WindowId, resizable: bool) -> Result<(), PlatformError> {
        self.window_mut(window)?.resizable = resizable;
        Ok(())
    }

    fn set_window_visible(&mut self, window: WindowId, visible: bool) -> Result<(), PlatformError> {
        self.window_mut(window)?.visible = visible;
        Ok(())
    }

    fn set_cursor_locked(&mut self, window: WindowId, locked: bool) -> Result<(), PlatformError> {
        self.window_mut(window)?.cursor_locked = locked;
        Ok(())
    }

    fn is_cursor_locked(&self, window: WindowId) -> bool {
        self.windows.get(window).is_some_and(|w| w.cursor_locked)
    }

    fn warp_cursor(&mut self, window: WindowId, position: Vec2) -> Result<(), PlatformError> {
        self.window_mut(window)?.cursor_position = Some(position);
        Ok(())
    }

    fn load_graphics_device(
        &mut self,
        window: WindowId,
        debug: Option<DebugMessagePolicy>,
    ) -> Result<Rc<dyn GraphicsDevice>, PlatformError> {
        let entry = self.windows.get(window).ok_or(PlatformError::UnknownWindow(window))?;
        if entry.context.is_none() {
            return Err(PlatformError::GraphicsLoadFailed(
                "window has no graphics context".to_string(),
            ));
        }

        let device = Rc::new(RecordingDevice::new(self.trace.clone()));
        self.device = Some(device.clone());
        self.debug_policy = debug;
        Ok(device)
    }

    fn show_message_box(&self, title: &str, message: &str, _parent: Option<WindowId>) {
        log::error!("{title}: {message}");
        self.message_boxes
            .borrow_mut()
            .push((title.to_string(), message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn platform_with_window() -> (HeadlessPlatform, WindowId) {
        let mut platform = HeadlessPlatform::new();
        platform.init().unwrap();
        let id = platform
            .create_window(&WindowSpecification::default(), &ContextAttributes::default())
            .unwrap();
        (platform, id)
    }

    #[test]
    fn test_create_requires_init() {
        let mut platform = HeadlessPlatform::new();
        let result =
            platform.create_window(&WindowSpecification::default(), &ContextAttributes::default());
        assert!(matches!(result, Err(PlatformError::NotInitialized)));
    }

    #[test]
    fn test_windows_start_hidden() {
        let (platform, id) = platform_with_window();
        let window = platform.window(id).unwrap();
        assert!(!window.visible);
        assert_eq!(window.size, ivec2(1280, 720));
    }

    #[test]
    fn test_swap_interval_needs_current_context() {
        let (mut platform, id) = platform_with_window();
        assert!(!platform.set_swap_interval(SwapInterval::Synchronized));

        let context = platform.create_context(id).unwrap();
        platform.make_context_current(id, context).unwrap();
        assert!(platform.set_swap_interval(SwapInterval::Synchronized));

        platform.set_adaptive_vsync_supported(false);
        assert!(!platform.set_swap_interval(SwapInterval::Adaptive));
        assert_eq!(platform.swap_interval(), Some(SwapInterval::Synchronized));
    }

    #[test]
    fn test_destroy_window_releases_context() {
        let (mut platform, id) = platform_with_window();
        let context = platform.create_context(id).unwrap();
        platform.make_context_current(id, context).unwrap();

        platform.destroy_window(id);
        assert_eq!(platform.window_count(), 0);
        assert_eq!(platform.context_count(), 0);
        assert_eq!(platform.current_context(), None);

        // Stale handles are ignored or rejected, never panics
        platform.destroy_window(id);
        platform.destroy_context(context);
        assert!(platform.set_window_title(id, "gone").is_err());
    }

    #[test]
    fn test_center_without_monitor() {
        let (mut platform, id) = platform_with_window();
        platform.set_monitor(None);
        assert!(matches!(platform.center_window(id), Err(PlatformError::NoMonitor)));
    }

    #[test]
    fn test_events_drain_once() {
        let (mut platform, id) = platform_with_window();
        platform.push_event(PlatformEvent::CloseRequested { window: id });
        assert_eq!(platform.poll_events().len(), 1);
        assert!(platform.poll_events().is_empty());
    }

    #[test]
    fn test_recording_device_and_trace() {
        let (mut platform, id) = platform_with_window();
        let trace = CallTrace::default();
        platform.set_trace(trace.clone());

        assert!(platform.load_graphics_device(id, None).is_err());

        platform.create_context(id).unwrap();
        let device = platform.load_graphics_device(id, None).unwrap();
        device.clear(ClearMask::COLOR);
        platform.swap_buffers(id).unwrap();

        assert_eq!(
            platform.device().unwrap().commands(),
            vec![GraphicsCommand::Clear(ClearMask::COLOR)]
        );
        assert_eq!(
            *trace.borrow(),
            vec!["device.clear".to_string(), "platform.swap_buffers".to_string()]
        );
        assert_eq!(platform.window(id).unwrap().swap_count, 1);
    }
}

//! Windows low-level keyboard and mouse hook implementation.
//!
//! Each [`WindowsHookSource`] owns one dedicated Win32 message-loop thread.
//! The hooks are installed on that thread and their callbacks run there,
//! inside `GetMessageW`.  The callbacks reach the event channel through a
//! thread-local sink, so a recorder and a hotkey dispatcher running at the
//! same time never see each other's channel.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::cell::RefCell;
use std::sync::mpsc::{self, Sender, SyncSender};
use std::sync::{Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info, warn};
use windows::Win32::Foundation::{HINSTANCE, LPARAM, LRESULT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, HHOOK, KBDLLHOOKSTRUCT, MSG,
    MSLLHOOKSTRUCT, PM_NOREMOVE, WH_KEYBOARD_LL, WH_MOUSE_LL, WM_KEYDOWN, WM_KEYUP,
    WM_LBUTTONDOWN, WM_LBUTTONUP, WM_MBUTTONDOWN, WM_MBUTTONUP, WM_MOUSEMOVE, WM_MOUSEWHEEL,
    WM_QUIT, WM_RBUTTONDOWN, WM_RBUTTONUP, WM_SYSKEYDOWN, WM_SYSKEYUP, WM_USER,
};

use macro_core::{MouseButton, INJECTION_SIGNATURE};

use super::{CaptureError, HookSet, InputSource, RawInputEvent, RawInputKind};

thread_local! {
    /// Channel used by the hook callbacks running on this thread.
    static SINK: RefCell<Option<Sender<RawInputEvent>>> = const { RefCell::new(None) };
}

/// A running hook thread.
struct HookThread {
    thread_id: u32,
    handle: JoinHandle<()>,
}

/// Windows low-level input capture service.
pub struct WindowsHookSource {
    hooks: HookSet,
    running: Mutex<Option<HookThread>>,
}

impl WindowsHookSource {
    /// Creates a new (unstarted) source that will install `hooks`.
    pub fn new(hooks: HookSet) -> Self {
        Self {
            hooks,
            running: Mutex::new(None),
        }
    }

    /// Keyboard hook only, for hotkey dispatch.
    pub fn keyboard() -> Self {
        Self::new(HookSet::KEYBOARD)
    }

    /// Keyboard and mouse hooks, for recording.
    pub fn keyboard_and_mouse() -> Self {
        Self::new(HookSet::KEYBOARD_AND_MOUSE)
    }
}

impl InputSource for WindowsHookSource {
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel::<RawInputEvent>();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<u32, CaptureError>>(1);
        let hooks = self.hooks;

        let handle = thread::Builder::new()
            .name("macro-hook-loop".to_string())
            .spawn(move || run_hook_message_loop(hooks, tx, ready_tx))
            .map_err(|e| CaptureError::Thread(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(thread_id)) => {
                info!(?hooks, thread_id, "low-level hooks installed");
                *running = Some(HookThread { thread_id, handle });
                Ok(rx)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Thread(
                    "hook thread exited before reporting readiness".to_string(),
                ))
            }
        }
    }

    fn stop(&self) {
        let Some(hook) = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return;
        };

        // SAFETY: posting WM_QUIT to a thread we own; it has a message queue
        // because it called PeekMessageW before reporting readiness.
        if let Err(e) =
            unsafe { PostThreadMessageW(hook.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }
        {
            warn!("failed to post WM_QUIT to hook thread: {e}");
        }
        if hook.handle.join().is_err() {
            warn!("hook thread panicked");
        }
        info!("low-level hooks removed");
    }
}

impl Drop for WindowsHookSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Entry point for the dedicated Win32 message loop thread.
fn run_hook_message_loop(
    hooks: HookSet,
    tx: Sender<RawInputEvent>,
    ready: SyncSender<Result<u32, CaptureError>>,
) {
    SINK.with(|sink| *sink.borrow_mut() = Some(tx));

    let (kbd_hook, mouse_hook) = match install_hooks(hooks) {
        Ok(handles) => handles,
        Err(e) => {
            SINK.with(|sink| sink.borrow_mut().take());
            let _ = ready.send(Err(e));
            return;
        }
    };

    let mut msg = MSG::default();
    // SAFETY: forces creation of this thread's message queue so that
    // PostThreadMessageW from stop() cannot be lost.
    unsafe {
        let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
    }
    // SAFETY: trivially safe Win32 call.
    let thread_id = unsafe { GetCurrentThreadId() };
    let _ = ready.send(Ok(thread_id));

    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern; hook
    // callbacks are invoked from inside GetMessageW on this thread.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            DispatchMessageW(&msg);
        }
        if let Some(hook) = kbd_hook {
            UnhookWindowsHookEx(hook).ok();
        }
        if let Some(hook) = mouse_hook {
            UnhookWindowsHookEx(hook).ok();
        }
    }

    // Dropping the sender lets the consumer drain and finish.
    SINK.with(|sink| sink.borrow_mut().take());
    debug!("hook message loop exited");
}

fn install_hooks(hooks: HookSet) -> Result<(Option<HHOOK>, Option<HHOOK>), CaptureError> {
    // SAFETY: querying the handle of the current executable.
    let module = unsafe { GetModuleHandleW(None) }.map_err(|_| CaptureError::NoModuleHandle)?;
    if module.is_invalid() {
        return Err(CaptureError::NoModuleHandle);
    }
    let instance = HINSTANCE(module.0);

    let kbd_hook = if hooks.keyboard {
        // SAFETY: keyboard_hook_proc has the HOOKPROC signature and lives for
        // the whole program.
        let hook = unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), instance, 0) }
            .map_err(|e| CaptureError::KeyboardHookInstallFailed(e.to_string()))?;
        Some(hook)
    } else {
        None
    };

    let mouse_hook = if hooks.mouse {
        // SAFETY: as above for mouse_hook_proc.
        match unsafe { SetWindowsHookExW(WH_MOUSE_LL, Some(mouse_hook_proc), instance, 0) } {
            Ok(hook) => Some(hook),
            Err(e) => {
                if let Some(hook) = kbd_hook {
                    // SAFETY: hook was installed above on this thread.
                    unsafe { UnhookWindowsHookEx(hook).ok() };
                }
                return Err(CaptureError::MouseHookInstallFailed(e.to_string()));
            }
        }
    } else {
        None
    };

    Ok((kbd_hook, mouse_hook))
}

fn deliver(kind: RawInputKind, extra_info: usize) {
    let event = RawInputEvent::new(kind, extra_info, Instant::now());
    SINK.with(|sink| {
        if let Some(tx) = sink.borrow().as_ref() {
            // Ignore send errors (consumer gone during shutdown).
            let _ = tx.send(event);
        }
    });
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// Called by Windows from the hook message loop thread. It must return
/// quickly to avoid hook removal by the OS.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
        let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);

        if !INJECTION_SIGNATURE.matches(kbs.dwExtraInfo) {
            let kind = match w_param.0 as u32 {
                WM_KEYDOWN | WM_SYSKEYDOWN => Some(RawInputKind::KeyDown {
                    vk_code: kbs.vkCode,
                }),
                WM_KEYUP | WM_SYSKEYUP => Some(RawInputKind::KeyUp {
                    vk_code: kbs.vkCode,
                }),
                _ => None,
            };
            if let Some(kind) = kind {
                deliver(kind, kbs.dwExtraInfo);
            }
        }
    }

    // SAFETY: Forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

/// Low-level mouse hook callback.
///
/// # Safety
///
/// Called by Windows from the hook message loop thread; must return quickly.
unsafe extern "system" fn mouse_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        // SAFETY: l_param points to a MSLLHOOKSTRUCT when n_code == HC_ACTION.
        let mhs = &*(l_param.0 as *const MSLLHOOKSTRUCT);

        if !INJECTION_SIGNATURE.matches(mhs.dwExtraInfo) {
            let x = mhs.pt.x;
            let y = mhs.pt.y;
            let kind = match w_param.0 as u32 {
                WM_MOUSEMOVE => Some(RawInputKind::MouseMove { x, y }),
                WM_LBUTTONDOWN => Some(button_down(MouseButton::Left, x, y)),
                WM_LBUTTONUP => Some(button_up(MouseButton::Left, x, y)),
                WM_RBUTTONDOWN => Some(button_down(MouseButton::Right, x, y)),
                WM_RBUTTONUP => Some(button_up(MouseButton::Right, x, y)),
                WM_MBUTTONDOWN => Some(button_down(MouseButton::Middle, x, y)),
                WM_MBUTTONUP => Some(button_up(MouseButton::Middle, x, y)),
                WM_MOUSEWHEEL => Some(RawInputKind::MouseWheel {
                    // High word of mouseData is the signed wheel delta.
                    delta: (mhs.mouseData >> 16) as i16,
                    x,
                    y,
                }),
                _ => None,
            };
            if let Some(kind) = kind {
                deliver(kind, mhs.dwExtraInfo);
            }
        }
    }

    // SAFETY: Forward the event to the next hook in the chain.
    CallNextHookEx(None, n_code, w_param, l_param)
}

fn button_down(button: MouseButton, x: i32, y: i32) -> RawInputKind {
    RawInputKind::MouseButtonDown { button, x, y }
}

fn button_up(button: MouseButton, x: i32, y: i32) -> RawInputKind {
    RawInputKind::MouseButtonUp { button, x, y }
}

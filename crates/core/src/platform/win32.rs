use std::io;
use std::mem;
use std::process::Command as ProcessCommand;
use std::time::{Duration, Instant};

use regex::Regex;
use windows::core::{PWSTR, VARIANT};
use windows::Win32::Foundation::{CloseHandle, BOOL, FALSE, HWND, LPARAM, RECT, TRUE};
use windows::Win32::System::Com::{
    CoCreateInstance, CoInitializeEx, CLSCTX_INPROC_SERVER, COINIT_APARTMENTTHREADED,
};
use windows::Win32::System::Threading::{
    OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_FORMAT, PROCESS_QUERY_LIMITED_INFORMATION,
};
use windows::Win32::UI::Accessibility::{
    CUIAutomation8, IUIAutomation, TreeScope_Descendants, UIA_ButtonControlTypeId,
    UIA_ControlTypePropertyId, UIA_PaneControlTypeId,
};
use windows::Win32::UI::Input::KeyboardAndMouse::*;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::error::{PlatformError, PlatformResult};
use crate::logger;
use crate::sleep;
use crate::types::*;
use super::{InputSynthesizer, Platform, WindowHandle};

const CONTROL_POLL_MS: u64 = 100;
const CLICK_HOLD_MS: u64 = 15;

fn os_err(what: &str, e: impl std::fmt::Display) -> PlatformError {
    PlatformError::Os(format!("{}: {}", what, e))
}

fn hwnd_of(id: WindowId) -> HWND {
    HWND(id as isize as *mut _)
}

unsafe extern "system" fn collect_windows_cb(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let out = &mut *(lparam.0 as *mut Vec<isize>);
    out.push(hwnd.0 as isize);
    TRUE
}

/// Visible, titled top-level windows in Z-order (topmost first).
fn enumerate_windows() -> PlatformResult<Vec<WindowInfo>> {
    let mut raw: Vec<isize> = Vec::new();
    unsafe { EnumWindows(Some(collect_windows_cb), LPARAM(&mut raw as *mut Vec<isize> as isize)) }
        .map_err(|e| os_err("EnumWindows", e))?;
    Ok(raw.into_iter().filter_map(|r| unsafe { describe_window(r) }).collect())
}

unsafe fn describe_window(raw: isize) -> Option<WindowInfo> {
    let hwnd = HWND(raw as *mut _);
    if !IsWindowVisible(hwnd).as_bool() {
        return None;
    }
    let mut buf = [0u16; 512];
    let len = GetWindowTextW(hwnd, &mut buf);
    if len <= 0 {
        return None;
    }
    let title = String::from_utf16_lossy(&buf[..len as usize]);
    let mut pid: u32 = 0;
    GetWindowThreadProcessId(hwnd, Some(&mut pid));
    Some(WindowInfo { id: raw as WindowId, title, pid, exe: exe_name(pid) })
}

unsafe fn exe_name(pid: u32) -> String {
    if pid == 0 {
        return String::new();
    }
    let handle = match OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, FALSE, pid) {
        Ok(h) => h,
        Err(_) => return String::new(),
    };
    let mut buf = [0u16; 260];
    let mut len = buf.len() as u32;
    let ok = QueryFullProcessImageNameW(handle, PROCESS_NAME_FORMAT(0), PWSTR(buf.as_mut_ptr()), &mut len);
    let _ = CloseHandle(handle);
    if ok.is_ok() {
        let path = String::from_utf16_lossy(&buf[..len as usize]);
        path.rsplit('\\').next().unwrap_or("").to_string()
    } else {
        String::new()
    }
}

pub struct Win32Platform;

impl Win32Platform {
    pub fn new() -> Self {
        Win32Platform
    }
}

impl Default for Win32Platform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for Win32Platform {
    fn launch(&mut self, exe: &str) -> PlatformResult<()> {
        match ProcessCommand::new(exe).spawn() {
            Ok(child) => {
                logger::info_p("win32", &format!("launched {} (pid {})", exe, child.id()));
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                // Not on PATH: let the shell resolve it through App Paths
                let stem = exe.trim_end_matches(".exe");
                logger::warn_p("win32", &format!("{} not on PATH, retrying via shell", exe));
                ProcessCommand::new("cmd")
                    .args(["/c", "start", "", stem])
                    .spawn()
                    .map(|_| ())
                    .map_err(|e| os_err("cmd start", e))
            }
            Err(e) => Err(os_err("spawn", e)),
        }
    }

    fn top_window(&self, exe: &str) -> PlatformResult<Option<WindowInfo>> {
        let owned = self.process_windows(exe)?;
        let active = unsafe { GetForegroundWindow() }.0 as isize as WindowId;
        Ok(owned
            .iter()
            .find(|w| w.id == active)
            .or_else(|| owned.first())
            .cloned())
    }

    fn process_windows(&self, exe: &str) -> PlatformResult<Vec<WindowInfo>> {
        let owned: Vec<WindowInfo> = enumerate_windows()?
            .into_iter()
            .filter(|w| w.exe.eq_ignore_ascii_case(exe))
            .collect();
        if owned.is_empty() {
            return Err(PlatformError::NotFound(format!("process {}", exe)));
        }
        Ok(owned)
    }

    fn windows_matching(&self, pattern: &Regex) -> PlatformResult<Vec<WindowInfo>> {
        Ok(enumerate_windows()?
            .into_iter()
            .filter(|w| pattern.is_match(&w.title))
            .collect())
    }

    fn desktop_windows(&self) -> PlatformResult<Vec<WindowInfo>> {
        enumerate_windows()
    }

    fn attach(&self, window: &WindowInfo) -> PlatformResult<Box<dyn WindowHandle>> {
        if !unsafe { IsWindow(hwnd_of(window.id)) }.as_bool() {
            return Err(PlatformError::WindowGone);
        }
        logger::info_p("win32", &format!("attached to \"{}\" (hwnd {:#x})", window.title, window.id));
        Ok(Box::new(Win32Window { id: window.id, title: window.title.clone() }))
    }

    fn input(&self) -> Box<dyn InputSynthesizer> {
        Box::new(Win32Input)
    }
}

struct Win32Window {
    id: WindowId,
    title: String,
}

impl Win32Window {
    fn hwnd(&self) -> HWND {
        hwnd_of(self.id)
    }

    fn alive(&self) -> PlatformResult<HWND> {
        let hwnd = self.hwnd();
        if unsafe { IsWindow(hwnd) }.as_bool() {
            Ok(hwnd)
        } else {
            Err(PlatformError::WindowGone)
        }
    }

    unsafe fn query_control(&self, name: &Regex, kind: ControlKind)
        -> windows::core::Result<Option<ScreenRect>>
    {
        let _ = CoInitializeEx(None, COINIT_APARTMENTTHREADED);
        let uia: IUIAutomation = CoCreateInstance(&CUIAutomation8, None, CLSCTX_INPROC_SERVER)?;
        let root = uia.ElementFromHandle(self.hwnd())?;
        let type_id = match kind {
            ControlKind::Pane => UIA_PaneControlTypeId,
            ControlKind::Button => UIA_ButtonControlTypeId,
        };
        let cond = uia.CreatePropertyCondition(UIA_ControlTypePropertyId, &VARIANT::from(type_id.0))?;
        let found = root.FindAll(TreeScope_Descendants, &cond)?;
        for i in 0..found.Length()? {
            let elem = found.GetElement(i)?;
            let label = elem.CurrentName().map(|s| s.to_string()).unwrap_or_default();
            if name.is_match(&label) {
                let r = elem.CurrentBoundingRectangle()?;
                return Ok(Some(ScreenRect::new(r.left, r.top, r.right, r.bottom)));
            }
        }
        Ok(None)
    }
}

impl WindowHandle for Win32Window {
    fn title(&self) -> &str {
        &self.title
    }

    fn rect(&self) -> PlatformResult<ScreenRect> {
        let hwnd = self.alive()?;
        let mut r = RECT::default();
        unsafe { GetWindowRect(hwnd, &mut r) }.map_err(|e| os_err("GetWindowRect", e))?;
        Ok(ScreenRect::new(r.left, r.top, r.right, r.bottom))
    }

    fn has_focus(&self) -> bool {
        unsafe { GetForegroundWindow() } == self.hwnd()
    }

    fn focus(&mut self) -> PlatformResult<()> {
        let hwnd = self.alive()?;
        unsafe {
            if IsIconic(hwnd).as_bool() {
                let _ = ShowWindow(hwnd, SW_RESTORE);
            }
            if !SetForegroundWindow(hwnd).as_bool() {
                return Err(PlatformError::Os("SetForegroundWindow refused".into()));
            }
        }
        Ok(())
    }

    fn maximize(&mut self) -> PlatformResult<()> {
        let hwnd = self.alive()?;
        let _ = unsafe { ShowWindow(hwnd, SW_MAXIMIZE) };
        Ok(())
    }

    fn foreground(&mut self) -> PlatformResult<()> {
        let hwnd = self.alive()?;
        if unsafe { SetForegroundWindow(hwnd) }.as_bool() {
            Ok(())
        } else {
            Err(PlatformError::Os("SetForegroundWindow refused".into()))
        }
    }

    fn find_control(&self, name: &Regex, kind: ControlKind, timeout: Duration)
        -> PlatformResult<ScreenRect>
    {
        self.alive()?;
        let deadline = Instant::now() + timeout;
        loop {
            match unsafe { self.query_control(name, kind) } {
                Ok(Some(rect)) => return Ok(rect),
                Ok(None) => {}
                Err(e) => logger::debug_p("win32", &format!("uia query '{}': {}", name.as_str(), e)),
            }
            if Instant::now() >= deadline {
                return Err(PlatformError::Timeout(format!("control '{}'", name.as_str())));
            }
            sleep::sleep_ms(CONTROL_POLL_MS);
        }
    }
}

struct Win32Input;

/// Map a screen point onto the 0..=65535 virtual-desktop grid SendInput wants.
fn normalize(p: Point) -> (i32, i32) {
    let (vx, vy, vw, vh) = unsafe {
        (
            GetSystemMetrics(SM_XVIRTUALSCREEN),
            GetSystemMetrics(SM_YVIRTUALSCREEN),
            GetSystemMetrics(SM_CXVIRTUALSCREEN),
            GetSystemMetrics(SM_CYVIRTUALSCREEN),
        )
    };
    let w = (vw - 1).max(1) as i64;
    let h = (vh - 1).max(1) as i64;
    (
        ((p.x - vx) as i64 * 65535 / w) as i32,
        ((p.y - vy) as i64 * 65535 / h) as i32,
    )
}

fn send(inputs: &[INPUT], what: &str) -> PlatformResult<()> {
    let sent = unsafe { SendInput(inputs, mem::size_of::<INPUT>() as i32) };
    if sent as usize == inputs.len() {
        Ok(())
    } else {
        Err(PlatformError::Os(format!("SendInput {} blocked ({}/{})", what, sent, inputs.len())))
    }
}

fn mouse_input(p: Point, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    let (dx, dy) = normalize(p);
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: 0,
                dwFlags: MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK | MOUSEEVENTF_MOVE | flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn key_input(vk: VIRTUAL_KEY, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT { wVk: vk, wScan: 0, dwFlags: flags, time: 0, dwExtraInfo: 0 },
        },
    }
}

fn parse_vk(name: &str) -> PlatformResult<VIRTUAL_KEY> {
    let lower = name.trim().to_lowercase();
    let vk = match lower.as_str() {
        "ctrl" | "control" => VK_CONTROL,
        "alt" | "menu" => VK_MENU,
        "shift" => VK_SHIFT,
        "win" => VK_LWIN,
        "enter" | "return" => VK_RETURN,
        "esc" | "escape" => VK_ESCAPE,
        "tab" => VK_TAB,
        "space" => VK_SPACE,
        "delete" | "del" => VK_DELETE,
        "backspace" => VK_BACK,
        s if s.len() == 1 && s.chars().all(|c| c.is_ascii_alphanumeric()) => {
            VIRTUAL_KEY(s.as_bytes()[0].to_ascii_uppercase() as u16)
        }
        _ => return Err(PlatformError::Os(format!("unknown key '{}'", name))),
    };
    Ok(vk)
}

impl InputSynthesizer for Win32Input {
    fn move_to(&mut self, p: Point) -> PlatformResult<()> {
        send(&[mouse_input(p, MOUSE_EVENT_FLAGS(0))], "move")
    }

    fn press(&mut self, p: Point) -> PlatformResult<()> {
        send(&[mouse_input(p, MOUSEEVENTF_LEFTDOWN)], "press")
    }

    fn release(&mut self, p: Point) -> PlatformResult<()> {
        send(&[mouse_input(p, MOUSEEVENTF_LEFTUP)], "release")
    }

    fn click(&mut self, p: Point) -> PlatformResult<()> {
        self.move_to(p)?;
        self.press(p)?;
        sleep::sleep_ms(CLICK_HOLD_MS);
        self.release(p)
    }

    fn key_combo(&mut self, combo: &str) -> PlatformResult<()> {
        let keys = combo
            .split('+')
            .filter(|s| !s.trim().is_empty())
            .map(parse_vk)
            .collect::<PlatformResult<Vec<_>>>()?;
        if keys.is_empty() {
            return Err(PlatformError::Os("empty key combo".into()));
        }
        let mut inputs: Vec<INPUT> = keys.iter().map(|&vk| key_input(vk, KEYBD_EVENT_FLAGS(0))).collect();
        inputs.extend(keys.iter().rev().map(|&vk| key_input(vk, KEYEVENTF_KEYUP)));
        send(&inputs, combo)
    }

    fn set_clipboard(&mut self, text: &str) -> PlatformResult<()> {
        let mut cb = arboard::Clipboard::new().map_err(|e| PlatformError::Clipboard(e.to_string()))?;
        cb.set_text(text.to_string()).map_err(|e| PlatformError::Clipboard(e.to_string()))
    }

    fn clipboard(&mut self) -> PlatformResult<String> {
        let mut cb = arboard::Clipboard::new().map_err(|e| PlatformError::Clipboard(e.to_string()))?;
        cb.get_text().map_err(|e| PlatformError::Clipboard(e.to_string()))
    }
}

/// Return the foreground to the console hosting this process, after a plan
/// has been driving another application.
#[cfg(target_os = "windows")]
pub fn activate_terminal() {
    use windows::Win32::System::Console::GetConsoleWindow;
    use windows::Win32::UI::WindowsAndMessaging::{SetForegroundWindow, ShowWindow, SW_RESTORE};

    unsafe {
        let hwnd = GetConsoleWindow();
        if !hwnd.is_invalid() {
            let _ = ShowWindow(hwnd, SW_RESTORE);
            let _ = SetForegroundWindow(hwnd);
        }
    }
}

#[cfg(not(target_os = "windows"))]
pub fn activate_terminal() {
    // Terminal focus is left to the window manager
}

use std::sync::{mpsc, Arc, Mutex};

use paintbot_core::logger;
use paintbot_core::perception::{build_prompt, FactsSource, LocalFacts};
use paintbot_core::plan::build_plan;
use paintbot_core::types::{ColorName, Command, RunStatus, WorkerState};

use crate::preview::PlanPreview;

pub struct App {
    pub status: Arc<Mutex<RunStatus>>,
    pub text: String,
    pub selected: usize,
    pub close_after: bool,
    pub preview: Option<PlanPreview>,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub cmd_tx: mpsc::Sender<Command>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        status: Arc<Mutex<RunStatus>>,
        log_rx: mpsc::Receiver<String>,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            status,
            text: String::new(),
            selected: 0,
            close_after: false,
            preview: None,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            cmd_tx,
            should_quit: false,
        }
    }

    pub fn color(&self) -> ColorName {
        ColorName::ALL[self.selected.min(ColorName::ALL.len() - 1)]
    }

    pub fn run_status(&self) -> RunStatus {
        self.status.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
        }
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < ColorName::ALL.len() {
            self.selected += 1;
        }
    }

    pub fn push_char(&mut self, c: char) {
        self.text.push(c);
    }

    pub fn backspace(&mut self) {
        self.text.pop();
    }

    pub fn toggle_close_after(&mut self) {
        self.close_after = !self.close_after;
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    /// Extract facts, build the plan and show it for review. Nothing is sent
    /// to Paint until the preview is accepted. Needs text and an idle worker.
    pub fn request_run(&mut self) {
        if self.text.trim().is_empty() {
            logger::warn("text cannot be empty");
            return;
        }
        if self.run_status().state == WorkerState::Running {
            logger::warn("a plan is already running");
            return;
        }
        let prompt = build_prompt(self.text.trim(), self.color());
        match LocalFacts.extract(&prompt) {
            Ok(facts) => self.preview = Some(PlanPreview::new(build_plan(&facts, self.close_after))),
            Err(e) => logger::error(&format!("facts extraction failed: {}", e)),
        }
    }

    pub fn cancel_preview(&mut self) {
        self.preview = None;
    }

    /// Close the preview and, when accepted, hand its plan to the worker.
    pub fn resolve_preview(&mut self) {
        let Some(preview) = self.preview.take() else { return };
        if preview.accept {
            self.cmd_tx.send(Command::Run(preview.plan)).ok();
        }
    }

    pub fn quit(&mut self) {
        self.cmd_tx.send(Command::Quit).ok();
        self.should_quit = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paintbot_core::types::ActionStep;

    fn app() -> (App, mpsc::Receiver<Command>) {
        let (_log_tx, log_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();
        (App::new(Arc::new(Mutex::new(RunStatus::default())), log_rx, cmd_tx), cmd_rx)
    }

    #[test]
    fn empty_text_never_asks() {
        let (mut app, _rx) = app();
        app.push_char(' ');
        app.request_run();
        assert!(app.preview.is_none());
    }

    #[test]
    fn confirmed_request_sends_plan() {
        let (mut app, rx) = app();
        for c in "hi".chars() {
            app.push_char(c);
        }
        app.move_down();
        app.move_down();
        app.toggle_close_after();
        app.request_run();
        app.preview.as_mut().unwrap().toggle();
        app.resolve_preview();

        match rx.try_recv().unwrap() {
            Command::Run(plan) => {
                assert_eq!(plan.len(), 4);
                assert_eq!(plan[1], ActionStep::SelectColor { color: "blue".into() });
                assert_eq!(plan[2], ActionStep::WriteText { text: "hi".into() });
            }
            Command::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn preview_shows_the_plan_before_sending() {
        let (mut app, rx) = app();
        app.push_char('x');
        app.request_run();
        let plan = &app.preview.as_ref().unwrap().plan;
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0], ActionStep::OpenApplication);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn declining_sends_nothing() {
        let (mut app, rx) = app();
        app.push_char('x');
        app.request_run();
        app.resolve_preview();
        assert!(app.preview.is_none());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn busy_worker_blocks_new_run() {
        let (mut app, _rx) = app();
        app.push_char('x');
        app.status.lock().unwrap().state = WorkerState::Running;
        app.request_run();
        assert!(app.preview.is_none());
    }

    #[test]
    fn color_cursor_stays_in_range() {
        let (mut app, _rx) = app();
        app.move_up();
        assert_eq!(app.color(), ColorName::Red);
        for _ in 0..20 {
            app.move_down();
        }
        assert_eq!(app.color(), ColorName::Gray);
    }
}

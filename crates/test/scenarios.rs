//! End-to-end scenarios against the simulated desktop.
//!
//!   cargo test -p paintbot-test

use std::sync::Arc;
use std::time::Duration;

use libtest_mimic::{Arguments, Failed, Trial};

use paintbot_core::dispatch::Request;
use paintbot_core::platform::stub::{Call, StubConfig, StubPlatform};
use paintbot_core::settings::Settings;
use paintbot_core::sleep::ManualClock;
use paintbot_core::types::*;
use paintbot_core::{ActionEngine, SessionContext};

const CANVAS: ScreenRect = ScreenRect { left: 355, top: 325, right: 1555, bottom: 880 };

struct Rig {
    stub: StubPlatform,
    clock: Arc<ManualClock>,
    engine: ActionEngine,
    session: SessionContext,
}

impl Rig {
    fn new(config: StubConfig) -> Result<Self, Failed> {
        Self::with_settings(config, Settings::default())
    }

    fn with_settings(config: StubConfig, settings: Settings) -> Result<Self, Failed> {
        let stub = StubPlatform::new(config);
        let clock = Arc::new(ManualClock::new());
        let engine = ActionEngine::new(Box::new(stub.clone()), settings, clock.clone())
            .map_err(|e| Failed::from(format!("engine: {:#}", e)))?;
        Ok(Self { stub, clock, engine, session: SessionContext::new() })
    }

    fn run(&mut self, plan: &[ActionStep]) -> ActionResult {
        self.engine.execute(&mut self.session, plan)
    }

    fn count(&self, call: &Call) -> usize {
        self.stub.journal().iter().filter(|c| *c == call).count()
    }
}

fn check(cond: bool, msg: impl Into<String>) -> Result<(), Failed> {
    if cond {
        return Ok(());
    }
    let msg: String = msg.into();
    Err(msg.into())
}

fn succeeded(result: &ActionResult) -> Result<(), Failed> {
    check(result.success, format!("plan failed: {}", result.message))
}

fn open_select_write() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    let result = rig.run(&[
        ActionStep::OpenApplication,
        ActionStep::SelectColor { color: "blue".into() },
        ActionStep::WriteText { text: "hello".into() },
    ]);
    succeeded(&result)?;
    check(result.message.contains("3 actions executed"), result.message.clone())?;

    let palette = Call::Click(Point::new(1195 + 11 * 28, 125));
    check(rig.count(&Call::FocusCheck) == 1, "expected exactly one focus check")?;
    check(rig.count(&palette) == 1, "expected exactly one palette click")?;
    check(rig.count(&Call::SetClipboard("hello".into())) == 1, "text not placed on clipboard once")?;
    check(rig.count(&Call::Keys("ctrl+v".into())) == 1, "expected exactly one paste")?;
    let typed = rig.stub.journal().iter().any(|c| matches!(c, Call::Keys(k) if k == "h"));
    check(!typed, "text must not be typed key by key")
}

fn draw_then_write_inside() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    succeeded(&rig.run(&[ActionStep::OpenApplication]))?;
    succeeded(&rig.run(&[ActionStep::DrawRectangle { x1: 10, y1: 10, x2: 110, y2: 60 }]))?;
    rig.stub.clear_journal();
    succeeded(&rig.run(&[ActionStep::WriteTextInLastRectangle { text: "hi".into() }]))?;

    let journal = rig.stub.journal();
    let start = journal.iter().find_map(|c| match c { Call::Press(p) => Some(*p), _ => None });
    let end = journal.iter().find_map(|c| match c { Call::Release(p) => Some(*p), _ => None });
    let (Some(start), Some(end)) = (start, end) else {
        return Err("no text box was dragged".into());
    };

    let margin = Settings::default().text.rect_margin;
    let (x1, y1) = (start.x - CANVAS.left, start.y - CANVAS.top);
    let (x2, y2) = (end.x - CANVAS.left, end.y - CANVAS.top);
    check(
        x1 >= 10 + margin && y1 >= 10 + margin && x2 <= 110 - margin && y2 <= 60 - margin,
        format!("text box ({},{})-({},{}) not inside the rectangle", x1, y1, x2, y2),
    )?;
    check(rig.count(&Call::SetClipboard("hi".into())) == 1, "text not pasted")
}

fn locate_gives_up_in_time() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig { appear_after: None, ..StubConfig::default() })?;
    let result = rig.run(&[ActionStep::OpenApplication, ActionStep::WriteText { text: "x".into() }]);
    check(!result.success, "open should fail")?;
    check(result.details.get("error_kind") == Some(&"not_found".into()), format!("{:?}", result.details))?;
    let app = Settings::default().app;
    let budget = Duration::from_millis(app.launch_settle_ms + app.locate_timeout_ms);
    check(rig.clock.elapsed() <= budget, format!("took {:?}", rig.clock.elapsed()))?;
    check(rig.count(&Call::Keys("ctrl+v".into())) == 0, "steps after a failed open must not run")
}

fn late_window_is_found() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig {
        appear_after: Some(5),
        exposure: paintbot_core::platform::stub::Exposure::Desktop,
        ..StubConfig::default()
    })?;
    succeeded(&rig.run(&[ActionStep::OpenApplication]))?;
    check(rig.session.is_attached(), "session not attached")
}

fn missing_rectangle_is_reported() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    succeeded(&rig.run(&[ActionStep::OpenApplication]))?;
    let result = rig.run(&[ActionStep::WriteTextInLastRectangle { text: "hi".into() }]);
    check(!result.success, "should fail without a rectangle")?;
    check(result.message.contains("No rectangle found"), result.message.clone())
}

fn stale_handle_detaches() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    succeeded(&rig.run(&[ActionStep::OpenApplication]))?;
    rig.stub.kill_window();
    let result = rig.run(&[
        ActionStep::SelectColor { color: "red".into() },
        ActionStep::WriteText { text: "x".into() },
    ]);
    check(!result.success, "stale window should fail")?;
    check(result.details.get("error_kind") == Some(&"not_attached".into()), format!("{:?}", result.details))?;
    check(result.details.get("aborted") == Some(&true.into()), "NotAttached must abort")?;
    check(!rig.session.is_attached(), "session still attached")
}

fn close_flow() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    let result = rig.run(&[
        ActionStep::OpenApplication,
        ActionStep::SelectColor { color: "green".into() },
        ActionStep::WriteText { text: "bye".into() },
        ActionStep::CloseApplication,
    ]);
    succeeded(&result)?;
    check(rig.count(&Call::Click(Point::new(1900, 15))) == 1, "close button not clicked")?;
    check(!rig.session.is_attached(), "session should be detached after close")?;

    let after = rig.run(&[ActionStep::WriteText { text: "again".into() }]);
    check(after.message.contains("Paint is not open"), after.message)
}

fn not_attached_aborts_plan() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    let result = rig.run(&[
        ActionStep::SelectColor { color: "red".into() },
        ActionStep::OpenApplication,
        ActionStep::WriteText { text: "x".into() },
    ]);
    check(!result.success, "should fail")?;
    check(result.details.get("executed") == Some(&0.into()), format!("{:?}", result.details))?;
    check(rig.stub.journal().is_empty(), "nothing may run after an abort")
}

fn soft_failures_keep_going() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    let result = rig.run(&[
        ActionStep::OpenApplication,
        ActionStep::WriteTextInLastRectangle { text: "early".into() },
        ActionStep::DrawRectangle { x1: 200, y1: 150, x2: 40, y2: 20 },
        ActionStep::WriteTextInLastRectangle { text: "late".into() },
    ]);
    check(!result.success, "first failure must be reported")?;
    check(result.message.contains("No rectangle found"), result.message.clone())?;
    check(result.details.get("executed") == Some(&3.into()), format!("{:?}", result.details))?;
    check(rig.session.last_rectangle() == Some(RelativeRect::new(40, 20, 200, 150)), "rectangle not normalized")?;
    check(rig.count(&Call::SetClipboard("late".into())) == 1, "later step did not run")
}

fn sessions_are_isolated() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    succeeded(&rig.run(&[ActionStep::OpenApplication, ActionStep::DrawRectangle { x1: 0, y1: 0, x2: 50, y2: 50 }]))?;

    let mut other = SessionContext::new();
    let result = rig.engine.execute(&mut other, &[ActionStep::WriteTextInLastRectangle { text: "x".into() }]);
    check(result.message.contains("Paint is not open"), result.message.clone())?;
    check(other.last_rectangle().is_none(), "rectangle leaked across sessions")?;
    check(rig.session.last_rectangle().is_some(), "original session lost its rectangle")
}

fn structured_controls_preferred() -> Result<(), Failed> {
    let canvas = ScreenRect::new(10, 150, 1900, 1000);
    let mut rig = Rig::new(StubConfig {
        controls: vec![
            ("Canvas".into(), ControlKind::Pane, canvas),
            ("Rectangle".into(), ControlKind::Button, ScreenRect::new(600, 80, 640, 120)),
        ],
        ..StubConfig::default()
    })?;
    succeeded(&rig.run(&[ActionStep::OpenApplication, ActionStep::DrawRectangle { x1: 5, y1: 5, x2: 25, y2: 25 }]))?;
    check(rig.count(&Call::Click(Point::new(620, 100))) == 1, "rectangle button not clicked")?;
    check(rig.count(&Call::Press(Point::new(15, 155))) == 1, "drag did not start on the queried canvas")
}

fn lost_focus_is_regained_once() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    succeeded(&rig.run(&[ActionStep::OpenApplication]))?;
    rig.stub.steal_focus();
    rig.stub.clear_journal();
    succeeded(&rig.run(&[
        ActionStep::SelectColor { color: "black".into() },
        ActionStep::WriteText { text: "a".into() },
    ]))?;
    check(rig.count(&Call::FocusCheck) == 1, "focus checked more than once per plan")?;
    check(rig.count(&Call::Focus) == 1, "window was not refocused")
}

fn dispatch_calls() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    let lines = [
        r#"{"tool":"open_paint"}"#,
        r#"{"tool":"draw_rectangle","x1":10,"y1":10,"x2":110,"y2":60}"#,
        r#"{"tool":"last_rectangle_center"}"#,
        r#"{"tool":"add_text_at","text":"hey","x":30,"y":40}"#,
        r#"{"tool":"close_paint"}"#,
    ];
    let mut statuses = Vec::new();
    for line in lines {
        let request = Request::parse(line).map_err(Failed::from)?;
        statuses.push(rig.engine.dispatch(&mut rig.session, &request));
    }
    check(statuses[2] == "60,35", format!("{:?}", statuses))?;
    check(statuses[3] == "Text:'hey' added at (30,40)", format!("{:?}", statuses))?;
    check(statuses[4] == "Paint closed", format!("{:?}", statuses))
}

fn extreme_request_coordinates() -> Result<(), Failed> {
    let mut rig = Rig::new(StubConfig::default())?;
    let lines = [
        r#"{"tool":"open_paint"}"#,
        r#"{"tool":"draw_rectangle","x1":-2147483648,"y1":0,"x2":2147483647,"y2":10}"#,
        r#"{"tool":"add_text_inside_last_rectangle","text":"edge"}"#,
        r#"{"tool":"add_text_at","text":"far","x":2147483647,"y":-2147483648}"#,
    ];
    let mut statuses = Vec::new();
    for line in lines {
        let request = Request::parse(line).map_err(Failed::from)?;
        statuses.push(rig.engine.dispatch(&mut rig.session, &request));
    }
    check(statuses.iter().all(|s| !s.starts_with("Error")), format!("{:?}", statuses))?;
    for call in rig.stub.journal() {
        if let Call::Press(p) | Call::Release(p) = call {
            check(CANVAS.contains(p), format!("{} left the canvas", p))?;
        }
    }
    Ok(())
}

fn main() {
    let args = Arguments::from_args();
    let tests = vec![
        Trial::test("open_select_write", open_select_write),
        Trial::test("draw_then_write_inside", draw_then_write_inside),
        Trial::test("locate_gives_up_in_time", locate_gives_up_in_time),
        Trial::test("late_window_is_found", late_window_is_found),
        Trial::test("missing_rectangle_is_reported", missing_rectangle_is_reported),
        Trial::test("stale_handle_detaches", stale_handle_detaches),
        Trial::test("close_flow", close_flow),
        Trial::test("not_attached_aborts_plan", not_attached_aborts_plan),
        Trial::test("soft_failures_keep_going", soft_failures_keep_going),
        Trial::test("sessions_are_isolated", sessions_are_isolated),
        Trial::test("structured_controls_preferred", structured_controls_preferred),
        Trial::test("lost_focus_is_regained_once", lost_focus_is_regained_once),
        Trial::test("dispatch_calls", dispatch_calls),
        Trial::test("extreme_request_coordinates", extreme_request_coordinates),
    ];
    libtest_mimic::run(&args, tests).exit();
}

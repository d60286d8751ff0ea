use std::sync::{mpsc, Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::engine::ActionEngine;
use crate::logger;
use crate::platform::console;
use crate::session::SessionContext;
use crate::types::*;

/// Front-end side of a running plan worker.
pub struct Worker {
    pub commands: mpsc::Sender<Command>,
    pub status: Arc<Mutex<RunStatus>>,
    pub handle: JoinHandle<()>,
}

fn update(status: &Mutex<RunStatus>, f: impl FnOnce(&mut RunStatus)) {
    let mut s = status.lock().unwrap_or_else(|e| e.into_inner());
    f(&mut s);
}

/// Start the worker thread. It owns the engine and one session, so plans
/// run strictly one at a time in arrival order.
pub fn spawn(engine: ActionEngine) -> Worker {
    let (tx, rx) = mpsc::channel();
    let status = Arc::new(Mutex::new(RunStatus::default()));
    let shared = status.clone();
    let handle = thread::spawn(move || orchestrate(engine, shared, rx));
    Worker { commands: tx, status, handle }
}

/// Worker loop. Returns on `Command::Quit` or when every sender is gone.
pub fn orchestrate(mut engine: ActionEngine, status: Arc<Mutex<RunStatus>>, cmd_rx: mpsc::Receiver<Command>) {
    let mut session = SessionContext::new();
    logger::info_p("orchestrator", "worker ready");

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            Command::Quit => {
                logger::info_p("orchestrator", "shutting down");
                break;
            }
            Command::Run(plan) => {
                if plan.is_empty() {
                    logger::warn_p("orchestrator", "empty plan ignored");
                    continue;
                }
                update(&status, |s| s.state = WorkerState::Running);
                let result = engine.execute(&mut session, &plan);
                console::activate_terminal();
                update(&status, |s| {
                    s.state = WorkerState::Idle;
                    s.runs += 1;
                    s.last_result = Some(result);
                });
            }
        }
    }
    update(&status, |s| s.state = WorkerState::Stopped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::stub::{StubConfig, StubPlatform};
    use crate::settings::Settings;
    use crate::sleep::ManualClock;

    #[test]
    fn runs_plans_in_order_and_stops_on_quit() {
        let stub = StubPlatform::new(StubConfig::default());
        let engine =
            ActionEngine::new(Box::new(stub.clone()), Settings::default(), Arc::new(ManualClock::new())).unwrap();
        let worker = spawn(engine);

        worker.commands.send(Command::Run(vec![ActionStep::OpenApplication])).unwrap();
        worker
            .commands
            .send(Command::Run(vec![ActionStep::DrawRectangle { x1: 0, y1: 0, x2: 30, y2: 30 }]))
            .unwrap();
        worker.commands.send(Command::Run(Vec::new())).unwrap();
        worker.commands.send(Command::Quit).unwrap();
        worker.handle.join().unwrap();

        let status = worker.status.lock().unwrap();
        assert_eq!(status.state, WorkerState::Stopped);
        assert_eq!(status.runs, 2);
        let last = status.last_result.as_ref().unwrap();
        assert!(last.success, "{}", last.message);
    }
}

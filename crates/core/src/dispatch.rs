use serde::{Deserialize, Serialize};

use crate::engine::ActionEngine;
use crate::error::EngineError;
use crate::logger;
use crate::session::SessionContext;
use crate::types::RelativeRect;

/// One independently callable gesture, as received on the dispatch surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum Request {
    OpenPaint,
    SelectColor { color: String },
    DrawRectangle { x1: i32, y1: i32, x2: i32, y2: i32 },
    AddText { text: String },
    AddTextAt { text: String, x: i32, y: i32 },
    AddTextInsideLastRectangle { text: String },
    LastRectangleCenter,
    ClosePaint,
}

impl Request {
    /// Parse one request line. The error is already a status line.
    pub fn parse(line: &str) -> Result<Self, String> {
        serde_json::from_str(line.trim()).map_err(|e| format!("Error: invalid request ({})", e))
    }
}

impl ActionEngine {
    /// Run a single gesture call and describe the outcome in one line.
    pub fn dispatch(&mut self, session: &mut SessionContext, request: &Request) -> String {
        session.begin_invocation();
        let outcome = match request {
            Request::OpenPaint => self.open_application(session),
            Request::SelectColor { color } => self.select_color(session, color),
            Request::DrawRectangle { x1, y1, x2, y2 } => {
                self.draw_rectangle(session, RelativeRect::new(*x1, *y1, *x2, *y2))
            }
            Request::AddText { text } => self.write_text(session, text),
            Request::AddTextAt { text, x, y } => self.write_text_at(session, text, *x, *y),
            Request::AddTextInsideLastRectangle { text } => self.write_text_in_last_rectangle(session, text),
            Request::LastRectangleCenter => self.last_rectangle_center(session),
            Request::ClosePaint => self.close_application(session),
        };
        match outcome {
            Ok(status) => status,
            Err(e @ (EngineError::NotAttached | EngineError::NoLastRectangle)) => e.to_string(),
            Err(e) => {
                logger::error_p("engine", &e.to_string());
                format!("Error: {}", e)
            }
        }
    }
}

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};

use paintbot_core::types::ActionStep;

/// The plan about to be handed to the worker, shown for a Run/Cancel
/// decision before any input reaches Paint.
pub struct PlanPreview {
    pub plan: Vec<ActionStep>,
    pub accept: bool,
}

/// One human-readable line per step.
pub fn describe(step: &ActionStep) -> String {
    match step {
        ActionStep::OpenApplication => "open Paint".into(),
        ActionStep::SelectColor { color } => format!("select color {}", color),
        ActionStep::WriteText { text } => format!("write \"{}\"", text),
        ActionStep::WriteTextAt { text, x, y } => format!("write \"{}\" at ({},{})", text, x, y),
        ActionStep::WriteTextInLastRectangle { text } => format!("write \"{}\" in the rectangle", text),
        ActionStep::DrawRectangle { x1, y1, x2, y2 } => {
            format!("draw rectangle ({},{})-({},{})", x1, y1, x2, y2)
        }
        ActionStep::CloseApplication => "close Paint".into(),
    }
}

impl PlanPreview {
    pub fn new(plan: Vec<ActionStep>) -> Self {
        Self { plan, accept: false }
    }

    pub fn toggle(&mut self) {
        self.accept = !self.accept;
    }

    fn lines(&self) -> Vec<Line<'static>> {
        self.plan
            .iter()
            .enumerate()
            .map(|(i, step)| {
                Line::from(vec![
                    Span::styled(format!(" {}. ", i + 1), Style::default().fg(Color::DarkGray)),
                    Span::styled(describe(step), Style::default().fg(Color::White)),
                ])
            })
            .collect()
    }

    pub fn render(&self, f: &mut Frame) {
        let lines = self.lines();
        let widest = lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16;
        // steps + buttons + borders and padding
        let area = centered(f.area(), (widest + 6).clamp(32, 72), lines.len() as u16 + 5);

        f.render_widget(Clear, area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Run this plan? ");
        let inner = block.inner(area);
        f.render_widget(block, area);

        let [steps, buttons] = Layout::vertical([Constraint::Min(1), Constraint::Length(2)]).areas(inner);
        f.render_widget(Paragraph::new(lines), steps);

        let chosen = |on: bool, bg: Color| {
            if on {
                Style::default().fg(Color::Black).bg(bg).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        };
        let row = Line::from(vec![
            Span::styled(" Run ", chosen(self.accept, Color::Green)),
            Span::raw("    "),
            Span::styled(" Cancel ", chosen(!self.accept, Color::Red)),
        ])
        .centered();
        f.render_widget(Paragraph::new(vec![Line::from(""), row]), buttons);
    }
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)]).flex(Flex::Center).areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width)]).flex(Flex::Center).areas(row);
    cell
}

#[cfg(test)]
mod tests {
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    fn screen(preview: &PlanPreview) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        terminal.draw(|f| preview.render(f)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn lists_every_step_in_order() {
        let preview = PlanPreview::new(vec![
            ActionStep::OpenApplication,
            ActionStep::SelectColor { color: "blue".into() },
            ActionStep::WriteText { text: "hi".into() },
            ActionStep::CloseApplication,
        ]);
        let text = screen(&preview);
        let open = text.find("1. open Paint").unwrap();
        let color = text.find("2. select color blue").unwrap();
        let write = text.find("3. write \"hi\"").unwrap();
        let close = text.find("4. close Paint").unwrap();
        assert!(open < color && color < write && write < close);
        assert!(text.contains("Cancel"));
    }

    #[test]
    fn starts_on_cancel() {
        let mut preview = PlanPreview::new(vec![ActionStep::OpenApplication]);
        assert!(!preview.accept);
        preview.toggle();
        assert!(preview.accept);
    }

    #[test]
    fn describes_rectangle_steps() {
        let step = ActionStep::DrawRectangle { x1: 1, y1: 2, x2: 30, y2: 40 };
        assert_eq!(describe(&step), "draw rectangle (1,2)-(30,40)");
    }
}

//! Stateless UI rendering.

use super::app::App;
use citadel_rules::PlayerSummary;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Row, Table},
};

/// Draws the whole screen.
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(app.snapshot().players.len() as u16 + 3), // Players
            Constraint::Min(5),    // Log
            Constraint::Length(3), // Input
            Constraint::Length(3), // Status
        ])
        .split(area);

    let title = Paragraph::new(format!(
        "Citadel - turn {} - seed {}",
        app.snapshot().turn,
        app.snapshot().seed
    ))
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
    .alignment(Alignment::Center);
    frame.render_widget(title, chunks[0]);

    draw_players(frame, chunks[1], app);
    draw_log(frame, chunks[2], app);

    let input = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(Color::DarkGray)),
        Span::raw(app.input()),
    ]))
    .block(Block::default().title("Command").borders(Borders::ALL));
    frame.render_widget(input, chunks[3]);

    let status = Paragraph::new(app.status())
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status, chunks[4]);

    if app.popup().is_some() {
        draw_popup(frame, area, app);
    }
}

fn draw_players(frame: &mut Frame, area: Rect, app: &App) {
    let header = Row::new([
        "City", "Kind", "Res", "Spent", "Buildings", "Units", "Queue", "Atk",
    ])
    .style(Style::default().add_modifier(Modifier::BOLD));

    let highlighted = app.highlighted();
    let rows = app.snapshot().players.iter().enumerate().map(|(idx, p)| {
        let style = if Some(idx) == highlighted {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default()
        };
        Row::new([
            p.name.clone(),
            p.kind.to_string(),
            p.resources.to_string(),
            p.resources_spent.to_string(),
            counts(&p.buildings),
            counts(&p.units),
            queue(p),
            p.attack_power.to_string(),
        ])
        .style(style)
    });

    let widths = [
        Constraint::Length(12),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Min(16),
        Constraint::Min(12),
        Constraint::Min(16),
        Constraint::Length(5),
    ];
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title("Cities").borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn draw_log(frame: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = app.log().len().saturating_sub(visible);
    let items: Vec<ListItem> = app
        .log()
        .iter()
        .skip(skip)
        .map(|line| ListItem::new(line.as_str()))
        .collect();
    let list = List::new(items).block(Block::default().title("Log").borders(Borders::ALL));
    frame.render_widget(list, area);
}

fn draw_popup(frame: &mut Frame, area: Rect, app: &App) {
    let Some(pending) = app.popup() else {
        return;
    };
    let height = pending.popup.choices.len() as u16 + 4;
    let popup_area = center_rect(area, 40, height);

    let mut lines = vec![Line::from(pending.popup.prompt.as_str())];
    lines.extend(
        pending
            .popup
            .choices
            .iter()
            .enumerate()
            .map(|(idx, choice)| Line::from(format!("{}. {}", idx + 1, choice))),
    );

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .title(format!("{} (Esc to cancel)", pending.popup.title))
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White)),
    );
    frame.render_widget(Clear, popup_area);
    frame.render_widget(paragraph, popup_area);
}

fn counts(map: &std::collections::BTreeMap<String, u32>) -> String {
    map.iter()
        .map(|(id, n)| format!("{}x{}", n, id))
        .collect::<Vec<_>>()
        .join(" ")
}

fn queue(p: &PlayerSummary) -> String {
    p.constructions
        .iter()
        .chain(p.recruitments.iter())
        .map(|(id, turns)| format!("{}({})", id, turns))
        .collect::<Vec<_>>()
        .join(" ")
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((area.height.saturating_sub(height)) / 2),
            Constraint::Length(height),
            Constraint::Length((area.height.saturating_sub(height)) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length((area.width.saturating_sub(width)) / 2),
            Constraint::Length(width),
            Constraint::Length((area.width.saturating_sub(width)) / 2),
        ])
        .split(vert[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::AiDispatcher;
    use citadel_rules::{GameConfig, TurnEngine};
    use ratatui::{Terminal, backend::TestBackend};
    use std::sync::Arc;

    #[test]
    fn test_draw_shows_cities() {
        let engine = TurnEngine::new(Arc::new(GameConfig::default()));
        let app = App::new(engine, AiDispatcher::random(0));
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| draw(frame, &app)).unwrap();

        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains("Player"));
        assert!(text.contains("IA"));
        assert!(text.contains("Citadel - turn 1"));
    }
}

// Dashboard rendering
//
// Everything here reads engine snapshots; nothing in this module issues a
// request. Layout, top to bottom:
//
//   title bar, call status, leads table, pagination line, logs, help line
//
// with the toast drawn last on top of the rest.

use super::app::App;
use dialdeck::logging::{LogEntry, LogLevel};
use dialdeck::model::Lead;
use dialdeck::status::StatusView;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const ACCENT: Color = Color::Cyan;
const MUTED: Color = Color::DarkGray;

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(5), // Call status
            Constraint::Min(6),    // Leads
            Constraint::Length(1), // Pagination
            Constraint::Length(7), // Logs
            Constraint::Length(1), // Help
        ])
        .split(area);

    render_title(f, chunks[0], app);
    render_status(f, chunks[1], app);
    render_leads(f, chunks[2], app);
    render_pagination(f, chunks[3], app);
    render_logs(f, chunks[4], app);
    render_help(f, chunks[5]);

    if let Some(ref toast) = app.toast {
        toast.render(f, area);
    }
}

fn render_title(f: &mut Frame, area: Rect, app: &App) {
    let uptime = app.start_time.elapsed().as_secs();
    let title = Line::from(vec![
        Span::styled(
            " dialdeck ",
            Style::default().fg(Color::Black).bg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!(" {} ", app.api_url)),
        Span::styled(
            format!("up {:02}:{:02}:{:02}", uptime / 3600, (uptime / 60) % 60, uptime % 60),
            Style::default().fg(MUTED),
        ),
    ]);
    f.render_widget(Paragraph::new(title), area);
}

fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let view = app.dashboard.status.snapshot();
    let campaign = app
        .dashboard
        .campaigns
        .selected_label()
        .unwrap_or_else(|| "none".to_string());

    let lines = vec![
        status_line(&view),
        current_call_line(&view),
        Line::from(vec![
            Span::styled("Campaign: ", Style::default().fg(MUTED)),
            Span::raw(campaign),
            Span::styled("   Auto-next: ", Style::default().fg(MUTED)),
            if view.status.auto_next {
                Span::styled("on", Style::default().fg(Color::Green))
            } else {
                Span::raw("off")
            },
        ]),
    ];

    let border = if view.paused {
        Color::Red
    } else if view.error.is_some() {
        Color::Yellow
    } else {
        ACCENT
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .title(" Call ");

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn status_line(view: &StatusView) -> Line<'static> {
    let (label, color) = match view.status.status.as_str() {
        _ if !view.has_data => ("waiting".to_string(), MUTED),
        "running" => ("running".to_string(), Color::Green),
        "stopping" => ("stopping".to_string(), Color::Yellow),
        other => (other.to_string(), Color::White),
    };

    let mut spans = vec![
        Span::styled("Status: ", Style::default().fg(MUTED)),
        Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
    ];

    if view.paused {
        spans.push(Span::styled(
            "   polling paused, press r to resume",
            Style::default().fg(Color::Red),
        ));
    } else if let Some(ref e) = view.error {
        spans.push(Span::styled(
            format!("   {} ({} failed)", e, view.consecutive_failures),
            Style::default().fg(Color::Yellow),
        ));
    }

    Line::from(spans)
}

fn current_call_line(view: &StatusView) -> Line<'static> {
    match (&view.status.lead, view.status.lead_index) {
        (Some(lead), Some(index)) if view.status.running => Line::from(vec![
            Span::styled("On call: ", Style::default().fg(MUTED)),
            Span::styled(
                format!("#{} {}", index + 1, lead.prospect_name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("  {}  {}", lead.company_name, lead.phone)),
        ]),
        _ => Line::from(Span::styled("No active call", Style::default().fg(MUTED))),
    }
}

fn render_leads(f: &mut Frame, area: Rect, app: &App) {
    let view = app.dashboard.leads.view();
    let page = &view.page;
    let in_flight = app.dashboard.dispatcher.in_flight();

    let widths = [
        Constraint::Length(6),
        Constraint::Percentage(22),
        Constraint::Percentage(22),
        Constraint::Percentage(20),
        Constraint::Length(16),
        Constraint::Length(14),
    ];
    // Rough per-column budget for truncation
    let col_width = (area.width.saturating_sub(40) / 3).max(8) as usize;

    let rows: Vec<Row> = page
        .leads
        .iter()
        .enumerate()
        .map(|(row, lead)| {
            let index = page.start_index + row as u64;
            lead_row(lead, index, in_flight == Some(index), col_width)
        })
        .collect();

    let title = match view.error {
        Some(ref e) => format!(" Leads ({}) ", e),
        None => format!(" Leads ({} total) ", page.total_leads),
    };

    let header = Row::new(["#", "Name", "Company", "Title", "Phone", "Timezone"])
        .style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(Style::default().bg(Color::Rgb(40, 40, 60)).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ")
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .title(title),
        );

    let mut state = TableState::default();
    if !page.leads.is_empty() {
        state.select(Some(app.selected_row.min(page.leads.len() - 1)));
    }

    f.render_stateful_widget(table, area, &mut state);
}

fn lead_row(lead: &Lead, index: u64, starting: bool, width: usize) -> Row<'static> {
    let number = if starting {
        Cell::from(format!("{}…", index + 1)).style(Style::default().fg(Color::Yellow))
    } else {
        Cell::from((index + 1).to_string())
    };

    Row::new(vec![
        number,
        Cell::from(truncate(&lead.prospect_name, width)),
        Cell::from(truncate(&lead.company_name, width)),
        Cell::from(truncate(&lead.job_title, width)),
        Cell::from(lead.phone.clone()),
        Cell::from(lead.timezone.clone()),
    ])
}

fn render_pagination(f: &mut Frame, area: Rect, app: &App) {
    let view = app.dashboard.leads.view();
    let pager = app.dashboard.pager();

    let total = pager
        .total_pages()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "?".to_string());

    let mut spans = vec![
        Span::styled(
            if pager.has_prev() { " < " } else { "   " },
            Style::default().fg(ACCENT),
        ),
        Span::raw(format!("Page {} of {}", view.page.page, total)),
        Span::styled(
            if pager.has_next() { " > " } else { "   " },
            Style::default().fg(ACCENT),
        ),
    ];

    if view.loading {
        spans.push(Span::styled(
            format!(" {} loading page {}", app.spinner(), view.requested_page),
            Style::default().fg(Color::Yellow),
        ));
    } else if view.showing_previous {
        spans.push(Span::styled(
            format!(" page {} unavailable, showing page {}", view.requested_page, view.page.page),
            Style::default().fg(Color::Red),
        ));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_logs(f: &mut Frame, area: Rect, app: &App) {
    let visible = area.height.saturating_sub(2) as usize;
    let entries = app.log_buffer.recent(visible);
    let width = area.width.saturating_sub(20) as usize;

    let items: Vec<ListItem> = entries
        .iter()
        .map(|entry| {
            ListItem::new(format_log_entry(entry, width)).style(log_level_style(entry.level))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(MUTED))
            .title(" Logs "),
    );

    f.render_widget(list, area);
}

fn format_log_entry(entry: &LogEntry, width: usize) -> String {
    format!(
        "{} {:5} {}",
        entry.timestamp.format("%H:%M:%S"),
        entry.level.as_str(),
        truncate(&entry.message, width)
    )
}

fn log_level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Error => Style::default().fg(Color::Red),
        LogLevel::Warn => Style::default().fg(Color::Yellow),
        LogLevel::Info => Style::default(),
        LogLevel::Debug | LogLevel::Trace => Style::default().fg(MUTED),
    }
}

fn render_help(f: &mut Frame, area: Rect) {
    let keys = [
        ("↑↓", "select"),
        ("←→", "page"),
        ("enter", "call"),
        ("n", "next"),
        ("e/E", "end"),
        ("s", "stop"),
        ("a", "auto"),
        ("c", "campaign"),
        ("r", "refresh"),
        ("q", "quit"),
    ];

    let mut spans = Vec::with_capacity(keys.len() * 2);
    for (key, action) in keys {
        spans.push(Span::styled(format!(" {}", key), Style::default().fg(ACCENT)));
        spans.push(Span::styled(format!(" {} ", action), Style::default().fg(MUTED)));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Cut `s` to at most `max` display columns, marking the cut with an ellipsis
fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }

    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_display_width() {
        assert_eq!(truncate("Acme", 10), "Acme");
        assert_eq!(truncate("Acme Solar Holdings", 8), "Acme So…");
        // Wide characters take two columns each
        assert_eq!(truncate("日本語テキスト", 6), "日本…");
        assert_eq!(truncate("anything", 0), "");
    }
}

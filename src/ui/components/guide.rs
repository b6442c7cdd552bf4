use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::ui::theme::Theme;

pub const GUIDE_WIDTH: u16 = 26;
pub const GUIDE_HEIGHT: u16 = 8;

pub struct GuideRects {
    pub handle: Rect,
    pub close: Rect,
}

/// Floating keypad cheat sheet. The title row doubles as the drag handle.
pub fn render_guide(pos: (u16, u16), theme: &Theme, frame: Rect, buf: &mut Buffer) -> GuideRects {
    let colors = &theme.colors;
    let x = pos.0.min(frame.right().saturating_sub(GUIDE_WIDTH));
    let y = pos
        .1
        .max(frame.y)
        .min(frame.bottom().saturating_sub(GUIDE_HEIGHT));
    let area = Rect::new(
        x,
        y,
        GUIDE_WIDTH.min(frame.width),
        GUIDE_HEIGHT.min(frame.height),
    );

    Clear.render(area, buf);
    let block = Block::bordered()
        .title(" keypad ")
        .border_style(Style::default().fg(colors.border()))
        .style(Style::default().bg(colors.menu_bg()));
    let inner = block.inner(area);
    block.render(area, buf);

    let key = Style::default().fg(colors.accent());
    let text = Style::default().fg(colors.dim());
    let row = |k: &str, v: &str, k2: &str, v2: &str| {
        Line::from(vec![
            Span::styled(format!("{k:>4}"), key),
            Span::styled(format!(" {v:<7}"), text),
            Span::styled(format!("{k2:>4}"), key),
            Span::styled(format!(" {v2}"), text),
        ])
    };
    let lines = vec![
        row("8/\u{2191}", "up", "5/\u{2193}", "down"),
        row("4/\u{2190}", "left", "6/\u{2192}", "right"),
        row("1-3", "choose", "\u{23ce}", "select"),
        row("7", "menu", "*", "top"),
        row("-", "restart", "Esc", "back"),
    ];
    Paragraph::new(lines).render(inner, buf);

    // Close control in the top-right corner of the border.
    let close_x = area.right().saturating_sub(4);
    buf.set_string(
        close_x,
        area.y,
        "[x]",
        Style::default()
            .fg(colors.error())
            .add_modifier(Modifier::BOLD),
    );

    GuideRects {
        handle: Rect::new(area.x, area.y, area.width.saturating_sub(4), 1),
        close: Rect::new(close_x, area.y, 3, 1),
    }
}

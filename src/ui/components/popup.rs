use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::flow::loader::Severity;
use crate::focus::machine::PopupButton;
use crate::ui::layout::{popup_rect, wrap_text};
use crate::ui::theme::Theme;

pub struct ConfirmRects {
    pub yes: Rect,
    pub no: Rect,
}

/// Yes/no confirmation shown before a rewind. Returns the button geometry.
pub fn render_confirm(
    highlighted: PopupButton,
    theme: &Theme,
    frame: Rect,
    buf: &mut Buffer,
) -> ConfirmRects {
    let colors = &theme.colors;
    let area = popup_rect(46, 7, frame);

    Clear.render(area, buf);
    let block = Block::bordered()
        .title(" Change this answer? ")
        .border_style(Style::default().fg(colors.warning()))
        .style(Style::default().bg(colors.menu_bg()));
    let inner = block.inner(area);
    block.render(area, buf);

    let lines = vec![
        Line::from(Span::styled(
            "Everything after this step will be",
            Style::default().fg(colors.fg()),
        )),
        Line::from(Span::styled(
            "discarded and the flow continues anew.",
            Style::default().fg(colors.fg()),
        )),
    ];
    Paragraph::new(lines).render(inner, buf);

    let button_y = inner.bottom().saturating_sub(1);
    let yes_label = " [1] Yes ";
    let no_label = " [3] No ";
    let buttons_width = yes_label.len() as u16 + 2 + no_label.len() as u16;
    let yes_x = inner.x + (inner.width.saturating_sub(buttons_width)) / 2;
    let no_x = yes_x + yes_label.len() as u16 + 2;

    let style_for = |button: PopupButton, base: Style| {
        if highlighted == button {
            Style::default()
                .fg(colors.bg())
                .bg(colors.focus_ring())
                .add_modifier(Modifier::BOLD)
        } else {
            base
        }
    };
    buf.set_string(
        yes_x,
        button_y,
        yes_label,
        style_for(PopupButton::Yes, Style::default().fg(colors.success())),
    );
    buf.set_string(
        no_x,
        button_y,
        no_label,
        style_for(PopupButton::No, Style::default().fg(colors.error())),
    );

    ConfirmRects {
        yes: Rect::new(yes_x, button_y, yes_label.len() as u16, 1),
        no: Rect::new(no_x, button_y, no_label.len() as u16, 1),
    }
}

/// Informative lock warning for auto-selected steps. Returns the OK rect.
pub fn render_warning(theme: &Theme, frame: Rect, buf: &mut Buffer) -> Rect {
    let colors = &theme.colors;
    let area = popup_rect(46, 7, frame);

    Clear.render(area, buf);
    let block = Block::bordered()
        .title(" Locked step ")
        .border_style(Style::default().fg(colors.error()))
        .style(Style::default().bg(colors.menu_bg()));
    let inner = block.inner(area);
    block.render(area, buf);

    let lines = vec![
        Line::from(Span::styled(
            "This choice was replayed automatically.",
            Style::default().fg(colors.fg()),
        )),
        Line::from(Span::styled(
            "Change the earlier decision instead.",
            Style::default().fg(colors.fg()),
        )),
    ];
    Paragraph::new(lines).render(inner, buf);

    let ok_label = " [ OK ] ";
    let ok_x = inner.x + (inner.width.saturating_sub(ok_label.len() as u16)) / 2;
    let ok_y = inner.bottom().saturating_sub(1);
    buf.set_string(
        ok_x,
        ok_y,
        ok_label,
        Style::default()
            .fg(colors.bg())
            .bg(colors.focus_ring())
            .add_modifier(Modifier::BOLD),
    );
    Rect::new(ok_x, ok_y, ok_label.len() as u16, 1)
}

/// Blocking summary used for load-time findings and runtime faults.
pub struct Notice {
    pub title: String,
    pub lines: Vec<(Severity, String)>,
}

pub fn render_notice(notice: &Notice, theme: &Theme, frame: Rect, buf: &mut Buffer) -> Rect {
    let colors = &theme.colors;
    let width = frame.width.saturating_sub(8).clamp(30, 70);
    let text_width = usize::from(width.saturating_sub(4));

    let mut lines: Vec<Line> = Vec::new();
    for (severity, message) in &notice.lines {
        let style = match severity {
            Severity::Error => Style::default().fg(colors.error()),
            Severity::Warning => Style::default().fg(colors.warning()),
        };
        for (i, wrapped) in wrap_text(message, text_width.saturating_sub(2)).into_iter().enumerate()
        {
            let prefix = if i == 0 { "- " } else { "  " };
            lines.push(Line::from(Span::styled(format!("{prefix}{wrapped}"), style)));
        }
    }

    let height = (lines.len() as u16 + 4).min(frame.height);
    let area = popup_rect(width, height, frame);

    Clear.render(area, buf);
    let block = Block::bordered()
        .title(format!(" {} ", notice.title))
        .border_style(Style::default().fg(colors.error()))
        .style(Style::default().bg(colors.menu_bg()));
    let inner = block.inner(area);
    block.render(area, buf);

    let body = Rect::new(
        inner.x,
        inner.y,
        inner.width,
        inner.height.saturating_sub(1),
    );
    Paragraph::new(lines).render(body, buf);

    let ok_label = " [ Close ] ";
    let ok_x = inner.x + (inner.width.saturating_sub(ok_label.len() as u16)) / 2;
    let ok_y = inner.bottom().saturating_sub(1);
    buf.set_string(
        ok_x,
        ok_y,
        ok_label,
        Style::default()
            .fg(colors.bg())
            .bg(colors.focus_ring())
            .add_modifier(Modifier::BOLD),
    );
    Rect::new(ok_x, ok_y, ok_label.len() as u16, 1)
}

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget};

use crate::config::MenuEntry;
use crate::focus::machine::{FocusContext, FocusState};
use crate::ui::theme::Theme;

/// Geometry of the rendered menu, for the hit map.
#[derive(Debug, Default)]
pub struct MenuRects {
    pub items: Vec<Rect>,
    pub submenu: Vec<(usize, usize, Rect)>,
}

/// Dropdown overlay anchored under the header's right edge. The submenu of
/// the focused item auto-expands beside it.
pub fn render_menu(
    menu: &[MenuEntry],
    focus: &FocusState,
    theme: &Theme,
    frame: Rect,
    buf: &mut Buffer,
) -> MenuRects {
    let mut rects = MenuRects::default();
    if menu.is_empty() {
        return rects;
    }
    let colors = &theme.colors;

    let width = menu
        .iter()
        .map(|m| m.label.chars().count() + 4)
        .max()
        .unwrap_or(8)
        .max(10) as u16;
    let height = (menu.len() as u16 + 2).min(frame.height.saturating_sub(1));
    let x = frame.right().saturating_sub(width + 1).max(frame.x);
    let area = Rect::new(x, frame.y + 1, width.min(frame.width), height);

    Clear.render(area, buf);
    let block = Block::bordered()
        .border_style(Style::default().fg(colors.border()))
        .style(Style::default().bg(colors.menu_bg()));
    let inner = block.inner(area);
    block.render(area, buf);

    let focused_item = match &focus.context {
        FocusContext::Dropdown { index } => Some(*index),
        FocusContext::Submenu { parent, .. } => Some(*parent),
        _ => None,
    };

    let mut lines = Vec::new();
    for (i, entry) in menu.iter().enumerate() {
        let marker = if entry.submenu.is_empty() { " " } else { "\u{25c2}" };
        let text = format!(" {label:<w$}{marker}", label = entry.label, w = inner.width.saturating_sub(2) as usize);
        let style = if focused_item == Some(i) {
            Style::default()
                .fg(colors.bg())
                .bg(colors.focus_ring())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg())
        };
        lines.push(Line::from(Span::styled(text, style)));
        if i < inner.height as usize {
            rects
                .items
                .push(Rect::new(inner.x, inner.y + i as u16, inner.width, 1));
        }
    }
    Paragraph::new(lines).render(inner, buf);

    // Auto-expand: the focused dropdown item's submenu is shown even before
    // it is entered; inside the submenu the parent's stays open.
    let expanded = focused_item.filter(|&i| !menu[i].submenu.is_empty());
    if let Some(parent) = expanded {
        let entries = &menu[parent].submenu;
        let sub_width = (entries
            .iter()
            .map(|e| e.label.chars().count() + 4)
            .max()
            .unwrap_or(8)
            .max(10) as u16)
            .min(frame.width);
        let sub_height = (entries.len() as u16 + 2).min(frame.height);
        let sub_x = area.x.saturating_sub(sub_width).max(frame.x);
        let sub_y = (inner.y + parent as u16).min(frame.bottom().saturating_sub(sub_height));
        let sub_area = Rect::new(sub_x, sub_y, sub_width, sub_height);

        Clear.render(sub_area, buf);
        let block = Block::bordered()
            .border_style(Style::default().fg(colors.border()))
            .style(Style::default().bg(colors.menu_bg()));
        let sub_inner = block.inner(sub_area);
        block.render(sub_area, buf);

        let focused_sub = match &focus.context {
            FocusContext::Submenu { index, .. } => Some(*index),
            _ => None,
        };
        let mut sub_lines = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            let style = if focused_sub == Some(i) {
                Style::default()
                    .fg(colors.bg())
                    .bg(colors.focus_ring())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.fg())
            };
            sub_lines.push(Line::from(Span::styled(
                format!(" {} ", entry.label),
                style,
            )));
            if i < sub_inner.height as usize {
                rects.submenu.push((
                    parent,
                    i,
                    Rect::new(sub_inner.x, sub_inner.y + i as u16, sub_inner.width, 1),
                ));
            }
        }
        Paragraph::new(sub_lines).render(sub_inner, buf);
    }

    rects
}

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::flow::engine::FlowEngine;
use crate::focus::machine::{FocusContext, FocusState};
use crate::ui::layout::wrap_text;
use crate::ui::theme::Theme;

const GUTTER: &str = "\u{258c} ";
const GUTTER_WIDTH: u16 = 2;

/// Where one story button landed in the flattened line list, in story-local
/// coordinates (line index before scrolling).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ButtonRect {
    pub section: usize,
    pub button: usize,
    pub line: usize,
    pub x: u16,
    pub width: u16,
}

/// The story flattened into styled lines plus the geometry the hit map and
/// the scroll logic need.
pub struct StoryLayout {
    pub lines: Vec<Line<'static>>,
    pub buttons: Vec<ButtonRect>,
    /// First line of each section, aligned with history indices.
    pub section_starts: Vec<usize>,
}

impl StoryLayout {
    pub fn height(&self) -> usize {
        self.lines.len()
    }

    pub fn button_line(&self, section: usize, button: usize) -> Option<usize> {
        self.buttons
            .iter()
            .find(|b| b.section == section && b.button == button)
            .map(|b| b.line)
    }
}

/// Flatten the visited history into renderable lines. Sections stay 1:1 with
/// history entries even when a step id fails to resolve.
pub fn build_story(
    engine: &FlowEngine,
    focus: &FocusState,
    theme: &Theme,
    highlighted_section: Option<usize>,
    highlight_terms: &[String],
    width: u16,
) -> StoryLayout {
    let colors = &theme.colors;
    let text_width = usize::from(width.saturating_sub(GUTTER_WIDTH).max(10));
    let last = engine.last_index();

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut buttons: Vec<ButtonRect> = Vec::new();
    let mut section_starts: Vec<usize> = Vec::new();

    for (index, entry) in engine.history().iter().enumerate() {
        section_starts.push(lines.len());

        let is_current = index == last;
        let gutter_style = if highlighted_section == Some(index) {
            Style::default()
                .fg(colors.focus_ring())
                .bg(colors.section_highlight())
        } else if is_current {
            Style::default().fg(colors.accent())
        } else {
            Style::default().fg(colors.dim())
        };
        let gutter = || Span::styled(GUTTER, gutter_style);

        let Some(step) = engine.step_at(index) else {
            lines.push(Line::from(vec![
                gutter(),
                Span::styled(
                    format!("step \"{}\" is missing from the flow", entry.step_id),
                    Style::default().fg(colors.error()),
                ),
            ]));
            lines.push(Line::from(""));
            continue;
        };

        if !step.title.is_empty() {
            lines.push(Line::from(vec![
                gutter(),
                Span::styled(
                    step.title.clone(),
                    Style::default()
                        .fg(colors.title())
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
        }

        let body_style = Style::default().fg(if is_current { colors.fg() } else { colors.dim() });
        for text_line in wrap_text(&step.description, text_width) {
            let mut spans = vec![gutter()];
            spans.extend(term_spans(
                &text_line,
                highlight_terms,
                body_style,
                Style::default().fg(colors.term_highlight()),
            ));
            lines.push(Line::from(spans));
        }

        if !step.note.is_empty() {
            for note_line in wrap_text(&step.note, text_width) {
                lines.push(Line::from(vec![
                    gutter(),
                    Span::styled(
                        format!("\u{00b7} {note_line}"),
                        Style::default().fg(colors.note()),
                    ),
                ]));
            }
        }

        if entry.auto_selected {
            lines.push(Line::from(vec![
                gutter(),
                Span::styled(
                    "auto-selected: same choice as last time",
                    Style::default()
                        .fg(colors.auto_banner())
                        .add_modifier(Modifier::BOLD),
                ),
            ]));
        }

        // Button row: option buttons, or the single default continuation.
        let labels: Vec<String> = if !step.options.is_empty() {
            step.options
                .iter()
                .enumerate()
                .map(|(i, o)| format!("[{}] {}", i + 1, o.text))
                .collect()
        } else if step.has_next_button() {
            vec!["[ Next \u{25b8} ]".to_string()]
        } else {
            Vec::new()
        };

        if !labels.is_empty() {
            let mut spans = vec![gutter()];
            let mut x = GUTTER_WIDTH;
            let button_line = lines.len();
            for (button, label) in labels.iter().enumerate() {
                let label_width = label.chars().count() as u16;
                let chosen = !step.options.is_empty()
                    && entry.chosen_option.as_deref() == Some(step.options[button].text.as_str());
                let focused = focus.context == FocusContext::Story
                    && focus.story_focus == Some((index, button));

                let mut style = if entry.auto_selected {
                    Style::default().fg(colors.option_locked())
                } else if chosen {
                    Style::default()
                        .fg(colors.option_selected())
                        .add_modifier(Modifier::BOLD)
                } else if is_current {
                    Style::default().fg(colors.accent())
                } else {
                    Style::default().fg(colors.dim())
                };
                if chosen && entry.auto_selected {
                    style = Style::default()
                        .fg(colors.option_selected())
                        .add_modifier(Modifier::DIM);
                }
                if focused {
                    style = style
                        .bg(colors.focus_ring())
                        .fg(colors.bg())
                        .add_modifier(Modifier::BOLD);
                }

                spans.push(Span::styled(label.clone(), style));
                spans.push(Span::raw("  "));
                buttons.push(ButtonRect {
                    section: index,
                    button,
                    line: button_line,
                    x,
                    width: label_width,
                });
                x += label_width + 2;
            }
            lines.push(Line::from(spans));
        }

        lines.push(Line::from(""));
    }

    StoryLayout {
        lines,
        buttons,
        section_starts,
    }
}

/// Split a line into spans, painting every occurrence of a highlight term.
fn term_spans(
    text: &str,
    terms: &[String],
    base: Style,
    highlight: Style,
) -> Vec<Span<'static>> {
    if terms.is_empty() || text.is_empty() {
        return vec![Span::styled(text.to_string(), base)];
    }

    let mut spans = Vec::new();
    let mut rest = text;
    loop {
        let next_match = terms
            .iter()
            .filter(|t| !t.is_empty())
            .filter_map(|t| rest.find(t.as_str()).map(|pos| (pos, t.len())))
            .min();
        match next_match {
            Some((pos, len)) => {
                if pos > 0 {
                    spans.push(Span::styled(rest[..pos].to_string(), base));
                }
                spans.push(Span::styled(rest[pos..pos + len].to_string(), highlight));
                rest = &rest[pos + len..];
                if rest.is_empty() {
                    break;
                }
            }
            None => {
                spans.push(Span::styled(rest.to_string(), base));
                break;
            }
        }
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::loader::load_str;
    use crate::focus::machine::Timing;

    const SHEET: &str = "\
StepID,Title,Desc1,Option1Text,Option1Next,Option2Text,Option2Next,DefaultNext
1,Start,Pick a door,Left,2,Right,3,
2,Left room,You went left,,,,,3
3,End,Done,,,,,";

    fn fixtures() -> (FlowEngine, FocusState, Theme) {
        let (flow, _) = load_str(SHEET);
        (
            FlowEngine::new(flow),
            FocusState::new(Timing::default()),
            Theme {
                name: "test".to_string(),
                colors: Default::default(),
            },
        )
    }

    #[test]
    fn test_sections_stay_aligned_with_history() {
        let (mut engine, focus, theme) = fixtures();
        engine.select_current("Left", "2");
        let layout = build_story(&engine, &focus, &theme, None, &[], 80);
        assert_eq!(layout.section_starts.len(), 2);
        // Section 0 renders two buttons, section 1 a Next button.
        assert_eq!(layout.buttons.len(), 3);
        assert_eq!(layout.buttons[2].section, 1);
        assert_eq!(layout.buttons[2].button, 0);
    }

    #[test]
    fn test_button_rects_do_not_overlap() {
        let (engine, focus, theme) = fixtures();
        let layout = build_story(&engine, &focus, &theme, None, &[], 80);
        let a = &layout.buttons[0];
        let b = &layout.buttons[1];
        assert_eq!(a.line, b.line);
        assert!(a.x + a.width < b.x);
    }

    #[test]
    fn test_refused_transition_keeps_sections_aligned() {
        let (mut engine, focus, theme) = fixtures();
        engine.select_current("Left", "2");
        engine.select_current("Next", "missing"); // records, appends nothing
        let layout = build_story(&engine, &focus, &theme, None, &[], 80);
        assert_eq!(layout.section_starts.len(), engine.history().len());
    }

    #[test]
    fn test_term_spans_split() {
        let base = Style::default();
        let hl = Style::default();
        let spans = term_spans("print the form now", &["print".to_string()], base, hl);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].content.as_ref(), "print");
        assert_eq!(spans[1].content.as_ref(), " the form now");
    }
}

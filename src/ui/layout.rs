use ratatui::layout::{Constraint, Direction, Layout, Rect};

pub struct AppLayout {
    pub header: Rect,
    pub story: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        Self {
            header: vertical[0],
            story: vertical[1],
            footer: vertical[2],
        }
    }
}

/// Word-wrap to `width` columns, preserving explicit newlines. Overlong
/// words are split hard.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    let mut out = Vec::new();
    for raw_line in text.split('\n') {
        if raw_line.is_empty() {
            out.push(String::new());
            continue;
        }
        let mut current = String::new();
        for word in raw_line.split_whitespace() {
            let word_len = word.chars().count();
            let current_len = current.chars().count();
            if current.is_empty() {
                if word_len <= width {
                    current.push_str(word);
                } else {
                    // Hard-split an overlong word.
                    let mut chunk = String::new();
                    for ch in word.chars() {
                        if chunk.chars().count() == width {
                            out.push(std::mem::take(&mut chunk));
                        }
                        chunk.push(ch);
                    }
                    current = chunk;
                }
            } else if current_len + 1 + word_len <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                out.push(std::mem::take(&mut current));
                if word_len <= width {
                    current.push_str(word);
                } else {
                    let mut chunk = String::new();
                    for ch in word.chars() {
                        if chunk.chars().count() == width {
                            out.push(std::mem::take(&mut chunk));
                        }
                        chunk.push(ch);
                    }
                    current = chunk;
                }
            }
        }
        out.push(current);
    }
    out
}

/// Fixed-size centered popup, clamped to the frame.
pub fn popup_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}

use std::time::{Duration, Instant};

use crate::focus::keymap::KeyRole;

/// The single active input-interpretation mode. Exactly one exists; every
/// keypress is dispatched according to the current variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FocusContext {
    Story,
    Dropdown { index: usize },
    Submenu { parent: usize, index: usize, name: String },
    Confirm,
    Warning,
}

/// Which confirmation button carries the highlight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopupButton {
    None,
    Yes,
    No,
}

/// A concrete interactive element resolved from a keypress.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Target {
    StoryButton { section: usize, button: usize },
    MenuItem { index: usize },
    SubmenuItem { parent: usize, index: usize },
    ConfirmYes,
    ConfirmNo,
    WarningOk,
}

/// What the caller should do after a keypress was interpreted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Activate(Target),
    /// Activate after the transition delay, so the highlight is visible
    /// before the popup acts on it.
    ActivateAfterDelay(Target),
    Moved {
        section: usize,
        button: Option<usize>,
        section_changed: bool,
    },
    ScrollTop,
    RestartHome,
}

/// Interactive surface of one rendered story section.
#[derive(Clone, Copy, Debug, Default)]
pub struct SectionShape {
    pub options: usize,
    pub has_next: bool,
}

impl SectionShape {
    pub fn buttons(&self) -> usize {
        self.options + usize::from(self.has_next)
    }
}

#[derive(Clone, Debug)]
pub struct MenuItemShape {
    pub label: String,
    /// Number of submenu entries; zero means a plain item.
    pub submenu: usize,
}

/// Snapshot of the rendered page the machine navigates over, rebuilt by the
/// caller before each dispatch.
#[derive(Clone, Debug, Default)]
pub struct PageShape {
    pub sections: Vec<SectionShape>,
    /// Index of the section flagged current (the latest history entry).
    pub current: usize,
    pub menu: Vec<MenuItemShape>,
}

#[derive(Clone, Copy, Debug)]
pub struct Timing {
    pub transition: Duration,
    pub focus: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            transition: Duration::from_millis(150),
            focus: Duration::from_millis(100),
        }
    }
}

/// Single authoritative focus state. Only this machine assigns to the
/// context; the popup coordinator and renderer read it.
pub struct FocusState {
    pub context: FocusContext,
    /// Story focus marker: at most one (section, button) carries it.
    pub story_focus: Option<(usize, usize)>,
    pub popup_button: PopupButton,
    /// Focus captured when the confirmation opened, for the decline path.
    saved: Option<(FocusContext, Option<(usize, usize)>)>,
    /// Re-entrancy guard while a timed modal transition settles. Only modal
    /// contexts honor it; story and menu keys stay responsive.
    busy_until: Option<Instant>,
    pub enabled: bool,
    timing: Timing,
}

impl FocusState {
    pub fn new(timing: Timing) -> Self {
        Self {
            context: FocusContext::Story,
            story_focus: None,
            popup_button: PopupButton::None,
            saved: None,
            busy_until: None,
            enabled: true,
            timing,
        }
    }

    pub fn is_busy(&self, now: Instant) -> bool {
        self.busy_until.is_some_and(|until| now < until)
    }

    /// Unconditional reset, used by the fault handler so a failed dispatch
    /// can never leave the UI locked.
    pub fn clear_busy(&mut self) {
        self.busy_until = None;
    }

    pub fn menu_open(&self) -> bool {
        matches!(
            self.context,
            FocusContext::Dropdown { .. } | FocusContext::Submenu { .. }
        )
    }

    /// Pointer path into the dropdown; the menu key goes through
    /// `handle_key` instead.
    pub fn open_dropdown(&mut self) {
        if self.context == FocusContext::Story {
            self.context = FocusContext::Dropdown { index: 0 };
        }
    }

    /// Close dropdown and submenu in one go, back to the story default.
    pub fn close_menu(&mut self, shape: &PageShape) {
        if self.menu_open() {
            self.context = FocusContext::Story;
            self.focus_story_default(shape);
        }
    }

    /// Default story focus: first button of the current section, or no marker
    /// when it has none.
    pub fn focus_story_default(&mut self, shape: &PageShape) {
        self.story_focus = shape
            .sections
            .get(shape.current)
            .filter(|s| s.buttons() > 0)
            .map(|_| (shape.current, 0));
    }

    /// The confirmation modal became visible; capture the focus to restore on
    /// decline. The initial yes-highlight is applied by the caller after the
    /// focus delay.
    pub fn on_confirm_shown(&mut self) {
        self.saved = Some((self.context.clone(), self.story_focus));
        self.context = FocusContext::Confirm;
        self.popup_button = PopupButton::None;
    }

    /// Confirmation closed. Confirm goes to the latest story position;
    /// decline restores the captured focus. The asymmetry is deliberate.
    pub fn on_confirm_closed(&mut self, confirmed: bool, shape: &PageShape) {
        let saved = self.saved.take();
        self.popup_button = PopupButton::None;
        if confirmed {
            self.context = FocusContext::Story;
            self.focus_story_default(shape);
        } else if let Some((context, story_focus)) = saved {
            self.context = context;
            self.story_focus = story_focus;
        } else {
            self.context = FocusContext::Story;
        }
    }

    pub fn on_warning_shown(&mut self, now: Instant) {
        self.context = FocusContext::Warning;
        self.busy_until = Some(now + self.timing.transition);
    }

    /// Warning acknowledged: back to the story, with the default focus
    /// re-applied by the caller after the transition delay.
    pub fn on_warning_closed(&mut self, now: Instant) {
        self.context = FocusContext::Story;
        self.busy_until = Some(now + self.timing.transition);
    }

    pub fn set_popup_button(&mut self, button: PopupButton) {
        self.popup_button = button;
    }

    /// History changed shape: stale markers must not survive a re-render.
    pub fn reset_story_focus(&mut self) {
        self.story_focus = None;
    }

    pub fn handle_key(&mut self, role: KeyRole, shape: &PageShape, now: Instant) -> Option<Action> {
        if !self.enabled {
            return None;
        }
        match self.context.clone() {
            FocusContext::Confirm => {
                if self.is_busy(now) {
                    return None;
                }
                self.confirm_key(role, now)
            }
            FocusContext::Warning => {
                if self.is_busy(now) {
                    return None;
                }
                self.warning_key(role, now)
            }
            FocusContext::Story => self.story_key(role, shape),
            FocusContext::Dropdown { index } => self.dropdown_key(role, index, shape),
            FocusContext::Submenu { parent, index, .. } => {
                self.submenu_key(role, parent, index, shape)
            }
        }
    }

    fn confirm_key(&mut self, role: KeyRole, now: Instant) -> Option<Action> {
        match role {
            KeyRole::Left => {
                self.popup_button = PopupButton::Yes;
                None
            }
            KeyRole::Right => {
                self.popup_button = PopupButton::No;
                None
            }
            KeyRole::Option1 => {
                self.popup_button = PopupButton::Yes;
                self.busy_until = Some(now + self.timing.transition);
                Some(Action::ActivateAfterDelay(Target::ConfirmYes))
            }
            KeyRole::Option3 | KeyRole::Cancel => {
                self.popup_button = PopupButton::No;
                self.busy_until = Some(now + self.timing.transition);
                Some(Action::ActivateAfterDelay(Target::ConfirmNo))
            }
            KeyRole::Select => match self.popup_button {
                PopupButton::Yes => {
                    self.busy_until = Some(now + self.timing.transition);
                    Some(Action::Activate(Target::ConfirmYes))
                }
                PopupButton::No => {
                    self.busy_until = Some(now + self.timing.transition);
                    Some(Action::Activate(Target::ConfirmNo))
                }
                PopupButton::None => None,
            },
            _ => None,
        }
    }

    fn warning_key(&mut self, role: KeyRole, now: Instant) -> Option<Action> {
        match role {
            KeyRole::Select
            | KeyRole::Cancel
            | KeyRole::Option1
            | KeyRole::Option2
            | KeyRole::Option3 => {
                self.busy_until = Some(now + self.timing.transition);
                Some(Action::Activate(Target::WarningOk))
            }
            _ => None,
        }
    }

    fn story_key(&mut self, role: KeyRole, shape: &PageShape) -> Option<Action> {
        match role {
            KeyRole::Menu => {
                if !shape.menu.is_empty() {
                    self.context = FocusContext::Dropdown { index: 0 };
                }
                None
            }
            KeyRole::Top => Some(Action::ScrollTop),
            KeyRole::Home => Some(Action::RestartHome),
            KeyRole::Up => self.move_between_sections(-1, shape),
            KeyRole::Down => self.move_between_sections(1, shape),
            KeyRole::Left => self.move_within_section(-1, shape),
            KeyRole::Right => self.move_within_section(1, shape),
            KeyRole::Option1 => self.select_option_by_number(1, shape),
            KeyRole::Option2 => self.select_option_by_number(2, shape),
            KeyRole::Option3 => self.select_option_by_number(3, shape),
            KeyRole::Select => {
                let (section, button) = self.story_focus?;
                Some(Action::Activate(Target::StoryButton { section, button }))
            }
            KeyRole::Cancel => None,
        }
    }

    fn dropdown_key(&mut self, role: KeyRole, index: usize, shape: &PageShape) -> Option<Action> {
        let items = shape.menu.len();
        match role {
            KeyRole::Menu => {
                self.context = FocusContext::Story;
                self.focus_story_default(shape);
                None
            }
            KeyRole::Up => {
                if index > 0 {
                    self.context = FocusContext::Dropdown { index: index - 1 };
                }
                None
            }
            KeyRole::Down => {
                if index + 1 < items {
                    self.context = FocusContext::Dropdown { index: index + 1 };
                }
                None
            }
            KeyRole::Right => {
                self.maybe_enter_submenu(index, shape);
                None
            }
            KeyRole::Select => {
                if self.maybe_enter_submenu(index, shape) {
                    None
                } else if index < items {
                    Some(Action::Activate(Target::MenuItem { index }))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn maybe_enter_submenu(&mut self, index: usize, shape: &PageShape) -> bool {
        match shape.menu.get(index) {
            Some(item) if item.submenu > 0 => {
                self.context = FocusContext::Submenu {
                    parent: index,
                    index: 0,
                    name: item.label.clone(),
                };
                true
            }
            _ => false,
        }
    }

    fn submenu_key(
        &mut self,
        role: KeyRole,
        parent: usize,
        index: usize,
        shape: &PageShape,
    ) -> Option<Action> {
        let items = shape.menu.get(parent).map(|m| m.submenu).unwrap_or(0);
        match role {
            // Menu key from a submenu closes both levels, straight to story.
            KeyRole::Menu => {
                self.context = FocusContext::Story;
                self.focus_story_default(shape);
                None
            }
            KeyRole::Up => {
                if index > 0 {
                    self.context = FocusContext::Submenu {
                        parent,
                        index: index - 1,
                        name: self.submenu_name(),
                    };
                }
                None
            }
            KeyRole::Down => {
                if items > 0 && index + 1 < items {
                    self.context = FocusContext::Submenu {
                        parent,
                        index: index + 1,
                        name: self.submenu_name(),
                    };
                }
                None
            }
            KeyRole::Left => {
                self.context = FocusContext::Dropdown { index: parent };
                None
            }
            KeyRole::Select => {
                if index < items {
                    Some(Action::Activate(Target::SubmenuItem { parent, index }))
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    fn submenu_name(&self) -> String {
        match &self.context {
            FocusContext::Submenu { name, .. } => name.clone(),
            _ => String::new(),
        }
    }

    /// The section movement and number shortcuts operate on: the section
    /// holding the focus marker, or the current section when nothing is
    /// marked.
    fn target_section(&self, shape: &PageShape) -> Option<usize> {
        if shape.sections.is_empty() {
            return None;
        }
        match self.story_focus {
            Some((section, _)) if section < shape.sections.len() => Some(section),
            _ => {
                if shape.current < shape.sections.len() {
                    Some(shape.current)
                } else {
                    None
                }
            }
        }
    }

    fn move_within_section(&mut self, delta: isize, shape: &PageShape) -> Option<Action> {
        let section = self.target_section(shape)?;
        let buttons = shape.sections[section].buttons();
        if buttons == 0 {
            return None;
        }

        let focused = match self.story_focus {
            Some((s, b)) if s == section => Some(b.min(buttons - 1)),
            _ => None,
        };
        let Some(current) = focused else {
            // No marker yet: land on the first button without scrolling.
            self.story_focus = Some((section, 0));
            return Some(Action::Moved {
                section,
                button: None,
                section_changed: false,
            });
        };

        let next = clamp_step(current, delta, buttons);
        if next == current {
            return None;
        }
        self.story_focus = Some((section, next));
        Some(Action::Moved {
            section,
            button: Some(next),
            section_changed: false,
        })
    }

    fn move_between_sections(&mut self, delta: isize, shape: &PageShape) -> Option<Action> {
        if shape.sections.is_empty() {
            return None;
        }
        let (section, button) = match self.story_focus {
            Some((s, b)) if s < shape.sections.len() => (s, Some(b)),
            _ => (shape.current.min(shape.sections.len() - 1), None),
        };

        let target = clamp_step(section, delta, shape.sections.len());
        let buttons = shape.sections[target].buttons();
        // Keep the relative button position when it exists in the target
        // section, else fall back to the first button.
        let target_button = match button {
            Some(b) if b < buttons => b,
            _ => 0,
        };
        self.story_focus = (buttons > 0).then_some((target, target_button));
        Some(Action::Moved {
            section: target,
            button: self.story_focus.map(|(_, b)| b),
            section_changed: target != section,
        })
    }

    /// Number-key selection precedence: a "Next" button wins for any of
    /// 1/2/3; a single option wins for any; 1 is always the first option;
    /// with three options 2 and 3 pick the second and third; with exactly two
    /// options both 2 and 3 pick the second.
    fn select_option_by_number(&mut self, number: u8, shape: &PageShape) -> Option<Action> {
        let section = self.target_section(shape)?;
        let s = shape.sections[section];

        let activate = |button: usize| {
            Some(Action::Activate(Target::StoryButton { section, button }))
        };

        if s.has_next {
            return activate(s.options);
        }
        match (number, s.options) {
            (_, 0) => None,
            (_, 1) => activate(0),
            (1, _) => activate(0),
            (2, n) if n >= 3 => activate(1),
            (3, n) if n >= 3 => activate(2),
            // Two options: 3 maps to the last button, and 2 does too (an
            // earlier revision made 2 a no-op here; the last-button mapping
            // is the intended behavior).
            (2 | 3, 2) => activate(1),
            _ => None,
        }
    }
}

fn clamp_step(index: usize, delta: isize, len: usize) -> usize {
    let moved = index as isize + delta;
    moved.clamp(0, len.saturating_sub(1) as isize) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(sections: &[(usize, bool)]) -> PageShape {
        let sections: Vec<SectionShape> = sections
            .iter()
            .map(|&(options, has_next)| SectionShape { options, has_next })
            .collect();
        let current = sections.len().saturating_sub(1);
        PageShape {
            sections,
            current,
            menu: Vec::new(),
        }
    }

    fn shape_with_menu(menu: &[(&str, usize)]) -> PageShape {
        let mut s = shape(&[(2, false)]);
        s.menu = menu
            .iter()
            .map(|&(label, submenu)| MenuItemShape {
                label: label.to_string(),
                submenu,
            })
            .collect();
        s
    }

    fn machine() -> FocusState {
        FocusState::new(Timing::default())
    }

    fn now() -> Instant {
        Instant::now()
    }

    fn activated(action: Option<Action>) -> Target {
        match action {
            Some(Action::Activate(target)) => target,
            other => panic!("expected activation, got {other:?}"),
        }
    }

    #[test]
    fn test_within_section_clamps_both_ends() {
        let shape = shape(&[(3, false)]);
        let mut m = machine();
        m.story_focus = Some((0, 0));

        assert!(m.handle_key(KeyRole::Left, &shape, now()).is_none());
        assert_eq!(m.story_focus, Some((0, 0)));

        m.handle_key(KeyRole::Right, &shape, now());
        m.handle_key(KeyRole::Right, &shape, now());
        assert_eq!(m.story_focus, Some((0, 2)));
        assert!(m.handle_key(KeyRole::Right, &shape, now()).is_none());
        assert_eq!(m.story_focus, Some((0, 2)));
    }

    #[test]
    fn test_within_section_first_press_sets_marker() {
        let shape = shape(&[(2, false)]);
        let mut m = machine();
        assert!(m.story_focus.is_none());
        m.handle_key(KeyRole::Right, &shape, now());
        assert_eq!(m.story_focus, Some((0, 0)));
    }

    #[test]
    fn test_between_sections_preserves_relative_index() {
        let shape = shape(&[(3, false), (3, false)]);
        let mut m = machine();
        m.story_focus = Some((1, 2));

        let action = m.handle_key(KeyRole::Up, &shape, now());
        assert_eq!(m.story_focus, Some((0, 2)));
        assert_eq!(
            action,
            Some(Action::Moved {
                section: 0,
                button: Some(2),
                section_changed: true
            })
        );
    }

    #[test]
    fn test_between_sections_falls_back_to_first_button() {
        let shape = shape(&[(1, false), (3, false)]);
        let mut m = machine();
        m.story_focus = Some((1, 2));
        m.handle_key(KeyRole::Up, &shape, now());
        assert_eq!(m.story_focus, Some((0, 0)));
    }

    #[test]
    fn test_between_sections_clamps() {
        let shape = shape(&[(1, false), (1, false)]);
        let mut m = machine();
        m.story_focus = Some((1, 0));
        let action = m.handle_key(KeyRole::Down, &shape, now());
        assert_eq!(m.story_focus, Some((1, 0)));
        assert_eq!(
            action,
            Some(Action::Moved {
                section: 1,
                button: Some(0),
                section_changed: false
            })
        );
    }

    #[test]
    fn test_number_keys_with_three_options() {
        let shape = shape(&[(3, false)]);
        let mut m = machine();
        assert_eq!(
            activated(m.handle_key(KeyRole::Option2, &shape, now())),
            Target::StoryButton { section: 0, button: 1 }
        );
        assert_eq!(
            activated(m.handle_key(KeyRole::Option3, &shape, now())),
            Target::StoryButton { section: 0, button: 2 }
        );
        assert_eq!(
            activated(m.handle_key(KeyRole::Option1, &shape, now())),
            Target::StoryButton { section: 0, button: 0 }
        );
    }

    #[test]
    fn test_number_keys_with_two_options_map_to_last() {
        let shape = shape(&[(2, false)]);
        let mut m = machine();
        // Both 2 and 3 resolve to the second button; see the note in
        // select_option_by_number about the earlier no-op revision.
        assert_eq!(
            activated(m.handle_key(KeyRole::Option2, &shape, now())),
            Target::StoryButton { section: 0, button: 1 }
        );
        assert_eq!(
            activated(m.handle_key(KeyRole::Option3, &shape, now())),
            Target::StoryButton { section: 0, button: 1 }
        );
    }

    #[test]
    fn test_number_keys_with_single_option() {
        let shape = shape(&[(1, false)]);
        let mut m = machine();
        for role in [KeyRole::Option1, KeyRole::Option2, KeyRole::Option3] {
            assert_eq!(
                activated(m.handle_key(role, &shape, now())),
                Target::StoryButton { section: 0, button: 0 }
            );
        }
    }

    #[test]
    fn test_number_keys_prefer_next_button() {
        let shape = shape(&[(0, true)]);
        let mut m = machine();
        for role in [KeyRole::Option1, KeyRole::Option2, KeyRole::Option3] {
            assert_eq!(
                activated(m.handle_key(role, &shape, now())),
                Target::StoryButton { section: 0, button: 0 }
            );
        }
    }

    #[test]
    fn test_number_keys_prefer_next_even_beside_options() {
        // Sections render either options or a next button, but the
        // precedence holds for the combined case too: next wins.
        let shape = shape(&[(3, true)]);
        let mut m = machine();
        for role in [KeyRole::Option1, KeyRole::Option2, KeyRole::Option3] {
            assert_eq!(
                activated(m.handle_key(role, &shape, now())),
                Target::StoryButton { section: 0, button: 3 }
            );
        }
    }

    #[test]
    fn test_menu_key_opens_dropdown_from_story_only() {
        let shape = shape_with_menu(&[("Restart", 0), ("Chapters", 2)]);
        let mut m = machine();
        m.handle_key(KeyRole::Menu, &shape, now());
        assert_eq!(m.context, FocusContext::Dropdown { index: 0 });

        // Enter the submenu, then press the menu key: both levels close and
        // focus lands back in the story. It never re-opens from a submenu.
        m.handle_key(KeyRole::Down, &shape, now());
        m.handle_key(KeyRole::Right, &shape, now());
        assert!(matches!(m.context, FocusContext::Submenu { parent: 1, .. }));
        m.handle_key(KeyRole::Menu, &shape, now());
        assert_eq!(m.context, FocusContext::Story);
    }

    #[test]
    fn test_dropdown_navigation_clamps() {
        let shape = shape_with_menu(&[("A", 0), ("B", 0)]);
        let mut m = machine();
        m.handle_key(KeyRole::Menu, &shape, now());
        m.handle_key(KeyRole::Up, &shape, now());
        assert_eq!(m.context, FocusContext::Dropdown { index: 0 });
        m.handle_key(KeyRole::Down, &shape, now());
        m.handle_key(KeyRole::Down, &shape, now());
        assert_eq!(m.context, FocusContext::Dropdown { index: 1 });
    }

    #[test]
    fn test_submenu_left_returns_to_parent() {
        let shape = shape_with_menu(&[("Chapters", 3)]);
        let mut m = machine();
        m.handle_key(KeyRole::Menu, &shape, now());
        m.handle_key(KeyRole::Right, &shape, now());
        m.handle_key(KeyRole::Down, &shape, now());
        assert!(matches!(
            m.context,
            FocusContext::Submenu { parent: 0, index: 1, .. }
        ));
        m.handle_key(KeyRole::Left, &shape, now());
        assert_eq!(m.context, FocusContext::Dropdown { index: 0 });
    }

    #[test]
    fn test_submenu_select_activates_item() {
        let shape = shape_with_menu(&[("Chapters", 2)]);
        let mut m = machine();
        m.handle_key(KeyRole::Menu, &shape, now());
        m.handle_key(KeyRole::Select, &shape, now()); // opens submenu
        let action = m.handle_key(KeyRole::Select, &shape, now());
        assert_eq!(
            activated(action),
            Target::SubmenuItem { parent: 0, index: 0 }
        );
    }

    #[test]
    fn test_confirm_popup_keys() {
        let shape = shape(&[(2, false)]);
        let mut m = machine();
        m.story_focus = Some((0, 1));
        m.on_confirm_shown();
        assert_eq!(m.context, FocusContext::Confirm);
        assert_eq!(m.popup_button, PopupButton::None);

        // Select with no highlight does nothing.
        assert!(m.handle_key(KeyRole::Select, &shape, now()).is_none());

        m.handle_key(KeyRole::Left, &shape, now());
        assert_eq!(m.popup_button, PopupButton::Yes);
        m.handle_key(KeyRole::Right, &shape, now());
        assert_eq!(m.popup_button, PopupButton::No);

        assert_eq!(
            activated(m.handle_key(KeyRole::Select, &shape, now())),
            Target::ConfirmNo
        );
    }

    #[test]
    fn test_confirm_number_aliases_defer_activation() {
        let shape = shape(&[(2, false)]);
        let mut m = machine();
        m.on_confirm_shown();
        let action = m.handle_key(KeyRole::Option1, &shape, now());
        assert_eq!(
            action,
            Some(Action::ActivateAfterDelay(Target::ConfirmYes))
        );
        assert_eq!(m.popup_button, PopupButton::Yes);
    }

    #[test]
    fn test_busy_guard_suppresses_modal_keys_only() {
        let shape = shape(&[(2, false)]);
        let mut m = machine();
        let t = now();
        m.on_confirm_shown();
        m.set_popup_button(PopupButton::Yes);
        assert!(m.handle_key(KeyRole::Select, &shape, t).is_some());
        // The activation armed the busy window; further modal keys are
        // dropped until it expires.
        assert!(m.is_busy(t));
        assert!(m.handle_key(KeyRole::Select, &shape, t).is_none());

        // Story keys are unaffected by a pending modal transition.
        m.on_confirm_closed(false, &shape);
        assert!(m.handle_key(KeyRole::Right, &shape, t).is_some());
    }

    #[test]
    fn test_confirm_close_asymmetry() {
        let shape = shape(&[(2, false), (2, false)]);
        let mut m = machine();
        m.story_focus = Some((0, 1));
        m.on_confirm_shown();

        // Decline restores the captured focus exactly.
        m.on_confirm_closed(false, &shape);
        assert_eq!(m.context, FocusContext::Story);
        assert_eq!(m.story_focus, Some((0, 1)));

        // Confirm goes to the latest story position instead.
        m.on_confirm_shown();
        m.on_confirm_closed(true, &shape);
        assert_eq!(m.story_focus, Some((1, 0)));
    }

    #[test]
    fn test_warning_acknowledge_keys() {
        let shape = shape(&[(2, false)]);
        let mut m = machine();
        let t = now();
        m.on_warning_shown(t - Duration::from_secs(1));
        for role in [KeyRole::Select, KeyRole::Cancel, KeyRole::Option2] {
            let mut m2 = machine();
            m2.on_warning_shown(t - Duration::from_secs(1));
            assert_eq!(
                activated(m2.handle_key(role, &shape, t)),
                Target::WarningOk
            );
        }
        // Directional keys mean nothing here.
        assert!(m.handle_key(KeyRole::Left, &shape, t).is_none());
    }

    #[test]
    fn test_disabled_machine_ignores_everything() {
        let shape = shape(&[(2, false)]);
        let mut m = machine();
        m.enabled = false;
        assert!(m.handle_key(KeyRole::Option1, &shape, now()).is_none());
        assert!(m.handle_key(KeyRole::Menu, &shape, now()).is_none());
        assert_eq!(m.context, FocusContext::Story);
    }
}

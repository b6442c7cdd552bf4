use std::time::{Duration, Instant};

use anyhow::{ensure, Result};
use crossterm::event::{KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use tracing::{info, warn};

use crate::config::Config;
use crate::flow::engine::FlowEngine;
use crate::flow::loader::{Issue, Severity};
use crate::flow::step::FlowData;
use crate::focus::keymap::{role_for, KeyRole};
use crate::focus::machine::{
    Action, FocusState, MenuItemShape, PageShape, PopupButton, SectionShape, Target, Timing,
};
use crate::focus::popup::{PendingRewind, PopupCoordinator};
use crate::ui::components::popup::Notice;
use crate::ui::components::story::StoryLayout;
use crate::ui::hit::{HitMap, HitTarget};
use crate::ui::theme::Theme;

/// Deferred scroll request, resolved during render when line heights are
/// known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollRequest {
    Top,
    Latest,
    IntoView { section: usize, button: usize },
}

const DRAG_THROTTLE: Duration = Duration::from_millis(16);

/// Owns every piece of mutable state and wires the focus machine, the popup
/// coordinator, and the flow engine together. All mutation happens on the
/// event-loop thread; timers are plain deadlines fired from `tick`.
pub struct App {
    pub config: Config,
    pub theme: &'static Theme,
    pub engine: FlowEngine,
    pub focus: FocusState,
    pub popups: PopupCoordinator,
    pub notice: Option<Notice>,
    pub hit: HitMap,
    pub flow_source: String,

    pub scroll: u16,
    pub pending_scroll: Option<ScrollRequest>,
    /// Transient destination highlight: (section, clears at). A new request
    /// replaces a pending one instead of stacking.
    pub highlight: Option<(usize, Instant)>,

    pending_auto_advance: Option<(Instant, String)>,
    pending_activation: Option<(Instant, Target)>,
    pending_focus_refresh: Option<Instant>,
    pending_popup_focus: Option<Instant>,

    pub guide_visible: bool,
    pub guide_pos: (u16, u16),
    guide_drag: Option<(u16, u16)>,
    drag_throttle: Option<Instant>,

    pub should_quit: bool,
}

impl App {
    pub fn new(config: Config, flow: FlowData, issues: Vec<Issue>, flow_source: String) -> Self {
        let loaded_theme = Theme::load(&config.theme).unwrap_or_default();
        let theme: &'static Theme = Box::leak(Box::new(loaded_theme));

        let timing = Timing {
            transition: Duration::from_millis(config.transition_delay_ms),
            focus: Duration::from_millis(config.focus_delay_ms),
        };

        let notice = notice_from_issues(&issues);
        let guide_visible = config.show_guide;

        let mut app = Self {
            config,
            theme,
            engine: FlowEngine::new(flow),
            focus: FocusState::new(timing),
            popups: PopupCoordinator::default(),
            notice,
            hit: HitMap::default(),
            flow_source,
            scroll: 0,
            pending_scroll: Some(ScrollRequest::Latest),
            highlight: None,
            pending_auto_advance: None,
            pending_activation: None,
            pending_focus_refresh: None,
            pending_popup_focus: None,
            guide_visible,
            guide_pos: (u16::MAX, 1),
            guide_drag: None,
            drag_throttle: None,
            should_quit: false,
        };
        app.schedule_auto_replay(Instant::now());
        app
    }

    /// Tear everything down and rebuild from a fresh configuration and flow.
    pub fn reinitialize(
        &mut self,
        config: Config,
        flow: FlowData,
        issues: Vec<Issue>,
        flow_source: String,
    ) {
        info!("reinitializing with flow source {flow_source}");
        *self = App::new(config, flow, issues, flow_source);
    }

    /// Public switch for embedding surfaces that need the keys to themselves.
    pub fn set_keyboard_enabled(&mut self, enabled: bool) {
        self.focus.enabled = enabled;
    }

    fn auto_advance_delay(&self) -> Duration {
        Duration::from_millis(self.config.auto_advance_delay_ms)
    }

    fn transition_delay(&self) -> Duration {
        Duration::from_millis(self.config.transition_delay_ms)
    }

    fn focus_delay(&self) -> Duration {
        Duration::from_millis(self.config.focus_delay_ms)
    }

    fn highlight_decay(&self) -> Duration {
        Duration::from_millis(self.config.highlight_decay_ms)
    }

    /// Snapshot of the rendered page the focus machine navigates over.
    /// Sections are 1:1 with history entries.
    pub fn page_shape(&self) -> PageShape {
        let sections = (0..self.engine.history().len())
            .map(|index| match self.engine.step_at(index) {
                Some(step) => SectionShape {
                    options: step.options.len(),
                    has_next: step.has_next_button(),
                },
                None => SectionShape::default(),
            })
            .collect();
        let menu = self
            .config
            .menu
            .iter()
            .map(|entry| MenuItemShape {
                label: entry.label.clone(),
                submenu: entry.submenu.len(),
            })
            .collect();
        PageShape {
            sections,
            current: self.engine.last_index(),
            menu,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Result<()> {
        let Some(role) = role_for(&key) else {
            return Ok(());
        };

        // The blocking summary swallows everything except its own dismissal.
        if self.notice.is_some() {
            if matches!(role, KeyRole::Select | KeyRole::Cancel) {
                self.notice = None;
            }
            return Ok(());
        }

        let shape = self.page_shape();
        let action = self.focus.handle_key(role, &shape, now);
        if let Some(action) = action {
            self.apply_action(action, now)?;
        }
        Ok(())
    }

    fn apply_action(&mut self, action: Action, now: Instant) -> Result<()> {
        match action {
            Action::Activate(target) => self.activate(target, now)?,
            Action::ActivateAfterDelay(target) => {
                self.pending_activation = Some((now + self.transition_delay(), target));
            }
            Action::Moved {
                section,
                button,
                section_changed,
            } => {
                if let Some(button) = button {
                    self.pending_scroll = Some(ScrollRequest::IntoView { section, button });
                }
                if section_changed {
                    self.highlight = Some((section, now + self.highlight_decay()));
                }
            }
            Action::ScrollTop => self.pending_scroll = Some(ScrollRequest::Top),
            Action::RestartHome => {
                let start = self.engine.start_id().to_string();
                self.engine.restart(&start);
                self.after_flow_change(now);
            }
        }
        Ok(())
    }

    fn activate(&mut self, target: Target, now: Instant) -> Result<()> {
        match target {
            Target::StoryButton { section, button } => {
                self.activate_story_button(section, button, now)?
            }
            Target::MenuItem { index } => {
                let step = self
                    .config
                    .menu
                    .get(index)
                    .and_then(|entry| entry.step.clone());
                if let Some(step) = step {
                    self.jump_to_step(&step, now);
                }
            }
            Target::SubmenuItem { parent, index } => {
                let step = self
                    .config
                    .menu
                    .get(parent)
                    .and_then(|entry| entry.submenu.get(index))
                    .map(|sub| sub.step.clone());
                if let Some(step) = step {
                    self.jump_to_step(&step, now);
                }
            }
            Target::ConfirmYes => self.confirm_rewind(now),
            Target::ConfirmNo => self.decline_rewind(),
            Target::WarningOk => self.acknowledge_warning(now),
        }
        Ok(())
    }

    /// Resolve a story button press against the history entry that owns it.
    /// Public because it is also the click path for story buttons.
    pub fn activate_story_button(&mut self, section: usize, button: usize, now: Instant) -> Result<()> {
        ensure!(
            section < self.engine.history().len(),
            "story button points at section {section} beyond history"
        );
        let entry = &self.engine.history()[section];

        // A replayed entry is inert: any button only raises the warning.
        if entry.auto_selected {
            self.popups.show_warning();
            self.focus.on_warning_shown(now);
            return Ok(());
        }

        let Some(step) = self.engine.step_at(section) else {
            warn!(section, "activated a section whose step is missing");
            return Ok(());
        };

        let is_last = self.engine.is_last(section);
        if button < step.options.len() {
            let option = &step.options[button];
            let (text, target) = (option.text.clone(), option.next.clone());
            if is_last {
                self.engine.select_current(&text, &target);
                self.after_flow_change(now);
            } else {
                self.open_confirmation(section, text, target, now);
            }
        } else if step.has_next_button() && button == 0 {
            if is_last {
                self.engine.advance_default(section);
                self.after_flow_change(now);
            } else {
                let target = step.default_next.clone();
                self.open_confirmation(
                    section,
                    crate::flow::engine::NEXT_LABEL.to_string(),
                    target,
                    now,
                );
            }
        } else {
            warn!(section, button, "activated button no longer exists");
        }
        Ok(())
    }

    fn open_confirmation(&mut self, index: usize, option_text: String, target: String, now: Instant) {
        self.popups.show_confirm(PendingRewind {
            index,
            option_text,
            target,
        });
        self.focus.on_confirm_shown();
        // The yes-highlight appears only after the focus delay, so the
        // popup is visibly neutral first.
        self.pending_popup_focus = Some(now + self.focus_delay());
    }

    fn confirm_rewind(&mut self, now: Instant) {
        let Some(pending) = self.popups.take_confirm() else {
            return;
        };
        self.engine
            .rewind_and_select(pending.index, &pending.option_text, &pending.target);
        self.after_flow_change(now);
        let shape = self.page_shape();
        self.focus.on_confirm_closed(true, &shape);
    }

    fn decline_rewind(&mut self) {
        self.popups.cancel_confirm();
        let shape = self.page_shape();
        self.focus.on_confirm_closed(false, &shape);
    }

    fn acknowledge_warning(&mut self, now: Instant) {
        self.popups.acknowledge_warning();
        self.focus.on_warning_closed(now);
        self.pending_focus_refresh = Some(now + self.transition_delay());
    }

    fn jump_to_step(&mut self, step_id: &str, now: Instant) {
        if !valid_step_id(step_id) || self.engine.step(step_id).is_none() {
            warn!(step_id, "menu target is invalid or unknown");
            return;
        }
        self.engine.restart(step_id);
        let shape = self.page_shape();
        self.focus.close_menu(&shape);
        self.after_flow_change(now);
    }

    /// Common tail of every history mutation: drop stale focus markers,
    /// scroll to the latest section, and arm auto-replay for the new current
    /// step.
    fn after_flow_change(&mut self, now: Instant) {
        self.focus.reset_story_focus();
        self.pending_scroll = Some(ScrollRequest::Latest);
        self.pending_auto_advance = None;
        self.schedule_auto_replay(now);
    }

    fn schedule_auto_replay(&mut self, now: Instant) {
        if let Some(next) = self.engine.try_auto_replay() {
            self.pending_auto_advance = Some((now + self.auto_advance_delay(), next));
        }
    }

    /// Fire any expired deadline. Called on every tick of the event loop.
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        if let Some((at, target)) = self.pending_activation.clone() {
            if now >= at {
                self.pending_activation = None;
                self.activate(target, now)?;
            }
        }

        if let Some((at, next)) = self.pending_auto_advance.clone() {
            if now >= at {
                self.pending_auto_advance = None;
                self.engine.append(&next);
                self.after_flow_change(now);
            }
        }

        if let Some(at) = self.pending_focus_refresh {
            if now >= at {
                self.pending_focus_refresh = None;
                let shape = self.page_shape();
                self.focus.focus_story_default(&shape);
            }
        }

        if let Some(at) = self.pending_popup_focus {
            if now >= at {
                self.pending_popup_focus = None;
                if self.popups.confirm_visible() {
                    self.focus.set_popup_button(PopupButton::Yes);
                }
            }
        }

        if let Some((_, until)) = self.highlight {
            if now >= until {
                self.highlight = None;
            }
        }

        Ok(())
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) -> Result<()> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.on_click(mouse.column, mouse.row, now)?
            }
            MouseEventKind::Drag(MouseButton::Left) => self.on_drag(mouse.column, mouse.row, now),
            MouseEventKind::Moved => self.on_hover(mouse.column, mouse.row),
            MouseEventKind::Up(MouseButton::Left) => {
                self.guide_drag = None;
                self.drag_throttle = None;
            }
            MouseEventKind::ScrollUp => self.scroll_by(-2),
            MouseEventKind::ScrollDown => self.scroll_by(2),
            _ => {}
        }
        Ok(())
    }

    fn on_click(&mut self, x: u16, y: u16, now: Instant) -> Result<()> {
        let target = self.hit.hit(x, y).cloned();

        // A click outside the open dropdown closes it, like clicking the
        // page background.
        let menu_click = matches!(
            target,
            Some(HitTarget::MenuToggle)
                | Some(HitTarget::MenuItem { .. })
                | Some(HitTarget::SubmenuItem { .. })
        );
        if self.focus.menu_open() && !menu_click {
            let shape = self.page_shape();
            self.focus.close_menu(&shape);
        }

        let Some(target) = target else {
            return Ok(());
        };
        match target {
            HitTarget::StoryButton { section, button } => {
                self.activate_story_button(section, button, now)?
            }
            HitTarget::MenuToggle => {
                if self.focus.menu_open() {
                    let shape = self.page_shape();
                    self.focus.close_menu(&shape);
                } else if !self.config.menu.is_empty() {
                    self.focus.open_dropdown();
                }
            }
            HitTarget::MenuItem { index } => {
                // Items with a submenu only expand via keys; a click on them
                // is inert, matching the page behavior.
                let step = self
                    .config
                    .menu
                    .get(index)
                    .filter(|entry| entry.submenu.is_empty())
                    .and_then(|entry| entry.step.clone());
                if let Some(step) = step {
                    self.jump_to_step(&step, now);
                }
            }
            HitTarget::SubmenuItem { parent, index } => {
                let step = self
                    .config
                    .menu
                    .get(parent)
                    .and_then(|entry| entry.submenu.get(index))
                    .map(|sub| sub.step.clone());
                if let Some(step) = step {
                    self.jump_to_step(&step, now);
                }
            }
            HitTarget::ConfirmYes => self.confirm_rewind(now),
            HitTarget::ConfirmNo => self.decline_rewind(),
            HitTarget::WarningOk => self.acknowledge_warning(now),
            HitTarget::NoticeOk => self.notice = None,
            HitTarget::GuideHandle => {
                self.guide_drag = Some((x.saturating_sub(self.guide_pos.0), 0));
            }
            HitTarget::GuideClose => self.guide_visible = false,
            HitTarget::ScrollTop => self.pending_scroll = Some(ScrollRequest::Top),
        }
        Ok(())
    }

    /// Reposition the guide while dragging, throttled so a fast pointer does
    /// not schedule a reposition per motion event.
    fn on_drag(&mut self, x: u16, y: u16, now: Instant) {
        let Some((offset_x, offset_y)) = self.guide_drag else {
            return;
        };
        if self.drag_throttle.is_some_and(|at| now < at) {
            return;
        }
        self.drag_throttle = Some(now + DRAG_THROTTLE);
        self.guide_pos = (x.saturating_sub(offset_x), y.saturating_sub(offset_y));
    }

    /// Hovering the confirmation buttons moves the highlight, like the
    /// pointer version of the left/right keys.
    fn on_hover(&mut self, x: u16, y: u16) {
        if !self.popups.confirm_visible() {
            return;
        }
        match self.hit.hit(x, y) {
            Some(HitTarget::ConfirmYes) => self.focus.set_popup_button(PopupButton::Yes),
            Some(HitTarget::ConfirmNo) => self.focus.set_popup_button(PopupButton::No),
            _ => {}
        }
    }

    fn scroll_by(&mut self, delta: i16) {
        self.pending_scroll = None;
        self.scroll = self.scroll.saturating_add_signed(delta);
    }

    /// Resolve the deferred scroll request now that line heights are known.
    pub fn resolve_scroll(&mut self, layout: &StoryLayout, viewport: u16) {
        let total = layout.height() as u16;
        let max_scroll = total.saturating_sub(viewport);

        if let Some(request) = self.pending_scroll.take() {
            match request {
                ScrollRequest::Top => self.scroll = 0,
                ScrollRequest::Latest => self.scroll = max_scroll,
                ScrollRequest::IntoView { section, button } => {
                    if let Some(line) = layout.button_line(section, button) {
                        let line = line as u16;
                        if line < self.scroll || line >= self.scroll + viewport {
                            self.scroll = line.saturating_sub(viewport / 2);
                        }
                    }
                }
            }
        }
        self.scroll = self.scroll.min(max_scroll);
    }

    /// Section highlighted right now, if the decay deadline has not passed.
    pub fn active_highlight(&self, now: Instant) -> Option<usize> {
        self.highlight
            .filter(|(_, until)| now < *until)
            .map(|(section, _)| section)
    }

    /// Fault barrier: called when any dispatch returns an error, so a single
    /// failure can never leave the input machine locked.
    pub fn recover_from_fault(&mut self, message: &str) {
        self.focus.clear_busy();
        self.pending_activation = None;
        self.notice = Some(Notice {
            title: "Something went wrong".to_string(),
            lines: vec![(Severity::Error, message.to_string())],
        });
    }
}

fn valid_step_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn notice_from_issues(issues: &[Issue]) -> Option<Notice> {
    if issues.is_empty() {
        return None;
    }
    let has_errors = issues.iter().any(|i| i.severity == Severity::Error);
    Some(Notice {
        title: if has_errors {
            "Flow data has errors".to_string()
        } else {
            "Flow data warnings".to_string()
        },
        lines: issues
            .iter()
            .map(|i| (i.severity, i.message.clone()))
            .collect(),
    })
}

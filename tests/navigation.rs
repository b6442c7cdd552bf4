use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use tempfile::NamedTempFile;

use stepflow::app::App;
use stepflow::config::{Config, MenuEntry, SubmenuEntry};
use stepflow::flow::loader;
use stepflow::focus::keymap::KeyRole;
use stepflow::focus::machine::FocusContext;

const SHEET: &str = "\
StepID,Title,Desc1,Option1Text,Option1Next,Option2Text,Option2Next,DefaultNext,NonAutoSelect
1,Start,Pick one,Yes,2,No,3,,
2,Done,,,,,,,
3,Detour,,,,,,4,
4,Again,Same wording as step 1,Yes,2,No,3,,";

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

fn make_app(sheet: &str) -> App {
    let (flow, issues) = loader::load_str(sheet);
    App::new(Config::default(), flow, issues, "test".to_string())
}

#[test]
fn selecting_yes_appends_the_target_step() {
    let mut app = make_app(SHEET);
    let now = Instant::now();

    app.handle_key(key(KeyCode::Char('1')), now).unwrap();

    let history = app.engine.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].step_id, "1");
    assert_eq!(history[0].chosen_option.as_deref(), Some("Yes"));
    assert_eq!(history[1].step_id, "2");
    assert_eq!(history[1].chosen_option, None);
}

#[test]
fn changing_an_earlier_answer_goes_through_confirmation() {
    let mut app = make_app(SHEET);
    let now = Instant::now();
    app.handle_key(key(KeyCode::Char('1')), now).unwrap(); // 1 -> 2

    // Re-answer entry 0 with "No": nothing mutates until confirmed.
    app.activate_story_button(0, 1, now).unwrap();
    assert!(app.popups.confirm_visible());
    assert_eq!(app.engine.history().len(), 2);
    assert_eq!(
        app.engine.history()[0].chosen_option.as_deref(),
        Some("Yes")
    );
    assert_eq!(app.focus.context, FocusContext::Confirm);

    // The yes-highlight appears after the focus delay, then Enter confirms.
    app.tick(now + Duration::from_millis(150)).unwrap();
    app.handle_key(key(KeyCode::Enter), now + Duration::from_millis(200))
        .unwrap();

    let history = app.engine.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].chosen_option.as_deref(), Some("No"));
    assert_eq!(history[1].step_id, "3");
    assert_eq!(app.focus.context, FocusContext::Story);
}

#[test]
fn declining_the_confirmation_restores_focus_and_history() {
    let mut app = make_app(SHEET);
    let now = Instant::now();
    app.handle_key(key(KeyCode::Char('1')), now).unwrap();

    // Put the marker somewhere specific first.
    app.handle_key(key(KeyCode::Char('8')), now).unwrap(); // up to section 0
    app.handle_key(key(KeyCode::Char('6')), now).unwrap(); // right to button 1
    let marker = app.focus.story_focus;
    assert_eq!(marker, Some((0, 1)));

    app.activate_story_button(0, 1, now).unwrap();
    assert!(app.popups.confirm_visible());

    // "3" is the no-shortcut; its activation lands after the transition
    // delay.
    app.handle_key(key(KeyCode::Char('3')), now).unwrap();
    app.tick(now + Duration::from_millis(200)).unwrap();

    assert!(!app.popups.confirm_visible());
    assert_eq!(app.engine.history()[1].step_id, "2", "history untouched");
    // Decline restores the captured marker, not the story default.
    assert_eq!(app.focus.story_focus, marker);
}

#[test]
fn rewinding_into_identical_wording_replays_the_choice() {
    let mut app = make_app(SHEET);
    let now = Instant::now();
    app.handle_key(key(KeyCode::Char('1')), now).unwrap(); // Yes -> 2

    // Change the first answer to "No": flow goes 1 -> 3 (detour).
    app.activate_story_button(0, 1, now).unwrap();
    app.handle_key(key(KeyCode::Char('1')), now).unwrap(); // yes-shortcut
    app.tick(now + Duration::from_millis(200)).unwrap();
    assert_eq!(app.engine.history().last().unwrap().step_id, "3");

    // Continue to step 4, whose options read exactly like step 1's. The
    // remembered "No" replays automatically after the visible delay.
    let t1 = now + Duration::from_millis(300);
    app.handle_key(key(KeyCode::Char('1')), t1).unwrap(); // Next button
    let last = app.engine.history().last().unwrap();
    assert_eq!(last.step_id, "4");
    assert!(last.auto_selected);
    assert_eq!(last.chosen_option.as_deref(), Some("No"));

    // Not yet advanced...
    app.tick(t1 + Duration::from_millis(1000)).unwrap();
    assert_eq!(app.engine.history().last().unwrap().step_id, "4");
    // ...but after 1.5 time-units the append fires.
    app.tick(t1 + Duration::from_millis(1600)).unwrap();
    assert_eq!(app.engine.history().last().unwrap().step_id, "3");

    // The replayed section is locked: activating it warns, mutates nothing.
    let len = app.engine.history().len();
    app.activate_story_button(2, 0, t1 + Duration::from_millis(1700))
        .unwrap();
    assert!(app.popups.warning_visible());
    assert_eq!(app.engine.history().len(), len);
}

#[test]
fn menu_key_opens_only_from_story() {
    let mut config = Config::default();
    config.menu = vec![
        MenuEntry {
            label: "Restart".to_string(),
            step: Some("1".to_string()),
            submenu: Vec::new(),
        },
        MenuEntry {
            label: "Jump".to_string(),
            step: None,
            submenu: vec![
                SubmenuEntry {
                    label: "Done".to_string(),
                    step: "2".to_string(),
                },
                SubmenuEntry {
                    label: "Detour".to_string(),
                    step: "3".to_string(),
                },
            ],
        },
    ];
    let (flow, issues) = loader::load_str(SHEET);
    let mut app = App::new(config, flow, issues, "test".to_string());
    let now = Instant::now();

    app.handle_key(key(KeyCode::Char('7')), now).unwrap();
    assert_eq!(app.focus.context, FocusContext::Dropdown { index: 0 });

    app.handle_key(key(KeyCode::Char('5')), now).unwrap(); // down
    app.handle_key(key(KeyCode::Char('6')), now).unwrap(); // expand
    assert!(matches!(
        app.focus.context,
        FocusContext::Submenu { parent: 1, index: 0, .. }
    ));

    // From a submenu the menu key closes everything; it never re-opens.
    app.handle_key(key(KeyCode::Char('7')), now).unwrap();
    assert_eq!(app.focus.context, FocusContext::Story);

    // Selecting a submenu item restarts the flow at its step.
    app.handle_key(key(KeyCode::Char('7')), now).unwrap();
    app.handle_key(key(KeyCode::Char('5')), now).unwrap();
    app.handle_key(key(KeyCode::Enter), now).unwrap(); // into submenu
    app.handle_key(key(KeyCode::Char('5')), now).unwrap(); // second item
    app.handle_key(key(KeyCode::Enter), now).unwrap();
    assert_eq!(app.engine.history().len(), 1);
    assert_eq!(app.engine.history()[0].step_id, "3");
    assert_eq!(app.focus.context, FocusContext::Story);
}

#[test]
fn arrow_and_digit_keys_are_interchangeable() {
    let mut left = make_app(SHEET);
    let mut right = make_app(SHEET);
    let now = Instant::now();

    left.handle_key(key(KeyCode::Char('8')), now).unwrap();
    right.handle_key(key(KeyCode::Up), now).unwrap();
    assert_eq!(left.focus.story_focus, right.focus.story_focus);

    left.handle_key(key(KeyCode::Char('6')), now).unwrap();
    right.handle_key(key(KeyCode::Right), now).unwrap();
    assert_eq!(left.focus.story_focus, right.focus.story_focus);
}

#[test]
fn invalid_flow_renders_placeholder_and_blocks_input() {
    let mut app = make_app("StepID,Title\n1,Start\n1,Start again");
    assert!(app.notice.is_some(), "duplicate ids produce a summary");

    let now = Instant::now();
    app.handle_key(key(KeyCode::Char('1')), now).unwrap();
    assert_eq!(app.engine.history().len(), 1, "blocked by the notice");

    app.handle_key(key(KeyCode::Esc), now).unwrap();
    assert!(app.notice.is_none());

    // The placeholder step is terminal; input cannot crash the app.
    app.handle_key(key(KeyCode::Char('1')), now).unwrap();
    app.handle_key(key(KeyCode::Enter), now).unwrap();
    assert_eq!(app.engine.history().len(), 1);
}

#[test]
fn load_file_reads_from_disk() {
    use std::io::Write;

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{SHEET}").unwrap();
    let (flow, issues) = loader::load_file(file.path()).unwrap();
    assert!(issues.is_empty());
    assert_eq!(flow.steps.len(), 4);
    assert_eq!(flow.start, "1");
}

#[test]
fn key_roles_cover_the_keypad_table() {
    use stepflow::focus::keymap::role_for;
    let cases = [
        (KeyCode::Char('7'), KeyRole::Menu),
        (KeyCode::Char('*'), KeyRole::Top),
        (KeyCode::Char('-'), KeyRole::Home),
        (KeyCode::Esc, KeyRole::Cancel),
        (KeyCode::Enter, KeyRole::Select),
        (KeyCode::Char(' '), KeyRole::Select),
    ];
    for (code, role) in cases {
        assert_eq!(role_for(&key(code)), Some(role));
    }
}

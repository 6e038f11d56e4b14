use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use settree::{
    NodeKind, RefreshEvent, RefreshOutcome, Row, SettingsError, SettingsTree, SkipReason,
    SyncStats,
    store::{FileStore, handle},
};

/// Position within the visible rows.
///
/// `pos < len`, or `pos == 0` when there are no rows.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    pos: usize,
    len: usize,
}

impl Cursor {
    pub fn new(len: usize) -> Self {
        Self { pos: 0, len }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn move_up(&mut self) -> bool {
        if self.pos > 0 {
            self.pos -= 1;
            true
        } else {
            false
        }
    }

    pub fn move_down(&mut self) -> bool {
        if self.pos + 1 < self.len {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn home(&mut self) {
        self.pos = 0;
    }

    pub fn end(&mut self) {
        self.pos = self.len.saturating_sub(1);
    }

    /// Change the length, clamping the position.
    pub fn update_len(&mut self, len: usize) {
        self.len = len;
        self.pos = self.pos.min(len.saturating_sub(1));
    }

    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.len.saturating_sub(1));
    }
}

/// What keystrokes are currently driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    /// Editing the value of the selected key.
    Editing,
    /// Typing the path of a settings file to open.
    Opening,
}

/// Message shown in the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
}

pub struct App {
    pub tree: SettingsTree,
    pub cursor: Cursor,
    pub mode: InputMode,
    /// Text of the edit or open prompt.
    pub input: String,
    pub status: Option<Status>,
    pub should_quit: bool,
    /// Rows that fit in the tree pane.
    pub viewport_height: usize,
    pub scroll_offset: usize,
}

impl App {
    pub fn new(tree: SettingsTree) -> Self {
        let mut app = App {
            tree,
            cursor: Cursor::default(),
            mode: InputMode::Normal,
            input: String::new(),
            status: None,
            should_quit: false,
            viewport_height: 0,
            scroll_offset: 0,
        };
        app.restore_selection(None);
        if let Some(err) = app.tree.last_sync_error() {
            app.status = Some(Status {
                text: err.to_string(),
                is_error: true,
            });
        }
        app
    }

    pub fn visible_rows(&self) -> Vec<Row<'_>> {
        self.tree.tree().flatten_visible()
    }

    /// Label path of the selected row.
    pub fn selected_path(&self) -> Option<Vec<String>> {
        self.visible_rows()
            .get(self.cursor.pos())
            .map(|row| row.path.clone())
    }

    pub fn title(&self) -> String {
        let Some(settings) = self.tree.settings() else {
            return "Settings Editor".to_string();
        };
        let location = settings.borrow().location();
        if self.tree.is_writable() {
            format!("Settings Editor - {location}")
        } else {
            format!("Settings Editor - {location} (read only)")
        }
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            is_error: false,
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.status = Some(Status {
            text: text.into(),
            is_error: true,
        });
    }

    /// Put the cursor back on `path` after the rows changed, or on its
    /// nearest surviving ancestor.
    fn restore_selection(&mut self, path: Option<Vec<String>>) {
        let rows = self.visible_rows();
        let len = rows.len();
        let pos = path.and_then(|path| {
            (1..=path.len())
                .rev()
                .find_map(|n| rows.iter().position(|r| r.path[..] == path[..n]))
        });
        drop(rows);
        self.cursor.update_len(len);
        if let Some(pos) = pos {
            self.cursor.set_pos(pos);
        }
        self.ensure_cursor_visible();
    }

    pub fn ensure_cursor_visible(&mut self) {
        let pos = self.cursor.pos();
        if self.viewport_height == 0 {
            return;
        }
        if pos < self.scroll_offset {
            self.scroll_offset = pos;
        } else if pos >= self.scroll_offset + self.viewport_height {
            self.scroll_offset = pos + 1 - self.viewport_height;
        }
    }

    fn after_refresh(&mut self, outcome: RefreshOutcome, selected: Option<Vec<String>>) {
        match outcome {
            RefreshOutcome::Refreshed(stats) => {
                self.restore_selection(selected);
                if let Some(err) = self.tree.last_sync_error() {
                    let text = err.to_string();
                    self.error(text);
                } else {
                    debug!("refresh: {stats:?}");
                }
            }
            RefreshOutcome::Skipped(reason) => trace!("refresh skipped: {reason:?}"),
        }
    }

    /// The auto-refresh timer fired.
    pub fn on_tick(&mut self) {
        let selected = self.selected_path();
        let outcome = self.tree.handle(RefreshEvent::TimerTick);
        self.after_refresh(outcome, selected);
    }

    /// The terminal regained focus.
    pub fn on_focus_gained(&mut self) {
        let selected = self.selected_path();
        let outcome = self.tree.handle(RefreshEvent::WindowActivated);
        self.after_refresh(outcome, selected);
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        match self.mode {
            InputMode::Normal => self.on_normal_key(key),
            InputMode::Editing => self.on_edit_key(key),
            InputMode::Opening => self.on_open_key(key),
        }
    }

    fn on_normal_key(&mut self, key: KeyEvent) {
        // The key help comes back once the message has been seen.
        self.status = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => {
                self.cursor.move_up();
                self.ensure_cursor_visible();
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.cursor.move_down();
                self.ensure_cursor_visible();
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.cursor.home();
                self.ensure_cursor_visible();
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.cursor.end();
                self.ensure_cursor_visible();
            }
            KeyCode::Enter => self.activate(true),
            KeyCode::Right | KeyCode::Char('l') => self.activate(false),
            KeyCode::Left | KeyCode::Char('h') => self.collapse(),
            KeyCode::Char('e') => self.start_edit(),
            KeyCode::Char('r') | KeyCode::F(5) => self.manual_refresh(),
            KeyCode::Char('a') => self.toggle_auto_refresh(),
            KeyCode::Char('f') => self.toggle_fallbacks(),
            KeyCode::Char('o') => {
                self.mode = InputMode::Opening;
                self.input.clear();
            }
            _ => {}
        }
    }

    /// Expand a group, or edit a key. `toggle` collapses expanded groups.
    fn activate(&mut self, toggle: bool) {
        let Some(path) = self.selected_path() else {
            return;
        };
        let Some(node) = self.tree.tree().find(&path) else {
            return;
        };
        match (node.kind, node.expanded) {
            (NodeKind::Group, false) => {
                self.tree.tree_mut().set_expanded(&path, true);
                self.restore_selection(Some(path));
            }
            (NodeKind::Group, true) if toggle => {
                self.tree.tree_mut().set_expanded(&path, false);
                self.restore_selection(Some(path));
            }
            (NodeKind::Group, true) => {
                self.cursor.move_down();
                self.ensure_cursor_visible();
            }
            (NodeKind::Key, _) => self.start_edit(),
        }
    }

    /// Collapse the selected group, or move to the parent row.
    fn collapse(&mut self) {
        let Some(mut path) = self.selected_path() else {
            return;
        };
        let expanded = self.tree.tree().find(&path).is_some_and(|n| n.expanded);
        if expanded {
            self.tree.tree_mut().set_expanded(&path, false);
        } else {
            path.pop();
        }
        self.restore_selection(Some(path));
    }

    fn start_edit(&mut self) {
        let Some(path) = self.selected_path() else {
            return;
        };
        match self.tree.begin_edit(&path) {
            Ok(value) => {
                self.input = value.display_text();
                self.mode = InputMode::Editing;
                self.info(format!(
                    "Editing {} ({})",
                    SettingsTree::key_path(&path),
                    value.type_name()
                ));
            }
            Err(e) => self.error(e.to_string()),
        }
    }

    fn on_edit_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.commit_edit(),
            KeyCode::Esc => {
                self.tree.cancel_edit();
                self.mode = InputMode::Normal;
                self.input.clear();
                self.info("Edit cancelled");
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    fn commit_edit(&mut self) {
        let selected = self.selected_path();
        let text = std::mem::take(&mut self.input);
        match self.tree.commit_edit(&text) {
            Ok(value) => {
                self.mode = InputMode::Normal;
                self.restore_selection(selected);
                self.info(format!("Set to {value}"));
            }
            Err(e @ SettingsError::InvalidInput { .. }) => {
                self.input = text;
                self.error(e.to_string());
            }
            Err(e) => {
                self.mode = InputMode::Normal;
                self.error(e.to_string());
            }
        }
    }

    fn on_open_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let path = std::mem::take(&mut self.input);
                self.mode = InputMode::Normal;
                self.open(path.trim());
            }
            KeyCode::Esc => {
                self.mode = InputMode::Normal;
                self.input.clear();
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) => self.input.push(c),
            _ => {}
        }
    }

    /// Replace the attached store with the settings file at `path`.
    pub fn open(&mut self, path: &str) {
        if path.is_empty() {
            return;
        }
        match FileStore::open(path) {
            Ok(store) => {
                self.sync_store();
                let fallbacks = self.tree.fallbacks_enabled();
                let settings = handle(store);
                settings.borrow_mut().set_fallbacks_enabled(fallbacks);
                self.tree.set_settings_object(Some(settings));
                self.cursor = Cursor::default();
                self.scroll_offset = 0;
                self.restore_selection(None);
                info!("opened {path}");
                self.info(format!("Opened {path}"));
            }
            Err(e) => self.error(format!("{path}: {e}")),
        }
    }

    fn manual_refresh(&mut self) {
        let selected = self.selected_path();
        let outcome = self.tree.handle(RefreshEvent::ManualRefresh);
        if let RefreshOutcome::Refreshed(stats) = &outcome {
            let text = describe(stats);
            self.info(text);
        } else if outcome == RefreshOutcome::Skipped(SkipReason::Detached) {
            self.error("No settings opened");
        }
        self.after_refresh(outcome, selected);
    }

    fn toggle_auto_refresh(&mut self) {
        let selected = self.selected_path();
        let enabled = !self.tree.auto_refresh();
        self.tree.set_auto_refresh(enabled);
        self.restore_selection(selected);
        self.info(if enabled {
            "Auto refresh on"
        } else {
            "Auto refresh off"
        });
    }

    fn toggle_fallbacks(&mut self) {
        if self.tree.settings().is_none() {
            return;
        }
        let selected = self.selected_path();
        let enabled = !self.tree.fallbacks_enabled();
        self.tree.set_fallbacks_enabled(enabled);
        self.restore_selection(selected);
        self.info(if enabled {
            "Fallbacks on"
        } else {
            "Fallbacks off"
        });
    }

    /// Flush pending writes of the attached store.
    pub fn sync_store(&mut self) {
        if let Some(settings) = self.tree.settings() {
            let mut store = settings.borrow_mut();
            if let Err(e) = store.sync() {
                error!("failed to save {}: {e}", store.location());
            }
        }
    }
}

fn describe(stats: &SyncStats) -> String {
    if stats.is_unchanged() {
        return "Refreshed, no changes".to_string();
    }
    format!(
        "Refreshed: {} added, {} removed, {} changed",
        stats.created, stats.removed, stats.updated
    )
}

// Keyboard shortcuts for layout history
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyChord {
    pub key: String,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl KeyChord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn meta(mut self) -> Self {
        self.meta = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Ctrl on most platforms, Cmd on macOS; either counts
    fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

impl HistoryAction {
    /// Primary+Z undoes, Primary+Shift+Z and Primary+Y redo
    pub fn from_chord(chord: &KeyChord) -> Option<Self> {
        if !chord.primary() || chord.alt {
            return None;
        }
        match chord.key.to_ascii_lowercase().as_str() {
            "z" if chord.shift => Some(HistoryAction::Redo),
            "z" => Some(HistoryAction::Undo),
            "y" if !chord.shift => Some(HistoryAction::Redo),
            _ => None,
        }
    }
}

//! Keyboard shortcut mapping. Pure: the console component feeds in the
//! key, modifier state, and whether a text input has focus.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    FitView,
    AutoLayout,
    ToggleGrid,
    ToggleMinimap,
    ToggleFollow,
    ClearSelection,
    DeleteSelection,
    SelectAll,
    DeselectAll,
    Undo,
    Redo,
}

/// Resolve a key press to a console action. Single-letter shortcuts and
/// the spacebar are suppressed while typing in an input; Escape is not,
/// so it always clears selection/highlight.
pub fn shortcut_for(key: &str, ctrl: bool, shift: bool, in_input: bool) -> Option<Shortcut> {
    if key == "Escape" {
        return Some(Shortcut::ClearSelection);
    }
    if in_input {
        return None;
    }

    if ctrl {
        return match (key, shift) {
            ("a", false) | ("A", false) => Some(Shortcut::SelectAll),
            ("a", true) | ("A", true) => Some(Shortcut::DeselectAll),
            ("z", false) => Some(Shortcut::Undo),
            ("z", true) | ("Z", true) => Some(Shortcut::Redo),
            ("y", _) => Some(Shortcut::Redo),
            _ => None,
        };
    }

    match key {
        " " => Some(Shortcut::ToggleFollow),
        "f" => Some(Shortcut::FitView),
        "l" => Some(Shortcut::AutoLayout),
        "g" => Some(Shortcut::ToggleGrid),
        "m" => Some(Shortcut::ToggleMinimap),
        "Delete" | "Backspace" => Some(Shortcut::DeleteSelection),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacebar_toggles_follow_outside_inputs_only() {
        assert_eq!(
            shortcut_for(" ", false, false, false),
            Some(Shortcut::ToggleFollow)
        );
        assert_eq!(shortcut_for(" ", false, false, true), None);
    }

    #[test]
    fn escape_clears_even_while_typing() {
        assert_eq!(
            shortcut_for("Escape", false, false, true),
            Some(Shortcut::ClearSelection)
        );
    }

    #[test]
    fn undo_redo_chords() {
        assert_eq!(shortcut_for("z", true, false, false), Some(Shortcut::Undo));
        assert_eq!(shortcut_for("Z", true, true, false), Some(Shortcut::Redo));
        assert_eq!(shortcut_for("y", true, false, false), Some(Shortcut::Redo));
    }

    #[test]
    fn select_all_and_deselect_all() {
        assert_eq!(
            shortcut_for("a", true, false, false),
            Some(Shortcut::SelectAll)
        );
        assert_eq!(
            shortcut_for("A", true, true, false),
            Some(Shortcut::DeselectAll)
        );
    }

    #[test]
    fn plain_letters_do_nothing_in_inputs() {
        assert_eq!(shortcut_for("f", false, false, true), None);
        assert_eq!(shortcut_for("Delete", false, false, true), None);
    }
}

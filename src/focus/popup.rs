/// Payload captured when a rewind needs confirmation: which history entry is
/// being re-answered, with what, and where that leads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingRewind {
    pub index: usize,
    pub option_text: String,
    pub target: String,
}

/// Lifecycle state for the two modal overlays (`Hidden -> Shown -> Hidden`).
///
/// Visibility changes are pushed to the focus machine as explicit calls by
/// the owner; nothing infers modal state from how the overlay happens to be
/// drawn.
#[derive(Debug, Default)]
pub struct PopupCoordinator {
    confirm: Option<PendingRewind>,
    warning: bool,
}

impl PopupCoordinator {
    pub fn show_confirm(&mut self, pending: PendingRewind) {
        self.confirm = Some(pending);
    }

    pub fn confirm_visible(&self) -> bool {
        self.confirm.is_some()
    }

    /// Confirm path: hand the payload to the flow mutation and hide.
    pub fn take_confirm(&mut self) -> Option<PendingRewind> {
        self.confirm.take()
    }

    /// Decline path: the payload is discarded, nothing else happens.
    pub fn cancel_confirm(&mut self) {
        self.confirm = None;
    }

    pub fn show_warning(&mut self) {
        self.warning = true;
    }

    pub fn warning_visible(&self) -> bool {
        self.warning
    }

    /// The warning is purely informative; acknowledging never mutates
    /// history.
    pub fn acknowledge_warning(&mut self) {
        self.warning = false;
    }

    pub fn any_visible(&self) -> bool {
        self.confirm.is_some() || self.warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> PendingRewind {
        PendingRewind {
            index: 0,
            option_text: "No".to_string(),
            target: "3".to_string(),
        }
    }

    #[test]
    fn test_confirm_lifecycle() {
        let mut popups = PopupCoordinator::default();
        assert!(!popups.any_visible());

        popups.show_confirm(pending());
        assert!(popups.confirm_visible());

        let taken = popups.take_confirm().unwrap();
        assert_eq!(taken, pending());
        assert!(!popups.confirm_visible());
        assert!(popups.take_confirm().is_none());
    }

    #[test]
    fn test_decline_discards_payload() {
        let mut popups = PopupCoordinator::default();
        popups.show_confirm(pending());
        popups.cancel_confirm();
        assert!(!popups.any_visible());
        assert!(popups.take_confirm().is_none());
    }

    #[test]
    fn test_warning_lifecycle() {
        let mut popups = PopupCoordinator::default();
        popups.show_warning();
        assert!(popups.warning_visible());
        popups.acknowledge_warning();
        assert!(!popups.any_visible());
    }
}

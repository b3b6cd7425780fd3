//! Pending-action dispatch: which destructive or configuring action is
//! awaiting confirmation, and the parameters needed to run or drop it.
//! Injectable state, one per UI surface; never a process-wide global.

/// The action a confirmation dialog is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    DeleteMessage,
    EditMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub kind: ActionKind,
    pub message_id: String,
    /// Endpoint the confirmation will hit, captured at dispatch time.
    pub endpoint: String,
}

/// `Idle` (pending == None) or `Pending` with exactly one action. A new
/// dispatch while pending replaces the old action, implicitly cancelling it.
#[derive(Debug, Default)]
pub struct ActionDispatch {
    pending: Option<PendingAction>,
}

impl ActionDispatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending(&self) -> Option<&PendingAction> {
        self.pending.as_ref()
    }

    /// Request confirmation for an action, replacing any prior pending one.
    pub fn open(&mut self, action: PendingAction) {
        self.pending = Some(action);
    }

    /// Drop the pending action without side effects.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Hand the pending action to the caller for execution and return to
    /// idle immediately, so a failed execution can never leave the dispatch
    /// stuck pending. Returns `None` when nothing was pending.
    pub fn confirm(&mut self) -> Option<PendingAction> {
        self.pending.take()
    }
}

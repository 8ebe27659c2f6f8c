use super::domain::{ApplicationState, ApplicationStatus};

use ApplicationState::*;

/// States reachable in one step from `from`.
pub const fn allowed_targets(from: ApplicationState) -> &'static [ApplicationState] {
    match from {
        Initiated => &[Submitted],
        Submitted => &[UnderReview, Denied],
        UnderReview => &[Approved, Conditional, Denied],
        Conditional => &[Approved, Denied, UnderReview],
        Approved => &[Funded],
        Funded => &[Active],
        Active => &[Closed],
        Denied | Closed => &[],
    }
}

pub fn can_transition(from: ApplicationState, to: ApplicationState) -> bool {
    allowed_targets(from).contains(&to)
}

/// Status an application carries while sitting in `state`, ignoring history.
pub const fn status_for(state: ApplicationState) -> ApplicationStatus {
    match state {
        Initiated => ApplicationStatus::Draft,
        Submitted => ApplicationStatus::Submitted,
        UnderReview | Conditional => ApplicationStatus::UnderReview,
        Approved => ApplicationStatus::Approved,
        Denied => ApplicationStatus::Denied,
        Funded => ApplicationStatus::Funded,
        Active => ApplicationStatus::Active,
        Closed => ApplicationStatus::Closed,
    }
}

/// Status after entering `to`. Outcome states always set their own status; in-progress states
/// only roll the status up when the current one is not already settled.
pub fn derive_status(current: ApplicationStatus, to: ApplicationState) -> ApplicationStatus {
    let target = status_for(to);
    if target.is_settled() || !current.is_settled() {
        target
    } else {
        current
    }
}

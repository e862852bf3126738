// src/session/gate.rs

use crate::session::store::Session;

/// What a screen demands before it may be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteRequirement {
    Public,
    RequiresAuth,
    RequiresAuthAndPlacement,
}

/// Gate verdict for an ordinary route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectLogin,
    RedirectPlacement,
}

/// Pure gating decision, evaluated on every navigation. No state is read
/// beyond the session snapshot and nothing is mutated, so calling it twice
/// with the same inputs always yields the same verdict.
pub fn decide(session: &Session, requirement: RouteRequirement) -> Decision {
    match requirement {
        RouteRequirement::Public => Decision::Allow,
        RouteRequirement::RequiresAuth | RouteRequirement::RequiresAuthAndPlacement => {
            if !session.is_authenticated() {
                return Decision::RedirectLogin;
            }
            if requirement == RouteRequirement::RequiresAuthAndPlacement && !session.is_placed() {
                return Decision::RedirectPlacement;
            }
            Decision::Allow
        }
    }
}

/// Verdict for the placement-quiz route itself. An already-placed user is
/// not silently let in or blocked: the caller shows a notice and redirects
/// to the authenticated home.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementEntryDecision {
    Allow,
    RedirectLogin,
    AlreadyPlaced,
}

pub fn decide_placement_entry(session: &Session) -> PlacementEntryDecision {
    if !session.is_authenticated() {
        return PlacementEntryDecision::RedirectLogin;
    }
    if session.is_placed() {
        return PlacementEntryDecision::AlreadyPlaced;
    }
    PlacementEntryDecision::Allow
}

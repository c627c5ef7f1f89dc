//! Identity context: who is using the app right now.
//!
//! Holds the current user (or nothing, for a guest) and the one-time guest
//! allowance flag. This is pure state with a single writer -- the pipeline.
//! Persisting each mutation through `UserRepository` is the pipeline's job,
//! keeping this type trivially testable.

use sor_types::identity::{Plan, User};

/// Current identity and guest-allowance state.
#[derive(Debug, Default)]
pub struct IdentityContext {
    user: Option<User>,
    guest_used: bool,
}

impl IdentityContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The signed-in user, if any.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether the one-time guest allowance has been consumed.
    pub fn guest_used(&self) -> bool {
        self.guest_used
    }

    /// Replace the current user (None means logged out / guest).
    pub fn set_user(&mut self, user: Option<User>) {
        self.user = user;
    }

    /// Overwrite the guest flag from durable storage (startup and logout).
    pub fn set_guest_used(&mut self, guest_used: bool) {
        self.guest_used = guest_used;
    }

    /// Deduct `amount` points from the current user's balance.
    ///
    /// No-op for the unlimited plan and when no user is set. Callers must
    /// pre-check affordability through the quota gate; the decrement
    /// saturates rather than underflowing.
    pub fn charge(&mut self, amount: u32) {
        if let Some(user) = self.user.as_mut() {
            if user.plan != Plan::Unlimited {
                user.points = user.points.saturating_sub(amount);
            }
        }
    }

    /// Record that the guest allowance has been consumed. Idempotent.
    pub fn mark_guest_used(&mut self) {
        self.guest_used = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(plan: Plan, points: u32) -> User {
        let mut user = User::new("amira".to_string(), None, points);
        user.plan = plan;
        user
    }

    #[test]
    fn test_charge_unlimited_never_changes_balance() {
        let mut ctx = IdentityContext::new();
        ctx.set_user(Some(user_with(Plan::Unlimited, 42)));

        for amount in [0, 1, 20, 1_000_000] {
            ctx.charge(amount);
            assert_eq!(ctx.user().unwrap().points, 42);
        }
    }

    #[test]
    fn test_charge_metered_subtracts_exactly() {
        let mut ctx = IdentityContext::new();
        ctx.set_user(Some(user_with(Plan::Advanced, 50)));

        ctx.charge(10);
        assert_eq!(ctx.user().unwrap().points, 40);
        ctx.charge(5);
        assert_eq!(ctx.user().unwrap().points, 35);
    }

    #[test]
    fn test_charge_saturates_at_zero() {
        let mut ctx = IdentityContext::new();
        ctx.set_user(Some(user_with(Plan::Basic, 3)));

        ctx.charge(5);
        assert_eq!(ctx.user().unwrap().points, 0);
    }

    #[test]
    fn test_charge_without_user_is_noop() {
        let mut ctx = IdentityContext::new();
        ctx.charge(20);
        assert!(ctx.user().is_none());
    }

    #[test]
    fn test_mark_guest_used_idempotent() {
        let mut ctx = IdentityContext::new();
        assert!(!ctx.guest_used());

        ctx.mark_guest_used();
        assert!(ctx.guest_used());
        ctx.mark_guest_used();
        assert!(ctx.guest_used());
    }

    #[test]
    fn test_set_user_replaces() {
        let mut ctx = IdentityContext::new();
        ctx.set_user(Some(user_with(Plan::Free, 10)));
        assert!(ctx.user().is_some());

        ctx.set_user(None);
        assert!(ctx.user().is_none());
    }
}

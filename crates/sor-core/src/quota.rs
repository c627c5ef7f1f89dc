//! Quota gate: the single authority on whether a send is allowed and what
//! it costs.
//!
//! `evaluate` is a pure function of the caller's identity, the requested
//! mode, the attachment flag, and the persisted guest flag. It runs before
//! any conversation or message is created, so a denial never leaves state
//! behind.

use sor_types::chat::ChatMode;
use sor_types::identity::{Plan, User};

/// Point cost of an image-mode turn.
pub const IMAGE_COST: u32 = 20;

/// Point cost of a text turn carrying an attachment.
pub const ATTACHMENT_COST: u32 = 10;

/// Point cost of a plain text turn.
pub const TEXT_COST: u32 = 5;

/// Outcome of a gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    /// The send may proceed. `cost` is what settlement will charge;
    /// guests and unlimited users are never actually debited.
    Allow { cost: u32 },

    /// The caller must sign in (guest allowance exhausted, or an
    /// anonymous image request).
    RequireAuth,

    /// The caller's balance cannot cover the cost; prompt an upgrade.
    RequireUpgrade,
}

/// Point cost of a turn, before any plan exemption.
pub fn cost_of(mode: ChatMode, has_attachment: bool) -> u32 {
    if mode == ChatMode::Image {
        IMAGE_COST
    } else if has_attachment {
        ATTACHMENT_COST
    } else {
        TEXT_COST
    }
}

/// Decide whether a send attempt is permitted and at what cost.
pub fn evaluate(
    user: Option<&User>,
    mode: ChatMode,
    has_attachment: bool,
    guest_used: bool,
) -> QuotaDecision {
    let cost = cost_of(mode, has_attachment);

    let Some(user) = user else {
        // Image generation is never available anonymously, even on a
        // fresh guest allowance.
        if mode == ChatMode::Image {
            return QuotaDecision::RequireAuth;
        }
        if guest_used {
            return QuotaDecision::RequireAuth;
        }
        return QuotaDecision::Allow { cost };
    };

    if user.plan == Plan::Unlimited {
        return QuotaDecision::Allow { cost };
    }

    if user.points >= cost {
        QuotaDecision::Allow { cost }
    } else {
        QuotaDecision::RequireUpgrade
    }
}

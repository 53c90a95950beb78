//! Win patterns and pure claim validation.
//!
//! Validation is a pure function of the ticket, the drawn set, and the
//! pattern; it holds no state and takes no locks. Whether a claim actually
//! wins is decided by the coordinator, which evaluates this predicate inside
//! the session's critical section.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::ticket::Ticket;

/// Numbers that must be marked for an early-five claim.
pub const EARLY_FIVE_COUNT: usize = 5;

/// The closed set of recognized win patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClaimPattern {
    /// Any five of the ticket's numbers drawn.
    EarlyFive,
    /// Every number in the top row drawn.
    TopLine,
    /// Every number in the middle row drawn.
    MiddleLine,
    /// Every number in the bottom row drawn.
    BottomLine,
    /// Every number on the ticket drawn.
    FullHouse,
}

impl ClaimPattern {
    /// All patterns, in resolution-display order.
    pub const ALL: [ClaimPattern; 5] = [
        ClaimPattern::EarlyFive,
        ClaimPattern::TopLine,
        ClaimPattern::MiddleLine,
        ClaimPattern::BottomLine,
        ClaimPattern::FullHouse,
    ];

    /// Whether this pattern is currently satisfied by `ticket` given the
    /// numbers drawn so far.
    ///
    /// Assumes the ticket came from the generator (row layout already
    /// enforced there); no layout re-checking happens here.
    pub fn is_satisfied(self, ticket: &Ticket, drawn: &HashSet<u8>) -> bool {
        match self {
            ClaimPattern::EarlyFive => {
                ticket.numbers().filter(|n| drawn.contains(n)).count() >= EARLY_FIVE_COUNT
            },
            ClaimPattern::TopLine => row_complete(ticket, 0, drawn),
            ClaimPattern::MiddleLine => row_complete(ticket, 1, drawn),
            ClaimPattern::BottomLine => row_complete(ticket, 2, drawn),
            ClaimPattern::FullHouse => ticket.numbers().all(|n| drawn.contains(&n)),
        }
    }
}

fn row_complete(ticket: &Ticket, row: usize, drawn: &HashSet<u8>) -> bool {
    ticket.row_numbers(row).all(|n| drawn.contains(&n))
}

impl fmt::Display for ClaimPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClaimPattern::EarlyFive => "early-five",
            ClaimPattern::TopLine => "top-line",
            ClaimPattern::MiddleLine => "middle-line",
            ClaimPattern::BottomLine => "bottom-line",
            ClaimPattern::FullHouse => "full-house",
        };
        f.write_str(name)
    }
}

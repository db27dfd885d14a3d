//! Fruit lifecycle modes and their physics/rendering attributes.
//!
//! Each mode fixes four things at once: the collision category the fruit
//! advertises, the category mask it collides with, whether its sprites are
//! visible, and whether its body is simulated dynamically or driven
//! kinematically. Keeping these in one exhaustively-matched table is what
//! makes the lifecycle safe to change from asynchronous collision callbacks.

use crate::core::physics::Kinematics;
use crate::stage::Visibility;

/// Collision category bits. The physics layer and every external collision
/// handler share this contract.
pub mod categories {
    /// Container boundaries. Every mode's mask includes this bit.
    pub const WALLS: u32 = 1 << 0;
    /// The "too full" boundary line near the top of the container.
    pub const MAXLINE: u32 = 1 << 1;
    /// Pending fruit, staged above the container.
    pub const FRUIT_WAIT: u32 = 1 << 2;
    /// Freshly dropped fruit that has not yet touched anything.
    pub const FRUIT_DROP: u32 = 1 << 3;
    /// Settled fruit participating in normal play.
    pub const FRUIT: u32 = 1 << 4;
    /// Fruit converging toward a merge destination.
    pub const FRUIT_MERGE: u32 = 1 << 5;
    /// Terminal state; resources released.
    pub const FRUIT_REMOVED: u32 = 1 << 6;
}

/// Collision-type tag carried by a fruit while in `FirstDrop`.
///
/// Two simultaneously falling fruits of the same kind must not merge with
/// each other before settling; tagging them with a value outside the kind
/// range keeps the external equal-tag merge detection from pairing them.
pub const FIRST_DROP_TAG: u32 = 0xFD;

/// Collision-type tag carried by the max-line boundary sensor, so its
/// contacts can be told apart from ordinary wall contacts.
pub const MAX_LINE_TAG: u32 = 0xFE;

/// Lifecycle state of a fruit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Staged as the pending "next" fruit, not yet part of the active set.
    Wait,
    /// Falling after a drop, ignoring other first-drop fruit.
    FirstDrop,
    /// Settled, fully simulated, merge-eligible.
    Normal,
    /// Grabbed by the cursor; kinematic and directly steerable.
    Drag,
    /// Converging toward a merge destination or exploding; fruit-fruit
    /// collisions disabled.
    Merge,
    /// Terminal. All owned resources have been released.
    Removed,
}

/// Fixed per-mode attribute record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeAttributes {
    pub category: u32,
    /// Categories this mode collides with. `WALLS` is added unconditionally
    /// when the filter is applied, so it is omitted here.
    pub mask: u32,
    pub visibility: Visibility,
    pub kinematics: Kinematics,
}

impl Mode {
    pub fn attributes(self) -> ModeAttributes {
        use categories::*;
        match self {
            Mode::Wait => ModeAttributes {
                category: FRUIT_WAIT,
                mask: 0,
                visibility: Visibility::Normal,
                kinematics: Kinematics::Kinematic,
            },
            Mode::FirstDrop => ModeAttributes {
                // Collides with settled fruit and walls, but not with the
                // max line or other first-drop fruit.
                category: FRUIT_DROP,
                mask: FRUIT,
                visibility: Visibility::Normal,
                kinematics: Kinematics::Kinematic,
            },
            Mode::Normal => ModeAttributes {
                category: FRUIT,
                mask: FRUIT_DROP | FRUIT | MAXLINE,
                visibility: Visibility::Normal,
                kinematics: Kinematics::Dynamic,
            },
            Mode::Drag => ModeAttributes {
                category: FRUIT,
                mask: FRUIT_DROP | FRUIT | MAXLINE,
                visibility: Visibility::Normal,
                kinematics: Kinematics::Kinematic,
            },
            Mode::Merge => ModeAttributes {
                category: FRUIT_MERGE,
                mask: 0,
                visibility: Visibility::Normal,
                kinematics: Kinematics::Kinematic,
            },
            Mode::Removed => ModeAttributes {
                category: FRUIT_REMOVED,
                mask: 0,
                visibility: Visibility::Hidden,
                kinematics: Kinematics::Kinematic,
            },
        }
    }

    /// Advisory transition table. Violations are logged, not fatal.
    pub fn allowed_transitions(self) -> &'static [Mode] {
        match self {
            Mode::Wait => &[Mode::FirstDrop, Mode::Normal, Mode::Removed],
            Mode::FirstDrop => &[Mode::Normal, Mode::Merge, Mode::Removed],
            Mode::Normal => &[Mode::Merge, Mode::Drag, Mode::Removed],
            Mode::Drag => &[Mode::Normal, Mode::Merge, Mode::Removed],
            Mode::Merge => &[Mode::Removed],
            Mode::Removed => &[Mode::Removed],
        }
    }

    pub fn can_transition_to(self, next: Mode) -> bool {
        self.allowed_transitions().contains(&next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [Mode; 6] = [
        Mode::Wait,
        Mode::FirstDrop,
        Mode::Normal,
        Mode::Drag,
        Mode::Merge,
        Mode::Removed,
    ];

    #[test]
    fn categories_are_distinct_bits() {
        use categories::*;
        let bits = [WALLS, MAXLINE, FRUIT_WAIT, FRUIT_DROP, FRUIT, FRUIT_MERGE, FRUIT_REMOVED];
        let mut seen = 0u32;
        for b in bits {
            assert_eq!(b.count_ones(), 1);
            assert_eq!(seen & b, 0, "category bit {:#x} reused", b);
            seen |= b;
        }
    }

    #[test]
    fn only_normal_is_dynamic() {
        for mode in ALL_MODES {
            let attrs = mode.attributes();
            if mode == Mode::Normal {
                assert_eq!(attrs.kinematics, Kinematics::Dynamic);
            } else {
                assert_eq!(attrs.kinematics, Kinematics::Kinematic);
            }
        }
    }

    #[test]
    fn only_removed_is_hidden() {
        for mode in ALL_MODES {
            let expected = if mode == Mode::Removed {
                Visibility::Hidden
            } else {
                Visibility::Normal
            };
            assert_eq!(mode.attributes().visibility, expected);
        }
    }

    #[test]
    fn removed_is_absorbing() {
        assert_eq!(Mode::Removed.allowed_transitions(), &[Mode::Removed]);
        for mode in ALL_MODES {
            assert!(mode.can_transition_to(Mode::Removed));
        }
    }

    #[test]
    fn normal_and_drag_form_a_cycle() {
        assert!(Mode::Normal.can_transition_to(Mode::Drag));
        assert!(Mode::Drag.can_transition_to(Mode::Normal));
    }

    #[test]
    fn first_drop_does_not_collide_with_first_drop() {
        let attrs = Mode::FirstDrop.attributes();
        assert_eq!(attrs.mask & categories::FRUIT_DROP, 0);
        assert_ne!(attrs.mask & categories::FRUIT, 0);
    }
}

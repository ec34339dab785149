/// The fixed pose catalog
///
/// Poses are identified by their index into this ordered table. The
/// instruction text doubles as the provider prompt fragment and as the
/// label in the pose controls.

/// Every pose the studio can request, in display order.
pub const INSTRUCTIONS: [&str; 5] = [
    "Full frontal view, hands on hips",
    "Slightly turned, 3/4 view",
    "Side profile view",
    "Walking towards camera",
    "Leaning against a wall",
];

/// Number of catalog entries.
pub const COUNT: usize = INSTRUCTIONS.len();

/// The pose every fresh layer starts on.
pub const FIRST: usize = 0;

/// Instruction text for a pose index. Panics on an out-of-range index,
/// which the transition layer never produces.
pub fn instruction(index: usize) -> &'static str {
    INSTRUCTIONS[index]
}

/// The next pose in catalog order, wrapping at the end.
pub fn next(index: usize) -> usize {
    (index + 1) % COUNT
}

/// The previous pose in catalog order, wrapping at the start.
pub fn previous(index: usize) -> usize {
    (index + COUNT - 1) % COUNT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_wraps_both_ways() {
        assert_eq!(next(COUNT - 1), 0);
        assert_eq!(previous(0), COUNT - 1);
        assert_eq!(previous(next(2)), 2);
    }
}

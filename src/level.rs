use serde::Serialize;

/// Level derived from total experience points, plus progress within it.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelInfo {
    pub level: u32,
    /// XP accumulated inside the current level.
    pub current_xp: u64,
    /// XP needed to finish the current level.
    pub xp_for_next_level: u64,
    /// 0–100, clamped.
    pub progress_to_next_level: f64,
}

/// Cosmetic label bucket for a level range.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankInfo {
    pub label: &'static str,
    pub min_level: u32,
    /// `None` means unbounded (final tier).
    pub max_level: Option<u32>,
}

const XP_BASE: f64 = 100.0;
const XP_GROWTH: f64 = 1.5;

/// Ordered, contiguous, non-overlapping. The last tier is unbounded above.
const RANK_TIERS: &[(&str, u32, Option<u32>)] = &[
    ("Novice", 1, Some(4)),
    ("Apprentice", 5, Some(9)),
    ("Adept", 10, Some(14)),
    ("Expert", 15, Some(19)),
    ("Master", 20, Some(24)),
    ("Grandmaster", 25, None),
];

/// XP required to go from `level - 1` to `level`.
///
/// Level 1 is free; from level 2 on the cost grows geometrically
/// (`floor(100 * 1.5^(level-2))`), so every level costs strictly more than
/// the one before it.
pub fn xp_required_for_level(level: u32) -> u64 {
    if level <= 1 {
        return 0;
    }
    (XP_BASE * XP_GROWTH.powi(level as i32 - 2)).floor() as u64
}

/// Resolve total XP to a level and in-level progress.
///
/// Walks levels upward accumulating per-level requirements and stops at the
/// greatest level whose cumulative requirement does not exceed `total_xp`.
/// Terminates for any finite input because the per-level cost is strictly
/// positive and increasing from level 2 onward.
pub fn level_from_total_xp(total_xp: u64) -> LevelInfo {
    let mut level: u32 = 1;
    let mut spent: u64 = 0;

    loop {
        let next_cost = xp_required_for_level(level + 1);
        // An overflowing cumulative requirement already exceeds any u64
        // total, so the walk stops here too.
        let exceeded = match spent.checked_add(next_cost) {
            Some(cumulative) => cumulative > total_xp,
            None => true,
        };
        if exceeded {
            let current_xp = total_xp - spent;
            let progress = (current_xp as f64 / next_cost as f64 * 100.0).clamp(0.0, 100.0);
            return LevelInfo {
                level,
                current_xp,
                xp_for_next_level: next_cost,
                progress_to_next_level: progress,
            };
        }
        spent += next_cost;
        level += 1;
    }
}

/// Map a level to its rank tier (first matching inclusive range).
pub fn rank_from_level(level: u32) -> RankInfo {
    for &(label, min, max) in RANK_TIERS {
        let upper_ok = match max {
            Some(m) => level <= m,
            None => true,
        };
        if level >= min && upper_ok {
            return RankInfo {
                label,
                min_level: min,
                max_level: max,
            };
        }
    }
    // Only reachable for level 0, which the engine never produces (levels
    // start at 1); the floor tier is the sane answer for it anyway.
    let (label, min, max) = RANK_TIERS[0];
    RankInfo {
        label,
        min_level: min,
        max_level: max,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cumulative(level: u32) -> u64 {
        (1..=level).map(xp_required_for_level).sum()
    }

    #[test]
    fn test_level_one_is_free() {
        assert_eq!(xp_required_for_level(1), 0);
        let info = level_from_total_xp(0);
        assert_eq!(info.level, 1);
        assert_eq!(info.current_xp, 0);
        assert_eq!(info.progress_to_next_level, 0.0);
    }

    #[test]
    fn test_per_level_cost_strictly_increasing() {
        for level in 2..40 {
            assert!(
                xp_required_for_level(level + 1) > xp_required_for_level(level),
                "cost must grow at level {level}"
            );
        }
    }

    #[test]
    fn test_known_costs() {
        assert_eq!(xp_required_for_level(2), 100);
        assert_eq!(xp_required_for_level(3), 150);
        assert_eq!(xp_required_for_level(4), 225);
        assert_eq!(xp_required_for_level(5), 337);
    }

    #[test]
    fn test_threshold_exactness() {
        // Landing exactly on a cumulative boundary yields that level with
        // zero in-level XP, not the level below or above.
        for level in 1..=30 {
            let info = level_from_total_xp(cumulative(level));
            assert_eq!(info.level, level, "boundary for level {level}");
            assert_eq!(info.current_xp, 0);
            assert_eq!(info.progress_to_next_level, 0.0);
        }
    }

    #[test]
    fn test_one_below_threshold() {
        for level in 2..=30 {
            let info = level_from_total_xp(cumulative(level) - 1);
            assert_eq!(info.level, level - 1);
        }
    }

    #[test]
    fn test_monotonic_in_total_xp() {
        let mut prev = 0;
        for xp in (0..20_000).step_by(37) {
            let level = level_from_total_xp(xp).level;
            assert!(level >= prev, "level dropped at xp={xp}");
            prev = level;
        }
    }

    #[test]
    fn test_progress_bounds() {
        for xp in (0..20_000).step_by(113) {
            let p = level_from_total_xp(xp).progress_to_next_level;
            assert!((0.0..=100.0).contains(&p), "progress {p} out of range at xp={xp}");
        }
    }

    #[test]
    fn test_exact_level_two() {
        let info = level_from_total_xp(xp_required_for_level(2));
        assert_eq!(info.level, 2);
        assert_eq!(info.current_xp, 0);
        assert_eq!(info.xp_for_next_level, xp_required_for_level(3));
        assert_eq!(info.progress_to_next_level, 0.0);
    }

    #[test]
    fn test_midway_progress() {
        // Level 1 needs 100 XP to reach level 2; 50 XP is halfway.
        let info = level_from_total_xp(50);
        assert_eq!(info.level, 1);
        assert_eq!(info.current_xp, 50);
        assert_eq!(info.progress_to_next_level, 50.0);
    }

    #[test]
    fn test_rank_tiers_contiguous() {
        // No gap or overlap between consecutive tiers; last tier unbounded.
        assert_eq!(RANK_TIERS.first().unwrap().1, 1);
        for pair in RANK_TIERS.windows(2) {
            let (_, _, max) = pair[0];
            let (_, next_min, _) = pair[1];
            assert_eq!(max.unwrap() + 1, next_min);
        }
        assert!(RANK_TIERS.last().unwrap().2.is_none());
    }

    #[test]
    fn test_rank_lookup() {
        assert_eq!(rank_from_level(1).label, "Novice");
        assert_eq!(rank_from_level(4).label, "Novice");
        assert_eq!(rank_from_level(5).label, "Apprentice");
        assert_eq!(rank_from_level(14).label, "Adept");
        assert_eq!(rank_from_level(25).label, "Grandmaster");
        assert_eq!(rank_from_level(9999).label, "Grandmaster");
    }
}

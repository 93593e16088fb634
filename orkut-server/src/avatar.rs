/// Background colors for the letter avatar shown when a user has no photo
const PALETTE: &[&str] = &[
    "#e91e63", "#9c27b0", "#3f51b5", "#2196f3", "#009688", "#4caf50", "#ff9800", "#795548",
];

/// Stable color for a username; case does not matter
pub fn avatar_color(username: &str) -> &'static str {
    let hash = username
        .to_lowercase()
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    PALETTE[(hash as usize) % PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_stable_and_case_insensitive() {
        assert_eq!(avatar_color("ana"), avatar_color("ana"));
        assert_eq!(avatar_color("Ana"), avatar_color("ANA"));
        assert!(PALETTE.contains(&avatar_color("")));
    }
}

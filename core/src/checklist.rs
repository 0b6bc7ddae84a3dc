use ossmate_state::ChecklistStats;

/// Counts markdown task-list boxes (`- [x]`, `- [X]`, `- [ ]`) in a PR
/// description. `*` bullets are accepted as well.
pub fn analyze_checklist(body: &str) -> ChecklistStats {
    let mut stats = ChecklistStats::default();
    for line in body.lines() {
        let line = line.trim_start();
        let Some(rest) = line
            .strip_prefix("- ")
            .or_else(|| line.strip_prefix("* "))
        else {
            continue;
        };
        let rest = rest.trim_start();
        if rest.starts_with("[x]") || rest.starts_with("[X]") {
            stats.checked += 1;
            stats.total += 1;
        } else if rest.starts_with("[ ]") {
            stats.total += 1;
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn counts_checked_and_unchecked_boxes() {
        let body = "## Checklist\n- [x] tests\n- [X] lint\n  - [ ] docs\n* [ ] changelog\n- plain bullet\n";
        let stats = analyze_checklist(body);
        assert_eq!(stats, ChecklistStats { checked: 2, total: 4 });
        assert!(stats.is_incomplete());
    }

    #[test]
    fn descriptions_without_boxes_are_complete() {
        let stats = analyze_checklist("Fixes the thing.\n\n- a bullet");
        assert_eq!(stats, ChecklistStats::default());
        assert!(!stats.is_incomplete());
    }
}

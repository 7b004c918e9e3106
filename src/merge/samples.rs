use std::collections::{HashMap, HashSet};

use tracing::warn;

use super::MergeError;

/// Build the output sample names, one per input, in input order.
///
/// A name seen before is refused unless `force` is set, in which case it is
/// renamed `<name>:R<k>` where `k` counts the earlier renames of that name.
pub fn build_roster<I, S>(names: I, force: bool) -> Result<Vec<String>, MergeError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut roster = Vec::new();
    let mut repeats: HashMap<String, usize> = HashMap::new();
    for name in names {
        let name = name.as_ref();
        if seen.insert(name.to_string()) {
            roster.push(name.to_string());
            continue;
        }
        if !force {
            return Err(MergeError::DuplicateSample(name.to_string()));
        }
        let repeat = repeats.entry(name.to_string()).or_default();
        let mut candidate = format!("{name}:R{repeat}");
        while seen.contains(&candidate) {
            *repeat += 1;
            candidate = format!("{name}:R{repeat}");
        }
        *repeat += 1;
        warn!(sample = name, renamed = %candidate, "duplicate sample name");
        seen.insert(candidate.clone());
        roster.push(candidate);
    }
    Ok(roster)
}

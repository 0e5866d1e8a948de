// ── Display labels and list ordering ──
//
// A list's canonical order lives in the records themselves: either in the
// label ("FOH 2" = second FOH camera) or in an explicit pair number.
// There is no separate position column.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::entity::Entity;

/// How a kind encodes list order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderingScheme {
    /// `"<CODE> <N>"` labels; each code group is numbered 1..N on its own,
    /// and groups keep the list positions they occupy.
    Grouped,
    /// `pairNumber` is 1..N over the whole list; labels are left alone.
    Sequential,
}

/// A label split into its type code and ordinal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub code: String,
    /// Text between code and ordinal (`" "` for `"FOH 2"`, empty for `"CAM2"`).
    pub separator: String,
    pub ordinal: Option<u32>,
}

impl Label {
    /// Split `"FOH 2"` into `("FOH", 2)`. Labels without a trailing number
    /// (`"Wide"`) have no ordinal and are never renumbered.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if let Some((code, number)) = trimmed.rsplit_once(char::is_whitespace) {
            if let Ok(ordinal) = number.parse::<u32>() {
                let code = code.trim_end();
                return Self {
                    code: code.to_owned(),
                    separator: " ".to_owned(),
                    ordinal: Some(ordinal),
                };
            }
        }

        let digits_start = trimmed
            .trim_end_matches(|c: char| c.is_ascii_digit())
            .len();
        if digits_start > 0 && digits_start < trimmed.len() {
            let (code, number) = trimmed.split_at(digits_start);
            if let Ok(ordinal) = number.parse::<u32>() {
                return Self {
                    code: code.to_owned(),
                    separator: String::new(),
                    ordinal: Some(ordinal),
                };
            }
        }

        Self {
            code: trimmed.to_owned(),
            separator: String::new(),
            ordinal: None,
        }
    }

    /// The same label with a different ordinal.
    pub fn with_ordinal(&self, ordinal: u32) -> String {
        format!("{}{}{ordinal}", self.code, self.separator)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ordinal {
            Some(n) => write!(f, "{}{}{n}", self.code, self.separator),
            None => f.write_str(&self.code),
        }
    }
}

// ── Arrangement ─────────────────────────────────────────────────────

/// Put `entries` into display order for `scheme`.
///
/// `Grouped`: every position keeps the code group it holds, and within a
/// group members are placed by ascending ordinal. Unnumbered entries stay
/// where they are. `Sequential`: stable sort by pair number, unnumbered last.
///
/// Both are stable and idempotent.
pub fn arrange(scheme: OrderingScheme, entries: Vec<Arc<Entity>>) -> Vec<Arc<Entity>> {
    match scheme {
        OrderingScheme::Sequential => {
            let mut entries = entries;
            entries.sort_by_key(|e| (e.pair_number.is_none(), e.pair_number));
            entries
        }
        OrderingScheme::Grouped => arrange_grouped(entries),
    }
}

fn arrange_grouped(entries: Vec<Arc<Entity>>) -> Vec<Arc<Entity>> {
    let labels: Vec<Label> = entries.iter().map(|e| e.parsed_label()).collect();

    // code -> positions it occupies, in list order
    let mut slots: HashMap<&str, Vec<usize>> = HashMap::new();
    for (pos, label) in labels.iter().enumerate() {
        if label.ordinal.is_some() {
            slots.entry(label.code.as_str()).or_default().push(pos);
        }
    }

    let mut placement: Vec<usize> = (0..entries.len()).collect();
    for positions in slots.values() {
        let mut members = positions.clone();
        members.sort_by_key(|&i| labels.get(i).and_then(|l| l.ordinal));
        for (&slot, member) in positions.iter().zip(members) {
            if let Some(p) = placement.get_mut(slot) {
                *p = member;
            }
        }
    }

    placement
        .into_iter()
        .filter_map(|i| entries.get(i).cloned())
        .collect()
}

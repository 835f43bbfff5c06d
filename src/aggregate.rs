//! Order-preserving, deduplicating aggregation of rule entries.

use ahash::AHashMap;

use crate::mode::{DomainEntry, Mode, RuleKind};

/// Mapping from (kind, normalized value) to mode, iterated in insertion order.
///
/// Domains, keywords and regular expressions are kept apart, so `google`
/// the domain and `google` the keyword are two rules. Within the domain
/// space `Include` and `IncludeExact` overwrite each other and `Exclude`
/// removes. Overwriting keeps the value's position; excluding frees it and
/// adding the value again later appends it at the end.
#[derive(Debug, Clone, Default)]
pub struct AggregateSet {
    /// Insertion-ordered slots, `None` once excluded
    slots: Vec<Option<(String, Mode)>>,
    /// (kind, value) to slot index
    index: AHashMap<(RuleKind, String), usize>,
}

impl AggregateSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one entry: insert/overwrite, or remove for exclusions.
    pub fn apply(&mut self, entry: &DomainEntry) {
        if entry.mode.is_exclusion() {
            self.remove(&entry.value);
        } else {
            self.insert(&entry.value, entry.mode);
        }
    }

    /// Apply every entry of a list in order.
    pub fn extend<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = &'a DomainEntry>,
    {
        for entry in entries {
            self.apply(entry);
        }
    }

    /// Insert a value, overwriting the mode of the same-kind value if present.
    pub fn insert(&mut self, value: &str, mode: Mode) {
        let key = (mode.kind(), value.to_string());
        if let Some(&idx) = self.index.get(&key) {
            if let Some((_, current)) = self.slots[idx].as_mut() {
                if *current != mode {
                    log::debug!("{} changes mode {} -> {}", value, current, mode);
                }
                *current = mode;
            }
            return;
        }
        self.index.insert(key, self.slots.len());
        self.slots.push(Some((value.to_string(), mode)));
    }

    /// Remove a domain. Keywords and regexps are untouched. Returns whether
    /// the domain was present.
    pub fn remove(&mut self, domain: &str) -> bool {
        match self.index.remove(&(RuleKind::Domain, domain.to_string())) {
            Some(idx) => {
                self.slots[idx] = None;
                true
            }
            None => false,
        }
    }

    /// Current mode of a rule of the given kind.
    pub fn get_rule(&self, kind: RuleKind, value: &str) -> Option<Mode> {
        self.index
            .get(&(kind, value.to_string()))
            .and_then(|&idx| self.slots[idx].as_ref())
            .map(|(_, mode)| *mode)
    }

    /// Current mode of a domain.
    pub fn get(&self, domain: &str) -> Option<Mode> {
        self.get_rule(RuleKind::Domain, domain)
    }

    /// Whether a rule of the given kind is present.
    pub fn contains_rule(&self, kind: RuleKind, value: &str) -> bool {
        self.index.contains_key(&(kind, value.to_string()))
    }

    /// Whether a domain is present.
    pub fn contains(&self, domain: &str) -> bool {
        self.contains_rule(RuleKind::Domain, domain)
    }

    /// Number of surviving rules.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no rules survive.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate over surviving values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Mode)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.as_ref().map(|(value, mode)| (value.as_str(), *mode)))
    }
}

impl PartialEq for AggregateSet {
    /// Equal when the surviving values, modes, and order match.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl Eq for AggregateSet {}

/// Fold lists in order into one set.
pub fn aggregate<L>(lists: &[L]) -> AggregateSet
where
    L: AsRef<[DomainEntry]>,
{
    let mut set = AggregateSet::new();
    for list in lists {
        set.extend(list.as_ref());
    }
    set
}

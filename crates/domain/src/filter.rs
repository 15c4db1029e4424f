//! Filter pipeline — classifies neighbor records against section criteria.
//!
//! Classification runs per record, in precedence order:
//!
//! 1. exclusion — out-regex on the raw line, out-MAC set, or a literal
//!    exclude substring; any hit wins outright,
//! 2. inclusion — reachability gate, then on-regex, then on-MAC set,
//! 3. otherwise no match.
//!
//! A record can therefore never be both excluded and matched. The section is
//! considered present when at least one record classifies as matched.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use crate::error::ValidationError;
use crate::machines::KnownMachines;
use crate::neighbor::NeighborRecord;

/// Outcome of classifying one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    /// An exclusion rule fired; inclusion was never evaluated.
    Excluded,
    /// All inclusion rules held.
    Matched,
    /// Nothing fired.
    NoMatch,
}

/// Per-section filter criteria, compiled once at configuration load.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    filter_on: Option<Regex>,
    filter_out: Option<Regex>,
    filter_on_machines: Vec<String>,
    filter_out_machines: Vec<String>,
    exclude: Vec<String>,
}

impl FilterCriteria {
    /// Create a builder for constructing [`FilterCriteria`].
    #[must_use]
    pub fn builder() -> FilterCriteriaBuilder {
        FilterCriteriaBuilder::default()
    }

    /// Machine names the section filters on, as configured.
    #[must_use]
    pub fn filter_on_machines(&self) -> &[String] {
        &self.filter_on_machines
    }

    /// Resolve machine names against the alias table for this cycle.
    ///
    /// The inclusion MAC set distinguishes two degenerate cases on purpose:
    /// with no alias table supplied the machine filter is dropped entirely
    /// (`None`, no restriction), while a supplied table that resolves none of
    /// the configured names yields an empty set that matches nothing.
    #[must_use]
    pub fn resolve(&self, machines: Option<&KnownMachines>) -> ResolvedFilter<'_> {
        let on_macs = match machines {
            Some(table) if !self.filter_on_machines.is_empty() => {
                Some(table.resolve(&self.filter_on_machines))
            }
            _ => None,
        };
        let out_macs = match machines {
            Some(table) if !self.filter_out_machines.is_empty() => {
                table.resolve(&self.filter_out_machines)
            }
            _ => HashSet::new(),
        };
        ResolvedFilter {
            criteria: self,
            on_macs,
            out_macs,
        }
    }
}

/// Step-by-step builder for [`FilterCriteria`].
#[derive(Debug, Default)]
pub struct FilterCriteriaBuilder {
    filter_on_regex: Option<String>,
    filter_out_regex: Option<String>,
    filter_on_machines: Vec<String>,
    filter_out_machines: Vec<String>,
    exclude: Vec<String>,
}

impl FilterCriteriaBuilder {
    #[must_use]
    pub fn filter_on_regex(mut self, pattern: impl Into<String>) -> Self {
        self.filter_on_regex = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn filter_out_regex(mut self, pattern: impl Into<String>) -> Self {
        self.filter_out_regex = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn filter_on_machines(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.filter_on_machines = names.into_iter().collect();
        self
    }

    #[must_use]
    pub fn filter_out_machines(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.filter_out_machines = names.into_iter().collect();
        self
    }

    #[must_use]
    pub fn exclude(mut self, substrings: impl IntoIterator<Item = String>) -> Self {
        self.exclude = substrings.into_iter().collect();
        self
    }

    /// Consume the builder, compile the regexes, and return the criteria.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPattern`] when either regex fails to
    /// compile.
    pub fn build(self) -> Result<FilterCriteria, ValidationError> {
        let filter_on = self
            .filter_on_regex
            .map(|pattern| compile("filter_on_regex", &pattern))
            .transpose()?;
        let filter_out = self
            .filter_out_regex
            .map(|pattern| compile("filter_out_regex", &pattern))
            .transpose()?;
        Ok(FilterCriteria {
            filter_on,
            filter_out,
            filter_on_machines: self.filter_on_machines,
            filter_out_machines: self.filter_out_machines,
            exclude: self.exclude,
        })
    }
}

fn compile(field: &'static str, pattern: &str) -> Result<Regex, ValidationError> {
    Regex::new(pattern).map_err(|source| ValidationError::InvalidPattern { field, source })
}

/// Criteria with machine names resolved to concrete MAC sets for one cycle.
#[derive(Debug)]
pub struct ResolvedFilter<'a> {
    criteria: &'a FilterCriteria,
    on_macs: Option<HashSet<String>>,
    out_macs: HashSet<String>,
}

impl ResolvedFilter<'_> {
    /// Classify one record. Exclusion rules take precedence and short-circuit.
    ///
    /// Records with an empty MAC never match MAC-based filters but remain
    /// subject to regex, substring, and reachability rules on the raw line.
    #[must_use]
    pub fn classify(&self, record: &NeighborRecord) -> MatchResult {
        let mac = record.mac_address.to_ascii_lowercase();
        let has_mac = !mac.is_empty();
        let excluded = self
            .criteria
            .filter_out
            .as_ref()
            .is_some_and(|re| re.is_match(&record.raw_line))
            || (has_mac && self.out_macs.contains(&mac))
            || self
                .criteria
                .exclude
                .iter()
                .any(|needle| record.raw_line.contains(needle.as_str()));
        if excluded {
            return MatchResult::Excluded;
        }

        let machine_ok = match &self.on_macs {
            None => true,
            Some(set) => has_mac && set.contains(&mac),
        };
        let regex_ok = self
            .criteria
            .filter_on
            .as_ref()
            .is_none_or(|re| re.is_match(&record.raw_line));
        if record.is_present() && regex_ok && machine_ok {
            MatchResult::Matched
        } else {
            MatchResult::NoMatch
        }
    }

    /// Classify a whole cycle's records and group them for diagnostics.
    #[must_use]
    pub fn classify_all(&self, records: &[NeighborRecord]) -> FilterReport {
        let mut report = FilterReport::default();
        for record in records {
            report.record(self.classify(record), record);
        }
        report
    }
}

/// Diagnostic grouping of one classification pass: records by classification,
/// then by (lowercased) MAC address, with the addresses seen for each MAC.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    matched: BTreeMap<String, Vec<String>>,
    excluded: BTreeMap<String, Vec<String>>,
    no_match: BTreeMap<String, Vec<String>>,
}

impl FilterReport {
    fn record(&mut self, result: MatchResult, record: &NeighborRecord) {
        let group = match result {
            MatchResult::Matched => &mut self.matched,
            MatchResult::Excluded => &mut self.excluded,
            MatchResult::NoMatch => &mut self.no_match,
        };
        group
            .entry(record.mac_address.to_ascii_lowercase())
            .or_default()
            .push(record.address.clone());
    }

    /// Aggregated presence: `true` iff at least one record matched.
    #[must_use]
    pub fn present(&self) -> bool {
        !self.matched.is_empty()
    }

    /// Records grouped by MAC for the given classification.
    #[must_use]
    pub fn group(&self, result: MatchResult) -> &BTreeMap<String, Vec<String>> {
        match result {
            MatchResult::Matched => &self.matched,
            MatchResult::Excluded => &self.excluded,
            MatchResult::NoMatch => &self.no_match,
        }
    }
}

//! Section — one validated, independently configured monitoring target.
//!
//! The configuration layer parses raw per-section tables and validates them
//! once, at load time, into this value: compiled filter criteria, a checked
//! threshold, and normalised commands. The engine never looks anything up
//! ad hoc.

use whoshome_domain::debounce::Presence;
use whoshome_domain::error::ValidationError;
use whoshome_domain::filter::FilterCriteria;

/// A named set of filter criteria, threshold, and commands.
#[derive(Debug, Clone)]
pub struct Section {
    pub name: String,
    pub enabled: bool,
    pub threshold: usize,
    pub criteria: FilterCriteria,
    pub nslookup: bool,
    pub device: Option<String>,
    pub cron: Option<String>,
    pub command_neighbor: Option<String>,
    pub command_no_neighbor: Option<String>,
    pub error_on_stderr: bool,
}

impl Section {
    /// Create a builder for constructing a [`Section`].
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SectionBuilder {
        SectionBuilder::new(name)
    }

    /// The command configured for a cycle result, if any.
    #[must_use]
    pub fn command_for(&self, result: Presence) -> Option<&str> {
        match result {
            Presence::Neighbor => self.command_neighbor.as_deref(),
            Presence::NoNeighbor => self.command_no_neighbor.as_deref(),
        }
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] or
    /// [`ValidationError::ZeroThreshold`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.threshold == 0 {
            return Err(ValidationError::ZeroThreshold);
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Section`].
#[derive(Debug)]
pub struct SectionBuilder {
    name: String,
    enabled: bool,
    threshold: usize,
    criteria: FilterCriteria,
    nslookup: bool,
    device: Option<String>,
    cron: Option<String>,
    command_neighbor: Option<String>,
    command_no_neighbor: Option<String>,
    error_on_stderr: bool,
}

impl SectionBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            threshold: 3,
            criteria: FilterCriteria::default(),
            nslookup: false,
            device: None,
            cron: None,
            command_neighbor: None,
            command_no_neighbor: None,
            error_on_stderr: true,
        }
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    #[must_use]
    pub fn nslookup(mut self, nslookup: bool) -> Self {
        self.nslookup = nslookup;
        self
    }

    #[must_use]
    pub fn device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    #[must_use]
    pub fn cron(mut self, expression: impl Into<String>) -> Self {
        self.cron = Some(expression.into());
        self
    }

    #[must_use]
    pub fn command_neighbor(mut self, command: impl Into<String>) -> Self {
        self.command_neighbor = Some(command.into());
        self
    }

    #[must_use]
    pub fn command_no_neighbor(mut self, command: impl Into<String>) -> Self {
        self.command_no_neighbor = Some(command.into());
        self
    }

    #[must_use]
    pub fn error_on_stderr(mut self, error_on_stderr: bool) -> Self {
        self.error_on_stderr = error_on_stderr;
        self
    }

    /// Consume the builder, validate, and return a [`Section`].
    ///
    /// Blank commands are normalised to "no action" so the engine only ever
    /// compares unset or non-empty command strings.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyName`] or
    /// [`ValidationError::ZeroThreshold`].
    pub fn build(self) -> Result<Section, ValidationError> {
        let section = Section {
            name: self.name,
            enabled: self.enabled,
            threshold: self.threshold,
            criteria: self.criteria,
            nslookup: self.nslookup,
            device: self.device,
            cron: self.cron,
            command_neighbor: normalise_command(self.command_neighbor),
            command_no_neighbor: normalise_command(self.command_no_neighbor),
            error_on_stderr: self.error_on_stderr,
        };
        section.validate()?;
        Ok(section)
    }
}

fn normalise_command(command: Option<String>) -> Option<String> {
    command.filter(|cmd| !cmd.trim().is_empty())
}

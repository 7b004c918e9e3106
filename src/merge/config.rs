use super::MergeError;

/// Default number of entries a reader prefetches per sample.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Merge run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeConfig {
    /// Rename duplicate sample names instead of refusing to merge.
    pub force_samples: bool,
    /// Restrict the merge to `contig[:start[-end]]` (1-based, inclusive).
    pub region: Option<String>,
    /// Per-sample read-ahead, in records.
    pub buffer_size: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            force_samples: false,
            region: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

impl MergeConfig {
    /// Configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow duplicate sample names (renamed with a `:R<n>` suffix).
    pub fn with_force_samples(mut self, enabled: bool) -> Self {
        self.force_samples = enabled;
        self
    }

    /// Restrict the merge to one region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Set the per-sample read-ahead.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<(), MergeError> {
        if self.buffer_size == 0 {
            return Err(MergeError::InvalidConfiguration(
                "buffer size must be > 0".to_string(),
            ));
        }
        if let Some(region) = &self.region {
            Region::parse(region)?;
        }
        Ok(())
    }

    /// Parsed region, if one is configured.
    pub fn parsed_region(&self) -> Result<Option<Region>, MergeError> {
        self.region.as_deref().map(Region::parse).transpose()
    }
}

/// A genomic interval on a named contig, stored 0-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    /// Contig name.
    pub contig: String,
    /// First position (0-based).
    pub start: u32,
    /// Last position (0-based), or `None` for the end of the contig.
    pub end: Option<u32>,
}

impl Region {
    /// Parse `contig`, `contig:start` or `contig:start-end` (1-based, inclusive).
    pub fn parse(text: &str) -> Result<Self, MergeError> {
        let invalid = |why: &str| MergeError::InvalidConfiguration(format!("region {text:?}: {why}"));
        let (contig, span) = match text.rsplit_once(':') {
            Some((contig, span)) => (contig, Some(span)),
            None => (text, None),
        };
        if contig.is_empty() {
            return Err(invalid("empty contig name"));
        }
        let Some(span) = span else {
            return Ok(Self {
                contig: contig.to_string(),
                start: 0,
                end: None,
            });
        };
        let parse = |s: &str| -> Result<u32, MergeError> {
            let value: u32 = s
                .replace(',', "")
                .parse()
                .map_err(|_| invalid("coordinates must be positive integers"))?;
            if value == 0 {
                return Err(invalid("coordinates are 1-based"));
            }
            Ok(value - 1)
        };
        let (start, end) = match span.split_once('-') {
            Some((start, "")) => (parse(start)?, None),
            Some((start, end)) => (parse(start)?, Some(parse(end)?)),
            None => (parse(span)?, None),
        };
        if matches!(end, Some(end) if end < start) {
            return Err(invalid("end precedes start"));
        }
        Ok(Self {
            contig: contig.to_string(),
            start,
            end,
        })
    }
}
